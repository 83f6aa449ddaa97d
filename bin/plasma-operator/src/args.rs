//! Parses command-line arguments for the operator CLI.

use std::path::PathBuf;

use clap::{crate_version, Parser};

#[derive(Debug, Parser)]
#[clap(
    name = "plasma-operator",
    about = "The operator node of a plasma cash child chain",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[clap(
        long,
        short = 'c',
        help = "The file containing the configuration for the operator",
        default_value = "config.toml"
    )]
    pub config: PathBuf,

    #[clap(
        long,
        help = "Run without a root chain, overriding the configuration",
        env = "PLASMA_CHAINLESS"
    )]
    pub chainless: bool,
}
