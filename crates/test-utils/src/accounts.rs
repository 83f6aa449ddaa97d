//! Accounts that own and sign for coins in tests.

use alloy_primitives::{Address, Bytes, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;

/// A freshly generated key pair.
#[derive(Debug, Clone)]
pub struct Account {
    signer: PrivateKeySigner,
}

impl Account {
    /// Generates a random account.
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    /// Generates `N` distinct random accounts.
    pub fn many<const N: usize>() -> [Self; N] {
        std::array::from_fn(|_| Self::random())
    }

    /// The account's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Signs `hash` as is, in the 65-byte `r ‖ s ‖ v` form.
    pub fn sign(&self, hash: &B256) -> Bytes {
        let signature = self
            .signer
            .sign_hash_sync(hash)
            .expect("signing a prehash must not fail");

        Bytes::from(signature.as_bytes().to_vec())
    }
}
