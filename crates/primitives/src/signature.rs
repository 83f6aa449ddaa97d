//! Recovery of transaction signers.

use alloy_primitives::{Address, Signature, SignatureError, B256};

/// Recovers the address that produced `signature` over the 32-byte `hash`.
///
/// The signature is the 65-byte `r ‖ s ‖ v` form where `v` is either `0/1` or `27/28`. The hash is
/// signed as is i.e., without the `eth_sign` message prefix.
pub fn recover_signer(hash: &B256, signature: &[u8]) -> Result<Address, SignatureError> {
    let signature = Signature::try_from(signature)?;

    signature.recover_address_from_prehash(hash)
}
