//! Locally generated accounts used to sign deployment transactions

use std::fmt::{self, Debug};

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha3::{Digest, Sha3_256};

use crate::{constants::ED25519_SCHEME, types::AccountAddress};

/// An ed25519 account whose private key is held in memory
pub struct LocalAccount {
    /// The key signing the account's transactions
    signing_key: SigningKey,
    /// The address derived from the key
    address: AccountAddress,
}

impl LocalAccount {
    /// Generates an account with a fresh random key
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Wraps an existing key
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = derive_address(&signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// The address of the account
    pub fn address(&self) -> AccountAddress {
        self.address
    }

    /// The hex-encoded public key of the account
    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.verifying_key().as_bytes()))
    }

    /// Signs a message, returning the hex-encoded signature
    pub fn sign_hex(&self, message: &[u8]) -> String {
        format!("0x{}", hex::encode(self.signing_key.sign(message).to_bytes()))
    }
}

impl Debug for LocalAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalAccount")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Derives the address of a single-key ed25519 account,
/// which is its authentication key: `sha3-256(public key || scheme)`
fn derive_address(public_key: &VerifyingKey) -> AccountAddress {
    let mut hasher = Sha3_256::new();
    hasher.update(public_key.as_bytes());
    hasher.update([ED25519_SCHEME]);
    AccountAddress(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signature, SigningKey, Verifier};

    use super::LocalAccount;

    #[test]
    fn test_address_derivation() {
        // Key and address of the Aptos SDK's single-key ed25519 test vector
        let secret = hex::decode("c5338cd251c22daa8c9c9cc94f498cc8a5c7e1d2e75287a5dda91096fe64efa5")
            .unwrap();
        let key = SigningKey::from_bytes(&secret.try_into().unwrap());
        let account = LocalAccount::from_signing_key(key);

        assert_eq!(
            account.address().to_string(),
            "0x978c213990c4833df71548df7ce49d54c759d6b6d932de22b24d56060b7af2aa"
        );
    }

    #[test]
    fn test_signatures_verify() {
        let account = LocalAccount::generate();
        let message = b"encoded transaction";

        let signature = hex::decode(account.sign_hex(message).trim_start_matches("0x")).unwrap();
        let public_key =
            hex::decode(account.public_key_hex().trim_start_matches("0x")).unwrap();

        let verifying_key =
            ed25519_dalek::VerifyingKey::from_bytes(&public_key.try_into().unwrap()).unwrap();
        let signature = Signature::from_slice(&signature).unwrap();
        assert!(verifying_key.verify(message, &signature).is_ok());
    }

    #[test]
    fn test_generated_accounts_differ() {
        assert_ne!(
            LocalAccount::generate().address(),
            LocalAccount::generate().address()
        );
    }
}
