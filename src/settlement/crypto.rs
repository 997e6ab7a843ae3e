//! Bank account decryption collaborator
//!
//! Account descriptors are encrypted at rest; the outbound builder needs the
//! cleartext descriptor when emitting settlement lines. Production wires a
//! real KMS-backed cipher through this trait.

use thiserror::Error;

use super::types::{BankAccount, EncryptedBankAccount};

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("cannot decrypt account descriptor: {0}")]
    Decrypt(String),

    #[error("cannot encrypt account descriptor: {0}")]
    Encrypt(String),
}

pub trait BankAccountCipher: Send + Sync {
    fn decrypt(&self, account: &EncryptedBankAccount) -> Result<BankAccount, CryptoError>;
    fn encrypt(&self, account: &BankAccount) -> Result<EncryptedBankAccount, CryptoError>;
}

/// Base64/JSON codec for development and tests. Not a cipher; it only keeps
/// descriptors out of casual sight in fixtures and logs.
#[cfg(feature = "memory-store")]
pub struct Base64Cipher;

#[cfg(feature = "memory-store")]
impl BankAccountCipher for Base64Cipher {
    fn decrypt(&self, account: &EncryptedBankAccount) -> Result<BankAccount, CryptoError> {
        use base64::Engine as _;
        use base64::engine::general_purpose::STANDARD;

        let raw = STANDARD
            .decode(&account.0)
            .map_err(|e| CryptoError::Decrypt(e.to_string()))?;
        serde_json::from_slice(&raw).map_err(|e| CryptoError::Decrypt(e.to_string()))
    }

    fn encrypt(&self, account: &BankAccount) -> Result<EncryptedBankAccount, CryptoError> {
        use base64::Engine as _;
        use base64::engine::general_purpose::STANDARD;

        let raw = serde_json::to_vec(account).map_err(|e| CryptoError::Encrypt(e.to_string()))?;
        Ok(EncryptedBankAccount(STANDARD.encode(raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_roundtrip() {
        let account = BankAccount {
            holder_name: "Ada Lovelace".into(),
            account_number: "000123456".into(),
            routing_number: "110000000".into(),
        };

        let encrypted = Base64Cipher.encrypt(&account).unwrap();
        assert_ne!(encrypted.0, "Ada Lovelace");

        let decrypted = Base64Cipher.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, account);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = Base64Cipher
            .decrypt(&EncryptedBankAccount("not base64 at all!!".into()))
            .unwrap_err();
        assert!(matches!(err, CryptoError::Decrypt(_)));
    }
}
