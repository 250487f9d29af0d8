use bip39::{Language, Mnemonic};

use crate::error::WalletError;

/// Validate a mnemonic phrase
pub fn validate_mnemonic(phrase: &str) -> Result<bool, WalletError> {
    match Mnemonic::parse_in_normalized(Language::English, phrase) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}

/// Derive seed bytes from mnemonic + optional passphrase
/// Returns 64-byte seed. Caller MUST zeroize the returned seed when done.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Vec<u8>, WalletError> {
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;

    let seed = mnemonic.to_seed(passphrase);
    Ok(seed.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_validate_valid_mnemonic() {
        assert!(validate_mnemonic(TEST_MNEMONIC).unwrap());
    }

    #[test]
    fn test_validate_invalid_mnemonic() {
        assert!(!validate_mnemonic("invalid mnemonic phrase here").unwrap());
    }

    #[test]
    fn test_bad_checksum_is_invalid() {
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";
        assert!(!validate_mnemonic(phrase).unwrap());
        assert!(matches!(
            mnemonic_to_seed(phrase, ""),
            Err(WalletError::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn test_mnemonic_to_seed_deterministic() {
        let seed1 = mnemonic_to_seed(TEST_MNEMONIC, "").unwrap();
        let seed2 = mnemonic_to_seed(TEST_MNEMONIC, "").unwrap();
        assert_eq!(seed1, seed2);
        assert_eq!(seed1.len(), 64);
    }

    #[test]
    fn test_passphrase_changes_seed() {
        let seed_no_pass = mnemonic_to_seed(TEST_MNEMONIC, "").unwrap();
        let seed_with_pass = mnemonic_to_seed(TEST_MNEMONIC, "mypassphrase").unwrap();
        assert_ne!(seed_no_pass, seed_with_pass);
    }

    #[test]
    fn test_bip39_test_vector() {
        // Official BIP-39 test vector (12 words, no passphrase)
        let seed = mnemonic_to_seed(TEST_MNEMONIC, "").unwrap();
        assert_eq!(
            hex::encode(&seed),
            "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1\
             9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4"
        );
    }
}
