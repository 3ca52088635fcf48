//! # Generate
//!
//! Random codes and nonces used across the issuance flow. All values are
//! drawn from the thread-local CSPRNG with at least 128 bits of entropy,
//! except the short numeric transaction code which is delivered out-of-band.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::Rng;

const PIN_LEN: usize = 6;
const CODE_LEN: usize = 32;

/// Generates a base64url encoded random string for a pre-authorized code.
#[must_use]
pub fn pre_authorized_code() -> String {
    random_token()
}

/// Generates a base64url encoded random string for a `c_nonce`.
#[must_use]
pub fn nonce() -> String {
    random_token()
}

/// Generates a numeric transaction code (PIN).
#[must_use]
pub fn tx_code() -> String {
    let mut rng = rand::thread_rng();
    (0..PIN_LEN).map(|_| char::from(b'0' + rng.gen_range(0..10))).collect()
}

fn random_token() -> String {
    let mut bytes = [0u8; CODE_LEN];
    rand::thread_rng().fill(&mut bytes[..]);
    Base64UrlUnpadded::encode_string(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_shape() {
        let code = pre_authorized_code();
        assert_eq!(code.len(), 43);
        assert_ne!(code, pre_authorized_code());
    }

    #[test]
    fn pin_shape() {
        let pin = tx_code();
        assert_eq!(pin.len(), 6);
        assert!(pin.chars().all(|c| c.is_ascii_digit()));
    }
}
