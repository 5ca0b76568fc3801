use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use rand::RngCore;

use openmemory_core::errors::SecurityError;

const NONCE_LEN: usize = 12;
const PREFIX: char = 'v';

/// A parsed `v<keyVersion>:<iv>:<ciphertext>` envelope.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub key_version: u32,
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

fn derive_key(key: &str, salt: &str) -> [u8; 32] {
    blake3::derive_key(salt, key.as_bytes())
}

fn b64_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn b64_decode(s: &str) -> Result<Vec<u8>, SecurityError> {
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| SecurityError::MalformedEnvelope(e.to_string()))
}

/// Quick structural check without attempting to decode or decrypt.
pub fn is_envelope(s: &str) -> bool {
    let mut parts = s.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(v), Some(_), Some(_)) => {
            v.starts_with(PREFIX) && v[1..].parse::<u32>().is_ok()
        }
        _ => false,
    }
}

impl Envelope {
    pub fn parse(s: &str) -> Result<Self, SecurityError> {
        let mut parts = s.splitn(3, ':');
        let (v, iv, ct) = match (parts.next(), parts.next(), parts.next()) {
            (Some(v), Some(iv), Some(ct)) => (v, iv, ct),
            _ => return Err(SecurityError::MalformedEnvelope(s.to_string())),
        };
        if !v.starts_with(PREFIX) {
            return Err(SecurityError::MalformedEnvelope(s.to_string()));
        }
        let key_version: u32 = v[1..]
            .parse()
            .map_err(|_| SecurityError::MalformedEnvelope(s.to_string()))?;
        Ok(Envelope {
            key_version,
            iv: b64_decode(iv)?,
            ciphertext: b64_decode(ct)?,
        })
    }

    pub fn to_string(&self) -> String {
        format!(
            "v{}:{}:{}",
            self.key_version,
            b64_encode(&self.iv),
            b64_encode(&self.ciphertext)
        )
    }
}

/// Encrypt `plaintext`, producing the wire envelope string.
pub fn encrypt(
    plaintext: &str,
    key: &str,
    salt: &str,
    key_version: u32,
) -> Result<String, SecurityError> {
    let key_bytes = derive_key(key, salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));

    let mut iv = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| SecurityError::DecryptionFailed)?;

    Ok(Envelope {
        key_version,
        iv: iv.to_vec(),
        ciphertext,
    }
    .to_string())
}

/// Decrypt an envelope string produced by [`encrypt`], verifying the
/// authentication tag. Always fails (never silently recovers) if the tag
/// does not verify or the key version is unrecognised.
pub fn decrypt(envelope: &str, key: &str, salt: &str) -> Result<String, SecurityError> {
    let parsed = Envelope::parse(envelope)?;
    if parsed.key_version != 1 {
        // Only a single active key/salt pair is modeled; future versions
        // would look up the versioned key material here.
        return Err(SecurityError::UnknownKeyVersion(parsed.key_version));
    }
    let key_bytes = derive_key(key, salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(&parsed.iv);

    let plaintext = cipher
        .decrypt(nonce, parsed.ciphertext.as_slice())
        .map_err(|_| SecurityError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| SecurityError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let env = encrypt("hello world", "k", "s", 1).unwrap();
        assert!(is_envelope(&env));
        let plain = decrypt(&env, "k", "s").unwrap();
        assert_eq!(plain, "hello world");
    }

    #[test]
    fn wrong_key_fails() {
        let env = encrypt("hello world", "k", "s", 1).unwrap();
        assert!(decrypt(&env, "wrong", "s").is_err());
    }

    #[test]
    fn non_envelope_is_rejected() {
        assert!(!is_envelope("plain text"));
        assert!(Envelope::parse("plain text").is_err());
    }

    #[test]
    fn unknown_key_version_errors() {
        let env = encrypt("hi", "k", "s", 1).unwrap();
        let bumped = env.replacen("v1:", "v2:", 1);
        assert!(matches!(
            decrypt(&bumped, "k", "s"),
            Err(SecurityError::UnknownKeyVersion(2))
        ));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn round_trip_arbitrary_strings(s in "\\PC*") {
            let env = encrypt(&s, "k", "s", 1).unwrap();
            let plain = decrypt(&env, "k", "s").unwrap();
            prop_assert_eq!(plain, s);
        }
    }
}
