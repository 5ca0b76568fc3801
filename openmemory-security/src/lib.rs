//! Content encryption envelope (`spec.md` §4.4 step 5, §4.1).
//!
//! Envelope format: `v<keyVersion>:<iv>:<ciphertext>`, both `iv` and
//! `ciphertext` base64-encoded, key derived from (encryption key,
//! encryption salt) via BLAKE3 keyed derivation into an AES-256-GCM key.

mod envelope;

pub use envelope::{decrypt, encrypt, is_envelope, Envelope};

pub use openmemory_core::errors::SecurityError;
