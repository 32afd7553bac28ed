//! Password hashing with PBKDF2-HMAC-SHA256.
//!
//! 100k iterations is a deliberate cost floor against offline brute force
//! while staying tractable for a per-request login check. Salts are stored
//! alongside the hash so verification is deterministic.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

pub const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct PasswordHash {
    /// Hex-encoded 256-bit derived key.
    pub hash: String,
    /// Hex-encoded 16-byte salt.
    pub salt: String,
}

/// Derive a hash for a password using a freshly generated random salt.
pub fn hash(password: &str) -> PasswordHash {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    hash_with_salt(password, &hex::encode(salt))
}

/// Derive a hash for a password using a caller-supplied hex salt.
pub fn hash_with_salt(password: &str, salt_hex: &str) -> PasswordHash {
    let salt = hex::decode(salt_hex).unwrap_or_default();
    let mut derived = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, ITERATIONS, &mut derived);
    PasswordHash { hash: hex::encode(derived), salt: salt_hex.to_string() }
}

/// Re-derive with the stored salt and compare.
pub fn verify(password: &str, hash_hex: &str, salt_hex: &str) -> bool {
    hash_with_salt(password, salt_hex).hash == hash_hex
}
