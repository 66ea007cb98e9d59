use getrandom::fill;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::Error;

/// Length of the salt in bytes.
pub const SALT_LEN: usize = 16;
/// Bytes drawn from the OS random source per salt.
const ENTROPY_LEN: usize = 16;

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<(), Error> {
    fill(buf).map_err(|e| Error::Entropy(e.to_string()))
}

/// Generate a printable salt: the first 16 lowercase hex digits of the
/// SHA-256 of 16 random bytes.
pub fn generate_salt() -> Result<[u8; SALT_LEN], Error> {
    let mut entropy = Zeroizing::new([0u8; ENTROPY_LEN]);
    secure_random(&mut *entropy)?;
    Ok(salt_from_entropy(&*entropy))
}

pub(crate) fn salt_from_entropy(entropy: &[u8]) -> [u8; SALT_LEN] {
    let digest = Sha256::digest(entropy);
    let hex = digest
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>();

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&hex.as_bytes()[..SALT_LEN]);
    salt
}
