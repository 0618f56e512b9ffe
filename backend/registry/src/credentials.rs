//! # Credentials
//!
//! Salted PBKDF2-HMAC-SHA256, stored as
//! `pbkdf2-sha256$<iterations>$<salt>$<hash>` with base64 salt and hash so the
//! work factor can be raised without invalidating existing hashes.
use base64::{Engine, engine::general_purpose::STANDARD as B64};
use pbkdf2::pbkdf2_hmac;
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const DEFAULT_ITERATIONS: u32 = 210_000;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

#[derive(Clone, Copy, Debug)]
pub struct Credentials {
    iterations: u32,
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl Credentials {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn hash_password(&self, plaintext: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let key = derive_key(plaintext, &salt, self.iterations);

        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            B64.encode(salt),
            B64.encode(key)
        )
    }

    /// Uses the iteration count recorded in `stored`, not the configured one.
    /// Anything that does not parse verifies as `false`.
    pub fn verify_password(&self, plaintext: &str, stored: &str) -> bool {
        let Some((iterations, salt, expected)) = parse(stored) else {
            return false;
        };

        let key = derive_key(plaintext, &salt, iterations);

        expected.len() == KEY_LEN && bool::from(key.as_slice().ct_eq(expected.as_slice()))
    }
}

fn derive_key(plaintext: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(plaintext.as_bytes(), salt, iterations, &mut key);

    key
}

fn parse(stored: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = stored.split('$');

    if parts.next()? != SCHEME {
        return None;
    }

    let iterations: u32 = parts.next()?.parse().ok().filter(|n| *n > 0)?;
    let salt = B64.decode(parts.next()?).ok()?;
    let hash = B64.decode(parts.next()?).ok()?;

    if parts.next().is_some() {
        return None;
    }

    Some((iterations, salt, hash))
}
