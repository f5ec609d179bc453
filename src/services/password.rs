use hex::encode as hex_encode;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::config::{get_pbkdf2_iterations, DEFAULT_PBKDF2_ITERATIONS};
use crate::error::HashError;

const SCHEME_PREFIX: &str = "pbkdf2:sha256:";

/// One-way credential hashing used for stored passwords.
pub trait PasswordHasher {
    /// Salted, slow hash of `plaintext`, self-describing so `verify` needs
    /// nothing else.
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;

    /// Whether `candidate` hashes to `stored`. Malformed `stored` never
    /// verifies.
    fn verify(&self, stored: &str, candidate: &str) -> bool;
}

/// PBKDF2-HMAC-SHA256, stored as `pbkdf2:sha256:<iterations>$<salt>$<hex digest>`.
#[derive(Clone, Debug)]
pub struct Pbkdf2Hasher {
    iterations: u32,
}

impl Default for Pbkdf2Hasher {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl Pbkdf2Hasher {
    pub fn new(iterations: u32) -> Result<Self, HashError> {
        if iterations == 0 {
            return Err(HashError::InvalidParameters(
                "iteration count must be positive".into(),
            ));
        }
        Ok(Self { iterations })
    }

    /// Iteration count from `PBKDF2_ITERATIONS`.
    pub fn from_env() -> Self {
        Self {
            iterations: get_pbkdf2_iterations(),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

fn derive(password: &str, salt: &str, iterations: u32) -> String {
    let mut dk = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut dk);
    hex_encode(dk)
}

fn random_salt() -> String {
    let mut salt_bytes = [0u8; 12];
    rand::rngs::OsRng.fill_bytes(&mut salt_bytes);
    hex_encode(salt_bytes)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Whether `value` already looks like a stored hash of this scheme.
pub fn is_hashed(value: &str) -> bool {
    parse_stored(value).is_some()
}

fn parse_stored(stored: &str) -> Option<(u32, &str, &str)> {
    let rest = stored.strip_prefix(SCHEME_PREFIX)?;
    let (iter_s, salt_hash) = rest.split_once('$')?;
    let (salt, hash) = salt_hash.split_once('$')?;
    let iterations = iter_s.parse::<u32>().ok().filter(|n| *n > 0)?;
    if salt.is_empty() || hash.len() != 64 {
        return None;
    }
    Some((iterations, salt, hash))
}

impl PasswordHasher for Pbkdf2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        if plaintext.is_empty() {
            return Err(HashError::EmptyPassword);
        }
        let salt = random_salt();
        let hash_hex = derive(plaintext, &salt, self.iterations);
        Ok(format!(
            "{}{}${}${}",
            SCHEME_PREFIX, self.iterations, salt, hash_hex
        ))
    }

    fn verify(&self, stored: &str, candidate: &str) -> bool {
        match parse_stored(stored) {
            Some((iterations, salt, expected)) => {
                let computed = derive(candidate, salt, iterations);
                constant_time_eq(computed.as_bytes(), expected.as_bytes())
            }
            None => false,
        }
    }
}
