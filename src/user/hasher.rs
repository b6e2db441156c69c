//! Password hashing.

use anyhow::{anyhow, bail, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PasswordHasher {
    #[default]
    Argon2,
}

impl FromStr for PasswordHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(PasswordHasher::Argon2),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl fmt::Display for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordHasher::Argon2 => f.write_str("argon2"),
        }
    }
}

#[cfg(not(feature = "test-fast-hasher"))]
fn argon2_instance() -> Argon2<'static> {
    Argon2::default()
}

#[cfg(feature = "test-fast-hasher")]
fn argon2_instance() -> Argon2<'static> {
    let params = argon2::Params::new(8, 1, 1, None).unwrap_or_default();
    Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
}

impl PasswordHasher {
    /// Hashes with a fresh random salt, returning a PHC string.
    pub fn hash(&self, plain: &str) -> Result<String> {
        match self {
            PasswordHasher::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                Ok(argon2_instance()
                    .hash_password(plain.as_bytes(), &salt)
                    .map_err(|err| anyhow!("{}", err))?
                    .to_string())
            }
        }
    }

    pub fn verify(&self, plain: &str, phc_hash: &str) -> Result<bool> {
        match self {
            PasswordHasher::Argon2 => {
                let parsed = PasswordHash::new(phc_hash).map_err(|err| anyhow!("{}", err))?;
                Ok(argon2_instance()
                    .verify_password(plain.as_bytes(), &parsed)
                    .is_ok())
            }
        }
    }
}
