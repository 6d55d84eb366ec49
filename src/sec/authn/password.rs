use argon2::Variant;
use rand::RngCore;
use serde::{Serialize, Deserialize};

use crate::error::Error as ServiceError;

pub const SALT_LEN: usize = 32;

pub type Salt = [u8; SALT_LEN];

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error(transparent)]
    Rand(#[from] rand::Error),

    #[error(transparent)]
    Argon2(#[from] argon2::Error),
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::new().source(err)
    }
}

pub fn gen_salt() -> Result<Salt, rand::Error> {
    let mut salt = [0u8; SALT_LEN];

    rand::thread_rng().try_fill_bytes(&mut salt)?;

    Ok(salt)
}

fn gen_hash(password: &str, salt: &[u8]) -> Result<String, argon2::Error> {
    let mut config = argon2::Config::default();
    config.mem_cost = 19456;
    config.variant = Variant::Argon2id;

    argon2::hash_encoded(password.as_bytes(), salt, &config)
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Password {
    hash: String,
}

impl Password {
    pub fn create<P>(password: P) -> Result<Password, PasswordError>
    where
        P: AsRef<str>
    {
        let salt = gen_salt()?;
        let hash = gen_hash(password.as_ref(), &salt)?;

        Ok(Password { hash })
    }

    pub fn verify<P>(&self, given: P) -> Result<bool, PasswordError>
    where
        P: AsRef<str>
    {
        Ok(argon2::verify_encoded(&self.hash, given.as_ref().as_bytes())?)
    }
}
