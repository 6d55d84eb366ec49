use std::sync::Arc;

use tfa_lib::validation::check_control_leading_trailing;

use crate::user::store::{MemoryStore, UserStore};

pub const MAX_ISSUER_CHARS: usize = 64;

#[derive(Debug)]
pub struct InvalidIssuer;

pub struct Config {
    pub issuer: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            issuer: String::from("TFA"),
        }
    }
}

pub struct Shared {
    users: Box<dyn UserStore>,
    issuer: String,
}

pub type ArcShared = Arc<Shared>;

impl Shared {
    pub fn new(config: Config) -> Result<Shared, InvalidIssuer> {
        Self::with_store(config, Box::new(MemoryStore::new()))
    }

    pub fn with_store(config: Config, users: Box<dyn UserStore>) -> Result<Shared, InvalidIssuer> {
        if config.issuer.is_empty() ||
            !check_control_leading_trailing(&config.issuer, Some(MAX_ISSUER_CHARS)) {
            return Err(InvalidIssuer);
        }

        Ok(Shared {
            users,
            issuer: config.issuer,
        })
    }

    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}
