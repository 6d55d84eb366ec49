use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::sec::authn::password::{Password, PasswordError};
use crate::sec::authn::totp::Totp;

pub mod store;

#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password: Password,
    pub totp: Option<Totp>,
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
}

impl User {
    pub fn create<U, P>(username: U, password: P) -> Result<User, PasswordError>
    where
        U: Into<String>,
        P: AsRef<str>
    {
        Ok(User {
            username: username.into(),
            password: Password::create(password)?,
            totp: None,
            created: Utc::now(),
            updated: None,
        })
    }

    pub fn totp_enabled(&self) -> bool {
        self.totp.is_some()
    }

    pub fn touch(&mut self) {
        self.updated = Some(Utc::now());
    }
}
