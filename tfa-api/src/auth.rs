use serde::{Serialize, Deserialize};

use crate::{Validator, ApiError};
use crate::error::GeneralKind;

#[derive(Debug, Serialize, Deserialize)]
pub struct SignUp {
    pub username: String,
    pub password: String,

    #[serde(default)]
    pub enable_totp: bool,
}

impl Validator for SignUp {
    fn validate(&self) -> Result<(), ApiError> {
        let mut invalid = Vec::new();

        if !tfa_lib::users::username_valid(&self.username) {
            invalid.push("username");
        }

        if !tfa_lib::sec::authn::password_valid(&self.password) {
            invalid.push("password");
        }

        if !invalid.is_empty() {
            return Err(ApiError::from((
                GeneralKind::ValidationFailed,
                crate::Detail::Keys(invalid.into_iter().map(|v| v.to_owned()).collect())
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignIn {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTotp {
    pub username: String,
    pub totp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnrollTotp {
    pub username: String,
    pub password: String,
}

impl Validator for EnrollTotp {
    fn validate(&self) -> Result<(), ApiError> {
        if self.username.is_empty() {
            return Err(ApiError::from((
                GeneralKind::ValidationFailed,
                crate::Detail::with_key("username")
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DisableTotp {
    pub username: String,
    pub password: String,
    pub totp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignedUp {
    pub totp_enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_uri: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum SignedIn {
    Authenticated,
    TotpRequired {
        digits: u32
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TotpEnrollment {
    pub digits: u32,
    pub step: u64,
    pub provisioning_uri: String,
}
