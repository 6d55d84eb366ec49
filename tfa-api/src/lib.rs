pub mod error;
pub use error::{ApiError, ApiErrorKind, Detail};

pub mod users;
pub mod auth;

pub trait Validator {
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }

    fn has_work(&self) -> bool {
        true
    }

    fn assert_ok(&self) -> Result<(), ApiError> {
        self.validate()?;

        if !self.has_work() {
            Err(ApiError::from(error::GeneralKind::NoWork))
        } else {
            Ok(())
        }
    }
}
