use tracing::Level;

use tfa_api::Validator;
use tfa_api::auth;
use tfa_api::error::{AuthKind, UserKind};

use crate::error::{self, Error};
use crate::sec::authn::totp::Totp;
use crate::state::Shared;
use crate::user::User;

pub fn sign_up(state: &Shared, json: auth::SignUp) -> error::Result<auth::SignedUp> {
    json.assert_ok().map_err(Error::api)?;

    let mut user = User::create(json.username, &json.password)?;

    let mut provisioning_uri = None;

    if json.enable_totp {
        let totp = Totp::generate()?;

        provisioning_uri = Some(
            totp.provisioning_uri(state.issuer(), &user.username)
                .map_err(|_| Error::new().message("failed building provisioning uri"))?
        );

        user.totp = Some(totp);
    }

    let totp_enabled = user.totp.is_some();
    let username = user.username.clone();

    if !state.users().create(user) {
        return Err(Error::api((UserKind::AlreadyExists, "username is already taken")));
    }

    tracing::event!(Level::INFO, username = %username, totp_enabled, "created user");

    Ok(auth::SignedUp {
        totp_enabled,
        provisioning_uri,
    })
}

pub fn sign_in(state: &Shared, json: auth::SignIn) -> error::Result<auth::SignedIn> {
    let Some(user) = state.users().get(&json.username) else {
        return Err(Error::api((AuthKind::InvalidCredentials, "invalid username or password")));
    };

    if !user.password.verify(&json.password)? {
        return Err(Error::api((AuthKind::InvalidCredentials, "invalid username or password")));
    }

    match &user.totp {
        Some(totp) => Ok(auth::SignedIn::TotpRequired {
            digits: *totp.digits()
        }),
        None => Ok(auth::SignedIn::Authenticated)
    }
}

/// second step of an mfa sign in. Ok means the caller is authenticated
pub fn submit_totp(state: &Shared, json: auth::SubmitTotp) -> error::Result<()> {
    let Some(user) = state.users().get(&json.username) else {
        return Err(Error::api((UserKind::NotFound, "user not found")));
    };

    let Some(totp) = &user.totp else {
        return Err(Error::api((AuthKind::TotpNotEnabled, "totp is not enabled for this user")));
    };

    if !totp.verify(&json.totp) {
        tracing::event!(Level::DEBUG, username = %user.username, "rejected totp code");

        return Err(Error::api((AuthKind::InvalidTotp, "invalid totp code")));
    }

    Ok(())
}

pub fn enroll_totp(state: &Shared, json: auth::EnrollTotp) -> error::Result<auth::TotpEnrollment> {
    json.assert_ok().map_err(Error::api)?;

    let totp = Totp::generate()?;

    let provisioning_uri = totp.provisioning_uri(state.issuer(), &json.username)
        .map_err(|_| Error::new().message("failed building provisioning uri"))?;
    let digits = *totp.digits();
    let step = *totp.step();

    let mut pending = Some(totp);
    let mut outcome: Option<error::Result<()>> = None;

    let found = state.users().modify(&json.username, &mut |user| {
        outcome = Some(enroll_user(user, &json.password, &mut pending));
    });

    if !found {
        return Err(Error::api((UserKind::NotFound, "user not found")));
    }

    let Some(result) = outcome else {
        return Err(Error::new().message("store skipped the enroll operation"));
    };

    result?;

    tracing::event!(Level::INFO, username = %json.username, "enrolled totp");

    Ok(auth::TotpEnrollment {
        digits,
        step,
        provisioning_uri,
    })
}

fn enroll_user(user: &mut User, password: &str, pending: &mut Option<Totp>) -> error::Result<()> {
    if user.totp.is_some() {
        return Err(Error::api((AuthKind::TotpAlreadyEnabled, "totp is already enabled for this user")));
    }

    if !user.password.verify(password)? {
        return Err(Error::api((AuthKind::InvalidCredentials, "invalid username or password")));
    }

    let Some(totp) = pending.take() else {
        return Err(Error::new().message("enroll operation ran more than once"));
    };

    user.totp = Some(totp);
    user.touch();

    Ok(())
}

pub fn disable_totp(state: &Shared, json: auth::DisableTotp) -> error::Result<()> {
    let mut outcome: Option<error::Result<()>> = None;

    let found = state.users().modify(&json.username, &mut |user| {
        outcome = Some(disable_user(user, &json.password, &json.totp));
    });

    if !found {
        return Err(Error::api((UserKind::NotFound, "user not found")));
    }

    let Some(result) = outcome else {
        return Err(Error::new().message("store skipped the disable operation"));
    };

    result?;

    tracing::event!(Level::INFO, username = %json.username, "disabled totp");

    Ok(())
}

fn disable_user(user: &mut User, password: &str, code: &str) -> error::Result<()> {
    let Some(totp) = &user.totp else {
        return Err(Error::api((AuthKind::TotpNotEnabled, "totp is not enabled for this user")));
    };

    if !user.password.verify(password)? {
        return Err(Error::api((AuthKind::InvalidCredentials, "invalid username or password")));
    }

    if !totp.verify(code) {
        return Err(Error::api((AuthKind::InvalidTotp, "invalid totp code")));
    }

    user.totp = None;
    user.touch();

    Ok(())
}

#[cfg(test)]
mod test {
    use std::time::{SystemTime, UNIX_EPOCH};

    use tfa_api::ApiErrorKind;
    use tfa_api::error::GeneralKind;

    use super::*;
    use crate::state::Config;

    fn test_state() -> Shared {
        Shared::new(Config {
            issuer: String::from("Example App")
        }).expect("failed creating state")
    }

    fn assert_kind(err: Error, kind: ApiErrorKind) {
        assert_eq!(*err.inner().kind(), kind, "unexpected error kind: {}", err);
    }

    fn secret_from_uri(uri: &str) -> String {
        let parsed = url::Url::parse(uri).expect("invalid provisioning uri");

        let Some((_, secret)) = parsed.query_pairs().find(|(k, _)| k == "secret") else {
            panic!("provisioning uri missing secret: {}", uri);
        };

        secret.into_owned()
    }

    fn current_code(secret: &str) -> String {
        let mut builder = Totp::builder();

        assert!(builder.set_secret(secret), "secret not accepted: {}", secret);

        let totp = builder.build().expect("failed building totp");
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before epoch")
            .as_secs();

        totp.code_at(now).expect("failed computing code")
    }

    #[test]
    fn sign_up_and_sign_in_without_totp() {
        let state = test_state();

        let created = sign_up(&state, auth::SignUp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
            enable_totp: false,
        }).expect("failed signing up");

        assert!(!created.totp_enabled);
        assert!(created.provisioning_uri.is_none());

        let result = sign_in(&state, auth::SignIn {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
        }).expect("failed signing in");

        assert!(matches!(result, auth::SignedIn::Authenticated));
    }

    #[test]
    fn sign_in_invalid_credentials() {
        let state = test_state();

        sign_up(&state, auth::SignUp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
            enable_totp: true,
        }).expect("failed signing up");

        let unknown = sign_in(&state, auth::SignIn {
            username: String::from("bob"),
            password: String::from("pw1-but-long-enough"),
        }).expect_err("unknown user signed in");

        assert_kind(unknown, ApiErrorKind::Auth(AuthKind::InvalidCredentials));

        let wrong = sign_in(&state, auth::SignIn {
            username: String::from("alice"),
            password: String::from("not-the-password"),
        }).expect_err("wrong password signed in");

        assert_kind(wrong, ApiErrorKind::Auth(AuthKind::InvalidCredentials));
    }

    #[test]
    fn sign_up_duplicate_username() {
        let state = test_state();

        sign_up(&state, auth::SignUp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
            enable_totp: false,
        }).expect("failed signing up");

        let err = sign_up(&state, auth::SignUp {
            username: String::from("alice"),
            password: String::from("another-password"),
            enable_totp: true,
        }).expect_err("duplicate username accepted");

        assert_kind(err, ApiErrorKind::User(UserKind::AlreadyExists));
    }

    #[test]
    fn sign_up_validation() {
        let state = test_state();

        let err = sign_up(&state, auth::SignUp {
            username: String::from("al ice"),
            password: String::from("short"),
            enable_totp: false,
        }).expect_err("invalid signup accepted");

        assert_kind(err, ApiErrorKind::General(GeneralKind::ValidationFailed));
    }

    #[test]
    fn totp_lifecycle() {
        let state = test_state();

        let created = sign_up(&state, auth::SignUp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
            enable_totp: true,
        }).expect("failed signing up");

        assert!(created.totp_enabled);

        let uri = created.provisioning_uri.expect("missing provisioning uri");
        let secret = secret_from_uri(&uri);

        let result = sign_in(&state, auth::SignIn {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
        }).expect("failed signing in");

        assert!(matches!(result, auth::SignedIn::TotpRequired { digits: 6 }));

        let wrong = submit_totp(&state, auth::SubmitTotp {
            username: String::from("alice"),
            totp: String::from("12345"),
        }).expect_err("malformed code accepted");

        assert_kind(wrong, ApiErrorKind::Auth(AuthKind::InvalidTotp));

        submit_totp(&state, auth::SubmitTotp {
            username: String::from("alice"),
            totp: current_code(&secret),
        }).expect("valid code rejected");

        // wrong otp leaves the record untouched
        let wrong = disable_totp(&state, auth::DisableTotp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
            totp: String::from("999"),
        }).expect_err("malformed code accepted for disable");

        assert_kind(wrong, ApiErrorKind::Auth(AuthKind::InvalidTotp));

        let still = sign_in(&state, auth::SignIn {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
        }).expect("failed signing in");

        assert!(matches!(still, auth::SignedIn::TotpRequired { .. }));

        // wrong password with a valid otp also leaves the record untouched
        let wrong = disable_totp(&state, auth::DisableTotp {
            username: String::from("alice"),
            password: String::from("not-the-password"),
            totp: current_code(&secret),
        }).expect_err("wrong password accepted for disable");

        assert_kind(wrong, ApiErrorKind::Auth(AuthKind::InvalidCredentials));

        disable_totp(&state, auth::DisableTotp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
            totp: current_code(&secret),
        }).expect("failed disabling totp");

        let result = sign_in(&state, auth::SignIn {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
        }).expect("failed signing in");

        assert!(matches!(result, auth::SignedIn::Authenticated));
    }

    #[test]
    fn re_enrollment_rotates_the_secret() {
        let state = test_state();

        let created = sign_up(&state, auth::SignUp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
            enable_totp: true,
        }).expect("failed signing up");

        let first = secret_from_uri(&created.provisioning_uri.expect("missing provisioning uri"));

        disable_totp(&state, auth::DisableTotp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
            totp: current_code(&first),
        }).expect("failed disabling totp");

        let enrollment = enroll_totp(&state, auth::EnrollTotp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
        }).expect("failed enrolling totp");

        let second = secret_from_uri(&enrollment.provisioning_uri);

        assert_ne!(first, second);

        let result = sign_in(&state, auth::SignIn {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
        }).expect("failed signing in");

        assert!(matches!(result, auth::SignedIn::TotpRequired { .. }));
    }

    #[test]
    fn enroll_requires_password_and_disabled_state() {
        let state = test_state();

        sign_up(&state, auth::SignUp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
            enable_totp: true,
        }).expect("failed signing up");

        let wrong = enroll_totp(&state, auth::EnrollTotp {
            username: String::from("alice"),
            password: String::from("not-the-password"),
        }).expect_err("wrong password accepted for enroll");

        assert_kind(wrong, ApiErrorKind::Auth(AuthKind::InvalidCredentials));

        let already = enroll_totp(&state, auth::EnrollTotp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
        }).expect_err("enrolled twice");

        assert_kind(already, ApiErrorKind::Auth(AuthKind::TotpAlreadyEnabled));

        let missing = enroll_totp(&state, auth::EnrollTotp {
            username: String::from("bob"),
            password: String::from("pw1-but-long-enough"),
        }).expect_err("enrolled unknown user");

        assert_kind(missing, ApiErrorKind::User(UserKind::NotFound));
    }

    #[test]
    fn submit_totp_state_errors() {
        let state = test_state();

        sign_up(&state, auth::SignUp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
            enable_totp: false,
        }).expect("failed signing up");

        let missing = submit_totp(&state, auth::SubmitTotp {
            username: String::from("bob"),
            totp: String::from("000000"),
        }).expect_err("submitted for unknown user");

        assert_kind(missing, ApiErrorKind::User(UserKind::NotFound));

        let disabled = submit_totp(&state, auth::SubmitTotp {
            username: String::from("alice"),
            totp: String::from("000000"),
        }).expect_err("submitted for totp disabled user");

        assert_kind(disabled, ApiErrorKind::Auth(AuthKind::TotpNotEnabled));
    }

    #[test]
    fn disable_totp_state_errors() {
        let state = test_state();

        sign_up(&state, auth::SignUp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
            enable_totp: false,
        }).expect("failed signing up");

        let missing = disable_totp(&state, auth::DisableTotp {
            username: String::from("bob"),
            password: String::from("pw1-but-long-enough"),
            totp: String::from("000000"),
        }).expect_err("disabled for unknown user");

        assert_kind(missing, ApiErrorKind::User(UserKind::NotFound));

        let disabled = disable_totp(&state, auth::DisableTotp {
            username: String::from("alice"),
            password: String::from("pw1-but-long-enough"),
            totp: String::from("000000"),
        }).expect_err("disabled twice");

        assert_kind(disabled, ApiErrorKind::Auth(AuthKind::TotpNotEnabled));
    }
}
