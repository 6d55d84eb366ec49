use std::time::{SystemTime, UNIX_EPOCH};

use data_encoding::BASE32_NOPAD;
use hmac::Hmac;
use hmac::digest::{KeyInit, Mac};
use rand::RngCore;
use serde::{Serialize, Deserialize};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use tfa_lib::sec::authn::totp::{digits_valid, step_valid};

pub use tfa_lib::sec::authn::totp::Algo;

pub mod qr;

pub const SECRET_LEN: usize = 20;

pub const DEFAULT_DIGITS: u32 = 6;
pub const DEFAULT_STEP: u64 = 30;

const WINDOW_BEFORE: u64 = 1;
const WINDOW_AFTER: u64 = 1;

/// fresh random secret, base32 (RFC 4648 unpadded) over [`SECRET_LEN`] bytes
pub fn create_secret() -> Result<String, rand::Error> {
    let mut bytes = [0u8; SECRET_LEN];

    rand::thread_rng().try_fill_bytes(&mut bytes)?;

    Ok(BASE32_NOPAD.encode(&bytes))
}

#[derive(Debug)]
pub struct InvalidLabel;

pub struct TotpBuilder {
    algo: Option<Algo>,
    secret: Option<String>,
    digits: Option<u32>,
    step: Option<u64>,
}

impl TotpBuilder {
    pub fn set_algo<A>(&mut self, algo: A) -> bool
    where
        A: TryInto<Algo>
    {
        let Ok(v) = algo.try_into() else {
            return false;
        };

        self.algo = Some(v);

        true
    }

    pub fn set_secret<S>(&mut self, secret: S) -> bool
    where
        S: Into<String>
    {
        let secret = secret.into();

        if secret.is_empty() || BASE32_NOPAD.decode(secret.as_bytes()).is_err() {
            return false;
        }

        self.secret = Some(secret);

        true
    }

    pub fn set_digits(&mut self, digits: u32) -> bool {
        if !digits_valid(&digits) {
            return false;
        }

        self.digits = Some(digits);

        true
    }

    pub fn set_step(&mut self, step: u64) -> bool {
        if !step_valid(&step) {
            return false;
        }

        self.step = Some(step);

        true
    }

    pub fn build(self) -> Result<Totp, rand::Error> {
        let secret = if let Some(given) = self.secret {
            given
        } else {
            create_secret()?
        };

        Ok(Totp {
            algo: self.algo.unwrap_or(Algo::SHA1),
            secret,
            digits: self.digits.unwrap_or(DEFAULT_DIGITS),
            step: self.step.unwrap_or(DEFAULT_STEP),
        })
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Totp {
    algo: Algo,
    secret: String,
    digits: u32,
    step: u64,
}

impl Totp {
    pub fn builder() -> TotpBuilder {
        TotpBuilder {
            algo: None,
            secret: None,
            digits: None,
            step: None,
        }
    }

    /// fresh record with the interoperability defaults: SHA1, 6 digits, 30s
    pub fn generate() -> Result<Totp, rand::Error> {
        Self::builder().build()
    }

    pub fn algo(&self) -> &Algo {
        &self.algo
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn digits(&self) -> &u32 {
        &self.digits
    }

    pub fn step(&self) -> &u64 {
        &self.step
    }

    /// otpauth key uri for authenticator app enrollment. the secret is part
    /// of the returned value
    pub fn provisioning_uri<I, U>(&self, issuer: I, username: U) -> Result<String, InvalidLabel>
    where
        I: AsRef<str>,
        U: AsRef<str>
    {
        let issuer_ref = issuer.as_ref();
        let username_ref = username.as_ref();

        if issuer_ref.is_empty() || username_ref.is_empty() || self.secret.is_empty() {
            return Err(InvalidLabel);
        }

        let issuer_enc = urlencoding::encode(issuer_ref);
        let username_enc = urlencoding::encode(username_ref);

        Ok(format!(
            "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm={}&digits={}&period={}",
            issuer_enc,
            username_enc,
            self.secret,
            issuer_enc,
            self.algo.as_str(),
            self.digits,
            self.step
        ))
    }

    /// expected code for the step containing `time` (seconds since the unix
    /// epoch), zero padded to the configured digit count. None when the
    /// stored secret does not decode
    pub fn code_at(&self, time: u64) -> Option<String> {
        let counter = time.checked_div(self.step)?;

        hotp(&self.algo, &self.secret, counter, self.digits)
    }

    /// checks `code` against the step containing `time` and one step on
    /// either side. malformed codes and secrets never match
    pub fn verify_at<C>(&self, code: C, time: u64) -> bool
    where
        C: AsRef<str>
    {
        let given = code.as_ref();

        if given.len() != self.digits as usize || !given.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }

        let Some(counter) = time.checked_div(self.step) else {
            return false;
        };

        let low = counter.saturating_sub(WINDOW_BEFORE);
        let high = counter.saturating_add(WINDOW_AFTER);

        for candidate in low..=high {
            if let Some(expected) = hotp(&self.algo, &self.secret, candidate, self.digits) {
                if expected == given {
                    return true;
                }
            }
        }

        false
    }

    /// [`Totp::verify_at`] against the current system clock. a clock before
    /// the epoch fails closed
    pub fn verify<C>(&self, code: C) -> bool
    where
        C: AsRef<str>
    {
        let Ok(now) = SystemTime::now().duration_since(UNIX_EPOCH) else {
            return false;
        };

        self.verify_at(code, now.as_secs())
    }
}

/// RFC 4226 dynamic truncation of the keyed digest for `counter`
fn hotp(algo: &Algo, secret: &str, counter: u64, digits: u32) -> Option<String> {
    if secret.is_empty() {
        return None;
    }

    let key = BASE32_NOPAD.decode(secret.as_bytes()).ok()?;

    let digest = match algo {
        Algo::SHA1 => mac_digest::<Hmac<Sha1>>(&key, counter)?,
        Algo::SHA256 => mac_digest::<Hmac<Sha256>>(&key, counter)?,
        Algo::SHA512 => mac_digest::<Hmac<Sha512>>(&key, counter)?,
    };

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u64 & 0x7f) << 24)
        | ((digest[offset + 1] as u64) << 16)
        | ((digest[offset + 2] as u64) << 8)
        | (digest[offset + 3] as u64);

    let value = binary % 10u64.pow(digits);

    Some(format!("{:0width$}", value, width = digits as usize))
}

fn mac_digest<M>(key: &[u8], counter: u64) -> Option<Vec<u8>>
where
    M: Mac + KeyInit
{
    let mut mac = <M as Mac>::new_from_slice(key).ok()?;

    mac.update(&counter.to_be_bytes());

    Some(mac.finalize().into_bytes().to_vec())
}
