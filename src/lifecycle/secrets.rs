//! One-time password generation and adaptive-cost hashing.

use super::LifecycleError;
use anyhow::anyhow;
use rand::{seq::SliceRandom, Rng};

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

const ONE_TIME_SECRET_LEN: usize = 10;
const BCRYPT_COST: u32 = 10;

/// Generate a random one-time password.
///
/// The result always contains at least one lowercase letter, one uppercase
/// letter, and one digit, so it satisfies [`meets_password_policy`] and can
/// be stored as a regular account password.
#[must_use]
pub fn generate_one_time_secret() -> String {
    let mut rng = rand::thread_rng();
    let mut chars = Vec::with_capacity(ONE_TIME_SECRET_LEN);

    chars.push(LOWERCASE[rng.gen_range(0..LOWERCASE.len())]);
    chars.push(UPPERCASE[rng.gen_range(0..UPPERCASE.len())]);
    chars.push(DIGITS[rng.gen_range(0..DIGITS.len())]);

    let alphabet: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS].concat();
    while chars.len() < ONE_TIME_SECRET_LEN {
        chars.push(alphabet[rng.gen_range(0..alphabet.len())]);
    }

    chars.shuffle(&mut rng);
    chars.iter().map(|&byte| byte as char).collect()
}

/// Password strength policy applied to user-chosen and generated passwords
/// alike: at least 8 characters with a lowercase letter, an uppercase
/// letter, and a digit.
#[must_use]
pub fn meets_password_policy(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Hash a plaintext password with bcrypt at the fixed work factor.
///
/// # Errors
///
/// Hashing failures are infrastructure errors; callers surface them as the
/// generic contact-an-admin message.
pub fn hash(plaintext: &str) -> Result<String, LifecycleError> {
    bcrypt::hash(plaintext, BCRYPT_COST)
        .map_err(|err| LifecycleError::Infra(anyhow!(err).context("password hashing failed")))
}

/// Verify a candidate password against a stored digest.
///
/// # Errors
///
/// A malformed digest is an infrastructure error, never reported to the
/// caller as a wrong password.
pub fn verify(plaintext: &str, digest: &str) -> Result<bool, LifecycleError> {
    bcrypt::verify(plaintext, digest)
        .map_err(|err| LifecycleError::Infra(anyhow!(err).context("password verification failed")))
}
