//! Helper surface injected into template expressions
//!
//! Side-effecting helpers (password, keypair, certificate, UUID generation)
//! go through the [`Helpers`] trait so tests can substitute deterministic
//! fakes. `gen_names` is pure and lives here as a plain function.

use rand::{seq::SliceRandom, thread_rng};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use thiserror::Error;

const PASSWORD_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Default password length for `mkpass()`
pub const DEFAULT_PASSWORD_LENGTH: usize = 16;

/// Default subject for `self_signed_cert_gen()` without arguments
pub const DEFAULT_CERT_COMMON_NAME: &str = "www.domain.com";

/// Errors raised from helper invocations
#[derive(Debug, Error)]
pub enum HelperError {
    /// Explicit failure raised by the template author via `raise('...')`
    #[error("{message}")]
    Directive { message: String },

    /// A helper rejected its arguments
    #[error("helper {name}: {message}")]
    BadCall { name: String, message: String },

    /// A helper ran and failed
    #[error("helper {name} failed: {message}")]
    Failed { name: String, message: String },
}

/// Side-effecting helpers callable from template expressions
pub trait Helpers {
    /// Random password of `length` characters from `[A-Za-z0-9]`
    fn mkpass(&self, length: usize) -> Result<String, HelperError>;

    /// Generate a keypair; returns `(private_pem, public_pem)`
    fn keygen(&self) -> Result<(String, String), HelperError>;

    /// Issue a self-signed certificate for `common_name`;
    /// returns `(key_pem, cert_pem)`
    fn self_signed_cert_gen(&self, common_name: &str) -> Result<(String, String), HelperError>;

    /// Random v4 UUID string
    fn uuid(&self) -> Result<String, HelperError>;
}

/// Production helpers backed by rand, rcgen, and uuid
#[derive(Debug, Default)]
pub struct StdHelpers;

impl Helpers for StdHelpers {
    fn mkpass(&self, length: usize) -> Result<String, HelperError> {
        let mut rng = thread_rng();
        let password = (0..length)
            .map(|_| {
                let c = PASSWORD_CHARS
                    .choose(&mut rng)
                    .expect("password alphabet is non-empty");
                *c as char
            })
            .collect();
        Ok(password)
    }

    fn keygen(&self) -> Result<(String, String), HelperError> {
        let key_pair = KeyPair::generate().map_err(|e| HelperError::Failed {
            name: "keygen".to_string(),
            message: e.to_string(),
        })?;
        Ok((key_pair.serialize_pem(), key_pair.public_key_pem()))
    }

    fn self_signed_cert_gen(&self, common_name: &str) -> Result<(String, String), HelperError> {
        let failed = |e: rcgen::Error| HelperError::Failed {
            name: "self_signed_cert_gen".to_string(),
            message: e.to_string(),
        };

        let mut params = CertificateParams::new(vec![common_name.to_string()]).map_err(failed)?;
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        params.distinguished_name = dn;

        let key_pair = KeyPair::generate().map_err(failed)?;
        let certificate = params.self_signed(&key_pair).map_err(failed)?;

        Ok((key_pair.serialize_pem(), certificate.pem()))
    }

    fn uuid(&self) -> Result<String, HelperError> {
        Ok(uuid::Uuid::new_v4().to_string())
    }
}

/// Generate a list of resource names from a prefix and a count
///
/// The count is whatever the template supplied: a missing or unparseable
/// count coerces to 1. Count 1 returns just the prefix; count n >= 2 returns
/// `prefix-0001 .. prefix-<n>` zero-padded to four digits. Count 0 is an
/// explicit error.
pub fn gen_names(prefix: &str, count: Option<&str>) -> Result<Vec<String>, HelperError> {
    let count: i64 = count.and_then(|c| c.trim().parse().ok()).unwrap_or(1);
    if count == 0 {
        return Err(HelperError::BadCall {
            name: "gen_names".to_string(),
            message: "count cannot be 0".to_string(),
        });
    }
    if count == 1 {
        return Ok(vec![prefix.to_string()]);
    }
    Ok((1..=count).map(|i| format!("{}-{:04}", prefix, i)).collect())
}
