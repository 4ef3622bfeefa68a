use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use http::header::AUTHORIZATION;
use thiserror::Error;

use crate::algorithm::HttpSignature;
use crate::canonicalize::{CanonicalizeError, CanonicalizeExt, RequestLike};
use crate::{DefaultSignatureAlgorithm, DATE_FORMAT, DATE_HEADER};

/// This error indicates that we failed to verify the request. As a result
/// the request should be ignored.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VerifyingError {
    /// The request has no `Authorization` header.
    #[error("Request is not signed")]
    MissingSignature,
    /// The request does not carry an `access_id` parameter, or no key is
    /// known for it.
    #[error("No key for access id {0:?}")]
    UnknownKey(Option<String>),
    /// The canonical string could not be built.
    #[error(transparent)]
    Canonicalize(#[from] CanonicalizeError),
    /// The provided signature does not match the request.
    #[error("Signature mismatch")]
    Mismatch,
    /// The `X-M-Date` header is missing or malformed.
    #[error("Missing or malformed X-M-Date header")]
    InvalidDate,
    /// The `X-M-Date` header is further from the current time than allowed.
    #[error("X-M-Date is outside the allowed leeway")]
    StaleDate,
}

/// The verification process will use this trait to find the key belonging to
/// the `access_id` a request claims.
///
/// You do not need to implement this yourself: the `SimpleKeyProvider` type provides an
/// key store that should be suitable for many situations.
pub trait KeyProvider: Debug + Send + Sync + 'static {
    /// Returns the signature algorithm keyed with the secret of `access_id`, or `None`
    /// if the access id is unknown.
    fn provide_key(&self, access_id: &str) -> Option<&dyn HttpSignature>;
}

/// Implementation of a simple key store.
#[derive(Debug, Default, Clone)]
pub struct SimpleKeyProvider {
    keys: HashMap<String, Arc<dyn HttpSignature>>,
}

impl SimpleKeyProvider {
    /// Initializes the key store from a list of access ids and secrets.
    pub fn new<I, S, K>(key_iter: I) -> Self
    where
        I: IntoIterator<Item = (S, K)>,
        S: Into<String>,
        K: AsRef<[u8]>,
    {
        let mut provider = Self::default();
        for (access_id, secret) in key_iter {
            provider.add(access_id, DefaultSignatureAlgorithm::new(secret.as_ref()));
        }
        provider
    }

    /// Adds a key to the key store, replacing any previous key for the same access id
    pub fn add<S: Into<String>, K: HttpSignature>(&mut self, access_id: S, key: K) {
        self.keys.insert(access_id.into(), Arc::new(key));
    }
}

impl KeyProvider for SimpleKeyProvider {
    fn provide_key(&self, access_id: &str) -> Option<&dyn HttpSignature> {
        self.keys.get(access_id).map(|key| &**key)
    }
}

/// The configuration used for verifying signed requests.
#[derive(Debug, Clone)]
pub struct VerifyingConfig {
    key_provider: Arc<dyn KeyProvider>,
    validate_date: bool,
    date_leeway: Duration,
}

impl VerifyingConfig {
    /// Creates a new verifying configuration using the given key provider.
    pub fn new<KP: KeyProvider>(key_provider: KP) -> Self {
        VerifyingConfig {
            key_provider: Arc::new(key_provider),
            validate_date: true,
            date_leeway: Duration::from_secs(300),
        }
    }

    /// Returns the key provider.
    pub fn key_provider(&self) -> &dyn KeyProvider {
        &*self.key_provider
    }
    /// Returns whether the `X-M-Date` header will be compared against the current date and time.
    ///
    /// This is set to `true` by default.
    pub fn validate_date(&self) -> bool {
        self.validate_date
    }
    /// Controls whether the `X-M-Date` header will be compared against the current date and
    /// time (in-place).
    pub fn set_validate_date(&mut self, validate_date: bool) -> &mut Self {
        self.validate_date = validate_date;
        self
    }
    /// Controls whether the `X-M-Date` header will be compared against the current date and
    /// time.
    pub fn with_validate_date(mut self, validate_date: bool) -> Self {
        self.set_validate_date(validate_date);
        self
    }
    /// Returns the amount of leeway allowed in either direction when comparing dates and times
    /// from requests against the current date and time.
    ///
    /// This is set to 5 minutes by default.
    pub fn date_leeway(&self) -> Duration {
        self.date_leeway
    }
    /// Controls the amount of leeway allowed when comparing dates (in-place).
    pub fn set_date_leeway(&mut self, date_leeway: Duration) -> &mut Self {
        self.date_leeway = date_leeway;
        self
    }
    /// Controls the amount of leeway allowed when comparing dates.
    pub fn with_date_leeway(mut self, date_leeway: Duration) -> Self {
        self.set_date_leeway(date_leeway);
        self
    }
}

/// Import this trait to get access to the `verify` method on all types implementing
/// `RequestLike`.
pub trait VerifyingExt {
    /// Verify the request using the given verification configuration.
    fn verify(&self, config: &VerifyingConfig) -> Result<(), VerifyingError>;
}

impl<T: RequestLike> VerifyingExt for T {
    fn verify(&self, config: &VerifyingConfig) -> Result<(), VerifyingError> {
        let provided_signature = self
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(VerifyingError::MissingSignature)?;

        let params = self.params();
        let access_id = params
            .get()
            .get("access_id")
            .or_else(|| params.post().get("access_id"))
            .ok_or(VerifyingError::UnknownKey(None))?;
        let algorithm = config
            .key_provider
            .provide_key(access_id)
            .ok_or_else(|| VerifyingError::UnknownKey(Some(access_id.clone())))?;

        let content = self.canonicalize()?;
        if !algorithm.http_verify(content.as_bytes(), provided_signature) {
            return Err(VerifyingError::Mismatch);
        }

        if config.validate_date {
            let date_value = self
                .headers()
                .get(DATE_HEADER)
                .and_then(|value| value.to_str().ok())
                .ok_or(VerifyingError::InvalidDate)?;
            let provided_date = NaiveDateTime::parse_from_str(date_value.trim(), DATE_FORMAT)
                .map_err(|_| VerifyingError::InvalidDate)?
                .and_utc();

            // Absolute difference between the provided date and now
            let chrono_delta = provided_date.signed_duration_since(Utc::now());
            let delta = chrono_delta
                .to_std()
                .or_else(|_| (-chrono_delta).to_std())
                .map_err(|_| VerifyingError::StaleDate)?;

            if delta > config.date_leeway {
                return Err(VerifyingError::StaleDate);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use http::header::HeaderValue;
    use http::Method;

    use crate::canonicalize::header_map;
    use crate::params::{params, RequestParams};
    use crate::request::SignableRequest;
    use crate::signing::{Credentials, SigningExt};

    fn test_request(date: &str) -> SignableRequest {
        SignableRequest::new(Method::GET, "https://api.example.com/api/userinfo")
            .with_params(RequestParams::new().with_get(params([
                ("app_id", "1"),
                ("merchant_id", "2"),
                ("access_id", "acc"),
                ("token", "test|token"),
            ])))
            .with_headers(header_map(&[("X-M-Date", date), ("X-M-Nonce", "1404814211")]))
    }

    fn test_config() -> VerifyingConfig {
        VerifyingConfig::new(SimpleKeyProvider::new([("acc", "secret")]))
    }

    fn now() -> String {
        Utc::now().format(DATE_FORMAT).to_string()
    }

    #[test]
    fn accepts_request_signed_by_client() {
        let config = Credentials::new(1, 2, "acc", "secret").signing_config();
        let req = test_request(&now()).signed(&config).unwrap();

        req.verify(&test_config())
            .expect("Signature to be verified correctly");
    }

    #[test]
    fn rejects_tampered_request() {
        let config = Credentials::new(1, 2, "acc", "secret").signing_config();
        let mut req = test_request(&now()).signed(&config).unwrap();
        req.set_header(
            "x-m-nonce".parse().unwrap(),
            HeaderValue::from_static("1404814212"),
        );

        assert!(matches!(
            req.verify(&test_config()),
            Err(VerifyingError::Mismatch)
        ));
    }

    #[test]
    fn rejects_unsigned_request() {
        assert!(matches!(
            test_request(&now()).verify(&test_config()),
            Err(VerifyingError::MissingSignature)
        ));
    }

    #[test]
    fn rejects_unknown_access_id() {
        let config = Credentials::new(1, 2, "acc", "secret").signing_config();
        let req = test_request(&now()).signed(&config).unwrap();
        let verifying = VerifyingConfig::new(SimpleKeyProvider::new([("other", "secret")]));

        assert!(matches!(
            req.verify(&verifying),
            Err(VerifyingError::UnknownKey(Some(id))) if id == "acc"
        ));
    }

    #[test]
    fn rejects_wrong_secret() {
        let config = Credentials::new(1, 2, "acc", "not-the-secret").signing_config();
        let req = test_request(&now()).signed(&config).unwrap();

        assert!(matches!(
            req.verify(&test_config()),
            Err(VerifyingError::Mismatch)
        ));
    }

    #[test]
    fn stale_date_is_rejected_unless_disabled() {
        let config = Credentials::new(1, 2, "acc", "secret").signing_config();
        let req = test_request("Tue, 08 Jul 2014 09:10:11 GMT")
            .signed(&config)
            .unwrap();

        assert!(matches!(
            req.verify(&test_config()),
            Err(VerifyingError::StaleDate)
        ));
        req.verify(&test_config().with_validate_date(false))
            .expect("Signature to be verified correctly");
    }

    #[test]
    fn custom_leeway_bounds_date() {
        let config = Credentials::new(1, 2, "acc", "secret").signing_config();
        let ten_minutes_ago = (Utc::now() - chrono::Duration::minutes(10))
            .format(DATE_FORMAT)
            .to_string();
        let req = test_request(&ten_minutes_ago).signed(&config).unwrap();

        assert!(matches!(
            req.verify(&test_config()),
            Err(VerifyingError::StaleDate)
        ));
        req.verify(&test_config().with_date_leeway(Duration::from_secs(15 * 60)))
            .expect("Signature to be verified correctly");

        let mut strict = test_config();
        strict.set_date_leeway(Duration::from_secs(60));
        assert!(matches!(
            req.verify(&strict),
            Err(VerifyingError::StaleDate)
        ));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let config = Credentials::new(1, 2, "acc", "secret").signing_config();
        let req = test_request("yesterday").signed(&config).unwrap();

        assert!(matches!(
            req.verify(&test_config()),
            Err(VerifyingError::InvalidDate)
        ));
    }
}
