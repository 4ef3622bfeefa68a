use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use http::Method;

use crate::algorithm::HttpSignature;
use crate::canonicalize::{CanonicalizeError, CanonicalizeExt, RequestLike};
use crate::params::RequestParams;
use crate::DefaultSignatureAlgorithm;

/// A request which can carry the `Authorization` header once signed.
pub trait ClientRequestLike: RequestLike {
    /// Sets a header, replacing any previous value.
    fn set_header(&mut self, header: HeaderName, value: HeaderValue);
}

impl ClientRequestLike for crate::request::SignableRequest {
    fn set_header(&mut self, header: HeaderName, value: HeaderValue) {
        crate::request::SignableRequest::set_header(self, header, value)
    }
}

/// Identity of a game server on the platform.
///
/// The access secret only ever feeds the HMAC; it is not sent and is left
/// out of the `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    app_id: u64,
    merchant_id: u64,
    access_id: String,
    access_secret: Vec<u8>,
}

impl Credentials {
    /// Creates a new set of credentials
    pub fn new(
        app_id: u64,
        merchant_id: u64,
        access_id: impl Into<String>,
        access_secret: impl AsRef<[u8]>,
    ) -> Self {
        Self {
            app_id,
            merchant_id,
            access_id: access_id.into(),
            access_secret: access_secret.as_ref().to_vec(),
        }
    }

    /// Game id
    pub fn app_id(&self) -> u64 {
        self.app_id
    }
    /// Merchant id
    pub fn merchant_id(&self) -> u64 {
        self.merchant_id
    }
    /// Id of this game server
    pub fn access_id(&self) -> &str {
        &self.access_id
    }
    /// Secret of this game server
    pub fn access_secret(&self) -> &[u8] {
        &self.access_secret
    }

    /// The parameters sent with every call: `app_id`, `merchant_id` and
    /// `access_id`.
    pub fn public_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("app_id".to_owned(), self.app_id.to_string());
        params.insert("merchant_id".to_owned(), self.merchant_id.to_string());
        params.insert("access_id".to_owned(), self.access_id.clone());
        params
    }

    /// A signing configuration keyed with this access secret.
    pub fn signing_config(&self) -> SigningConfig {
        SigningConfig::new_default(&self.access_secret)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("merchant_id", &self.merchant_id)
            .field("access_id", &self.access_id)
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

/// The configuration used for signing requests.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    signature: Arc<dyn HttpSignature>,
}

impl SigningConfig {
    /// Signs with HMAC-SHA256 keyed with `key`.
    pub fn new_default(key: &[u8]) -> Self {
        Self::new(DefaultSignatureAlgorithm::new(key))
    }

    /// Signs with the given algorithm.
    pub fn new<SigAlg: HttpSignature>(signature: SigAlg) -> Self {
        SigningConfig {
            signature: Arc::new(signature),
        }
    }
}

/// Import this trait to get access to the `sign` and `signed` methods on all types
/// implementing `ClientRequestLike`.
pub trait SigningExt: Sized {
    /// Signs the request and returns it.
    fn signed(mut self, config: &SigningConfig) -> Result<Self, CanonicalizeError> {
        self.sign(config)?;
        Ok(self)
    }

    /// Computes the signature, stores it in the `Authorization` header and
    /// returns it.
    fn sign(&mut self, config: &SigningConfig) -> Result<String, CanonicalizeError>;
}

impl<R: ClientRequestLike> SigningExt for R {
    fn sign(&mut self, config: &SigningConfig) -> Result<String, CanonicalizeError> {
        let content = self.canonicalize()?;
        let signature = config.signature.http_sign(content.as_bytes());

        self.set_header(
            AUTHORIZATION,
            HeaderValue::from_str(&signature).expect("Base64 is always a valid header value"),
        );

        Ok(signature)
    }
}

struct BorrowedRequest<'a> {
    method: &'a Method,
    uri: &'a str,
    params: &'a RequestParams,
    headers: &'a HeaderMap,
    content_type: Option<&'a str>,
}

impl RequestLike for BorrowedRequest<'_> {
    fn method(&self) -> &Method {
        self.method
    }
    fn url(&self) -> &str {
        self.uri
    }
    fn params(&self) -> &RequestParams {
        self.params
    }
    fn headers(&self) -> &HeaderMap {
        self.headers
    }
    fn content_type(&self) -> Option<&str> {
        self.content_type
    }
}

/// Computes the base64 HMAC-SHA256 signature of a request.
///
/// `uri` is the absolute URL without query string; query parameters belong in
/// the GET bucket of `params`. `content_type` defaults to
/// `application/x-www-form-urlencoded` and only matters for POST requests.
pub fn build_sign(
    secret: &[u8],
    method: &Method,
    uri: &str,
    params: &RequestParams,
    headers: &HeaderMap,
    content_type: Option<&str>,
) -> Result<String, CanonicalizeError> {
    let content = BorrowedRequest {
        method,
        uri,
        params,
        headers,
        content_type,
    }
    .canonicalize()?;

    Ok(DefaultSignatureAlgorithm::new(secret).http_sign(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::canonicalize::header_map;
    use crate::params::params;
    use crate::request::SignableRequest;

    const USER_INFO_URL: &str = "https://api.example.com/api/userinfo";

    fn platform_headers() -> HeaderMap {
        header_map(&[
            ("X-M-Date", "Tue, 08 Jul 2014 09:10:11 GMT"),
            ("X-M-Nonce", "1404814211"),
        ])
    }

    fn user_info_params() -> RequestParams {
        RequestParams::new().with_get(params([
            ("app_id", "1"),
            ("merchant_id", "2"),
            ("access_id", "acc"),
            ("token", "test|token"),
        ]))
    }

    #[test]
    fn it_works() {
        let signature = build_sign(
            b"secret",
            &Method::GET,
            USER_INFO_URL,
            &user_info_params(),
            &platform_headers(),
            None,
        )
        .unwrap();

        assert_eq!(signature, "5t9tBdjZ93azv/0Y3FWV4GQYexb4iM3ecmRdeGS4f/w=");
    }

    #[test]
    fn signing_is_deterministic() {
        let sign = || {
            build_sign(
                b"secret",
                &Method::GET,
                USER_INFO_URL,
                &user_info_params(),
                &platform_headers(),
                None,
            )
            .unwrap()
        };
        assert_eq!(sign(), sign());
    }

    fn sign_get(secret: &[u8], url: &str, params: &RequestParams, headers: &HeaderMap) -> String {
        build_sign(secret, &Method::GET, url, params, headers, None).unwrap()
    }

    #[test]
    fn unrelated_header_does_not_change_signature() {
        let mut headers = platform_headers();
        let before = sign_get(b"secret", USER_INFO_URL, &user_info_params(), &headers);
        headers.insert("foo", HeaderValue::from_static("bar"));
        let after = sign_get(b"secret", USER_INFO_URL, &user_info_params(), &headers);

        assert_eq!(before, after);
    }

    #[test]
    fn any_mutation_invalidates_signature() {
        let base = sign_get(b"secret", USER_INFO_URL, &user_info_params(), &platform_headers());

        let mut params = user_info_params();
        params.insert_get("token", "other");
        let mut headers = platform_headers();
        headers.insert("x-m-nonce", HeaderValue::from_static("1404814212"));
        let post = build_sign(
            b"secret",
            &Method::POST,
            USER_INFO_URL,
            &user_info_params(),
            &platform_headers(),
            None,
        )
        .unwrap();

        for other in [
            sign_get(b"secret2", USER_INFO_URL, &user_info_params(), &platform_headers()),
            sign_get(
                b"secret",
                "https://api.example.com/api/get-order",
                &user_info_params(),
                &platform_headers(),
            ),
            sign_get(b"secret", USER_INFO_URL, &params, &platform_headers()),
            sign_get(b"secret", USER_INFO_URL, &user_info_params(), &headers),
            post,
        ] {
            assert_ne!(other, base);
        }
    }

    #[test]
    fn post_form_signature() {
        let signature = build_sign(
            b"secret",
            &Method::POST,
            "https://api.example.com/api/order",
            &RequestParams::new().with_post(params([("a", "1")])),
            &platform_headers(),
            Some("application/x-www-form-urlencoded"),
        )
        .unwrap();

        assert_eq!(signature, "4GYuioBRpYLI3kujFTYNEt0LhzTPiv4Ql3JHNDrDUNM=");
    }

    #[test]
    fn post_json_signature() {
        let signature = build_sign(
            b"secret",
            &Method::POST,
            "https://api.example.com/api/order",
            &RequestParams::new().with_raw_body(r#"{"x":1}"#),
            &platform_headers(),
            Some("application/json"),
        )
        .unwrap();

        assert_eq!(signature, "TkLe2tgYHTDhzc4fo0Qx2qaBRt9JRuurRRTezR2hvUw=");
    }

    #[test]
    fn unsupported_content_type_is_an_error() {
        let result = build_sign(
            b"secret",
            &Method::POST,
            "https://api.example.com/api/order",
            &RequestParams::new().with_raw_body("hello"),
            &platform_headers(),
            Some("text/plain"),
        );

        assert!(matches!(
            result,
            Err(CanonicalizeError::UnsupportedContentType(_))
        ));
    }

    #[test]
    fn signing_ext_sets_authorization() {
        let config = Credentials::new(1, 2, "acc", "secret").signing_config();
        let req = SignableRequest::new(Method::GET, USER_INFO_URL)
            .with_params(user_info_params())
            .with_headers(platform_headers())
            .signed(&config)
            .unwrap();

        assert_eq!(
            req.headers().get(AUTHORIZATION).unwrap(),
            "5t9tBdjZ93azv/0Y3FWV4GQYexb4iM3ecmRdeGS4f/w="
        );
    }

    #[test]
    fn authorization_header_is_not_signed() {
        let config = SigningConfig::new_default(b"secret");
        let mut req = SignableRequest::new(Method::GET, USER_INFO_URL)
            .with_params(user_info_params())
            .with_headers(platform_headers());

        let first = req.sign(&config).unwrap();
        let second = req.sign(&config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let credentials = Credentials::new(1, 2, "acc", "secret");
        let debug = format!("{:?}", credentials);

        assert!(debug.contains("acc"));
        assert!(!debug.contains("secret\""));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn public_params() {
        assert_eq!(
            Credentials::new(1, 2, "acc", "secret").public_params(),
            params([("app_id", "1"), ("merchant_id", "2"), ("access_id", "acc")])
        );
    }
}
