use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use http::header::{HeaderMap, HeaderValue};
use http::Method;
use itertools::Itertools;
use thiserror::Error;

use crate::algorithm::HttpDigest;
use crate::encode::uri_encode;
use crate::header::{Header, PseudoHeader};
use crate::params::RequestParams;
use crate::DefaultDigestAlgorithm;

/// Content type assumed when the caller does not name one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";
const APPLICATION_JSON: &str = "application/json";

/// The types of error which may occur whilst computing the canonical "signature string"
/// for a request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CanonicalizeError {
    /// The body of a POST request has a content type the scheme cannot sign.
    #[error("Unsupported content type: {0:?}")]
    UnsupportedContentType(String),
    /// The request carries file parts. Their content would not be covered by
    /// the signature, so the request is refused instead of being signed
    /// partially.
    #[error("Signing file uploads is not supported ({0} file part(s) present)")]
    UnsignedFiles(usize),
    /// A signed header has a value which is not visible ASCII.
    #[error("Value of header {0} is not valid visible ASCII")]
    InvalidHeaderValue(String),
}

/// Base trait for all request types which can be signed or verified.
pub trait RequestLike {
    /// The request method. Only `POST` requests have a canonical body line.
    fn method(&self) -> &Method;
    /// The absolute request URL, without query string.
    fn url(&self) -> &str;
    /// The parameter buckets.
    fn params(&self) -> &RequestParams;
    /// The request headers.
    fn headers(&self) -> &HeaderMap;
    /// The content type used to select the canonical body format. `None`
    /// means `DEFAULT_CONTENT_TYPE`.
    fn content_type(&self) -> Option<&str> {
        None
    }
}

impl<T: RequestLike> RequestLike for &T {
    fn method(&self) -> &Method {
        (**self).method()
    }
    fn url(&self) -> &str {
        (**self).url()
    }
    fn params(&self) -> &RequestParams {
        (**self).params()
    }
    fn headers(&self) -> &HeaderMap {
        (**self).headers()
    }
    fn content_type(&self) -> Option<&str> {
        (**self).content_type()
    }
}

/// Extension method for computing the canonical "signature string" of a request.
pub trait CanonicalizeExt {
    /// Compute the canonical representation of this request
    fn canonicalize(&self) -> Result<SignatureString, CanonicalizeError>;
}

/// Opaque struct storing a computed signature string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureString {
    content: String,
}

impl SignatureString {
    /// Obtain a view of this signature string as a byte slice
    pub fn as_bytes(&self) -> &[u8] {
        self.content.as_bytes()
    }
    /// Obtain a view of this signature string as a string slice
    pub fn as_str(&self) -> &str {
        &self.content
    }
}

impl fmt::Display for SignatureString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.content)
    }
}

impl From<SignatureString> for String {
    fn from(other: SignatureString) -> Self {
        other.content
    }
}

impl From<SignatureString> for Vec<u8> {
    fn from(other: SignatureString) -> Self {
        other.content.into_bytes()
    }
}

impl<T: RequestLike> CanonicalizeExt for T {
    fn canonicalize(&self) -> Result<SignatureString, CanonicalizeError> {
        let params = self.params();

        let mut content = String::new();
        content.push_str(self.method().as_str());
        content.push('\n');
        content.push_str(&uri_encode(self.url(), false));
        content.push('\n');
        content.push_str(&canonical_query_string(params.get()));
        content.push('\n');
        content.push_str(&canonical_headers(self.headers())?);
        content.push('\n');

        if *self.method() == Method::POST {
            let content_type = self.content_type().unwrap_or(DEFAULT_CONTENT_TYPE);
            content.push_str(&canonical_body(content_type, params)?);
            content.push('\n');
        }

        debug!("String to sign: {:?}", content);

        Ok(SignatureString { content })
    }
}

/// Formats a parameter bucket as `key=value` pairs joined by `&`.
///
/// Keys and values are encoded independently, with `/` escaped. Entries are
/// ordered by their unencoded key.
pub fn canonical_key_values(params: &BTreeMap<String, String>) -> String {
    // `BTreeMap` iterates in key order already
    params
        .iter()
        .map(|(key, value)| format!("{}={}", uri_encode(key, true), uri_encode(value, true)))
        .join("&")
}

/// The canonical query string of a GET bucket.
pub fn canonical_query_string(get: &BTreeMap<String, String>) -> String {
    canonical_key_values(get)
}

/// Builds the canonical header block: every `x-m-*` header plus the
/// `equip_id` entry, as `name:value` lines ordered by name.
pub fn canonical_headers(headers: &HeaderMap) -> Result<String, CanonicalizeError> {
    let equip_id = match headers.get(PseudoHeader::EquipId.as_str()) {
        Some(value) => header_str(PseudoHeader::EquipId.as_str(), value)?,
        None => "",
    };

    let mut entries: Vec<(Header, &str)> = vec![(PseudoHeader::EquipId.into(), equip_id)];
    for name in headers.keys().filter(|name| Header::is_signed(name)) {
        if let Some(value) = headers.get(name) {
            entries.push((Header::from(name.clone()), header_str(name.as_str(), value)?));
        }
    }
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));

    Ok(entries
        .iter()
        .map(|(header, value)| format!("{}:{}", header.as_str(), value.trim()))
        .join("\n"))
}

/// Builds the canonical body line of a POST request: the base64 SHA-256 of
/// the body content selected by `content_type`.
pub fn canonical_body(
    content_type: &str,
    params: &RequestParams,
) -> Result<String, CanonicalizeError> {
    let content: Cow<str> = if content_type.contains(FORM_URLENCODED) {
        canonical_key_values(params.post()).into()
    } else if content_type.contains(MULTIPART_FORM_DATA) {
        if !params.files().is_empty() {
            return Err(CanonicalizeError::UnsignedFiles(params.files().len()));
        }
        canonical_key_values(params.post()).into()
    } else if content_type.contains(APPLICATION_JSON) {
        params.raw_body().into()
    } else if content_type.is_empty() && params.raw_body().is_empty() {
        "".into()
    } else {
        return Err(CanonicalizeError::UnsupportedContentType(
            content_type.to_owned(),
        ));
    };

    Ok(DefaultDigestAlgorithm::default().http_digest(content.as_bytes()))
}

fn header_str<'a>(name: &str, value: &'a HeaderValue) -> Result<&'a str, CanonicalizeError> {
    value
        .to_str()
        .map_err(|_| CanonicalizeError::InvalidHeaderValue(name.to_owned()))
}

/// Convenience for building header maps in tests and examples. Panics on
/// invalid names or values.
#[cfg(test)]
pub(crate) fn header_map(pairs: &[(&str, &str)]) -> HeaderMap {
    pairs
        .iter()
        .map(|(name, value)| {
            (
                http::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            )
        })
        .collect()
}
