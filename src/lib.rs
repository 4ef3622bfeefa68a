#![warn(missing_docs)]
//! Server-side client for the MGame platform APIs.
//!
//! Every call is signed with the platform's canonical request scheme: the
//! method, URL, query parameters, `X-M-*` headers and (for POST) a digest of
//! the body are written out in a fixed order, and the result is signed with
//! HMAC-SHA256 using the access secret. The base64 signature travels in the
//! `Authorization` header.
//!
//! The string to sign has the form
//!
//! ```text
//! METHOD
//! CanonicalURL
//! CanonicalQueryString
//! CanonicalHeaders
//! CanonicalBody        (POST only)
//! ```
//!
//! with each line terminated by `\n`.
//!
//! ## Features
//!
//! | Feature name | Notes                                                   |
//! | ------------ | ------------------------------------------------------- |
//! | `reqwest`    | `ReqwestTransport` and `Client::new`. Enabled by default. |
//!
//! ## Example usage
//!
//! ```rust,no_run
//! use mgame_sdk::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let client = Client::new(Credentials::new(1, 2, "access-id", "access-secret"))
//!     .with_host("api.example.com", None);
//!
//! let user = client
//!     .query_user_info(params([("token", "test|token")]))
//!     .await?;
//! println!("{}", user);
//! # Ok(())
//! # }
//! ```
//!
//! Signing on its own:
//!
//! ```rust
//! use mgame_sdk::*;
//! use http::{HeaderMap, Method};
//!
//! let signature = build_sign(
//!     b"secret",
//!     &Method::GET,
//!     "https://api.example.com/api/userinfo",
//!     &RequestParams::new().with_get(params([("token", "test|token")])),
//!     &HeaderMap::new(),
//!     None,
//! )
//! .unwrap();
//! assert_eq!(signature.len(), 44);
//! ```

const DATE_FORMAT: &str = "%a, %d %b %Y %T GMT";
const DATE_HEADER: &str = "x-m-date";
const NONCE_HEADER: &str = "x-m-nonce";
type DefaultSignatureAlgorithm = algorithm::HmacSha256;
type DefaultDigestAlgorithm = algorithm::Sha256Digest;

#[macro_use]
mod macros;

mod algorithm;
pub use algorithm::*;

mod encode;
pub use encode::*;

mod header;
pub use header::*;

mod params;
pub use params::*;

mod canonicalize;
pub use canonicalize::*;

mod request;
pub use request::*;

mod signing;
pub use signing::*;

mod verifying;
pub use verifying::*;

mod transport;
pub use transport::*;

mod client;
pub use client::*;

/// Module containing a mock transport which records requests and replays
/// queued responses, for testing code built on `Client`.
pub mod mock_transport;

#[cfg(feature = "reqwest")]
mod reqwest_impls;
#[cfg(feature = "reqwest")]
pub use reqwest_impls::*;
