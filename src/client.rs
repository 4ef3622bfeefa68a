use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use http::Method;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::canonicalize::CanonicalizeError;
use crate::params::RequestParams;
use crate::signing::{build_sign, Credentials};
use crate::transport::{RawResponse, Transport, TransportError, TransportRequest};
use crate::{DATE_FORMAT, DATE_HEADER, NONCE_HEADER};

/// Path of the user info lookup.
pub const API_USER_INFO: &str = "/api/userinfo";
/// Path of the order query.
pub const API_GET_ORDER: &str = "/api/get-order";

/// Product part of the `User-Agent` header.
pub const SDK_NAME: &str = "MGameSDK RustClient";
/// Version part of the `User-Agent` header.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_PORT: u16 = 443;

/// Errors returned by `Client`.
///
/// Every failure of a call ends up here, network failures included; use
/// `code()` to recover the numeric code the platform's other SDKs report for
/// those.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The request could not be signed.
    #[error("Failed to sign request: {0}")]
    Signing(#[from] CanonicalizeError),
    /// The request never got an HTTP response.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    /// The response body is not the expected JSON.
    #[error("Response body json parse err: {source}, body data: {body}")]
    ResponseParse {
        /// Parser error
        #[source]
        source: serde_json::Error,
        /// The body which failed to parse
        body: String,
    },
}

impl ClientError {
    /// `TRANSPORT_ERROR_CODE` for transport failures, `None` otherwise.
    pub fn code(&self) -> Option<i32> {
        match self {
            ClientError::Transport(err) => Some(err.code()),
            _ => None,
        }
    }
}

/// Headers sent with every call: `Accept`, `User-Agent`, `X-M-Date` and
/// `X-M-Nonce`.
///
/// The nonce is the epoch second of `now` plus a random offset in
/// `[1000, 10000)`.
pub fn default_headers(now: DateTime<Utc>, rng: &mut fastrand::Rng) -> HeaderMap {
    let date = now.format(DATE_FORMAT).to_string();
    let nonce = (now.timestamp() + rng.i64(1000..10_000)).to_string();
    let user_agent = format!("{}/{}", SDK_NAME, SDK_VERSION);

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&user_agent).expect("SDK name should be a valid header value"),
    );
    headers.insert(
        HeaderName::from_static(DATE_HEADER),
        HeaderValue::from_str(&date).expect("Dates should always be valid header values"),
    );
    headers.insert(
        HeaderName::from_static(NONCE_HEADER),
        HeaderValue::from_str(&nonce).expect("Numbers should always be valid header values"),
    );
    headers
}

/// Merges caller headers over `defaults`. A caller header replaces every
/// default value of the same name.
pub fn merge_headers(mut defaults: HeaderMap, caller: HeaderMap) -> HeaderMap {
    defaults.extend(caller);
    defaults
}

/// Merges caller parameters over the public parameters.
///
/// The caller wins on conflicts, which means a caller can replace
/// `app_id`, `merchant_id` or `access_id` and get a request signed for an
/// identity other than the client's. Such overrides are logged.
pub fn merge_params(
    public: BTreeMap<String, String>,
    caller: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = public;
    for (key, value) in caller {
        if let Some(previous) = merged.insert(key.clone(), value) {
            log::warn!(
                "Caller parameter {:?} overrides public parameter (was {:?})",
                key,
                previous
            );
        }
    }
    merged
}

/// Builds `https://host[:port]path`, leaving out the standard ports.
pub fn build_url(host: &str, port: u16, path: &str) -> String {
    if port == 80 || port == 443 {
        format!("https://{}{}", host, path)
    } else {
        format!("https://{}:{}{}", host, port, path)
    }
}

/// Client for the platform APIs.
///
/// Calls are independent of each other; a client can be shared between tasks
/// as long as the transport can. The host is set through `&mut self`, so it
/// cannot change while a call borrowing the client is in flight.
#[derive(Debug, Clone)]
pub struct Client<T> {
    credentials: Credentials,
    host: String,
    port: u16,
    transport: T,
}

impl<T: Transport> Client<T> {
    /// Creates a client sending requests through `transport`.
    pub fn with_transport(credentials: Credentials, transport: T) -> Self {
        Client {
            credentials,
            host: String::new(),
            port: DEFAULT_PORT,
            transport,
        }
    }

    /// Credentials used for signing
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
    /// Gateway host
    pub fn host(&self) -> &str {
        &self.host
    }
    /// Gateway port
    pub fn port(&self) -> u16 {
        self.port
    }
    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
    /// Sets the gateway host (in-place). `None` means port 443.
    pub fn set_host(&mut self, host: impl Into<String>, port: Option<u16>) -> &mut Self {
        self.host = host.into();
        self.port = port.unwrap_or(DEFAULT_PORT);
        self
    }
    /// Sets the gateway host. `None` means port 443.
    pub fn with_host(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
        self.set_host(host, port);
        self
    }

    /// The absolute URL of `path` on the configured gateway.
    pub fn url(&self, path: &str) -> String {
        build_url(&self.host, self.port, path)
    }

    /// Builds the signed request for a call without sending it.
    ///
    /// `now` and `rng` feed the default `X-M-Date` and `X-M-Nonce` headers;
    /// caller `headers` override defaults.
    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        params: BTreeMap<String, String>,
        headers: HeaderMap,
        now: DateTime<Utc>,
        rng: &mut fastrand::Rng,
    ) -> Result<TransportRequest, ClientError> {
        let mut headers = merge_headers(default_headers(now, rng), headers);
        let url = self.url(path);
        let params = merge_params(self.credentials.public_params(), params);

        let buckets = if method == Method::GET {
            RequestParams::new().with_get(params.clone())
        } else {
            RequestParams::new().with_post(params.clone())
        };
        let signature = build_sign(
            self.credentials.access_secret(),
            &method,
            &url,
            &buckets,
            &headers,
            None,
        )?;
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&signature).expect("Base64 is always a valid header value"),
        );

        Ok(TransportRequest {
            method,
            url,
            host: self.host.clone(),
            port: self.port,
            path: path.to_owned(),
            params,
            headers,
        })
    }

    /// Signs and sends a call, returning the response without interpreting
    /// the body.
    pub async fn request_raw(
        &self,
        method: Method,
        path: &str,
        params: BTreeMap<String, String>,
        headers: Option<HeaderMap>,
    ) -> Result<RawResponse, ClientError> {
        let request = self.build_request(
            method,
            path,
            params,
            headers.unwrap_or_default(),
            Utc::now(),
            &mut fastrand::Rng::new(),
        )?;

        debug!("{} {}", request.method, request.url);
        let response = self.transport.send(request).await?;
        debug!("Response status: {}", response.status);

        Ok(response)
    }

    /// Signs and sends a call, deserializing the JSON response body.
    pub async fn request_json<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: BTreeMap<String, String>,
        headers: Option<HeaderMap>,
    ) -> Result<R, ClientError> {
        let response = self.request_raw(method, path, params, headers).await?;
        serde_json::from_str(&response.body).map_err(|source| ClientError::ResponseParse {
            source,
            body: response.body,
        })
    }

    /// Signs and sends a call, returning the JSON response body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: BTreeMap<String, String>,
        headers: Option<HeaderMap>,
    ) -> Result<serde_json::Value, ClientError> {
        self.request_json(method, path, params, headers).await
    }

    /// Looks up a user, e.g. with `{"token": "..."}`. Public parameters are
    /// added automatically.
    pub async fn query_user_info(
        &self,
        params: BTreeMap<String, String>,
    ) -> Result<serde_json::Value, ClientError> {
        self.request(Method::GET, API_USER_INFO, params, None).await
    }

    /// Looks up an order, e.g. with `{"tr_no": "..."}`. Public parameters are
    /// added automatically.
    pub async fn query_order(
        &self,
        params: BTreeMap<String, String>,
    ) -> Result<serde_json::Value, ClientError> {
        self.request(Method::GET, API_GET_ORDER, params, None).await
    }
}
