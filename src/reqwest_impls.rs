use async_trait::async_trait;
use http::Method;

use super::*;

impl From<reqwest::Error> for TransportError {
    fn from(other: reqwest::Error) -> Self {
        TransportError::new(other.to_string())
    }
}

/// `Transport` backed by a `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Uses a default `reqwest::Client`.
    pub fn new() -> Self {
        Self::default()
    }
    /// Uses a preconfigured `reqwest::Client`, e.g. one with timeouts or a proxy.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError> {
        let url = request.connect_url();
        let TransportRequest {
            method,
            params,
            headers,
            ..
        } = request;

        let builder = self.client.request(method.clone(), &url).headers(headers);
        let builder = if method == Method::GET {
            builder.query(&params)
        } else {
            builder.form(&params)
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

impl Client<ReqwestTransport> {
    /// Creates a client using `reqwest` as transport. The host must be set
    /// with `set_host` or `with_host` before sending requests.
    pub fn new(credentials: Credentials) -> Self {
        Self::with_transport(credentials, ReqwestTransport::new())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use http::header::HeaderMap;

    use super::*;

    #[tokio::test]
    async fn connection_failure_is_a_transport_error() {
        let transport = ReqwestTransport::new();
        let err = transport
            .send(TransportRequest {
                method: Method::GET,
                url: "https://127.0.0.1:1/api/userinfo".into(),
                host: "127.0.0.1".into(),
                port: 1,
                path: "/api/userinfo".into(),
                params: BTreeMap::new(),
                headers: HeaderMap::new(),
            })
            .await
            .expect_err("nothing listens on port 1");

        assert_eq!(err.code(), TRANSPORT_ERROR_CODE);
        assert!(!err.message().is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn it_can_talk_to_reference_integration() {
        let client =
            Client::new(Credentials::new(1, 2, "acc", "secret")).with_host("localhost", Some(8443));

        let result = client
            .query_user_info(crate::params::params([("token", "test|token")]))
            .await;
        println!("{:?}", result);
    }
}
