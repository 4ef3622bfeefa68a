use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, HOST};
use http::Method;
use thiserror::Error;
use url::{form_urlencoded, Position, Url};

use crate::canonicalize::{RequestLike, DEFAULT_CONTENT_TYPE};
use crate::params::RequestParams;

/// Error returned when the input to `from_reader` does not look like
/// a HTTP request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Reading the input failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The request line or a header line is malformed.
    #[error("Malformed HTTP request: {0}")]
    Malformed(&'static str),
    /// A header name or value could not be parsed.
    #[error("Invalid header: {0:?}")]
    InvalidHeader(String),
    /// The request target together with the `Host` header is not a valid URL.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The body of a non-form request is not UTF-8.
    #[error("Request body is not valid UTF-8")]
    BodyNotUtf8,
}

/// A request as seen by the signer: method, URL, parameter buckets, headers
/// and the content type that selects the canonical body format.
#[derive(Debug, Clone, PartialEq)]
pub struct SignableRequest {
    method: Method,
    url: String,
    params: RequestParams,
    headers: HeaderMap,
    content_type: Option<String>,
}

impl SignableRequest {
    /// Constructs a new request with empty parameters and headers. `url` is
    /// the absolute URL without query string.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: RequestParams::default(),
            headers: HeaderMap::new(),
            content_type: None,
        }
    }
    /// Sets the parameter buckets
    pub fn with_params(mut self, params: RequestParams) -> Self {
        self.params = params;
        self
    }
    /// Replaces all headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
    /// Convenience method for setting a header
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.set_header(name, value);
        self
    }
    /// Sets a header, replacing any previous value
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }
    /// Sets the content type used for the canonical body
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Parse a raw HTTP/1.1 request into a signable request.
    ///
    /// The URL is rebuilt as `https://<Host><path>`. Query parameters go to
    /// the GET bucket; a form-url-encoded body goes to the POST bucket and
    /// any other body is kept verbatim as the raw body.
    pub fn from_reader<R: BufRead>(reader: &mut R) -> Result<Self, ParseError> {
        let mut line = String::new();

        // Read request line
        reader.read_line(&mut line)?;
        let mut parts = line.split_ascii_whitespace();

        let method: Method = parts
            .next()
            .ok_or(ParseError::Malformed("missing method"))?
            .parse()
            .map_err(|_| ParseError::Malformed("invalid method"))?;
        let target = parts
            .next()
            .ok_or(ParseError::Malformed("missing request target"))?
            .to_owned();

        // Extract headers
        let mut headers = HeaderMap::new();
        let has_body = loop {
            line.truncate(0);
            if reader.read_line(&mut line)? == 0 {
                break false;
            }
            if line.trim().is_empty() {
                break true;
            }

            let (name_str, value_str) = line
                .split_once(':')
                .ok_or(ParseError::Malformed("header line without ':'"))?;
            let name_str = name_str.trim();
            let header_name: HeaderName = name_str
                .parse()
                .map_err(|_| ParseError::InvalidHeader(name_str.to_owned()))?;
            let value_str = value_str.trim();
            let header_value: HeaderValue = value_str
                .parse()
                .map_err(|_| ParseError::InvalidHeader(value_str.to_owned()))?;
            headers.append(header_name, header_value);
        };

        let body = if has_body {
            let mut body = Vec::new();
            reader.read_to_end(&mut body)?;
            body
        } else {
            Vec::new()
        };

        let full_url = if target.starts_with("http://") || target.starts_with("https://") {
            Url::parse(&target)?
        } else {
            let host = headers
                .get(HOST)
                .and_then(|host| host.to_str().ok())
                .ok_or(ParseError::Malformed("missing Host header"))?;
            Url::parse(&format!("https://{}{}", host, target))?
        };

        let mut params = RequestParams::new();
        params.set_get(full_url.query_pairs().into_owned().collect());

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        if content_type
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .contains(DEFAULT_CONTENT_TYPE)
        {
            params.set_post(form_urlencoded::parse(&body).into_owned().collect());
        } else {
            let raw_body = String::from_utf8(body).map_err(|_| ParseError::BodyNotUtf8)?;
            params.set_raw_body(raw_body);
        }

        Ok(Self {
            method,
            url: full_url[..Position::AfterPath].to_owned(),
            params,
            headers,
            content_type,
        })
    }

    /// Write out this request in standard HTTP/1.1 format
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let path = Url::parse(&self.url)
            .map(|url| url.path().to_owned())
            .unwrap_or_else(|_| self.url.clone());
        let query = encode_form(self.params.get());
        if query.is_empty() {
            writeln!(writer, "{} {} HTTP/1.1", self.method.as_str(), path)?;
        } else {
            writeln!(writer, "{} {}?{} HTTP/1.1", self.method.as_str(), path, query)?;
        }

        for (header_name, header_value) in &self.headers {
            writeln!(
                writer,
                "{}: {}",
                header_name.as_str(),
                String::from_utf8_lossy(header_value.as_bytes())
            )?;
        }

        let body = if self.params.raw_body().is_empty() {
            encode_form(self.params.post())
        } else {
            self.params.raw_body().to_owned()
        };
        if !body.is_empty() {
            writeln!(writer)?;
            writer.write_all(body.as_bytes())?;
        }

        Ok(())
    }
}

fn encode_form(params: &BTreeMap<String, String>) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

impl RequestLike for SignableRequest {
    fn method(&self) -> &Method {
        &self.method
    }
    fn url(&self) -> &str {
        &self.url
    }
    fn params(&self) -> &RequestParams {
        &self.params
    }
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::params::params;

    #[test]
    fn parses_get_request() {
        let raw = "GET /api/userinfo?token=test%7Ctoken&app_id=1 HTTP/1.1\r\n\
                   Host: api.example.com\r\n\
                   X-M-Date: Tue, 08 Jul 2014 09:10:11 GMT\r\n";
        let req = SignableRequest::from_reader(&mut raw.as_bytes()).unwrap();

        assert_eq!(req.method(), &Method::GET);
        assert_eq!(req.url(), "https://api.example.com/api/userinfo");
        assert_eq!(
            req.params().get(),
            &params([("app_id", "1"), ("token", "test|token")])
        );
        assert_eq!(
            req.headers().get("x-m-date").unwrap(),
            "Tue, 08 Jul 2014 09:10:11 GMT"
        );
        assert_eq!(req.content_type(), None);
    }

    #[test]
    fn parses_form_body_into_post_bucket() {
        let raw = "POST /api/order HTTP/1.1\n\
                   Host: api.example.com:8443\n\
                   Content-Type: application/x-www-form-urlencoded\n\
                   \n\
                   a=1&b=two+words";
        let req = SignableRequest::from_reader(&mut raw.as_bytes()).unwrap();

        assert_eq!(req.url(), "https://api.example.com:8443/api/order");
        assert_eq!(
            req.params().post(),
            &params([("a", "1"), ("b", "two words")])
        );
        assert_eq!(req.params().raw_body(), "");
    }

    #[test]
    fn keeps_json_body_verbatim() {
        let raw = "POST https://api.example.com/api/order HTTP/1.1\n\
                   Content-Type: application/json\n\
                   \n\
                   {\"x\":1}";
        let req = SignableRequest::from_reader(&mut raw.as_bytes()).unwrap();

        assert_eq!(req.params().raw_body(), r#"{"x":1}"#);
        assert!(req.params().post().is_empty());
        assert_eq!(req.content_type(), Some("application/json"));
    }

    #[test]
    fn rejects_request_without_host() {
        let raw = "GET /api/userinfo HTTP/1.1\n";
        assert!(matches!(
            SignableRequest::from_reader(&mut raw.as_bytes()),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn write_then_parse_keeps_signed_parts() {
        let req = SignableRequest::new(Method::POST, "https://api.example.com/api/order")
            .with_params(
                RequestParams::new()
                    .with_get(params([("k", "a/b")]))
                    .with_post(params([("a", "1")])),
            )
            .with_header(HOST, HeaderValue::from_static("api.example.com"))
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .with_content_type("application/x-www-form-urlencoded");

        let mut out = Vec::new();
        req.write(&mut out).unwrap();
        let parsed = SignableRequest::from_reader(&mut out.as_slice()).unwrap();

        assert_eq!(parsed, req);
    }
}
