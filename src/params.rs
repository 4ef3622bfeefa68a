use std::collections::BTreeMap;

/// A file part of a multipart request. Files are carried so that callers can
/// describe a multipart request, but the platform's scheme gives no way to
/// sign their content, so canonicalizing a request with files fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name
    pub name: String,
    /// Client-side file name
    pub file_name: String,
    /// Raw file content
    pub content: Vec<u8>,
}

/// The parameter buckets of a request.
///
/// Only one of `post` and `raw_body` is meaningful for a given content type:
/// form and multipart bodies use `post`, JSON bodies use `raw_body`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    get: BTreeMap<String, String>,
    post: BTreeMap<String, String>,
    raw_body: String,
    files: Vec<FilePart>,
}

impl RequestParams {
    /// Creates an empty set of buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Query string parameters
    pub fn get(&self) -> &BTreeMap<String, String> {
        &self.get
    }
    /// Form body parameters
    pub fn post(&self) -> &BTreeMap<String, String> {
        &self.post
    }
    /// Raw request body, used for JSON content
    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }
    /// File parts of a multipart body
    pub fn files(&self) -> &[FilePart] {
        &self.files
    }

    /// Sets the query string parameters (in-place).
    pub fn set_get(&mut self, get: BTreeMap<String, String>) -> &mut Self {
        self.get = get;
        self
    }
    /// Sets the query string parameters.
    pub fn with_get(mut self, get: BTreeMap<String, String>) -> Self {
        self.set_get(get);
        self
    }
    /// Sets the form body parameters (in-place).
    pub fn set_post(&mut self, post: BTreeMap<String, String>) -> &mut Self {
        self.post = post;
        self
    }
    /// Sets the form body parameters.
    pub fn with_post(mut self, post: BTreeMap<String, String>) -> Self {
        self.set_post(post);
        self
    }
    /// Sets the raw body (in-place).
    pub fn set_raw_body(&mut self, raw_body: impl Into<String>) -> &mut Self {
        self.raw_body = raw_body.into();
        self
    }
    /// Sets the raw body.
    pub fn with_raw_body(mut self, raw_body: impl Into<String>) -> Self {
        self.set_raw_body(raw_body);
        self
    }
    /// Adds a file part (in-place).
    pub fn add_file(&mut self, file: FilePart) -> &mut Self {
        self.files.push(file);
        self
    }
    /// Adds a file part.
    pub fn with_file(mut self, file: FilePart) -> Self {
        self.add_file(file);
        self
    }

    /// Inserts a single query string parameter, replacing any previous value.
    pub fn insert_get(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.get.insert(key.into(), value.into());
        self
    }
    /// Inserts a single form body parameter, replacing any previous value.
    pub fn insert_post(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.post.insert(key.into(), value.into());
        self
    }
}

/// Builds a parameter map from string pairs. Later pairs win.
pub fn params<I, K, V>(pairs: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
