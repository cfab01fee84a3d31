use derive_more::derive::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_NUM_REQUESTS: u32 = 100;
pub const DEFAULT_CONCURRENCY: u32 = 50;
pub const DEFAULT_TIMEOUT_SECS: f64 = 20.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseConfigError {
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
    #[error("Invalid header \"{0}\", expected \"Header-Name: value\"")]
    InvalidHeader(String),
    #[error("Invalid form field \"{0}\", expected \"name=value\"")]
    InvalidFormField(String),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize, Default,
)]
pub enum HttpMethod {
    #[default]
    #[display("GET")]
    #[serde(rename = "GET")]
    Get,
    #[display("POST")]
    #[serde(rename = "POST")]
    Post,
    #[display("PUT")]
    #[serde(rename = "PUT")]
    Put,
    #[display("DELETE")]
    #[serde(rename = "DELETE")]
    Delete,
    #[display("PATCH")]
    #[serde(rename = "PATCH")]
    Patch,
    #[display("HEAD")]
    #[serde(rename = "HEAD")]
    Head,
    #[display("OPTIONS")]
    #[serde(rename = "OPTIONS")]
    Options,
}

impl HttpMethod {
    /// Whether a request body is meaningful for this method.
    pub fn accepts_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl FromStr for HttpMethod {
    type Err = ParseConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(ParseConfigError::UnsupportedMethod(value.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default, derive_new::new)]
pub struct CustomHeader {
    pub key: String,
    pub value: String,
}

impl FromStr for CustomHeader {
    type Err = ParseConfigError;

    /// Parses the standard `Header-Name: value` form. Only the first colon
    /// separates name from value, so values may contain colons.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| ParseConfigError::InvalidHeader(line.to_owned()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ParseConfigError::InvalidHeader(line.to_owned()));
        }

        Ok(Self::new(key.to_owned(), value.trim().to_owned()))
    }
}

/// Form field for multipart/form-data requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FormField {
    pub name: String,
    pub value: String,
    /// Absolute path of the file to upload, if this is a file field.
    #[serde(default)]
    pub file_path: Option<String>,
    /// File name reported in Content-Disposition.
    #[serde(default)]
    pub file_name: Option<String>,
}

impl FromStr for FormField {
    type Err = ParseConfigError;

    /// Parses `name=value` or `name=@/path/to/file`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| ParseConfigError::InvalidFormField(raw.to_owned()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ParseConfigError::InvalidFormField(raw.to_owned()));
        }

        if let Some(path) = value.strip_prefix('@') {
            let file_name = std::path::Path::new(path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
            return Ok(Self {
                name: name.to_owned(),
                value: String::new(),
                file_path: Some(path.to_owned()),
                file_name,
            });
        }

        Ok(Self {
            name: name.to_owned(),
            value: value.to_owned(),
            file_path: None,
            file_name: None,
        })
    }
}

/// A requested load test run. Serialized verbatim across the engine boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    pub url: String,
    pub method: HttpMethod,
    pub num_requests: u32,
    pub concurrency: u32,
    pub use_http2: bool,
    #[serde(default)]
    pub headers: Vec<CustomHeader>,
    #[serde(default = "default_true")]
    pub follow_redirects: bool,
    /// Per-request timeout in seconds, 0 means infinite.
    #[serde(default = "default_timeout")]
    pub timeout_secs: f64,
    /// Queries per second per worker, 0 means no limit.
    #[serde(default)]
    pub rate_limit: f64,
    #[serde(default)]
    pub randomize_user_agent: bool,
    #[serde(default)]
    pub randomize_headers: bool,
    #[serde(default)]
    pub add_cache_buster: bool,
    #[serde(default)]
    pub disable_keep_alive: bool,
    /// 0 means use all available CPU cores.
    #[serde(default)]
    pub worker_threads: u32,
    /// `host:port` or `http://host:port`, empty means no proxy.
    #[serde(default)]
    pub proxy_url: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub payload_content_type: Option<String>,
    /// Multipart fields; when present the raw body is ignored.
    #[serde(default)]
    pub form_fields: Option<Vec<FormField>>,
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: HttpMethod::default(),
            num_requests: DEFAULT_NUM_REQUESTS,
            concurrency: DEFAULT_CONCURRENCY,
            use_http2: false,
            headers: Vec::new(),
            follow_redirects: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            rate_limit: 0.0,
            randomize_user_agent: false,
            randomize_headers: false,
            add_cache_buster: false,
            disable_keep_alive: false,
            worker_threads: 0,
            proxy_url: String::new(),
            body: None,
            payload_content_type: None,
            form_fields: None,
        }
    }
}

impl TestConfig {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Returns a copy with a trimmed URL and without headers whose name is
    /// blank.
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        config.url = config.url.trim().to_owned();
        config.headers.retain(|header| !header.key.trim().is_empty());
        if config.form_fields.as_ref().is_some_and(|fields| fields.is_empty()) {
            config.form_fields = None;
        }
        config
    }

    pub fn uses_multipart(&self) -> bool {
        self.form_fields
            .as_ref()
            .is_some_and(|fields| !fields.is_empty())
    }
}
