use std::io::Read;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};

use crate::error::CacheError;

/// An open response body ready to be streamed to disk.
pub struct Body {
    pub reader: Box<dyn Read>,
    pub content_length: Option<u64>,
}

pub trait Transport: Send + Sync {
    /// Issues a GET for `url` and returns the body stream. A non-2xx
    /// response is an error, not a body.
    fn open(&self, url: &str) -> Result<Body, CacheError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, CacheError> {
        let mut headers = HeaderMap::new();
        // Some dataset hosts reject requests without a browser-like
        // User-Agent and Accept headers.
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                 AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/58.0.3029.110 Safari/537.36",
            ),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        // No request timeout: large dataset downloads may run arbitrarily
        // long and there is no resume support.
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| CacheError::Client(err.to_string()))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> Result<Body, CacheError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| CacheError::Transfer {
                url: url.to_string(),
                reason: err.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CacheError::TransferStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content_length = response.content_length();
        Ok(Body {
            reader: Box::new(response),
            content_length,
        })
    }
}
