//! Blocking HTTP access to upstream APIs.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::Url;
use tracing::debug;

use crate::error::{InsightError, Result};

pub fn parse_url(url: &str) -> Result<Url> {
    url.parse()
        .map_err(|e| InsightError::InvalidInput(format!("invalid URL '{url}': {e}")))
}

pub fn fetch_bytes<C: HttpClient>(client: &C, url: Url) -> Result<Vec<u8>> {
    let req = reqwest::blocking::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req)?.error_for_status()?;
    Ok(resp.bytes()?.to_vec())
}

/// Fetches `url` and decodes the body as JSON.
pub fn fetch_json<C: HttpClient>(client: &C, url: Url) -> Result<serde_json::Value> {
    debug!(url = %url, "Requesting");
    let bytes = fetch_bytes(client, url)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Answers every request with the same body and remembers the URLs asked for.
    pub(crate) struct CannedClient {
        pub(crate) body: String,
        pub(crate) urls: RefCell<Vec<String>>,
    }

    impl CannedClient {
        pub(crate) fn new(body: &str) -> Self {
            Self {
                body: body.to_string(),
                urls: RefCell::new(Vec::new()),
            }
        }
    }

    impl HttpClient for CannedClient {
        fn execute(&self, req: reqwest::blocking::Request) -> reqwest::Result<reqwest::blocking::Response> {
            self.urls.borrow_mut().push(req.url().to_string());
            Ok(reqwest::blocking::Response::from(http::Response::new(self.body.clone())))
        }
    }

    #[test]
    fn test_parse_url() {
        assert!(parse_url("https://api.um.warszawa.pl/api/action/").is_ok());
        assert!(matches!(parse_url("not a url"), Err(InsightError::InvalidInput(_))));
    }

    #[test]
    fn test_fetch_json_decodes_body() {
        let client = CannedClient::new(r#"{"result": [1, 2]}"#);
        let value = fetch_json(&client, parse_url("http://localhost/api/").unwrap()).unwrap();

        assert_eq!(value["result"][1], 2);
        assert_eq!(client.urls.borrow().as_slice(), ["http://localhost/api/"]);
    }

    #[test]
    fn test_fetch_json_rejects_non_json() {
        let client = CannedClient::new("<html>maintenance</html>");
        let err = fetch_json(&client, parse_url("http://localhost/api/").unwrap()).unwrap_err();
        assert!(matches!(err, InsightError::Json(_)));
    }
}
