use crate::fetch::client::HttpClient;

/// An [`HttpClient`] wrapper that appends an API key as a URL query parameter.
///
/// `param_name` is the query parameter name (e.g. `"apikey"`) and `key` is
/// its value. The key is added only when the request is executed, so URLs
/// built beforehand are safe to log.
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub key: String,
}

impl<C> UrlParam<C> {
    /// Wraps `inner` with the `apikey` parameter used by the UM Warszawa API.
    pub fn api_key(inner: C, key: impl Into<String>) -> Self {
        Self {
            inner,
            param_name: "apikey".to_string(),
            key: key.into(),
        }
    }
}

impl<C: HttpClient> HttpClient for UrlParam<C> {
    fn execute(&self, mut req: reqwest::blocking::Request) -> reqwest::Result<reqwest::blocking::Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.key);
        self.inner.execute(req)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::CannedClient;

    #[test]
    fn test_api_key_is_appended() {
        let client = UrlParam::api_key(CannedClient::new("{}"), "secret");
        let url = reqwest::Url::parse("https://api.um.warszawa.pl/api/action/dbstore_get/?id=abc").unwrap();

        client
            .execute(reqwest::blocking::Request::new(reqwest::Method::GET, url))
            .unwrap();

        assert_eq!(
            client.inner.urls.borrow().as_slice(),
            ["https://api.um.warszawa.pl/api/action/dbstore_get/?id=abc&apikey=secret"]
        );
    }
}
