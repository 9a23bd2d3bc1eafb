use reqwest::blocking::{Request, Response};

/// Executes prepared HTTP requests. Wrappers add credentials on the way.
pub trait HttpClient {
    fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
