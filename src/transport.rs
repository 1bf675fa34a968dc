use reqwest::blocking::Client;

use crate::error::{Error, Result};

/// HTTP primitives the core needs from the outside world.
///
/// Kept deliberately small: a GET and a POST, both returning the response
/// body. Non-2xx statuses surface as [`Error::Http`] so callers can tell a
/// 404 apart from other failures (queue cancellation relies on this).
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<String>;
    fn post(&self, url: &str, body: &str) -> Result<String>;
}

/// Blocking reqwest-backed transport used by default.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("jobwright/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn check(url: &str, response: reqwest::blocking::Response) -> Result<String> {
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text()?)
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send()?;
        Self::check(url, response)
    }

    fn post(&self, url: &str, body: &str) -> Result<String> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "text/xml")
            .body(body.to_string())
            .send()?;
        Self::check(url, response)
    }
}
