//! Fetch JSON from REST APIs such as PuppetDB

use std::thread::sleep;
use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use url::Url;

use crate::collect::GatherError;

pub struct HttpClient {
    client: Client,
    retries: u8,
    retry_sleep: Duration,
}

impl HttpClient {
    /// A client whose every request gives up after `timeout`
    ///
    /// Failed requests are retried `retries` times, sleeping twice as long
    /// before each new attempt.
    pub fn new(timeout: Duration, retries: u8) -> Result<HttpClient, GatherError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpClient {
            client,
            retries,
            retry_sleep: Duration::from_millis(500),
        })
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, GatherError> {
        let mut attempts = 0;
        let mut retry_sleep = self.retry_sleep;
        loop {
            match self.get_once(url) {
                Err(GatherError::Http(e)) if attempts < self.retries => {
                    warn!("error for {}: {}. Retrying in {:?}", url, e, retry_sleep);
                    attempts += 1;
                    sleep(retry_sleep);
                    retry_sleep *= 2;
                }
                other => return other,
            }
        }
    }

    fn get_once<T: DeserializeOwned>(&self, url: &Url) -> Result<T, GatherError> {
        debug!("GET {}", url);
        let body = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()?
            .error_for_status()?
            .text()?;
        serde_json::from_str(&body).map_err(|e| {
            GatherError::Malformed(format!("{} returned invalid JSON: {}", url, e))
        })
    }
}
