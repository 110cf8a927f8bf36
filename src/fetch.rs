//! Page loading for `AsyncLoad` and pagination.
//!
//! The crate never schedules network work itself: a caller-provided
//! [`Fetcher`] starts a load and hands back a [`Pending`] that is waited on
//! only when the page is actually needed. Whether the load runs on a thread,
//! an async runtime or is served from disk is up to the fetcher.

use std::collections::HashMap;
use std::fmt;

use url::Url;

use crate::error::{Error, Result};
use crate::page::Page;

/// Raw response of a page load.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: Url,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

impl Response {
    /// Parse the body into a [`Page`] tagged with the response URL.
    pub fn into_page(self) -> Result<Page> {
        Ok(Page::from_bytes(&self.body, self.content_type.as_deref())?.with_url(self.url))
    }
}

/// A load that has been started and can be waited on once.
pub struct Pending {
    wait: Box<dyn FnOnce() -> Result<Response> + Send>,
}

impl Pending {
    /// A load that already completed.
    #[must_use]
    pub fn ready(response: Result<Response>) -> Self {
        Self::from_fn(move || response)
    }

    /// A load completed by calling `wait`.
    pub fn from_fn(wait: impl FnOnce() -> Result<Response> + Send + 'static) -> Self {
        Self {
            wait: Box::new(wait),
        }
    }

    /// Run `load` on its own thread right away.
    pub fn spawn(load: impl FnOnce() -> Result<Response> + Send + 'static) -> Self {
        let handle = std::thread::spawn(load);
        Self::from_fn(move || {
            handle.join().unwrap_or_else(|_| {
                Err(Error::Load {
                    name: "thread".to_string(),
                    reason: "fetch thread panicked".to_string(),
                })
            })
        })
    }

    /// Block until the response is available.
    pub fn wait(self) -> Result<Response> {
        (self.wait)()
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pending")
    }
}

/// Starts page loads.
pub trait Fetcher: Send + Sync {
    fn open(&self, url: &str) -> Result<Pending>;
}

/// Serves pages from memory, keyed by absolute URL.
///
/// Useful to replay saved pages offline and in tests.
#[derive(Debug, Default, Clone)]
pub struct StaticFetcher {
    pages: HashMap<String, (Vec<u8>, Option<String>)>,
}

impl StaticFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an HTML body for `url`.
    #[must_use]
    pub fn with_html(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            (body.as_bytes().to_vec(), Some("text/html; charset=utf-8".to_string())),
        );
        self
    }

    /// Register a JSON body for `url`.
    #[must_use]
    pub fn with_json(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            (body.as_bytes().to_vec(), Some("application/json".to_string())),
        );
        self
    }
}

impl Fetcher for StaticFetcher {
    fn open(&self, url: &str) -> Result<Pending> {
        let Some((body, content_type)) = self.pages.get(url) else {
            return Err(Error::Load {
                name: url.to_string(),
                reason: "no such page".to_string(),
            });
        };
        let parsed = Url::parse(url).map_err(|e| Error::Load {
            name: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Pending::ready(Ok(Response {
            url: parsed,
            body: body.clone(),
            content_type: content_type.clone(),
        })))
    }
}

/// Blocking HTTP fetcher running each load on its own thread.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("rs-sift/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Load {
                name: "client".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl Fetcher for HttpFetcher {
    fn open(&self, url: &str) -> Result<Pending> {
        let client = self.client.clone();
        let url = url.to_string();
        tracing::debug!("Fetching {}", url);
        Ok(Pending::spawn(move || {
            let load_err = |e: reqwest::Error| Error::Load {
                name: url.clone(),
                reason: e.to_string(),
            };
            let response = client
                .get(&url)
                .send()
                .and_then(reqwest::blocking::Response::error_for_status)
                .map_err(load_err)?;
            let final_url = response.url().clone();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().map_err(load_err)?.to_vec();
            Ok(Response {
                url: final_url,
                body,
                content_type,
            })
        }))
    }
}
