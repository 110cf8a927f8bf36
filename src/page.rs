//! Parsed documents filters run against.
//!
//! A [`Page`] is either an HTML tree or a JSON value, optionally tagged with
//! the URL it was loaded from and with named parameters that seed the
//! environment of every item extracted from it.

use std::collections::HashMap;
use std::fmt;

use encoding_rs::{Encoding, UTF_8};
use url::Url;

use crate::dom::{self, Document};
use crate::encoding;
use crate::error::Result;
use crate::value::Value;

/// Parsed body of a page.
pub enum Content {
    Html(Document),
    Json(serde_json::Value),
}

/// A parsed document plus its URL and parameters.
pub struct Page {
    content: Content,
    url: Option<Url>,
    params: HashMap<String, Value<'static>>,
    encoding: &'static Encoding,
}

impl Page {
    /// Parse an HTML document.
    #[must_use]
    pub fn html(html: &str) -> Self {
        Self::from_content(Content::Html(dom::parse(html)))
    }

    /// Parse a JSON document.
    pub fn json(text: &str) -> Result<Self> {
        Ok(Self::from_json_value(serde_json::from_str(text)?))
    }

    /// Wrap an already parsed JSON value.
    #[must_use]
    pub fn from_json_value(value: serde_json::Value) -> Self {
        Self::from_content(Content::Json(value))
    }

    /// Build a page from a raw response body.
    ///
    /// A `Content-Type` mentioning `json` selects the JSON parser; anything
    /// else is decoded (see [`encoding::decode`]) and parsed as HTML.
    pub fn from_bytes(body: &[u8], content_type: Option<&str>) -> Result<Self> {
        let detected = encoding::detect_encoding(body, content_type);
        let text = encoding::decode(body, content_type);
        let is_json = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
        let page = if is_json {
            Self::json(&text)?
        } else {
            Self::html(&text)
        };
        Ok(page.with_encoding(detected))
    }

    fn from_content(content: Content) -> Self {
        Self {
            content,
            url: None,
            params: HashMap::new(),
            encoding: UTF_8,
        }
    }

    /// Set the character encoding the page was served in.
    #[must_use]
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the URL the page was loaded from. Relative links resolve against it.
    #[must_use]
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Add a parameter visible through `Env` in every item of the page.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value<'static>>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Encoding of the response body, UTF-8 unless detected otherwise.
    #[must_use]
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    #[must_use]
    pub fn params(&self) -> &HashMap<String, Value<'static>> {
        &self.params
    }

    #[must_use]
    pub fn content(&self) -> &Content {
        &self.content
    }

    #[must_use]
    pub fn is_html(&self) -> bool {
        matches!(self.content, Content::Html(_))
    }

    /// Root node of the document as a value: the HTML document node or the
    /// whole JSON value.
    #[must_use]
    pub fn root(&self) -> Value<'_> {
        match &self.content {
            Content::Html(doc) => Value::node(doc.root()),
            Content::Json(json) => Value::json(json),
        }
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("kind", &if self.is_html() { "html" } else { "json" })
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("params", &self.params)
            .field("encoding", &self.encoding.name())
            .finish()
    }
}
