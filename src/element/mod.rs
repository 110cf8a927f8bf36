//! Elements: declarative extraction of objects from a page.
//!
//! An [`ItemElement`] turns one node into one object by evaluating named
//! fields. A [`ListElement`] finds the candidate nodes of a page and runs its
//! item elements on each of them. A [`TableElement`] is a list element that
//! first resolves named columns from the table head, so that fields can read
//! cells with `TableCell`.

mod item;
mod list;
mod table;

pub use item::ItemElement;
pub use list::{Items, ListElement};
pub use table::{Column, TableElement};

use std::collections::HashMap;

use crate::context::{Context, Record};
use crate::error::Result;

/// Target object of an item element.
pub trait FromRecord: Sized {
    /// Build the object from the fields computed for it.
    fn from_record(record: Record<'_>) -> Result<Self>;

    /// Identifier used to detect duplicates within a list. Objects without
    /// an id are never considered duplicates.
    fn id(&self) -> Option<String> {
        None
    }
}

/// Untyped records keep every field, detached from the page. The `id` field,
/// when present and non-empty, is the record id.
impl FromRecord for Record<'static> {
    fn from_record(record: Record<'_>) -> Result<Self> {
        Ok(record.detach())
    }

    fn id(&self) -> Option<String> {
        self.get("id")
            .and_then(crate::value::Value::to_text)
            .filter(|id| !id.is_empty())
    }
}

/// Column name to cell index, resolved from a table head.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns {
    indices: HashMap<String, usize>,
}

impl Columns {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `name`, if it was resolved.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, index: usize) {
        self.indices.insert(name.into(), index);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.indices.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for Columns {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        Self {
            indices: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Objects extracted from one page, and the link to the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    /// Absolute when the page has a URL.
    pub next_page: Option<String>,
}

/// Anything able to extract a [`Listing`] from a page.
pub trait Extract<T> {
    fn extract(&self, ctx: &Context<'_>) -> Result<Listing<T>>;
}
