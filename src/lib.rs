//! # rs-sift
//!
//! Declarative scraping of HTML and JSON pages with composable filters.
//!
//! A filter reads a value from the current node (a CSS selector on HTML
//! pages, a slash path on JSON pages, or the output of another filter) and
//! transforms it: text cleaning, decimal and date parsing, regular
//! expressions, links, table cells. Elements run named filters over the
//! nodes of a page to build one object per node.
//!
//! ## Quick Start
//!
//! ```rust
//! use rs_sift::{Context, Extract, ItemElement, ListElement, Page, Record, Value};
//! use rs_sift::filters::{CleanDecimal, CleanText, Date, FilterExt};
//!
//! let page = Page::html(r#"
//!     <div class="op"><span class="date">12/03/2024</span><b>-12,50 €</b><i>Coffee</i></div>
//!     <div class="op"><span class="date">13/03/2024</span><b>1 500,00 €</b><i>Salary</i></div>
//! "#);
//!
//! let operations = ListElement::new("div.op").item(
//!     ItemElement::<Record>::new()
//!         .field("date", Date::new(CleanText::new("span.date")).dayfirst(true))
//!         .field("amount", CleanDecimal::french().on("b"))
//!         .field("label", CleanText::new("i")),
//! );
//!
//! let listing = operations.extract(&Context::new(&page))?;
//! assert_eq!(listing.items.len(), 2);
//! assert_eq!(listing.items[1].get("label"), Some(&Value::from("Salary")));
//! assert_eq!(listing.items[1].get("amount").map(ToString::to_string).as_deref(), Some("1500.00"));
//! # Ok::<(), rs_sift::Error>(())
//! ```
//!
//! ## Features
//!
//! - **Filters**: text, numbers, dates, regular expressions, links, JSON,
//!   combined with `|` (default) and `&` (chaining)
//! - **Elements**: items, lists and tables with head-resolved columns
//! - **Pagination**: follows next-page links through a [`fetch::Fetcher`]
//! - **Schemas**: the same extraction described in JSON, see [`schema`]

mod error;
mod options;
mod patterns;

/// DOM helpers over `dom_query` nodes.
pub mod dom;

/// Dynamically typed values produced by filters.
pub mod value;

/// Pages and their parsed content.
pub mod page;

/// Evaluation context: current node, environment and record.
pub mod context;

/// Page loading for pagination and asynchronous fields.
pub mod fetch;

/// Composable filters.
pub mod filters;

/// Items, lists and tables.
pub mod element;

/// Free-form date parsing.
pub mod dates;

/// Slash paths into JSON documents.
pub mod json;

/// URL utilities for resolution and query strings.
pub mod url_utils;

/// Character encoding detection and transcoding.
pub mod encoding;

/// Following next-page links.
pub mod pagination;

/// JSON extraction schemas.
pub mod schema;

// Public API - re-exports
pub use context::{Context, Record};
pub use element::{
    Column, Columns, Extract, FromRecord, ItemElement, Items, ListElement, Listing, TableElement,
};
pub use error::{Error, Result};
pub use options::Options;
pub use page::Page;
pub use pagination::paginate;
pub use schema::Schema;
pub use value::{FromValue, Value};
