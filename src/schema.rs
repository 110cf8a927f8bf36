//! Declarative extraction schemas.
//!
//! A schema is a JSON document describing a list or table element of
//! untyped [`Record`]s, so that pages can be scraped without writing Rust:
//!
//! ```json
//! {
//!   "item": "tbody tr",
//!   "head": "thead th",
//!   "columns": [{"name": "date", "titles": ["Date"]}],
//!   "fields": [
//!     {"name": "date", "filter": "date", "cell": ["date"], "dayfirst": true},
//!     {"name": "label", "filter": "text", "path": "td.label", "default": ""}
//!   ],
//!   "next_page": {"filter": "absolute_link", "path": "a.next"}
//! }
//! ```
//!
//! A filter reads the current node, a `path` below it or a table `cell`;
//! `then` feeds its output to another filter.

use std::collections::BTreeMap;
use std::path::Path as FsPath;

use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::context::{Context, Record};
use crate::element::{Column, Extract, ItemElement, ListElement, Listing, TableElement};
use crate::error::{Error, Result};
use crate::filters::{
    AbsoluteLink, Attr, Capitalize, CleanDecimal, CleanText, Currency, Date, DateTime, Decode, Dict,
    Duration, Env, Field, Filter, FilterExt, HasElement, Link, Lower, Map, Nth, QueryValue,
    RawText, Regexp, Selector, Separators, Slugify, TableCell, Time, Type, TypeKind, Upper,
};
use crate::value::Value;

/// Top-level schema.
#[derive(Debug, Clone, Deserialize)]
pub struct Schema {
    /// Path of the item nodes; the page root when absent.
    pub item: Option<String>,
    /// Path of the table head cells. Makes the schema a table.
    pub head: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    pub next_page: Option<FilterSpec>,
    #[serde(default)]
    pub ignore_duplicate: bool,
    #[serde(default)]
    pub skip_on_error: bool,
    /// Env values visible to every item.
    #[serde(default)]
    pub args: BTreeMap<String, serde_json::Value>,
}

/// Column of a table schema.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(default)]
    pub titles: Vec<String>,
    /// Regular expressions matched at the start of the head cell text.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// A named field of the records.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub filter: FilterSpec,
}

/// Filters available in schemas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    #[default]
    Text,
    Raw,
    Lower,
    Upper,
    Capitalize,
    Slugify,
    Currency,
    Decimal,
    Int,
    Bool,
    Date,
    Datetime,
    Time,
    Duration,
    Attr,
    Link,
    AbsoluteLink,
    Has,
    Dict,
    Query,
    Decode,
    Regexp,
    Map,
    Env,
    Field,
    Const,
}

/// One filter and its options. Options irrelevant to the filter are
/// ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub filter: FilterKind,
    pub path: Option<String>,
    /// Candidate column names of a table cell.
    pub cell: Vec<String>,
    pub support_th: bool,
    /// `null` is a valid default, giving an empty value.
    #[serde(deserialize_with = "present")]
    pub default: Option<serde_json::Value>,
    pub then: Option<Box<FilterSpec>>,

    // text
    pub children: Option<bool>,
    pub symbols: Vec<String>,
    pub replace: Vec<(String, String)>,

    // numbers
    /// `dot`, `comma`, `french`, `us` or `si`.
    pub separators: Option<String>,
    pub minlen: Option<usize>,

    // dates
    pub dayfirst: bool,
    pub fuzzy: bool,
    pub french: bool,
    pub format: Option<String>,

    // regexp
    pub pattern: Option<String>,
    pub template: Option<String>,
    pub nth: Option<isize>,
    pub all: bool,

    // html, url, structure
    pub attr: Option<String>,
    pub key: Option<String>,
    /// Env name or field name read by `env` and `field`.
    pub var: Option<String>,
    pub map: BTreeMap<String, serde_json::Value>,
    pub value: Option<serde_json::Value>,
}

fn present<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<serde_json::Value>, D::Error> {
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Native value for a JSON literal of the schema.
fn literal(json: &serde_json::Value) -> Value<'static> {
    match json {
        serde_json::Value::Null => Value::Empty,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Number(n) => n.as_i64().map_or_else(|| Value::from(json.clone()), Value::Int),
        other => Value::from(other.clone()),
    }
}

fn required<'s>(value: Option<&'s String>, option: &str, kind: FilterKind) -> Result<&'s str> {
    value
        .map(String::as_str)
        .ok_or_else(|| Error::Schema(format!("{kind:?} filter needs `{option}`")))
}

impl FilterSpec {
    fn source(&self) -> Selector {
        if !self.cell.is_empty() {
            Selector::from(TableCell::any(self.cell.clone()).support_th(self.support_th))
        } else if let Some(path) = &self.path {
            Selector::from(path.as_str())
        } else {
            Selector::Current
        }
    }

    fn separators(&self) -> Result<Separators> {
        Ok(match self.separators.as_deref() {
            None | Some("dot") => Separators::Dot,
            Some("comma") => Separators::Comma,
            Some("french") => Separators::french(),
            Some("us") => Separators::us(),
            Some("si") => Separators::si(),
            Some(other) => return Err(Error::Schema(format!("unknown separators {other:?}"))),
        })
    }

    fn clean_text(&self, src: Selector) -> CleanText {
        let mut text = CleanText::new(src)
            .symbols(self.symbols.iter().cloned())
            .children(self.children.unwrap_or(true));
        for (before, after) in &self.replace {
            text = text.replace(before.as_str(), after.as_str());
        }
        text
    }

    /// Build the described filter.
    pub fn compile(&self) -> Result<Box<dyn Filter>> {
        let kind = self.filter;
        let src = self.source();
        let filter: Box<dyn Filter> = match kind {
            FilterKind::Text => self.clean_text(src).boxed(),
            FilterKind::Raw => RawText::new(src)
                .children(self.children.unwrap_or(false))
                .boxed(),
            FilterKind::Lower => Lower::new(src).boxed(),
            FilterKind::Upper => Upper::new(src).boxed(),
            FilterKind::Capitalize => Capitalize::new(src).boxed(),
            FilterKind::Slugify => Slugify::new(src).boxed(),
            FilterKind::Currency => Currency::new(src).boxed(),
            FilterKind::Decimal => CleanDecimal::new(src).separators(self.separators()?).boxed(),
            FilterKind::Int | FilterKind::Bool => {
                let target = if kind == FilterKind::Int {
                    TypeKind::Int
                } else {
                    TypeKind::Bool
                };
                let mut typed = Type::new(src, target);
                if let Some(minlen) = self.minlen {
                    typed = typed.minlen(Some(minlen));
                }
                typed.boxed()
            }
            FilterKind::Date | FilterKind::Datetime => {
                macro_rules! configure {
                    ($filter:expr) => {{
                        let mut f = $filter.dayfirst(self.dayfirst).fuzzy(self.fuzzy);
                        if self.french {
                            f = f.french();
                        }
                        if let Some(format) = &self.format {
                            f = f.format(format.as_str());
                        }
                        f.boxed()
                    }};
                }
                if kind == FilterKind::Date {
                    configure!(Date::new(src))
                } else {
                    configure!(DateTime::new(src))
                }
            }
            FilterKind::Time => Time::new(src).boxed(),
            FilterKind::Duration => Duration::new(src).boxed(),
            FilterKind::Attr => Attr::new(src, required(self.attr.as_ref(), "attr", kind)?).boxed(),
            FilterKind::Link => {
                Link::new(src).attr(self.attr.as_deref().unwrap_or("href")).boxed()
            }
            FilterKind::AbsoluteLink => AbsoluteLink::new(src)
                .attr(self.attr.as_deref().unwrap_or("href"))
                .boxed(),
            FilterKind::Has => HasElement::new(src).boxed(),
            FilterKind::Dict => Dict::new(required(self.path.as_ref(), "path", kind)?).boxed(),
            FilterKind::Query => {
                QueryValue::new(src, required(self.key.as_ref(), "key", kind)?).boxed()
            }
            FilterKind::Decode => Decode::new(src).boxed(),
            FilterKind::Regexp => {
                let pattern = required(self.pattern.as_ref(), "pattern", kind)?;
                Regex::new(pattern)?;
                let mut re = Regexp::new(self.clean_text(src), pattern);
                if let Some(template) = &self.template {
                    re = re.template(template.as_str());
                }
                if self.all {
                    re = re.nth(Nth::All);
                } else if let Some(nth) = self.nth {
                    re = re.nth(Nth::Index(nth));
                }
                re.boxed()
            }
            FilterKind::Map => Map::new(
                self.clean_text(src),
                self.map.iter().map(|(k, v)| (k.clone(), literal(v))),
            )
            .boxed(),
            FilterKind::Env => Env::new(required(self.var.as_ref(), "var", kind)?).boxed(),
            FilterKind::Field => Field::new(required(self.var.as_ref(), "var", kind)?).boxed(),
            FilterKind::Const => {
                let value = self
                    .value
                    .as_ref()
                    .ok_or_else(|| Error::Schema("Const filter needs `value`".to_string()))?;
                Box::new(Constant(literal(value)))
            }
        };

        let filter = match &self.then {
            Some(next) => next.compile()?.on(Selector::Filter(filter)),
            None => filter,
        };
        Ok(match &self.default {
            Some(default) => filter.or(literal(default)),
            None => filter,
        })
    }
}

/// A fixed value.
#[derive(Debug)]
struct Constant(Value<'static>);

impl Filter for Constant {
    fn name(&self) -> &'static str {
        "Const"
    }

    fn call<'a>(&self, _ctx: &Context<'a>) -> Result<Value<'a>> {
        Ok(self.0.clone())
    }
}

/// A compiled schema.
#[derive(Debug)]
pub enum Compiled {
    List(ListElement<Record<'static>>),
    Table(TableElement<Record<'static>>),
}

impl Extract<Record<'static>> for Compiled {
    fn extract(&self, ctx: &Context<'_>) -> Result<Listing<Record<'static>>> {
        match self {
            Compiled::List(list) => list.extract(ctx),
            Compiled::Table(table) => table.extract(ctx),
        }
    }
}

impl Schema {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &FsPath) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Build the list or table element of the schema.
    pub fn compile(&self) -> Result<Compiled> {
        if self.fields.is_empty() {
            return Err(Error::Schema("no fields".to_string()));
        }
        let mut item = ItemElement::<Record<'static>>::new().skip_on_error(self.skip_on_error);
        for field in &self.fields {
            item = item.field(field.name.as_str(), field.filter.compile()?);
        }

        let configure = |mut list: ListElement<Record<'static>>| -> Result<ListElement<Record<'static>>> {
            list = list.item(item).ignore_duplicate(self.ignore_duplicate);
            for (name, value) in &self.args {
                list = list.arg(name.as_str(), literal(value));
            }
            if let Some(next) = &self.next_page {
                list = list.next_page(next.compile()?);
            }
            Ok(list)
        };

        match &self.head {
            None => {
                let list = match &self.item {
                    Some(path) => ListElement::new(path.as_str()),
                    None => ListElement::root(),
                };
                Ok(Compiled::List(configure(list)?))
            }
            Some(head) => {
                let item_path = self
                    .item
                    .as_deref()
                    .ok_or_else(|| Error::Schema("a table needs `item`".to_string()))?;
                let mut table = TableElement::new(head.as_str(), item_path);
                for column in &self.columns {
                    let mut titles: Vec<Column> =
                        column.titles.iter().map(|t| Column::from(t.as_str())).collect();
                    for pattern in &column.patterns {
                        titles.push(Column::Pattern(Regex::new(pattern)?));
                    }
                    table = table.column(column.name.as_str(), titles);
                }
                let list = ListElement::new(item_path);
                let list = configure(list)?;
                Ok(Compiled::Table(table.list(|_| list)))
            }
        }
    }
}
