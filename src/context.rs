//! Item context: the scope a filter chain is evaluated in.
//!
//! A [`Context`] carries the current node, the page it belongs to, the
//! `env` map of named values, the [`Record`] of fields already computed for
//! the current object, the resolved table columns and the named page loads
//! started by `AsyncLoad`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use url::Url;

use crate::element::Columns;
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, Pending};
use crate::page::Page;
use crate::value::{FromValue, Value};

/// Ordered field values of the object being built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record<'a> {
    fields: Vec<(String, Value<'a>)>,
}

impl<'a> Record<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Set `name`, replacing a previous value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: Value<'a>) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value<'a>> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Remove `name` and convert it. A field that was never set converts
    /// from [`Value::Empty`], so `Option` fields may be absent.
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T> {
        let value = match self.fields.iter().position(|(k, _)| k == name) {
            Some(idx) => self.fields.remove(idx).1,
            None => Value::Empty,
        };
        T::from_value(value).map_err(|e| match e {
            Error::Parse { input, reason, .. } => Error::Parse {
                filter: "Record",
                input,
                reason: format!("field {name}: {reason}"),
            },
            other => other,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value<'a>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Record that no longer references any page.
    #[must_use]
    pub fn detach(self) -> Record<'static> {
        Record {
            fields: self
                .fields
                .into_iter()
                .map(|(k, v)| (k, v.detach()))
                .collect(),
        }
    }

    /// JSON object of the fields.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

enum Load {
    Pending(Pending),
    Loaded(Rc<Page>),
    Absent,
}

/// Evaluation scope of a filter chain.
#[derive(Clone)]
pub struct Context<'a> {
    page: &'a Page,
    node: Value<'a>,
    env: HashMap<String, Value<'a>>,
    record: Record<'a>,
    columns: Option<Rc<Columns>>,
    loads: Rc<RefCell<HashMap<String, Load>>>,
    fetcher: Option<Arc<dyn Fetcher>>,
}

impl<'a> Context<'a> {
    /// Context at the root of `page`, with the page parameters as env.
    #[must_use]
    pub fn new(page: &'a Page) -> Self {
        Self {
            page,
            node: page.root(),
            env: page.params().clone(),
            record: Record::new(),
            columns: None,
            loads: Rc::default(),
            fetcher: None,
        }
    }

    /// Use `fetcher` for `AsyncLoad` and pagination.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Same scope with a different current node (used by `Base`).
    #[must_use]
    pub fn rebase(&self, node: Value<'a>) -> Self {
        Self {
            node,
            ..self.clone()
        }
    }

    /// Scope of one candidate item below this one: env copied, empty record,
    /// its own loads.
    #[must_use]
    pub fn child(&self, node: Value<'a>) -> Self {
        Self {
            page: self.page,
            node,
            env: self.env.clone(),
            record: Record::new(),
            columns: self.columns.clone(),
            loads: Rc::default(),
            fetcher: self.fetcher.clone(),
        }
    }

    #[must_use]
    pub fn page(&self) -> &'a Page {
        self.page
    }

    #[must_use]
    pub fn url(&self) -> Option<&'a Url> {
        self.page.url()
    }

    #[must_use]
    pub fn node(&self) -> &Value<'a> {
        &self.node
    }

    #[must_use]
    pub fn env(&self, name: &str) -> Option<&Value<'a>> {
        self.env.get(name)
    }

    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<Value<'a>>) {
        self.env.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value<'a>> {
        self.record.get(name)
    }

    #[must_use]
    pub fn record(&self) -> &Record<'a> {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut Record<'a> {
        &mut self.record
    }

    pub(crate) fn into_record(self) -> Record<'a> {
        self.record
    }

    #[must_use]
    pub fn columns(&self) -> Option<&Columns> {
        self.columns.as_deref()
    }

    #[must_use]
    pub fn with_columns(mut self, columns: Rc<Columns>) -> Self {
        self.columns = Some(columns);
        self
    }

    #[must_use]
    pub fn fetcher(&self) -> Option<&Arc<dyn Fetcher>> {
        self.fetcher.as_ref()
    }

    /// Start loading `url` under `name`. `None` records that there is nothing
    /// to load, which `Async` reports as an empty value.
    pub fn start_load(&self, name: &str, url: Option<&str>) -> Result<()> {
        if self.loads.borrow().contains_key(name) {
            return Ok(());
        }
        let load = match url {
            None => Load::Absent,
            Some(url) => {
                let fetcher = self.fetcher.as_ref().ok_or_else(|| Error::Load {
                    name: name.to_string(),
                    reason: "no fetcher configured".to_string(),
                })?;
                Load::Pending(fetcher.open(url)?)
            }
        };
        self.loads.borrow_mut().insert(name.to_string(), load);
        Ok(())
    }

    /// Wait for the page loaded under `name`.
    ///
    /// `Ok(None)` when the load was started without a URL.
    pub fn loaded(&self, name: &str) -> Result<Option<Rc<Page>>> {
        let mut loads = self.loads.borrow_mut();
        let Some(load) = loads.get_mut(name) else {
            return Err(Error::Load {
                name: name.to_string(),
                reason: "never started".to_string(),
            });
        };
        match std::mem::replace(load, Load::Absent) {
            Load::Pending(pending) => {
                let page = Rc::new(pending.wait()?.into_page()?);
                *load = Load::Loaded(Rc::clone(&page));
                Ok(Some(page))
            }
            Load::Loaded(page) => {
                *load = Load::Loaded(Rc::clone(&page));
                Ok(Some(page))
            }
            Load::Absent => Ok(None),
        }
    }
}
