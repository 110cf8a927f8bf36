use std::fmt;

use super::FromRecord;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::filters::Selector;
use crate::value::Value;

type Condition = dyn Fn(&Context<'_>) -> bool;
type ParseHook = dyn Fn(&mut Context<'_>) -> Result<()>;
type Validate<T> = dyn Fn(&T) -> bool;

enum Step {
    Field(String, Selector),
    Load(String, Selector),
}

/// Builds one object from the current node.
///
/// Per candidate node, in order: the environment is copied from the parent,
/// `condition` is checked, `parse` runs, then fields and loaders are
/// evaluated in declaration order (each field sees the previous ones through
/// `Field`), the record is converted with [`FromRecord`] and `validate` runs.
///
/// [`Error::Skip`] raised anywhere drops the object. With
/// [`skip_on_error`](Self::skip_on_error) every error does; otherwise the
/// error is logged with the field name and returned.
///
/// ```rust
/// use rs_sift::{Context, ItemElement, Page, Record, Value};
/// use rs_sift::filters::{CleanDecimal, CleanText, FilterExt};
///
/// let page = Page::html(r#"<div><h2> Savings </h2><b>1 024,50</b></div>"#);
/// let ctx = Context::new(&page);
/// let account = ItemElement::<Record>::new()
///     .field("label", CleanText::new("h2"))
///     .field("balance", CleanDecimal::french().on("b"));
/// let record = account.build(&ctx)?.expect("kept");
/// assert_eq!(record.get("label"), Some(&Value::from("Savings")));
/// # Ok::<(), rs_sift::Error>(())
/// ```
pub struct ItemElement<T> {
    name: String,
    steps: Vec<Step>,
    condition: Option<Box<Condition>>,
    parse: Option<Box<ParseHook>>,
    validate: Option<Box<Validate<T>>>,
    skip_on_error: bool,
}

impl<T: FromRecord> Default for ItemElement<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromRecord> ItemElement<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "item".to_string(),
            steps: Vec::new(),
            condition: None,
            parse: None,
            validate: None,
            skip_on_error: false,
        }
    }

    /// Name used in log messages.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Compute `name` with a filter, a path, a closure or a constant.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, selector: impl Into<Selector>) -> Self {
        self.steps.push(Step::Field(name.into(), selector.into()));
        self
    }

    /// Start loading the URL given by `selector` under `name`, for `Async`
    /// filters. Loaders are also started up front by list elements, before
    /// any object of the page is built.
    #[must_use]
    pub fn loader(mut self, name: impl Into<String>, selector: impl Into<Selector>) -> Self {
        self.steps.push(Step::Load(name.into(), selector.into()));
        self
    }

    /// Only build objects for nodes where `condition` holds.
    #[must_use]
    pub fn condition(mut self, condition: impl Fn(&Context<'_>) -> bool + 'static) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }

    /// Hook run before the fields, typically to store env values.
    #[must_use]
    pub fn parse(mut self, parse: impl Fn(&mut Context<'_>) -> Result<()> + 'static) -> Self {
        self.parse = Some(Box::new(parse));
        self
    }

    /// Drop built objects for which `validate` is false.
    #[must_use]
    pub fn validate(mut self, validate: impl Fn(&T) -> bool + 'static) -> Self {
        self.validate = Some(Box::new(validate));
        self
    }

    /// Drop the object instead of failing when a field raises.
    #[must_use]
    pub fn skip_on_error(mut self, skip: bool) -> Self {
        self.skip_on_error = skip;
        self
    }

    /// Build the object for the current node of `ctx`.
    ///
    /// `Ok(None)` when the object was skipped, rejected by `condition` or by
    /// `validate`.
    pub fn build(&self, ctx: &Context<'_>) -> Result<Option<T>> {
        let item = self.prepare(ctx, ctx.node().clone());
        self.complete(item)
    }

    /// Scope of `node` with the loaders that can already be evaluated
    /// started.
    pub(crate) fn prepare<'a>(&self, parent: &Context<'a>, node: Value<'a>) -> Context<'a> {
        let item = parent.child(node);
        for step in &self.steps {
            if let Step::Load(name, selector) = step {
                if let Err(e) = self.start_load(&item, name, selector) {
                    tracing::trace!(item = %self.name, loader = %name, error = %e, "loader deferred");
                }
            }
        }
        item
    }

    pub(crate) fn complete(&self, mut item: Context<'_>) -> Result<Option<T>> {
        if let Some(condition) = &self.condition {
            if !condition(&item) {
                return Ok(None);
            }
        }
        if let Some(parse) = &self.parse {
            if let Err(e) = parse(&mut item) {
                return self.give_up("parse", e);
            }
        }

        for step in &self.steps {
            match step {
                Step::Field(name, selector) => match selector.select(&item, "ItemElement") {
                    Ok(value) => {
                        tracing::trace!(item = %self.name, field = %name, value = ?value);
                        item.record_mut().insert(name.as_str(), value);
                    }
                    Err(e) => return self.give_up(name, e),
                },
                Step::Load(name, selector) => {
                    if let Err(e) = self.start_load(&item, name, selector) {
                        return self.give_up(name, e);
                    }
                }
            }
        }

        let obj = match T::from_record(item.into_record()) {
            Ok(obj) => obj,
            Err(e) => return self.give_up("record", e),
        };
        if let Some(validate) = &self.validate {
            if !validate(&obj) {
                tracing::debug!(item = %self.name, "object rejected by validate");
                return Ok(None);
            }
        }
        Ok(Some(obj))
    }

    fn start_load(&self, item: &Context<'_>, name: &str, selector: &Selector) -> Result<()> {
        let url = match selector.select(item, "ItemElement")? {
            Value::Empty => None,
            other => other.to_text().filter(|url| !url.trim().is_empty()),
        };
        item.start_load(name, url.as_deref())
    }

    fn give_up(&self, key: &str, err: Error) -> Result<Option<T>> {
        if err.is_skip() {
            tracing::debug!(item = %self.name, key, "item skipped");
            return Ok(None);
        }
        tracing::warn!(item = %self.name, key, error = %err, "attribute raised an error");
        if self.skip_on_error {
            Ok(None)
        } else {
            Err(err)
        }
    }
}

impl<T> fmt::Debug for ItemElement<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self
            .steps
            .iter()
            .map(|step| match step {
                Step::Field(name, _) | Step::Load(name, _) => name.as_str(),
            })
            .collect();
        f.debug_struct("ItemElement")
            .field("name", &self.name)
            .field("steps", &fields)
            .field("skip_on_error", &self.skip_on_error)
            .finish_non_exhaustive()
    }
}
