//! JSON filters.

use super::{filter_ops, FilterBase, Path, Selector, Transform};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::value::Value;

/// Value at a slash path below the current JSON node.
///
/// Strings come out as text and `null` as [`Value::Empty`]; other values
/// stay JSON so that `CleanDecimal` or `Type` can read them exactly.
///
/// ```rust
/// use rs_sift::{Context, Page, Value};
/// use rs_sift::filters::{Dict, Filter};
///
/// let page = Page::json(r#"{"account": {"label": "Checking", "iban": null}}"#)?;
/// let ctx = Context::new(&page);
/// assert_eq!(Dict::new("account/label").call(&ctx)?, Value::from("Checking"));
/// assert_eq!(Dict::new("account/iban").call(&ctx)?, Value::Empty);
/// # Ok::<(), rs_sift::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Dict {
    base: FilterBase,
}

impl Dict {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            base: FilterBase::new(Selector::Path(Path::new(path))),
        }
    }
}

impl Transform for Dict {
    const NAME: &'static str = "Dict";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        match value {
            Value::Json(json) => match json.as_ref() {
                serde_json::Value::Null => Ok(Value::Empty),
                serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
                _ => Ok(Value::Json(json)),
            },
            list @ Value::List(_) => Ok(list),
            other => Err(Error::parse(
                Self::NAME,
                other.to_text().unwrap_or_default(),
                format!("expected JSON, got {}", other.kind()),
            )),
        }
    }
}

filter_ops!(Dict);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{CleanDecimal, Filter, FilterExt};
    use crate::page::Page;
    use rust_decimal::Decimal;

    const DOC: &str = r#"{"ops": [{"amount": "-12,50"}, {"amount": 3.25}], "meta": {"n": 2}}"#;

    #[test]
    fn test_dict_values() {
        let page = Page::json(DOC).unwrap();
        let ctx = Context::new(&page);
        assert_eq!(Dict::new("meta/n").call(&ctx).unwrap().to_json(), serde_json::json!(2));
        let amounts = Dict::new("ops/*/amount").call(&ctx).unwrap();
        assert!(matches!(amounts, Value::List(ref items) if items.len() == 2));
    }

    #[test]
    fn test_missing_key_and_default() {
        let page = Page::json(DOC).unwrap();
        let ctx = Context::new(&page);
        assert!(Dict::new("meta/x").call(&ctx).unwrap_err().is_missing());
        let f = Dict::new("meta/x") | 0;
        assert_eq!(f.call(&ctx).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_dict_feeds_clean_decimal() {
        let page = Page::json(DOC).unwrap();
        let ctx = Context::new(&page);
        let f = CleanDecimal::french().on(Dict::new("ops/0/amount"));
        assert_eq!(f.call(&ctx).unwrap(), Value::Decimal(Decimal::new(-1250, 2)));
        let f = Dict::new("ops/1/amount") & CleanDecimal::new(Selector::Current);
        assert_eq!(f.call(&ctx).unwrap(), Value::Decimal(Decimal::new(325, 2)));
    }
}
