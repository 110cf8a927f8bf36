//! Number filters: fixed-point decimals and typed parsing.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::text::TextCleaner;
use super::{filter_ops, FilterBase, Selector, Transform};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::patterns::NON_DECIMAL;
use crate::value::Value;

/// Thousands and decimal separator convention of a number.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Separators {
    /// `1234.56`: the dot is the decimal separator, nothing is replaced.
    #[default]
    Dot,
    /// `1.234,56`: dots are dropped and the comma is the decimal separator.
    Comma,
    /// Explicit thousands and decimal separators.
    Custom { thousands: String, decimal: String },
}

impl Separators {
    /// `1 234,56`
    #[must_use]
    pub fn french() -> Self {
        Self::custom(" ", ",")
    }

    /// `1,234.56`
    #[must_use]
    pub fn us() -> Self {
        Self::custom(",", ".")
    }

    /// `1 234.56`
    #[must_use]
    pub fn si() -> Self {
        Self::custom(" ", ".")
    }

    #[must_use]
    pub fn custom(thousands: &str, decimal: &str) -> Self {
        Separators::Custom {
            thousands: thousands.to_string(),
            decimal: decimal.to_string(),
        }
    }

    fn pair(&self) -> (&str, &str) {
        match self {
            Separators::Dot => ("", "."),
            Separators::Comma => (".", ","),
            Separators::Custom { thousands, decimal } => (thousands, decimal),
        }
    }

    /// Rewrite `text` so that the decimal separator is a dot and thousands
    /// separators are gone.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        match self {
            Separators::Dot => text.to_string(),
            _ => {
                let (thousands, decimal) = self.pair();
                let text = if thousands.is_empty() {
                    text.to_string()
                } else {
                    text.replace(thousands, "")
                };
                text.replace(decimal, ".")
            }
        }
    }

    /// Render `value` under this convention, grouping the integer part by
    /// thousands.
    #[must_use]
    pub fn format(&self, value: Decimal) -> String {
        let (thousands, decimal) = self.pair();
        let plain = value.abs().to_string();
        let (int_part, frac_part) = match plain.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (plain.as_str(), None),
        };

        let digits: Vec<char> = int_part.chars().collect();
        let mut grouped = String::with_capacity(plain.len() + digits.len() / 3 * thousands.len());
        for (i, d) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push_str(thousands);
            }
            grouped.push(*d);
        }

        let mut out = String::new();
        if value.is_sign_negative() && !value.is_zero() {
            out.push('-');
        }
        out.push_str(&grouped);
        if let Some(frac) = frac_part {
            out.push_str(decimal);
            out.push_str(frac);
        }
        out
    }
}

type SignFn = dyn Fn(&str) -> Decimal;

/// Fixed-point decimal from the cleaned text of the selection.
///
/// The text is cleaned like [`super::CleanText`], separators are normalized,
/// every character outside `[0-9\-.]` is dropped and the rest is parsed.
/// The optional sign function receives the cleaned text before separator
/// substitution; the parsed value is multiplied by its result.
///
/// Numeric inputs (integers, decimals, JSON numbers) are taken as they are.
pub struct CleanDecimal {
    base: FilterBase,
    separators: Separators,
    sign: Option<Box<SignFn>>,
    cleaner: TextCleaner,
}

impl CleanDecimal {
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            base: FilterBase::new(selector),
            separators: Separators::Dot,
            sign: None,
            cleaner: TextCleaner::default(),
        }
    }

    /// French convention on the current node.
    #[must_use]
    pub fn french() -> Self {
        Self::new(Selector::Current).separators(Separators::french())
    }

    /// US convention on the current node.
    #[must_use]
    pub fn us() -> Self {
        Self::new(Selector::Current).separators(Separators::us())
    }

    /// SI convention on the current node.
    #[must_use]
    pub fn si() -> Self {
        Self::new(Selector::Current).separators(Separators::si())
    }

    #[must_use]
    pub fn separators(mut self, separators: Separators) -> Self {
        self.separators = separators;
        self
    }

    /// Multiply the parsed value by `sign(text)`.
    #[must_use]
    pub fn sign(mut self, sign: impl Fn(&str) -> Decimal + 'static) -> Self {
        self.sign = Some(Box::new(sign));
        self
    }

    /// Parse an already extracted string.
    pub fn parse(&self, text: &str) -> Result<Decimal> {
        let original = self.cleaner.clean_str(text);
        let normalized = self.separators.normalize(&original);
        let digits = NON_DECIMAL.replace_all(&normalized, "");
        let value = Decimal::from_str(&digits)
            .map_err(|e| Error::parse(Self::NAME, original.clone(), e.to_string()))?;
        Ok(match &self.sign {
            Some(sign) => value * sign(&original),
            None => value,
        })
    }
}

impl Default for CleanDecimal {
    fn default() -> Self {
        Self::new(Selector::Current)
    }
}

impl fmt::Debug for CleanDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanDecimal")
            .field("base", &self.base)
            .field("separators", &self.separators)
            .field("sign", &self.sign.is_some())
            .finish_non_exhaustive()
    }
}

impl Transform for CleanDecimal {
    const NAME: &'static str = "CleanDecimal";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        match &value {
            Value::Decimal(d) => return Ok(Value::Decimal(*d)),
            Value::Int(i) => return Ok(Value::Decimal(Decimal::from(*i))),
            Value::Json(json) if json.is_number() => {
                let text = json.to_string();
                return Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .map(Value::Decimal)
                    .map_err(|e| Error::parse(Self::NAME, text.as_str(), e.to_string()));
            }
            _ => {}
        }
        let text = match value.to_text() {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                return self
                    .base
                    .default_or_raise(Error::parse(Self::NAME, "", "empty text"));
            }
        };
        match self.parse(&text) {
            Ok(d) => Ok(Value::Decimal(d)),
            Err(e) => self.base.default_or_raise(e),
        }
    }
}

/// Target of a [`Type`] conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Int,
    Decimal,
    Bool,
    Text,
}

impl TypeKind {
    fn matches(self, value: &Value<'_>) -> bool {
        matches!(
            (self, value),
            (TypeKind::Int, Value::Int(_))
                | (TypeKind::Decimal, Value::Decimal(_))
                | (TypeKind::Bool, Value::Bool(_))
                | (TypeKind::Text, Value::Text(_))
        )
    }

    fn parse(self, text: &str) -> std::result::Result<Value<'static>, String> {
        let trimmed = text.trim();
        match self {
            TypeKind::Int => trimmed.parse::<i64>().map(Value::Int).map_err(|e| e.to_string()),
            TypeKind::Decimal => Decimal::from_str(trimmed)
                .map(Value::Decimal)
                .map_err(|e| e.to_string()),
            TypeKind::Bool => match trimmed.to_lowercase().as_str() {
                "true" | "1" | "yes" | "y" | "oui" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "n" | "non" => Ok(Value::Bool(false)),
                _ => Err("not a boolean".to_string()),
            },
            TypeKind::Text => Ok(Value::Text(text.to_string())),
        }
    }
}

/// Parse the text of the selection into a typed value.
///
/// Text no longer than `minlen` characters (0 by default, so empty text) is
/// not parsed: the default is returned, or an error. `minlen(None)` parses
/// any text.
#[derive(Debug)]
pub struct Type {
    base: FilterBase,
    kind: TypeKind,
    minlen: Option<usize>,
}

impl Type {
    pub fn new(selector: impl Into<Selector>, kind: TypeKind) -> Self {
        Self {
            base: FilterBase::new(selector),
            kind,
            minlen: Some(0),
        }
    }

    #[must_use]
    pub fn minlen(mut self, minlen: Option<usize>) -> Self {
        self.minlen = minlen;
        self
    }
}

impl Transform for Type {
    const NAME: &'static str = "Type";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        if self.kind.matches(&value) {
            return Ok(value);
        }
        let Some(text) = value.to_text() else {
            return self
                .base
                .default_or_raise(Error::parse(Self::NAME, "", "no value"));
        };
        if self.minlen.is_some_and(|min| text.chars().count() <= min) {
            return self
                .base
                .default_or_raise(Error::parse(Self::NAME, text, "text too short"));
        }
        match self.kind.parse(&text) {
            Ok(parsed) => Ok(parsed),
            Err(reason) => self.base.default_or_raise(Error::parse(Self::NAME, text, reason)),
        }
    }
}

filter_ops!(CleanDecimal, Type);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{Filter, FilterExt};
    use crate::page::Page;

    fn decimal(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_separator_conventions() {
        assert_eq!(CleanDecimal::default().parse("1234.56 EUR").unwrap(), decimal("1234.56"));
        assert_eq!(CleanDecimal::french().parse("-1 234,56 €").unwrap(), decimal("-1234.56"));
        assert_eq!(CleanDecimal::us().parse("$1,234.56").unwrap(), decimal("1234.56"));
        assert_eq!(CleanDecimal::si().parse("1 234.56").unwrap(), decimal("1234.56"));
        let comma = CleanDecimal::default().separators(Separators::Comma);
        assert_eq!(comma.parse("1.234,56").unwrap(), decimal("1234.56"));
    }

    #[test]
    fn test_non_breaking_spaces_are_thousands() {
        assert_eq!(CleanDecimal::french().parse("1\u{a0}234,50").unwrap(), decimal("1234.50"));
    }

    #[test]
    fn test_sign_sees_text_before_substitution() {
        let filter = CleanDecimal::french().sign(|text| {
            if text.ends_with("DB") {
                Decimal::NEGATIVE_ONE
            } else {
                Decimal::ONE
            }
        });
        assert_eq!(filter.parse("12,00 DB").unwrap(), decimal("-12.00"));
        assert_eq!(filter.parse("12,00 CR").unwrap(), decimal("12.00"));
    }

    #[test]
    fn test_format_groups_thousands() {
        assert_eq!(Separators::french().format(decimal("-1234567.89")), "-1 234 567,89");
        assert_eq!(Separators::us().format(decimal("1234")), "1,234");
        assert_eq!(Separators::Dot.format(decimal("12.50")), "12.50");
    }

    #[test]
    fn test_unparsable_uses_default() {
        let page = Page::html("<p>n/a</p>");
        let ctx = Context::new(&page);
        assert!(CleanDecimal::new("p").call(&ctx).is_err());
        let filter = CleanDecimal::new("p") | Decimal::ZERO;
        assert_eq!(filter.call(&ctx).unwrap(), Value::Decimal(Decimal::ZERO));
    }

    #[test]
    fn test_json_numbers_are_taken_as_is() {
        let page = Page::json(r#"{"amount": 12.5, "count": 3}"#).unwrap();
        let ctx = Context::new(&page);
        assert_eq!(
            CleanDecimal::new("amount").call(&ctx).unwrap(),
            Value::Decimal(decimal("12.5"))
        );
        assert_eq!(
            CleanDecimal::french().on("count").call(&ctx).unwrap(),
            Value::Decimal(decimal("3"))
        );
    }

    #[test]
    fn test_type_minlen() {
        let page = Page::html("<p/>");
        let ctx = Context::new(&page);
        let int = Type::new(Selector::literal("42"), TypeKind::Int);
        assert_eq!(int.call(&ctx).unwrap(), Value::Int(42));

        let empty = Type::new(Selector::literal(""), TypeKind::Int) | "NaN";
        assert_eq!(empty.call(&ctx).unwrap(), Value::from("NaN"));

        let text = Type::new(Selector::literal(""), TypeKind::Text).minlen(None);
        assert_eq!(text.call(&ctx).unwrap(), Value::from(""));

        let short = Type::new(Selector::literal("12"), TypeKind::Int).minlen(Some(2));
        assert!(short.call(&ctx).is_err());
        let long = Type::new(Selector::literal("123"), TypeKind::Int).minlen(Some(2));
        assert_eq!(long.call(&ctx).unwrap(), Value::Int(123));
    }
}
