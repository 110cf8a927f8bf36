//! Text filters: raw and cleaned text, case changes, slugs, currencies and
//! joined lists.

use unicode_normalization::UnicodeNormalization;

use super::{filter_ops, FilterBase, Selector, Transform};
use crate::context::Context;
use crate::dom;
use crate::error::{Error, Result};
use crate::patterns::{LINE_BREAK, NON_SLUG, WHITESPACE};
use crate::value::Value;

/// Unicode normalization form applied by [`CleanText`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Normalization {
    #[default]
    Nfc,
    Nfd,
    Nfkc,
    Nfkd,
    /// Keep the text as is.
    None,
}

impl Normalization {
    #[must_use]
    pub fn apply(self, text: &str) -> String {
        match self {
            Normalization::Nfc => text.nfc().collect(),
            Normalization::Nfd => text.nfd().collect(),
            Normalization::Nfkc => text.nfkc().collect(),
            Normalization::Nfkd => text.nfkd().collect(),
            Normalization::None => text.to_string(),
        }
    }
}

/// Text of `value`, either of whole subtrees (`children`) or of the direct
/// text children of each node only.
pub(crate) fn node_text(value: &Value<'_>, children: bool) -> Option<String> {
    match value {
        Value::Nodes(nodes) if !children => Some(
            nodes
                .iter()
                .flat_map(|n| dom::own_text(n))
                .map(|t| t.trim().to_string())
                .collect::<Vec<_>>()
                .join(" "),
        ),
        other => other.to_text(),
    }
}

/// Cleaning options shared by every filter built on [`CleanText`].
#[derive(Debug, Clone)]
pub struct TextCleaner {
    pub symbols: Vec<String>,
    pub replace: Vec<(String, String)>,
    pub children: bool,
    pub newlines: bool,
    pub normalize: Normalization,
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            replace: Vec::new(),
            children: true,
            newlines: true,
            normalize: Normalization::Nfc,
        }
    }
}

impl TextCleaner {
    /// Collapse whitespace, trim and normalize `text`.
    ///
    /// With `newlines` false, each line is cleaned on its own and lines are
    /// joined back with `\n`.
    #[must_use]
    pub fn clean(text: &str, newlines: bool, normalize: Normalization) -> String {
        let text = if newlines {
            WHITESPACE.replace_all(text, " ").trim().to_string()
        } else {
            LINE_BREAK
                .split(text)
                .map(|line| WHITESPACE.replace_all(line, " ").trim().to_string())
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        };
        normalize.apply(&text)
    }

    /// Full cleaning of an already extracted string.
    #[must_use]
    pub fn clean_str(&self, text: &str) -> String {
        let mut text = Self::clean(text, self.newlines, self.normalize);
        if !self.symbols.is_empty() {
            for symbol in &self.symbols {
                text = text.replace(symbol.as_str(), "");
            }
            text = text.trim().to_string();
        }
        for (before, after) in &self.replace {
            text = text.replace(before.as_str(), after.as_str());
        }
        text
    }

    /// Text of `value` cleaned, or a parse error when there is no text.
    pub fn clean_value(&self, value: &Value<'_>, filter: &'static str) -> Result<String> {
        let text = node_text(value, self.children)
            .ok_or_else(|| Error::parse(filter, "", format!("no text in {} value", value.kind())))?;
        Ok(self.clean_str(&text))
    }
}

/// Text of the selected nodes, unmodified.
///
/// Without `children`, only the text before the first child element is read.
/// A node without text gives the default, or [`Value::Empty`].
#[derive(Debug, Default)]
pub struct RawText {
    base: FilterBase,
    children: bool,
}

impl RawText {
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            base: FilterBase::new(selector),
            children: false,
        }
    }

    #[must_use]
    pub fn children(mut self, children: bool) -> Self {
        self.children = children;
        self
    }
}

impl Transform for RawText {
    const NAME: &'static str = "RawText";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        let text = match &value {
            Value::Nodes(nodes) => {
                let parts: Vec<String> = nodes
                    .iter()
                    .filter_map(|n| {
                        if self.children {
                            Some(dom::text_content(n).to_string())
                        } else {
                            dom::leading_text(n)
                        }
                    })
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(" "))
                }
            }
            other => other.to_text(),
        };
        match text {
            Some(text) => Ok(Value::Text(text)),
            None => Ok(self.base.default.clone().unwrap_or(Value::Empty)),
        }
    }
}

/// Cleaned text of the selection.
///
/// Whitespace runs become one space, the text is trimmed and normalized,
/// `symbols` are removed and `replace` pairs applied in order.
#[derive(Debug, Default)]
pub struct CleanText {
    base: FilterBase,
    cleaner: TextCleaner,
}

impl CleanText {
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            base: FilterBase::new(selector),
            cleaner: TextCleaner::default(),
        }
    }

    /// Add symbols removed from the cleaned text.
    #[must_use]
    pub fn symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cleaner.symbols.extend(symbols.into_iter().map(Into::into));
        self
    }

    /// Add a literal replacement, applied after earlier ones.
    #[must_use]
    pub fn replace(mut self, before: impl Into<String>, after: impl Into<String>) -> Self {
        self.cleaner.replace.push((before.into(), after.into()));
        self
    }

    #[must_use]
    pub fn children(mut self, children: bool) -> Self {
        self.cleaner.children = children;
        self
    }

    /// Keep line structure when `false`.
    #[must_use]
    pub fn newlines(mut self, newlines: bool) -> Self {
        self.cleaner.newlines = newlines;
        self
    }

    #[must_use]
    pub fn normalize(mut self, normalize: Normalization) -> Self {
        self.cleaner.normalize = normalize;
        self
    }

    #[must_use]
    pub fn cleaner(&self) -> &TextCleaner {
        &self.cleaner
    }

    /// Clean a plain string with the default options.
    #[must_use]
    pub fn clean(text: &str) -> String {
        TextCleaner::clean(text, true, Normalization::Nfc)
    }
}

impl Transform for CleanText {
    const NAME: &'static str = "CleanText";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        if value.is_empty() && !matches!(value, Value::Nodes(_)) {
            return self
                .base
                .default_or_raise(Error::parse(Self::NAME, "", "no text to clean"));
        }
        Ok(Value::Text(self.cleaner.clean_value(&value, Self::NAME)?))
    }
}

/// Declares a filter running [`CleanText`] then a string transform.
macro_rules! clean_text_then {
    ($(#[$doc:meta])* $name:ident, $transform:expr) => {
        $(#[$doc])*
        #[derive(Debug, Default)]
        pub struct $name {
            inner: CleanText,
        }

        impl $name {
            pub fn new(selector: impl Into<Selector>) -> Self {
                Self {
                    inner: CleanText::new(selector),
                }
            }

            /// Adjust the underlying [`CleanText`] options.
            #[must_use]
            pub fn with(mut self, configure: impl FnOnce(CleanText) -> CleanText) -> Self {
                self.inner = configure(self.inner);
                self
            }
        }

        impl Transform for $name {
            const NAME: &'static str = stringify!($name);

            fn base(&self) -> &FilterBase {
                &self.inner.base
            }

            fn base_mut(&mut self) -> &mut FilterBase {
                &mut self.inner.base
            }

            fn filter<'a>(&self, value: Value<'a>, ctx: &Context<'a>) -> Result<Value<'a>> {
                let transform: fn(&str) -> Value<'static> = $transform;
                match self.inner.filter(value, ctx)? {
                    Value::Text(text) => Ok(transform(&text)),
                    other => Ok(other),
                }
            }
        }
    };
}

clean_text_then!(
    /// Cleaned text in lower case.
    Lower,
    |s| Value::Text(s.to_lowercase())
);

clean_text_then!(
    /// Cleaned text in upper case.
    Upper,
    |s| Value::Text(s.to_uppercase())
);

clean_text_then!(
    /// Cleaned text in title case: every word starts with a capital.
    Capitalize,
    |s| Value::Text(title_case(s))
);

clean_text_then!(
    /// ISO 4217 code of the currency named in the cleaned text, or
    /// [`Value::Empty`] when none is recognized.
    Currency,
    |s| currency_code(s).map_or(Value::Empty, |code| Value::Text(code.to_string()))
);

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Currency codes and the symbols or names found in page text.
/// Longer symbols come before their prefixes (`R$` before `$`).
const CURRENCIES: &[(&str, &[&str])] = &[
    ("EUR", &["€", "EURO", "EUR"]),
    ("CHF", &["CHF"]),
    ("BRL", &["R$"]),
    ("USD", &["US$", "$", "USD"]),
    ("GBP", &["£", "GBP"]),
    ("LBP", &["ل.ل", "LBP"]),
    ("AED", &["AED"]),
    ("XOF", &["XOF", "FCFA"]),
    ("RUB", &["РУБ", "₽", "RUB"]),
    ("SGD", &["SGD"]),
    ("JPY", &["¥", "JPY"]),
    ("TRY", &["₺", "TRY"]),
    ("CAD", &["CAD"]),
    ("AUD", &["AUD"]),
    ("SEK", &["SEK"]),
    ("PLN", &["ZŁ", "PLN"]),
];

/// Currency code for a text such as `"12,50 €"` or `"USD"`.
#[must_use]
pub fn currency_code(text: &str) -> Option<&'static str> {
    let cleaned: String = text
        .chars()
        .filter(|c| !(c.is_ascii_digit() || c.is_whitespace() || matches!(c, '.' | ',' | '-' | '+')))
        .collect::<String>()
        .to_uppercase();
    if cleaned.is_empty() {
        return None;
    }
    if let Some((code, _)) = CURRENCIES.iter().find(|(code, _)| *code == cleaned) {
        return Some(code);
    }
    CURRENCIES
        .iter()
        .find(|(_, symbols)| symbols.iter().any(|s| cleaned.contains(s)))
        .map(|(code, _)| *code)
}

/// Lower-case ASCII slug: every run of other characters becomes one `-`.
#[derive(Debug, Default)]
pub struct Slugify {
    base: FilterBase,
}

impl Slugify {
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            base: FilterBase::new(selector),
        }
    }
}

impl Transform for Slugify {
    const NAME: &'static str = "Slugify";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        let text = value
            .to_text()
            .ok_or_else(|| Error::parse(Self::NAME, "", "no text to slugify"))?;
        let spaced = NON_SLUG.replace_all(&text.to_lowercase(), " ").trim().to_string();
        Ok(Value::Text(WHITESPACE.replace_all(&spaced, "-").into_owned()))
    }
}

/// Joins the cleaned text of every selected item with `pattern`.
///
/// Empty items are dropped. With `newline`, each item is followed by `\r\n`
/// before joining.
#[derive(Debug)]
pub struct Join {
    base: FilterBase,
    pattern: String,
    cleaner: TextCleaner,
    newline: bool,
    before: String,
    after: String,
}

impl Join {
    pub fn new(pattern: impl Into<String>, selector: impl Into<Selector>) -> Self {
        Self {
            base: FilterBase::new(selector),
            pattern: pattern.into(),
            cleaner: TextCleaner::default(),
            newline: false,
            before: String::new(),
            after: String::new(),
        }
    }

    #[must_use]
    pub fn newline(mut self, newline: bool) -> Self {
        self.newline = newline;
        self
    }

    /// Text put before the joined result.
    #[must_use]
    pub fn prefix(mut self, before: impl Into<String>) -> Self {
        self.before = before.into();
        self
    }

    /// Text put after the joined result.
    #[must_use]
    pub fn suffix(mut self, after: impl Into<String>) -> Self {
        self.after = after.into();
        self
    }

    /// Clean items with these options instead of the [`CleanText`] defaults.
    #[must_use]
    pub fn cleaner(mut self, cleaner: TextCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }
}

impl Transform for Join {
    const NAME: &'static str = "Join";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        let items: Vec<Value<'a>> = match value {
            Value::Nodes(nodes) => nodes.into_iter().map(Value::node).collect(),
            Value::List(items) => items,
            Value::Json(json) => match json.as_ref() {
                serde_json::Value::Array(items) => items.iter().cloned().map(Value::from).collect(),
                _ => vec![Value::Json(json)],
            },
            other => vec![other],
        };
        let mut parts: Vec<String> = items
            .iter()
            .filter_map(|item| node_text(item, self.cleaner.children))
            .map(|text| self.cleaner.clean_str(&text))
            .filter(|text| !text.is_empty())
            .collect();
        if self.newline {
            for part in &mut parts {
                part.push_str("\r\n");
            }
        }
        Ok(Value::Text(format!(
            "{}{}{}",
            self.before,
            parts.join(&self.pattern),
            self.after
        )))
    }
}

filter_ops!(RawText, CleanText, Lower, Upper, Capitalize, Currency, Slugify, Join);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Filter;
    use crate::page::Page;

    fn text_of(filter: &impl Filter, html: &str) -> Value<'static> {
        let page = Page::html(html);
        let ctx = Context::new(&page);
        filter.call(&ctx).unwrap().detach()
    }

    #[test]
    fn test_clean_collapses_whitespace() {
        assert_eq!(CleanText::clean(" coucou  \n\théhé"), "coucou héhé");
        assert_eq!(CleanText::clean("coucou\u{a0}coucou"), "coucou coucou");
    }

    #[test]
    fn test_clean_keeps_lines_without_newlines() {
        let text = TextCleaner::clean("coucou\r\n  coucou ", false, Normalization::Nfc);
        assert_eq!(text, "coucou\ncoucou");
        let text = TextCleaner::clean("a\rb\x0bc\x0c d\u{2028}e", false, Normalization::Nfc);
        assert_eq!(text, "a\nb\nc\nd\ne");
    }

    #[test]
    fn test_unicode_normalization_forms() {
        assert_eq!(Normalization::Nfkc.apply("…"), "...");
        assert_eq!(CleanText::clean("…"), "…");
        assert_eq!(CleanText::clean("\u{3053}\u{3099}"), "\u{3054}");
        assert_eq!(Normalization::Nfd.apply("\u{3054}"), "\u{3053}\u{3099}");
        assert_eq!(Normalization::None.apply("\u{3053}\u{3099}"), "\u{3053}\u{3099}");
    }

    #[test]
    fn test_symbols_and_replacements() {
        let filter = CleanText::new("p").symbols(["€"]).replace(",", ".");
        assert_eq!(text_of(&filter, "<p> 12,50 € </p>"), Value::from("12.50"));
    }

    #[test]
    fn test_children_false_reads_own_text() {
        let filter = CleanText::new("p").children(false);
        assert_eq!(text_of(&filter, "<p>Total <b>12</b> EUR</p>"), Value::from("Total EUR"));
    }

    #[test]
    fn test_raw_text_keeps_whitespace() {
        let filter = RawText::new("p");
        assert_eq!(text_of(&filter, "<p> a  <b>b</b></p>"), Value::from(" a  "));
        let filter = RawText::new("p").children(true);
        assert_eq!(text_of(&filter, "<p> a  <b>b</b></p>"), Value::from(" a  b"));
        let filter = RawText::new("p") | "none";
        assert_eq!(text_of(&filter, "<p><b>b</b></p>"), Value::from("none"));
    }

    #[test]
    fn test_case_filters() {
        assert_eq!(text_of(&Lower::new("p"), "<p>HeLLo</p>"), Value::from("hello"));
        assert_eq!(text_of(&Upper::new("p"), "<p>HeLLo</p>"), Value::from("HELLO"));
        assert_eq!(
            text_of(&Capitalize::new("p"), "<p>jean-pierre DUPONT</p>"),
            Value::from("Jean-Pierre Dupont")
        );
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(currency_code("12,50 €"), Some("EUR"));
        assert_eq!(currency_code("$ 3.00"), Some("USD"));
        assert_eq!(currency_code("R$ 3,00"), Some("BRL"));
        assert_eq!(currency_code("chf"), Some("CHF"));
        assert_eq!(currency_code("42"), None);
        assert_eq!(text_of(&Currency::new("p"), "<p>1 000 £</p>"), Value::from("GBP"));
    }

    #[test]
    fn test_slugify() {
        let page = Page::html("<p/>");
        let ctx = Context::new(&page);
        let slug = Slugify::new(Selector::literal("Hello, World!  2024"))
            .call(&ctx)
            .unwrap();
        assert_eq!(slug, Value::from("hello-world-2024"));
    }

    #[test]
    fn test_join_skips_empty_items() {
        let filter = Join::new(", ", "li").prefix("[").suffix("]");
        let html = "<ul><li> a </li><li> </li><li>b\n c</li></ul>";
        assert_eq!(text_of(&filter, html), Value::from("[a, b c]"));
        let filter = Join::new("", "li").newline(true);
        assert_eq!(text_of(&filter, "<li>x</li><li>y</li>"), Value::from("x\r\ny\r\n"));
    }
}
