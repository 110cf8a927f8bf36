//! Date and time filters.

use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use regex::Regex;

use super::structure::{multi_filter, MultiFilter};
use super::{filter_ops, Filter, FilterBase, Selector, Transform};
use crate::context::Context;
use crate::dates::{self, LinearDateGuesser, ParseOptions};
use crate::error::{Error, Result};
use crate::patterns::{DAY_MONTH_SPLIT, DURATION, TIME};
use crate::value::Value;

/// Parsing options shared by [`DateTime`] and [`Date`].
#[derive(Debug, Clone, Default)]
pub struct DateConfig {
    pub dayfirst: bool,
    pub fuzzy: bool,
    /// Applied in order before parsing.
    pub translations: Vec<(Regex, String)>,
    /// Explicit chrono format; disables free-form parsing.
    pub format: Option<String>,
}

impl DateConfig {
    /// Parse `text` on behalf of `filter`.
    pub fn parse(&self, text: &str, filter: &'static str) -> Result<NaiveDateTime> {
        let text = dates::translate(text, &self.translations);
        if let Some(format) = &self.format {
            return NaiveDateTime::parse_from_str(text.trim(), format)
                .or_else(|_| {
                    NaiveDate::parse_from_str(text.trim(), format).map(|d| d.and_time(NaiveTime::MIN))
                })
                .map_err(|e| Error::parse(filter, text.as_str(), e.to_string()));
        }
        let options = ParseOptions {
            dayfirst: self.dayfirst,
            fuzzy: self.fuzzy,
        };
        dates::parse_datetime(&text, options).map_err(|reason| Error::parse(filter, text, reason))
    }
}

/// Builder methods for filters holding a `config: DateConfig`.
macro_rules! date_builders {
    ($($ty:ident),*) => {$(
        impl $ty {
            pub fn new(selector: impl Into<Selector>) -> Self {
                Self {
                    base: FilterBase::new(selector),
                    config: DateConfig::default(),
                }
            }

            /// Read ambiguous numeric dates day first.
            #[must_use]
            pub fn dayfirst(mut self, dayfirst: bool) -> Self {
                self.config.dayfirst = dayfirst;
                self
            }

            /// Skip words that are not part of the date.
            #[must_use]
            pub fn fuzzy(mut self, fuzzy: bool) -> Self {
                self.config.fuzzy = fuzzy;
                self
            }

            /// Replace `pattern` matches before parsing.
            #[must_use]
            pub fn translate(mut self, pattern: Regex, replacement: impl Into<String>) -> Self {
                self.config.translations.push((pattern, replacement.into()));
                self
            }

            /// French dates: month and weekday names translated, day first.
            #[must_use]
            pub fn french(mut self) -> Self {
                self.config
                    .translations
                    .extend(dates::french_translations().iter().cloned());
                self.config.dayfirst = true;
                self
            }

            /// Parse with an explicit chrono format such as `%d/%m/%Y`.
            #[must_use]
            pub fn format(mut self, format: impl Into<String>) -> Self {
                self.config.format = Some(format.into());
                self
            }
        }
    )*};
}

/// Parse date and time.
#[derive(Debug, Default)]
pub struct DateTime {
    base: FilterBase,
    config: DateConfig,
}

/// Parse a date; any time of day is dropped.
///
/// ```rust
/// use chrono::NaiveDate;
/// use rs_sift::{Context, Page, Value};
/// use rs_sift::filters::{CleanText, Date, Filter};
///
/// let page = Page::html("<p>mardi 1er février 2022</p>");
/// let ctx = Context::new(&page);
/// let date = Date::new(CleanText::new("p")).french().call(&ctx)?;
/// assert_eq!(date, Value::Date(NaiveDate::from_ymd_opt(2022, 2, 1).unwrap()));
/// # Ok::<(), rs_sift::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Date {
    base: FilterBase,
    config: DateConfig,
}

date_builders!(DateTime, Date);

fn parse_datetime_value(
    value: &Value<'_>,
    base: &FilterBase,
    config: &DateConfig,
    filter: &'static str,
) -> Result<Option<NaiveDateTime>> {
    match value {
        Value::DateTime(dt) => return Ok(Some(*dt)),
        Value::Date(d) => return Ok(Some(d.and_time(NaiveTime::MIN))),
        _ => {}
    }
    let text = match value.to_text() {
        Some(text) if !text.trim().is_empty() => text,
        _ => {
            return base
                .default_or_raise(Error::parse(filter, "", "empty date"))
                .map(|_| None);
        }
    };
    match config.parse(&text, filter) {
        Ok(dt) => Ok(Some(dt)),
        Err(e) if base.default.is_some() => base.default_or_raise(e).map(|_| None),
        Err(e) => Err(e),
    }
}

impl Transform for DateTime {
    const NAME: &'static str = "DateTime";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        match parse_datetime_value(&value, &self.base, &self.config, Self::NAME)? {
            Some(dt) => Ok(Value::DateTime(dt)),
            None => self.base.default_or_raise(Error::parse(Self::NAME, "", "no date")),
        }
    }
}

impl Transform for Date {
    const NAME: &'static str = "Date";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        match parse_datetime_value(&value, &self.base, &self.config, Self::NAME)? {
            Some(dt) => Ok(Value::Date(dt.date())),
            None => self.base.default_or_raise(Error::parse(Self::NAME, "", "no date")),
        }
    }
}

/// Hours, minutes and seconds of a clock match. Absent groups count as zero;
/// `None` when a present group does not fit an `i64`.
fn clock_parts(caps: &regex::Captures<'_>) -> Option<(i64, i64, i64)> {
    let part = |name: &str| match caps.name(name) {
        Some(m) => m.as_str().parse::<i64>().ok(),
        None => Some(0),
    };
    Some((part("hh")?, part("mm")?, part("ss")?))
}

/// Time of day found in the text (`10:30`, `10h30`, `10:30:15`).
#[derive(Debug, Default)]
pub struct Time {
    base: FilterBase,
}

impl Time {
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            base: FilterBase::new(selector),
        }
    }
}

impl Transform for Time {
    const NAME: &'static str = "Time";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        match value {
            Value::Time(t) => return Ok(Value::Time(t)),
            Value::DateTime(dt) => return Ok(Value::Time(dt.time())),
            _ => {}
        }
        let text = value.to_text().unwrap_or_default();
        let time = TIME.captures(&text).and_then(|caps| {
            let (h, m, s) = clock_parts(&caps)?;
            NaiveTime::from_hms_opt(
                u32::try_from(h).ok()?,
                u32::try_from(m).ok()?,
                u32::try_from(s).ok()?,
            )
        });
        match time {
            Some(time) => Ok(Value::Time(time)),
            None => self
                .base
                .default_or_raise(Error::parse(Self::NAME, text, "unable to find time")),
        }
    }
}

/// Duration written as `mm:ss` or `hh:mm:ss` (`;` also separates).
#[derive(Debug, Default)]
pub struct Duration {
    base: FilterBase,
}

impl Duration {
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            base: FilterBase::new(selector),
        }
    }
}

impl Transform for Duration {
    const NAME: &'static str = "Duration";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        if let Value::Duration(d) = value {
            return Ok(Value::Duration(d));
        }
        let text = value.to_text().unwrap_or_default();
        let Some(caps) = DURATION.captures(&text) else {
            return self
                .base
                .default_or_raise(Error::parse(Self::NAME, text, "unable to find duration"));
        };
        let delta = clock_parts(&caps).and_then(|(h, m, s)| {
            TimeDelta::try_hours(h)?
                .checked_add(&TimeDelta::try_minutes(m)?)?
                .checked_add(&TimeDelta::try_seconds(s)?)
        });
        match delta {
            Some(delta) => Ok(Value::Duration(delta)),
            None => self
                .base
                .default_or_raise(Error::parse(Self::NAME, text, "duration out of range")),
        }
    }
}

/// Combines a date and a time into a date-time.
#[derive(Debug)]
pub struct CombineDate {
    multi: MultiFilter,
}

impl CombineDate {
    pub fn new(date: impl Into<Selector>, time: impl Into<Selector>) -> Self {
        Self {
            multi: MultiFilter::new(vec![date.into(), time.into()]),
        }
    }

    fn combine<'a>(&self, values: Vec<Value<'a>>) -> Result<Value<'a>> {
        let fail = |v: &Value<'_>, expected: &str| {
            Error::parse(
                "CombineDate",
                v.to_text().unwrap_or_default(),
                format!("expected {expected}, got {}", v.kind()),
            )
        };
        let [date, time] = values.as_slice() else {
            return Err(Error::parse("CombineDate", "", "expected a date and a time"));
        };
        let date = match date {
            Value::Date(d) => *d,
            Value::DateTime(dt) => dt.date(),
            other => return Err(fail(other, "a date")),
        };
        let time = match time {
            Value::Time(t) => *t,
            Value::DateTime(dt) => dt.time(),
            other => return Err(fail(other, "a time")),
        };
        Ok(Value::DateTime(date.and_time(time)))
    }
}

/// Full date from a `day/month` pair, with the year guessed by a shared
/// [`LinearDateGuesser`].
#[derive(Debug)]
pub struct DateGuesser {
    base: FilterBase,
    guesser: Rc<LinearDateGuesser>,
}

impl DateGuesser {
    pub fn new(selector: impl Into<Selector>, guesser: Rc<LinearDateGuesser>) -> Self {
        Self {
            base: FilterBase::new(selector),
            guesser,
        }
    }
}

impl Transform for DateGuesser {
    const NAME: &'static str = "DateGuesser";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        let parts: Vec<String> = match &value {
            Value::List(items) => items.iter().filter_map(Value::to_text).collect(),
            other => {
                let text = other.to_text().unwrap_or_default();
                DAY_MONTH_SPLIT.split(text.trim()).map(str::to_string).collect()
            }
        };
        let numbers: Vec<u32> = parts
            .iter()
            .filter_map(|p| p.trim().parse().ok())
            .collect();
        let [day, month] = numbers.as_slice() else {
            return Err(Error::parse(
                Self::NAME,
                parts.join("/"),
                "unable to take a (day, month) pair",
            ));
        };
        Ok(Value::Date(self.guesser.guess_date(*day, *month)?))
    }
}

multi_filter!(CombineDate);
filter_ops!(DateTime, Date, Time, Duration, CombineDate, DateGuesser);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::CleanText;
    use crate::page::Page;

    fn call(filter: &impl Filter, html: &str) -> Result<Value<'static>> {
        let page = Page::html(html);
        let ctx = Context::new(&page);
        filter.call(&ctx).map(Value::detach)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_dayfirst() {
        let f = Date::new(CleanText::new("p")).dayfirst(true);
        assert_eq!(call(&f, "<p>05/03/2024</p>").unwrap(), Value::Date(date(2024, 3, 5)));
        let f = Date::new(CleanText::new("p"));
        assert_eq!(call(&f, "<p>05/03/2024</p>").unwrap(), Value::Date(date(2024, 5, 3)));
    }

    #[test]
    fn test_datetime_keeps_time() {
        let f = DateTime::new(CleanText::new("p")).dayfirst(true);
        assert_eq!(
            call(&f, "<p>05/03/2024 14:30</p>").unwrap(),
            Value::DateTime(date(2024, 3, 5).and_hms_opt(14, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_explicit_format_and_translations() {
        let f = Date::new(CleanText::new("p")).format("%d.%m.%Y");
        assert_eq!(call(&f, "<p>05.03.2024</p>").unwrap(), Value::Date(date(2024, 3, 5)));
        let f = Date::new(CleanText::new("p"))
            .translate(Regex::new("(?i)mär").unwrap(), "march")
            .dayfirst(true);
        assert_eq!(call(&f, "<p>5 Mär 2024</p>").unwrap(), Value::Date(date(2024, 3, 5)));
    }

    #[test]
    fn test_invalid_date_uses_default() {
        let f = Date::new(CleanText::new("p"));
        assert!(matches!(call(&f, "<p>soon</p>"), Err(Error::Parse { .. })));
        let f = Date::new(CleanText::new("p")) | Value::Empty;
        assert_eq!(call(&f, "<p>soon</p>").unwrap(), Value::Empty);
        let f = Date::new(CleanText::new("p")) | "n/a";
        assert_eq!(call(&f, "<p></p>").unwrap(), Value::from("n/a"));
    }

    #[test]
    fn test_time_and_duration() {
        let f = Time::new(CleanText::new("p"));
        assert_eq!(
            call(&f, "<p>à 10h30</p>").unwrap(),
            Value::Time(NaiveTime::from_hms_opt(10, 30, 0).unwrap())
        );
        let f = Duration::new(CleanText::new("p"));
        assert_eq!(
            call(&f, "<p>1:02:03</p>").unwrap(),
            Value::Duration(TimeDelta::seconds(3723))
        );
        assert_eq!(
            call(&f, "<p>4;05</p>").unwrap(),
            Value::Duration(TimeDelta::seconds(245))
        );
        assert!(call(&f, "<p>none</p>").is_err());
    }

    #[test]
    fn test_duration_out_of_range() {
        let f = Duration::new(CleanText::new("p"));
        assert!(matches!(
            call(&f, "<p>9999999999999999:00:00</p>"),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            call(&f, "<p>99999999999999999999:00</p>"),
            Err(Error::Parse { .. })
        ));
        let f = Duration::new(CleanText::new("p")) | Value::Empty;
        assert_eq!(call(&f, "<p>9999999999999999:00:00</p>").unwrap(), Value::Empty);
    }

    #[test]
    fn test_combine_date() {
        let f = CombineDate::new(
            Date::new(CleanText::new(".d")).dayfirst(true),
            Time::new(CleanText::new(".t")),
        );
        assert_eq!(
            call(&f, r#"<p class="d">05/03/2024</p><p class="t">08:15</p>"#).unwrap(),
            Value::DateTime(date(2024, 3, 5).and_hms_opt(8, 15, 0).unwrap())
        );
    }

    #[test]
    fn test_date_guesser_shares_state() {
        let guesser = Rc::new(LinearDateGuesser::new(date(2024, 1, 10)));
        let f = DateGuesser::new(CleanText::new("p"), Rc::clone(&guesser));
        assert_eq!(call(&f, "<p>28/12</p>").unwrap(), Value::Date(date(2023, 12, 28)));
        assert_eq!(guesser.current(), date(2023, 12, 28));
        assert!(call(&f, "<p>28</p>").is_err());
    }
}
