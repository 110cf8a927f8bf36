//! Date Parsing
//!
//! Free-form date parsing for the date filters. ISO 8601, RFC 3339 and
//! RFC 2822 strings are handled by chrono directly; anything else goes
//! through a small token parser that understands numeric dates in either
//! day-first or month-first order, English month names, `14h30`-style
//! clocks and am/pm markers. Site-locale words are translated to English
//! beforehand (see [`french_translations`]).
//!
//! Missing fields are taken from the reference date: a missing year is the
//! current year and a missing day is the 1st of the month.

use std::cell::Cell;
use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use regex::Regex;

use crate::error::{Error, Result};
use crate::patterns::{DATE_CLOCK, DATE_TOKEN};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Words ignored between date parts.
const NOISE: &[&str] = &["t", "at", "of", "the", "on", "st", "nd", "rd", "th"];

/// How ambiguous input is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Read `01/02/2024` as the 1st of February.
    pub dayfirst: bool,
    /// Ignore words that are not part of a date.
    pub fuzzy: bool,
}

/// Parse `text` relative to today.
pub fn parse_datetime(text: &str, options: ParseOptions) -> std::result::Result<NaiveDateTime, String> {
    parse_datetime_at(text, options, Local::now().date_naive())
}

/// Parse `text`, taking missing fields from `today`.
pub fn parse_datetime_at(
    text: &str,
    options: ParseOptions,
    today: NaiveDate,
) -> std::result::Result<NaiveDateTime, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty date".to_string());
    }
    if let Some(dt) = parse_iso(text) {
        return Ok(dt);
    }

    let mut rest = text.to_string();
    let mut clock: Option<(u32, u32, u32, u32)> = None;
    if let Some(caps) = DATE_CLOCK.captures(text) {
        let num = |i: usize| caps.get(i).map_or(Ok(0), |m| m.as_str().parse::<u32>());
        let nanos = caps.get(4).map_or(Ok(0), |m| {
            format!("{:0<9}", m.as_str()).parse::<u32>()
        });
        clock = Some((
            num(1).map_err(|e| e.to_string())?,
            num(2).map_err(|e| e.to_string())?,
            num(3).map_err(|e| e.to_string())?,
            nanos.map_err(|e| e.to_string())?,
        ));
        if let Some(whole) = caps.get(0) {
            rest.replace_range(whole.range(), " ");
        }
    }

    let mut numbers: Vec<&str> = Vec::new();
    let mut month_name: Option<u32> = None;
    let mut pm: Option<bool> = None;
    for token in DATE_TOKEN.find_iter(&rest) {
        let token = token.as_str();
        if token.chars().all(|c| c.is_ascii_digit()) {
            numbers.push(token);
            continue;
        }
        let lower = token.to_lowercase();
        if month_name.is_none() {
            if let Some(month) = lookup_name(&MONTHS, &lower) {
                month_name = Some(month);
                continue;
            }
        }
        if lookup_name(&WEEKDAYS, &lower).is_some() || NOISE.contains(&lower.as_str()) {
            continue;
        }
        match lower.as_str() {
            "am" => pm = Some(false),
            "pm" => pm = Some(true),
            _ if options.fuzzy => {}
            _ => return Err(format!("unknown token {token:?}")),
        }
    }

    let (year, month, day) = resolve_ymd(&numbers, month_name, options.dayfirst)?;
    let date = if year.is_none() && month.is_none() && day.is_none() {
        if clock.is_none() {
            return Err("no date found".to_string());
        }
        today
    } else {
        let month = match (month, year) {
            (Some(month), _) => month,
            (None, None) => today.month(),
            (None, Some(_)) => 1,
        };
        let year = year.map_or(today.year(), |y| expand_year(y, today.year()));
        let day = day.unwrap_or(1);
        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| format!("invalid date {year}-{month}-{day}"))?
    };

    let time = match clock {
        None => NaiveTime::MIN,
        Some((mut hour, minute, second, nanos)) => {
            match pm {
                Some(true) if hour < 12 => hour += 12,
                Some(false) if hour == 12 => hour = 0,
                _ => {}
            }
            NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
                .ok_or_else(|| format!("invalid time {hour}:{minute}:{second}"))?
        }
    };
    Ok(date.and_time(time))
}

fn parse_iso(text: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(text) {
        return Some(dt.naive_local());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// 1-based index of the name `word` abbreviates (three letters at least).
fn lookup_name(names: &[&str], word: &str) -> Option<u32> {
    let pos = names
        .iter()
        .position(|name| *name == word || (word.len() >= 3 && name.starts_with(word)))?;
    u32::try_from(pos + 1).ok()
}

type Ymd = (Option<i32>, Option<u32>, Option<u32>);

#[derive(Clone, Copy)]
struct Num {
    value: u32,
    digits: usize,
}

impl Num {
    fn is_year(self) -> bool {
        self.digits >= 3 || self.value > 31
    }

    fn year(self) -> Option<i32> {
        i32::try_from(self.value).ok().map(|y| if self.digits <= 2 { -y - 1 } else { y })
    }
}

/// Assign numeric tokens to year, month and day.
///
/// Two-digit years are returned encoded as `-(y + 1)` so that
/// [`expand_year`] can place them in the right century.
fn resolve_ymd(numbers: &[&str], month_name: Option<u32>, dayfirst: bool) -> std::result::Result<Ymd, String> {
    let nums: Vec<Num> = numbers
        .iter()
        .map(|s| {
            s.parse::<u32>()
                .map(|value| Num {
                    value,
                    digits: s.len(),
                })
                .map_err(|e| e.to_string())
        })
        .collect::<std::result::Result<_, _>>()?;

    if let Some(month) = month_name {
        return match nums.as_slice() {
            [] => Ok((None, Some(month), None)),
            [a] if a.is_year() => Ok((a.year(), Some(month), None)),
            [a] => Ok((None, Some(month), Some(a.value))),
            [a, b] if a.is_year() => Ok((a.year(), Some(month), Some(b.value))),
            [a, b] => Ok((b.year(), Some(month), Some(a.value))),
            _ => Err("too many numbers".to_string()),
        };
    }

    let ordered = |first: u32, second: u32| {
        let (day, month) = if dayfirst { (first, second) } else { (second, first) };
        if month > 12 && day <= 12 {
            (month, day)
        } else {
            (day, month)
        }
    };

    match nums.as_slice() {
        [] => Ok((None, None, None)),
        [a] if a.digits == 8 => {
            let v = a.value;
            Ok((i32::try_from(v / 10_000).ok(), Some(v / 100 % 100), Some(v % 100)))
        }
        [a] if a.is_year() => Ok((a.year(), None, None)),
        [a] => Ok((None, None, Some(a.value))),
        [a, b] if a.is_year() => Ok((a.year(), Some(b.value), None)),
        [a, b] if b.is_year() => Ok((b.year(), Some(a.value), None)),
        [a, b] => {
            let (day, month) = ordered(a.value, b.value);
            Ok((None, Some(month), Some(day)))
        }
        [a, b, c] if a.is_year() => {
            let (day, month) = if b.value > 12 && c.value <= 12 {
                (b.value, c.value)
            } else {
                (c.value, b.value)
            };
            Ok((a.year(), Some(month), Some(day)))
        }
        [a, b, c] if !b.is_year() => {
            let (day, month) = ordered(a.value, b.value);
            Ok((c.year(), Some(month), Some(day)))
        }
        _ => Err(format!("unable to read a date from {numbers:?}")),
    }
}

/// Decode a year from [`resolve_ymd`]: two-digit years land within fifty
/// years of `this_year`.
fn expand_year(year: i32, this_year: i32) -> i32 {
    if year >= 0 {
        return year;
    }
    let short = -year - 1;
    let century = this_year - this_year.rem_euclid(100);
    let mut full = century + short;
    if full >= this_year + 50 {
        full -= 100;
    } else if full < this_year - 50 {
        full += 100;
    }
    full
}

/// Apply ordered `(pattern, replacement)` pairs to `text`.
#[must_use]
pub fn translate(text: &str, translations: &[(Regex, String)]) -> String {
    translations
        .iter()
        .fold(text.to_string(), |acc, (pattern, repl)| {
            pattern.replace_all(&acc, repl.as_str()).into_owned()
        })
}

#[allow(clippy::expect_used)]
static FRENCH: LazyLock<Vec<(Regex, String)>> = LazyLock::new(|| {
    [
        (r"(?i)\bjanv(?:ier\b|\.|\b)", "january"),
        (r"(?i)\bf[ée]v(?:rier\b|r?\.|r?\b)", "february"),
        (r"(?i)\bmars\b", "march"),
        (r"(?i)\bavr(?:il\b|\.|\b)", "april"),
        (r"(?i)\bmai\b", "may"),
        (r"(?i)\bjuin\b", "june"),
        (r"(?i)\bjuil(?:let\b|\.|\b)", "july"),
        (r"(?i)\bao[uû]t?\b", "august"),
        (r"(?i)\bsept(?:embre\b|\.|\b)", "september"),
        (r"(?i)\boct(?:obre\b|\.|\b)", "october"),
        (r"(?i)\bnov(?:embre\b|\.|\b)", "november"),
        (r"(?i)\bd[ée]c(?:embre\b|\.|\b)", "december"),
        (r"(?i)\blundi\b", "monday"),
        (r"(?i)\bmardi\b", "tuesday"),
        (r"(?i)\bmercredi\b", "wednesday"),
        (r"(?i)\bjeudi\b", "thursday"),
        (r"(?i)\bvendredi\b", "friday"),
        (r"(?i)\bsamedi\b", "saturday"),
        (r"(?i)\bdimanche\b", "sunday"),
        (r"(?i)\b1er\b", "1"),
        (r"(?i)(?:^|\s)(?:le|à)(?:\s|$)", " "),
    ]
    .into_iter()
    .map(|(pattern, repl)| {
        (
            Regex::new(pattern).expect("valid French date pattern"),
            repl.to_string(),
        )
    })
    .collect()
});

/// French month and weekday names (full and abbreviated) to English.
#[must_use]
pub fn french_translations() -> &'static [(Regex, String)] {
    &FRENCH
}

/// Parse a French date such as `"mardi 1er février 2022"`.
pub fn parse_french_date(text: &str) -> Result<NaiveDateTime> {
    let translated = translate(text, french_translations());
    parse_datetime(
        &translated,
        ParseOptions {
            dayfirst: true,
            fuzzy: false,
        },
    )
    .map_err(|reason| Error::parse("Date", text, reason))
}

/// Guesses the year of day/month pairs listed in reverse chronological order.
///
/// Each accepted date becomes the new reference, so a list that crosses a
/// new year keeps going back in time. Dates up to `max_bump` in the future
/// of the reference are accepted as is without moving it.
#[derive(Debug, Clone)]
pub struct LinearDateGuesser {
    current: Cell<NaiveDate>,
    max_bump: TimeDelta,
}

impl Default for LinearDateGuesser {
    fn default() -> Self {
        Self::new(Local::now().date_naive())
    }
}

impl LinearDateGuesser {
    #[must_use]
    pub fn new(current: NaiveDate) -> Self {
        Self {
            current: Cell::new(current),
            max_bump: TimeDelta::days(31),
        }
    }

    #[must_use]
    pub fn max_bump(mut self, max_bump: TimeDelta) -> Self {
        self.max_bump = max_bump;
        self
    }

    #[must_use]
    pub fn current(&self) -> NaiveDate {
        self.current.get()
    }

    /// Most recent year, not before `start - 5`, in which `day/month` exists.
    fn assign_year(day: u32, month: u32, start: i32) -> Option<NaiveDate> {
        (start - 5..=start)
            .rev()
            .find_map(|year| NaiveDate::from_ymd_opt(year, month, day))
    }

    /// Date for `day/month`, moving the reference date along.
    pub fn guess_date(&self, day: u32, month: u32) -> Result<NaiveDate> {
        let today = self.current.get();
        let naive = Self::assign_year(day, month, today.year()).ok_or_else(|| {
            Error::parse("DateGuesser", format!("{day}/{month}"), "no such day")
        })?;

        if naive.year() != today.year() {
            self.current.set(naive);
            return Ok(naive);
        }
        let horizon = today.checked_add_signed(self.max_bump).unwrap_or(
            if self.max_bump > TimeDelta::zero() { NaiveDate::MAX } else { NaiveDate::MIN },
        );
        if naive > horizon {
            let previous = NaiveDate::from_ymd_opt(today.year() - 1, month, day).ok_or_else(|| {
                Error::parse("DateGuesser", format!("{day}/{month}"), "no such day last year")
            })?;
            self.current.set(previous);
            return Ok(previous);
        }
        if naive <= today {
            self.current.set(naive);
        }
        Ok(naive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn parse(text: &str, dayfirst: bool) -> NaiveDateTime {
        parse_datetime_at(
            text,
            ParseOptions {
                dayfirst,
                fuzzy: false,
            },
            today(),
        )
        .unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_iso_formats() {
        assert_eq!(parse("2024-03-01", false), ymd(2024, 3, 1));
        assert_eq!(
            parse("2024-03-01T10:30:00", false),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(10, 30, 0).unwrap()
        );
        assert_eq!(
            parse("2024-03-01T10:30:00+02:00", false).time(),
            NaiveTime::from_hms_opt(10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_dayfirst_controls_ambiguous_dates() {
        assert_eq!(parse("01/02/2024", true), ymd(2024, 2, 1));
        assert_eq!(parse("01/02/2024", false), ymd(2024, 1, 2));
        assert_eq!(parse("13/02/2024", false), ymd(2024, 2, 13));
    }

    #[test]
    fn test_two_digit_years_and_missing_fields() {
        assert_eq!(parse("05/03/99", true), ymd(1999, 3, 5));
        assert_eq!(parse("05/03/24", true), ymd(2024, 3, 5));
        assert_eq!(parse("03/2023", true), ymd(2023, 3, 1));
        assert_eq!(parse("20240301", false), ymd(2024, 3, 1));
    }

    #[test]
    fn test_month_names_and_clock() {
        assert_eq!(parse("5 March 2024", false), ymd(2024, 3, 5));
        assert_eq!(parse("Tuesday, Mar 5th", false), ymd(2024, 3, 5));
        assert_eq!(
            parse("05/03/2024 14h30", true),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(14, 30, 0).unwrap()
        );
        assert_eq!(
            parse("March 5, 2024 2:15 pm", false).time(),
            NaiveTime::from_hms_opt(14, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_unknown_words_need_fuzzy() {
        let strict = ParseOptions::default();
        assert!(parse_datetime_at("paid on 05/03/2024", strict, today()).is_err());
        let fuzzy = ParseOptions {
            dayfirst: true,
            fuzzy: true,
        };
        assert_eq!(
            parse_datetime_at("paid 05/03/2024", fuzzy, today()).unwrap(),
            ymd(2024, 3, 5)
        );
        assert!(parse_datetime_at("", fuzzy, today()).is_err());
        assert!(parse_datetime_at("31/02/2024", fuzzy, today()).is_err());
    }

    #[test]
    fn test_french_translations() {
        let text = translate("mardi 1er février 2022", french_translations());
        assert_eq!(
            parse_datetime_at(&text, ParseOptions { dayfirst: true, fuzzy: false }, today()).unwrap(),
            ymd(2022, 2, 1)
        );
        assert_eq!(parse_french_date("15 août 2023").unwrap(), ymd(2023, 8, 15));
        assert_eq!(
            translate("sept. 2023, september", french_translations()),
            "september 2023, september"
        );
    }

    #[test]
    fn test_linear_guesser_walks_back_in_time() {
        let guesser = LinearDateGuesser::new(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(guesser.guess_date(5, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(guesser.guess_date(28, 12).unwrap(), NaiveDate::from_ymd_opt(2023, 12, 28).unwrap());
        assert_eq!(guesser.current(), NaiveDate::from_ymd_opt(2023, 12, 28).unwrap());
    }

    #[test]
    fn test_linear_guesser_accepts_small_bumps() {
        let guesser = LinearDateGuesser::new(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(guesser.guess_date(12, 3).unwrap(), NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        assert_eq!(guesser.current(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }

    #[test]
    fn test_linear_guesser_leap_day() {
        let guesser = LinearDateGuesser::new(NaiveDate::from_ymd_opt(2023, 3, 10).unwrap());
        assert_eq!(guesser.guess_date(29, 2).unwrap(), NaiveDate::from_ymd_opt(2020, 2, 29).unwrap());
    }

    #[test]
    fn test_linear_guesser_near_max_date() {
        let guesser = LinearDateGuesser::new(NaiveDate::MAX);
        let mid_december = NaiveDate::MAX.with_day(15).unwrap();
        assert_eq!(guesser.guess_date(15, 12).unwrap(), mid_december);
        let guesser = LinearDateGuesser::new(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap())
            .max_bump(TimeDelta::MAX);
        assert_eq!(guesser.guess_date(12, 3).unwrap(), NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        assert_eq!(guesser.current(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }
}
