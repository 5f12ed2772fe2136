//! Chronological ordering of free-text date/time descriptors
//!
//! Descriptors look like `"13/01/2026 - Manhã"` or `"16/01/2026 - 07:30"`.
//! Anything else still gets a key: undetermined entries (`"A Definir"`,
//! empty) sort last, malformed ones carry the sentinel date so they land
//! after every parsed date but keep tier 0.

use std::num::IntErrorKind;

use chrono::NaiveDate;

const SENTINEL_MINUTES: i64 = 9999;

/// Period names and the approximate clock time they stand for.
#[derive(Debug, Clone)]
pub struct PeriodTable {
    undetermined_prefix: String,
    fallback_minutes: i64,
    periods: Vec<(String, i64)>,
}

impl PeriodTable {
    pub fn new(undetermined_label: &str, fallback_minutes: i64) -> Self {
        Self {
            undetermined_prefix: undetermined_label.trim().to_lowercase(),
            fallback_minutes,
            periods: Vec::new(),
        }
    }

    pub fn with_period(mut self, label: &str, minutes: i64) -> Self {
        self.periods.push((label.trim().to_lowercase(), minutes));
        self
    }

    /// Minutes for a lower-cased period name, or the fallback time.
    fn minutes_for(&self, period: &str) -> i64 {
        self.periods
            .iter()
            .find(|(label, _)| label == period)
            .map(|(_, minutes)| *minutes)
            .unwrap_or(self.fallback_minutes)
    }

    fn is_undetermined(&self, value: &str) -> bool {
        value.is_empty() || value.to_lowercase().starts_with(self.undetermined_prefix.as_str())
    }
}

/// Total-order key: tier, date, minutes since midnight, original index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey {
    pub tier: u8,
    pub date: NaiveDate,
    pub minutes: i64,
    pub index: usize,
}

impl SortKey {
    fn sentinel(tier: u8, index: usize) -> Self {
        Self {
            tier,
            date: sentinel_date(),
            minutes: SENTINEL_MINUTES,
            index,
        }
    }
}

fn sentinel_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Build the sort key for `text` found at position `index` of its sequence.
pub fn sort_key(text: &str, index: usize, periods: &PeriodTable) -> SortKey {
    let value = text.trim();
    if periods.is_undetermined(value) {
        return SortKey::sentinel(1, index);
    }

    let Some((date_part, period_part)) = value.split_once(" - ") else {
        return SortKey::sentinel(0, index);
    };
    let Some(date) = parse_day_month_year(date_part.trim()) else {
        return SortKey::sentinel(0, index);
    };

    let period = period_part.trim().to_lowercase();
    let minutes = if period.contains(':') {
        parse_loose_time(period.as_str()).unwrap_or(periods.fallback_minutes)
    } else {
        periods.minutes_for(period.as_str())
    };

    SortKey {
        tier: 0,
        date,
        minutes,
        index,
    }
}

/// Parse `DD/MM/YYYY`; day and month may drop the leading zero, the year
/// must have four digits.
fn parse_day_month_year(value: &str) -> Option<NaiveDate> {
    let mut parts = value.split('/');
    let day = parts.next()?;
    let month = parts.next()?;
    let year = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let is_digits = |part: &str, min: usize, max: usize| {
        (min..=max).contains(&part.len()) && part.chars().all(|ch| ch.is_ascii_digit())
    };
    if !is_digits(day, 1, 2) || !is_digits(month, 1, 2) || !is_digits(year, 4, 4) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// `"hh:mm"` split at the first colon. Out-of-range values are kept as
/// they are and huge ones saturate; only non-numeric parts fail.
fn parse_loose_time(value: &str) -> Option<i64> {
    let (hh, mm) = value.split_once(':')?;
    let hours = parse_saturating(hh.trim())?;
    let minutes = parse_saturating(mm.trim())?;
    Some(hours.saturating_mul(60).saturating_add(minutes))
}

fn parse_saturating(value: &str) -> Option<i64> {
    match value.parse::<i64>() {
        Ok(number) => Some(number),
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// Reorder `items` by the schedule key of their descriptor. Entries with
/// equal keys keep their input order.
pub fn order_by_schedule<T, F>(items: Vec<T>, periods: &PeriodTable, descriptor: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut keyed: Vec<(SortKey, T)> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| (sort_key(descriptor(&item), index, periods), item))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, item)| item).collect()
}

/// Positions of `descriptors` in schedule order.
pub fn schedule_order<'a, I>(descriptors: I, periods: &PeriodTable) -> Vec<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut keys: Vec<SortKey> = descriptors
        .into_iter()
        .enumerate()
        .map(|(index, text)| sort_key(text, index, periods))
        .collect();
    keys.sort();
    keys.into_iter().map(|key| key.index).collect()
}
