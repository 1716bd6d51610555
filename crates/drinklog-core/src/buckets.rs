use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, TimeZone};
use serde::{Deserialize, Serialize};

use crate::record::DrinkRecord;

/// A calendar (year, month) bucket. `month` is 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self::new(at.year(), at.month())
    }

    /// The period shown after the user picks `year`: the first month option
    /// of that year.
    pub fn for_year<Tz: TimeZone>(
        records: &[DrinkRecord],
        year: i32,
        tz: &Tz,
        now: &DateTime<Tz>,
    ) -> Self {
        let month = month_options(records, year, tz, now)
            .first()
            .copied()
            .unwrap_or_else(|| now.month());
        Self::new(year, month)
    }
}

/// The local-time bucket of an epoch-millisecond timestamp, if representable.
pub fn bucket_of<Tz: TimeZone>(timestamp_ms: i64, tz: &Tz) -> Option<Period> {
    tz.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|at| Period::of(&at))
}

pub fn years_with_data<Tz: TimeZone>(records: &[DrinkRecord], tz: &Tz) -> Vec<i32> {
    let years: BTreeSet<i32> = records
        .iter()
        .filter_map(|record| bucket_of(record.timestamp, tz))
        .map(|period| period.year)
        .collect();
    years.into_iter().rev().collect()
}

pub fn months_with_data<Tz: TimeZone>(records: &[DrinkRecord], year: i32, tz: &Tz) -> Vec<u32> {
    let months: BTreeSet<u32> = records
        .iter()
        .filter_map(|record| bucket_of(record.timestamp, tz))
        .filter(|period| period.year == year)
        .map(|period| period.month)
        .collect();
    months.into_iter().collect()
}

/// Year selector contents; the current year when nothing has been logged.
pub fn year_options<Tz: TimeZone>(records: &[DrinkRecord], tz: &Tz, now: &DateTime<Tz>) -> Vec<i32> {
    let years = years_with_data(records, tz);
    if years.is_empty() {
        vec![now.year()]
    } else {
        years
    }
}

/// Month selector contents for `year`; the current month when that year is empty.
pub fn month_options<Tz: TimeZone>(
    records: &[DrinkRecord],
    year: i32,
    tz: &Tz,
    now: &DateTime<Tz>,
) -> Vec<u32> {
    let months = months_with_data(records, year, tz);
    if months.is_empty() {
        vec![now.month()]
    } else {
        months
    }
}

/// Latest month of the latest year with data, or the current month.
pub fn default_selection<Tz: TimeZone>(
    records: &[DrinkRecord],
    tz: &Tz,
    now: &DateTime<Tz>,
) -> Period {
    let Some(&year) = years_with_data(records, tz).first() else {
        return Period::of(now);
    };
    match months_with_data(records, year, tz).last() {
        Some(&month) => Period::new(year, month),
        None => Period::new(year, now.month()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordInput;
    use chrono::Utc;

    fn at(year: i32, month: u32, day: u32) -> i64 {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .expect("valid date")
            .timestamp_millis()
    }

    fn record(id: &str, timestamp: i64) -> DrinkRecord {
        DrinkRecord::from_input(id.into(), timestamp, RecordInput::new("Tea", "A"))
    }

    fn sample() -> Vec<DrinkRecord> {
        vec![
            record("a", at(2024, 3, 1)),
            record("b", at(2023, 11, 5)),
            record("c", at(2024, 1, 9)),
            record("d", at(2023, 2, 5)),
            record("e", at(2024, 3, 20)),
        ]
    }

    #[test]
    fn years_are_distinct_and_descending() {
        assert_eq!(years_with_data(&sample(), &Utc), vec![2024, 2023]);
    }

    #[test]
    fn months_are_distinct_and_ascending() {
        assert_eq!(months_with_data(&sample(), 2024, &Utc), vec![1, 3]);
        assert_eq!(months_with_data(&sample(), 2023, &Utc), vec![2, 11]);
        assert!(months_with_data(&sample(), 2022, &Utc).is_empty());
    }

    #[test]
    fn default_selection_picks_latest_month_of_latest_year() {
        let now = Utc.with_ymd_and_hms(2026, 7, 4, 0, 0, 0).single().expect("now");
        assert_eq!(default_selection(&sample(), &Utc, &now), Period::new(2024, 3));
    }

    #[test]
    fn default_selection_without_data_uses_now() {
        let now = Utc.with_ymd_and_hms(2026, 7, 4, 0, 0, 0).single().expect("now");
        assert_eq!(default_selection(&[], &Utc, &now), Period::new(2026, 7));
        assert_eq!(year_options(&[], &Utc, &now), vec![2026]);
        assert_eq!(month_options(&[], 2026, &Utc, &now), vec![7]);
    }

    #[test]
    fn for_year_resets_to_first_month_option() {
        let now = Utc.with_ymd_and_hms(2026, 7, 4, 0, 0, 0).single().expect("now");
        assert_eq!(Period::for_year(&sample(), 2023, &Utc, &now), Period::new(2023, 2));
        assert_eq!(Period::for_year(&sample(), 2020, &Utc, &now), Period::new(2020, 7));
    }

    #[test]
    fn bucketing_follows_the_zone() {
        let utc_midnight = at(2024, 1, 1) - 12 * 3_600_000;
        let west = chrono::FixedOffset::west_opt(3_600).expect("offset");
        assert_eq!(bucket_of(utc_midnight, &Utc), Some(Period::new(2024, 1)));
        assert_eq!(bucket_of(utc_midnight, &west), Some(Period::new(2023, 12)));
    }
}
