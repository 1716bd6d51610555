use std::{cmp::Ordering, collections::HashMap, fmt, str::FromStr};

use chrono::TimeZone;
use serde::{Deserialize, Serialize};

use crate::{
    buckets::{Period, bucket_of},
    record::DrinkRecord,
};

/// Metric the brand ranking is ordered by. Order is always descending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Count,
    Calories,
    Price,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Count => "count",
            SortKey::Calories => "calories",
            SortKey::Price => "price",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "count" => Ok(SortKey::Count),
            "calories" => Ok(SortKey::Calories),
            "price" => Ok(SortKey::Price),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overview {
    pub total_count: usize,
    pub total_calories: u64,
    pub total_price: f64,
}

impl Overview {
    /// Total price with exactly two fractional digits.
    pub fn total_price_display(&self) -> String {
        format_price(self.total_price)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BrandStats {
    pub brand: String,
    pub count: usize,
    pub total_calories: u64,
    pub total_price: f64,
}

impl BrandStats {
    fn new(brand: &str) -> Self {
        Self {
            brand: brand.to_string(),
            count: 0,
            total_calories: 0,
            total_price: 0.0,
        }
    }

    fn add(&mut self, record: &DrinkRecord) {
        self.count += 1;
        self.total_calories += u64::from(record.calories.unwrap_or(0));
        self.total_price += record.price.unwrap_or(0.0);
    }

    fn compare_desc(&self, other: &Self, key: SortKey) -> Ordering {
        match key {
            SortKey::Count => other.count.cmp(&self.count),
            SortKey::Calories => other.total_calories.cmp(&self.total_calories),
            SortKey::Price => other.total_price.total_cmp(&self.total_price),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatsReport {
    pub period: Period,
    pub sort_key: SortKey,
    pub overview: Overview,
    pub ranking: Vec<BrandStats>,
}

/// Two decimals. Exact half-cent ties round away from zero, as JavaScript's
/// `toFixed` does; `{:.2}` alone would round them to even.
pub fn format_price(value: f64) -> String {
    // a tie is exactly representable only as an odd number of eighths
    let eighths = value * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        return format!("{:.2}", value + value.signum() * 0.001);
    }
    format!("{value:.2}")
}

pub fn filter_period<'a, Tz: TimeZone>(
    records: &'a [DrinkRecord],
    period: Period,
    tz: &Tz,
) -> Vec<&'a DrinkRecord> {
    records
        .iter()
        .filter(|record| bucket_of(record.timestamp, tz) == Some(period))
        .collect()
}

pub fn overview(records: &[&DrinkRecord]) -> Overview {
    let mut overview = Overview {
        total_count: records.len(),
        ..Overview::default()
    };
    for record in records {
        overview.total_calories += u64::from(record.calories.unwrap_or(0));
        overview.total_price += record.price.unwrap_or(0.0);
    }
    overview
}

/// Per-brand totals in order of each brand's first appearance.
pub fn group_by_brand(records: &[&DrinkRecord]) -> Vec<BrandStats> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<BrandStats> = Vec::new();

    for record in records {
        let slot = *index.entry(record.brand.as_str()).or_insert_with(|| {
            groups.push(BrandStats::new(&record.brand));
            groups.len() - 1
        });
        groups[slot].add(record);
    }

    groups
}

/// Stable descending sort; ties keep grouping order.
pub fn rank(mut groups: Vec<BrandStats>, key: SortKey) -> Vec<BrandStats> {
    groups.sort_by(|a, b| a.compare_desc(b, key));
    groups
}

pub fn compute<Tz: TimeZone>(
    records: &[DrinkRecord],
    period: Period,
    sort_key: SortKey,
    tz: &Tz,
) -> StatsReport {
    let filtered = filter_period(records, period, tz);
    StatsReport {
        period,
        sort_key,
        overview: overview(&filtered),
        ranking: rank(group_by_brand(&filtered), sort_key),
    }
}
