//! Gap-free time series of lead counts.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use time::{Date, Duration, UtcOffset, macros::format_description};

use crate::{analytics::DateRange, lead::Lead};

/// The width of a timeline bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Day,
    /// Calendar weeks starting on Monday.
    Week,
}

impl Granularity {
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Day => "Day",
            Self::Week => "Week",
        }
    }

    /// The first day of the bucket containing `date`.
    pub fn bucket_start(self, date: Date) -> Date {
        match self {
            Self::Day => date,
            Self::Week => {
                date - Duration::days(date.weekday().number_days_from_monday() as i64)
            }
        }
    }

    fn next_bucket(self, bucket_start: Date) -> Option<Date> {
        match self {
            Self::Day => bucket_start.next_day(),
            Self::Week => bucket_start.checked_add(Duration::weeks(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineOptions {
    pub granularity: Granularity,
    /// The days to cover. When absent the range spans the registered leads.
    pub range: Option<DateRange>,
    /// The offset used to place instants on calendar days.
    pub offset: UtcOffset,
    /// The local date, used for the fallback range when no lead has a valid
    /// timestamp.
    pub today: Date,
}

/// One interval of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    /// The first day of the interval.
    pub start: Date,
    pub total: usize,
    /// A count for every series key, including zeros.
    pub by_secondary: BTreeMap<String, usize>,
}

/// A dense series of buckets that all share the same series keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub granularity: Granularity,
    /// The distinct secondary keys in first-seen order.
    pub series_keys: Vec<String>,
    pub buckets: Vec<Bucket>,
}

impl Timeline {
    /// Bucket labels formatted as `dd/mm/yyyy`.
    pub fn labels(&self) -> Vec<String> {
        let format = format_description!("[day]/[month]/[year]");

        self.buckets
            .iter()
            .map(|bucket| {
                bucket
                    .start
                    .format(format)
                    .unwrap_or_else(|_| bucket.start.to_string())
            })
            .collect()
    }

    /// The count for `key` in every bucket.
    pub fn series(&self, key: &str) -> Vec<i64> {
        self.buckets
            .iter()
            .map(|bucket| bucket.by_secondary.get(key).copied().unwrap_or(0) as i64)
            .collect()
    }

    pub fn totals(&self) -> Vec<i64> {
        self.buckets
            .iter()
            .map(|bucket| bucket.total as i64)
            .collect()
    }

    /// Whether no lead was placed in any bucket.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.total == 0)
    }
}

const FALLBACK_DAYS: i64 = 30;

/// Count leads per calendar interval, broken down by `secondary_key_fn`.
///
/// Every interval in the range appears once, in order, even with no leads.
/// Leads without a valid registration time are not placed, nor are leads
/// outside an explicit range.
pub fn bucketize<F>(leads: &[&Lead], secondary_key_fn: F, options: &TimelineOptions) -> Timeline
where
    F: Fn(&Lead) -> String,
{
    let granularity = options.granularity;

    let mut series_keys = Vec::new();
    let mut seen_keys = HashSet::new();
    let mut placed: Vec<(Date, String)> = Vec::new();

    for lead in leads {
        let key = secondary_key_fn(lead);
        if seen_keys.insert(key.clone()) {
            series_keys.push(key.clone());
        }

        let Some(instant) = lead.registered_instant() else {
            continue;
        };
        if options
            .range
            .is_some_and(|range| !range.contains(instant))
        {
            continue;
        }

        placed.push((instant.to_offset(options.offset).date(), key));
    }

    let (first_day, last_day) = match options.range {
        Some(range) => (range.start, range.end),
        None => {
            let first = placed.iter().map(|(date, _)| *date).min();
            let last = placed.iter().map(|(date, _)| *date).max();
            match (first, last) {
                (Some(first), Some(last)) => (first, last),
                _ => (
                    options.today - Duration::days(FALLBACK_DAYS),
                    options.today,
                ),
            }
        }
    };

    let empty_counts: BTreeMap<String, usize> =
        series_keys.iter().map(|key| (key.clone(), 0)).collect();

    let mut buckets = Vec::new();
    let mut index_by_start = BTreeMap::new();
    let last_start = granularity.bucket_start(last_day);
    let mut next_start = Some(granularity.bucket_start(first_day));

    while let Some(start) = next_start.filter(|start| *start <= last_start) {
        index_by_start.insert(start, buckets.len());
        buckets.push(Bucket {
            start,
            total: 0,
            by_secondary: empty_counts.clone(),
        });
        next_start = granularity.next_bucket(start);
    }

    for (date, key) in placed {
        let Some(&index) = index_by_start.get(&granularity.bucket_start(date)) else {
            continue;
        };
        let bucket = &mut buckets[index];
        bucket.total += 1;
        *bucket.by_secondary.entry(key).or_insert(0) += 1;
    }

    Timeline {
        granularity,
        series_keys,
        buckets,
    }
}
