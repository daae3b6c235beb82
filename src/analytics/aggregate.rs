//! Frequency rankings over lead attributes.
//!
//! [aggregate] groups leads by a single key and ranks the groups by count.
//! [aggregate_2d] cross-tabulates the top values of two keys into a dense
//! [Matrix].

use std::collections::HashMap;

use serde::Serialize;

use crate::lead::{Lead, LeadField};

/// Controls which keys are counted and how many ranked keys are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateOptions {
    /// Keys that are dropped before counting, compared case-insensitively.
    pub exclude: Vec<String>,
    /// Keep only the first `top_n` keys after ranking.
    pub top_n: Option<usize>,
}

impl AggregateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop keys equal to `sentinel`, ignoring case.
    pub fn excluding(mut self, sentinel: impl Into<String>) -> Self {
        self.exclude.push(sentinel.into());
        self
    }

    /// Keep at most `n` ranked keys.
    pub fn top(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    fn is_excluded(&self, key: &str) -> bool {
        self.exclude
            .iter()
            .any(|sentinel| sentinel.eq_ignore_ascii_case(key))
    }

    /// Apply the exclusion rules to a raw extracted key.
    fn accept(&self, key: Option<String>) -> Option<String> {
        key.filter(|key| !key.is_empty() && !self.is_excluded(key))
    }
}

/// A key with its count and its share of all counted leads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedKey {
    pub key: String,
    pub count: usize,
    /// `100 * count / total`, where `total` counts every lead that produced a
    /// key, including those cut by `top_n`.
    pub percentage: f64,
}

/// Keys ranked by count, descending, ties in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationResult {
    pub entries: Vec<RankedKey>,
    /// The number of leads that produced a key.
    pub total: usize,
}

impl AggregationResult {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankedKey> {
        self.entries.iter()
    }

    /// The ranked keys, in order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key.clone()).collect()
    }

    /// The counts, in ranked order.
    pub fn counts(&self) -> Vec<i64> {
        self.entries.iter().map(|entry| entry.count as i64).collect()
    }
}

impl<'a> IntoIterator for &'a AggregationResult {
    type Item = &'a RankedKey;
    type IntoIter = std::slice::Iter<'a, RankedKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A key function that reads `field` and trims surrounding whitespace.
///
/// Case is preserved, so `"CEO"` and `"ceo"` are different keys.
pub fn trimmed(field: LeadField) -> impl Fn(&Lead) -> Option<String> {
    move |lead: &Lead| field.raw_value(lead).map(|value| value.trim().to_owned())
}

/// The key used for leads that did not provide a value.
pub const NOT_PROVIDED: &str = "Not provided";

/// A key function like [trimmed] that groups missing and empty values under
/// [NOT_PROVIDED] instead of dropping them.
pub fn or_not_provided(field: LeadField) -> impl Fn(&Lead) -> Option<String> {
    move |lead: &Lead| {
        let value = field.raw_value(lead).map(str::trim).unwrap_or_default();
        if value.is_empty() {
            Some(NOT_PROVIDED.to_owned())
        } else {
            Some(value.to_owned())
        }
    }
}

/// Count `keys` in first-seen order.
fn count_in_first_seen_order<I>(keys: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for key in keys {
        match index.get(&key) {
            Some(&position) => counts[position].1 += 1,
            None => {
                index.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }

    counts
}

/// Rank counted keys by count, descending. `sort_by` is stable so ties keep
/// first-seen order.
fn rank(mut counts: Vec<(String, usize)>) -> Vec<(String, usize)> {
    counts.sort_by(|(_, a), (_, b)| b.cmp(a));
    counts
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

/// Group `leads` by the key `key_fn` extracts and rank the groups by count.
///
/// Leads whose key is missing, empty or excluded by `options` are not counted
/// and do not contribute to the percentage total.
pub fn aggregate<F>(leads: &[&Lead], key_fn: F, options: &AggregateOptions) -> AggregationResult
where
    F: Fn(&Lead) -> Option<String>,
{
    let keys: Vec<String> = leads
        .iter()
        .filter_map(|lead| options.accept(key_fn(lead)))
        .collect();
    let total = keys.len();

    let mut entries: Vec<RankedKey> = rank(count_in_first_seen_order(keys))
        .into_iter()
        .map(|(key, count)| RankedKey {
            key,
            count,
            percentage: percentage(count, total),
        })
        .collect();

    if let Some(top_n) = options.top_n {
        entries.truncate(top_n);
    }

    AggregationResult { entries, total }
}

/// A dense grid of counts for the top row keys × the top column keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Matrix {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `counts[row][column]`, zero for combinations with no leads.
    pub counts: Vec<Vec<usize>>,
    /// The largest cell count, zero for an empty grid.
    pub max_count: usize,
    /// The number of leads that carried both keys.
    pub total: usize,
}

impl Matrix {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn count(&self, row: usize, column: usize) -> usize {
        self.counts
            .get(row)
            .and_then(|cells| cells.get(column))
            .copied()
            .unwrap_or(0)
    }

    /// The cell count as a percentage of `max_count`, zero when every cell is
    /// zero.
    pub fn intensity(&self, row: usize, column: usize) -> f64 {
        percentage(self.count(row, column), self.max_count)
    }

    /// The cell count as a percentage of leads carrying both keys.
    pub fn percentage(&self, row: usize, column: usize) -> f64 {
        percentage(self.count(row, column), self.total)
    }
}

/// Cross-tabulate two keys.
///
/// Only leads that produce both keys are considered. Each dimension keeps the
/// values ranked highest by their own marginal frequency, capped by the
/// `top_n` of its options. Every row × column cell is present in the result.
pub fn aggregate_2d<F, G>(
    leads: &[&Lead],
    row_key_fn: F,
    column_key_fn: G,
    row_options: &AggregateOptions,
    column_options: &AggregateOptions,
) -> Matrix
where
    F: Fn(&Lead) -> Option<String>,
    G: Fn(&Lead) -> Option<String>,
{
    let pairs: Vec<(String, String)> = leads
        .iter()
        .filter_map(|lead| {
            let row = row_options.accept(row_key_fn(lead))?;
            let column = column_options.accept(column_key_fn(lead))?;
            Some((row, column))
        })
        .collect();

    let top_keys = |keys: Vec<String>, options: &AggregateOptions| {
        let mut ranked: Vec<String> = rank(count_in_first_seen_order(keys))
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        if let Some(top_n) = options.top_n {
            ranked.truncate(top_n);
        }
        ranked
    };

    let rows = top_keys(pairs.iter().map(|(row, _)| row.clone()).collect(), row_options);
    let columns = top_keys(
        pairs.iter().map(|(_, column)| column.clone()).collect(),
        column_options,
    );

    let row_index: HashMap<&str, usize> = rows
        .iter()
        .enumerate()
        .map(|(index, key)| (key.as_str(), index))
        .collect();
    let column_index: HashMap<&str, usize> = columns
        .iter()
        .enumerate()
        .map(|(index, key)| (key.as_str(), index))
        .collect();

    let mut counts = vec![vec![0; columns.len()]; rows.len()];
    for (row, column) in &pairs {
        if let (Some(&r), Some(&c)) = (
            row_index.get(row.as_str()),
            column_index.get(column.as_str()),
        ) {
            counts[r][c] += 1;
        }
    }

    let max_count = counts.iter().flatten().copied().max().unwrap_or(0);

    Matrix {
        rows,
        columns,
        counts,
        max_count,
        total: pairs.len(),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analytics::{AggregateOptions, NOT_PROVIDED, aggregate, aggregate_2d, or_not_provided, trimmed},
        lead::{Lead, LeadField, NULL_SENTINEL},
    };

    fn with_title(id: &str, title: Option<&str>) -> Lead {
        Lead {
            title: title.map(str::to_owned),
            ..Lead::new(id)
        }
    }

    fn with_title_and_source(title: &str, source: &str) -> Lead {
        Lead {
            title: Some(title.to_owned()),
            utm_source: Some(source.to_owned()),
            ..Lead::new("x")
        }
    }

    #[test]
    fn trims_without_case_folding() {
        let leads = vec![
            with_title("1", Some("CEO")),
            with_title("2", Some("ceo")),
            with_title("3", Some(" CEO ")),
        ];
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = aggregate(&refs, trimmed(LeadField::Title), &AggregateOptions::new());

        assert_eq!(got.keys(), vec!["CEO", "ceo"]);
        assert_eq!(got.counts(), vec![2, 1]);
    }

    #[test]
    fn sentinel_and_missing_keys_are_dropped() {
        let leads = vec![
            Lead {
                company: Some("Acme".to_owned()),
                ..Lead::new("1")
            },
            Lead {
                company: Some("null".to_owned()),
                ..Lead::new("2")
            },
            Lead::new("3"),
            Lead {
                company: Some("NULL".to_owned()),
                ..Lead::new("4")
            },
        ];
        let refs: Vec<&Lead> = leads.iter().collect();
        let options = AggregateOptions::new().excluding(NULL_SENTINEL);

        let got = aggregate(&refs, trimmed(LeadField::Company), &options);

        assert_eq!(got.keys(), vec!["Acme"]);
        assert_eq!(got.total, 1);
        assert_eq!(got.entries[0].percentage, 100.0);
    }

    #[test]
    fn whitespace_only_key_is_dropped() {
        let leads = vec![with_title("1", Some("   ")), with_title("2", Some("CTO"))];
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = aggregate(&refs, trimmed(LeadField::Title), &AggregateOptions::new());

        assert_eq!(got.keys(), vec!["CTO"]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let leads = vec![
            with_title("1", Some("B")),
            with_title("2", Some("A")),
            with_title("3", Some("C")),
            with_title("4", Some("A")),
            with_title("5", Some("B")),
        ];
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = aggregate(&refs, trimmed(LeadField::Title), &AggregateOptions::new());

        assert_eq!(got.keys(), vec!["B", "A", "C"]);
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let leads: Vec<Lead> = ["a", "b", "b", "c", "c", "c", "d"]
            .iter()
            .map(|title| with_title("1", Some(title)))
            .collect();
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = aggregate(&refs, trimmed(LeadField::Title), &AggregateOptions::new());
        let sum: f64 = got.iter().map(|entry| entry.percentage).sum();

        assert!((sum - 100.0).abs() < 1e-9, "got sum {sum}");
    }

    #[test]
    fn top_n_truncates_without_rescaling() {
        let leads: Vec<Lead> = ["a", "a", "a", "b", "b", "c", "d", "e", "e", "e"]
            .iter()
            .map(|title| with_title("1", Some(title)))
            .collect();
        let refs: Vec<&Lead> = leads.iter().collect();
        let full = aggregate(&refs, trimmed(LeadField::Title), &AggregateOptions::new());

        let got = aggregate(
            &refs,
            trimmed(LeadField::Title),
            &AggregateOptions::new().top(2),
        );

        assert_eq!(got.len(), 2);
        assert_eq!(got.entries[..], full.entries[..2]);
        assert_eq!(got.entries[0].percentage, 30.0);
        assert_eq!(got.total, 10);
    }

    #[test]
    fn missing_values_can_be_grouped_as_not_provided() {
        let leads = vec![
            Lead {
                region: Some("Baixada".to_owned()),
                ..Lead::new("1")
            },
            Lead::new("2"),
            Lead {
                region: Some(" ".to_owned()),
                ..Lead::new("3")
            },
        ];
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = aggregate(&refs, or_not_provided(LeadField::Region), &AggregateOptions::new());

        assert_eq!(got.keys(), vec![NOT_PROVIDED, "Baixada"]);
        assert_eq!(got.total, 3);
    }

    #[test]
    fn empty_input_gives_empty_result() {
        let got = aggregate(&[], trimmed(LeadField::Title), &AggregateOptions::new());

        assert!(got.is_empty());
        assert_eq!(got.total, 0);
    }

    #[test]
    fn matrix_is_dense_and_ranked_by_marginals() {
        let leads = vec![
            with_title_and_source("CEO", "google"),
            with_title_and_source("CEO", "google"),
            with_title_and_source("CEO", "meta"),
            with_title_and_source("CTO", "meta"),
            with_title_and_source("Intern", "tiktok"),
        ];
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = aggregate_2d(
            &refs,
            trimmed(LeadField::Title),
            trimmed(LeadField::UtmSource),
            &AggregateOptions::new().top(2),
            &AggregateOptions::new().top(2),
        );

        assert_eq!(got.rows, vec!["CEO", "CTO"]);
        assert_eq!(got.columns, vec!["google", "meta"]);
        assert_eq!(got.counts, vec![vec![2, 1], vec![0, 1]]);
        assert_eq!(got.max_count, 2);
        assert_eq!(got.total, 5);
        assert_eq!(got.intensity(0, 0), 100.0);
        assert_eq!(got.intensity(1, 1), 50.0);
        assert_eq!(got.intensity(1, 0), 0.0);
    }

    #[test]
    fn matrix_ignores_leads_missing_either_key() {
        let leads = vec![
            with_title_and_source("CEO", "google"),
            with_title("no source", Some("CFO")),
            Lead {
                utm_source: Some("meta".to_owned()),
                ..Lead::new("no title")
            },
        ];
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = aggregate_2d(
            &refs,
            trimmed(LeadField::Title),
            trimmed(LeadField::UtmSource),
            &AggregateOptions::new(),
            &AggregateOptions::new(),
        );

        assert_eq!(got.rows, vec!["CEO"]);
        assert_eq!(got.columns, vec!["google"]);
        assert_eq!(got.total, 1);
    }

    #[test]
    fn empty_matrix_has_zero_intensity() {
        let got = aggregate_2d(
            &[],
            trimmed(LeadField::Title),
            trimmed(LeadField::UtmSource),
            &AggregateOptions::new(),
            &AggregateOptions::new(),
        );

        assert!(got.is_empty());
        assert_eq!(got.max_count, 0);
        assert_eq!(got.intensity(0, 0), 0.0);
    }
}
