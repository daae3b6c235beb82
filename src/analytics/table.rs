//! Search, sort and page through a set of leads.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::lead::{Lead, LeadField, format_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }

    /// The sort applied by the next click on a column header: ascending,
    /// then descending, then unsorted.
    pub fn cycle(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Self::Ascending),
            Some(Self::Ascending) => Some(Self::Descending),
            Some(Self::Descending) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    /// Case-insensitive text matched against every field. Blank means no
    /// search.
    pub search_term: Option<String>,
    pub sort: Option<(LeadField, SortDirection)>,
    /// 1-indexed page number.
    pub page: u64,
    pub page_size: u64,
    /// The offset registration times are displayed (and searched) in.
    pub local_offset: UtcOffset,
}

/// One page of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePage<'a> {
    pub rows: Vec<&'a Lead>,
    /// The number of leads after searching.
    pub total_count: u64,
    /// Always at least one.
    pub total_pages: u64,
    /// The page that was returned, after clamping the requested page.
    pub page: u64,
}

/// Apply the search, sort and page in `options` to `leads`.
///
/// A page past the last page returns the last page; page zero returns the
/// first page.
pub fn view<'a>(leads: &[&'a Lead], options: &TableOptions) -> TablePage<'a> {
    let needle = options
        .search_term
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase);

    let mut rows: Vec<&'a Lead> = match needle {
        Some(needle) => leads
            .iter()
            .copied()
            .filter(|lead| matches_search(lead, &needle, options.local_offset))
            .collect(),
        None => leads.to_vec(),
    };

    if let Some((field, direction)) = options.sort {
        rows = sort_leads(rows, field, direction);
    }

    let page_size = options.page_size.max(1);
    let total_count = rows.len() as u64;
    let total_pages = total_count.div_ceil(page_size).max(1);
    let page = options.page.clamp(1, total_pages);

    let start = ((page - 1) * page_size) as usize;
    let rows = rows
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect();

    TablePage {
        rows,
        total_count,
        total_pages,
        page,
    }
}

/// The text shown for `field` in the table.
///
/// Registration times are shown in `local_offset`; unparseable times are
/// shown as stored.
pub fn display_value(lead: &Lead, field: LeadField, local_offset: UtcOffset) -> String {
    if field.is_temporal() {
        if let Some(instant) = lead.registered_instant() {
            return format_timestamp(instant, local_offset);
        }
    }

    field.raw_value(lead).unwrap_or_default().to_owned()
}

fn matches_search(lead: &Lead, needle: &str, local_offset: UtcOffset) -> bool {
    LeadField::ALL.into_iter().any(|field| {
        let raw_match = field
            .raw_value(lead)
            .is_some_and(|value| value.to_lowercase().contains(needle));

        raw_match
            || (field.is_temporal()
                && lead
                    .registered_instant()
                    .is_some_and(|instant| {
                        format_timestamp(instant, local_offset).contains(needle)
                    }))
    })
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Instant(OffsetDateTime),
    Text { folded: String, raw: String },
}

fn sort_key(lead: &Lead, field: LeadField) -> Option<SortKey> {
    if field.is_temporal() {
        return lead.registered_instant().map(SortKey::Instant);
    }

    field.present_value(lead).map(|value| SortKey::Text {
        folded: collation_key(value),
        raw: value.to_owned(),
    })
}

/// Absent values sort after present values ascending, and before them
/// descending.
fn compare_keys(a: &Option<SortKey>, b: &Option<SortKey>, direction: SortDirection) -> Ordering {
    let absent_last = match direction {
        SortDirection::Ascending => Ordering::Greater,
        SortDirection::Descending => Ordering::Less,
    };

    match (a, b) {
        (Some(a), Some(b)) => match direction {
            SortDirection::Ascending => a.cmp(b),
            SortDirection::Descending => b.cmp(a),
        },
        (None, None) => Ordering::Equal,
        (None, Some(_)) => absent_last,
        (Some(_), None) => absent_last.reverse(),
    }
}

fn sort_leads(rows: Vec<&Lead>, field: LeadField, direction: SortDirection) -> Vec<&Lead> {
    let mut keyed: Vec<(Option<SortKey>, &Lead)> = rows
        .into_iter()
        .map(|lead| (sort_key(lead, field), lead))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, direction));

    keyed.into_iter().map(|(_, lead)| lead).collect()
}

/// Approximate dictionary order: lower case with Latin diacritics removed.
fn collation_key(value: &str) -> String {
    value
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_diacritic)
        .collect()
}

fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use time::UtcOffset;

    use crate::{
        analytics::{SortDirection, TableOptions, view},
        lead::{Lead, LeadField},
    };

    fn options() -> TableOptions {
        TableOptions {
            search_term: None,
            sort: None,
            page: 1,
            page_size: 50,
            local_offset: UtcOffset::UTC,
        }
    }

    fn named(id: &str, name: Option<&str>) -> Lead {
        Lead {
            name: name.map(str::to_owned),
            ..Lead::new(id)
        }
    }

    fn ids<'a>(rows: &[&'a Lead]) -> Vec<&'a str> {
        rows.iter().map(|lead| lead.id.as_str()).collect()
    }

    #[test]
    fn paginates_with_ceiling_page_count() {
        let leads: Vec<Lead> = (1..=5).map(|i| Lead::new(i.to_string())).collect();
        let refs: Vec<&Lead> = leads.iter().collect();

        let page_three = view(
            &refs,
            &TableOptions {
                page: 3,
                page_size: 2,
                ..options()
            },
        );

        assert_eq!(page_three.total_pages, 3);
        assert_eq!(page_three.total_count, 5);
        assert_eq!(ids(&page_three.rows), vec!["5"]);
    }

    #[test]
    fn out_of_range_page_clamps_to_last_page() {
        let leads: Vec<Lead> = (1..=5).map(|i| Lead::new(i.to_string())).collect();
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = view(
            &refs,
            &TableOptions {
                page: 4,
                page_size: 2,
                ..options()
            },
        );

        assert_eq!(got.page, 3);
        assert_eq!(ids(&got.rows), vec!["5"]);
    }

    #[test]
    fn empty_input_has_one_empty_page() {
        let got = view(&[], &options());

        assert_eq!(got.total_pages, 1);
        assert_eq!(got.total_count, 0);
        assert!(got.rows.is_empty());
    }

    #[test]
    fn zero_page_and_page_size_are_treated_as_one() {
        let leads = vec![Lead::new("1"), Lead::new("2")];
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = view(
            &refs,
            &TableOptions {
                page: 0,
                page_size: 0,
                ..options()
            },
        );

        assert_eq!(got.page, 1);
        assert_eq!(got.total_pages, 2);
        assert_eq!(ids(&got.rows), vec!["1"]);
    }

    #[test]
    fn search_matches_any_field_ignoring_case() {
        let leads = vec![
            Lead {
                utm_campaign: Some("Black_Friday".to_owned()),
                ..Lead::new("1")
            },
            named("2", Some("Maria")),
            Lead {
                email: Some("FRIDAY@example.com".to_owned()),
                ..Lead::new("3")
            },
        ];
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = view(
            &refs,
            &TableOptions {
                search_term: Some("friday".to_owned()),
                ..options()
            },
        );

        assert_eq!(ids(&got.rows), vec!["1", "3"]);
    }

    #[test]
    fn search_matches_displayed_date() {
        let leads = vec![
            Lead {
                registered_at: Some("2025-07-15T09:30:00Z".to_owned()),
                ..Lead::new("1")
            },
            Lead::new("2"),
        ];
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = view(
            &refs,
            &TableOptions {
                search_term: Some("15/07/2025".to_owned()),
                ..options()
            },
        );

        assert_eq!(ids(&got.rows), vec!["1"]);
    }

    #[test]
    fn blank_search_matches_everything() {
        let leads = vec![Lead::new("1"), Lead::new("2")];
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = view(
            &refs,
            &TableOptions {
                search_term: Some("   ".to_owned()),
                ..options()
            },
        );

        assert_eq!(got.total_count, 2);
    }

    #[test]
    fn strings_sort_ignoring_case_and_accents() {
        let leads = vec![
            named("1", Some("Zé")),
            named("2", Some("álvaro")),
            named("3", Some("Bruno")),
            named("4", Some("Ana")),
        ];
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = view(
            &refs,
            &TableOptions {
                sort: Some((LeadField::Name, SortDirection::Ascending)),
                ..options()
            },
        );

        assert_eq!(ids(&got.rows), vec!["2", "4", "3", "1"]);
    }

    #[test]
    fn absent_values_sort_last_ascending_and_first_descending() {
        let leads = vec![
            named("missing", None),
            named("b", Some("b")),
            named("a", Some("a")),
        ];
        let refs: Vec<&Lead> = leads.iter().collect();

        let ascending = view(
            &refs,
            &TableOptions {
                sort: Some((LeadField::Name, SortDirection::Ascending)),
                ..options()
            },
        );
        let descending = view(
            &refs,
            &TableOptions {
                sort: Some((LeadField::Name, SortDirection::Descending)),
                ..options()
            },
        );

        assert_eq!(ids(&ascending.rows), vec!["a", "b", "missing"]);
        assert_eq!(ids(&descending.rows), vec!["missing", "b", "a"]);
    }

    #[test]
    fn dates_sort_by_instant_with_invalid_dates_as_absent() {
        let leads = vec![
            Lead {
                registered_at: Some("2025-07-15T10:00:00-03:00".to_owned()),
                ..Lead::new("later")
            },
            Lead {
                registered_at: Some("invalid".to_owned()),
                ..Lead::new("invalid")
            },
            Lead {
                // Lexically larger but an earlier instant.
                registered_at: Some("2025-07-15T12:00:00+05:00".to_owned()),
                ..Lead::new("earlier")
            },
        ];
        let refs: Vec<&Lead> = leads.iter().collect();

        let ascending = view(
            &refs,
            &TableOptions {
                sort: Some((LeadField::RegisteredAt, SortDirection::Ascending)),
                ..options()
            },
        );
        let descending = view(
            &refs,
            &TableOptions {
                sort: Some((LeadField::RegisteredAt, SortDirection::Descending)),
                ..options()
            },
        );

        assert_eq!(ids(&ascending.rows), vec!["earlier", "later", "invalid"]);
        assert_eq!(ids(&descending.rows), vec!["invalid", "later", "earlier"]);
    }

    #[test]
    fn profile_sentinel_sorts_as_absent() {
        let leads = vec![
            Lead {
                company: Some("null".to_owned()),
                ..Lead::new("sentinel")
            },
            Lead {
                company: Some("Acme".to_owned()),
                ..Lead::new("acme")
            },
        ];
        let refs: Vec<&Lead> = leads.iter().collect();

        let got = view(
            &refs,
            &TableOptions {
                sort: Some((LeadField::Company, SortDirection::Ascending)),
                ..options()
            },
        );

        assert_eq!(ids(&got.rows), vec!["acme", "sentinel"]);
    }

    #[test]
    fn header_click_cycles_sort() {
        assert_eq!(SortDirection::cycle(None), Some(SortDirection::Ascending));
        assert_eq!(
            SortDirection::cycle(Some(SortDirection::Ascending)),
            Some(SortDirection::Descending)
        );
        assert_eq!(SortDirection::cycle(Some(SortDirection::Descending)), None);
    }
}
