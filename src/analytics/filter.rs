//! Selects the leads that satisfy a [FilterSpec].

use std::collections::{BTreeMap, BTreeSet};

use time::{Date, OffsetDateTime, UtcOffset, macros::time};

use crate::lead::{Lead, LeadField};

/// An inclusive range of calendar days in a local timezone.
///
/// The start is inclusive from midnight and the end is inclusive up to
/// 23:59:59.999, matching a date-only picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
    /// The offset the dates are interpreted in.
    pub offset: UtcOffset,
}

impl DateRange {
    pub fn new(start: Date, end: Date, offset: UtcOffset) -> Self {
        Self { start, end, offset }
    }

    /// The first instant of the start date.
    pub fn start_instant(&self) -> OffsetDateTime {
        self.start.midnight().assume_offset(self.offset)
    }

    /// The last millisecond of the end date.
    pub fn end_instant(&self) -> OffsetDateTime {
        self.end
            .with_time(time!(23:59:59.999))
            .assume_offset(self.offset)
    }

    /// Whether `instant` falls within the range. A range whose start is after
    /// its end contains nothing.
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.start_instant() <= instant && instant <= self.end_instant()
    }

    /// Whether the start date is after the end date.
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    /// The number of days from the start date to the end date, at least one.
    pub fn day_span(&self) -> i64 {
        (self.end - self.start).whole_days().max(1)
    }
}

/// The filters selected by the user for one render.
///
/// An empty allowed set for a field means that field is not constrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub date_range: Option<DateRange>,
    pub set_filters: BTreeMap<LeadField, BTreeSet<String>>,
}

impl FilterSpec {
    /// A spec that matches every lead.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = Some(date_range);
        self
    }

    /// Restrict `field` to `values`, replacing any previous restriction.
    pub fn with_allowed<I, S>(mut self, field: LeadField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_filters
            .insert(field, values.into_iter().map(Into::into).collect());
        self
    }

    /// The allowed values for `field`, empty if unconstrained.
    pub fn allowed(&self, field: LeadField) -> impl Iterator<Item = &str> {
        self.set_filters
            .get(&field)
            .into_iter()
            .flat_map(|values| values.iter().map(String::as_str))
    }

    /// Whether the spec lets every lead through.
    pub fn is_unconstrained(&self) -> bool {
        self.date_range.is_none() && self.set_filters.values().all(BTreeSet::is_empty)
    }

    /// Whether `lead` satisfies every active predicate.
    pub fn matches(&self, lead: &Lead) -> bool {
        if let Some(range) = &self.date_range {
            match lead.registered_instant() {
                Some(instant) if range.contains(instant) => {}
                _ => return false,
            }
        }

        self.set_filters
            .iter()
            .filter(|(_, allowed)| !allowed.is_empty())
            .all(|(field, allowed)| {
                field
                    .raw_value(lead)
                    .is_some_and(|value| !value.is_empty() && allowed.contains(value))
            })
    }
}

/// Return the leads that match `spec`, preserving their order.
pub fn filter_leads<'a, I>(leads: I, spec: &FilterSpec) -> Vec<&'a Lead>
where
    I: IntoIterator<Item = &'a Lead>,
{
    leads.into_iter().filter(|lead| spec.matches(lead)).collect()
}

#[cfg(test)]
mod tests {
    use time::{UtcOffset, macros::date};

    use crate::{
        analytics::{DateRange, FilterSpec, filter_leads},
        lead::{Lead, LeadField},
    };

    fn lead_at(id: &str, registered_at: &str) -> Lead {
        Lead {
            registered_at: Some(registered_at.to_owned()),
            ..Lead::new(id)
        }
    }

    fn brasilia() -> UtcOffset {
        UtcOffset::from_hms(-3, 0, 0).unwrap()
    }

    #[test]
    fn empty_spec_is_identity() {
        let leads = vec![
            lead_at("1", "2025-07-01T10:00:00Z"),
            Lead::new("2"),
            lead_at("3", "garbage"),
        ];

        let got = filter_leads(&leads, &FilterSpec::new());

        assert_eq!(got, leads.iter().collect::<Vec<_>>());
    }

    #[test]
    fn end_date_includes_whole_day() {
        let leads = vec![
            lead_at("early", "2025-07-01T00:00:00-03:00"),
            lead_at("late", "2025-07-03T23:59:59.500-03:00"),
            lead_at("after", "2025-07-04T00:00:00-03:00"),
            lead_at("before", "2025-06-30T23:59:59-03:00"),
        ];
        let spec = FilterSpec::new().with_date_range(DateRange::new(
            date!(2025 - 07 - 01),
            date!(2025 - 07 - 03),
            brasilia(),
        ));

        let got: Vec<_> = filter_leads(&leads, &spec)
            .into_iter()
            .map(|lead| lead.id.as_str())
            .collect();

        assert_eq!(got, vec!["early", "late"]);
    }

    #[test]
    fn date_range_excludes_missing_and_malformed_timestamps() {
        let leads = vec![
            Lead::new("missing"),
            lead_at("malformed", "15-07-2025 06:01"),
            lead_at("valid", "2025-07-15T06:01:00-03:00"),
        ];
        let spec = FilterSpec::new().with_date_range(DateRange::new(
            date!(2025 - 07 - 15),
            date!(2025 - 07 - 15),
            brasilia(),
        ));

        let got = filter_leads(&leads, &spec);

        assert_eq!(got, vec![&leads[2]]);
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let leads = vec![lead_at("1", "2025-07-02T12:00:00-03:00")];
        let range = DateRange::new(date!(2025 - 07 - 03), date!(2025 - 07 - 01), brasilia());
        let spec = FilterSpec::new().with_date_range(range);

        assert!(range.is_inverted());
        assert!(filter_leads(&leads, &spec).is_empty());
    }

    #[test]
    fn set_filter_requires_non_empty_member() {
        let leads = vec![
            Lead {
                unit: Some("Febracis_GRU".to_owned()),
                ..Lead::new("1")
            },
            Lead {
                unit: Some("ds_performance".to_owned()),
                ..Lead::new("2")
            },
            Lead {
                unit: Some(String::new()),
                ..Lead::new("3")
            },
            Lead::new("4"),
        ];
        let spec = FilterSpec::new().with_allowed(LeadField::Unit, ["Febracis_GRU", ""]);

        let got = filter_leads(&leads, &spec);

        assert_eq!(got, vec![&leads[0]]);
    }

    #[test]
    fn empty_allowed_set_does_not_constrain() {
        let leads = vec![Lead::new("1"), Lead::new("2")];
        let spec = FilterSpec::new().with_allowed(LeadField::FunnelName, Vec::<String>::new());

        assert!(spec.is_unconstrained());
        assert_eq!(filter_leads(&leads, &spec).len(), 2);
    }

    #[test]
    fn predicates_are_anded() {
        let leads = vec![
            Lead {
                unit: Some("A".to_owned()),
                funnel_name: Some("F1".to_owned()),
                ..Lead::new("both")
            },
            Lead {
                unit: Some("A".to_owned()),
                funnel_name: Some("F2".to_owned()),
                ..Lead::new("unit only")
            },
        ];
        let spec = FilterSpec::new()
            .with_allowed(LeadField::Unit, ["A"])
            .with_allowed(LeadField::FunnelName, ["F1"]);

        let got = filter_leads(&leads, &spec);

        assert_eq!(got, vec![&leads[0]]);
    }

    #[test]
    fn day_span_is_at_least_one() {
        let same_day = DateRange::new(date!(2025 - 07 - 01), date!(2025 - 07 - 01), brasilia());
        let week = DateRange::new(date!(2025 - 07 - 01), date!(2025 - 07 - 08), brasilia());

        assert_eq!(same_day.day_span(), 1);
        assert_eq!(week.day_span(), 7);
    }
}
