//! Headline counts shown at the top of the dashboard.

use std::collections::HashSet;

use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::{
    analytics::DateRange,
    lead::{Lead, LeadField},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BigNumbers {
    pub total_leads: usize,
    /// Distinct contacts, identified by phone or else by email.
    pub unique_leads: usize,
    /// Average leads per day over the selected range, rounded to two decimal
    /// places. Zero when no range is selected.
    pub leads_per_day: f64,
    /// Leads registered in the 24 hours up to `now`.
    pub leads_last_24_hours: usize,
    /// Leads with a company name, excluding the `"null"` sentinel.
    pub identified_companies: usize,
}

/// Compute the headline numbers for the already filtered `leads`.
pub fn big_numbers(leads: &[&Lead], range: Option<&DateRange>, now: OffsetDateTime) -> BigNumbers {
    let total_leads = leads.len();

    let unique_leads = leads
        .iter()
        .filter_map(|lead| contact_key(lead))
        .collect::<HashSet<_>>()
        .len();

    let leads_per_day = range.map_or(0.0, |range| {
        let per_day = total_leads as f64 / range.day_span() as f64;
        (per_day * 100.0).round() / 100.0
    });

    let since = now - Duration::hours(24);
    let leads_last_24_hours = leads
        .iter()
        .filter(|lead| {
            lead.registered_instant()
                .is_some_and(|instant| instant >= since)
        })
        .count();

    let identified_companies = count_identified_companies(leads);

    BigNumbers {
        total_leads,
        unique_leads,
        leads_per_day,
        leads_last_24_hours,
        identified_companies,
    }
}

/// Count leads that name their company.
pub fn count_identified_companies(leads: &[&Lead]) -> usize {
    leads
        .iter()
        .filter(|lead| {
            LeadField::Company
                .present_value(lead)
                .is_some_and(|company| !company.trim().is_empty())
        })
        .count()
}

fn contact_key<'a>(lead: &'a Lead) -> Option<&'a str> {
    LeadField::Phone
        .present_value(lead)
        .or_else(|| LeadField::Email.present_value(lead))
}
