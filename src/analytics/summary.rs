//! A plain-text digest of a lead set, used as context for the chat assistant.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display},
};

use serde::Serialize;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    analytics::{AggregateOptions, AggregationResult, aggregate, count_identified_companies, trimmed},
    lead::{Lead, LeadField, NULL_SENTINEL, format_timestamp},
};

/// The fields whose fill rate is reported.
const COMPLETENESS_FIELDS: [LeadField; 7] = [
    LeadField::Email,
    LeadField::Phone,
    LeadField::Company,
    LeadField::Title,
    LeadField::UtmSource,
    LeadField::UtmMedium,
    LeadField::UtmCampaign,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub total_leads: usize,
    pub units: Vec<String>,
    pub funnels: Vec<String>,
    pub top_sources: AggregationResult,
    pub top_mediums: AggregationResult,
    pub top_campaigns: AggregationResult,
    /// Earliest and latest registration, formatted in the local offset.
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub identified_companies: usize,
    pub top_titles: AggregationResult,
    pub top_revenue_bands: AggregationResult,
    /// Lead counts keyed by `YYYY-MM`.
    pub leads_per_month: BTreeMap<String, usize>,
    /// How many leads have each field filled in.
    pub completeness: Vec<(LeadField, usize)>,
}

impl DataSummary {
    pub fn new(leads: &[&Lead], local_offset: UtcOffset) -> Self {
        let top = |field: LeadField, n: usize| {
            aggregate(
                leads,
                trimmed(field),
                &AggregateOptions::new().excluding(NULL_SENTINEL).top(n),
            )
        };

        let instants: Vec<OffsetDateTime> = leads
            .iter()
            .filter_map(|lead| lead.registered_instant())
            .collect();

        let mut leads_per_month = BTreeMap::new();
        for instant in &instants {
            let local = instant.to_offset(local_offset);
            let key = format!("{:04}-{:02}", local.year(), u8::from(local.month()));
            *leads_per_month.entry(key).or_insert(0) += 1;
        }

        let completeness = COMPLETENESS_FIELDS
            .into_iter()
            .map(|field| {
                let count = leads
                    .iter()
                    .filter(|lead| field.present_value(lead).is_some())
                    .count();
                (field, count)
            })
            .collect();

        Self {
            total_leads: leads.len(),
            units: distinct_values(leads, LeadField::Unit),
            funnels: distinct_values(leads, LeadField::FunnelName),
            top_sources: top(LeadField::UtmSource, 5),
            top_mediums: top(LeadField::UtmMedium, 3),
            top_campaigns: top(LeadField::UtmCampaign, 3),
            earliest: instants
                .iter()
                .min()
                .map(|instant| format_timestamp(*instant, local_offset)),
            latest: instants
                .iter()
                .max()
                .map(|instant| format_timestamp(*instant, local_offset)),
            identified_companies: count_identified_companies(leads),
            top_titles: top(LeadField::Title, 5),
            top_revenue_bands: top(LeadField::RevenueBand, 3),
            leads_per_month,
            completeness,
        }
    }
}

/// The distinct non-blank values of `field`, sorted.
///
/// Values are kept as stored so that they can be used as filter options.
pub fn distinct_values(leads: &[&Lead], field: LeadField) -> Vec<String> {
    leads
        .iter()
        .filter_map(|lead| field.present_value(lead))
        .filter(|value| !value.trim().is_empty())
        .map(str::to_owned)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn write_ranking(
    f: &mut fmt::Formatter<'_>,
    heading: &str,
    ranking: &AggregationResult,
    unit: &str,
) -> fmt::Result {
    writeln!(f, "\n{heading}:")?;
    if ranking.is_empty() {
        return writeln!(f, "- none");
    }
    for entry in ranking {
        writeln!(f, "- {}: {} {unit}", entry.key, entry.count)?;
    }
    Ok(())
}

fn join_or(values: &[String], empty: &str) -> String {
    if values.is_empty() {
        empty.to_owned()
    } else {
        values.join(", ")
    }
}

impl Display for DataSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GENERAL STATISTICS:")?;
        writeln!(f, "- Total leads: {}", self.total_leads)?;
        writeln!(f, "- Units: {}", join_or(&self.units, "none"))?;
        writeln!(f, "- Funnels: {}", join_or(&self.funnels, "none"))?;
        writeln!(
            f,
            "- Period: {} to {}",
            self.earliest.as_deref().unwrap_or("N/A"),
            self.latest.as_deref().unwrap_or("N/A")
        )?;
        writeln!(f, "- Identified companies: {}", self.identified_companies)?;

        write_ranking(f, "TOP UTM SOURCES", &self.top_sources, "leads")?;
        write_ranking(f, "TOP UTM MEDIUMS", &self.top_mediums, "leads")?;
        write_ranking(f, "TOP UTM CAMPAIGNS", &self.top_campaigns, "leads")?;
        write_ranking(f, "TOP TITLES", &self.top_titles, "people")?;
        write_ranking(f, "TOP REVENUE BANDS", &self.top_revenue_bands, "companies")?;

        writeln!(f, "\nLEADS PER MONTH:")?;
        if self.leads_per_month.is_empty() {
            writeln!(f, "- none")?;
        }
        for (month, count) in &self.leads_per_month {
            writeln!(f, "- {month}: {count} leads")?;
        }

        writeln!(f, "\nDATA COMPLETENESS:")?;
        for (field, count) in &self.completeness {
            writeln!(f, "- {}: {count}/{}", field.label(), self.total_leads)?;
        }

        Ok(())
    }
}
