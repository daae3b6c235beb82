//! Named lead attributes.
//!
//! Views, filters and the table sort refer to lead attributes by name, e.g.
//! `?sort=utm_source`. [LeadField] is the closed set of those names.

use serde::{Deserialize, Serialize};

use super::Lead;

/// The literal that form captures store when a profile field was left blank.
pub const NULL_SENTINEL: &str = "null";

/// An attribute of a [Lead].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    Id,
    Name,
    Email,
    Phone,
    Company,
    Title,
    RevenueBand,
    EmployeeBand,
    Region,
    Unit,
    FunnelName,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    UtmContent,
    UtmTerm,
    PageUrl,
    Consultant,
    RegisteredAt,
}

impl LeadField {
    /// Every field, in the order columns are displayed.
    pub const ALL: [LeadField; 19] = [
        LeadField::Id,
        LeadField::Name,
        LeadField::Email,
        LeadField::Phone,
        LeadField::Company,
        LeadField::Title,
        LeadField::RevenueBand,
        LeadField::EmployeeBand,
        LeadField::Region,
        LeadField::Unit,
        LeadField::FunnelName,
        LeadField::UtmSource,
        LeadField::UtmMedium,
        LeadField::UtmCampaign,
        LeadField::UtmContent,
        LeadField::UtmTerm,
        LeadField::PageUrl,
        LeadField::Consultant,
        LeadField::RegisteredAt,
    ];

    /// The value used for this field in query strings.
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Company => "company",
            Self::Title => "title",
            Self::RevenueBand => "revenue_band",
            Self::EmployeeBand => "employee_band",
            Self::Region => "region",
            Self::Unit => "unit",
            Self::FunnelName => "funnel_name",
            Self::UtmSource => "utm_source",
            Self::UtmMedium => "utm_medium",
            Self::UtmCampaign => "utm_campaign",
            Self::UtmContent => "utm_content",
            Self::UtmTerm => "utm_term",
            Self::PageUrl => "page_url",
            Self::Consultant => "consultant",
            Self::RegisteredAt => "registered_at",
        }
    }

    /// Parse a query value produced by [LeadField::as_query_value].
    pub fn from_query_value(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_query_value() == value)
    }

    /// The human readable column heading.
    pub fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Name => "Name",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Company => "Company",
            Self::Title => "Title",
            Self::RevenueBand => "Revenue",
            Self::EmployeeBand => "Employees",
            Self::Region => "Region",
            Self::Unit => "Unit",
            Self::FunnelName => "Funnel",
            Self::UtmSource => "UTM Source",
            Self::UtmMedium => "UTM Medium",
            Self::UtmCampaign => "UTM Campaign",
            Self::UtmContent => "UTM Content",
            Self::UtmTerm => "UTM Term",
            Self::PageUrl => "Page URL",
            Self::Consultant => "Consultant",
            Self::RegisteredAt => "Registered",
        }
    }

    /// Whether the field is a free-text profile field where the literal
    /// `"null"` means the visitor did not answer.
    pub fn is_profile(self) -> bool {
        matches!(
            self,
            Self::Company | Self::Title | Self::RevenueBand | Self::EmployeeBand
        )
    }

    /// Whether values of this field compare as instants rather than text.
    pub fn is_temporal(self) -> bool {
        self == Self::RegisteredAt
    }

    /// The stored value of the field, exactly as loaded.
    pub fn raw_value(self, lead: &Lead) -> Option<&str> {
        match self {
            Self::Id => Some(lead.id.as_str()),
            Self::Name => lead.name.as_deref(),
            Self::Email => lead.email.as_deref(),
            Self::Phone => lead.phone.as_deref(),
            Self::Company => lead.company.as_deref(),
            Self::Title => lead.title.as_deref(),
            Self::RevenueBand => lead.revenue_band.as_deref(),
            Self::EmployeeBand => lead.employee_band.as_deref(),
            Self::Region => lead.region.as_deref(),
            Self::Unit => lead.unit.as_deref(),
            Self::FunnelName => lead.funnel_name.as_deref(),
            Self::UtmSource => lead.utm_source.as_deref(),
            Self::UtmMedium => lead.utm_medium.as_deref(),
            Self::UtmCampaign => lead.utm_campaign.as_deref(),
            Self::UtmContent => lead.utm_content.as_deref(),
            Self::UtmTerm => lead.utm_term.as_deref(),
            Self::PageUrl => lead.page_url.as_deref(),
            Self::Consultant => lead.consultant.as_deref(),
            Self::RegisteredAt => lead.registered_at.as_deref(),
        }
    }

    /// The value of the field if it was actually provided.
    ///
    /// Empty strings are absent. For profile fields the `"null"` sentinel
    /// (any case) is absent as well.
    pub fn present_value(self, lead: &Lead) -> Option<&str> {
        self.raw_value(lead).filter(|value| {
            !value.is_empty() && !(self.is_profile() && is_null_sentinel(value))
        })
    }
}

/// Returns `true` if `value` is the `"null"` sentinel, ignoring case and
/// surrounding whitespace.
pub fn is_null_sentinel(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(NULL_SENTINEL)
}

#[cfg(test)]
mod tests {
    use crate::lead::{Lead, LeadField, is_null_sentinel};

    #[test]
    fn query_values_round_trip_for_every_field() {
        for field in LeadField::ALL {
            assert_eq!(
                LeadField::from_query_value(field.as_query_value()),
                Some(field)
            );
        }
    }

    #[test]
    fn unknown_query_value_is_rejected() {
        assert_eq!(LeadField::from_query_value("cargo"), None);
    }

    #[test]
    fn serde_name_matches_query_value() {
        let got: LeadField = serde_json::from_str("\"utm_campaign\"").unwrap();

        assert_eq!(got, LeadField::UtmCampaign);
    }

    #[test]
    fn null_sentinel_ignores_case() {
        assert!(is_null_sentinel("null"));
        assert!(is_null_sentinel("NULL"));
        assert!(is_null_sentinel(" Null "));
        assert!(!is_null_sentinel("nullable"));
        assert!(!is_null_sentinel(""));
    }

    #[test]
    fn present_value_drops_sentinel_for_profile_fields_only() {
        let lead = Lead {
            company: Some("NULL".to_owned()),
            utm_term: Some("null".to_owned()),
            ..Lead::new("1")
        };

        assert_eq!(LeadField::Company.present_value(&lead), None);
        assert_eq!(LeadField::Company.raw_value(&lead), Some("NULL"));
        assert_eq!(LeadField::UtmTerm.present_value(&lead), Some("null"));
    }

    #[test]
    fn present_value_treats_empty_as_absent() {
        let lead = Lead {
            region: Some(String::new()),
            ..Lead::new("1")
        };

        assert_eq!(LeadField::Region.present_value(&lead), None);
    }
}
