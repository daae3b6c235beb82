//! The global filters shared by every page.
//!
//! Filters travel in the query string so that pages can link to each other
//! without losing the selection, e.g.
//! `/dashboard?start=2025-07-01&end=2025-07-31&unit=North&unit=South`.
//! Repeated keys are parsed with [axum_extra::extract::Query].

use std::collections::BTreeMap;

use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use time::{
    Date, Duration, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::{
    analytics::{DateRange, FilterSpec},
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_CHECKBOX_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, LINK_STYLE,
    },
    lead::LeadField,
};

const DATE_INPUT_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// The fields that can be narrowed with a checkbox group.
pub const FILTER_FIELDS: [LeadField; 7] = [
    LeadField::Unit,
    LeadField::FunnelName,
    LeadField::UtmSource,
    LeadField::UtmMedium,
    LeadField::UtmCampaign,
    LeadField::UtmContent,
    LeadField::UtmTerm,
];

/// The filter selection as it appears in the query string.
///
/// Dates use the `YYYY-MM-DD` form of a date input. Anything that does not
/// parse is ignored rather than rejected.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub unit: Vec<String>,
    #[serde(default)]
    pub funnel_name: Vec<String>,
    #[serde(default)]
    pub utm_source: Vec<String>,
    #[serde(default)]
    pub utm_medium: Vec<String>,
    #[serde(default)]
    pub utm_campaign: Vec<String>,
    #[serde(default)]
    pub utm_content: Vec<String>,
    #[serde(default)]
    pub utm_term: Vec<String>,
}

impl FilterQuery {
    pub fn start_date(&self) -> Option<Date> {
        parse_date(self.start.as_deref())
    }

    pub fn end_date(&self) -> Option<Date> {
        parse_date(self.end.as_deref())
    }

    /// The selected date range.
    ///
    /// A start without an end runs up to `today`. An end without a start is
    /// ignored.
    pub fn date_range(&self, offset: UtcOffset, today: Date) -> Option<DateRange> {
        let start = self.start_date()?;
        let end = self.end_date().unwrap_or(today);

        Some(DateRange::new(start, end, offset))
    }

    /// The allowed values selected for `field`, empty for fields that cannot
    /// be filtered.
    pub fn values(&self, field: LeadField) -> &[String] {
        match field {
            LeadField::Unit => &self.unit,
            LeadField::FunnelName => &self.funnel_name,
            LeadField::UtmSource => &self.utm_source,
            LeadField::UtmMedium => &self.utm_medium,
            LeadField::UtmCampaign => &self.utm_campaign,
            LeadField::UtmContent => &self.utm_content,
            LeadField::UtmTerm => &self.utm_term,
            _ => &[],
        }
    }

    pub fn to_filter_spec(&self, offset: UtcOffset, today: Date) -> FilterSpec {
        let spec = FILTER_FIELDS
            .into_iter()
            .filter(|field| !self.values(*field).is_empty())
            .fold(FilterSpec::new(), |spec, field| {
                spec.with_allowed(field, self.values(field).iter().cloned())
            });

        match self.date_range(offset, today) {
            Some(range) => spec.with_date_range(range),
            None => spec,
        }
    }

    /// The selection as ordered key/value pairs, omitting empty values.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(start) = self.start.as_ref().filter(|start| !start.is_empty()) {
            pairs.push(("start", start.clone()));
        }
        if let Some(end) = self.end.as_ref().filter(|end| !end.is_empty()) {
            pairs.push(("end", end.clone()));
        }

        for field in FILTER_FIELDS {
            for value in self.values(field) {
                pairs.push((field.as_query_value(), value.clone()));
            }
        }

        pairs
    }

    /// The selection encoded as a query string without the leading `?`.
    pub fn to_query_string(&self) -> String {
        encode_query(&self.query_pairs())
    }

    /// A copy of the selection with the date range replaced by `period`.
    pub fn with_period(&self, period: QuickPeriod, today: Date) -> Self {
        let (start, end) = period.range(today);

        Self {
            start: Some(format_date(start)),
            end: Some(format_date(end)),
            ..self.clone()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query_pairs().is_empty()
    }
}

/// Encode `pairs` as `application/x-www-form-urlencoded`.
///
/// Returns an empty string, and logs, if encoding fails.
pub fn encode_query(pairs: &[(&str, String)]) -> String {
    serde_urlencoded::to_string(pairs)
        .inspect_err(|error| tracing::error!("could not encode query string: {error}"))
        .unwrap_or_default()
}

/// Join `route` and an encoded query, leaving out the `?` when the query is empty.
pub fn url_with_query(route: &str, query: &str) -> String {
    if query.is_empty() {
        route.to_owned()
    } else {
        format!("{route}?{query}")
    }
}

fn parse_date(text: Option<&str>) -> Option<Date> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }

    Date::parse(text, DATE_INPUT_FORMAT)
        .inspect_err(|error| tracing::debug!("ignoring invalid date {text:?}: {error}"))
        .ok()
}

fn format_date(date: Date) -> String {
    date.format(DATE_INPUT_FORMAT).unwrap_or_default()
}

/// A shortcut for a date range ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickPeriod {
    Today,
    Last7Days,
    Last30Days,
    Last90Days,
}

impl QuickPeriod {
    pub const ALL: [QuickPeriod; 4] = [
        QuickPeriod::Today,
        QuickPeriod::Last7Days,
        QuickPeriod::Last30Days,
        QuickPeriod::Last90Days,
    ];

    fn days(self) -> i64 {
        match self {
            Self::Today => 0,
            Self::Last7Days => 7,
            Self::Last30Days => 30,
            Self::Last90Days => 90,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Last7Days => "7 days",
            Self::Last30Days => "30 days",
            Self::Last90Days => "90 days",
        }
    }

    /// The first and last day of the period.
    pub fn range(self, today: Date) -> (Date, Date) {
        (today - Duration::days(self.days()), today)
    }
}

/// The values offered for each filter field, taken from the loaded snapshot.
pub type FilterOptions = BTreeMap<LeadField, Vec<String>>;

/// The filter panel rendered at the top of a page.
pub struct FilterForm<'a> {
    /// The page the form submits to.
    pub action: &'a str,
    pub query: &'a FilterQuery,
    pub options: &'a FilterOptions,
    /// The checkbox groups this page shows. Fields with an active selection
    /// are always shown so that no filter is applied invisibly.
    pub fields: &'a [LeadField],
    /// Extra parameters that survive a filter change, e.g. the search term.
    pub hidden: &'a [(&'a str, String)],
    pub today: Date,
}

impl FilterForm<'_> {
    fn visible_fields(&self) -> Vec<LeadField> {
        FILTER_FIELDS
            .into_iter()
            .filter(|field| self.fields.contains(field) || !self.query.values(*field).is_empty())
            .collect()
    }

    pub fn into_html(self) -> Markup {
        let visible_fields = self.visible_fields();
        let start = self.query.start.clone().unwrap_or_default();
        let end = self.query.end.clone().unwrap_or_default();

        html! {
            section class=(CARD_STYLE) aria-label="Filters"
            {
                form method="get" action=(self.action) class="flex flex-col gap-4" data-filter-form
                {
                    @for (name, value) in self.hidden {
                        input type="hidden" name=(name) value=(value);
                    }

                    div class="flex flex-wrap items-end gap-4"
                    {
                        div
                        {
                            label for="start" class=(FORM_LABEL_STYLE) { "From" }
                            input type="date" id="start" name="start" value=(start) class=(FORM_TEXT_INPUT_STYLE);
                        }

                        div
                        {
                            label for="end" class=(FORM_LABEL_STYLE) { "To" }
                            input type="date" id="end" name="end" value=(end) class=(FORM_TEXT_INPUT_STYLE);
                        }

                        div class="flex flex-wrap gap-3 text-sm" data-quick-periods
                        {
                            @for period in QuickPeriod::ALL {
                                a
                                    href=(url_with_query(self.action, &self.period_query(period)))
                                    class=(LINK_STYLE)
                                { (period.label()) }
                            }
                        }
                    }

                    div class="flex flex-wrap gap-4"
                    {
                        @for field in visible_fields {
                            (self.checkbox_group(field))
                        }
                    }

                    div class="flex items-center gap-4"
                    {
                        button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Apply filters" }

                        @if !self.query.is_empty() {
                            a href=(self.action) class=(LINK_STYLE) { "Clear" }
                        }
                    }
                }
            }
        }
    }

    fn period_query(&self, period: QuickPeriod) -> String {
        let mut pairs = self.hidden.to_vec();
        pairs.extend(self.query.with_period(period, self.today).query_pairs());

        encode_query(&pairs)
    }

    fn checkbox_group(&self, field: LeadField) -> Markup {
        let name = field.as_query_value();
        let selected = self.query.values(field);
        let options = self.options.get(&field).map(Vec::as_slice).unwrap_or_default();

        html! {
            details class="min-w-48" open[!selected.is_empty()] data-filter-field=(name)
            {
                summary class="cursor-pointer text-sm font-medium"
                {
                    (field.label())
                    @if !selected.is_empty() {
                        " (" (selected.len()) ")"
                    }
                }

                div class="mt-2 flex max-h-48 flex-col gap-1 overflow-y-auto"
                {
                    @if options.is_empty() {
                        span class="text-sm text-gray-500" { "No values" }
                    }

                    @for (index, option) in options.iter().enumerate() {
                        @let id = format!("{name}-{index}");
                        label for=(id) class="flex items-center gap-2 text-sm"
                        {
                            input
                                type="checkbox"
                                id=(id)
                                name=(name)
                                value=(option)
                                checked[selected.contains(option)]
                                class=(FORM_CHECKBOX_STYLE);
                            (option)
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use scraper::{Html, Selector};
    use time::{UtcOffset, macros::date};

    use crate::{
        filters::{FilterForm, FilterQuery, QuickPeriod, url_with_query},
        lead::{Lead, LeadField},
        test_utils::{input_values, must_get_form},
    };

    fn parse(query: &str) -> FilterQuery {
        serde_html_form::from_str(query).unwrap()
    }

    #[test]
    fn parses_repeated_keys() {
        let got = parse("start=2025-07-01&end=2025-07-31&unit=North&unit=South&utm_source=google");

        assert_eq!(got.start.as_deref(), Some("2025-07-01"));
        assert_eq!(got.unit, vec!["North", "South"]);
        assert_eq!(got.utm_source, vec!["google"]);
        assert!(got.funnel_name.is_empty());
    }

    #[test]
    fn empty_query_has_no_constraints() {
        let got = parse("");

        assert!(got.is_empty());
        assert!(
            got.to_filter_spec(UtcOffset::UTC, date!(2025 - 07 - 10))
                .is_unconstrained()
        );
    }

    #[test]
    fn invalid_dates_are_ignored() {
        let got = parse("start=yesterday&end=");

        assert_eq!(got.date_range(UtcOffset::UTC, date!(2025 - 07 - 10)), None);
    }

    #[test]
    fn start_without_end_runs_to_today() {
        let got = parse("start=2025-07-01");

        let range = got
            .date_range(UtcOffset::UTC, date!(2025 - 07 - 10))
            .expect("range missing");

        assert_eq!(range.start, date!(2025 - 07 - 01));
        assert_eq!(range.end, date!(2025 - 07 - 10));
    }

    #[test]
    fn filter_spec_applies_selected_values() {
        let query = parse("unit=North&start=2025-07-01&end=2025-07-02");
        let spec = query.to_filter_spec(UtcOffset::UTC, date!(2025 - 07 - 10));
        let north = Lead {
            unit: Some("North".to_owned()),
            registered_at: Some("2025-07-02T23:00:00Z".to_owned()),
            ..Lead::new("1")
        };
        let south = Lead {
            unit: Some("South".to_owned()),
            ..north.clone()
        };
        let late = Lead {
            registered_at: Some("2025-07-03T00:00:00Z".to_owned()),
            ..north.clone()
        };

        assert!(spec.matches(&north));
        assert!(!spec.matches(&south));
        assert!(!spec.matches(&late));
    }

    #[test]
    fn quick_periods_end_today() {
        let today = date!(2025 - 07 - 10);

        assert_eq!(QuickPeriod::Today.range(today), (today, today));
        assert_eq!(
            QuickPeriod::Last7Days.range(today),
            (date!(2025 - 07 - 03), today)
        );
        assert_eq!(
            QuickPeriod::Last90Days.range(today).0,
            date!(2025 - 04 - 11)
        );
    }

    #[test]
    fn with_period_keeps_set_filters() {
        let query = parse("unit=North&start=2020-01-01");

        let got = query.with_period(QuickPeriod::Last30Days, date!(2025 - 07 - 31));

        assert_eq!(
            got.to_query_string(),
            "start=2025-07-01&end=2025-07-31&unit=North"
        );
    }

    #[test]
    fn query_string_round_trips_through_parser() {
        let query = parse("utm_campaign=summer+sale&utm_campaign=a%26b");

        assert_eq!(parse(&query.to_query_string()), query);
    }

    #[test]
    fn url_with_query_omits_empty_query() {
        assert_eq!(url_with_query("/leads", ""), "/leads");
        assert_eq!(url_with_query("/leads", "page=2"), "/leads?page=2");
    }

    #[test]
    fn form_checks_selected_options_and_shows_active_hidden_fields() {
        let query = parse("unit=North&utm_term=shoes");
        let options = BTreeMap::from([
            (LeadField::Unit, vec!["North".to_owned(), "South".to_owned()]),
            (LeadField::UtmTerm, vec!["shoes".to_owned()]),
        ]);
        let hidden = [("search", "ana".to_owned())];

        let markup = FilterForm {
            action: "/dashboard",
            query: &query,
            options: &options,
            fields: &[LeadField::Unit, LeadField::FunnelName],
            hidden: &hidden,
            today: date!(2025 - 07 - 10),
        }
        .into_html();

        let html = Html::parse_fragment(&markup.into_string());
        let form = must_get_form(&html, "form[data-filter-form]");
        assert_eq!(input_values(&form, "unit"), vec!["North"]);
        assert_eq!(input_values(&form, "utm_term"), vec!["shoes"]);
        assert_eq!(input_values(&form, "search"), vec!["ana"]);
        let groups: Vec<_> = form
            .select(&Selector::parse("details[data-filter-field]").unwrap())
            .map(|group| group.value().attr("data-filter-field").unwrap())
            .collect();
        assert_eq!(groups, ["unit", "funnel_name", "utm_term"]);
    }

    #[test]
    fn quick_period_links_keep_hidden_parameters() {
        let query = FilterQuery::default();
        let options = BTreeMap::new();
        let hidden = [("search", "ana".to_owned())];

        let markup = FilterForm {
            action: "/leads",
            query: &query,
            options: &options,
            fields: &[],
            hidden: &hidden,
            today: date!(2025 - 07 - 10),
        }
        .into_html();

        let html = Html::parse_fragment(&markup.into_string());
        let first = html
            .select(&Selector::parse("[data-quick-periods] a").unwrap())
            .next()
            .expect("quick period link missing");
        assert_eq!(
            first.value().attr("href"),
            Some("/leads?search=ana&start=2025-07-10&end=2025-07-10")
        );
    }
}
