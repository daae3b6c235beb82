//! Dashboard HTTP handlers and view rendering.
//!
//! This module contains:
//! - The route handler for the overview page
//! - HTML view functions for rendering the overview
//! - State and query types used by the handler

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

use crate::{
    AppState, Error,
    analytics::{
        AggregateOptions, BigNumbers, DateRange, Granularity, Timeline, TimelineOptions,
        aggregate, big_numbers, bucketize, or_not_provided,
    },
    chat::chat_widget,
    dashboard::{
        cards::{big_number_cards, ranking_card},
        charts::{
            DashboardChart, chart_container, chart_head_elements, charts_view, ranking_chart,
            timeline_chart,
        },
    },
    endpoints,
    filters::{FilterForm, FilterQuery, encode_query, url_with_query},
    html::{CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, base, empty_state},
    lead::{Lead, LeadField},
    navigation::NavBar,
    snapshot::Snapshot,
};

/// How many values each UTM ranking shows.
const TOP_UTM_VALUES: usize = 5;

/// The most buckets the timeline chart draws. Longer daily ranges switch to
/// weeks, and longer weekly ranges keep the most recent weeks.
const MAX_TIMELINE_BUCKETS: i64 = 366;

const OVERVIEW_FILTER_FIELDS: [LeadField; 2] = [LeadField::Unit, LeadField::FunnelName];

const UTM_RANKINGS: [(LeadField, &str, &str); 5] = [
    (LeadField::UtmSource, "utm-source", "Top 5 sources"),
    (LeadField::UtmMedium, "utm-medium", "Top 5 mediums"),
    (LeadField::UtmCampaign, "utm-campaign", "Top 5 campaigns"),
    (LeadField::UtmContent, "utm-content", "Top 5 contents"),
    (LeadField::UtmTerm, "utm-term", "Top 5 terms"),
];

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for loading leads.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
    /// Whether the chat assistant has an API key.
    pub chat_enabled: bool,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            chat_enabled: state.chat_client.is_some(),
        }
    }
}

/// Selects the width of the timeline buckets.
#[derive(Debug, Default, Deserialize)]
pub struct TimelineQuery {
    #[serde(default)]
    pub granularity: Granularity,
}

impl TimelineQuery {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self.granularity {
            Granularity::Day => Vec::new(),
            granularity => vec![("granularity", granularity.as_query_value().to_owned())],
        }
    }
}

/// Holds all the data needed to render the overview.
struct DashboardData {
    numbers: BigNumbers,
    utm_rankings: Vec<Markup>,
    charts: Vec<DashboardChart>,
    timeline: Option<DashboardChart>,
    /// The bucket width actually drawn, which may be wider than requested.
    granularity: Granularity,
}

/// Display a page with an overview of the leads selected by the filters.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Query(filters): Query<FilterQuery>,
    Query(timeline_query): Query<TimelineQuery>,
) -> Result<Response, Error> {
    let snapshot = Snapshot::load(&state.db_connection, &state.local_timezone)?;

    let filter_query = filters.to_query_string();
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).with_query(&filter_query);

    if snapshot.leads.is_empty() {
        return Ok(dashboard_no_data_view(nav_bar).into_response());
    }

    let hidden = timeline_query.query_pairs();
    let filter_form = FilterForm {
        action: endpoints::DASHBOARD_VIEW,
        query: &filters,
        options: &snapshot.filter_options(),
        fields: &OVERVIEW_FILTER_FIELDS,
        hidden: &hidden,
        today: snapshot.today,
    }
    .into_html();

    let leads = snapshot.filtered(&filters);
    let data = build_dashboard_data(&leads, &filters, timeline_query.granularity, &snapshot);
    let granularity_links = granularity_links(&filters, data.granularity);

    Ok(dashboard_view(
        nav_bar,
        &filter_form,
        &data,
        &granularity_links,
        &chat_widget(&filters, state.chat_enabled),
    )
    .into_response())
}

/// Computes the numbers, rankings and charts for the filtered leads.
fn build_dashboard_data(
    leads: &[&Lead],
    filters: &FilterQuery,
    granularity: Granularity,
    snapshot: &Snapshot,
) -> DashboardData {
    let date_range = filters.date_range(snapshot.local_offset, snapshot.today);
    let numbers = big_numbers(leads, date_range.as_ref(), OffsetDateTime::now_utc());

    let utm_rankings = UTM_RANKINGS
        .into_iter()
        .map(|(field, id, title)| {
            let ranking = aggregate(
                leads,
                or_not_provided(field),
                &AggregateOptions::new().top(TOP_UTM_VALUES),
            );
            ranking_card(id, title, &ranking)
        })
        .collect();

    let mut charts = Vec::new();
    let regions = aggregate(leads, or_not_provided(LeadField::Region), &AggregateOptions::new());
    if !regions.is_empty() {
        charts.push(DashboardChart::new(
            "region-chart",
            &ranking_chart("Leads by region", "All regions", &regions),
        ));
    }
    let units = aggregate(leads, or_not_provided(LeadField::Unit), &AggregateOptions::new());
    if !units.is_empty() {
        charts.push(DashboardChart::new(
            "unit-chart",
            &ranking_chart("Leads by unit", "All units", &units),
        ));
    }

    let timeline = build_timeline(leads, granularity, date_range, snapshot);
    let granularity = timeline.granularity;
    let timeline =
        (!timeline.is_empty()).then(|| DashboardChart::new("timeline-chart", &timeline_chart(&timeline)));

    DashboardData {
        numbers,
        utm_rankings,
        charts,
        timeline,
        granularity,
    }
}

fn build_timeline(
    leads: &[&Lead],
    granularity: Granularity,
    requested: Option<DateRange>,
    snapshot: &Snapshot,
) -> Timeline {
    let source = or_not_provided(LeadField::UtmSource);

    let registered_days = leads
        .iter()
        .filter_map(|lead| lead.registered_instant())
        .map(|instant| instant.to_offset(snapshot.local_offset).date());
    let span = registered_days.fold(None, |span: Option<(Date, Date)>, day| match span {
        Some((first, last)) => Some((first.min(day), last.max(day))),
        None => Some((day, day)),
    });

    let (range, granularity) = timeline_window(
        requested,
        span,
        snapshot.local_offset,
        snapshot.today,
        granularity,
    );

    bucketize(
        leads,
        |lead| source(lead).unwrap_or_default(),
        &TimelineOptions {
            granularity,
            range,
            offset: snapshot.local_offset,
            today: snapshot.today,
        },
    )
}

/// The range and bucket width to chart for leads registered within `span`.
///
/// The range is trimmed to start no earlier than the first registered lead
/// and to end no later than the last lead or today, whichever is later. A
/// range still longer than [MAX_TIMELINE_BUCKETS] days is drawn in weeks, and
/// only the most recent [MAX_TIMELINE_BUCKETS] weeks are kept.
fn timeline_window(
    requested: Option<DateRange>,
    span: Option<(Date, Date)>,
    offset: UtcOffset,
    today: Date,
    granularity: Granularity,
) -> (Option<DateRange>, Granularity) {
    let (start, end) = match (requested, span) {
        (Some(range), Some((first, last))) => {
            (range.start.max(first), range.end.min(last.max(today)))
        }
        (Some(range), None) => (range.start.max(today), range.end.min(today)),
        (None, Some(span)) => span,
        (None, None) => return (None, granularity),
    };

    let too_many_days = (end - start).whole_days() >= MAX_TIMELINE_BUCKETS;
    let granularity = if granularity == Granularity::Day && too_many_days {
        Granularity::Week
    } else {
        granularity
    };

    let max_days = match granularity {
        Granularity::Day => MAX_TIMELINE_BUCKETS - 1,
        Granularity::Week => (MAX_TIMELINE_BUCKETS - 1) * 7,
    };
    let start = match end.checked_sub(Duration::days(max_days)) {
        Some(earliest) if earliest > start => earliest,
        _ => start,
    };

    (Some(DateRange::new(start, end, offset)), granularity)
}

/// Links that switch the timeline between days and weeks, keeping the filters.
fn granularity_links(filters: &FilterQuery, current: Granularity) -> Markup {
    let links = [Granularity::Day, Granularity::Week].map(|granularity| {
        let mut pairs = filters.query_pairs();
        pairs.push(("granularity", granularity.as_query_value().to_owned()));

        (granularity, url_with_query(endpoints::DASHBOARD_VIEW, &encode_query(&pairs)))
    });

    html! {
        div class="flex gap-3 text-sm" data-granularity-toggle
        {
            @for (granularity, href) in links {
                @if granularity == current {
                    span class="font-semibold" aria-current="true" { (granularity.label()) }
                } @else {
                    a href=(href) class=(LINK_STYLE) { (granularity.label()) }
                }
            }
        }
    }
}

/// Renders the dashboard page when the database holds no leads.
fn dashboard_no_data_view(nav_bar: NavBar) -> Markup {
    let nav_bar = nav_bar.into_html();

    let content = html!(
        (nav_bar)

        div class="flex flex-col items-center px-6 py-8 mx-auto text-gray-900 dark:text-white"
        {
            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            (empty_state("Charts will show up here once leads have been captured."))
        }
    );

    base("Overview", &[], &content)
}

/// Renders the overview with numbers, rankings and charts.
fn dashboard_view(
    nav_bar: NavBar,
    filter_form: &Markup,
    data: &DashboardData,
    granularity_links: &Markup,
    chat: &Markup,
) -> Markup {
    let nav_bar = nav_bar.into_html();
    let no_matches = data.numbers.total_leads == 0;

    let content = html!(
        (nav_bar)

        div id="dashboard-content" class=(PAGE_CONTAINER_STYLE)
        {
            (filter_form)

            @if no_matches {
                div class=(CARD_STYLE)
                {
                    (empty_state("No leads match the current filters."))
                }
            } @else {
                (big_number_cards(&data.numbers))

                section
                    id="utm-rankings"
                    class="grid grid-cols-1 md:grid-cols-2 xl:grid-cols-3 gap-4 w-full"
                {
                    @for ranking in &data.utm_rankings {
                        (ranking)
                    }
                }

                section id="charts" class="w-full mx-auto"
                {
                    (charts_view(&data.charts))
                }

                section id="timeline" class=(format!("{CARD_STYLE} flex flex-col gap-2"))
                {
                    (granularity_links)

                    @match &data.timeline {
                        Some(chart) => { (chart_container(chart)) }
                        None => { (empty_state("No leads with a registration date in this period.")) }
                    }
                }
            }
        }

        (chat)
    );

    let charts: Vec<DashboardChart> = if no_matches {
        Vec::new()
    } else {
        data.charts.iter().chain(&data.timeline).cloned().collect()
    };

    base("Overview", &chart_head_elements(&charts), &content)
}
