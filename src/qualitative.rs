//! The qualitative analysis page: who the leads are and where they came from.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    analytics::{
        AggregateOptions, AggregationResult, Matrix, NOT_PROVIDED, aggregate, aggregate_2d,
        count_identified_companies, trimmed, view,
    },
    chat::chat_widget,
    dashboard::{
        cards::ranking_card,
        charts::{DashboardChart, chart_container, chart_head_elements, ranking_chart},
    },
    endpoints,
    filters::{FilterForm, FilterQuery},
    html::{CARD_STYLE, PAGE_CONTAINER_STYLE, base, empty_state, format_count, format_percentage},
    lead::{Lead, LeadField, NULL_SENTINEL},
    lead_table::{LeadTable, TableQuery},
    navigation::NavBar,
    pagination::PaginationConfig,
    snapshot::Snapshot,
};

const TOP_TITLES: usize = 10;
const TOP_REVENUE_BANDS: usize = 15;
const TOP_COMPANIES: usize = 10;
const MATRIX_TITLES: usize = 10;
const MATRIX_SOURCES: usize = 8;

const QUALITATIVE_FILTER_FIELDS: [LeadField; 6] = [
    LeadField::Unit,
    LeadField::UtmSource,
    LeadField::UtmMedium,
    LeadField::UtmCampaign,
    LeadField::UtmContent,
    LeadField::UtmTerm,
];

const PROFILE_COLUMNS: [LeadField; 8] = [
    LeadField::Name,
    LeadField::Company,
    LeadField::Title,
    LeadField::RevenueBand,
    LeadField::EmployeeBand,
    LeadField::Region,
    LeadField::UtmSource,
    LeadField::RegisteredAt,
];

/// The state needed for the qualitative page.
#[derive(Debug, Clone)]
pub struct QualitativeState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
    pub pagination_config: PaginationConfig,
    pub chat_enabled: bool,
}

impl FromRef<AppState> for QualitativeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            pagination_config: state.pagination_config.clone(),
            chat_enabled: state.chat_client.is_some(),
        }
    }
}

/// Display the profile breakdowns for the leads selected by the filters.
pub async fn get_qualitative_page(
    State(state): State<QualitativeState>,
    Query(filters): Query<FilterQuery>,
    Query(table_query): Query<TableQuery>,
) -> Result<Response, Error> {
    let snapshot = Snapshot::load(&state.db_connection, &state.local_timezone)?;

    let nav_bar = NavBar::new(endpoints::QUALITATIVE_VIEW).with_query(&filters.to_query_string());

    if snapshot.leads.is_empty() {
        let content = html! {
            (nav_bar.into_html())
            div class=(PAGE_CONTAINER_STYLE)
            {
                (empty_state("Profiles will show up here once leads have been captured."))
            }
        };
        return Ok(base("Qualitative", &[], &content).into_response());
    }

    let hidden = table_query.persistent_pairs();
    let filter_form = FilterForm {
        action: endpoints::QUALITATIVE_VIEW,
        query: &filters,
        options: &snapshot.filter_options(),
        fields: &QUALITATIVE_FILTER_FIELDS,
        hidden: &hidden,
        today: snapshot.today,
    }
    .into_html();

    let leads = snapshot.filtered(&filters);

    let body = if leads.is_empty() {
        None
    } else {
        let table_options =
            table_query.to_table_options(&state.pagination_config, snapshot.local_offset);
        let profiles = LeadTable {
            route: endpoints::QUALITATIVE_VIEW,
            id: "profiles",
            filters: &filters,
            query: &table_query,
            page: view(&leads, &table_options),
            columns: &PROFILE_COLUMNS,
            local_offset: snapshot.local_offset,
            page_size: state.pagination_config.default_page_size,
            max_pages: state.pagination_config.max_pages,
            use_htmx: false,
        }
        .into_html();

        Some((QualitativeData::new(&leads), profiles))
    };

    let charts: Vec<DashboardChart> = body
        .as_ref()
        .and_then(|(data, _)| data.revenue_chart.clone())
        .into_iter()
        .collect();

    let content = html! {
        (nav_bar.into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            (filter_form)

            @match &body {
                Some((data, profiles)) => {
                    (qualitative_view(data))

                    section class="w-full"
                    {
                        h2 class="text-xl font-semibold mb-2" { "Detailed profiles" }
                        (profiles)
                    }
                }
                None => {
                    div class=(CARD_STYLE) { (empty_state("No leads match the current filters.")) }
                }
            }
        }

        (chat_widget(&filters, state.chat_enabled))
    };

    Ok(base("Qualitative", &chart_head_elements(&charts), &content).into_response())
}

/// The aggregates shown above the profiles table.
struct QualitativeData {
    total_leads: usize,
    titles: AggregationResult,
    revenue_chart: Option<DashboardChart>,
    identified_companies: usize,
    companies: AggregationResult,
    matrix: Matrix,
}

impl QualitativeData {
    fn new(leads: &[&Lead]) -> Self {
        let profile = |n: usize| AggregateOptions::new().excluding(NULL_SENTINEL).top(n);

        let revenue_bands = aggregate(
            leads,
            revenue_band_or_not_provided,
            &AggregateOptions::new().top(TOP_REVENUE_BANDS),
        );
        let revenue_chart = (!revenue_bands.is_empty()).then(|| {
            DashboardChart::new(
                "revenue-chart",
                &ranking_chart("Revenue bands", "Top 15", &revenue_bands),
            )
        });

        Self {
            total_leads: leads.len(),
            titles: aggregate(leads, trimmed(LeadField::Title), &profile(TOP_TITLES)),
            revenue_chart,
            identified_companies: count_identified_companies(leads),
            companies: aggregate(leads, trimmed(LeadField::Company), &profile(TOP_COMPANIES)),
            matrix: aggregate_2d(
                leads,
                trimmed(LeadField::Title),
                trimmed(LeadField::UtmSource),
                &profile(MATRIX_TITLES),
                &AggregateOptions::new().top(MATRIX_SOURCES),
            ),
        }
    }
}

/// Revenue bands keep leads that skipped the question, grouped under
/// [NOT_PROVIDED].
fn revenue_band_or_not_provided(lead: &Lead) -> Option<String> {
    let band = LeadField::RevenueBand
        .present_value(lead)
        .map(str::trim)
        .filter(|band| !band.is_empty())
        .unwrap_or(NOT_PROVIDED);

    Some(band.to_owned())
}

fn qualitative_view(data: &QualitativeData) -> Markup {
    html! {
        div class="grid grid-cols-1 xl:grid-cols-2 gap-4 w-full"
        {
            (ranking_card("titles", "Top 10 titles", &data.titles))

            @match &data.revenue_chart {
                Some(chart) => { (chart_container(chart)) }
                None => { div class=(CARD_STYLE) { (empty_state("No revenue bands.")) } }
            }

            (identified_companies_card(data.identified_companies, data.total_leads))

            (ranking_card("companies", "Top 10 companies", &data.companies))
        }

        (matrix_view(&data.matrix))
    }
}

fn identified_companies_card(identified: usize, total: usize) -> Markup {
    let share = if total == 0 {
        0.0
    } else {
        100.0 * identified as f64 / total as f64
    };

    html! {
        section class=(CARD_STYLE) data-identified-companies
        {
            h3 class="text-lg font-semibold" { "Identified companies" }
            p class="text-3xl font-bold mt-2" data-value { (format_count(identified)) }
            p class="text-sm text-gray-600 dark:text-gray-400"
            {
                (format_percentage(share)) " of " (format_count(total)) " leads named their company"
            }
        }
    }
}

/// The Tailwind classes for a matrix cell, darker for higher counts.
fn heat_class(count: usize, intensity: f64) -> &'static str {
    if count == 0 {
        return "bg-gray-50 text-gray-400 dark:bg-gray-800";
    }

    match intensity {
        i if i < 20.0 => "bg-blue-100 text-gray-900",
        i if i < 40.0 => "bg-blue-200 text-gray-900",
        i if i < 60.0 => "bg-blue-300 text-gray-900",
        i if i < 80.0 => "bg-blue-400 text-white",
        _ => "bg-blue-500 text-white",
    }
}

fn matrix_view(matrix: &Matrix) -> Markup {
    html! {
        section class=(format!("{CARD_STYLE} w-full")) data-matrix
        {
            h3 class="text-lg font-semibold" { "Titles by UTM source" }
            p class="text-sm text-gray-600 dark:text-gray-400 mb-4"
            {
                "Top 10 titles and top 8 sources, counting leads that have both."
            }

            @if matrix.is_empty() {
                (empty_state("No leads have both a title and a UTM source."))
            } @else {
                div class="overflow-x-auto"
                {
                    table class="w-full text-sm border-collapse"
                    {
                        thead
                        {
                            tr
                            {
                                th scope="col" class="px-3 py-2 text-left" { "Title" }
                                @for column in &matrix.columns {
                                    th scope="col" class="px-3 py-2 text-center" data-matrix-column { (column) }
                                }
                            }
                        }

                        tbody
                        {
                            @for (row_index, row) in matrix.rows.iter().enumerate() {
                                tr
                                {
                                    th scope="row" class="px-3 py-2 text-left font-medium" data-matrix-row { (row) }

                                    @for column_index in 0..matrix.columns.len() {
                                        @let count = matrix.count(row_index, column_index);
                                        @let percentage = matrix.percentage(row_index, column_index);
                                        td
                                            class=(format!(
                                                "px-3 py-2 text-center border border-gray-200 {}",
                                                heat_class(count, matrix.intensity(row_index, column_index))
                                            ))
                                            data-count=(count)
                                        {
                                            @if count == 0 {
                                                "-"
                                            } @else {
                                                div class="font-semibold" { (count) }
                                                div class="text-xs" { (format_percentage(percentage)) }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
