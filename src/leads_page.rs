//! The leads page: every lead selected by the filters in a searchable,
//! sortable and paginated table.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use axum_htmx::HxRequest;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    analytics::view,
    chat::chat_widget,
    endpoints,
    filters::{FilterForm, FilterQuery},
    html::{PAGE_CONTAINER_STYLE, base, empty_state},
    lead::LeadField,
    lead_table::{LeadTable, TableQuery},
    navigation::NavBar,
    pagination::PaginationConfig,
    snapshot::Snapshot,
};

const TABLE_ID: &str = "lead-table";

const LEADS_FILTER_FIELDS: [LeadField; 5] = [
    LeadField::Unit,
    LeadField::FunnelName,
    LeadField::UtmSource,
    LeadField::UtmMedium,
    LeadField::UtmCampaign,
];

const LEAD_COLUMNS: [LeadField; 11] = [
    LeadField::Name,
    LeadField::Email,
    LeadField::Phone,
    LeadField::Company,
    LeadField::Title,
    LeadField::Unit,
    LeadField::FunnelName,
    LeadField::UtmSource,
    LeadField::UtmMedium,
    LeadField::UtmCampaign,
    LeadField::RegisteredAt,
];

/// The state needed for the leads page.
#[derive(Debug, Clone)]
pub struct LeadsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
    pub pagination_config: PaginationConfig,
    pub chat_enabled: bool,
}

impl FromRef<AppState> for LeadsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            pagination_config: state.pagination_config.clone(),
            chat_enabled: state.chat_client.is_some(),
        }
    }
}

/// Render the leads page, or just the table for HTMX requests made by the
/// table's own links and search form.
pub async fn get_leads_page(
    State(state): State<LeadsPageState>,
    HxRequest(is_htmx_request): HxRequest,
    Query(filters): Query<FilterQuery>,
    Query(table_query): Query<TableQuery>,
) -> Result<Response, Error> {
    let snapshot = Snapshot::load(&state.db_connection, &state.local_timezone)?;
    let leads = snapshot.filtered(&filters);

    let table_options =
        table_query.to_table_options(&state.pagination_config, snapshot.local_offset);
    let table = LeadTable {
        route: endpoints::LEADS_VIEW,
        id: TABLE_ID,
        filters: &filters,
        query: &table_query,
        page: view(&leads, &table_options),
        columns: &LEAD_COLUMNS,
        local_offset: snapshot.local_offset,
        page_size: state.pagination_config.default_page_size,
        max_pages: state.pagination_config.max_pages,
        use_htmx: true,
    }
    .into_html();

    if is_htmx_request {
        return Ok(table.into_response());
    }

    let nav_bar = NavBar::new(endpoints::LEADS_VIEW)
        .with_query(&filters.to_query_string())
        .into_html();

    if snapshot.leads.is_empty() {
        let content = html! {
            (nav_bar)
            div class=(PAGE_CONTAINER_STYLE)
            {
                (empty_state("Leads will show up here once they have been captured."))
            }
        };
        return Ok(base("Leads", &[], &content).into_response());
    }

    let hidden = table_query.persistent_pairs();
    let filter_form = FilterForm {
        action: endpoints::LEADS_VIEW,
        query: &filters,
        options: &snapshot.filter_options(),
        fields: &LEADS_FILTER_FIELDS,
        hidden: &hidden,
        today: snapshot.today,
    }
    .into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            (filter_form)
            (table)
        }

        (chat_widget(&filters, state.chat_enabled))
    };

    Ok(base("Leads", &[], &content).into_response())
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{FromRef, State},
        http::StatusCode,
    };
    use axum_extra::extract::Query;
    use axum_htmx::HxRequest;
    use scraper::{Html, Selector};

    use crate::{
        filters::FilterQuery,
        lead::Lead,
        lead_table::TableQuery,
        leads_page::{LeadsPageState, get_leads_page},
        test_utils::{
            assert_valid_html, parse_html_document, parse_html_fragment, state_with_leads, text_of,
        },
    };

    fn leads(count: usize) -> Vec<Lead> {
        (1..=count)
            .map(|i| Lead {
                name: Some(format!("Lead {i:03}")),
                unit: Some(if i % 2 == 0 { "North" } else { "South" }.to_owned()),
                registered_at: Some(format!("2025-07-01T{:02}:00:00Z", i % 24)),
                ..Lead::new(i.to_string())
            })
            .collect()
    }

    async fn get_response(
        leads: &[Lead],
        is_htmx: bool,
        filters: FilterQuery,
        table_query: TableQuery,
    ) -> axum::response::Response {
        let state = LeadsPageState::from_ref(&state_with_leads(leads));

        let response = get_leads_page(
            State(state),
            HxRequest(is_htmx),
            Query(filters),
            Query(table_query),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        response
    }

    #[tokio::test]
    async fn full_page_has_filters_table_and_chat() {
        let response = get_response(&leads(3), false, FilterQuery::default(), TableQuery::default()).await;

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert!(html.select(&Selector::parse("[data-filter-form]").unwrap()).next().is_some());
        assert!(html.select(&Selector::parse("#chat-widget").unwrap()).next().is_some());
        assert_eq!(text_of(&html, "#lead-table tbody tr").len(), 3);
        assert_eq!(text_of(&html, "[data-row-summary]"), ["Showing 1-3 of 3"]);
    }

    #[tokio::test]
    async fn htmx_request_gets_only_the_table() {
        let response = get_response(&leads(3), true, FilterQuery::default(), TableQuery::default()).await;

        let html = parse_html_fragment(response).await;
        assert!(html.select(&Selector::parse("[data-filter-form]").unwrap()).next().is_none());
        assert!(html.select(&Selector::parse("#chat-widget").unwrap()).next().is_none());
        assert_eq!(text_of(&html, "#lead-table tbody tr").len(), 3);
    }

    #[tokio::test]
    async fn second_page_shows_remaining_rows() {
        let table_query = TableQuery {
            page: Some(2),
            ..Default::default()
        };

        let response = get_response(&leads(60), true, FilterQuery::default(), table_query).await;

        let html = parse_html_fragment(response).await;
        assert_eq!(text_of(&html, "[data-row-summary]"), ["Showing 51-60 of 60"]);
        assert_eq!(text_of(&html, "#lead-table tbody tr").len(), 10);
    }

    #[tokio::test]
    async fn page_past_the_end_clamps_to_last_page() {
        let table_query = TableQuery {
            page: Some(99),
            ..Default::default()
        };

        let response = get_response(&leads(60), true, FilterQuery::default(), table_query).await;

        let html = parse_html_fragment(response).await;
        assert_eq!(text_of(&html, "[data-row-summary]"), ["Showing 51-60 of 60"]);
    }

    #[tokio::test]
    async fn search_and_filters_combine() {
        let filters = FilterQuery {
            unit: vec!["North".to_owned()],
            ..Default::default()
        };
        let table_query = TableQuery {
            search: Some("lead 00".to_owned()),
            ..Default::default()
        };

        let response = get_response(&leads(12), true, filters, table_query).await;

        let html = parse_html_fragment(response).await;
        let ids: Vec<_> = html
            .select(&Selector::parse("#lead-table tbody tr").unwrap())
            .filter_map(|row| row.value().attr("data-lead-id"))
            .collect();
        assert_eq!(ids, ["2", "4", "6", "8"]);
    }

    #[tokio::test]
    async fn sorted_descending_by_name() {
        let table_query = TableQuery {
            sort: Some("name".to_owned()),
            dir: Some("desc".to_owned()),
            ..Default::default()
        };

        let response = get_response(&leads(3), true, FilterQuery::default(), table_query).await;

        let html = parse_html_fragment(response).await;
        let ids: Vec<_> = html
            .select(&Selector::parse("#lead-table tbody tr").unwrap())
            .filter_map(|row| row.value().attr("data-lead-id"))
            .collect();
        assert_eq!(ids, ["3", "2", "1"]);
    }

    #[tokio::test]
    async fn no_data_shows_empty_state() {
        let response = get_response(&[], false, FilterQuery::default(), TableQuery::default()).await;

        let html: Html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(text_of(&html, "[data-empty-state]").len(), 1);
    }
}
