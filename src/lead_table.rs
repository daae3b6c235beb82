//! The searchable, sortable and paginated lead table used by the leads page
//! and the detailed profiles on the qualitative page.

use maud::{Markup, html};
use serde::Deserialize;
use time::UtcOffset;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    analytics::{SortDirection, TableOptions, TablePage, display_value},
    filters::{FilterQuery, encode_query, url_with_query},
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_TEXT_INPUT_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, empty_state, format_count,
    },
    lead::LeadField,
    pagination::{PaginationConfig, create_pagination_indicators, pagination_view},
};

/// The max number of graphemes to display in a cell before truncating and
/// displaying ellipses.
const MAX_CELL_GRAPHEMES: usize = 40;

/// The table parameters of the query string.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct TableQuery {
    pub search: Option<String>,
    /// The [LeadField] query value of the sorted column.
    pub sort: Option<String>,
    /// `asc` or `desc`.
    pub dir: Option<String>,
    pub page: Option<u64>,
}

impl TableQuery {
    /// The sorted column and direction. Unknown columns mean unsorted and an
    /// unknown direction means ascending.
    pub fn sort(&self) -> Option<(LeadField, SortDirection)> {
        let field = LeadField::from_query_value(self.sort.as_deref()?)?;
        let direction = match self.dir.as_deref() {
            Some("desc") => SortDirection::Descending,
            _ => SortDirection::Ascending,
        };

        Some((field, direction))
    }

    fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    pub fn to_table_options(
        &self,
        pagination_config: &PaginationConfig,
        local_offset: UtcOffset,
    ) -> TableOptions {
        TableOptions {
            search_term: self.search_term().map(str::to_owned),
            sort: self.sort(),
            page: self.page.unwrap_or(pagination_config.default_page),
            page_size: pagination_config.default_page_size,
            local_offset,
        }
    }

    /// The parameters that survive a filter change, i.e. everything but the page.
    pub fn persistent_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(search) = self.search_term() {
            pairs.push(("search", search.to_owned()));
        }
        if let Some((field, direction)) = self.sort() {
            pairs.push(("sort", field.as_query_value().to_owned()));
            pairs.push(("dir", direction.as_query_value().to_owned()));
        }

        pairs
    }
}

/// A rendered page of the lead table.
pub struct LeadTable<'a> {
    /// The route the table links point at.
    pub route: &'a str,
    /// The `id` of the table section, also the htmx swap target.
    pub id: &'a str,
    pub filters: &'a FilterQuery,
    pub query: &'a TableQuery,
    pub page: TablePage<'a>,
    pub columns: &'a [LeadField],
    pub local_offset: UtcOffset,
    pub page_size: u64,
    pub max_pages: u64,
    /// Whether links swap the table in place with htmx.
    pub use_htmx: bool,
}

impl LeadTable<'_> {
    fn url(&self, extra: &[(&'static str, String)]) -> String {
        let mut pairs = self.filters.query_pairs();
        pairs.extend_from_slice(extra);

        url_with_query(self.route, &encode_query(&pairs))
    }

    fn sort_url(&self, field: LeadField) -> String {
        let current = self
            .query
            .sort()
            .filter(|(sorted, _)| *sorted == field)
            .map(|(_, direction)| direction);

        let mut extra = Vec::new();
        if let Some(search) = self.query.search_term() {
            extra.push(("search", search.to_owned()));
        }
        if let Some(direction) = SortDirection::cycle(current) {
            extra.push(("sort", field.as_query_value().to_owned()));
            extra.push(("dir", direction.as_query_value().to_owned()));
        }

        self.url(&extra)
    }

    fn page_url(&self, page: u64) -> String {
        let mut extra = self.query.persistent_pairs();
        extra.push(("page", page.to_string()));

        self.url(&extra)
    }

    fn sort_indicator(&self, field: LeadField) -> &'static str {
        match self.query.sort() {
            Some((sorted, SortDirection::Ascending)) if sorted == field => " ▲",
            Some((sorted, SortDirection::Descending)) if sorted == field => " ▼",
            _ => "",
        }
    }

    pub fn into_html(self) -> Markup {
        let target = format!("#{}", self.id);
        let hx_target = self.use_htmx.then_some(target.as_str());
        let indicators = create_pagination_indicators(
            self.page.page,
            self.page.total_pages,
            self.max_pages,
        );
        let first_row = (self.page.page - 1) * self.page_size.max(1) + 1;
        let last_row = first_row + self.page.rows.len() as u64 - 1;
        let search = self.query.search_term().unwrap_or_default();
        let sort_pairs: Vec<_> = self
            .query
            .persistent_pairs()
            .into_iter()
            .filter(|(name, _)| *name != "search")
            .collect();

        html! {
            section id=(self.id) class=(CARD_STYLE) data-lead-table
            {
                form
                    method="get"
                    action=(self.route)
                    hx-get=[self.use_htmx.then_some(self.route)]
                    hx-target=[hx_target]
                    hx-swap=[self.use_htmx.then_some("outerHTML")]
                    hx-push-url=[self.use_htmx.then_some("true")]
                    class="flex gap-2 mb-4"
                    data-search-form
                {
                    @for (name, value) in self.filters.query_pairs().iter().chain(sort_pairs.iter()) {
                        input type="hidden" name=(name) value=(value);
                    }

                    input
                        type="search"
                        name="search"
                        value=(search)
                        placeholder="Search every field"
                        aria-label="Search leads"
                        class=(FORM_TEXT_INPUT_STYLE);

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Search" }
                }

                @if self.page.total_count == 0 {
                    (empty_state("No leads match the current filters."))
                } @else {
                    p class="mb-2 text-sm text-gray-600 dark:text-gray-400" data-row-summary
                    {
                        "Showing " (format_count(first_row as usize)) "-" (format_count(last_row as usize))
                        " of " (format_count(self.page.total_count as usize))
                    }

                    div class="overflow-x-auto"
                    {
                        table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                        {
                            thead class=(TABLE_HEADER_STYLE)
                            {
                                tr
                                {
                                    @for field in self.columns {
                                        th scope="col" class="px-6 py-3 whitespace-nowrap"
                                        {
                                            a
                                                href=(self.sort_url(*field))
                                                hx-get=[self.use_htmx.then(|| self.sort_url(*field))]
                                                hx-target=[hx_target]
                                                hx-swap=[self.use_htmx.then_some("outerHTML")]
                                                hx-push-url=[self.use_htmx.then_some("true")]
                                                data-sort-field=(field.as_query_value())
                                            {
                                                (field.label()) (self.sort_indicator(*field))
                                            }
                                        }
                                    }
                                }
                            }

                            tbody
                            {
                                @for lead in &self.page.rows {
                                    tr class=(TABLE_ROW_STYLE) data-lead-id=(lead.id.as_str())
                                    {
                                        @for field in self.columns {
                                            @let (text, tooltip) = truncate_cell(
                                                display_value(lead, *field, self.local_offset)
                                            );
                                            td class=(TABLE_CELL_STYLE) title=[tooltip] { (text) }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }

                (pagination_view(&indicators, |page| self.page_url(page), hx_target))
            }
        }
    }
}

/// Shorten `text` to [MAX_CELL_GRAPHEMES], returning the full text as a
/// tooltip when it was cut.
fn truncate_cell(text: String) -> (String, Option<String>) {
    if text.graphemes(true).nth(MAX_CELL_GRAPHEMES).is_none() {
        return (text, None);
    }

    let head: String = text.graphemes(true).take(MAX_CELL_GRAPHEMES - 3).collect();

    (format!("{head}..."), Some(text))
}
