//! This modules defines the common functionality for paging data.

use maud::{Markup, html};

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of leads to display per page when not specified in a request.
    pub default_page_size: u64,
    /// The maximum number of pages to show in the pagination indicator.
    pub max_pages: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 50,
            max_pages: 5,
        }
    }
}

/// One item in a pagination control.
#[derive(Debug, PartialEq, Eq)]
pub enum PaginationIndicator {
    Page(u64),
    CurrPage(u64),
    Ellipsis,
    NextButton(u64),
    BackButton(u64),
}

/// The items for a pagination control showing at most `max_pages` page
/// links around `curr_page`.
///
/// The first and last pages are always reachable. An ellipsis stands in for
/// skipped pages, and Back/Next buttons appear when there is a page in that
/// direction.
pub fn create_pagination_indicators(
    curr_page: u64,
    page_count: u64,
    max_pages: u64,
) -> Vec<PaginationIndicator> {
    if page_count == 0 {
        return Vec::new();
    }

    let window = max_pages.clamp(1, page_count);
    let first = curr_page
        .saturating_sub(window / 2)
        .clamp(1, page_count - window + 1);
    let last = first + window - 1;

    let mut indicators = Vec::new();

    if curr_page > 1 {
        indicators.push(PaginationIndicator::BackButton(curr_page - 1));
    }

    if first > 1 {
        indicators.push(PaginationIndicator::Page(1));
        if first > 2 {
            indicators.push(PaginationIndicator::Ellipsis);
        }
    }

    indicators.extend((first..=last).map(|page| {
        if page == curr_page {
            PaginationIndicator::CurrPage(page)
        } else {
            PaginationIndicator::Page(page)
        }
    }));

    if last < page_count {
        if last + 1 < page_count {
            indicators.push(PaginationIndicator::Ellipsis);
        }
        indicators.push(PaginationIndicator::Page(page_count));
    }

    if curr_page < page_count {
        indicators.push(PaginationIndicator::NextButton(curr_page + 1));
    }

    indicators
}

/// Render `indicators` as a `nav.pagination` list.
///
/// `page_url` maps a page number to the link for that page. When
/// `hx_target` is set the links also swap that element via htmx so the
/// filters and chat widget keep their state.
pub fn pagination_view(
    indicators: &[PaginationIndicator],
    page_url: impl Fn(u64) -> String,
    hx_target: Option<&str>,
) -> Markup {
    let link_style = "block px-3 py-2 rounded-sm text-blue-600 hover:underline";

    html! {
        nav class="pagination flex justify-center"
        {
            ul class="pagination flex flex-wrap items-center gap-1 p-0 m-0"
            {
                @for indicator in indicators {
                    li {
                        @match indicator {
                            PaginationIndicator::CurrPage(page) => {
                                span
                                    aria-current="page"
                                    class="block px-3 py-2 rounded-sm font-bold text-black dark:text-white"
                                { (page) }
                            }
                            PaginationIndicator::Page(page) => {
                                a
                                    href=(page_url(*page))
                                    hx-get=[hx_target.map(|_| page_url(*page))]
                                    hx-target=[hx_target]
                                    hx-push-url=[hx_target.map(|_| "true")]
                                    class=(link_style)
                                { (page) }
                            }
                            PaginationIndicator::Ellipsis => {
                                span class="block px-3 py-2 text-gray-500" { "..." }
                            }
                            PaginationIndicator::BackButton(page) => {
                                a
                                    href=(page_url(*page))
                                    hx-get=[hx_target.map(|_| page_url(*page))]
                                    hx-target=[hx_target]
                                    hx-push-url=[hx_target.map(|_| "true")]
                                    role="button"
                                    class=(link_style)
                                { "Back" }
                            }
                            PaginationIndicator::NextButton(page) => {
                                a
                                    href=(page_url(*page))
                                    hx-get=[hx_target.map(|_| page_url(*page))]
                                    hx-target=[hx_target]
                                    hx-push-url=[hx_target.map(|_| "true")]
                                    role="button"
                                    class=(link_style)
                                { "Next" }
                            }
                        }
                    }
                }
            }
        }
    }
}
