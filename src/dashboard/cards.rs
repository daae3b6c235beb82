//! Card components for headline numbers and ranked lists.

use maud::{Markup, html};

use crate::{
    analytics::{AggregationResult, BigNumbers},
    html::{CARD_STYLE, empty_state, format_count, format_percentage},
};

/// Renders the row of headline numbers.
pub(crate) fn big_number_cards(numbers: &BigNumbers) -> Markup {
    let cards = [
        ("total-leads", "Total leads", format_count(numbers.total_leads)),
        ("unique-leads", "Unique leads", format_count(numbers.unique_leads)),
        ("leads-per-day", "Leads per day", format!("{:.2}", numbers.leads_per_day)),
        (
            "leads-last-24-hours",
            "Last 24 hours",
            format_count(numbers.leads_last_24_hours),
        ),
        (
            "identified-companies",
            "Identified companies",
            format_count(numbers.identified_companies),
        ),
    ];

    html! {
        section class="grid grid-cols-2 md:grid-cols-3 xl:grid-cols-5 gap-4 w-full" aria-label="Headline numbers"
        {
            @for (id, label, value) in cards {
                div class=(CARD_STYLE) data-big-number=(id)
                {
                    p class="text-sm text-gray-600 dark:text-gray-400" { (label) }
                    p class="text-2xl font-bold" data-value { (value) }
                }
            }
        }
    }
}

/// Renders a ranked list with each key's count and share.
///
/// `id` is used as the card's `data-ranking` attribute.
pub(crate) fn ranking_card(id: &str, title: &str, ranking: &AggregationResult) -> Markup {
    html! {
        section class=(CARD_STYLE) data-ranking=(id)
        {
            h3 class="text-lg font-semibold mb-3" { (title) }

            @if ranking.is_empty() {
                (empty_state("No data for the current filters."))
            } @else {
                ol class="flex flex-col gap-2"
                {
                    @for entry in ranking {
                        li class="flex flex-col gap-1" data-ranked-key=(entry.key)
                        {
                            div class="flex justify-between gap-4 text-sm"
                            {
                                span class="truncate" title=(entry.key) { (entry.key) }
                                span class="shrink-0 text-gray-600 dark:text-gray-400"
                                {
                                    (format_count(entry.count)) " (" (format_percentage(entry.percentage)) ")"
                                }
                            }

                            div class="h-1.5 w-full rounded bg-gray-200 dark:bg-gray-700"
                            {
                                div
                                    class="h-1.5 rounded bg-blue-500"
                                    style=(format!("width: {:.1}%", entry.percentage))
                                {}
                            }
                        }
                    }
                }
            }
        }
    }
}
