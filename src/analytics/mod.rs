//! Lead aggregation: filtering, ranking, time bucketing and table views.
//!
//! Every function here is pure. Callers load a snapshot of leads, narrow it
//! with [filter_leads] and pass the result to the other components.

mod aggregate;
mod filter;
mod metrics;
mod summary;
mod table;
mod timeline;

pub use aggregate::{
    AggregateOptions, AggregationResult, Matrix, NOT_PROVIDED, RankedKey, aggregate, aggregate_2d,
    or_not_provided, trimmed,
};
pub use filter::{DateRange, FilterSpec, filter_leads};
pub use metrics::{BigNumbers, big_numbers, count_identified_companies};
pub use summary::{DataSummary, distinct_values};
pub use table::{SortDirection, TableOptions, TablePage, display_value, view};
pub use timeline::{Bucket, Granularity, Timeline, TimelineOptions, bucketize};
