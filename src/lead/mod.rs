//! Lead records captured by the marketing web forms.
//!
//! This module contains:
//! - The `Lead` model and its `LeadId`
//! - `LeadField` for referring to lead attributes by name
//! - Database functions for storing and loading the lead snapshot

mod core;
mod field;

pub use core::{
    Lead, LeadId, count_leads, create_lead_table, format_timestamp, get_all_leads, insert_lead,
    parse_timestamp,
};
pub use field::{LeadField, NULL_SENTINEL, is_null_sentinel};
