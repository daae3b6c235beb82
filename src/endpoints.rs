//! The API endpoints URIs.

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The overview page with headline numbers, rankings and the timeline.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page with profile rankings, the title × source matrix and profiles.
pub const QUALITATIVE_VIEW: &str = "/qualitative";
/// The searchable, sortable lead table.
pub const LEADS_VIEW: &str = "/leads";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";

/// The route for sending a message to the chat assistant.
pub const CHAT_API: &str = "/api/chat";
