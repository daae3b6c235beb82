#![allow(missing_docs)]

pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;
pub(crate) mod state;

pub(crate) use form::{assert_hx_endpoint, input_values, must_get_form};
pub(crate) use html::{assert_valid_html, parse_html_document, parse_html_fragment, text_of};
pub(crate) use http::{assert_content_type, assert_status_ok, get_header};
pub(crate) use state::{lead_at, state_with_leads};
