//! The chat endpoint and the widget that talks to it.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Form, Query};
use maud::{Markup, PreEscaped, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    analytics::DataSummary,
    chat::{
        ChatClient, ChatError, ChatMessage, ChatRole, markup::render_reply, prompt::build_messages,
    },
    endpoints,
    filters::{FilterQuery, url_with_query},
    html::{BUTTON_PRIMARY_STYLE, FORM_TEXT_INPUT_STYLE, loading_spinner},
    snapshot::Snapshot,
};

const NOT_CONFIGURED_REPLY: &str =
    "The assistant is not configured. Set CHAT_API_KEY on the server to enable it.";
const APOLOGY_REPLY: &str = "Sorry, I could not process your question. Please try again.";

/// The state needed for answering chat questions.
#[derive(Debug, Clone)]
pub struct ChatState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
    pub chat_client: Option<ChatClient>,
}

impl FromRef<AppState> for ChatState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            chat_client: state.chat_client.clone(),
        }
    }
}

/// The form submitted by the chat widget.
#[derive(Debug, Default, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub message: String,
    /// Earlier messages as JSON, oldest first.
    #[serde(default)]
    pub history: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
enum AskError {
    #[error("could not summarise leads: {0}")]
    Data(#[from] Error),
    #[error(transparent)]
    Chat(#[from] ChatError),
}

/// Answer a question about the leads selected by the filters in the query
/// string.
///
/// Responds with the user's message and the reply as chat bubbles, or with
/// no content if the message is blank. Failures are logged and answered with
/// an apology so that the conversation can continue.
pub async fn post_chat(
    State(state): State<ChatState>,
    Query(filters): Query<FilterQuery>,
    Form(form): Form<ChatForm>,
) -> Response {
    let question = form.message.trim();
    if question.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }

    let history = parse_history(&form.history);

    let reply = match &state.chat_client {
        None => NOT_CONFIGURED_REPLY.to_owned(),
        Some(client) => match ask(client, &state, &filters, &history, question).await {
            Ok(reply) => reply,
            Err(error) => {
                tracing::error!("could not answer chat question: {error}");
                APOLOGY_REPLY.to_owned()
            }
        },
    };

    html! {
        (message_bubble(&ChatMessage::new(ChatRole::User, question)))
        (message_bubble(&ChatMessage::new(ChatRole::Assistant, reply)))
    }
    .into_response()
}

async fn ask(
    client: &ChatClient,
    state: &ChatState,
    filters: &FilterQuery,
    history: &[ChatMessage],
    question: &str,
) -> Result<String, AskError> {
    // The snapshot is loaded and summarised before awaiting so the database
    // lock is never held across the request.
    let summary = {
        let snapshot = Snapshot::load(&state.db_connection, &state.local_timezone)?;
        let leads = snapshot.filtered(filters);
        DataSummary::new(&leads, snapshot.local_offset)
    };

    let messages = build_messages(&summary, history, question);

    Ok(client.complete(&messages).await?)
}

fn parse_history(history: &[String]) -> Vec<ChatMessage> {
    history
        .iter()
        .filter_map(|entry| {
            serde_json::from_str(entry)
                .inspect_err(|error| tracing::debug!("dropping chat history entry: {error}"))
                .ok()
        })
        .collect()
}

fn message_bubble(message: &ChatMessage) -> Markup {
    let serialized = serde_json::to_string(message)
        .inspect_err(|error| tracing::error!("could not serialize chat message: {error}"))
        .unwrap_or_default();

    let (role, style) = match message.role {
        ChatRole::User => (
            "user",
            "ml-8 self-end bg-blue-500 text-white rounded-lg px-3 py-2",
        ),
        _ => (
            "assistant",
            "mr-8 self-start bg-gray-100 dark:bg-gray-700 rounded-lg px-3 py-2 space-y-2",
        ),
    };

    html! {
        div class=(style) data-chat-message=(role) {
            @match message.role {
                ChatRole::User => { p class="whitespace-pre-wrap" { (message.content) } }
                _ => { (render_reply(&message.content)) }
            }

            input type="hidden" name="history" value=(serialized);
        }
    }
}

const RESET_FORM_SCRIPT: &str = r#"
document.body.addEventListener("htmx:afterRequest", (event) => {
    if (event.detail.elt.id === "chat-form" && event.detail.successful) {
        event.detail.elt.querySelector("textarea").value = "";
        const messages = document.getElementById("chat-messages");
        messages.scrollTop = messages.scrollHeight;
    }
});
"#;

/// The floating chat panel. Questions are asked about the leads selected by
/// `filters`.
///
/// The conversation lives in the page: each bubble carries a hidden `history`
/// input that is posted back with the next question.
pub fn chat_widget(filters: &FilterQuery, enabled: bool) -> Markup {
    let endpoint = url_with_query(endpoints::CHAT_API, &filters.to_query_string());

    html! {
        details
            id="chat-widget"
            class="fixed bottom-20 right-4 lg:bottom-4 z-40 w-96 max-w-[calc(100vw-2rem)]
                bg-white dark:bg-gray-800 rounded-lg shadow-lg border border-gray-200
                dark:border-gray-700"
        {
            summary class="cursor-pointer select-none px-4 py-3 font-semibold" {
                "Ask about these leads"
            }

            form
                id="chat-form"
                hx-post=(endpoint)
                hx-target="#chat-messages"
                hx-swap="beforeend"
                hx-indicator="#chat-indicator"
                class="flex flex-col gap-2 p-4 pt-0"
            {
                div
                    id="chat-messages"
                    class="flex flex-col gap-2 max-h-96 overflow-y-auto text-sm"
                {
                    @if !enabled {
                        p class="text-gray-500 dark:text-gray-400" data-chat-disabled {
                            (NOT_CONFIGURED_REPLY)
                        }
                    }
                }

                textarea
                    name="message"
                    rows="2"
                    required
                    placeholder="e.g. Which campaign brought the most leads?"
                    class=(FORM_TEXT_INPUT_STYLE)
                {}

                button type="submit" id="chat-indicator" class=(BUTTON_PRIMARY_STYLE) {
                    span class="inline htmx-indicator" { (loading_spinner()) }
                    "Send"
                }
            }

            script { (PreEscaped(RESET_FORM_SCRIPT)) }
        }
    }
}
