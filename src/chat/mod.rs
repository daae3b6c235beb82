//! The chat assistant: a server-side proxy to an OpenAI-compatible
//! chat-completions API that answers questions about the filtered leads.
//!
//! The API key stays on the server. The browser only ever sees the rendered
//! conversation.

mod client;
mod handlers;
mod markup;
mod prompt;

pub use client::{ChatClient, ChatConfig, ChatError, ChatMessage, ChatRole};
pub use handlers::{chat_widget, post_chat};
