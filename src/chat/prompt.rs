//! Builds the conversation sent to the language model.

use crate::{
    analytics::DataSummary,
    chat::{ChatMessage, ChatRole},
};

/// How many of the most recent messages, including the new question, are
/// sent with each request.
pub const HISTORY_LIMIT: usize = 5;

const INSTRUCTIONS: &str = "\
You are an assistant that analyses marketing lead data. You have access to \
the real data shown on the dashboard and must base your answers on it.";

const GUIDELINES: &str = "\
GUIDELINES:
- Always format answers with markdown (##, ###, **bold**, lists).
- Be specific and cite the actual numbers from the data above.
- Calculate percentages when relevant.
- For questions about trends over time, use LEADS PER MONTH.
- For questions about data quality, use DATA COMPLETENESS.
- If the data does not answer the question, say so instead of guessing.";

/// The system prompt: instructions, the data summary and the question.
pub fn system_prompt(summary: &DataSummary, question: &str) -> String {
    format!("{INSTRUCTIONS}\n\nAVAILABLE DATA:\n\n{summary}\n{GUIDELINES}\n\nUser question: {question}")
}

/// The messages for one request: the system prompt followed by the last
/// [HISTORY_LIMIT] messages of `history` plus `question`.
///
/// System messages in `history` are dropped since history comes from the
/// browser.
pub fn build_messages(
    summary: &DataSummary,
    history: &[ChatMessage],
    question: &str,
) -> Vec<ChatMessage> {
    let mut conversation: Vec<ChatMessage> = history
        .iter()
        .filter(|message| message.role != ChatRole::System)
        .cloned()
        .collect();
    conversation.push(ChatMessage::new(ChatRole::User, question));

    let skip = conversation.len().saturating_sub(HISTORY_LIMIT);

    std::iter::once(ChatMessage::new(
        ChatRole::System,
        system_prompt(summary, question),
    ))
    .chain(conversation.into_iter().skip(skip))
    .collect()
}
