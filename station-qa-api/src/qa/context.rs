use crate::models::{Message, MessageRole};
use crate::storage::ConversationStore;
use station_llm_sdk::types::Message as ChatMessage;
use std::sync::Arc;
use tracing::warn;

/// Assembles the ordered message list sent to the model: system prompt, then
/// recent history, then the new question.
#[derive(Clone)]
pub struct ContextBuilder {
    store: Arc<dyn ConversationStore>,
    system_prompt: String,
    history_limit: usize,
}

impl ContextBuilder {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        system_prompt: impl Into<String>,
        history_limit: usize,
    ) -> Self {
        Self {
            store,
            system_prompt: system_prompt.into(),
            history_limit,
        }
    }

    /// Build the context for `new_question` in `session_id`.
    ///
    /// `persisted_question` is the id under which this same question was
    /// already stored for the current turn; that row is left out of history so
    /// the question is not sent twice. A failing history read yields a context
    /// without history.
    pub async fn build(
        &self,
        session_id: &str,
        new_question: &str,
        persisted_question: Option<i64>,
    ) -> Vec<ChatMessage> {
        let window = self.history_limit + usize::from(persisted_question.is_some());

        let history = match self.store.recent(session_id, window).await {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, session_id, "Failed to load conversation history");
                Vec::new()
            }
        };

        let prior = history
            .iter()
            .filter(|message| Some(message.id) != persisted_question)
            .collect::<Vec<_>>();

        assemble(&self.system_prompt, &prior, new_question, self.history_limit)
    }
}

/// Pure assembly step. Keeps at most the last `history_limit` user/assistant
/// entries of `history` (which must be oldest first); system rows are dropped.
pub fn assemble(
    system_prompt: &str,
    history: &[&Message],
    new_question: &str,
    history_limit: usize,
) -> Vec<ChatMessage> {
    let turns = history
        .iter()
        .filter(|message| matches!(message.role, MessageRole::User | MessageRole::Assistant))
        .collect::<Vec<_>>();
    let skip = turns.len().saturating_sub(history_limit);

    let mut messages = Vec::with_capacity(turns.len() - skip + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(
        turns
            .into_iter()
            .skip(skip)
            .map(|message| ChatMessage::new(message.role, message.content.clone())),
    );
    messages.push(ChatMessage::user(new_question));
    messages
}
