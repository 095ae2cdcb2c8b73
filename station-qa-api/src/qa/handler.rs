use super::context::ContextBuilder;
use super::gateway::{GenerationOptions, ModelGateway};
use crate::config::ApiConfig;
use crate::models::{
    ClearHistoryResponse, ConnectionStatus, HistoryEntry, NewMessage, QaResponse,
};
use crate::storage::ConversationStore;
use chrono::Utc;
use station_llm_sdk::client::LlmClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

pub const FAULT_ANSWER: &str =
    "Sorry, I ran into a technical problem. Please try again later.";
const QUESTION_NOT_SAVED: &str = "The question could not be saved to the conversation history.";
const ANSWER_NOT_SAVED: &str = "The answer could not be saved to the conversation history.";

/// Tunables for a [`QaHandler`]
#[derive(Debug, Clone)]
pub struct QaSettings {
    pub system_prompt: String,
    pub history_limit: usize,
    pub model_name: String,
    pub options: GenerationOptions,
    pub timeout: Duration,
    pub serialize_turns: bool,
}

impl QaSettings {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            system_prompt: config.qa.system_prompt.clone(),
            history_limit: config.qa.history_limit,
            model_name: config.llm.model.clone(),
            options: GenerationOptions {
                temperature: config.llm.temperature,
                top_p: config.llm.top_p,
            },
            timeout: Duration::from_secs(config.llm.timeout_secs),
            serialize_turns: config.qa.serialize_turns,
        }
    }
}

/// Per-session async locks. Entries are dropped once no turn holds or waits
/// on them.
#[derive(Default)]
struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    async fn acquire(self: &Arc<Self>, session_id: &str) -> TurnGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(session_id.to_string()).or_default().clone()
        };

        let guard = lock.lock_owned().await;

        TurnGuard {
            locks: Arc::clone(self),
            session_id: session_id.to_string(),
            guard: Some(guard),
        }
    }

    fn prune(&self, session_id: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(session_id);
        }
    }

    fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

struct TurnGuard {
    locks: Arc<SessionLocks>,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.prune(&self.session_id);
    }
}

struct TurnOutcome {
    answer: String,
    warning: Option<String>,
}

/// Stateful question answering on top of a stateless generation service.
///
/// Each turn runs `persist question → build context → generate → persist
/// answer`. Storage and generation failures are absorbed; only a fault that
/// aborts the turn (a panic) is reported as `success: false`.
#[derive(Clone)]
pub struct QaHandler {
    store: Arc<dyn ConversationStore>,
    context: ContextBuilder,
    gateway: ModelGateway,
    settings: Arc<QaSettings>,
    turn_locks: Option<Arc<SessionLocks>>,
}

impl QaHandler {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        client: Arc<dyn LlmClient>,
        settings: QaSettings,
    ) -> Self {
        let context = ContextBuilder::new(
            store.clone(),
            settings.system_prompt.clone(),
            settings.history_limit,
        );
        let turn_locks = settings
            .serialize_turns
            .then(|| Arc::new(SessionLocks::default()));

        Self {
            store,
            context,
            gateway: ModelGateway::new(client),
            settings: Arc::new(settings),
            turn_locks,
        }
    }

    /// Answer `question` within `session_id`, recording both sides of the turn.
    pub async fn process_question(
        &self,
        session_id: &str,
        question: &str,
        user_id: Option<&str>,
    ) -> QaResponse {
        info!(session_id, question_len = question.len(), "Processing question");

        let handler = self.clone();
        let owned_session = session_id.to_string();
        let owned_question = question.to_string();
        let owned_user = user_id.map(str::to_string);

        // A panic anywhere in the turn stays inside this task
        let turn = tokio::spawn(async move {
            handler
                .run_turn(&owned_session, &owned_question, owned_user.as_deref())
                .await
        });

        let timestamp = Utc::now().to_rfc3339();

        match turn.await {
            Ok(outcome) => QaResponse {
                success: true,
                answer: outcome.answer,
                question: question.to_string(),
                timestamp,
                model: Some(self.settings.model_name.clone()),
                error: None,
                warning: outcome.warning,
            },
            Err(e) => {
                let detail = if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    e.to_string()
                };
                error!(error = %detail, session_id, "Question processing aborted");

                QaResponse {
                    success: false,
                    answer: FAULT_ANSWER.to_string(),
                    question: question.to_string(),
                    timestamp,
                    model: None,
                    error: Some(format!("Error while processing question: {}", detail)),
                    warning: None,
                }
            }
        }
    }

    async fn run_turn(&self, session_id: &str, question: &str, user_id: Option<&str>) -> TurnOutcome {
        let _turn = match &self.turn_locks {
            Some(locks) => Some(locks.acquire(session_id).await),
            None => None,
        };

        let mut warnings = Vec::new();

        let persisted_question = match self
            .store
            .append(NewMessage::user(session_id, question, user_id))
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, session_id, "Failed to save question, continuing without it");
                warnings.push(QUESTION_NOT_SAVED);
                None
            }
        };

        let messages = self
            .context
            .build(session_id, question, persisted_question)
            .await;
        debug!(session_id, context_len = messages.len(), "Context assembled");

        let answer = self
            .gateway
            .generate(
                messages,
                &self.settings.model_name,
                &self.settings.options,
                self.settings.timeout,
            )
            .await;

        if let Err(e) = self
            .store
            .append(NewMessage::assistant(
                session_id,
                &answer,
                user_id,
                &self.settings.model_name,
            ))
            .await
        {
            warn!(error = %e, session_id, "Failed to save answer");
            warnings.push(ANSWER_NOT_SAVED);
        }

        TurnOutcome {
            answer,
            warning: (!warnings.is_empty()).then(|| warnings.join(" ")),
        }
    }

    /// The latest `limit` messages of a session, oldest first. Empty when the
    /// store is unavailable.
    pub async fn get_conversation_history(&self, session_id: &str, limit: usize) -> Vec<HistoryEntry> {
        match self.store.recent(session_id, limit).await {
            Ok(messages) => messages.into_iter().map(HistoryEntry::from).collect(),
            Err(e) => {
                error!(error = %e, session_id, "Failed to load conversation history");
                Vec::new()
            }
        }
    }

    pub async fn clear_history(&self, session_id: &str) -> ClearHistoryResponse {
        match self.store.clear(session_id).await {
            Ok(deleted) => {
                info!(session_id, deleted, "Conversation history cleared");
                ClearHistoryResponse {
                    success: true,
                    message: "Conversation history cleared".to_string(),
                }
            }
            Err(e) => {
                error!(error = %e, session_id, "Failed to clear conversation history");
                ClearHistoryResponse {
                    success: false,
                    message: format!("Failed to clear history: {}", e),
                }
            }
        }
    }

    /// Check that the generation service is up and serves the configured model.
    pub async fn test_connection(&self) -> ConnectionStatus {
        self.gateway
            .check_connection(&self.settings.model_name)
            .await
    }

    /// Number of sessions with a turn in flight or waiting
    pub fn active_sessions(&self) -> usize {
        self.turn_locks.as_ref().map_or(0, |locks| locks.len())
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "internal fault".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_locks_serialize_and_prune() {
        let locks = Arc::new(SessionLocks::default());

        let first = locks.acquire("s1").await;
        assert_eq!(locks.len(), 1);

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.acquire("s1").await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_session_locks_are_independent_per_session() {
        let locks = Arc::new(SessionLocks::default());

        let _a = locks.acquire("a").await;
        let _b = locks.acquire("b").await;
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn test_panic_message_extracts_text() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(7_u8)), "internal fault");
    }
}
