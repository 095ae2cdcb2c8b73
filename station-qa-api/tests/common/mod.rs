#![allow(dead_code)]

use actix_web::{test, web, App};
use async_trait::async_trait;
use station_llm_sdk::client::LlmClient;
use station_llm_sdk::error::LlmError;
use station_llm_sdk::types::{CompletionRequest, CompletionResponse, Usage};
use station_qa_api::config::{DatabaseConfig, QaConfig};
use station_qa_api::handlers;
use station_qa_api::helpers::database::initialize_database;
use station_qa_api::models::{Message, NewMessage};
use station_qa_api::qa::handler::{QaHandler, QaSettings};
use station_qa_api::qa::GenerationOptions;
use station_qa_api::storage::{ConversationStore, SqliteConversationStore, StorageError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const SYSTEM_PROMPT: &str = "You are Xiao Wang, a power-station data assistant.";
pub const MODEL: &str = "deepseek-r1:32b";

pub enum MockReply {
    Text(String),
    Status(u16),
    Delay(Duration, String),
}

pub struct MockLlmClient {
    pub replies: Mutex<VecDeque<MockReply>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
    pub call_count: AtomicUsize,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        let client = Self::new();
        client.replies.lock().unwrap().extend(replies);
        client
    }

    pub fn push_reply(&self, reply: MockReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn get_call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

fn text_response(text: String) -> CompletionResponse {
    CompletionResponse {
        content: text,
        model: MODEL.to_string(),
        usage: Usage {
            input_tokens: 10,
            output_tokens: 20,
        },
        stop_reason: Some("stop".to_string()),
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            None => Ok(text_response(
                "The system manages 5000+ power station records.".to_string(),
            )),
            Some(MockReply::Text(text)) => Ok(text_response(text)),
            Some(MockReply::Status(status)) => {
                Err(LlmError::api_error(status, "Internal Server Error".to_string()))
            }
            Some(MockReply::Delay(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text_response(text))
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(vec![MODEL.to_string(), "llama3:8b".to_string()])
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        MODEL
    }

    fn base_url(&self) -> &str {
        "http://localhost:11434"
    }
}

/// Wraps a real store and fails selected operations.
pub struct FlakyStore {
    pub inner: Arc<dyn ConversationStore>,
    pub fail_user_appends: bool,
    pub fail_assistant_appends: bool,
    pub fail_reads: bool,
    pub panic_on_append: bool,
    pub appended: Mutex<Vec<NewMessage>>,
}

impl FlakyStore {
    pub fn wrap(inner: Arc<dyn ConversationStore>) -> Self {
        Self {
            inner,
            fail_user_appends: false,
            fail_assistant_appends: false,
            fail_reads: false,
            panic_on_append: false,
            appended: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ConversationStore for FlakyStore {
    async fn append(&self, message: NewMessage) -> Result<i64, StorageError> {
        if self.panic_on_append {
            panic!("store exploded");
        }
        let fail = match message.role {
            station_qa_api::models::MessageRole::User => self.fail_user_appends,
            _ => self.fail_assistant_appends,
        };
        if fail {
            return Err(StorageError::OperationFailed(
                "database is unavailable".to_string(),
            ));
        }
        self.appended.lock().unwrap().push(message.clone());
        self.inner.append(message).await
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::OperationFailed(
                "database is unavailable".to_string(),
            ));
        }
        self.inner.recent(session_id, limit).await
    }

    async fn clear(&self, session_id: &str) -> Result<usize, StorageError> {
        self.inner.clear(session_id).await
    }
}

pub fn test_settings() -> QaSettings {
    QaSettings {
        system_prompt: SYSTEM_PROMPT.to_string(),
        history_limit: 10,
        model_name: MODEL.to_string(),
        options: GenerationOptions::default(),
        timeout: Duration::from_secs(60),
        serialize_turns: true,
    }
}

pub fn setup_test_store() -> anyhow::Result<(TempDir, Arc<SqliteConversationStore>)> {
    let dir = tempfile::tempdir()?;
    let pool = initialize_database(&DatabaseConfig {
        path: dir.path().join("qa.db"),
        pool_size: 4,
    })?;
    Ok((dir, Arc::new(SqliteConversationStore::new(pool))))
}

pub struct TestContext {
    pub _dir: TempDir,
    pub store: Arc<SqliteConversationStore>,
    pub llm: Arc<MockLlmClient>,
    pub handler: QaHandler,
}

pub fn setup_handler(llm: MockLlmClient) -> anyhow::Result<TestContext> {
    let (dir, store) = setup_test_store()?;
    let llm = Arc::new(llm);
    let handler = QaHandler::new(store.clone(), llm.clone(), test_settings());
    Ok(TestContext {
        _dir: dir,
        store,
        llm,
        handler,
    })
}

pub async fn setup_test_app(
    handler: QaHandler,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = actix_web::dev::ServiceResponse,
    Error = actix_web::Error,
> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(handler))
            .app_data(web::Data::new(QaConfig::default()))
            .service(handlers::health::health)
            .configure(handlers::qa::configure),
    )
    .await
}
