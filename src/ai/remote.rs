//! Remote decision client
//!
//! One outbound chat request per attempt, bounded by a timeout and
//! abandoned as soon as the scenario's cancel token fires. Every failure
//! comes back as a [`RemoteError`].

use crate::ai::prompt::{ChatRequest, PromptBuilder};
use crate::ai::reply::{parse_reply, ParseContext};
use crate::ai::scenario::{Decision, Scenario};
use crate::config::AiSettings;
use crate::game::GameStatus;
use crate::loader::Catalog;
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote AI is not configured")]
    Unconfigured,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no reply within {0} ms")]
    Timeout(u64),

    #[error("endpoint answered {0}: {1}")]
    Status(u16, String),

    #[error("unparseable reply: {0}")]
    Parse(String),

    #[error("reply holds no decision: {0}")]
    NoDecision(String),

    #[error("scenario was cancelled")]
    Cancelled,
}

/// Cooperative cancellation shared between a scenario and its in-flight work
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        CancelToken { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Completes once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<String, RemoteError>> + Send + 'a>>;

/// Sends a chat request and yields the reply's message content
pub trait ChatTransport: Send + Sync {
    fn send<'a>(&'a self, request: &'a ChatRequest) -> TransportFuture<'a>;
}

/// Chat-completions endpoint over HTTP
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(settings: &AiSettings) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("skill-gomoku/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(HttpTransport {
            client,
            endpoint: settings.endpoint.trim().to_string(),
            api_key: settings.resolved_api_key(),
        })
    }
}

impl ChatTransport for HttpTransport {
    fn send<'a>(&'a self, request: &'a ChatRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            let mut builder = self.client.post(&self.endpoint).json(request);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }
            let response = builder
                .send()
                .await
                .map_err(|e| RemoteError::Transport(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(RemoteError::Status(status.as_u16(), text.chars().take(200).collect()));
            }
            let body: Value = response
                .json()
                .await
                .map_err(|e| RemoteError::Parse(e.to_string()))?;
            message_content(&body)
        })
    }
}

/// `choices[0].message.content` of a chat-completions response
pub fn message_content(body: &Value) -> Result<String, RemoteError> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RemoteError::Parse("response has no message content".to_string()))
}

/// Replays queued replies; used by tests and offline demos
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<String, RemoteError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    delay: Duration,
}

impl ScriptedTransport {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, RemoteError>>,
    {
        ScriptedTransport {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Wait this long before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ChatTransport for ScriptedTransport {
    fn send<'a>(&'a self, request: &'a ChatRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| Err(RemoteError::Transport("no scripted reply left".to_string())))
        })
    }
}

/// Asks the remote model for a decision on one scenario
#[derive(Clone)]
pub struct RemoteClient {
    transport: Option<Arc<dyn ChatTransport>>,
    settings: AiSettings,
}

impl RemoteClient {
    /// HTTP client when an endpoint is configured, otherwise an unconfigured client
    pub fn from_settings(settings: &AiSettings) -> Result<Self, RemoteError> {
        let transport: Option<Arc<dyn ChatTransport>> = if settings.is_configured() {
            Some(Arc::new(HttpTransport::new(settings)?))
        } else {
            None
        };
        Ok(RemoteClient {
            transport,
            settings: settings.clone(),
        })
    }

    pub fn unconfigured(settings: &AiSettings) -> Self {
        RemoteClient {
            transport: None,
            settings: settings.clone(),
        }
    }

    pub fn with_transport(transport: Arc<dyn ChatTransport>, settings: &AiSettings) -> Self {
        RemoteClient {
            transport: Some(transport),
            settings: settings.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    pub fn settings(&self) -> &AiSettings {
        &self.settings
    }

    pub async fn decide(
        &self,
        catalog: &Catalog,
        scenario: &Scenario,
        state: &GameStatus,
        feedback: Option<&str>,
        cancel: &CancelToken,
        timeout: Duration,
    ) -> Result<Decision, RemoteError> {
        let transport = self.transport.as_ref().ok_or(RemoteError::Unconfigured)?;
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        let request = PromptBuilder::new(catalog).build(
            scenario,
            state,
            &self.settings.model,
            self.settings.temperature,
            feedback,
        );

        let content = tokio::select! {
            _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
            result = tokio::time::timeout(timeout, transport.send(&request)) => match result {
                Ok(reply) => reply?,
                Err(_) => return Err(RemoteError::Timeout(timeout.as_millis() as u64)),
            },
        };
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }

        let ctx = ParseContext {
            scenario,
            board: &state.board,
            hand: &state.zones[scenario.side].hand,
            catalog,
        };
        parse_reply(&content, &ctx)
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("configured", &self.is_configured())
            .field("model", &self.settings.model)
            .finish()
    }
}
