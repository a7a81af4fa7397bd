//! Message consumer.
//!
//! A [`Consumer`] pulls messages from a [`MessageSource`] and hands each one
//! to a [`MessageHandler`] on a background task. Handler failures are logged
//! and the loop moves on to the next message.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Errors raised by the consumer and its handlers.
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Invalid consumer configuration.
    #[error("Invalid consumer configuration: {0}")]
    Config(String),

    /// The consumer loop ended before it became ready.
    #[error("Consumer failed to start: {0}")]
    Startup(String),

    /// The source no longer accepts messages.
    #[error("Message source is closed")]
    Closed,

    /// A handler could not process a message.
    #[error("Handler error: {0}")]
    Handler(String),
}

/// Consumer identity and broker list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Client id reported to the broker.
    pub client_id: String,
    /// Broker addresses.
    pub brokers: Vec<String>,
    /// Consumer group id.
    pub group_id: String,
}

/// A consumed message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Topic the message was published to.
    pub topic: String,
    /// Optional partitioning key.
    pub key: Option<String>,
    /// Raw payload.
    pub payload: Bytes,
    /// Message headers.
    pub headers: Vec<(String, String)>,
}

impl Message {
    /// Create a message without key or headers.
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            key: None,
            payload: payload.into(),
            headers: Vec::new(),
        }
    }

    /// Set the key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Deserialize the payload as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Where messages come from.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Wait for the next message. `None` means the source is exhausted.
    async fn next_message(&self) -> Option<Message>;
}

/// What is done with each message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one message.
    async fn handle(&self, message: Message) -> Result<(), ConsumerError>;
}

/// FIFO in-process message queue.
#[derive(Debug, Default)]
pub struct InMemorySource {
    queue: Mutex<VecDeque<Message>>,
    notify: Notify,
    closed: AtomicBool,
}

impl InMemorySource {
    /// Create an empty, open source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message.
    pub async fn publish(&self, message: Message) -> Result<(), ConsumerError> {
        if self.is_closed() {
            return Err(ConsumerError::Closed);
        }
        self.queue.lock().await.push_back(message);
        self.notify.notify_one();
        Ok(())
    }

    /// Stop accepting messages. Waiting consumers see `None` once the queue
    /// is drained.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Check if the source is closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of queued messages.
    pub async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }
}

#[async_trait]
impl MessageSource for InMemorySource {
    async fn next_message(&self) -> Option<Message> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(message) = self.queue.lock().await.pop_front() {
                return Some(message);
            }
            if self.is_closed() {
                return None;
            }

            notified.await;
        }
    }
}

/// Handler that only logs what it receives.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle(&self, message: Message) -> Result<(), ConsumerError> {
        info!(
            topic = %message.topic,
            key = ?message.key,
            bytes = message.payload.len(),
            "Message received"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    failed: AtomicU64,
}

/// Consumer wiring a source to a handler.
pub struct Consumer {
    config: ConsumerConfig,
    source: Arc<dyn MessageSource>,
    handler: Arc<dyn MessageHandler>,
}

impl Consumer {
    /// Create a consumer.
    pub fn new(
        config: ConsumerConfig,
        source: Arc<dyn MessageSource>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            config,
            source,
            handler,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Spawn the poll loop and wait until it is running.
    pub async fn start(self) -> Result<ConsumerHandle, ConsumerError> {
        if self.config.brokers.is_empty() {
            return Err(ConsumerError::Config("at least one broker is required".into()));
        }
        if self.config.group_id.trim().is_empty() {
            return Err(ConsumerError::Config("group id must not be empty".into()));
        }

        let token = CancellationToken::new();
        let counters = Arc::new(Counters::default());
        let (ready_tx, ready_rx) = oneshot::channel();

        let Consumer {
            config,
            source,
            handler,
        } = self;
        let cancelled = token.clone();
        let loop_counters = Arc::clone(&counters);

        let handle = tokio::spawn(async move {
            info!(
                client_id = %config.client_id,
                group_id = %config.group_id,
                brokers = ?config.brokers,
                "Consumer started"
            );
            let _ = ready_tx.send(());

            loop {
                let message = tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    message = source.next_message() => message,
                };

                let Some(message) = message else {
                    debug!("Message source exhausted");
                    break;
                };

                let topic = message.topic.clone();
                match handler.handle(message).await {
                    Ok(()) => {
                        loop_counters.processed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        loop_counters.failed.fetch_add(1, Ordering::Relaxed);
                        error!(topic = %topic, error = %e, "Message handling failed");
                    }
                }
            }

            info!(client_id = %config.client_id, "Consumer stopped");
        });

        ready_rx
            .await
            .map_err(|_| ConsumerError::Startup("poll loop exited early".into()))?;

        Ok(ConsumerHandle {
            token,
            handle,
            counters,
        })
    }
}

/// Handle for controlling a running consumer.
#[derive(Debug)]
pub struct ConsumerHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl ConsumerHandle {
    /// Check if the poll loop is still running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Messages handled successfully.
    pub fn processed(&self) -> u64 {
        self.counters.processed.load(Ordering::Relaxed)
    }

    /// Messages whose handler failed.
    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    /// Signal the loop to stop after the current message.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Stop the loop and wait for it to finish.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.handle.await {
            error!(error = %e, "Consumer task ended abnormally");
        }
    }
}
