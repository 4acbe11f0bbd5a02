//! Remote log dispatcher and the sink built on top of it.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use url::Url;

use super::service::LogSink;
use super::worker::run_dispatch_worker;
use crate::domain::dispatch_event::DispatchData;
use crate::domain::log_record::LogRecord;
use crate::error::ConfigError;

/// Default collector address, matching the bundled `receiver` binary.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/";

/// Settings for shipping records to an HTTP collector.
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub endpoint: String,
    /// Per-request timeout for a single POST.
    pub timeout: Duration,
    /// Payloads buffered before new ones are dropped.
    pub queue_capacity: usize,
    /// Deliveries allowed in flight at once.
    pub concurrency: usize,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(2),
            queue_capacity: 10_000,
            concurrency: 4,
        }
    }
}

impl RemoteSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Checks the settings and returns the parsed endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the endpoint is not an absolute `http`/`https` URL
    /// - the timeout is zero
    /// - `queue_capacity` is outside `1..=1_000_000`
    /// - `concurrency` is outside `1..=256`
    pub fn validate(&self) -> Result<Url, ConfigError> {
        let endpoint = Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: format!("unsupported scheme '{}'", endpoint.scheme()),
            });
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.queue_capacity == 0 || self.queue_capacity > 1_000_000 {
            return Err(ConfigError::QueueCapacity(self.queue_capacity));
        }

        if self.concurrency == 0 || self.concurrency > 256 {
            return Err(ConfigError::Concurrency(self.concurrency));
        }

        Ok(endpoint)
    }
}

/// Fire-and-forget delivery of records and messages to a collector.
///
/// [`RemoteDispatcher::send`] only pushes onto a bounded queue; a background
/// worker does the HTTP work. When the queue is full or the worker has gone
/// away the payload is dropped with a warning. Callers never learn whether a
/// delivery succeeded.
#[derive(Debug, Clone)]
pub struct RemoteDispatcher {
    tx: mpsc::Sender<DispatchData>,
}

impl RemoteDispatcher {
    /// Validates `settings`, builds the HTTP client and starts the worker.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the HTTP client cannot
    /// be built.
    pub fn spawn(settings: &RemoteSettings) -> Result<Self, ConfigError> {
        let endpoint = settings.validate()?;
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        let (tx, rx) = mpsc::channel(settings.queue_capacity);
        tokio::spawn(run_dispatch_worker(
            rx,
            client,
            endpoint.clone(),
            settings.concurrency,
        ));
        tracing::info!(endpoint = %endpoint, "Remote log dispatcher started");

        Ok(Self { tx })
    }

    #[cfg(test)]
    pub(crate) fn from_sender(tx: mpsc::Sender<DispatchData>) -> Self {
        Self { tx }
    }

    /// Queues a payload without waiting.
    pub fn send(&self, data: impl Into<DispatchData>) {
        match self.tx.try_send(data.into()) {
            Ok(()) => {}
            Err(TrySendError::Full(data)) => {
                tracing::warn!(
                    trace_id = ?data.trace_id().map(|id| id.as_str()),
                    "Log queue is full, dropping payload"
                );
            }
            Err(TrySendError::Closed(data)) => {
                tracing::warn!(
                    trace_id = ?data.trace_id().map(|id| id.as_str()),
                    "Log dispatcher is closed, dropping payload"
                );
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Free slots left in the queue.
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

/// [`LogSink`] shipping every record through a [`RemoteDispatcher`].
pub struct RemoteSink {
    dispatcher: RemoteDispatcher,
}

impl RemoteSink {
    pub fn new(dispatcher: RemoteDispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &RemoteDispatcher {
        &self.dispatcher
    }
}

#[async_trait]
impl LogSink for RemoteSink {
    async fn emit(&self, record: LogRecord) {
        self.dispatcher.send(record);
    }

    fn name(&self) -> &'static str {
        "remote"
    }

    async fn health_check(&self) -> bool {
        !self.dispatcher.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dispatch_event::MessageEnvelope;
    use crate::domain::log_record::Severity;

    #[test]
    fn test_default_settings_are_valid() {
        let endpoint = RemoteSettings::default().validate().unwrap();
        assert_eq!(endpoint.as_str(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        assert!(matches!(
            RemoteSettings::new("not a url").validate(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            RemoteSettings::new("ftp://collector/").validate(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            RemoteSettings::default().timeout(Duration::ZERO).validate(),
            Err(ConfigError::ZeroTimeout)
        ));
        assert!(matches!(
            RemoteSettings::default().queue_capacity(0).validate(),
            Err(ConfigError::QueueCapacity(0))
        ));
        assert!(matches!(
            RemoteSettings::default().concurrency(1000).validate(),
            Err(ConfigError::Concurrency(1000))
        ));
    }

    #[test]
    fn test_send_drops_when_queue_is_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let dispatcher = RemoteDispatcher { tx };

        dispatcher.send(MessageEnvelope::new(None, Severity::Info, "first"));
        dispatcher.send(MessageEnvelope::new(None, Severity::Info, "second"));

        let Some(DispatchData::Message(first)) = rx.try_recv().ok() else {
            panic!("expected the first message");
        };
        assert_eq!(first.message, "first");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_close_does_not_panic() {
        let (tx, rx) = mpsc::channel(4);
        let dispatcher = RemoteDispatcher { tx };
        drop(rx);

        assert!(dispatcher.is_closed());
        dispatcher.send(MessageEnvelope::new(None, Severity::Error, "lost"));
    }

    #[tokio::test]
    async fn test_spawn_reports_capacity() {
        let dispatcher =
            RemoteDispatcher::spawn(&RemoteSettings::default().queue_capacity(16)).unwrap();
        assert!(!dispatcher.is_closed());
        assert_eq!(dispatcher.capacity(), 16);
    }
}
