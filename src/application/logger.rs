//! Request logger configuration and installation.
//!
//! [`RequestLogger`] bundles the immutable middleware configuration with the
//! sink records go to. It is built once at startup and applied to an axum
//! [`Router`]:
//!
//! ```rust,ignore
//! use trace_logger::application::logger::RequestLogger;
//! use trace_logger::infrastructure::sink::RemoteSettings;
//!
//! let logger = RequestLogger::builder()
//!     .exclude_paths(["/health", "/metrics"])
//!     .exclude_methods(["OPTIONS"])
//!     .log_headers(false)
//!     .remote(RemoteSettings::new("http://collector:8080/"))
//!     .build()?;
//!
//! let app = logger.apply(Router::new().route("/", get(root)));
//! ```

use axum::{Router, http::Method, middleware};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::api::middleware::request_log;
use crate::domain::log_record::{LogFormat, LogRecord};
use crate::error::ConfigError;
use crate::infrastructure::sink::{
    CallbackSink, ConsoleSink, LogFunction, LogSink, RemoteDispatcher, RemoteSettings, RemoteSink,
};
use crate::infrastructure::tagged_output::{self, TaggedOutput};

/// Default number of body bytes kept in a record (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Where finished records go.
#[derive(Clone)]
pub enum SinkKind {
    /// Local output through `tracing`, rendered in the configured format.
    Console,
    /// Fire-and-forget POST to an HTTP collector.
    Remote(RemoteSettings),
    /// User-supplied log function.
    Custom(LogFunction),
}

impl Default for SinkKind {
    fn default() -> Self {
        Self::Remote(RemoteSettings::default())
    }
}

/// Immutable middleware settings, read on every request.
#[derive(Debug, Clone)]
pub struct RequestLoggerConfig {
    exclude_paths: HashSet<String>,
    exclude_methods: HashSet<Method>,
    pub log_request_body: bool,
    pub log_headers: bool,
    pub log_cookies: bool,
    pub format: LogFormat,
    pub install_tagged_output: bool,
    pub trust_proxy_headers: bool,
    pub max_body_bytes: usize,
}

impl RequestLoggerConfig {
    /// Whether requests with this method or path bypass the logger entirely.
    pub fn is_excluded(&self, method: &Method, path: &str) -> bool {
        self.exclude_paths.contains(path) || self.exclude_methods.contains(method)
    }

    pub fn exclude_paths(&self) -> impl Iterator<Item = &str> {
        self.exclude_paths.iter().map(String::as_str)
    }

    pub fn exclude_methods(&self) -> impl Iterator<Item = &Method> {
        self.exclude_methods.iter()
    }
}

/// Builder for [`RequestLogger`].
///
/// Defaults: nothing excluded, body logging off, headers and cookies on, JSON
/// format, remote sink at [`crate::infrastructure::sink::DEFAULT_ENDPOINT`],
/// tagged output installed, forwarding of tagged output off, 1 MiB body limit.
#[derive(Clone)]
pub struct RequestLoggerBuilder {
    exclude_paths: Vec<String>,
    exclude_methods: Vec<String>,
    log_request_body: bool,
    log_headers: bool,
    log_cookies: bool,
    format: LogFormat,
    sink: SinkKind,
    install_tagged_output: bool,
    forward_tagged_output: bool,
    trust_proxy_headers: bool,
    max_body_bytes: usize,
    output: TaggedOutput,
}

impl Default for RequestLoggerBuilder {
    fn default() -> Self {
        Self {
            exclude_paths: Vec::new(),
            exclude_methods: Vec::new(),
            log_request_body: false,
            log_headers: true,
            log_cookies: true,
            format: LogFormat::Json,
            sink: SinkKind::default(),
            install_tagged_output: true,
            forward_tagged_output: false,
            trust_proxy_headers: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            output: TaggedOutput::new(),
        }
    }
}

impl RequestLoggerBuilder {
    pub fn exclude_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn exclude_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_methods
            .extend(methods.into_iter().map(Into::into));
        self
    }

    pub fn log_request_body(mut self, enabled: bool) -> Self {
        self.log_request_body = enabled;
        self
    }

    pub fn log_headers(mut self, enabled: bool) -> Self {
        self.log_headers = enabled;
        self
    }

    pub fn log_cookies(mut self, enabled: bool) -> Self {
        self.log_cookies = enabled;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn sink(mut self, sink: SinkKind) -> Self {
        self.sink = sink;
        self
    }

    pub fn console(self) -> Self {
        self.sink(SinkKind::Console)
    }

    pub fn remote(self, settings: RemoteSettings) -> Self {
        self.sink(SinkKind::Remote(settings))
    }

    /// Sends every record to `function` instead of a built-in sink.
    pub fn log_function<F>(self, function: F) -> Self
    where
        F: Fn(LogRecord) + Send + Sync + 'static,
    {
        self.sink(SinkKind::Custom(Arc::new(function)))
    }

    /// Installs the [`TaggedOutput`] process-wide when the logger is applied.
    pub fn install_tagged_output(mut self, enabled: bool) -> Self {
        self.install_tagged_output = enabled;
        self
    }

    /// Forwards messages logged through the [`TaggedOutput`] to the remote sink.
    pub fn forward_tagged_output(mut self, enabled: bool) -> Self {
        self.forward_tagged_output = enabled;
        self
    }

    /// Reads the client address from `X-Forwarded-For` / `X-Real-IP`.
    pub fn trust_proxy_headers(mut self, enabled: bool) -> Self {
        self.trust_proxy_headers = enabled;
        self
    }

    /// Longest body prefix kept in a record; the handler always sees the whole body.
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Base [`TaggedOutput`] handed to handlers; stdout unless replaced.
    /// Forwarding, when enabled, is added on top of it.
    pub fn output(mut self, output: TaggedOutput) -> Self {
        self.output = output;
        self
    }

    /// Validates the options and creates the sink.
    ///
    /// A remote sink starts its background worker here, so this must run
    /// inside a Tokio runtime when [`SinkKind::Remote`] is selected.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an excluded path does not start with `/`, an
    /// excluded method is not a valid method token, the body limit is zero,
    /// the remote settings are invalid, or forwarding is requested without a
    /// remote sink.
    pub fn build(self) -> Result<RequestLogger, ConfigError> {
        let exclude_paths = self
            .exclude_paths
            .into_iter()
            .map(|path| {
                if path.starts_with('/') {
                    Ok(path)
                } else {
                    Err(ConfigError::InvalidExcludePath(path))
                }
            })
            .collect::<Result<HashSet<_>, _>>()?;

        let exclude_methods = self
            .exclude_methods
            .into_iter()
            .map(|raw| {
                Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
                    .map_err(|_| ConfigError::InvalidExcludeMethod(raw))
            })
            .collect::<Result<HashSet<_>, _>>()?;

        if self.max_body_bytes == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }

        if self.forward_tagged_output && !matches!(self.sink, SinkKind::Remote(_)) {
            return Err(ConfigError::ForwardingRequiresRemote);
        }

        let mut tagged_output = self.output;
        let sink: Arc<dyn LogSink> = match self.sink {
            SinkKind::Console => Arc::new(ConsoleSink::new(self.format)),
            SinkKind::Custom(function) => Arc::new(CallbackSink::new(function)),
            SinkKind::Remote(settings) => {
                let dispatcher = RemoteDispatcher::spawn(&settings)?;
                if self.forward_tagged_output {
                    tagged_output = tagged_output.with_forwarding(dispatcher.clone());
                }
                Arc::new(RemoteSink::new(dispatcher))
            }
        };

        let config = RequestLoggerConfig {
            exclude_paths,
            exclude_methods,
            log_request_body: self.log_request_body,
            log_headers: self.log_headers,
            log_cookies: self.log_cookies,
            format: self.format,
            install_tagged_output: self.install_tagged_output,
            trust_proxy_headers: self.trust_proxy_headers,
            max_body_bytes: self.max_body_bytes,
        };

        tracing::debug!(sink = sink.name(), ?config, "Request logger configured");

        Ok(RequestLogger {
            inner: Arc::new(LoggerInner {
                config,
                sink,
                tagged_output,
            }),
        })
    }
}

struct LoggerInner {
    config: RequestLoggerConfig,
    sink: Arc<dyn LogSink>,
    tagged_output: TaggedOutput,
}

/// Configured request logger; cheap to clone.
#[derive(Clone)]
pub struct RequestLogger {
    inner: Arc<LoggerInner>,
}

impl RequestLogger {
    pub fn builder() -> RequestLoggerBuilder {
        RequestLoggerBuilder::default()
    }

    pub fn config(&self) -> &RequestLoggerConfig {
        &self.inner.config
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.inner.sink
    }

    /// Handle inserted into the extensions of every logged request.
    pub fn tagged_output(&self) -> &TaggedOutput {
        &self.inner.tagged_output
    }

    /// Registers the request logging middleware on `router`.
    ///
    /// When tagged output installation is enabled, the logger's
    /// [`TaggedOutput`] also becomes the process-wide handle behind
    /// [`tprintln!`](crate::tprintln). That affects all code in the process
    /// and cannot be reverted.
    pub fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        if self.inner.config.install_tagged_output
            && tagged_output::install(self.inner.tagged_output.clone())
        {
            tracing::info!("Tagged output installed process-wide");
        }

        router.layer(middleware::from_fn_with_state(
            self.clone(),
            request_log::layer,
        ))
    }

    /// Hands a record to the sink on a detached task.
    pub(crate) fn dispatch(&self, record: LogRecord) -> JoinHandle<()> {
        let sink = self.inner.sink.clone();
        tokio::spawn(async move { sink.emit(record).await })
    }
}
