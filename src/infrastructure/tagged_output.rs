//! Trace-tagged line output.
//!
//! [`TaggedOutput`] is the handle handler code prints through. Each line is
//! prefixed with `[trace_id: <id>] ` when a trace scope is active and written
//! unchanged otherwise. Writing never fails from the caller's point of view:
//! I/O and forwarding problems are reported through `tracing` and the line is
//! still emitted where possible.
//!
//! Handlers behind the request logger can take the handle as an extractor:
//!
//! ```rust,ignore
//! async fn handler(Extension(out): Extension<TaggedOutput>) -> &'static str {
//!     out.println(format_args!("inside handler"));
//!     "ok"
//! }
//! ```
//!
//! # Process-wide installation
//!
//! [`install`] registers a handle for the [`tprintln!`](crate::tprintln) macro.
//! This affects every caller of the macro in the process, including unrelated
//! code, for the rest of the process lifetime; it cannot be scoped to a single
//! request or undone. The first installation wins. Until something is
//! installed, `tprintln!` prints lines unmodified.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock};

use crate::domain::context;
use crate::domain::dispatch_event::MessageEnvelope;
use crate::domain::log_record::Severity;
use crate::infrastructure::sink::RemoteDispatcher;

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

static INSTALLED: OnceLock<TaggedOutput> = OnceLock::new();

/// Cloneable handle for trace-tagged output.
#[derive(Clone, Default)]
pub struct TaggedOutput {
    /// `None` writes to stdout.
    writer: Option<SharedWriter>,
    forward: Option<RemoteDispatcher>,
}

impl fmt::Debug for TaggedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedOutput")
            .field("stdout", &self.writer.is_none())
            .field("forwarding", &self.forward.is_some())
            .finish()
    }
}

impl TaggedOutput {
    /// Handle writing to stdout without forwarding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes lines to `writer` instead of stdout.
    pub fn with_writer<W>(mut self, writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        self.writer = Some(Arc::new(Mutex::new(Box::new(writer))));
        self
    }

    /// Also forwards messages written through [`TaggedOutput::log`] to a collector.
    pub fn with_forwarding(mut self, dispatcher: RemoteDispatcher) -> Self {
        self.forward = Some(dispatcher);
        self
    }

    /// Prefixes `message` with the current trace id, if there is one.
    pub fn tag(message: &str) -> String {
        match context::current() {
            Some(trace_id) => format!("[trace_id: {trace_id}] {message}"),
            None => message.to_string(),
        }
    }

    /// Writes one tagged line.
    pub fn println(&self, args: fmt::Arguments<'_>) {
        self.write_line(&Self::tag(&args.to_string()));
    }

    /// Writes one tagged line and forwards it with `level` when forwarding is on.
    pub fn log(&self, level: Severity, message: impl fmt::Display) {
        let message = message.to_string();
        self.write_line(&Self::tag(&message));

        if let Some(dispatcher) = &self.forward {
            dispatcher.send(MessageEnvelope::new(context::current(), level, message));
        }
    }

    /// [`TaggedOutput::log`] at [`Severity::Info`].
    pub fn info(&self, message: impl fmt::Display) {
        self.log(Severity::Info, message);
    }

    fn write_line(&self, line: &str) {
        let result = match &self.writer {
            None => writeln!(io::stdout().lock(), "{line}"),
            Some(writer) => match writer.lock() {
                Ok(mut w) => writeln!(w, "{line}").and_then(|_| w.flush()),
                Err(poisoned) => {
                    let mut w = poisoned.into_inner();
                    writeln!(w, "{line}").and_then(|_| w.flush())
                }
            },
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to write tagged output");
        }
    }
}

/// Installs `output` as the process-wide handle used by [`tprintln!`](crate::tprintln).
///
/// Returns `false` if a handle was already installed; the earlier one stays.
pub fn install(output: TaggedOutput) -> bool {
    INSTALLED.set(output).is_ok()
}

pub fn is_installed() -> bool {
    INSTALLED.get().is_some()
}

/// Backend of [`tprintln!`](crate::tprintln).
#[doc(hidden)]
pub fn print_installed(args: fmt::Arguments<'_>) {
    match INSTALLED.get() {
        Some(output) => output.println(args),
        None => {
            let mut stdout = io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{args}") {
                tracing::warn!(error = %e, "Failed to write output");
            }
        }
    }
}

/// `println!` replacement that tags lines with the active trace id once a
/// [`TaggedOutput`] has been [installed](install).
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => {
        $crate::infrastructure::tagged_output::print_installed(::std::format_args!($($arg)*))
    };
}
