use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Handle that swaps the active log filter at runtime
#[derive(Clone)]
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Replace the active filter; the next log event sees the new level
    pub fn set_directive(&self, directive: &str) -> Result<(), BoxError> {
        let filter = EnvFilter::try_new(directive)?;
        self.handle.reload(filter)?;
        Ok(())
    }
}

/// Initialize the tracing system
///
/// `RUST_LOG` wins over `directive` when set. Output goes to stderr in the
/// compact `LEVEL message` form so it never mixes with resolved values written
/// to stdout.
pub fn init(directive: &str) -> Result<LogHandle, BoxError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directive))?;
    let (filter_layer, handle) = reload::Layer::new(filter);

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .without_time()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(LogHandle { handle })
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}
