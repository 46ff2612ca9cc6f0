use crate::{DEFAULT_BYPASS_EXPIRY_MS, Error, Result};

/// Page configuration. `Default` gives a 500 ms bypass window, a
/// 10 000 step timer limit, and tracing switched off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// How long a bypass armed by a bypass trigger stays in effect.
    pub bypass_expiry_ms: i64,
    /// Upper bound on timers run by one `advance_time`/`flush` call.
    pub timer_step_limit: usize,
    pub trace: TraceOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOptions {
    pub enabled: bool,
    pub events: bool,
    pub timers: bool,
    pub tracker: bool,
    /// Oldest lines are dropped past this many.
    pub log_limit: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            bypass_expiry_ms: DEFAULT_BYPASS_EXPIRY_MS,
            timer_step_limit: 10_000,
            trace: TraceOptions::default(),
        }
    }
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            events: true,
            timers: true,
            tracker: true,
            log_limit: 10_000,
        }
    }
}

impl Options {
    pub fn validate(&self) -> Result<()> {
        if self.bypass_expiry_ms < 0 {
            return Err(Error::InvalidArgument(format!(
                "bypass_expiry_ms must be non-negative (got {})",
                self.bypass_expiry_ms
            )));
        }
        if self.timer_step_limit == 0 {
            return Err(Error::InvalidArgument(
                "timer_step_limit requires at least 1 step".into(),
            ));
        }
        if self.trace.log_limit == 0 {
            return Err(Error::InvalidArgument(
                "trace log_limit requires at least 1 entry".into(),
            ));
        }
        Ok(())
    }
}
