use std::time::Duration;

use leakwatch_types::ReportFormat;

use crate::error::TrackError;

/// Generous enough that a naturally quiet worker is not flagged.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(5);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(25);

pub const IDLE_THRESHOLD_ENV: &str = "LEAKWATCH_IDLE_THRESHOLD_MS";
pub const SETTLE_DELAY_ENV: &str = "LEAKWATCH_SETTLE_DELAY_MS";
pub const REPORT_FORMAT_ENV: &str = "LEAKWATCH_REPORT_FORMAT";

/// Per-tracker settings. `settle_delay` and `format` are the defaults a
/// [`crate::CheckOptions`] falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    idle_threshold: Duration,
    pub settle_delay: Duration,
    pub format: ReportFormat,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            settle_delay: DEFAULT_SETTLE_DELAY,
            format: ReportFormat::default(),
        }
    }
}

impl TrackerConfig {
    pub fn idle_threshold(&self) -> Duration {
        self.idle_threshold
    }

    pub fn with_idle_threshold(mut self, idle_threshold: Duration) -> Result<Self, TrackError> {
        validate_idle_threshold(idle_threshold)?;
        self.idle_threshold = idle_threshold;
        Ok(self)
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Defaults overridden by `LEAKWATCH_*` environment variables.
    pub fn from_env() -> Result<Self, TrackError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`. Blank
    /// values count as unset; anything else must parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TrackError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(raw) = read(IDLE_THRESHOLD_ENV) {
            let ms = parse_millis(IDLE_THRESHOLD_ENV, &raw)?;
            config = config.with_idle_threshold(Duration::from_millis(ms))?;
        }
        if let Some(raw) = read(SETTLE_DELAY_ENV) {
            let ms = parse_millis(SETTLE_DELAY_ENV, &raw)?;
            config.settle_delay = Duration::from_millis(ms);
        }
        if let Some(raw) = read(REPORT_FORMAT_ENV) {
            config.format = raw
                .parse()
                .map_err(|err| TrackError::invalid_config(REPORT_FORMAT_ENV, format!("{err}")))?;
        }
        Ok(config)
    }
}

pub(crate) fn validate_idle_threshold(idle_threshold: Duration) -> Result<(), TrackError> {
    if idle_threshold.is_zero() {
        return Err(TrackError::invalid_config(
            "idle_threshold",
            "must be a positive duration",
        ));
    }
    Ok(())
}

fn parse_millis(field: &'static str, raw: &str) -> Result<u64, TrackError> {
    raw.parse::<u64>().map_err(|err| {
        TrackError::invalid_config(
            field,
            format!("expected a whole number of milliseconds, got {raw:?}: {err}"),
        )
    })
}
