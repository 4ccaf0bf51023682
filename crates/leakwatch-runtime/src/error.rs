use std::error::Error;
use std::fmt;

use leakwatch_types::{LeakReport, ReportFormat};

#[derive(Debug)]
pub enum TrackError {
    /// `track()` while a session is already open.
    AlreadyTracking,
    /// `check()` or `end_session()` with no open session.
    NotTracking,
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
    LeakDetected(LeakDetected),
}

impl TrackError {
    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// The leak report, when this error is a failed check.
    pub fn leak_report(&self) -> Option<&LeakReport> {
        match self {
            Self::LeakDetected(leaks) => Some(leaks.report()),
            _ => None,
        }
    }
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyTracking => f.write_str(
                "leak tracking is already active; call check() before starting a new session",
            ),
            Self::NotTracking => {
                f.write_str("leak tracking is not active; call track() first")
            }
            Self::InvalidConfig { field, reason } => {
                write!(f, "invalid leakwatch configuration for {field}: {reason}")
            }
            Self::LeakDetected(leaks) => write!(f, "{leaks}"),
        }
    }
}

impl Error for TrackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::LeakDetected(leaks) => Some(leaks),
            _ => None,
        }
    }
}

impl From<LeakDetected> for TrackError {
    fn from(value: LeakDetected) -> Self {
        Self::LeakDetected(value)
    }
}

/// One or more resources had not reached a terminal state at check time.
///
/// The rendered message stands on its own; the structured report is there
/// for callers that want to assert on individual entries.
#[derive(Debug, Clone)]
pub struct LeakDetected {
    report: LeakReport,
    format: ReportFormat,
    message: String,
}

impl LeakDetected {
    pub(crate) fn new(report: LeakReport, format: ReportFormat) -> Self {
        let message = crate::report::render(&report, format);
        Self {
            report,
            format,
            message,
        }
    }

    pub fn report(&self) -> &LeakReport {
        &self.report
    }

    pub fn into_report(self) -> LeakReport {
        self.report
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LeakDetected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for LeakDetected {}
