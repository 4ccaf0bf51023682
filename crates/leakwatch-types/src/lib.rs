//! Shared data model for leakwatch.
//!
//! Everything the runtime reports lives here: entry ids, resource kinds and
//! their per-kind statuses, point-in-time counts, and the leak report a failed
//! check carries. All types derive [`Facet`] so reports can be serialized
//! without the runtime crate.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use facet::Facet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    ZeroId(&'static str),
    UnknownReportFormat(String),
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroId(field) => write!(f, "{field} of a tracked entry cannot be zero"),
            Self::UnknownReportFormat(value) => write!(
                f,
                "unknown report format {value:?} (expected short, summary, details or json)"
            ),
        }
    }
}

impl Error for InvariantError {}

// ── Ids ─────────────────────────────────────────────────────────

/// Identity of one tracked resource instance.
///
/// `seq` is assigned monotonically from 1 within a session and is what
/// reports print. `session` is the generation of the tracking session the
/// entry belongs to, so a handle that outlives its session can never address
/// an entry of a later one. The all-zero id is the "untracked" sentinel
/// handed out when no session is open.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId {
    session: u64,
    seq: u64,
}

impl EntryId {
    pub const UNTRACKED: EntryId = EntryId { session: 0, seq: 0 };

    pub fn new(session: u64, seq: u64) -> Result<Self, InvariantError> {
        if session == 0 {
            return Err(InvariantError::ZeroId("session"));
        }
        if seq == 0 {
            return Err(InvariantError::ZeroId("seq"));
        }
        Ok(Self { session, seq })
    }

    pub fn session(self) -> u64 {
        self.session
    }

    pub fn seq(self) -> u64 {
        self.seq
    }

    pub fn is_tracked(self) -> bool {
        self != Self::UNTRACKED
    }
}

// ── Kinds and statuses ──────────────────────────────────────────

#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum ResourceKind {
    Worker,
    ChannelEndpoint,
    SharedBuffer,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Worker => "Worker",
            Self::ChannelEndpoint => "ChannelEndpoint",
            Self::SharedBuffer => "SharedBuffer",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum WorkerStatus {
    Alive,
    Terminated,
}

#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum ChannelStatus {
    Open,
    Closed,
}

/// Inferred, never observed: a buffer is `Released` once no handle to it
/// remains.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum BufferStatus {
    Retained,
    Released,
}

#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum EntryStatus {
    Worker(WorkerStatus),
    ChannelEndpoint(ChannelStatus),
    SharedBuffer(BufferStatus),
}

impl EntryStatus {
    pub fn kind(self) -> ResourceKind {
        match self {
            Self::Worker(_) => ResourceKind::Worker,
            Self::ChannelEndpoint(_) => ResourceKind::ChannelEndpoint,
            Self::SharedBuffer(_) => ResourceKind::SharedBuffer,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Worker(WorkerStatus::Terminated)
                | Self::ChannelEndpoint(ChannelStatus::Closed)
                | Self::SharedBuffer(BufferStatus::Released)
        )
    }
}

/// A lifecycle notification forwarded by a resource proxy.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A message was sent to or by a worker.
    Activity,
    Terminated,
    Closed,
}

// ── Snapshot ────────────────────────────────────────────────────

#[derive(Facet, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerCounts {
    pub total: u64,
    pub alive: u64,
    pub idle: u64,
    pub terminated: u64,
}

#[derive(Facet, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelEndpointCounts {
    pub total: u64,
    pub open: u64,
    pub closed: u64,
}

#[derive(Facet, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SharedBufferCounts {
    pub total: u64,
    pub total_bytes: u64,
    pub retained: u64,
    pub retained_bytes: u64,
}

/// Point-in-time aggregate over every entry of the current session.
#[derive(Facet, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub workers: WorkerCounts,
    pub channel_endpoints: ChannelEndpointCounts,
    pub shared_buffers: SharedBufferCounts,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.workers.total == 0
            && self.channel_endpoints.total == 0
            && self.shared_buffers.total == 0
    }
}

/// Reporting view of a single entry.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct EntrySnapshot {
    pub id: EntryId,
    pub status: EntryStatus,
    pub label: Option<String>,
    /// Only meaningful for alive workers.
    pub idle: bool,
    pub age_ms: u64,
    /// Workers only.
    pub last_activity_ms_ago: Option<u64>,
    /// Shared buffers only.
    pub size_bytes: Option<u64>,
}

impl EntrySnapshot {
    pub fn kind(&self) -> ResourceKind {
        self.status.kind()
    }

    /// `Worker#3`-style identifier used in reports.
    pub fn display_name(&self) -> String {
        format!("{}#{}", self.kind(), self.id.seq())
    }
}

// ── Leak report ─────────────────────────────────────────────────

#[derive(Facet, Debug, Clone, PartialEq)]
pub struct LeakReport {
    /// Alive workers that are not idle.
    pub running_workers: Vec<EntrySnapshot>,
    pub idle_workers: Vec<EntrySnapshot>,
    pub open_channel_endpoints: Vec<EntrySnapshot>,
    /// Candidates only: a buffer legitimately held elsewhere is reported too.
    pub retained_shared_buffers: Vec<EntrySnapshot>,
    pub idle_threshold_ms: u64,
    pub snapshot: Snapshot,
}

impl LeakReport {
    pub fn is_empty(&self) -> bool {
        self.leaked_count() == 0
    }

    pub fn leaked_workers(&self) -> usize {
        self.running_workers.len() + self.idle_workers.len()
    }

    pub fn leaked_count(&self) -> usize {
        self.leaked_workers()
            + self.open_channel_endpoints.len()
            + self.retained_shared_buffers.len()
    }

    pub fn retained_bytes(&self) -> u64 {
        self.retained_shared_buffers
            .iter()
            .filter_map(|entry| entry.size_bytes)
            .sum()
    }

    /// Leaked entries in registration order.
    pub fn entries(&self) -> Vec<&EntrySnapshot> {
        let mut entries: Vec<&EntrySnapshot> = self
            .running_workers
            .iter()
            .chain(&self.idle_workers)
            .chain(&self.open_channel_endpoints)
            .chain(&self.retained_shared_buffers)
            .collect();
        entries.sort_by_key(|entry| entry.id);
        entries
    }
}

#[derive(Facet, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum ReportFormat {
    /// One line with the leaked total per kind.
    Short,
    /// One line per leaked category, with entry ids.
    #[default]
    Summary,
    /// One line per leaked entry, with age and last activity.
    Details,
    /// The full [`LeakReport`] as JSON.
    Json,
}

impl ReportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Summary => "summary",
            Self::Details => "details",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = InvariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "summary" => Ok(Self::Summary),
            "details" => Ok(Self::Details),
            "json" => Ok(Self::Json),
            _ => Err(InvariantError::UnknownReportFormat(s.to_string())),
        }
    }
}
