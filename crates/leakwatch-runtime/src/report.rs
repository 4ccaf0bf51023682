use std::fmt::Write as _;

use leakwatch_types::{EntrySnapshot, EntryStatus, LeakReport, ReportFormat};

pub fn render(report: &LeakReport, format: ReportFormat) -> String {
    match format {
        ReportFormat::Short => headline(report),
        ReportFormat::Summary => summary(report),
        ReportFormat::Details => details(report),
        ReportFormat::Json => match facet_json::to_string(report) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(%err, "failed to serialize leak report; falling back to summary");
                summary(report)
            }
        },
    }
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

fn headline(report: &LeakReport) -> String {
    if report.is_empty() {
        return "no leaked resources".to_string();
    }
    let mut parts = Vec::new();
    if report.leaked_workers() > 0 {
        let mut part = plural(report.leaked_workers(), "worker", "workers");
        if !report.idle_workers.is_empty() {
            let _ = write!(part, " ({} idle)", report.idle_workers.len());
        }
        parts.push(part);
    }
    if !report.open_channel_endpoints.is_empty() {
        parts.push(plural(
            report.open_channel_endpoints.len(),
            "channel endpoint",
            "channel endpoints",
        ));
    }
    if !report.retained_shared_buffers.is_empty() {
        parts.push(format!(
            "{} ({} bytes)",
            plural(
                report.retained_shared_buffers.len(),
                "shared buffer",
                "shared buffers"
            ),
            report.retained_bytes()
        ));
    }
    format!("leaked resources: {}", parts.join(", "))
}

fn id_list(entries: &[EntrySnapshot]) -> String {
    entries
        .iter()
        .map(EntrySnapshot::display_name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn summary(report: &LeakReport) -> String {
    let mut out = headline(report);
    let idle_note = format!(
        " (no activity for more than {}ms)",
        report.idle_threshold_ms
    );
    let categories = [
        ("workers not terminated", &report.running_workers, ""),
        ("idle workers", &report.idle_workers, idle_note.as_str()),
        (
            "channel endpoints not closed",
            &report.open_channel_endpoints,
            "",
        ),
        (
            "shared buffers still referenced",
            &report.retained_shared_buffers,
            "",
        ),
    ];
    for (title, entries, note) in categories {
        if entries.is_empty() {
            continue;
        }
        let _ = write!(
            out,
            "\n  {title} ({}): {}{note}",
            entries.len(),
            id_list(entries)
        );
    }
    out
}

fn describe_status(entry: &EntrySnapshot) -> &'static str {
    match entry.status {
        EntryStatus::Worker(_) if entry.idle => "alive, idle",
        EntryStatus::Worker(_) => "alive, not terminated",
        EntryStatus::ChannelEndpoint(_) => "open",
        EntryStatus::SharedBuffer(_) => "still referenced",
    }
}

fn details(report: &LeakReport) -> String {
    let mut out = headline(report);
    for entry in report.entries() {
        let _ = write!(out, "\n  {}", entry.display_name());
        if let Some(label) = &entry.label {
            let _ = write!(out, " {label:?}");
        }
        let _ = write!(out, ": {}, age {}ms", describe_status(entry), entry.age_ms);
        if let Some(ago) = entry.last_activity_ms_ago {
            let _ = write!(out, ", last activity {ago}ms ago");
        }
        if let Some(size) = entry.size_bytes {
            let _ = write!(out, ", {size} bytes");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use leakwatch_types::{
        BufferStatus, ChannelStatus, EntryId, Snapshot, WorkerStatus,
    };

    fn entry(seq: u64, status: EntryStatus) -> EntrySnapshot {
        EntrySnapshot {
            id: EntryId::new(1, seq).expect("non-zero id"),
            status,
            label: None,
            idle: false,
            age_ms: 1_500,
            last_activity_ms_ago: None,
            size_bytes: None,
        }
    }

    fn sample_report() -> LeakReport {
        let running = EntrySnapshot {
            label: Some("echo".into()),
            last_activity_ms_ago: Some(3),
            ..entry(1, EntryStatus::Worker(WorkerStatus::Alive))
        };
        let idle = EntrySnapshot {
            idle: true,
            last_activity_ms_ago: Some(150),
            ..entry(3, EntryStatus::Worker(WorkerStatus::Alive))
        };
        let port = entry(2, EntryStatus::ChannelEndpoint(ChannelStatus::Open));
        let buffer = EntrySnapshot {
            size_bytes: Some(1024),
            ..entry(4, EntryStatus::SharedBuffer(BufferStatus::Retained))
        };
        LeakReport {
            running_workers: vec![running],
            idle_workers: vec![idle],
            open_channel_endpoints: vec![port],
            retained_shared_buffers: vec![buffer],
            idle_threshold_ms: 100,
            snapshot: Snapshot::default(),
        }
    }

    #[test]
    fn short_is_one_line_with_per_kind_totals() {
        let text = render(&sample_report(), ReportFormat::Short);
        assert_eq!(
            text,
            "leaked resources: 2 workers (1 idle), 1 channel endpoint, 1 shared buffer (1024 bytes)"
        );
    }

    #[test]
    fn summary_lists_ids_per_category() {
        let text = render(&sample_report(), ReportFormat::Summary);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5, "{text}");
        assert_eq!(lines[1], "  workers not terminated (1): Worker#1");
        assert_eq!(
            lines[2],
            "  idle workers (1): Worker#3 (no activity for more than 100ms)"
        );
        assert_eq!(lines[3], "  channel endpoints not closed (1): ChannelEndpoint#2");
        assert_eq!(lines[4], "  shared buffers still referenced (1): SharedBuffer#4");
    }

    #[test]
    fn details_dumps_each_entry_in_registration_order() {
        let text = render(&sample_report(), ReportFormat::Details);
        let lines: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(
            lines,
            vec![
                "  Worker#1 \"echo\": alive, not terminated, age 1500ms, last activity 3ms ago",
                "  ChannelEndpoint#2: open, age 1500ms",
                "  Worker#3: alive, idle, age 1500ms, last activity 150ms ago",
                "  SharedBuffer#4: still referenced, age 1500ms, 1024 bytes",
            ]
        );
    }

    #[test]
    fn json_contains_the_structured_report() {
        let text = render(&sample_report(), ReportFormat::Json);
        assert!(text.starts_with('{'), "{text}");
        assert!(text.contains("\"idle_threshold_ms\":100"), "{text}");
    }

    #[test]
    fn single_worker_leak_names_the_count() {
        let report = LeakReport {
            running_workers: vec![entry(1, EntryStatus::Worker(WorkerStatus::Alive))],
            idle_workers: vec![],
            open_channel_endpoints: vec![],
            retained_shared_buffers: vec![],
            idle_threshold_ms: 5_000,
            snapshot: Snapshot::default(),
        };
        for format in [ReportFormat::Short, ReportFormat::Summary, ReportFormat::Details] {
            let text = render(&report, format);
            assert!(text.contains("1 worker"), "{format}: {text}");
        }
    }
}
