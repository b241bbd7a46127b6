//! Parser for the Noriben timeline (`Noriben_*_timeline.csv`).
//!
//! Each row starts with `timestamp,category,operation`; the remaining columns
//! depend on the category:
//!
//! | Category | Columns after operation                                   |
//! |----------|-----------------------------------------------------------|
//! | Process  | process, pid, command line, child pid                     |
//! | File     | process, pid, path, hash type, hash, YARA hits, VT hits   |
//! | Registry | process, pid, key path, data                              |
//! | Network  | process, pid, remote address                              |
//!
//! For Network rows the operation column holds "protocol direction", e.g.
//! `TCP Send`.
//!
//! Quoted fields follow RFC 4180 and may span lines (a command line with an
//! embedded newline stays one event). A record whose quotes do not close within
//! a few lines is read as a single line instead of swallowing the rest of the
//! file.

use csv::ReaderBuilder;
use tracing::debug;

use super::types::{FileEvent, NetworkEvent, ProcessEvent, RegistryEvent, Timeline};

/// Rows shorter than this carry no usable event.
const MIN_COLUMNS: usize = 3;

/// Most physical lines one quoted field may span.
const MAX_RECORD_LINES: usize = 16;

/// Parse normalized timeline text (`\n` line endings, no BOM).
///
/// Records are split one at a time so a malformed one (for example an
/// unbalanced quote) only loses itself. A quoted field may contain line breaks
/// (a multi-line command line); such a record is joined across at most
/// [`MAX_RECORD_LINES`] lines, and if its quotes never balance the first line
/// is parsed on its own.
pub fn parse_timeline(text: &str) -> Timeline {
    let mut timeline = Timeline::default();
    let lines: Vec<&str> = text.lines().collect();

    let mut idx = 0;
    while idx < lines.len() {
        let line_no = idx + 1;
        let (record, consumed) = next_record(&lines[idx..]);
        idx += consumed;

        if record.trim().is_empty() {
            continue;
        }
        let Some(row) = split_row(&record) else {
            debug!("Skipping unreadable timeline line {}", line_no);
            continue;
        };
        if row.len() < MIN_COLUMNS {
            debug!("Skipping short timeline line {} ({} columns)", line_no, row.len());
            continue;
        }
        timeline.push_row(&row);
    }

    timeline
}

/// The record starting at `lines[0]` and the number of lines it spans.
fn next_record(lines: &[&str]) -> (String, usize) {
    let first = lines[0];
    if quotes_balanced(first) {
        return (first.to_string(), 1);
    }

    let mut joined = first.to_string();
    for (offset, line) in lines.iter().enumerate().skip(1).take(MAX_RECORD_LINES - 1) {
        joined.push('\n');
        joined.push_str(line);
        if quotes_balanced(&joined) {
            return (joined, offset + 1);
        }
    }
    (first.to_string(), 1)
}

/// An escaped quote (`""`) counts twice, so an open field leaves the count odd.
fn quotes_balanced(text: &str) -> bool {
    text.bytes().filter(|&b| b == b'"').count() % 2 == 0
}

/// Split one CSV record into fields.
fn split_row(record: &str) -> Option<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(record.as_bytes());
    let record = reader.records().next()?.ok()?;
    Some(record.iter().map(str::to_string).collect())
}

impl Timeline {
    fn push_row(&mut self, row: &[String]) {
        let row = Row(row);
        match row.get(1) {
            "Process" => self.process_activity.push(row.process_event()),
            "File" => self.file_system.push(row.file_event()),
            "Registry" => self.registry.push(row.registry_event()),
            "Network" => self.network.push(row.network_event()),
            _ => {}
        }
    }
}

/// Column accessor where missing trailing columns read as "".
struct Row<'a>(&'a [String]);

impl<'a> Row<'a> {
    fn get(&self, idx: usize) -> &'a str {
        self.0.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Column that is reported only when the row is long enough to have it.
    fn optional(&self, idx: usize) -> Option<String> {
        self.0.get(idx).cloned()
    }

    fn process_event(&self) -> ProcessEvent {
        ProcessEvent {
            timestamp: self.get(0).to_string(),
            process_name: self.get(3).to_string(),
            pid: self.get(4).to_string(),
            command_line: self.get(5).to_string(),
            child_pid: self.get(6).to_string(),
        }
    }

    fn file_event(&self) -> FileEvent {
        let operation = self.get(2);
        let is_rename = operation == "RenameFile";
        FileEvent {
            timestamp: self.get(0).to_string(),
            operation: operation.to_string(),
            process_name: self.get(3).to_string(),
            pid: self.get(4).to_string(),
            path: self.get(5).to_string(),
            // A rename carries its destination where other rows carry the hash
            // type; the column is reported under both names
            hash_type: self.optional(6),
            hash: self.optional(7),
            yara_hits: self.optional(8),
            vt_hits: self.optional(9),
            to_path: if is_rename { self.optional(6) } else { None },
        }
    }

    fn registry_event(&self) -> RegistryEvent {
        RegistryEvent {
            timestamp: self.get(0).to_string(),
            operation: self.get(2).to_string(),
            process_name: self.get(3).to_string(),
            pid: self.get(4).to_string(),
            path: self.get(5).to_string(),
            data: self.get(6).to_string(),
        }
    }

    fn network_event(&self) -> NetworkEvent {
        let (protocol, direction) = split_protocol(self.get(2));
        NetworkEvent {
            timestamp: self.get(0).to_string(),
            protocol,
            direction,
            process_name: self.get(3).to_string(),
            pid: self.get(4).to_string(),
            remote_addr: self.get(5).to_string(),
        }
    }
}

/// Split "TCP Send" into ("TCP", "Send"); direction is "Unknown" without a space.
fn split_protocol(operation: &str) -> (String, String) {
    match operation.split_once(' ') {
        Some((protocol, direction)) => (protocol.to_string(), direction.to_string()),
        None => (operation.to_string(), "Unknown".to_string()),
    }
}
