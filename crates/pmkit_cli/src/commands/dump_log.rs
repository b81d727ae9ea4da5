//! Dump log command implementation.

use pmkit_core::{Config, EntryHeader, PmStore, Scan};
use pmkit_region::Region;
use serde::Serialize;
use std::path::Path;

/// Log header representation for output.
#[derive(Debug, Serialize)]
pub struct HeaderInfo {
    /// Offset within the log area.
    pub offset: usize,
    /// Header state (valid, retired, end).
    pub state: &'static str,
    /// Payload size in bytes.
    pub size: usize,
}

/// Runs the dump-log command.
///
/// Headers are read straight from the log area, so a log that fails
/// recovery can still be dumped.
pub fn run(
    path: &Path,
    config: Config,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = PmStore::open(path, config)?;
    let headers = read_headers(&store.region().bytes()[store.naming_len()..], limit);
    store.close()?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&headers)?);
        }
        _ => {
            print_text_output(&headers);
        }
    }

    Ok(())
}

fn read_headers(log_area: &[u8], limit: Option<usize>) -> Vec<HeaderInfo> {
    Scan::new(log_area)
        .take(limit.unwrap_or(usize::MAX))
        .map(|(entry, header)| HeaderInfo {
            offset: entry.offset(),
            state: match header {
                EntryHeader::Valid(_) => "valid",
                EntryHeader::Invalidated(_) => "retired",
                EntryHeader::End => "end",
            },
            size: header.skip(),
        })
        .collect()
}

fn print_text_output(headers: &[HeaderInfo]) {
    println!("{:>12}  {:<8}  {:>10}", "OFFSET", "STATE", "SIZE");
    for header in headers {
        println!(
            "{:>12}  {:<8}  {:>10}",
            header.offset, header.state, header.size
        );
    }
    if !headers.iter().any(|h| h.state == "end") {
        println!("(no end sentinel reached)");
    }
}
