//! Inspect command implementation.

use pmkit_core::{Config, EntryHeader, PmStore, HEADER_SIZE};
use pmkit_region::Region;
use serde::Serialize;
use std::path::Path;

/// Region inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Region file path.
    pub path: String,
    /// Total region size in bytes.
    pub size: usize,
    /// Naming area size in bytes.
    pub naming_size: usize,
    /// Log area size in bytes.
    pub log_size: usize,
    /// Registered names.
    pub seed_count: usize,
    /// Seed slots the naming area holds.
    pub seed_capacity: usize,
    /// Log statistics, absent if the log area does not hold a log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<LogStats>,
}

/// Statistics for the log area.
#[derive(Debug, Serialize)]
pub struct LogStats {
    /// Offset of the head entry within the log area.
    pub head: usize,
    /// Offset of the end sentinel within the log area.
    pub end: usize,
    /// Number of live entries.
    pub live_entries: usize,
    /// Number of retired entries still ahead of the head.
    pub retired_entries: usize,
    /// Bytes in use, end sentinel included.
    pub used_bytes: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path, config: Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = PmStore::open(path, config)?;
    let result = inspect(&mut store)?;
    store.close()?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn inspect(store: &mut PmStore) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let seed_count = store.names().count();
    let seed_capacity = store.naming_table()?.capacity();

    let log = match store.open_log() {
        Ok(log) => {
            let retired = log
                .scan()
                .filter(|(_, header)| matches!(header, EntryHeader::Invalidated(_)))
                .count();
            Some(LogStats {
                head: log.head().offset(),
                end: log.end().offset(),
                live_entries: log.entries().count(),
                retired_entries: retired,
                used_bytes: log.end().offset() + HEADER_SIZE,
            })
        }
        Err(err) => {
            tracing::warn!(error = %err, "log area does not hold a log");
            None
        }
    };

    Ok(InspectResult {
        path: store.path().display().to_string(),
        size: store.region().len(),
        naming_size: store.naming_len(),
        log_size: store.log_len(),
        seed_count,
        seed_capacity,
        log,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("pmkit Region Inspection");
    println!("=======================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Layout:");
    println!("  Region size:  {} bytes", format_size(result.size));
    println!("  Naming area:  {} bytes", format_size(result.naming_size));
    println!("  Log area:     {} bytes", format_size(result.log_size));
    println!();
    println!("Naming:");
    println!(
        "  Seeds: {} of {} slots",
        result.seed_count, result.seed_capacity
    );
    println!();
    match &result.log {
        Some(log) => {
            println!("Log:");
            println!("  Head:            {}", log.head);
            println!("  End:             {}", log.end);
            println!("  Live entries:    {}", log.live_entries);
            println!("  Retired entries: {}", log.retired_entries);
            println!("  Used:            {} bytes", format_size(log.used_bytes));
        }
        None => println!("Log: not recoverable"),
    }
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{}", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmkit_core::PmAddr;
    use pmkit_region::RegionSize;
    use tempfile::tempdir;

    #[test]
    fn inspect_reports_names_and_log() {
        let dir = tempdir().unwrap();
        let config = Config::default()
            .region_size(RegionSize::Exact(16 * 1024))
            .naming_bytes(4096);
        let mut store = PmStore::open(dir.path().join("region.pm"), config).unwrap();
        store.register("a", PmAddr::new(1)).unwrap();
        {
            let mut log = store.open_log().unwrap();
            log.append(10).unwrap();
            log.append(20).unwrap();
            log.truncate().unwrap();
        }

        let result = inspect(&mut store).unwrap();
        assert_eq!(result.size, 16 * 1024);
        assert_eq!(result.naming_size, 4096);
        assert_eq!(result.log_size, 12 * 1024);
        assert_eq!(result.seed_count, 1);
        let log = result.log.unwrap();
        assert_eq!(log.head, HEADER_SIZE + 10);
        assert_eq!(log.live_entries, 1);
        assert_eq!(log.retired_entries, 1);
        assert_eq!(log.used_bytes, 2 * HEADER_SIZE + 30 + HEADER_SIZE);
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
