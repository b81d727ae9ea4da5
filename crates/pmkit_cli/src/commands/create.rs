//! Create command implementation.

use pmkit_core::{Config, PmStore};
use std::path::Path;

/// Runs the create command.
pub fn run(path: &Path, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!("{} already exists", path.display()).into());
    }

    let store = PmStore::open(path, config)?;
    println!(
        "Created {} ({} bytes, naming area {} bytes, log area {} bytes)",
        path.display(),
        store.naming_len() + store.log_len(),
        store.naming_len(),
        store.log_len()
    );
    store.close()?;
    Ok(())
}
