//! Naming commands: list, retrieve, register and deregister.

use pmkit_core::{Config, PmAddr, PmStore};
use serde::Serialize;
use std::path::Path;

/// One registered name.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct NameInfo {
    /// Seed id.
    pub id: String,
    /// Registered address, hex-encoded.
    pub addr: String,
}

/// Parses an address given in decimal or as `0x`-prefixed hex.
pub fn parse_addr(value: &str) -> Result<PmAddr, String> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed
        .map(PmAddr::new)
        .map_err(|err| format!("invalid address {value:?}: {err}"))
}

/// Runs the names command.
pub fn list(path: &Path, config: Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = PmStore::open(path, config)?;
    let names = collect_names(&store);
    store.close()?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&names)?);
        }
        _ => {
            for name in &names {
                println!("{:<40} {}", name.id, name.addr);
            }
            println!("{} name(s)", names.len());
        }
    }
    Ok(())
}

fn collect_names(store: &PmStore) -> Vec<NameInfo> {
    let mut names: Vec<_> = store
        .names()
        .map(|(id, addr)| NameInfo {
            id,
            addr: addr.to_string(),
        })
        .collect();
    names.sort_by(|a, b| a.id.cmp(&b.id));
    names
}

/// Runs the retrieve command.
pub fn retrieve(path: &Path, config: Config, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = PmStore::open(path, config)?;
    let found = store.retrieve(id);
    store.close()?;

    match found {
        Some(addr) => println!("{addr}"),
        None => return Err(format!("{id:?} is not registered").into()),
    }
    Ok(())
}

/// Runs the register command.
pub fn register(
    path: &Path,
    config: Config,
    id: &str,
    addr: PmAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = PmStore::open(path, config)?;
    let result = store.register(id, addr)?;
    store.close()?;

    match result {
        Some(previous) if previous != addr => println!("{id}: {previous} -> {addr}"),
        Some(_) => println!("{id}: {addr}"),
        None => {
            return Err(format!("cannot register {id:?}: id too long or naming area full").into())
        }
    }
    Ok(())
}

/// Runs the deregister command.
pub fn deregister(path: &Path, config: Config, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = PmStore::open(path, config)?;
    let removed = store.deregister(id)?;
    store.close()?;

    match removed {
        Some(addr) => println!("{id}: removed {addr}"),
        None => return Err(format!("{id:?} is not registered").into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmkit_region::RegionSize;
    use tempfile::tempdir;

    #[test]
    fn parse_addresses() {
        assert_eq!(parse_addr("0xcafe"), Ok(PmAddr::new(0xcafe)));
        assert_eq!(parse_addr("0XC0FFEE"), Ok(PmAddr::new(0xc0ffee)));
        assert_eq!(parse_addr("4096"), Ok(PmAddr::new(4096)));
        assert!(parse_addr("0xzz").is_err());
        assert!(parse_addr("-1").is_err());
    }

    #[test]
    fn naming_commands_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("region.pm");
        let config = Config::default()
            .region_size(RegionSize::Exact(16 * 1024))
            .naming_bytes(4096);
        PmStore::open(&path, config.clone()).unwrap().close().unwrap();

        let existing = config.region_size(RegionSize::WholeFile).create_if_missing(false);
        register(&path, existing.clone(), "Seed", PmAddr::new(0xcafe)).unwrap();
        register(&path, existing.clone(), "Other", PmAddr::new(1)).unwrap();
        retrieve(&path, existing.clone(), "Seed").unwrap();

        let store = PmStore::open(&path, existing.clone()).unwrap();
        let names = collect_names(&store);
        store.close().unwrap();
        assert_eq!(
            names,
            vec![
                NameInfo {
                    id: "Other".into(),
                    addr: "0x1".into()
                },
                NameInfo {
                    id: "Seed".into(),
                    addr: "0xcafe".into()
                },
            ]
        );

        deregister(&path, existing.clone(), "Seed").unwrap();
        assert!(retrieve(&path, existing.clone(), "Seed").is_err());
        assert!(deregister(&path, existing, "Seed").is_err());
    }
}
