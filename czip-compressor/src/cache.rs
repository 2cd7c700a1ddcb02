//! Persistent cache of the contract's stored-index tables.
//!
//! One JSON document per chain, keyed by hex-encoded raw values so the
//! files stay inspectable. The built-in selector table never hits the
//! network and is not part of the file.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::buffer::Indexes;

/// On-disk form: hex keys, 1-based indexes.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(rename = "AddressIndexes", default)]
    address_indexes: HashMap<String, u32>,
    #[serde(rename = "Bytes32Indexes", default)]
    bytes32_indexes: HashMap<String, u32>,
}

/// Cache file location for a chain.
pub fn cache_path(dir: &Path, chain_id: u64) -> PathBuf {
    dir.join(format!("czip-indexes-{chain_id}.json"))
}

/// Loads cached indexes; a missing file is an empty cache.
pub fn load_cached_indexes(path: &Path) -> anyhow::Result<Indexes> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Indexes::default()),
        Err(e) => return Err(e.into()),
    };

    let file: CacheFile = serde_json::from_slice(&raw)?;

    let mut indexes = Indexes::default();
    for (key, index) in file.address_indexes {
        indexes.address_indexes.insert(hex::decode(&key)?, index);
    }
    for (key, index) in file.bytes32_indexes {
        indexes.bytes32_indexes.insert(hex::decode(&key)?, index);
    }

    Ok(indexes)
}

/// Persists the address and bytes32 tables.
pub fn save_cached_indexes(path: &Path, indexes: &Indexes) -> anyhow::Result<()> {
    let file = CacheFile {
        address_indexes: indexes
            .address_indexes
            .iter()
            .map(|(key, index)| (hex::encode(key), *index))
            .collect(),
        bytes32_indexes: indexes
            .bytes32_indexes
            .iter()
            .map(|(key, index)| (hex::encode(key), *index))
            .collect(),
    };

    fs::write(path, serde_json::to_vec(&file)?)?;
    Ok(())
}

/// Highest index present in a table; the resume point for fetching.
pub fn highest_index(map: &HashMap<Vec<u8>, u32>) -> u32 {
    map.values().copied().max().unwrap_or(0)
}
