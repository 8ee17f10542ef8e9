//! Mapping between cache keys and on-disk locations
//!
//! The two endpoint-list keys live directly under the root. All other keys
//! are opaque hash strings sharded on their first four characters so that
//! no directory grows too large:
//!
//! ```text
//! root/deviceatlas_servers_cache_auto.dat
//! root/3f/a2/9c0d7e....dat
//! ```

use crate::error::{CacheError, CacheResult};
use std::path::{Path, PathBuf};

/// Key of the latency-ranked endpoint list
pub const AUTO_RANKED_KEY: &str = "deviceatlas_servers_cache_auto";

/// Key of the failover-rotated endpoint list
pub const MANUAL_RANKED_KEY: &str = "deviceatlas_servers_cache_manual";

/// Extension shared by every entry file
pub const ENTRY_EXTENSION: &str = "dat";

const SHARD_WIDTH: usize = 2;
const MIN_SHARDED_LEN: usize = SHARD_WIDTH * 2 + 1;

/// Whether `key` is one of the unsharded endpoint-list keys
pub fn is_reserved(key: &str) -> bool {
    key == AUTO_RANKED_KEY || key == MANUAL_RANKED_KEY
}

/// Check that `key` can be stored as a file
pub fn validate(key: &str) -> CacheResult<()> {
    if is_reserved(key) {
        return Ok(());
    }
    if key.len() < MIN_SHARDED_LEN {
        return Err(CacheError::InvalidKey(format!(
            "{key:?} is shorter than {MIN_SHARDED_LEN} characters"
        )));
    }
    if !key
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(CacheError::InvalidKey(format!(
            "{key:?} contains characters outside [A-Za-z0-9_-]"
        )));
    }
    Ok(())
}

/// Path of the file that stores `key`
pub fn key_to_path(root: &Path, key: &str) -> CacheResult<PathBuf> {
    validate(key)?;

    if is_reserved(key) {
        return Ok(root.join(format!("{key}.{ENTRY_EXTENSION}")));
    }

    let (first, rest) = key.split_at(SHARD_WIDTH);
    let (second, name) = rest.split_at(SHARD_WIDTH);
    Ok(root
        .join(first)
        .join(second)
        .join(format!("{name}.{ENTRY_EXTENSION}")))
}

/// Recover the key stored at `path`, if it is an entry file under `root`
pub fn path_to_key(root: &Path, path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
        return None;
    }

    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .iter()
        .map(|c| c.to_str())
        .collect::<Option<Vec<_>>>()?;

    let key = match parts.as_slice() {
        [file] => file.strip_suffix(".dat")?.to_string(),
        [first, second, file] => {
            format!("{first}{second}{}", file.strip_suffix(".dat")?)
        }
        _ => return None,
    };

    validate(&key).ok()?;
    // A sharded key must map back to the same location
    (key_to_path(root, &key).ok()?.as_path() == path).then_some(key)
}
