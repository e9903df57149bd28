use std::path::Path;

use nix::sys::statvfs::statvfs;
use serde::Serialize;

/// Space on a mounted filesystem, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FsStats {
    pub bytes_available: u64,
    pub bytes_capacity: u64,
}

/// Source of filesystem statistics for a mount path.
pub trait FilesystemStats: Send + Sync {
    fn stat_filesystem(&self, path: &Path) -> std::io::Result<FsStats>;
}

/// Reads statistics with `statvfs(3)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatvfsStats;

impl FilesystemStats for StatvfsStats {
    fn stat_filesystem(&self, path: &Path) -> std::io::Result<FsStats> {
        let stat = statvfs(path)?;
        let fragment = stat.fragment_size() as u64;
        Ok(FsStats {
            bytes_available: stat.blocks_available() as u64 * fragment,
            bytes_capacity: stat.blocks() as u64 * fragment,
        })
    }
}
