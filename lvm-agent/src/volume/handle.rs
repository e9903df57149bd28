use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::lvm::{LogicalVolume, TagSet};

/// A located, mounted volume.
///
/// Built fresh on every lookup and never cached: the record is a snapshot of
/// the `lvs` report at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeHandle {
    path: PathBuf,
    #[serde(flatten)]
    volume: LogicalVolume,
}

impl VolumeHandle {
    pub fn new(path: PathBuf, volume: LogicalVolume) -> Self {
        Self { path, volume }
    }

    /// Host path the volume is mounted at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.volume.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.volume.size_bytes
    }

    pub fn tags(&self) -> &TagSet {
        &self.volume.tags
    }

    pub fn find_tag(&self, key: &str) -> Option<&str> {
        self.volume.find_tag(key)
    }

    pub fn volume(&self) -> &LogicalVolume {
        &self.volume
    }
}
