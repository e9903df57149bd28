//! Configuration for the volume manager and the LVM tools it drives.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lvm::validate_name;

/// Default root under which volumes are mounted (`<base>/<vg>/<lv>`)
pub const DEFAULT_BASE_PATH: &str = "/volumes";

/// Default filesystem created on new volumes
pub const DEFAULT_FS_TYPE: &str = "ext4";

/// Filesystems that can be created and mounted
pub const SUPPORTED_FS_TYPES: &[&str] = &["ext4", "xfs"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("volume group: {0}")]
    VolumeGroup(String),

    #[error("thin pool: {0}")]
    ThinPool(String),

    #[error("unsupported filesystem type {0:?} (supported: {supported})", supported = SUPPORTED_FS_TYPES.join(", "))]
    FsType(String),

    #[error("base path {0:?} must be absolute")]
    BasePath(PathBuf),

    #[error("base path {0:?} is not valid UTF-8")]
    BasePathEncoding(PathBuf),
}

/// Locations of the external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Binaries {
    pub lvs: PathBuf,
    pub lvcreate: PathBuf,
    pub lvremove: PathBuf,
    pub mount: PathBuf,
    pub umount: PathBuf,
    /// Directory holding `mkfs.<fstype>`
    pub mkfs_dir: PathBuf,
}

impl Default for Binaries {
    fn default() -> Self {
        Self {
            lvs: PathBuf::from("/sbin/lvs"),
            lvcreate: PathBuf::from("/sbin/lvcreate"),
            lvremove: PathBuf::from("/sbin/lvremove"),
            mount: PathBuf::from("/bin/mount"),
            umount: PathBuf::from("/bin/umount"),
            mkfs_dir: PathBuf::from("/sbin"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Volume group holding the thin pool
    pub volume_group: String,
    /// Thin pool LV volumes are carved from. Must already exist.
    pub thin_pool: String,
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
    #[serde(default = "default_fs_type")]
    pub fs_type: String,
    #[serde(default)]
    pub binaries: Binaries,
}

fn default_base_path() -> PathBuf {
    PathBuf::from(DEFAULT_BASE_PATH)
}

fn default_fs_type() -> String {
    DEFAULT_FS_TYPE.to_string()
}

impl ManagerConfig {
    pub fn new(volume_group: impl Into<String>, thin_pool: impl Into<String>) -> Self {
        Self {
            volume_group: volume_group.into(),
            thin_pool: thin_pool.into(),
            base_path: default_base_path(),
            fs_type: default_fs_type(),
            binaries: Binaries::default(),
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_fs_type(mut self, fs_type: impl Into<String>) -> Self {
        self.fs_type = fs_type.into().to_lowercase();
        self
    }

    pub fn with_binaries(mut self, binaries: Binaries) -> Self {
        self.binaries = binaries;
        self
    }

    /// Path of the mkfs tool for the configured filesystem.
    pub fn mkfs_binary(&self) -> PathBuf {
        self.binaries.mkfs_dir.join(format!("mkfs.{}", self.fs_type))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_name(&self.volume_group).map_err(|e| ConfigError::VolumeGroup(e.to_string()))?;
        validate_name(&self.thin_pool).map_err(|e| ConfigError::ThinPool(e.to_string()))?;
        if !SUPPORTED_FS_TYPES.contains(&self.fs_type.as_str()) {
            return Err(ConfigError::FsType(self.fs_type.clone()));
        }
        if !self.base_path.is_absolute() {
            return Err(ConfigError::BasePath(self.base_path.clone()));
        }
        // Mount targets are handed to mount(8) as strings
        if self.base_path.to_str().is_none() {
            return Err(ConfigError::BasePathEncoding(self.base_path.clone()));
        }
        Ok(())
    }
}
