//! Mapping from external volume ids to LV names and mount paths.

use std::path::{Path, PathBuf};

use crate::lvm::{self, LvmError};

/// Maps an external volume id to the LV that backs it.
pub trait VolumeResolver: Send + Sync {
    fn resolve_name(&self, volume_id: &str) -> Result<String, LvmError>;
}

/// The volume id is the LV name.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl VolumeResolver for IdentityResolver {
    fn resolve_name(&self, volume_id: &str) -> Result<String, LvmError> {
        lvm::validate_name(volume_id)?;
        Ok(volume_id.to_string())
    }
}

/// Mount point of an LV: `<base>/<vg>/<lv>`.
pub fn mount_path_for(base_path: &Path, volume_group: &str, lv_name: &str) -> PathBuf {
    base_path.join(volume_group).join(lv_name)
}
