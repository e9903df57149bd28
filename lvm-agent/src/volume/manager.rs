//! Volume lifecycle: create, locate, mount and destroy thin volumes.
//!
//! Nothing about a volume is cached here. Every call re-queries `lvs` and
//! re-issues the mount, so the host mount table and LVM metadata remain the
//! only source of truth even when they change behind this process.
//!
//! Observed lifecycle of one LV:
//!
//! ```text
//! ABSENT --create--> CREATED --mount--> MOUNTED --unmount--> CREATED --remove--> ABSENT
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{Operation, Result, VolumeError};
use super::handle::VolumeHandle;
use super::locks::VolumeLocks;
use super::resolver::{IdentityResolver, VolumeResolver, mount_path_for};
use super::stats::{FilesystemStats, FsStats, StatvfsStats};
use crate::config::ManagerConfig;
use crate::lvm::{
    LogicalVolume, LvmBackend, LvmCommands, MountOutcome, TagSet, UnmountOutcome, validate_name,
};
use crate::metrics::{self, OperationTimer};

pub struct VolumeManager {
    volume_group: String,
    thin_pool: String,
    base_path: PathBuf,
    backend: Arc<dyn LvmBackend>,
    resolver: Arc<dyn VolumeResolver>,
    stats: Arc<dyn FilesystemStats>,
    locks: VolumeLocks,
}

impl VolumeManager {
    /// Manager driving the real LVM tools.
    pub fn new(config: &ManagerConfig) -> Self {
        Self::with_backend(config, Arc::new(LvmCommands::new(config)))
    }

    pub fn with_backend(config: &ManagerConfig, backend: Arc<dyn LvmBackend>) -> Self {
        info!(
            volume_group = %config.volume_group,
            thin_pool = %config.thin_pool,
            base_path = %config.base_path.display(),
            "Initializing volume manager"
        );
        Self {
            volume_group: config.volume_group.clone(),
            thin_pool: config.thin_pool.clone(),
            base_path: config.base_path.clone(),
            backend,
            resolver: Arc::new(IdentityResolver),
            stats: Arc::new(StatvfsStats),
            locks: VolumeLocks::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn VolumeResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_stats(mut self, stats: Arc<dyn FilesystemStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn volume_group(&self) -> &str {
        &self.volume_group
    }

    /// Mount point for an LV of this manager's volume group.
    pub fn mount_path(&self, lv_name: &str) -> PathBuf {
        mount_path_for(&self.base_path, &self.volume_group, lv_name)
    }

    /// Locate a volume by external id and make sure it is mounted.
    ///
    /// `Ok(None)` means the volume does not exist; callers use this to
    /// implement create-or-reuse.
    #[instrument(skip(self, cancel))]
    pub async fn find_by_id(
        &self,
        volume_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<VolumeHandle>> {
        let timer = OperationTimer::new("find");
        let result = self.find_by_id_inner(volume_id, cancel).await;
        timer.finish(&result, |e| e.kind().as_str());
        result
    }

    async fn find_by_id_inner(
        &self,
        volume_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<VolumeHandle>> {
        let lv_name = self.resolve(Operation::Find, volume_id)?;
        let _guard = self.locks.lock(&lv_name).await;
        self.find_locked(Operation::Find, &lv_name, cancel).await
    }

    /// Locate a volume by LV name and make sure it is mounted.
    #[instrument(skip(self, cancel))]
    pub async fn find_by_name(
        &self,
        lv_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<VolumeHandle>> {
        let timer = OperationTimer::new("find");
        let result: Result<Option<VolumeHandle>> = async {
            validate_name(lv_name).map_err(|e| VolumeError::backend(Operation::Find, lv_name, e))?;
            let _guard = self.locks.lock(lv_name).await;
            self.find_locked(Operation::Find, lv_name, cancel).await
        }
        .await;
        timer.finish(&result, |e| e.kind().as_str());
        result
    }

    /// Create, format and mount a thin volume.
    ///
    /// The returned handle carries size and tags as reported by LVM after
    /// creation, not as requested.
    #[instrument(skip(self, tags, cancel))]
    pub async fn create(
        &self,
        lv_name: &str,
        size: &str,
        tags: &TagSet,
        cancel: &CancellationToken,
    ) -> Result<VolumeHandle> {
        let timer = OperationTimer::new("create");
        let result = self.create_inner(lv_name, size, tags, cancel).await;
        timer.finish(&result, |e| e.kind().as_str());
        result
    }

    async fn create_inner(
        &self,
        lv_name: &str,
        size: &str,
        tags: &TagSet,
        cancel: &CancellationToken,
    ) -> Result<VolumeHandle> {
        validate_name(lv_name).map_err(|e| VolumeError::backend(Operation::Create, lv_name, e))?;
        let _guard = self.locks.lock(lv_name).await;

        self.backend
            .create(lv_name, size, tags, cancel)
            .await
            .map_err(|e| VolumeError::backend(Operation::Create, lv_name, e))?;

        if let Err(e) = self.backend.format(lv_name, cancel).await {
            self.rollback_create(lv_name, cancel).await;
            return Err(VolumeError::backend(Operation::Create, lv_name, e));
        }

        match self.find_locked(Operation::Create, lv_name, cancel).await? {
            Some(handle) => {
                info!(volume = %lv_name, size_bytes = handle.size_bytes(), path = %handle.path().display(), "Volume created");
                Ok(handle)
            }
            None => {
                warn!(volume = %lv_name, "Created volume not found by lvs");
                Err(VolumeError::Inconsistent {
                    volume: lv_name.to_string(),
                })
            }
        }
    }

    /// Remove an LV whose format failed, so a retried create is not blocked
    /// by the half-built volume. Skipped once the caller has cancelled.
    async fn rollback_create(&self, lv_name: &str, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            warn!(volume = %lv_name, "Format cancelled, leaving unformatted volume in place");
            return;
        }
        match self.backend.remove(lv_name, cancel).await {
            Ok(()) => info!(volume = %lv_name, "Removed unformatted volume after format failure"),
            Err(e) => {
                warn!(volume = %lv_name, error = %e, "Failed to remove unformatted volume after format failure")
            }
        }
    }

    /// Unmount and remove a volume, in that order.
    ///
    /// A mount that has already gone away (reboot, external unmount, an
    /// earlier attempt that stopped before remove) counts as unmounted.
    #[instrument(skip(self, handle, cancel), fields(volume = %handle.name()))]
    pub async fn delete(&self, handle: &VolumeHandle, cancel: &CancellationToken) -> Result<()> {
        let timer = OperationTimer::new("delete");
        let result: Result<()> = async {
            let _guard = self.locks.lock(handle.name()).await;
            self.delete_locked(handle.name(), handle.path(), cancel).await
        }
        .await;
        timer.finish(&result, |e| e.kind().as_str());
        result
    }

    /// Delete a volume by external id.
    ///
    /// The volume is not mounted first, so an LV that cannot be mounted (a
    /// failed or interrupted format) can still be removed. Returns
    /// `Ok(false)` if the volume did not exist, so retried deletes succeed.
    #[instrument(skip(self, cancel))]
    pub async fn delete_by_id(&self, volume_id: &str, cancel: &CancellationToken) -> Result<bool> {
        let timer = OperationTimer::new("delete");
        let result = self.delete_by_id_inner(volume_id, cancel).await;
        timer.finish(&result, |e| e.kind().as_str());
        result
    }

    async fn delete_by_id_inner(&self, volume_id: &str, cancel: &CancellationToken) -> Result<bool> {
        let lv_name = self.resolve(Operation::Delete, volume_id)?;
        let _guard = self.locks.lock(&lv_name).await;

        match self.query_one(Operation::Delete, &lv_name, cancel).await? {
            Some(volume) => {
                let path = self.mount_path(&volume.name);
                self.delete_locked(&volume.name, &path, cancel).await?;
                Ok(true)
            }
            None => {
                info!(volume = %lv_name, "Volume already deleted (idempotent)");
                Ok(false)
            }
        }
    }

    async fn delete_locked(&self, name: &str, path: &Path, cancel: &CancellationToken) -> Result<()> {
        info!(volume = %name, path = %path.display(), "Deleting volume");

        // The device must be released before lvremove.
        let outcome = self
            .backend
            .unmount(path, cancel)
            .await
            .map_err(|e| VolumeError::backend(Operation::Delete, name, e))?;
        if outcome == UnmountOutcome::NotMounted {
            debug!(volume = %name, "Volume was not mounted");
        }

        self.backend
            .remove(name, cancel)
            .await
            .map_err(|e| VolumeError::backend(Operation::Delete, name, e))?;

        if let Err(e) = tokio::fs::remove_dir(path).await {
            debug!(path = %path.display(), error = %e, "Mount directory not removed");
        }

        info!(volume = %name, "Volume deleted");
        Ok(())
    }

    /// All LVs in the volume group except the thin pool. Nothing is mounted.
    #[instrument(skip(self, cancel))]
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<LogicalVolume>> {
        let timer = OperationTimer::new("list");
        let result = self
            .backend
            .query(None, cancel)
            .await
            .map(|volumes| {
                volumes
                    .into_iter()
                    .filter(|lv| lv.name != self.thin_pool)
                    .collect::<Vec<_>>()
            })
            .map_err(|e| VolumeError::backend(Operation::List, &self.volume_group, e));
        timer.finish(&result, |e| e.kind().as_str());

        let volumes = result?;
        metrics::set_volumes_count(volumes.len());
        debug!(count = volumes.len(), "Listed volumes");
        Ok(volumes)
    }

    /// Space available on the volume's mounted filesystem.
    ///
    /// A failure only means statistics could not be read, not that the
    /// volume is unhealthy.
    pub fn filesystem_stats(&self, handle: &VolumeHandle) -> Result<FsStats> {
        let timer = OperationTimer::new("stats");
        let result = self
            .stats
            .stat_filesystem(handle.path())
            .map_err(|source| VolumeError::StatsUnavailable {
                volume: handle.name().to_string(),
                path: handle.path().to_path_buf(),
                source,
            });
        timer.finish(&result, |e| e.kind().as_str());
        result
    }

    /// Check that the configured thin pool exists.
    #[instrument(skip(self, cancel))]
    pub async fn verify_thin_pool(&self, cancel: &CancellationToken) -> Result<()> {
        let timer = OperationTimer::new("check_pool");
        let result = self.verify_thin_pool_inner(cancel).await;
        timer.finish(&result, |e| e.kind().as_str());
        result
    }

    async fn verify_thin_pool_inner(&self, cancel: &CancellationToken) -> Result<()> {
        let found = self
            .backend
            .query(Some(&self.thin_pool), cancel)
            .await
            .map_err(|e| VolumeError::backend(Operation::CheckPool, &self.thin_pool, e))?;

        if found.is_empty() {
            warn!(volume_group = %self.volume_group, pool = %self.thin_pool, "Thin pool not found");
            return Err(VolumeError::PoolNotFound {
                volume_group: self.volume_group.clone(),
                pool: self.thin_pool.clone(),
            });
        }

        info!(volume_group = %self.volume_group, pool = %self.thin_pool, "Thin pool present");
        Ok(())
    }

    fn resolve(&self, operation: Operation, volume_id: &str) -> Result<String> {
        self.resolver
            .resolve_name(volume_id)
            .map_err(|e| VolumeError::backend(operation, volume_id, e))
    }

    /// Query one LV by name. More than one record is an error.
    async fn query_one(
        &self,
        operation: Operation,
        lv_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<LogicalVolume>> {
        let mut found = self
            .backend
            .query(Some(lv_name), cancel)
            .await
            .map_err(|e| VolumeError::backend(operation, lv_name, e))?;

        if found.len() > 1 {
            return Err(VolumeError::DuplicateVolume {
                operation,
                volume: lv_name.to_string(),
                count: found.len(),
            });
        }
        if found.is_empty() {
            debug!(volume = %lv_name, "Volume not found");
        }
        Ok(found.pop())
    }

    /// Query one LV and ensure its mount. Caller holds the volume lock.
    async fn find_locked(
        &self,
        operation: Operation,
        lv_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<VolumeHandle>> {
        let Some(volume) = self.query_one(operation, lv_name, cancel).await? else {
            return Ok(None);
        };

        let path = self.mount_path(&volume.name);
        let outcome = self
            .backend
            .mount(&volume.name, &path, cancel)
            .await
            .map_err(|e| VolumeError::backend(operation, lv_name, e))?;
        if outcome == MountOutcome::AlreadyMounted {
            debug!(volume = %lv_name, "Mount already in place");
        }

        Ok(Some(VolumeHandle::new(path, volume)))
    }
}
