use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::command::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
use super::error::{LvmError, Result};
use super::policy::{BackendOp, BenignCondition, classify};
use super::report::{LogicalVolume, parse_report};
use super::tags::TagSet;
use crate::config::{Binaries, ManagerConfig};

/// Validate that a name is safe for use as an LVM object name and a path
/// component. Follows the LVM rules: alphanumerics plus `.`, `_`, `-` and `+`,
/// never starting with `-`, and never `.` or `..`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LvmError::InvalidName("name cannot be empty".into()));
    }
    if name == "." || name == ".." {
        return Err(LvmError::InvalidName(format!("'{}' is reserved", name)));
    }
    if name.starts_with('-') {
        return Err(LvmError::InvalidName(format!(
            "name '{}' cannot start with a hyphen",
            name
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'))
    {
        return Err(LvmError::InvalidName(format!(
            "invalid characters in name '{}': only alphanumeric, '.', '_', '-' and '+' allowed",
            name
        )));
    }
    Ok(())
}

/// Block device of an LV: `/dev/<vg>/<lv>`.
pub fn device_path(volume_group: &str, lv_name: &str) -> PathBuf {
    Path::new("/dev").join(volume_group).join(lv_name)
}

/// Result of a mount request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    Mounted,
    /// The path already had the device mounted; left as is
    AlreadyMounted,
}

/// Result of an unmount request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmountOutcome {
    Unmounted,
    /// Nothing was mounted at the path
    NotMounted,
}

/// Path as a command argument. Mount targets are passed verbatim, so a path
/// that is not valid UTF-8 is rejected rather than rewritten.
fn path_arg(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| LvmError::NonUtf8Path(path.to_path_buf()))
}

/// Operations against the backing store.
///
/// Each call issues one external command. Benign failures listed in
/// [`super::policy::BENIGN_RULES`] come back as ordinary results, everything
/// else as an error carrying the command line and both output streams.
#[async_trait]
pub trait LvmBackend: Send + Sync {
    /// List LVs. With `name`, only that LV of the group; an unknown name
    /// yields an empty list.
    async fn query(
        &self,
        name: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<LogicalVolume>>;

    /// Create a thin LV of `size` (an lvcreate size string) in the pool.
    async fn create(
        &self,
        name: &str,
        size: &str,
        tags: &TagSet,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Create a filesystem on the LV, labeled with its name.
    async fn format(&self, name: &str, cancel: &CancellationToken) -> Result<()>;

    /// Create `target` and mount the LV there with shared propagation.
    async fn mount(
        &self,
        name: &str,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<MountOutcome>;

    /// Unmount `target`. A path with nothing mounted is not an error.
    async fn unmount(&self, target: &Path, cancel: &CancellationToken) -> Result<UnmountOutcome>;

    /// Remove the LV without prompting.
    async fn remove(&self, name: &str, cancel: &CancellationToken) -> Result<()>;
}

/// [`LvmBackend`] that shells out to the LVM and util-linux tools.
pub struct LvmCommands {
    volume_group: String,
    thin_pool: String,
    fs_type: String,
    mkfs: PathBuf,
    binaries: Binaries,
    runner: Arc<dyn CommandRunner>,
}

impl LvmCommands {
    pub fn new(config: &ManagerConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner))
    }

    pub fn with_runner(config: &ManagerConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            volume_group: config.volume_group.clone(),
            thin_pool: config.thin_pool.clone(),
            fs_type: config.fs_type.clone(),
            mkfs: config.mkfs_binary(),
            binaries: config.binaries.clone(),
            runner,
        }
    }

    fn qualified(&self, name: &str) -> String {
        format!("{}/{}", self.volume_group, name)
    }

    /// Run a command and apply the benign-condition table.
    ///
    /// Returns the output when the command succeeded, or the matched
    /// condition when it failed in an expected way.
    async fn execute(
        &self,
        op: BackendOp,
        invocation: &Invocation,
        name_filter: bool,
        cancel: &CancellationToken,
    ) -> Result<(CommandOutput, Option<BenignCondition>)> {
        let output = self.runner.run(invocation, cancel).await?;
        if output.success() {
            return Ok((output, None));
        }

        match classify(op, &output, name_filter) {
            Some(condition) => {
                debug!(command = %invocation, ?condition, stderr = %output.stderr.trim(), "Benign command failure");
                Ok((output, Some(condition)))
            }
            None => {
                let err = output.into_error(invocation);
                warn!(operation = %op, error = %err, "Command failed");
                Err(err)
            }
        }
    }
}

#[async_trait]
impl LvmBackend for LvmCommands {
    #[instrument(skip(self, cancel))]
    async fn query(
        &self,
        name: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<LogicalVolume>> {
        let target = match name {
            Some(name) => {
                validate_name(name)?;
                self.qualified(name)
            }
            None => self.volume_group.clone(),
        };

        let invocation = Invocation::new(&self.binaries.lvs)
            .args([
                "--reportformat=json",
                "--options=lv_tags,lv_name,lv_size",
                "--units=b",
            ])
            .arg(target);

        let (output, condition) = self
            .execute(BackendOp::Query, &invocation, name.is_some(), cancel)
            .await?;
        if condition == Some(BenignCondition::VolumeNotFound) {
            debug!(volume = ?name, "Logical volume not found");
            return Ok(Vec::new());
        }

        let volumes = parse_report(&output.stdout).map_err(|source| LvmError::MalformedOutput {
            command: invocation.to_string(),
            stdout: output.stdout.clone(),
            stderr: output.stderr.clone(),
            source,
        })?;

        debug!(count = volumes.len(), "Query complete");
        Ok(volumes)
    }

    #[instrument(skip(self, tags, cancel))]
    async fn create(
        &self,
        name: &str,
        size: &str,
        tags: &TagSet,
        cancel: &CancellationToken,
    ) -> Result<()> {
        validate_name(name)?;

        let invocation = Invocation::new(&self.binaries.lvcreate)
            .args(["--virtualsize", size, "--thinpool", self.thin_pool.as_str()])
            .arg(&self.volume_group)
            .args(["--thin", "--type", "thin", "--name", name])
            .args(tags.to_args());

        info!(volume = %self.qualified(name), size = %size, pool = %self.thin_pool, "Creating thin volume");
        self.execute(BackendOp::Create, &invocation, true, cancel)
            .await?;
        info!(volume = %self.qualified(name), "Thin volume created");
        Ok(())
    }

    #[instrument(skip(self, cancel))]
    async fn format(&self, name: &str, cancel: &CancellationToken) -> Result<()> {
        validate_name(name)?;

        let device = device_path(&self.volume_group, name);
        let invocation = Invocation::new(&self.mkfs)
            .args(["-L", name])
            .arg(device.display().to_string());

        info!(device = %device.display(), fs_type = %self.fs_type, "Formatting volume");
        self.execute(BackendOp::Format, &invocation, true, cancel)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, cancel))]
    async fn mount(
        &self,
        name: &str,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<MountOutcome> {
        validate_name(name)?;
        let target_arg = path_arg(target)?;

        tokio::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o777)
            .create(target)
            .await
            .map_err(|source| LvmError::MountDirectory {
                path: target.to_path_buf(),
                source,
            })?;

        let device = device_path(&self.volume_group, name);
        // --make-shared so the mount propagates out of this mount namespace
        let invocation = Invocation::new(&self.binaries.mount)
            .args(["--make-shared", "-t", self.fs_type.as_str()])
            .arg(device.display().to_string())
            .arg(target_arg);

        let (_, condition) = self
            .execute(BackendOp::Mount, &invocation, true, cancel)
            .await?;
        if condition == Some(BenignCondition::AlreadyMounted) {
            info!(target = %target.display(), "Volume was already mounted");
            return Ok(MountOutcome::AlreadyMounted);
        }

        info!(device = %device.display(), target = %target.display(), "Volume mounted");
        Ok(MountOutcome::Mounted)
    }

    #[instrument(skip(self, cancel))]
    async fn unmount(&self, target: &Path, cancel: &CancellationToken) -> Result<UnmountOutcome> {
        let invocation = Invocation::new(&self.binaries.umount).arg(path_arg(target)?);

        let (_, condition) = self
            .execute(BackendOp::Unmount, &invocation, true, cancel)
            .await?;
        if condition == Some(BenignCondition::NotMounted) {
            info!(target = %target.display(), "Volume was not mounted");
            return Ok(UnmountOutcome::NotMounted);
        }

        info!(target = %target.display(), "Volume unmounted");
        Ok(UnmountOutcome::Unmounted)
    }

    #[instrument(skip(self, cancel))]
    async fn remove(&self, name: &str, cancel: &CancellationToken) -> Result<()> {
        validate_name(name)?;

        let invocation = Invocation::new(&self.binaries.lvremove)
            .arg("--yes")
            .arg(self.qualified(name));

        self.execute(BackendOp::Remove, &invocation, true, cancel)
            .await?;
        info!(volume = %self.qualified(name), "Logical volume removed");
        Ok(())
    }
}
