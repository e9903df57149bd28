pub mod error;
pub mod handle;
pub mod locks;
pub mod manager;
pub mod resolver;
pub mod stats;

pub use error::{ErrorKind, Operation, Result, VolumeError};
pub use handle::VolumeHandle;
pub use locks::{VolumeLockGuard, VolumeLocks};
pub use manager::VolumeManager;
pub use resolver::{IdentityResolver, VolumeResolver, mount_path_for};
pub use stats::{FilesystemStats, FsStats, StatvfsStats};
