//! Thin LVM Volume Agent Library
//!
//! Manages the lifecycle of thin-provisioned LVM volumes on a single host for
//! a volume provisioning plugin: create, locate, mount and destroy volumes by
//! id, and report their size, tags and filesystem usage.
//!
//! The library is split into several modules:
//! - `lvm`: LVM command adapter, `lvs` report parsing and failure classification
//! - `volume`: volume lifecycle manager, id resolution and per-volume locking
//! - `config`: manager configuration
//! - `metrics`: operation metrics

pub mod config;
pub mod lvm;
pub mod metrics;
pub mod volume;

pub use config::ManagerConfig;
pub use lvm::{LogicalVolume, LvmBackend, LvmCommands, LvmError, TagSet};
pub use volume::{FsStats, VolumeError, VolumeHandle, VolumeManager};
