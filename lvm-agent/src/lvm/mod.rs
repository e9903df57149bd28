pub mod adapter;
pub mod command;
pub mod error;
pub mod policy;
pub mod report;
pub mod size;
pub mod tags;

pub use adapter::{
    LvmBackend, LvmCommands, MountOutcome, UnmountOutcome, device_path, validate_name,
};
pub use command::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
pub use error::{LvmError, ReportError, Result, SizeFormatError};
pub use policy::{BackendOp, BenignCondition};
pub use report::{LogicalVolume, parse_report};
pub use size::{parse_size, size_spec_from_bytes};
pub use tags::TagSet;
