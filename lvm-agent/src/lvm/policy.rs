//! Exit-code/stderr patterns that mark a failed command as an expected state.
//!
//! LVM and util-linux only report these conditions as free text, so all of the
//! matching lives in this table. Adjust it here when tool output changes.

use std::fmt;

use super::command::CommandOutput;

/// Backend operations issued by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    Query,
    Create,
    Format,
    Mount,
    Unmount,
    Remove,
}

impl BackendOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendOp::Query => "query",
            BackendOp::Create => "create",
            BackendOp::Format => "format",
            BackendOp::Mount => "mount",
            BackendOp::Unmount => "unmount",
            BackendOp::Remove => "remove",
        }
    }
}

impl fmt::Display for BackendOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenignCondition {
    /// `lvs` was asked for a specific LV that does not exist
    VolumeNotFound,
    /// The target path already has the device mounted
    AlreadyMounted,
    /// Nothing is mounted at the target path
    NotMounted,
}

#[derive(Debug)]
pub struct BenignRule {
    pub op: BackendOp,
    pub exit_code: i32,
    /// Matches if stderr contains any of these
    pub stderr_contains: &'static [&'static str],
    /// Only applies when the command named a specific volume
    pub requires_name_filter: bool,
    pub condition: BenignCondition,
}

impl BenignRule {
    fn matches(&self, op: BackendOp, output: &CommandOutput, name_filter: bool) -> bool {
        self.op == op
            && output.code == Some(self.exit_code)
            && (name_filter || !self.requires_name_filter)
            && self
                .stderr_contains
                .iter()
                .any(|needle| output.stderr.contains(needle))
    }
}

pub const BENIGN_RULES: &[BenignRule] = &[
    // Without a filter, lvs lists everything and an empty pool is simply an
    // empty report, so "not found" only means something for a named query.
    BenignRule {
        op: BackendOp::Query,
        exit_code: 5,
        stderr_contains: &["Failed to find logical volume", "volume not found"],
        requires_name_filter: true,
        condition: BenignCondition::VolumeNotFound,
    },
    BenignRule {
        op: BackendOp::Mount,
        exit_code: 32,
        stderr_contains: &["already mounted"],
        requires_name_filter: false,
        condition: BenignCondition::AlreadyMounted,
    },
    // util-linux reports a missing mount point the same way as a directory
    // with nothing mounted on it.
    BenignRule {
        op: BackendOp::Unmount,
        exit_code: 32,
        stderr_contains: &["not mounted", "no mount point specified"],
        requires_name_filter: false,
        condition: BenignCondition::NotMounted,
    },
];

/// Classify a failed command. `None` means the failure is a real error.
pub fn classify(op: BackendOp, output: &CommandOutput, name_filter: bool) -> Option<BenignCondition> {
    if output.success() {
        return None;
    }
    BENIGN_RULES
        .iter()
        .find(|rule| rule.matches(op, output, name_filter))
        .map(|rule| rule.condition)
}
