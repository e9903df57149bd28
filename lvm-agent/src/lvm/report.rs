//! Decoding of `lvs --reportformat=json` output.

use serde::{Deserialize, Serialize};

use super::error::ReportError;
use super::size::parse_size;
use super::tags::TagSet;

#[derive(Debug, Deserialize)]
struct ReportWrapper {
    #[serde(default)]
    report: Vec<ReportSection>,
}

#[derive(Debug, Deserialize)]
struct ReportSection {
    #[serde(default)]
    lv: Vec<ReportLv>,
}

#[derive(Debug, Deserialize)]
struct ReportLv {
    lv_name: String,
    lv_size: String,
    #[serde(default)]
    lv_tags: String,
}

/// Snapshot of one logical volume as reported by `lvs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicalVolume {
    /// LV name, unique within the volume group
    pub name: String,
    /// Virtual size in bytes
    pub size_bytes: u64,
    pub tags: TagSet,
}

impl LogicalVolume {
    /// Value of the first `key=value` tag matching `key`.
    pub fn find_tag(&self, key: &str) -> Option<&str> {
        self.tags.find(key)
    }
}

/// Parse an `lvs` JSON report into records, in report order.
///
/// The document must contain exactly one report section. Anything else means
/// the output format drifted and is rejected instead of merged or truncated.
pub fn parse_report(raw: &str) -> Result<Vec<LogicalVolume>, ReportError> {
    let wrapper: ReportWrapper = serde_json::from_str(raw)?;

    if wrapper.report.len() != 1 {
        return Err(ReportError::SectionCount(wrapper.report.len()));
    }

    wrapper
        .report
        .into_iter()
        .flat_map(|section| section.lv)
        .map(|lv| -> Result<LogicalVolume, ReportError> {
            let size_bytes = parse_size(&lv.lv_size).map_err(|source| ReportError::Size {
                name: lv.lv_name.clone(),
                source,
            })?;
            Ok(LogicalVolume {
                tags: TagSet::from_report(&lv.lv_tags),
                name: lv.lv_name,
                size_bytes,
            })
        })
        .collect()
}
