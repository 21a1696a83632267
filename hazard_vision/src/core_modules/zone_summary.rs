// THEORY:
// The reporting layer's view of one zone log: how many alerts of each level and
// which were the most recent. A linear scan over the records is all it takes at
// the volumes a single camera produces in a day.

use crate::core_modules::alert_record::AlertRecord;
use crate::core_modules::risk_model::RiskLevel;

/// How many trailing incidents a summary keeps.
pub const RECENT_INCIDENT_COUNT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// The last `RECENT_INCIDENT_COUNT` records, oldest first.
    pub recent: Vec<AlertRecord>,
}

impl ZoneSummary {
    pub fn from_records(records: &[AlertRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };
        for record in records {
            match record.level {
                RiskLevel::High => summary.high += 1,
                RiskLevel::Medium => summary.medium += 1,
                RiskLevel::Low => summary.low += 1,
            }
        }
        let start = records.len().saturating_sub(RECENT_INCIDENT_COUNT);
        summary.recent = records[start..].to_vec();
        summary
    }
}
