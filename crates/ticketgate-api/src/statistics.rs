//! Time-in-state results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ticketgate_util::{IssueKey, format_duration};

/// Elapsed time spent in one state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDuration {
    pub state: String,
    pub seconds: u64,
}

/// Cumulative whole seconds per state label for one record.
///
/// States are kept in order of first appearance in the record's timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationTally {
    entries: Vec<StateDuration>,
}

impl DurationTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add seconds to a state, creating its entry at zero on first sight
    pub fn add(&mut self, state: &str, seconds: u64) {
        match self.entries.iter_mut().find(|e| e.state == state) {
            Some(entry) => entry.seconds = entry.seconds.saturating_add(seconds),
            None => self.entries.push(StateDuration {
                state: state.to_string(),
                seconds,
            }),
        }
    }

    pub fn get(&self, state: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.state == state)
            .map(|e| e.seconds)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateDuration> {
        self.entries.iter()
    }

    /// Sum over all states
    pub fn total_seconds(&self) -> u64 {
        self.entries.iter().map(|e| e.seconds).sum()
    }

    pub fn to_map(&self) -> BTreeMap<String, u64> {
        self.entries
            .iter()
            .map(|e| (e.state.clone(), e.seconds))
            .collect()
    }
}

/// Time-in-state statistics for one issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStatistics {
    pub key: IssueKey,
    pub summary: String,
    pub status: String,
    pub time_in_status: DurationTally,
}

impl IssueStatistics {
    /// `(state, label)` pairs ready for display, in timeline order
    pub fn rows(&self) -> Vec<(String, String)> {
        self.time_in_status
            .iter()
            .map(|e| {
                let seconds = i64::try_from(e.seconds).unwrap_or(i64::MAX);
                (e.state.clone(), format_duration(seconds))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_accumulates_visits() {
        let mut tally = DurationTally::new();
        tally.add("To Do", 100);
        tally.add("In Progress", 50);
        tally.add("To Do", 25);

        assert_eq!(tally.len(), 2);
        assert_eq!(tally.get("To Do"), Some(125));
        assert_eq!(tally.get("Done"), None);
        assert_eq!(tally.total_seconds(), 175);

        let order: Vec<_> = tally.iter().map(|e| e.state.as_str()).collect();
        assert_eq!(order, vec!["To Do", "In Progress"]);
    }

    #[test]
    fn statistics_rows_are_formatted() {
        let mut tally = DurationTally::new();
        tally.add("To Do", 86400 + 3600 + 60);
        tally.add("Review", 0);

        let stats = IssueStatistics {
            key: IssueKey::new("BP-1"),
            summary: "Fix login".into(),
            status: "Review".into(),
            time_in_status: tally,
        };

        assert_eq!(
            stats.rows(),
            vec![
                ("To Do".to_string(), "1d 1h 1m".to_string()),
                ("Review".to_string(), "0m".to_string()),
            ]
        );
    }
}
