//! Time-in-state analytics
//!
//! Rebuilds how long a record spent in each workflow state from its change
//! log. The tally is in whole seconds and its values always sum to the time
//! between creation and `now`.

use chrono::{DateTime, Utc};
use thiserror::Error;
use ticketgate_api::{DurationTally, HistoryEntry, Issue, IssueStatistics};
use ticketgate_config::DEFAULT_STATUS_FIELD;
use ticketgate_util::parse_timestamp;
use tracing::{debug, warn};

/// Input that cannot yield a trustworthy tally
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatisticsError {
    #[error("Invalid timestamp '{value}' in {context}")]
    InvalidTimestamp { value: String, context: String },

    #[error("State change at {timestamp} is missing its '{side}' state")]
    MissingState {
        timestamp: DateTime<Utc>,
        side: &'static str,
    },
}

pub type StatisticsResult<T> = Result<T, StatisticsError>;

/// One changed field taken from a history entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub timestamp: DateTime<Utc>,
    pub field: String,
    pub from_state: Option<String>,
    pub to_state: Option<String>,
}

impl StateTransition {
    pub fn new(
        timestamp: DateTime<Utc>,
        field: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            field: field.into(),
            from_state: Some(from.into()),
            to_state: Some(to.into()),
        }
    }
}

/// Flatten tracker history into transitions, one per changed field
pub fn transitions_from_history(histories: &[HistoryEntry]) -> StatisticsResult<Vec<StateTransition>> {
    let mut transitions = Vec::new();

    for entry in histories {
        let timestamp =
            parse_timestamp(&entry.created).ok_or_else(|| StatisticsError::InvalidTimestamp {
                value: entry.created.clone(),
                context: "history entry".to_string(),
            })?;

        transitions.extend(entry.items.iter().map(|item| StateTransition {
            timestamp,
            field: item.field.clone(),
            from_state: item.from_state.clone(),
            to_state: item.to_state.clone(),
        }));
    }

    Ok(transitions)
}

/// Duration analytics over one tracked history field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusAnalyzer {
    status_field: String,
}

impl Default for StatusAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_FIELD)
    }
}

impl StatusAnalyzer {
    pub fn new(status_field: impl Into<String>) -> Self {
        Self {
            status_field: status_field.into(),
        }
    }

    pub fn status_field(&self) -> &str {
        &self.status_field
    }

    /// Tally the seconds spent in each state between `created_at` and `now`.
    ///
    /// Events for other fields are ignored. Events are processed in time
    /// order; equal timestamps keep their log order. Each interval is
    /// clamped at zero, so out-of-order input never produces a negative
    /// contribution.
    pub fn calculate(
        &self,
        created_at: DateTime<Utc>,
        events: &[StateTransition],
        current_state: &str,
        now: DateTime<Utc>,
    ) -> StatisticsResult<DurationTally> {
        let mut relevant: Vec<&StateTransition> = events
            .iter()
            .filter(|e| e.field == self.status_field)
            .collect();
        // Stable: ties stay in log order
        relevant.sort_by_key(|e| e.timestamp);

        let mut tally = DurationTally::new();
        let mut cursor = created_at;
        let mut cursor_state = match relevant.first() {
            Some(first) => required_state(first, first.from_state.as_deref(), "from")?,
            None => current_state,
        };

        for event in &relevant {
            let from_state = required_state(event, event.from_state.as_deref(), "from")?;
            let to_state = required_state(event, event.to_state.as_deref(), "to")?;
            if from_state != cursor_state {
                // The interval goes to the replayed state
                debug!(
                    timestamp = %event.timestamp,
                    replayed = cursor_state,
                    logged = from_state,
                    "Change log skips a transition"
                );
            }
            tally.add(cursor_state, elapsed_seconds(cursor, event.timestamp));
            if event.timestamp > cursor {
                cursor = event.timestamp;
            }
            cursor_state = to_state;
        }

        if now < cursor {
            warn!(
                now = %now,
                last_change = %cursor,
                "Clock is behind the change log, clamping open interval to zero"
            );
        }
        tally.add(cursor_state, elapsed_seconds(cursor, now));

        if !relevant.is_empty() && cursor_state != current_state {
            debug!(
                replayed = cursor_state,
                current = current_state,
                "Replayed state differs from the current state"
            );
        }

        Ok(tally)
    }

    /// Statistics for a tracker record and its change log
    pub fn issue_statistics(
        &self,
        issue: &Issue,
        histories: &[HistoryEntry],
        now: DateTime<Utc>,
    ) -> StatisticsResult<IssueStatistics> {
        let created_at =
            parse_timestamp(&issue.created).ok_or_else(|| StatisticsError::InvalidTimestamp {
                value: issue.created.clone(),
                context: format!("{} created", issue.key),
            })?;

        let events = transitions_from_history(histories)?;
        let time_in_status = self.calculate(created_at, &events, &issue.status, now)?;

        Ok(IssueStatistics {
            key: issue.key.clone(),
            summary: issue.summary.clone(),
            status: issue.status.clone(),
            time_in_status,
        })
    }
}

/// Tally time in state for the default `status` field
pub fn calculate_status_statistics(
    created_at: DateTime<Utc>,
    events: &[StateTransition],
    current_state: &str,
    now: DateTime<Utc>,
) -> StatisticsResult<DurationTally> {
    StatusAnalyzer::default().calculate(created_at, events, current_state, now)
}

fn required_state<'a>(
    event: &StateTransition,
    state: Option<&'a str>,
    side: &'static str,
) -> StatisticsResult<&'a str> {
    state.ok_or(StatisticsError::MissingState {
        timestamp: event.timestamp,
        side,
    })
}

/// Whole seconds from `start` to `end`, sub-second parts truncated, never negative
fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from(end.timestamp() - start.timestamp()).unwrap_or(0)
}
