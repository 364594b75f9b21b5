//! Property tests for time-in-state analytics

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use ticketgate_core::{StateTransition, calculate_status_statistics};

const STATES: [&str; 4] = ["To Do", "In Progress", "Review", "Done"];

fn created() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
}

/// Chronological transitions built from gaps (seconds) and state indices
fn timeline(steps: &[(i64, usize)]) -> (Vec<StateTransition>, String, DateTime<Utc>) {
    let mut events = Vec::new();
    let mut timestamp = created();
    let mut state = STATES[0].to_string();

    for &(gap, next) in steps {
        timestamp += chrono::Duration::seconds(gap);
        let next = STATES[next].to_string();
        events.push(StateTransition::new(timestamp, "status", state.clone(), next.clone()));
        state = next;
    }

    (events, state, timestamp)
}

proptest! {
    #[test]
    fn tally_sums_to_lifetime(
        steps in prop::collection::vec((0i64..1_000_000, 0usize..STATES.len()), 0..20),
        tail in 0i64..10_000_000,
    ) {
        let (events, current, last) = timeline(&steps);
        let now = last + chrono::Duration::seconds(tail);

        let tally = calculate_status_statistics(created(), &events, &current, now).unwrap();
        let lifetime = u64::try_from((now - created()).num_seconds()).unwrap();
        prop_assert_eq!(tally.total_seconds(), lifetime);
    }

    #[test]
    fn tally_never_exceeds_lifetime_when_clock_lags(
        steps in prop::collection::vec((1i64..1_000_000, 0usize..STATES.len()), 1..10),
        lag in 1i64..1_000_000,
    ) {
        let (events, current, last) = timeline(&steps);
        let now = last - chrono::Duration::seconds(lag);

        let tally = calculate_status_statistics(created(), &events, &current, now).unwrap();
        let span = u64::try_from((last - created()).num_seconds()).unwrap();
        prop_assert_eq!(tally.total_seconds(), span);
    }
}

#[test]
fn revisits_sum_every_interval() {
    let at = |day: u32, hour: u32| Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap();
    let events = vec![
        StateTransition::new(at(2, 10), "status", "To Do", "In Progress"),
        StateTransition::new(at(3, 10), "status", "In Progress", "To Do"),
        StateTransition::new(at(4, 10), "status", "To Do", "In Progress"),
    ];

    let tally = calculate_status_statistics(at(1, 10), &events, "In Progress", at(10, 12)).unwrap();

    assert_eq!(tally.get("To Do"), Some(172_800));
    assert_eq!(tally.get("In Progress"), Some(612_000));
    assert_eq!(tally.total_seconds(), 784_800);
}
