//! Issue classification and aggregation.
//!
//! This module turns the flat issue/initiative join into a [`Digest`]:
//! every issue lands in exactly one phase bucket and owns the
//! initiatives of all of its rows.

use crate::models::{Digest, Initiative, Issue, IssueRow, Phase};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Classify and group joined rows into the five phase buckets.
///
/// The phase of an issue is decided by the first row seen for its id;
/// later rows only contribute initiatives.
pub fn classify_and_aggregate<I>(rows: I, unit_id: i32, since: NaiveDate) -> Digest
where
    I: IntoIterator<Item = IssueRow>,
{
    let mut digest = Digest::new(unit_id, since);
    let mut phases: HashMap<i32, Phase> = HashMap::new();

    for row in rows {
        let row_phase = Phase::of(&row);
        let phase = *phases.entry(row.issue_id).or_insert(row_phase);

        if phase != row_phase {
            warn!(
                "Issue #{} row implies phase {} but was first seen as {}",
                row.issue_id, row_phase, phase
            );
        }

        let issue = digest
            .bucket_mut(phase)
            .entry(row.issue_id)
            .or_insert_with(|| Issue::from_row(&row));

        issue.add_initiative(Initiative::from_row(&row));
    }

    debug!("Classified {} issues", phases.len());

    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::{make_row, ts};

    fn since() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_single_closed_row() {
        let mut row = make_row(10, 100, "Foo");
        row.closed = Some(ts(2024, 1, 1));
        row.rank = Some(1);
        row.eligible = Some(true);

        let digest = classify_and_aggregate(vec![row], 1, since());

        assert_eq!(digest.closed.len(), 1);
        let issue = &digest.closed[&10];
        assert_eq!(issue.initiatives.len(), 1);
        assert_eq!(issue.initiatives[&100].name, "Foo");
        assert_eq!(issue.initiatives[&100].rank, Some(1));
        assert!(digest.voting.is_empty());
        assert!(digest.new.is_empty());
    }

    #[test]
    fn test_closed_takes_priority_over_voting() {
        let mut row = make_row(1, 10, "A");
        row.fully_frozen = Some(ts(2024, 1, 2));
        row.closed = Some(ts(2024, 1, 3));

        let digest = classify_and_aggregate(vec![row], 1, since());

        assert!(digest.closed.contains_key(&1));
        assert!(digest.voting.is_empty());
    }

    #[test]
    fn test_rows_grouped_by_issue() {
        let mut first = make_row(30, 300, "A");
        first.fully_frozen = Some(ts(2024, 1, 2));
        let mut second = make_row(30, 301, "B");
        second.fully_frozen = Some(ts(2024, 1, 2));

        let digest = classify_and_aggregate(vec![first, second], 1, since());

        assert_eq!(digest.voting.len(), 1);
        let ids: Vec<i32> = digest.voting[&30].initiatives.keys().copied().collect();
        assert_eq!(ids, vec![300, 301]);
    }

    #[test]
    fn test_first_seen_phase_is_sticky() {
        let mut first = make_row(7, 70, "A");
        first.accepted = Some(ts(2024, 1, 2));
        let mut second = make_row(7, 71, "B");
        second.fully_frozen = Some(ts(2024, 1, 3));

        let digest = classify_and_aggregate(vec![first, second], 1, since());

        assert!(digest.voting.is_empty());
        assert_eq!(digest.discussion.len(), 1);
        assert_eq!(digest.discussion[&7].initiatives.len(), 2);
    }

    #[test]
    fn test_every_issue_in_exactly_one_bucket() {
        let mut rows = Vec::new();
        for id in 1..=10 {
            let mut row = make_row(id, id * 10, "X");
            match id % 5 {
                0 => row.closed = Some(ts(2024, 1, 5)),
                1 => row.fully_frozen = Some(ts(2024, 1, 4)),
                2 => row.half_frozen = Some(ts(2024, 1, 3)),
                3 => row.accepted = Some(ts(2024, 1, 2)),
                _ => {}
            }
            rows.push(row.clone());
            // A second initiative for the same issue with a conflicting phase
            row.initiative_id += 1;
            row.closed = Some(ts(2024, 1, 6));
            rows.push(row);
        }

        let digest = classify_and_aggregate(rows, 1, since());

        for id in 1..=10 {
            let hits = Phase::ALL
                .iter()
                .filter(|phase| digest.bucket(**phase).contains_key(&id))
                .count();
            assert_eq!(hits, 1, "issue {} should be in exactly one bucket", id);
        }
        assert_eq!(digest.summary().issues(), 10);
        assert_eq!(digest.summary().initiatives, 20);
    }

    #[test]
    fn test_empty_input() {
        let digest = classify_and_aggregate(Vec::new(), 3, since());
        assert!(digest.is_empty());
        assert_eq!(digest.unit_id, 3);
        assert_eq!(digest.since, since());
    }
}
