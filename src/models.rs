//! Data models for the initiative digest.
//!
//! This module contains the issue and initiative entities, the typed
//! query row they are built from, and the five-bucket digest produced
//! by classification.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle phase of an issue at report time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Voting has finished
    Closed,
    /// Issue is fully frozen and being voted on
    Voting,
    /// Issue is half frozen, no more changes to drafts
    Frozen,
    /// Issue was accepted and is under discussion
    Discussion,
    /// Issue was created but not yet accepted
    New,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Closed => write!(f, "Closed"),
            Phase::Voting => write!(f, "Voting"),
            Phase::Frozen => write!(f, "Frozen"),
            Phase::Discussion => write!(f, "Discussion"),
            Phase::New => write!(f, "New"),
        }
    }
}

impl Phase {
    /// All phases in report order.
    pub const ALL: [Phase; 5] = [
        Phase::Closed,
        Phase::Voting,
        Phase::Frozen,
        Phase::Discussion,
        Phase::New,
    ];

    /// Classify a row by the first set timestamp in priority order.
    pub fn of(row: &IssueRow) -> Self {
        if row.closed.is_some() {
            Phase::Closed
        } else if row.fully_frozen.is_some() {
            Phase::Voting
        } else if row.half_frozen.is_some() {
            Phase::Frozen
        } else if row.accepted.is_some() {
            Phase::Discussion
        } else {
            Phase::New
        }
    }
}

/// One row of the issue/initiative join, as returned by the data source.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct IssueRow {
    pub area_name: String,
    pub issue_id: i32,
    #[sqlx(rename = "id")]
    pub initiative_id: i32,
    #[sqlx(rename = "name")]
    pub initiative_name: String,
    pub eligible: Option<bool>,
    pub rank: Option<i32>,
    pub closed: Option<DateTime<Utc>>,
    pub fully_frozen: Option<DateTime<Utc>>,
    pub half_frozen: Option<DateTime<Utc>>,
    pub accepted: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
}

/// A proposal submitted under an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initiative {
    pub id: i32,
    pub name: String,
    /// Whether the initiative won; unknown until the issue closes.
    pub eligible: Option<bool>,
    /// Final rank; unknown until the issue closes.
    pub rank: Option<i32>,
}

impl Initiative {
    /// Build an initiative from the initiative columns of a row.
    pub fn from_row(row: &IssueRow) -> Self {
        Self {
            id: row.initiative_id,
            name: row.initiative_name.clone(),
            eligible: row.eligible,
            rank: row.rank,
        }
    }

    /// Returns the eligibility marker used in the closed section.
    pub fn marker(&self) -> char {
        if self.eligible == Some(true) {
            '+'
        } else {
            '-'
        }
    }
}

/// A voting topic together with the initiatives filed under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: i32,
    pub closed: Option<DateTime<Utc>>,
    pub fully_frozen: Option<DateTime<Utc>>,
    pub half_frozen: Option<DateTime<Utc>>,
    pub accepted: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub area_name: String,
    pub initiatives: BTreeMap<i32, Initiative>,
}

impl Issue {
    /// Build an issue (without initiatives) from the issue columns of a row.
    pub fn from_row(row: &IssueRow) -> Self {
        Self {
            id: row.issue_id,
            closed: row.closed,
            fully_frozen: row.fully_frozen,
            half_frozen: row.half_frozen,
            accepted: row.accepted,
            created: row.created,
            area_name: row.area_name.clone(),
            initiatives: BTreeMap::new(),
        }
    }

    /// Attach an initiative, replacing any previous one with the same id.
    pub fn add_initiative(&mut self, initiative: Initiative) {
        self.initiatives.insert(initiative.id, initiative);
    }

    /// Initiatives in ascending id order.
    pub fn initiatives_by_id(&self) -> Vec<&Initiative> {
        self.initiatives.values().collect()
    }
}

/// Issues keyed by id.
pub type Bucket = BTreeMap<i32, Issue>;

/// Issues of one unit, split into the five phase buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    /// Organizational unit the rows were selected for.
    pub unit_id: i32,
    /// Issues closed before this date were excluded.
    pub since: NaiveDate,
    pub closed: Bucket,
    pub voting: Bucket,
    pub frozen: Bucket,
    pub discussion: Bucket,
    pub new: Bucket,
}

impl Digest {
    /// Creates a digest with all buckets empty.
    pub fn new(unit_id: i32, since: NaiveDate) -> Self {
        Self {
            unit_id,
            since,
            closed: Bucket::new(),
            voting: Bucket::new(),
            frozen: Bucket::new(),
            discussion: Bucket::new(),
            new: Bucket::new(),
        }
    }

    pub fn bucket(&self, phase: Phase) -> &Bucket {
        match phase {
            Phase::Closed => &self.closed,
            Phase::Voting => &self.voting,
            Phase::Frozen => &self.frozen,
            Phase::Discussion => &self.discussion,
            Phase::New => &self.new,
        }
    }

    pub fn bucket_mut(&mut self, phase: Phase) -> &mut Bucket {
        match phase {
            Phase::Closed => &mut self.closed,
            Phase::Voting => &mut self.voting,
            Phase::Frozen => &mut self.frozen,
            Phase::Discussion => &mut self.discussion,
            Phase::New => &mut self.new,
        }
    }

    /// Returns true if no bucket holds an issue.
    pub fn is_empty(&self) -> bool {
        Phase::ALL.iter().all(|phase| self.bucket(*phase).is_empty())
    }

    /// Counts issues per phase and initiatives overall.
    pub fn summary(&self) -> DigestSummary {
        let initiatives = Phase::ALL
            .iter()
            .flat_map(|phase| self.bucket(*phase).values())
            .map(|issue| issue.initiatives.len())
            .sum();

        DigestSummary {
            closed: self.closed.len(),
            voting: self.voting.len(),
            frozen: self.frozen.len(),
            discussion: self.discussion.len(),
            new: self.new.len(),
            initiatives,
        }
    }
}

/// Issue and initiative counts of a digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestSummary {
    pub closed: usize,
    pub voting: usize,
    pub frozen: usize,
    pub discussion: usize,
    pub new: usize,
    pub initiatives: usize,
}

impl DigestSummary {
    /// Total number of issues across all phases.
    pub fn issues(&self) -> usize {
        self.closed + self.voting + self.frozen + self.discussion + self.new
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    pub(crate) fn make_row(issue_id: i32, initiative_id: i32, name: &str) -> IssueRow {
        IssueRow {
            area_name: "Allgemein".to_string(),
            issue_id,
            initiative_id,
            initiative_name: name.to_string(),
            eligible: None,
            rank: None,
            closed: None,
            fully_frozen: None,
            half_frozen: None,
            accepted: None,
            created: Some(ts(2024, 1, 1)),
        }
    }

    #[test]
    fn test_phase_priority() {
        let mut row = make_row(1, 10, "A");
        assert_eq!(Phase::of(&row), Phase::New);

        row.accepted = Some(ts(2024, 1, 2));
        assert_eq!(Phase::of(&row), Phase::Discussion);

        row.half_frozen = Some(ts(2024, 1, 3));
        assert_eq!(Phase::of(&row), Phase::Frozen);

        row.fully_frozen = Some(ts(2024, 1, 4));
        assert_eq!(Phase::of(&row), Phase::Voting);

        row.closed = Some(ts(2024, 1, 5));
        assert_eq!(Phase::of(&row), Phase::Closed);
    }

    #[test]
    fn test_closed_wins_without_earlier_phases() {
        let mut row = make_row(1, 10, "A");
        row.created = None;
        row.closed = Some(ts(2024, 1, 1));
        assert_eq!(Phase::of(&row), Phase::Closed);
    }

    #[test]
    fn test_add_initiative_overwrites_same_id() {
        let row = make_row(1, 10, "First");
        let mut issue = Issue::from_row(&row);
        issue.add_initiative(Initiative::from_row(&row));
        issue.add_initiative(Initiative::from_row(&make_row(1, 10, "Second")));

        assert_eq!(issue.initiatives.len(), 1);
        assert_eq!(issue.initiatives[&10].name, "Second");
    }

    #[test]
    fn test_initiative_marker() {
        let mut ini = Initiative::from_row(&make_row(1, 10, "A"));
        assert_eq!(ini.marker(), '-');
        ini.eligible = Some(false);
        assert_eq!(ini.marker(), '-');
        ini.eligible = Some(true);
        assert_eq!(ini.marker(), '+');
    }

    #[test]
    fn test_digest_summary() {
        let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut digest = Digest::new(1, since);
        assert!(digest.is_empty());

        let row = make_row(5, 50, "A");
        let mut issue = Issue::from_row(&row);
        issue.add_initiative(Initiative::from_row(&row));
        issue.add_initiative(Initiative::from_row(&make_row(5, 51, "B")));
        digest.bucket_mut(Phase::Voting).insert(5, issue);

        let summary = digest.summary();
        assert!(!digest.is_empty());
        assert_eq!(summary.voting, 1);
        assert_eq!(summary.issues(), 1);
        assert_eq!(summary.initiatives, 2);
    }
}
