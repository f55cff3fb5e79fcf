//! Calendar-driven snapshot labels and retention pruning
//!
//! Labels are `YYYYMMDD` followed by a one-character period tag. The date part
//! is fixed width and zero padded, so for two labels with the same tag the
//! string order is the chronological order. Pruning relies on that and
//! compares labels as plain strings.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::report::{CELL_DISABLED, CELL_ERROR};

const LABEL_DATE_FORMAT: &str = "%Y%m%d";
const LABEL_DATE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodTag {
    Daily,
    Weekly,
    Quarterly,
}

impl PeriodTag {
    /// Saturdays are weekly, or quarterly when the ISO week is 1 mod 13;
    /// every other weekday is daily.
    pub fn for_date(date: NaiveDate) -> Self {
        if date.weekday() != Weekday::Sat {
            return PeriodTag::Daily;
        }
        if date.iso_week().week() % 13 == 1 {
            PeriodTag::Quarterly
        } else {
            PeriodTag::Weekly
        }
    }

    pub fn as_char(self) -> char {
        match self {
            PeriodTag::Daily => 'd',
            PeriodTag::Weekly => 'w',
            PeriodTag::Quarterly => 'q',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'd' => Some(PeriodTag::Daily),
            'w' => Some(PeriodTag::Weekly),
            'q' => Some(PeriodTag::Quarterly),
            _ => None,
        }
    }
}

impl fmt::Display for PeriodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotLabel {
    date: NaiveDate,
    tag: PeriodTag,
}

impl SnapshotLabel {
    pub fn new(date: NaiveDate, tag: PeriodTag) -> Self {
        Self { date, tag }
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self::new(date, PeriodTag::for_date(date))
    }

    /// Parse a well-formed label such as `20240113w`.
    pub fn parse(label: &str) -> Option<Self> {
        if label.len() != LABEL_DATE_LEN + 1 || !label.is_ascii() {
            return None;
        }
        let (date_part, tag_part) = label.split_at(LABEL_DATE_LEN);
        if !date_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let date = NaiveDate::parse_from_str(date_part, LABEL_DATE_FORMAT).ok()?;
        let tag = PeriodTag::from_char(tag_part.chars().next()?)?;
        Some(Self { date, tag })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn tag(&self) -> PeriodTag {
        self.tag
    }
}

impl fmt::Display for SnapshotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.date.format(LABEL_DATE_FORMAT), self.tag)
    }
}

/// Retention days per period tag; zero disables pruning for that tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    #[serde(default, alias = "d")]
    pub daily: u32,
    #[serde(default, alias = "w")]
    pub weekly: u32,
    #[serde(default, alias = "q")]
    pub quarterly: u32,
}

impl RetentionPolicy {
    pub fn days_for(&self, tag: PeriodTag) -> u32 {
        match tag {
            PeriodTag::Daily => self.daily,
            PeriodTag::Weekly => self.weekly,
            PeriodTag::Quarterly => self.quarterly,
        }
    }
}

/// Snapshots selected for deletion on one container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrunePlan {
    Disabled,
    Candidates {
        eligible: Vec<String>,
        matching_total: usize,
    },
}

/// Result of the prune step, rendered into the report's prune cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneResult {
    Disabled,
    Failed(String),
    Pruned {
        deleted: usize,
        eligible: usize,
        matching_total: usize,
    },
}

impl PruneResult {
    pub fn cell(&self) -> String {
        match self {
            PruneResult::Disabled => CELL_DISABLED.to_string(),
            PruneResult::Failed(_) => CELL_ERROR.to_string(),
            PruneResult::Pruned {
                deleted,
                eligible,
                matching_total,
            } => format!("{}/{}/{}", deleted, eligible, matching_total),
        }
    }
}

/// Label and retention cutoff for one run. Computed once, shared by every leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPolicy {
    label: SnapshotLabel,
    cutoff: Option<SnapshotLabel>,
}

impl SnapshotPolicy {
    pub fn new(today: NaiveDate, retention: &RetentionPolicy) -> Self {
        let label = SnapshotLabel::for_date(today);
        let days = retention.days_for(label.tag());

        let cutoff = (days > 0).then(|| {
            let cutoff_date = today
                .checked_sub_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MIN);
            SnapshotLabel::new(cutoff_date, label.tag())
        });

        Self { label, cutoff }
    }

    pub fn label(&self) -> SnapshotLabel {
        self.label
    }

    pub fn tag(&self) -> PeriodTag {
        self.label.tag()
    }

    pub fn cutoff(&self) -> Option<SnapshotLabel> {
        self.cutoff
    }

    pub fn retention_enabled(&self) -> bool {
        self.cutoff.is_some()
    }

    /// Pick the existing snapshots older than the cutoff.
    ///
    /// Only well-formed labels carrying this run's tag are considered. A
    /// snapshot labelled exactly with the cutoff is kept.
    pub fn plan_pruning<S: AsRef<str>>(&self, existing: &[S]) -> PrunePlan {
        let Some(cutoff) = self.cutoff else {
            return PrunePlan::Disabled;
        };
        let cutoff = cutoff.to_string();
        let tag = self.tag();

        let matching: Vec<&str> = existing
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| SnapshotLabel::parse(name).is_some_and(|label| label.tag() == tag))
            .collect();

        let eligible = matching
            .iter()
            .filter(|name| **name < cutoff.as_str())
            .map(|name| name.to_string())
            .collect();

        PrunePlan::Candidates {
            eligible,
            matching_total: matching.len(),
        }
    }
}
