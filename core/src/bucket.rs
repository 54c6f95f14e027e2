//! Date buckets: the past / today / future tabs of the list screen.
//!
//! # Design
//! Grouping is a pure function of (list, current day). Nothing here is
//! cached across calls; the store rebuilds a `Grouping` every time it
//! publishes, so a list left open over midnight re-buckets on the next change.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::types::Todo;

/// One of the three mutually exclusive list filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DateBucket {
    Past,
    #[default]
    Today,
    Future,
}

impl DateBucket {
    /// Tab order of the list screen.
    pub const TABS: [DateBucket; 3] = [DateBucket::Today, DateBucket::Future, DateBucket::Past];

    pub fn classify(day: NaiveDate, today: NaiveDate) -> Self {
        match day.cmp(&today) {
            std::cmp::Ordering::Less => DateBucket::Past,
            std::cmp::Ordering::Equal => DateBucket::Today,
            std::cmp::Ordering::Greater => DateBucket::Future,
        }
    }

    /// Bucket of `todo` as seen from `clock`'s current day.
    pub fn of(todo: &Todo, clock: &dyn Clock) -> Self {
        Self::classify(clock.local_day(todo.date), clock.today())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DateBucket::Past => "past",
            DateBucket::Today => "today",
            DateBucket::Future => "future",
        }
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "past" => Ok(DateBucket::Past),
            "today" => Ok(DateBucket::Today),
            "future" => Ok(DateBucket::Future),
            other => Err(format!("unknown date bucket `{other}`")),
        }
    }
}

/// A list split into the three buckets. Order inside a bucket follows the
/// order of the source list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    past: Vec<Todo>,
    today: Vec<Todo>,
    future: Vec<Todo>,
}

impl Grouping {
    pub fn build<'a>(todos: impl IntoIterator<Item = &'a Todo>, clock: &dyn Clock) -> Self {
        let today = clock.today();
        let mut grouping = Grouping::default();
        for todo in todos {
            let bucket = DateBucket::classify(clock.local_day(todo.date), today);
            grouping.bucket_mut(bucket).push(todo.clone());
        }
        grouping
    }

    pub fn get(&self, bucket: DateBucket) -> &[Todo] {
        match bucket {
            DateBucket::Past => &self.past,
            DateBucket::Today => &self.today,
            DateBucket::Future => &self.future,
        }
    }

    fn bucket_mut(&mut self, bucket: DateBucket) -> &mut Vec<Todo> {
        match bucket {
            DateBucket::Past => &mut self.past,
            DateBucket::Today => &mut self.today,
            DateBucket::Future => &mut self.future,
        }
    }

    pub fn len(&self) -> usize {
        self.past.len() + self.today.len() + self.future.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Todos sharing one calendar day, rendered under a date header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub day: NaiveDate,
    pub items: Vec<Todo>,
}

impl Section {
    /// Header text, e.g. `2025/05/11`.
    pub fn header(&self) -> String {
        self.day.format("%Y/%m/%d").to_string()
    }
}

/// Splits `todos` into per-day sections, earliest day first.
pub fn sections(todos: &[Todo], clock: &dyn Clock) -> Vec<Section> {
    let mut by_day: BTreeMap<NaiveDate, Vec<Todo>> = BTreeMap::new();
    for todo in todos {
        by_day
            .entry(clock.local_day(todo.date))
            .or_default()
            .push(todo.clone());
    }
    by_day
        .into_iter()
        .map(|(day, items)| Section { day, items })
        .collect()
}
