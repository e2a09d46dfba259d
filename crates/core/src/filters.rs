//! Composable view filters over the in-memory todo collection.
//!
//! A [`FilterState`] is a conjunction of five independent clauses. Each clause
//! is a plain function of the state, the task and the current [`DueWindow`];
//! [`FilterState::matches`] folds them with logical AND.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};

use crate::model::{Category, Priority, Task};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" | "done" => Ok(StatusFilter::Completed),
            other => Err(anyhow!(
                "Unknown status '{}': expected all|active|completed",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DueBucket {
    #[default]
    All,
    Overdue,
    Today,
    Upcoming,
    NoDueDate,
}

impl DueBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            DueBucket::All => "all",
            DueBucket::Overdue => "overdue",
            DueBucket::Today => "today",
            DueBucket::Upcoming => "upcoming",
            DueBucket::NoDueDate => "noDueDate",
        }
    }
}

impl fmt::Display for DueBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DueBucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(DueBucket::All),
            "overdue" => Ok(DueBucket::Overdue),
            "today" => Ok(DueBucket::Today),
            "upcoming" => Ok(DueBucket::Upcoming),
            "noduedate" | "no-due-date" | "none" => Ok(DueBucket::NoDueDate),
            other => Err(anyhow!(
                "Unknown due bucket '{}': expected all|overdue|today|upcoming|no-due-date",
                other
            )),
        }
    }
}

/// Equality constraint on one task attribute; `All` places no constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Facet<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Facet<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Facet::All => true,
            Facet::Only(expected) => expected == value,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Facet::All)
    }
}

impl<T: fmt::Display> fmt::Display for Facet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::All => write!(f, "all"),
            Facet::Only(value) => write!(f, "{}", value),
        }
    }
}

impl<T> FromStr for Facet<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Facet::All);
        }
        s.trim().parse().map(Facet::Only)
    }
}

/// The start of "today" and "tomorrow" used by the due-date clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueWindow {
    today: DateTime<Utc>,
    tomorrow: DateTime<Utc>,
}

impl DueWindow {
    /// Window whose "today" begins at the given instant.
    pub fn starting_at(today: DateTime<Utc>) -> Self {
        Self {
            today,
            tomorrow: today + Duration::days(1),
        }
    }

    /// Window for a calendar date, with midnight resolved in `tz`.
    pub fn for_date<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        let today = tz
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight));
        Self::starting_at(today)
    }

    /// Window for the current local date.
    pub fn current() -> Self {
        Self::for_date(Local::now().date_naive(), &Local)
    }

    pub fn today(&self) -> DateTime<Utc> {
        self.today
    }

    pub fn tomorrow(&self) -> DateTime<Utc> {
        self.tomorrow
    }

    pub fn is_overdue(&self, due: DateTime<Utc>) -> bool {
        due < self.today
    }

    pub fn is_today(&self, due: DateTime<Utc>) -> bool {
        self.today <= due && due < self.tomorrow
    }

    pub fn is_upcoming(&self, due: DateTime<Utc>) -> bool {
        due >= self.tomorrow
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub status: StatusFilter,
    pub priority: Facet<Priority>,
    pub category: Facet<Category>,
    pub due: DueBucket,
    pub query: String,
}

type Clause = fn(&FilterState, &Task, &DueWindow) -> bool;

const CLAUSES: [Clause; 5] = [
    text_clause,
    status_clause,
    priority_clause,
    category_clause,
    due_clause,
];

impl FilterState {
    pub fn matches(&self, task: &Task, window: &DueWindow) -> bool {
        CLAUSES.iter().all(|clause| clause(self, task, window))
    }

    pub fn apply<'a>(&self, tasks: &'a [Task], window: &DueWindow) -> Vec<&'a Task> {
        tasks
            .iter()
            .filter(|task| self.matches(task, window))
            .collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether any of the panel facets (priority, category, due) is set.
    pub fn has_active_facets(&self) -> bool {
        !self.priority.is_all() || !self.category.is_all() || self.due != DueBucket::All
    }

    pub fn is_identity(&self) -> bool {
        self.status == StatusFilter::All
            && !self.has_active_facets()
            && self.query.is_empty()
    }

    pub fn summary(&self) -> Option<String> {
        if self.is_identity() {
            return None;
        }

        let mut parts = Vec::new();
        if self.status != StatusFilter::All {
            parts.push(format!("status:{}", self.status));
        }
        if let Facet::Only(priority) = self.priority {
            parts.push(format!("priority:{priority}"));
        }
        if let Facet::Only(category) = self.category {
            parts.push(format!("category:{category}"));
        }
        if self.due != DueBucket::All {
            parts.push(format!("due:{}", self.due));
        }
        if !self.query.is_empty() {
            parts.push(format!("q:\"{}\"", self.query));
        }

        Some(parts.join(" | "))
    }
}

fn text_clause(filters: &FilterState, task: &Task, _window: &DueWindow) -> bool {
    if filters.query.is_empty() {
        return true;
    }
    let needle = filters.query.to_lowercase();
    task.title.to_lowercase().contains(&needle)
        || task.description.to_lowercase().contains(&needle)
}

fn status_clause(filters: &FilterState, task: &Task, _window: &DueWindow) -> bool {
    match filters.status {
        StatusFilter::All => true,
        StatusFilter::Active => !task.completed,
        StatusFilter::Completed => task.completed,
    }
}

fn priority_clause(filters: &FilterState, task: &Task, _window: &DueWindow) -> bool {
    filters.priority.admits(&task.priority)
}

fn category_clause(filters: &FilterState, task: &Task, _window: &DueWindow) -> bool {
    filters.category.admits(&task.category)
}

fn due_clause(filters: &FilterState, task: &Task, window: &DueWindow) -> bool {
    match (filters.due, task.due_at) {
        (DueBucket::All, _) => true,
        (DueBucket::NoDueDate, due) => due.is_none(),
        (_, None) => false,
        (DueBucket::Overdue, Some(due)) => window.is_overdue(due),
        (DueBucket::Today, Some(due)) => window.is_today(due),
        (DueBucket::Upcoming, Some(due)) => window.is_upcoming(due),
    }
}

/// Tab badge counts over the whole collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub all: usize,
    pub active: usize,
    pub completed: usize,
}

impl StatusCounts {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|task| task.completed).count();
        Self {
            all: tasks.len(),
            active: tasks.len() - completed,
            completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn window() -> DueWindow {
        DueWindow::for_date(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), &Utc)
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn task(title: &str, completed: bool, due_at: Option<DateTime<Utc>>) -> Task {
        let created = at(1, 0);
        Task {
            id: format!("id-{title}"),
            title: title.into(),
            description: String::new(),
            priority: Priority::Medium,
            category: Category::Programming,
            due_at,
            completed,
            created_at: created,
            updated_at: created,
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task("past", false, Some(at(9, 23))),
            task("this morning", true, Some(at(10, 0))),
            task("tonight", false, Some(at(10, 23))),
            task("later", true, Some(at(11, 0))),
            task("someday", false, None),
        ]
    }

    #[test]
    fn default_state_is_identity_filter() {
        let tasks = sample();
        let filters = FilterState::default();
        assert_eq!(filters.apply(&tasks, &window()).len(), tasks.len());
        assert!(filters.summary().is_none());
    }

    #[test]
    fn status_partition_tracks_completion_flag() {
        let active = FilterState {
            status: StatusFilter::Active,
            ..FilterState::default()
        };
        let completed = FilterState {
            status: StatusFilter::Completed,
            ..FilterState::default()
        };
        for task in sample() {
            assert_eq!(active.matches(&task, &window()), !task.completed);
            assert_eq!(completed.matches(&task, &window()), task.completed);
        }
    }

    #[rstest]
    #[case(DueBucket::Overdue, &["past"])]
    #[case(DueBucket::Today, &["this morning", "tonight"])]
    #[case(DueBucket::Upcoming, &["later"])]
    #[case(DueBucket::NoDueDate, &["someday"])]
    fn due_buckets_partition_by_day(#[case] due: DueBucket, #[case] expected: &[&str]) {
        let tasks = sample();
        let filters = FilterState {
            due,
            ..FilterState::default()
        };
        let titles: Vec<&str> = filters
            .apply(&tasks, &window())
            .into_iter()
            .map(|task| task.title.as_str())
            .collect();
        assert_eq!(titles, expected);
    }

    #[test]
    fn past_due_task_is_only_overdue() {
        let past = task("past", false, Some(at(1, 12)));
        let bucket = |due| FilterState {
            due,
            ..FilterState::default()
        };
        assert!(bucket(DueBucket::Overdue).matches(&past, &window()));
        assert!(!bucket(DueBucket::Today).matches(&past, &window()));
        assert!(!bucket(DueBucket::Upcoming).matches(&past, &window()));
        assert!(!bucket(DueBucket::NoDueDate).matches(&past, &window()));
    }

    #[test]
    fn undated_task_only_matches_no_due_date() {
        let undated = task("undated", false, None);
        for due in [DueBucket::Overdue, DueBucket::Today, DueBucket::Upcoming] {
            let filters = FilterState {
                due,
                ..FilterState::default()
            };
            assert!(!filters.matches(&undated, &window()), "{due} should reject");
        }
        let filters = FilterState {
            due: DueBucket::NoDueDate,
            ..FilterState::default()
        };
        assert!(filters.matches(&undated, &window()));
    }

    #[test]
    fn query_matches_title_or_description_case_insensitively() {
        let mut described = task("Groceries", false, None);
        described.description = "Buy MILK and bread".into();
        let filters = FilterState {
            query: "milk".into(),
            ..FilterState::default()
        };
        assert!(filters.matches(&described, &window()));
        assert!(!filters.matches(&task("Laundry", false, None), &window()));

        let by_title = FilterState {
            query: "GROC".into(),
            ..FilterState::default()
        };
        assert!(by_title.matches(&described, &window()));
    }

    #[test]
    fn buy_milk_scenario() {
        let mut milk = task("Buy milk", false, None);
        milk.priority = Priority::Low;
        milk.category = Category::Other;
        let tasks = vec![milk];

        let mut filters = FilterState {
            status: StatusFilter::Active,
            query: "milk".into(),
            ..FilterState::default()
        };
        let matched = filters.apply(&tasks, &window());
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].title, "Buy milk");

        filters.query = "eggs".into();
        assert!(filters.apply(&tasks, &window()).is_empty());
    }

    #[test]
    fn facets_require_exact_match() {
        let mut urgent = task("urgent", false, None);
        urgent.priority = Priority::High;
        urgent.category = Category::Work;

        let high_work = FilterState {
            priority: Facet::Only(Priority::High),
            category: Facet::Only(Category::Work),
            ..FilterState::default()
        };
        assert!(high_work.matches(&urgent, &window()));

        let low = FilterState {
            priority: Facet::Only(Priority::Low),
            ..FilterState::default()
        };
        assert!(!low.matches(&urgent, &window()));

        let health = FilterState {
            category: Facet::Only(Category::Health),
            ..FilterState::default()
        };
        assert!(!health.matches(&urgent, &window()));
    }

    #[test]
    fn reset_restores_defaults_and_summary_lists_clauses() {
        let mut filters = FilterState {
            status: StatusFilter::Active,
            priority: Facet::Only(Priority::High),
            category: Facet::All,
            due: DueBucket::Overdue,
            query: "milk".into(),
        };
        assert!(filters.has_active_facets());
        assert_eq!(
            filters.summary().as_deref(),
            Some("status:active | priority:High | due:overdue | q:\"milk\"")
        );

        filters.reset();
        assert_eq!(filters, FilterState::default());
        assert!(!filters.has_active_facets());
    }

    #[rstest]
    #[case("active", StatusFilter::Active)]
    #[case("Completed", StatusFilter::Completed)]
    #[case("all", StatusFilter::All)]
    fn status_parses_from_tab_parameter(#[case] raw: &str, #[case] expected: StatusFilter) {
        assert_eq!(raw.parse::<StatusFilter>().unwrap(), expected);
    }

    #[test]
    fn facets_and_buckets_parse() {
        assert_eq!("all".parse::<Facet<Priority>>().unwrap(), Facet::All);
        assert_eq!(
            "high".parse::<Facet<Priority>>().unwrap(),
            Facet::Only(Priority::High)
        );
        assert_eq!("noDueDate".parse::<DueBucket>().unwrap(), DueBucket::NoDueDate);
        assert_eq!("no-due-date".parse::<DueBucket>().unwrap(), DueBucket::NoDueDate);
        assert!("later".parse::<DueBucket>().is_err());
        assert!("archived".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn status_counts_split_by_completion() {
        let counts = StatusCounts::from_tasks(&sample());
        assert_eq!(
            counts,
            StatusCounts {
                all: 5,
                active: 3,
                completed: 2
            }
        );
    }

    #[test]
    fn whitespace_query_filters_and_shows_in_summary() {
        let filters = FilterState {
            query: " ".into(),
            ..FilterState::default()
        };
        assert!(!filters.is_identity());
        let tasks = sample();
        let matched = filters.apply(&tasks, &window());
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].title, "this morning");
        assert_eq!(filters.summary().as_deref(), Some("q:\" \""));
    }
}
