//! Dashboard list view: window/sort selection, display order and columns.

use chrono::{Duration, NaiveDate};

use crate::format;
use crate::record::TaskRecord;
use crate::schema::{Column, TaskField, COLUMN_ORDER};

/// Route token for the recent window. It names the window, not its
/// length: `dashboard.recent_days` decides how many days it covers.
pub const RECENT_VIEW: &str = "30days";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewWindow {
    Recent(u32),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    Newest,
    Oldest,
    #[default]
    Unspecified,
}

impl SortOrder {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "newest" => SortOrder::Newest,
            "oldest" => SortOrder::Oldest,
            _ => SortOrder::Unspecified,
        }
    }

    pub fn as_str(self) -> Option<&'static str> {
        match self {
            SortOrder::Newest => Some("newest"),
            SortOrder::Oldest => Some("oldest"),
            SortOrder::Unspecified => None,
        }
    }

    pub fn menu_label(self) -> &'static str {
        match self {
            SortOrder::Newest => "Sort by newest first",
            SortOrder::Oldest => "Sort by oldest first",
            SortOrder::Unspecified => "Server order",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewSelection {
    pub window: ViewWindow,
    pub sort: SortOrder,
}

impl ViewSelection {
    pub fn recent(days: u32) -> Self {
        Self {
            window: ViewWindow::Recent(days),
            sort: SortOrder::Unspecified,
        }
    }

    pub fn all(sort: SortOrder) -> Self {
        Self {
            window: ViewWindow::All,
            sort,
        }
    }

    /// Parse `view` / `sort` query parameters. Anything other than
    /// `view=all` selects the recent window.
    pub fn from_query<K, V>(pairs: &[(K, V)], recent_days: u32) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let lookup = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k.as_ref() == key)
                .map(|(_, v)| v.as_ref().to_string())
        };
        let window = match lookup("view").as_deref() {
            Some("all") => ViewWindow::All,
            _ => ViewWindow::Recent(recent_days),
        };
        let sort = lookup("sort")
            .map(|value| SortOrder::parse(&value))
            .unwrap_or_default();
        Self { window, sort }
    }

    pub fn to_query(self) -> Vec<(&'static str, &'static str)> {
        let mut out = Vec::new();
        match self.window {
            ViewWindow::All => out.push(("view", "all")),
            ViewWindow::Recent(_) => out.push(("view", RECENT_VIEW)),
        }
        if let Some(sort) = self.sort.as_str() {
            out.push(("sort", sort));
        }
        out
    }

    /// Toggle between the recent window and all records. Going back to the
    /// recent window drops any sort.
    pub fn toggle_window(self, recent_days: u32) -> Self {
        match self.window {
            ViewWindow::All => Self::recent(recent_days),
            ViewWindow::Recent(_) => Self::all(self.sort),
        }
    }

    /// Cycle the sort; only has an effect on the all-records window.
    pub fn toggle_sort(self) -> Self {
        if self.window != ViewWindow::All {
            return self;
        }
        let sort = match self.sort {
            SortOrder::Oldest => SortOrder::Newest,
            _ => SortOrder::Oldest,
        };
        Self { sort, ..self }
    }

    pub fn summary(self, count: usize) -> String {
        let base = match self.window {
            ViewWindow::Recent(days) => format!("Showing records from the last {days} days"),
            ViewWindow::All => "Showing all records".to_string(),
        };
        match count {
            0 => base,
            1 => format!("{base} (1 record)"),
            n => format!("{base} ({n} records)"),
        }
    }

    pub fn toggle_label(self, recent_days: u32) -> String {
        match self.window {
            ViewWindow::Recent(_) => "Show all records".to_string(),
            ViewWindow::All => format!("Last {recent_days} days"),
        }
    }

    /// Backend query for this selection as of `today`.
    pub fn query(self, today: NaiveDate) -> TaskQuery {
        let since = match self.window {
            ViewWindow::All => None,
            ViewWindow::Recent(days) => today.checked_sub_signed(Duration::days(i64::from(days))),
        };
        TaskQuery { since }
    }
}

/// What the gateway fetches: every row, newest deployment first, optionally
/// limited to deployments on or after `since`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskQuery {
    pub since: Option<NaiveDate>,
}

/// Indices of `rows` in display order. Server order is kept unless the
/// window is all records with a sort chosen; the sort is stable and
/// missing dates count as the epoch.
pub fn display_order(rows: &[TaskRecord], selection: ViewSelection) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    if selection.window != ViewWindow::All || rows.is_empty() {
        return order;
    }
    let key = |idx: &usize| format::timestamp_key(rows[*idx].value(TaskField::DeploymentDate));
    match selection.sort {
        SortOrder::Unspecified => {}
        SortOrder::Newest => order.sort_by_key(|idx| std::cmp::Reverse(key(idx))),
        SortOrder::Oldest => order.sort_by_key(key),
    }
    order
}

/// Columns to show: the canonical order filtered to what the first row
/// carries, never the audit stamps. With no rows, the eleven form fields.
pub fn display_columns(rows: &[TaskRecord]) -> Vec<Column> {
    let Some(first) = rows.first() else {
        return TaskField::ALL.into_iter().map(Column::Field).collect();
    };
    COLUMN_ORDER
        .into_iter()
        .filter(|column| !column.is_secondary() && first.has_column(column.name()))
        .collect()
}

#[derive(Debug, Default)]
struct OrderCache {
    key: Option<(u64, ViewSelection)>,
    order: Vec<usize>,
    hits: u64,
    misses: u64,
}

/// Loaded rows plus memoized display order and columns.
#[derive(Debug)]
pub struct TaskListView {
    rows: Vec<TaskRecord>,
    columns: Vec<Column>,
    generation: u64,
    selection: ViewSelection,
    cache: OrderCache,
}

impl TaskListView {
    pub fn new(selection: ViewSelection) -> Self {
        Self {
            rows: Vec::new(),
            columns: display_columns(&[]),
            generation: 0,
            selection,
            cache: OrderCache::default(),
        }
    }

    pub fn replace_rows(&mut self, rows: Vec<TaskRecord>) {
        self.columns = display_columns(&rows);
        self.rows = rows;
        self.generation += 1;
    }

    pub fn rows(&self) -> &[TaskRecord] {
        &self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn selection(&self) -> ViewSelection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: ViewSelection) {
        self.selection = selection;
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Display order, recomputed only when rows or selection changed.
    pub fn order(&mut self) -> &[usize] {
        let key = (self.generation, self.selection);
        if self.cache.key == Some(key) {
            self.cache.hits += 1;
        } else {
            self.cache.misses += 1;
            self.cache.order = display_order(&self.rows, self.selection);
            self.cache.key = Some(key);
        }
        &self.cache.order
    }

    /// Row at a display position.
    pub fn row_at(&mut self, position: usize) -> Option<&TaskRecord> {
        let idx = *self.order().get(position)?;
        self.rows.get(idx)
    }

    pub fn cache_stats(&self) -> (u64, u64) {
        (self.cache.hits, self.cache.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rows(dates: &[Option<&str>]) -> Vec<TaskRecord> {
        dates
            .iter()
            .enumerate()
            .map(|(idx, date)| {
                let row = json!({
                    "id": idx,
                    "project": format!("p{idx}"),
                    "deployment_date": date,
                    "created_at": "2024-01-01T00:00:00",
                });
                match row {
                    Value::Object(map) => TaskRecord::from_row(&map).expect("record"),
                    _ => unreachable!(),
                }
            })
            .collect()
    }

    fn ordered_dates(rows: &[TaskRecord], selection: ViewSelection) -> Vec<Option<String>> {
        display_order(rows, selection)
            .into_iter()
            .map(|idx| rows[idx].value(TaskField::DeploymentDate).map(str::to_string))
            .collect()
    }

    #[test]
    fn all_newest_and_oldest_sort_by_date() {
        let rows = rows(&[Some("2024-01-10"), Some("2024-03-01"), None]);
        assert_eq!(
            ordered_dates(&rows, ViewSelection::all(SortOrder::Newest)),
            vec![
                Some("2024-03-01".to_string()),
                Some("2024-01-10".to_string()),
                None
            ]
        );
        assert_eq!(
            ordered_dates(&rows, ViewSelection::all(SortOrder::Oldest)),
            vec![
                None,
                Some("2024-01-10".to_string()),
                Some("2024-03-01".to_string())
            ]
        );
    }

    #[test]
    fn recent_window_and_unspecified_sort_keep_server_order() {
        let rows = rows(&[Some("2024-01-10"), Some("2024-03-01"), None]);
        let mut recent = ViewSelection::recent(30);
        assert_eq!(display_order(&rows, recent), vec![0, 1, 2]);
        recent.sort = SortOrder::Newest;
        assert_eq!(display_order(&rows, recent), vec![0, 1, 2]);
        assert_eq!(
            display_order(&rows, ViewSelection::all(SortOrder::Unspecified)),
            vec![0, 1, 2]
        );
        assert!(display_order(&[], ViewSelection::all(SortOrder::Newest)).is_empty());
    }

    #[test]
    fn sort_is_stable_for_equal_dates() {
        let rows = rows(&[Some("2024-01-10"), None, Some("2024-01-10"), Some("bad")]);
        assert_eq!(
            display_order(&rows, ViewSelection::all(SortOrder::Newest)),
            vec![0, 2, 1, 3]
        );
        assert_eq!(
            display_order(&rows, ViewSelection::all(SortOrder::Oldest)),
            vec![1, 3, 0, 2]
        );
    }

    #[test]
    fn query_parsing_defaults_to_recent() {
        let recent = ViewSelection::from_query(&[("sort", "newest")], 30);
        assert_eq!(recent.window, ViewWindow::Recent(30));
        let all = ViewSelection::from_query(&[("view", "all"), ("sort", "oldest")], 30);
        assert_eq!(all, ViewSelection::all(SortOrder::Oldest));
        let junk = ViewSelection::from_query(&[("view", "all"), ("sort", "sideways")], 30);
        assert_eq!(junk.sort, SortOrder::Unspecified);
        assert_eq!(all.to_query(), vec![("view", "all"), ("sort", "oldest")]);
    }

    #[test]
    fn recent_route_token_round_trips_any_window_length() {
        let week = ViewSelection::recent(7);
        assert_eq!(week.to_query(), vec![("view", RECENT_VIEW)]);
        let back = ViewSelection::from_query(&week.to_query(), 7);
        assert_eq!(back, week);
        assert_eq!(back.summary(0), "Showing records from the last 7 days");
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).expect("date");
        assert_eq!(back.query(today).since, NaiveDate::from_ymd_opt(2024, 3, 8));
    }

    #[test]
    fn toggles_move_between_windows_and_sorts() {
        let recent = ViewSelection::recent(30);
        assert_eq!(recent.toggle_sort(), recent);
        let all = recent.toggle_window(30);
        assert_eq!(all.window, ViewWindow::All);
        let oldest = all.toggle_sort();
        assert_eq!(oldest.sort, SortOrder::Oldest);
        assert_eq!(oldest.toggle_sort().sort, SortOrder::Newest);
        assert_eq!(oldest.toggle_window(30), ViewSelection::recent(30));
    }

    #[test]
    fn summary_mentions_count() {
        assert_eq!(
            ViewSelection::recent(30).summary(0),
            "Showing records from the last 30 days"
        );
        assert_eq!(
            ViewSelection::all(SortOrder::Unspecified).summary(1),
            "Showing all records (1 record)"
        );
        assert_eq!(
            ViewSelection::all(SortOrder::Unspecified).summary(3),
            "Showing all records (3 records)"
        );
    }

    #[test]
    fn query_window_uses_cutoff() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).expect("date");
        let query = ViewSelection::recent(30).query(today);
        assert_eq!(query.since, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(ViewSelection::all(SortOrder::Newest).query(today).since, None);
    }

    #[test]
    fn display_columns_follow_first_row() {
        let rows = rows(&[Some("2024-01-10")]);
        assert_eq!(
            display_columns(&rows),
            vec![
                Column::Field(TaskField::Project),
                Column::Field(TaskField::DeploymentDate)
            ]
        );
        assert_eq!(display_columns(&[]).len(), 11);
    }

    #[test]
    fn list_view_recomputes_only_on_change() {
        let mut view = TaskListView::new(ViewSelection::all(SortOrder::Newest));
        view.replace_rows(rows(&[Some("2024-01-10"), Some("2024-03-01")]));
        assert_eq!(view.order(), &[1, 0]);
        assert_eq!(view.order(), &[1, 0]);
        assert_eq!(view.cache_stats(), (1, 1));

        view.set_selection(ViewSelection::all(SortOrder::Oldest));
        assert_eq!(view.order(), &[0, 1]);
        assert_eq!(view.cache_stats(), (1, 2));

        view.replace_rows(rows(&[None]));
        assert_eq!(view.order(), &[0]);
        assert_eq!(view.cache_stats(), (1, 3));
        assert_eq!(view.row_at(0).map(|row| row.id.as_str()), Some("0"));
    }
}
