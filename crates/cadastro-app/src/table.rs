// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{RecordStatus, SortDirection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    OptionalInteger(Option<i64>),
    Date(Option<Date>),
    Status(RecordStatus),
}

impl CellValue {
    pub fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::OptionalInteger(Some(value)) => value.to_string(),
            Self::OptionalInteger(None) => String::new(),
            Self::Date(Some(value)) => value.to_string(),
            Self::Date(None) => String::new(),
            Self::Status(status) => status.label().to_owned(),
        }
    }

    fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Integer(left), Self::Integer(right)) => left.cmp(right),
            (Self::OptionalInteger(left), Self::OptionalInteger(right)) => left.cmp(right),
            (Self::Date(left), Self::Date(right)) => left.cmp(right),
            (Self::Status(left), Self::Status(right)) => {
                left.as_str().cmp(right.as_str())
            }
            (Self::Text(left), Self::Text(right)) => {
                left.to_lowercase().cmp(&right.to_lowercase())
            }
            _ => self
                .display()
                .to_lowercase()
                .cmp(&other.display().to_lowercase()),
        }
    }
}

/// One table row with its filterable and sortable fields. Status is carried
/// explicitly; it is never recovered from rendered cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRecord {
    pub id: i64,
    pub cells: Vec<CellValue>,
    pub status: RecordStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    pub const fn matches(self, status: RecordStatus) -> bool {
        match self {
            Self::All => true,
            Self::Active => status.is_active(),
            Self::Inactive => !status.is_active(),
        }
    }

    pub const fn cycled(self) -> Self {
        match self {
            Self::All => Self::Active,
            Self::Active => Self::Inactive,
            Self::Inactive => Self::All,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: usize,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub query: String,
    pub status: StatusFilter,
    pub sort: Option<SortSpec>,
    pub page_size: usize,
    pub page: usize,
}

impl FilterState {
    pub fn new(page_size: usize) -> Self {
        Self {
            query: String::new(),
            status: StatusFilter::All,
            sort: None,
            page_size: page_size.max(1),
            page: 1,
        }
    }
}

/// The derived view: indices into the source rows for the current page,
/// plus the totals the counter and pager controls need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub visible: Vec<usize>,
    pub total_matched: usize,
    pub total_pages: usize,
    pub page: usize,
}

impl PageView {
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Pure function of (rows, filter): text and status predicates compose by
/// AND, sort applies after filtering and is stable, the requested page is
/// clamped into range. No state survives between calls.
pub fn compute_view(rows: &[RowRecord], filter: &FilterState, searchable: &[usize]) -> PageView {
    let needle = filter.query.trim().to_lowercase();
    let mut matched: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row_matches(row, &needle, filter.status, searchable))
        .map(|(index, _)| index)
        .collect();

    if let Some(sort) = filter.sort {
        matched.sort_by(|&left, &right| {
            let ordering = match (
                rows[left].cells.get(sort.column),
                rows[right].cells.get(sort.column),
            ) {
                (Some(left_cell), Some(right_cell)) => left_cell.cmp_value(right_cell),
                _ => Ordering::Equal,
            };
            match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }

    let total_matched = matched.len();
    let page_size = filter.page_size.max(1);
    let total_pages = total_matched.div_ceil(page_size);
    let page = filter.page.clamp(1, total_pages.max(1));
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_matched);
    let visible = if start < total_matched {
        matched[start..end].to_vec()
    } else {
        Vec::new()
    };

    PageView {
        visible,
        total_matched,
        total_pages,
        page,
    }
}

fn row_matches(
    row: &RowRecord,
    needle: &str,
    status: StatusFilter,
    searchable: &[usize],
) -> bool {
    if !status.matches(row.status) {
        return false;
    }
    if needle.is_empty() {
        return true;
    }
    searchable.iter().any(|&column| {
        row.cells
            .get(column)
            .is_some_and(|cell| cell.display().to_lowercase().contains(needle))
    })
}

/// Owns one tab's row snapshot and filter state, constructed once per
/// snapshot load. Query and status changes reset to page 1; sort changes
/// keep the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableController {
    rows: Vec<RowRecord>,
    searchable: Vec<usize>,
    filter: FilterState,
}

impl TableController {
    pub fn new(rows: Vec<RowRecord>, searchable: Vec<usize>, page_size: usize) -> Self {
        Self {
            rows,
            searchable,
            filter: FilterState::new(page_size),
        }
    }

    pub fn rows(&self) -> &[RowRecord] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&RowRecord> {
        self.rows.get(index)
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn view(&self) -> PageView {
        compute_view(&self.rows, &self.filter, &self.searchable)
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.query = query.into();
        self.filter.page = 1;
    }

    pub fn push_query_char(&mut self, ch: char) {
        self.filter.query.push(ch);
        self.filter.page = 1;
    }

    pub fn pop_query_char(&mut self) {
        self.filter.query.pop();
        self.filter.page = 1;
    }

    pub fn clear_query(&mut self) {
        self.filter.query.clear();
        self.filter.page = 1;
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.filter.status = status;
        self.filter.page = 1;
    }

    pub fn cycle_status(&mut self) -> StatusFilter {
        self.set_status(self.filter.status.cycled());
        self.filter.status
    }

    /// none -> asc -> desc -> none on the given column; switching columns
    /// starts at asc. The current page is deliberately preserved.
    pub fn cycle_sort(&mut self, column: usize) -> Option<SortSpec> {
        self.filter.sort = match self.filter.sort {
            Some(sort) if sort.column == column => match sort.direction {
                SortDirection::Asc => Some(SortSpec {
                    column,
                    direction: SortDirection::Desc,
                }),
                SortDirection::Desc => None,
            },
            _ => Some(SortSpec {
                column,
                direction: SortDirection::Asc,
            }),
        };
        self.filter.sort
    }

    pub fn clear_sort(&mut self) {
        self.filter.sort = None;
    }

    pub fn next_page(&mut self) -> bool {
        let view = self.view();
        if view.has_next() {
            self.filter.page = view.page + 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        let view = self.view();
        if view.has_prev() {
            self.filter.page = view.page - 1;
            true
        } else {
            false
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.filter.page = page.max(1);
    }

    /// Applies the status returned by a successful toggle to the one
    /// affected row, leaving every other row and the filter state intact.
    pub fn patch_status(&mut self, id: i64, status: RecordStatus) -> bool {
        let Some(row) = self.rows.iter_mut().find(|row| row.id == id) else {
            return false;
        };
        row.status = status;
        for cell in &mut row.cells {
            if let CellValue::Status(value) = cell {
                *value = status;
            }
        }
        true
    }

    pub fn remove_row(&mut self, id: i64) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        self.rows.len() != before
    }
}
