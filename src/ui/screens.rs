use std::cmp::min;
use std::collections::HashSet;

use crate::catalog::Catalog;
use crate::models::{Book, SearchField, SortKey};
use crate::report::{generate_report, Report};

/// Narrowing applied on top of the full catalog in the list view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ListFilter {
    All,
    Search { field: SearchField, query: String },
    Genre(String),
}

/// Snapshot of the rows shown in the book table plus the cursor.
pub(crate) struct BookListScreen {
    pub(crate) rows: Vec<Book>,
    pub(crate) filter: ListFilter,
    pub(crate) sort: SortKey,
    pub(crate) selected: usize,
}

impl BookListScreen {
    pub(crate) fn new(catalog: &Catalog) -> Self {
        let mut screen = Self {
            rows: Vec::new(),
            filter: ListFilter::All,
            sort: SortKey::default(),
            selected: 0,
        };
        screen.refresh(catalog);
        screen
    }

    /// Rebuild rows from the catalog. Filtered views keep the active sort.
    pub(crate) fn refresh(&mut self, catalog: &Catalog) {
        let keep: Option<HashSet<_>> = match &self.filter {
            ListFilter::All => None,
            ListFilter::Search { field, query } => Some(
                catalog
                    .search_field(*field, query)
                    .into_iter()
                    .map(|b| b.id)
                    .collect(),
            ),
            ListFilter::Genre(genre) => Some(
                catalog
                    .filter_by_genre(genre)
                    .into_iter()
                    .map(|b| b.id)
                    .collect(),
            ),
        };

        self.rows = catalog
            .sorted(self.sort)
            .filter(|b| keep.as_ref().map_or(true, |ids| ids.contains(&b.id)))
            .cloned()
            .collect();
        self.ensure_in_bounds();
    }

    pub(crate) fn set_filter(&mut self, filter: ListFilter, catalog: &Catalog) {
        self.filter = filter;
        self.selected = 0;
        self.refresh(catalog);
    }

    pub(crate) fn cycle_sort(&mut self, catalog: &Catalog) -> SortKey {
        self.sort = self.sort.next();
        self.refresh(catalog);
        self.sort
    }

    pub(crate) fn is_filtered(&self) -> bool {
        self.filter != ListFilter::All
    }

    /// Heading fragment describing the active filter.
    pub(crate) fn filter_label(&self) -> Option<String> {
        match &self.filter {
            ListFilter::All => None,
            ListFilter::Search { field, query } => {
                Some(format!("{field} contains \"{}\"", query.trim()))
            }
            ListFilter::Genre(genre) => Some(format!("genre = \"{}\"", genre.trim())),
        }
    }

    pub(crate) fn current_book(&self) -> Option<&Book> {
        self.rows.get(self.selected)
    }

    /// Place the cursor on a specific book if it is visible.
    pub(crate) fn select_id(&mut self, id: i64) {
        if let Some(idx) = self.rows.iter().position(|b| b.id == id) {
            self.selected = idx;
        }
    }

    pub(crate) fn move_selection(&mut self, delta: isize) {
        if self.rows.is_empty() {
            self.selected = 0;
            return;
        }
        let max = self.rows.len() as isize - 1;
        let next = (self.selected as isize + delta).clamp(0, max);
        self.selected = next as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }

    fn ensure_in_bounds(&mut self) {
        self.selected = min(self.selected, self.rows.len().saturating_sub(1));
    }
}

/// Statistics page. The report is computed when the screen opens.
pub(crate) struct ReportScreen {
    pub(crate) report: Report,
}

impl ReportScreen {
    pub(crate) fn new(catalog: &Catalog) -> Self {
        Self {
            report: generate_report(catalog),
        }
    }
}
