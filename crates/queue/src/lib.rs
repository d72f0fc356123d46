//! Work-queue construction over the tabular store.
//!
//! A key is eligible when its cell is non-empty and its status cell is still
//! unset, so finished work is never re-queued and interrupted runs resume
//! where they left off.

pub mod filter;

use keycheck_core::config::{ColumnsConfig, FilterConfig};
use keycheck_core::WorkItem;
use keycheck_storage::Dataset;
use tracing::debug;

pub use filter::should_check;

/// Derived column holding a key column's verification result.
pub fn status_column(key_column: &str) -> String {
    format!("{}_status", key_column)
}

/// Per-column counts, reported before the run starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnStats {
    pub column: String,
    /// Unverified, non-empty keys.
    pub eligible: usize,
    /// Eligible keys that also passed the filter column.
    pub selected: usize,
}

#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    pub columns: Vec<ColumnStats>,
}

impl QueueStats {
    pub fn total_selected(&self) -> usize {
        self.columns.iter().map(|c| c.selected).sum()
    }
}

/// Build the ordered work queue: dataset row order within a column, the
/// mandatory key column ahead of the optional second one.
pub fn build_queue(
    dataset: &Dataset,
    columns: &ColumnsConfig,
    filter: &FilterConfig,
) -> (Vec<WorkItem>, QueueStats) {
    let mut queue = Vec::new();
    let mut stats = QueueStats::default();

    let mut key_columns = vec![columns.key_column_1.as_str()];
    if columns.check_second_column && dataset.column_exists(&columns.key_column_2) {
        key_columns.push(columns.key_column_2.as_str());
    }

    for column in key_columns {
        let status_col = status_column(column);
        let mut col_stats = ColumnStats {
            column: column.to_string(),
            ..Default::default()
        };

        for row in 0..dataset.len() {
            let Some(key) = dataset.get(row, column) else {
                continue;
            };
            if dataset.get(row, &status_col).is_some() {
                continue; // already resolved, never overwritten
            }
            col_stats.eligible += 1;
            if !should_check(dataset, row, &columns.filter_column, &filter.truthy_tokens) {
                continue;
            }
            col_stats.selected += 1;
            queue.push(WorkItem {
                row,
                column: column.to_string(),
                key: key.to_string(),
            });
        }

        debug!(
            column,
            eligible = col_stats.eligible,
            selected = col_stats.selected,
            "queued column"
        );
        stats.columns.push(col_stats);
    }

    (queue, stats)
}
