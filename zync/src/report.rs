//! Run report: fixed-column table, totals and the notification subject
//!
//! Only Directory outcomes produce data rows. A Group or Server whose
//! operation failed adds one summary row standing for its omitted subtree.

use serde::Serialize;
use std::time::Duration;

use crate::constants::report::{CELL_ERROR, DELIMITER_WIDTH};
use crate::engine::{NodePath, OperationOutcome, OutcomeStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    pub width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLayout {
    pub path_width: usize,
    pub columns: Vec<Column>,
}

impl ReportLayout {
    pub fn new(path_width: usize, columns: &[(&'static str, usize)]) -> Self {
        Self {
            path_width,
            columns: columns
                .iter()
                .map(|&(title, width)| Column {
                    title,
                    width: width.max(title.len()),
                })
                .collect(),
        }
    }

    fn format_row(&self, path: &str, cells: &[String]) -> String {
        let mut line = format!("{:<width$} |", path, width = self.path_width);
        for (index, column) in self.columns.iter().enumerate() {
            let cell = cells.get(index).map(String::as_str).unwrap_or("");
            line.push_str(&format!(" {:>width$} |", cell, width = column.width));
        }
        line.push('\n');
        line
    }

    fn header(&self) -> String {
        let titles: Vec<String> = self.columns.iter().map(|c| c.title.to_string()).collect();
        self.format_row("Path", &titles)
    }
}

/// Run-wide counters, owned by the aggregator for the whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunTotals {
    pub total_tasks: usize,
    pub ok_tasks: usize,
    pub warning_tasks: usize,
    pub skipped: usize,
    pub errors: usize,
    pub warnings: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub subject: String,
    pub body: String,
    pub totals: RunTotals,
}

impl Report {
    /// Subject, blank line, body; the layout of the report file
    pub fn to_text(&self) -> String {
        format!("{}\n\n{}", self.subject, self.body)
    }
}

pub struct ReportAggregator {
    title: String,
    layout: ReportLayout,
    table: String,
    error_messages: String,
    warning_messages: String,
    totals: RunTotals,
}

impl ReportAggregator {
    pub fn new(title: impl Into<String>, layout: ReportLayout) -> Self {
        Self {
            title: title.into(),
            layout,
            table: String::new(),
            error_messages: String::new(),
            warning_messages: String::new(),
            totals: RunTotals::default(),
        }
    }

    /// Record the outcome of one Directory.
    pub fn record_row(&mut self, path: &NodePath, outcome: OperationOutcome) {
        self.table
            .push_str(&self.layout.format_row(&path.to_string(), &outcome.cells));

        match outcome.status {
            OutcomeStatus::Ok => {
                self.totals.total_tasks += 1;
                self.totals.ok_tasks += 1;
            }
            OutcomeStatus::Warning => {
                self.totals.total_tasks += 1;
                self.totals.warning_tasks += 1;
                self.record_warning(format!("'{}': {}", path, outcome.message));
            }
            OutcomeStatus::Error => {
                self.record_error(format!("'{}': {}", path, outcome.message));
            }
            OutcomeStatus::Skipped => {
                self.totals.skipped += 1;
            }
        }

        if let Some(metrics) = &outcome.metrics {
            self.totals.bytes += metrics.bytes.unwrap_or(0);
            self.totals.elapsed += metrics.duration.unwrap_or_default();
        }
    }

    /// One row standing for a Group/Server subtree that was not visited
    pub fn record_subtree_row(&mut self, path: &NodePath) {
        let cells = vec![CELL_ERROR.to_string(); self.layout.columns.len()];
        let label = format!("{}/*", path);
        self.table.push_str(&self.layout.format_row(&label, &cells));
    }

    pub fn record_warning(&mut self, message: impl AsRef<str>) {
        self.totals.warnings += 1;
        self.warning_messages
            .push_str(&format!("  WARN: {}\n", message.as_ref().trim_end()));
    }

    /// An error always stands for one failed task.
    pub fn record_error(&mut self, message: impl AsRef<str>) {
        self.totals.errors += 1;
        self.totals.total_tasks += 1;
        self.error_messages
            .push_str(&format!("  ERROR: {}\n", message.as_ref().trim_end()));
    }

    pub fn totals(&self) -> &RunTotals {
        &self.totals
    }

    /// Build the subject and body. Consumes the aggregator, so it runs once.
    pub fn finalize(self, hostname: &str, scope: &str) -> Report {
        let subject = format!(
            "{} {}/{}: err/warn/total = {}/{}/{}",
            self.title,
            hostname.to_uppercase(),
            scope.to_uppercase(),
            self.totals.errors,
            self.totals.warnings,
            self.totals.total_tasks
        );

        let mut body = self.layout.header();
        body.push_str(&"-".repeat(DELIMITER_WIDTH));
        body.push('\n');
        body.push_str(&self.table);
        body.push_str(&delimiter());
        body.push_str(&self.error_messages);
        body.push_str(&delimiter());
        body.push_str(&self.warning_messages);

        Report {
            subject,
            body,
            totals: self.totals,
        }
    }
}

fn delimiter() -> String {
    format!("\n{}\n", "-".repeat(DELIMITER_WIDTH))
}

/// Kilobytes with thousands separators, truncated to one decimal
pub fn format_kb(bytes: u64) -> String {
    let tenths = u128::from(bytes) * 10 / 1024;
    let whole = (tenths / 10).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}.{}", grouped, tenths % 10)
}

pub fn format_minutes(duration: Duration) -> String {
    format!("{:.2}", duration.as_secs_f64() / 60.0)
}
