//! Load → filter → aggregate runs
//!
//! Each run loads a fresh record set and fails before any aggregation when
//! the source is unavailable. Nothing is carried over between runs.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::info;

use crate::aggregate::{
    monthly_revenue, revenue_by_category, revenue_by_location, sales_totals, seller_summary,
};
use crate::allocation::{allocate_per_user, allocate_per_user_day, Roster};
use crate::error::Result;
use crate::filter::{self, DeliveryWindow, FilterSpec};
use crate::format::UnitScale;
use crate::record::{select_columns, Record};
use crate::report::{RawReport, SalesReport, TaskReport};
use crate::source::RecordSource;

/// Presentation knobs of the sales report
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub top_n: usize,
    pub currency_prefix: String,
    pub scale: UnitScale,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_n: 5,
            currency_prefix: "R$".to_string(),
            scale: UnitScale::default(),
        }
    }
}

/// Load every record and keep those passing `spec`
pub async fn load_filtered(source: &dyn RecordSource, spec: &FilterSpec) -> Result<Vec<Record>> {
    let records = source.load().await?;
    Ok(filter::apply(&records, spec))
}

/// Aggregate an already-filtered sales record set
pub fn build_sales_report(records: &[Record], options: &ReportOptions) -> Result<SalesReport> {
    let totals = sales_totals(records)?;

    let mut by_location = revenue_by_location(records)?;
    by_location.truncate(options.top_n);

    let sellers = seller_summary(records)?;
    let mut sellers_by_count = sellers.clone().sorted_by_count().into_groups();
    sellers_by_count.truncate(options.top_n);

    Ok(SalesReport {
        revenue: options
            .scale
            .format(totals.revenue, &options.currency_prefix)?,
        sales_count: options.scale.format(totals.count as f64, "")?,
        totals,
        by_location,
        monthly: monthly_revenue(records)?,
        by_category: revenue_by_category(records)?
            .top_n(options.top_n)
            .into_groups(),
        sellers_by_revenue: sellers.top_n(options.top_n).into_groups(),
        sellers_by_count,
    })
}

pub async fn run_sales(
    source: &dyn RecordSource,
    spec: &FilterSpec,
    options: &ReportOptions,
) -> Result<SalesReport> {
    let records = load_filtered(source, spec).await?;
    info!("Building sales report from {} records", records.len());
    build_sales_report(&records, options)
}

/// Filtered records, optionally projected onto `columns`.
///
/// The column count describes the loaded dataset, so it stays put when the
/// filter leaves no rows.
pub async fn run_raw(
    source: &dyn RecordSource,
    spec: &FilterSpec,
    columns: Option<&[String]>,
) -> Result<RawReport> {
    let records = source.load().await?;
    let loaded: BTreeSet<&str> = records.iter().flat_map(|r| r.columns()).collect();
    let column_count = match columns {
        Some(columns) => columns
            .iter()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .intersection(&loaded)
            .count(),
        None => loaded.len(),
    };

    let filtered = filter::apply(&records, spec);
    let rows = match columns {
        Some(columns) => select_columns(&filtered, columns),
        None => filtered,
    };

    Ok(RawReport {
        row_count: rows.len(),
        column_count,
        rows,
    })
}

pub async fn run_tasks(
    source: &dyn RecordSource,
    window: &DeliveryWindow,
    today: NaiveDate,
    roster: &Roster,
    by_day: bool,
) -> Result<TaskReport> {
    let tasks = load_filtered(source, &window.to_spec(today)).await?;
    let allocations = if by_day {
        allocate_per_user_day(&tasks, roster)?
    } else {
        allocate_per_user(&tasks, roster)?
    };
    info!(
        "Allocated {} tasks across {} rows ({:?})",
        tasks.len(),
        allocations.len(),
        window
    );
    Ok(TaskReport { tasks, allocations })
}
