//! Report values handed to the presenter, with plain-text rendering

use serde::Serialize;
use std::fmt;

use crate::aggregate::{GroupSummary, LocationRevenue, MonthlyRevenue, SalesTotals};
use crate::allocation::Allocation;
use crate::record::{tasks, Record};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReport {
    /// Total revenue, formatted with the currency prefix
    pub revenue: String,
    /// Number of sales, formatted
    pub sales_count: String,
    pub totals: SalesTotals,
    pub by_location: Vec<LocationRevenue>,
    pub monthly: Vec<MonthlyRevenue>,
    pub by_category: Vec<GroupSummary>,
    pub sellers_by_revenue: Vec<GroupSummary>,
    pub sellers_by_count: Vec<GroupSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawReport {
    pub row_count: usize,
    pub column_count: usize,
    pub rows: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub tasks: Vec<Record>,
    pub allocations: Vec<Allocation>,
}

fn write_groups(f: &mut fmt::Formatter<'_>, title: &str, groups: &[GroupSummary]) -> fmt::Result {
    writeln!(f, "\n{title}")?;
    for g in groups {
        writeln!(f, "  {:<32} {:>14.2} {:>6}", g.key, g.total, g.count)?;
    }
    Ok(())
}

impl fmt::Display for SalesReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Revenue:  {}", self.revenue)?;
        writeln!(f, "Sales:    {}", self.sales_count)?;

        writeln!(f, "\nRevenue by state")?;
        for l in &self.by_location {
            writeln!(
                f,
                "  {:<32} {:>14.2}  ({:.4}, {:.4})",
                l.location, l.revenue, l.lat, l.lon
            )?;
        }

        writeln!(f, "\nMonthly revenue")?;
        for m in &self.monthly {
            writeln!(f, "  {} {:<10} {:>14.2}", m.year, m.month, m.revenue)?;
        }

        write_groups(f, "Revenue by category", &self.by_category)?;
        write_groups(f, "Sellers by revenue", &self.sellers_by_revenue)?;
        write_groups(f, "Sellers by sales", &self.sellers_by_count)
    }
}

impl fmt::Display for RawReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            let cells: Vec<String> = row
                .columns()
                .filter_map(|c| row.get(c).map(|v| format!("{c}={v}")))
                .collect();
            writeln!(f, "{}", cells.join(" | "))?;
        }
        writeln!(
            f,
            "\nThe table has {} rows and {} columns",
            self.row_count, self.column_count
        )
    }
}

impl fmt::Display for TaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Allocated tasks and free time by user")?;
        for a in &self.allocations {
            let day = a
                .delivery
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            writeln!(
                f,
                "  {:<18} {:<10} hours {:>5.1} / {:>3.0}  free {:>5.1}  exceed {:>5.1}",
                a.user_id, day, a.allocated_hours, a.limit, a.free_time, a.exceed
            )?;
        }

        writeln!(f, "\nFiltered tasks")?;
        for t in &self.tasks {
            let cell = |field: &str| t.get(field).map(ToString::to_string).unwrap_or_default();
            writeln!(
                f,
                "  {:<18} {:<12} {:<14} {:>3} {}",
                cell(tasks::USER_ID),
                cell(tasks::ISSUE_KEY),
                cell(tasks::TASK),
                cell(tasks::HOURS),
                cell(tasks::DELIVERY)
            )?;
        }
        Ok(())
    }
}
