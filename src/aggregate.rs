//! Group-by reductions over filtered records
//!
//! Every function here runs a single pass over its input and fails the whole
//! batch with [`PipelineError::MalformedRecord`] as soon as a record lacks the
//! group key or carries a non-numeric reduce field. Partial sums are never
//! returned.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::record::{sales, Record};

/// Reduced values for one group key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub total: f64,
    pub count: usize,
}

/// Groups in first-encounter order unless explicitly sorted
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregationResult {
    groups: Vec<GroupSummary>,
}

impl AggregationResult {
    pub fn groups(&self) -> &[GroupSummary] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<GroupSummary> {
        self.groups
    }

    pub fn get(&self, key: &str) -> Option<&GroupSummary> {
        self.groups.iter().find(|g| g.key == key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Sum of all group totals
    pub fn grand_total(&self) -> f64 {
        self.groups.iter().map(|g| g.total).sum()
    }

    /// Groups ordered by total, descending. Ties keep encounter order.
    pub fn sorted(mut self) -> Self {
        self.groups.sort_by(|a, b| b.total.total_cmp(&a.total));
        self
    }

    /// Groups ordered by record count, descending. Ties keep encounter order.
    pub fn sorted_by_count(mut self) -> Self {
        self.groups.sort_by(|a, b| b.count.cmp(&a.count));
        self
    }

    /// The first `n` groups of the descending-total order
    pub fn top_n(self, n: usize) -> Self {
        let mut sorted = self.sorted();
        sorted.groups.truncate(n);
        sorted
    }
}

/// Sum and count `reduce_field` per value of `group_field` in one pass
pub fn aggregate(
    records: &[Record],
    group_field: &str,
    reduce_field: &str,
) -> Result<AggregationResult> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<GroupSummary> = Vec::new();

    for record in records {
        let key = record.require_key(group_field)?;
        let value = record.require_number(reduce_field)?;
        match index.get(&key) {
            Some(&i) => {
                groups[i].total += value;
                groups[i].count += 1;
            }
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(GroupSummary {
                    key,
                    total: value,
                    count: 1,
                });
            }
        }
    }

    debug!(
        "Aggregated {} records into {} groups by '{}' over '{}'",
        records.len(),
        groups.len(),
        group_field,
        reduce_field
    );

    Ok(AggregationResult { groups })
}

/// Whole-dataset headline figures
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SalesTotals {
    pub revenue: f64,
    pub count: usize,
}

pub fn sales_totals(records: &[Record]) -> Result<SalesTotals> {
    let revenue = records
        .iter()
        .map(|r| r.require_number(sales::PRICE))
        .sum::<Result<f64>>()?;
    Ok(SalesTotals {
        revenue,
        count: records.len(),
    })
}

/// Revenue of one purchase location together with its map coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRevenue {
    pub location: String,
    pub lat: f64,
    pub lon: f64,
    pub revenue: f64,
}

/// Revenue per purchase location, descending, carrying the first-seen coordinates
pub fn revenue_by_location(records: &[Record]) -> Result<Vec<LocationRevenue>> {
    let mut coordinates: HashMap<String, (f64, f64)> = HashMap::new();
    for record in records {
        let key = record.require_key(sales::LOCATION)?;
        if !coordinates.contains_key(&key) {
            let lat = record.require_number(sales::LAT)?;
            let lon = record.require_number(sales::LON)?;
            coordinates.insert(key, (lat, lon));
        }
    }

    aggregate(records, sales::LOCATION, sales::PRICE)?
        .sorted()
        .into_groups()
        .into_iter()
        .map(|g| {
            let (lat, lon) = coordinates
                .get(&g.key)
                .copied()
                .ok_or_else(|| PipelineError::malformed(sales::LAT))?;
            Ok(LocationRevenue {
                location: g.key,
                lat,
                lon,
                revenue: g.total,
            })
        })
        .collect()
}

/// Revenue per product category, descending
pub fn revenue_by_category(records: &[Record]) -> Result<AggregationResult> {
    Ok(aggregate(records, sales::CATEGORY, sales::PRICE)?.sorted())
}

/// Revenue and sale count per seller
pub fn seller_summary(records: &[Record]) -> Result<AggregationResult> {
    aggregate(records, sales::SELLER, sales::PRICE)
}

/// Revenue of one calendar month, keyed by the month's last day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub month_end: NaiveDate,
    pub year: i32,
    pub month: String,
    pub revenue: f64,
}

/// Last calendar day of the month containing `date`
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first_of_next| first_of_next - Duration::days(1))
        .unwrap_or(NaiveDate::MAX)
}

/// Revenue bucketed by calendar month.
///
/// Buckets cover every month from the earliest to the latest purchase, in
/// chronological order; months without sales carry zero revenue so the series
/// has no gaps.
pub fn monthly_revenue(records: &[Record]) -> Result<Vec<MonthlyRevenue>> {
    let mut sums: HashMap<NaiveDate, f64> = HashMap::new();
    for record in records {
        let date = record
            .date(sales::PURCHASE_DATE)
            .ok_or_else(|| PipelineError::malformed(sales::PURCHASE_DATE))?;
        let price = record.require_number(sales::PRICE)?;
        *sums.entry(month_end(date)).or_insert(0.0) += price;
    }

    let (Some(&first), Some(&last)) = (sums.keys().min(), sums.keys().max()) else {
        return Ok(Vec::new());
    };

    let mut buckets = Vec::new();
    let mut current = first;
    while current <= last {
        buckets.push(MonthlyRevenue {
            month_end: current,
            year: current.year(),
            month: current.format("%B").to_string(),
            revenue: sums.get(&current).copied().unwrap_or(0.0),
        });
        let Some(next) = current.checked_add_signed(Duration::days(1)) else {
            break;
        };
        current = month_end(next);
    }

    debug!("Bucketed {} records into {} months", records.len(), buckets.len());
    Ok(buckets)
}
