//! Pure predicate filtering over record sets
//!
//! A [`FilterSpec`] is a conjunction of field predicates. Applying it never
//! touches the input records; the survivors are copied into a new vector in
//! their original order, so applying the same spec twice is a no-op.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::record::{sales, tasks, Record, Value};

/// A single field predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Closed numeric range `[lo, hi]`
    Range { field: String, lo: f64, hi: f64 },
    /// Membership against an allow-list. An empty list matches nothing.
    OneOf { field: String, allowed: Vec<String> },
    /// Exact value equality
    Equals { field: String, value: Value },
    /// Closed date range `[start, end]`
    DateRange {
        field: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl Predicate {
    /// Check if a record satisfies this predicate (pure predicate).
    ///
    /// A record missing the field, or holding a value of another kind, fails.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::Range { field, lo, hi } => record
                .number(field)
                .is_some_and(|n| *lo <= n && n <= *hi),
            Predicate::OneOf { field, allowed } => record
                .get(field)
                .map(ToString::to_string)
                .is_some_and(|key| allowed.iter().any(|a| *a == key)),
            Predicate::Equals { field, value } => record.get(field) == Some(value),
            Predicate::DateRange { field, start, end } => record
                .date(field)
                .is_some_and(|d| *start <= d && d <= *end),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Predicate::Range { field, .. }
            | Predicate::OneOf { field, .. }
            | Predicate::Equals { field, .. }
            | Predicate::DateRange { field, .. } => field,
        }
    }
}

/// Conjunction of predicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    predicates: Vec<Predicate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn range(self, field: impl Into<String>, lo: f64, hi: f64) -> Self {
        self.with(Predicate::Range {
            field: field.into(),
            lo,
            hi,
        })
    }

    pub fn one_of<I, S>(self, field: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(Predicate::OneOf {
            field: field.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        })
    }

    pub fn equals(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(Predicate::Equals {
            field: field.into(),
            value: value.into(),
        })
    }

    pub fn date_range(self, field: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        self.with(Predicate::DateRange {
            field: field.into(),
            start,
            end,
        })
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// A record passes iff every predicate holds
    pub fn matches(&self, record: &Record) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }
}

/// Select the records passing `spec`, preserving input order
pub fn apply(records: &[Record], spec: &FilterSpec) -> Vec<Record> {
    let kept: Vec<Record> = records
        .iter()
        .filter(|r| spec.matches(r))
        .cloned()
        .collect();
    debug!(
        "Filter kept {} of {} records ({} predicates)",
        kept.len(),
        records.len(),
        spec.predicates.len()
    );
    kept
}

/// Sidebar selections of the raw-data page.
///
/// `None` means "no selection made", which the page treats as all values
/// selected, so no predicate is emitted for it. `Some(vec![])` is an explicit
/// empty selection and rejects every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesFilter {
    pub products: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub price: Option<(f64, f64)>,
    pub freight: Option<(f64, f64)>,
    pub purchase_dates: Option<(NaiveDate, NaiveDate)>,
    pub sellers: Option<Vec<String>>,
    pub locations: Option<Vec<String>>,
    pub rating: Option<(f64, f64)>,
    pub payment_types: Option<Vec<String>>,
    pub installments: Option<(f64, f64)>,
}

impl SalesFilter {
    pub fn to_spec(&self) -> FilterSpec {
        let mut spec = FilterSpec::new();

        let memberships = [
            (sales::PRODUCT, &self.products),
            (sales::CATEGORY, &self.categories),
            (sales::SELLER, &self.sellers),
            (sales::LOCATION, &self.locations),
            (sales::PAYMENT_TYPE, &self.payment_types),
        ];
        for (field, selection) in memberships {
            if let Some(allowed) = selection {
                spec = spec.one_of(field, allowed.iter().cloned());
            }
        }

        let ranges = [
            (sales::PRICE, self.price),
            (sales::FREIGHT, self.freight),
            (sales::RATING, self.rating),
            (sales::INSTALLMENTS, self.installments),
        ];
        for (field, bounds) in ranges {
            if let Some((lo, hi)) = bounds {
                spec = spec.range(field, lo, hi);
            }
        }

        if let Some((start, end)) = self.purchase_dates {
            spec = spec.date_range(sales::PURCHASE_DATE, start, end);
        }

        spec
    }
}

/// Delivery-date selector of the task page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryWindow {
    Today,
    Tomorrow,
    /// Strictly after tomorrow
    Future,
    /// Inclusive range from the first two dates; fewer than two means no filtering
    Custom(Vec<NaiveDate>),
    All,
}

impl DeliveryWindow {
    /// Predicate selecting this window relative to `today`, or `None` for pass-through
    pub fn predicate(&self, today: NaiveDate) -> Option<Predicate> {
        let field = tasks::DELIVERY.to_string();
        let tomorrow = today + Duration::days(1);
        match self {
            DeliveryWindow::Today => Some(Predicate::Equals {
                field,
                value: Value::Date(today),
            }),
            DeliveryWindow::Tomorrow => Some(Predicate::Equals {
                field,
                value: Value::Date(tomorrow),
            }),
            DeliveryWindow::Future => Some(Predicate::DateRange {
                field,
                start: tomorrow + Duration::days(1),
                end: NaiveDate::MAX,
            }),
            DeliveryWindow::Custom(dates) if dates.len() >= 2 => Some(Predicate::DateRange {
                field,
                start: dates[0],
                end: dates[1],
            }),
            DeliveryWindow::Custom(_) | DeliveryWindow::All => None,
        }
    }

    pub fn to_spec(&self, today: NaiveDate) -> FilterSpec {
        match self.predicate(today) {
            Some(p) => FilterSpec::new().with(p),
            None => FilterSpec::new(),
        }
    }
}

impl FromStr for DeliveryWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "today" => Ok(DeliveryWindow::Today),
            "tomorrow" => Ok(DeliveryWindow::Tomorrow),
            "future" => Ok(DeliveryWindow::Future),
            "custom" => Ok(DeliveryWindow::Custom(Vec::new())),
            "all" => Ok(DeliveryWindow::All),
            other => Err(format!(
                "unknown delivery window '{other}' (expected today, tomorrow, future, custom or all)"
            )),
        }
    }
}

/// Parse a closed range written as `LO..HI`
pub fn parse_bounds(s: &str) -> Result<(f64, f64), String> {
    let (lo, hi) = s
        .split_once("..")
        .ok_or_else(|| format!("expected LO..HI, got '{s}'"))?;
    let lo: f64 = lo
        .trim()
        .parse()
        .map_err(|_| format!("invalid lower bound '{lo}'"))?;
    let hi: f64 = hi
        .trim()
        .parse()
        .map_err(|_| format!("invalid upper bound '{hi}'"))?;
    if lo > hi {
        return Err(format!("lower bound {lo} exceeds upper bound {hi}"));
    }
    Ok((lo, hi))
}
