//! Per-user capacity accounting for task assignments

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::record::{tasks, Record};

/// Contract classification deciding the daily hour limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeType {
    #[default]
    Staff,
    Intern,
}

impl EmployeeType {
    pub fn daily_limit(self) -> f64 {
        match self {
            EmployeeType::Staff => 8.0,
            EmployeeType::Intern => 5.0,
        }
    }
}

/// Classification of known users; anyone unlisted counts as staff
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    members: HashMap<String, EmployeeType>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, user: impl Into<String>, kind: EmployeeType) -> Self {
        self.members.insert(user.into(), kind);
        self
    }

    pub fn classify(&self, user: &str) -> EmployeeType {
        self.members.get(user).copied().unwrap_or_default()
    }

    pub fn limit_for(&self, user: &str) -> f64 {
        self.classify(user).daily_limit()
    }
}

/// Capacity state of one user, optionally for a single delivery day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<NaiveDate>,
    pub employee_type: EmployeeType,
    pub allocated_hours: f64,
    pub limit: f64,
    pub free_time: f64,
    pub exceed: f64,
}

impl Allocation {
    fn derive(
        user_id: String,
        delivery: Option<NaiveDate>,
        allocated_hours: f64,
        roster: &Roster,
    ) -> Self {
        let employee_type = roster.classify(&user_id);
        let limit = employee_type.daily_limit();
        Self {
            user_id,
            delivery,
            employee_type,
            allocated_hours,
            limit,
            free_time: (limit - allocated_hours).max(0.0),
            exceed: (allocated_hours - limit).max(0.0),
        }
    }

    pub fn is_over_limit(&self) -> bool {
        self.exceed > 0.0
    }
}

/// Summed hours per user, in first-encounter order
pub fn allocate_per_user(records: &[Record], roster: &Roster) -> Result<Vec<Allocation>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut sums: Vec<(String, f64)> = Vec::new();

    for record in records {
        let user = record.require_key(tasks::USER_ID)?;
        let hours = record.require_number(tasks::HOURS)?;
        match index.get(&user) {
            Some(&i) => sums[i].1 += hours,
            None => {
                index.insert(user.clone(), sums.len());
                sums.push((user, hours));
            }
        }
    }

    debug!("Allocated hours for {} users", sums.len());

    Ok(sums
        .into_iter()
        .map(|(user, hours)| Allocation::derive(user, None, hours, roster))
        .collect())
}

/// Summed hours per (user, delivery day), ordered by user then day
pub fn allocate_per_user_day(records: &[Record], roster: &Roster) -> Result<Vec<Allocation>> {
    let mut sums: HashMap<(String, NaiveDate), f64> = HashMap::new();

    for record in records {
        let user = record.require_key(tasks::USER_ID)?;
        let delivery = record
            .date(tasks::DELIVERY)
            .ok_or_else(|| PipelineError::malformed(tasks::DELIVERY))?;
        let hours = record.require_number(tasks::HOURS)?;
        *sums.entry((user, delivery)).or_insert(0.0) += hours;
    }

    let mut keys: Vec<_> = sums.keys().cloned().collect();
    keys.sort();

    Ok(keys
        .into_iter()
        .map(|key| {
            let hours = sums[&key];
            let (user, delivery) = key;
            Allocation::derive(user, Some(delivery), hours, roster)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(user: &str, hours: f64, day: u32) -> Record {
        Record::new()
            .with(tasks::USER_ID, user)
            .with(tasks::HOURS, hours)
            .with(tasks::DELIVERY, NaiveDate::from_ymd_opt(2024, 10, day).unwrap())
    }

    fn roster() -> Roster {
        Roster::new()
            .with("ana.costa", EmployeeType::Staff)
            .with("lucas.oliveira", EmployeeType::Intern)
    }

    #[test]
    fn test_staff_under_limit_has_free_time() {
        let records = vec![task("ana.costa", 3.0, 1), task("ana.costa", 2.0, 1)];
        let alloc = allocate_per_user(&records, &roster()).unwrap();
        assert_eq!(alloc.len(), 1);
        assert_eq!(alloc[0].allocated_hours, 5.0);
        assert_eq!(alloc[0].limit, 8.0);
        assert_eq!(alloc[0].free_time, 3.0);
        assert_eq!(alloc[0].exceed, 0.0);
    }

    #[test]
    fn test_intern_over_limit_exceeds() {
        let records = vec![task("lucas.oliveira", 4.0, 1), task("lucas.oliveira", 3.0, 2)];
        let alloc = allocate_per_user(&records, &roster()).unwrap();
        assert_eq!(alloc[0].employee_type, EmployeeType::Intern);
        assert_eq!(alloc[0].free_time, 0.0);
        assert_eq!(alloc[0].exceed, 2.0);
        assert!(alloc[0].is_over_limit());
    }

    #[test]
    fn test_exactly_at_limit_has_neither() {
        let records = vec![task("ana.costa", 4.0, 1), task("ana.costa", 4.0, 1)];
        let alloc = allocate_per_user(&records, &roster()).unwrap();
        assert_eq!(alloc[0].free_time, 0.0);
        assert_eq!(alloc[0].exceed, 0.0);
    }

    #[test]
    fn test_unknown_user_defaults_to_staff() {
        let alloc = allocate_per_user(&[task("nobody", 1.0, 1)], &roster()).unwrap();
        assert_eq!(alloc[0].limit, 8.0);
    }

    #[test]
    fn test_per_user_day_splits_by_delivery() {
        let records = vec![
            task("ana.costa", 4.0, 2),
            task("ana.costa", 3.0, 1),
            task("ana.costa", 6.0, 2),
        ];
        let alloc = allocate_per_user_day(&records, &roster()).unwrap();
        assert_eq!(alloc.len(), 2);
        assert_eq!(alloc[0].delivery, NaiveDate::from_ymd_opt(2024, 10, 1));
        assert_eq!(alloc[0].free_time, 5.0);
        assert_eq!(alloc[1].allocated_hours, 10.0);
        assert_eq!(alloc[1].exceed, 2.0);
    }

    #[test]
    fn test_missing_hours_fails_batch() {
        let records = vec![
            task("ana.costa", 1.0, 1),
            Record::new().with(tasks::USER_ID, "ana.costa"),
        ];
        let err = allocate_per_user(&records, &roster()).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { field } if field == "hours"));
    }

    #[test]
    fn test_free_and_exceed_never_both_positive() {
        for hours in 0..20 {
            let records = vec![task("lucas.oliveira", hours as f64, 1), task("ana.costa", hours as f64, 1)];
            for a in allocate_per_user(&records, &roster()).unwrap() {
                assert!(a.free_time >= 0.0 && a.exceed >= 0.0);
                assert_eq!(a.free_time * a.exceed, 0.0);
            }
        }
    }
}
