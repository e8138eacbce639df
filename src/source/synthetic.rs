//! Seeded generator of fake task assignments

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::RecordSource;
use crate::error::Result;
use crate::record::{tasks, Record};

/// A kind of task and the hours it takes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskType {
    pub name: String,
    pub hours: f64,
}

impl TaskType {
    pub fn new(name: impl Into<String>, hours: f64) -> Self {
        Self {
            name: name.into(),
            hours,
        }
    }
}

pub fn default_catalog() -> Vec<TaskType> {
    vec![
        TaskType::new("code review", 3.0),
        TaskType::new("testing", 1.0),
        TaskType::new("documentation", 2.0),
        TaskType::new("development", 4.0),
    ]
}

/// Draw between one and ten tasks per user.
///
/// Each task gets a random `TASK-nnnnnn` issue key, a task type picked
/// uniformly from `catalog`, and a delivery date picked uniformly among
/// today, tomorrow, and a day two to seven days out. An empty catalog yields
/// no records.
pub fn generate_tasks<R: Rng + ?Sized>(
    rng: &mut R,
    users: &[String],
    catalog: &[TaskType],
    today: NaiveDate,
) -> Vec<Record> {
    let mut records = Vec::new();
    for user in users {
        let num_issues = rng.random_range(1..=10);
        for _ in 0..num_issues {
            let issue_key = format!("TASK-{}", rng.random_range(100_000..=999_999));
            let Some(task) = catalog.choose(&mut *rng) else {
                continue;
            };
            let later = rng.random_range(2..=7);
            let offset = [0, 1, later][rng.random_range(0..3)];

            records.push(
                Record::new()
                    .with(tasks::USER_ID, user.as_str())
                    .with(tasks::ISSUE_KEY, issue_key)
                    .with(tasks::TASK, task.name.as_str())
                    .with(tasks::HOURS, task.hours)
                    .with(tasks::DELIVERY, today + Duration::days(offset)),
            );
        }
    }
    debug!("Generated {} tasks for {} users", records.len(), users.len());
    records
}

/// Task source drawing from its own RNG on every load
pub struct SyntheticTaskSource {
    users: Vec<String>,
    catalog: Vec<TaskType>,
    today: NaiveDate,
    rng: Mutex<StdRng>,
}

impl SyntheticTaskSource {
    /// Seeded when `seed` is given, otherwise seeded from the OS
    pub fn new(
        users: Vec<String>,
        catalog: Vec<TaskType>,
        today: NaiveDate,
        seed: Option<u64>,
    ) -> Self {
        let rng = seed.map(StdRng::seed_from_u64).unwrap_or_else(StdRng::from_os_rng);
        Self {
            users,
            catalog,
            today,
            rng: Mutex::new(rng),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }
}

#[async_trait]
impl RecordSource for SyntheticTaskSource {
    async fn load(&self) -> Result<Vec<Record>> {
        let mut rng = self.rng.lock().await;
        Ok(generate_tasks(
            &mut *rng,
            &self.users,
            &self.catalog,
            self.today,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn users() -> Vec<String> {
        ["ana.costa", "joao.pereira", "maria.santos", "lucas.oliveira"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 7).unwrap()
    }

    #[test]
    fn test_same_seed_same_records() {
        let a = generate_tasks(&mut StdRng::seed_from_u64(7), &users(), &default_catalog(), today());
        let b = generate_tasks(&mut StdRng::seed_from_u64(7), &users(), &default_catalog(), today());
        assert_eq!(a, b);
    }

    #[test]
    fn test_generated_records_respect_bounds() {
        let catalog = default_catalog();
        for seed in 0..50 {
            let records =
                generate_tasks(&mut StdRng::seed_from_u64(seed), &users(), &catalog, today());

            let mut per_user: HashMap<&str, usize> = HashMap::new();
            for r in &records {
                *per_user.entry(r.text(tasks::USER_ID).unwrap()).or_default() += 1;

                let key = r.text(tasks::ISSUE_KEY).unwrap();
                let n: u32 = key.strip_prefix("TASK-").unwrap().parse().unwrap();
                assert!((100_000..=999_999).contains(&n));

                let name = r.text(tasks::TASK).unwrap();
                let kind = catalog.iter().find(|t| t.name == name).unwrap();
                assert_eq!(r.number(tasks::HOURS), Some(kind.hours));

                let offset = (r.date(tasks::DELIVERY).unwrap() - today()).num_days();
                assert!((0..=7).contains(&offset));
            }

            assert_eq!(per_user.len(), 4);
            assert!(per_user.values().all(|n| (1..=10).contains(n)));
        }
    }

    #[test]
    fn test_empty_catalog_yields_nothing() {
        let records = generate_tasks(&mut StdRng::seed_from_u64(1), &users(), &[], today());
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_source_loads_with_seed() {
        let source = SyntheticTaskSource::new(users(), default_catalog(), today(), Some(42));
        let records = source.load().await.unwrap();
        assert!(records.len() >= 4);
        assert_eq!(source.today(), today());
    }
}
