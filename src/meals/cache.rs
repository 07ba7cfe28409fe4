//! Per-day meals cache
//!
//! Caches `(user, date) → DayMeals` for the dashboard and meals reads. The
//! cache is a refresh-bus subscriber: `today` and `meals` drop every cached
//! day of the emitting user.
//!
//! Each user carries a generation counter bumped on invalidation, and a
//! cache-wide epoch is bumped when catalog deletions drop every user's days.
//! A load that started before either invalidation is not stored.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use super::history::{bucket_by_day, DayMeals};
use crate::refresh::{RefreshEvent, RefreshSubscriber};
use crate::storage::{StorageEngine, StorageResult};

#[derive(Default)]
struct UserDays {
    generation: u64,
    days: HashMap<NaiveDate, DayMeals>,
}

/// (cache epoch, user generation) observed when a load starts
type Generation = (u64, u64);

#[derive(Default)]
pub struct MealsCache {
    users: RwLock<HashMap<String, UserDays>>,
    epoch: AtomicU64,
}

impl MealsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: &str, date: NaiveDate) -> Option<DayMeals> {
        self.users
            .read()
            .await
            .get(user_id)
            .and_then(|u| u.days.get(&date))
            .cloned()
    }

    async fn generation(&self, user_id: &str) -> Generation {
        let users = self.users.read().await;
        let user = users.get(user_id).map(|u| u.generation).unwrap_or(0);
        (self.epoch.load(Ordering::SeqCst), user)
    }

    /// Store days loaded at `generation`; stale loads are discarded
    async fn store(&self, user_id: &str, generation: Generation, days: Vec<DayMeals>) {
        let mut users = self.users.write().await;
        let epoch = self.epoch.load(Ordering::SeqCst);
        let entry = users.entry(user_id.to_string()).or_default();
        if (epoch, entry.generation) != generation {
            tracing::trace!(user_id, "Discarding stale meals load");
            return;
        }
        for day in days {
            entry.days.insert(day.date, day);
        }
    }

    /// Cached day, loading it from the store on a miss
    pub async fn day(
        &self,
        store: &StorageEngine,
        user_id: &str,
        date: NaiveDate,
    ) -> StorageResult<DayMeals> {
        if let Some(day) = self.get(user_id, date).await {
            tracing::trace!(user_id, %date, "Meals cache hit");
            return Ok(day);
        }

        let generation = self.generation(user_id).await;
        let (meals, summary) = tokio::join!(
            store.meals_for_date(user_id, date),
            store.summary_for_date(user_id, date)
        );
        let day = DayMeals {
            date,
            meals: meals?,
            summary: summary?,
        };

        self.store(user_id, generation, vec![day.clone()]).await;
        Ok(day)
    }

    /// Load `[start, end]` in two queries and cache every day of it
    pub async fn range(
        &self,
        store: &StorageEngine,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<DayMeals>> {
        let generation = self.generation(user_id).await;
        let (meals, summaries) = tokio::join!(
            store.meals_in_range(user_id, start, end),
            store.summaries_in_range(user_id, start, end)
        );
        let days = bucket_by_day(start, end, &meals?, &summaries?);

        self.store(user_id, generation, days.clone()).await;
        Ok(days)
    }

    /// Drop every cached day of `user_id`
    pub async fn invalidate_user(&self, user_id: &str) {
        let mut users = self.users.write().await;
        let entry = users.entry(user_id.to_string()).or_default();
        entry.generation += 1;
        entry.days.clear();
    }

    /// Drop every cached day of every user
    pub async fn invalidate_all(&self) {
        let mut users = self.users.write().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        users.clear();
    }

    /// Cached days of `user_id`
    pub async fn cached_days(&self, user_id: &str) -> usize {
        self.users
            .read()
            .await
            .get(user_id)
            .map(|u| u.days.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RefreshSubscriber for MealsCache {
    async fn on_refresh(&self, event: RefreshEvent, user_id: &str) {
        if matches!(event, RefreshEvent::Today | RefreshEvent::Meals) {
            self.invalidate_user(user_id).await;
            tracing::debug!(user_id, event = %event, "Meals cache invalidated");
        }
    }
}
