use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::NaiveDate;
use moka::future::Cache;
use serde_json::Value;

use crate::{config::AppConfig, models::PropertyId, repository::data_api::DataApi};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub data_api: DataApi,
    /// Rendered stats payloads keyed by `generation:property:today:month`.
    pub stats_cache: Cache<String, Value>,
    /// Bumped on every write so entries computed from older data are never read again.
    stats_generation: Arc<AtomicU64>,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.data_api_timeout_seconds.max(1)))
            .user_agent("staydesk/1.0")
            .build()?;
        let data_api = DataApi::new(http_client, config.data_api_url.clone());

        let stats_cache = Cache::builder()
            .max_capacity(config.stats_cache_max_entries)
            .time_to_live(Duration::from_secs(config.stats_cache_ttl_seconds.max(1)))
            .build();

        Ok(Self {
            config: Arc::new(config),
            data_api,
            stats_cache,
            stats_generation: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Key for a stats entry. Must be taken before the bookings are loaded.
    pub fn stats_cache_key(
        &self,
        property_id: PropertyId,
        today: NaiveDate,
        selected_month: NaiveDate,
    ) -> String {
        let generation = self.stats_generation.load(Ordering::Acquire);
        format!("{generation}:{property_id}:{today}:{selected_month}")
    }

    /// Any booking or property write can change reported figures.
    pub fn invalidate_stats(&self) {
        self.stats_generation.fetch_add(1, Ordering::AcqRel);
        self.stats_cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::AppState;
    use crate::config::AppConfig;
    use chrono::NaiveDate;

    #[test]
    fn writes_change_the_stats_key() {
        let state = AppState::build(AppConfig::for_data_api("http://127.0.0.1:5000")).unwrap();
        let today = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
        let month = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();

        let before = state.stats_cache_key(1, today, month);
        assert_eq!(before, state.stats_cache_key(1, today, month));

        state.invalidate_stats();
        assert_ne!(before, state.stats_cache_key(1, today, month));
    }
}
