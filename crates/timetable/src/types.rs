//! Shared server state.

use crate::config::ServerConfig;
use crate::schedule::cache::{spawn_sweeper, CacheStats, CircuitBreaker, ScheduleCacheState};
use crate::schedule::client::{BackendClient, BackendConfig};
use crate::schedule::{store, ScheduleError, WeeklySchedule};
use crate::session::SessionContext;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Where weekly schedules come from.
pub enum ScheduleSource {
    /// Live backend, fetched per session and cached
    Backend(BackendClient),
    /// Fixed list loaded at start-up
    Static(Arc<Vec<WeeklySchedule>>),
}

/// State shared by every request handler.
pub struct AppState {
    pub source: ScheduleSource,
}

impl AppState {
    /// Builds the state described by the configuration.
    ///
    /// A configured schedule file wins over the backend URL. A backend source
    /// also starts the cache sweeper, so this must run inside a tokio runtime.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ScheduleError> {
        if let Some(path) = &config.schedule_file {
            info!(path = %path.display(), "Serving schedules from local file");
            return Ok(Self::with_schedules(store::load_schedules(path)?));
        }

        let base_url = config.backend_url.clone().ok_or_else(|| ScheduleError::Config {
            key: "TIMETABLE_BACKEND_URL".to_string(),
            message: "no schedule source configured".to_string(),
        })?;
        let backend_config = BackendConfig {
            schedules_path: config.schedules_path.clone(),
            ..BackendConfig::new(base_url)
        };
        let cache_state = Arc::new(ScheduleCacheState::new(
            config.cache_ttl,
            CircuitBreaker::new(config.breaker_threshold, config.breaker_recovery),
        ));
        spawn_sweeper(cache_state.clone(), sweep_interval(config.cache_ttl));

        info!(base_url = %backend_config.base_url, "Serving schedules from backend");
        Ok(Self {
            source: ScheduleSource::Backend(BackendClient::new(backend_config, cache_state)?),
        })
    }

    pub fn with_schedules(schedules: Vec<WeeklySchedule>) -> Self {
        Self {
            source: ScheduleSource::Static(Arc::new(schedules)),
        }
    }

    /// All schedules visible to the session.
    pub async fn schedules_for(
        &self,
        session: &SessionContext,
        force_refresh: bool,
    ) -> Result<Arc<Vec<WeeklySchedule>>, ScheduleError> {
        match &self.source {
            ScheduleSource::Backend(client) => {
                client.get_or_fetch(session.token(), force_refresh).await
            }
            ScheduleSource::Static(schedules) => Ok(schedules.clone()),
        }
    }

    /// Drops the session's cached schedules; a no-op for static sources.
    pub fn invalidate(&self, session: &SessionContext) {
        if let ScheduleSource::Backend(client) = &self.source {
            client.invalidate_cache(session.token());
        }
    }

    /// Cache statistics, or `None` when nothing is cached.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        match &self.source {
            ScheduleSource::Backend(client) => Some(client.cache_stats()),
            ScheduleSource::Static(_) => None,
        }
    }
}

/// Sweeps once per TTL, but never more often than every second.
fn sweep_interval(ttl: Duration) -> Duration {
    ttl.max(Duration::from_secs(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_interval_has_a_floor() {
        assert_eq!(sweep_interval(Duration::ZERO), Duration::from_secs(1));
        assert_eq!(sweep_interval(Duration::from_secs(300)), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_backend_source_reports_cache_stats() {
        let config = ServerConfig::from_lookup(|key| match key {
            "TIMETABLE_BACKEND_URL" => Some("http://127.0.0.1:9".to_string()),
            _ => None,
        })
        .unwrap();
        let state = AppState::from_config(&config).unwrap();

        let stats = state.cache_stats().unwrap();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.session_locks, 0);
        assert!(!stats.breaker_open);
    }

    #[test]
    fn test_static_source_has_no_cache() {
        assert!(AppState::with_schedules(Vec::new()).cache_stats().is_none());
    }
}
