//! HTTP client for the academic backend's schedule endpoint.
//!
//! A fetch is a single authenticated GET returning every weekly schedule the
//! session may see. Results are cached per session; repeated backend failures
//! trip the circuit breaker.

use super::cache::{CacheStats, ScheduleCacheState, SessionKey};
use super::error::ScheduleError;
use super::types::WeeklySchedule;
use rand::Rng;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

const DEFAULT_SCHEDULES_PATH: &str = "/api/schedules";

/// Configuration for the backend client.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the academic backend, e.g. `http://localhost:5000`
    pub base_url: String,
    /// Path of the endpoint returning all weekly schedules
    pub schedules_path: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            schedules_path: DEFAULT_SCHEDULES_PATH.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(20),
        }
    }

    /// Joins base URL and path without doubling or dropping the slash.
    pub fn schedules_url(&self) -> Result<Url, ScheduleError> {
        let base = Url::parse(&self.base_url)?;
        let path = self.schedules_path.trim_start_matches('/');
        let mut base_str = base.to_string();
        if !base_str.ends_with('/') {
            base_str.push('/');
        }
        Ok(Url::parse(&base_str)?.join(path)?)
    }
}

/// Client for fetching weekly schedules from the backend.
pub struct BackendClient {
    client: Client,
    schedules_url: Url,
    cache_state: Arc<ScheduleCacheState>,
}

impl BackendClient {
    pub fn new(
        config: BackendConfig,
        cache_state: Arc<ScheduleCacheState>,
    ) -> Result<Self, ScheduleError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ScheduleError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        let schedules_url = config.schedules_url()?;

        Ok(Self {
            client,
            schedules_url,
            cache_state,
        })
    }

    /// Returns the session's schedules, from cache when possible.
    ///
    /// # Arguments
    /// * `token` - The session's bearer token, forwarded to the backend
    /// * `force_refresh` - If true, bypass cache and fetch fresh data
    pub async fn get_or_fetch(
        &self,
        token: &str,
        force_refresh: bool,
    ) -> Result<Arc<Vec<WeeklySchedule>>, ScheduleError> {
        let correlation_id = generate_correlation_id();
        let session_key = SessionKey::from_token(token);

        if !force_refresh {
            if let Some(cached) = self.cache_state.cache.get(&session_key) {
                debug!(
                    correlation_id = %correlation_id,
                    session = %session_key,
                    "Returning cached schedules"
                );
                return Ok(cached);
            }
        }

        if self.cache_state.circuit_breaker.is_open() {
            warn!(
                correlation_id = %correlation_id,
                "Circuit breaker is open, rejecting request"
            );
            return Err(ScheduleError::CircuitBreakerOpen);
        }

        let lock = self.cache_state.acquire_session_lock(&session_key);
        let guard = lock.lock().await;
        let result = self
            .fetch_locked(token, &session_key, &correlation_id, force_refresh)
            .await;
        drop(guard);
        self.cache_state.release_session_lock(&session_key, lock);
        result
    }

    async fn fetch_locked(
        &self,
        token: &str,
        session_key: &SessionKey,
        correlation_id: &str,
        force_refresh: bool,
    ) -> Result<Arc<Vec<WeeklySchedule>>, ScheduleError> {
        // Another request for this session may have filled the cache meanwhile
        if !force_refresh {
            if let Some(cached) = self.cache_state.cache.get(session_key) {
                debug!(
                    correlation_id = %correlation_id,
                    session = %session_key,
                    "Returning cached schedules (post-lock)"
                );
                return Ok(cached);
            }
        }

        let start = Instant::now();
        let result = self.fetch_schedules(token, correlation_id).await;

        match result {
            Ok(schedules) => {
                self.cache_state.circuit_breaker.record_success();
                let schedules = Arc::new(schedules);
                self.cache_state
                    .cache
                    .insert(session_key.clone(), schedules.clone());
                info!(
                    correlation_id = %correlation_id,
                    session = %session_key,
                    count = schedules.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Fetched schedules from backend"
                );
                Ok(schedules)
            }
            Err(e) => {
                if e.is_retryable() {
                    self.cache_state.circuit_breaker.record_failure();
                }
                error!(
                    correlation_id = %correlation_id,
                    session = %session_key,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Schedule fetch failed"
                );
                Err(e)
            }
        }
    }

    /// Performs the GET against the backend, bypassing the cache.
    pub async fn fetch_schedules(
        &self,
        token: &str,
        correlation_id: &str,
    ) -> Result<Vec<WeeklySchedule>, ScheduleError> {
        info!(
            correlation_id = %correlation_id,
            url = %self.schedules_url,
            "Requesting schedules from backend"
        );

        let response = self
            .client
            .get(self.schedules_url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ScheduleError::SessionRejected {
                    status: response.status().as_u16(),
                });
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(ScheduleError::UnexpectedResponse {
                    message: format!("backend returned status {}: {}", status, truncate(&body, 200)),
                });
            }
            _ => {}
        }

        let text = response.text().await?;
        decode_schedule_list(&text)
    }

    /// Drops the cached schedules for one session.
    pub fn invalidate_cache(&self, token: &str) {
        let session_key = SessionKey::from_token(token);
        self.cache_state.cache.invalidate(&session_key);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache_state.stats()
    }
}

/// Decodes a backend payload into schedules.
///
/// The backend answers either with a bare array or wraps it as `{ "data": [...] }`.
pub fn decode_schedule_list(text: &str) -> Result<Vec<WeeklySchedule>, ScheduleError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let list = match value {
        serde_json::Value::Array(items) => serde_json::Value::Array(items),
        serde_json::Value::Object(mut map) => match map.remove("data") {
            Some(data @ serde_json::Value::Array(_)) => data,
            _ => {
                return Err(ScheduleError::UnexpectedResponse {
                    message: "expected a schedule array or an object with a `data` array"
                        .to_string(),
                })
            }
        },
        _ => {
            return Err(ScheduleError::UnexpectedResponse {
                message: "expected a schedule array".to_string(),
            })
        }
    };
    Ok(serde_json::from_value(list)?)
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Generates a unique correlation ID for request tracing.
fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}
