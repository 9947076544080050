/// Server configuration read from `TIMETABLE_*` environment variables
use crate::schedule::ScheduleError;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const DEFAULT_PORT: u16 = 8088;
const DEFAULT_SCHEDULES_PATH: &str = "/api/schedules";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_BREAKER_THRESHOLD: u32 = 5;
const DEFAULT_BREAKER_RECOVERY_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    /// Base URL of the academic backend
    pub backend_url: Option<String>,
    pub schedules_path: String,
    /// Local schedule file or directory; takes precedence over the backend
    pub schedule_file: Option<PathBuf>,
    pub cache_ttl: Duration,
    pub breaker_threshold: u32,
    pub breaker_recovery: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ScheduleError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScheduleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = ServerConfig {
            address: parse_or(&get, "TIMETABLE_ADDRESS", DEFAULT_ADDRESS)?,
            port: parse_or(&get, "TIMETABLE_PORT", DEFAULT_PORT)?,
            backend_url: get("TIMETABLE_BACKEND_URL"),
            schedules_path: get("TIMETABLE_SCHEDULES_PATH")
                .unwrap_or_else(|| DEFAULT_SCHEDULES_PATH.to_string()),
            schedule_file: get("TIMETABLE_SCHEDULE_FILE").map(PathBuf::from),
            cache_ttl: Duration::from_secs(parse_or(
                &get,
                "TIMETABLE_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            breaker_threshold: parse_or(
                &get,
                "TIMETABLE_BREAKER_THRESHOLD",
                DEFAULT_BREAKER_THRESHOLD,
            )?,
            breaker_recovery: Duration::from_secs(parse_or(
                &get,
                "TIMETABLE_BREAKER_RECOVERY_SECS",
                DEFAULT_BREAKER_RECOVERY_SECS,
            )?),
        };

        if config.backend_url.is_none() && config.schedule_file.is_none() {
            return Err(ScheduleError::Config {
                key: "TIMETABLE_BACKEND_URL".to_string(),
                message: "set a backend URL or TIMETABLE_SCHEDULE_FILE".to_string(),
            });
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ScheduleError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ScheduleError::Config {
            key: key.to_string(),
            message: format!("`{}`: {}", raw, e),
        }),
        None => Ok(default),
    }
}
