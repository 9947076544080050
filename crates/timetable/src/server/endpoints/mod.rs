pub mod cache;
pub mod schedule;
pub mod status;
pub mod student;

use serde::Deserialize;

/// Query parameters shared by endpoints that read schedules.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshParams {
    /// If true, bypass cache and fetch fresh data
    #[serde(default)]
    pub refresh: bool,
}
