/// Loading weekly schedules from local JSON files
use super::client::decode_schedule_list;
use super::error::ScheduleError;
use super::types::WeeklySchedule;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Loads schedules from a JSON file or a directory of JSON files.
///
/// A file may hold one schedule object, an array of schedules, or an object
/// wrapping the array as `data`. Directory entries are read in file-name order
/// and only `*.json` files are considered.
///
/// # Arguments
/// * `path` - Path to a `.json` file or to a directory
///
/// # Returns
/// * `Ok(Vec<WeeklySchedule>)` - All schedules found, in load order
/// * `Err` - If the path can't be read or a file doesn't parse
pub fn load_schedules(path: &Path) -> Result<Vec<WeeklySchedule>, ScheduleError> {
    let schedules = if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        files.sort();

        let mut schedules = Vec::new();
        for file in files {
            let loaded = load_file(&file)?;
            debug!(file = %file.display(), count = loaded.len(), "Loaded schedule file");
            schedules.extend(loaded);
        }
        schedules
    } else {
        load_file(path)?
    };

    info!(
        path = %path.display(),
        count = schedules.len(),
        "Loaded schedules from disk"
    );

    Ok(schedules)
}

fn load_file(path: &Path) -> Result<Vec<WeeklySchedule>, ScheduleError> {
    let content = fs::read_to_string(path)?;
    decode_schedule_file(&content).map_err(|e| match e {
        ScheduleError::Parse { message } | ScheduleError::UnexpectedResponse { message } => {
            ScheduleError::Parse {
                message: format!("{}: {}", path.display(), message),
            }
        }
        other => other,
    })
}

/// Accepts everything `decode_schedule_list` does, plus a lone schedule object.
fn decode_schedule_file(content: &str) -> Result<Vec<WeeklySchedule>, ScheduleError> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let is_single = value
        .as_object()
        .map(|o| !o.contains_key("data"))
        .unwrap_or(false);

    if is_single {
        Ok(vec![serde_json::from_value(value)?])
    } else {
        decode_schedule_list(content)
    }
}
