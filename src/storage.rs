use crate::locale::{FirstWeekday, Locale};
use crate::model::Reminder;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

/// Budget for the serialized reminder file, sized like a synced-storage
/// quota. Saves that would cross it are skipped and reported instead of
/// truncating data; in-memory state stays authoritative.
pub const STORE_QUOTA_BYTES: usize = 100 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct SaveReport {
    pub used_ratio: f64,
    pub written: bool,
}

/// Distinguishes writes made by this process from changes that arrived
/// from outside (another instance editing the same file), so re-loads
/// can be routed without a suppression flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Local,
    Remote,
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub reminders: PathBuf,
    pub settings: PathBuf,
    pub external_feed: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub first_weekday: FirstWeekday,
    #[serde(default)]
    pub locale: Locale,
}

pub fn default_location() -> Result<StoreLocation> {
    let dirs = ProjectDirs::from("", "", "daygrid").context("locating data directory")?;
    let dir = dirs.data_dir();
    Ok(StoreLocation {
        reminders: dir.join("reminders.yml"),
        settings: dir.join("settings.yml"),
        external_feed: dir.join("external.yml"),
    })
}

pub fn load_reminders(path: &Path) -> Result<Vec<Reminder>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    let reminders: Vec<Reminder> =
        serde_yaml::from_str(&data).context("parsing reminder file")?;
    Ok(reminders)
}

/// Persists the canonical reminder fields. Reports quota usage; a write
/// that would exceed the quota is skipped, leaving the previous file
/// intact (`written: false`, ratio 1.0).
pub fn save_reminders(path: &Path, reminders: &[Reminder]) -> Result<SaveReport> {
    let serialized = serde_yaml::to_string(reminders).context("serializing reminders")?;
    if serialized.len() > STORE_QUOTA_BYTES {
        return Ok(SaveReport {
            used_ratio: 1.0,
            written: false,
        });
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    fs::write(path, &serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(SaveReport {
        used_ratio: serialized.len() as f64 / STORE_QUOTA_BYTES as f64,
        written: true,
    })
}

pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let settings: Settings = serde_yaml::from_str(&data).context("parsing settings file")?;
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(settings).context("serializing settings")?;
    fs::write(path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(())
}

pub fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Cancel-and-replace write coalescing: every request resets the
/// deadline, so a burst of edits produces one write per quiet period.
/// The owning event loop polls `due` each tick.
#[derive(Debug)]
pub struct SaveDebouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl SaveDebouncer {
    pub fn new(delay: Duration) -> Self {
        SaveDebouncer {
            delay,
            deadline: None,
        }
    }

    pub fn request(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True once the quiet period has elapsed; clears the deadline.
    pub fn due(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debouncer_coalesces_requests() {
        let mut debouncer = SaveDebouncer::new(Duration::from_millis(0));
        assert!(!debouncer.due());
        debouncer.request();
        debouncer.request();
        assert!(debouncer.pending());
        assert!(debouncer.due());
        // firing consumes the deadline
        assert!(!debouncer.due());
    }

    #[test]
    fn cancel_drops_pending_write() {
        let mut debouncer = SaveDebouncer::new(Duration::from_millis(0));
        debouncer.request();
        debouncer.cancel();
        assert!(!debouncer.due());
    }
}
