use crate::model::Reminder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// A selectable sub-source within the external feed (one named calendar
/// among several).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubSource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub primary: bool,
}

/// Everything one fetch returns: the flat read-only reminder list of all
/// selected sub-sources plus the sub-source listing itself.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub reminders: Vec<Reminder>,
    pub sources: Vec<SubSource>,
}

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("external calendar is unavailable: {0}")]
    Unavailable(String),
    #[error("unknown external source: {0}")]
    UnknownSource(String),
    #[error("event not found in external source: {0}")]
    EventNotFound(String),
}

/// The narrow interface an external reminder stream is consumed through.
/// Every call can fail independently with a user-facing message; a
/// failure never affects local reminders or the calendar.
pub trait ExternalSource {
    fn fetch(&mut self) -> Result<Feed, SourceError>;
    fn add_event(&mut self, source_id: &str, reminder: Reminder) -> Result<(), SourceError>;
    fn remove_event(&mut self, source_id: &str, event_id: &str) -> Result<(), SourceError>;
    fn set_source_selected(&mut self, source_id: &str, selected: bool)
        -> Result<Feed, SourceError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeedFile {
    #[serde(default)]
    sources: Vec<SubSourceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SubSourceRecord {
    id: String,
    name: String,
    #[serde(default)]
    selected: bool,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    reminders: Vec<Reminder>,
}

/// File-backed external source: a YAML feed of named reminder groups.
/// Stands in for a remote calendar integration while exercising the same
/// contract (fetch, per-event add/remove, sub-source toggling).
pub struct FileSource {
    path: PathBuf,
    file: Option<FeedFile>,
}

impl FileSource {
    pub fn new(path: PathBuf) -> Self {
        FileSource { path, file: None }
    }

    fn loaded(&mut self) -> Result<&mut FeedFile, SourceError> {
        if self.file.is_none() {
            if !self.path.exists() {
                self.file = Some(FeedFile {
                    sources: Vec::new(),
                });
            } else {
                let data = fs::read_to_string(&self.path)
                    .map_err(|e| SourceError::Unavailable(e.to_string()))?;
                let file: FeedFile = serde_yaml::from_str(&data)
                    .map_err(|e| SourceError::Unavailable(e.to_string()))?;
                self.file = Some(file);
            }
        }
        self.file
            .as_mut()
            .ok_or_else(|| SourceError::Unavailable("feed not loaded".into()))
    }

    fn persist(&self) -> Result<(), SourceError> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SourceError::Unavailable(e.to_string()))?;
        }
        let data =
            serde_yaml::to_string(file).map_err(|e| SourceError::Unavailable(e.to_string()))?;
        fs::write(&self.path, data).map_err(|e| SourceError::Unavailable(e.to_string()))
    }

    fn feed(file: &FeedFile) -> Feed {
        let mut reminders = Vec::new();
        for source in &file.sources {
            if source.selected {
                reminders.extend(source.reminders.iter().cloned().map(|mut r| {
                    r.source_id = Some(source.id.clone());
                    r
                }));
            }
        }
        Feed {
            reminders,
            sources: file
                .sources
                .iter()
                .map(|s| SubSource {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    selected: s.selected,
                    primary: s.primary,
                })
                .collect(),
        }
    }
}

impl ExternalSource for FileSource {
    fn fetch(&mut self) -> Result<Feed, SourceError> {
        let file = self.loaded()?;
        Ok(Self::feed(file))
    }

    fn add_event(&mut self, source_id: &str, reminder: Reminder) -> Result<(), SourceError> {
        let file = self.loaded()?;
        let source = file
            .sources
            .iter_mut()
            .find(|s| s.id == source_id)
            .ok_or_else(|| SourceError::UnknownSource(source_id.to_string()))?;
        source.reminders.push(reminder);
        self.persist()
    }

    fn remove_event(&mut self, source_id: &str, event_id: &str) -> Result<(), SourceError> {
        let file = self.loaded()?;
        let source = file
            .sources
            .iter_mut()
            .find(|s| s.id == source_id)
            .ok_or_else(|| SourceError::UnknownSource(source_id.to_string()))?;
        let before = source.reminders.len();
        source.reminders.retain(|r| r.id != event_id);
        if source.reminders.len() == before {
            return Err(SourceError::EventNotFound(event_id.to_string()));
        }
        self.persist()
    }

    fn set_source_selected(
        &mut self,
        source_id: &str,
        selected: bool,
    ) -> Result<Feed, SourceError> {
        let file = self.loaded()?;
        let source = file
            .sources
            .iter_mut()
            .find(|s| s.id == source_id)
            .ok_or_else(|| SourceError::UnknownSource(source_id.to_string()))?;
        source.selected = selected;
        let feed = Self::feed(file);
        self.persist()?;
        Ok(feed)
    }
}
