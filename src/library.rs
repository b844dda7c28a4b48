//! Saved-study library.
//!
//! Loaded once from the store at startup and rewritten in full after every
//! mutation. Storage failures are logged and never roll back the in-memory
//! list, so the current session keeps working when the disk does not.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{FormData, GeneratedContent, SavedStudy};
use crate::storage::KeyValueStore;

pub const LIBRARY_KEY: &str = "echoLeafLibrary";

pub struct Library {
    store: Arc<dyn KeyValueStore>,
    studies: Vec<SavedStudy>,
}

impl Library {
    /// Load the library from the store. Unreadable or corrupt data yields an
    /// empty library with a warning.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let studies = match store.read(LIBRARY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<SavedStudy>>(&raw) {
                Ok(list) => list,
                Err(e) => {
                    tracing::warn!("Failed to parse saved library, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to load studies from storage: {}", e);
                Vec::new()
            }
        };
        tracing::debug!("Loaded {} saved studies", studies.len());
        Self { store, studies }
    }

    fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.studies)?;
        self.store.write(LIBRARY_KEY, &raw)
    }

    fn persist_logged(&self, action: &str) {
        if let Err(e) = self.persist() {
            tracing::warn!("Failed to {} in storage: {}", action, e);
        }
    }

    fn next_id(&self, now: DateTime<Utc>) -> String {
        let mut millis = now.timestamp_millis();
        while self.studies.iter().any(|s| s.id == millis.to_string()) {
            millis += 1;
        }
        millis.to_string()
    }

    /// Save a result at the front of the library and return the new entry.
    pub fn save(&mut self, inputs: FormData, content: GeneratedContent) -> SavedStudy {
        self.save_at(inputs, content, Utc::now())
    }

    pub fn save_at(
        &mut self,
        inputs: FormData,
        content: GeneratedContent,
        saved_at: DateTime<Utc>,
    ) -> SavedStudy {
        let study = SavedStudy {
            id: self.next_id(saved_at),
            saved_at,
            original_inputs: inputs,
            generated_content: content,
        };
        self.studies.insert(0, study.clone());
        self.persist_logged("save study");
        tracing::info!("Saved study {} to library", study.id);
        study
    }

    /// Remove a study by id. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.studies.len();
        self.studies.retain(|s| s.id != id);
        let removed = self.studies.len() != before;
        if removed {
            self.persist_logged("update library");
        }
        removed
    }

    pub fn clear_all(&mut self) {
        self.studies.clear();
        self.persist_logged("clear library");
    }

    pub fn get(&self, id: &str) -> Option<&SavedStudy> {
        self.studies.iter().find(|s| s.id == id)
    }

    /// Studies in stored order (most recently saved first).
    pub fn studies(&self) -> &[SavedStudy] {
        &self.studies
    }

    pub fn len(&self) -> usize {
        self.studies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.studies.is_empty()
    }

    /// Case-insensitive match on title or original study text, newest first.
    pub fn search(&self, term: &str) -> Vec<&SavedStudy> {
        let needle = term.trim().to_lowercase();
        let mut hits: Vec<&SavedStudy> = self
            .studies
            .iter()
            .filter(|s| {
                needle.is_empty()
                    || s.generated_content.title.to_lowercase().contains(&needle)
                    || s.original_inputs.study_text.to_lowercase().contains(&needle)
            })
            .collect();
        hits.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        hits
    }
}
