//! Durable bot state: subscribers, feed sources, report time.
//!
//! Backed by a single JSON file. Every mutation is serialized through one
//! lock and committed by writing a temp file and renaming it over the
//! original, so a scheduled read never observes a half-written state and
//! two administrative writes cannot lose each other's update.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::Result;

/// One digest recipient
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscriber {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Everything the bot persists between restarts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotState {
    #[serde(default)]
    pub subscribers: Vec<Subscriber>,
    #[serde(default = "default_news_sources")]
    pub news_sources: Vec<String>,
    #[serde(default = "default_report_time")]
    pub report_time: String,
}

fn default_news_sources() -> Vec<String> {
    vec!["https://coin68.com/feed/".to_string()]
}

fn default_report_time() -> String {
    "08:00".to_string()
}

impl Default for BotState {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            news_sources: default_news_sources(),
            report_time: default_report_time(),
        }
    }
}

pub struct BotStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl BotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Read the current state; a missing or corrupt file yields defaults
    pub async fn load(&self) -> Result<BotState> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(state) => Ok(state),
                Err(e) => {
                    warn!(
                        "state file {} is corrupt, using defaults: {}",
                        self.path.display(),
                        e
                    );
                    Ok(BotState::default())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BotState::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Exclusive read-modify-write; `mutate`'s return value is passed through
    pub async fn update<F, R>(&self, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut BotState) -> R,
    {
        let _guard = self.write_lock.lock().await;
        let mut state = self.load().await?;
        let out = mutate(&mut state);
        self.persist(&state).await?;
        Ok(out)
    }

    async fn persist(&self, state: &BotState) -> Result<()> {
        let json = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Returns false when the id is already registered
    pub async fn add_subscriber(&self, id: &str, name: &str) -> Result<bool> {
        let id = id.to_string();
        let name = name.to_string();
        self.update(move |state| {
            if state.subscribers.iter().any(|s| s.id == id) {
                false
            } else {
                state.subscribers.push(Subscriber { id, name });
                true
            }
        })
        .await
    }

    /// Returns false when the id was not registered
    pub async fn remove_subscriber(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.update(move |state| {
            let before = state.subscribers.len();
            state.subscribers.retain(|s| s.id != id);
            state.subscribers.len() != before
        })
        .await
    }

    /// Returns false when the source already exists
    pub async fn add_source(&self, url: &str) -> Result<bool> {
        let url = url.to_string();
        self.update(move |state| {
            if state.news_sources.iter().any(|s| s == &url) {
                false
            } else {
                state.news_sources.push(url);
                true
            }
        })
        .await
    }

    /// Returns false when the source was not present
    pub async fn remove_source(&self, url: &str) -> Result<bool> {
        let url = url.to_string();
        self.update(move |state| {
            let before = state.news_sources.len();
            state.news_sources.retain(|s| s != &url);
            state.news_sources.len() != before
        })
        .await
    }

    pub async fn set_report_time(&self, hhmm: &str) -> Result<()> {
        let hhmm = hhmm.to_string();
        self.update(move |state| state.report_time = hhmm).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = BotStore::new(dir.path().join("herald.json"));

        let state = store.load().await.unwrap();
        assert!(state.subscribers.is_empty());
        assert_eq!(state.report_time, "08:00");
        assert_eq!(state.news_sources.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = BotStore::new(&path);
        let state = store.load().await.unwrap();
        assert!(state.subscribers.is_empty());
        assert_eq!(state.report_time, "08:00");
    }

    #[tokio::test]
    async fn test_update_persists_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.json");
        let store = BotStore::new(&path);

        assert!(store.add_subscriber("42", "alice").await.unwrap());
        assert!(!store.add_subscriber("42", "alice").await.unwrap());

        let reread = BotStore::new(&path).load().await.unwrap();
        assert_eq!(reread.subscribers.len(), 1);
        assert_eq!(reread.subscribers[0].name, "alice");
        assert!(!path.with_extension("tmp").exists());
    }
}
