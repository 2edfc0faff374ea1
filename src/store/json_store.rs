//! JSON-file store: one document per user, cached in memory

use super::{IntervalStore, ProgressEntry, StoreError, UserDocument};
use crate::intervals::{Interval, VideoInterval};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct JsonStore {
    /// Directory holding one `<user>.json` per user
    data_dir: PathBuf,

    /// In-memory document cache (thread-safe)
    documents: Arc<RwLock<HashMap<String, UserDocument>>>,
}

impl JsonStore {
    /// Open (creating if needed) a store rooted at `data_dir`
    pub async fn open(data_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&data_dir).await?;

        let store = Self {
            data_dir,
            documents: Arc::new(RwLock::new(HashMap::new())),
        };
        store.load_existing_documents().await?;

        let count = store.documents.read().await.len();
        info!("📊 Store opened at {} with {} user documents", store.data_dir.display(), count);

        Ok(store)
    }

    async fn load_existing_documents(&self) -> Result<(), StoreError> {
        let mut entries = fs::read_dir(&self.data_dir).await?;
        let mut documents = self.documents.write().await;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                match Self::load_document(&path).await {
                    Ok(document) => {
                        documents.insert(document.user_id.clone(), document);
                    }
                    Err(e) => {
                        warn!("Failed to load user document {}: {}", path.display(), e);
                    }
                }
            }
        }

        debug!("📁 Loaded {} user documents from disk", documents.len());
        Ok(())
    }

    async fn load_document(path: &Path) -> Result<UserDocument, StoreError> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// File for a user; unsafe bytes are hex-escaped so distinct ids never collide
    fn document_path(&self, user_id: &str) -> PathBuf {
        let mut name = String::with_capacity(user_id.len() + 5);
        for byte in user_id.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                name.push(byte as char);
            } else {
                name.push_str(&format!("_{:02x}", byte));
            }
        }
        name.push_str(".json");
        self.data_dir.join(name)
    }

    async fn persist(&self, document: &UserDocument) -> Result<(), StoreError> {
        let path = self.document_path(&document.user_id);
        let tmp_path = path.with_extension("json.tmp");

        let json_content = serde_json::to_string_pretty(document)?;
        fs::write(&tmp_path, json_content).await?;
        fs::rename(&tmp_path, &path).await?;

        debug!("💾 Saved document for user {}", document.user_id);
        Ok(())
    }

    /// Read-only view of a user's document
    async fn read<T>(&self, user_id: &str, f: impl FnOnce(&UserDocument) -> T) -> T {
        let documents = self.documents.read().await;
        match documents.get(user_id) {
            Some(document) => f(document),
            None => f(&UserDocument::new(user_id)),
        }
    }

    /// Apply `f` to a copy of the document; the cache only changes once the copy is on disk
    async fn mutate<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut UserDocument) -> T,
    ) -> Result<T, StoreError> {
        let mut documents = self.documents.write().await;
        let mut updated = documents
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserDocument::new(user_id));

        let result = f(&mut updated);
        self.persist(&updated).await?;
        documents.insert(user_id.to_string(), updated);

        Ok(result)
    }

    /// Whether any interval exists for the video
    pub async fn has_intervals(&self, user_id: &str, video_id: &str) -> bool {
        self.read(user_id, |doc| doc.intervals.iter().any(|i| i.video_id == video_id))
            .await
    }

    /// Delete one interval owned by `user_id`
    pub async fn delete_interval(&self, user_id: &str, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.delete_intervals(user_id, &[id]).await? > 0)
    }

    /// Watched state for every tracked video of a playlist
    pub async fn list_progress(&self, user_id: &str, playlist_id: &str) -> Vec<ProgressEntry> {
        self.read(user_id, |doc| {
            doc.progress
                .iter()
                .filter(|entry| entry.playlist_id == playlist_id)
                .cloned()
                .collect()
        })
        .await
    }

    /// Upsert watched state keyed by (user, playlist, video)
    pub async fn set_progress(
        &self,
        user_id: &str,
        playlist_id: &str,
        video_id: &str,
        watched: bool,
    ) -> Result<ProgressEntry, StoreError> {
        let watched_at = watched.then(Utc::now);

        self.mutate(user_id, |doc| {
            match doc
                .progress
                .iter_mut()
                .find(|e| e.playlist_id == playlist_id && e.video_id == video_id)
            {
                Some(entry) => {
                    entry.watched = watched;
                    entry.watched_at = watched_at;
                    entry.clone()
                }
                None => {
                    let entry = ProgressEntry {
                        playlist_id: playlist_id.to_string(),
                        video_id: video_id.to_string(),
                        watched,
                        watched_at,
                    };
                    doc.progress.push(entry.clone());
                    entry
                }
            }
        })
        .await
    }

    /// Ids of playlists the user hid, in sorted order
    pub async fn hidden_playlists(&self, user_id: &str) -> Vec<String> {
        self.read(user_id, |doc| doc.hidden_playlists.iter().cloned().collect())
            .await
    }

    pub async fn set_playlist_hidden(
        &self,
        user_id: &str,
        playlist_id: &str,
        hidden: bool,
    ) -> Result<(), StoreError> {
        self.mutate(user_id, |doc| {
            if hidden {
                doc.hidden_playlists.insert(playlist_id.to_string());
            } else {
                doc.hidden_playlists.remove(playlist_id);
            }
        })
        .await
    }
}

#[async_trait]
impl IntervalStore for JsonStore {
    async fn list_intervals(&self, user_id: &str, video_id: &str) -> Result<Vec<VideoInterval>, StoreError> {
        let mut intervals: Vec<VideoInterval> = self
            .read(user_id, |doc| {
                doc.intervals
                    .iter()
                    .filter(|i| i.video_id == video_id)
                    .cloned()
                    .collect()
            })
            .await;

        intervals.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(intervals)
    }

    async fn create_interval(
        &self,
        user_id: &str,
        video_id: &str,
        interval: Interval,
    ) -> Result<VideoInterval, StoreError> {
        self.mutate(user_id, |doc| {
            let next_order_index = doc
                .intervals
                .iter()
                .filter(|i| i.video_id == video_id)
                .map(|i| i.order_index + 1)
                .max()
                .unwrap_or(0);

            let row = VideoInterval::new(user_id, video_id, interval, next_order_index);
            doc.intervals.push(row.clone());
            row
        })
        .await
    }

    async fn insert_intervals(
        &self,
        user_id: &str,
        video_id: &str,
        intervals: &[Interval],
    ) -> Result<Vec<VideoInterval>, StoreError> {
        self.mutate(user_id, |doc| {
            // Rows that are about to be replaced still hold their indices
            let base = doc
                .intervals
                .iter()
                .filter(|i| i.video_id == video_id)
                .map(|i| i.order_index + 1)
                .max()
                .unwrap_or(0);

            let rows: Vec<VideoInterval> = (base..)
                .zip(intervals)
                .map(|(order_index, interval)| VideoInterval::new(user_id, video_id, *interval, order_index))
                .collect();
            doc.intervals.extend(rows.iter().cloned());
            rows
        })
        .await
    }

    async fn delete_intervals(&self, user_id: &str, ids: &[Uuid]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        self.mutate(user_id, |doc| {
            let before = doc.intervals.len();
            doc.intervals.retain(|i| !ids.contains(&i.id));
            before - doc.intervals.len()
        })
        .await
    }
}
