//! In-memory fakes for the store traits, recording every call.

use crate::{
    models::{grant::GrantMethod, video::VideoRecord},
    stores::{
        metadata_store::{MetadataError, MetadataResult, MetadataStore},
        object_store::{ObjectStore, ObjectStoreError, ObjectStoreResult},
    },
};
use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatBehavior {
    /// Report objects present in `objects` as existing.
    Normal,
    /// Every stat call fails with a backend error.
    Fail,
}

#[derive(Debug)]
pub struct ObjectStoreState {
    pub buckets: HashSet<String>,
    pub objects: HashSet<(String, String)>,
    pub created_buckets: Vec<String>,
    pub presigned: Vec<(GrantMethod, String, String, Duration)>,
    pub stat_calls: Vec<(String, String)>,
    pub remove_calls: Vec<(String, String)>,
    pub stat_behavior: StatBehavior,
    pub fail_remove: bool,
    pub fail_presign: bool,
    /// Simulates another request creating the bucket between check and create.
    pub race_on_create: bool,
}

pub struct FakeObjectStore {
    pub state: Mutex<ObjectStoreState>,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ObjectStoreState {
                buckets: HashSet::new(),
                objects: HashSet::new(),
                created_buckets: Vec::new(),
                presigned: Vec::new(),
                stat_calls: Vec::new(),
                remove_calls: Vec::new(),
                stat_behavior: StatBehavior::Normal,
                fail_remove: false,
                fail_presign: false,
                race_on_create: false,
            }),
        }
    }

    pub fn put_object(&self, bucket: &str, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.buckets.insert(bucket.to_string());
        state.objects.insert((bucket.to_string(), key.to_string()));
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut ObjectStoreState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> ObjectStoreResult<bool> {
        Ok(self.state.lock().unwrap().buckets.contains(bucket))
    }

    async fn ensure_bucket(&self, bucket: &str) -> ObjectStoreResult<()> {
        if self.bucket_exists(bucket).await? {
            return Ok(());
        }
        let mut state = self.state.lock().unwrap();
        if state.race_on_create {
            // another writer won; the store answers "already owned", which counts as success
            state.buckets.insert(bucket.to_string());
            return Ok(());
        }
        state.buckets.insert(bucket.to_string());
        state.created_buckets.push(bucket.to_string());
        Ok(())
    }

    async fn presign(
        &self,
        method: GrantMethod,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> ObjectStoreResult<String> {
        let mut state = self.state.lock().unwrap();
        if state.fail_presign {
            return Err(ObjectStoreError::Presign {
                method,
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: "signing unavailable".into(),
            });
        }
        state
            .presigned
            .push((method, bucket.to_string(), key.to_string(), expiry));
        Ok(format!(
            "http://fake-s3/{}/{}?method={}&expires={}",
            bucket,
            key,
            method,
            expiry.as_secs()
        ))
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> ObjectStoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state.stat_calls.push((bucket.to_string(), key.to_string()));
        if state.stat_behavior == StatBehavior::Fail {
            return Err(ObjectStoreError::Backend("connection reset".into()));
        }
        if state
            .objects
            .contains(&(bucket.to_string(), key.to_string()))
        {
            Ok(())
        } else {
            Err(ObjectStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
        }
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> ObjectStoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state.remove_calls.push((bucket.to_string(), key.to_string()));
        if state.fail_remove {
            return Err(ObjectStoreError::Backend("access denied".into()));
        }
        state.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn ping(&self) -> ObjectStoreResult<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MetadataState {
    pub records: HashMap<String, VideoRecord>,
    pub save_calls: usize,
    pub delete_calls: Vec<String>,
    pub fail_save: bool,
    pub fail_delete_ids: HashSet<String>,
    pub fail_reads: bool,
}

#[derive(Default)]
pub struct FakeMetadataStore {
    pub state: Mutex<MetadataState>,
}

impl FakeMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: VideoRecord) {
        self.state
            .lock()
            .unwrap()
            .records
            .insert(record.id.clone(), record);
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut MetadataState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

fn failure() -> MetadataError {
    MetadataError::Sqlx(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl MetadataStore for FakeMetadataStore {
    async fn save(&self, record: &VideoRecord) -> MetadataResult<VideoRecord> {
        let mut state = self.state.lock().unwrap();
        state.save_calls += 1;
        if state.fail_save {
            return Err(failure());
        }
        state.records.insert(record.id.clone(), record.clone());
        Ok(record.clone())
    }

    async fn find_by_id(&self, id: &str) -> MetadataResult<Option<VideoRecord>> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(failure());
        }
        Ok(state.records.get(id).cloned())
    }

    async fn find_by_competition_id(
        &self,
        competition_id: &str,
    ) -> MetadataResult<Vec<VideoRecord>> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(failure());
        }
        Ok(state
            .records
            .values()
            .filter(|r| r.competition_id == competition_id)
            .cloned()
            .collect())
    }

    async fn find_by_uploader_id(&self, uploader_id: &str) -> MetadataResult<Vec<VideoRecord>> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(failure());
        }
        Ok(state
            .records
            .values()
            .filter(|r| r.uploader_id == uploader_id)
            .cloned()
            .collect())
    }

    async fn delete_by_id(&self, id: &str) -> MetadataResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls.push(id.to_string());
        if state.fail_delete_ids.contains(id) {
            return Err(failure());
        }
        Ok(state.records.remove(id).is_some())
    }

    async fn ping(&self) -> MetadataResult<()> {
        if self.state.lock().unwrap().fail_reads {
            return Err(failure());
        }
        Ok(())
    }
}
