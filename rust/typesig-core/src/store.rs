//! Per-user sample storage.
//!
//! Each user has one JSON record file holding the ordered list of every sample
//! ever collected. Appends are read-modify-write over the whole file and the
//! file is replaced atomically through a temporary sibling.
//!
//! There is no cross-process locking: two processes appending for the same
//! user at the same time can lose one of the batches.

use crate::error::{BiometricError, Result};
use crate::sample::Sample;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "biometric_data_user_";
const FILE_SUFFIX: &str = ".json";

/// What is on disk for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePresence {
    /// No record file.
    Absent,
    /// A record file with zero samples.
    Empty,
    /// A record file holding this many samples.
    Populated(usize),
}

impl StorePresence {
    pub fn has_samples(self) -> bool {
        matches!(self, StorePresence::Populated(_))
    }
}

pub struct SampleStore {
    dir: PathBuf,
}

impl SampleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, user_id: &str) -> Result<PathBuf> {
        validate_user_id(user_id)?;
        Ok(self
            .dir
            .join(format!("{FILE_PREFIX}{user_id}{FILE_SUFFIX}")))
    }

    pub fn exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.record_path(user_id)?.is_some())
    }

    /// Path of an existing record file. Only a missing file counts as absent;
    /// anything else that stops us reading it is a storage error.
    fn record_path(&self, user_id: &str) -> Result<Option<PathBuf>> {
        let path = self.path_for(user_id)?;
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some(path)),
            Ok(_) => Err(BiometricError::Storage {
                path,
                reason: "record is not a regular file".to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BiometricError::Storage {
                path,
                reason: e.to_string(),
            }),
        }
    }

    pub fn presence(&self, user_id: &str) -> Result<StorePresence> {
        if !self.exists(user_id)? {
            return Ok(StorePresence::Absent);
        }
        match self.load_all(user_id)?.len() {
            0 => Ok(StorePresence::Empty),
            n => Ok(StorePresence::Populated(n)),
        }
    }

    /// Full ordered history; empty when no record file exists.
    pub fn load_all(&self, user_id: &str) -> Result<Vec<Sample>> {
        let Some(path) = self.record_path(user_id)? else {
            return Ok(Vec::new());
        };
        let data = fs::read(&path).map_err(|e| BiometricError::Storage {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        parse_samples(&path, &data)
    }

    /// Appends `new_samples` after the existing history and rewrites the file.
    pub fn append(&self, user_id: &str, new_samples: &[Sample]) -> Result<()> {
        let path = self.path_for(user_id)?;
        if new_samples.is_empty() {
            return Ok(());
        }

        let mut all = self.load_all(user_id)?;
        validate_batch(user_id, all.last(), new_samples)?;
        all.extend_from_slice(new_samples);

        fs::create_dir_all(&self.dir)?;
        write_atomic(&path, &encode_samples(&all)?)?;

        log::debug!(
            "stored {} new sample(s) for {user_id}, {} total",
            new_samples.len(),
            all.len()
        );
        Ok(())
    }

    pub fn next_phrase_number(&self, user_id: &str) -> Result<u64> {
        Ok(self
            .load_all(user_id)?
            .last()
            .map(|s| s.phrase_number + 1)
            .unwrap_or(1))
    }

    /// User ids that have a record file in the store directory, sorted.
    pub fn list_users(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut users = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(user) = name
                .strip_prefix(FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
            {
                if validate_user_id(user).is_ok() {
                    users.push(user.to_string());
                }
            }
        }
        users.sort();
        Ok(users)
    }
}

/// Decodes a record file's contents.
pub fn parse_samples(path: &Path, data: &[u8]) -> Result<Vec<Sample>> {
    serde_json::from_slice(data).map_err(|e| BiometricError::Storage {
        path: path.to_path_buf(),
        reason: format!("malformed sample data: {e}"),
    })
}

fn encode_samples(samples: &[Sample]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    samples
        .serialize(&mut ser)
        .map_err(|e| BiometricError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.is_empty() {
        return Err(BiometricError::InvalidInput(
            "user id must not be empty".to_string(),
        ));
    }
    if user_id == "."
        || user_id.contains("..")
        || user_id
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(BiometricError::InvalidInput(format!(
            "user id {user_id:?} cannot be used as a file name"
        )));
    }
    Ok(())
}

fn validate_batch(user_id: &str, last: Option<&Sample>, batch: &[Sample]) -> Result<()> {
    let mut previous = last.map(|s| s.phrase_number);
    for sample in batch {
        if sample.user_id != user_id {
            return Err(BiometricError::InvalidInput(format!(
                "sample for user {} cannot be stored under {user_id}",
                sample.user_id
            )));
        }
        if previous.is_some_and(|p| sample.phrase_number <= p) {
            return Err(BiometricError::InvalidInput(format!(
                "phrase number {} does not follow {}",
                sample.phrase_number,
                previous.unwrap_or_default()
            )));
        }
        let features = sample.features();
        if let Some((feature, value)) = features.iter().find(|(_, v)| !v.is_finite()) {
            return Err(BiometricError::InvalidInput(format!(
                "phrase {} has non-finite {feature} ({value})",
                sample.phrase_number
            )));
        }
        previous = Some(sample.phrase_number);
    }
    Ok(())
}
