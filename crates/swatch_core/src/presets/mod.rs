//! Preset store shared with the renderer's customizer.
//!
//! The renderer GUI keeps named parameter sets in a JSON file next to the
//! template. Reading that file lets hand-tuned entries override derived
//! parameters; writing makes derived parameters show up there for tuning.
//! Writes are accumulated during the batch and flushed exactly once at the
//! end, so concurrent jobs never race on the file.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{JobResult, ParamMap};

/// Parameter a stored entry only carries when it was tuned in the renderer
/// GUI. Its presence means the entry wins over derived parameters and must
/// not be overwritten.
pub const HAND_TUNED_MARKER: &str = "edge_width";

const FILE_FORMAT_VERSION: &str = "1";

/// Errors from the preset store.
#[derive(Error, Debug)]
pub enum PresetError {
    /// The store file could not be read.
    #[error("failed to read preset store {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The store file is not a valid parameter-set document.
    #[error("preset store {path} is not a valid parameter-set file")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The store file could not be written.
    #[error("failed to write preset store {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// On-disk envelope, compatible with the renderer's parameter-set files.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PresetFile {
    #[serde(rename = "parameterSets", default)]
    parameter_sets: BTreeMap<String, ParamMap>,
    #[serde(rename = "fileFormatVersion", default = "default_format_version")]
    file_format_version: String,
}

fn default_format_version() -> String {
    FILE_FORMAT_VERSION.to_string()
}

impl Default for PresetFile {
    fn default() -> Self {
        Self {
            parameter_sets: BTreeMap::new(),
            file_format_version: default_format_version(),
        }
    }
}

/// Handle to the preset store on disk.
///
/// The file may not exist yet; reads treat a missing file as an empty
/// store.
#[derive(Debug, Clone)]
pub struct PresetStore {
    path: PathBuf,
}

impl PresetStore {
    /// Store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store conventionally kept in the JSON sibling of the template file.
    pub fn for_template(template: &Path) -> Self {
        Self::new(template.with_extension("json"))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<PresetFile, PresetError> {
        if !self.path.exists() {
            return Ok(PresetFile::default());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|source| PresetError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| PresetError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Look up a stored entry by tag.
    pub fn read_entry(&self, tag: &str) -> Result<Option<ParamMap>, PresetError> {
        Ok(self.load()?.parameter_sets.remove(tag))
    }

    /// Merge pending writes into the store.
    ///
    /// Entries not named by `writes` survive untouched, including
    /// hand-edited ones. The file is replaced atomically (temp file, then
    /// rename), the same way the job queue persists its state.
    pub fn flush(&self, writes: &PresetWrites) -> Result<(), PresetError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut file = self.load()?;
        for (tag, params) in &writes.pending {
            file.parameter_sets.insert(tag.clone(), params.clone());
        }

        let json = serde_json::to_string_pretty(&file).map_err(|source| PresetError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let write_err = |source| PresetError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &json).map_err(write_err)?;
        std::fs::rename(&temp_path, &self.path).map_err(write_err)?;

        tracing::debug!(
            "wrote {} preset entries to {}",
            writes.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// One pending preset write produced by a finished job.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPreset {
    /// Preset store key.
    pub tag: String,
    /// Parameters to persist under the tag.
    pub params: ParamMap,
}

/// Pending preset writes accumulated over one batch.
///
/// Later writes for the same tag replace earlier ones.
#[derive(Debug, Default)]
pub struct PresetWrites {
    pending: BTreeMap<String, ParamMap>,
}

impl PresetWrites {
    /// Queue one entry for the end-of-batch flush.
    pub fn insert(&mut self, tag: impl Into<String>, params: ParamMap) {
        self.pending.insert(tag.into(), params);
    }

    /// Gather the pending writes from a batch of finished jobs.
    pub fn collect(results: &[JobResult]) -> Self {
        let mut writes = Self::default();
        for result in results {
            if let Some(pending) = &result.preset_write {
                writes.insert(pending.tag.clone(), pending.params.clone());
            }
        }
        writes
    }

    /// Whether anything is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
