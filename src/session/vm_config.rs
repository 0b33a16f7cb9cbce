//! Per-VM configuration file.
//!
//! Each VM is described by a small `key = value` text file:
//!
//! ```text
//! # vm1.cfg
//! vm_binary = programs/count.asm
//! vm_snapshot = state/count.bin
//! vm_exec_slice_in_instructions = 250
//! ```
//!
//! `vm_binary` is required. The other keys are optional.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Quota used when neither the VM config nor the settings give one.
pub const DEFAULT_SLICE: u32 = 100;

const KEY_BINARY: &str = "vm_binary";
const KEY_SNAPSHOT: &str = "vm_snapshot";
const KEY_SLICE: &str = "vm_exec_slice_in_instructions";

/// VM configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to open config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required key is absent.
    #[error("missing required key: {0}")]
    MissingKey(&'static str),

    /// A key has an unusable value.
    #[error("invalid value for {key} on line {line}: {value:?}")]
    InvalidValue {
        key: &'static str,
        value: String,
        line: usize,
    },

    /// A non-blank line that is not `key = value`.
    #[error("malformed line {line}: {text:?}")]
    Malformed { line: usize, text: String },
}

/// Inputs for one VM run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Instruction source file.
    pub instruction_file: PathBuf,
    /// Snapshot to restore before running, if any.
    pub snapshot_file: Option<PathBuf>,
    /// Maximum instructions to execute in this run.
    pub slice: u32,
}

impl VmConfig {
    /// Parse config text. `default_slice` applies when no quota key is present.
    pub fn parse(text: &str, default_slice: u32) -> Result<Self, ConfigError> {
        let mut instruction_file = None;
        let mut snapshot_file = None;
        let mut slice = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            }
            .trim();
            if line.is_empty() {
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| ConfigError::Malformed {
                line: line_no,
                text: line.to_string(),
            })?;
            let key = key.trim();
            let value = value.trim();

            match key {
                KEY_BINARY => {
                    if value.is_empty() {
                        return Err(ConfigError::InvalidValue {
                            key: KEY_BINARY,
                            value: value.to_string(),
                            line: line_no,
                        });
                    }
                    instruction_file = Some(PathBuf::from(value));
                }
                KEY_SNAPSHOT => {
                    snapshot_file = (!value.is_empty()).then(|| PathBuf::from(value));
                }
                KEY_SLICE => {
                    let parsed = value.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                        key: KEY_SLICE,
                        value: value.to_string(),
                        line: line_no,
                    })?;
                    slice = Some(parsed);
                }
                other => {
                    log::warn!("Ignoring unknown config key {:?} on line {}", other, line_no);
                }
            }
        }

        Ok(Self {
            instruction_file: instruction_file.ok_or(ConfigError::MissingKey(KEY_BINARY))?,
            snapshot_file,
            slice: slice.unwrap_or(default_slice),
        })
    }

    /// Read and parse a config file.
    pub fn from_file(path: impl AsRef<Path>, default_slice: u32) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        let config = Self::parse(&text, default_slice)?;
        log::debug!("Loaded VM config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}
