use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the session tokens live. We differentiate via a "type" tag in the YAML.
/// - memory: process lifetime only, gone on restart.
/// - file: persisted as JSON, survives restarts but is readable by anything
///   with access to the file.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema, PartialEq, Eq, Default)]
#[serde(tag = "type")]
pub enum TokenStoreConfig {
    #[default]
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "file")]
    File(FileTokenStoreConfig),
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema, PartialEq, Eq)]
pub struct FileTokenStoreConfig {
    pub path: PathBuf,
}
