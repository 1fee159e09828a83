//! Engine configuration module.
//!
//! Handles loading, validating, and merging `photometa.toml`. Stock defaults
//! are serialized to a TOML table and the user's file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [sidecar]
//! read = true                 # Merge XMP sidecars over file metadata
//! naming = "append"           # "append" (photo.jpg.xmp) or "replace" (photo.xmp)
//! writing_mode = "image_only" # image_only | sidecar_only | sidecar_and_image
//!                             # | sidecar_only_for_read_only
//!
//! [processing]
//! max_processes = 4           # Max parallel workers (omit for auto = CPU cores)
//!
//! [catalog]                   # Optional: replaces the built-in namespace catalog
//! unify_read_write = false
//! ```
//!
//! A `[catalog]` section is a complete catalog snapshot, as printed by
//! `photometa gen-config --catalog`. It replaces the built-in catalog
//! wholesale; built-in categories it leaves out end up with empty lists.
//!
//! Unknown keys are rejected to catch typos early.

use crate::catalog::{CatalogSnapshot, NamespaceCatalog};
use crate::sidecar::{SidecarNaming, WritingMode};
use serde::{Deserialize, Serialize};
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "photometa.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Engine configuration loaded from `photometa.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Sidecar reading and writing policy.
    pub sidecar: SidecarConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Replacement namespace catalog. `None` keeps the built-in one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogSnapshot>,
}

impl EngineConfig {
    /// Validate config values, including the catalog snapshot if present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        self.namespace_catalog()?;
        Ok(())
    }

    /// The catalog to resolve with.
    pub fn namespace_catalog(&self) -> Result<NamespaceCatalog, ConfigError> {
        match &self.catalog {
            Some(snapshot) => NamespaceCatalog::from_snapshot(snapshot.clone())
                .map_err(|e| ConfigError::Validation(format!("catalog: {e}"))),
            None => Ok(NamespaceCatalog::defaults()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SidecarConfig {
    /// Merge sidecars over file metadata when reading.
    pub read: bool,
    pub naming: SidecarNaming,
    pub writing_mode: WritingMode,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            read: true,
            naming: SidecarNaming::Append,
            writing_mode: WritingMode::ImageOnly,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel resolution workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Worker count for batch runs: the configured cap, never above the core count.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
    match config.max_processes {
        Some(cap) => cap.clamp(1, cores),
        None => cores,
    }
}

/// `EngineConfig::default()` as a TOML table, the layer user files go on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(EngineConfig::default())?)
}

/// Layer `overlay` onto `base`.
///
/// Tables combine key by key. Any other overlay value, arrays included,
/// takes the place of what `base` had.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    let toml::Value::Table(layer) = overlay else {
        return overlay;
    };
    let toml::Value::Table(mut combined) = base else {
        return toml::Value::Table(layer);
    };
    for (key, value) in layer {
        let value = match combined.remove(&key) {
            Some(previous) => merge_toml(previous, value),
            None => value,
        };
        combined.insert(key, value);
    }
    toml::Value::Table(combined)
}

/// Parse the text of a `photometa.toml` over the stock defaults and validate it.
pub fn parse_config(content: &str) -> Result<EngineConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let config: EngineConfig = merge_toml(stock_defaults_value()?, overlay).try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `photometa.toml` from `dir`. A missing file means stock defaults.
pub fn load_config(dir: &Path) -> Result<EngineConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    match fs::read_to_string(&path) {
        Ok(content) => {
            let config = parse_config(&content)?;
            debug!(
                "event=config_loaded module=config path={} custom_catalog={}",
                path.display(),
                config.catalog.is_some()
            );
            Ok(config)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("event=config_default module=config dir={}", dir.display());
            Ok(EngineConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// The commented `photometa.toml` printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# photometa.toml
#
# Every key below is optional and shows its default value.
# Misspelled keys are reported as errors instead of being ignored.

[sidecar]
# Merge an XMP sidecar over the metadata found in the image itself.
# Captions, copyright and creator fields follow the sidecar (a field missing
# from the sidecar is removed); dates, orientation and resolution are only
# overridden when the sidecar has them. XMP comes from the sidecar alone.
read = true

# How the sidecar path is derived from the image path:
#   "append"  -> photo.jpg.xmp
#   "replace" -> photo.xmp
naming = "append"

# Where modified metadata is written:
#   "image_only", "sidecar_only", "sidecar_and_image",
#   "sidecar_only_for_read_only" (image when writable, sidecar otherwise)
writing_mode = "image_only"

[processing]
# Upper bound on batch workers. Leave unset to use every core; a larger
# number still only gets one worker per core.
# max_processes = 4

# [catalog]
# Leave out to keep the built-in namespace catalog. `photometa gen-config
# --catalog` prints the built-in one, ready to paste here and edit.
"##
}

/// The built-in catalog as a `[catalog]` config section.
pub fn stock_catalog_toml() -> Result<String, ConfigError> {
    #[derive(Serialize)]
    struct Section {
        catalog: CatalogSnapshot,
    }
    Ok(toml::to_string(&Section {
        catalog: NamespaceCatalog::defaults().snapshot(),
    })?)
}
