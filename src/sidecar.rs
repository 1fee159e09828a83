//! Sidecar reconciliation.
//!
//! An image's metadata can live in the file itself and in an XMP sidecar next
//! to it. When a sidecar is loaded, it is merged over the file's data:
//!
//! | Group | Rule |
//! |---|---|
//! | dominated (captions, copyright, creator, IPTC catalog fields) | [`exclusive_merge`]: sidecar value wins, sidecar silence deletes |
//! | writeback (dates, orientation, resolution, software) | [`merge_fields`]: sidecar value wins, silence keeps the file's value |
//! | XMP | taken wholesale from the sidecar |
//!
//! ## States
//!
//! ```text
//! FileOnly ──sidecar found, reading enabled, parsed──▶ SidecarLoaded
//!    │
//!    └──────────────no sidecar on disk─────────────▶ NoSidecar
//! ```
//!
//! A sidecar that cannot be read or parsed leaves the image in `FileOnly` and
//! is reported through [`SidecarOutcome::Failed`]; loading never aborts.
//!
//! Stores are serialized as JSON (see [`MemoryTagStore`]), so a dump
//! `photo.jpg.json` has the sidecar `photo.jpg.json.xmp` or `photo.jpg.xmp`
//! depending on [`SidecarNaming`].

use crate::store::{Container, MemoryTagStore, TagStore};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SIDECAR_EXTENSION: &str = "xmp";

pub const EXIF_DOMINATED: &[&str] = &[
    "Exif.Image.ImageDescription",
    "Exif.Photo.UserComment",
    "Exif.Image.Copyright",
    "Exif.Image.Artist",
];

pub const EXIF_WRITEBACK: &[&str] = &[
    "Exif.Image.DateTime",
    "Exif.Photo.DateTimeOriginal",
    "Exif.Photo.DateTimeDigitized",
    "Exif.Image.Orientation",
    "Exif.Image.XResolution",
    "Exif.Image.YResolution",
    "Exif.Image.ResolutionUnit",
    "Exif.Image.Software",
    "Exif.Photo.RelatedSoundFile",
];

pub const IPTC_DOMINATED: &[&str] = &[
    "Iptc.Application2.ObjectName",
    "Iptc.Application2.Urgency",
    "Iptc.Application2.Category",
    "Iptc.Application2.SuppCategory",
    "Iptc.Application2.Keywords",
    "Iptc.Application2.SubLocation",
    "Iptc.Application2.SpecialInstructions",
    "Iptc.Application2.Byline",
    "Iptc.Application2.BylineTitle",
    "Iptc.Application2.City",
    "Iptc.Application2.ProvinceState",
    "Iptc.Application2.CountryCode",
    "Iptc.Application2.CountryName",
    "Iptc.Application2.TransmissionReference",
    "Iptc.Application2.Headline",
    "Iptc.Application2.Credit",
    "Iptc.Application2.Source",
    "Iptc.Application2.Copyright",
    "Iptc.Application2.Caption",
    "Iptc.Application2.Writer",
];

pub const IPTC_WRITEBACK: &[&str] = &[
    "Iptc.Application2.DateCreated",
    "Iptc.Application2.TimeCreated",
    "Iptc.Application2.DigitizationDate",
    "Iptc.Application2.DigitizationTime",
];

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sidecar parse error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Field-group merges
// ============================================================================

/// Copy `keys` from `src` into `dest`; keys missing from `src` are removed from `dest`.
pub fn exclusive_merge(src: &dyn TagStore, dest: &mut dyn TagStore, container: Container, keys: &[&str]) {
    for key in keys {
        match src.get(container, key) {
            Some(value) => dest.set(container, key, value),
            None => dest.remove(container, key),
        }
    }
}

/// Copy `keys` present in `src` into `dest`, leaving the rest of `dest` alone.
pub fn merge_fields(src: &dyn TagStore, dest: &mut dyn TagStore, container: Container, keys: &[&str]) {
    for key in keys {
        if let Some(value) = src.get(container, key) {
            dest.set(container, key, value);
        }
    }
}

/// Merge sidecar data over file data in place.
pub fn apply_sidecar(sidecar: &dyn TagStore, file: &mut dyn TagStore) {
    for (container, dominated, writeback) in [
        (Container::Exif, EXIF_DOMINATED, EXIF_WRITEBACK),
        (Container::Iptc, IPTC_DOMINATED, IPTC_WRITEBACK),
    ] {
        if !file.supports(container) {
            continue;
        }
        exclusive_merge(sidecar, file, container, dominated);
        merge_fields(sidecar, file, container, writeback);
    }

    if file.supports(Container::Xmp) {
        for (key, _) in file.enumerate(Container::Xmp) {
            file.remove(Container::Xmp, &key);
        }
        for (key, value) in sidecar.enumerate(Container::Xmp) {
            file.set(Container::Xmp, &key, value);
        }
    }
}

// ============================================================================
// Sidecar files
// ============================================================================

/// How a sidecar path is derived from the image path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidecarNaming {
    /// `photo.jpg` → `photo.jpg.xmp`
    #[default]
    Append,
    /// `photo.jpg` → `photo.xmp`
    Replace,
}

pub fn sidecar_path_for(image: &Path, naming: SidecarNaming) -> PathBuf {
    match naming {
        SidecarNaming::Append => {
            let mut name = image.as_os_str().to_owned();
            name.push(".");
            name.push(SIDECAR_EXTENSION);
            PathBuf::from(name)
        }
        SidecarNaming::Replace => image.with_extension(SIDECAR_EXTENSION),
    }
}

/// Where sidecars live and how they are read and written.
pub trait SidecarSource {
    fn sidecar_path_for(&self, image: &Path) -> PathBuf;

    fn exists(&self, path: &Path) -> bool;

    fn load(&self, path: &Path) -> Result<MemoryTagStore, SidecarError>;

    fn save(&self, path: &Path, store: &MemoryTagStore) -> Result<(), SidecarError>;
}

/// Sidecars on the local filesystem, stored as JSON tag-store dumps.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSidecarSource {
    pub naming: SidecarNaming,
}

impl JsonSidecarSource {
    pub fn new(naming: SidecarNaming) -> Self {
        Self { naming }
    }
}

impl SidecarSource for JsonSidecarSource {
    fn sidecar_path_for(&self, image: &Path) -> PathBuf {
        sidecar_path_for(image, self.naming)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn load(&self, path: &Path) -> Result<MemoryTagStore, SidecarError> {
        let content = fs::read_to_string(path)?;
        Ok(MemoryTagStore::from_json_str(&content)?)
    }

    fn save(&self, path: &Path, store: &MemoryTagStore) -> Result<(), SidecarError> {
        fs::write(path, store.to_json_pretty()?)?;
        Ok(())
    }
}

// ============================================================================
// Reconciler
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarState {
    NoSidecar,
    FileOnly,
    SidecarLoaded,
}

/// What happened when looking for a sidecar.
#[derive(Debug)]
pub enum SidecarOutcome {
    Loaded(PathBuf),
    NoSidecar,
    /// Reading from sidecars is switched off.
    Disabled,
    Failed { path: PathBuf, error: SidecarError },
}

/// File data after sidecar reconciliation.
#[derive(Debug)]
pub struct Reconciled {
    pub store: MemoryTagStore,
    pub state: SidecarState,
    pub outcome: SidecarOutcome,
}

pub struct SidecarReconciler<S> {
    source: S,
    read_enabled: bool,
}

impl<S: SidecarSource> SidecarReconciler<S> {
    pub fn new(source: S, read_enabled: bool) -> Self {
        Self {
            source,
            read_enabled,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Merge the sidecar of `image`, if any, over the file's own data.
    pub fn reconcile(&self, image: &Path, mut file: MemoryTagStore) -> Reconciled {
        if !self.read_enabled {
            return Reconciled {
                store: file,
                state: SidecarState::FileOnly,
                outcome: SidecarOutcome::Disabled,
            };
        }

        let path = self.source.sidecar_path_for(image);
        if !self.source.exists(&path) {
            debug!(
                "event=sidecar_absent module=sidecar image={} sidecar={}",
                image.display(),
                path.display()
            );
            return Reconciled {
                store: file,
                state: SidecarState::NoSidecar,
                outcome: SidecarOutcome::NoSidecar,
            };
        }

        match self.source.load(&path) {
            Ok(sidecar) => {
                apply_sidecar(&sidecar, &mut file);
                debug!(
                    "event=sidecar_loaded module=sidecar image={} sidecar={}",
                    image.display(),
                    path.display()
                );
                Reconciled {
                    store: file,
                    state: SidecarState::SidecarLoaded,
                    outcome: SidecarOutcome::Loaded(path),
                }
            }
            Err(error) => {
                warn!(
                    "event=sidecar_failed module=sidecar sidecar={} error=\"{error}\"",
                    path.display()
                );
                Reconciled {
                    store: file,
                    state: SidecarState::FileOnly,
                    outcome: SidecarOutcome::Failed { path, error },
                }
            }
        }
    }
}

// ============================================================================
// Writing mode
// ============================================================================

/// Where modified metadata goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritingMode {
    #[default]
    ImageOnly,
    SidecarOnly,
    SidecarAndImage,
    /// Image when it is writable, sidecar otherwise.
    SidecarOnlyForReadOnly,
}

impl WritingMode {
    pub fn code(self) -> u8 {
        match self {
            WritingMode::ImageOnly => 0,
            WritingMode::SidecarOnly => 1,
            WritingMode::SidecarAndImage => 2,
            WritingMode::SidecarOnlyForReadOnly => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteTargets {
    pub image: bool,
    pub sidecar: bool,
}

pub fn write_targets(mode: WritingMode, file_writable: bool) -> WriteTargets {
    match mode {
        WritingMode::ImageOnly => WriteTargets {
            image: file_writable,
            sidecar: false,
        },
        WritingMode::SidecarOnly => WriteTargets {
            image: false,
            sidecar: true,
        },
        WritingMode::SidecarAndImage => WriteTargets {
            image: file_writable,
            sidecar: true,
        },
        WritingMode::SidecarOnlyForReadOnly => WriteTargets {
            image: file_writable,
            sidecar: !file_writable,
        },
    }
}

/// Sidecar content for `store`: XMP plus the fields a sidecar is authoritative for.
pub fn sidecar_payload(store: &dyn TagStore) -> MemoryTagStore {
    let mut sidecar = MemoryTagStore::new();
    for (key, value) in store.enumerate(Container::Xmp) {
        sidecar.set(Container::Xmp, &key, value);
    }
    for (container, groups) in [
        (Container::Exif, [EXIF_DOMINATED, EXIF_WRITEBACK]),
        (Container::Iptc, [IPTC_DOMINATED, IPTC_WRITEBACK]),
    ] {
        for key in groups.into_iter().flatten() {
            if let Some(value) = store.get(container, key) {
                sidecar.set(container, key, value);
            }
        }
    }
    sidecar
}
