//! Parallel resolution of many images.
//!
//! Each input is a JSON tag-store dump (`*.json`) produced by an external
//! codec. Every dump is loaded, reconciled with its sidecar and resolved
//! against one shared catalog snapshot. Work is spread across the global
//! rayon pool; results come back in input order.

use crate::catalog::NamespaceCatalog;
use crate::error::MetadataError;
use crate::gps::{self, GpsPosition};
use crate::orientation::{self, ExifOrientation};
use crate::resolve::{Comment, FieldResolver};
use crate::sidecar::{JsonSidecarSource, SidecarNaming, SidecarOutcome, SidecarReconciler, SidecarState};
use crate::store::{MemoryTagStore, TagStore};
use log::{debug, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub const DUMP_EXTENSION: &str = "json";

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Preferred caption language; `None` selects `x-default`.
    pub language: Option<String>,
    pub read_sidecars: bool,
    pub naming: SidecarNaming,
}

/// Everything resolved for one image.
#[derive(Debug)]
pub struct ResolvedMetadata {
    pub path: PathBuf,
    pub sidecar: SidecarState,
    pub tags: Option<Vec<String>>,
    pub rating: Option<u8>,
    pub comment: Option<Comment>,
    pub gps: Option<GpsPosition>,
    pub orientation: ExifOrientation,
    /// Decode failures and sidecar problems. None of them stop resolution.
    pub issues: Vec<String>,
}

pub fn load_dump(path: &Path) -> Result<MemoryTagStore, BatchError> {
    let content = fs::read_to_string(path).map_err(|source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    MemoryTagStore::from_json_str(&content).map_err(|source| BatchError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_dump(path: &Path, store: &MemoryTagStore) -> Result<(), BatchError> {
    let json = store.to_json_pretty().map_err(|source| BatchError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Expand files and directories into a sorted list of dumps.
pub fn collect_dumps(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut dumps = Vec::new();
    for root in roots {
        if root.is_file() {
            dumps.push(root.clone());
            continue;
        }
        let found = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == DUMP_EXTENSION));
        dumps.extend(found);
    }
    dumps.sort();
    dumps.dedup();
    dumps
}

/// Resolve every field of one store.
pub fn resolve_store(
    catalog: &NamespaceCatalog,
    store: &dyn TagStore,
    language: Option<&str>,
) -> (ResolvedFields, Vec<MetadataError>) {
    let resolver = FieldResolver::new(catalog, store);
    let tags = resolver.resolve_tags();
    let rating = resolver.resolve_rating();
    let comment = resolver.resolve_comment(language);

    let issues = tags
        .issues
        .into_iter()
        .chain(rating.issues)
        .chain(comment.issues)
        .collect();
    let fields = ResolvedFields {
        tags: tags.value,
        rating: rating.value,
        comment: comment.value,
        gps: gps::read_gps(store),
        orientation: orientation::read_orientation(store),
    };
    (fields, issues)
}

/// Field values of [`ResolvedMetadata`] without the per-file context.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFields {
    pub tags: Option<Vec<String>>,
    pub rating: Option<u8>,
    pub comment: Option<Comment>,
    pub gps: Option<GpsPosition>,
    pub orientation: ExifOrientation,
}

fn resolve_one(
    path: &Path,
    catalog: &NamespaceCatalog,
    reconciler: &SidecarReconciler<JsonSidecarSource>,
    language: Option<&str>,
) -> Result<ResolvedMetadata, BatchError> {
    let file = load_dump(path)?;
    let reconciled = reconciler.reconcile(path, file);

    let mut issues = Vec::new();
    if let SidecarOutcome::Failed { path, error } = &reconciled.outcome {
        issues.push(format!("sidecar {}: {error}", path.display()));
    }

    let (fields, errors) = resolve_store(catalog, &reconciled.store, language);
    issues.extend(errors.iter().map(ToString::to_string));

    Ok(ResolvedMetadata {
        path: path.to_path_buf(),
        sidecar: reconciled.state,
        tags: fields.tags,
        rating: fields.rating,
        comment: fields.comment,
        gps: fields.gps,
        orientation: fields.orientation,
        issues,
    })
}

/// Size the global rayon pool. Returns `false` when the pool was already
/// built, in which case the existing pool keeps its size.
pub fn init_thread_pool(threads: usize) -> bool {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        Ok(()) => {
            debug!("event=thread_pool module=batch threads={threads}");
            true
        }
        Err(error) => {
            warn!("event=thread_pool_failed module=batch threads={threads} error=\"{error}\"");
            false
        }
    }
}

/// Resolve `paths` in parallel against one catalog snapshot.
pub fn resolve_batch(
    paths: &[PathBuf],
    catalog: &NamespaceCatalog,
    options: &BatchOptions,
) -> Vec<Result<ResolvedMetadata, BatchError>> {
    let reconciler = SidecarReconciler::new(JsonSidecarSource::new(options.naming), options.read_sidecars);
    let language = options.language.as_deref();
    paths
        .par_iter()
        .map(|path| resolve_one(path, catalog, &reconciler, language))
        .collect()
}
