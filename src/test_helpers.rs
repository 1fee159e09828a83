//! Shared test utilities for the photometa test suite.
//!
//! Provides fixture builders for tag stores and dumps, and catalog surgery
//! helpers that isolate one namespace entry.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let catalog = isolate_entry(&NamespaceCatalog::defaults(), &CategoryKey::Rating, "Xmp.xmp.Rating");
//! let store = tagged_store(&["People/Ann"]);
//! assert_issue_free(&FieldResolver::new(&catalog, &store).resolve_tags());
//! ```

use std::path::{Path, PathBuf};

use crate::batch::save_dump;
use crate::catalog::NamespaceCatalog;
use crate::namespace::{CategoryKey, NamespaceEntry};
use crate::resolve::Resolved;
use crate::store::{Container, MemoryTagStore, RawValue};

// =========================================================================
// Fixture setup
// =========================================================================

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// A store carrying `tags` in the digiKam namespace.
pub fn tagged_store(tags: &[&str]) -> MemoryTagStore {
    MemoryTagStore::new().with(Container::Xmp, "Xmp.digiKam.TagsList", RawValue::Seq(strings(tags)))
}

/// Save `store` as a JSON dump named `name` inside `dir`.
pub fn write_dump(dir: &Path, name: &str, store: &MemoryTagStore) -> PathBuf {
    let path = dir.join(name);
    save_dump(&path, store).unwrap();
    path
}

// =========================================================================
// Catalog surgery (panics with a clear message on miss)
// =========================================================================

/// Find a write entry by name. Panics if not found.
pub fn find_write_entry<'a>(catalog: &'a NamespaceCatalog, key: &CategoryKey, name: &str) -> &'a NamespaceEntry {
    catalog
        .write_entries(key)
        .iter()
        .find(|e| e.name == name)
        .unwrap_or_else(|| {
            let names: Vec<&str> = catalog.write_entries(key).iter().map(|e| e.name.as_str()).collect();
            panic!("{key} write entry '{name}' not found. Available: {names:?}")
        })
}

/// A catalog whose `key` read and write lists hold only the write entry `name`.
pub fn isolate_entry(catalog: &NamespaceCatalog, key: &CategoryKey, name: &str) -> NamespaceCatalog {
    let mut entry = find_write_entry(catalog, key, name).clone();
    entry.priority = 0;
    let mut snapshot = catalog.snapshot();
    let lists = snapshot
        .categories
        .get_mut(key)
        .unwrap_or_else(|| panic!("category '{key}' not registered"));
    lists.read = vec![entry.clone()];
    lists.write = vec![entry];
    NamespaceCatalog::from_snapshot(snapshot).unwrap()
}

// =========================================================================
// Assertions
// =========================================================================

/// Assert that resolution met no decode problems.
pub fn assert_issue_free<T>(resolved: &Resolved<T>) {
    assert!(
        resolved.issues.is_empty(),
        "unexpected issues: {:?}",
        resolved.issues
    );
}
