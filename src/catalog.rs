//! Namespace catalog: ordered read and write lists per field category.
//!
//! A [`NamespaceCatalog`] maps each [`CategoryKey`] to a pair of entry lists.
//! The read list decides which stored value wins when several namespaces
//! disagree (first hit in priority order). The write list decides where a
//! value is written (every enabled entry, unless unify mode is on).
//!
//! ## Invariants
//!
//! - Both lists of a category are sorted ascending by priority, and
//!   priorities are unique within a list.
//! - Every entry's category equals the category it is filed under.
//! - A rating scale is present on an entry iff the category is Rating.
//! - The three built-in categories are always registered.
//!
//! Anything that constructs a catalog from outside data goes through
//! [`NamespaceCatalog::from_snapshot`], which enforces all of the above.
//!
//! ## Sharing
//!
//! Catalogs are plain values. Long-running hosts keep the current one in a
//! [`SharedCatalog`], which swaps an `Arc` atomically on configuration change
//! and notifies registered listeners. Resolutions in flight keep the `Arc`
//! they started with.

use crate::error::MetadataError;
use crate::namespace::{CategoryKey, NamespaceEntry, SpecialEncoding};
use crate::rating::RatingScale;
use crate::store::Container;
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Read and write lists of one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CategoryLists {
    pub read: Vec<NamespaceEntry>,
    pub write: Vec<NamespaceEntry>,
}

/// Which list of a category an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Read => "read",
            Direction::Write => "write",
        }
    }
}

/// Serializable form of a catalog.
///
/// This is what configuration files carry under `[catalog]`. It is not
/// guaranteed to satisfy the catalog invariants until passed through
/// [`NamespaceCatalog::from_snapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogSnapshot {
    pub unify_read_write: bool,
    pub categories: BTreeMap<CategoryKey, CategoryLists>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceCatalog {
    categories: BTreeMap<CategoryKey, CategoryLists>,
    unify_read_write: bool,
}

impl Default for NamespaceCatalog {
    fn default() -> Self {
        Self::defaults()
    }
}

impl NamespaceCatalog {
    /// The built-in catalog.
    pub fn defaults() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(CategoryKey::Tags, default_tags());
        categories.insert(CategoryKey::Rating, default_rating());
        categories.insert(CategoryKey::Comment, default_comment());
        Self {
            categories,
            unify_read_write: false,
        }
    }

    pub fn unify_read_write(&self) -> bool {
        self.unify_read_write
    }

    pub fn set_unify_read_write(&mut self, unify: bool) {
        self.unify_read_write = unify;
    }

    /// Open a new custom category with empty lists.
    ///
    /// Registering the same custom name twice is a no-op. Built-in names are rejected.
    pub fn register_category(&mut self, name: &str) -> Result<CategoryKey, MetadataError> {
        let key = CategoryKey::parse(name)?;
        if key.is_builtin() {
            return Err(MetadataError::Configuration(format!(
                "'{name}' is a built-in category"
            )));
        }
        self.categories.entry(key.clone()).or_default();
        debug!("event=register_category module=catalog category={key}");
        Ok(key)
    }

    pub fn has_category(&self, key: &CategoryKey) -> bool {
        self.categories.contains_key(key)
    }

    pub fn categories(&self) -> impl Iterator<Item = &CategoryKey> {
        self.categories.keys()
    }

    /// Read entries sorted by priority.
    ///
    /// # Panics
    ///
    /// If `key` was never registered. Use [`has_category`](Self::has_category) for keys
    /// that come from user input.
    pub fn read_entries(&self, key: &CategoryKey) -> &[NamespaceEntry] {
        &self.lists(key).read
    }

    /// Write entries sorted by priority.
    ///
    /// # Panics
    ///
    /// If `key` was never registered.
    pub fn write_entries(&self, key: &CategoryKey) -> &[NamespaceEntry] {
        &self.lists(key).write
    }

    /// Entries a write to `key` should go through: the read list in unify
    /// mode, the write list otherwise.
    pub fn effective_write_entries(&self, key: &CategoryKey) -> &[NamespaceEntry] {
        if self.unify_read_write {
            self.read_entries(key)
        } else {
            self.write_entries(key)
        }
    }

    fn lists(&self, key: &CategoryKey) -> &CategoryLists {
        match self.categories.get(key) {
            Some(lists) => lists,
            None => panic!("category '{key}' is not registered in the namespace catalog"),
        }
    }

    pub fn add_read_entry(&mut self, entry: NamespaceEntry) -> Result<(), MetadataError> {
        self.add_entry(Direction::Read, entry)
    }

    pub fn add_write_entry(&mut self, entry: NamespaceEntry) -> Result<(), MetadataError> {
        self.add_entry(Direction::Write, entry)
    }

    fn add_entry(&mut self, direction: Direction, entry: NamespaceEntry) -> Result<(), MetadataError> {
        entry.validate()?;
        let lists = self.categories.get_mut(&entry.category).ok_or_else(|| {
            MetadataError::Configuration(format!(
                "category '{}' is not registered",
                entry.category
            ))
        })?;
        let list = match direction {
            Direction::Read => &mut lists.read,
            Direction::Write => &mut lists.write,
        };
        if list.iter().any(|e| e.priority == entry.priority) {
            return Err(MetadataError::Configuration(format!(
                "{} {} list already has an entry with priority {}",
                entry.category,
                direction.as_str(),
                entry.priority
            )));
        }
        let at = list.partition_point(|e| e.priority < entry.priority);
        list.insert(at, entry);
        Ok(())
    }

    /// Enable or disable an entry by name. Returns `NotFound` if no entry matches.
    pub fn set_enabled(
        &mut self,
        key: &CategoryKey,
        direction: Direction,
        name: &str,
        enabled: bool,
    ) -> Result<(), MetadataError> {
        let lists = self
            .categories
            .get_mut(key)
            .ok_or_else(|| MetadataError::NotFound(format!("category '{key}'")))?;
        let list = match direction {
            Direction::Read => &mut lists.read,
            Direction::Write => &mut lists.write,
        };
        let entry = list
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| MetadataError::NotFound(format!("{key} entry '{name}'")))?;
        entry.enabled = enabled;
        Ok(())
    }

    /// Replace the whole catalog.
    pub fn replace(&mut self, other: NamespaceCatalog) {
        *self = other;
    }

    /// Restore exactly the built-in set. Custom categories are dropped.
    pub fn reset_to_defaults(&mut self) {
        *self = Self::defaults();
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            unify_read_write: self.unify_read_write,
            categories: self.categories.clone(),
        }
    }

    /// Build a catalog from a snapshot, checking every invariant.
    ///
    /// Lists are sorted by priority. Built-in categories missing from the
    /// snapshot are registered with empty lists.
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Result<Self, MetadataError> {
        let mut categories = snapshot.categories;
        for key in CategoryKey::BUILTIN {
            categories.entry(key).or_default();
        }
        for (key, lists) in categories.iter_mut() {
            for (direction, list) in [
                (Direction::Read, &mut lists.read),
                (Direction::Write, &mut lists.write),
            ] {
                validate_list(key, direction, list)?;
                list.sort_by_key(|e| e.priority);
            }
        }
        Ok(Self {
            categories,
            unify_read_write: snapshot.unify_read_write,
        })
    }

    pub fn to_toml(&self) -> Result<String, MetadataError> {
        toml::to_string(&self.snapshot())
            .map_err(|e| MetadataError::Configuration(format!("cannot serialize catalog: {e}")))
    }

    pub fn from_toml(content: &str) -> Result<Self, MetadataError> {
        let snapshot: CatalogSnapshot = toml::from_str(content)
            .map_err(|e| MetadataError::Configuration(format!("cannot parse catalog: {e}")))?;
        Self::from_snapshot(snapshot)
    }

    /// SHA-256 over the catalog contents, as a hex string.
    ///
    /// Two catalogs with the same fingerprint resolve identically.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(if self.unify_read_write { b"unify:1" } else { b"unify:0" });
        for (key, lists) in &self.categories {
            hasher.update(key.as_str().as_bytes());
            for (direction, list) in [(Direction::Read, &lists.read), (Direction::Write, &lists.write)] {
                hasher.update(direction.as_str().as_bytes());
                for entry in list {
                    hasher.update(format!("{entry:?}").as_bytes());
                }
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

fn validate_list(
    key: &CategoryKey,
    direction: Direction,
    list: &[NamespaceEntry],
) -> Result<(), MetadataError> {
    let mut seen = Vec::with_capacity(list.len());
    for entry in list {
        entry.validate()?;
        if &entry.category != key {
            return Err(MetadataError::Configuration(format!(
                "entry {} declares category '{}' but is filed under '{key}'",
                entry.name, entry.category
            )));
        }
        if seen.contains(&entry.priority) {
            return Err(MetadataError::Configuration(format!(
                "duplicate priority {} in {key} {} list",
                entry.priority,
                direction.as_str()
            )));
        }
        seen.push(entry.priority);
    }
    Ok(())
}

// ============================================================================
// Built-in defaults
// ============================================================================

fn number(list: Vec<NamespaceEntry>) -> Vec<NamespaceEntry> {
    list.into_iter()
        .enumerate()
        .map(|(i, mut e)| {
            e.priority = i as u32;
            e.is_builtin = true;
            e
        })
        .collect()
}

fn default_tags() -> CategoryLists {
    let tag = |name: &str, container| NamespaceEntry::new(name, CategoryKey::Tags, container, 0);
    let read = vec![
        tag("Xmp.digiKam.TagsList", Container::Xmp)
            .hierarchical("/")
            .encoding(SpecialEncoding::XmpSeq),
        tag("Xmp.MicrosoftPhoto.LastKeywordXMP", Container::Xmp)
            .hierarchical("/")
            .encoding(SpecialEncoding::XmpBag),
        tag("Xmp.lr.hierarchicalSubject", Container::Xmp)
            .hierarchical("|")
            .encoding(SpecialEncoding::XmpBag)
            .alternative("Xmp.lr.HierarchicalSubject", SpecialEncoding::XmpSeq),
        tag("Xmp.mediapro.CatalogSets", Container::Xmp)
            .hierarchical("|")
            .encoding(SpecialEncoding::XmpBag),
        tag("Xmp.acdsee.categories", Container::Xmp)
            .hierarchical("/")
            .encoding(SpecialEncoding::VendorTagList),
        tag("Xmp.dc.subject", Container::Xmp).encoding(SpecialEncoding::XmpBag),
        tag("Iptc.Application2.Keywords", Container::Iptc).hierarchical("."),
        tag("Exif.Image.XPKeywords", Container::Exif)
            .separator(";")
            .encoding(SpecialEncoding::DelimitedText),
    ];
    let write = read
        .iter()
        .filter(|e| e.name != "Exif.Image.XPKeywords")
        .cloned()
        .collect();
    CategoryLists {
        read: number(read),
        write: number(write),
    }
}

fn default_rating() -> CategoryLists {
    let rating = |name: &str, container, scale| {
        NamespaceEntry::new(name, CategoryKey::Rating, container, 0).scale(scale)
    };
    let read = vec![
        rating("Xmp.xmp.Rating", Container::Xmp, RatingScale::STANDARD),
        rating("Xmp.acdsee.rating", Container::Xmp, RatingScale::STANDARD),
        rating("Xmp.MicrosoftPhoto.Rating", Container::Xmp, RatingScale::PERCENT),
        rating("Exif.Image.0x4746", Container::Exif, RatingScale::STANDARD),
        rating("Exif.Image.0x4749", Container::Exif, RatingScale::PERCENT),
        rating("Iptc.Application2.Urgency", Container::Iptc, RatingScale::IPTC_URGENCY),
    ];
    let write = read
        .iter()
        .filter(|e| e.container != Container::Iptc)
        .cloned()
        .collect();
    CategoryLists {
        read: number(read),
        write: number(write),
    }
}

fn default_comment() -> CategoryLists {
    let comment = |name: &str, container| NamespaceEntry::new(name, CategoryKey::Comment, container, 0);
    let read = vec![
        comment("Xmp.dc.description", Container::Xmp).encoding(SpecialEncoding::LangAltList),
        comment("Xmp.exif.UserComment", Container::Xmp).encoding(SpecialEncoding::LangAlt),
        comment("Xmp.tiff.ImageDescription", Container::Xmp).encoding(SpecialEncoding::LangAlt),
        comment("Xmp.acdsee.notes", Container::Xmp).encoding(SpecialEncoding::XmpStructText),
        // Lives outside the three containers; filed with XMP
        comment(JPEG_COMMENT_NAME, Container::Xmp).encoding(SpecialEncoding::JpegComment),
        comment("Exif.Image.ImageDescription", Container::Exif),
        comment("Iptc.Application2.Caption", Container::Iptc),
    ];
    let write = read.clone();
    CategoryLists {
        read: number(read),
        write: number(write),
    }
}

/// Display name of the file-comment pseudo entry.
pub const JPEG_COMMENT_NAME: &str = "JPEG/TIFF Comments";

// ============================================================================
// Shared catalog
// ============================================================================

type Listener = Box<dyn Fn(&Arc<NamespaceCatalog>) + Send + Sync>;

/// The current catalog of a long-running host, swappable at runtime.
pub struct SharedCatalog {
    current: RwLock<Arc<NamespaceCatalog>>,
    listeners: Mutex<Vec<Listener>>,
}

impl SharedCatalog {
    pub fn new(catalog: NamespaceCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// The catalog to resolve against. Stays valid across later publishes.
    pub fn load(&self) -> Arc<NamespaceCatalog> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new catalog and notify listeners.
    ///
    /// Listeners run after the swap, outside the lock, and only when the
    /// fingerprint actually changed.
    pub fn publish(&self, catalog: NamespaceCatalog) -> Arc<NamespaceCatalog> {
        let next = Arc::new(catalog);
        let previous = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, Arc::clone(&next))
        };
        if previous.fingerprint() != next.fingerprint() {
            debug!(
                "event=catalog_published module=catalog fingerprint={}",
                next.fingerprint()
            );
            let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            for listener in listeners.iter() {
                listener(&next);
            }
        }
        next
    }

    /// Register a "catalog changed" callback.
    pub fn on_change(&self, listener: impl Fn(&Arc<NamespaceCatalog>) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }
}

impl Default for SharedCatalog {
    fn default() -> Self {
        Self::new(NamespaceCatalog::defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn names(entries: &[NamespaceEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    // =========================================================================
    // Defaults
    // =========================================================================

    #[test]
    fn defaults_register_builtin_categories() {
        let catalog = NamespaceCatalog::defaults();
        for key in CategoryKey::BUILTIN {
            assert!(catalog.has_category(&key));
            assert!(!catalog.read_entries(&key).is_empty());
        }
        assert!(!catalog.unify_read_write());
    }

    #[test]
    fn default_lists_are_sorted_and_builtin() {
        let catalog = NamespaceCatalog::defaults();
        for key in CategoryKey::BUILTIN {
            for list in [catalog.read_entries(&key), catalog.write_entries(&key)] {
                assert!(list.windows(2).all(|w| w[0].priority < w[1].priority));
                assert!(list.iter().all(|e| e.is_builtin && e.enabled));
            }
        }
    }

    #[test]
    fn default_rating_order_and_scales() {
        let catalog = NamespaceCatalog::defaults();
        let read = catalog.read_entries(&CategoryKey::Rating);
        assert_eq!(read[0].name, "Xmp.xmp.Rating");
        assert_eq!(read[2].rating_scale, Some(RatingScale::PERCENT));
        assert_eq!(read[5].rating_scale, Some(RatingScale::IPTC_URGENCY));
        // Urgency is read for old files but not written
        assert!(!names(catalog.write_entries(&CategoryKey::Rating)).contains(&"Iptc.Application2.Urgency"));
    }

    #[test]
    fn xpkeywords_are_read_only() {
        let catalog = NamespaceCatalog::defaults();
        assert!(names(catalog.read_entries(&CategoryKey::Tags)).contains(&"Exif.Image.XPKeywords"));
        assert!(!names(catalog.write_entries(&CategoryKey::Tags)).contains(&"Exif.Image.XPKeywords"));
    }

    #[test]
    fn reset_twice_is_idempotent() {
        let mut catalog = NamespaceCatalog::defaults();
        catalog.register_category("pick").unwrap();
        catalog.set_unify_read_write(true);

        catalog.reset_to_defaults();
        let first = catalog.to_toml().unwrap();
        catalog.reset_to_defaults();
        let second = catalog.to_toml().unwrap();
        assert_eq!(first, second);
        assert_eq!(catalog, NamespaceCatalog::defaults());
    }

    // =========================================================================
    // Registration and lookup
    // =========================================================================

    #[test]
    fn register_custom_category() {
        let mut catalog = NamespaceCatalog::defaults();
        let key = catalog.register_category("colorlabel").unwrap();
        assert!(catalog.has_category(&key));
        assert!(catalog.read_entries(&key).is_empty());
        // Idempotent
        assert_eq!(catalog.register_category("colorlabel").unwrap(), key);
    }

    #[test]
    fn register_rejects_builtin_and_bad_names() {
        let mut catalog = NamespaceCatalog::defaults();
        assert!(catalog.register_category("rating").is_err());
        assert!(catalog.register_category("two words").is_err());
        assert!(catalog.register_category("").is_err());
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn unregistered_lookup_panics() {
        let catalog = NamespaceCatalog::defaults();
        catalog.read_entries(&CategoryKey::Custom("nope".into()));
    }

    #[test]
    fn add_entry_keeps_sort_order() {
        let mut catalog = NamespaceCatalog::defaults();
        let key = catalog.register_category("pick").unwrap();
        for (name, priority) in [("Xmp.b", 5), ("Xmp.a", 1), ("Xmp.c", 3)] {
            catalog
                .add_read_entry(NamespaceEntry::new(name, key.clone(), Container::Xmp, priority))
                .unwrap();
        }
        assert_eq!(names(catalog.read_entries(&key)), vec!["Xmp.a", "Xmp.c", "Xmp.b"]);
    }

    #[test]
    fn add_entry_rejects_duplicate_priority() {
        let mut catalog = NamespaceCatalog::defaults();
        let dup = NamespaceEntry::new("Xmp.custom.Rating", CategoryKey::Rating, Container::Xmp, 0);
        assert!(matches!(
            catalog.add_read_entry(dup),
            Err(MetadataError::Configuration(_))
        ));
    }

    #[test]
    fn add_entry_rejects_unregistered_category() {
        let mut catalog = NamespaceCatalog::defaults();
        let e = NamespaceEntry::new("Xmp.x", CategoryKey::Custom("ghost".into()), Container::Xmp, 0);
        assert!(catalog.add_write_entry(e).is_err());
    }

    #[test]
    fn set_enabled_by_name() {
        let mut catalog = NamespaceCatalog::defaults();
        catalog
            .set_enabled(&CategoryKey::Rating, Direction::Write, "Exif.Image.0x4749", false)
            .unwrap();
        let entry = catalog
            .write_entries(&CategoryKey::Rating)
            .iter()
            .find(|e| e.name == "Exif.Image.0x4749")
            .unwrap();
        assert!(!entry.enabled);

        let err = catalog
            .set_enabled(&CategoryKey::Rating, Direction::Write, "Xmp.nope", false)
            .unwrap_err();
        assert!(matches!(err, MetadataError::NotFound(_)));
    }

    #[test]
    fn effective_write_entries_follow_unify_flag() {
        let mut catalog = NamespaceCatalog::defaults();
        assert_eq!(
            catalog.effective_write_entries(&CategoryKey::Tags).len(),
            catalog.write_entries(&CategoryKey::Tags).len()
        );
        catalog.set_unify_read_write(true);
        assert_eq!(
            catalog.effective_write_entries(&CategoryKey::Tags).len(),
            catalog.read_entries(&CategoryKey::Tags).len()
        );
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    #[test]
    fn toml_roundtrip_is_lossless() {
        let mut catalog = NamespaceCatalog::defaults();
        let key = catalog.register_category("pick").unwrap();
        catalog
            .add_read_entry(NamespaceEntry::new("Xmp.custom.Pick", key, Container::Xmp, 0))
            .unwrap();
        catalog.set_unify_read_write(true);

        let text = catalog.to_toml().unwrap();
        let back = NamespaceCatalog::from_toml(&text).unwrap();
        assert_eq!(back, catalog);
        assert_eq!(back.fingerprint(), catalog.fingerprint());
    }

    #[test]
    fn replace_with_snapshot_roundtrip() {
        let mut catalog = NamespaceCatalog::defaults();
        let mut edited = NamespaceCatalog::defaults();
        edited.set_unify_read_write(true);
        let restored = NamespaceCatalog::from_snapshot(edited.snapshot()).unwrap();
        catalog.replace(restored);
        assert_eq!(catalog, edited);
    }

    #[test]
    fn from_snapshot_sorts_and_fills_builtins() {
        let mut snapshot = CatalogSnapshot::default();
        snapshot.categories.insert(
            CategoryKey::Rating,
            CategoryLists {
                read: vec![
                    NamespaceEntry::new("Exif.Image.0x4746", CategoryKey::Rating, Container::Exif, 9),
                    NamespaceEntry::new("Xmp.xmp.Rating", CategoryKey::Rating, Container::Xmp, 2),
                ],
                write: vec![],
            },
        );
        let catalog = NamespaceCatalog::from_snapshot(snapshot).unwrap();
        assert_eq!(
            names(catalog.read_entries(&CategoryKey::Rating)),
            vec!["Xmp.xmp.Rating", "Exif.Image.0x4746"]
        );
        assert!(catalog.has_category(&CategoryKey::Tags));
        assert!(catalog.read_entries(&CategoryKey::Comment).is_empty());
    }

    #[test]
    fn from_snapshot_rejects_duplicate_priorities() {
        let mut snapshot = CatalogSnapshot::default();
        snapshot.categories.insert(
            CategoryKey::Tags,
            CategoryLists {
                read: vec![
                    NamespaceEntry::new("Xmp.dc.subject", CategoryKey::Tags, Container::Xmp, 1),
                    NamespaceEntry::new("Xmp.digiKam.TagsList", CategoryKey::Tags, Container::Xmp, 1),
                ],
                write: vec![],
            },
        );
        assert!(NamespaceCatalog::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn from_snapshot_rejects_misfiled_entry() {
        let mut snapshot = CatalogSnapshot::default();
        snapshot.categories.insert(
            CategoryKey::Comment,
            CategoryLists {
                read: vec![NamespaceEntry::new("Xmp.dc.subject", CategoryKey::Tags, Container::Xmp, 0)],
                write: vec![],
            },
        );
        let err = NamespaceCatalog::from_snapshot(snapshot).unwrap_err();
        assert!(err.to_string().contains("filed under"));
    }

    #[test]
    fn from_toml_rejects_missing_rating_scale() {
        let text = r#"
[[categories.rating.read]]
name = "Xmp.xmp.Rating"
category = "rating"
container = "xmp"
priority = 0
"#;
        assert!(NamespaceCatalog::from_toml(text).is_err());
    }

    #[test]
    fn fingerprint_tracks_changes() {
        let a = NamespaceCatalog::defaults();
        let mut b = NamespaceCatalog::defaults();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        b.set_enabled(&CategoryKey::Tags, Direction::Read, "Xmp.dc.subject", false)
            .unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    // =========================================================================
    // SharedCatalog
    // =========================================================================

    #[test]
    fn publish_swaps_and_keeps_old_arc_alive() {
        let shared = SharedCatalog::default();
        let before = shared.load();

        let mut next = NamespaceCatalog::defaults();
        next.set_unify_read_write(true);
        shared.publish(next);

        assert!(!before.unify_read_write());
        assert!(shared.load().unify_read_write());
    }

    #[test]
    fn listeners_fire_only_on_change() {
        let shared = SharedCatalog::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        shared.on_change(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        shared.publish(NamespaceCatalog::defaults());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let mut next = NamespaceCatalog::defaults();
        next.set_unify_read_write(true);
        shared.publish(next);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_readers_see_complete_catalogs() {
        let shared = Arc::new(SharedCatalog::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        if i == 0 {
                            let mut next = NamespaceCatalog::defaults();
                            next.set_unify_read_write(!shared.load().unify_read_write());
                            shared.publish(next);
                        } else {
                            let catalog = shared.load();
                            assert_eq!(catalog.read_entries(&CategoryKey::Rating).len(), 6);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
