//! Field writing: fanning one logical value out to its namespaces.
//!
//! Targets come from the catalog's write list (the read list in unify mode).
//! Normally every enabled target receives the value so that readers of any
//! vintage find it in "their" namespace; in unify mode only the first enabled
//! target is written. Targets in a container the store cannot handle are
//! skipped.
//!
//! Bag-style fields (keywords, subject codes, supplemental categories) also get
//! an incremental contract through [`add_entries`] and [`remove_entries`].

use crate::acdsee;
use crate::catalog::NamespaceCatalog;
use crate::error::MetadataError;
use crate::namespace::{CategoryKey, NamespaceEntry, SpecialEncoding};
use crate::rating::{self, MAX_STARS, RatingScale};
use crate::resolve::{Comment, FieldValue};
use crate::store::{Container, LangAltMap, RawValue, TagStore, X_DEFAULT};
use log::debug;

/// IPTC caption length limit (IIM 2:120).
pub const IPTC_CAPTION_MAX_CHARS: usize = 2000;

pub const XMP_KEYWORDS: &str = "Xmp.dc.subject";
pub const XMP_SUBJECT_CODES: &str = "Xmp.iptc.SubjectCode";
pub const XMP_SUPPLEMENTAL_CATEGORIES: &str = "Xmp.photoshop.SupplementalCategories";

/// Writes fields of one image against one catalog.
pub struct FieldWriter<'a> {
    catalog: &'a NamespaceCatalog,
    store: &'a mut dyn TagStore,
}

impl<'a> FieldWriter<'a> {
    pub fn new(catalog: &'a NamespaceCatalog, store: &'a mut dyn TagStore) -> Self {
        Self { catalog, store }
    }

    /// Entries a write to `category` goes to, in priority order.
    fn targets(&self, category: &CategoryKey) -> Vec<&'a NamespaceEntry> {
        let catalog: &'a NamespaceCatalog = self.catalog;
        let limit = if catalog.unify_read_write() { 1 } else { usize::MAX };
        catalog
            .effective_write_entries(category)
            .iter()
            .filter(|e| e.enabled)
            .filter(|e| {
                e.special_encoding == SpecialEncoding::JpegComment || self.store.supports(e.container)
            })
            .take(limit)
            .collect()
    }

    /// Replace the tag list everywhere. An empty list removes the tags.
    ///
    /// Paths use `/`; hierarchical namespaces receive them with their own
    /// separator, flat namespaces receive leaf names only.
    pub fn write_tags(&mut self, tags: &[String]) -> Result<usize, MetadataError> {
        let paths = normalize_paths(tags);
        let targets = self.targets(&CategoryKey::Tags);
        for entry in &targets {
            match encode_tags(entry, &paths) {
                Some(raw) => self.store.set(entry.container, &entry.name, raw),
                None => self.store.remove(entry.container, &entry.name),
            }
            debug!(
                "event=write_field module=write category=tags target={} count={}",
                entry.name,
                paths.len()
            );
        }
        Ok(targets.len())
    }

    /// Write a 0..=5 star rating through each target's scale.
    pub fn write_rating(&mut self, stars: u8) -> Result<usize, MetadataError> {
        if stars > MAX_STARS {
            return Err(MetadataError::InvalidArgument(format!(
                "rating {stars} is outside 0..={MAX_STARS}"
            )));
        }
        let targets = self.targets(&CategoryKey::Rating);
        for entry in &targets {
            let scale = entry.rating_scale.unwrap_or(RatingScale::STANDARD);
            let external = rating::to_external(stars, &scale)?;
            self.store
                .set(entry.container, &entry.name, rating::rating_raw_value(entry.container, external));
            debug!(
                "event=write_field module=write category=rating target={} value={external}",
                entry.name
            );
        }
        Ok(targets.len())
    }

    /// Replace the caption everywhere. A blank comment clears it.
    pub fn write_comment(&mut self, comment: &Comment) -> Result<usize, MetadataError> {
        let targets = self.targets(&CategoryKey::Comment);
        let blank = comment.text.trim().is_empty();
        for entry in &targets {
            if entry.special_encoding == SpecialEncoding::JpegComment {
                self.store
                    .set_file_comment(if blank { "" } else { comment.text.as_str() });
                continue;
            }
            self.store.remove(entry.container, &entry.name);
            if blank {
                continue;
            }
            let raw = encode_comment(entry, comment);
            self.store.set(entry.container, &entry.name, raw);
            debug!(
                "event=write_field module=write category=comment target={}",
                entry.name
            );
        }
        Ok(targets.len())
    }

    /// Write any registered category. Built-ins go through their dedicated writers.
    pub fn write_field(&mut self, key: &CategoryKey, value: &FieldValue) -> Result<usize, MetadataError> {
        match (key, value) {
            (CategoryKey::Tags, FieldValue::List(tags)) => self.write_tags(tags),
            (CategoryKey::Rating, FieldValue::Stars(stars)) => self.write_rating(*stars),
            (CategoryKey::Comment, FieldValue::Text(text)) => self.write_comment(&Comment::new(text.as_str())),
            (CategoryKey::Comment, FieldValue::LangAlt(map)) => {
                let text = map
                    .get(X_DEFAULT)
                    .or_else(|| map.values().next())
                    .cloned()
                    .unwrap_or_default();
                self.write_comment(&Comment {
                    text,
                    translations: map.clone(),
                })
            }
            (CategoryKey::Custom(_), FieldValue::Stars(_)) => Err(MetadataError::InvalidArgument(format!(
                "category '{key}' has no rating scale"
            ))),
            (CategoryKey::Custom(_), value) => self.write_generic(key, value),
            (key, value) => Err(MetadataError::InvalidArgument(format!(
                "category '{key}' cannot hold {}",
                value_kind(value)
            ))),
        }
    }

    fn write_generic(&mut self, key: &CategoryKey, value: &FieldValue) -> Result<usize, MetadataError> {
        let targets = self.targets(key);
        for entry in &targets {
            match encode_generic(entry, value) {
                Some(raw) => self.store.set(entry.container, &entry.name, raw),
                None => self.store.remove(entry.container, &entry.name),
            }
            debug!(
                "event=write_field module=write category={key} target={}",
                entry.name
            );
        }
        Ok(targets.len())
    }
}

fn value_kind(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Text(_) => "text",
        FieldValue::List(_) => "a list",
        FieldValue::LangAlt(_) => "a language map",
        FieldValue::Stars(_) => "a star rating",
    }
}

// ============================================================================
// Encoders
// ============================================================================

/// Trim every path level, drop empty levels and duplicate paths.
fn normalize_paths(tags: &[String]) -> Vec<String> {
    let mut paths: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let path = tag
            .split('/')
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        if !path.is_empty() && !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

fn leaf(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn encode_list(entry: &NamespaceEntry, items: Vec<String>) -> RawValue {
    match (entry.special_encoding, entry.container) {
        (SpecialEncoding::XmpSeq, _) => RawValue::Seq(items),
        (SpecialEncoding::XmpBag, _) | (_, Container::Iptc) => RawValue::Bag(items),
        // DelimitedText and plain Exif text
        _ => RawValue::Text(items.join(entry.path_separator.as_str())),
    }
}

/// Raw value for `paths` in `entry`'s format; `None` means remove the tag.
fn encode_tags(entry: &NamespaceEntry, paths: &[String]) -> Option<RawValue> {
    if paths.is_empty() {
        return None;
    }
    if entry.special_encoding == SpecialEncoding::VendorTagList {
        return Some(RawValue::Text(acdsee::build_categories(paths)));
    }

    let items: Vec<String> = if entry.is_hierarchical() {
        paths
            .iter()
            .map(|p| p.replace('/', entry.path_separator.as_str()))
            .collect()
    } else {
        let mut leaves: Vec<String> = Vec::with_capacity(paths.len());
        for path in paths {
            let name = leaf(path).to_string();
            if !leaves.contains(&name) {
                leaves.push(name);
            }
        }
        leaves
    };
    Some(encode_list(entry, items))
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((at, _)) => &text[..at],
        None => text,
    }
}

fn encode_comment(entry: &NamespaceEntry, comment: &Comment) -> RawValue {
    match entry.special_encoding {
        SpecialEncoding::LangAltList => {
            let mut map: LangAltMap = comment
                .translations
                .iter()
                .filter(|(_, text)| !text.trim().is_empty())
                .map(|(lang, text)| (lang.clone(), text.clone()))
                .collect();
            map.entry(X_DEFAULT.to_string())
                .or_insert_with(|| comment.text.clone());
            RawValue::LangAltMap(map)
        }
        SpecialEncoding::LangAlt => {
            RawValue::LangAltMap(LangAltMap::from([(X_DEFAULT.to_string(), comment.text.clone())]))
        }
        _ if entry.container == Container::Iptc => {
            RawValue::text(truncate_chars(&comment.text, IPTC_CAPTION_MAX_CHARS))
        }
        _ => RawValue::text(comment.text.as_str()),
    }
}

fn encode_generic(entry: &NamespaceEntry, value: &FieldValue) -> Option<RawValue> {
    let lang_alt = matches!(
        entry.special_encoding,
        SpecialEncoding::LangAlt | SpecialEncoding::LangAltList
    );
    match value {
        FieldValue::List(items) => {
            let paths = normalize_paths(items);
            if paths.is_empty() {
                None
            } else if entry.special_encoding == SpecialEncoding::VendorTagList {
                Some(RawValue::Text(acdsee::build_categories(&paths)))
            } else {
                Some(encode_list(entry, paths))
            }
        }
        FieldValue::Text(text) if text.trim().is_empty() => None,
        FieldValue::Text(text) if lang_alt => Some(RawValue::LangAltMap(LangAltMap::from([(
            X_DEFAULT.to_string(),
            text.clone(),
        )]))),
        FieldValue::Text(text) => Some(RawValue::text(text.as_str())),
        FieldValue::LangAlt(map) if map.is_empty() => None,
        FieldValue::LangAlt(map) if lang_alt => Some(RawValue::LangAltMap(map.clone())),
        FieldValue::LangAlt(map) => map
            .get(X_DEFAULT)
            .or_else(|| map.values().next())
            .map(|text| RawValue::text(text.as_str())),
        FieldValue::Stars(_) => None,
    }
}

// ============================================================================
// Bag add/remove
// ============================================================================

/// Collapse runs of whitespace (newlines included) into single spaces.
fn normalize_entry(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Current bag contents plus whether it is ordered.
fn current_list(store: &dyn TagStore, container: Container, key: &str) -> Result<(Vec<String>, bool), MetadataError> {
    match store.get(container, key) {
        None => Ok((Vec::new(), false)),
        Some(RawValue::Bag(items)) => Ok((items, false)),
        Some(RawValue::Seq(items)) => Ok((items, true)),
        Some(RawValue::Text(text)) if text.trim().is_empty() => Ok((Vec::new(), false)),
        Some(RawValue::Text(text)) => Ok((vec![text], false)),
        Some(other) => Err(MetadataError::encoding(
            container,
            key,
            format!("{} is not a list", other.type_name()),
        )),
    }
}

fn store_list(store: &mut dyn TagStore, container: Container, key: &str, items: Vec<String>, ordered: bool) {
    if items.is_empty() {
        store.remove(container, key);
    } else if ordered {
        store.set(container, key, RawValue::Seq(items));
    } else {
        store.set(container, key, RawValue::Bag(items));
    }
}

/// Add `values` to a bag field, skipping those already present.
///
/// Comparison ignores whitespace differences; added values keep the caller's
/// spelling. Returns how many values were added; empty input and unsupported
/// containers are no-ops.
pub fn add_entries(
    store: &mut dyn TagStore,
    container: Container,
    key: &str,
    values: &[String],
) -> Result<usize, MetadataError> {
    if values.is_empty() || !store.supports(container) {
        return Ok(0);
    }
    let (mut items, ordered) = current_list(store, container, key)?;
    let mut seen: Vec<String> = items.iter().map(|v| normalize_entry(v)).collect();

    let mut added = 0;
    for value in values {
        let normalized = normalize_entry(value);
        if normalized.is_empty() || seen.contains(&normalized) {
            continue;
        }
        items.push(value.clone());
        seen.push(normalized);
        added += 1;
    }
    if added > 0 {
        store_list(store, container, key, items, ordered);
        debug!("event=add_entries module=write key={key} added={added}");
    }
    Ok(added)
}

/// Remove every occurrence of `values` from a bag field.
///
/// Other values are untouched; the tag is removed once it is empty. Returns
/// how many stored values were dropped.
pub fn remove_entries(
    store: &mut dyn TagStore,
    container: Container,
    key: &str,
    values: &[String],
) -> Result<usize, MetadataError> {
    if values.is_empty() || !store.supports(container) {
        return Ok(0);
    }
    let (items, ordered) = current_list(store, container, key)?;
    let doomed: Vec<String> = values.iter().map(|v| normalize_entry(v)).collect();

    let before = items.len();
    let kept: Vec<String> = items
        .into_iter()
        .filter(|item| !doomed.contains(&normalize_entry(item)))
        .collect();
    let removed = before - kept.len();
    if removed > 0 {
        store_list(store, container, key, kept, ordered);
        debug!("event=remove_entries module=write key={key} removed={removed}");
    }
    Ok(removed)
}

pub fn add_keywords(store: &mut dyn TagStore, keywords: &[String]) -> Result<usize, MetadataError> {
    add_entries(store, Container::Xmp, XMP_KEYWORDS, keywords)
}

pub fn remove_keywords(store: &mut dyn TagStore, keywords: &[String]) -> Result<usize, MetadataError> {
    remove_entries(store, Container::Xmp, XMP_KEYWORDS, keywords)
}

pub fn add_subjects(store: &mut dyn TagStore, subjects: &[String]) -> Result<usize, MetadataError> {
    add_entries(store, Container::Xmp, XMP_SUBJECT_CODES, subjects)
}

pub fn remove_subjects(store: &mut dyn TagStore, subjects: &[String]) -> Result<usize, MetadataError> {
    remove_entries(store, Container::Xmp, XMP_SUBJECT_CODES, subjects)
}

pub fn add_supplemental_categories(store: &mut dyn TagStore, categories: &[String]) -> Result<usize, MetadataError> {
    add_entries(store, Container::Xmp, XMP_SUPPLEMENTAL_CATEGORIES, categories)
}

pub fn remove_supplemental_categories(
    store: &mut dyn TagStore,
    categories: &[String],
) -> Result<usize, MetadataError> {
    remove_entries(store, Container::Xmp, XMP_SUPPLEMENTAL_CATEGORIES, categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Direction;
    use crate::resolve::FieldResolver;
    use crate::store::MemoryTagStore;
    use crate::test_helpers::*;

    // =========================================================================
    // Tags
    // =========================================================================

    #[test]
    fn tags_fan_out_with_namespace_separators() {
        let catalog = NamespaceCatalog::defaults();
        let mut store = MemoryTagStore::new();
        let written = FieldWriter::new(&catalog, &mut store)
            .write_tags(&strings(&["People/Family/Ann", "Sunset"]))
            .unwrap();
        assert_eq!(written, catalog.write_entries(&CategoryKey::Tags).len());

        assert_eq!(
            store.get(Container::Xmp, "Xmp.digiKam.TagsList"),
            Some(RawValue::Seq(strings(&["People/Family/Ann", "Sunset"])))
        );
        assert_eq!(
            store.get(Container::Xmp, "Xmp.lr.hierarchicalSubject"),
            Some(RawValue::Bag(strings(&["People|Family|Ann", "Sunset"])))
        );
        assert_eq!(
            store.get(Container::Xmp, "Xmp.dc.subject"),
            Some(RawValue::Bag(strings(&["Ann", "Sunset"])))
        );
        assert_eq!(
            store.get(Container::Iptc, "Iptc.Application2.Keywords"),
            Some(RawValue::Bag(strings(&["People.Family.Ann", "Sunset"])))
        );
        assert!(store.get(Container::Exif, "Exif.Image.XPKeywords").is_none());
    }

    #[test]
    fn tags_written_to_acdsee_as_xml() {
        let catalog = NamespaceCatalog::defaults();
        let mut store = MemoryTagStore::new();
        FieldWriter::new(&catalog, &mut store)
            .write_tags(&strings(&["Trips/Rome"]))
            .unwrap();
        let xml = store
            .get(Container::Xmp, "Xmp.acdsee.categories")
            .and_then(|v| v.as_text())
            .unwrap();
        assert_eq!(acdsee::parse_categories(&xml).unwrap(), strings(&["Trips/Rome"]));
    }

    #[test]
    fn empty_tag_list_clears() {
        let catalog = NamespaceCatalog::defaults();
        let mut store = MemoryTagStore::new()
            .with(Container::Xmp, "Xmp.dc.subject", RawValue::Bag(strings(&["old"])));
        FieldWriter::new(&catalog, &mut store).write_tags(&[]).unwrap();
        assert!(store.get(Container::Xmp, "Xmp.dc.subject").is_none());
        assert!(FieldResolver::new(&catalog, &store).resolve_tags().value.is_none());
    }

    #[test]
    fn tag_paths_normalized() {
        assert_eq!(
            normalize_paths(&strings(&[" A / B ", "A/B", "", "//C"])),
            strings(&["A/B", "C"])
        );
    }

    #[test]
    fn unsupported_xmp_only_touches_iptc() {
        let catalog = NamespaceCatalog::defaults();
        let mut store = MemoryTagStore::new().without_support(Container::Xmp);
        let written = FieldWriter::new(&catalog, &mut store)
            .write_tags(&strings(&["A"]))
            .unwrap();
        assert_eq!(written, 1);
        assert!(store.xmp.is_empty());
        assert!(store.get(Container::Iptc, "Iptc.Application2.Keywords").is_some());
    }

    #[test]
    fn every_tag_entry_round_trips_alone() {
        let defaults = NamespaceCatalog::defaults();
        let tags = strings(&["Places/Italy/Rome", "Sunset"]);
        for entry in defaults.write_entries(&CategoryKey::Tags) {
            let catalog = isolate_entry(&defaults, &CategoryKey::Tags, &entry.name);
            let mut store = MemoryTagStore::new();
            FieldWriter::new(&catalog, &mut store).write_tags(&tags).unwrap();

            let resolved = FieldResolver::new(&catalog, &store).resolve_tags();
            assert_issue_free(&resolved);
            let expected = if entry.is_hierarchical() {
                tags.clone()
            } else {
                strings(&["Rome", "Sunset"])
            };
            assert_eq!(resolved.value, Some(expected), "entry {}", entry.name);
        }
    }

    // =========================================================================
    // Rating
    // =========================================================================

    #[test]
    fn every_rating_entry_round_trips_alone() {
        let defaults = NamespaceCatalog::defaults();
        for entry in defaults.write_entries(&CategoryKey::Rating) {
            let catalog = isolate_entry(&defaults, &CategoryKey::Rating, &entry.name);
            for stars in 0..=MAX_STARS {
                let mut store = MemoryTagStore::new();
                FieldWriter::new(&catalog, &mut store).write_rating(stars).unwrap();
                let resolved = FieldResolver::new(&catalog, &store).resolve_rating();
                assert_eq!(resolved.value, Some(stars), "entry {}", entry.name);
            }
        }
    }

    #[test]
    fn rating_uses_each_scale() {
        let catalog = NamespaceCatalog::defaults();
        let mut store = MemoryTagStore::new();
        FieldWriter::new(&catalog, &mut store).write_rating(4).unwrap();

        assert_eq!(store.get(Container::Xmp, "Xmp.xmp.Rating"), Some(RawValue::text("4")));
        assert_eq!(
            store.get(Container::Xmp, "Xmp.MicrosoftPhoto.Rating"),
            Some(RawValue::text("75"))
        );
        assert_eq!(
            store.get(Container::Exif, "Exif.Image.0x4749"),
            Some(RawValue::integer(75))
        );
        assert!(store.get(Container::Iptc, "Iptc.Application2.Urgency").is_none());
    }

    #[test]
    fn rating_out_of_range_rejected_before_writing() {
        let catalog = NamespaceCatalog::defaults();
        let mut store = MemoryTagStore::new();
        let err = FieldWriter::new(&catalog, &mut store).write_rating(6).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidArgument(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn unify_mode_writes_first_read_entry_only() {
        let mut catalog = NamespaceCatalog::defaults();
        catalog.set_unify_read_write(true);
        let mut store = MemoryTagStore::new();
        let written = FieldWriter::new(&catalog, &mut store).write_rating(2).unwrap();
        assert_eq!(written, 1);
        assert_eq!(store.xmp.len(), 1);
        assert_eq!(store.get(Container::Xmp, "Xmp.xmp.Rating"), Some(RawValue::text("2")));
    }

    #[test]
    fn unify_mode_skips_disabled_and_unsupported() {
        let mut catalog = NamespaceCatalog::defaults();
        catalog.set_unify_read_write(true);
        catalog
            .set_enabled(&CategoryKey::Rating, Direction::Read, "Exif.Image.0x4746", false)
            .unwrap();
        let mut store = MemoryTagStore::new().without_support(Container::Xmp);
        FieldWriter::new(&catalog, &mut store).write_rating(5).unwrap();
        assert_eq!(store.exif.len(), 1);
        assert_eq!(
            store.get(Container::Exif, "Exif.Image.0x4749"),
            Some(RawValue::integer(99))
        );
    }

    #[test]
    fn disabled_write_entry_not_written() {
        let mut catalog = NamespaceCatalog::defaults();
        catalog
            .set_enabled(&CategoryKey::Rating, Direction::Write, "Xmp.acdsee.rating", false)
            .unwrap();
        let mut store = MemoryTagStore::new();
        FieldWriter::new(&catalog, &mut store).write_rating(1).unwrap();
        assert!(store.get(Container::Xmp, "Xmp.acdsee.rating").is_none());
        assert!(store.get(Container::Xmp, "Xmp.xmp.Rating").is_some());
    }

    // =========================================================================
    // Comment
    // =========================================================================

    #[test]
    fn comment_encodings() {
        let catalog = NamespaceCatalog::defaults();
        let mut store = MemoryTagStore::new();
        let comment = Comment::new("Beach").with_translation("fr-FR", "Plage");
        FieldWriter::new(&catalog, &mut store).write_comment(&comment).unwrap();

        match store.get(Container::Xmp, "Xmp.dc.description") {
            Some(RawValue::LangAltMap(map)) => {
                assert_eq!(map.len(), 2);
                assert_eq!(map["fr-FR"], "Plage");
            }
            other => panic!("unexpected {other:?}"),
        }
        match store.get(Container::Xmp, "Xmp.exif.UserComment") {
            Some(RawValue::LangAltMap(map)) => assert_eq!(map.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(store.get(Container::Xmp, "Xmp.acdsee.notes"), Some(RawValue::text("Beach")));
        assert_eq!(store.comment.as_deref(), Some("Beach"));
        assert_eq!(
            store.get(Container::Iptc, "Iptc.Application2.Caption"),
            Some(RawValue::text("Beach"))
        );
    }

    #[test]
    fn iptc_caption_truncated() {
        let catalog = NamespaceCatalog::defaults();
        let mut store = MemoryTagStore::new();
        let long = "é".repeat(IPTC_CAPTION_MAX_CHARS + 10);
        FieldWriter::new(&catalog, &mut store)
            .write_comment(&Comment::new(long.as_str()))
            .unwrap();
        let caption = store
            .get(Container::Iptc, "Iptc.Application2.Caption")
            .and_then(|v| v.as_text())
            .unwrap();
        assert_eq!(caption.chars().count(), IPTC_CAPTION_MAX_CHARS);
        assert_eq!(
            store
                .get(Container::Exif, "Exif.Image.ImageDescription")
                .and_then(|v| v.as_text())
                .unwrap()
                .chars()
                .count(),
            IPTC_CAPTION_MAX_CHARS + 10
        );
    }

    #[test]
    fn blank_comment_clears_everything() {
        let catalog = NamespaceCatalog::defaults();
        let mut store = MemoryTagStore::new();
        FieldWriter::new(&catalog, &mut store)
            .write_comment(&Comment::new("text"))
            .unwrap();
        FieldWriter::new(&catalog, &mut store)
            .write_comment(&Comment::new("  "))
            .unwrap();
        assert!(store.is_empty());
    }

    // =========================================================================
    // write_field
    // =========================================================================

    #[test]
    fn write_field_rejects_mismatched_values() {
        let catalog = NamespaceCatalog::defaults();
        let mut store = MemoryTagStore::new();
        let mut writer = FieldWriter::new(&catalog, &mut store);
        assert!(matches!(
            writer.write_field(&CategoryKey::Rating, &FieldValue::Text("x".into())),
            Err(MetadataError::InvalidArgument(_))
        ));
        assert_eq!(
            writer
                .write_field(&CategoryKey::Rating, &FieldValue::Stars(3))
                .unwrap(),
            5
        );
    }

    #[test]
    fn custom_field_round_trip() {
        let mut catalog = NamespaceCatalog::defaults();
        let key = catalog.register_category("people").unwrap();
        let entry = NamespaceEntry::new("Xmp.custom.People", key.clone(), Container::Xmp, 0)
            .encoding(SpecialEncoding::XmpBag);
        catalog.add_read_entry(entry.clone()).unwrap();
        catalog.add_write_entry(entry).unwrap();

        let mut store = MemoryTagStore::new();
        let value = FieldValue::List(strings(&["Ann", "Bo"]));
        FieldWriter::new(&catalog, &mut store).write_field(&key, &value).unwrap();
        assert_eq!(
            FieldResolver::new(&catalog, &store).resolve_field(&key).value,
            Some(value)
        );
    }

    // =========================================================================
    // Bag add/remove
    // =========================================================================

    #[test]
    fn add_skips_duplicates_after_normalization() {
        let mut store = MemoryTagStore::new()
            .with(Container::Xmp, XMP_KEYWORDS, RawValue::Bag(strings(&["New  York"])));
        let added = add_keywords(&mut store, &strings(&["New\nYork", "Boston", "Boston"])).unwrap();
        assert_eq!(added, 1);
        assert_eq!(
            store.get(Container::Xmp, XMP_KEYWORDS),
            Some(RawValue::Bag(strings(&["New  York", "Boston"])))
        );
    }

    #[test]
    fn add_stores_caller_spelling() {
        let mut store = MemoryTagStore::new();
        assert_eq!(add_keywords(&mut store, &strings(&["Río  Tinto", "río tinto"])).unwrap(), 2);
        assert_eq!(add_keywords(&mut store, &strings(&["Río Tinto"])).unwrap(), 0);
        assert_eq!(
            store.get(Container::Xmp, XMP_KEYWORDS),
            Some(RawValue::Bag(strings(&["Río  Tinto", "río tinto"])))
        );
    }

    #[test]
    fn add_keeps_seq_kind() {
        let mut store = MemoryTagStore::new()
            .with(Container::Xmp, XMP_SUBJECT_CODES, RawValue::Seq(strings(&["01000000"])));
        add_subjects(&mut store, &strings(&["04000000"])).unwrap();
        assert_eq!(
            store.get(Container::Xmp, XMP_SUBJECT_CODES),
            Some(RawValue::Seq(strings(&["01000000", "04000000"])))
        );
    }

    #[test]
    fn remove_all_occurrences_and_drop_empty_tag() {
        let mut store = MemoryTagStore::new().with(
            Container::Xmp,
            XMP_SUPPLEMENTAL_CATEGORIES,
            RawValue::Bag(strings(&["a", "b", "a"])),
        );
        assert_eq!(remove_supplemental_categories(&mut store, &strings(&["a"])).unwrap(), 2);
        assert_eq!(
            store.get(Container::Xmp, XMP_SUPPLEMENTAL_CATEGORIES),
            Some(RawValue::Bag(strings(&["b"])))
        );
        assert_eq!(remove_supplemental_categories(&mut store, &strings(&[" b "])).unwrap(), 1);
        assert!(store.get(Container::Xmp, XMP_SUPPLEMENTAL_CATEGORIES).is_none());
    }

    #[test]
    fn empty_inputs_are_noops() {
        let mut store = MemoryTagStore::new();
        assert_eq!(add_keywords(&mut store, &[]).unwrap(), 0);
        assert_eq!(remove_keywords(&mut store, &[]).unwrap(), 0);
        assert_eq!(remove_keywords(&mut store, &strings(&["x"])).unwrap(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn non_list_value_is_an_encoding_error() {
        let mut store = MemoryTagStore::new().with(Container::Xmp, XMP_KEYWORDS, RawValue::integer(3));
        assert!(matches!(
            add_keywords(&mut store, &strings(&["x"])),
            Err(MetadataError::InvalidEncoding { .. })
        ));
    }
}
