//! Tag-store abstraction consumed by the engine.
//!
//! The engine never parses image bytes. Whatever codec reads the file hands
//! over a [`TagStore`]: a get/set/remove/enumerate view over the three
//! metadata containers, keyed by the usual dotted tag names
//! (`Exif.Image.Orientation`, `Iptc.Application2.Keywords`, `Xmp.xmp.Rating`).
//!
//! [`MemoryTagStore`] is the in-memory implementation. It serializes to JSON,
//! which is how the CLI reads metadata dumps and sidecars, and it is the
//! working triple the [`sidecar`](crate::sidecar) reconciler merges into.
//!
//! ## Capabilities
//!
//! Not every codec build can handle every container (XMP support in
//! particular is optional in most Exif libraries). Call sites check
//! [`TagStore::supports`] once instead of compiling code paths conditionally.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One of the three metadata containers embeddable in an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Exif,
    Iptc,
    Xmp,
}

impl Container {
    pub const ALL: [Container; 3] = [Container::Exif, Container::Iptc, Container::Xmp];

    /// Guess the container from a dotted key prefix (`Exif.`, `Iptc.`, `Xmp.`).
    pub fn from_key(key: &str) -> Option<Self> {
        match key.split('.').next()? {
            "Exif" => Some(Self::Exif),
            "Iptc" => Some(Self::Iptc),
            "Xmp" => Some(Self::Xmp),
            _ => None,
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Container::Exif => "Exif",
            Container::Iptc => "IPTC",
            Container::Xmp => "XMP",
        };
        f.write_str(name)
    }
}

/// Language-alternative map: language tag (`x-default`, `en-US`, ...) → text.
pub type LangAltMap = BTreeMap<String, String>;

/// The default slot of a language-alternative value.
pub const X_DEFAULT: &str = "x-default";

/// A raw tag value as delivered by the codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RawValue {
    Text(String),
    IntegerList(Vec<i64>),
    Rational(i64, i64),
    /// Multi-component rationals (GPS degree/minute/second triples).
    RationalList(Vec<(i64, i64)>),
    LangAltMap(LangAltMap),
    Bag(Vec<String>),
    Seq(Vec<String>),
}

impl RawValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn integer(value: i64) -> Self {
        Self::IntegerList(vec![value])
    }

    /// Plain-text view. Numbers are rendered the way Exif libraries print them.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s.clone()),
            RawValue::IntegerList(v) if !v.is_empty() => Some(
                v.iter()
                    .map(i64::to_string)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            RawValue::Rational(n, d) => Some(format!("{n}/{d}")),
            RawValue::LangAltMap(map) => map
                .get(X_DEFAULT)
                .or_else(|| map.values().next())
                .cloned(),
            _ => None,
        }
    }

    /// Integer view: first element of an integer list, or text holding an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RawValue::IntegerList(v) => v.first().copied(),
            RawValue::Text(s) => s.trim().parse().ok(),
            RawValue::Rational(n, 1) => Some(*n),
            _ => None,
        }
    }

    /// List view. A single text value is a one-element list.
    pub fn as_list(&self) -> Option<Vec<String>> {
        match self {
            RawValue::Bag(v) | RawValue::Seq(v) => Some(v.clone()),
            RawValue::Text(s) => Some(vec![s.clone()]),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Text(_) => "text",
            RawValue::IntegerList(_) => "integer list",
            RawValue::Rational(..) => "rational",
            RawValue::RationalList(_) => "rational list",
            RawValue::LangAltMap(_) => "lang-alt",
            RawValue::Bag(_) => "bag",
            RawValue::Seq(_) => "seq",
        }
    }
}

/// Accessor over the Exif, IPTC and XMP containers of one image.
pub trait TagStore {
    /// Whether the underlying codec can read and write this container.
    fn supports(&self, _container: Container) -> bool {
        true
    }

    fn get(&self, container: Container, key: &str) -> Option<RawValue>;

    fn set(&mut self, container: Container, key: &str, value: RawValue);

    fn remove(&mut self, container: Container, key: &str);

    fn enumerate(&self, container: Container) -> Vec<(String, RawValue)>;

    /// JPEG COM segment / PNG iTXt comment, which lives outside the three containers.
    fn file_comment(&self) -> Option<String> {
        None
    }

    /// An empty comment clears the section.
    fn set_file_comment(&mut self, _comment: &str) {}
}

/// In-memory tag store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryTagStore {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub exif: BTreeMap<String, RawValue>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub iptc: BTreeMap<String, RawValue>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub xmp: BTreeMap<String, RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Containers the originating codec could not handle.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub unsupported: BTreeSet<Container>,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for fixtures.
    pub fn with(mut self, container: Container, key: &str, value: RawValue) -> Self {
        self.set(container, key, value);
        self
    }

    /// Mark a container as unsupported by the codec this store came from.
    pub fn without_support(mut self, container: Container) -> Self {
        self.unsupported.insert(container);
        self
    }

    pub fn container(&self, container: Container) -> &BTreeMap<String, RawValue> {
        match container {
            Container::Exif => &self.exif,
            Container::Iptc => &self.iptc,
            Container::Xmp => &self.xmp,
        }
    }

    pub fn container_mut(&mut self, container: Container) -> &mut BTreeMap<String, RawValue> {
        match container {
            Container::Exif => &mut self.exif,
            Container::Iptc => &mut self.iptc,
            Container::Xmp => &mut self.xmp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exif.is_empty() && self.iptc.is_empty() && self.xmp.is_empty() && self.comment.is_none()
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl TagStore for MemoryTagStore {
    fn supports(&self, container: Container) -> bool {
        !self.unsupported.contains(&container)
    }

    fn get(&self, container: Container, key: &str) -> Option<RawValue> {
        self.container(container).get(key).cloned()
    }

    fn set(&mut self, container: Container, key: &str, value: RawValue) {
        self.container_mut(container).insert(key.to_string(), value);
    }

    fn remove(&mut self, container: Container, key: &str) {
        self.container_mut(container).remove(key);
    }

    fn enumerate(&self, container: Container) -> Vec<(String, RawValue)> {
        self.container(container)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn file_comment(&self) -> Option<String> {
        self.comment.clone()
    }

    fn set_file_comment(&mut self, comment: &str) {
        self.comment = (!comment.is_empty()).then(|| comment.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_from_key_prefix() {
        assert_eq!(Container::from_key("Exif.Image.Artist"), Some(Container::Exif));
        assert_eq!(
            Container::from_key("Iptc.Application2.Caption"),
            Some(Container::Iptc)
        );
        assert_eq!(Container::from_key("Xmp.dc.subject"), Some(Container::Xmp));
        assert_eq!(Container::from_key("JPEG/TIFF Comments"), None);
    }

    #[test]
    fn set_get_remove() {
        let mut store = MemoryTagStore::new();
        store.set(Container::Xmp, "Xmp.xmp.Rating", RawValue::text("4"));
        assert_eq!(
            store.get(Container::Xmp, "Xmp.xmp.Rating"),
            Some(RawValue::text("4"))
        );
        // Same key in another container is a different tag
        assert_eq!(store.get(Container::Exif, "Xmp.xmp.Rating"), None);

        store.remove(Container::Xmp, "Xmp.xmp.Rating");
        assert_eq!(store.get(Container::Xmp, "Xmp.xmp.Rating"), None);
    }

    #[test]
    fn enumerate_is_key_ordered() {
        let store = MemoryTagStore::new()
            .with(Container::Exif, "Exif.Image.Software", RawValue::text("b"))
            .with(Container::Exif, "Exif.Image.Artist", RawValue::text("a"));
        let keys: Vec<String> = store
            .enumerate(Container::Exif)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["Exif.Image.Artist", "Exif.Image.Software"]);
    }

    #[test]
    fn supports_defaults_to_all_containers() {
        let store = MemoryTagStore::new();
        assert!(Container::ALL.iter().all(|c| store.supports(*c)));

        let no_xmp = MemoryTagStore::new().without_support(Container::Xmp);
        assert!(!no_xmp.supports(Container::Xmp));
        assert!(no_xmp.supports(Container::Exif));
    }

    #[test]
    fn file_comment_roundtrip() {
        let mut store = MemoryTagStore::new();
        assert_eq!(store.file_comment(), None);
        store.set_file_comment("scanned from slide");
        assert_eq!(store.file_comment().as_deref(), Some("scanned from slide"));
    }

    #[test]
    fn raw_value_text_views() {
        assert_eq!(RawValue::integer(3).as_text().as_deref(), Some("3"));
        assert_eq!(RawValue::Rational(72, 1).as_text().as_deref(), Some("72/1"));
        let mut map = LangAltMap::new();
        map.insert("de-DE".into(), "Hallo".into());
        map.insert(X_DEFAULT.into(), "Hello".into());
        assert_eq!(RawValue::LangAltMap(map).as_text().as_deref(), Some("Hello"));
        assert_eq!(RawValue::Bag(vec!["a".into()]).as_text(), None);
    }

    #[test]
    fn raw_value_integer_view() {
        assert_eq!(RawValue::IntegerList(vec![6, 1]).as_integer(), Some(6));
        assert_eq!(RawValue::text(" 8 ").as_integer(), Some(8));
        assert_eq!(RawValue::Rational(3, 1).as_integer(), Some(3));
        assert_eq!(RawValue::Rational(3, 2).as_integer(), None);
        assert_eq!(RawValue::text("six").as_integer(), None);
    }

    #[test]
    fn raw_value_list_views() {
        assert_eq!(
            RawValue::text("solo").as_list(),
            Some(vec!["solo".to_string()])
        );
        assert_eq!(
            RawValue::Seq(vec!["a".into(), "b".into()]).as_list(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(RawValue::integer(1).as_list(), None);
    }

    #[test]
    fn json_dump_shape() {
        let store = MemoryTagStore::new()
            .with(Container::Xmp, "Xmp.xmp.Rating", RawValue::text("5"))
            .with(Container::Exif, "Exif.Image.0x4746", RawValue::integer(5));
        let json = store.to_json_pretty().unwrap();
        assert!(json.contains("\"type\": \"text\""));
        assert!(json.contains("\"type\": \"integer_list\""));
        // Empty containers are omitted
        assert!(!json.contains("\"iptc\""));

        let back = MemoryTagStore::from_json_str(&json).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn json_rejects_unknown_fields() {
        let result = MemoryTagStore::from_json_str(r#"{"exiff": {}}"#);
        assert!(result.is_err());
    }
}
