//! Field resolution: which stored value wins.
//!
//! For one logical field, the resolver walks the catalog's read list in
//! priority order and returns the first entry that yields a usable value:
//!
//! 1. Disabled entries, and entries whose container the store cannot handle,
//!    are skipped.
//! 2. The entry's own tag is read; if absent (or empty), its alternative tag
//!    is tried with the alternative encoding.
//! 3. The raw value is decoded according to the entry's encoding. A value
//!    that cannot be decoded is recorded as an issue and the entry is treated
//!    as absent.
//!
//! No hit is a normal outcome: the result's `value` is `None`.
//!
//! Tag paths are always returned with `/` separators, whatever the namespace
//! stores. Ratings are mapped back to 0..=5 stars through the entry's scale.

use crate::acdsee;
use crate::catalog::NamespaceCatalog;
use crate::error::MetadataError;
use crate::namespace::{CategoryKey, NamespaceEntry, SpecialEncoding};
use crate::rating::{self, RatingScale};
use crate::store::{Container, LangAltMap, RawValue, TagStore, X_DEFAULT};
use log::{debug, warn};

/// Outcome of resolving one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: Option<T>,
    /// Tag name the value came from.
    pub source: Option<String>,
    /// Decode failures met along the way. These never stop resolution.
    pub issues: Vec<MetadataError>,
}

impl<T> Resolved<T> {
    fn absent(issues: Vec<MetadataError>) -> Self {
        Self {
            value: None,
            source: None,
            issues,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved {
            value: self.value.map(f),
            source: self.source,
            issues: self.issues,
        }
    }
}

/// A caption with its language variants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    /// The variant selected for the requested language.
    pub text: String,
    /// Every variant the namespace carried, keyed by language tag.
    pub translations: LangAltMap,
}

impl Comment {
    /// A comment with only a default-language variant.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut translations = LangAltMap::new();
        translations.insert(X_DEFAULT.to_string(), text.clone());
        Self { text, translations }
    }

    pub fn with_translation(mut self, language: &str, text: impl Into<String>) -> Self {
        self.translations.insert(language.to_string(), text.into());
        self
    }
}

/// Decoded value of an arbitrary category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    LangAlt(LangAltMap),
    Stars(u8),
}

/// Resolves fields of one image against one catalog.
pub struct FieldResolver<'a> {
    catalog: &'a NamespaceCatalog,
    store: &'a dyn TagStore,
}

type Decoded<T> = Result<Option<T>, MetadataError>;

impl<'a> FieldResolver<'a> {
    pub fn new(catalog: &'a NamespaceCatalog, store: &'a dyn TagStore) -> Self {
        Self { catalog, store }
    }

    /// Hierarchical tag paths, `/`-separated.
    pub fn resolve_tags(&self) -> Resolved<Vec<String>> {
        self.first_hit(&CategoryKey::Tags, decode_list)
    }

    /// Star count in 0..=5.
    pub fn resolve_rating(&self) -> Resolved<u8> {
        self.first_hit(&CategoryKey::Rating, decode_rating)
    }

    /// Caption, selecting `language` where the namespace carries variants.
    ///
    /// Falls back to `x-default`, then to the first variant present.
    pub fn resolve_comment(&self, language: Option<&str>) -> Resolved<Comment> {
        self.first_hit(&CategoryKey::Comment, |entry, container, key, encoding, raw| {
            decode_comment(entry, container, key, encoding, raw, language)
        })
    }

    /// Any registered category. Built-ins decode as their dedicated resolvers do.
    pub fn resolve_field(&self, key: &CategoryKey) -> Resolved<FieldValue> {
        match key {
            CategoryKey::Tags => self.resolve_tags().map(FieldValue::List),
            CategoryKey::Rating => self.resolve_rating().map(FieldValue::Stars),
            CategoryKey::Comment => self.resolve_comment(None).map(|c| FieldValue::Text(c.text)),
            CategoryKey::Custom(_) => self.first_hit(key, decode_generic),
        }
    }

    fn fetch(&self, container: Container, key: &str, encoding: SpecialEncoding) -> Option<RawValue> {
        if encoding == SpecialEncoding::JpegComment {
            return self.store.file_comment().map(RawValue::Text);
        }
        self.store.get(container, key)
    }

    fn first_hit<T>(
        &self,
        category: &CategoryKey,
        mut decode: impl FnMut(&NamespaceEntry, Container, &str, SpecialEncoding, RawValue) -> Decoded<T>,
    ) -> Resolved<T> {
        let mut issues = Vec::new();

        for entry in self.catalog.read_entries(category) {
            if !entry.enabled {
                continue;
            }
            if entry.special_encoding != SpecialEncoding::JpegComment
                && !self.store.supports(entry.container)
            {
                debug!(
                    "event=resolve_skip module=resolve category={category} entry={} reason=unsupported_container",
                    entry.name
                );
                continue;
            }

            let primary = Some((entry.name.as_str(), entry.special_encoding));
            let alternative = entry
                .alternative_name
                .as_deref()
                .map(|name| (name, entry.alternative_encoding));

            for (name, encoding) in primary.into_iter().chain(alternative) {
                let Some(raw) = self.fetch(entry.container, name, encoding) else {
                    continue;
                };
                match decode(entry, entry.container, name, encoding, raw) {
                    Ok(Some(value)) => {
                        debug!("event=resolve_hit module=resolve category={category} source={name}");
                        return Resolved {
                            value: Some(value),
                            source: Some(name.to_string()),
                            issues,
                        };
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("event=resolve_decode_failed module=resolve category={category} error=\"{e}\"");
                        issues.push(e);
                    }
                }
            }
        }

        Resolved::absent(issues)
    }
}

// ============================================================================
// Decoders
// ============================================================================

/// List fields: tag paths or any bag-like custom field.
fn decode_list(
    entry: &NamespaceEntry,
    container: Container,
    key: &str,
    encoding: SpecialEncoding,
    raw: RawValue,
) -> Decoded<Vec<String>> {
    let items = match (encoding, raw) {
        (SpecialEncoding::VendorTagList, raw) => {
            let xml = raw
                .as_text()
                .ok_or_else(|| MetadataError::encoding(container, key, "expected category XML text"))?;
            acdsee::parse_categories(&xml).map_err(|reason| MetadataError::encoding(container, key, reason))?
        }
        (_, RawValue::Bag(items) | RawValue::Seq(items)) => items,
        (SpecialEncoding::DelimitedText, RawValue::Text(text)) => text
            .split(entry.path_separator.as_str())
            .map(str::to_string)
            .collect(),
        (_, RawValue::Text(text)) => vec![text],
        (_, other) => {
            return Err(MetadataError::encoding(
                container,
                key,
                format!("{} cannot hold a tag list", other.type_name()),
            ));
        }
    };

    let normalize = entry.is_hierarchical() && entry.path_separator != "/";
    let items: Vec<String> = items
        .into_iter()
        .map(|item| {
            let item = item.trim();
            if normalize {
                item.replace(entry.path_separator.as_str(), "/")
            } else {
                item.to_string()
            }
        })
        .filter(|item| !item.is_empty())
        .collect();

    Ok((!items.is_empty()).then_some(items))
}

fn decode_rating(
    entry: &NamespaceEntry,
    container: Container,
    key: &str,
    _encoding: SpecialEncoding,
    raw: RawValue,
) -> Decoded<u8> {
    if let RawValue::Text(text) = &raw
        && text.trim().is_empty()
    {
        return Ok(None);
    }
    let external = rating::extract_number(container, key, &raw)?;
    let scale = entry.rating_scale.unwrap_or(RatingScale::STANDARD);
    Ok(Some(rating::from_external(external, &scale)))
}

/// Exif UserComment values may start with a `charset=...` marker.
fn strip_charset(text: &str) -> &str {
    match text.strip_prefix("charset=") {
        Some(rest) => rest.split_once(' ').map_or("", |(_, body)| body),
        None => text,
    }
}

fn select_language(map: &LangAltMap, language: Option<&str>) -> Option<(String, String)> {
    language
        .and_then(|lang| map.get_key_value(lang))
        .or_else(|| map.get_key_value(X_DEFAULT))
        .or_else(|| map.iter().next())
        .map(|(lang, text)| (lang.clone(), text.clone()))
}

fn decode_comment(
    _entry: &NamespaceEntry,
    container: Container,
    key: &str,
    encoding: SpecialEncoding,
    raw: RawValue,
    language: Option<&str>,
) -> Decoded<Comment> {
    let map = match raw {
        RawValue::LangAltMap(map) => map,
        RawValue::Text(text) => {
            let text = if container == Container::Exif {
                strip_charset(&text).to_string()
            } else {
                text
            };
            let mut map = LangAltMap::new();
            map.insert(X_DEFAULT.to_string(), text);
            map
        }
        other => {
            return Err(MetadataError::encoding(
                container,
                key,
                format!("{} cannot hold a comment", other.type_name()),
            ));
        }
    };

    let map: LangAltMap = map
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .collect();
    let Some((lang, text)) = select_language(&map, language) else {
        return Ok(None);
    };

    let translations = if encoding == SpecialEncoding::LangAltList {
        map
    } else {
        LangAltMap::from([(lang, text.clone())])
    };
    Ok(Some(Comment { text, translations }))
}

fn decode_generic(
    entry: &NamespaceEntry,
    container: Container,
    key: &str,
    encoding: SpecialEncoding,
    raw: RawValue,
) -> Decoded<FieldValue> {
    match encoding {
        list if list.is_list() => {
            Ok(decode_list(entry, container, key, encoding, raw)?.map(FieldValue::List))
        }
        SpecialEncoding::LangAlt | SpecialEncoding::LangAltList => {
            Ok(decode_comment(entry, container, key, encoding, raw, None)?
                .map(|c| FieldValue::LangAlt(c.translations)))
        }
        _ => match raw {
            RawValue::Bag(items) | RawValue::Seq(items) => {
                Ok((!items.is_empty()).then_some(FieldValue::List(items)))
            }
            other => {
                let text = other.as_text().ok_or_else(|| {
                    MetadataError::encoding(
                        container,
                        key,
                        format!("{} has no text form", other.type_name()),
                    )
                })?;
                Ok((!text.trim().is_empty()).then_some(FieldValue::Text(text)))
            }
        },
    }
}
