//! Namespace entries: one concrete tag candidate for a logical field.
//!
//! A logical field such as "tags" or "rating" is stored under many names by
//! different applications. Each [`NamespaceEntry`] describes one of them: which
//! container and key it lives under, how its value is encoded, how hierarchical
//! tag paths are separated, and (for ratings) which numeric scale it uses.
//!
//! Entries are grouped by [`CategoryKey`] in the [`catalog`](crate::catalog).

use crate::error::MetadataError;
use crate::rating::RatingScale;
use crate::store::Container;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical field category.
///
/// The three built-ins are known at compile time. Custom categories are opened
/// through [`NamespaceCatalog::register_category`](crate::catalog::NamespaceCatalog::register_category).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CategoryKey {
    Tags,
    Rating,
    Comment,
    Custom(String),
}

impl CategoryKey {
    pub const BUILTIN: [CategoryKey; 3] = [CategoryKey::Tags, CategoryKey::Rating, CategoryKey::Comment];

    pub fn as_str(&self) -> &str {
        match self {
            CategoryKey::Tags => "tags",
            CategoryKey::Rating => "rating",
            CategoryKey::Comment => "comment",
            CategoryKey::Custom(name) => name,
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, CategoryKey::Custom(_))
    }

    /// Parse a category name, validating custom names.
    pub fn parse(name: &str) -> Result<Self, MetadataError> {
        match name {
            "tags" => Ok(CategoryKey::Tags),
            "rating" => Ok(CategoryKey::Rating),
            "comment" => Ok(CategoryKey::Comment),
            _ => {
                validate_custom_name(name)?;
                Ok(CategoryKey::Custom(name.to_string()))
            }
        }
    }
}

fn validate_custom_name(name: &str) -> Result<(), MetadataError> {
    if name.is_empty() {
        return Err(MetadataError::Configuration(
            "category name must not be empty".into(),
        ));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(MetadataError::Configuration(format!(
            "category name '{name}' contains whitespace"
        )));
    }
    if CategoryKey::BUILTIN
        .iter()
        .any(|b| b.as_str().eq_ignore_ascii_case(name))
    {
        return Err(MetadataError::Configuration(format!(
            "category name '{name}' collides with a built-in category"
        )));
    }
    Ok(())
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CategoryKey> for String {
    fn from(key: CategoryKey) -> Self {
        match key {
            CategoryKey::Custom(name) => name,
            builtin => builtin.as_str().to_string(),
        }
    }
}

impl TryFrom<String> for CategoryKey {
    type Error = MetadataError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        CategoryKey::parse(&name)
    }
}

/// How tag values in an entry are laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagPathStyle {
    /// Leaf names only (`Paris`).
    #[default]
    Single,
    /// Full paths joined with the entry's separator (`Places|France|Paris`).
    HierarchicalPath,
}

/// Value encoding beyond a plain string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialEncoding {
    #[default]
    None,
    /// Language-alternative text; one language is selected.
    LangAlt,
    /// Language-alternative text; every language is kept.
    LangAltList,
    /// Plain text inside an XMP struct (ACDSee notes).
    XmpStructText,
    /// The file-level JPEG/TIFF comment, outside the three containers.
    JpegComment,
    XmpBag,
    XmpSeq,
    /// Plain text emulating a list, items joined by the entry's separator.
    DelimitedText,
    /// Vendor XML tag list (ACDSee categories).
    VendorTagList,
}

impl SpecialEncoding {
    pub fn is_list(self) -> bool {
        matches!(
            self,
            SpecialEncoding::XmpBag
                | SpecialEncoding::XmpSeq
                | SpecialEncoding::DelimitedText
                | SpecialEncoding::VendorTagList
        )
    }
}

fn default_separator() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One candidate tag for a logical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamespaceEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_name: Option<String>,
    pub category: CategoryKey,
    pub container: Container,
    pub priority: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_builtin: bool,
    #[serde(default)]
    pub tag_path_style: TagPathStyle,
    #[serde(default = "default_separator")]
    pub path_separator: String,
    #[serde(default)]
    pub special_encoding: SpecialEncoding,
    #[serde(default)]
    pub alternative_encoding: SpecialEncoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_scale: Option<RatingScale>,
}

impl NamespaceEntry {
    /// A plain, enabled, user-defined entry. Rating entries start on the standard scale.
    pub fn new(name: &str, category: CategoryKey, container: Container, priority: u32) -> Self {
        let rating_scale = (category == CategoryKey::Rating).then_some(RatingScale::STANDARD);
        Self {
            name: name.to_string(),
            alternative_name: None,
            category,
            container,
            priority,
            enabled: true,
            is_builtin: false,
            tag_path_style: TagPathStyle::Single,
            path_separator: default_separator(),
            special_encoding: SpecialEncoding::None,
            alternative_encoding: SpecialEncoding::None,
            rating_scale,
        }
    }

    pub fn hierarchical(mut self, separator: &str) -> Self {
        self.tag_path_style = TagPathStyle::HierarchicalPath;
        self.path_separator = separator.to_string();
        self
    }

    pub fn separator(mut self, separator: &str) -> Self {
        self.path_separator = separator.to_string();
        self
    }

    pub fn encoding(mut self, encoding: SpecialEncoding) -> Self {
        self.special_encoding = encoding;
        self
    }

    pub fn alternative(mut self, name: &str, encoding: SpecialEncoding) -> Self {
        self.alternative_name = Some(name.to_string());
        self.alternative_encoding = encoding;
        self
    }

    pub fn scale(mut self, scale: RatingScale) -> Self {
        self.rating_scale = Some(scale);
        self
    }

    pub fn builtin(mut self) -> Self {
        self.is_builtin = true;
        self
    }

    pub fn is_hierarchical(&self) -> bool {
        self.tag_path_style == TagPathStyle::HierarchicalPath
    }

    /// Check the per-entry invariants.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.name.trim().is_empty() {
            return Err(MetadataError::Configuration(format!(
                "{} entry with priority {} has an empty name",
                self.category, self.priority
            )));
        }
        if self.path_separator.is_empty() {
            return Err(MetadataError::Configuration(format!(
                "entry {} has an empty path separator",
                self.name
            )));
        }
        match (self.category == CategoryKey::Rating, self.rating_scale.is_some()) {
            (true, false) => Err(MetadataError::Configuration(format!(
                "rating entry {} has no rating scale",
                self.name
            ))),
            (false, true) => Err(MetadataError::Configuration(format!(
                "{} entry {} carries a rating scale",
                self.category, self.name
            ))),
            _ => Ok(()),
        }
    }
}
