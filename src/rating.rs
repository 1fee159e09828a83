//! Star-rating scale conversion.
//!
//! Internally a rating is a star count in `0..=5`. Each rating namespace stores
//! it on its own external scale, described by a [`RatingScale`]: six integers
//! where index `n` is the external value for `n` stars.
//!
//! Going out is a table lookup. Coming back in is a nearest-value match, so
//! namespaces whose writers use approximate values (a vendor writing `60` on a
//! percent scale) still resolve to a sensible star count.
//!
//! ## Built-in scales
//!
//! | Scale | Values | Used by |
//! |---|---|---|
//! | [`STANDARD`](RatingScale::STANDARD) | 0 1 2 3 4 5 | `Xmp.xmp.Rating`, `Xmp.acdsee.rating`, `Exif.Image.0x4746` |
//! | [`PERCENT`](RatingScale::PERCENT) | 0 1 25 50 75 99 | `Xmp.MicrosoftPhoto.Rating`, `Exif.Image.0x4749` |
//! | [`IPTC_URGENCY`](RatingScale::IPTC_URGENCY) | 8 7 6 5 3 1 | `Iptc.Application2.Urgency` |

use crate::error::MetadataError;
use crate::store::{Container, RawValue};
use serde::{Deserialize, Serialize};

/// Highest star count.
pub const MAX_STARS: u8 = 5;

/// External values for 0..=5 stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingScale(pub [i64; 6]);

impl RatingScale {
    pub const STANDARD: RatingScale = RatingScale([0, 1, 2, 3, 4, 5]);
    pub const PERCENT: RatingScale = RatingScale([0, 1, 25, 50, 75, 99]);
    pub const IPTC_URGENCY: RatingScale = RatingScale([8, 7, 6, 5, 3, 1]);

    pub fn values(&self) -> &[i64; 6] {
        &self.0
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// External value for `stars` on `scale`.
pub fn to_external(stars: u8, scale: &RatingScale) -> Result<i64, MetadataError> {
    if stars > MAX_STARS {
        return Err(MetadataError::InvalidArgument(format!(
            "rating {stars} is outside 0..={MAX_STARS}"
        )));
    }
    Ok(scale.0[stars as usize])
}

/// Star count whose scale value is nearest to `value`. Ties go to the smaller star count.
pub fn from_external(value: i64, scale: &RatingScale) -> u8 {
    let mut best = 0u8;
    let mut best_distance = u64::MAX;
    for (stars, external) in scale.0.iter().enumerate() {
        let distance = value.abs_diff(*external);
        if distance < best_distance {
            best_distance = distance;
            best = stars as u8;
        }
    }
    best
}

/// Pull a number out of whatever representation the namespace uses.
///
/// Text may carry an integer or a decimal (rounded); integer lists yield their
/// first element; rationals are divided and rounded.
pub fn extract_number(container: Container, key: &str, raw: &RawValue) -> Result<i64, MetadataError> {
    match raw {
        RawValue::Text(text) => {
            let text = text.trim();
            if let Ok(n) = text.parse::<i64>() {
                return Ok(n);
            }
            match text.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(f.round() as i64),
                _ => Err(MetadataError::encoding(
                    container,
                    key,
                    format!("'{text}' is not a number"),
                )),
            }
        }
        RawValue::IntegerList(values) => values
            .first()
            .copied()
            .ok_or_else(|| MetadataError::encoding(container, key, "empty integer list")),
        RawValue::Rational(_, 0) => Err(MetadataError::encoding(
            container,
            key,
            "rational with zero denominator",
        )),
        RawValue::Rational(n, d) => Ok((*n as f64 / *d as f64).round() as i64),
        other => Err(MetadataError::encoding(
            container,
            key,
            format!("{} cannot hold a rating", other.type_name()),
        )),
    }
}

/// Raw representation a rating is written as: XMP and IPTC store text, Exif stores a short.
pub fn rating_raw_value(container: Container, external: i64) -> RawValue {
    match container {
        Container::Exif => RawValue::integer(external),
        Container::Iptc | Container::Xmp => RawValue::text(external.to_string()),
    }
}
