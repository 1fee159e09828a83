//! Orientation algebra.
//!
//! The eight Exif orientations form a closed group under composition. Each is
//! represented by a 2×2 integer matrix with entries in {-1, 0, 1}, so combining
//! a stored orientation with a user's rotate/flip operations is a matrix
//! product, and turning the result back into a sequence of lossless image
//! operations is a table lookup.
//!
//! Composition follows the usual product convention: `compose(a, b)` applies
//! `b` first. [`OrientationMatrix::then`] reads in application order instead.
//!
//! | Code | Name | Matrix | Actions |
//! |---|---|---|---|
//! | 1 | normal | `[[1,0],[0,1]]` | none |
//! | 2 | flip horizontal | `[[-1,0],[0,1]]` | flip H |
//! | 3 | rotate 180 | `[[-1,0],[0,-1]]` | rotate 180 |
//! | 4 | flip vertical | `[[1,0],[0,-1]]` | flip V |
//! | 5 | rotate 90, flip horizontal | `[[0,-1],[-1,0]]` | rotate 90, flip H |
//! | 6 | rotate 90 | `[[0,1],[-1,0]]` | rotate 90 |
//! | 7 | rotate 90, flip vertical | `[[0,1],[1,0]]` | rotate 90, flip V |
//! | 8 | rotate 270 | `[[0,-1],[1,0]]` | rotate 270 |

use crate::error::MetadataError;
use crate::store::{Container, RawValue, TagStore};
use log::debug;
use std::fmt;

const EXIF_ORIENTATION: &str = "Exif.Image.Orientation";
const XMP_ORIENTATION: &str = "Xmp.tiff.Orientation";
const THUMBNAIL_ORIENTATION: &str = "Exif.Thumbnail.Orientation";
/// Maker-note rotation written by Minolta and early Sony bodies.
const MINOLTA_ROTATION: [&str; 2] = ["Exif.MinoltaCs7D.Rotation", "Exif.MinoltaCs5D.Rotation"];

/// A single lossless image operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveAction {
    Rotate90,
    Rotate180,
    Rotate270,
    FlipHorizontal,
    FlipVertical,
}

impl PrimitiveAction {
    pub fn matrix(self) -> OrientationMatrix {
        match self {
            PrimitiveAction::Rotate90 => OrientationMatrix::ROTATE_90,
            PrimitiveAction::Rotate180 => OrientationMatrix::ROTATE_180,
            PrimitiveAction::Rotate270 => OrientationMatrix::ROTATE_270,
            PrimitiveAction::FlipHorizontal => OrientationMatrix::FLIP_HORIZONTAL,
            PrimitiveAction::FlipVertical => OrientationMatrix::FLIP_VERTICAL,
        }
    }
}

impl fmt::Display for PrimitiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveAction::Rotate90 => "rotate 90",
            PrimitiveAction::Rotate180 => "rotate 180",
            PrimitiveAction::Rotate270 => "rotate 270",
            PrimitiveAction::FlipHorizontal => "flip horizontal",
            PrimitiveAction::FlipVertical => "flip vertical",
        };
        f.write_str(name)
    }
}

/// One of the eight orientation matrices.
///
/// Only valid matrices can be constructed: use the constants or `TryFrom`
/// on raw entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrientationMatrix([[i8; 2]; 2]);

impl OrientationMatrix {
    pub const IDENTITY: Self = Self([[1, 0], [0, 1]]);
    pub const ROTATE_90: Self = Self([[0, 1], [-1, 0]]);
    pub const ROTATE_180: Self = Self([[-1, 0], [0, -1]]);
    pub const ROTATE_270: Self = Self([[0, -1], [1, 0]]);
    pub const FLIP_HORIZONTAL: Self = Self([[-1, 0], [0, 1]]);
    pub const FLIP_VERTICAL: Self = Self([[1, 0], [0, -1]]);
    pub const ROTATE_90_FLIP_HORIZONTAL: Self = Self([[0, -1], [-1, 0]]);
    pub const ROTATE_90_FLIP_VERTICAL: Self = Self([[0, 1], [1, 0]]);

    pub const ALL: [Self; 8] = [
        Self::IDENTITY,
        Self::ROTATE_90,
        Self::ROTATE_180,
        Self::ROTATE_270,
        Self::FLIP_HORIZONTAL,
        Self::FLIP_VERTICAL,
        Self::ROTATE_90_FLIP_HORIZONTAL,
        Self::ROTATE_90_FLIP_VERTICAL,
    ];

    pub fn entries(&self) -> [[i8; 2]; 2] {
        self.0
    }

    /// Whether `entries` is one of the eight orientation matrices.
    pub fn is_valid(entries: [[i8; 2]; 2]) -> bool {
        Self::ALL.iter().any(|m| m.0 == entries)
    }

    /// Apply `self`, then `next`.
    pub fn then(self, next: OrientationMatrix) -> OrientationMatrix {
        compose(next, self)
    }

    /// The orientation that undoes this one. For these matrices that is the transpose.
    pub fn inverse(self) -> OrientationMatrix {
        let [[a, b], [c, d]] = self.0;
        OrientationMatrix([[a, c], [b, d]])
    }

    /// Lossless operations producing this orientation, rotation first.
    pub fn decompose(self) -> Vec<PrimitiveAction> {
        use PrimitiveAction::*;
        match self {
            Self::ROTATE_90 => vec![Rotate90],
            Self::ROTATE_180 => vec![Rotate180],
            Self::ROTATE_270 => vec![Rotate270],
            Self::FLIP_HORIZONTAL => vec![FlipHorizontal],
            Self::FLIP_VERTICAL => vec![FlipVertical],
            Self::ROTATE_90_FLIP_HORIZONTAL => vec![Rotate90, FlipHorizontal],
            Self::ROTATE_90_FLIP_VERTICAL => vec![Rotate90, FlipVertical],
            _ => Vec::new(),
        }
    }
}

impl Default for OrientationMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TryFrom<[[i8; 2]; 2]> for OrientationMatrix {
    type Error = MetadataError;

    fn try_from(entries: [[i8; 2]; 2]) -> Result<Self, Self::Error> {
        if Self::is_valid(entries) {
            Ok(Self(entries))
        } else {
            Err(MetadataError::InvalidArgument(format!(
                "{entries:?} is not an orientation matrix"
            )))
        }
    }
}

/// Standard 2×2 product `a·b`: `b` applies first. Not commutative.
pub fn compose(a: OrientationMatrix, b: OrientationMatrix) -> OrientationMatrix {
    let [[a00, a01], [a10, a11]] = a.0;
    let [[b00, b01], [b10, b11]] = b.0;
    OrientationMatrix([
        [a00 * b00 + a01 * b10, a00 * b01 + a01 * b11],
        [a10 * b00 + a11 * b10, a10 * b01 + a11 * b11],
    ])
}

/// Exif orientation tag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ExifOrientation {
    #[default]
    Unspecified = 0,
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    Rotate90FlipHorizontal = 5,
    Rotate90 = 6,
    Rotate90FlipVertical = 7,
    Rotate270 = 8,
}

impl ExifOrientation {
    /// Anything outside 1..=8 is unspecified.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Normal,
            2 => Self::FlipHorizontal,
            3 => Self::Rotate180,
            4 => Self::FlipVertical,
            5 => Self::Rotate90FlipHorizontal,
            6 => Self::Rotate90,
            7 => Self::Rotate90FlipVertical,
            8 => Self::Rotate270,
            _ => Self::Unspecified,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Unspecified behaves like normal.
    pub fn matrix(self) -> OrientationMatrix {
        match self {
            Self::Unspecified | Self::Normal => OrientationMatrix::IDENTITY,
            Self::FlipHorizontal => OrientationMatrix::FLIP_HORIZONTAL,
            Self::Rotate180 => OrientationMatrix::ROTATE_180,
            Self::FlipVertical => OrientationMatrix::FLIP_VERTICAL,
            Self::Rotate90FlipHorizontal => OrientationMatrix::ROTATE_90_FLIP_HORIZONTAL,
            Self::Rotate90 => OrientationMatrix::ROTATE_90,
            Self::Rotate90FlipVertical => OrientationMatrix::ROTATE_90_FLIP_VERTICAL,
            Self::Rotate270 => OrientationMatrix::ROTATE_270,
        }
    }

    pub fn from_matrix(matrix: OrientationMatrix) -> Self {
        match matrix {
            OrientationMatrix::FLIP_HORIZONTAL => Self::FlipHorizontal,
            OrientationMatrix::ROTATE_180 => Self::Rotate180,
            OrientationMatrix::FLIP_VERTICAL => Self::FlipVertical,
            OrientationMatrix::ROTATE_90_FLIP_HORIZONTAL => Self::Rotate90FlipHorizontal,
            OrientationMatrix::ROTATE_90 => Self::Rotate90,
            OrientationMatrix::ROTATE_90_FLIP_VERTICAL => Self::Rotate90FlipVertical,
            OrientationMatrix::ROTATE_270 => Self::Rotate270,
            _ => Self::Normal,
        }
    }

    /// Whether displaying the image swaps width and height.
    pub fn swaps_dimensions(self) -> bool {
        self.code() >= 5
    }
}

impl fmt::Display for ExifOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unspecified => "unspecified",
            Self::Normal => "normal",
            Self::FlipHorizontal => "flip horizontal",
            Self::Rotate180 => "rotate 180",
            Self::FlipVertical => "flip vertical",
            Self::Rotate90FlipHorizontal => "rotate 90, flip horizontal",
            Self::Rotate90 => "rotate 90",
            Self::Rotate90FlipVertical => "rotate 90, flip vertical",
            Self::Rotate270 => "rotate 270",
        };
        write!(f, "{} ({name})", self.code())
    }
}

/// Exif code (1..=8) for a matrix.
pub fn to_orientation_code(matrix: OrientationMatrix) -> u8 {
    ExifOrientation::from_matrix(matrix).code()
}

/// Matrix for an Exif code. Unknown codes give the identity.
pub fn from_orientation_code(code: i64) -> OrientationMatrix {
    ExifOrientation::from_code(code).matrix()
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Displayed size of an image stored as `size` with orientation `code`.
pub fn apply_orientation_to_size(size: Dimensions, code: i64) -> Dimensions {
    if ExifOrientation::from_code(code).swaps_dimensions() {
        Dimensions {
            width: size.height,
            height: size.width,
        }
    } else {
        size
    }
}

/// Stored orientation `code` followed by the user's `actions`, as a new code.
pub fn rotate_orientation(code: i64, actions: &[PrimitiveAction]) -> ExifOrientation {
    let matrix = actions
        .iter()
        .fold(from_orientation_code(code), |m, action| m.then(action.matrix()));
    ExifOrientation::from_matrix(matrix)
}

/// Orientation recorded in the store.
///
/// XMP is consulted first, then the Minolta maker-note rotation (some of those
/// bodies write a wrong standard tag), then `Exif.Image.Orientation`.
pub fn read_orientation(store: &dyn TagStore) -> ExifOrientation {
    if store.supports(Container::Xmp)
        && let Some(code) = store
            .get(Container::Xmp, XMP_ORIENTATION)
            .and_then(|raw| raw.as_integer())
    {
        debug!("event=read_orientation module=orientation source={XMP_ORIENTATION} code={code}");
        return ExifOrientation::from_code(code);
    }

    for key in MINOLTA_ROTATION {
        if let Some(value) = store.get(Container::Exif, key).and_then(|raw| raw.as_integer()) {
            debug!("event=read_orientation module=orientation source={key} value={value}");
            return match value {
                76 => ExifOrientation::Rotate90,
                82 => ExifOrientation::Rotate270,
                _ => ExifOrientation::Normal,
            };
        }
    }

    store
        .get(Container::Exif, EXIF_ORIENTATION)
        .and_then(|raw| raw.as_integer())
        .map(ExifOrientation::from_code)
        .unwrap_or(ExifOrientation::Unspecified)
}

/// Record `orientation` in Exif and XMP.
///
/// Maker-note rotation tags are dropped so they cannot contradict the new
/// value, and an embedded thumbnail's orientation is rotated along.
pub fn write_orientation(store: &mut dyn TagStore, orientation: ExifOrientation) {
    let code = orientation.code() as i64;
    store.set(Container::Exif, EXIF_ORIENTATION, RawValue::integer(code));
    if store.supports(Container::Xmp) {
        store.set(Container::Xmp, XMP_ORIENTATION, RawValue::text(code.to_string()));
    }
    for key in MINOLTA_ROTATION {
        store.remove(Container::Exif, key);
    }
    if let Some(thumb) = store
        .get(Container::Exif, THUMBNAIL_ORIENTATION)
        .and_then(|raw| raw.as_integer())
    {
        // The thumbnail keeps its own orientation, then takes the new one
        let combined = from_orientation_code(thumb).then(orientation.matrix());
        store.set(
            Container::Exif,
            THUMBNAIL_ORIENTATION,
            RawValue::integer(to_orientation_code(combined) as i64),
        );
    }
}
