//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every image is shown by its dump path, followed by indented context lines
//! for each field that resolved. Fields with no value are omitted rather than
//! printed as empty, and problems are listed last so they stand out.
//!
//! # Output Format
//!
//! ## Resolve
//!
//! ```text
//! 001 trip/IMG_0042.json (sidecar)
//!     Tags: People/Ann, Sunset
//!     Rating: ★★★☆☆ (3)
//!     Comment: Beach at dusk
//!     GPS: 33°27'24.44"S 151°12'00.00"E, 12.5 m
//!     Orientation: 6 (rotate 90)
//!     Issue: cannot decode XMP tag Xmp.xmp.Rating: 'x' is not a number
//!
//! Resolved 1 image, 0 failed
//! ```
//!
//! ## Catalog
//!
//! ```text
//! rating (read)
//!     000 Xmp.xmp.Rating [XMP] scale 0,1,2,3,4,5
//!     003 Exif.Image.0x4746 [Exif] scale 0,1,2,3,4,5 (disabled)
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::batch::{BatchError, ResolvedMetadata};
use crate::catalog::NamespaceCatalog;
use crate::gps::{self, GpsPosition};
use crate::namespace::{NamespaceEntry, SpecialEncoding};
use crate::orientation::{ExifOrientation, PrimitiveAction};
use crate::rating::MAX_STARS;
use crate::sidecar::SidecarState;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((at, _)) => format!("{}...", &text[..at]),
        None => text.to_string(),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn format_stars(stars: u8) -> String {
    let filled = stars.min(MAX_STARS) as usize;
    format!(
        "{}{} ({stars})",
        "\u{2605}".repeat(filled),
        "\u{2606}".repeat(MAX_STARS as usize - filled)
    )
}

fn format_position(position: &GpsPosition) -> String {
    let lat = gps::coordinate_to_presentable(true, position.latitude);
    let lon = gps::coordinate_to_presentable(false, position.longitude);
    match position.altitude {
        Some(altitude) => format!("{lat} {lon}, {altitude} m"),
        None => format!("{lat} {lon}"),
    }
}

// ============================================================================
// Resolve
// ============================================================================

/// Context lines for one resolved image.
pub fn format_resolved(index: usize, resolved: &ResolvedMetadata) -> Vec<String> {
    let mut lines = Vec::new();
    let sidecar = match resolved.sidecar {
        SidecarState::SidecarLoaded => " (sidecar)",
        SidecarState::NoSidecar | SidecarState::FileOnly => "",
    };
    lines.push(format!(
        "{} {}{sidecar}",
        format_index(index),
        resolved.path.display()
    ));

    let pad = indent(1);
    if let Some(tags) = &resolved.tags {
        lines.push(format!("{pad}Tags: {}", tags.join(", ")));
    }
    if let Some(stars) = resolved.rating {
        lines.push(format!("{pad}Rating: {}", format_stars(stars)));
    }
    if let Some(comment) = &resolved.comment {
        lines.push(format!("{pad}Comment: {}", truncate_desc(&comment.text, 60)));
    }
    if let Some(position) = &resolved.gps {
        lines.push(format!("{pad}GPS: {}", format_position(position)));
    }
    if resolved.orientation != ExifOrientation::Unspecified {
        lines.push(format!("{pad}Orientation: {}", resolved.orientation));
    }
    for issue in &resolved.issues {
        lines.push(format!("{pad}Issue: {issue}"));
    }
    lines
}

/// Full output of the `resolve` command, with a closing summary line.
pub fn format_resolve_output(results: &[Result<ResolvedMetadata, BatchError>]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut failed = 0;
    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(resolved) => lines.extend(format_resolved(i + 1, resolved)),
            Err(e) => {
                failed += 1;
                lines.push(format!("{} error: {e}", format_index(i + 1)));
            }
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "Resolved {}, {failed} failed",
        plural(results.len() - failed, "image")
    ));
    lines
}

pub fn print_resolve_output(results: &[Result<ResolvedMetadata, BatchError>]) {
    for line in format_resolve_output(results) {
        println!("{}", line);
    }
}

// ============================================================================
// GPS
// ============================================================================

/// XMP strings, Exif rationals and display form of a position.
pub fn format_gps_encoding(position: &GpsPosition) -> Vec<String> {
    let mut lines = Vec::new();
    for (label, is_latitude, degrees) in [
        ("Latitude", true, position.latitude),
        ("Longitude", false, position.longitude),
    ] {
        lines.push(format!("{label}: {degrees}"));
        if let Some(xmp) = gps::coordinate_to_string(is_latitude, degrees) {
            lines.push(format!("{}XMP: {xmp}", indent(1)));
        }
        let rational = gps::RationalCoordinate::from_degrees(is_latitude, degrees);
        lines.push(format!(
            "{}Exif: {}/{} {}/{} {}/{} {}",
            indent(1),
            rational.degrees.0,
            rational.degrees.1,
            rational.minutes.0,
            rational.minutes.1,
            rational.seconds.0,
            rational.seconds.1,
            rational.direction
        ));
        lines.push(format!(
            "{}Display: {}",
            indent(1),
            gps::coordinate_to_presentable(is_latitude, degrees)
        ));
    }
    if let Some(altitude) = position.altitude
        && let Some((reference, (num, den))) = gps::altitude_to_rational(altitude)
    {
        lines.push(format!("Altitude: {altitude} m"));
        lines.push(format!("{}Exif: {num}/{den} ref {reference}", indent(1)));
    }
    lines
}

pub fn print_gps_encoding(position: &GpsPosition) {
    for line in format_gps_encoding(position) {
        println!("{}", line);
    }
}

// ============================================================================
// Orientation
// ============================================================================

pub fn format_orientation(
    start: ExifOrientation,
    actions: &[PrimitiveAction],
    result: ExifOrientation,
) -> Vec<String> {
    let mut lines = vec![format!("Stored: {start}")];
    if !actions.is_empty() {
        let applied: Vec<String> = actions.iter().map(ToString::to_string).collect();
        lines.push(format!("Applied: {}", applied.join(", ")));
    }
    lines.push(format!("Result: {result}"));
    let steps: Vec<String> = result
        .matrix()
        .decompose()
        .iter()
        .map(ToString::to_string)
        .collect();
    if !steps.is_empty() {
        lines.push(format!("{}Steps: {}", indent(1), steps.join(", then ")));
    }
    if result.swaps_dimensions() {
        lines.push(format!("{}Width and height swap when displayed", indent(1)));
    }
    lines
}

pub fn print_orientation(start: ExifOrientation, actions: &[PrimitiveAction], result: ExifOrientation) {
    for line in format_orientation(start, actions, result) {
        println!("{}", line);
    }
}

// ============================================================================
// Catalog
// ============================================================================

fn entry_line(entry: &NamespaceEntry) -> String {
    let mut line = format!(
        "{}{} {} [{}]",
        indent(1),
        format_index(entry.priority as usize),
        entry.name,
        entry.container
    );
    if entry.is_hierarchical() {
        line.push_str(&format!(" path '{}'", entry.path_separator));
    }
    if entry.special_encoding != SpecialEncoding::None {
        line.push_str(&format!(" {:?}", entry.special_encoding));
    }
    if let Some(alternative) = &entry.alternative_name {
        line.push_str(&format!(" or {alternative}"));
    }
    if let Some(scale) = &entry.rating_scale {
        let values: Vec<String> = scale.values().iter().map(ToString::to_string).collect();
        line.push_str(&format!(" scale {}", values.join(",")));
    }
    if !entry.enabled {
        line.push_str(" (disabled)");
    }
    line
}

/// Every category with its read and write lists.
pub fn format_catalog(catalog: &NamespaceCatalog) -> Vec<String> {
    let mut lines = Vec::new();
    if catalog.unify_read_write() {
        lines.push("Unified: writes go to the first enabled read entry".to_string());
    }
    for key in catalog.categories() {
        lines.push(format!("{key} (read)"));
        lines.extend(catalog.read_entries(key).iter().map(entry_line));
        if !catalog.unify_read_write() {
            lines.push(format!("{key} (write)"));
            lines.extend(catalog.write_entries(key).iter().map(entry_line));
        }
    }
    lines
}

pub fn print_catalog(catalog: &NamespaceCatalog) {
    for line in format_catalog(catalog) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Comment;
    use std::path::PathBuf;

    fn resolved() -> ResolvedMetadata {
        ResolvedMetadata {
            path: PathBuf::from("trip/IMG_0042.json"),
            sidecar: SidecarState::SidecarLoaded,
            tags: Some(vec!["People/Ann".into(), "Sunset".into()]),
            rating: Some(3),
            comment: Some(Comment::new("Beach at dusk")),
            gps: None,
            orientation: ExifOrientation::Rotate90,
            issues: vec!["bad value".into()],
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn truncate_desc_short() {
        assert_eq!(truncate_desc("Short text", 40), "Short text");
    }

    #[test]
    fn truncate_desc_multibyte() {
        let text = "é".repeat(50);
        assert_eq!(truncate_desc(&text, 40), format!("{}...", "é".repeat(40)));
    }

    #[test]
    fn format_index_padding() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn stars_display() {
        assert_eq!(format_stars(3), "★★★☆☆ (3)");
        assert_eq!(format_stars(0), "☆☆☆☆☆ (0)");
    }

    // =========================================================================
    // Resolve output
    // =========================================================================

    #[test]
    fn resolved_lines() {
        let lines = format_resolved(1, &resolved());
        assert_eq!(
            lines,
            vec![
                "001 trip/IMG_0042.json (sidecar)",
                "    Tags: People/Ann, Sunset",
                "    Rating: ★★★☆☆ (3)",
                "    Comment: Beach at dusk",
                "    Orientation: 6 (rotate 90)",
                "    Issue: bad value",
            ]
        );
    }

    #[test]
    fn empty_fields_omitted() {
        let bare = ResolvedMetadata {
            path: PathBuf::from("a.json"),
            sidecar: SidecarState::NoSidecar,
            tags: None,
            rating: None,
            comment: None,
            gps: None,
            orientation: ExifOrientation::Unspecified,
            issues: Vec::new(),
        };
        assert_eq!(format_resolved(2, &bare), vec!["002 a.json"]);
    }

    #[test]
    fn resolve_summary_counts_failures() {
        let results = vec![
            Ok(resolved()),
            Err(BatchError::Io {
                path: PathBuf::from("gone.json"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            }),
        ];
        let lines = format_resolve_output(&results);
        assert_eq!(lines.last().unwrap(), "Resolved 1 image, 1 failed");
        assert!(lines.iter().any(|l| l.starts_with("002 error: cannot read gone.json")));
    }

    // =========================================================================
    // GPS / orientation / catalog
    // =========================================================================

    #[test]
    fn gps_encoding_lines() {
        let lines = format_gps_encoding(&GpsPosition::new(-33.456789, 151.2).with_altitude(-3.5));
        assert!(lines.iter().any(|l| l.contains("XMP: 33,27.40734S")));
        assert!(lines.iter().any(|l| l.ends_with("ref 1")));
        assert!(lines[0].starts_with("Latitude: -33.456789"));
    }

    #[test]
    fn orientation_lines() {
        let lines = format_orientation(
            ExifOrientation::Normal,
            &[PrimitiveAction::Rotate90],
            ExifOrientation::Rotate90,
        );
        assert_eq!(lines[0], "Stored: 1 (normal)");
        assert_eq!(lines[2], "Result: 6 (rotate 90)");
        assert!(lines.last().unwrap().contains("swap"));
    }

    #[test]
    fn catalog_lists_every_category() {
        let lines = format_catalog(&NamespaceCatalog::defaults());
        assert!(lines.contains(&"rating (read)".to_string()));
        assert!(lines.contains(&"tags (write)".to_string()));
        assert!(lines.iter().any(|l| l.contains("Xmp.lr.hierarchicalSubject") && l.contains("path '|'")));
    }
}
