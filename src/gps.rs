//! GPS coordinate codec.
//!
//! Three representations of the same position are in play:
//!
//! - signed decimal degrees (`-33.456789`), used internally;
//! - Exif rationals: three `num/den` pairs for degrees, minutes, seconds, with
//!   the sign carried by a separate reference tag (`N`/`S`, `E`/`W`);
//! - XMP coordinate strings: `DDD,MM.mmmmmmmmX` or `DDD,MM,SSX`, with the
//!   direction letter as the last character.
//!
//! Writes use one fixed form: `deg/1 min/1000000 0/1` in Exif and the
//! fractional-minute string in XMP. Reads accept whatever cameras and other
//! tools produce.
//!
//! ## Rational approximation
//!
//! [`decimal_to_rational`] rounds at a fixed number of decimal digits and
//! reduces by halving. The result is exact at that precision but the
//! denominator is not minimal. [`decimal_to_rational_small_denominator`]
//! searches for the best approximation with a small denominator, which is what
//! camera-style values (`1/250`, `10/3`) look like.
//!
//! ## Altitude
//!
//! Altitude is stored as an unsigned rational plus a reference: `0` above sea
//! level, `1` below. Decoding applies the sign from the reference.

use crate::error::MetadataError;
use crate::store::{Container, RawValue, TagStore};
use log::debug;
use std::fmt;

/// `(numerator, denominator)`
pub type Rational = (i64, i64);

const LATITUDE: &str = "Exif.GPSInfo.GPSLatitude";
const LATITUDE_REF: &str = "Exif.GPSInfo.GPSLatitudeRef";
const LONGITUDE: &str = "Exif.GPSInfo.GPSLongitude";
const LONGITUDE_REF: &str = "Exif.GPSInfo.GPSLongitudeRef";
const ALTITUDE: &str = "Exif.GPSInfo.GPSAltitude";
const ALTITUDE_REF: &str = "Exif.GPSInfo.GPSAltitudeRef";

const XMP_LATITUDE: &str = "Xmp.exif.GPSLatitude";
const XMP_LONGITUDE: &str = "Xmp.exif.GPSLongitude";
const XMP_ALTITUDE: &str = "Xmp.exif.GPSAltitude";
const XMP_ALTITUDE_REF: &str = "Xmp.exif.GPSAltitudeRef";

/// XMP GPS properties cleared before a write.
const XMP_GPS_KEYS: &[&str] = &[
    "Xmp.exif.GPSLatitudeRef",
    "Xmp.exif.GPSLongitudeRef",
    "Xmp.exif.GPSVersionID",
    "Xmp.exif.GPSLatitude",
    "Xmp.exif.GPSLongitude",
    "Xmp.exif.GPSAltitudeRef",
    "Xmp.exif.GPSAltitude",
    "Xmp.exif.GPSTimeStamp",
    "Xmp.exif.GPSSatellites",
    "Xmp.exif.GPSStatus",
    "Xmp.exif.GPSMeasureMode",
    "Xmp.exif.GPSDOP",
    "Xmp.exif.GPSSpeedRef",
    "Xmp.exif.GPSSpeed",
    "Xmp.exif.GPSTrackRef",
    "Xmp.exif.GPSTrack",
    "Xmp.exif.GPSImgDirectionRef",
    "Xmp.exif.GPSImgDirection",
    "Xmp.exif.GPSMapDatum",
    "Xmp.exif.GPSDestLatitude",
    "Xmp.exif.GPSDestLongitude",
    "Xmp.exif.GPSDestBearingRef",
    "Xmp.exif.GPSDestBearing",
    "Xmp.exif.GPSDestDistanceRef",
    "Xmp.exif.GPSDestDistance",
    "Xmp.exif.GPSProcessingMethod",
    "Xmp.exif.GPSAreaInformation",
    "Xmp.exif.GPSDifferential",
];

// ============================================================================
// Rational approximation
// ============================================================================

/// Largest magnitude whose integral part fits an `i64`.
const MAX_WHOLE: f64 = i64::MAX as f64;

/// Rational exact at `rounding_digits` decimal places.
///
/// The fractional part is rounded to `10^rounding_digits`, the fraction is
/// collapsed to `n/1` when integral, then halved while both parts are even.
/// `None` when the value is not finite or the result does not fit an `i64`.
pub fn decimal_to_rational(value: f64, rounding_digits: u32) -> Option<Rational> {
    let whole = value.trunc();
    if !value.is_finite() || whole.abs() >= MAX_WHOLE {
        return None;
    }
    let rounder = 10i64.checked_pow(rounding_digits)?;
    let fractional = ((value - whole) * rounder as f64).round() as i64;

    let mut num = (whole as i64).checked_mul(rounder)?.checked_add(fractional)?;
    let mut den = rounder;

    if num % den == 0 {
        num /= den;
        den = 1;
    }
    while num % 2 == 0 && den % 2 == 0 {
        num /= 2;
        den /= 2;
    }
    Some((num, den))
}

/// Closest rational with a denominator found by searching numerators `1..500`.
///
/// Falls back to [`decimal_to_rational`] at 5 digits when the whole part would
/// push the numerator past `i32::MAX`. The sign is carried by the numerator.
pub fn decimal_to_rational_small_denominator(value: f64) -> Option<Rational> {
    let negative = value < 0.0;
    let magnitude = value.abs();
    let whole = magnitude.trunc();
    if !value.is_finite() || whole >= MAX_WHOLE {
        return None;
    }
    let fractional = magnitude - whole;

    if fractional == 0.0 {
        let n = whole as i64;
        return Some((if negative { -n } else { n }, 1));
    }

    let criterion = 2.0 * fractional * f64::EPSILON;
    let mut least_error = fractional;
    let mut best_num: i64 = 0;
    let mut best_den: i64 = 1;

    for num in 1..500i64 {
        let approx = (num as f64 / fractional + 0.5) as i64;
        if approx == 0 {
            continue;
        }
        let error = (num as f64 / approx as f64 - fractional).abs();
        if error < least_error {
            best_num = num;
            best_den = approx;
            least_error = error;
            if least_error <= criterion {
                break;
            }
        }
    }

    if best_den as f64 * whole > i32::MAX as f64 {
        return decimal_to_rational(value, 5);
    }

    let num = best_num + best_den * whole as i64;
    Some((if negative { -num } else { num }, best_den))
}

// ============================================================================
// Coordinate strings
// ============================================================================

fn direction_for(is_latitude: bool, degrees: f64) -> char {
    match (is_latitude, degrees < 0.0) {
        (true, false) => 'N',
        (true, true) => 'S',
        (false, false) => 'E',
        (false, true) => 'W',
    }
}

/// Chop trailing zeros, keeping at least one fractional digit.
fn trim_minutes(formatted: String) -> String {
    let mut s = formatted;
    while s.ends_with('0') && !s.ends_with(".0") {
        s.pop();
    }
    s
}

/// `DDD,MM.mmmmmmmmX` for signed decimal degrees.
///
/// Minutes carry eight decimals, trailing zeros trimmed. Values outside
/// `-360..=360` (or not finite) have no string form.
pub fn coordinate_to_string(is_latitude: bool, degrees: f64) -> Option<String> {
    if !degrees.is_finite() || !(-360.0..=360.0).contains(&degrees) {
        return None;
    }
    let direction = direction_for(is_latitude, degrees);

    // Work in units of 1e-8 minutes so rounding can carry into the degrees
    const UNITS_PER_MINUTE: i64 = 100_000_000;
    const UNITS_PER_DEGREE: i64 = 60 * UNITS_PER_MINUTE;
    let total = (degrees.abs() * UNITS_PER_DEGREE as f64).round() as i64;
    let whole_degrees = total / UNITS_PER_DEGREE;
    let rest = total % UNITS_PER_DEGREE;
    let minutes = format!(
        "{}.{:08}",
        rest / UNITS_PER_MINUTE,
        rest % UNITS_PER_MINUTE
    );

    Some(format!("{whole_degrees},{}{direction}", trim_minutes(minutes)))
}

fn split_direction(s: &str) -> Option<(&str, char)> {
    let s = s.trim();
    let last = s.chars().last()?;
    let direction = last.to_ascii_uppercase();
    if !matches!(direction, 'N' | 'S' | 'E' | 'W') {
        return None;
    }
    Some((&s[..s.len() - last.len_utf8()], direction))
}

fn is_negative_direction(direction: char) -> bool {
    matches!(direction, 'S' | 'W')
}

/// Signed decimal degrees from `DDD,MM.mmX` or `DDD,MM,SSX`.
///
/// Returns `None` for any other field count, unparseable fields, or a missing
/// or unknown direction letter.
pub fn string_to_coordinate(s: &str) -> Option<f64> {
    let (body, direction) = split_direction(s)?;
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();

    let degrees = match parts.as_slice() {
        [d, m] => d.parse::<i64>().ok()? as f64 + m.parse::<f64>().ok()? / 60.0,
        [d, m, sec] => {
            d.parse::<i64>().ok()? as f64
                + m.parse::<f64>().ok()? / 60.0
                + sec.parse::<f64>().ok()? / 3600.0
        }
        _ => return None,
    };

    Some(if is_negative_direction(direction) {
        -degrees
    } else {
        degrees
    })
}

/// Degree, minute and second rationals plus the direction letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RationalCoordinate {
    pub degrees: Rational,
    pub minutes: Rational,
    pub seconds: Rational,
    pub direction: char,
}

impl RationalCoordinate {
    /// The fixed write form: `deg/1 min/1000000 0/1` on the absolute value.
    pub fn from_degrees(is_latitude: bool, degrees: f64) -> Self {
        let magnitude = degrees.abs();
        let whole = magnitude.floor();
        let minutes = ((magnitude - whole) * 60_000_000.0).floor() as i64;
        Self {
            degrees: (whole as i64, 1),
            minutes: (minutes, 1_000_000),
            seconds: (0, 1),
            direction: direction_for(is_latitude, degrees),
        }
    }

    /// Signed decimal degrees. Zero denominators on degrees or minutes are
    /// invalid; seconds with a zero denominator are ignored.
    pub fn to_degrees(&self) -> Option<f64> {
        let (dn, dd) = self.degrees;
        let (mn, md) = self.minutes;
        let (sn, sd) = self.seconds;
        if dd == 0 || md == 0 {
            return None;
        }
        let mut value = dn as f64 / dd as f64 + (mn as f64 / md as f64) / 60.0;
        if sd != 0 {
            value += (sn as f64 / sd as f64) / 3600.0;
        }
        Some(if is_negative_direction(self.direction) {
            -value
        } else {
            value
        })
    }

    pub fn to_raw(&self) -> RawValue {
        RawValue::RationalList(vec![self.degrees, self.minutes, self.seconds])
    }
}

/// XMP coordinate string for a rational triple.
///
/// Integral triples keep the `DDD,MM,SSX` form. Everything else becomes
/// fractional minutes. Zero denominators are invalid, except `0/0` seconds.
pub fn rationals_to_coordinate_string(coordinate: &RationalCoordinate) -> Option<String> {
    let (dn, dd) = coordinate.degrees;
    let (mn, md) = coordinate.minutes;
    let (sn, mut sd) = coordinate.seconds;
    let direction = coordinate.direction;

    if sd == 0 && sn == 0 {
        sd = 1;
    }

    if dd == 1 && md == 1 && sd == 1 {
        return Some(format!("{dn},{mn},{sn}{direction}"));
    }
    if dd == 1 && md == 100 && sd == 1 {
        let minutes = mn as f64 / md as f64 + sn as f64 / 60.0;
        return Some(format!(
            "{dn},{}{direction}",
            trim_minutes(format!("{minutes:.8}"))
        ));
    }
    if dd == 0 || md == 0 || sd == 0 {
        return None;
    }

    let degrees = dn as f64 / dd as f64;
    let whole = degrees.trunc();
    let minutes = mn as f64 / md as f64
        + (degrees - whole) * 60.0
        + (sn as f64 / sd as f64) / 60.0;
    Some(format!(
        "{},{}{direction}",
        whole as i64,
        trim_minutes(format!("{minutes:.8}"))
    ))
}

/// Rational triple for an XMP coordinate string.
pub fn string_to_rationals(s: &str) -> Option<RationalCoordinate> {
    let (body, direction) = split_direction(s)?;
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();

    match parts.as_slice() {
        [d, m] => Some(RationalCoordinate {
            degrees: (d.parse().ok()?, 1),
            minutes: ((m.parse::<f64>().ok()? * 1_000_000.0).round() as i64, 1_000_000),
            seconds: (0, 1),
            direction,
        }),
        [d, m, sec] => Some(RationalCoordinate {
            degrees: (d.parse().ok()?, 1),
            minutes: (m.parse().ok()?, 1),
            seconds: (sec.parse().ok()?, 1),
            direction,
        }),
        _ => None,
    }
}

// ============================================================================
// User-presentable form
// ============================================================================

/// Degrees, whole minutes and fractional seconds, for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dms {
    pub degrees: i32,
    pub minutes: i32,
    pub seconds: f64,
    pub direction: char,
}

impl fmt::Display for Dms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}°{:02}'{:05.2}\"{}",
            self.degrees, self.minutes, self.seconds, self.direction
        )
    }
}

/// Split an XMP coordinate string into display numbers.
pub fn to_user_presentable(s: &str) -> Option<Dms> {
    let (body, direction) = split_direction(s)?;
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();

    match parts.as_slice() {
        [d, m] => {
            let fractional_minutes: f64 = m.parse().ok()?;
            let minutes = fractional_minutes.trunc();
            Some(Dms {
                degrees: d.parse().ok()?,
                minutes: minutes as i32,
                seconds: (fractional_minutes - minutes) * 60.0,
                direction,
            })
        }
        [d, m, sec] => Some(Dms {
            degrees: d.parse().ok()?,
            minutes: m.parse().ok()?,
            seconds: sec.parse::<i64>().ok()? as f64,
            direction,
        }),
        _ => None,
    }
}

/// Display numbers for signed decimal degrees.
pub fn coordinate_to_presentable(is_latitude: bool, degrees: f64) -> Dms {
    let direction = direction_for(is_latitude, degrees);
    let magnitude = degrees.abs();
    let whole = magnitude.floor();
    let minutes_total = (magnitude - whole) * 60.0;
    let minutes = minutes_total.floor();
    Dms {
        degrees: whole as i32,
        minutes: minutes as i32,
        seconds: (minutes_total - minutes) * 60.0,
        direction,
    }
}

// ============================================================================
// Altitude
// ============================================================================

/// Reference byte and unsigned rational for a signed altitude in meters.
///
/// `None` when the altitude has no rational form.
pub fn altitude_to_rational(meters: f64) -> Option<(u8, Rational)> {
    let reference = if meters < 0.0 { 1 } else { 0 };
    Some((reference, decimal_to_rational(meters.abs(), 4)?))
}

/// Signed meters from a stored rational. Reference `1` means below sea level.
pub fn altitude_from_rational(reference: u8, num: i64, den: i64) -> Option<f64> {
    if den == 0 {
        return None;
    }
    let meters = num as f64 / den as f64;
    Some(if reference == 1 { -meters } else { meters })
}

fn parse_reference_byte(raw: &RawValue) -> Option<u8> {
    match raw {
        RawValue::IntegerList(v) => v.first().and_then(|n| u8::try_from(*n).ok()),
        other => other.as_text()?.trim().parse().ok(),
    }
}

fn parse_rational_text(text: &str) -> Option<Rational> {
    let (n, d) = text.trim().split_once('/')?;
    Some((n.trim().parse().ok()?, d.trim().parse().ok()?))
}

// ============================================================================
// Tag-store access
// ============================================================================

/// A decoded position. Altitude is optional: many devices never record it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

impl GpsPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
        }
    }

    pub fn with_altitude(mut self, meters: f64) -> Self {
        self.altitude = Some(meters);
        self
    }

    /// Build from two XMP coordinate strings.
    pub fn from_strings(latitude: &str, longitude: &str) -> Result<Self, MetadataError> {
        let lat = string_to_coordinate(latitude).ok_or_else(|| {
            MetadataError::InvalidArgument(format!("malformed latitude '{latitude}'"))
        })?;
        let lon = string_to_coordinate(longitude).ok_or_else(|| {
            MetadataError::InvalidArgument(format!("malformed longitude '{longitude}'"))
        })?;
        Ok(Self::new(lat, lon))
    }

    /// Reject coordinates outside the valid ranges and non-finite values.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(MetadataError::InvalidArgument(format!(
                "latitude {} is outside -90..=90",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(MetadataError::InvalidArgument(format!(
                "longitude {} is outside -180..=180",
                self.longitude
            )));
        }
        if let Some(alt) = self.altitude
            && altitude_to_rational(alt).is_none()
        {
            return Err(MetadataError::InvalidArgument(format!(
                "altitude {alt} is not a storable number"
            )));
        }
        Ok(())
    }
}

fn read_xmp_coordinate(store: &dyn TagStore, key: &str) -> Option<f64> {
    if !store.supports(Container::Xmp) {
        return None;
    }
    let text = store.get(Container::Xmp, key)?.as_text()?;
    string_to_coordinate(&text)
}

fn read_exif_coordinate(store: &dyn TagStore, key: &str, ref_key: &str, limit: f64) -> Option<f64> {
    let reference = store.get(Container::Exif, ref_key)?.as_text()?;
    let direction = reference.trim().chars().next()?.to_ascii_uppercase();

    let RawValue::RationalList(parts) = store.get(Container::Exif, key)? else {
        return None;
    };
    let [degrees, minutes, seconds] = parts.as_slice() else {
        return None;
    };
    let value = RationalCoordinate {
        degrees: *degrees,
        minutes: *minutes,
        seconds: *seconds,
        direction,
    }
    .to_degrees()?;

    (-limit..=limit).contains(&value).then_some(value)
}

fn read_xmp_altitude(store: &dyn TagStore) -> Option<f64> {
    if !store.supports(Container::Xmp) {
        return None;
    }
    let reference = parse_reference_byte(&store.get(Container::Xmp, XMP_ALTITUDE_REF)?)?;
    let text = store.get(Container::Xmp, XMP_ALTITUDE)?.as_text()?;
    let (num, den) = parse_rational_text(&text)?;
    altitude_from_rational(reference, num, den)
}

fn read_altitude(store: &dyn TagStore) -> Option<f64> {
    read_xmp_altitude(store).or_else(|| read_exif_altitude(store))
}

fn read_exif_altitude(store: &dyn TagStore) -> Option<f64> {
    let reference = parse_reference_byte(&store.get(Container::Exif, ALTITUDE_REF)?)?;
    let (num, den) = match store.get(Container::Exif, ALTITUDE)? {
        RawValue::Rational(n, d) => (n, d),
        RawValue::RationalList(v) => *v.first()?,
        other => parse_rational_text(&other.as_text()?)?,
    };
    altitude_from_rational(reference, num, den)
}

/// Position recorded in the store.
///
/// XMP is tried first, since a sidecar's XMP is usually the most recent edit.
/// Latitude and longitude are both required; altitude is optional.
pub fn read_gps(store: &dyn TagStore) -> Option<GpsPosition> {
    let latitude = read_xmp_coordinate(store, XMP_LATITUDE)
        .or_else(|| read_exif_coordinate(store, LATITUDE, LATITUDE_REF, 90.0))?;
    let longitude = read_xmp_coordinate(store, XMP_LONGITUDE)
        .or_else(|| read_exif_coordinate(store, LONGITUDE, LONGITUDE_REF, 180.0))?;
    Some(GpsPosition {
        latitude,
        longitude,
        altitude: read_altitude(store),
    })
}

/// Remove every Exif `GPSInfo` tag and the XMP GPS properties.
pub fn remove_gps(store: &mut dyn TagStore) {
    let exif_keys: Vec<String> = store
        .enumerate(Container::Exif)
        .into_iter()
        .map(|(key, _)| key)
        .filter(|key| key.split('.').nth(1) == Some("GPSInfo"))
        .collect();
    for key in exif_keys {
        store.remove(Container::Exif, &key);
    }
    if store.supports(Container::Xmp) {
        for key in XMP_GPS_KEYS {
            store.remove(Container::Xmp, key);
        }
    }
}

/// Replace any stored position with `position`.
pub fn write_gps(store: &mut dyn TagStore, position: &GpsPosition) -> Result<(), MetadataError> {
    position.validate()?;
    remove_gps(store);

    let xmp = store.supports(Container::Xmp);

    store.set(
        Container::Exif,
        "Exif.GPSInfo.GPSVersionID",
        RawValue::IntegerList(vec![2, 0, 0, 0]),
    );
    store.set(Container::Exif, "Exif.GPSInfo.GPSMapDatum", RawValue::text("WGS-84"));
    if xmp {
        store.set(Container::Xmp, "Xmp.exif.GPSVersionID", RawValue::text("2.0.0.0"));
        store.set(Container::Xmp, "Xmp.exif.GPSMapDatum", RawValue::text("WGS-84"));
    }

    if let Some(meters) = position.altitude {
        let (reference, (num, den)) = altitude_to_rational(meters).ok_or_else(|| {
            MetadataError::InvalidArgument(format!("altitude {meters} has no rational form"))
        })?;
        store.set(Container::Exif, ALTITUDE_REF, RawValue::integer(reference as i64));
        store.set(Container::Exif, ALTITUDE, RawValue::Rational(num, den));
        if xmp {
            store.set(Container::Xmp, XMP_ALTITUDE_REF, RawValue::text(reference.to_string()));
            store.set(Container::Xmp, XMP_ALTITUDE, RawValue::text(format!("{num}/{den}")));
        }
    }

    for (is_latitude, degrees, key, ref_key, xmp_key) in [
        (true, position.latitude, LATITUDE, LATITUDE_REF, XMP_LATITUDE),
        (false, position.longitude, LONGITUDE, LONGITUDE_REF, XMP_LONGITUDE),
    ] {
        let rationals = RationalCoordinate::from_degrees(is_latitude, degrees);
        let direction = rationals.direction.to_string();
        store.set(Container::Exif, ref_key, RawValue::text(direction.clone()));
        store.set(Container::Exif, key, rationals.to_raw());
        if xmp && let Some(text) = coordinate_to_string(is_latitude, degrees) {
            store.set(Container::Xmp, &format!("{xmp_key}Ref"), RawValue::text(direction));
            store.set(Container::Xmp, xmp_key, RawValue::text(text));
        }
    }

    debug!(
        "event=write_gps module=gps lat={} lon={} alt={:?}",
        position.latitude, position.longitude, position.altitude
    );
    Ok(())
}
