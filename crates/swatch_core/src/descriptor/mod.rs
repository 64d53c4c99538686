//! Filament descriptor parsing and renderer parameter derivation.
//!
//! A descriptor is a slicer filament profile: JSON where most scalar values
//! are stored as single-element string arrays. Resolution is a pure,
//! synchronous data transformation from one descriptor (plus request
//! overrides) to the parameter map handed to the renderer.

mod color;
mod fonts;

pub use color::canonical_rgb_hex;
pub use fonts::{details_style, manufacturer_style, material_style, FontStyle};

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{JobRequest, ParamMap, ParamValue};

/// Errors from reading or interpreting a filament descriptor.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The descriptor file could not be read.
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The descriptor is not valid JSON or is missing required fields.
    #[error("invalid descriptor {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required array field has no entries.
    #[error("descriptor field '{field}' is empty")]
    EmptyField { field: &'static str },

    /// A field value could not be interpreted as the expected number.
    #[error("descriptor field '{field}' has unusable value '{value}'")]
    BadValue { field: String, value: String },
}

/// Fully resolved parameters for one swatch job.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSwatch {
    /// Stable identifier derived from vendor, material, and color.
    pub tag: String,
    /// Parameter map for the renderer.
    pub params: ParamMap,
}

/// Raw descriptor fields as stored in slicer filament profiles.
#[derive(Debug, Deserialize)]
struct FilamentInfo {
    filament_vendor: Vec<String>,
    filament_type: Vec<String>,
    name: String,
    default_filament_colour: Vec<String>,
    filament_cost: Vec<String>,
    nozzle_temperature_range_low: Vec<String>,
    nozzle_temperature_range_high: Vec<String>,
    chamber_temperatures: Vec<String>,
    /// Everything else, notably the optional per-plate bed temperatures.
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

const PLATE_TYPES: [&str; 3] = ["hot", "eng", "textured"];
const PLATE_FIELDS: [&str; 2] = ["temperature", "temperature_initial_layer"];

/// Resolve a job request into renderer parameters.
///
/// Request overrides seed the map; derived parameters win on key
/// collisions. Preset consultation is not part of resolution; it happens
/// later in the pipeline.
pub fn resolve(request: &JobRequest) -> Result<ResolvedSwatch, ResolveError> {
    let path = &request.source;
    let text = std::fs::read_to_string(path).map_err(|source| ResolveError::Read {
        path: path.clone(),
        source,
    })?;
    let info: FilamentInfo =
        serde_json::from_str(&text).map_err(|source| ResolveError::Json {
            path: path.clone(),
            source,
        })?;

    let mut params = request.overrides.clone();

    let vendor = first("filament_vendor", &info.filament_vendor)?;
    params.insert("manufacturer".into(), ParamValue::str(vendor));
    let material = first("filament_type", &info.filament_type)?;
    params.insert("material".into(), ParamValue::str(material));

    apply_font(&mut params, "label_material_font", material_style(material));
    apply_font(
        &mut params,
        "label_manufacturer_font",
        manufacturer_style(vendor),
    );

    let color_name = extract_color_name(&info.name, vendor, material);
    if let Some(ref name) = color_name {
        params.insert("color_name".into(), ParamValue::str(name.clone()));
    }
    let rgb = canonical_rgb_hex(first(
        "default_filament_colour",
        &info.default_filament_colour,
    )?);

    apply_font(
        &mut params,
        "label_details_font",
        details_style(color_name.as_deref().unwrap_or(""), &rgb, vendor),
    );

    params.insert("color_code".into(), ParamValue::str(rgb.clone()));

    let cost = parse_f64("filament_cost", first("filament_cost", &info.filament_cost)?)?;
    params.insert("cost_per_kg".into(), ParamValue::int(cost.ceil() as i64));

    let nozzle_low = parse_i64(
        "nozzle_temperature_range_low",
        first(
            "nozzle_temperature_range_low",
            &info.nozzle_temperature_range_low,
        )?,
    )?;
    let nozzle_high = parse_i64(
        "nozzle_temperature_range_high",
        first(
            "nozzle_temperature_range_high",
            &info.nozzle_temperature_range_high,
        )?,
    )?;
    params.insert(
        "nozzle_temp_range".into(),
        ParamValue::int_range(nozzle_low, nozzle_high),
    );

    let (bed_min, bed_max) = bed_temp_range(&info.extra)?;
    params.insert(
        "bed_temp_range".into(),
        ParamValue::int_range(bed_min, bed_max),
    );
    if bed_min > 0 {
        params.insert(
            "label_settings_font_width".into(),
            ParamValue::str("ExtraCondensed"),
        );
    }

    let chamber = parse_i64(
        "chamber_temperatures",
        first("chamber_temperatures", &info.chamber_temperatures)?,
    )?;
    if chamber != 0 {
        params.insert(
            "chamber_temp_range".into(),
            ParamValue::int_range(chamber, chamber),
        );
        if bed_min > 0 {
            params.insert("label_details_font_height".into(), ParamValue::float(3.0));
        } else {
            params.insert(
                "label_settings_font_width".into(),
                ParamValue::str("ExtraCondensed"),
            );
        }
    }

    let tag_color = color_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(&rgb);
    let tag = tagify(&[vendor, material, tag_color]);

    Ok(ResolvedSwatch { tag, params })
}

/// Build a stable alphanumeric tag from the given parts.
///
/// Non-alphanumeric characters are stripped from each part; parts are
/// joined with hyphens. Used as the preset store key and in output
/// filenames.
pub fn tagify(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}

/// Pull the color name out of the profile's display name.
///
/// Display names follow `"<vendor> <material> <color> @<printer>"`; the
/// color part runs up to the first `@`. Trailing whitespace before the `@`
/// is preserved, matching how the label lays the text out.
fn extract_color_name(name: &str, vendor: &str, material: &str) -> Option<String> {
    let rest = name.strip_prefix(&format!("{vendor} {material}"))?;
    let rest = rest.trim_start();
    let (candidate, _) = rest.split_once('@')?;
    if candidate.is_empty() {
        return None;
    }
    Some(candidate.to_string())
}

/// Aggregate bed temperature range over the optional per-plate fields.
///
/// Missing fields are skipped; `(-1, -1)` means no plate temperature was
/// present at all.
fn bed_temp_range(extra: &BTreeMap<String, Value>) -> Result<(i64, i64), ResolveError> {
    let mut bed_min = -1i64;
    let mut bed_max = -1i64;
    for plate in PLATE_TYPES {
        for field in PLATE_FIELDS {
            let key = format!("{plate}_plate_{field}");
            let Some(value) = extra.get(&key) else {
                continue;
            };
            let temp = value_as_i64(&key, value)?;
            if bed_min < 0 || bed_min > temp {
                bed_min = temp;
            }
            if bed_max < 0 || bed_max < temp {
                bed_max = temp;
            }
        }
    }
    Ok((bed_min, bed_max))
}

/// Interpret a descriptor value as an integer.
///
/// Profiles are inconsistent here: plain numbers, numeric strings, and
/// single-element arrays of either all occur in the wild.
fn value_as_i64(field: &str, value: &Value) -> Result<i64, ResolveError> {
    let scalar = match value {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    };
    match scalar {
        Value::Number(number) => number.as_i64().ok_or_else(|| bad_value(field, scalar)),
        Value::String(text) => text.trim().parse().map_err(|_| bad_value(field, scalar)),
        _ => Err(bad_value(field, scalar)),
    }
}

fn bad_value(field: &str, value: &Value) -> ResolveError {
    ResolveError::BadValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn first<'a>(field: &'static str, values: &'a [String]) -> Result<&'a str, ResolveError> {
    values
        .first()
        .map(String::as_str)
        .ok_or(ResolveError::EmptyField { field })
}

fn parse_i64(field: &str, text: &str) -> Result<i64, ResolveError> {
    text.trim().parse().map_err(|_| ResolveError::BadValue {
        field: field.to_string(),
        value: text.to_string(),
    })
}

fn parse_f64(field: &str, text: &str) -> Result<f64, ResolveError> {
    text.trim().parse().map_err(|_| ResolveError::BadValue {
        field: field.to_string(),
        value: text.to_string(),
    })
}

fn apply_font(params: &mut ParamMap, prefix: &str, style: FontStyle) {
    params.insert(format!("{prefix}_width"), ParamValue::str(style.width));
    if let Some(height) = style.height {
        params.insert(format!("{prefix}_height"), ParamValue::float(height));
    }
}
