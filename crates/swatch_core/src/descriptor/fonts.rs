//! Label font narrowing policy.
//!
//! The label template draws three text rows in fixed-width boxes. Once a
//! text outgrows its box, these rules pick a narrower face and, for extreme
//! lengths, a smaller text height. The thresholds are tied to the specific
//! fonts the template uses (Gotham for the top rows, Noto Sans for the
//! details row); they are not derived from font metrics.

/// Style override for one label text row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FontStyle {
    /// Width suffix appended to the font family name; empty for the
    /// regular face.
    pub width: &'static str,
    /// Reduced text height in millimeters, for extreme lengths.
    pub height: Option<f64>,
}

impl FontStyle {
    fn narrowed(width: &'static str) -> Self {
        Self {
            width,
            height: None,
        }
    }
}

/// Face for the material row.
pub fn material_style(material: &str) -> FontStyle {
    let len = material.chars().count();
    match len {
        3 => FontStyle::default(),
        4 => FontStyle::narrowed("Narrow"),
        5 => FontStyle::narrowed("XNarrow"),
        _ => FontStyle {
            width: "Cond",
            height: (len > 7).then(|| 7.5 - (len as f64 - 7.0) * 0.5),
        },
    }
}

/// Face for the manufacturer row.
pub fn manufacturer_style(vendor: &str) -> FontStyle {
    let len = vendor.chars().count();
    if len <= 7 {
        FontStyle::default()
    } else if len <= 9 {
        FontStyle::narrowed("Narrow")
    } else if len <= 11 {
        FontStyle::narrowed("XNarrow")
    } else {
        FontStyle {
            width: "Cond",
            height: (len > 13).then(|| 7.0 - (len as f64 - 13.0) * 0.3),
        }
    }
}

/// Face for the color details row.
///
/// The height reduction keys off the manufacturer length, not the color
/// name.
pub fn details_style(color_name: &str, color_code: &str, vendor: &str) -> FontStyle {
    let name_len = color_name.chars().count();
    let code_len = color_code.chars().count();
    if name_len <= 11 && code_len < 7 {
        FontStyle::default()
    } else if name_len <= 13 && code_len < 8 {
        FontStyle::narrowed("SemiCondensed")
    } else if name_len <= 15 {
        FontStyle::narrowed("Condensed")
    } else {
        FontStyle {
            width: "ExtraCondensed",
            height: (vendor.chars().count() > 16)
                .then(|| 5.0 - (name_len as f64 - 16.0) * 0.25),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_widths_step_with_length() {
        assert_eq!(material_style("PLA").width, "");
        assert_eq!(material_style("PETG").width, "Narrow");
        assert_eq!(material_style("PA-CF").width, "XNarrow");
        assert_eq!(material_style("PETG-CF").width, "Cond");
        assert_eq!(material_style("PETG-CF").height, None);
    }

    #[test]
    fn long_material_shrinks_height() {
        let style = material_style("PolyFlex90");
        assert_eq!(style.width, "Cond");
        assert_eq!(style.height, Some(7.5 - 3.0 * 0.5));
    }

    #[test]
    fn manufacturer_widths_step_with_length() {
        assert_eq!(manufacturer_style("Prusa").width, "");
        assert_eq!(manufacturer_style("Polymaker").width, "Narrow");
        assert_eq!(manufacturer_style("Overture3D").width, "XNarrow");
        assert_eq!(manufacturer_style("MatterHackers").width, "Cond");
    }

    #[test]
    fn very_long_manufacturer_shrinks_height() {
        let style = manufacturer_style("Atomic Filament Co");
        assert_eq!(style.width, "Cond");
        assert_eq!(style.height, Some(7.0 - 5.0 * 0.3));
    }

    #[test]
    fn details_width_considers_name_and_code() {
        assert_eq!(details_style("Galaxy Black", "#ABC", "Prusa").width, "SemiCondensed");
        assert_eq!(details_style("Black", "#ABC", "Prusa").width, "");
        assert_eq!(details_style("Black", "#AABBCD", "Prusa").width, "SemiCondensed");
        assert_eq!(details_style("Cotton White ", "#AABBCD", "Prusa").width, "SemiCondensed");
        assert_eq!(details_style("Galaxy Nebula ", "#ABC", "Prusa").width, "Condensed");
        assert_eq!(
            details_style("Translucent Forest Green", "#ABC", "Prusa").width,
            "ExtraCondensed"
        );
    }

    #[test]
    fn details_height_keys_off_manufacturer_length() {
        let short_vendor = details_style("Translucent Forest Green", "#ABC", "Prusa");
        assert_eq!(short_vendor.height, None);
        let long_vendor = details_style(
            "Translucent Forest Green",
            "#ABC",
            "Some Very Long Vendor",
        );
        assert_eq!(long_vendor.height, Some(5.0 - 8.0 * 0.25));
    }
}
