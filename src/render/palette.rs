// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;
use std::str::FromStr;

use colorous::Gradient;
use serde::de::{self, Deserialize, Deserializer};

use super::color_map::{ColorMap, HEATMAP};

/// The [`colorous`] gradients, by their normalized names.
const GRADIENTS: &[(&str, Gradient)] = &[
    ("blues", colorous::BLUES),
    ("blue_green", colorous::BLUE_GREEN),
    ("blue_purple", colorous::BLUE_PURPLE),
    ("brown_green", colorous::BROWN_GREEN),
    ("cividis", colorous::CIVIDIS),
    ("cool", colorous::COOL),
    ("cubehelix", colorous::CUBEHELIX),
    ("greens", colorous::GREENS),
    ("green_blue", colorous::GREEN_BLUE),
    ("greys", colorous::GREYS),
    ("inferno", colorous::INFERNO),
    ("magma", colorous::MAGMA),
    ("oranges", colorous::ORANGES),
    ("orange_red", colorous::ORANGE_RED),
    ("pink_green", colorous::PINK_GREEN),
    ("plasma", colorous::PLASMA),
    ("purples", colorous::PURPLES),
    ("purple_blue", colorous::PURPLE_BLUE),
    ("purple_blue_green", colorous::PURPLE_BLUE_GREEN),
    ("purple_green", colorous::PURPLE_GREEN),
    ("purple_orange", colorous::PURPLE_ORANGE),
    ("purple_red", colorous::PURPLE_RED),
    ("rainbow", colorous::RAINBOW),
    ("reds", colorous::REDS),
    ("red_blue", colorous::RED_BLUE),
    ("red_grey", colorous::RED_GREY),
    ("red_purple", colorous::RED_PURPLE),
    ("red_yellow_blue", colorous::RED_YELLOW_BLUE),
    ("red_yellow_green", colorous::RED_YELLOW_GREEN),
    ("sinebow", colorous::SINEBOW),
    ("spectral", colorous::SPECTRAL),
    ("turbo", colorous::TURBO),
    ("viridis", colorous::VIRIDIS),
    ("warm", colorous::WARM),
    ("yellow_green", colorous::YELLOW_GREEN),
    ("yellow_green_blue", colorous::YELLOW_GREEN_BLUE),
    ("yellow_orange_brown", colorous::YELLOW_ORANGE_BROWN),
    ("yellow_orange_red", colorous::YELLOW_ORANGE_RED),
];

/// Which colors temperatures are mapped to.
#[derive(Clone, Copy)]
pub(crate) enum Palette {
    /// Gaussian kernels summed over the built-in control points.
    Heatmap,

    /// A gradient from [`colorous`], identified by name.
    Gradient(&'static str, Gradient),
}

impl Palette {
    /// Build the lookup table for this palette. `spread` only affects [`Palette::Heatmap`].
    pub(crate) fn color_map(&self, size: usize, spread: f64) -> ColorMap {
        match self {
            Self::Heatmap => ColorMap::gaussian(size, &HEATMAP, spread),
            Self::Gradient(_, gradient) => ColorMap::from_gradient(size, *gradient),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Heatmap => "heatmap",
            Self::Gradient(name, _) => *name,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::Heatmap
    }
}

// colorous::Gradient can't be compared, but the names can.
impl PartialEq for Palette {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl fmt::Debug for Palette {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "Palette({})", self.name())
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

impl FromStr for Palette {
    type Err = &'static str;

    /// Names are case insensitive, and spaces or dashes can be used instead of underscores.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalized = name.to_lowercase().replace(|c: char| c == ' ' || c == '-', "_");
        if normalized == "heatmap" {
            return Ok(Self::Heatmap);
        }
        GRADIENTS
            .iter()
            .find(|(gradient_name, _)| *gradient_name == normalized)
            .map(|(gradient_name, gradient)| Self::Gradient(*gradient_name, *gradient))
            .ok_or("Invalid palette name")
    }
}

impl<'de> Deserialize<'de> for Palette {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&name),
                &"\"heatmap\" or the name of a colorous gradient",
            )
        })
    }
}

#[cfg(test)]
mod test {
    use serde::Deserialize;

    use super::Palette;

    #[derive(Debug, Deserialize)]
    struct PaletteTest {
        palette: Palette,
    }

    fn parse_str(name: &str) -> Result<Palette, toml::de::Error> {
        toml::from_str::<PaletteTest>(&format!("palette = \"{}\"", name)).map(|test| test.palette)
    }

    fn check_parse(name: &str, expected: &str) {
        let parsed = parse_str(name);
        assert!(parsed.is_ok(), "Failed to parse palette: {}", parsed.unwrap_err());
        assert_eq!(parsed.unwrap().to_string(), expected);
    }

    #[test]
    fn heatmap() {
        assert_eq!(parse_str("heatmap").unwrap(), Palette::Heatmap);
        assert_eq!(parse_str("HeatMap").unwrap(), Palette::Heatmap);
    }

    #[test]
    fn all_uppercase() {
        check_parse("SINEBOW", "sinebow");
    }

    #[test]
    fn spongebob_case() {
        check_parse("sInEbOw", "sinebow");
    }

    #[test]
    fn separators() {
        check_parse("RED_YELLOW_BLUE", "red_yellow_blue");
        check_parse("red yellow blue", "red_yellow_blue");
        check_parse("red-yellow blue", "red_yellow_blue");
    }

    #[test]
    fn bad_palette() {
        let parsed = parse_str("Not A Gradient");
        assert!(
            parsed.is_err(),
            "Deserialized nonexistent palette: {:?}",
            parsed.unwrap()
        );
    }

    #[test]
    fn tables() {
        let heatmap = Palette::Heatmap.color_map(100, 1.0);
        let turbo: Palette = "turbo".parse().unwrap();
        let turbo = turbo.color_map(100, 1.0);
        assert_eq!(heatmap.len(), 100);
        assert_eq!(turbo.len(), 100);
        assert_ne!(heatmap, turbo);
    }
}
