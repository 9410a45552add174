// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity/layer colors and the AutoCAD Color Index (ACI) palette

/// 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packed 0xRRGGBB value
    #[inline]
    pub fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    #[inline]
    pub fn from_u32(value: u32) -> Self {
        Self::new((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }
}

/// Color as stored on an entity or layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Color {
    /// Inherit from the entity's layer
    #[default]
    ByLayer,
    /// Inherit from the enclosing block insert
    ByBlock,
    /// ACI index (1-255)
    Index(u8),
    /// True color
    Rgb(Rgb),
}

impl Color {
    /// Concrete RGB value, `None` for the inheriting variants
    #[inline]
    pub fn to_rgb(self) -> Option<Rgb> {
        match self {
            Color::Index(index) => Some(aci_to_rgb(index)),
            Color::Rgb(rgb) => Some(rgb),
            Color::ByLayer | Color::ByBlock => None,
        }
    }
}

/// Value ladder used by the ACI hue rows (indices 10-249)
const ACI_VALUES: [f64; 5] = [255.0, 204.0, 153.0, 127.0, 76.0];

/// Gray ramp for indices 250-255
const ACI_GRAYS: [u8; 6] = [51, 91, 132, 173, 214, 255];

/// Resolve an ACI index to RGB
///
/// 1-9 are the fixed standard colors, 10-249 form 24 hue rows of 15° with
/// five value steps each (even = saturated, odd = pastel), 250-255 are grays.
/// Index 0 (BYBLOCK) and out-of-range values map to white.
pub fn aci_to_rgb(index: u8) -> Rgb {
    match index {
        1 => Rgb::new(255, 0, 0),
        2 => Rgb::new(255, 255, 0),
        3 => Rgb::new(0, 255, 0),
        4 => Rgb::new(0, 255, 255),
        5 => Rgb::new(0, 0, 255),
        6 => Rgb::new(255, 0, 255),
        7 => Rgb::WHITE,
        8 => Rgb::new(128, 128, 128),
        9 => Rgb::new(192, 192, 192),
        10..=249 => {
            let row = (index - 10) / 10;
            let column = (index % 10) as usize;
            let hue = row as f64 * 15.0;
            let value = ACI_VALUES[column / 2];
            let saturation = if column % 2 == 0 { 1.0 } else { 0.5 };
            hsv_to_rgb(hue, saturation, value)
        }
        250..=255 => {
            let v = ACI_GRAYS[(index - 250) as usize];
            Rgb::new(v, v, v)
        }
        0 => Rgb::WHITE,
    }
}

/// HSV to RGB with truncating channel conversion
fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> Rgb {
    let h = (hue % 360.0) / 60.0;
    let sector = h.floor() as u32;
    let f = h - h.floor();
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));

    let (r, g, b) = match sector {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };

    Rgb::new(r as u8, g as u8, b as u8)
}
