//! Common type definitions used across the codebase

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for items, groupings, and interface types. Generated
/// randomly for new entities or supplied by the I/O layer when loading a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub u64);

impl Uid {
    /// Draw a fresh identifier from the thread RNG.
    pub fn random() -> Self {
        Uid(rand::rng().random())
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Matrix variant discriminator. The I/O layer persists this as the file's
/// `type` field and picks the matching constructor on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixKind {
    Symmetric,
    Asymmetric,
    MultiDomain,
}

impl MatrixKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatrixKind::Symmetric => "symmetric",
            MatrixKind::Asymmetric => "asymmetric",
            MatrixKind::MultiDomain => "multi-domain",
        }
    }

    /// Whether this kind keeps rows and columns alias-paired.
    pub fn is_alias_paired(&self) -> bool {
        matches!(self, MatrixKind::Symmetric | MatrixKind::MultiDomain)
    }
}

impl fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RGB color carried by groupings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const GRAY: Color = Color {
        r: 128,
        g: 128,
        b: 128,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Convert from HSV. `h` is in degrees and wraps modulo 360; `s` and `v`
    /// are in [0, 1].
    pub fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        let h = h.rem_euclid(360.0);
        let c = v * s;
        let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
        let m = v - c;
        let (r1, g1, b1) = match h {
            h if h < 60.0 => (c, x, 0.0),
            h if h < 120.0 => (x, c, 0.0),
            h if h < 180.0 => (0.0, c, x),
            h if h < 240.0 => (0.0, x, c),
            h if h < 300.0 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Color {
            r: ((r1 + m) * 255.0).round() as u8,
            g: ((g1 + m) * 255.0).round() as u8,
            b: ((b1 + m) * 255.0).round() as u8,
        }
    }

    /// Perceptual luminance in [0, 1], used to pick a readable font color.
    pub fn luminance(&self) -> f64 {
        (0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64) / 255.0
    }

    /// Black or white, whichever contrasts better against this color.
    pub fn contrasting_font_color(&self) -> Color {
        if self.luminance() > 0.5 {
            Color::BLACK
        } else {
            Color::WHITE
        }
    }
}

/// Descriptive strings attached to a matrix as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixMetadata {
    pub title: String,
    pub project_name: String,
    pub customer: String,
    pub version_number: String,
}

/// Which metadata string a change targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataField {
    Title,
    ProjectName,
    Customer,
    VersionNumber,
}
