// src/tree/bounds.rs

// --- Imports ---
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// uiautomator encodes element rectangles as "[x1,y1][x2,y2]"
static BOUNDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(\d+),(\d+)\]\[(\d+),(\d+)\]$").expect("Failed to compile BOUNDS_RE")
});

/// A point on the device screen, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Screen dimensions reported by the device, queried once per locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

impl ScreenSize {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Converts a ratio of the screen height to a pixel row (truncating).
    pub fn y_at(&self, ratio: f64) -> i32 {
        (f64::from(self.height) * ratio) as i32
    }

    /// Converts a ratio of the screen width to a pixel column (truncating).
    pub fn x_at(&self, ratio: f64) -> i32 {
        (f64::from(self.width) * ratio) as i32
    }
}

/// Element rectangle. `x2 >= x1` and `y2 >= y1` always hold for a parsed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    /// Builds a rectangle, rejecting inverted corners.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Option<Self> {
        if x2 < x1 || y2 < y1 {
            return None;
        }
        Some(Self { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn width_ratio(&self, screen_width: i32) -> f64 {
        if screen_width <= 0 {
            return 0.0;
        }
        f64::from(self.width()) / f64::from(screen_width)
    }

    /// Integer center, rounding toward the top-left corner.
    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    /// True when the point falls on a pixel covered by this rectangle.
    /// Bottom/right edges are exclusive (they belong to the next element).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x1 && point.x < self.x2 && point.y >= self.y1 && point.y < self.y2
    }

    /// Midpoint of the sub-rectangle spanned by the given edge ratios, clamped
    /// onto a covered pixel.
    pub fn point_within(&self, left: f64, right: f64, top: f64, bottom: f64) -> Point {
        let w = f64::from(self.width());
        let h = f64::from(self.height());
        let x1 = f64::from(self.x1);
        let y1 = f64::from(self.y1);

        let x = ((x1 + w * left) + (x1 + w * right)) / 2.0;
        let y = ((y1 + h * top) + (y1 + h * bottom)) / 2.0;

        Point::new(
            clamp_off_edge(x as i32, self.x1, self.x2),
            clamp_off_edge(y as i32, self.y1, self.y2),
        )
    }
}

/// Keeps `v` one pixel off both edges of `[lo, hi)` when the span allows it.
fn clamp_off_edge(v: i32, lo: i32, hi: i32) -> i32 {
    if hi - lo >= 2 {
        v.clamp(lo + 1, hi - 1)
    } else {
        lo
    }
}

impl FromStr for Rect {
    type Err = ExtractError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let caps = BOUNDS_RE
            .captures(raw)
            .ok_or_else(|| ExtractError::RectParse(raw.to_string()))?;

        let mut coords = [0i32; 4];
        for (slot, idx) in coords.iter_mut().zip(1..=4) {
            *slot = caps[idx]
                .parse::<i32>()
                .map_err(|_| ExtractError::RectParse(raw.to_string()))?;
        }

        Rect::new(coords[0], coords[1], coords[2], coords[3])
            .ok_or_else(|| ExtractError::RectParse(raw.to_string()))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}][{},{}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Parses a bounds attribute. Malformed input is "no rectangle", never an error
/// the caller has to handle.
pub fn parse_rect(raw: &str) -> Option<Rect> {
    match raw.parse::<Rect>() {
        Ok(rect) => Some(rect),
        Err(e) => {
            if !raw.is_empty() {
                tracing::trace!("Ignoring bounds: {}", e);
            }
            None
        }
    }
}
