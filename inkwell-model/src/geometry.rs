use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Axis-aligned rectangle in page coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection of two rectangles, `None` when they do not touch.
    ///
    /// Edge-adjacent rectangles intersect with zero area, matching how
    /// intersection observers treat a target flush with the root edge.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }

    pub fn translate_y(&self, dy: f32) -> Rect {
        Rect::new(self.x, self.y + dy, self.width, self.height)
    }
}

/// One side of a root margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginLength {
    Px(f32),
    Percent(f32),
}

impl MarginLength {
    /// Resolve against the root dimension along the same axis.
    pub fn resolve(&self, basis: f32) -> f32 {
        match self {
            MarginLength::Px(px) => *px,
            MarginLength::Percent(pct) => basis * pct / 100.0,
        }
    }
}

impl fmt::Display for MarginLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginLength::Px(px) => write!(f, "{px}px"),
            MarginLength::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

/// Margin that grows (or shrinks) the viewport before intersection tests.
///
/// Parsed from the CSS shorthand used by intersection observers: one to
/// four lengths in `top right bottom left` order, each in `px` or `%`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    pub top: MarginLength,
    pub right: MarginLength,
    pub bottom: MarginLength,
    pub left: MarginLength,
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::uniform(50.0)
    }
}

impl RootMargin {
    pub const fn uniform(px: f32) -> Self {
        Self {
            top: MarginLength::Px(px),
            right: MarginLength::Px(px),
            bottom: MarginLength::Px(px),
            left: MarginLength::Px(px),
        }
    }

    /// Expand `root` by this margin.
    pub fn expand(&self, root: &Rect) -> Rect {
        let top = self.top.resolve(root.height);
        let bottom = self.bottom.resolve(root.height);
        let left = self.left.resolve(root.width);
        let right = self.right.resolve(root.width);
        Rect::new(
            root.x - left,
            root.y - top,
            root.width + left + right,
            root.height + top + bottom,
        )
    }
}

fn parse_length(raw: &str, whole: &str) -> Result<MarginLength, ModelError> {
    let invalid = |why| ModelError::InvalidMargin(whole.to_string(), why);
    if let Some(number) = raw.strip_suffix("px") {
        number
            .parse::<f32>()
            .map(MarginLength::Px)
            .map_err(|_| invalid("expected a number before `px`"))
    } else if let Some(number) = raw.strip_suffix('%') {
        number
            .parse::<f32>()
            .map(MarginLength::Percent)
            .map_err(|_| invalid("expected a number before `%`"))
    } else {
        match raw.parse::<f32>() {
            Ok(value) if value == 0.0 => Ok(MarginLength::Px(0.0)),
            Ok(_) => Err(invalid("non-zero lengths need a `px` or `%` unit")),
            Err(_) => Err(invalid("lengths must be in `px` or `%`")),
        }
    }
}

impl FromStr for RootMargin {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split_whitespace()
            .map(|part| parse_length(part, s))
            .collect::<Result<Vec<_>, _>>()?;

        let (top, right, bottom, left) = match parts.as_slice() {
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => {
                (*vertical, *horizontal, *vertical, *horizontal)
            }
            [top, horizontal, bottom] => {
                (*top, *horizontal, *bottom, *horizontal)
            }
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            [] => {
                return Err(ModelError::InvalidMargin(
                    s.to_string(),
                    "margin must not be empty",
                ));
            }
            _ => {
                return Err(ModelError::InvalidMargin(
                    s.to_string(),
                    "at most four lengths are allowed",
                ));
            }
        };

        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}
