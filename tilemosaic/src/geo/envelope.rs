//! Axis-aligned envelopes in world coordinates.

use std::fmt;

/// An axis-aligned bounding box.
///
/// Envelopes are closed on all four sides. A well-formed envelope has
/// `min_x <= max_x` and `min_y <= max_y`; a degenerate envelope (zero
/// width or height) is considered empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    /// Creates an envelope from its corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Horizontal extent in world units.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Vertical extent in world units.
    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Returns true when the envelope covers no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Returns true when `other` lies entirely within this envelope.
    pub fn contains(&self, other: &Envelope) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Returns true when the two envelopes share any area.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Computes the overlap of two envelopes.
    ///
    /// Returns `None` when the overlap has zero or negative area, which
    /// includes envelopes that merely touch along an edge.
    pub fn intersection(&self, other: &Envelope) -> Option<Envelope> {
        let candidate = Envelope {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        };
        if candidate.is_empty() {
            None
        } else {
            Some(candidate)
        }
    }

    /// Returns the envelope with its X and Y axes exchanged.
    pub fn swapped(&self) -> Envelope {
        Envelope {
            min_x: self.min_y,
            min_y: self.min_x,
            max_x: self.max_y,
            max_y: self.max_x,
        }
    }

    /// Returns the closed five-point ring tracing this envelope.
    ///
    /// The ring starts and ends at the minimum corner and is the polygon
    /// handed to spatial intersection queries.
    pub fn ring(&self) -> [(f64, f64); 5] {
        [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
            (self.min_x, self.min_y),
        ]
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] x [{}, {}]",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}
