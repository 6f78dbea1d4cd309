//! Point cloud coordinate bounds tracking
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl PointBounds {
    /// Create new bounds initialised to infinity values
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
            min_z: f64::INFINITY,
            max_z: f64::NEG_INFINITY,
        }
    }

    /// Bounds from explicit planar limits, elevation left open
    pub fn from_xy(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            min_z: f64::NEG_INFINITY,
            max_z: f64::INFINITY,
        }
    }

    /// Update bounds with a new point
    pub fn update(&mut self, x: f64, y: f64, z: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
        self.min_z = self.min_z.min(z);
        self.max_z = self.max_z.max(z);
    }

    /// Grow these bounds to cover another set
    pub fn merge(mut self, other: &PointBounds) -> Self {
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
        self.min_z = self.min_z.min(other.min_z);
        self.max_z = self.max_z.max(other.max_z);
        self
    }

    /// True until at least one point has been added
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Get world space dimensions
    pub fn dimensions(&self) -> (f64, f64, f64) {
        (
            self.max_x - self.min_x,
            self.max_y - self.min_y,
            self.max_z - self.min_z,
        )
    }
}

impl Default for PointBounds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bounds_are_empty() {
        assert!(PointBounds::new().is_empty());
    }

    #[test]
    fn test_update_tracks_extremes() {
        let mut bounds = PointBounds::new();
        bounds.update(1.0, 2.0, 3.0);
        bounds.update(-1.0, 5.0, 0.5);
        assert!(!bounds.is_empty());
        assert_eq!(bounds.min_x, -1.0);
        assert_eq!(bounds.max_y, 5.0);
        assert_eq!(bounds.dimensions(), (2.0, 3.0, 2.5));
    }

    #[test]
    fn test_merge_unions_extents() {
        let a = PointBounds::from_xy(0.0, 0.0, 1.0, 1.0);
        let b = PointBounds::from_xy(-2.0, 0.5, 0.5, 4.0);
        let merged = a.merge(&b);
        assert_eq!(merged.min_x, -2.0);
        assert_eq!(merged.min_y, 0.0);
        assert_eq!(merged.max_x, 1.0);
        assert_eq!(merged.max_y, 4.0);
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let a = PointBounds::from_xy(0.0, 0.0, 1.0, 1.0);
        assert_eq!(a.merge(&PointBounds::new()).min_x, 0.0);
        assert_eq!(PointBounds::new().merge(&a).max_y, 1.0);
    }
}
