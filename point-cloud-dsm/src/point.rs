/// Point record routed through the rasterisation pipeline

/// A single observation: planar position, elevation and the label that is
/// written to the label raster when this point wins its cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub label: u32,
}

impl Point {
    /// Initial slot content. Any real elevation replaces it.
    pub const SENTINEL: Point = Point {
        x: 0.0,
        y: 0.0,
        z: f64::NEG_INFINITY,
        label: 0,
    };

    pub fn new(x: f64, y: f64, z: f64, label: u32) -> Self {
        Self { x, y, z, label }
    }

    /// Strict elevation ordering used for every replacement decision.
    /// Equal elevations never outrank each other.
    #[inline]
    pub fn outranks(&self, other: &Point) -> bool {
        self.z > other.z
    }

    /// True when no real point has been stored in place of the sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.z == f64::NEG_INFINITY
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::SENTINEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_real_point_outranks_sentinel() {
        let low = Point::new(0.0, 0.0, -1.0e300, 7);
        assert!(low.outranks(&Point::SENTINEL));
        assert!(!Point::SENTINEL.outranks(&low));
    }

    #[test]
    fn test_equal_elevation_does_not_outrank() {
        let a = Point::new(0.0, 0.0, 5.0, 1);
        let b = Point::new(1.0, 1.0, 5.0, 2);
        assert!(!a.outranks(&b));
        assert!(!b.outranks(&a));
    }

    #[test]
    fn test_nan_never_outranks() {
        let nan = Point::new(0.0, 0.0, f64::NAN, 1);
        assert!(!nan.outranks(&Point::SENTINEL));
    }

    #[test]
    fn test_default_is_sentinel() {
        assert!(Point::default().is_sentinel());
        assert_eq!(Point::default().label, 0);
    }
}
