/// Smallest sized marker, also used for unknown capacity
pub const MIN_RADIUS: f64 = 6.0;
pub const MAX_RADIUS: f64 = 20.0;
/// Radius growth per tonne/year
pub const SCALE_FACTOR: f64 = 0.0002;
/// Radius of every marker when sizing is off
pub const FIXED_RADIUS: f64 = 8.0;

/// Marker radius for a parsed capacity.
pub fn marker_radius(capacity: Option<u64>, size_by_capacity: bool) -> f64 {
    if !size_by_capacity {
        return FIXED_RADIUS;
    }
    match capacity {
        Some(tonnes) if tonnes > 0 => {
            (MIN_RADIUS + tonnes as f64 * SCALE_FACTOR).clamp(MIN_RADIUS, MAX_RADIUS)
        }
        _ => MIN_RADIUS,
    }
}

/// Geographic bounding box of placed markers
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

/// Map center used when nothing can be placed (continental US)
pub const DEFAULT_CENTER: (f64, f64) = (-98.5795, 39.8283);

impl Bounds {
    /// Bounds around `(lon, lat)` points; `None` for no points.
    pub fn around(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<Bounds>, (lon, lat)| {
            Some(match acc {
                None => Bounds {
                    min_lon: lon,
                    min_lat: lat,
                    max_lon: lon,
                    max_lat: lat,
                },
                Some(b) => Bounds {
                    min_lon: b.min_lon.min(lon),
                    min_lat: b.min_lat.min(lat),
                    max_lon: b.max_lon.max(lon),
                    max_lat: b.max_lat.max(lat),
                },
            })
        })
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_scaling() {
        assert_eq!(marker_radius(None, true), MIN_RADIUS);
        assert_eq!(marker_radius(Some(0), true), MIN_RADIUS);
        assert!((marker_radius(Some(10_000), true) - 8.0).abs() < 1e-9);
        assert_eq!(marker_radius(Some(1_000_000), true), MAX_RADIUS);
    }

    #[test]
    fn test_fixed_radius_when_off() {
        assert_eq!(marker_radius(Some(1_000_000), false), FIXED_RADIUS);
        assert_eq!(marker_radius(None, false), FIXED_RADIUS);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(Bounds::around(Vec::new()), None);
        let bounds = Bounds::around(vec![(-120.0, 35.0), (10.0, 50.0), (-80.0, 40.0)]).unwrap();
        assert_eq!(bounds.min_lon, -120.0);
        assert_eq!(bounds.max_lat, 50.0);
        assert_eq!(bounds.center(), (-55.0, 42.5));
    }
}
