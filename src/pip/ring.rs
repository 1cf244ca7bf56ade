//! Even-odd ray casting over a single ring.

use crate::models::{Coordinate, MIN_RING_VERTICES};

/// Test whether `point` lies inside `ring`.
///
/// Casts a ray along the point's longitude axis and counts edge crossings.
/// The ring does not need to be closed. Rings with fewer than four vertices
/// never contain anything. Points exactly on an edge or vertex get whatever
/// the crossing formula yields; there is no epsilon. Non-finite points are
/// never contained.
pub fn contains(point: Coordinate, ring: &[Coordinate]) -> bool {
    let n = ring.len();
    if n < MIN_RING_VERTICES {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (ring[i], ring[j]);
        if (vi.lng > point.lng) != (vj.lng > point.lng)
            && point.lat < vj.lat + (point.lng - vj.lng) * (vi.lat - vj.lat) / (vi.lng - vj.lng)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Contains, LineString, Point, Polygon};

    fn ring(points: &[(f64, f64)]) -> Vec<Coordinate> {
        points
            .iter()
            .map(|&(lat, lng)| Coordinate::new(lat, lng))
            .collect()
    }

    fn square() -> Vec<Coordinate> {
        ring(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)])
    }

    #[test]
    fn test_square_inside_and_outside() {
        let sq = square();
        assert!(contains(Coordinate::new(5.0, 5.0), &sq));
        assert!(!contains(Coordinate::new(20.0, 20.0), &sq));
        assert!(!contains(Coordinate::new(5.0, -1.0), &sq));
    }

    #[test]
    fn test_closed_and_open_rings_agree() {
        let open = square();
        let mut closed = open.clone();
        closed.push(open[0]);

        for lat in -2..13 {
            for lng in -2..13 {
                let p = Coordinate::new(lat as f64 + 0.5, lng as f64 + 0.5);
                assert_eq!(contains(p, &open), contains(p, &closed), "at {}", p);
            }
        }
    }

    #[test]
    fn test_degenerate_rings_never_contain() {
        let vertices = ring(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0)]);
        for len in 0..MIN_RING_VERTICES {
            let short = &vertices[..len.min(vertices.len())];
            for lat in -5..15 {
                for lng in -5..15 {
                    let p = Coordinate::new(lat as f64, lng as f64);
                    assert!(!contains(p, short), "len {} at {}", len, p);
                }
            }
        }
    }

    #[test]
    fn test_non_finite_point() {
        let sq = square();
        assert!(!contains(Coordinate::new(f64::NAN, 5.0), &sq));
        assert!(!contains(Coordinate::new(5.0, f64::NAN), &sq));
        assert!(!contains(Coordinate::new(f64::INFINITY, 5.0), &sq));
    }

    #[test]
    fn test_concave_ring_matches_geo() {
        // L-shaped ring, axis-aligned edges on integer coordinates
        let l_shape = ring(&[
            (0.0, 0.0),
            (0.0, 6.0),
            (3.0, 6.0),
            (3.0, 3.0),
            (6.0, 3.0),
            (6.0, 0.0),
        ]);
        let polygon = Polygon::new(
            l_shape.iter().map(|c| geo::Coord::from(*c)).collect::<LineString<f64>>(),
            vec![],
        );

        // Quarter offsets keep every sample off the edges
        for lat in -2..9 {
            for lng in -2..9 {
                let p = Coordinate::new(lat as f64 + 0.25, lng as f64 + 0.25);
                let expected = polygon.contains(&Point::new(p.lng, p.lat));
                assert_eq!(contains(p, &l_shape), expected, "at {}", p);
            }
        }
    }

    #[test]
    fn test_hole_is_not_subtracted() {
        // Outer and inner rings are independent zones; both report the hole's interior
        let outer = square();
        let hole = ring(&[(4.0, 4.0), (4.0, 6.0), (6.0, 6.0), (6.0, 4.0)]);
        let p = Coordinate::new(5.0, 5.0);
        assert!(contains(p, &outer));
        assert!(contains(p, &hole));
    }
}
