//! Tokenizer for KML `<coordinates>` text.

use tracing::trace;

use crate::models::Coordinate;

/// Parse whitespace-separated `lng,lat[,alt]` tuples.
///
/// Tuples without two finite numbers are skipped. Altitude is ignored.
pub fn parse_coordinate_list(text: &str) -> Vec<Coordinate> {
    text.split_whitespace().filter_map(parse_tuple).collect()
}

fn parse_tuple(token: &str) -> Option<Coordinate> {
    let mut parts = token.split(',');
    let lng = parts.next().and_then(parse_component);
    let lat = parts.next().and_then(parse_component);

    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
        _ => {
            trace!("Skipping unparsable coordinate tuple {:?}", token);
            None
        }
    }
}

fn parse_component(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swaps_lng_lat() {
        let coords = parse_coordinate_list("-122.42,37.77,0 -122.41,37.78");
        assert_eq!(
            coords,
            vec![
                Coordinate::new(37.77, -122.42),
                Coordinate::new(37.78, -122.41)
            ]
        );
    }

    #[test]
    fn test_mixed_whitespace() {
        let coords = parse_coordinate_list("\n\t 1,2,3\n\n  4,5 \r\n");
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[1], Coordinate::new(5.0, 4.0));
    }

    #[test]
    fn test_drops_malformed_tuples() {
        let coords = parse_coordinate_list("-122.42, 1,2 abc,def 3 nan,1 4,inf 5,6");
        assert_eq!(
            coords,
            vec![Coordinate::new(2.0, 1.0), Coordinate::new(6.0, 5.0)]
        );
    }

    #[test]
    fn test_empty_text() {
        assert!(parse_coordinate_list("   \n ").is_empty());
    }
}
