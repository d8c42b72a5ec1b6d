//! `{{Coordinate:Polygon:bbox:size:format}}` tokens.
//!
//! `bbox` is a JSON array of four `[lon, lat]` points; the first two points give the
//! longitude bounds, the first and third the latitude bounds. A random south-west
//! corner is drawn inside the box and the polygon extends at most `size` degrees east
//! and north from it. Values are rounded to as many decimals as `size` carries.

use super::{HandlerContext, TokenHandler};
use crate::descriptor::{HandlerType, SourceType};
use crate::error::HandlerError;
use crate::random;

const HANDLER: HandlerType = HandlerType::Coordinate;
const POLYGON_PARAMETERS: usize = 5;
const BOUNDING_BOX_POINTS: usize = 4;

named_enum! {
    /// Output form of a generated polygon.
    pub enum CoordinateFormat as "coordinate format" {
        /// JSON array of `[lon, lat]` pairs.
        GeoJson,
        /// Every number joined with commas: `lon,lat,lon,lat,...`
        String,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    lon_min: f64,
    lon_max: f64,
    lat_min: f64,
    lat_max: f64,
}

pub struct CoordinateHandler {
    bounds: Bounds,
    size: f64,
    precision: u32,
    format: CoordinateFormat,
}

impl CoordinateHandler {
    pub fn new(context: HandlerContext<'_>) -> Result<Self, HandlerError> {
        if context.source_type() != SourceType::Polygon {
            return Err(context.unsupported(HANDLER));
        }
        context.expect_parameters(HANDLER, POLYGON_PARAMETERS)?;

        let bbox = context.parameter(2);
        let points: Vec<Vec<f64>> =
            serde_json::from_str(bbox).map_err(|_| context.invalid_parameter(HANDLER, bbox))?;
        if points.len() != BOUNDING_BOX_POINTS || points.iter().any(|point| point.len() < 2) {
            return Err(context.invalid_parameter(HANDLER, bbox));
        }
        let bounds = Bounds {
            lon_min: points[0][0],
            lon_max: points[1][0],
            lat_min: points[0][1],
            lat_max: points[2][1],
        };

        let size_text = context.parameter(3).trim();
        let size: f64 = context.parse_parameter(HANDLER, 3)?;
        let precision = size_text
            .split_once('.')
            .map_or(0, |(_, decimals)| decimals.len() as u32);

        Ok(Self {
            bounds,
            size,
            precision,
            format: context.parse_parameter(HANDLER, 4)?,
        })
    }

    /// Closed ring: south-west, south-east, north-east, north-west, south-west.
    fn polygon(&self) -> Vec<[f64; 2]> {
        let Bounds {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        } = self.bounds;
        let round = |value| random::round_to(value, self.precision);

        let sw_lon = round(random::next_double(lon_min, lon_max));
        let sw_lat = round(random::next_double(lat_min, lat_max));
        let ne_lon = round(random::next_double(
            sw_lon,
            (sw_lon + self.size).min(lon_max),
        ));
        let ne_lat = round(random::next_double(
            sw_lat,
            (sw_lat + self.size).min(lat_max),
        ));

        vec![
            [sw_lon, sw_lat],
            [ne_lon, sw_lat],
            [ne_lon, ne_lat],
            [sw_lon, ne_lat],
            [sw_lon, sw_lat],
        ]
    }
}

impl TokenHandler for CoordinateHandler {
    fn replacement_value(&mut self) -> Result<String, HandlerError> {
        let ring = self.polygon();
        Ok(match self.format {
            CoordinateFormat::GeoJson => serde_json::Value::from(
                ring.iter()
                    .map(|point| serde_json::Value::from(point.to_vec()))
                    .collect::<Vec<_>>(),
            )
            .to_string(),
            CoordinateFormat::String => ring
                .iter()
                .flatten()
                .map(f64::to_string)
                .collect::<Vec<_>>()
                .join(","),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;

    const BBOX: &str = "[[-10.0,40.0],[10.0,40.0],[10.0,50.0],[-10.0,50.0]]";

    #[test]
    fn test_geojson_ring_is_closed_and_inside_box() {
        let token = format!("{{{{Coordinate:Polygon:{BBOX}:0.5:GeoJson}}}}");
        for _ in 0..50 {
            let value = render_token(&token).unwrap();
            let ring: Vec<[f64; 2]> = serde_json::from_str(&value).unwrap();
            assert_eq!(ring.len(), 5);
            assert_eq!(ring[0], ring[4]);
            for [lon, lat] in &ring {
                assert!((-10.0..=10.0).contains(lon));
                assert!((40.0..=50.0).contains(lat));
            }
            let width = ring[1][0] - ring[0][0];
            let height = ring[2][1] - ring[1][1];
            assert!((0.0..=0.5 + 1e-9).contains(&width));
            assert!((0.0..=0.5 + 1e-9).contains(&height));
        }
    }

    #[test]
    fn test_string_format() {
        let token = format!("{{{{Coordinate:Polygon:{BBOX}:1:String}}}}");
        let value = render_token(&token).unwrap();
        let numbers: Vec<&str> = value.split(',').collect();
        assert_eq!(numbers.len(), 10);
        assert_eq!(numbers[..2], numbers[8..]);
        assert!(numbers
            .iter()
            .all(|number| number.parse::<f64>().is_ok() && !number.contains('.')));
    }

    #[test]
    fn test_bad_bounding_box_is_rejected() {
        assert!(render_token("{{Coordinate:Polygon:[[1,2]]:1:GeoJson}}").is_err());
        assert!(render_token("{{Coordinate:Polygon:nope:1:GeoJson}}").is_err());
    }
}
