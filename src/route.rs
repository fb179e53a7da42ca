use std::{cmp::Ordering, error::Error, fs::{self, File}, io::BufReader, path::Path};

use gpx::{Gpx, read};

// Earth's radius in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// One vertex of a replay route with its cumulative distance from the start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePoint
{
   pub offset: f64, // Cumulative distance in meters
   pub lat:    f64,
   pub lon:    f64,
}

/// Great-circle distance in meters between two coordinates (Haversine).
fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64
//--------------------------------------------------------------------
{
   let lat1_rad = lat1.to_radians();
   let lat2_rad = lat2.to_radians();
   let d_lat = (lat2 - lat1).to_radians();
   let d_lon = (lon2 - lon1).to_radians();

   let a = (d_lat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (d_lon / 2.0).sin().powi(2);
   let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

   EARTH_RADIUS_METERS * c
}

/// Reads a GPX file and produces the replay route with cumulative offsets.
/// Uses the first track segment, falling back to the first route element for
/// files that carry <rte> instead of <trk>.
pub fn load_route(path: &Path) -> Result<Vec<RoutePoint>, Box<dyn Error>>
//-----------------------------------------------------------------------
{
   let metadata = fs::metadata(path)?;
   if !metadata.is_file()
   {
      return Err(format!("Not a file {}.", path.display()).into());
   }
   let file = File::open(path)?;
   let reader = BufReader::new(file);
   let parsed: Gpx = read(reader)?;

   let waypoints: &[gpx::Waypoint] = if let Some(segment) = parsed.tracks.first().and_then(|track| track.segments.first())
   {
      &segment.points
   }
   else if let Some(rte) = parsed.routes.first()
   {
      &rte.points
   }
   else
   {
      return Err("GPX file does not contain a track segment or route.".into());
   };

   let mut route = Vec::with_capacity(waypoints.len());
   let mut cumulative = 0.0;
   let mut last: Option<(f64, f64)> = None;
   for waypoint in waypoints
   {
      let lat = waypoint.point().y();
      let lon = waypoint.point().x();
      if let Some((prev_lat, prev_lon)) = last
      {
         cumulative += haversine_meters(prev_lat, prev_lon, lat, lon);
      }
      route.push(RoutePoint { offset: cumulative, lat, lon });
      last = Some((lat, lon));
   }

   log::info!("Loaded route {} with {} points over {:.0}m", path.display(), route.len(), cumulative);
   Ok(route)
}

pub fn route_length(route: &[RoutePoint]) -> f64
{
   route.last().map_or(0.0, |p| p.offset)
}

/// Interpolates the coordinate at a travelled distance along the route.
/// Offsets below the start clamp to the first point and offsets beyond the
/// end clamp to the last; in between the coordinate is linearly interpolated
/// between the two neighbouring route points found by binary search.
pub fn point_at_offset(route: &[RoutePoint], meters: f64) -> Option<(f64, f64)>
//-----------------------------------------------------------------------------
{
   if route.is_empty()
   {
      return None;
   }

   let search_result = route.binary_search_by(|probe|
      probe.offset.partial_cmp(&meters).unwrap_or(Ordering::Equal));

   match search_result
   {
      | Ok(index) => Some((route[index].lat, route[index].lon)),
      | Err(index) =>
      {
         if index == 0
         {
            let first = route[0];
            Some((first.lat, first.lon))
         }
         else if index >= route.len()
         {
            let last = route[route.len() - 1];
            Some((last.lat, last.lon))
         }
         else
         {
            let before = route[index - 1];
            let after = route[index];
            let span = after.offset - before.offset;
            if span <= 0.0
            {
               return Some((after.lat, after.lon));
            }
            let fraction = (meters - before.offset) / span;
            Some((before.lat + (after.lat - before.lat) * fraction,
                  before.lon + (after.lon - before.lon) * fraction))
         }
      }
   }
}

#[cfg(test)]
mod tests
{
   use super::*;

   fn straight_route() -> Vec<RoutePoint>
   {
      vec![RoutePoint { offset: 0.0, lat: 0.0, lon: 0.0 },
           RoutePoint { offset: 100.0, lat: 0.0, lon: 0.001 },
           RoutePoint { offset: 200.0, lat: 0.0, lon: 0.002 }]
   }

   #[test]
   fn offset_clamps_at_route_extent()
   {
      let route = straight_route();
      assert_eq!(point_at_offset(&route, -10.0), Some((0.0, 0.0)));
      assert_eq!(point_at_offset(&route, 5000.0), Some((0.0, 0.002)));
   }

   #[test]
   fn offset_interpolates_between_points()
   {
      let route = straight_route();
      let (lat, lon) = point_at_offset(&route, 50.0).expect("point on route");
      assert_eq!(lat, 0.0);
      assert!((lon - 0.0005).abs() < 1e-12);
   }

   #[test]
   fn offset_hits_exact_vertex()
   {
      let route = straight_route();
      assert_eq!(point_at_offset(&route, 100.0), Some((0.0, 0.001)));
   }

   #[test]
   fn empty_route_has_no_points()
   {
      assert_eq!(point_at_offset(&[], 0.0), None);
      assert_eq!(route_length(&[]), 0.0);
   }

   #[test]
   fn haversine_matches_equator_degree()
   {
      // One degree of longitude at the equator is roughly 111.2km.
      let d = haversine_meters(0.0, 0.0, 0.0, 1.0);
      assert!((d - 111_195.0).abs() < 100.0, "unexpected distance {d}");
   }

   fn write_gpx(content: &str) -> (tempfile::TempDir, std::path::PathBuf)
   {
      let dir = tempfile::tempdir().expect("temp dir");
      let path = dir.path().join("route.gpx");
      std::fs::write(&path, content).expect("write gpx");
      (dir, path)
   }

   #[test]
   fn loads_track_with_monotonic_offsets()
   {
      let (_dir, path) = write_gpx(
         r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><trkseg>
    <trkpt lat="0.0" lon="0.0"></trkpt>
    <trkpt lat="0.0" lon="0.001"></trkpt>
    <trkpt lat="0.001" lon="0.001"></trkpt>
  </trkseg></trk>
</gpx>"#);
      let route = load_route(&path).expect("route loads");
      assert_eq!(route.len(), 3);
      assert_eq!(route[0].offset, 0.0);
      for pair in route.windows(2)
      {
         assert!(pair[1].offset >= pair[0].offset);
      }
      assert!(route_length(&route) > 200.0);
   }

   #[test]
   fn falls_back_to_rte_elements()
   {
      let (_dir, path) = write_gpx(
         r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <rte>
    <rtept lat="51.5" lon="-0.1"></rtept>
    <rtept lat="51.501" lon="-0.1"></rtept>
  </rte>
</gpx>"#);
      let route = load_route(&path).expect("route loads");
      assert_eq!(route.len(), 2);
      assert_eq!(route[0].lat, 51.5);
   }

   #[test]
   fn empty_gpx_is_an_error()
   {
      let (_dir, path) = write_gpx(
         r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
</gpx>"#);
      assert!(load_route(&path).is_err());
   }
}
