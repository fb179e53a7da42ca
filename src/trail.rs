use chrono::{DateTime, Local};
use walkers::{Position, lon_lat};

use crate::provider::ProviderError;

/// A single received location fix. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationPoint
{
   pub lat: f64,
   pub lon: f64,
   pub received_at: DateTime<Local>,
}

impl LocationPoint
//================
{
   /// Validates the coordinate before admitting it into a Trail.
   pub fn new(lat: f64, lon: f64) -> Result<Self, ProviderError>
   //-----------------------------------------------------------
   {
      if !lat.is_finite() || !lon.is_finite() || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon)
      {
         return Err(ProviderError::InvalidCoordinate { lat, lon });
      }
      Ok(Self { lat, lon, received_at: Local::now() })
   }

   pub fn position(&self) -> Position { lon_lat(self.lon, self.lat) }
}

/// Ordered, append-only list of received fixes for the current session.
/// Cleared only through an explicit reset, never as a toggle side effect.
#[derive(Debug, Default)]
pub struct Trail
//==============
{
   points: Vec<LocationPoint>,
}

impl Trail
//========
{
   pub fn new() -> Self { Self { points: Vec::new() } }

   pub fn push(&mut self, point: LocationPoint) { self.points.push(point); }

   pub fn len(&self) -> usize { self.points.len() }

   pub fn is_empty(&self) -> bool { self.points.is_empty() }

   pub fn last(&self) -> Option<&LocationPoint> { self.points.last() }

   pub fn points(&self) -> &[LocationPoint] { &self.points }

   pub fn clear(&mut self) { self.points.clear(); }
}

/// Polyline geometry derived from a Trail. The vertex sequence always
/// equals the trail's point sequence in the same order.
#[derive(Debug, Default)]
pub struct TrailOverlay
//=====================
{
   vertices: Vec<Position>,
}

impl TrailOverlay
//===============
{
   pub fn new() -> Self { Self { vertices: Vec::new() } }

   /// Appends one vertex for a point just pushed onto the trail.
   pub fn extend(&mut self, point: &LocationPoint)
   //---------------------------------------------
   {
      self.vertices.push(point.position());
   }

   /// Regenerates the whole polyline, used after an explicit trail reset.
   pub fn rebuild(&mut self, trail: &Trail)
   //--------------------------------------
   {
      self.vertices.clear();
      self.vertices.extend(trail.points().iter().map(|p| p.position()));
   }

   pub fn vertices(&self) -> &[Position] { &self.vertices }

   pub fn len(&self) -> usize { self.vertices.len() }

   pub fn is_empty(&self) -> bool { self.vertices.is_empty() }
}

#[cfg(test)]
mod tests
{
   use super::*;

   fn fix(lat: f64, lon: f64) -> LocationPoint
   {
      LocationPoint::new(lat, lon).expect("valid coordinate")
   }

   #[test]
   fn overlay_vertices_track_trail_order()
   {
      let mut trail = Trail::new();
      let mut overlay = TrailOverlay::new();
      for (lat, lon) in [(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]
      {
         let point = fix(lat, lon);
         trail.push(point);
         overlay.extend(&point);
      }
      assert_eq!(trail.len(), 3);
      assert_eq!(overlay.len(), 3);
      for (vertex, point) in overlay.vertices().iter().zip(trail.points())
      {
         assert_eq!(vertex.x(), point.lon);
         assert_eq!(vertex.y(), point.lat);
      }
   }

   #[test]
   fn rejects_out_of_range_coordinates()
   {
      assert!(matches!(LocationPoint::new(91.0, 0.0), Err(ProviderError::InvalidCoordinate { .. })));
      assert!(matches!(LocationPoint::new(-91.0, 0.0), Err(ProviderError::InvalidCoordinate { .. })));
      assert!(matches!(LocationPoint::new(0.0, 180.5), Err(ProviderError::InvalidCoordinate { .. })));
      assert!(matches!(LocationPoint::new(f64::NAN, 0.0), Err(ProviderError::InvalidCoordinate { .. })));
      assert!(matches!(LocationPoint::new(0.0, f64::INFINITY), Err(ProviderError::InvalidCoordinate { .. })));
   }

   #[test]
   fn accepts_boundary_coordinates()
   {
      assert!(LocationPoint::new(90.0, 180.0).is_ok());
      assert!(LocationPoint::new(-90.0, -180.0).is_ok());
   }

   #[test]
   fn rebuild_after_clear_leaves_empty_overlay()
   {
      let mut trail = Trail::new();
      let mut overlay = TrailOverlay::new();
      let point = fix(45.5, -122.6);
      trail.push(point);
      overlay.extend(&point);
      trail.clear();
      overlay.rebuild(&trail);
      assert!(trail.is_empty());
      assert!(overlay.is_empty());
   }
}
