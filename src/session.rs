use walkers::Position;

use crate::trail::{LocationPoint, Trail, TrailOverlay};

/// Provider operating mode: high-rate fixes while moving, a throttled
/// cadence while stationary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace
{
   Moving,
   Stationary,
}

/// State behind the trail screen: the accumulated trail, its polyline
/// overlay and the toggle/pace flags the widgets reflect. Holds no UI
/// handles so the screen behaviour is testable headless.
pub struct TrackSession
//=====================
{
   trail:       Trail,
   overlay:     TrailOverlay,
   is_tracking: bool,
   aux_enabled: bool,
   pace:        Pace,
}

impl Default for TrackSession
//===========================
{
   fn default() -> Self
   {
      Self
      {
         trail: Trail::new(),
         overlay: TrailOverlay::new(),
         is_tracking: false,
         aux_enabled: false,
         pace: Pace::Moving,
      }
   }
}

impl TrackSession
//===============
{
   pub fn new() -> Self { Self::default() }

   /// Appends a delivered fix to the trail and extends the overlay.
   /// Always succeeds for a validated point.
   pub fn on_location_update(&mut self, point: LocationPoint)
   //--------------------------------------------------------
   {
      self.trail.push(point);
      self.overlay.extend(&point);
   }

   /// Reflects the enable toggle. Never touches accumulated trail points,
   /// so off/on round trips are idempotent for the trail.
   pub fn set_tracking(&mut self, enabled: bool) { self.is_tracking = enabled; }

   pub fn is_tracking(&self) -> bool { self.is_tracking }

   /// Second toggle, forwarded to the provider verbatim; the session only
   /// mirrors its state.
   pub fn set_aux(&mut self, enabled: bool) { self.aux_enabled = enabled; }

   pub fn aux_enabled(&self) -> bool { self.aux_enabled }

   /// Flips between the moving and stationary pace and reports the new one.
   pub fn toggle_pace(&mut self) -> Pace
   //-----------------------------------
   {
      self.pace = match self.pace
      {
         | Pace::Moving => Pace::Stationary,
         | Pace::Stationary => Pace::Moving,
      };
      self.pace
   }

   pub fn pace(&self) -> Pace { self.pace }

   /// Where a recenter request should land: the last received fix, or
   /// nothing at all before the first update (recenter is then a no-op).
   pub fn recenter_target(&self) -> Option<Position>
   //-----------------------------------------------
   {
      self.trail.last().map(|p| p.position())
   }

   pub fn last_fix(&self) -> Option<&LocationPoint> { self.trail.last() }

   /// Explicit trail reset, the only operation that discards points.
   pub fn reset(&mut self)
   //---------------------
   {
      self.trail.clear();
      self.overlay.rebuild(&self.trail);
   }

   pub fn trail(&self) -> &Trail { &self.trail }

   pub fn overlay(&self) -> &TrailOverlay { &self.overlay }
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
   fn updates_grow_trail_and_overlay_in_order()
   {
      let mut session = TrackSession::new();
      let coords = [(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)];
      for (lat, lon) in coords
      {
         session.on_location_update(fix(lat, lon));
      }
      assert_eq!(session.trail().len(), 3);
      let vertices = session.overlay().vertices();
      assert_eq!(vertices.len(), 3);
      for (vertex, (lat, lon)) in vertices.iter().zip(coords)
      {
         assert_eq!(vertex.y(), lat);
         assert_eq!(vertex.x(), lon);
      }
   }

   #[test]
   fn toggling_tracking_keeps_trail_contents()
   {
      let mut session = TrackSession::new();
      session.set_tracking(true);
      session.on_location_update(fix(10.0, 10.0));
      session.on_location_update(fix(10.1, 10.1));
      session.set_tracking(false);
      assert_eq!(session.trail().len(), 2);
      session.set_tracking(true);
      assert_eq!(session.trail().len(), 2);
      assert_eq!(session.overlay().len(), 2);
   }

   #[test]
   fn recenter_before_first_update_is_noop()
   {
      let session = TrackSession::new();
      assert!(session.recenter_target().is_none());
   }

   #[test]
   fn recenter_targets_latest_fix()
   {
      let mut session = TrackSession::new();
      session.on_location_update(fix(1.0, 2.0));
      session.on_location_update(fix(3.0, 4.0));
      let target = session.recenter_target().expect("have a fix");
      assert_eq!(target.y(), 3.0);
      assert_eq!(target.x(), 4.0);
   }

   #[test]
   fn pace_flips_between_modes()
   {
      let mut session = TrackSession::new();
      assert_eq!(session.pace(), Pace::Moving);
      assert_eq!(session.toggle_pace(), Pace::Stationary);
      assert_eq!(session.toggle_pace(), Pace::Moving);
   }

   #[test]
   fn reset_clears_trail_overlay_and_fix()
   {
      let mut session = TrackSession::new();
      session.on_location_update(fix(5.0, 5.0));
      session.reset();
      assert!(session.trail().is_empty());
      assert!(session.overlay().is_empty());
      assert!(session.recenter_target().is_none());
   }

   #[test]
   fn aux_toggle_is_independent_of_trail()
   {
      let mut session = TrackSession::new();
      session.on_location_update(fix(0.5, 0.5));
      session.set_aux(true);
      assert!(session.aux_enabled());
      session.set_aux(false);
      assert_eq!(session.trail().len(), 1);
   }
}
