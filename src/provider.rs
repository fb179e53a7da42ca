use std::{fmt,
          sync::{Arc,
                 atomic::{AtomicBool, Ordering},
                 mpsc::Sender},
          time::{Duration, Instant}};

use crossbeam::atomic::AtomicCell;
use eframe::egui::Context;

use crate::{route::{RoutePoint, point_at_offset, route_length}, trail::LocationPoint};

/// Non-fatal provider failures, surfaced to the user as toast notices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProviderError
{
   ProviderUnavailable,
   PermissionDenied,
   InvalidCoordinate { lat: f64, lon: f64 },
}

impl fmt::Display for ProviderError
//=================================
{
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
   {
      match self
      {
         | ProviderError::ProviderUnavailable => write!(f, "Location provider is unavailable."),
         | ProviderError::PermissionDenied => write!(f, "Location permission was denied."),
         | ProviderError::InvalidCoordinate { lat, lon } =>
            write!(f, "Received an invalid coordinate ({lat}, {lon})."),
      }
   }
}

impl std::error::Error for ProviderError {}

/// Asynchronous notifications pushed from a provider to the screen.
#[derive(Debug, Clone, Copy)]
pub enum ProviderEvent
{
   Location(LocationPoint),
   CurrentPosition(LocationPoint),
   Error(ProviderError),
}

/// Control surface of an external location source. Delivery of fixes happens
/// out of band through the event channel handed to the provider at creation;
/// stop is fire-and-forget with no confirmation or retry semantics.
pub trait LocationProvider
//========================
{
   fn start(&mut self) -> Result<(), ProviderError>;
   fn stop(&mut self);
   fn set_pace(&mut self, moving: bool);
   fn set_aux(&mut self, enabled: bool);
   fn request_position(&mut self);
}

/// Provider that replays a loaded route at a simulated speed on a background
/// thread, emitting a fix each time the travelled distance grows past the
/// configured filter. Travelled distance survives stop/start so re-enabling
/// tracking resumes rather than restarts.
pub struct ReplayProvider
//=======================
{
   ctx:                   Context,
   events:                Sender<ProviderEvent>,
   route:                 Arc<parking_lot::RwLock<Vec<RoutePoint>>>,
   travelled:             Arc<AtomicCell<f64>>,
   last_emitted:          Arc<AtomicCell<f64>>,
   last_fix:              Arc<AtomicCell<Option<(f64, f64)>>>,
   speed_kmh:             Arc<AtomicCell<f64>>,
   distance_filter:       Arc<AtomicCell<f64>>,
   stationary_multiplier: f64,
   is_running:            Arc<AtomicBool>,
   is_moving:             Arc<AtomicBool>,
   aux_enabled:           Arc<AtomicBool>,
}

impl ReplayProvider
//=================
{
   pub fn new(ctx: Context, events: Sender<ProviderEvent>, speed_kmh: Arc<AtomicCell<f64>>,
              distance_filter: f64, stationary_multiplier: f64) -> Self
   //--------------------------------------------------------------------------------------
   {
      Self
      {
         ctx,
         events,
         route: Arc::new(parking_lot::RwLock::new(Vec::new())),
         travelled: Arc::new(AtomicCell::new(0.0)),
         last_emitted: Arc::new(AtomicCell::new(f64::NEG_INFINITY)),
         last_fix: Arc::new(AtomicCell::new(None)),
         speed_kmh,
         distance_filter: Arc::new(AtomicCell::new(distance_filter)),
         stationary_multiplier,
         is_running: Arc::new(AtomicBool::new(false)),
         is_moving: Arc::new(AtomicBool::new(true)),
         aux_enabled: Arc::new(AtomicBool::new(false)),
      }
   }

   /// Replaces the replay route and rewinds the simulated journey.
   pub fn set_route(&mut self, route: Vec<RoutePoint>)
   //-------------------------------------------------
   {
      self.stop();
      self.travelled.store(0.0);
      self.last_emitted.store(f64::NEG_INFINITY);
      self.last_fix.store(None);
      *self.route.write() = route;
   }

   pub fn has_route(&self) -> bool { !self.route.read().is_empty() }

   pub fn is_running(&self) -> bool { self.is_running.load(Ordering::Relaxed) }

   pub fn set_distance_filter(&mut self, meters: f64) { self.distance_filter.store(meters); }

   #[allow(clippy::too_many_arguments)]
   fn replay_thread(ctx: Context, events: Sender<ProviderEvent>, route: Arc<parking_lot::RwLock<Vec<RoutePoint>>>,
                    travelled: Arc<AtomicCell<f64>>, last_emitted: Arc<AtomicCell<f64>>,
                    last_fix: Arc<AtomicCell<Option<(f64, f64)>>>,
                    speed_kmh: Arc<AtomicCell<f64>>, distance_filter: Arc<AtomicCell<f64>>,
                    stationary_multiplier: f64, is_running: Arc<AtomicBool>, is_moving: Arc<AtomicBool>,
                    aux_enabled: Arc<AtomicBool>)
   //--------------------------------------------------------------------------------------------------------------
   {
      // The cursor lives in the provider, so a resume with no progress since
      // the last emission stays silent instead of re-sending the same fix.
      let mut last_tick = Instant::now();
      loop
      {
         if !is_running.load(Ordering::Relaxed)
         {
            break;
         }

         let total = route_length(&route.read());
         let elapsed = last_tick.elapsed().as_secs_f64();
         last_tick = Instant::now();
         let speed_mps = speed_kmh.load().max(0.0) * 1000.0 / 3600.0;
         let distance = (travelled.load() + speed_mps * elapsed).min(total);
         travelled.store(distance);

         let filter = if is_moving.load(Ordering::Relaxed)
         {
            distance_filter.load()
         }
         else
         {
            distance_filter.load() * stationary_multiplier
         };

         if (distance - last_emitted.load()) >= filter
         {
            let coordinate = point_at_offset(&route.read(), distance);
            if let Some((lat, lon)) = coordinate
            {
               match LocationPoint::new(lat, lon)
               {
                  | Ok(point) =>
                  {
                     last_fix.store(Some((lat, lon)));
                     let _ = events.send(ProviderEvent::Location(point));
                     if aux_enabled.load(Ordering::Relaxed)
                     {
                        log::info!("[location] {lat:.6},{lon:.6} at {distance:.1}m");
                     }
                  }
                  | Err(e) =>
                  {
                     log::warn!("Discarding replay fix: {e}");
                     let _ = events.send(ProviderEvent::Error(e));
                  }
               }
               ctx.request_repaint();
               last_emitted.store(distance);
            }
         }

         if total > 0.0 && distance >= total
         {
            log::info!("Route replay finished after {total:.0}m");
            break;
         }
         std::thread::sleep(Duration::from_millis(500));
      }
      is_running.store(false, Ordering::Relaxed);
      ctx.request_repaint();
   }
}

impl LocationProvider for ReplayProvider
//======================================
{
   fn start(&mut self) -> Result<(), ProviderError>
   //----------------------------------------------
   {
      if self.is_running.load(Ordering::Relaxed)
      {
         return Ok(());
      }
      if self.route.read().is_empty()
      {
         return Err(ProviderError::ProviderUnavailable);
      }
      self.is_running.store(true, Ordering::Relaxed);

      let ctx = self.ctx.clone();
      let events = self.events.clone();
      let route = self.route.clone();
      let travelled = self.travelled.clone();
      let last_emitted = self.last_emitted.clone();
      let last_fix = self.last_fix.clone();
      let speed_kmh = self.speed_kmh.clone();
      let distance_filter = self.distance_filter.clone();
      let stationary_multiplier = self.stationary_multiplier;
      let is_running = self.is_running.clone();
      let is_moving = self.is_moving.clone();
      let aux_enabled = self.aux_enabled.clone();
      std::thread::spawn(move ||
      {
         ReplayProvider::replay_thread(ctx, events, route, travelled, last_emitted, last_fix, speed_kmh,
                                       distance_filter, stationary_multiplier, is_running, is_moving, aux_enabled);
      });
      Ok(())
   }

   fn stop(&mut self)
   {
      self.is_running.store(false, Ordering::Relaxed);
   }

   fn set_pace(&mut self, moving: bool)
   {
      self.is_moving.store(moving, Ordering::Relaxed);
   }

   fn set_aux(&mut self, enabled: bool)
   {
      self.aux_enabled.store(enabled, Ordering::Relaxed);
   }

   fn request_position(&mut self)
   //----------------------------
   {
      // No fix yet means no event: recenter before any update is a no-op.
      if let Some((lat, lon)) = self.last_fix.load()
      {
         match LocationPoint::new(lat, lon)
         {
            | Ok(point) =>
            {
               let _ = self.events.send(ProviderEvent::CurrentPosition(point));
               self.ctx.request_repaint();
            }
            | Err(e) =>
            {
               let _ = self.events.send(ProviderEvent::Error(e));
            }
         }
      }
   }
}

#[cfg(test)]
mod tests
{
   use std::sync::mpsc::channel;

   use super::*;
   use crate::route::RoutePoint;

   fn test_provider() -> (ReplayProvider, std::sync::mpsc::Receiver<ProviderEvent>)
   {
      let (sender, receiver) = channel();
      let speed = Arc::new(AtomicCell::new(45.0));
      (ReplayProvider::new(Context::default(), sender, speed, 50.0, 10.0), receiver)
   }

   #[test]
   fn start_without_route_is_unavailable()
   {
      let (mut provider, _events) = test_provider();
      assert_eq!(provider.start(), Err(ProviderError::ProviderUnavailable));
      assert!(!provider.is_running());
   }

   #[test]
   fn position_request_before_any_fix_emits_nothing()
   {
      let (mut provider, events) = test_provider();
      provider.request_position();
      assert!(events.try_recv().is_err());
   }

   #[test]
   fn stop_without_start_is_harmless()
   {
      let (mut provider, _events) = test_provider();
      provider.stop();
      assert!(!provider.is_running());
   }

   #[test]
   fn route_swap_rewinds_journey()
   {
      let (mut provider, _events) = test_provider();
      provider.set_route(vec![RoutePoint { offset: 0.0, lat: 1.0, lon: 1.0 },
                              RoutePoint { offset: 10.0, lat: 1.0, lon: 1.001 }]);
      assert!(provider.has_route());
      assert_eq!(provider.travelled.load(), 0.0);
      assert_eq!(provider.last_emitted.load(), f64::NEG_INFINITY);
      assert_eq!(provider.last_fix.load(), None);
   }

   #[test]
   fn resume_without_progress_does_not_duplicate_fixes()
   {
      let (sender, receiver) = channel();
      let speed = Arc::new(AtomicCell::new(0.0)); // journey never advances
      let mut provider = ReplayProvider::new(Context::default(), sender, speed, 50.0, 10.0);
      provider.set_route(vec![RoutePoint { offset: 0.0, lat: 1.0, lon: 1.0 },
                              RoutePoint { offset: 500.0, lat: 1.0, lon: 1.005 }]);

      provider.start().expect("provider starts");
      let first = receiver.recv_timeout(Duration::from_secs(2)).expect("initial fix");
      assert!(matches!(first, ProviderEvent::Location(_)));

      provider.stop();
      while provider.is_running()
      {
         std::thread::sleep(Duration::from_millis(20));
      }

      // Travelled distance is unchanged, so re-enabling must stay silent.
      provider.start().expect("provider restarts");
      assert!(receiver.recv_timeout(Duration::from_millis(1500)).is_err());
      provider.stop();
   }

   #[test]
   fn error_messages_name_the_failure()
   {
      assert!(ProviderError::PermissionDenied.to_string().contains("permission"));
      assert!(ProviderError::ProviderUnavailable.to_string().contains("unavailable"));
      let invalid = ProviderError::InvalidCoordinate { lat: 99.0, lon: 0.0 };
      assert!(invalid.to_string().contains("99"));
   }

   /// Provider double used to check the screen forwards user intent verbatim.
   struct RecordingProvider
   {
      events: Sender<ProviderEvent>,
      started: bool,
      moving: Option<bool>,
      aux: Option<bool>,
      position_requests: usize,
   }

   impl LocationProvider for RecordingProvider
   {
      fn start(&mut self) -> Result<(), ProviderError>
      {
         self.started = true;
         Err(ProviderError::PermissionDenied)
      }

      fn stop(&mut self) { self.started = false; }

      fn set_pace(&mut self, moving: bool) { self.moving = Some(moving); }

      fn set_aux(&mut self, enabled: bool) { self.aux = Some(enabled); }

      fn request_position(&mut self)
      {
         self.position_requests += 1;
         let _ = self.events.send(ProviderEvent::Error(ProviderError::ProviderUnavailable));
      }
   }

   #[test]
   fn trait_object_forwards_control_calls()
   {
      let (sender, receiver) = channel();
      let mut provider: Box<dyn LocationProvider> = Box::new(RecordingProvider
      {
         events: sender,
         started: false,
         moving: None,
         aux: None,
         position_requests: 0,
      });
      assert_eq!(provider.start(), Err(ProviderError::PermissionDenied));
      provider.set_pace(false);
      provider.set_aux(true);
      provider.request_position();
      provider.stop();
      assert!(matches!(receiver.try_recv(),
                       Ok(ProviderEvent::Error(ProviderError::ProviderUnavailable))));
   }
}
