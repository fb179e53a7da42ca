use std::{collections::HashMap,
          path::PathBuf,
          sync::{Arc, mpsc::{Receiver, Sender, channel}},
          time::Duration};

use crossbeam::atomic::AtomicCell;
use eframe::{CreationContext, egui::{self, ColorImage, Context, TextureHandle}};
use walkers::{HttpTiles, MapMemory, Position, lon_lat, sources::OpenStreetMap};
use include_dir::{include_dir, Dir};

use crate::{SETTINGS, STARTUP_PARAMS,
            components::ToastManager,
            provider::{LocationProvider, ProviderEvent, ReplayProvider},
            route::{RoutePoint, load_route},
            session::TrackSession,
            settings::Settings};

// Embed the toolbar icons at compile time
static ASSETS_DIR: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/assets");

const TOOLBAR_ICON_SIZE: u32 = 40;

pub struct TrailViewUI
//====================
{
   pub(crate) toast_manager:        ToastManager,
   pub(crate) session:              TrackSession,
   pub(crate) provider:             Option<ReplayProvider>,
   pub(crate) provider_events:      (Sender<ProviderEvent>, Receiver<ProviderEvent>),
   pub(crate) open_dialog_channel:  (Sender<(Vec<RoutePoint>, String)>, Receiver<(Vec<RoutePoint>, String)>),
   pub(crate) route_file:           Option<PathBuf>,
   pub(crate) route_start:          Option<Position>,
   pub(crate) pending_route:        Option<Vec<RoutePoint>>,
   pub(crate) simulated_speed:      Arc<AtomicCell<f64>>,
   pub(crate) follow_position:      bool,
   pub(crate) textures:             HashMap<String, (TextureHandle, [f32; 2])>,
   pub(crate) tiles:                Option<HttpTiles>,
   pub(crate) map_memory:           Option<MapMemory>,

   pub show_settings_dialog:        bool,
   temp_distance_filter:            f64,
   temp_stationary_multiplier:      f64,
   temp_speed:                      f64,
   temp_follow:                     bool,
}

impl Default for TrailViewUI
//==========================
{
   fn default() -> Self
   //------------------
   {
      let cmdline_opts = STARTUP_PARAMS.lock();
      let cmdline_opts = cmdline_opts.borrow();
      let speed_opt = cmdline_opts.as_ref().and_then(|opts| opts.speed);
      let filepath_opt = cmdline_opts.as_ref()
                                     .and_then(|opts| opts.route_path.as_ref().map(PathBuf::from));

      let mut toast_manager = ToastManager::new();
      let mut pending_route: Option<Vec<RoutePoint>> = None;
      let mut route_file: Option<PathBuf> = None;
      if let Some(path) = filepath_opt
      {
         match load_route(&path)
         {
            | Ok(route) =>
            {
               println!("Loaded {} route points from {}.", route.len(), path.display());
               pending_route = Some(route);
               route_file = Some(path);
            }
            | Err(e) =>
            {
               eprintln!("Error loading route {}: {}", path.display(), e);
               toast_manager.error(format!("Could not load route {}: {}", path.display(), e), None);
            }
         }
      }

      let settings = SETTINGS.get_or_init(|| Arc::new(parking_lot::Mutex::new(Settings::new().get_settings_or_default())));
      let (default_speed, follow_position) =
      {
         let settings_lock = settings.lock();
         (settings_lock.simulated_speed_kmh, settings_lock.follow_position)
      };

      Self
      {
         toast_manager,
         session: TrackSession::new(),
         provider: None,
         provider_events: channel(),
         open_dialog_channel: channel(),
         route_start: pending_route.as_ref().and_then(|r| r.first().map(|p| lon_lat(p.lon, p.lat))),
         route_file,
         pending_route,
         simulated_speed: Arc::new(AtomicCell::new(speed_opt.unwrap_or(default_speed))),
         follow_position,
         textures: HashMap::new(),
         tiles: None,
         map_memory: None,
         show_settings_dialog: false,
         temp_distance_filter: 50.0,
         temp_stationary_multiplier: 10.0,
         temp_speed: default_speed,
         temp_follow: follow_position,
      }
   }
}

impl TrailViewUI
//==============
{
   pub fn new(cc: &CreationContext) -> Self
   //--------------------------------------
   {
      let mut app = TrailViewUI::default();
      let icons = [("open", "open_icon.svg"),
                   ("settings", "settings.svg"),
                   ("recenter", "crosshair.svg"),
                   ("pace-moving", "pause.svg"),
                   ("pace-stationary", "play.svg"),
                   ("reset", "trash.svg")];
      for (name, asset) in icons
      {
         match load_svg_texture(&cc.egui_ctx, name, asset, TOOLBAR_ICON_SIZE, TOOLBAR_ICON_SIZE)
         {
            | Ok(texture) =>
            {
               app.textures
                  .insert(name.to_string(), (texture, [TOOLBAR_ICON_SIZE as f32, TOOLBAR_ICON_SIZE as f32]));
            }
            | Err(e) =>
            {
               eprintln!("Failed to load {asset} icon texture {e}.");
            }
         }
      }
      app.tiles = Some(HttpTiles::new(OpenStreetMap, cc.egui_ctx.clone()));
      app.map_memory = Some(MapMemory::default());

      let (distance_filter, stationary_multiplier) =
      {
         let settings = SETTINGS.get_or_init(|| Arc::new(parking_lot::Mutex::new(Settings::new().get_settings_or_default())));
         let settings_lock = settings.lock();
         (settings_lock.distance_filter, settings_lock.stationary_multiplier)
      };
      let mut provider = ReplayProvider::new(cc.egui_ctx.clone(),
                                             app.provider_events.0.clone(),
                                             app.simulated_speed.clone(),
                                             distance_filter,
                                             stationary_multiplier);
      if let Some(route) = app.pending_route.take()
      {
         provider.set_route(route);
      }
      app.provider = Some(provider);

      app
   }

   /// Opens the settings dialog and loads current settings into temp fields
   pub(crate) fn open_settings_dialog(&mut self)
   //-------------------------------------------
   {
      let settings = SETTINGS.get_or_init(|| Arc::new(parking_lot::Mutex::new(Settings::new().get_settings_or_default())));
      let settings_lock = settings.lock();

      self.temp_distance_filter = settings_lock.distance_filter;
      self.temp_stationary_multiplier = settings_lock.stationary_multiplier;
      self.temp_speed = settings_lock.simulated_speed_kmh;
      self.temp_follow = settings_lock.follow_position;

      self.show_settings_dialog = true;
   }

   /// Shows the settings dialog if it's open (call this every frame)
   pub(crate) fn show_settings_dialog(&mut self, ctx: &Context)
   //----------------------------------------------------------
   {
      if !self.show_settings_dialog
      {
         return;
      }

      let mut save_clicked = false;
      let mut cancel_clicked = false;
      egui::Window::new("Settings")
         .collapsible(false)
         .resizable(false)
         .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
         .show(ctx, |ui| {
            ui.set_min_width(420.0);

            egui::Grid::new("settings_grid")
               .num_columns(2)
               .spacing([10.0, 10.0])
               .striped(true)
               .show(ui, |ui| {
                  ui.label("Distance filter (m):");
                  ui.add_sized(
                     egui::Vec2::new(100.0, 30.0),
                     egui::DragValue::new(&mut self.temp_distance_filter)
                     .range(1.0..=1000.0)
                     .speed(1.0))
                     .on_hover_text("Metres travelled between recorded fixes while moving");
                  ui.end_row();

                  ui.label("Stationary multiplier:");
                  ui.add_sized(
                     egui::Vec2::new(100.0, 30.0),
                     egui::DragValue::new(&mut self.temp_stationary_multiplier)
                     .range(1.0..=100.0)
                     .speed(0.5)
                     .max_decimals(1))
                     .on_hover_text("How much the distance filter grows in the stationary pace");
                  ui.end_row();

                  ui.label("Replay speed (km/h):");
                  ui.add_sized(
                     egui::Vec2::new(100.0, 30.0),
                     egui::DragValue::new(&mut self.temp_speed)
                     .range(1.0..=200.0)
                     .speed(1.0))
                     .on_hover_text("Default simulated speed along the replay route");
                  ui.end_row();

                  ui.label("Follow position:");
                  ui.checkbox(&mut self.temp_follow, "")
                    .on_hover_text("Keep the map centered on each new fix");
                  ui.end_row();
               });

            ui.separator();

            ui.horizontal(|ui| {
               if ui.button("Save").clicked()
               {
                  save_clicked = true;
               }
               if ui.button("Cancel").clicked()
               {
                  cancel_clicked = true;
               }
            });
         });

      if save_clicked
      {
         self.save_settings();
         self.show_settings_dialog = false;
      }
      if cancel_clicked
      {
         self.show_settings_dialog = false;
      }
   }

   fn save_settings(&mut self)
   //-------------------------
   {
      let settings = SETTINGS.get_or_init(|| Arc::new(parking_lot::Mutex::new(Settings::new().get_settings_or_default())));
      let mut settings_lock = settings.lock();
      settings_lock.distance_filter = self.temp_distance_filter;
      settings_lock.stationary_multiplier = self.temp_stationary_multiplier;
      settings_lock.simulated_speed_kmh = self.temp_speed;
      settings_lock.follow_position = self.temp_follow;
      match settings_lock.write_settings()
      {
         | Ok(_) =>
         {
            self.toast_manager.success("Settings saved", Some(Duration::from_secs(3)));
         }
         | Err(e) =>
         {
            self.toast_manager.error(format!("Error saving settings: {}", e), None);
         }
      }
      drop(settings_lock);

      self.simulated_speed.store(self.temp_speed);
      self.follow_position = self.temp_follow;
      if let Some(provider) = self.provider.as_mut()
      {
         provider.set_distance_filter(self.temp_distance_filter);
      }
   }

   /// Forwards the enable toggle to the provider; a start failure rolls the
   /// toggle back and surfaces a notice.
   pub(crate) fn set_tracking(&mut self, enabled: bool)
   //--------------------------------------------------
   {
      let Some(provider) = self.provider.as_mut()
      else
      {
         return;
      };
      if enabled
      {
         if !provider.has_route()
         {
            self.session.set_tracking(false);
            self.toast_manager.info("Open a GPX route before enabling tracking.", None);
            return;
         }
         match provider.start()
         {
            | Ok(()) => self.session.set_tracking(true),
            | Err(e) =>
            {
               self.session.set_tracking(false);
               self.toast_manager.error(e.to_string(), None);
            }
         }
      }
      else
      {
         provider.stop();
         self.session.set_tracking(false);
      }
   }
}

/// Rasterize an SVG from embedded asset data
pub fn rasterize_svg_from_bytes(svg_data: &[u8], width: u32, height: u32) -> Result<ColorImage, String>
//------------------------------------------------------------------------------------------------------
{
   let tree = usvg::Tree::from_data(svg_data, &usvg::Options::default()).map_err(|e| format!("Failed to parse SVG: {}", e))?;

   let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| "Failed to create pixmap".to_string())?;

   // Scale the SVG to fit the requested size
   let svg_size = tree.size();
   let scale_x = width as f32 / svg_size.width();
   let scale_y = height as f32 / svg_size.height();
   let scale = scale_x.min(scale_y);

   let transform = tiny_skia::Transform::from_scale(scale, scale);

   resvg::render(&tree, transform, &mut pixmap.as_mut());

   let pixels = pixmap.data();
   let mut rgba_pixels = Vec::with_capacity((width * height * 4) as usize);

   // tiny_skia uses premultiplied BGRA, egui expects non-premultiplied RGBA
   for chunk in pixels.chunks_exact(4)
   {
      let r = chunk[2];
      let g = chunk[1];
      let b = chunk[0];
      let a = chunk[3];

      rgba_pixels.push(r);
      rgba_pixels.push(g);
      rgba_pixels.push(b);
      rgba_pixels.push(a);
   }

   Ok(ColorImage::from_rgba_unmultiplied([width as usize, height as usize], &rgba_pixels))
}

/// Load an SVG texture from embedded assets
pub fn load_svg_texture(ctx: &Context, name: &str, asset_name: &str, width: u32, height: u32) -> Result<TextureHandle, String>
//----------------------------------------------------------------------------------------------------------------------------
{
   let svg_data = ASSETS_DIR
      .get_file(asset_name)
      .ok_or_else(|| format!("Failed to find embedded asset: {}", asset_name))?
      .contents();

   let color_image = rasterize_svg_from_bytes(svg_data, width, height)?;

   Ok(ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR))
}
