use std::{future::Future, path::PathBuf, sync::{Arc, mpsc::Sender}, time::Duration};

use eframe::egui::{self, Color32, Context, Frame};
use walkers::{Map, MapMemory, Position, lon_lat};

use crate::{SETTINGS,
            components::{TrailPlugin, toggle_button},
            provider::{LocationProvider, ProviderError, ProviderEvent},
            route::{RoutePoint, load_route},
            session::Pace,
            settings::Settings};

use super::ui::TrailViewUI;

impl eframe::App for TrailViewUI
//==============================
{
   fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame)
   //------------------------------------------------------------------
   {
      set_style(ctx);

      if let Ok((route, filepath)) = self.open_dialog_channel.1.try_recv() // new route opened
      {
         if !route.is_empty()
         {
            self.install_route(ctx, route, &filepath);
         }
         else
         {
            self.toast_manager.error("The selected GPX file contains no route points or could not be processed.", None);
         }
      }

      self.drain_provider_events();

      // The replay thread stops itself at the route end; reflect that in the toggle.
      let provider_running = self.provider.as_ref().map(|p| p.is_running()).unwrap_or(false);
      if self.session.is_tracking() && !provider_running
      {
         self.session.set_tracking(false);
         self.toast_manager.info("Tracking stopped: end of replay route.", Some(Duration::from_secs(4)));
      }

      egui::TopBottomPanel::top("top_panel").resizable(false).min_height(48.0)
      .frame(Frame::new().fill(egui::Color32::from_rgb(169, 157, 133)))
      .show(ctx, |ui|
      {
         ui.horizontal(|ui|
         {
            let settings_tex = self.textures.get("settings").cloned();
            if let Some((texture, size)) = settings_tex
               && ui.add(egui::Button::image(egui::Image::new(&texture)
                     .alt_text("Settings")
                     .bg_fill(egui::Color32::from_rgb(232, 227, 209))
                     .fit_to_exact_size(size.into())))
                     .on_hover_text("Edit settings")
               .clicked()
            {
               self.open_settings_dialog();
            }

            ui.add_space(5.0);
            ui.separator();
            ui.add_space(5.0);

            let open_tex = self.textures.get("open").cloned();
            if let Some((texture, size)) = open_tex
               && ui.add(egui::Button::image(egui::Image::new(&texture)
                     .alt_text("Open")
                     .bg_fill(egui::Color32::from_rgb(232, 227, 209))
                     .fit_to_exact_size(size.into())))
                     .on_hover_text("Open a GPX route to replay")
               .clicked()
            {
               let sender = self.open_dialog_channel.0.clone();
               open_route_dialog(ui.ctx(), sender);
            }

            ui.separator();

            let mut tracking = self.session.is_tracking();
            if toggle_button(ui, "Tracking", &mut tracking)
                  .on_hover_text("Start or stop receiving location updates")
                  .clicked()
            {
               self.set_tracking(tracking);
            }

            let mut aux = self.session.aux_enabled();
            if toggle_button(ui, "Verbose", &mut aux)
                  .on_hover_text("Auxiliary provider flag (logs each fix in the replay provider)")
                  .clicked()
            {
               self.session.set_aux(aux);
               if let Some(provider) = self.provider.as_mut()
               {
                  provider.set_aux(aux);
               }
            }

            ui.separator();

            // Pace button only makes sense while the provider is producing fixes
            let pace_icon = match self.session.pace()
            {
               | Pace::Moving => "pace-moving",
               | Pace::Stationary => "pace-stationary",
            };
            let pace_tex = self.textures.get(pace_icon).cloned();
            if let Some((texture, size)) = pace_tex
               && ui.add_enabled(self.session.is_tracking(),
                     egui::Button::image(egui::Image::new(&texture)
                        .alt_text("Change pace")
                        .bg_fill(egui::Color32::from_rgb(232, 227, 209))
                        .fit_to_exact_size(size.into())))
                        .on_hover_text("Switch the provider between moving and stationary pace")
               .clicked()
            {
               let pace = self.session.toggle_pace();
               if let Some(provider) = self.provider.as_mut()
               {
                  provider.set_pace(pace == Pace::Moving);
               }
            }

            let recenter_tex = self.textures.get("recenter").cloned();
            if let Some((texture, size)) = recenter_tex
               && ui.add(egui::Button::image(egui::Image::new(&texture)
                     .alt_text("Current position")
                     .bg_fill(egui::Color32::from_rgb(232, 227, 209))
                     .fit_to_exact_size(size.into())))
                     .on_hover_text("Re-center the map on the current position")
               .clicked()
               && let Some(provider) = self.provider.as_mut()
            {
               provider.request_position();
            }

            let reset_tex = self.textures.get("reset").cloned();
            if let Some((texture, size)) = reset_tex
               && ui.add(egui::Button::image(egui::Image::new(&texture)
                     .alt_text("Reset trail")
                     .bg_fill(egui::Color32::from_rgb(232, 227, 209))
                     .fit_to_exact_size(size.into())))
                     .on_hover_text("Discard the recorded trail")
               .clicked()
            {
               self.session.reset();
            }

            ui.separator();

            let mut speed: f64 = self.simulated_speed.load();
            ui.label(egui::RichText::new("Speed:").color(egui::Color32::YELLOW).strong());
            let speed_response = ui.add_sized(
               egui::Vec2::new(70.0, 30.0),
               egui::DragValue::new(&mut speed)
                  .suffix(" km/h")
                  .range(0.0..=200.0)
                  .min_decimals(0)
                  .max_decimals(0)
                  .speed(1.0)
                  .clamp_existing_to_range(true))
            .on_hover_text("The simulated replay speed. Drag with mouse or enter a value.");
            if speed_response.dragged() || speed_response.changed()
            {
               self.simulated_speed.store(speed);
            }

            ui.separator();
            let status = match self.session.last_fix()
            {
               | Some(fix) => format!("{} fixes, last at {}", self.session.trail().len(), fix.received_at.format("%H:%M:%S")),
               | None => "No fixes yet".to_string(),
            };
            ui.label(egui::RichText::new(status).color(egui::Color32::DARK_GRAY));
         })
      } );

      egui::CentralPanel::default()
      .show(ctx, |ui|
      {
         if self.route_file.is_none() && self.session.trail().is_empty()
         {
            display_welcome(ui);
         }
         else
         {
            let vertices = self.session.overlay().vertices().to_vec();
            let current_position = self.session.recenter_target();
            let my_position = if self.follow_position
            {
               current_position
            }
            else
            {
               self.session.trail().points().first().map(|p| p.position())
            };
            let my_position = my_position.or(self.route_start).unwrap_or(lon_lat(0.0, 0.0));

            if let (Some(tiles), Some(memory)) = (&mut self.tiles, &mut self.map_memory)
            {
               ui.add(
                  Map::new(Some(tiles), memory, my_position)
                     .with_plugin(TrailPlugin
                     {
                        vertices,
                        current_position,
                     })
               );
            }
         }
      });

      self.show_settings_dialog(ctx);
      self.toast_manager.show(ctx);
   }
}

impl TrailViewUI
//==============
{
   fn install_route(&mut self, ctx: &Context, route: Vec<RoutePoint>, filepath: &str)
   //--------------------------------------------------------------------------------
   {
      self.route_start = route.first().map(|p| lon_lat(p.lon, p.lat));
      self.route_file = Some(PathBuf::from(filepath));
      // A new route is an explicit reset of the recorded trail
      self.session.reset();
      self.session.set_tracking(false);
      if let Some(provider) = self.provider.as_mut()
      {
         provider.set_route(route);
      }
      match PathBuf::from(filepath).file_name()
      {
         | Some(name) =>
         {
            let title = "TrailView: ".to_string() + &name.to_string_lossy();
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));
         },
         | None => ()
      }
      self.toast_manager.success("Route loaded. Enable tracking to start the replay.", Some(Duration::from_secs(4)));
   }

   fn drain_provider_events(&mut self)
   //---------------------------------
   {
      while let Ok(event) = self.provider_events.1.try_recv()
      {
         match event
         {
            | ProviderEvent::Location(point) =>
            {
               self.session.on_location_update(point);
            }
            | ProviderEvent::CurrentPosition(point) =>
            {
               if let Some(memory) = self.map_memory.as_mut()
               {
                  recenter_map(memory, self.follow_position, point.position());
               }
            }
            | ProviderEvent::Error(e) =>
            {
               match e
               {
                  | ProviderError::InvalidCoordinate { .. } => self.toast_manager.warning(e.to_string(), None),
                  | _ => self.toast_manager.error(e.to_string(), None),
               }
            }
         }
      }
   }
}

/// Re-centering while following is enabled re-attaches the camera, so later
/// fixes keep the map centered even after the user dragged away. With
/// following disabled the map centers once on the given fix and stays put.
fn recenter_map(memory: &mut MapMemory, follow: bool, position: Position)
//-----------------------------------------------------------------------
{
   if follow
   {
      memory.follow_my_position();
   }
   else
   {
      memory.center_at(position);
   }
}

fn display_welcome(ui: &mut egui::Ui)
//-----------------------------------
{
   ui.vertical_centered(|ui|
   {
      ui.add_space(48.0);
      ui.add(egui::Label::new(egui::RichText::new("TrailView")
               .heading().strong().color(Color32::LIGHT_YELLOW)));
      ui.add_space(16.0);
      ui.add(egui::Label::new(egui::RichText::new("Open a GPX route with the toolbar button or pass one on the command line, \
                                                   then enable Tracking to watch the trail grow on the map.")
               .color(egui::Color32::GREEN)));
      ui.add_space(8.0);
      ui.add(egui::Label::new(egui::RichText::new("The pace button trades update rate for power draw; \
                                                   the crosshair re-centers the map on the latest fix.")
               .color(egui::Color32::LIGHT_YELLOW)));
   });
}

fn open_route_dialog(ctx: &Context, sender: Sender<(Vec<RoutePoint>, String)>)
//----------------------------------------------------------------------------
{
   let pick_dir: PathBuf;
   {
      let settings = SETTINGS.get_or_init(|| Arc::new(parking_lot::Mutex::new(Settings::new().get_settings_or_default())));
      pick_dir = settings.lock().get_last_directorybuf();
   }
   let dialog_future = rfd::AsyncFileDialog::new().set_directory(pick_dir).pick_file();
   let ctxx = ctx.clone();
   execute(async move
   {
      let file_info = dialog_future.await;
      if let Some(fileinfo) = file_info
      {
         let path = fileinfo.path();
         match path.parent()
         {
            | Some(d) =>
            {
               let settings = SETTINGS.get_or_init(|| Arc::new(parking_lot::Mutex::new(Settings::new().get_settings_or_default())));
               settings.lock().set_last_directorybuf(&d.to_path_buf());
            },
            | None => (),
         };
         let route: Vec<RoutePoint> = match load_route(path)
         {
            | Ok(route) =>
            {
               println!("Successfully processed {} route points.", route.len());
               route
            }
            | Err(e) =>
            {
               eprintln!("Error processing GPX file {:?}: {}", path, e);
               Vec::new()
            }
         };
         let _ = sender.send((route, path.display().to_string()));
         ctxx.request_repaint();
      }
   });
}

fn execute<F: Future<Output = ()> + Send + 'static>(f: F)
{
    std::thread::spawn(move || futures::executor::block_on(f));
}

#[cfg(test)]
mod tests
{
   use super::*;

   #[test]
   fn recenter_with_follow_reattaches_camera()
   {
      let mut memory = MapMemory::default();
      memory.center_at(lon_lat(10.0, 10.0)); // user dragged away
      assert!(memory.detached().is_some());
      recenter_map(&mut memory, true, lon_lat(1.0, 2.0));
      assert!(memory.detached().is_none());
   }

   #[test]
   fn recenter_without_follow_centers_once()
   {
      let mut memory = MapMemory::default();
      recenter_map(&mut memory, false, lon_lat(3.0, 4.0));
      assert!(memory.detached().is_some());
   }
}

fn set_style(ctx: &Context)
//--------------------
{
   let mut style: egui::Style = (*ctx.style()).clone();
   style.visuals.window_fill = egui::Color32::from_rgb(30, 30, 30);
   style.visuals.image_loading_spinners = true;
   style.text_styles = [(egui::TextStyle::Heading, egui::FontId::new(28.0, egui::FontFamily::Proportional)),
                        (egui::TextStyle::Body, egui::FontId::new(18.0, egui::FontFamily::Proportional)),
                        (egui::TextStyle::Monospace, egui::FontId::new(18.0, egui::FontFamily::Monospace)),
                        (egui::TextStyle::Button, egui::FontId::new(18.0, egui::FontFamily::Proportional)),
                        (egui::TextStyle::Small, egui::FontId::new(14.0, egui::FontFamily::Proportional))].into();
   ctx.set_style(style);
}
