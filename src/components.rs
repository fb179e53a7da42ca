use std::time::{Duration, Instant};

use eframe::egui::{self, Button, Response, Ui};
use walkers::{MapMemory, Plugin, Position, Projector};

/// Walkers Plugin that renders the recorded trail as a connected polyline
/// plus a marker on the most recent fix. Vertices arrive in arrival order,
/// matching the trail point sequence.
pub struct TrailPlugin
//====================
{
   pub(crate) vertices:         Vec<Position>,
   pub(crate) current_position: Option<Position>,
}

impl Plugin for TrailPlugin
//=========================
{
   fn run(self: Box<Self>, ui: &mut egui::Ui, _response: &egui::Response, projector: &Projector, _map_memory: &MapMemory)
   //--------------------------------------------------------------------------------------------------------------------
   {
      let painter = ui.painter();

      let screen_points: Vec<egui::Pos2> = self.vertices
                                               .iter()
                                               .map(|vertex| projector.project(*vertex).to_pos2())
                                               .collect();

      if screen_points.len() >= 2
      {
         painter.add(egui::Shape::line(screen_points.clone(),
                                       egui::Stroke::new(4.0, egui::Color32::from_rgb(40, 90, 220))));
      }
      // A lone fix still gets a dot before any line segment exists
      else if let Some(first) = screen_points.first()
      {
         painter.circle_filled(*first, 3.0, egui::Color32::from_rgb(40, 90, 220));
      }

      if let Some(position) = self.current_position
      {
         let marker = projector.project(position).to_pos2();
         painter.circle_filled(marker, 7.0, egui::Color32::from_rgb(220, 60, 60));
         painter.circle_stroke(marker, 7.0, egui::Stroke::new(2.0, egui::Color32::WHITE));
      }
   }
}

//-----------------------------------------------------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToastLevel
{
   Info,
   Warning,
   Error,
   Success,
}

impl ToastLevel
{
   fn color(&self) -> egui::Color32
   {
      match self
      {
         | ToastLevel::Info => egui::Color32::from_rgb(60, 120, 216),
         | ToastLevel::Warning => egui::Color32::from_rgb(255, 165, 0),
         | ToastLevel::Error => egui::Color32::from_rgb(220, 53, 69),
         | ToastLevel::Success => egui::Color32::from_rgb(40, 167, 69),
      }
   }

   fn icon(&self) -> &str
   {
      match self
      {
         | ToastLevel::Info => "ℹ",
         | ToastLevel::Warning => "⚠",
         | ToastLevel::Error => "✖",
         | ToastLevel::Success => "✔",
      }
   }
}

#[derive(Clone)]
pub struct Toast
{
   message:    String,
   level:      ToastLevel,
   created_at: Instant,
   duration:   Duration,
}

impl Toast
{
   pub fn new(message: impl Into<String>, level: ToastLevel, duration: Option<Duration>) -> Self
   {
      Self {
         message: message.into(),
         level,
         created_at: Instant::now(),
         duration: duration.unwrap_or(Duration::from_secs(4)),
      }
   }

   pub fn is_expired(&self) -> bool
   {
      self.created_at.elapsed() > self.duration
   }

   pub fn remaining_fraction(&self) -> f32
   {
      let elapsed = self.created_at.elapsed().as_secs_f32();
      let total = self.duration.as_secs_f32();
      ((total - elapsed) / total).max(0.0)
   }
}

/// Transient, non-fatal notices shown in a corner overlay. Provider errors
/// (unavailable, permission denied, invalid coordinate) all surface here
/// and never terminate the screen.
pub struct ToastManager
//=====================
{
   toasts: Vec<Toast>,
}

impl Default for ToastManager
{
   fn default() -> Self
   {
      Self::new()
   }
}

impl ToastManager
//===============
{
   pub fn new() -> Self
   {
      Self { toasts: Vec::new() }
   }

   pub fn add(&mut self, toast: Toast)
   {
      self.toasts.push(toast);
   }

   pub fn info(&mut self, message: impl Into<String>, duration: Option<Duration>)
   {
      self.add(Toast::new(message, ToastLevel::Info, duration));
   }

   pub fn warning(&mut self, message: impl Into<String>, duration: Option<Duration>)
   {
      self.add(Toast::new(message, ToastLevel::Warning, duration));
   }

   pub fn error(&mut self, message: impl Into<String>, duration: Option<Duration>)
   {
      self.add(Toast::new(message, ToastLevel::Error, duration));
   }

   pub fn success(&mut self, message: impl Into<String>, duration: Option<Duration>)
   {
      self.add(Toast::new(message, ToastLevel::Success, duration));
   }

   pub fn show(&mut self, ctx: &egui::Context)
   //-----------------------------------------
   {
      self.toasts.retain(|toast| !toast.is_expired());
      if self.toasts.is_empty()
      {
         return;
      }

      let screen_rect = ctx.content_rect();
      let toast_width = 330.0;
      let toast_spacing = 8.0;
      let margin = 16.0;

      // Stack upwards from the bottom-right corner, clear of the toolbar
      let mut y_offset = margin + 72.0;

      for (index, toast) in self.toasts.iter().enumerate()
      {
         let toast_id = egui::Id::new("trail_toast").with(index);

         egui::Area::new(toast_id)
            .fixed_pos(egui::pos2(
               screen_rect.right() - toast_width - margin,
               screen_rect.bottom() - y_offset,
            ))
            .order(egui::Order::Foreground)
            .show(ctx, |ui|
            {
               egui::Frame::new()
                  .fill(egui::Color32::from_black_alpha(230))
                  .stroke(egui::Stroke::new(2.0, toast.level.color()))
                  .corner_radius(6.0)
                  .inner_margin(10.0)
                  .show(ui, |ui|
                  {
                     ui.set_width(toast_width - 20.0);

                     ui.horizontal(|ui|
                     {
                        ui.label(
                           egui::RichText::new(toast.level.icon())
                              .color(toast.level.color())
                              .size(22.0),
                        );
                        ui.add_space(6.0);
                        ui.label(
                           egui::RichText::new(&toast.message)
                              .color(egui::Color32::WHITE)
                              .size(14.0),
                        );
                     });

                     let remaining = toast.remaining_fraction();
                     ui.add_space(4.0);
                     let bar_height = 3.0;
                     let (rect, _response) = ui.allocate_exact_size(
                        egui::vec2(toast_width - 20.0, bar_height),
                        egui::Sense::hover(),
                     );
                     ui.painter().rect_filled(
                        egui::Rect::from_min_size(
                           rect.min,
                           egui::vec2((toast_width - 20.0) * remaining, bar_height),
                        ),
                        0.0,
                        toast.level.color().linear_multiply(0.8),
                     );
                  });
            });

         y_offset += 68.0 + toast_spacing;
      }

      // Keep repainting so the progress bar animates
      ctx.request_repaint();
   }
}

pub fn toggle_button(ui: &mut Ui, text: &str, state: &mut bool) -> Response
//-------------------------------------------------------------------------
{
   let mut button = Button::new(text);
   if *state
   {
      button = button.selected(true);
   }
   let response = ui.add(button);
   if response.clicked()
   {
      *state = !*state;
   }
   response
}
