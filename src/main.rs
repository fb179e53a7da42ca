use std::{cell::RefCell, fs, sync::OnceLock};
use std::sync::Arc;

use clap::Parser;
use eframe::egui;

mod settings;
mod components;
mod provider;
mod route;
mod session;
mod trail;
pub mod ui;

use settings::Settings;
use ui::TrailViewUI;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args
{
   /// Simulated replay speed in km/h
   #[arg(short = 's', long = "speed")]
   speed: Option<f64>,

   /// Optional GPX route to replay
   #[arg()]
   route_path: Option<String>,
}

struct StartupParameters
{
   speed:      Option<f64>,
   route_path: Option<String>,
}

static STARTUP_PARAMS: parking_lot::Mutex<RefCell<Option<StartupParameters>>> = parking_lot::Mutex::new(RefCell::new(None));
static SETTINGS: OnceLock<Arc<parking_lot::Mutex<Settings>>> = OnceLock::new();

fn main()
{
   env_logger::init();
   {
      let cmdline_opts = STARTUP_PARAMS.lock();
      let args = Args::parse();

      if let Some(speed) = args.speed
         && !(0.0..=500.0).contains(&speed)
      {
         eprintln!("Invalid speed {speed}. Use a value between 0 and 500 km/h.");
         return;
      }

      let mut route_path: Option<String> = None;
      if let Some(filepath) = args.route_path
      {
         let gpx_file_path = std::path::Path::new(&filepath);
         let metadata = match fs::metadata(gpx_file_path)
         {
            | Ok(meta) => meta,
            | Err(_) =>
            {
               eprintln!("The path {filepath} is not a valid file.");
               return;
            }
         };
         if !metadata.is_file()
         {
            eprintln!("The path {filepath} is not a valid file.");
            return;
         }
         route_path = Some(filepath.clone());
      }

      cmdline_opts.replace(Some(StartupParameters { speed:      args.speed,
                                                    route_path: route_path, }));
   }
   let options = eframe::NativeOptions { viewport: egui::ViewportBuilder::default().with_inner_size([1024.0, 768.0]),
                                         ..Default::default() };
   let ret = eframe::run_native("TrailView",
                                options,
                                Box::new(|cc| Ok(Box::new(TrailViewUI::new(cc)))));
   if let Err(e) = ret
   {
      eprintln!("Error starting user interface: {e}");
   }
}
