use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const PROGRAM: &str = "TrailView";

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Settings
{
   #[serde(default = "Settings::get_home_dir")]
   last_directory: PathBuf,
   /// Metres travelled between recorded fixes while the pace is "moving".
   pub(crate) distance_filter: f64,
   /// Filter multiplier applied while the pace is "stationary".
   pub(crate) stationary_multiplier: f64,
   /// Default replay speed in km/h.
   pub(crate) simulated_speed_kmh: f64,
   /// Whether the map follows each new fix by default.
   pub(crate) follow_position: bool,
}

impl Default for Settings
{
   fn default() -> Self
   //------------------
   {
      Self
      {
         last_directory: Settings::get_home_dir(),
         distance_filter: 50.0,
         stationary_multiplier: 10.0,
         simulated_speed_kmh: 45.0,
         follow_position: true,
      }
   }
}

impl Settings
//===========
{
   pub fn new() -> Self
   {
      Settings::default()
   }

   fn get_home_dir() -> PathBuf
   {
      match dirs::home_dir()
      {
         | Some(h) => h,
         | None => env::temp_dir(),
      }
   }

   pub fn get_settings(&self) -> Result<Settings, String>
   //----------------------------------------------------
   {
      let settings_path = match self.get_settings_path()
      {
         | Ok(p) => p,
         | Err(e) =>
         {
            let errmsg = format!("Error getting settings path: {}", e);
            eprintln!("{errmsg}");
            return Err(errmsg);
         }
      };
      if !settings_path.exists()
      {
         match self.write_settings()
         {
            | Ok(p) => println!("Wrote default settings to {}", p.display()),
            | Err(e) =>
            {
               let errmsg = format!("Error creating default settings: {}", e);
               eprintln!("{errmsg}");
               return Err(errmsg);
            }
         }
      }
      Settings::read_settings_from(&settings_path)
   }

   pub fn get_settings_or_default(&self) -> Settings
   //-----------------------------------------------
   {
      match self.get_settings()
      {
         | Ok(s) => s,
         | Err(_) => Settings::default(),
      }
   }

   pub(crate) fn read_settings_from(path: &Path) -> Result<Settings, String>
   //-----------------------------------------------------------------------
   {
      let json = fs::read_to_string(path).map_err(|e| format!("Error reading settings file {}: {}", path.display(), e))?;
      serde_json::from_str(&json).map_err(|e| format!("Error parsing settings file {}: {}", path.display(), e))
   }

   pub(crate) fn write_settings(&self) -> Result<PathBuf, std::io::Error>
   //--------------------------------------------------------------------
   {
      let settings_file = self.get_settings_path()?;
      self.write_settings_to(&settings_file)?;
      Ok(settings_file)
   }

   pub(crate) fn write_settings_to(&self, path: &Path) -> Result<(), std::io::Error>
   //-------------------------------------------------------------------------------
   {
      let mut file = File::create(path)?;
      let json = serde_json::to_string_pretty(&self)?;
      file.write_all(json.as_bytes())?;
      Ok(())
   }

   pub fn get_settings_path(&self) -> Result<PathBuf, std::io::Error>
   //----------------------------------------------------------------
   {
      let mut config_dir = self.get_config_path()?;
      config_dir.push("settings.json");
      Ok(config_dir)
   }

   fn get_config_path(&self) -> Result<PathBuf, std::io::Error>
   //----------------------------------------------------------
   {
      let base = match dirs::config_dir()
      {
         | Some(dir) => dir,
         | None => env::temp_dir(),
      };
      let config_dir = base.join(PROGRAM);
      if !config_dir.exists()
      {
         fs::create_dir_all(&config_dir)?;
      }
      Ok(config_dir)
   }

   pub fn get_last_directorybuf(&self) -> PathBuf
   {
      self.last_directory.clone()
   }

   pub fn set_last_directorybuf(&mut self, dir: &PathBuf)
   //----------------------------------------------------
   {
      self.last_directory = dir.clone();
      if let Err(e) = self.write_settings()
      {
         eprintln!("Error saving settings: {}", e);
      }
   }
}

#[cfg(test)]
mod tests
{
   use super::*;

   #[test]
   fn settings_roundtrip_through_json_file()
   {
      let dir = tempfile::tempdir().expect("temp dir");
      let path = dir.path().join("settings.json");
      let mut settings = Settings::default();
      settings.distance_filter = 25.0;
      settings.simulated_speed_kmh = 80.0;
      settings.follow_position = false;
      settings.write_settings_to(&path).expect("write settings");

      let loaded = Settings::read_settings_from(&path).expect("read settings");
      assert_eq!(loaded.distance_filter, 25.0);
      assert_eq!(loaded.simulated_speed_kmh, 80.0);
      assert!(!loaded.follow_position);
      assert_eq!(loaded.stationary_multiplier, settings.stationary_multiplier);
   }

   #[test]
   fn missing_last_directory_defaults_to_home()
   {
      let dir = tempfile::tempdir().expect("temp dir");
      let path = dir.path().join("settings.json");
      fs::write(&path, r#"{ "distance_filter": 10.0, "stationary_multiplier": 5.0, "simulated_speed_kmh": 30.0, "follow_position": true }"#)
         .expect("write partial settings");
      let loaded = Settings::read_settings_from(&path).expect("read settings");
      assert_eq!(loaded.distance_filter, 10.0);
      assert_eq!(loaded.get_last_directorybuf(), Settings::get_home_dir());
   }

   #[test]
   fn malformed_settings_file_is_an_error()
   {
      let dir = tempfile::tempdir().expect("temp dir");
      let path = dir.path().join("settings.json");
      fs::write(&path, "not json").expect("write junk");
      assert!(Settings::read_settings_from(&path).is_err());
   }
}
