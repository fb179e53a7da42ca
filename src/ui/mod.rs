// Public modules
pub mod ui;
pub mod frame;

// Re-export key types and functions
pub use ui::TrailViewUI;
