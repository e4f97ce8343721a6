pub mod app;
pub mod audio;
pub mod canvas;
pub mod config;
pub mod error;
pub mod field;
pub mod render;
pub mod scheduler;
pub mod spectrum;
pub mod terminal;
pub mod visualizer;

pub use error::VisualizerError;
