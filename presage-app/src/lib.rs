pub mod config;
pub mod display;
pub mod export;
pub mod gate;
pub mod library;

pub use config::{AppConfig, PhysiologyConfig};
pub use display::ConsoleDisplay;
pub use export::{LoadedSession, SessionExport, Summary, load_session};
