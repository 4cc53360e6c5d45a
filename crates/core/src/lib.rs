pub mod config;
pub mod error;
pub mod event;
pub mod signature;

pub use config::EngineConfig;
pub use error::*;
pub use event::*;
