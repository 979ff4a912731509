//! The configuration runtime: snapshot, reload loop, observers.

mod config;
mod nop;

pub use config::{Config, ConfigBuilder};
pub use nop::NopConfig;
