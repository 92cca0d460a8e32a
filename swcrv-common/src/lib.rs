// swcrv-common/src/lib.rs
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;

// Re-export key types
pub use config::{Config, HostFramework};
pub use error::{Result, SwcrvError};
pub use model::{Abi, Platform, Target};
