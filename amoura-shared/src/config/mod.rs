pub mod client;

pub use client::{Config, RealtimeConfig};
