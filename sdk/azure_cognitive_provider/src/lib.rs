#![doc = include_str!("../README.md")]

pub mod config;
pub mod provider;

pub use config::ProviderConfig;
pub use provider::Provider;
