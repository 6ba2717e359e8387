//! A Container Storage Interface plugin exposing a single host's LVM2 volume
//! group as a pool of block and filesystem volumes.

pub mod csi {
    tonic::include_proto!("csi.v0");
}

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod identity;
pub mod interceptors;
pub mod lvm;
pub mod metrics;
pub mod node;
pub mod server;
pub mod uptime;
pub mod validation;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use server::LvmCsiServer;
