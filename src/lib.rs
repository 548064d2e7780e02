pub use crate::config::{get_global_config_dir, read_global_config};

pub mod api;
pub mod config;
pub mod console;
pub mod credentials;
pub mod invitations;
pub mod run;
