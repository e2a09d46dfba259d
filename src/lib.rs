pub use taskmaster_cli::cli;
pub use taskmaster_cli::commands;
pub use taskmaster_cli::config;
pub use taskmaster_cli::run_blocking;
pub use taskmaster_cli::AppConfig;

pub use taskmaster_core as core;
pub use taskmaster_core::filters;
pub use taskmaster_core::model;
pub use taskmaster_core::services;
pub use taskmaster_core::store;
