//! Configuration management
//!
//! Layered configuration (embedded defaults, user and repository files, an
//! explicit `--config` file, `AUTO_CONCURRENCY_*` environment variables and
//! command-line flags) merged with figment, then parsed into typed
//! [`Settings`].

pub mod core;
pub mod overrides;
pub mod settings;

// Re-export main types for easier access
pub use self::core::AppConfig;
pub use overrides::ConfigOverrides;
pub use settings::{Settings, WorkersSetting};
