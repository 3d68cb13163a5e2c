//! ads-config
//!
//! Client configuration (backend endpoint, timeouts, directories) and the
//! on-disk session file. Owns every filesystem path the client writes to.

pub mod error;
pub mod manager;
pub mod model;
pub mod session_file;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::ClientConfig;
pub use session_file::SessionFile;
