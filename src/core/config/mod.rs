pub mod data;
pub mod defaults;
pub mod io;
pub mod printing;


pub use data::{Config, PrivateServer, ProviderSettings, StreamSettings, DEFAULT_BACKEND_URL};
pub use io::ConfigError;
