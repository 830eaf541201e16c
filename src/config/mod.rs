pub mod schema;

pub use schema::{Config, DispatchConfig, LockConfig};
