//! Library exports for embedding inklink in a host application.
//!
//! Exposes the device registry, the connection state machine and the real-time
//! stroke pipeline so a UI layer can drive a smart pad and bind directly to the
//! resulting stroke collection.

pub mod config;
pub mod connection;
pub mod context;
pub mod device;
pub mod ink;
pub mod replay;
pub mod runtime;
pub mod store;

pub use config::Config;
pub use context::SessionContext;
pub use runtime::InkSession;
