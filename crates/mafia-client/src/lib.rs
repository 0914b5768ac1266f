pub mod config;
pub mod discovery;
pub mod memory_store;
pub mod orchestrator;
pub mod store;
pub mod ticker;

#[cfg(feature = "native")]
pub mod realtime;
#[cfg(feature = "native")]
pub mod rest_store;
