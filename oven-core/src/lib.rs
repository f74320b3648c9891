//! oven-core: Shared library for the microwave appliance service
//!
//! This crate provides:
//! - Signed tokens and credential checks
//! - The countdown state machine with lazy time reconciliation
//! - The file-backed heating program catalog
//! - Session-keyed state storage
//! - HTTP payload types and configuration

pub mod appliance;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod protocol;
pub mod session;
pub mod token;

pub use appliance::{ApplianceError, ApplianceState, Started, Status};
pub use auth::AuthService;
pub use catalog::{NewProgram, Program, ProgramCatalog, ProgramEntry};
pub use config::Config;
pub use protocol::OvenResponse;
pub use session::{MemoryStateStore, StateStore};
pub use token::{Claims, TokenCodec};

/// Default HTTP port for oven-server
pub const DEFAULT_PORT: u16 = 8000;
