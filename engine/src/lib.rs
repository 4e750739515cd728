//! Reversible pseudonymization engine: a layered detector that maps
//! personal data to stable, session-scoped opaque tokens, plus the key
//! service, session cache and consent-gate traits it is built from.
//!
//! This crate has no networking of its own. `KeyService` and `SessionCache`
//! are dependency-injected traits; `pseudon-service` supplies the real
//! Vault-Transit and Redis-backed implementations, this crate ships only
//! in-memory reference implementations for tests and a dependency-free dev
//! mode.

pub mod cg;
pub mod detect;
pub mod error;
pub mod ks;
pub mod pe;
pub mod sc;
pub mod token;
pub mod types;

pub use cg::ConsentGate;
pub use error::{EngineError, Result};
pub use pe::{Engine, EngineConfig, Mapping, PseudonymizeOutput};
pub use token::Token;
pub use types::{DetectionLayer, EntityType, Span, Stats};
