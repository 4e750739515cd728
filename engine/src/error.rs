//! Error taxonomy for the pseudonymization engine.
//!
//! One enum for the whole crate — every fallible operation in `ks`, `sc`,
//! `detect`, `pe` and `cg` funnels into this, since they all share the same
//! caller (the HTTP layer in `pseudon-service`). Recovery policy per variant
//! is documented inline; callers match on it rather than on the message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// `text` exceeded the configured per-call cap. Surfaced as-is; the
    /// caller is expected to split the document.
    #[error("input of {len} bytes exceeds the configured maximum of {max} bytes")]
    InputTooLarge { len: usize, max: usize },

    /// The consent gate rejected an outbound extraction. `guidance` lists the
    /// required preview/confirm steps and the applicable data-protection
    /// articles (spec §4.5 / §8 scenario F).
    #[error("consent not confirmed: {guidance}")]
    ConsentMissing { guidance: String },

    /// A required `session_id` was absent.
    #[error("session_id is required")]
    SessionMissing,

    /// The key service could not be reached. Pseudonymize aborts with no
    /// partial writes; depseudonymize degrades the affected token only.
    #[error("key service unavailable: {0}")]
    KeyUnavailable(String),

    /// The configured key name/version has not been provisioned, or was
    /// revoked.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// MAC verification failed on decrypt. Never fatal to the whole call —
    /// the affected token is left as-is and reported in `stats.missing`.
    #[error("ciphertext failed authentication")]
    InvalidCiphertext,

    /// A token scanned during depseudonymize has no reverse binding (cache
    /// loss, expired TTL, or a token from a destroyed session). Left as-is.
    #[error("no reverse binding for token {0}")]
    BindingNotFound(String),

    /// The cache failed mid-mint. Pseudonymize aborts; any reverse bindings
    /// already written in this call are rolled back best-effort.
    #[error("failed to persist binding: {0}")]
    BindingFailed(String),

    /// A detector's backing model (e.g. a remote NER service) could not be
    /// reached. That layer is skipped with a warning; other layers proceed
    /// and the result is marked `degraded` — never a silent pass-through.
    #[error("detector model unavailable: {0}")]
    DetectorModelUnavailable(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
