//! Consent Gate (spec §4.5) — stateless policy object. It never consults
//! the cache; confirming promptly after the preview is the operator's
//! responsibility, not something the gate can verify.

use crate::error::{EngineError, Result};

const GUIDANCE: &str = "Required steps before an outbound extraction call: \
(1) POST the document to /internal/pseudonymize and obtain a session_id, \
(2) render the returned mapping as an HTML preview and have an operator \
visually confirm every highlighted span is a personal identifier, \
(3) resubmit with confirmed=true and the same session_id. \
See Ley Orgánica de Protección de Datos Personales, arts. 5 and 9 \
(lawfulness and consent) and art. 32 (security measures for processing).";

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsentGate;

impl ConsentGate {
    pub fn new() -> Self {
        Self
    }

    /// Assert that an outbound extraction may proceed.
    pub fn require_confirmation(&self, session_id: Option<&str>, confirmed: bool) -> Result<()> {
        let session_id = session_id.filter(|s| !s.is_empty());

        if session_id.is_none() {
            return Err(EngineError::SessionMissing);
        }

        if !confirmed {
            return Err(EngineError::ConsentMissing {
                guidance: GUIDANCE.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_session() {
        let gate = ConsentGate::new();
        let err = gate.require_confirmation(None, true).unwrap_err();
        assert!(matches!(err, EngineError::SessionMissing));
    }

    #[test]
    fn rejects_empty_session() {
        let gate = ConsentGate::new();
        let err = gate.require_confirmation(Some(""), true).unwrap_err();
        assert!(matches!(err, EngineError::SessionMissing));
    }

    #[test]
    fn rejects_unconfirmed() {
        let gate = ConsentGate::new();
        let err = gate
            .require_confirmation(Some("session_1"), false)
            .unwrap_err();
        match err {
            EngineError::ConsentMissing { guidance } => {
                assert!(guidance.contains("pseudonymize"));
                assert!(guidance.contains("Protección de Datos"));
            }
            other => panic!("expected ConsentMissing, got {other:?}"),
        }
    }

    #[test]
    fn accepts_confirmed_session() {
        let gate = ConsentGate::new();
        assert!(gate.require_confirmation(Some("session_1"), true).is_ok());
    }
}
