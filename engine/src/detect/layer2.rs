//! Layer 2 — statistical NER (spec §4.3). Candidates come from a pluggable
//! `NerBackend`; this module owns only the rejection filter and the
//! variant-expansion hookup, so swapping backends never changes the filter.

use super::exceptions::is_exception;
use super::ner::NerBackend;
use super::variants;
use super::{ClaimedValues, Detector};
use crate::types::{DetectionLayer, EntityType, Span};
use std::sync::Arc;

const INSTITUTIONAL_KEYWORDS: &[&str] = &[
    "DIRECCIÓN", "DIRECCION", "COORDINACIÓN", "COORDINACION", "UNIDAD",
    "AGENCIA", "MINISTERIO", "SECRETARÍA", "SECRETARIA", "ARCOTEL",
    "GERENCIA", "SUBSECRETARÍA", "SUBSECRETARIA", "DEPARTAMENTO",
];

const COMMON_VERBS: &[&str] = &[
    "CERTIFICO", "CERTIFICAR", "ELABORO", "ELABORAR", "ELABORADO",
    "REVISO", "REVISAR", "APRUEBO", "APROBAR", "NOTIFICO", "NOTIFICAR",
    "SOLICITO", "SOLICITAR", "RESUELVO", "RESOLVER", "DISPONGO", "DISPONER",
];

const FORBIDDEN_CHARS: &[char] = &['→', '←', '•', '▪', '\u{0}', '\u{7}', '\t'];

const SHORT_WORD_WHITELIST: &[&str] = &[
    "de", "del", "la", "el", "los", "las", "y", "von", "van", "da", "do",
];

fn word_count(value: &str) -> usize {
    value.split_whitespace().count()
}

fn has_institutional_keyword(value: &str) -> bool {
    let upper = value.to_uppercase();
    INSTITUTIONAL_KEYWORDS.iter().any(|k| upper.contains(k))
}

fn has_common_verb(value: &str) -> bool {
    let upper = value.to_uppercase();
    COMMON_VERBS.iter().any(|v| {
        upper
            .split_whitespace()
            .any(|w| w.trim_matches(|c: char| !c.is_alphabetic()) == *v)
    })
}

fn has_forbidden_char(value: &str) -> bool {
    value.chars().any(|c| FORBIDDEN_CHARS.contains(&c) || c.is_control())
}

fn has_disallowed_short_word(value: &str) -> bool {
    value.split_whitespace().any(|w| {
        w.chars().count() < 3 && !SHORT_WORD_WHITELIST.iter().any(|a| a.eq_ignore_ascii_case(w))
    })
}

/// The rejection filter itself (spec §4.3 Layer 2 bullet list), independent
/// of where the candidate came from.
pub fn passes_rejection_filter(value: &str) -> bool {
    let words = word_count(value);
    if !(2..=5).contains(&words) {
        return false;
    }
    if !(10..=60).contains(&value.chars().count()) {
        return false;
    }
    if has_institutional_keyword(value) {
        return false;
    }
    if has_common_verb(value) {
        return false;
    }
    if has_forbidden_char(value) {
        return false;
    }
    if has_disallowed_short_word(value) {
        return false;
    }
    true
}

pub struct NerDetector {
    backend: Arc<dyn NerBackend>,
}

impl NerDetector {
    pub fn new(backend: Arc<dyn NerBackend>) -> Self {
        Self { backend }
    }
}

impl Detector for NerDetector {
    fn layer(&self) -> DetectionLayer {
        DetectionLayer::Ner
    }

    fn backend_unavailable(&self) -> bool {
        !self.backend.is_available()
    }

    fn detect(&self, text: &str, already_claimed: &ClaimedValues) -> Vec<Span> {
        if !self.backend.is_available() {
            return Vec::new();
        }

        self.backend
            .recognize(text)
            .into_iter()
            .filter(|c| passes_rejection_filter(&c.value))
            .filter(|c| !is_exception(&c.value))
            .filter(|c| !already_claimed.is_claimed(EntityType::Nombre, &c.value))
            .map(|c| Span {
                entity_type: EntityType::Nombre,
                value: c.value,
                start: c.start,
                end: c.end,
                layer: DetectionLayer::Ner,
                expand_variants: true,
            })
            .collect()
    }
}

/// Variant-expand an accepted Layer 2 candidate (spec §4.3: "Accepted values
/// are variant-expanded with the same algorithm as Layer 1.5").
pub fn expand_name(span: &Span) -> Vec<String> {
    variants::expand(&span.value)
}
