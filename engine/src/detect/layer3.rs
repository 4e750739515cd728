//! Layer 3 — signature block (spec §4.3). Scans only the final 2,000
//! characters; names here are accepted literally, without variant
//! expansion, since a signature line is generally contiguous.

use super::exceptions::is_exception;
use super::{ClaimedValues, Detector};
use crate::types::{DetectionLayer, EntityType, Span};
use once_cell::sync::Lazy;
use regex::Regex;

const WINDOW: usize = 2_000;

static SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:Elaborado\s+por|Revisado\s+por|Aprobado\s+por|Ing\.|Econ\.|Dr\.|Mgs\.)\s*:?\s*([\p{L}][\p{L} .]{3,58}[\p{L}.])",
    )
    .unwrap()
});

fn tail(text: &str) -> (&str, usize) {
    let char_count = text.chars().count();
    if char_count <= WINDOW {
        return (text, 0);
    }
    let skip = char_count - WINDOW;
    let byte_offset = text
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(0);
    (&text[byte_offset..], byte_offset)
}

pub struct SignatureBlockDetector;

impl SignatureBlockDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SignatureBlockDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SignatureBlockDetector {
    fn layer(&self) -> DetectionLayer {
        DetectionLayer::SignatureBlock
    }

    fn detect(&self, text: &str, already_claimed: &ClaimedValues) -> Vec<Span> {
        let (window, offset) = tail(text);
        let mut out = Vec::new();

        for caps in SIGNATURE.captures_iter(window) {
            let m = caps.get(1).unwrap();
            let value = m.as_str().trim().trim_end_matches('.').to_string();
            if value.chars().count() < 5 || is_exception(&value) {
                continue;
            }
            if already_claimed.is_claimed(EntityType::Nombre, &value) {
                continue;
            }
            out.push(Span {
                entity_type: EntityType::Nombre,
                value,
                start: offset + m.start(),
                end: offset + m.end(),
                layer: DetectionLayer::SignatureBlock,
                expand_variants: false,
            });
        }

        out
    }
}
