//! Layer 1.5 — header-context extraction (spec §4.3). Runs only over the
//! first 1,500 characters of the document after whitespace normalisation,
//! since the fields this layer looks for only ever appear in a document's
//! header block.

use super::exceptions::is_exception;
use super::variants;
use super::{ClaimedValues, Detector};
use crate::types::{DetectionLayer, EntityType, Span};
use once_cell::sync::Lazy;
use regex::Regex;

const WINDOW: usize = 1_500;

const NAME_CLASS: &str = r"[\p{L}0-9 \-\.&,/]+?";
const PHONE_CLASS: &str = r"\d{6,9}";

struct LabelRule {
    label: &'static str,
    entity_type: EntityType,
    value_class: &'static str,
    expand_variants: bool,
}

const RULES: &[LabelRule] = &[
    LabelRule {
        label: r"(?:PRESTADOR\s+O\s+CONCESIONARIO|POSEEDOR\s+O\s+NO\s+DE\s+T[IÍ]TULO\s+HABILITANTE)",
        entity_type: EntityType::Nombre,
        value_class: NAME_CLASS,
        expand_variants: true,
    },
    LabelRule {
        label: r"REPRESENTANTE\s+LEGAL",
        entity_type: EntityType::Nombre,
        value_class: NAME_CLASS,
        expand_variants: true,
    },
    LabelRule {
        label: r"DIRECCI[OÓ]N",
        entity_type: EntityType::Direccion,
        value_class: NAME_CLASS,
        expand_variants: false,
    },
    LabelRule {
        label: r"TEL[EÉ]FONO",
        entity_type: EntityType::Telefono,
        value_class: PHONE_CLASS,
        expand_variants: false,
    },
];

fn stop_alternation() -> String {
    RULES
        .iter()
        .map(|r| r.label)
        .collect::<Vec<_>>()
        .join("|")
}

static COMPILED: Lazy<Vec<Regex>> = Lazy::new(|| {
    let stop = stop_alternation();
    RULES
        .iter()
        .map(|r| {
            let pattern = format!(
                r"(?i)\b(?:{label})\b\s*[:\-]?\s*({class})(?=\s*(?:\b(?:{stop})\b|$))",
                label = r.label,
                class = r.value_class,
                stop = stop,
            );
            Regex::new(&pattern).expect("header-context pattern must compile")
        })
        .collect()
});

fn normalise(text: &str) -> String {
    let window: String = text.chars().take(WINDOW).collect();
    window.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct HeaderContextDetector;

impl HeaderContextDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeaderContextDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for HeaderContextDetector {
    fn layer(&self) -> DetectionLayer {
        DetectionLayer::HeaderContext
    }

    fn detect(&self, text: &str, already_claimed: &ClaimedValues) -> Vec<Span> {
        let normalised = normalise(text);
        let mut out = Vec::new();

        for (rule, re) in RULES.iter().zip(COMPILED.iter()) {
            for caps in re.captures_iter(&normalised) {
                let m = caps.get(1).unwrap();
                let value = m.as_str().trim().to_string();
                if value.is_empty() || is_exception(&value) {
                    continue;
                }
                if already_claimed.is_claimed(rule.entity_type, &value) {
                    continue;
                }
                out.push(Span {
                    entity_type: rule.entity_type,
                    value,
                    start: m.start(),
                    end: m.end(),
                    layer: DetectionLayer::HeaderContext,
                    expand_variants: rule.expand_variants,
                });
            }
        }

        out
    }
}

/// Variant-expand a Layer 1.5 name span into the substitution candidates
/// (spec §4.3); address and phone spans are substituted literally by the
/// caller instead.
pub fn expand_name(span: &Span) -> Vec<String> {
    if span.expand_variants {
        variants::expand(&span.value)
    } else {
        vec![span.value.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_prestador_name() {
        let detector = HeaderContextDetector::new();
        let claimed = ClaimedValues::new();
        let text = "PRESTADOR O CONCESIONARIO: SANTOS ORELLANA ADRIAN ALEXANDER\nREPRESENTANTE LEGAL: JUAN PEREZ";
        let spans = detector.detect(text, &claimed);
        assert!(spans
            .iter()
            .any(|s| s.entity_type == EntityType::Nombre
                && s.value == "SANTOS ORELLANA ADRIAN ALEXANDER"));
        assert!(spans
            .iter()
            .any(|s| s.entity_type == EntityType::Nombre && s.value == "JUAN PEREZ"));
    }

    #[test]
    fn stops_at_next_label_even_inside_address_text() {
        let detector = HeaderContextDetector::new();
        let claimed = ClaimedValues::new();
        let text = "Dirección: CIUDADELA LOS CEIBOS, PROVINCIA DEL GUAYAS TELÉFONO: 2345678";
        let spans = detector.detect(text, &claimed);
        let address = spans
            .iter()
            .find(|s| s.entity_type == EntityType::Direccion)
            .unwrap();
        assert!(!address.value.contains("TELÉFONO"));
        let phone = spans
            .iter()
            .find(|s| s.entity_type == EntityType::Telefono)
            .unwrap();
        assert_eq!(phone.value, "2345678");
    }

    #[test]
    fn address_and_phone_spans_do_not_expand_variants() {
        let detector = HeaderContextDetector::new();
        let claimed = ClaimedValues::new();
        let spans = detector.detect("Dirección: AV AMAZONAS N34-100, CASA 5", &claimed);
        let address = spans
            .iter()
            .find(|s| s.entity_type == EntityType::Direccion)
            .unwrap();
        assert!(!address.expand_variants);
    }

    #[test]
    fn institutional_capture_is_rejected() {
        let detector = HeaderContextDetector::new();
        let claimed = ClaimedValues::new();
        let text = "REPRESENTANTE LEGAL: ARCOTEL REPRESENTANTE LEGAL: MARIA FERNANDEZ LOPEZ";
        let spans = detector.detect(text, &claimed);
        assert!(spans.iter().all(|s| s.value != "ARCOTEL"));
    }
}
