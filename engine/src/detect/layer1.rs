//! Layer 1 — deterministic patterns (spec §4.3). Five entity-type patterns
//! applied to the whole document, plus the OCR digit-rejoin pre-pass.

use super::exceptions::is_exception;
use super::{ClaimedValues, Detector};
use crate::types::{DetectionLayer, EntityType, Span};
use once_cell::sync::Lazy;
use regex::Regex;

static OCR_DIGIT_GAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4,12})[ \t](\d{1,9})\b").unwrap());

static RUC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{13}\b").unwrap());
static CEDULA: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{10}\b").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}\b")
        .unwrap()
});
static TELEFONO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\+593[ \t]?)?0?[2-9]\d{6,7}(?:/\d{6,8})?\b").unwrap());
static DIRECCION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b([A-ZÁÉÍÓÚÑ][\wÀ-ÿ.]*(?:\s+[A-ZÁÉÍÓÚÑ0-9][\wÀ-ÿ.]*){1,4}),\s*(CASA|EDIFICIO|PISO|DEPARTAMENTO|LOCAL)\s*N?°?\.?\s*\d+",
    )
    .unwrap()
});

/// Rejoin OCR-split 10–13 digit identifiers (spec §4.3 pre-pass) by removing
/// the single interior whitespace character. Run once on the whole document
/// before any layer scans it; the joined text is what every layer and the
/// final substitution operate on.
pub fn rejoin_ocr_digits(text: &str) -> String {
    OCR_DIGIT_GAP
        .replace_all(text, |caps: &regex::Captures| {
            let joined_len = caps[1].len() + caps[2].len();
            if (10..=13).contains(&joined_len) {
                format!("{}{}", &caps[1], &caps[2])
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

pub struct RegexDetector;

impl RegexDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RegexDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn push_matches(
    text: &str,
    re: &Regex,
    entity_type: EntityType,
    claimed: &ClaimedValues,
    out: &mut Vec<Span>,
) {
    for m in re.find_iter(text) {
        let value = m.as_str().to_string();
        if is_exception(&value) || claimed.is_claimed(entity_type, &value) {
            continue;
        }
        out.push(Span {
            entity_type,
            value,
            start: m.start(),
            end: m.end(),
            layer: DetectionLayer::Regex,
            expand_variants: false,
        });
    }
}

impl Detector for RegexDetector {
    fn layer(&self) -> DetectionLayer {
        DetectionLayer::Regex
    }

    fn detect(&self, text: &str, already_claimed: &ClaimedValues) -> Vec<Span> {
        let mut out = Vec::new();
        push_matches(text, &RUC, EntityType::Ruc, already_claimed, &mut out);
        push_matches(text, &CEDULA, EntityType::Cedula, already_claimed, &mut out);
        push_matches(text, &EMAIL, EntityType::Email, already_claimed, &mut out);
        push_matches(
            text,
            &TELEFONO,
            EntityType::Telefono,
            already_claimed,
            &mut out,
        );

        for caps in DIRECCION.captures_iter(text) {
            let m = caps.get(0).unwrap();
            let value = m.as_str().to_string();
            if is_exception(&value) || already_claimed.is_claimed(EntityType::Direccion, &value) {
                continue;
            }
            out.push(Span {
                entity_type: EntityType::Direccion,
                value,
                start: m.start(),
                end: m.end(),
                layer: DetectionLayer::Regex,
                expand_variants: false,
            });
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejoins_ocr_split_ruc() {
        let joined = rejoin_ocr_digits("1724733066 001");
        assert_eq!(joined, "1724733066001");
    }

    #[test]
    fn does_not_rejoin_unrelated_digit_pairs() {
        // 4 + 3 = 7 digits total, outside the 10-13 window.
        let text = "piso 12 casa 345";
        assert_eq!(rejoin_ocr_digits(text), text);
    }

    #[test]
    fn detects_ruc_and_email() {
        let detector = RegexDetector::new();
        let claimed = ClaimedValues::new();
        let spans = detector.detect(
            "RUC: 1791234567001; contacto: ejemplo@correo.ec",
            &claimed,
        );
        assert!(spans
            .iter()
            .any(|s| s.entity_type == EntityType::Ruc && s.value == "1791234567001"));
        assert!(spans
            .iter()
            .any(|s| s.entity_type == EntityType::Email && s.value == "ejemplo@correo.ec"));
    }

    #[test]
    fn cedula_alone_is_detected_when_not_part_of_a_ruc() {
        let detector = RegexDetector::new();
        let claimed = ClaimedValues::new();
        let spans = detector.detect("cedula 1712345678 del titular", &claimed);
        assert!(spans
            .iter()
            .any(|s| s.entity_type == EntityType::Cedula && s.value == "1712345678"));
    }

    #[test]
    fn already_claimed_value_is_skipped() {
        let detector = RegexDetector::new();
        let mut claimed = ClaimedValues::new();
        claimed.claim(EntityType::Email, "ejemplo@correo.ec");
        let spans = detector.detect("contacto: ejemplo@correo.ec", &claimed);
        assert!(spans.is_empty());
    }

    #[test]
    fn institutional_value_is_never_emitted() {
        let detector = RegexDetector::new();
        let claimed = ClaimedValues::new();
        // ARCOTEL as an address-shaped match should still be filtered if it
        // ever matched; here we check a digit run belonging to an excepted
        // phrase is not special-cased (regex layers do not match text, so
        // this asserts the exception filter runs uniformly instead).
        let spans = detector.detect("Dirección: ARCOTEL, EDIFICIO Matriz N 10", &claimed);
        assert!(spans.iter().all(|s| s.value != "ARCOTEL, EDIFICIO Matriz N 10"));
    }
}
