//! Closed data model shared by every layer of the engine (spec §3).

use serde::{Deserialize, Serialize};

/// The closed set of personal-data entity types this engine recognises.
/// Part of the external wire contract — do not add variants without
/// updating the token-prefix table in §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Ruc,
    Cedula,
    Email,
    Telefono,
    Direccion,
    Nombre,
}

impl EntityType {
    /// The wire prefix used in minted tokens (`<PREFIX>_<HEX8>`).
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityType::Ruc => "RUC",
            EntityType::Cedula => "CEDULA",
            EntityType::Email => "EMAIL",
            EntityType::Telefono => "TELEFONO",
            EntityType::Direccion => "DIRECCION",
            EntityType::Nombre => "NOMBRE",
        }
    }

    /// Whether real-value comparisons for this type are case-insensitive.
    /// Name-class types fold case; identifier-class types do not (spec
    /// §4.3 "Deduplication contract across layers").
    pub fn case_insensitive(&self) -> bool {
        matches!(self, EntityType::Nombre | EntityType::Direccion)
    }
}

/// The four ordered detector layers (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionLayer {
    Regex,
    HeaderContext,
    Ner,
    SignatureBlock,
}

/// A single detected span — the tagged record the Design Notes (§9) ask for
/// in place of a loose `{type, value}` map, so the compiler enforces the
/// closed `EntityType` set at every call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub entity_type: EntityType,
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub layer: DetectionLayer,
    /// Name-class spans are variant-expanded before substitution (§4.3);
    /// identifier and address spans are substituted literally.
    pub expand_variants: bool,
}

/// Per-call detection/substitution counters returned alongside the
/// tokenised text (spec §4.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub regex_detections: usize,
    pub header_detections: usize,
    pub ner_detections: usize,
    pub signature_detections: usize,
    pub total_substitutions: usize,
    pub total_unique: usize,
    /// Tokens encountered during depseudonymize with no reverse binding.
    #[serde(default)]
    pub missing: Vec<String>,
    /// Set when a detector layer could not run (e.g. its NER backend was
    /// unavailable) and was skipped rather than silently passed through.
    #[serde(default)]
    pub degraded: bool,
}
