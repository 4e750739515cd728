//! Detection Pipeline (spec §4.3) — four ordered layers, each a variant of
//! one `Detector` interface rather than a subclass of a base detector (Design
//! Notes, §9: "a pipeline of detectors... not subclasses of a base
//! detector").

pub mod exceptions;
pub mod layer1;
pub mod layer15;
pub mod layer2;
pub mod layer3;
pub mod ner;
pub mod variants;

use crate::types::{DetectionLayer, EntityType, Span};
use std::collections::HashSet;

/// Real values already bound earlier in this call (or an earlier call on the
/// same session), so later layers skip them instead of re-claiming a
/// substring an earlier layer already owns (spec §4.3 "Deduplication
/// contract").
#[derive(Debug, Default)]
pub struct ClaimedValues {
    case_sensitive: HashSet<String>,
    case_insensitive: HashSet<String>,
}

impl ClaimedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, entity_type: EntityType, value: &str) {
        if entity_type.case_insensitive() {
            self.case_insensitive.insert(value.to_uppercase());
        } else {
            self.case_sensitive.insert(value.to_string());
        }
    }

    pub fn is_claimed(&self, entity_type: EntityType, value: &str) -> bool {
        if entity_type.case_insensitive() {
            self.case_insensitive.contains(&value.to_uppercase())
        } else {
            self.case_sensitive.contains(value)
        }
    }
}

/// Common interface every layer implements (spec §9's `detect(text,
/// already_claimed) -> spans`). A `Vec<Box<dyn Detector>>` run in fixed
/// order is the whole pipeline — there is no shared base type beyond this
/// trait.
pub trait Detector: Send + Sync {
    fn layer(&self) -> DetectionLayer;
    fn detect(&self, text: &str, already_claimed: &ClaimedValues) -> Vec<Span>;

    /// Whether this layer's backing model was unavailable on the call just
    /// made to `detect` (spec §7: a skipped layer must mark the result
    /// `degraded`, never pass text through as if the layer found nothing).
    /// Most layers have no backing model and are always available.
    fn backend_unavailable(&self) -> bool {
        false
    }
}

/// Assemble the fixed-order pipeline: Layer 1 -> 1.5 -> 2 -> 3 (spec §5
/// "Ordering guarantees"). `ner_backend` is injected so the default
/// heuristic backend and the optional remote backend are interchangeable
/// without changing this function.
pub fn build_pipeline(ner_backend: std::sync::Arc<dyn ner::NerBackend>) -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(layer1::RegexDetector::new()),
        Box::new(layer15::HeaderContextDetector::new()),
        Box::new(layer2::NerDetector::new(ner_backend)),
        Box::new(layer3::SignatureBlockDetector::new()),
    ]
}
