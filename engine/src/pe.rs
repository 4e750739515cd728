//! Pseudonymisation Engine (spec §4.4) — stateless orchestrator wiring KS,
//! SC and the detection pipeline together. No mutable global state lives
//! here (§9); everything the engine needs is either injected at
//! construction or passed in on each call, so `Engine` is `Clone` and every
//! session can be processed concurrently.

use crate::cg::ConsentGate;
use crate::detect::{self, exceptions::is_exception, layer1, ner::NerBackend, ClaimedValues, Detector};
use crate::error::{EngineError, Result};
use crate::ks::KeyService;
use crate::sc::{forward_key, reverse_key, SessionCache};
use crate::token::Token;
use crate::types::{DetectionLayer, EntityType, Span, Stats};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Tunables that are not part of any single component's trait (spec §5, §6
/// env table); the service binary builds this from its environment config,
/// `Default` gives sane values for engine-only tests.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_text_bytes: usize,
    pub binding_ttl: Duration,
    pub ks_timeout: Duration,
    pub sc_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_text_bytes: 100 * 1024,
            binding_ttl: Duration::from_secs(4 * 3600),
            ks_timeout: Duration::from_secs(10),
            sc_timeout: Duration::from_secs(5),
        }
    }
}

/// Token -> original real value, one entry per distinct token minted or
/// reused during a `pseudonymize` call (spec §4.4).
pub type Mapping = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct PseudonymizeOutput {
    pub tokenised_text: String,
    pub session_id: String,
    pub mapping: Mapping,
    pub stats: Stats,
}

#[derive(Clone)]
pub struct Engine {
    ks: Arc<dyn KeyService>,
    sc: Arc<dyn SessionCache>,
    pipeline: Arc<Vec<Box<dyn Detector>>>,
    config: EngineConfig,
    consent_gate: ConsentGate,
}

impl Engine {
    pub fn new(
        ks: Arc<dyn KeyService>,
        sc: Arc<dyn SessionCache>,
        ner_backend: Arc<dyn NerBackend>,
        config: EngineConfig,
    ) -> Self {
        Self {
            ks,
            sc,
            pipeline: Arc::new(detect::build_pipeline(ner_backend)),
            config,
            consent_gate: ConsentGate::new(),
        }
    }

    pub fn consent_gate(&self) -> &ConsentGate {
        &self.consent_gate
    }

    /// spec §4.4. Calling twice with identical `text` and `session_id`
    /// yields byte-identical `tokenised_text` and mints no new bindings,
    /// since every real value already bound is found in the forward cache
    /// before a new token is drawn.
    pub async fn pseudonymize(
        &self,
        text: &str,
        session_id: Option<String>,
    ) -> Result<PseudonymizeOutput> {
        if text.len() > self.config.max_text_bytes {
            return Err(EngineError::InputTooLarge {
                len: text.len(),
                max: self.config.max_text_bytes,
            });
        }

        let session_id = session_id.unwrap_or_else(new_session_id);
        let normalised = layer1::rejoin_ocr_digits(text);

        let mut working_text = normalised.clone();
        let mut claimed = ClaimedValues::new();
        let mut mapping = Mapping::new();
        let mut stats = Stats::default();
        let mut undo_keys: Vec<String> = Vec::new();

        for detector in self.pipeline.iter() {
            let layer = detector.layer();
            let spans = detector.detect(&normalised, &claimed);
            count_layer(&mut stats, layer, spans.len());

            if detector.backend_unavailable() {
                stats.degraded = true;
                warn!(
                    error = %EngineError::DetectorModelUnavailable(format!("{layer:?}")),
                    "detector backend unavailable; layer skipped, result marked degraded"
                );
            }

            for span in spans {
                if let Err(err) = self
                    .apply_span(
                        &session_id,
                        &span,
                        &mut working_text,
                        &mut mapping,
                        &mut stats,
                        &mut undo_keys,
                    )
                    .await
                {
                    self.rollback(&undo_keys).await;
                    return Err(err);
                }
                claimed.claim(span.entity_type, &span.value);
            }
        }

        stats.total_unique = mapping.len();

        Ok(PseudonymizeOutput {
            tokenised_text: working_text,
            session_id,
            mapping,
            stats,
        })
    }

    async fn apply_span(
        &self,
        session_id: &str,
        span: &Span,
        working_text: &mut String,
        mapping: &mut Mapping,
        stats: &mut Stats,
        undo_keys: &mut Vec<String>,
    ) -> Result<()> {
        if is_exception(&span.value) {
            return Ok(());
        }

        let variants = variants_for(span);

        // A prior span in this same layer's candidate list may already have
        // been substituted across the whole text (one of its own variants
        // happened to match this span's textual form). If nothing is left
        // to replace, minting a token here would only orphan a binding no
        // token in the output ever points to.
        if variants.iter().all(|v| count_matches(working_text, v, span.entity_type) == 0) {
            return Ok(());
        }

        // One token per real value, regardless of how many textual variants
        // it expands into — every variant below is a re-occurrence of the
        // same entity and must resolve to the same token (spec §4.3
        // "Deduplication contract").
        let cache_key = forward_key(
            session_id,
            span.entity_type.prefix(),
            &canonical(span.entity_type, &span.value),
        );

        let token = match self.sc_get(&cache_key).await? {
            Some(token) => token,
            None => {
                let token = self
                    .mint_binding(session_id, span.entity_type, &span.value, undo_keys)
                    .await?;
                self.sc_set(&cache_key, &token).await?;
                // The forward binding just written must unwind alongside its
                // reverse binding on a later abort in this same call, or a
                // real value stays "seen" in the forward cache with no
                // reverse key left to resolve its token back (spec §4.4).
                undo_keys.push(cache_key.clone());
                token
            }
        };

        for variant in &variants {
            let replaced = substitute(working_text, variant, span.entity_type, &token);
            stats.total_substitutions += replaced;
        }
        mapping.insert(token, span.value.clone());

        Ok(())
    }

    /// spec §4.4 atomicity: draw token, encrypt, write reverse, write
    /// forward — in that order, never forward-before-reverse. The undo list
    /// is used by the caller to roll back every key written so far in this
    /// call (reverse here, forward by the caller) if a later step fails.
    async fn mint_binding(
        &self,
        session_id: &str,
        entity_type: EntityType,
        real_value: &str,
        undo_keys: &mut Vec<String>,
    ) -> Result<String> {
        let mut rng = rand::thread_rng();
        let mut token = Token::mint(entity_type.prefix(), &mut rng);
        let mut reverse_key_str = reverse_key(session_id, token.as_str());

        // Re-draw on the rare collision with an existing reverse binding in
        // this session (spec §4.4 "Token minting").
        while self.sc_get(&reverse_key_str).await?.is_some() {
            token = Token::mint(entity_type.prefix(), &mut rng);
            reverse_key_str = reverse_key(session_id, token.as_str());
        }

        let encrypted = tokio::time::timeout(self.config.ks_timeout, self.ks.encrypt(real_value.as_bytes()))
            .await
            .map_err(|_| EngineError::KeyUnavailable("encrypt timed out".into()))??;

        self.sc_set(&reverse_key_str, &encrypted).await?;
        undo_keys.push(reverse_key_str);

        Ok(token.as_str().to_string())
    }

    /// Deletes every forward and reverse key written earlier in an aborted
    /// call, so a mid-call failure never leaves a "seen" real value bound to
    /// a token with no way back (spec §4.4).
    async fn rollback(&self, undo_keys: &[String]) {
        for key in undo_keys {
            if let Err(e) = self.sc.delete_pattern(key).await {
                warn!(error = %e, key, "failed to roll back binding after aborted mint");
            }
        }
    }

    async fn sc_get(&self, key: &str) -> Result<Option<String>> {
        tokio::time::timeout(self.config.sc_timeout, self.sc.get(key))
            .await
            .map_err(|_| EngineError::BindingFailed("cache get timed out".into()))?
    }

    async fn sc_set(&self, key: &str, value: &str) -> Result<()> {
        tokio::time::timeout(
            self.config.sc_timeout,
            self.sc.set(key, value, self.config.binding_ttl),
        )
        .await
        .map_err(|_| EngineError::BindingFailed("cache set timed out".into()))?
    }

    /// spec §4.4. Unknown tokens are left verbatim; a token whose reverse
    /// binding cannot be resolved is also left verbatim and reported in
    /// `stats.missing`, never treated as a fatal error for the whole call.
    pub async fn depseudonymize(&self, text: &str, session_id: &str) -> Result<(String, Stats)> {
        let mut stats = Stats::default();
        let mut out = String::with_capacity(text.len());
        let mut last_end = 0;

        for m in crate::token::TOKEN_RE.find_iter(text) {
            out.push_str(&text[last_end..m.start()]);
            let token_str = m.as_str();

            match self.resolve_token(session_id, token_str).await {
                Ok(Some(real_value)) => out.push_str(&real_value),
                Ok(None) => {
                    stats.missing.push(token_str.to_string());
                    out.push_str(token_str);
                }
                Err(EngineError::InvalidCiphertext) | Err(EngineError::BindingNotFound(_)) => {
                    stats.missing.push(token_str.to_string());
                    out.push_str(token_str);
                }
                Err(e) => return Err(e),
            }

            last_end = m.end();
        }
        out.push_str(&text[last_end..]);

        Ok((out, stats))
    }

    async fn resolve_token(&self, session_id: &str, token_str: &str) -> Result<Option<String>> {
        let key = reverse_key(session_id, token_str);
        let encrypted = match self.sc_get(&key).await? {
            Some(v) => v,
            None => return Ok(None),
        };

        let plaintext = tokio::time::timeout(self.config.ks_timeout, self.ks.decrypt(&encrypted))
            .await
            .map_err(|_| EngineError::KeyUnavailable("decrypt timed out".into()))??;

        String::from_utf8(plaintext)
            .map(Some)
            .map_err(|_| EngineError::InvalidCiphertext)
    }

    /// spec §4.4 `destroy`: atomically remove every binding under the
    /// session. Future reverse calls on tokens from a destroyed session
    /// return the text unchanged (they fall into the `missing` branch
    /// above).
    pub async fn destroy(&self, session_id: &str) -> Result<u64> {
        let prefix = format!("{session_id}:");
        tokio::time::timeout(self.config.sc_timeout, self.sc.delete_pattern(&prefix))
            .await
            .map_err(|_| EngineError::BindingFailed("session destroy timed out".into()))?
    }
}

fn new_session_id() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("sess_{}", bytes.iter().map(|b| format!("{:02x}", b)).collect::<String>())
}

fn count_layer(stats: &mut Stats, layer: DetectionLayer, n: usize) {
    match layer {
        DetectionLayer::Regex => stats.regex_detections += n,
        DetectionLayer::HeaderContext => stats.header_detections += n,
        DetectionLayer::Ner => stats.ner_detections += n,
        DetectionLayer::SignatureBlock => stats.signature_detections += n,
    }
}

/// Canonical key for the forward-cache lookup: case-folded for name-class
/// types, verbatim for identifier-class types (spec §4.3 "Deduplication
/// contract").
fn canonical(entity_type: EntityType, value: &str) -> String {
    if entity_type.case_insensitive() {
        value.to_uppercase()
    } else {
        value.to_string()
    }
}

/// The variant set to substitute for one span, in **descending length
/// order** (spec §4.4) so a full name consumes text before a shorter
/// variant like a bare surname would claim the same bytes.
fn variants_for(span: &Span) -> Vec<String> {
    let mut vs = if span.expand_variants {
        match span.layer {
            DetectionLayer::HeaderContext => crate::detect::layer15::expand_name(span),
            DetectionLayer::Ner => crate::detect::layer2::expand_name(span),
            _ => vec![span.value.clone()],
        }
    } else {
        vec![span.value.clone()]
    };
    vs.sort_by_key(|v| std::cmp::Reverse(v.len()));
    vs
}

/// spec §4.4 substitution algorithm: escape, bridge literal spaces with
/// `\s+` so line-broken occurrences match, wrap with word boundaries,
/// case-insensitive for names, case-sensitive for identifiers.
fn value_pattern(real_value: &str, entity_type: EntityType) -> String {
    let escaped = regex::escape(real_value).replace(' ', r"\s+");
    if entity_type.case_insensitive() {
        format!(r"(?i)\b{escaped}\b")
    } else {
        format!(r"\b{escaped}\b")
    }
}

/// How many live occurrences of `real_value` remain in `working_text`,
/// without touching it. Used to tell a span whose text an earlier span in
/// the same pass already substituted away from one still worth minting for.
fn count_matches(working_text: &str, real_value: &str, entity_type: EntityType) -> usize {
    match Regex::new(&value_pattern(real_value, entity_type)) {
        Ok(re) => re.find_iter(working_text).count(),
        Err(e) => {
            debug!(error = %e, real_value, "skipping unbuildable substitution pattern");
            0
        }
    }
}

fn substitute(working_text: &mut String, real_value: &str, entity_type: EntityType, token: &str) -> usize {
    let re = match Regex::new(&value_pattern(real_value, entity_type)) {
        Ok(re) => re,
        Err(e) => {
            debug!(error = %e, real_value, "skipping unbuildable substitution pattern");
            return 0;
        }
    };

    let count = re.find_iter(working_text).count();
    if count > 0 {
        *working_text = re.replace_all(working_text, token).into_owned();
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ner::{HeuristicNerBackend, NerBackend, PersonCandidate};
    use crate::ks::InMemoryKeyService;
    use crate::sc::InMemorySessionCache;

    struct UnavailableBackend;

    impl NerBackend for UnavailableBackend {
        fn is_available(&self) -> bool {
            false
        }
        fn recognize(&self, _text: &str) -> Vec<PersonCandidate> {
            Vec::new()
        }
    }

    fn test_engine() -> Engine {
        Engine::new(
            Arc::new(InMemoryKeyService::new()),
            Arc::new(InMemorySessionCache::new()),
            Arc::new(HeuristicNerBackend::new()),
            EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn pseudonymize_then_depseudonymize_round_trips() {
        let engine = test_engine();
        let text = "RUC: 1791234567001; contacto: ejemplo@correo.ec";
        let out = engine.pseudonymize(text, None).await.unwrap();

        assert!(out.tokenised_text.contains("RUC_"));
        assert!(out.tokenised_text.contains("EMAIL_"));
        assert!(!out.tokenised_text.contains("1791234567001"));
        assert!(!out.tokenised_text.contains("ejemplo@correo.ec"));

        let (restored, stats) = engine
            .depseudonymize(&out.tokenised_text, &out.session_id)
            .await
            .unwrap();
        assert_eq!(restored, text);
        assert!(stats.missing.is_empty());
    }

    #[tokio::test]
    async fn identical_call_twice_mints_no_new_bindings() {
        let engine = test_engine();
        let text = "cedula 1712345678 del titular";
        let first = engine.pseudonymize(text, None).await.unwrap();
        let second = engine
            .pseudonymize(text, Some(first.session_id.clone()))
            .await
            .unwrap();

        assert_eq!(first.tokenised_text, second.tokenised_text);
        assert_eq!(first.mapping.len(), second.mapping.len());
    }

    #[tokio::test]
    async fn destroyed_session_tokens_are_reported_missing() {
        let engine = test_engine();
        let text = "contacto: ejemplo@correo.ec";
        let out = engine.pseudonymize(text, None).await.unwrap();
        engine.destroy(&out.session_id).await.unwrap();

        let (restored, stats) = engine
            .depseudonymize(&out.tokenised_text, &out.session_id)
            .await
            .unwrap();
        assert_eq!(restored, out.tokenised_text);
        assert_eq!(stats.missing.len(), 1);
    }

    #[tokio::test]
    async fn unknown_token_in_text_is_left_verbatim() {
        let engine = test_engine();
        let (restored, stats) = engine
            .depseudonymize("see RUC_DEADBEEF for reference", "sess_none")
            .await
            .unwrap();
        assert_eq!(restored, "see RUC_DEADBEEF for reference");
        assert_eq!(stats.missing, vec!["RUC_DEADBEEF".to_string()]);
    }

    #[tokio::test]
    async fn oversized_input_is_rejected() {
        let engine = test_engine();
        let big = "a".repeat(200 * 1024);
        let err = engine.pseudonymize(&big, None).await.unwrap_err();
        assert!(matches!(err, EngineError::InputTooLarge { .. }));
    }

    #[tokio::test]
    async fn institutional_exception_is_never_tokenised() {
        let engine = test_engine();
        let text = "ARCOTEL notifica al prestador del servicio";
        let out = engine.pseudonymize(text, None).await.unwrap();
        assert!(out.tokenised_text.contains("ARCOTEL"));
    }

    #[tokio::test]
    async fn unavailable_ner_backend_marks_result_degraded() {
        let engine = Engine::new(
            Arc::new(InMemoryKeyService::new()),
            Arc::new(InMemorySessionCache::new()),
            Arc::new(UnavailableBackend),
            EngineConfig::default(),
        );
        let text = "RUC: 1791234567001; Ing. Patricio Navas Vega";
        let out = engine.pseudonymize(text, None).await.unwrap();

        assert!(out.stats.degraded);
        assert_eq!(out.stats.ner_detections, 0);
        // Layer 1 still ran; the degradation is scoped to the NER layer.
        assert!(out.tokenised_text.contains("RUC_"));
    }
}
