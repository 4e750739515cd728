//! Pluggable statistical-NER backend (spec §9: "prefer an interface
//! abstraction over a single provider"). The engine never hard-depends on a
//! specific model; `HeuristicNerBackend` is always available and is what
//! ships by default, `RemoteNerBackend` (service crate, `remote-ner`
//! feature) is the swappable alternative the Design Notes call out.

use once_cell::sync::Lazy;
use regex::Regex;

/// A candidate PER span emitted by a backend, before the Layer 2 rejection
/// filter runs over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonCandidate {
    pub value: String,
    pub start: usize,
    pub end: usize,
}

/// Whether the backend is ready to serve `recognize`. A backend that is
/// momentarily unavailable (model not loaded, remote endpoint down) should
/// report `false` here so the caller can mark the run `degraded` instead of
/// silently passing text through untokenised (spec §7).
pub trait NerBackend: Send + Sync {
    fn is_available(&self) -> bool;
    fn recognize(&self, text: &str) -> Vec<PersonCandidate>;
}

/// Acronyms and institution codes exempt from the uppercase-run ->
/// title-case normalisation pass (spec §4.3), since folding them would turn
/// e.g. `ARCOTEL` into `Arcotel` and make it look like a candidate name.
const ACRONYM_WHITELIST: &[&str] = &[
    "ARCOTEL", "RUC", "IVA", "ONU", "OEA", "UIT", "CNT", "UAF", "SRI", "IESS",
    "SUPERTEL", "CONATEL", "CCAAMERT", "SENESCYT",
];

static UPPER_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\p{Lu}{3,}\b").unwrap());

/// Convert long all-uppercase tokens to title case, except whitelisted
/// acronyms, so the capitalisation-pattern heuristic below (and any model
/// backend) doesn't see an entire document as one giant candidate (spec
/// §4.3: uppercase documents degrade statistical models 40-50 points).
pub fn normalise_case(text: &str) -> String {
    UPPER_WORD
        .replace_all(text, |caps: &regex::Captures| {
            let word = &caps[0];
            if ACRONYM_WHITELIST.iter().any(|a| a.eq_ignore_ascii_case(word)) {
                word.to_string()
            } else {
                title_case(word)
            }
        })
        .into_owned()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
        }
        None => String::new(),
    }
}

fn is_capitalized_token(word: &str) -> bool {
    word.chars()
        .next()
        .map(|c| c.is_uppercase())
        .unwrap_or(false)
        && word.chars().skip(1).all(|c| c.is_lowercase() || c == '.')
}

/// Rule-based stand-in for a real statistical model: runs of 2–5
/// consecutive capitalised tokens are candidate person names. Always
/// available (no model to load), which is exactly why it is the default.
#[derive(Default)]
pub struct HeuristicNerBackend;

impl HeuristicNerBackend {
    pub fn new() -> Self {
        Self
    }
}

impl NerBackend for HeuristicNerBackend {
    fn is_available(&self) -> bool {
        true
    }

    fn recognize(&self, text: &str) -> Vec<PersonCandidate> {
        let normalised = normalise_case(text);
        let mut out = Vec::new();
        let mut run: Vec<(usize, usize, &str)> = Vec::new();

        let flush = |run: &mut Vec<(usize, usize, &str)>, out: &mut Vec<PersonCandidate>| {
            if (2..=5).contains(&run.len()) {
                let start = run.first().unwrap().0;
                let end = run.last().unwrap().1;
                let value = run.iter().map(|(_, _, w)| *w).collect::<Vec<_>>().join(" ");
                out.push(PersonCandidate { value, start, end });
            }
            run.clear();
        };

        for m in normalised.split_word_bounds_indices() {
            let (idx, word) = m;
            if word.trim().is_empty() {
                continue;
            }
            if is_capitalized_token(word) {
                run.push((idx, idx + word.len(), word));
            } else {
                flush(&mut run, &mut out);
            }
        }
        flush(&mut run, &mut out);

        out
    }
}

/// Tiny word-boundary splitter so this module does not need the
/// `unicode-segmentation` crate for a heuristic that only needs
/// whitespace/punctuation boundaries.
trait SplitWordBoundsIndices {
    fn split_word_bounds_indices(&self) -> Vec<(usize, &str)>;
}

impl SplitWordBoundsIndices for str {
    fn split_word_bounds_indices(&self) -> Vec<(usize, &str)> {
        let mut out = Vec::new();
        let mut start = None;
        for (i, c) in self.char_indices() {
            let is_word_char = c.is_alphanumeric() || c == '.';
            match (is_word_char, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    out.push((s, &self[s..i]));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            out.push((s, &self[s..]));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acronym_is_preserved() {
        let out = normalise_case("ARCOTEL NOTIFICA AL PRESTADOR");
        assert!(out.starts_with("ARCOTEL"));
        assert!(out.contains("Notifica"));
    }

    #[test]
    fn two_to_five_token_capitalized_runs_are_candidates() {
        let backend = HeuristicNerBackend::new();
        let candidates = backend.recognize("Adrian Alexander Santos firmo el documento");
        assert!(candidates.iter().any(|c| c.value == "Adrian Alexander Santos"));
    }

    #[test]
    fn single_capitalized_token_is_not_a_candidate() {
        let backend = HeuristicNerBackend::new();
        let candidates = backend.recognize("El Ministerio informa");
        assert!(!candidates.iter().any(|c| c.value == "El"));
    }

    #[test]
    fn run_longer_than_five_tokens_is_dropped() {
        let backend = HeuristicNerBackend::new();
        let candidates =
            backend.recognize("Uno Dos Tres Cuatro Cinco Seis Siete firmo el documento");
        assert!(candidates.is_empty());
    }
}
