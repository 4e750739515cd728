//! Institutional-name exception list (spec §8 property 6 "Exception
//! safety"). **[ADDED, supplemented from original_source/]** — spec.md's DP
//! section states the invariant but not the list; this is carried over from
//! `pseudonym-service/app/services/pseudonymization.py`'s `EXCEPCIONES` /
//! `FRASES_EXCLUIDAS`, the one revision of the original source this engine
//! is grounded on (see SPEC_FULL.md §9).

use once_cell::sync::Lazy;
use regex::Regex;

const EXACT: &[&str] = &[
    // Institutions
    "ARCOTEL", "CAFI", "CTDG", "CCON", "DEDA", "CTRP", "CADF",
    // Cities
    "QUITO", "GUAYAQUIL", "CUENCA", "AMBATO", "RIOBAMBA", "LOJA", "MACHALA",
    "PORTOVIEJO", "MANTA", "SANTO DOMINGO", "ESMERALDAS", "IBARRA",
    // Provinces
    "PICHINCHA", "GUAYAS", "AZUAY", "TUNGURAHUA", "CHIMBORAZO", "MANABÍ",
    "EL ORO", "IMBABURA",
    // Generic legal terms
    "LEY ORGÁNICA", "CÓDIGO ORGÁNICO", "REGLAMENTO", "ESTATUTO",
    "REGISTRO OFICIAL", "MINISTERIO", "SECRETARÍA",
    // Generic titles without a name
    "DIRECTOR EJECUTIVO", "DIRECTOR TÉCNICO", "COORDINADOR TÉCNICO",
    "PROFESIONAL FINANCIERO", "RESPONSABLE", "TITULAR",
    // Systems and document kinds
    "QUIPUX", "MEMORANDO", "OFICIO", "INFORME", "RESOLUCIÓN",
    "SISTEMA DE GESTIÓN DOCUMENTAL",
];

const PHRASES: &[&str] = &[
    "LEY ORGÁNICA DE TELECOMUNICACIONES",
    "CÓDIGO ORGÁNICO ADMINISTRATIVO",
    "REGISTRO OFICIAL",
    "ESTATUTO ORGÁNICO DE GESTIÓN",
    "AGENCIA DE REGULACIÓN Y CONTROL",
    "DIRECCIÓN TÉCNICA DE GESTIÓN ECONÓMICA",
    "COORDINACIÓN TÉCNICA DE TÍTULOS HABILITANTES",
    "PROCEDIMIENTO ADMINISTRATIVO SANCIONADOR",
    "SISTEMA DE GESTIÓN DOCUMENTAL",
    "NORMATIVA LEGAL VIGENTE",
    "REGISTRO PÚBLICO DE TELECOMUNICACIONES",
    "UNIDAD DE DOCUMENTACIÓN Y ARCHIVO",
    "GARANTÍA DE FIEL CUMPLIMIENTO",
    "TÍTULOS HABILITANTES",
    "ESPECTRO RADIOELÉCTRICO",
];

// Mixed case on purpose: `pseudonymization.py`'s `palabras_institucionales`
// check is `if palabra in text_clean` against the original (un-uppercased)
// text, so a keyword only hits its own casing. Uppercasing both sides before
// `contains`, as this module used to, wrongly exempted surnames like
// "Oakley" or "Valley" whose uppercase form contains "LEY".
const KEYWORDS: &[&str] = &[
    "ARCOTEL", "Dirección", "Coordinación", "Unidad", "Reglamento", "Ley",
    "Código", "Estatuto", "Ministerio", "Secretaría", "Agencia",
];

static KEYWORD_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    KEYWORDS
        .iter()
        .map(|k| Regex::new(&format!(r"\b{}\b", regex::escape(k))).expect("static keyword pattern"))
        .collect()
});

/// Whether `value` is a known institutional exception that must never be
/// tokenised, regardless of which layer detected it.
pub fn is_exception(value: &str) -> bool {
    let trimmed = value.trim();
    let upper = trimmed.to_uppercase();

    if EXACT.iter().any(|e| e.eq_ignore_ascii_case(&upper)) {
        return true;
    }

    if PHRASES.iter().any(|p| upper.contains(&p.to_uppercase())) {
        return true;
    }

    KEYWORD_PATTERNS.iter().any(|re| re.is_match(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_institution_is_exempt() {
        assert!(is_exception("ARCOTEL"));
        assert!(is_exception("arcotel"));
    }

    #[test]
    fn city_alone_is_exempt() {
        assert!(is_exception("QUITO"));
    }

    #[test]
    fn phrase_containing_institution_is_exempt() {
        assert!(is_exception("Ley Orgánica de Telecomunicaciones del Ecuador"));
    }

    #[test]
    fn real_name_is_not_exempt() {
        assert!(!is_exception("Adrián Alexander Santos"));
    }

    #[test]
    fn keyword_hit_inside_longer_phrase_is_exempt() {
        assert!(is_exception("ARCOTEL notifica al prestador"));
    }

    #[test]
    fn surname_uppercasing_into_a_keyword_is_not_exempt() {
        assert!(!is_exception("Oakley Martinez Solis"));
        assert!(!is_exception("OAKLEY MARTINEZ SOLIS"));
        assert!(!is_exception("Valley Restrepo Diaz"));
    }
}
