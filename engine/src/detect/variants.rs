//! Variant expansion — the single pure function the Design Notes (§9) ask
//! for, kept separate from every layer that calls it so the 2/3/4+-token
//! split rules live in exactly one place (spec §4.3).

/// Expand a captured name into the family of re-orderings and partial forms
/// that might occur elsewhere in the same document, in the order the rules
/// list them. Dedups preserving first-seen order; drops anything shorter
/// than 5 characters. The original string is always the first entry unless
/// it itself is too short.
pub fn expand(name: &str) -> Vec<String> {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    let mut out: Vec<String> = Vec::new();

    match tokens.len() {
        n if n >= 4 => {
            // First two tokens = surnames, remainder = given names.
            let surnames = &tokens[0..2];
            let given = &tokens[2..];
            let surnames_joined = surnames.join(" ");
            let given_joined = given.join(" ");

            out.push(tokens.join(" ")); // original
            out.push(format!("{given_joined} {surnames_joined}")); // swapped
            out.push(surnames_joined.clone()); // surnames only
            out.push(given_joined.clone()); // given names only
            out.push(surnames[0].to_string()); // first surname alone
            out.push(given[0].to_string()); // first given name alone
        }
        3 => {
            // 2+1 split
            out.push(tokens.join(" "));
            out.push(format!("{} {}", tokens[0], tokens[1]));
            out.push(tokens[2].to_string());
            // 1+2 split
            out.push(format!("{} {}", tokens[1], tokens[2]));
            out.push(tokens[0].to_string());
        }
        2 => {
            out.push(format!("{} {}", tokens[0], tokens[1]));
            out.push(format!("{} {}", tokens[1], tokens[0]));
        }
        _ => {
            out.push(tokens.join(" "));
        }
    }

    let mut seen = std::collections::HashSet::new();
    out.into_iter()
        .filter(|v| v.len() >= 5)
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_plus_tokens_emits_all_six_forms() {
        let v = expand("SANTOS ORELLANA ADRIAN ALEXANDER");
        assert!(v.contains(&"SANTOS ORELLANA ADRIAN ALEXANDER".to_string()));
        assert!(v.contains(&"ADRIAN ALEXANDER SANTOS ORELLANA".to_string()));
        assert!(v.contains(&"SANTOS ORELLANA".to_string()));
        assert!(v.contains(&"ADRIAN ALEXANDER".to_string()));
        assert!(v.contains(&"SANTOS".to_string()));
        assert!(v.contains(&"ADRIAN".to_string()));
    }

    #[test]
    fn three_tokens_emits_both_splits() {
        let v = expand("PEREZ JUAN CARLOS");
        assert!(v.contains(&"PEREZ JUAN".to_string()));
        assert!(v.contains(&"JUAN CARLOS".to_string()));
    }

    #[test]
    fn two_tokens_emits_both_orderings() {
        let v = expand("JUAN PEREZ");
        assert_eq!(v, vec!["JUAN PEREZ".to_string(), "PEREZ JUAN".to_string()]);
    }

    #[test]
    fn short_variants_are_dropped() {
        // "ANA" alone (3 chars) must never appear even if generated.
        let v = expand("ANA MARIA LOPEZ PEREZ");
        assert!(v.iter().all(|s| s.len() >= 5));
    }

    #[test]
    fn dedup_preserves_first_seen_order() {
        let v = expand("LOPEZ LOPEZ");
        // Both orderings are identical here; must appear once.
        assert_eq!(v, vec!["LOPEZ LOPEZ".to_string()]);
    }
}
