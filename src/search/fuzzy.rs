use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder, DFA};

/// Levenshtein matcher over dictionary terms. Transpositions count as
/// one edit.
pub struct FuzzyMatcher {
    dfa: DFA,
}

impl FuzzyMatcher {
    pub fn new(term: &str, max_edits: u8) -> FuzzyMatcher {
        let builder = LevenshteinAutomatonBuilder::new(max_edits, true);
        FuzzyMatcher {
            dfa: builder.build_dfa(term),
        }
    }

    /// Run the automaton over a candidate term's bytes.
    pub fn matches(&self, candidate: &[u8]) -> bool {
        let mut state = self.dfa.initial_state();
        for &byte in candidate {
            state = self.dfa.transition(state, byte);
        }
        matches!(self.dfa.distance(state), Distance::Exact(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_edit_matches() {
        let matcher = FuzzyMatcher::new("fox", 1);
        assert!(matcher.matches(b"fox"));
        assert!(matcher.matches(b"fix"));
        assert!(matcher.matches(b"foxy"));
        assert!(matcher.matches(b"ox"));
        assert!(!matcher.matches(b"fizz"));
    }

    #[test]
    fn test_transposition_is_one_edit() {
        let matcher = FuzzyMatcher::new("quick", 1);
        assert!(matcher.matches(b"qiuck"));
    }

    #[test]
    fn test_zero_edits_is_exact() {
        let matcher = FuzzyMatcher::new("fox", 0);
        assert!(matcher.matches(b"fox"));
        assert!(!matcher.matches(b"fix"));
    }
}
