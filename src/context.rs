//! Greedy context-window assembly under a character budget.

/// Separator inserted between included texts at join time.
const JOIN_SEPARATOR: &str = "\n\n";

/// Packs ranked texts into a character budget, strictly in rank order.
///
/// A candidate is included only while `included_chars + candidate_chars`
/// stays within `max_chars`, where `included_chars` counts the raw characters
/// of already-included texts. The first candidate that fails the check stops
/// assembly; later, shorter candidates are never considered. The join
/// separator is deliberately not counted toward the pre-check, so the
/// returned string can exceed `max_chars` by up to two characters per
/// included text. Returns the joined context, possibly empty.
pub fn assemble(ranked_texts: &[String], max_chars: usize) -> String {
    let mut included: Vec<&str> = Vec::new();
    let mut included_chars = 0usize;

    for text in ranked_texts {
        let candidate_chars = text.chars().count();
        if included_chars + candidate_chars > max_chars {
            break;
        }
        included_chars += candidate_chars;
        included.push(text);
    }

    included.join(JOIN_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_input_assembles_empty_context() {
        assert_eq!(assemble(&[], 2000), "");
    }

    #[test]
    fn everything_fits_when_budget_is_large() {
        let ranked = texts(&["alpha", "beta", "gamma"]);
        assert_eq!(assemble(&ranked, 2000), "alpha\n\nbeta\n\ngamma");
    }

    #[test]
    fn first_oversized_candidate_yields_empty_context() {
        let ranked = texts(&["this text is far too long for the budget"]);
        assert_eq!(assemble(&ranked, 10), "");
    }

    #[test]
    fn assembly_stops_at_first_failing_candidate() {
        // The third text would fit within the leftover budget, but assembly
        // never skips ahead past a failing candidate.
        let ranked = texts(&["aaaa", "cccccc", "bb"]);
        assert_eq!(assemble(&ranked, 8), "aaaa");
    }

    #[test]
    fn separator_is_not_counted_toward_the_budget() {
        // 4 + 4 raw characters fit an 8-character budget even though the
        // joined string is 10 characters long.
        let ranked = texts(&["aaaa", "bbbb"]);
        let joined = assemble(&ranked, 8);
        assert_eq!(joined, "aaaa\n\nbbbb");
        assert!(joined.len() > 8);
    }

    #[test]
    fn included_texts_form_a_prefix_within_budget() {
        let ranked = texts(&["one two", "three", "four five six", "seven"]);
        for budget in 0..40 {
            let joined = assemble(&ranked, budget);
            let included: Vec<&str> = if joined.is_empty() {
                Vec::new()
            } else {
                joined.split("\n\n").collect()
            };
            // Prefix property: included texts match the ranked head.
            for (i, text) in included.iter().enumerate() {
                assert_eq!(*text, ranked[i], "budget={budget}");
            }
            // Budget property over raw text lengths.
            let raw: usize = included.iter().map(|t| t.chars().count()).sum();
            assert!(raw <= budget, "budget={budget} raw={raw}");
        }
    }
}
