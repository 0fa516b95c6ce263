//! Word-window chunking of raw document text.
//!
//! The splitter is pure and deterministic: it walks the whitespace-delimited
//! word sequence with a cursor, emitting windows of at most `max_words` words.
//! A tail that would fall below `min_words` is merged into the preceding
//! window instead of being emitted as a fragment, so only the very last
//! segment of a short document can be under the minimum.

/// Word-count bounds for the splitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkingLimits {
    pub min_words: usize,
    pub max_words: usize,
}

impl Default for ChunkingLimits {
    fn default() -> Self {
        Self {
            min_words: 500,
            max_words: 800,
        }
    }
}

/// Splits `text` into word-window segments.
///
/// Every word of the input appears in exactly one segment, in input order.
/// Segments hold at most `max_words` words, except that a final window may
/// grow past the maximum when the words left over after it would not reach
/// `min_words`. Empty or all-whitespace input yields no segments.
pub fn chunk_words(text: &str, limits: ChunkingLimits) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut segments = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let remaining = words.len() - start;
        let mut take = remaining.min(limits.max_words);
        // Merge a short tail into this window rather than emitting a
        // below-minimum fragment after it.
        if remaining > take && remaining - take < limits.min_words {
            take = remaining;
        }
        segments.push(words[start..start + take].join(" "));
        start += take;
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_count(segment: &str) -> usize {
        segment.split_whitespace().count()
    }

    fn synthetic_words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn empty_input_produces_no_segments() {
        let limits = ChunkingLimits::default();
        assert!(chunk_words("", limits).is_empty());
        assert!(chunk_words("   \n\t  ", limits).is_empty());
    }

    #[test]
    fn fifteen_hundred_words_split_into_800_and_700() {
        let text = synthetic_words(1500);
        let limits = ChunkingLimits {
            min_words: 500,
            max_words: 800,
        };
        let segments = chunk_words(&text, limits);
        assert_eq!(segments.len(), 2);
        assert_eq!(word_count(&segments[0]), 800);
        assert_eq!(word_count(&segments[1]), 700);
    }

    #[test]
    fn short_tail_merges_into_final_window() {
        // 1000 words at 500/800: the 200-word tail is below the minimum, so
        // the final window absorbs it and exceeds max_words.
        let text = synthetic_words(1000);
        let limits = ChunkingLimits {
            min_words: 500,
            max_words: 800,
        };
        let segments = chunk_words(&text, limits);
        assert_eq!(segments.len(), 1);
        assert_eq!(word_count(&segments[0]), 1000);
    }

    #[test]
    fn input_below_minimum_yields_one_short_segment() {
        let text = synthetic_words(40);
        let limits = ChunkingLimits {
            min_words: 500,
            max_words: 800,
        };
        let segments = chunk_words(&text, limits);
        assert_eq!(segments.len(), 1);
        assert_eq!(word_count(&segments[0]), 40);
    }

    #[test]
    fn concatenation_round_trips_to_input_word_sequence() {
        let limits = ChunkingLimits {
            min_words: 50,
            max_words: 80,
        };
        for n in [0, 1, 49, 50, 79, 80, 81, 129, 130, 500, 1234] {
            let text = synthetic_words(n);
            let segments = chunk_words(&text, limits);
            let rejoined: Vec<&str> = segments
                .iter()
                .flat_map(|s| s.split_whitespace())
                .collect();
            let original: Vec<&str> = text.split_whitespace().collect();
            assert_eq!(rejoined, original, "word sequence must survive for n={n}");
        }
    }

    #[test]
    fn window_bounds_hold_for_all_but_the_last_segment() {
        let limits = ChunkingLimits {
            min_words: 50,
            max_words: 80,
        };
        for n in 1..400 {
            let text = synthetic_words(n);
            let segments = chunk_words(&text, limits);
            let last = segments.len() - 1;
            for (i, segment) in segments.iter().enumerate() {
                let count = word_count(segment);
                if i < last {
                    assert!(count >= limits.min_words, "segment {i} under min for n={n}");
                    assert!(count <= limits.max_words, "segment {i} over max for n={n}");
                } else if segments.len() > 1 {
                    // A merged tail may exceed the max but never drops below
                    // the minimum when other segments precede it.
                    assert!(count >= limits.min_words, "final under min for n={n}");
                }
            }
        }
    }

    #[test]
    fn splitter_is_deterministic() {
        let text = synthetic_words(777);
        let limits = ChunkingLimits {
            min_words: 100,
            max_words: 150,
        };
        assert_eq!(chunk_words(&text, limits), chunk_words(&text, limits));
    }
}
