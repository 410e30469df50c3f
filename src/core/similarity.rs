//! String similarity used by profession resolution and rule lookup.
//!
//! `ratio` is the Indel normalisation of edit distance:
//! `1 - indel(a, b) / (|a| + |b|)`, which equals `2 * lcs(a, b) / (|a| + |b|)`.
//! It is symmetric, lies in `[0, 1]` and is `1.0` only for equal strings.

/// Similarity of two strings by character, case-sensitive.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_len(&a, &b)) as f64 / total as f64
}

/// Case-insensitive `ratio`.
pub fn ratio_ignore_case(a: &str, b: &str) -> f64 {
    ratio(&a.to_lowercase(), &b.to_lowercase())
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    // 只保留兩列以節省記憶體
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];

    for lc in long {
        for (j, sc) in short.iter().enumerate() {
            curr[j + 1] = if lc == sc {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// A candidate that passed a closest-match search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloseMatch<'a> {
    pub candidate: &'a str,
    pub index: usize,
    pub score: f64,
}

/// Up to `limit` candidates whose case-insensitive ratio to `word` is at
/// least `cutoff`, best first. Equal scores keep their input order.
pub fn close_matches<'a, I>(word: &str, candidates: I, limit: usize, cutoff: f64) -> Vec<CloseMatch<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    let word = word.to_lowercase();
    let mut matches: Vec<CloseMatch<'a>> = candidates
        .into_iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            let score = ratio(&word, &candidate.to_lowercase());
            (score >= cutoff).then_some(CloseMatch {
                candidate,
                index,
                score,
            })
        })
        .collect();

    // sort_by is stable, ties stay in input order
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(limit);
    matches
}

/// Best single match, see `close_matches`.
pub fn closest_match<'a, I>(word: &str, candidates: I, cutoff: f64) -> Option<CloseMatch<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    close_matches(word, candidates, 1, cutoff).into_iter().next()
}

/// Lowercase alphanumeric word tokens.
pub fn word_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Lowercase with runs of whitespace collapsed to one space.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_bounds_and_symmetry() {
        assert_eq!(ratio("", ""), 1.0);
        assert_eq!(ratio("abc", ""), 0.0);
        assert_eq!(ratio("builder", "builder"), 1.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);

        let ab = ratio("software dev", "software developer");
        let ba = ratio("software developer", "software dev");
        assert_eq!(ab, ba);
        // lcs = 12, total = 30
        assert!((ab - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_is_case_sensitive_unless_asked() {
        assert!(ratio("Chef", "chef") < 1.0);
        assert_eq!(ratio_ignore_case("Chef", "chef"), 1.0);
    }

    #[test]
    fn test_close_matches_orders_by_score_then_input() {
        let candidates = ["Plumber", "Plumbers", "Plumberx", "Teacher"];
        let matches = close_matches("plumber", candidates, 3, 0.6);

        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].candidate, "Plumber");
        // "Plumbers" and "Plumberx" tie, input order wins
        assert_eq!(matches[1].candidate, "Plumbers");
        assert_eq!(matches[2].candidate, "Plumberx");
        assert!(matches.iter().all(|m| m.score >= 0.6));
    }

    #[test]
    fn test_closest_match_respects_cutoff() {
        assert!(closest_match("asdlkfj", ["Chef", "Builder"], 0.7).is_none());
        let hit = closest_match("electricain", ["Chef", "Electrician"], 0.7).unwrap();
        assert_eq!(hit.candidate, "Electrician");
        assert_eq!(hit.index, 1);
    }

    #[test]
    fn test_word_tokens_and_whitespace() {
        assert_eq!(word_tokens("Senior  Web-Developer!"), vec!["senior", "web", "developer"]);
        assert_eq!(normalize_whitespace("  Site \t Manager "), "site manager");
    }
}
