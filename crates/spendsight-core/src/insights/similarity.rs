//! Text similarity for transaction descriptions
//!
//! Normalized Levenshtein similarity over Unicode scalar values, so Hebrew,
//! Arabic and other non-Latin descriptions compare without transliteration.

/// Score returned when one description contains the other
pub const CONTAINMENT_SCORE: f64 = 0.9;

/// Similarity between two descriptions in `[0, 1]`
///
/// - empty input on either side scores 0
/// - case-insensitive exact match scores 1
/// - containment in either direction scores [`CONTAINMENT_SCORE`]
/// - otherwise `1 - distance / max_len`
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return CONTAINMENT_SCORE;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let max_len = a.len().max(b.len());

    let score = 1.0 - levenshtein(&a, &b) as f64 / max_len as f64;
    score.clamp(0.0, 1.0)
}

/// Edit distance between two strings, counted in chars
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    levenshtein(&a, &b)
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_inputs_score_zero() {
        assert_eq!(similarity("", "coffee"), 0.0);
        assert_eq!(similarity("coffee", ""), 0.0);
        assert_eq!(similarity("   ", "coffee"), 0.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn test_exact_match_ignores_case_and_whitespace() {
        assert_eq!(similarity("Starbucks", "starbucks"), 1.0);
        assert_eq!(similarity("  Whole Foods ", "WHOLE FOODS"), 1.0);
    }

    #[test]
    fn test_containment_is_symmetric() {
        assert_eq!(similarity("Netflix", "NETFLIX.COM 866-579"), CONTAINMENT_SCORE);
        assert_eq!(similarity("NETFLIX.COM 866-579", "Netflix"), CONTAINMENT_SCORE);
    }

    #[test]
    fn test_edit_distance_similarity() {
        // kitten -> sitting: 3 edits over 7 chars
        let score = similarity("kitten", "sitting");
        assert!((score - (1.0 - 3.0 / 7.0)).abs() < 1e-9);

        assert!(similarity("AMAZON", "STARBUCKS") < 0.3);
    }

    #[test]
    fn test_right_to_left_scripts() {
        // Hebrew: "supermarket" vs "supermarket shufersal" (containment)
        assert_eq!(similarity("סופרמרקט", "סופרמרקט שופרסל"), CONTAINMENT_SCORE);
        // One letter differs out of six chars
        let score = similarity("קפה גד", "קפה גל");
        assert!((score - (1.0 - 1.0 / 6.0)).abs() < 1e-9);
        // Arabic
        assert_eq!(similarity("مطعم", "مطعم"), 1.0);
    }

    #[test]
    fn test_levenshtein_counts_chars_not_bytes() {
        assert_eq!(levenshtein_distance("שלום", "שלוס"), 1);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("flaw", "lawn"), 2);
    }

    #[test]
    fn test_similarity_bounds() {
        let samples = [
            "a", "ab", "Uber", "UBER EATS", "Lyft", "שופרסל", "x y z", "Trader Joe's", "",
        ];
        for a in samples {
            for b in samples {
                let score = similarity(a, b);
                assert!((0.0..=1.0).contains(&score), "{a:?} vs {b:?} = {score}");
                assert_eq!(score, similarity(b, a), "asymmetric for {a:?} / {b:?}");
            }
            if !a.trim().is_empty() {
                assert_eq!(similarity(a, a), 1.0);
            }
        }
    }
}
