//! String similarity for product identity resolution

/// Levenshtein edit distance, counted in characters
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Single rolling row of the DP table
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let substitution = diagonal + usize::from(ca != cb);
            row[j + 1] = substitution.min(above + 1).min(row[j] + 1);
            diagonal = above;
        }
    }
    row[b.len()]
}

/// Similarity in `[0.0, 1.0]`: `(max_len - distance) / max_len`
///
/// Either string empty gives 0.0; equal strings give 1.0. Callers normalize
/// (case-fold, trim) before comparing.
///
/// # Examples
///
/// ```
/// use tenderfold_merge::similarity;
///
/// assert_eq!(similarity("split ac", "split ac"), 1.0);
/// assert!(similarity("split ac", "split a/c") > 0.85);
/// assert_eq!(similarity("", "router"), 0.0);
/// ```
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    let distance = edit_distance(a, b);
    (max_len - distance) as f64 / max_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance_basics() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("flaw", "lawn"), 2);
    }

    #[test]
    fn test_edit_distance_counts_characters() {
        // Multi-byte characters count once
        assert_eq!(edit_distance("₹500", "₹600"), 1);
        assert_eq!(edit_distance("café", "cafe"), 1);
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("router", "router"), 1.0);
        assert_eq!(similarity("router", ""), 0.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_similarity_value() {
        // one insertion over nine characters
        let sim = similarity("split ac", "split a/c");
        assert!((sim - 8.0 / 9.0).abs() < 1e-9);
    }
}
