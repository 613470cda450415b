// ---------------------------------------------------------------------------
// Text Matching Utilities
// ---------------------------------------------------------------------------
//
// Pure-function string similarity primitives used by the author extractor
// to resolve free-text author candidates against the known-author list.
// ---------------------------------------------------------------------------

// ---------------------------------------------------------------------------
// Levenshtein distance / similarity
// ---------------------------------------------------------------------------

/// Compute the Levenshtein edit-distance between two strings.
///
/// Uses the classic Wagner-Fischer dynamic-programming algorithm with
/// O(min(a, b)) space.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
	// Ensure `a` is the shorter string so we only need one row of storage.
	let (a, b) = if a.len() > b.len() { (b, a) } else { (a, b) };

	let a_chars: Vec<char> = a.chars().collect();
	let b_chars: Vec<char> = b.chars().collect();
	let a_len = a_chars.len();
	let b_len = b_chars.len();

	if a_len == 0 {
		return b_len;
	}

	let mut prev: Vec<usize> = (0..=a_len).collect();
	let mut curr: Vec<usize> = vec![0; a_len + 1];

	for j in 1..=b_len {
		curr[0] = j;

		for i in 1..=a_len {
			let cost = if a_chars[i - 1] == b_chars[j - 1] {
				0
			} else {
				1
			};
			curr[i] = (curr[i - 1] + 1)
				.min(prev[i] + 1)
				.min(prev[i - 1] + cost);
		}

		std::mem::swap(&mut prev, &mut curr);
	}

	prev[a_len]
}

/// Normalized similarity (0-1) derived from the Levenshtein distance.
/// 1 means identical, 0 means completely different.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
	let max_len = a.chars().count().max(b.chars().count());
	if max_len == 0 {
		return 1.0; // two empty strings are identical
	}
	1.0 - levenshtein_distance(a, b) as f64 / max_len as f64
}

// ---------------------------------------------------------------------------
// Name similarity
// ---------------------------------------------------------------------------

/// Similarity between two names: Levenshtein similarity plus a 0.2 bonus
/// when either string contains the other, capped at 1.0. Comparison is
/// case-insensitive.
pub fn string_similarity(a: &str, b: &str) -> f64 {
	let a = a.to_lowercase();
	let b = b.to_lowercase();

	if a == b {
		return 1.0;
	}
	if a.is_empty() || b.is_empty() {
		return 0.0;
	}

	let base = levenshtein_similarity(&a, &b);
	let bonus = if a.contains(&b) || b.contains(&a) {
		0.2
	} else {
		0.0
	};

	(base + bonus).min(1.0)
}

/// Best match for `input` among `known`, with its similarity score.
/// Returns the input itself with score 0 when `known` is empty.
pub fn best_match<'a>(input: &'a str, known: &'a [&'a str]) -> (&'a str, f64) {
	let mut best: (&str, f64) = (input, 0.0);
	for candidate in known {
		let similarity = string_similarity(input, candidate);
		if similarity > best.1 {
			best = (candidate, similarity);
		}
	}
	best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
