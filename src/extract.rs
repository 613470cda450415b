// ---------------------------------------------------------------------------
// Filter Extractors
// ---------------------------------------------------------------------------
//
// Each extractor scans the remaining normalized query for one filter kind,
// and on a hit returns the extracted value, a per-match confidence, and the
// query with the matched text removed. Extractors run in a fixed pipeline
// (author, category, language, audience, year, page_count, rating) so each
// one only sees text not already consumed by an earlier stage.
// ---------------------------------------------------------------------------

use regex::Regex;

use crate::lexicon::{collapse_whitespace, Lexicon, AUDIENCES, CATEGORIES, KNOWN_AUTHORS, LANGUAGES};
use crate::text_match::best_match;
use crate::types::{Audience, PageCountFilter, RatingFilter};

/// A successful extraction: the value, how sure the extractor is, and the
/// query text left over for the next stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<T> {
	pub value: T,
	pub confidence: f64,
	pub remaining: String,
}

fn strip_match(re: &Regex, query: &str) -> String {
	collapse_whitespace(&re.replace(query, ""))
}

// ---------------------------------------------------------------------------
// Author
// ---------------------------------------------------------------------------

/// Minimum name similarity for an author candidate to be accepted.
const AUTHOR_ACCEPT_THRESHOLD: f64 = 0.7;

/// Extract an author filter from suffix forms ("<name> kitapları"), an
/// explicit "author:" prefix, or a literal known-author mention. The
/// candidate is fuzzy-resolved against the known-author list and only
/// accepted above the similarity threshold.
pub fn extract_author(lex: &Lexicon, query: &str) -> Option<Extraction<String>> {
	let patterns = [&lex.author_suffix, &lex.author_prefix, &lex.author_literal];

	for re in patterns {
		if let Some(caps) = re.captures(query) {
			let candidate = caps[1].trim();
			let (author, similarity) = best_match(candidate, KNOWN_AUTHORS);
			if similarity > AUTHOR_ACCEPT_THRESHOLD {
				return Some(Extraction {
					value: author.to_string(),
					confidence: similarity,
					remaining: strip_match(re, query),
				});
			}
		}
	}

	None
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Find `token` in `query` at word boundaries; returns byte range.
fn find_word(query: &str, token: &str) -> Option<(usize, usize)> {
	for (start, matched) in query.match_indices(token) {
		let end = start + matched.len();
		let before_ok = query[..start]
			.chars()
			.next_back()
			.map_or(true, |c| !c.is_alphanumeric());
		let after_ok = query[end..]
			.chars()
			.next()
			.map_or(true, |c| !c.is_alphanumeric());
		if before_ok && after_ok {
			return Some((start, end));
		}
	}
	None
}

fn remove_range(query: &str, start: usize, end: usize) -> String {
	let mut out = String::with_capacity(query.len());
	out.push_str(&query[..start]);
	out.push(' ');
	out.push_str(&query[end..]);
	collapse_whitespace(&out)
}

/// Extract a category filter via the fixed synonym table; the first
/// matching synonym wins and is removed from the residual text.
pub fn extract_category(query: &str) -> Option<Extraction<String>> {
	for (canonical, synonyms) in CATEGORIES {
		for synonym in *synonyms {
			if let Some((start, end)) = find_word(query, synonym) {
				return Some(Extraction {
					value: (*canonical).to_string(),
					confidence: 0.9,
					remaining: remove_range(query, start, end),
				});
			}
		}
	}
	None
}

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Extract a language filter from "sadece/yalnızca <language>" or
/// "<language> dilinde" forms, resolved to an ISO code.
pub fn extract_language(lex: &Lexicon, query: &str) -> Option<Extraction<String>> {
	let patterns = [&lex.language_only, &lex.language_in];

	for re in patterns {
		if let Some(caps) = re.captures(query) {
			let lang_text = caps[1].trim();
			for (code, names) in LANGUAGES {
				if names.contains(&lang_text) {
					return Some(Extraction {
						value: (*code).to_string(),
						confidence: 0.95,
						remaining: strip_match(re, query),
					});
				}
			}
		}
	}

	None
}

// ---------------------------------------------------------------------------
// Audience
// ---------------------------------------------------------------------------

/// Extract an audience filter from "<age-group> için/kitapları" forms.
pub fn extract_audience(lex: &Lexicon, query: &str) -> Option<Extraction<Audience>> {
	if let Some(caps) = lex.audience_books.captures(query) {
		let audience_text = caps[1].trim();
		for (audience, synonyms) in AUDIENCES {
			if synonyms.iter().any(|syn| audience_text.contains(syn)) {
				return Some(Extraction {
					value: *audience,
					confidence: 0.8,
					remaining: strip_match(&lex.audience_books, query),
				});
			}
		}
	}
	None
}

// ---------------------------------------------------------------------------
// Year
// ---------------------------------------------------------------------------

pub const YEAR_MIN: i32 = 1800;

/// Extract a publication-year filter from explicit 4-digit years in
/// context. Valid range is 1800..=current year.
pub fn extract_year(lex: &Lexicon, query: &str, current_year: i32) -> Option<Extraction<i32>> {
	let patterns = [&lex.year_published, &lex.year_after, &lex.year_before];

	for re in patterns {
		if let Some(caps) = re.captures(query) {
			if let Ok(year) = caps[1].parse::<i32>() {
				if (YEAR_MIN..=current_year).contains(&year) {
					return Some(Extraction {
						value: year,
						confidence: 0.9,
						remaining: strip_match(re, query),
					});
				}
			}
		}
	}

	None
}

// ---------------------------------------------------------------------------
// Page count
// ---------------------------------------------------------------------------

/// Extract a page-count filter from qualitative buckets ("kısa kitap",
/// "long book") or an explicit "<N> sayfa".
pub fn extract_page_count(lex: &Lexicon, query: &str) -> Option<Extraction<PageCountFilter>> {
	let buckets: [(&Regex, PageCountFilter); 3] = [
		(&lex.pages_short, PageCountFilter::at_most(150)),
		(&lex.pages_medium, PageCountFilter::between(150, 300)),
		(&lex.pages_long, PageCountFilter::at_least(300)),
	];

	for (re, filter) in buckets {
		if re.is_match(query) {
			return Some(Extraction {
				value: filter,
				confidence: 0.7,
				remaining: strip_match(re, query),
			});
		}
	}

	if let Some(caps) = lex.pages_exact.captures(query) {
		if let Ok(pages) = caps[1].parse::<u32>() {
			return Some(Extraction {
				value: PageCountFilter::exact(pages),
				confidence: 0.7,
				remaining: strip_match(&lex.pages_exact, query),
			});
		}
	}

	None
}

// ---------------------------------------------------------------------------
// Rating
// ---------------------------------------------------------------------------

/// Extract a rating filter from qualitative phrases ("yüksek puan",
/// "best") or an explicit "<N> puan/star".
pub fn extract_rating(lex: &Lexicon, query: &str) -> Option<Extraction<RatingFilter>> {
	if lex.rating_high.is_match(query) {
		return Some(Extraction {
			value: RatingFilter { min: 4.0 },
			confidence: 0.8,
			remaining: strip_match(&lex.rating_high, query),
		});
	}

	if lex.rating_best.is_match(query) {
		return Some(Extraction {
			value: RatingFilter { min: 4.5 },
			confidence: 0.8,
			remaining: strip_match(&lex.rating_best, query),
		});
	}

	if let Some(caps) = lex.rating_exact.captures(query) {
		if let Ok(min) = caps[1].parse::<f64>() {
			return Some(Extraction {
				value: RatingFilter { min },
				confidence: 0.8,
				remaining: strip_match(&lex.rating_exact, query),
			});
		}
	}

	None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
