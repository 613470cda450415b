// ---------------------------------------------------------------------------
// Lexicon — static reference tables and compiled query patterns
// ---------------------------------------------------------------------------
//
// Holds the closed synonym tables (categories, languages, audiences), the
// known-author reference list, and the extractor regexes, compiled once at
// process start. Tables mix Turkish and English tokens because queries
// arrive in both.
// ---------------------------------------------------------------------------

use regex::Regex;

use crate::types::Audience;

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Trim, lowercase, and Unicode-normalize a raw query.
///
/// Lowercasing the Turkish dotted capital İ yields "i" plus a combining
/// dot above (U+0307); that mark is stripped so table lookups see plain
/// "i". Runs of whitespace collapse to single spaces.
pub fn normalize_query(raw: &str) -> String {
	let lowered: String = raw
		.trim()
		.to_lowercase()
		.chars()
		.filter(|&c| c != '\u{0307}')
		.collect();
	collapse_whitespace(&lowered)
}

/// Collapse internal whitespace runs and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Reference tables
// ---------------------------------------------------------------------------

/// Canonical category name -> lowercase synonyms (canonical form first).
pub const CATEGORIES: &[(&str, &[&str])] = &[
	("Bilim kurgu", &["bilim kurgu", "science fiction", "sci-fi", "bilimkurgu", "scifi"]),
	("Fantastik", &["fantastik", "fantasy", "fantezi", "büyü", "sihir"]),
	("Polisiye", &["polisiye", "mystery", "detective", "cinayet", "gizem", "dedektif"]),
	("Romantik", &["romantik", "romance", "aşk", "sevgili", "romans"]),
	("Tarih", &["tarih", "history", "historical", "tarihi", "geçmiş"]),
	("Felsefe", &["felsefe", "philosophy", "düşünce", "felsefi"]),
	("Çocuk", &["çocuk", "children", "kids", "child", "masallar"]),
	("Korku", &["korku", "horror", "thriller", "gerilim", "vampir"]),
	("Biyografi", &["biyografi", "biography", "memoir", "otobiyografi", "yaşam"]),
	("Şiir", &["şiir", "poetry", "poem", "şair", "manzum"]),
	("Din", &["din", "religion", "religious", "dini", "spiritual"]),
	("Eğitim", &["eğitim", "education", "academic", "öğretim", "ders"]),
	("İş", &["business", "entrepreneurship", "girişim", "yönetim"]),
	("Sağlık", &["sağlık", "health", "medical", "tıp", "fitness"]),
	("Yemek", &["yemek", "cooking", "recipe", "mutfak", "tarif"]),
];

/// ISO language code -> lowercase names accepted in queries.
pub const LANGUAGES: &[(&str, &[&str])] = &[
	("tr", &["türkçe", "turkish", "turkce"]),
	("en", &["ingilizce", "english", "ing"]),
	("fr", &["fransızca", "french", "fra"]),
	("de", &["almanca", "german", "deutsch"]),
	("es", &["ispanyolca", "spanish", "esp"]),
	("it", &["italyanca", "italian", "ita"]),
	("ar", &["arapça", "arabic", "arab"]),
];

/// Audience group -> lowercase synonyms.
pub const AUDIENCES: &[(Audience, &[&str])] = &[
	(
		Audience::Children,
		&["çocuk", "çocuklar", "kids", "child", "bebek", "okul öncesi"],
	),
	(
		Audience::YoungAdult,
		&["genç", "ergen", "teen", "teenager", "lise"],
	),
	(
		Audience::Adult,
		&["yetişkin", "adult", "büyük", "mature"],
	),
];

/// Closed reference list of known authors for fuzzy matching.
pub const KNOWN_AUTHORS: &[&str] = &[
	"George Orwell",
	"Agatha Christie",
	"Haruki Murakami",
	"Orhan Pamuk",
	"Sabahattin Ali",
	"Nazım Hikmet",
	"Yaşar Kemal",
	"Halide Edib",
	"Reşat Nuri Güntekin",
	"Peyami Safa",
	"Ahmet Hamdi Tanpınar",
	"Stephen King",
	"J.K. Rowling",
	"Dan Brown",
	"Paulo Coelho",
	"Gabriel García Márquez",
	"Ernest Hemingway",
	"Franz Kafka",
];

/// Lowercase letters including the Turkish set, for name-ish captures.
const LETTERS: &str = "[a-zçğıiöşü]";

// ---------------------------------------------------------------------------
// Compiled patterns
// ---------------------------------------------------------------------------

/// All extractor regexes, compiled once and shared by the interpreter.
pub struct Lexicon {
	pub author_suffix: Regex,
	pub author_prefix: Regex,
	pub author_literal: Regex,
	pub language_only: Regex,
	pub language_in: Regex,
	pub audience_books: Regex,
	pub year_published: Regex,
	pub year_after: Regex,
	pub year_before: Regex,
	pub pages_short: Regex,
	pub pages_medium: Regex,
	pub pages_long: Regex,
	pub pages_exact: Regex,
	pub rating_high: Regex,
	pub rating_best: Regex,
	pub rating_exact: Regex,
}

fn compile(pattern: &str) -> Regex {
	Regex::new(pattern).expect("static lexicon pattern")
}

impl Lexicon {
	pub fn new() -> Self {
		let literal_authors = KNOWN_AUTHORS
			.iter()
			.map(|a| regex::escape(&a.to_lowercase()))
			.collect::<Vec<_>>()
			.join("|");

		Self {
			author_suffix: compile(
				r"(.+?)\s+(?:kitapları|kitabı|eserleri|eser|yazarı|tarafından|dan|den)\b",
			),
			author_prefix: compile(r"(?:yazar|writer|author):\s*([^,\n]+)"),
			author_literal: compile(&format!("({literal_authors})")),
			language_only: compile(&format!(
				r"(?:sadece|yalnızca|only)\s+({LETTERS}+)(?:\s+(?:olan|dil|language))?"
			)),
			language_in: compile(&format!(r"({LETTERS}+)\s+(?:dilinde|dili)")),
			audience_books: compile(&format!(r"({LETTERS}+)\s+(?:için|kitapları)")),
			year_published: compile(r"(\d{4})\s*(?:yılında|yılı|published|basımı)"),
			year_after: compile(r"(?:after|den sonra|sonra)\s*(\d{4})"),
			year_before: compile(r"(?:before|den önce|önce)\s*(\d{4})"),
			pages_short: compile(r"(?:kısa|short|az|küçük)\s+(?:kitap|book)"),
			pages_medium: compile(r"(?:orta|medium|normal)\s+(?:kitap|book)"),
			pages_long: compile(r"(?:uzun|long|kalın|büyük)\s+(?:kitap|book)"),
			pages_exact: compile(r"(\d+)\s*(?:sayfa|page)"),
			rating_high: compile(r"(?:yüksek|iyi|kaliteli)\s+(?:puan|rating|değerlendirme)"),
			rating_best: compile(r"(?:en iyi|best|top|mükemmel)"),
			rating_exact: compile(r"(\d+(?:\.\d+)?)\s*(?:puan|star|yıldız)"),
		}
	}
}

impl Default for Lexicon {
	fn default() -> Self {
		Self::new()
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
