//! Text clean-up applied before fuzzy comparison of spoken answers.

/// Characters stripped from transcripts and targets before scoring.
const STRIPPED: &[char] = &[
  '.', ',', '/', '#', '!', '$', '%', '^', '&', '*', ';', ':', '{', '}', '=', '-', '_', '`', '~', '(', ')',
];

/// Lowercase, drop the punctuation set above, trim surrounding whitespace.
/// Inner whitespace is left as-is.
pub fn normalize_spoken(s: &str) -> String {
  let lowered = s.to_lowercase();
  let stripped: String = lowered.chars().filter(|c| !STRIPPED.contains(c)).collect();
  stripped.trim().to_string()
}

/// Whitespace-delimited words.
pub fn words(s: &str) -> Vec<&str> {
  s.split_whitespace().collect()
}
