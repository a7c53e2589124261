//! Edit-distance similarity used for pronunciation scoring.
//!
//! Inputs are compared as-is; callers normalise first (see `normalize`).

/// Levenshtein distance between two strings, counted in chars.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
  let a_chars: Vec<char> = a.chars().collect();
  let b_chars: Vec<char> = b.chars().collect();

  let m = a_chars.len();
  let n = b_chars.len();

  if m == 0 {
    return n;
  }
  if n == 0 {
    return m;
  }

  // Two rows instead of the full matrix
  let mut prev = (0..=n).collect::<Vec<_>>();
  let mut curr = vec![0; n + 1];

  for i in 1..=m {
    curr[0] = i;

    for j in 1..=n {
      let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };

      curr[j] = (prev[j] + 1) // deletion
        .min(curr[j - 1] + 1) // insertion
        .min(prev[j - 1] + cost); // substitution
    }

    std::mem::swap(&mut prev, &mut curr);
  }

  prev[n]
}

/// Similarity percentage in `[0, 100]`. Two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
  let max_len = a.chars().count().max(b.chars().count());
  if max_len == 0 {
    return 100.0;
  }

  let distance = levenshtein_distance(a, b);
  (max_len - distance) as f64 / max_len as f64 * 100.0
}
