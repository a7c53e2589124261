//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// True if the char belongs to the Bengali block (U+0980..U+09FF).
pub fn is_bengali(ch: char) -> bool {
  ('\u{0980}'..='\u{09FF}').contains(&ch)
}

/// Log-safe truncation for large strings, cut on a char boundary.
pub fn trunc_for_log(s: &str, max_chars: usize) -> String {
  let total = s.chars().count();
  if total <= max_chars {
    s.to_string()
  } else {
    let head: String = s.chars().take(max_chars).collect();
    format!("{}… ({} chars total)", head, total)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_all_occurrences() {
    let out = fill_template("{topic} at {level}; again {topic}", &[("topic", "food"), ("level", "beginner")]);
    assert_eq!(out, "food at beginner; again food");
  }

  #[test]
  fn detects_bengali_script() {
    assert!("আমি ভাত খাই".chars().any(is_bengali));
    assert!(!"I eat rice".chars().any(is_bengali));
  }

  #[test]
  fn truncates_on_char_boundary() {
    assert_eq!(trunc_for_log("ভালো আছি", 4), "ভালো… (8 chars total)");
    assert_eq!(trunc_for_log("short", 10), "short");
  }
}
