//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings, on a char boundary.
/// Avoids spamming logs with huge oracle responses.
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
  fn fills_every_occurrence() {
    let out = fill_template("{a} to {b}, {a} again", &[("a", "Frans"), ("b", "Duits")]);
    assert_eq!(out, "Frans to Duits, Frans again");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    assert_eq!(trunc_for_log("kort", 10), "kort");
    assert_eq!(trunc_for_log("één twee", 3), "één… (8 chars total)");
  }
}
