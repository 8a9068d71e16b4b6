//! Name matching and filename sanitization helpers.

use once_cell::sync::Lazy;
use regex::Regex;

static FIRST_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\w+)").unwrap());
static INVALID_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]"#).unwrap());

/// Compare the first whitespace-delimited word of two names,
/// case-insensitively.
///
/// This is the (deliberately coarse) rule used to reconcile incoming
/// characters against stored ones: `"Naruto Uzumaki"` matches
/// `"naruto uzumaki clone"`. Returns false when either input has no
/// extractable leading word.
pub fn compare_first_words(a: &str, b: &str) -> bool {
    match (first_word(a), first_word(b)) {
        (Some(wa), Some(wb)) => wa.to_lowercase() == wb.to_lowercase(),
        _ => false,
    }
}

fn first_word(s: &str) -> Option<&str> {
    FIRST_WORD
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Make a name safe to use as a filename.
///
/// Replaces the characters invalid on Windows (`\ / : * ? " < > |`) with
/// `replacement`, strips ASCII control characters, and trims surrounding
/// whitespace. An input that collapses to nothing becomes `"file"`.
pub fn sanitize_filename(name: &str, replacement: &str) -> String {
    let safe = INVALID_CHARS.replace_all(name, replacement);
    let safe: String = safe.chars().filter(|c| (*c as u32) >= 32).collect();
    let safe = safe.trim();

    if safe.is_empty() {
        "file".to_string()
    } else {
        safe.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_words_equal_case_insensitive() {
        assert!(compare_first_words("Naruto Uzumaki", "naruto uzumaki clone"));
        assert!(compare_first_words("SASUKE", "sasuke uchiha"));
    }

    #[test]
    fn test_leading_whitespace_ignored() {
        assert!(compare_first_words("  Sasuke Uchiha", "Sasuke"));
    }

    #[test]
    fn test_no_extractable_word() {
        assert!(!compare_first_words("", "Sasuke"));
        assert!(!compare_first_words("Sasuke", ""));
        assert!(!compare_first_words("   ", "---"));
    }

    #[test]
    fn test_different_first_words() {
        assert!(!compare_first_words("Naruto Uzumaki", "Sasuke Uzumaki"));
    }

    #[test]
    fn test_sanitize_replaces_invalid_characters() {
        assert_eq!(
            sanitize_filename(r#"a\b/c:d*e?f"g<h>i|j"#, "_"),
            "a_b_c_d_e_f_g_h_i_j"
        );
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_filename("na\x01ru\tto", "_"), "naruto");
    }

    #[test]
    fn test_sanitize_trims_whitespace() {
        assert_eq!(sanitize_filename("  Monkey D. Luffy  ", "_"), "Monkey D. Luffy");
    }

    #[test]
    fn test_sanitize_all_invalid_collapses_to_default() {
        assert_eq!(sanitize_filename("???", ""), "file");
        assert_eq!(sanitize_filename("\x01\x02", "_"), "file");
        assert_eq!(sanitize_filename("", "_"), "file");
    }
}
