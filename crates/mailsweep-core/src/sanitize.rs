//! Mapping of header text to safe file names.

/// Replaces every character outside `[A-Za-z0-9_.-]` with `_`.
///
/// The mapping is one character to one character, so the result has the
/// same number of characters as the input. It is total and idempotent.
#[must_use]
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Sanitizes `text` for use as a file name, substituting `fallback` when the
/// result is empty or would name the directory itself (`.`) or its parent
/// (`..`).
#[must_use]
pub fn safe_file_name(text: &str, fallback: &str) -> String {
    let name = sanitize(text);
    if name.is_empty() || name == "." || name == ".." {
        fallback.to_string()
    } else {
        name
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_examples() {
        assert_eq!(sanitize("<abc.123@mail.example.com>"), "_abc.123_mail.example.com_");
        assert_eq!(sanitize("Re: Hello/World"), "Re__Hello_World");
        assert_eq!(sanitize("already-safe_name.txt"), "already-safe_name.txt");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_sanitize_non_ascii_is_one_to_one() {
        assert_eq!(sanitize("Héllo €"), "H_llo__");
    }

    #[test]
    fn test_safe_file_name_fallback() {
        assert_eq!(safe_file_name("", "attachment.bin"), "attachment.bin");
        assert_eq!(safe_file_name(".", "attachment.bin"), "attachment.bin");
        assert_eq!(safe_file_name("..", "attachment.bin"), "attachment.bin");
        assert_eq!(safe_file_name("../etc/passwd", "x"), ".._etc_passwd");
        assert_eq!(safe_file_name("report.pdf", "x"), "report.pdf");
    }

    proptest! {
        #[test]
        fn sanitize_output_alphabet_and_length(text in any::<String>()) {
            let clean = sanitize(&text);
            prop_assert_eq!(clean.chars().count(), text.chars().count());
            prop_assert!(clean
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')));
        }

        #[test]
        fn sanitize_is_idempotent(text in any::<String>()) {
            let once = sanitize(&text);
            prop_assert_eq!(sanitize(&once), once);
        }

        #[test]
        fn safe_file_name_never_escapes(text in "[./a-z]{0,6}") {
            let name = safe_file_name(&text, "fallback");
            prop_assert!(!name.is_empty());
            prop_assert!(name != "." && name != "..");
            prop_assert!(!name.contains('/'));
        }
    }
}
