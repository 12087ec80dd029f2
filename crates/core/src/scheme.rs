//! Scheme-prefixed string splitting.

/// Result of trying to split a `scheme:rest` string.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SchemeSplit<'a> {
    /// A recognized scheme followed by the rest of the string.
    Known(&'a str, &'a str),
    /// A scheme-shaped prefix outside the identifiable set.
    Unknown(&'a str),
    /// No scheme present; the whole input is payload.
    Bare(&'a str),
}

/// Split an input by an identifiable scheme prefix.
///
/// A prefix only counts as a scheme when it consists entirely of word
/// characters, so command lines like `echo a:b` or `cd ~; ls` never get
/// mistaken for scheme-tagged input.
pub(crate) fn split_scheme<'a>(input: &'a str, schemes: &[&str]) -> SchemeSplit<'a> {
    match input.split_once(':') {
        Some((head, rest)) if is_word(head) => {
            if schemes.contains(&head) {
                SchemeSplit::Known(head, rest)
            } else {
                SchemeSplit::Unknown(head)
            }
        }
        _ => SchemeSplit::Bare(input),
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMES: [&str; 2] = ["local", "remote"];

    #[test]
    fn test_known_scheme() {
        assert_eq!(
            split_scheme("local:echo hi", &SCHEMES),
            SchemeSplit::Known("local", "echo hi")
        );
    }

    #[test]
    fn test_unknown_scheme() {
        assert_eq!(split_scheme("ftp:ls", &SCHEMES), SchemeSplit::Unknown("ftp"));
    }

    #[test]
    fn test_bare_command() {
        assert_eq!(split_scheme("echo hi", &SCHEMES), SchemeSplit::Bare("echo hi"));
    }

    #[test]
    fn test_non_word_prefix_is_not_a_scheme() {
        assert_eq!(
            split_scheme("echo a:b", &SCHEMES),
            SchemeSplit::Bare("echo a:b")
        );
    }
}
