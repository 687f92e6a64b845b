use once_cell::sync::Lazy;
use regex::Regex;

static MASS_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@(everyone|here)").unwrap());

/// Defuse `@everyone` and `@here` with a zero-width space.
pub fn escape_mentions(text: &str) -> String {
    MASS_MENTION.replace_all(text, "@\u{200b}$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mass_mentions_are_broken() {
        assert_eq!(escape_mentions("hi @everyone"), "hi @\u{200b}everyone");
        assert_eq!(escape_mentions("@here!"), "@\u{200b}here!");
        assert_eq!(escape_mentions("mail@example.com"), "mail@example.com");
    }
}
