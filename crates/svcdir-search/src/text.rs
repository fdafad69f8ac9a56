//! Tokenizing and phrase matching shared by the query processor and the
//! location detector.

/// Lowercase, trim and collapse internal whitespace.
pub(crate) fn normalize_query(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A word of the raw query. `raw` keeps the user's casing, which matters for
/// two-letter state abbreviations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub raw: String,
    pub lower: String,
}

/// Split on anything that is not a letter or digit.
pub(crate) fn tokenize(text: &str) -> Vec<Token> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| Token {
            raw: s.to_string(),
            lower: s.to_lowercase(),
        })
        .collect()
}

/// Lowercased words of a vocabulary phrase, split the same way as queries.
pub(crate) fn phrase_words(phrase: &str) -> Vec<String> {
    tokenize(phrase).into_iter().map(|t| t.lower).collect()
}

fn word_matches(token: &str, word: &str, allow_plural: bool) -> bool {
    if token == word {
        return true;
    }
    allow_plural
        && token
            .strip_prefix(word)
            .is_some_and(|rest| rest == "s" || rest == "es")
}

/// Position of the first unconsumed occurrence of `words` in `tokens`.
///
/// The final word may carry a plural suffix ("groomers" matches "groomer").
pub(crate) fn find_phrase(
    tokens: &[Token],
    words: &[String],
    consumed: &[bool],
    allow_plural: bool,
) -> Option<usize> {
    if words.is_empty() || words.len() > tokens.len() {
        return None;
    }
    let last = words.len() - 1;
    (0..=tokens.len() - words.len()).find(|&start| {
        words.iter().enumerate().all(|(offset, word)| {
            let idx = start + offset;
            !consumed[idx] && word_matches(&tokens[idx].lower, word, allow_plural && offset == last)
        })
    })
}

pub(crate) fn consume(consumed: &mut [bool], start: usize, len: usize) {
    for flag in consumed.iter_mut().skip(start).take(len) {
        *flag = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(phrase: &str) -> Vec<String> {
        phrase_words(phrase)
    }

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_query("  Dog   PARK\tnear Me "), "dog park near me");
        assert_eq!(normalize_query("   "), "");
    }

    #[test]
    fn tokenize_drops_punctuation() {
        let tokens = tokenize("Vet's, off-leash!! 46037");
        let lower: Vec<&str> = tokens.iter().map(|t| t.lower.as_str()).collect();
        assert_eq!(lower, vec!["vet", "s", "off", "leash", "46037"]);
    }

    #[test]
    fn find_phrase_matches_multi_word_and_plural() {
        let tokens = tokenize("best dog parks nearby");
        let consumed = vec![false; tokens.len()];
        assert_eq!(find_phrase(&tokens, &words("dog park"), &consumed, true), Some(1));
        assert_eq!(find_phrase(&tokens, &words("dog park"), &consumed, false), None);
    }

    #[test]
    fn find_phrase_skips_consumed_tokens() {
        let tokens = tokenize("vet vet");
        let mut consumed = vec![false; tokens.len()];
        consume(&mut consumed, 0, 1);
        assert_eq!(find_phrase(&tokens, &words("vet"), &consumed, true), Some(1));
    }

    #[test]
    fn find_phrase_respects_word_boundaries() {
        let tokens = tokenize("veterinarian");
        let consumed = vec![false; tokens.len()];
        assert_eq!(find_phrase(&tokens, &words("vet"), &consumed, true), None);
    }
}
