//! Tokenization of raw player input.

use fabula_core::Dictionary;

/// Split raw input into normalized tokens, dropping stopwords.
///
/// Normalization lowercases and folds acute accents so "Coge la LLAVE" and
/// "coge llave" tokenize identically.
pub fn tokenize(input: &str, dictionary: &Dictionary) -> Vec<String> {
    input
        .split_whitespace()
        .map(Dictionary::normalize)
        .filter(|t| !dictionary.is_stopword(t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_stopwords_and_normalizes() {
        let d = Dictionary::english();
        assert_eq!(tokenize("take the Golden KEY", &d), vec!["take", "golden", "key"]);
    }

    #[test]
    fn folds_spanish_accents() {
        let d = Dictionary::spanish();
        assert_eq!(tokenize("coge el BAÚL", &d), vec!["coge", "baul"]);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        let d = Dictionary::english();
        assert!(tokenize("   ", &d).is_empty());
    }
}
