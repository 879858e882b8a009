//! Whitelisted tokens are spans of the reference text the user never has to
//! type. Tokens are kept longest-first so that when two tokens share a
//! prefix, the longer one wins at a given position.

use itertools::Itertools;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    tokens: Vec<Vec<char>>,
}

impl Whitelist {
    /// Trim, drop blanks and sort longest-first. Equal lengths keep input order.
    pub fn configure<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens: Vec<Vec<char>> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().chars().collect::<Vec<char>>())
            .filter(|t| !t.is_empty())
            .collect();

        // sort_by is stable
        tokens.sort_by(|a, b| b.len().cmp(&a.len()));

        Self { tokens }
    }

    /// Parse newline separated input, one token per line.
    pub fn parse(raw: &str) -> Self {
        Self::configure(raw.lines())
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.iter().collect()).collect()
    }

    /// Length of the token starting at `index`, or 0.
    ///
    /// Tokens that would run past the end of `text` never match.
    pub fn match_at(&self, text: &[char], index: usize) -> usize {
        if index >= text.len() {
            return 0;
        }

        let rest = &text[index..];
        self.tokens
            .iter()
            .find(|token| rest.starts_with(token))
            .map_or(0, |token| token.len())
    }

    /// Index of the first position at or after `index` not covered by a
    /// run of back-to-back tokens.
    pub fn skip_from(&self, text: &[char], mut index: usize) -> usize {
        loop {
            match self.match_at(text, index) {
                0 => return index,
                len => index += len,
            }
        }
    }
}

/// Per-char flags marking whitelisted positions of a reference text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipMask(Vec<bool>);

impl SkipMask {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Out of range positions are never skipped.
    pub fn is_skipped(&self, idx: usize) -> bool {
        self.0.get(idx).copied().unwrap_or(false)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Half-open ranges of consecutive whitelisted positions.
    ///
    /// Adjacent token matches show up as a single range.
    pub fn spans(&self) -> Vec<(usize, usize)> {
        self.0
            .iter()
            .enumerate()
            .chunk_by(|(_, skipped)| **skipped)
            .into_iter()
            .filter(|(skipped, _)| *skipped)
            .filter_map(|(_, mut run)| {
                let (start, _) = run.next()?;
                let end = run.last().map_or(start, |(i, _)| i) + 1;
                Some((start, end))
            })
            .collect()
    }
}

/// Greedy leftmost scan: a matched token is consumed whole before the scan
/// resumes, so a token's interior is never a match start.
pub fn compute_mask(text: &[char], whitelist: &Whitelist) -> SkipMask {
    let mut mask = vec![false; text.len()];
    let mut i = 0;

    while i < text.len() {
        match whitelist.match_at(text, i) {
            0 => i += 1,
            len => {
                mask[i..i + len].iter_mut().for_each(|m| *m = true);
                i += len;
            }
        }
    }

    SkipMask(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn configure_drops_blank_and_sorts_longest_first() {
        let wl = Whitelist::configure(["  [A] ", "", "[TOPIC]", "   ", "[KW]", "[AB]"]);
        assert_eq!(wl.tokens(), vec!["[TOPIC]", "[KW]", "[AB]", "[A]"]);
    }

    #[test]
    fn configure_empty_is_valid() {
        let wl = Whitelist::configure(Vec::<String>::new());
        assert!(wl.is_empty());
        assert_eq!(wl.match_at(&chars("anything"), 0), 0);
    }

    #[test]
    fn parse_splits_lines() {
        let wl = Whitelist::parse("[KW]\r\n\n  [TOPIC]\n");
        assert_eq!(wl.tokens(), vec!["[TOPIC]", "[KW]"]);
    }

    #[test]
    fn longest_match_wins() {
        let wl = Whitelist::configure(["[A]", "[AB]"]);
        assert_eq!(wl.match_at(&chars("[AB]x"), 0), 4);
        assert_eq!(wl.match_at(&chars("[A]X"), 0), 3);
    }

    #[test]
    fn shared_prefix_prefers_longer_token() {
        let wl = Whitelist::configure(["ab", "abc"]);
        assert_eq!(wl.match_at(&chars("abcd"), 0), 3);
        assert_eq!(wl.match_at(&chars("abd"), 0), 2);
    }

    #[test]
    fn token_past_end_does_not_match() {
        let wl = Whitelist::configure(["[KW]"]);
        let text = chars("x[KW");
        assert_eq!(wl.match_at(&text, 1), 0);
        assert_eq!(wl.match_at(&text, 10), 0);
        assert_eq!(compute_mask(&text, &wl).as_slice(), &[false; 4]);
    }

    #[test]
    fn mask_marks_matches() {
        let wl = Whitelist::configure(["[KW]"]);
        let mask = compute_mask(&chars("a[KW]b"), &wl);
        assert_eq!(
            mask.as_slice(),
            &[false, true, true, true, true, false]
        );
        assert_eq!(mask.spans(), vec![(1, 5)]);
    }

    #[test]
    fn mask_consumes_matches_whole() {
        // "aXa" would match again at index 2 if the interior were rescanned
        let wl = Whitelist::configure(["aXa", "aY"]);
        let mask = compute_mask(&chars("aXaY"), &wl);
        assert_eq!(mask.as_slice(), &[true, true, true, false]);
    }

    #[test]
    fn mask_length_matches_text() {
        let wl = Whitelist::configure(["[A]", "[B]", "zz"]);
        for text in ["", "a", "[A]", "[A][B]x", "zzzzz", "no tokens here"] {
            let text = chars(text);
            assert_eq!(compute_mask(&text, &wl).len(), text.len());
        }
    }

    #[test]
    fn mask_is_deterministic() {
        let wl = Whitelist::configure(["[A]", "[B]"]);
        let text = chars("x[A][B]y[A]");
        assert_eq!(compute_mask(&text, &wl), compute_mask(&text, &wl));
    }

    #[test]
    fn adjacent_spans_merge_in_spans_view() {
        let wl = Whitelist::configure(["[A]", "[B]"]);
        let mask = compute_mask(&chars("[A][B]x[A]"), &wl);
        assert_eq!(mask.spans(), vec![(0, 6), (7, 10)]);
    }

    #[test]
    fn skip_from_crosses_adjacent_tokens() {
        let wl = Whitelist::configure(["[A]", "[B]"]);
        let text = chars("[A][B]x");
        assert_eq!(wl.skip_from(&text, 0), 6);
        assert_eq!(wl.skip_from(&text, 6), 6);
    }

    #[test]
    fn skip_from_stops_at_end_of_text() {
        let wl = Whitelist::configure(["[KW]"]);
        let text = chars("[KW][KW]");
        assert_eq!(wl.skip_from(&text, 0), 8);
    }

    #[test]
    fn is_skipped_out_of_range() {
        let mask = SkipMask::default();
        assert!(!mask.is_skipped(0));
        assert!(mask.is_empty());
    }
}
