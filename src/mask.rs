//! Caret-preserving input masks.
//!
//! A [`Formatter`] runs a character transformer over the raw input and then lays the result
//! over a mask pattern made of literal characters and wildcard slots. Both passes track how far
//! the caret drifts so that typing in the middle of a masked value keeps the caret next to the
//! character that was just entered.
//!
//! Bounded masks have a fixed shape, e.g. `(___) ___-____` for phone numbers. Unbound masks
//! repeat their pattern to fit the input and anchor it to the end of the value, e.g. `___,` for
//! thousands separators. Unbound masks only behave for patterns that keep a fixed
//! wildcard-to-literal ratio, and the transformer must strip the mask's own literals.

use std::borrow::Cow;
use std::fmt::{Debug, Formatter as FmtFormatter};
use std::sync::Arc;

use thiserror::Error;

pub const DEFAULT_WILDCARD: char = '_';

pub type Transformer = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum MaskError {
    #[error("mask pattern is empty")]
    EmptyPattern,
    #[error("mask pattern {pattern:?} has no `{wildcard}` slot")]
    NoWildcard { pattern: String, wildcard: char },
}

#[derive(Clone)]
pub struct Formatter {
    transformer: Transformer,
    pattern: Vec<char>,
    wildcard: char,
    wildcards: usize,
    unbound: bool,
}

pub struct FormatterBuilder {
    transformer: Transformer,
    pattern: String,
    wildcard: char,
    unbound: bool,
}

impl FormatterBuilder {
    pub fn transformer(
        mut self,
        transformer: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.transformer = Arc::new(transformer);
        self
    }

    pub fn wildcard(mut self, wildcard: char) -> Self {
        self.wildcard = wildcard;
        self
    }

    pub fn unbound(mut self, unbound: bool) -> Self {
        self.unbound = unbound;
        self
    }

    pub fn build(self) -> Result<Formatter, MaskError> {
        let pattern = self.pattern.chars().collect::<Vec<_>>();
        if pattern.is_empty() {
            return Err(MaskError::EmptyPattern);
        }
        let wildcards = pattern.iter().filter(|slot| **slot == self.wildcard).count();
        if wildcards == 0 {
            return Err(MaskError::NoWildcard {
                pattern: self.pattern,
                wildcard: self.wildcard,
            });
        }
        Ok(Formatter {
            transformer: self.transformer,
            pattern,
            wildcard: self.wildcard,
            wildcards,
            unbound: self.unbound,
        })
    }
}

impl Formatter {
    pub fn builder(pattern: impl Into<String>) -> FormatterBuilder {
        FormatterBuilder {
            transformer: Arc::new(str::to_owned),
            pattern: pattern.into(),
            wildcard: DEFAULT_WILDCARD,
            unbound: false,
        }
    }

    pub fn is_unbound(&self) -> bool {
        self.unbound
    }

    /// Masks `raw`, given the caret position (in characters) the widget reported for it.
    /// Returns the masked value and where the caret belongs in it.
    pub fn format(&self, raw: &str, cursor: usize) -> (String, usize) {
        let (value, cursor) = self.transform(raw, cursor);
        self.mask(&value, cursor)
    }

    /// Recovers the raw characters from a masked value by keeping only the characters that sit
    /// on wildcard slots.
    pub fn unformat(&self, masked: &str) -> String {
        if self.unbound {
            let mut raw = masked
                .chars()
                .rev()
                .zip(self.pattern.iter().cycle())
                .filter_map(|(ch, slot)| (*slot == self.wildcard).then_some(ch))
                .collect::<Vec<_>>();
            raw.reverse();
            raw.into_iter().collect()
        } else {
            masked
                .chars()
                .zip(self.pattern.iter())
                .filter_map(|(ch, slot)| (*slot == self.wildcard).then_some(ch))
                .collect()
        }
    }

    fn transform(&self, raw: &str, cursor: usize) -> (Vec<char>, usize) {
        let chars = raw.chars().collect::<Vec<_>>();
        let cursor = cursor.min(chars.len());
        let left = chars[..cursor].iter().collect::<String>();
        // The caret moves by however much the transformer grew or shrank the text left of it.
        let left_len = (self.transformer)(&left).chars().count();
        let value = (self.transformer)(raw).chars().collect();
        (value, left_len)
    }

    fn mask(&self, value: &[char], cursor: usize) -> (String, usize) {
        let pattern = if self.unbound {
            Cow::Owned(self.unbound_pattern(value.len()))
        } else {
            Cow::Borrowed(self.pattern.as_slice())
        };

        let mut masked = String::with_capacity(pattern.len());
        let mut placed = 0;
        let mut shift = 0;
        for slot in pattern.iter() {
            if placed == value.len() {
                break;
            }
            if *slot == self.wildcard {
                masked.push(value[placed]);
                placed += 1;
            } else {
                masked.push(*slot);
                if placed < cursor {
                    shift += 1;
                }
            }
        }

        let len = masked.chars().count();
        (masked, (cursor + shift).min(len))
    }

    /// Repeats the base pattern until it holds `raw_len` wildcards and reverses it, so partial
    /// groups end up on the left.
    fn unbound_pattern(&self, raw_len: usize) -> Vec<char> {
        if raw_len == 0 {
            return Vec::new();
        }
        let literals = self.pattern.len() - self.wildcards;
        let groups = raw_len.div_ceil(self.wildcards);
        let target = raw_len + (groups - 1) * literals;
        let mut expanded = self
            .pattern
            .iter()
            .copied()
            .cycle()
            .take(target)
            .collect::<Vec<_>>();
        expanded.reverse();
        expanded
    }
}

impl Debug for Formatter {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatter")
            .field("pattern", &self.pattern.iter().collect::<String>())
            .field("wildcard", &self.wildcard)
            .field("unbound", &self.unbound)
            .finish_non_exhaustive()
    }
}

/// Ready-made transformers.
pub mod transform {
    pub fn digits(value: &str) -> String {
        value.chars().filter(char::is_ascii_digit).collect()
    }

    pub fn uppercase(value: &str) -> String {
        value.to_uppercase()
    }

    pub fn lowercase(value: &str) -> String {
        value.to_lowercase()
    }

    pub fn strip(chars: &'static str) -> impl Fn(&str) -> String + Send + Sync + 'static {
        move |value: &str| value.chars().filter(|ch| !chars.contains(*ch)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn phone() -> Formatter {
        Formatter::builder("(___) ___-____")
            .transformer(transform::digits)
            .build()
            .expect("phone pattern is valid")
    }

    fn thousands() -> Formatter {
        Formatter::builder("___,")
            .transformer(transform::digits)
            .unbound(true)
            .build()
            .expect("thousands pattern is valid")
    }

    #[rstest]
    #[case("", 0, "", 0)]
    #[case("5", 1, "(5", 2)]
    #[case("555", 3, "(555", 4)]
    #[case("5551", 4, "(555) 1", 7)]
    #[case("555123", 6, "(555) 123", 9)]
    #[case("(555) 1234", 10, "(555) 123-4", 11)]
    #[case("5551234567", 10, "(555) 123-4567", 14)]
    fn phone_mask_places_literals_and_caret(
        #[case] raw: &str,
        #[case] cursor: usize,
        #[case] masked: &str,
        #[case] expected_cursor: usize,
    ) {
        assert_eq!(phone().format(raw, cursor), (masked.to_owned(), expected_cursor));
    }

    #[test]
    fn bounded_mask_truncates_overflow_and_clamps_caret() {
        let (masked, cursor) = phone().format("555123456789", 12);
        assert_eq!(masked, "(555) 123-4567");
        assert_eq!(cursor, masked.chars().count());
    }

    #[test]
    fn editing_in_the_middle_keeps_caret_after_new_digit() {
        // "(555) 123-4" with a 9 typed between the 1 and the 2.
        let (masked, cursor) = phone().format("(555) 1923-4", 8);
        assert_eq!(masked, "(555) 192-34");
        assert_eq!(cursor, 8);
    }

    #[test]
    fn rejected_character_does_not_advance_caret() {
        let (masked, cursor) = phone().format("(555) 1x", 8);
        assert_eq!(masked, "(555) 1");
        assert_eq!(cursor, 7);
    }

    #[rstest]
    #[case("1", 1, "1", 1)]
    #[case("123", 3, "123", 3)]
    #[case("1234", 4, "1,234", 5)]
    #[case("1,2345", 6, "12,345", 6)]
    #[case("1234567", 7, "1,234,567", 9)]
    #[case("91,234", 1, "91,234", 1)]
    fn unbound_mask_groups_from_the_right(
        #[case] raw: &str,
        #[case] cursor: usize,
        #[case] masked: &str,
        #[case] expected_cursor: usize,
    ) {
        assert_eq!(
            thousands().format(raw, cursor),
            (masked.to_owned(), expected_cursor)
        );
    }

    #[test]
    fn transformer_drift_is_applied_before_masking() {
        let formatter = Formatter::builder("____ ____")
            .transformer(transform::strip(" -"))
            .build()
            .expect("pattern is valid");
        // Three stripped characters left of the caret pull it back to 5, then the mask's space
        // pushes it forward by one.
        let (masked, cursor) = formatter.format("ab- -cdef", 8);
        assert_eq!(masked, "abcd ef");
        assert_eq!(cursor, 6);
    }

    #[test]
    fn uppercase_transformer_keeps_caret_in_place() {
        let formatter = Formatter::builder("___-___")
            .transformer(transform::uppercase)
            .build()
            .expect("pattern is valid");
        assert_eq!(formatter.format("abcd", 2), ("ABC-D".to_owned(), 2));
    }

    #[test]
    fn custom_wildcard_is_honoured() {
        let formatter = Formatter::builder("##/##")
            .wildcard('#')
            .transformer(transform::digits)
            .build()
            .expect("pattern is valid");
        assert_eq!(formatter.format("1225", 4), ("12/25".to_owned(), 5));
        assert_eq!(formatter.unformat("12/25"), "1225");
    }

    #[test]
    fn patterns_without_wildcards_are_rejected() {
        assert_eq!(
            Formatter::builder("--").build().err(),
            Some(MaskError::NoWildcard {
                pattern: "--".to_owned(),
                wildcard: '_',
            })
        );
        assert_eq!(
            Formatter::builder("").build().err(),
            Some(MaskError::EmptyPattern)
        );
    }

    #[test]
    fn unformat_ignores_digits_that_look_like_literals() {
        let formatter = Formatter::builder("+1 ___")
            .transformer(transform::digits)
            .build()
            .expect("pattern is valid");
        let (masked, _) = formatter.format("111", 3);
        assert_eq!(masked, "+1 111");
        assert_eq!(formatter.unformat(&masked), "111");
    }

    proptest! {
        #[test]
        fn bounded_unformat_recovers_raw(raw in "[0-9]{0,10}") {
            let formatter = phone();
            let (masked, _) = formatter.format(&raw, raw.len());
            prop_assert_eq!(formatter.unformat(&masked), raw);
        }

        #[test]
        fn unbound_unformat_recovers_raw(raw in "[0-9]{0,24}") {
            let formatter = thousands();
            let (masked, _) = formatter.format(&raw, raw.len());
            prop_assert_eq!(formatter.unformat(&masked), raw);
        }

        #[test]
        fn inserted_digit_never_moves_caret_backwards(
            raw in "[0-9]{0,9}",
            position in 0usize..32,
            digit in proptest::char::range('0', '9'),
        ) {
            let formatter = phone();
            let (masked, _) = formatter.format(&raw, raw.len());
            let mut chars = masked.chars().collect::<Vec<_>>();
            let at = position % (chars.len() + 1);
            chars.insert(at, digit);
            let edited = chars.into_iter().collect::<String>();

            let (next, cursor) = formatter.format(&edited, at + 1);
            prop_assert!(cursor > at);
            prop_assert!(cursor <= next.chars().count());
        }

        #[test]
        fn formatting_is_deterministic(raw in "[0-9a-z ]{0,16}", cursor in 0usize..20) {
            let formatter = phone();
            prop_assert_eq!(formatter.format(&raw, cursor), formatter.format(&raw, cursor));
        }
    }
}
