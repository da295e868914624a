use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Sign, opcode digit, then three 3-digit operands.
    static ref CARD_PATTERN: Regex = Regex::new(r"^[-+][0-9]{10}$").unwrap();
}

/// Canonical text of the card separating data, program, and input sections.
pub const BOUNDARY_CARD: &str = "+9999999999";
/// Canonical text of the card which ends a program.
pub const HALT_CARD: &str = "+9000000000";

/// A single validated card in canonical form: sign followed by exactly 10 digits.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Card(String);

/// Line did not match the card grammar after removing comment and whitespace.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error("`{text}` is not a valid card")]
pub struct MalformedCard {
    pub text: String,
}

/// Reduce a raw source line to a card.
///
/// Everything from the first `;` is a comment, and all whitespace is ignorable.
/// Returns `Ok(None)` for a blank (or comment-only) line.
pub fn parse_card(line: &str) -> Result<Option<Card>, MalformedCard> {
    let code = line.split(';').next().unwrap_or_default();
    let text: String = code.chars().filter(|ch| !ch.is_whitespace()).collect();

    if text.is_empty() {
        return Ok(None);
    }
    if !CARD_PATTERN.is_match(&text) {
        return Err(MalformedCard { text });
    }
    Ok(Some(Card(text)))
}

impl Card {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0.starts_with('+')
    }

    pub fn opcode(&self) -> u8 {
        self.0.as_bytes()[1] - b'0'
    }

    /// Operand at position 1, 2, or 3.
    pub fn operand(&self, index: usize) -> u16 {
        debug_assert!((1..=3).contains(&index));
        let start = 2 + (index - 1) * 3;
        self.0[start..start + 3]
            .bytes()
            .fold(0, |acc, digit| acc * 10 + (digit - b'0') as u16)
    }

    /// Signed numeric value of the whole card, as used by data and input cards.
    pub fn value(&self) -> i64 {
        let magnitude = self.0[1..]
            .bytes()
            .fold(0i64, |acc, digit| acc * 10 + (digit - b'0') as i64);
        if self.is_positive() {
            magnitude
        } else {
            -magnitude
        }
    }

    pub fn is_boundary(&self) -> bool {
        self.0 == BOUNDARY_CARD
    }

    pub fn is_halt(&self) -> bool {
        self.0 == HALT_CARD
    }

    /// `-7` cards declare labels in the program section and symbols in the data section.
    pub fn is_marker(&self) -> bool {
        self.0.starts_with("-7")
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(line: &str) -> Card {
        parse_card(line)
            .expect("card should be valid")
            .expect("card should not be blank")
    }

    #[test]
    fn blank_lines() {
        assert_eq!(parse_card(""), Ok(None));
        assert_eq!(parse_card("   \t "), Ok(None));
        assert_eq!(parse_card("; just a comment"), Ok(None));
        assert_eq!(parse_card("  ;+1000001002"), Ok(None));
    }

    #[test]
    fn normalizes_whitespace_and_comments() {
        assert_eq!(card("+1 000 001 002").as_str(), "+1000001002");
        assert_eq!(card("\t-8 123 000 000 ; print").as_str(), "-8123000000");
        assert_eq!(card("+9999999999;;;").as_str(), BOUNDARY_CARD);
    }

    #[test]
    fn rejects_malformed() {
        for line in [
            "1000001002",
            "+100000100",
            "+10000010022",
            "*1000001002",
            "+1000a01002",
            "++000001002",
            "+1000001002 junk",
        ] {
            assert!(parse_card(line).is_err(), "{line:?} should be rejected");
        }
        let err = parse_card("+12 ; short").unwrap_err();
        assert_eq!(err.text, "+12");
    }

    #[test]
    fn canonical_form_is_stable() {
        for line in ["+1 000 001 002", "-0000000005", " +9 000 000 000 ;halt", "-7001005000"] {
            let first = card(line);
            let second = card(&first.to_string());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn fields() {
        let add = card("+1 123 456 789");
        assert!(add.is_positive());
        assert_eq!(add.opcode(), 1);
        assert_eq!(add.operand(1), 123);
        assert_eq!(add.operand(2), 456);
        assert_eq!(add.operand(3), 789);

        assert_eq!(card("+0000000042").value(), 42);
        assert_eq!(card("-0000000005").value(), -5);
        assert_eq!(card("+9999999999").value(), 9_999_999_999);
        assert_eq!(card("-9999999999").value(), -9_999_999_999);
    }

    #[test]
    fn special_cards() {
        assert!(card("+9 999 999 999").is_boundary());
        assert!(!card("-9999999999").is_boundary());
        assert!(card("+9000000000").is_halt());
        assert!(!card("+9000000001").is_halt());
        assert!(card("-7 004 000 000").is_marker());
        assert!(!card("+7 004 000 000").is_marker());
    }
}
