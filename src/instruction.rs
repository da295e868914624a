use std::fmt;

use crate::card::Card;

/// Sign character of a card, selecting one of the two operations sharing an opcode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sign {
    Positive,
    Negative,
}

/// Decoded card.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Instruction {
    pub sign: Sign,
    /// 0 to 9
    pub opcode: u8,
    pub opn1: u16,
    pub opn2: u16,
    pub opn3: u16,
}

/// Operation selected by `(opcode, sign)`.
///
/// Operand names follow card order: `a` is operand 1, `b` operand 2, `c` operand 3.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operation {
    /// `+0`: `c = a`
    Move { a: u16, c: u16 },
    /// `+1`: `c = a + b`
    Add { a: u16, b: u16, c: u16 },
    /// `-1`: `c = a - b`
    Subtract { a: u16, b: u16, c: u16 },
    /// `+2`: `c = a * b`
    Multiply { a: u16, b: u16, c: u16 },
    /// `-2`: `c = a / b`
    Divide { a: u16, b: u16, c: u16 },
    /// `+3`: `c = a * a`
    Square { a: u16, c: u16 },
    /// `-3`: `c = floor(sqrt(a))`
    Root { a: u16, c: u16 },
    /// `+4`: jump to `c` if `a == b`
    Equal { a: u16, b: u16, c: u16 },
    /// `-4`: jump to `c` if `a != b`
    Unequal { a: u16, b: u16, c: u16 },
    /// `+5`: jump to `c` if `a >= b`
    GreaterEqual { a: u16, b: u16, c: u16 },
    /// `-5`: jump to `c` if `a < b`
    Less { a: u16, b: u16, c: u16 },
    /// `+6`: `c = a[b]`
    FromArray { a: u16, b: u16, c: u16 },
    /// `-6`: `b[c] = a`
    ToArray { a: u16, b: u16, c: u16 },
    /// `+7`: increment `a`, then jump to `c` if `a < b`
    IncrementTest { a: u16, b: u16, c: u16 },
    /// `-7`: label definition
    Label { id: u16 },
    /// `+8`: read next input card into `c`
    Read { c: u16 },
    /// `-8`: print `a`
    Print { a: u16 },
    /// `+9`
    Halt,
    /// `-0` or `-9`
    Unsupported { opcode: u8 },
}

impl From<&Card> for Instruction {
    fn from(card: &Card) -> Self {
        Self {
            sign: if card.is_positive() {
                Sign::Positive
            } else {
                Sign::Negative
            },
            opcode: card.opcode(),
            opn1: card.operand(1),
            opn2: card.operand(2),
            opn3: card.operand(3),
        }
    }
}

impl Instruction {
    pub fn is_positive(&self) -> bool {
        self.sign == Sign::Positive
    }

    pub fn operation(&self) -> Operation {
        use Operation::*;
        use Sign::*;
        let (a, b, c) = (self.opn1, self.opn2, self.opn3);
        match (self.opcode, self.sign) {
            (0, Positive) => Move { a, c },
            (1, Positive) => Add { a, b, c },
            (1, Negative) => Subtract { a, b, c },
            (2, Positive) => Multiply { a, b, c },
            (2, Negative) => Divide { a, b, c },
            (3, Positive) => Square { a, c },
            (3, Negative) => Root { a, c },
            (4, Positive) => Equal { a, b, c },
            (4, Negative) => Unequal { a, b, c },
            (5, Positive) => GreaterEqual { a, b, c },
            (5, Negative) => Less { a, b, c },
            (6, Positive) => FromArray { a, b, c },
            (6, Negative) => ToArray { a, b, c },
            (7, Positive) => IncrementTest { a, b, c },
            (7, Negative) => Label { id: a },
            (8, Positive) => Read { c },
            (8, Negative) => Print { a },
            (9, Positive) => Halt,
            (opcode, _) => Unsupported { opcode },
        }
    }

    /// Signed opcode as written on a card, eg. `-7`.
    pub fn op_string(&self) -> String {
        let sign = if self.is_positive() { '+' } else { '-' };
        format!("{}{}", sign, self.opcode)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:03} {:03} {:03}",
            self.op_string(),
            self.opn1,
            self.opn2,
            self.opn3
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::parse_card;

    fn decode(line: &str) -> Instruction {
        let card = parse_card(line).unwrap().unwrap();
        Instruction::from(&card)
    }

    #[test]
    fn decodes_fields() {
        let instr = decode("-2 010 020 030");
        assert_eq!(instr.sign, Sign::Negative);
        assert_eq!(instr.opcode, 2);
        assert_eq!((instr.opn1, instr.opn2, instr.opn3), (10, 20, 30));
        assert_eq!(instr.to_string(), "-2 010 020 030");
        assert_eq!(instr.op_string(), "-2");
    }

    #[test]
    fn dual_operations() {
        assert_eq!(
            decode("+1000001002").operation(),
            Operation::Add { a: 0, b: 1, c: 2 }
        );
        assert_eq!(
            decode("-1000001002").operation(),
            Operation::Subtract { a: 0, b: 1, c: 2 }
        );
        assert_eq!(
            decode("+6005006007").operation(),
            Operation::FromArray { a: 5, b: 6, c: 7 }
        );
        assert_eq!(
            decode("-7012000000").operation(),
            Operation::Label { id: 12 }
        );
        assert_eq!(decode("+9000000000").operation(), Operation::Halt);
        assert_eq!(decode("+9123456789").operation(), Operation::Halt);
    }

    #[test]
    fn unsupported_pairs() {
        assert_eq!(
            decode("-0000000001").operation(),
            Operation::Unsupported { opcode: 0 }
        );
        assert_eq!(
            decode("-9000000000").operation(),
            Operation::Unsupported { opcode: 9 }
        );
    }
}
