use std::fmt;

use crate::card::{parse_card, Card};
use crate::error::{LoadError, StructuralError};
use crate::memory::Memory;
use crate::{MAX_LABELS, MAX_LABEL_ID, MEMORY_MAX};

/// Section of the card file currently being loaded.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Data,
    Program,
    Input,
}

impl Phase {
    /// Phase following a boundary card. `None` after input.
    fn next(self) -> Option<Phase> {
        match self {
            Phase::Data => Some(Phase::Program),
            Phase::Program => Some(Phase::Input),
            Phase::Input => None,
        }
    }
}

/// Human-readable record of a load, for drivers to display.
///
/// Carries no meaning of its own.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript(Vec<String>);

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.0.push(line.into());
    }

    pub fn blank(&mut self) {
        self.0.push(String::new());
    }

    pub fn append(&mut self, other: Transcript) {
        self.0.extend(other.0);
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("\n"))
    }
}

/// Evidence of label mode in a raw card file.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct LabelScan {
    /// Non-blank cards before the first boundary card.
    pub data_cards: usize,
    /// Whether a `-7` card appears in the program section.
    pub marker_seen: bool,
}

impl LabelScan {
    /// Scan raw lines without loading them. Malformed lines are skipped.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut scan = Self::default();
        let mut phase = Phase::Data;

        for line in lines {
            let Ok(Some(card)) = parse_card(line.as_ref()) else {
                continue;
            };
            if card.is_boundary() {
                phase = phase.next().unwrap_or(phase);
                continue;
            }
            match phase {
                Phase::Data => scan.data_cards += 1,
                Phase::Program if card.is_marker() => scan.marker_seen = true,
                _ => (),
            }
        }
        scan
    }

    /// Labels need a marker card, and data cards which can be paired.
    pub fn implies_labels(&self) -> bool {
        self.marker_seen && self.data_cards % 2 == 0
    }
}

/// Successful load result.
#[derive(Debug)]
pub struct Loaded {
    pub memory: Memory,
    pub transcript: Transcript,
}

/// Build memory from the lines of a card file.
///
/// `file` is only used for error messages.
pub fn load<S: AsRef<str>>(lines: &[S], file: &str, labels: bool) -> Result<Loaded, LoadError> {
    Loader {
        lines,
        file,
        labels,
        memory: Memory::new(),
        transcript: Transcript::new(),
        phase: Phase::Data,
        section_len: 0,
    }
    .run()
}

struct Loader<'a, S> {
    lines: &'a [S],
    file: &'a str,
    labels: bool,
    memory: Memory,
    transcript: Transcript,
    phase: Phase,
    /// Cards loaded in the current section.
    section_len: usize,
}

impl<S: AsRef<str>> Loader<'_, S> {
    fn run(mut self) -> Result<Loaded, LoadError> {
        self.transcript.push(format!(
            "Labels: {}",
            if self.labels { "ENABLED" } else { "DISABLED" }
        ));
        self.transcript.push("--Loading Data--");

        let mut index = 0;
        while index < self.lines.len() {
            let Some(card) = self.card(index)? else {
                index += 1;
                continue;
            };
            let line = index + 1;

            if card.is_boundary() {
                self.next_phase(line)?;
                index += 1;
                continue;
            }

            if self.section_len == 0 {
                self.transcript.push(match self.phase {
                    Phase::Program => "Line#\tInstruction",
                    _ => "Index\tData",
                });
            }

            match self.phase {
                Phase::Data if self.labels => {
                    // Value card is consumed along with the declaration
                    index = self.declare_symbol(index, &card)?;
                }
                Phase::Data => self.store_data(line, &card)?,
                Phase::Program => self.store_program(line, card)?,
                Phase::Input => self.store_input(line, &card)?,
            }
            index += 1;
        }

        if self.memory.program.is_empty() {
            return Err(LoadError::NoProgram);
        }

        self.transcript.blank();
        self.transcript.push("--Program Loaded Successfully--");
        Ok(Loaded {
            memory: self.memory,
            transcript: self.transcript,
        })
    }

    /// Card on the line at `index`, or `None` if blank.
    fn card(&self, index: usize) -> Result<Option<Card>, LoadError> {
        parse_card(self.lines[index].as_ref()).map_err(|_| LoadError::Format {
            line: index + 1,
            file: self.file.to_string(),
        })
    }

    fn structural(&self, line: usize, kind: StructuralError) -> LoadError {
        LoadError::Structural {
            line,
            file: self.file.to_string(),
            kind,
        }
    }

    fn next_phase(&mut self, line: usize) -> Result<(), LoadError> {
        let Some(phase) = self.phase.next() else {
            return Err(self.structural(line, StructuralError::ExtraBoundary));
        };
        self.phase = phase;
        self.section_len = 0;

        self.transcript.blank();
        self.transcript.push(match phase {
            Phase::Program => "--Loading Program--",
            _ => "--Loading Input--",
        });
        Ok(())
    }

    fn store_data(&mut self, line: usize, card: &Card) -> Result<(), LoadError> {
        let address = self.section_len;
        if address >= MEMORY_MAX {
            return Err(self.structural(line, StructuralError::DataOverflow));
        }
        self.memory.data.set(address, card.value());
        self.transcript.push(format!("{}\t{}", address, card.value()));
        self.section_len += 1;
        Ok(())
    }

    /// Declaration card at `index` names the symbol and its size; the next non-blank card
    /// holds the fill value, whatever card it is.
    ///
    /// Returns the index of the value card.
    fn declare_symbol(&mut self, index: usize, declaration: &Card) -> Result<usize, LoadError> {
        let line = index + 1;
        let id = declaration.operand(1);
        let size = declaration.operand(2) as usize;

        let mut value_index = index + 1;
        let value = loop {
            if value_index >= self.lines.len() {
                return Err(self.structural(line, StructuralError::MissingValueCard));
            }
            match self.card(value_index)? {
                Some(card) => break card.value(),
                None => value_index += 1,
            }
        };

        if self.memory.symbols.contains_key(&id) {
            return Err(self.structural(line, StructuralError::DuplicateSymbol { id }));
        }
        if size == 0 {
            return Err(self.structural(line, StructuralError::ZeroSizeSymbol { id }));
        }
        let end = self.memory.allocated + size;
        if end > MEMORY_MAX {
            let excess = end - MEMORY_MAX;
            return Err(self.structural(line, StructuralError::MemoryExceeded { excess }));
        }

        let symbol = self.memory.allocate(id, size, value);
        for address in symbol.base..symbol.base + symbol.size {
            self.transcript.push(format!("{}\t{}", address, value));
        }
        self.section_len += size;
        Ok(value_index)
    }

    fn store_program(&mut self, line: usize, card: Card) -> Result<(), LoadError> {
        let index = self.memory.program.len();

        if self.labels && card.is_marker() {
            let id = card.operand(1);
            if self.memory.labels.contains_key(&id) {
                return Err(self.structural(line, StructuralError::DuplicateLabel { id }));
            }
            if id > MAX_LABEL_ID {
                return Err(self.structural(line, StructuralError::LabelIdTooLarge { id }));
            }
            // Unique ids no larger than MAX_LABEL_ID keep this below the limit
            if self.memory.labels.len() >= MAX_LABELS {
                return Err(self.structural(line, StructuralError::TooManyLabels));
            }
            // Label refers to the card following it
            self.memory.labels.insert(id, index);
            self.transcript.push(format!("{}\t{}", index, card));
            self.section_len += 1;
            return Ok(());
        }

        if index >= MEMORY_MAX {
            return Err(self.structural(line, StructuralError::ProgramOverflow));
        }
        self.transcript.push(format!("{}\t{}", index, card));
        self.memory.program.push(card, line);
        self.section_len += 1;
        Ok(())
    }

    fn store_input(&mut self, line: usize, card: &Card) -> Result<(), LoadError> {
        let index = self.memory.input.len();
        if index >= MEMORY_MAX {
            return Err(self.structural(line, StructuralError::InputOverflow));
        }
        self.memory.input.push(card.value());
        self.transcript.push(format!("{}\t{}", index, card.value()));
        self.section_len += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Symbol;

    fn lines(src: &str) -> Vec<&str> {
        src.lines().collect()
    }

    fn load_ok(src: &str, labels: bool) -> Memory {
        load(&lines(src), "test.txt", labels)
            .expect("load should succeed")
            .memory
    }

    fn load_err(src: &str, labels: bool) -> LoadError {
        load(&lines(src), "test.txt", labels).expect_err("load should fail")
    }

    #[test]
    fn data_without_labels() {
        let memory = load_ok(
            "+0000000005\n\
             ; comment line\n\
             +0000000007\n\
             +9999999999\n\
             +9000000000\n\
             +9999999999",
            false,
        );
        assert_eq!(memory.data.get(0), Some(5));
        assert_eq!(memory.data.get(1), Some(7));
        assert_eq!(memory.data.get(2), None);
        assert_eq!(memory.data.used().len(), 2);
        assert_eq!(memory.program.len(), 1);
        assert!(memory.input.is_empty());
    }

    #[test]
    fn symbol_declaration() {
        let memory = load_ok(
            "-7 001 005 000\n\
             \n\
             +0000000042\n\
             -7 002 001 000\n\
             -0000000003\n\
             +9999999999\n\
             +9000000000\n\
             +9999999999",
            true,
        );
        assert_eq!(memory.symbols.get(&1), Some(&Symbol { base: 0, size: 5 }));
        assert_eq!(memory.symbols.get(&2), Some(&Symbol { base: 5, size: 1 }));
        for address in 0..5 {
            assert_eq!(memory.data.get(address), Some(42));
        }
        assert_eq!(memory.data.get(5), Some(-3));
        assert_eq!(memory.allocated, 6);
    }

    #[test]
    fn symbol_errors() {
        let err = load_err("-7001005000\n\n", true);
        assert_eq!(
            err,
            LoadError::Structural {
                line: 1,
                file: "test.txt".into(),
                kind: StructuralError::MissingValueCard,
            }
        );

        let err = load_err("-7001005000", true);
        assert!(matches!(
            err,
            LoadError::Structural {
                kind: StructuralError::MissingValueCard,
                ..
            }
        ));

        let err = load_err("-7001000000\n+0000000001\n+9999999999\n+9000000000", true);
        assert!(matches!(
            err,
            LoadError::Structural {
                line: 1,
                kind: StructuralError::ZeroSizeSymbol { id: 1 },
                ..
            }
        ));

        let err = load_err(
            "-7001002000\n+0000000001\n-7001002000\n+0000000001\n+9999999999\n+9000000000",
            true,
        );
        assert!(matches!(
            err,
            LoadError::Structural {
                line: 3,
                kind: StructuralError::DuplicateSymbol { id: 1 },
                ..
            }
        ));

        let err = load_err(
            "-7001999000\n+0000000001\n-7002002000\n+0000000001\n+9999999999\n+9000000000",
            true,
        );
        assert!(matches!(
            err,
            LoadError::Structural {
                kind: StructuralError::MemoryExceeded { excess: 1 },
                ..
            }
        ));
    }

    #[test]
    fn boundary_text_is_a_value_card() {
        let memory = load_ok(
            "-7 001 002 000\n\
             +9999999999\n\
             +9999999999\n\
             +9 000 000 000\n\
             +9999999999",
            true,
        );
        assert_eq!(memory.symbols.get(&1), Some(&Symbol { base: 0, size: 2 }));
        assert_eq!(memory.data.get(0), Some(9_999_999_999));
        assert_eq!(memory.data.get(1), Some(9_999_999_999));
        assert_eq!(memory.program.len(), 1);
        assert!(memory.input.is_empty());
    }

    #[test]
    fn value_card_format_error_names_its_line() {
        let err = load_err("-7001002000\n\n+00x\n+9999999999\n+9000000000", true);
        assert_eq!(
            err,
            LoadError::Format {
                line: 3,
                file: "test.txt".into()
            }
        );
    }

    #[test]
    fn labels_do_not_occupy_program_slots() {
        let memory = load_ok(
            "+9999999999\n\
             -7 000 000 000\n\
             +8 000 000 000\n\
             -7 001 000 000\n\
             -7 002 000 000\n\
             +9 000 000 000\n\
             +9999999999",
            true,
        );
        assert_eq!(memory.program.len(), 2);
        assert_eq!(memory.labels.get(&0), Some(&0));
        assert_eq!(memory.labels.get(&1), Some(&1));
        assert_eq!(memory.labels.get(&2), Some(&1));
        assert_eq!(memory.program.source_line(0), Some(3));
        assert_eq!(memory.program.source_line(1), Some(6));
    }

    #[test]
    fn markers_are_instructions_without_labels() {
        let memory = load_ok("+9999999999\n-7000000000\n+9000000000", false);
        assert_eq!(memory.program.len(), 2);
        assert!(memory.labels.is_empty());
    }

    #[test]
    fn label_errors() {
        let err = load_err("+9999999999\n-7005000000\n-7005000000\n+9000000000", true);
        assert!(matches!(
            err,
            LoadError::Structural {
                line: 3,
                kind: StructuralError::DuplicateLabel { id: 5 },
                ..
            }
        ));

        let err = load_err("+9999999999\n-7100000000\n+9000000000", true);
        assert!(matches!(
            err,
            LoadError::Structural {
                kind: StructuralError::LabelIdTooLarge { id: 100 },
                ..
            }
        ));
    }

    #[test]
    fn boundary_cards() {
        let err = load_err(
            "+9999999999\n+9000000000\n+9999999999\n+0000000001\n+9999999999",
            false,
        );
        assert!(matches!(
            err,
            LoadError::Structural {
                line: 5,
                kind: StructuralError::ExtraBoundary,
                ..
            }
        ));

        // Missing final boundary still loads a program
        let memory = load_ok("+0000000001\n+9999999999\n+1000000001\n+9000000000", false);
        assert_eq!(memory.program.len(), 2);
        assert!(memory.input.is_empty());
    }

    #[test]
    fn input_section() {
        let memory = load_ok(
            "+9999999999\n+9000000000\n+9999999999\n+0000000003\n-0000000004\n",
            false,
        );
        assert_eq!(memory.input.len(), 2);
        assert_eq!(memory.input.get(0), Some(3));
        assert_eq!(memory.input.get(1), Some(-4));
    }

    #[test]
    fn empty_program() {
        assert_eq!(
            load_err("+0000000001\n+9999999999\n+9999999999", false),
            LoadError::NoProgram
        );
        assert_eq!(load_err("", false), LoadError::NoProgram);
    }

    #[test]
    fn format_error_line() {
        let err = load_err("+0000000001\n\n+12345\n", false);
        assert_eq!(
            err,
            LoadError::Format {
                line: 3,
                file: "test.txt".into()
            }
        );
    }

    #[test]
    fn too_many_data_cards() {
        let mut src: Vec<&str> = vec!["+0000000001"; MEMORY_MAX + 1];
        src.push("+9999999999");
        src.push("+9000000000");
        let err = load(&src, "test.txt", false).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Structural {
                line,
                kind: StructuralError::DataOverflow,
                ..
            } if line == MEMORY_MAX + 1
        ));
    }

    #[test]
    fn too_many_program_cards() {
        let mut src: Vec<&str> = vec!["+9999999999"];
        src.extend(vec!["+9000000000"; MEMORY_MAX + 1]);
        let err = load(&src, "test.txt", false).unwrap_err();
        assert_eq!(
            err,
            LoadError::Structural {
                line: MEMORY_MAX + 2,
                file: "test.txt".into(),
                kind: StructuralError::ProgramOverflow,
            }
        );
    }

    #[test]
    fn markers_do_not_count_toward_program_limit() {
        let mut src: Vec<String> = vec!["+9999999999".into()];
        for id in 0..50 {
            src.push(format!("-7 {:03} 000 000", id));
        }
        src.extend(vec!["+9000000000".to_string(); MEMORY_MAX]);
        let memory = load(&src, "test.txt", true).unwrap().memory;
        assert_eq!(memory.program.len(), MEMORY_MAX);
        assert_eq!(memory.labels.len(), 50);

        // One card more overflows, on the line after all markers
        src.push("+9000000000".into());
        let err = load(&src, "test.txt", true).unwrap_err();
        assert_eq!(
            err,
            LoadError::Structural {
                line: 1 + 50 + MEMORY_MAX + 1,
                file: "test.txt".into(),
                kind: StructuralError::ProgramOverflow,
            }
        );
    }

    #[test]
    fn too_many_input_cards() {
        let mut src: Vec<&str> = vec!["+9999999999", "+9000000000", "+9999999999"];
        src.extend(vec!["-0000000001"; MEMORY_MAX + 1]);
        let err = load(&src, "test.txt", false).unwrap_err();
        assert_eq!(
            err,
            LoadError::Structural {
                line: MEMORY_MAX + 4,
                file: "test.txt".into(),
                kind: StructuralError::InputOverflow,
            }
        );

        src.pop();
        let memory = load(&src, "test.txt", false).unwrap().memory;
        assert_eq!(memory.input.len(), MEMORY_MAX);
    }

    #[test]
    fn label_scan() {
        let scan = LabelScan::from_lines(&lines(
            "-7001002000\n\
             +0000000005\n\
             not a card\n\
             +9999999999\n\
             -7000000000\n\
             +9000000000\n\
             +9999999999\n\
             -7000000000",
        ));
        assert_eq!(
            scan,
            LabelScan {
                data_cards: 2,
                marker_seen: true
            }
        );
        assert!(scan.implies_labels());

        let odd = LabelScan::from_lines(&lines("+0000000005\n+9999999999\n-7000000000"));
        assert!(odd.marker_seen);
        assert!(!odd.implies_labels());

        // Markers in input section don't count
        let input_only = LabelScan::from_lines(&lines("+9999999999\n+9000000000\n+9999999999\n-7000000000"));
        assert!(!input_only.marker_seen);
    }

    #[test]
    fn transcript() {
        let loaded = load(
            &lines("+0000000005\n+9999999999\n+9000000000\n+9999999999\n+0000000002"),
            "test.txt",
            false,
        )
        .unwrap();
        assert_eq!(
            loaded.transcript.lines(),
            [
                "Labels: DISABLED",
                "--Loading Data--",
                "Index\tData",
                "0\t5",
                "",
                "--Loading Program--",
                "Line#\tInstruction",
                "0\t+9000000000",
                "",
                "--Loading Input--",
                "Index\tData",
                "0\t2",
                "",
                "--Program Loaded Successfully--",
            ]
        );
    }
}
