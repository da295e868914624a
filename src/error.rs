use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

use crate::{MAX_LABELS, MAX_LABEL_ID, MEMORY_MAX, VALUE_MAX};

// Load errors

/// Failure to read or load a card file.
///
/// The interpreter is always left cleared after one of these.
#[derive(Clone, Debug, PartialEq, Error, Diagnostic)]
pub enum LoadError {
    /// Reload requested before any file was read.
    #[error("A program must be read before it can be refreshed")]
    #[diagnostic(code(load::not_read))]
    NotRead,
    #[error("The file {file} could not be read: {reason}")]
    #[diagnostic(code(load::io))]
    Io { file: String, reason: String },
    /// Line is not a card.
    #[error("Invalid card format on line {line} of {file}")]
    #[diagnostic(
        code(load::format),
        help("cards are a sign followed by 10 digits, eg. `+1 000 001 002 ; comment`")
    )]
    Format { line: usize, file: String },
    /// Line is a card, but does not fit the file layout.
    #[error("Invalid card format on line {line} of {file}: {kind}")]
    #[diagnostic(
        code(load::structure),
        help("`+9999999999` separates data, program, and input; check the `--labels` flag")
    )]
    Structural {
        line: usize,
        file: String,
        kind: StructuralError,
    },
    #[error("No program cards were loaded")]
    #[diagnostic(
        code(load::no_program),
        help("place program cards after the first `+9999999999` card")
    )]
    NoProgram,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// More than two boundary cards.
    #[error("only two boundary cards are allowed")]
    ExtraBoundary,
    /// Symbol declaration not followed by its value card.
    #[error("in label/symbol mode, data cards must come in pairs")]
    MissingValueCard,
    #[error("data symbol {id} has already been set")]
    DuplicateSymbol { id: u16 },
    #[error("can't allocate zero words for data symbol {id}")]
    ZeroSizeSymbol { id: u16 },
    /// Symbol allocation exceeds data memory by `excess` words.
    #[error("memory limit exceeded by {excess} word{}", plural(.excess))]
    MemoryExceeded { excess: usize },
    #[error("label {id:03} has already been defined")]
    DuplicateLabel { id: u16 },
    #[error("label name exceeds maximum of {}", MAX_LABEL_ID)]
    LabelIdTooLarge { id: u16 },
    #[error("maximum of {} labels have already been defined", MAX_LABELS)]
    TooManyLabels,
    #[error("more than {} data cards", MEMORY_MAX)]
    DataOverflow,
    #[error("more than {} program cards", MEMORY_MAX)]
    ProgramOverflow,
    #[error("more than {} input cards", MEMORY_MAX)]
    InputOverflow,
}

fn plural(count: &usize) -> &'static str {
    if *count == 1 {
        ""
    } else {
        "s"
    }
}

// Runtime errors

/// Failure while executing a single instruction.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RuntimeError {
    /// Program line was never loaded. Reported without source location.
    #[error("Program line {line} has not been set. Missing end card?")]
    MissingProgramLine { line: usize },
    /// Instruction failed, located at its source line.
    #[error("{fault} (line {line} of {file})")]
    Fault {
        fault: Fault,
        line: usize,
        file: String,
    },
}

/// Reason an instruction could not be executed.
#[derive(Clone, Debug, PartialEq, Error, Diagnostic)]
pub enum Fault {
    #[error("Attempted to access uninitialized memory location {address}")]
    #[diagnostic(
        code(runtime::uninit),
        help("write to a location before reading from it")
    )]
    Uninitialized { address: usize },
    #[error("Data index {address} exceeds memory range of 0 to {}", MEMORY_MAX - 1)]
    #[diagnostic(code(runtime::address))]
    AddressOutOfRange { address: i64 },
    #[error("Data symbol {id} has not been declared")]
    #[diagnostic(code(runtime::symbol))]
    UndeclaredSymbol { id: u16 },
    #[error("Offset {offset} is out of bounds for data symbol {id}")]
    #[diagnostic(code(runtime::offset))]
    OffsetOutOfBounds { offset: i64, id: u16 },
    #[error("Program label {id} has not been defined")]
    #[diagnostic(code(runtime::label))]
    UndefinedLabel { id: u16 },
    #[error("Attempted to read beyond bounds of input cards")]
    #[diagnostic(
        code(runtime::input),
        help("add more cards after the second `+9999999999` card")
    )]
    InputExhausted,
    /// Sign and opcode pair with no operation, eg. `-9`.
    #[error("Called unsupported operation {op}")]
    #[diagnostic(code(runtime::unsupported))]
    Unsupported { op: String },
    #[error(
        "Program memory overflow: the result ({result}) exceeds the maximum value of {}",
        VALUE_MAX
    )]
    #[diagnostic(
        code(runtime::overflow),
        help("values must stay within -9999999999 and 9999999999")
    )]
    Overflow { result: i128 },
    #[error(
        "Program memory underflow: the result ({result}) exceeds the minimum value of -{}",
        VALUE_MAX
    )]
    #[diagnostic(
        code(runtime::underflow),
        help("values must stay within -9999999999 and 9999999999")
    )]
    Underflow { result: i128 },
    #[error("Attempted to divide by zero")]
    #[diagnostic(code(runtime::divide))]
    DivisionByZero,
    #[error("Attempted to take the square root of {value}")]
    #[diagnostic(code(runtime::root))]
    NegativeRoot { value: i64 },
}

impl RuntimeError {
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Fault { fault, .. } => Some(fault),
            Self::MissingProgramLine { .. } => None,
        }
    }
}

// Code and help come from the fault
impl Diagnostic for RuntimeError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self.fault() {
            Some(fault) => fault.code(),
            None => Some(Box::new("runtime::missing_line")),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.fault()?.help()
    }
}

// Export errors

#[derive(Clone, Debug, PartialEq, Error, Diagnostic)]
pub enum ExportError {
    #[error("The file {file} could not be read")]
    #[diagnostic(code(export::io))]
    Read { file: String },
    #[error("The file {file} could not be written")]
    #[diagnostic(code(export::io))]
    Write { file: String },
    #[error("Invalid card format on line {line} of {file}")]
    #[diagnostic(code(export::format))]
    Format { line: usize, file: String },
}
