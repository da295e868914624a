use std::fmt;
use std::fs;
use std::path::Path;

use fxhash::FxHashSet;

use crate::breakpoint::{BreakpointChange, Breakpoints};
use crate::card::Card;
use crate::error::{Fault, LoadError, RuntimeError};
use crate::instruction::{Instruction, Operation};
use crate::loader::{self, LabelScan, Loaded, Transcript};
use crate::memory::{FxMap, Memory, Symbol};
use crate::{MEMORY_MAX, VALUE_MAX};

/// Name used in messages when lines were loaded without a file.
const UNNAMED_SOURCE: &str = "<buffer>";

/// Complete machine state: memory, tables, cursor, and breakpoints.
#[derive(Debug, Default)]
pub struct Interpreter {
    memory: Memory,
    /// Raw lines of the last file read, re-parsed on reload.
    lines: Vec<String>,
    file: Option<String>,
    labels: bool,
    breakpoints: Breakpoints,

    /// Next line to execute.
    instruction_pointer: usize,
    /// Line executed by the most recent step.
    last_instruction_pointer: Option<usize>,
    touched: Touched,
}

/// Locations accessed by the most recent step, for highlighting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Touched {
    pub written_address: Option<usize>,
    pub written_symbol: Option<u16>,
    pub read_input: Option<usize>,
    pub taken_label: Option<u16>,
    pub read_symbols: FxHashSet<u16>,
}

/// Result of executing a single instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct StepResult {
    /// Program line which was executed.
    pub line: usize,
    pub instruction: Instruction,
    pub effect: Effect,
    /// `false` once the program has halted.
    pub proceed: bool,
}

/// Values read and produced by an instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Move {
        value: i64,
    },
    Arithmetic {
        operator: Arithmetic,
        lhs: i64,
        rhs: i64,
        result: i64,
    },
    Square {
        value: i64,
        result: i64,
    },
    Root {
        value: i64,
        result: i64,
    },
    Branch {
        comparison: Comparison,
        lhs: i64,
        rhs: i64,
        taken: bool,
        target: Target,
    },
    FromArray {
        offset: i64,
        address: usize,
        value: i64,
    },
    ToArray {
        value: i64,
        offset: i64,
        address: usize,
    },
    IncrementTest {
        value: i64,
        bound: i64,
        taken: bool,
        target: Target,
    },
    Label {
        id: u16,
    },
    Read {
        value: i64,
    },
    /// Program output.
    Print {
        value: i64,
    },
    Halt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    Unequal,
    GreaterEqual,
    Less,
}

/// Destination of a conditional jump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Line(u16),
    /// `line` is `None` if the label was never defined.
    Label { id: u16, line: Option<usize> },
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and load a file without label detection.
    pub fn from_file(path: impl AsRef<Path>, labels: bool) -> Result<Self, LoadError> {
        let mut interpreter = Self::new();
        interpreter.read_file(path, labels, false)?;
        Ok(interpreter)
    }

    /// Load a card file.
    ///
    /// Reading a different file than last time clears all breakpoints. Reading the same file
    /// again re-parses the lines captured by the first read.
    pub fn read_file(
        &mut self,
        path: impl AsRef<Path>,
        labels: bool,
        detect_labels: bool,
    ) -> Result<Transcript, LoadError> {
        let name = path.as_ref().display().to_string();

        if self.file.as_deref() != Some(name.as_str()) {
            self.breakpoints.clear();
            let contents = match fs::read_to_string(path.as_ref()) {
                Ok(contents) => contents,
                Err(err) => {
                    self.file = None;
                    self.lines.clear();
                    self.clear();
                    return Err(LoadError::Io {
                        file: name,
                        reason: err.to_string(),
                    });
                }
            };
            self.file = Some(name);
            self.lines = contents.lines().map(String::from).collect();
        }

        let mut transcript = Transcript::new();
        transcript.push("--Reading Program File--");
        transcript.push("--Program Successfully Read--");
        transcript.blank();
        transcript.append(self.parse(labels, detect_labels)?);
        Ok(transcript)
    }

    /// Re-parse the lines of the last file read, with label detection.
    pub fn reload(&mut self, labels: bool) -> Result<Transcript, LoadError> {
        if self.file.is_none() && self.lines.is_empty() {
            return Err(LoadError::NotRead);
        }
        self.parse(labels, true)
    }

    /// Rebuild all state from raw card lines.
    ///
    /// Label mode is on if `labels` is set, or if `detect_labels` is set and the lines look
    /// like a labelled program.
    pub fn load(
        &mut self,
        lines: Vec<String>,
        labels: bool,
        detect_labels: bool,
    ) -> Result<Transcript, LoadError> {
        self.lines = lines;
        self.parse(labels, detect_labels)
    }

    fn parse(&mut self, labels: bool, detect_labels: bool) -> Result<Transcript, LoadError> {
        let detected = detect_labels && LabelScan::from_lines(&self.lines).implies_labels();
        self.clear();
        self.labels = labels || detected;

        match loader::load(&self.lines, self.file_name(), self.labels) {
            Ok(Loaded { memory, transcript }) => {
                self.memory = memory;
                self.breakpoints.prune(self.program_size());
                Ok(transcript)
            }
            Err(err) => {
                self.labels = false;
                Err(err)
            }
        }
    }

    /// Reset memory and cursor. Breakpoints and raw lines are kept.
    fn clear(&mut self) {
        self.memory = Memory::new();
        self.instruction_pointer = 0;
        self.last_instruction_pointer = None;
        self.touched = Touched::default();
    }

    // Execution

    /// Execute the instruction at the instruction pointer.
    ///
    /// On failure, the instruction pointer is left on the failing line.
    pub fn step(&mut self) -> Result<StepResult, RuntimeError> {
        self.touched = Touched::default();

        let line = self.instruction_pointer;
        let instruction = self
            .memory
            .program
            .get(line)
            .map(Instruction::from)
            .ok_or(RuntimeError::MissingProgramLine { line })?;

        self.last_instruction_pointer = Some(line);
        // Advanced first, so jumps can overwrite it
        self.instruction_pointer = line + 1;

        match self.execute(&instruction) {
            Ok(effect) => Ok(StepResult {
                line,
                instruction,
                proceed: effect != Effect::Halt,
                effect,
            }),
            Err(fault) => {
                self.instruction_pointer = line;
                Err(RuntimeError::Fault {
                    fault,
                    line: self.memory.program.source_line(line).unwrap_or(line + 1),
                    file: self.file_name().to_string(),
                })
            }
        }
    }

    fn execute(&mut self, instruction: &Instruction) -> Result<Effect, Fault> {
        use Operation as Op;
        let effect = match instruction.operation() {
            Op::Move { a, c } => {
                let value = self.read(a)?;
                self.write(c, value)?;
                Effect::Move { value }
            }
            Op::Add { a, b, c } => self.arithmetic(Arithmetic::Add, a, b, c)?,
            Op::Subtract { a, b, c } => self.arithmetic(Arithmetic::Subtract, a, b, c)?,
            Op::Multiply { a, b, c } => self.arithmetic(Arithmetic::Multiply, a, b, c)?,
            Op::Divide { a, b, c } => self.arithmetic(Arithmetic::Divide, a, b, c)?,
            Op::Square { a, c } => {
                let value = self.read(a)?;
                let result = bounded(value as i128 * value as i128)?;
                self.write(c, result)?;
                Effect::Square { value, result }
            }
            Op::Root { a, c } => {
                let value = self.read(a)?;
                if value < 0 {
                    return Err(Fault::NegativeRoot { value });
                }
                let result = isqrt(value);
                self.write(c, result)?;
                Effect::Root { value, result }
            }
            Op::Equal { a, b, c } => self.branch(Comparison::Equal, a, b, c)?,
            Op::Unequal { a, b, c } => self.branch(Comparison::Unequal, a, b, c)?,
            Op::GreaterEqual { a, b, c } => self.branch(Comparison::GreaterEqual, a, b, c)?,
            Op::Less { a, b, c } => self.branch(Comparison::Less, a, b, c)?,
            Op::FromArray { a, b, c } => {
                let offset = self.read(b)?;
                let address = self.resolve(a, offset)?;
                let value = self.read_at(a, offset)?;
                self.write(c, value)?;
                Effect::FromArray {
                    offset,
                    address,
                    value,
                }
            }
            Op::ToArray { a, b, c } => {
                let value = self.read(a)?;
                let offset = self.read(c)?;
                let address = self.write_at(b, offset, value)?;
                Effect::ToArray {
                    value,
                    offset,
                    address,
                }
            }
            Op::IncrementTest { a, b, c } => {
                let value = bounded(self.read(a)? as i128 + 1)?;
                // Fail before writing if the bound is unreadable
                self.read(b)?;
                self.write(a, value)?;
                // Read again, since `b` may refer to the incremented location
                let bound = self.read(b)?;
                let taken = value < bound;
                if taken {
                    self.jump(c)?;
                }
                Effect::IncrementTest {
                    value,
                    bound,
                    taken,
                    target: self.target(c),
                }
            }
            Op::Label { id } => {
                if !self.labels {
                    return Err(Fault::Unsupported {
                        op: instruction.op_string(),
                    });
                }
                Effect::Label { id }
            }
            Op::Read { c } => {
                let (index, value) = self.memory.input.peek().ok_or(Fault::InputExhausted)?;
                self.write(c, value)?;
                self.memory.input.advance();
                self.touched.read_input = Some(index);
                Effect::Read { value }
            }
            Op::Print { a } => Effect::Print {
                value: self.read(a)?,
            },
            Op::Halt => Effect::Halt,
            Op::Unsupported { .. } => {
                return Err(Fault::Unsupported {
                    op: instruction.op_string(),
                })
            }
        };
        Ok(effect)
    }

    fn arithmetic(&mut self, operator: Arithmetic, a: u16, b: u16, c: u16) -> Result<Effect, Fault> {
        let lhs = self.read(a)?;
        let rhs = self.read(b)?;
        let (x, y) = (lhs as i128, rhs as i128);
        let result = match operator {
            Arithmetic::Add => x + y,
            Arithmetic::Subtract => x - y,
            Arithmetic::Multiply => x * y,
            Arithmetic::Divide => {
                if rhs == 0 {
                    return Err(Fault::DivisionByZero);
                }
                x / y
            }
        };
        let result = bounded(result)?;
        self.write(c, result)?;
        Ok(Effect::Arithmetic {
            operator,
            lhs,
            rhs,
            result,
        })
    }

    fn branch(&mut self, comparison: Comparison, a: u16, b: u16, c: u16) -> Result<Effect, Fault> {
        let lhs = self.read(a)?;
        let rhs = self.read(b)?;
        let taken = match comparison {
            Comparison::Equal => lhs == rhs,
            Comparison::Unequal => lhs != rhs,
            Comparison::GreaterEqual => lhs >= rhs,
            Comparison::Less => lhs < rhs,
        };
        if taken {
            self.jump(c)?;
        }
        Ok(Effect::Branch {
            comparison,
            lhs,
            rhs,
            taken,
            target: self.target(c),
        })
    }

    /// Move the instruction pointer to a label, or directly to a line without labels.
    fn jump(&mut self, c: u16) -> Result<(), Fault> {
        if !self.labels {
            self.instruction_pointer = c as usize;
            return Ok(());
        }
        let line = *self
            .memory
            .labels
            .get(&c)
            .ok_or(Fault::UndefinedLabel { id: c })?;
        self.touched.taken_label = Some(c);
        self.instruction_pointer = line;
        Ok(())
    }

    fn target(&self, c: u16) -> Target {
        if self.labels {
            Target::Label {
                id: c,
                line: self.memory.labels.get(&c).copied(),
            }
        } else {
            Target::Line(c)
        }
    }

    // Data access

    /// Data address of `id` plus `offset`, where `id` is a symbol if labels are enabled.
    fn resolve(&self, id: u16, offset: i64) -> Result<usize, Fault> {
        if !self.labels {
            let address = id as i64 + offset;
            if !(0..MEMORY_MAX as i64).contains(&address) {
                return Err(Fault::AddressOutOfRange { address });
            }
            return Ok(address as usize);
        }
        let symbol = self
            .memory
            .symbols
            .get(&id)
            .ok_or(Fault::UndeclaredSymbol { id })?;
        if offset < 0 || offset as usize >= symbol.size {
            return Err(Fault::OffsetOutOfBounds { offset, id });
        }
        Ok(symbol.base + offset as usize)
    }

    fn read(&mut self, id: u16) -> Result<i64, Fault> {
        self.read_at(id, 0)
    }

    fn read_at(&mut self, id: u16, offset: i64) -> Result<i64, Fault> {
        let address = self.resolve(id, offset)?;
        if self.labels {
            self.touched.read_symbols.insert(id);
        }
        self.memory
            .data
            .get(address)
            .ok_or(Fault::Uninitialized { address })
    }

    fn write(&mut self, id: u16, value: i64) -> Result<usize, Fault> {
        self.write_at(id, 0, value)
    }

    fn write_at(&mut self, id: u16, offset: i64, value: i64) -> Result<usize, Fault> {
        let address = self.resolve(id, offset)?;
        if self.labels {
            self.touched.written_symbol = Some(id);
        }
        self.memory.data.set(address, value);
        self.touched.written_address = Some(address);
        Ok(address)
    }

    // Cursor

    /// Whether the program has run to its end card.
    ///
    /// The executed line must be past line 0, so a program which halts on its very first line
    /// never counts as complete.
    pub fn is_complete(&self) -> bool {
        self.last_instruction_pointer.is_some_and(|line| {
            line > 0 && self.memory.program.get(line).is_some_and(Card::is_halt)
        })
    }

    pub fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }

    pub fn last_instruction_pointer(&self) -> Option<usize> {
        self.last_instruction_pointer
    }

    // Breakpoints

    pub fn set_breakpoint(&mut self, line: usize) -> BreakpointChange {
        if line >= self.program_size() {
            BreakpointChange::OutOfRange(line)
        } else if self.breakpoints.insert(line) {
            BreakpointChange::Set(line)
        } else {
            BreakpointChange::AlreadySet(line)
        }
    }

    pub fn remove_breakpoint(&mut self, line: usize) -> BreakpointChange {
        if self.breakpoints.remove(line) {
            BreakpointChange::Removed(line)
        } else {
            BreakpointChange::NotSet(line)
        }
    }

    pub fn toggle_breakpoint(&mut self, line: usize) -> BreakpointChange {
        if self.breakpoints.contains(line) {
            self.remove_breakpoint(line)
        } else {
            self.set_breakpoint(line)
        }
    }

    pub fn has_breakpoint(&self, line: usize) -> bool {
        self.breakpoints.contains(line)
    }

    pub fn breakpoint_at_pointer(&self) -> bool {
        self.breakpoints.contains(self.instruction_pointer)
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    // Introspection

    pub fn labels_enabled(&self) -> bool {
        self.labels
    }

    pub fn file_name(&self) -> &str {
        self.file.as_deref().unwrap_or(UNNAMED_SOURCE)
    }

    pub fn data(&self, address: usize) -> Option<i64> {
        self.memory.data.get(address)
    }

    pub fn used_data_locations(&self) -> impl Iterator<Item = usize> + '_ {
        self.memory.data.used().iter().copied()
    }

    pub fn input(&self, index: usize) -> Option<i64> {
        self.memory.input.get(index)
    }

    /// Index of the next input card to be read.
    pub fn input_cursor(&self) -> usize {
        self.memory.input.cursor()
    }

    pub fn input_size(&self) -> usize {
        self.memory.input.len()
    }

    pub fn program_size(&self) -> usize {
        self.memory.program.len()
    }

    pub fn program_card(&self, line: usize) -> Option<&Card> {
        self.memory.program.get(line)
    }

    /// 1-based line in the source file of a program line.
    pub fn source_line(&self, line: usize) -> Option<usize> {
        self.memory.program.source_line(line)
    }

    pub fn label_table(&self) -> &FxMap<u16, usize> {
        &self.memory.labels
    }

    pub fn symbol_table(&self) -> &FxMap<u16, Symbol> {
        &self.memory.symbols
    }

    pub fn symbol_size(&self, id: u16) -> Option<usize> {
        self.memory.symbols.get(&id).map(|symbol| symbol.size)
    }

    pub fn touched(&self) -> &Touched {
        &self.touched
    }
}

/// Check a computed value fits in a data word.
fn bounded(result: i128) -> Result<i64, Fault> {
    if result > VALUE_MAX as i128 {
        Err(Fault::Overflow { result })
    } else if result < -(VALUE_MAX as i128) {
        Err(Fault::Underflow { result })
    } else {
        Ok(result as i64)
    }
}

/// Floor of the square root of a non-negative value.
fn isqrt(value: i64) -> i64 {
    let mut root = (value as f64).sqrt() as i64;
    while root * root > value {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= value {
        root += 1;
    }
    root
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(line) => write!(f, "line {}", line),
            Self::Label {
                id,
                line: Some(line),
            } => write!(f, "label {} (line {})", id, line),
            Self::Label { id, line: None } => write!(f, "label {}", id),
        }
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Instruction { opn1, opn2, opn3, .. } = self.instruction;

        let outcome = |taken: bool| if taken { "true:" } else { "false: don't" };

        match &self.effect {
            Effect::Move { value } => write!(f, "Move {} into {}", value, opn3),
            Effect::Arithmetic {
                operator,
                lhs,
                rhs,
                result,
            } => {
                let symbol = match operator {
                    Arithmetic::Add => "+",
                    Arithmetic::Subtract => "-",
                    Arithmetic::Multiply => "*",
                    Arithmetic::Divide => "/",
                };
                write!(f, "{} {} {} = {} into {}", lhs, symbol, rhs, result, opn3)
            }
            Effect::Square { value, result } => {
                write!(f, "{} squared = {} into {}", value, result, opn3)
            }
            Effect::Root { value, result } => {
                write!(f, "Square root of {} = {} into {}", value, result, opn3)
            }
            Effect::Branch {
                comparison,
                lhs,
                rhs,
                taken,
                target,
            } => {
                let symbol = match comparison {
                    Comparison::Equal => "==",
                    Comparison::Unequal => "!=",
                    Comparison::GreaterEqual => ">=",
                    Comparison::Less => "<",
                };
                write!(
                    f,
                    "{} {} {} is {} go to {}",
                    lhs,
                    symbol,
                    rhs,
                    outcome(*taken),
                    target
                )
            }
            Effect::FromArray { offset, value, .. } => {
                write!(f, "Move {} from {}[{}] into {}", value, opn1, offset, opn3)
            }
            Effect::ToArray { value, offset, .. } => {
                write!(f, "Move {} from {} into {}[{}]", value, opn1, opn2, offset)
            }
            Effect::IncrementTest {
                value,
                bound,
                taken,
                target,
            } => write!(
                f,
                "Increment {} and test: {} < {} is {} go to {}",
                opn1,
                value,
                bound,
                outcome(*taken),
                target
            ),
            Effect::Label { id } => write!(f, "--- Label {} ---", id),
            Effect::Read { value } => write!(f, "Read {} into {}", value, opn3),
            Effect::Print { value } => write!(f, "Print {} from {}", value, opn1),
            Effect::Halt => write!(f, "End program"),
        }
    }
}
