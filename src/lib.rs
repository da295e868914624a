// Loading
mod card;
pub use card::{parse_card, Card, MalformedCard, BOUNDARY_CARD, HALT_CARD};
mod memory;
pub use memory::{FxMap, Symbol};
mod loader;
pub use loader::{LabelScan, Transcript};

// Running
mod instruction;
pub use instruction::{Instruction, Operation, Sign};
mod runtime;
pub use runtime::{Arithmetic, Comparison, Effect, Interpreter, StepResult, Target, Touched};
mod breakpoint;
pub use breakpoint::{BreakpointChange, Breakpoints};
#[macro_use]
mod output;
pub use output::{Condition, Output};
mod debugger;
pub use debugger::{Debugger, DebuggerOptions, Outcome};

pub mod error;
pub mod export;

pub mod env;

/// Number of slots in each of the data, program, and input stores.
pub const MEMORY_MAX: usize = 1000;
/// Largest magnitude a data word may hold.
pub const VALUE_MAX: i64 = 9_999_999_999;
/// Most labels a program may define.
pub const MAX_LABELS: usize = 100;
/// Largest label id.
pub const MAX_LABEL_ID: u16 = 99;
