use std::cell::RefCell;
use std::str::Chars;

use colored::{ColoredString, Colorize};

use crate::runtime::{Interpreter, StepResult};

#[macro_export]
macro_rules! dprintln {
    ( $cond:expr ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        $crate::output::Output::Debugger($cond).print_str("\n");
    }};
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        let s = format!(
            concat!($fmt, "\n")
            $($tt)*
        );
        $crate::output::Output::Debugger($cond).print_str(&s);
    }};
    // Trigger type error if missing condition
    ( $fmt:literal $($tt:tt)* ) => {{
        $crate::output::Output::Debugger($fmt);
    }};
}

/// Destination of console text.
///
/// `Normal` is program output on stdout. `Debugger` is driver text on stderr.
#[derive(Clone, Copy, Debug)]
pub enum Output {
    Normal,
    Debugger(Condition),
}

/// Whether debugger text is still printed in minimal mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    Sometimes,
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

impl Output {
    thread_local! {
        static IS_LINE_START: RefCell<bool> = const { RefCell::new(true) };
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_line_start(new_value: bool) -> bool {
        Self::IS_LINE_START.with(|value| value.replace(new_value))
    }
    fn is_line_start() -> bool {
        Self::IS_LINE_START.with(|value| *value.borrow())
    }
    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }
    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    fn set_line_start_from_str(string: &str) {
        if let Some(ch) = Decolored::new(string).last() {
            Output::set_line_start(ch == '\n');
        }
    }

    pub fn print_str(&self, string: &str) {
        match self {
            Self::Normal => {
                print!("{}", string);
                Self::set_line_start_from_str(string);
            }
            Self::Debugger(condition) => match (Self::is_minimal(), *condition) {
                (false, _) => {
                    eprint!("{}", ColoredString::from(string).blue());
                    Self::set_line_start_from_str(string);
                }
                // Always remove color if `--minimal`
                (true, Condition::Always) => {
                    eprint_colorless(string);
                    Self::set_line_start_from_str(string);
                }
                (true, Condition::Sometimes) => (),
            },
        }
    }

    pub fn start_new_line(&self) {
        if !Self::is_line_start() {
            self.print_str("\n");
        }
    }

    /// Value produced by a print instruction.
    pub fn print_value(&self, value: i64) {
        self.start_new_line();
        self.print_str(&format!("{}\n", value));
    }

    /// Single trace line for an executed instruction.
    pub fn print_step(&self, result: &StepResult) {
        if Self::is_minimal() {
            self.print_str(&format!("{}\t{}\n", result.line, result));
            return;
        }
        self.print_str(&format!(
            "\x1b[2m{:>4}\x1b[0m  \x1b[1m{}\x1b[0m  {}\n",
            result.line, result.instruction, result
        ));
    }

    /// Line at the instruction pointer, with its breakpoint marker.
    pub fn print_position(&self, interpreter: &Interpreter) {
        let line = interpreter.instruction_pointer();
        let Some(card) = interpreter.program_card(line) else {
            self.print_str(&format!("Line {} is past the end of the program\n", line));
            return;
        };
        let marker = if interpreter.has_breakpoint(line) { "*" } else { " " };
        if Self::is_minimal() {
            self.print_str(&format!("{}{}\t{}\n", marker, line, card));
            return;
        }
        self.print_str(&format!(
            "\x1b[1;31m{}\x1b[0m\x1b[1m{:>4}\x1b[0m  {}\n",
            marker, line, card
        ));
    }

    /// Every data location which has been written, with symbol names in label mode.
    pub fn print_memory(&self, interpreter: &Interpreter) {
        let owner = |address: usize| {
            interpreter
                .symbol_table()
                .iter()
                .find(|(_, symbol)| (symbol.base..symbol.base + symbol.size).contains(&address))
                .map(|(id, symbol)| (*id, address - symbol.base))
        };

        if !Self::is_minimal() {
            self.print_str("\x1b[2m Index          Value\x1b[0m\n");
        }
        for address in interpreter.used_data_locations() {
            let Some(value) = interpreter.data(address) else {
                continue;
            };
            let name = match owner(address) {
                Some((id, 0)) if interpreter.labels_enabled() => format!("  ({})", id),
                Some((id, offset)) if interpreter.labels_enabled() => {
                    format!("  ({}[{}])", id, offset)
                }
                _ => String::new(),
            };
            let highlight = interpreter.touched().written_address == Some(address);
            if Self::is_minimal() {
                self.print_str(&format!("{}\t{}{}\n", address, value, name));
            } else if highlight {
                self.print_str(&format!(
                    "\x1b[1;33m{:>6}  {:>12}{}\x1b[0m\n",
                    address, value, name
                ));
            } else {
                self.print_str(&format!("{:>6}  {:>12}{}\n", address, value, name));
            }
        }
        if interpreter.input_size() > 0 {
            self.print_str(&format!(
                "Next input card: {} of {}\n",
                interpreter.input_cursor(),
                interpreter.input_size()
            ));
        }
    }

    pub fn print_breakpoints(&self, interpreter: &Interpreter) {
        let breakpoints = interpreter.breakpoints();
        if breakpoints.is_empty() {
            self.print_str("No breakpoints set\n");
            return;
        }
        let list: Vec<String> = breakpoints.iter().map(|line| line.to_string()).collect();
        self.print_str(&format!("Breakpoints: {}\n", list.join(", ")));
    }
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

fn eprint_colorless(string: &str) {
    let string: String = Decolored::new(string).collect();
    eprint!("{}", string);
}
