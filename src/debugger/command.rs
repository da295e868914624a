use std::fmt;

/// Operator command, read between steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    /// Execute the next instruction.
    Step,
    /// Run until a breakpoint or the end of the program.
    Continue,
    /// As `Continue`, printing every instruction.
    Trace,
    Quit,
    /// Set or unset a breakpoint on a program line.
    Toggle { line: usize },
    BreakList,
    /// Print every written data location.
    Memory,
    /// Reload the file, keeping breakpoints.
    Reload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandError {
    Unknown { name: String },
    /// Breakpoint line did not fit in `usize`.
    InvalidLine { text: String },
    UnexpectedArgument { name: &'static str },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Step => "step",
            Self::Continue => "continue",
            Self::Trace => "debug",
            Self::Quit => "quit",
            Self::Toggle { .. } => "break",
            Self::BreakList => "break list",
            Self::Memory => "memory",
            Self::Reload => "reload",
        }
    }
}

impl TryFrom<&str> for Command {
    type Error = CommandError;

    /// An empty line is a step.
    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            return Ok(Self::Step);
        };

        let command = if first.starts_with(|ch: char| ch.is_ascii_digit()) {
            let line = first.parse().map_err(|_| CommandError::InvalidLine {
                text: first.to_string(),
            })?;
            Self::Toggle { line }
        } else {
            match first.to_lowercase().as_str() {
                "h" | "help" => Self::Help,
                "s" | "step" => Self::Step,
                "c" | "continue" => Self::Continue,
                "d" | "debug" => Self::Trace,
                "q" | "quit" => Self::Quit,
                "b" | "break" => Self::BreakList,
                "m" | "memory" => Self::Memory,
                "r" | "reload" => Self::Reload,
                _ => {
                    return Err(CommandError::Unknown {
                        name: first.to_string(),
                    })
                }
            }
        };

        if words.next().is_some() {
            return Err(CommandError::UnexpectedArgument {
                name: command.name(),
            });
        }
        Ok(command)
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown { name } => write!(f, "Not a command: `{}`.", name),
            Self::InvalidLine { text } => write!(f, "Not a valid program line: `{}`.", text),
            Self::UnexpectedArgument { name } => {
                write!(f, "Command `{}` takes no arguments.", name)
            }
        }
    }
}

pub const HELP: &str = "\
Commands:
  <enter>, s    step one instruction
  c             continue until a breakpoint or the end
  d             continue, printing each instruction
  <line>        set or unset a breakpoint on a program line
  b             list breakpoints
  m             show data memory
  r             reload the file
  h             show this help
  q             quit";
