use std::io::{self, BufRead, IsTerminal, Write};
use std::ops::Range;

use crate::dprintln;

/// Where operator commands come from.
#[derive(Debug)]
pub enum CommandSource {
    Argument(Argument),
    Stdin(Stdin),
    Terminal(Terminal),
}

/// Command-line argument. Commands are separated by newlines or `;`.
#[derive(Debug)]
pub struct Argument {
    buffer: String,
    /// Byte index
    cursor: usize,
}

/// Stdin which is not attached to a terminal, i.e. piped.
#[derive(Debug)]
pub struct Stdin {
    stdin: io::StdinLock<'static>,
    buffer: String,
    cursor: usize,
}

/// Interactive terminal, read a line at a time.
#[derive(Debug)]
pub struct Terminal {
    term: console::Term,
    buffer: String,
    cursor: usize,
}

pub trait SourceRead {
    /// `None` indicates EOF.
    ///
    /// Returned string slice may include leading or trailing whitespace.
    fn read(&mut self) -> Option<&str>;
}

impl CommandSource {
    pub fn from(argument: Option<String>) -> Self {
        if let Some(argument) = argument {
            return Self::Argument(Argument::from(argument));
        }
        let stdin = io::stdin();
        if stdin.is_terminal() {
            return Self::Terminal(Terminal::new());
        }
        Self::Stdin(Stdin::new(stdin.lock()))
    }
}

impl SourceRead for CommandSource {
    fn read(&mut self) -> Option<&str> {
        let command = match self {
            Self::Argument(argument) => argument.read(),
            Self::Stdin(stdin) => stdin.read(),
            // Terminal echoes its own input
            Self::Terminal(terminal) => return terminal.read(),
        };
        if let Some(command) = command {
            dprintln!(Sometimes, "\x1b[1mCommand:\x1b[0m {}", command.trim());
        }
        command
    }
}

/// Byte range of the next command in `buffer`, starting at `cursor`.
///
/// Returns `None` once the buffer is used up. A trailing delimiter does not produce an empty
/// command.
fn next_command(buffer: &str, cursor: &mut usize) -> Option<Range<usize>> {
    if *cursor > buffer.len() || (*cursor == buffer.len() && *cursor > 0) {
        return None;
    }
    let start = *cursor;
    let end = buffer[start..]
        .find(['\n', ';'])
        .map_or(buffer.len(), |index| start + index);
    *cursor = end + 1;
    Some(start..end)
}

impl Argument {
    pub fn from(buffer: String) -> Self {
        Self { buffer, cursor: 0 }
    }
}

impl SourceRead for Argument {
    fn read(&mut self) -> Option<&str> {
        let range = next_command(&self.buffer, &mut self.cursor)?;
        Some(&self.buffer[range])
    }
}

impl Stdin {
    pub fn new(stdin: io::StdinLock<'static>) -> Self {
        Self {
            stdin,
            buffer: String::new(),
            // Start exhausted, so the first read fetches a line
            cursor: usize::MAX,
        }
    }

    /// Returns `false` on EOF or a read error.
    fn read_line(&mut self) -> bool {
        self.buffer.clear();
        self.cursor = 0;
        match self.stdin.read_line(&mut self.buffer) {
            Ok(0) | Err(_) => false,
            Ok(_) => {
                let len = self.buffer.trim_end_matches(['\r', '\n']).len();
                self.buffer.truncate(len);
                true
            }
        }
    }
}

impl SourceRead for Stdin {
    fn read(&mut self) -> Option<&str> {
        let range = match next_command(&self.buffer, &mut self.cursor) {
            Some(range) => range,
            None => {
                if !self.read_line() {
                    return None;
                }
                next_command(&self.buffer, &mut self.cursor)?
            }
        };
        Some(&self.buffer[range])
    }
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            term: console::Term::stdout(),
            buffer: String::new(),
            cursor: usize::MAX,
        }
    }

    /// Returns `false` if the terminal could not be read.
    fn read_line(&mut self) -> bool {
        let prompt = format!("\x1b[1;{}mCommand: \x1b[0m", super::DEBUGGER_COLOR);
        if write!(self.term, "{}", prompt).is_err() || self.term.flush().is_err() {
            return false;
        }
        match self.term.read_line() {
            Ok(line) => {
                self.buffer = line;
                self.cursor = 0;
                true
            }
            Err(_) => false,
        }
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRead for Terminal {
    fn read(&mut self) -> Option<&str> {
        let range = match next_command(&self.buffer, &mut self.cursor) {
            Some(range) => range,
            None => {
                if !self.read_line() {
                    return None;
                }
                next_command(&self.buffer, &mut self.cursor)?
            }
        };
        Some(&self.buffer[range])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands(argument: &str) -> Vec<String> {
        let mut source = Argument::from(argument.to_string());
        let mut commands = Vec::new();
        while let Some(command) = source.read() {
            commands.push(command.to_string());
        }
        commands
    }

    #[test]
    fn argument_delimiters() {
        assert_eq!(commands("3;c"), ["3", "c"]);
        assert_eq!(commands("s\ns\nq"), ["s", "s", "q"]);
        assert_eq!(commands(" 2 ; d "), [" 2 ", " d "]);
    }

    #[test]
    fn empty_commands_are_steps() {
        assert_eq!(commands(";;q"), ["", "", "q"]);
        assert_eq!(commands("q;"), ["q"]);
        assert_eq!(commands(""), [""]);
    }
}
