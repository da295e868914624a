mod command;
mod source;

use miette::Result;

use self::command::{Command, HELP};
use self::source::{CommandSource, SourceRead};
use crate::output::{Condition, Output};
use crate::runtime::{Effect, Interpreter};
use crate::dprintln;

/// ANSI color code of debugger prompts.
const DEBUGGER_COLOR: u8 = 34;

#[derive(Debug, Default)]
pub struct DebuggerOptions {
    /// Read commands from this string instead of stdin.
    pub command: Option<String>,
    /// Passed on when reloading the file.
    pub labels: bool,
    /// Start running immediately, only pausing at breakpoints.
    pub run: bool,
    /// Print every instruction while running.
    pub trace: bool,
}

/// Line-mode driver which steps an interpreter under operator control.
pub struct Debugger<'a> {
    interpreter: &'a mut Interpreter,
    command_source: Option<CommandSource>,
    command: Option<String>,
    labels: bool,
    status: Status,

    /// Amount of instructions executed since last command.
    instruction_count: u32,
}

/// The current status of the debugger loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    /// Keep executing operator commands, until one changes the status.
    WaitForAction,
    /// Execute one instruction, printing it.
    Step,
    /// Execute until a breakpoint or the end of the program.
    Continue { trace: bool },
}

/// How a debugging session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Ran to the end card.
    Completed,
    /// Stopped on a halt which does not count as completion.
    Halted,
    /// Operator quit, or commands ran out.
    Quit,
}

impl<'a> Debugger<'a> {
    pub fn new(options: DebuggerOptions, interpreter: &'a mut Interpreter) -> Self {
        let status = if options.run {
            Status::Continue {
                trace: options.trace,
            }
        } else {
            Status::WaitForAction
        };
        Self {
            interpreter,
            // Opened lazily, so a program without breakpoints never touches stdin
            command_source: None,
            command: options.command,
            labels: options.labels,
            status,
            instruction_count: 0,
        }
    }

    pub fn run(&mut self) -> Result<Outcome> {
        if self.status != Status::WaitForAction && self.interpreter.breakpoint_at_pointer() {
            self.pause_at_breakpoint();
        }

        loop {
            match self.status {
                Status::WaitForAction => {
                    if let Some(outcome) = self.next_action()? {
                        return Ok(outcome);
                    }
                }
                Status::Step => {
                    self.status = Status::WaitForAction;
                    if let Some(outcome) = self.execute(true)? {
                        return Ok(outcome);
                    }
                }
                Status::Continue { trace } => {
                    if let Some(outcome) = self.execute(trace)? {
                        return Ok(outcome);
                    }
                    if self.interpreter.breakpoint_at_pointer() {
                        self.pause_at_breakpoint();
                    }
                }
            }
        }
    }

    fn pause_at_breakpoint(&mut self) {
        dprintln!(
            Always,
            "Reached breakpoint on line {}. Pausing execution.",
            self.interpreter.instruction_pointer()
        );
        self.status = Status::WaitForAction;
    }

    /// Execute a single instruction. Returns `Some` once the program has stopped.
    fn execute(&mut self, trace: bool) -> Result<Option<Outcome>> {
        let result = self.interpreter.step()?;
        self.instruction_count += 1;

        if trace {
            Output::Debugger(Condition::Always).print_step(&result);
        }
        if let Effect::Print { value } = result.effect {
            Output::Normal.print_value(value);
        }

        if !result.proceed || self.interpreter.is_complete() {
            self.report_count();
            if self.interpreter.is_complete() {
                dprintln!(Sometimes, "Program completed.");
                return Ok(Some(Outcome::Completed));
            }
            dprintln!(Always, "Program halted on line {}.", result.line);
            return Ok(Some(Outcome::Halted));
        }
        Ok(None)
    }

    fn report_count(&mut self) {
        if self.instruction_count > 0 {
            dprintln!(
                Sometimes,
                "Executed {} instruction{}.",
                self.instruction_count,
                if self.instruction_count == 1 { "" } else { "s" },
            );
            self.instruction_count = 0;
        }
    }

    fn next_action(&mut self) -> Result<Option<Outcome>> {
        Output::Debugger(Condition::Always).start_new_line();
        self.report_count();
        Output::Debugger(Condition::Sometimes).print_position(self.interpreter);

        // Convert `EOF` to `quit` command
        let command = self.next_command().unwrap_or(Command::Quit);

        match command {
            Command::Quit => return Ok(Some(Outcome::Quit)),
            Command::Help => dprintln!(Always, "{}", HELP),

            Command::Step => self.status = Status::Step,
            Command::Continue => {
                self.status = Status::Continue { trace: false };
                dprintln!(Sometimes, "Continuing...");
            }
            Command::Trace => {
                self.status = Status::Continue { trace: true };
                dprintln!(Sometimes, "Continuing with trace...");
            }

            Command::Toggle { line } => {
                let change = self.interpreter.toggle_breakpoint(line);
                dprintln!(Always, "{}", change);
            }
            Command::BreakList => {
                Output::Debugger(Condition::Always).print_breakpoints(self.interpreter)
            }
            Command::Memory => Output::Debugger(Condition::Always).print_memory(self.interpreter),

            Command::Reload => {
                let transcript = self.interpreter.reload(self.labels)?;
                for line in transcript.lines() {
                    dprintln!(Sometimes, "{}", line);
                }
                dprintln!(
                    Always,
                    "Reloaded {}. Breakpoints kept: {}.",
                    self.interpreter.file_name(),
                    self.interpreter.breakpoints().len()
                );
            }
        }

        Ok(None)
    }

    /// Returns `None` on EOF.
    fn next_command(&mut self) -> Option<Command> {
        let command = self.command.take();
        let source = self
            .command_source
            .get_or_insert_with(|| CommandSource::from(command));

        // Loop until valid command or EOF
        loop {
            let line = source.read()?;
            match Command::try_from(line) {
                Ok(command) => return Some(command),
                Err(error) => {
                    dprintln!(Always, "{}", error);
                    dprintln!(Always, "Type `h` for a list of commands.");
                }
            }
        }
    }
}
