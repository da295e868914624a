use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::Result;

use cardvm::{Debugger, DebuggerOptions, Interpreter, Outcome, Output};

/// cardvm loads and runs programs written as ten-digit instruction cards.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a card file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a card file to completion and print its output
    Run {
        /// Card file to run
        name: PathBuf,
        /// Use symbolic data and program labels
        #[arg(short, long)]
        labels: bool,
        /// Print every instruction as it executes
        #[arg(short, long)]
        trace: bool,
        /// Pause on this program line, reading debugger commands from stdin
        #[arg(short, long = "break", value_name = "LINE")]
        breakpoints: Vec<usize>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Step through a card file with the line-mode debugger
    Debug {
        /// Card file to debug
        name: PathBuf,
        /// Use symbolic data and program labels
        #[arg(short, long)]
        labels: bool,
        /// Read debugger commands from argument
        #[arg(short, long)]
        command: Option<String>,
        /// Set a breakpoint before starting
        #[arg(short, long = "break", value_name = "LINE")]
        breakpoints: Vec<usize>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Write a card file with comments and blank lines removed
    Export {
        /// Card file to clean
        name: PathBuf,
        /// Destination file, defaults to `<name>.cards`
        dest: Option<PathBuf>,
    },
    /// Load a card file without running it
    Check {
        /// File to check
        name: PathBuf,
        /// Use symbolic data and program labels
        #[arg(short, long)]
        labels: bool,
        /// Print the load transcript
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    cardvm::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(2)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        let Some(path) = args.path else {
            println!("\n~ cardvm v{VERSION} ~");
            println!("{SHORT_INFO}");
            return Ok(());
        };
        let debugger = DebuggerOptions {
            run: true,
            ..Default::default()
        };
        return run(
            &path,
            RunOptions {
                debugger,
                ..Default::default()
            },
        );
    };

    match command {
        Command::Run {
            name,
            labels,
            trace,
            breakpoints,
            minimal,
        } => run(
            &name,
            RunOptions {
                labels,
                breakpoints,
                minimal,
                debugger: DebuggerOptions {
                    labels,
                    run: true,
                    trace,
                    ..Default::default()
                },
            },
        ),
        Command::Debug {
            name,
            labels,
            command,
            breakpoints,
            minimal,
        } => run(
            &name,
            RunOptions {
                labels,
                breakpoints,
                minimal,
                debugger: DebuggerOptions {
                    command,
                    labels,
                    ..Default::default()
                },
            },
        ),
        Command::Export { name, dest } => {
            let dest = dest.unwrap_or_else(|| name.with_extension("cards"));
            file_message(Green, "Exporting", &name);
            let count = cardvm::export::export_file(&name, &dest)?;
            message(Green, "Finished", &format!("{} cards", count));
            file_message(Green, "Saved", &dest);
            Ok(())
        }
        Command::Check {
            name,
            labels,
            verbose,
        } => {
            file_message(Green, "Checking", &name);
            let mut interpreter = Interpreter::new();
            let transcript =
                interpreter.read_file(&name, labels, cardvm::env::is_label_detection_enabled())?;
            if verbose {
                println!("{}", transcript);
            }
            message(
                Green,
                "Success",
                &format!(
                    "{} program cards, {} input cards, labels {}",
                    interpreter.program_size(),
                    interpreter.input_size(),
                    if interpreter.labels_enabled() {
                        "enabled"
                    } else {
                        "disabled"
                    }
                ),
            );
            Ok(())
        }
    }
}

#[derive(Default)]
struct RunOptions {
    labels: bool,
    breakpoints: Vec<usize>,
    minimal: bool,
    debugger: DebuggerOptions,
}

fn run(name: &Path, options: RunOptions) -> Result<()> {
    let minimal = options.minimal || cardvm::env::is_minimal_forced();
    Output::set_minimal(minimal);

    if !minimal {
        file_message(MsgColor::Green, "Loading", name);
    }
    if !name.exists() {
        miette::bail!("File does not exist. Exiting...");
    }
    let mut interpreter = Interpreter::new();
    interpreter.read_file(
        name,
        options.labels,
        cardvm::env::is_label_detection_enabled(),
    )?;

    for line in options.breakpoints {
        let change = interpreter.set_breakpoint(line);
        if !change.changed() {
            message(MsgColor::Red, "Warning", &change.to_string());
        }
    }

    if !minimal {
        message(MsgColor::Green, "Running", "program cards");
    }
    let outcome = Debugger::new(options.debugger, &mut interpreter).run()?;

    if !minimal {
        match outcome {
            Outcome::Completed => file_message(MsgColor::Green, "Completed", name),
            Outcome::Halted => file_message(MsgColor::Cyan, "Halted", name),
            Outcome::Quit => file_message(MsgColor::Cyan, "Stopped", name),
        }
    }
    Ok(())
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    eprintln!("{left:>12} {right}");
}

const SHORT_INFO: &str = r"
Welcome to cardvm, an interpreter and step debugger for card-deck programs.
Please use `-h` or `--help` to access the usage instructions.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
