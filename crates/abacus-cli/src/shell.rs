//! Read-eval loop over a line-oriented input
//!
//! Every arithmetic command maps one-to-one onto [`Calculator::perform`].
//! Engine errors are printed and the session continues; only I/O failures on
//! the shell's own streams end it early.

use abacus_core::{CalculationRecord, Calculator, calculation::COLUMNS, operation_names};
use std::io::{self, BufRead, Write};
use tracing::debug;

const PROMPT: &str = "abacus> ";

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Calculate { operation: String, a: String, b: String },
    History,
    Clear,
    Undo,
    Redo,
    Save,
    Load,
    Help,
    Exit,
    Empty,
    Unknown(String),
}

/// Parses one input line; keywords ignore case
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    match line.to_ascii_lowercase().as_str() {
        "exit" | "quit" => return Command::Exit,
        "help" | "h" | "?" => return Command::Help,
        "history" => return Command::History,
        "clear" => return Command::Clear,
        "undo" => return Command::Undo,
        "redo" => return Command::Redo,
        "save" => return Command::Save,
        "load" => return Command::Load,
        _ => {}
    }

    match line.split_whitespace().collect::<Vec<_>>().as_slice() {
        [operation, a, b] => Command::Calculate {
            operation: operation.to_string(),
            a: a.to_string(),
            b: b.to_string(),
        },
        _ => Command::Unknown(line.to_string()),
    }
}

/// Help text listing every command
pub fn help_text() -> String {
    let operations = operation_names().collect::<Vec<_>>().join(", ");
    format!(
        "Available commands:\n  \
         {operations} <a> <b> - Perform calculations\n  \
         history - Show calculation history\n  \
         clear - Clear calculation history\n  \
         undo - Undo the last calculation\n  \
         redo - Redo the last undone calculation\n  \
         save - Save calculation history to file\n  \
         load - Load calculation history from file\n  \
         help - Show this help\n  \
         exit - Exit the calculator\n"
    )
}

/// Renders the history view as an aligned table
pub fn format_history(rows: &[CalculationRecord]) -> String {
    let cells: Vec<[&str; 5]> = rows
        .iter()
        .map(|r| [&r.operation, &r.operand1, &r.operand2, &r.result, &r.timestamp].map(String::as_str))
        .collect();

    let mut widths = COLUMNS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |row: [&str; 5]| {
        row.iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:>width$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    let mut table = line(COLUMNS);
    for row in cells {
        table.push('\n');
        table.push_str(&line(row));
    }
    table
}

/// Runs the loop until `exit` or end of input
pub fn run<R: BufRead, W: Write>(calc: &mut Calculator, input: R, mut output: W) -> io::Result<()> {
    let mut lines = input.lines();
    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let Some(line) = lines.next() else {
            writeln!(output, "\nExiting.")?;
            break;
        };
        let command = parse_command(&line?);
        debug!(?command, "Shell command");

        if command == Command::Exit {
            writeln!(output, "Goodbye!")?;
            break;
        }
        execute(calc, command, &mut output)?;
    }
    Ok(())
}

fn execute<W: Write>(calc: &mut Calculator, command: Command, output: &mut W) -> io::Result<()> {
    match command {
        Command::Calculate { operation, a, b } => match calc.perform(&operation, &a, &b) {
            Ok(result) => writeln!(output, "{operation}({a}, {b}) = {result}"),
            Err(e) => writeln!(output, "Error: {e}"),
        },
        Command::History => {
            let rows = calc.history_view();
            if rows.is_empty() {
                writeln!(output, "No history.")
            } else {
                writeln!(output, "{}", format_history(&rows))
            }
        }
        Command::Clear => {
            calc.clear();
            writeln!(output, "History cleared.")
        }
        Command::Undo => {
            let message = if calc.undo() { "Undone." } else { "Nothing to undo." };
            writeln!(output, "{message}")
        }
        Command::Redo => {
            let message = if calc.redo() { "Redone." } else { "Nothing to redo." };
            writeln!(output, "{message}")
        }
        Command::Save => match calc.save_history() {
            Ok(path) => writeln!(output, "Saved to: {}", path.display()),
            Err(e) => writeln!(output, "Error: {e}"),
        },
        Command::Load => match calc.load_history() {
            Ok(()) => writeln!(output, "History loaded ({} records).", calc.len()),
            Err(e) => writeln!(output, "Error: {e}"),
        },
        Command::Help => writeln!(output, "\n{}", help_text()),
        Command::Empty | Command::Exit => Ok(()),
        Command::Unknown(_) => writeln!(output, "Unknown command. Type 'help'."),
    }
}
