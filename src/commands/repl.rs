use std::io::{self, BufRead, Write};
use log::debug;
use spi_core::{evaluate_expression, run_source, RunOptions};

const PROMPT: &str = "spi> ";

/// Reads one line at a time: a line starting with `PROGRAM` runs as a whole
/// program, anything else is evaluated as an expression. Errors are printed
/// and the loop keeps going; `exit`, `quit` or end of input stop it.
pub fn repl(options: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "{}", PROMPT)?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        match evaluate_line(input, options) {
            Ok(output) => writeln!(stdout, "{}", output)?,
            Err(e) => writeln!(stdout, "{}", e)?,
        }
    }

    debug!("REPL finished");
    Ok(())
}

fn evaluate_line(input: &str, options: &RunOptions) -> spi_core::Result<String> {
    let is_program = input
        .split_whitespace()
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case("PROGRAM"));

    if is_program {
        let outcome = run_source(input, options)?;
        Ok(outcome
            .memory
            .iter()
            .map(|(name, value)| format!("{} = {}", name, value))
            .collect::<Vec<_>>()
            .join("\n"))
    } else {
        evaluate_expression(input).map(|value| value.to_string())
    }
}
