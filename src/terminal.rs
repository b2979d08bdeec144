use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use crate::dispatcher::Dispatcher;
use crate::registry::{ModelEntry, Registry};

const GOODBYE: &str = "Goodbye!";

enum Selection<'a> {
    Exit,
    Invalid,
    Model(&'a ModelEntry),
}

fn parse_selection<'a>(registry: &'a Registry, input: &str) -> Selection<'a> {
    if input == "0" {
        return Selection::Exit;
    }

    input
        .parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
        .and_then(|index| registry.get(index))
        .map_or(Selection::Invalid, Selection::Model)
}

/// Reads one trimmed line, or `None` at end of input.
fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn print_menu(registry: &Registry, output: &mut impl Write) -> Result<()> {
    writeln!(output, "\nAvailable models:")?;
    writeln!(output, "0. Exit")?;
    for (idx, entry) in registry.entries().iter().enumerate() {
        writeln!(output, "{}. {}", idx + 1, entry.display_name)?;
    }
    Ok(())
}

fn prompt(output: &mut impl Write, text: &str) -> Result<()> {
    write!(output, "{text}")?;
    output.flush().context("Failed to flush output")
}

/// Menu loop: pick a model by number, ask one question, print the answer, repeat.
pub async fn run_terminal(
    dispatcher: &Dispatcher,
    mut input: impl BufRead,
    mut output: impl Write,
) -> Result<()> {
    let registry = dispatcher.registry();

    loop {
        print_menu(registry, &mut output)?;
        prompt(
            &mut output,
            "\nChoose a model (type the number or '0' to exit): ",
        )?;

        let Some(choice) = read_line(&mut input)? else {
            break;
        };
        let entry = match parse_selection(registry, &choice) {
            Selection::Exit => break,
            Selection::Invalid => {
                writeln!(
                    output,
                    "Invalid selection. Please choose a valid model number."
                )?;
                continue;
            }
            Selection::Model(entry) => entry,
        };

        prompt(&mut output, "You: ")?;
        let Some(question) = read_line(&mut input)? else {
            break;
        };
        if question.eq_ignore_ascii_case("quit") {
            break;
        }

        writeln!(output, "\nUser:\n{question}\n")?;
        writeln!(output, "Using {}", entry.backend.service())?;

        let answer = dispatcher.ask(&entry.display_name, &question).await?;
        writeln!(output, "\nAI ({}):\n", entry.backend.id())?;
        writeln!(output, "{}\n", answer.trim_end())?;
    }

    writeln!(output, "{GOODBYE}")?;
    output.flush().context("Failed to flush output")
}
