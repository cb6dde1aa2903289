use std::io::{self, Write};
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use terminal_size::{Width, Height, terminal_size};

use crate::mcp::ToolDescriptor;

/// Width of the separator printed after each answer.
const SEPARATOR_WIDTH: usize = 50;

pub fn print_header(store: &str, model: &str) {
    let (width, _) = terminal_size().unwrap_or((Width(80), Height(24)));
    let width = width.0 as usize;

    let line = "─".repeat(width);
    println!("{}", line.black().bold());

    let name = "Shopkeep".yellow().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();
    println!("  🛒 {} {}", name, version);

    let info = format!("  {}  •  {}", store, model).cyan();
    println!("{}", info);

    println!("{}", line.black().bold());
}

pub fn write_tools<W: Write>(out: &mut W, tools: &[ToolDescriptor]) -> io::Result<()> {
    write_step(out, &format!("{} tools available", tools.len()))?;
    for tool in tools {
        if tool.description.is_empty() {
            writeln!(out, "    {}", tool.name.cyan())?;
        } else {
            writeln!(out, "    {} {}", tool.name.cyan(), first_line(&tool.description).black().bold())?;
        }
    }
    Ok(())
}

pub fn write_step<W: Write>(out: &mut W, msg: &str) -> io::Result<()> {
    writeln!(out, "  {} {}", "•".green(), msg)
}

pub fn write_success<W: Write>(out: &mut W, msg: &str) -> io::Result<()> {
    writeln!(out, "  {} {}", "✓".green().bold(), msg.green())
}

pub fn print_error(msg: &str) {
    eprintln!("  {} {}", "❌".red().bold(), msg.red());
}

/// Spinner shown on stderr while a turn is in flight.
pub fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("  {spinner:.magenta} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Plain separator line between answers.
pub fn separator() -> String {
    "=".repeat(SEPARATOR_WIDTH)
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}
