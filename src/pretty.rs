//! Terminal output: markdown pages, the chat prompt and progress spinners.
//!
//! Views and answers are markdown. They are printed with a `termimad` skin
//! (headers in bold cyan, inline code in yellow) so tables and lists line up in
//! the terminal.

use std::{
    error::Error,
    io::{Write, stdout},
    time::Duration,
};

use crossterm::{
    ExecutableCommand,
    style::{Attribute, Color, Print, SetAttribute, SetForegroundColor},
};
use indicatif::{ProgressBar, ProgressStyle};
use termimad::{MadSkin, crossterm::style::Color as MadColor};

/// The skin every page is printed with.
pub fn skin() -> MadSkin {
    let mut skin = MadSkin::default();
    for header in skin.headers.iter_mut() {
        header.set_fg(MadColor::Cyan);
        header.add_attr(termimad::crossterm::style::Attribute::Bold);
    }
    skin.inline_code.set_fg(MadColor::Yellow);
    skin.bold.set_fg(MadColor::White);
    skin
}

/// Print markdown text with the shared skin.
pub fn print_pretty(text: &str) -> Result<(), Box<dyn Error>> {
    skin().print_text(text);
    stdout().flush()?;
    Ok(())
}

/// Print the `Você:` prompt and leave the cursor in green for the user's input.
pub fn print_prompt() -> Result<(), Box<dyn Error>> {
    let mut out = stdout();
    out.execute(SetAttribute(Attribute::Bold))?;
    out.execute(Print("\nVocê: "))?;
    out.execute(SetAttribute(Attribute::Reset))?;
    out.execute(SetForegroundColor(Color::Green))?;
    out.flush()?;
    Ok(())
}

/// Restore the default colour after the user's input.
pub fn reset_colors() -> Result<(), Box<dyn Error>> {
    stdout().execute(SetForegroundColor(Color::Reset))?;
    Ok(())
}

/// A ticking spinner with `message`; call `finish_and_clear` when done.
pub fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
