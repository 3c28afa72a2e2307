//! Status lines for the terminal
//!
//! Tagged, colored messages on stderr, so replies on stdout stay clean
//! for piping.

use colored::*;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Info,
  Warn,
  Ready,
}

impl Level {
  fn tag(self) -> &'static str {
    match self {
      Level::Info => "info",
      Level::Warn => "warn",
      Level::Ready => "ready",
    }
  }

  fn color(self) -> Color {
    match self {
      Level::Info => Color::Blue,
      Level::Warn => Color::Yellow,
      Level::Ready => Color::Green,
    }
  }
}

/// Tag every line of `message`, padding tags so messages line up
fn status_lines(level: Level, message: &str) -> Vec<String> {
  let tag = format!("{:>5}", level.tag()).color(level.color()).bold();
  message.lines().map(|line| format!("{tag} {line}")).collect()
}

pub fn status(level: Level, message: &str) {
  for line in status_lines(level, message) {
    eprintln!("{line}");
  }
}

pub fn info(message: &str) {
  status(Level::Info, message);
}

pub fn warn(message: &str) {
  status(Level::Warn, message);
}

pub fn ready(message: &str) {
  status(Level::Ready, message);
}

/// Shown whenever no table could be loaded
pub fn empty_state(dir: &Path) {
  warn(&format!(
    "No property data loaded. Put the listing CSV files in {} (or pass --data-dir).",
    dir.display()
  ));
}
