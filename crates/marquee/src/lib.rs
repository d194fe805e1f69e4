//! ## Features
//!
//! - Leveled logging to stderr (info, warn, error, success)
//! - A small markup language for styled output: `<green>`, `<yellow>`,
//!   `<red>`, `<bold>`, `<soft>`, `<h1>`, `<link>`, `<cmd>`, `<reset>`
//! - `style()` renders markup as ANSI, `strip_tags()` removes it
//! - `tag_spans()` locates tags so callers can measure visible text
//!
//! ## Usage
//!
//! Logging functions: `info()`, `warn()`, `error()`, `success()`
//!
//! Output functions: `text()`, `error_block()`, `warning_block()`, `success_block()`

use colored::*;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static TAG_PATTERN: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"<(/?)([a-z][a-z0-9_]*)>").expect("tag pattern is valid"));

/// Markup tags understood by `style()` and removed by `strip_tags()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
  Green,
  Yellow,
  Red,
  Blue,
  Cyan,
  Magenta,
  Bold,
  Soft,
  Underline,
  H1,
  Link,
  Cmd,
  Error,
  Warning,
  Success,
  Reset,
}

impl Tag {
  pub fn from_name(name: &str) -> Option<Tag> {
    let tag = match name {
      "green" => Tag::Green,
      "yellow" => Tag::Yellow,
      "red" => Tag::Red,
      "blue" => Tag::Blue,
      "cyan" => Tag::Cyan,
      "magenta" => Tag::Magenta,
      "bold" => Tag::Bold,
      "soft" => Tag::Soft,
      "underline" => Tag::Underline,
      "h1" => Tag::H1,
      "link" => Tag::Link,
      "cmd" => Tag::Cmd,
      "error" => Tag::Error,
      "warning" => Tag::Warning,
      "success" => Tag::Success,
      "reset" => Tag::Reset,
      _ => return None,
    };
    Some(tag)
  }

  fn paint(self, text: ColoredString) -> ColoredString {
    match self {
      Tag::Green | Tag::Success => text.green(),
      Tag::Yellow | Tag::Warning => text.yellow(),
      Tag::Red | Tag::Error => text.red(),
      Tag::Blue => text.blue(),
      Tag::Cyan | Tag::Cmd => text.cyan(),
      Tag::Magenta => text.magenta(),
      Tag::Bold => text.bold(),
      Tag::Soft => text.dimmed(),
      Tag::Underline => text.underline(),
      Tag::H1 => text.bold().underline(),
      Tag::Link => text.blue().underline(),
      Tag::Reset => text.clear(),
    }
  }
}

/// Split markup into (active tags, text) segments
fn segments(markup: &str) -> Vec<(Vec<Tag>, String)> {
  let mut stack: Vec<Tag> = Vec::new();
  let mut out = Vec::new();
  let mut cursor = 0;

  for caps in TAG_PATTERN.captures_iter(markup) {
    let whole = caps.get(0).expect("group 0 always matches");
    let Some(tag) = Tag::from_name(&caps[2]) else {
      continue;
    };

    if whole.start() > cursor {
      out.push((stack.clone(), markup[cursor..whole.start()].to_string()));
    }
    cursor = whole.end();

    if caps[1].is_empty() {
      stack.push(tag);
    } else if let Some(pos) = stack.iter().rposition(|t| *t == tag) {
      stack.truncate(pos);
    }
  }

  if cursor < markup.len() {
    out.push((stack, markup[cursor..].to_string()));
  }
  out
}

/// Render markup tags as ANSI styling. Unknown tags are left untouched.
pub fn style(markup: &str) -> String {
  segments(markup)
    .into_iter()
    .map(|(tags, text)| {
      let active = match tags.iter().rposition(|t| *t == Tag::Reset) {
        Some(pos) => &tags[pos + 1..],
        None => &tags[..],
      };
      if active.is_empty() {
        return text;
      }
      active.iter().fold(text.normal(), |acc, tag| tag.paint(acc)).to_string()
    })
    .collect()
}

/// Byte ranges of every known markup tag, in order
pub fn tag_spans(markup: &str) -> Vec<Range<usize>> {
  TAG_PATTERN
    .captures_iter(markup)
    .filter(|caps| Tag::from_name(&caps[2]).is_some())
    .filter_map(|caps| caps.get(0).map(|m| m.range()))
    .collect()
}

/// Remove every known markup tag, keeping the enclosed text
pub fn strip_tags(markup: &str) -> String {
  segments(markup).into_iter().map(|(_, text)| text).collect()
}

/// Width of the attached terminal, or 100 columns when there is none
pub fn terminal_width() -> usize {
  let term = console::Term::stdout();
  match term.size_checked() {
    Some((_, cols)) if cols > 0 => cols as usize,
    _ => 100,
  }
}

/// Core logging function that handles the actual output
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

/// Format a colored prefix for log messages
fn format_prefix(color: Color, prefix: &str) -> String {
  format!("[{}]{:<width$}", prefix.color(color).bold(), "", width = 7 - prefix.len() - 2)
}

fn log_with(color: Color, prefix: &str, message: &str) {
  let prefix = format_prefix(color, prefix);
  for line in style(message).lines() {
    log(&format!("{prefix} {line}"));
  }
}

/// Info level logging - general information
pub fn info(message: &str) {
  log_with(Color::Blue, "info", message);
}

/// Warning level logging - something needs attention
pub fn warn(message: &str) {
  log_with(Color::Yellow, "warn", message);
}

/// Error level logging - something went wrong
pub fn error(message: &str) {
  log_with(Color::Red, "error", message);
}

/// Success level logging - something completed successfully
pub fn success(message: &str) {
  log_with(Color::Green, "sccs", message);
}

/// Print styled markup to stdout
pub fn text(markup: &str) {
  println!("{}", style(markup));
}

/// Multi-line error: the first line is the headline, the rest is context
pub fn error_block(lines: &[&str]) {
  block(Tag::Error, lines);
}

pub fn warning_block(lines: &[&str]) {
  block(Tag::Warning, lines);
}

pub fn success_block(lines: &[&str]) {
  block(Tag::Success, lines);
}

fn block(tag: Tag, lines: &[&str]) {
  let Some((headline, rest)) = lines.split_first() else {
    return;
  };
  match tag {
    Tag::Error => error(headline),
    Tag::Warning => warn(headline),
    _ => success(headline),
  }
  for line in rest {
    log(&style(&format!("<soft>{line}</soft>")));
  }
}
