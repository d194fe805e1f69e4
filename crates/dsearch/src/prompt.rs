use dialoguer::{Confirm, Input, Password};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{DsError, Result};

/// Interactive questions asked during login and before long searches
pub trait Prompter: Send + Sync {
  /// Yes/no question, defaulting to no
  fn confirm(&self, message: &str) -> Result<bool>;

  /// Free-text answer; an empty answer is allowed
  fn input(&self, label: &str) -> Result<String>;

  /// Hidden answer for secrets such as API keys
  fn secret(&self, label: &str) -> Result<String>;
}

impl<P: Prompter + ?Sized> Prompter for std::sync::Arc<P> {
  fn confirm(&self, message: &str) -> Result<bool> {
    (**self).confirm(message)
  }

  fn input(&self, label: &str) -> Result<String> {
    (**self).input(label)
  }

  fn secret(&self, label: &str) -> Result<String> {
    (**self).secret(label)
  }
}

/// Prompts on the attached terminal
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
  fn confirm(&self, message: &str) -> Result<bool> {
    Ok(Confirm::new().with_prompt(message).default(false).interact()?)
  }

  fn input(&self, label: &str) -> Result<String> {
    let answer: String = Input::new().with_prompt(label).allow_empty(true).interact_text()?;
    Ok(answer.trim().to_string())
  }

  fn secret(&self, label: &str) -> Result<String> {
    let answer = Password::new().with_prompt(label).allow_empty_password(true).interact()?;
    Ok(answer.trim().to_string())
  }
}

/// Answers every confirmation with no and every question with an empty string
///
/// Used in API mode, where nothing may block on stdin.
pub struct NonInteractivePrompter;

impl Prompter for NonInteractivePrompter {
  fn confirm(&self, message: &str) -> Result<bool> {
    tracing::debug!(message, "declining prompt in non-interactive mode");
    Ok(false)
  }

  fn input(&self, _label: &str) -> Result<String> {
    Ok(String::new())
  }

  fn secret(&self, _label: &str) -> Result<String> {
    Ok(String::new())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
  Yes,
  No,
  Text(String),
}

/// Replays a fixed list of answers and records what was asked
#[derive(Default)]
pub struct ScriptedPrompter {
  answers: Mutex<VecDeque<Answer>>,
  asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
  pub fn new(answers: Vec<Answer>) -> Self {
    Self { answers: Mutex::new(answers.into()), asked: Mutex::new(Vec::new()) }
  }

  /// Every prompt shown so far, in order
  pub fn asked(&self) -> Vec<String> {
    self.asked.lock().map(|a| a.clone()).unwrap_or_default()
  }

  fn next(&self, prompt: &str) -> Result<Answer> {
    if let Ok(mut asked) = self.asked.lock() {
      asked.push(prompt.to_string());
    }
    self
      .answers
      .lock()
      .ok()
      .and_then(|mut answers| answers.pop_front())
      .ok_or_else(|| DsError::invalid_parameter(format!("No scripted answer for '{prompt}'")))
  }
}

impl Prompter for ScriptedPrompter {
  fn confirm(&self, message: &str) -> Result<bool> {
    match self.next(message)? {
      Answer::Yes => Ok(true),
      Answer::No => Ok(false),
      Answer::Text(text) => Ok(matches!(text.to_lowercase().as_str(), "y" | "yes")),
    }
  }

  fn input(&self, label: &str) -> Result<String> {
    match self.next(label)? {
      Answer::Text(text) => Ok(text),
      other => {
        Err(DsError::invalid_parameter(format!("Expected text for '{label}', got {other:?}")))
      }
    }
  }

  fn secret(&self, label: &str) -> Result<String> {
    self.input(label)
  }
}
