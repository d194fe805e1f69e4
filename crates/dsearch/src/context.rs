use crate::backend::http::HttpConnector;
use crate::backend::Connector;
use crate::config::{DisplayMode, Settings};
use crate::present::Presenter;
use crate::prompt::{NonInteractivePrompter, Prompter, TerminalPrompter};
use crate::session::SessionRegistry;

/// Everything a command needs from its surroundings
pub struct CommandContext {
  pub settings: Settings,
  pub prompter: Box<dyn Prompter>,
  pub connector: Box<dyn Connector>,
  pub sessions: SessionRegistry,
}

impl CommandContext {
  pub fn new(
    settings: Settings,
    prompter: Box<dyn Prompter>,
    connector: Box<dyn Connector>,
  ) -> Self {
    Self { settings, prompter, connector, sessions: SessionRegistry::new() }
  }

  /// Production context: terminal prompts (none in API mode) and the HTTP connector
  pub fn from_settings(settings: Settings) -> Self {
    let prompter: Box<dyn Prompter> = match settings.display {
      DisplayMode::Api => Box::new(NonInteractivePrompter),
      _ => Box::new(TerminalPrompter),
    };
    Self::new(settings, prompter, Box::new(HttpConnector))
  }

  pub fn display(&self) -> DisplayMode {
    self.settings.display
  }

  pub fn presenter(&self) -> Presenter {
    Presenter::new(self.settings.display)
  }
}
