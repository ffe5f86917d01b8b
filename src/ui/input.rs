//! Command-line input parsing and dispatch.

use thiserror::Error;

use super::loop_runner::Action;
use crate::config::Config;
use crate::feed::{FeedHandle, FilterCriteria};

pub const HELP: &str = "\
Commands:
  filter <category> [language]   switch category (and optionally language)
  lang <language>                switch language, keep category
  next | n                       load the next page
  prev | p                       load the previous page
  retry | r                      retry the last failed page
  show | s                       print every loaded article
  categories | c                 list known categories
  help | ?                       this help
  quit | q                       exit";

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Filter {
        category: String,
        language: Option<String>,
    },
    Language(String),
    Next,
    Prev,
    Retry,
    Show,
    Categories,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Unknown command '{0}' (type `help`)")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Unknown category '{0}' (type `categories`)")]
    UnknownCategory(String),
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<UserCommand>, InputError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("filter" | "f", [category]) => UserCommand::Filter {
            category: category.to_string(),
            language: None,
        },
        ("filter" | "f", [category, language]) => UserCommand::Filter {
            category: category.to_string(),
            language: Some(language.to_string()),
        },
        ("filter" | "f", _) => return Err(InputError::Usage("filter <category> [language]")),
        ("lang" | "l", [language]) => UserCommand::Language(language.to_string()),
        ("lang" | "l", _) => return Err(InputError::Usage("lang <language>")),
        ("next" | "n", []) => UserCommand::Next,
        ("prev" | "p", []) => UserCommand::Prev,
        ("retry" | "r", []) => UserCommand::Retry,
        ("show" | "s", []) => UserCommand::Show,
        ("categories" | "c", []) => UserCommand::Categories,
        ("help" | "?", []) => UserCommand::Help,
        ("quit" | "q" | "exit", []) => UserCommand::Quit,
        _ => return Err(InputError::Unknown(line.trim().to_string())),
    };
    Ok(Some(command))
}

/// Apply a feed command to the controller.
///
/// `filter` is the criteria this input has asked for so far. Partial filter
/// commands are completed from it rather than from the controller, which may
/// not have applied the previous command yet.
///
/// Commands that only print (`show`, `help`, `categories`) are handled by the
/// loop runner; here they are accepted and ignored.
pub fn handle_input(
    command: UserCommand,
    handle: &FeedHandle,
    config: &Config,
    filter: &mut FilterCriteria,
) -> Result<Action, InputError> {
    match command {
        UserCommand::Filter { category, language } => {
            if !config.is_known_category(&category) {
                return Err(InputError::UnknownCategory(category));
            }
            let language = language.unwrap_or_else(|| filter.language.clone());
            *filter = FilterCriteria::new(category, language);
            handle.set_filter(filter.clone());
        }
        UserCommand::Language(language) => {
            filter.language = language;
            handle.set_filter(filter.clone());
        }
        UserCommand::Next => handle.append(),
        UserCommand::Prev => handle.prepend(),
        UserCommand::Retry => handle.retry(),
        UserCommand::Quit => return Ok(Action::Quit),
        UserCommand::Show | UserCommand::Categories | UserCommand::Help => {}
    }
    Ok(Action::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedController;
    use crate::source::MemorySource;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn test_parse_filter_variants() {
        assert_eq!(
            parse_command("filter science"),
            Ok(Some(UserCommand::Filter {
                category: "science".into(),
                language: None
            }))
        );
        assert_eq!(
            parse_command("  F health de "),
            Ok(Some(UserCommand::Filter {
                category: "health".into(),
                language: Some("de".into())
            }))
        );
        assert_eq!(
            parse_command("filter"),
            Err(InputError::Usage("filter <category> [language]"))
        );
    }

    #[test]
    fn test_parse_short_aliases() {
        assert_eq!(parse_command("n"), Ok(Some(UserCommand::Next)));
        assert_eq!(parse_command("p"), Ok(Some(UserCommand::Prev)));
        assert_eq!(parse_command("R"), Ok(Some(UserCommand::Retry)));
        assert_eq!(parse_command("exit"), Ok(Some(UserCommand::Quit)));
        assert_eq!(parse_command("lang fr"), Ok(Some(UserCommand::Language("fr".into()))));
    }

    #[test]
    fn test_parse_unknown() {
        assert!(matches!(parse_command("jump 3"), Err(InputError::Unknown(_))));
        assert!(matches!(parse_command("next 2"), Err(InputError::Unknown(_))));
    }

    #[tokio::test]
    async fn test_language_then_filter_sent_back_to_back() {
        let config = Config::default();
        let (handle, _feed) =
            FeedController::spawn(Arc::new(MemorySource::new(10)), config.initial_filter());
        let mut filter = config.initial_filter();

        handle_input(UserCommand::Language("de".into()), &handle, &config, &mut filter).unwrap();
        let science = UserCommand::Filter {
            category: "science".into(),
            language: None,
        };
        handle_input(science, &handle, &config, &mut filter).unwrap();
        assert_eq!(filter, FilterCriteria::new("science", "de"));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.criteria, FilterCriteria::new("science", "de"));
        assert_eq!(snapshot.generation, 3);
    }

    #[tokio::test]
    async fn test_unknown_category_keeps_filter() {
        let config = Config::default();
        let (handle, _feed) =
            FeedController::spawn(Arc::new(MemorySource::new(10)), config.initial_filter());
        let mut filter = config.initial_filter();

        let bogus = UserCommand::Filter {
            category: "astrology".into(),
            language: Some("fr".into()),
        };
        assert_eq!(
            handle_input(bogus, &handle, &config, &mut filter).unwrap_err(),
            InputError::UnknownCategory("astrology".into())
        );
        assert_eq!(filter, config.initial_filter());
        assert_eq!(handle.snapshot().await.unwrap().generation, 1);
    }
}
