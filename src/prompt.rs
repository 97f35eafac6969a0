use std::io::{self, IsTerminal};
use std::sync::OnceLock;

use dialoguer::theme::SimpleTheme;
use dialoguer::Input;
use starter::gate::{choices, parse_answer, AssumeYes, Gate, LineGate};
use tracing::warn;

static THEME: OnceLock<SimpleTheme> = OnceLock::new();

/// Interactive gate on a terminal.
pub(crate) struct TermGate;

impl Gate for TermGate {
    fn confirm(&mut self, prompt: &str, default_is_no: bool) -> bool {
        let theme = THEME.get_or_init(|| SimpleTheme);
        let answer = Input::<String>::with_theme(theme)
            .with_prompt(format!("{prompt} {}", choices(default_is_no)))
            .allow_empty(true)
            .interact_text();
        match answer {
            Ok(answer) => parse_answer(&answer, default_is_no),
            Err(err) => {
                warn!(%err, "prompt failed, treating it as no");
                false
            }
        }
    }
}

/// `--yes` wins, then a terminal gets dialoguer and anything else (pipes,
/// CI) a plain line reader.
pub(crate) fn gate(assume_yes: bool) -> Box<dyn Gate> {
    if assume_yes {
        Box::new(AssumeYes)
    } else if io::stdin().is_terminal() {
        Box::new(TermGate)
    } else {
        Box::new(LineGate::new(io::stdin().lock(), io::stdout()))
    }
}
