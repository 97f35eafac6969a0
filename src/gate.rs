use std::io::{BufRead, Write};

use tracing::warn;

/// Blocking yes/no question asked before a consequential step.
pub trait Gate {
    fn confirm(&mut self, prompt: &str, default_is_no: bool) -> bool;
}

/// Decision for one line of user input. An empty answer takes the default,
/// anything that is not a recognised yes counts as no.
pub fn parse_answer(input: &str, default_is_no: bool) -> bool {
    let answer = input.trim().to_lowercase();
    if answer.is_empty() {
        return !default_is_no;
    }
    match answer.as_str() {
        "y" | "yes" | "o" | "oui" => true,
        "n" | "no" | "non" => false,
        _ => false,
    }
}

/// The `[y/N]` hint appended to a prompt.
pub fn choices(default_is_no: bool) -> &'static str {
    if default_is_no {
        "[y/N]"
    } else {
        "[Y/n]"
    }
}

/// Reads exactly one line per question from any buffered source.
pub struct LineGate<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineGate<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Gate for LineGate<R, W> {
    fn confirm(&mut self, prompt: &str, default_is_no: bool) -> bool {
        let shown = write!(self.output, "{prompt} {}: ", choices(default_is_no))
            .and_then(|()| self.output.flush());
        if let Err(err) = shown {
            warn!(%err, prompt, "failed to show the question");
        }
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(_) => parse_answer(&line, default_is_no),
            Err(err) => {
                warn!(%err, "failed to read answer, treating it as no");
                false
            }
        }
    }
}

/// Answers yes to everything, for non-interactive runs.
pub struct AssumeYes;

impl Gate for AssumeYes {
    fn confirm(&mut self, prompt: &str, _default_is_no: bool) -> bool {
        println!("{prompt} yes");
        true
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use super::*;

    fn ask(input: &str, default_is_no: bool) -> (bool, String) {
        let mut output = Vec::new();
        let answer = LineGate::new(Cursor::new(input.as_bytes()), &mut output)
            .confirm("Continue?", default_is_no);
        (answer, String::from_utf8(output).unwrap())
    }

    #[test]
    fn empty_answer_takes_the_default() {
        assert!(!parse_answer("", true));
        assert!(parse_answer("", false));
        assert!(!parse_answer("   ", true));
    }

    #[test]
    fn affirmative_tokens_win_regardless_of_default() {
        for token in ["y", "yes", "o", "oui", "Y", " YES ", "Oui"] {
            assert!(parse_answer(token, true), "{token:?}");
            assert!(parse_answer(token, false), "{token:?}");
        }
    }

    #[test]
    fn negative_and_unknown_tokens_are_no() {
        for token in ["n", "no", "non", "maybe", "yess", "1"] {
            assert!(!parse_answer(token, true), "{token:?}");
            assert!(!parse_answer(token, false), "{token:?}");
        }
    }

    #[test]
    fn line_gate_reads_a_single_line() {
        let mut output = Vec::new();
        let mut gate = LineGate::new(Cursor::new(&b"yes\nno\n"[..]), &mut output);
        assert!(gate.confirm("first?", true));
        assert!(!gate.confirm("second?", false));
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text, "first? [y/N]: second? [Y/n]: ");
    }

    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn unwritable_output_still_reads_the_answer() {
        let mut gate = LineGate::new(Cursor::new(&b"y\n\n"[..]), Closed);
        assert!(gate.confirm("first?", true));
        assert!(!gate.confirm("second?", true));
    }

    #[test]
    fn end_of_input_is_an_empty_answer() {
        assert_eq!(ask("", true), (false, String::from("Continue? [y/N]: ")));
        assert!(ask("", false).0);
        assert!(ask("\n", false).0);
    }
}
