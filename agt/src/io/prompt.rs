//! Interactive prompts.
//!
//! Workflows talk to the user only through [`Prompter`], so tests can script
//! the answers. The console implementation reads stdin on a helper thread and
//! gives up after the configured timeout, which surfaces as
//! operation-cancelled.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::core::error::ClassifiedError;

pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(300);

pub trait Prompter {
    /// Free text, trimmed. Empty input yields `default` when given.
    fn input(&self, message: &str, default: Option<&str>) -> Result<String, ClassifiedError>;

    fn confirm(&self, message: &str, default: bool) -> Result<bool, ClassifiedError>;

    /// Index into `choices`.
    fn select(&self, message: &str, choices: &[String]) -> Result<usize, ClassifiedError>;

    /// Indices into `choices`, ascending. `preselected` is what an empty
    /// answer keeps.
    fn multi_select(
        &self,
        message: &str,
        choices: &[String],
        preselected: &[usize],
    ) -> Result<Vec<usize>, ClassifiedError>;

    /// Informational output.
    fn show(&self, text: &str);
}

/// `y`/`yes`/`n`/`no` in any case; empty gives `default`.
pub fn parse_confirm(answer: &str, default: bool) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// A 1-based choice number.
pub fn parse_choice(answer: &str, len: usize) -> Option<usize> {
    let n: usize = answer.trim().parse().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

/// Comma-separated 1-based numbers. Empty keeps `preselected`; any
/// out-of-range or non-numeric entry rejects the whole answer.
pub fn parse_multi_choice(answer: &str, len: usize, preselected: &[usize]) -> Option<Vec<usize>> {
    if answer.trim().is_empty() {
        let mut kept: Vec<usize> = preselected.iter().copied().filter(|i| *i < len).collect();
        kept.sort_unstable();
        kept.dedup();
        return Some(kept);
    }
    let mut picked = Vec::new();
    for part in answer.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        picked.push(parse_choice(part, len)?);
    }
    picked.sort_unstable();
    picked.dedup();
    Some(picked)
}

/// Stdin/stdout prompter with a per-answer timeout.
pub struct ConsolePrompter {
    timeout: Duration,
    lines: Mutex<Option<Receiver<io::Result<String>>>>,
}

impl ConsolePrompter {
    /// Reads stdin, starting the reader on the first prompt.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            lines: Mutex::new(None),
        }
    }

    /// Reads answers from `reader` instead of stdin.
    pub fn from_reader<R>(reader: R, timeout: Duration) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self {
            timeout,
            lines: Mutex::new(Some(spawn_reader(reader))),
        }
    }

    fn ask(&self, message: &str) -> Result<String, ClassifiedError> {
        print!("{message} ");
        io::stdout().flush().ok();
        self.read_line()
    }

    fn read_line(&self) -> Result<String, ClassifiedError> {
        let mut guard = self
            .lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let rx = guard.get_or_insert_with(|| spawn_reader(io::BufReader::new(io::stdin())));
        match rx.recv_timeout(self.timeout) {
            Ok(Ok(line)) => Ok(line.trim().to_string()),
            Ok(Err(err)) => Err(ClassifiedError::cancelled(format!(
                "failed to read input: {err}"
            ))),
            Err(RecvTimeoutError::Timeout) => {
                debug!(timeout_secs = self.timeout.as_secs(), "prompt timed out");
                Err(ClassifiedError::cancelled(format!(
                    "no input within {}s",
                    self.timeout.as_secs()
                ))
                .with_context("timeout_secs", self.timeout.as_secs().to_string()))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(ClassifiedError::cancelled("input closed"))
            }
        }
    }
}

/// One reader for the life of the prompter: a read blocked past a timeout
/// keeps its line for the next prompt instead of losing it.
fn spawn_reader<R>(mut reader: R) -> Receiver<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => return,
                Ok(_) => {
                    if tx.send(Ok(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(err));
                    return;
                }
            }
        }
    });
    rx
}

impl Prompter for ConsolePrompter {
    fn input(&self, message: &str, default: Option<&str>) -> Result<String, ClassifiedError> {
        let prompt = match default {
            Some(d) if !d.is_empty() => format!("{message} [{d}]:"),
            _ => format!("{message}:"),
        };
        let answer = self.ask(&prompt)?;
        if answer.is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(answer)
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool, ClassifiedError> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let answer = self.ask(&format!("{message} {hint}"))?;
            if let Some(yes) = parse_confirm(&answer, default) {
                return Ok(yes);
            }
            println!("Please answer y or n.");
        }
    }

    fn select(&self, message: &str, choices: &[String]) -> Result<usize, ClassifiedError> {
        if choices.is_empty() {
            return Err(ClassifiedError::cancelled("nothing to choose from"));
        }
        println!("{message}");
        for (i, choice) in choices.iter().enumerate() {
            println!("  {}) {choice}", i + 1);
        }
        loop {
            let answer = self.ask(&format!("Choose 1-{}:", choices.len()))?;
            if let Some(index) = parse_choice(&answer, choices.len()) {
                return Ok(index);
            }
            println!("Please enter a number between 1 and {}.", choices.len());
        }
    }

    fn multi_select(
        &self,
        message: &str,
        choices: &[String],
        preselected: &[usize],
    ) -> Result<Vec<usize>, ClassifiedError> {
        if choices.is_empty() {
            return Ok(Vec::new());
        }
        println!("{message}");
        for (i, choice) in choices.iter().enumerate() {
            let mark = if preselected.contains(&i) { "x" } else { " " };
            println!("  [{mark}] {}) {choice}", i + 1);
        }
        loop {
            let answer = self.ask("Numbers separated by commas (empty keeps [x]):")?;
            if let Some(picked) = parse_multi_choice(&answer, choices.len(), preselected) {
                return Ok(picked);
            }
            println!("Please enter numbers between 1 and {}.", choices.len());
        }
    }

    fn show(&self, text: &str) {
        println!("{text}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use std::io::{Cursor, Read};

    /// Input that never arrives.
    struct Silent;

    impl Read for Silent {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            thread::sleep(Duration::from_secs(3600));
            Ok(0)
        }
    }

    #[test]
    fn answers_come_from_the_reader() {
        let prompter = ConsolePrompter::from_reader(
            Cursor::new("  Fix login \n\ny\n2\n"),
            Duration::from_secs(5),
        );
        assert_eq!(prompter.input("Title", None).unwrap(), "Fix login");
        assert_eq!(prompter.input("Base", Some("main")).unwrap(), "main");
        assert!(prompter.confirm("Draft?", false).unwrap());
        let choices = vec!["a".to_string(), "b".to_string()];
        assert_eq!(prompter.select("Pick", &choices).unwrap(), 1);
    }

    #[test]
    fn no_answer_within_the_timeout_cancels() {
        let prompter =
            ConsolePrompter::from_reader(io::BufReader::new(Silent), Duration::from_millis(50));

        let err = prompter.input("Title", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationCancelled);
        assert!(err.context().contains_key("timeout_secs"));
    }

    #[test]
    fn closed_input_cancels() {
        let prompter = ConsolePrompter::from_reader(Cursor::new(""), Duration::from_secs(5));

        let err = prompter.confirm("Overwrite?", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationCancelled);
        assert_eq!(err.message(), "input closed");
    }

    #[test]
    fn confirm_answers() {
        assert_eq!(parse_confirm("", true), Some(true));
        assert_eq!(parse_confirm(" YES ", false), Some(true));
        assert_eq!(parse_confirm("n", true), Some(false));
        assert_eq!(parse_confirm("maybe", true), None);
    }

    #[test]
    fn choices_are_one_based() {
        assert_eq!(parse_choice("1", 3), Some(0));
        assert_eq!(parse_choice(" 3 ", 3), Some(2));
        assert_eq!(parse_choice("0", 3), None);
        assert_eq!(parse_choice("4", 3), None);
        assert_eq!(parse_choice("x", 3), None);
    }

    #[test]
    fn multi_choice_parsing() {
        assert_eq!(parse_multi_choice("3, 1,3", 3, &[]), Some(vec![0, 2]));
        assert_eq!(parse_multi_choice("", 3, &[2, 0, 9]), Some(vec![0, 2]));
        assert_eq!(parse_multi_choice("1,9", 3, &[]), None);
    }
}
