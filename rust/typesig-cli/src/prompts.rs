//! Terminal interaction helpers: line prompts, confirmations, numbered
//! choices and the timed phrase source used for collection and identification.

use anyhow::{anyhow, Result};
use std::io::{self, BufRead, Cursor, Write};
use std::time::Instant;
use typesig_core::{BiometricError, PhraseRequest, PhraseSource, Purpose, TypedPhrase};

// =============================================================================
// Line Input
// =============================================================================

/// Read one line, without the trailing newline. `None` at end of input.
fn read_line_from(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
    let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
    Ok(Some(trimmed.to_string()))
}

/// Print `prompt` and read the answer, trimmed.
pub fn ask(prompt: &str) -> Result<String> {
    print!("{} ", prompt);
    io::stdout().flush()?;

    let answer = read_line_from(&mut io::stdin().lock())?
        .ok_or_else(|| anyhow!("input closed"))?;
    Ok(answer.trim().to_string())
}

// =============================================================================
// Interactive Prompts
// =============================================================================

/// Ask for confirmation with a default value
pub fn ask_confirmation(prompt: &str, default: bool) -> Result<bool> {
    let suffix = if default { "[Y/n]" } else { "[y/N]" };
    let input = ask(&format!("{} {}", prompt, suffix))?.to_lowercase();

    if input.is_empty() {
        Ok(default)
    } else {
        Ok(input.starts_with('y'))
    }
}

/// Present numbered options and return the index of the chosen one.
pub fn select_option(title: &str, options: &[&str]) -> Result<usize> {
    println!();
    println!("{}", title);
    for (i, option) in options.iter().enumerate() {
        println!("  [{}] {}", i + 1, option);
    }

    loop {
        let input = ask("Enter choice:")?;
        if let Some(index) = parse_choice(&input, options) {
            return Ok(index);
        }
        println!("Invalid selection: {}", input);
    }
}

/// Accepts a 1-based number or a case-insensitive prefix of an option.
fn parse_choice(input: &str, options: &[&str]) -> Option<usize> {
    if input.is_empty() {
        return None;
    }
    if let Ok(n) = input.parse::<usize>() {
        return (n > 0 && n <= options.len()).then(|| n - 1);
    }
    let lower = input.to_lowercase();
    options
        .iter()
        .position(|option| option.to_lowercase().starts_with(&lower))
}

// =============================================================================
// Timed Phrase Source
// =============================================================================

/// Where typed phrases come from. Stdin is locked per line so the menu
/// prompts can share it.
pub trait LineReader {
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

impl LineReader for io::Stdin {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        read_line_from(&mut self.lock())
    }
}

impl<T: AsRef<[u8]>> LineReader for Cursor<T> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        read_line_from(self)
    }
}

/// Prompts on stdout and times each phrase from prompt display to submission.
pub struct TerminalSource<R> {
    input: R,
    phrase_hint: Option<String>,
}

impl TerminalSource<io::Stdin> {
    pub fn stdin(phrase_hint: Option<String>) -> Self {
        Self {
            input: io::stdin(),
            phrase_hint,
        }
    }
}

impl<R: LineReader> TerminalSource<R> {
    fn prompt_for(&self, request: &PhraseRequest) -> String {
        let mut prompt = match (request.purpose, request.phrase_number) {
            (Purpose::Enrollment, Some(n)) => format!("Phrase #{} for {}", n, request.user_id),
            (Purpose::Enrollment, None) => format!("Phrase for {}", request.user_id),
            (Purpose::Identification, _) => {
                format!("Type a phrase to identify as {}", request.user_id)
            }
        };
        if let Some(hint) = &self.phrase_hint {
            prompt.push_str(&format!(" (\"{}\")", hint));
        }
        prompt.push(':');
        prompt
    }
}

impl<R: LineReader> PhraseSource for TerminalSource<R> {
    fn collect_phrase(&mut self, request: &PhraseRequest) -> typesig_core::Result<TypedPhrase> {
        print!("{} ", self.prompt_for(request));
        io::stdout().flush()?;

        let started = Instant::now();
        let text = self.input.next_line()?.ok_or_else(|| {
            BiometricError::InvalidInput("input closed before a phrase was typed".into())
        })?;
        let elapsed_secs = started.elapsed().as_secs_f64();

        log::debug!("phrase of {} char(s) in {:.3}s", text.chars().count(), elapsed_secs);
        Ok(TypedPhrase { text, elapsed_secs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_line_strips_newline() {
        let mut input = Cursor::new("hello world\r\nsecond\n");
        assert_eq!(read_line_from(&mut input).unwrap().as_deref(), Some("hello world"));
        assert_eq!(read_line_from(&mut input).unwrap().as_deref(), Some("second"));
        assert_eq!(read_line_from(&mut input).unwrap(), None);
    }

    #[test]
    fn test_read_line_keeps_inner_spaces() {
        let mut input = Cursor::new("  spaced out  \n");
        assert_eq!(
            read_line_from(&mut input).unwrap().as_deref(),
            Some("  spaced out  ")
        );
    }

    #[test]
    fn test_parse_choice() {
        let options = ["Enroll", "Back", "Exit"];
        assert_eq!(parse_choice("1", &options), Some(0));
        assert_eq!(parse_choice("3", &options), Some(2));
        assert_eq!(parse_choice("4", &options), None);
        assert_eq!(parse_choice("0", &options), None);
        assert_eq!(parse_choice("ex", &options), Some(2));
        assert_eq!(parse_choice("", &options), None);
    }

    #[test]
    fn test_terminal_source_times_phrase() {
        let mut source = TerminalSource {
            input: Cursor::new("the quick brown fox\n"),
            phrase_hint: None,
        };
        let request = PhraseRequest {
            user_id: "amy".to_string(),
            phrase_number: Some(1),
            purpose: Purpose::Enrollment,
        };
        let typed = source.collect_phrase(&request).unwrap();
        assert_eq!(typed.text, "the quick brown fox");
        assert!(typed.elapsed_secs >= 0.0);

        assert!(matches!(
            source.collect_phrase(&request),
            Err(BiometricError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_prompt_mentions_phrase_number_and_hint() {
        let source = TerminalSource {
            input: Cursor::new(""),
            phrase_hint: Some("hello".to_string()),
        };
        let prompt = source.prompt_for(&PhraseRequest {
            user_id: "amy".to_string(),
            phrase_number: Some(4),
            purpose: Purpose::Enrollment,
        });
        assert_eq!(prompt, "Phrase #4 for amy (\"hello\"):");
    }
}
