//! Interactive yes/no confirmation

use crate::error::CoreError;
use std::io::{self, BufRead, Stderr, StdinLock, Write};
use tracing::debug;

/// A yes/no oracle consulted before destructive work starts.
#[cfg_attr(test, mockall::automock)]
pub trait Confirm {
    /// Ask `prompt`. With `bypass` set the answer is `true` and nothing is read.
    fn confirm(&mut self, prompt: &str, bypass: bool) -> Result<bool, CoreError>;
}

/// Line-based prompter over any reader/writer pair.
///
/// Accepts `y`/`yes` and `n`/`no` case-insensitively. An empty answer or end
/// of input counts as "no"; anything else re-asks the question.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consume the prompter and return what was written to the operator.
    pub fn into_output(self) -> W {
        self.output
    }
}

impl Prompter<StdinLock<'static>, Stderr> {
    /// Prompt on stderr so stdout only carries command output.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Confirm for Prompter<R, W> {
    fn confirm(&mut self, prompt: &str, bypass: bool) -> Result<bool, CoreError> {
        if bypass {
            debug!(prompt, "Confirmation bypassed");
            return Ok(true);
        }

        loop {
            write!(self.output, "{prompt} [y/N]: ").map_err(CoreError::Confirm)?;
            self.output.flush().map_err(CoreError::Confirm)?;

            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .map_err(CoreError::Confirm)?;
            if read == 0 {
                debug!("End of input while confirming, treating as no");
                return Ok(false);
            }

            match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "" | "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer yes or no.").map_err(CoreError::Confirm)?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn written(p: Prompter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(p.into_output()).unwrap()
    }

    #[test]
    fn bypass_reads_nothing() {
        let mut p = prompter("n\n");
        assert!(p.confirm("x", true).unwrap());
        assert_eq!(p.input.position(), 0);
        assert_eq!(written(p), "");
    }

    #[test]
    fn reprompts_on_unrecognized_answer() {
        let mut p = prompter("maybe\ny\n");
        assert!(p.confirm("x", false).unwrap());
        assert_eq!(
            written(p),
            "x [y/N]: Please answer yes or no.\nx [y/N]: "
        );
    }

    #[test]
    fn empty_answer_is_no() {
        let mut p = prompter("\n");
        assert!(!p.confirm("x", false).unwrap());
    }

    #[test]
    fn end_of_input_is_no() {
        let mut p = prompter("");
        assert!(!p.confirm("x", false).unwrap());
    }

    #[test]
    fn answers_are_case_insensitive_and_trimmed() {
        assert!(prompter("  YES \n").confirm("x", false).unwrap());
        assert!(!prompter("No\n").confirm("x", false).unwrap());
        assert!(prompter("Y").confirm("x", false).unwrap());
    }

    #[test]
    fn write_failure_is_an_error() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut p = Prompter::new(Cursor::new(b"y\n".to_vec()), Closed);
        assert!(matches!(p.confirm("x", false), Err(CoreError::Confirm(_))));
    }
}
