//! Operator pacing between cards.

use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};

/// Paces the batch: called once before each card is read.
pub trait OperatorPrompt {
    /// Tell the operator which record is next and wait until they have
    /// placed the card. `index` is zero-based.
    fn await_card(&mut self, identifier: &str, index: usize, total: usize) -> io::Result<()>;
}

/// Prompts on a terminal and waits for Enter.
#[derive(Debug)]
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompt<StdinLock<'static>, Stdout> {
    /// Prompt on standard output, read from standard input.
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> OperatorPrompt for ConsolePrompt<R, W> {
    fn await_card(&mut self, identifier: &str, index: usize, total: usize) -> io::Result<()> {
        writeln!(self.output, "[{}/{}] Record: {}", index + 1, total, identifier)?;
        write!(self.output, "Place the card on the reader and press Enter...")?;
        self.output.flush()?;

        // End of input just stops pausing
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(())
    }
}

/// Does not wait; the presence timeout alone paces the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl OperatorPrompt for NoPrompt {
    fn await_card(&mut self, _identifier: &str, _index: usize, _total: usize) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_prompt_waits_for_line() {
        let input = io::Cursor::new(b"\n".to_vec());
        let mut prompt = ConsolePrompt::new(input, Vec::new());

        prompt.await_card("000123", 0, 3).unwrap();

        let shown = String::from_utf8(prompt.output).unwrap();
        assert!(shown.starts_with("[1/3] Record: 000123\n"));
        assert!(shown.ends_with("press Enter..."));
    }

    #[test]
    fn test_console_prompt_tolerates_eof() {
        let mut prompt = ConsolePrompt::new(io::empty(), io::sink());
        assert!(prompt.await_card("000123", 0, 1).is_ok());
    }
}
