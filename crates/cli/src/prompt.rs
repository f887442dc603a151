use console::{style, Term};
use recommender::validator::{DisambiguationRequest, SelectionPrompt};
use recommender::SelectionError;
use std::io::{self, BufRead};
use tracing::debug;

/// Интерактивный выбор кандидата в терминале.
///
/// Candidates go to stderr, answers are read from stdin; stdout stays the
/// result channel. EOF on stdin means the user walked away (abort).
pub struct ConsolePrompt<R> {
    term: Term,
    input: R,
}

impl ConsolePrompt<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> ConsolePrompt<R> {
    pub fn new(input: R) -> Self {
        Self {
            term: Term::stderr(),
            input,
        }
    }

    fn show(&self, request: &DisambiguationRequest) -> io::Result<()> {
        self.term.write_line(&format!(
            "Tool {} not found in workflow, showing {} potential matches:",
            style(&request.token).for_stderr().yellow().bold(),
            request.shown()
        ))?;
        for (i, candidate) in request.candidates.iter().enumerate() {
            self.term.write_line(&format!(
                "{}. {} {}",
                i + 1,
                candidate.name,
                style(format!("({})", candidate.score)).for_stderr().dim()
            ))?;
        }
        self.term.write_line("0 to exit")?;
        self.term.write_line("Please select a tool to use:")
    }
}

impl<R: BufRead> SelectionPrompt for ConsolePrompt<R> {
    fn select(
        &mut self,
        request: &DisambiguationRequest,
        retry: Option<&SelectionError>,
    ) -> Option<String> {
        let shown = match retry {
            Some(err) => {
                debug!(error = %err, "Rejected selection");
                self.term
                    .write_line(&style("Invalid input, please try again").for_stderr().red().to_string())
            }
            None => self.show(request),
        };
        if shown.is_err() {
            return None;
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}
