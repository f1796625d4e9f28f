use std::io::{self, BufRead, Stdout, Write};

use crate::{auditor::StaleRecord, error::CleanerError};

const PROMPT: &str =
    "Enter the numbers of branches to delete (comma-separated, or 'all' to delete all): ";

/// Where the operator's answer comes from
pub trait DecisionSource {
    /// Show `prompt` and return one line of input (empty at end of input).
    fn read_selection(&mut self, prompt: &str) -> io::Result<String>;
}

/// Reads the answer from a terminal (stdin/stdout in production)
pub struct InteractiveDecision<R, W> {
    input: R,
    output: W,
}

impl InteractiveDecision<io::StdinLock<'static>, Stdout> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> InteractiveDecision<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> DecisionSource for InteractiveDecision<R, W> {
    fn read_selection(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line)
    }
}

/// Pre-supplied answer used for every repository (unattended runs, tests)
pub struct ScriptedDecision {
    answer: String,
}

impl ScriptedDecision {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
        }
    }
}

impl DecisionSource for ScriptedDecision {
    fn read_selection(&mut self, prompt: &str) -> io::Result<String> {
        tracing::debug!("{}{}", prompt, self.answer);
        Ok(self.answer.clone())
    }
}

/// Parsed operator answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Indices(Vec<usize>),
    /// Blank answer, or numbers that are all out of range
    Nothing,
    /// Non-numeric answer with no usable index
    Invalid,
}

impl Selection {
    /// Branch names picked from `stale`, in the order given by the operator
    pub fn resolve(&self, stale: &[StaleRecord]) -> Vec<String> {
        match self {
            Selection::All => stale.iter().map(|r| r.branch_name.clone()).collect(),
            Selection::Indices(indices) => indices
                .iter()
                .filter_map(|&i| stale.get(i))
                .map(|r| r.branch_name.clone())
                .collect(),
            Selection::Nothing | Selection::Invalid => Vec::new(),
        }
    }
}

/// Parse `all` or a comma-separated index list against `available` entries.
///
/// Tokens that are not plain decimal numbers, or are out of range, are dropped.
/// An answer is invalid only when it picks nothing and contains a token that is
/// not a number.
pub fn parse_selection(input: &str, available: usize) -> Selection {
    let input = input.trim();
    if input.is_empty() {
        return Selection::Nothing;
    }
    if input.eq_ignore_ascii_case("all") {
        return Selection::All;
    }

    let mut indices = Vec::new();
    let mut malformed = false;
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !token.bytes().all(|b| b.is_ascii_digit()) {
            malformed = true;
            continue;
        }
        // Digit strings too long for usize are out of range as well.
        if let Some(i) = token.parse::<usize>().ok().filter(|&i| i < available) {
            indices.push(i);
        }
    }

    match (indices.is_empty(), malformed) {
        (false, _) => Selection::Indices(indices),
        (true, true) => Selection::Invalid,
        (true, false) => Selection::Nothing,
    }
}

/// Show the stale branches on `out`, ask `source`, and return the chosen names.
pub fn collect_selection<D, W>(
    source: &mut D,
    stale: &[StaleRecord],
    out: &mut W,
) -> Result<Vec<String>, CleanerError>
where
    D: DecisionSource + ?Sized,
    W: Write,
{
    writeln!(out, "\nStale Branches Detected:").map_err(CleanerError::Console)?;
    for (i, record) in stale.iter().enumerate() {
        writeln!(
            out,
            "[{}] {} (Last commit: {})",
            i,
            record.branch_name,
            record.last_commit_time.format("%Y-%m-%d")
        )
        .map_err(CleanerError::Console)?;
    }
    out.flush().map_err(CleanerError::Console)?;

    let selection = match source.read_selection(PROMPT) {
        Ok(answer) => {
            let selection = parse_selection(&answer, stale.len());
            if selection == Selection::Invalid {
                tracing::debug!(
                    "{}",
                    CleanerError::InvalidSelection {
                        input: answer.trim().to_string()
                    }
                );
            }
            selection
        }
        Err(e) => {
            tracing::warn!("Failed to read selection: {}", e);
            Selection::Invalid
        }
    };

    match selection {
        Selection::Invalid => {
            writeln!(out, "Invalid selection. No branches deleted.").map_err(CleanerError::Console)?
        }
        Selection::Nothing => {
            writeln!(out, "No branches selected.").map_err(CleanerError::Console)?
        }
        _ => {}
    }

    Ok(selection.resolve(stale))
}
