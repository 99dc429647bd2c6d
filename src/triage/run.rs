//! Line-driven review loop.
//!
//! Reads one command per line and applies it to a [`TriageSession`]:
//!
//! | Input | Command |
//! |---|---|
//! | `k`, `keep` | keep the current photo |
//! | `d`, `delete` | mark the current photo for deletion |
//! | `u`, `undo` | revert the last decision |
//! | `c`, `commit` | delete every marked photo |
//! | `p`, `preview` | list the next undecided photos |
//! | `q`, `quit` | stop reviewing |
//! | `?`, `h`, `help` | show this table |
//!
//! The loop is generic over its input and output so it can be driven from
//! stdin or from a test buffer.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use thiserror::Error;

use super::session::{CommitOutcome, Decision, TriageSession, TriageState};
use crate::library::AssetDeleter;

/// One command of the review loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageCommand {
    /// Keep the current photo
    Keep,
    /// Mark the current photo for deletion
    Delete,
    /// Revert the last decision
    Undo,
    /// Delete marked photos
    Commit,
    /// Show upcoming photos
    Preview,
    /// Show help
    Help,
    /// Leave the loop
    Quit,
}

/// Unrecognized review command.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown command '{0}' (type ? for help)")]
pub struct TriageCommandError(String);

impl FromStr for TriageCommand {
    type Err = TriageCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "k" | "keep" => Ok(Self::Keep),
            "d" | "delete" => Ok(Self::Delete),
            "u" | "undo" => Ok(Self::Undo),
            "c" | "commit" => Ok(Self::Commit),
            "p" | "preview" => Ok(Self::Preview),
            "?" | "h" | "help" => Ok(Self::Help),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            other => Err(TriageCommandError(other.to_string())),
        }
    }
}

const HELP: &str = "k keep | d delete | u undo | c commit | p preview | q quit";

/// Totals of one review loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriageReport {
    /// Decisions recorded, undos subtracted
    pub decisions: usize,
    /// Photos deleted by commits
    pub deleted: usize,
    /// Photos still marked for deletion when the loop ended
    pub pending: usize,
}

/// Drive `session` from `input` until `q` or end of input.
///
/// The session is started if it is idle. Uncommitted decisions are left in
/// the session for the caller to inspect.
///
/// # Errors
///
/// Returns an I/O error if reading input or writing output fails.
pub fn run_triage<R: BufRead, W: Write>(
    session: &mut TriageSession,
    deleter: &dyn AssetDeleter,
    input: R,
    output: &mut W,
) -> io::Result<TriageReport> {
    if session.state() == TriageState::Idle {
        session.start();
    }

    let mut report = TriageReport::default();
    writeln!(
        output,
        "Reviewing {} ({} photos). {}",
        session.month().title,
        session.month().len(),
        HELP
    )?;
    write_prompt(session, output)?;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            write_prompt(session, output)?;
            continue;
        }

        let command = match line.parse::<TriageCommand>() {
            Ok(command) => command,
            Err(e) => {
                writeln!(output, "{}", e)?;
                write_prompt(session, output)?;
                continue;
            }
        };
        log::trace!("Triage command: {:?}", command);

        match command {
            TriageCommand::Keep | TriageCommand::Delete => {
                if session.current().is_some() {
                    let decision = if command == TriageCommand::Keep {
                        Decision::Keep
                    } else {
                        Decision::Delete
                    };
                    session.decide(decision);
                    report.decisions += 1;
                } else {
                    writeln!(output, "Nothing left to review.")?;
                }
            }
            TriageCommand::Undo => {
                if session.can_undo() {
                    session.undo();
                    report.decisions = report.decisions.saturating_sub(1);
                } else {
                    writeln!(output, "Nothing to undo.")?;
                }
            }
            TriageCommand::Commit => {
                let outcome = session.commit(deleter);
                if let CommitOutcome::Deleted { count } = outcome {
                    report.deleted += count;
                }
                writeln!(output, "{}", outcome)?;
            }
            TriageCommand::Preview => {
                let upcoming = session.preview();
                if upcoming.is_empty() {
                    writeln!(output, "No more undecided photos.")?;
                }
                for asset in upcoming {
                    writeln!(output, "  {}", asset.id)?;
                }
            }
            TriageCommand::Help => writeln!(output, "{}", HELP)?,
            TriageCommand::Quit => break,
        }
        write_prompt(session, output)?;
    }

    report.pending = session.pending_deletion_count();
    if report.pending > 0 {
        writeln!(
            output,
            "{} photo(s) still marked for deletion were not committed.",
            report.pending
        )?;
    }
    Ok(report)
}

fn write_prompt<W: Write>(session: &TriageSession, output: &mut W) -> io::Result<()> {
    match session.current() {
        Some(asset) => {
            let date = asset
                .creation_date
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "no date".to_string());
            write!(
                output,
                "[{} left, {} marked] {} ({}) > ",
                session.undecided_count(),
                session.pending_deletion_count(),
                asset.id,
                date
            )?;
        }
        None => {
            write!(
                output,
                "All photos reviewed, {} marked for deletion. c to commit, q to quit > ",
                session.pending_deletion_count()
            )?;
        }
    }
    output.flush()
}
