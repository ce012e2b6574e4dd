use clap::Args;
use serde::Serialize;
use verdict_core::{PolicyScores, Verdict};

use crate::error::{DoctorError, Result};
use crate::report::{Report, Session};

#[derive(Debug, Clone, Args)]
pub struct WinnerArgs {
    /// Inline JSON object of policy name to score, e.g. `{"LRU":0.8,"TTLOnly":0.2}`.
    #[arg(long)]
    pub scores: String,

    /// Treat smaller scores as better.
    #[arg(long = "lower-is-better")]
    pub lower_is_better: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WinnerReport {
    pub label: String,
    pub verdict: Verdict,
    pub scores: PolicyScores,
    pub higher_is_better: bool,
}

pub fn resolve_scores(args: &WinnerArgs, session: &Session) -> Result<WinnerReport> {
    let scores: PolicyScores = serde_json::from_str(&args.scores)
        .map_err(|err| DoctorError::invalid(format!("--scores is not a JSON score map: {err}")))?;

    let resolver = session.config.resolver();
    let verdict = if args.lower_is_better {
        resolver.verdict(&scores.negated())
    } else {
        resolver.verdict(&scores)
    };

    Ok(WinnerReport {
        label: resolver.label(&verdict),
        verdict,
        scores,
        higher_is_better: !args.lower_is_better,
    })
}

pub fn run_winner(args: WinnerArgs, session: &Session) -> Result<()> {
    let report = resolve_scores(&args, session)?;
    Report::new("winner", None, report).emit(None, &session.ui)
}
