//! Round-by-round snapshots of the live set, kept in memory or written as
//! JSON lines and read back for analysis.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::polytope::Polytope;
use crate::regret::unbounded;

/// One live branch after an answer was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchState {
    pub possibility: f64,
    /// Strength each answer was accepted with along this branch.
    pub answers: Vec<f64>,
}

impl From<&Polytope> for BranchState {
    fn from(polytope: &Polytope) -> Self {
        Self {
            possibility: polytope.possibility(),
            answers: polytope.answers().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrace {
    pub round: usize,
    /// Milliseconds since the run started.
    pub elapsed_ms: u64,
    pub candidate: usize,
    pub opponent: usize,
    pub preferred: usize,
    pub rational: bool,
    pub confidence: f64,
    /// Aggregated max regret per alternative when the question was asked.
    #[serde(with = "unbounded::vec")]
    pub emr: Vec<f64>,
    pub best_alternative: usize,
    #[serde(with = "unbounded")]
    pub estimated_regret: f64,
    /// Live set once the answer was applied, pruned and merged.
    pub branches: Vec<BranchState>,
}

impl RoundTrace {
    pub fn max_possibility(&self) -> f64 {
        self.branches
            .iter()
            .map(|b| b.possibility)
            .fold(0.0, f64::max)
    }

    /// Branches whose history disagrees with the answer just given.
    pub fn doubting_branches(&self) -> usize {
        self.branches
            .iter()
            .filter(|b| b.answers.last().is_some_and(|&s| s < 1.0))
            .count()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("trace line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("trace writer lock poisoned")]
    Poisoned,
}

/// Receives one snapshot per answered question.
pub trait TraceSink: Send + Sync {
    fn record(&self, round: &RoundTrace) -> Result<(), TraceError>;
}

/// Keeps every snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryTrace {
    rounds: Mutex<Vec<RoundTrace>>,
}

impl MemoryTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_rounds(self) -> Vec<RoundTrace> {
        self.rounds
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TraceSink for MemoryTrace {
    fn record(&self, round: &RoundTrace) -> Result<(), TraceError> {
        self.rounds
            .lock()
            .map_err(|_| TraceError::Poisoned)?
            .push(round.clone());
        Ok(())
    }
}

/// Appends one JSON object per round to a file.
pub struct JsonlTraceSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonlTraceSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Flushes buffered rounds; dropping the sink without this loses
    /// write errors.
    pub fn finish(self) -> Result<(), TraceError> {
        let mut writer = self
            .writer
            .into_inner()
            .map_err(|_| TraceError::Poisoned)?;
        writer.flush()?;
        Ok(())
    }

    fn writer(&self) -> Result<MutexGuard<'_, BufWriter<File>>, TraceError> {
        self.writer.lock().map_err(|_| TraceError::Poisoned)
    }
}

impl TraceSink for JsonlTraceSink {
    fn record(&self, round: &RoundTrace) -> Result<(), TraceError> {
        let line = serde_json::to_string(round).map_err(|source| TraceError::Json {
            line: round.round,
            source,
        })?;
        let mut writer = self.writer()?;
        writeln!(writer, "{line}")?;
        Ok(())
    }
}

/// Reads a trace written by [`JsonlTraceSink`]. Blank lines are skipped.
pub fn read_trace(path: impl AsRef<Path>) -> Result<Vec<RoundTrace>, TraceError> {
    let reader = BufReader::new(File::open(path)?);
    let mut rounds = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let round = serde_json::from_str(&line).map_err(|source| TraceError::Json {
            line: index + 1,
            source,
        })?;
        rounds.push(round);
    }
    Ok(rounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(emr: Vec<f64>, branches: Vec<BranchState>) -> RoundTrace {
        RoundTrace {
            round: 0,
            elapsed_ms: 3,
            candidate: 0,
            opponent: 1,
            preferred: 0,
            rational: false,
            confidence: 0.6,
            emr,
            best_alternative: 2,
            estimated_regret: 1.0,
            branches,
        }
    }

    #[test]
    fn doubting_branches_counts_weakened_last_answers() {
        let trace = snapshot(
            vec![2.0, 2.0, 1.0],
            vec![
                BranchState {
                    possibility: 1.0,
                    answers: vec![1.0],
                },
                BranchState {
                    possibility: 0.4,
                    answers: vec![0.4],
                },
            ],
        );
        assert_eq!(trace.doubting_branches(), 1);
        assert_eq!(trace.max_possibility(), 1.0);
    }

    #[test]
    fn infinite_emr_round_trips_through_a_line() {
        let trace = snapshot(vec![f64::INFINITY, 0.5], Vec::new());
        let line = serde_json::to_string(&trace).unwrap();
        assert!(line.contains("\"emr\":[null,0.5]"));
        let back: RoundTrace = serde_json::from_str(&line).unwrap();
        assert_eq!(back, trace);
        assert_eq!(back.max_possibility(), 0.0);
    }
}
