//! Question selection policies.

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::ElicitationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionPolicy {
    /// Current minimax candidate against its worst-case opponent.
    #[default]
    Pessimistic,
    /// Uniform choice among unvisited pairs.
    Random,
}

impl fmt::Display for QuestionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pessimistic => "pessimistic",
            Self::Random => "random",
        })
    }
}

impl FromStr for QuestionPolicy {
    type Err = ElicitationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pessimistic" | "css" => Ok(Self::Pessimistic),
            "random" => Ok(Self::Random),
            _ => Err(ElicitationError::UnknownQuestionPolicy {
                name: s.to_string(),
            }),
        }
    }
}

/// Aggregated regret state a policy may look at.
#[derive(Debug, Clone, Copy)]
pub struct RegretView<'a> {
    pub epmr: &'a DMatrix<f64>,
    pub emr: &'a DVector<f64>,
}

/// Symmetric record of pairs already asked; the diagonal starts visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitedPairs {
    n: usize,
    visited: Vec<bool>,
}

impl VisitedPairs {
    pub fn new(n: usize) -> Self {
        let mut visited = vec![false; n * n];
        for i in 0..n {
            visited[i * n + i] = true;
        }
        Self { n, visited }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn is_visited(&self, i: usize, j: usize) -> bool {
        self.visited[i * self.n + j]
    }

    pub fn mark(&mut self, i: usize, j: usize) {
        self.visited[i * self.n + j] = true;
        self.visited[j * self.n + i] = true;
    }

    pub fn has_unvisited(&self, i: usize) -> bool {
        (0..self.n).any(|j| !self.is_visited(i, j))
    }

    /// Unordered pairs not yet asked.
    pub fn remaining(&self) -> usize {
        (0..self.n)
            .map(|i| (i + 1..self.n).filter(|&j| !self.is_visited(i, j)).count())
            .sum()
    }
}

/// Picks the next pair to ask about. Both methods only read `visited`;
/// [`next_question`] records the chosen pair.
pub trait QuestionStrategy: Send {
    fn select_candidate(&mut self, view: &RegretView<'_>, visited: &VisitedPairs) -> Option<usize>;

    fn select_opponent(
        &mut self,
        view: &RegretView<'_>,
        visited: &VisitedPairs,
        candidate: usize,
    ) -> Option<usize>;

    fn policy(&self) -> QuestionPolicy;
}

/// Candidate with the smallest aggregated MR that still has an unasked
/// pair, then the unasked opponent with the largest aggregated PMR.
#[derive(Debug, Clone, Default)]
pub struct PessimisticStrategy;

fn ascending(values: impl Iterator<Item = f64>) -> Vec<usize> {
    let values: Vec<f64> = values.collect();
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    order
}

impl QuestionStrategy for PessimisticStrategy {
    fn select_candidate(&mut self, view: &RegretView<'_>, visited: &VisitedPairs) -> Option<usize> {
        ascending(view.emr.iter().copied())
            .into_iter()
            .find(|&i| visited.has_unvisited(i))
    }

    fn select_opponent(
        &mut self,
        view: &RegretView<'_>,
        visited: &VisitedPairs,
        candidate: usize,
    ) -> Option<usize> {
        // Negated so the stable sort keeps the first index on ties.
        ascending(view.epmr.row(candidate).iter().map(|v| -v))
            .into_iter()
            .find(|&j| !visited.is_visited(candidate, j))
    }

    fn policy(&self) -> QuestionPolicy {
        QuestionPolicy::Pessimistic
    }
}

pub struct RandomStrategy {
    rng: StdRng,
}

impl RandomStrategy {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    fn shuffled(&mut self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut self.rng);
        order
    }
}

impl QuestionStrategy for RandomStrategy {
    fn select_candidate(&mut self, _view: &RegretView<'_>, visited: &VisitedPairs) -> Option<usize> {
        self.shuffled(visited.len())
            .into_iter()
            .find(|&i| visited.has_unvisited(i))
    }

    fn select_opponent(
        &mut self,
        _view: &RegretView<'_>,
        visited: &VisitedPairs,
        candidate: usize,
    ) -> Option<usize> {
        self.shuffled(visited.len())
            .into_iter()
            .find(|&j| !visited.is_visited(candidate, j))
    }

    fn policy(&self) -> QuestionPolicy {
        QuestionPolicy::Random
    }
}

pub fn strategy_for(policy: QuestionPolicy, seed: Option<u64>) -> Box<dyn QuestionStrategy> {
    match policy {
        QuestionPolicy::Pessimistic => Box::new(PessimisticStrategy),
        QuestionPolicy::Random => Box::new(RandomStrategy::new(seed)),
    }
}

/// Selects a pair and marks it visited. `None` once every pair was asked.
pub fn next_question(
    strategy: &mut dyn QuestionStrategy,
    view: &RegretView<'_>,
    visited: &mut VisitedPairs,
) -> Option<(usize, usize)> {
    let candidate = strategy.select_candidate(view, visited)?;
    let opponent = strategy.select_opponent(view, visited, candidate)?;
    visited.mark(candidate, opponent);
    Some((candidate, opponent))
}
