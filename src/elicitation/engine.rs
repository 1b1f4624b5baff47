//! The round loop: ask, apply, prune, aggregate, stop.

use std::time::Instant;

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::alternatives::Alternatives;
use crate::error::ElicitationError;
use crate::focal_set::compute_epmr_emr;
use crate::lp::{LinearConstraint, LpSolver};
use crate::model::{answer_constraint, Model};
use crate::polytope::{dedup_by_history, possibilities, Polytope};
use crate::possibility::TNorm;
use crate::regret::{self, unbounded};

use super::config::{ElicitationConfig, ElicitationMode};
use super::oracle::{Answer, AnswerOracle};
use super::recommend;
use super::strategy::{next_question, strategy_for, QuestionStrategy, RegretView, VisitedPairs};
use super::trace::{BranchState, RoundTrace, TraceSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    RegretLimitMet,
    BudgetExhausted,
    NoQuestionsLeft,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitationOutcome {
    pub stop_reason: StopReason,
    /// Index in the Pareto-filtered set.
    pub best_alternative: usize,
    pub best_original_index: usize,
    #[serde(with = "unbounded")]
    pub estimated_regret: f64,
    /// Only known when the oracle exposes true scores.
    pub real_regret: Option<f64>,
    pub rounds: usize,
    pub elapsed_ms: u64,
    pub rational_trace: Vec<bool>,
    pub answered_constraints: Vec<LinearConstraint>,
    pub polytopes: Vec<Polytope>,
    pub possibilities: Vec<f64>,
    #[serde(with = "unbounded::matrices")]
    pub pmr_list: Vec<DMatrix<f64>>,
    /// `1 - max possibility` of the terminal live set.
    pub inconsistency: f64,
}

pub struct ElicitationEngine<'a> {
    alternatives: &'a Alternatives,
    model: &'a dyn Model,
    solver: &'a dyn LpSolver,
    config: ElicitationConfig,
    trace: Option<&'a dyn TraceSink>,
}

impl<'a> ElicitationEngine<'a> {
    pub fn new(
        alternatives: &'a Alternatives,
        model: &'a dyn Model,
        solver: &'a dyn LpSolver,
        config: ElicitationConfig,
    ) -> Result<Self, ElicitationError> {
        config.validate()?;
        if alternatives.is_empty() {
            return Err(ElicitationError::invalid("alternative set is empty"));
        }
        for alternative in alternatives.rows() {
            model.check_alternative(alternative)?;
        }
        Ok(Self {
            alternatives,
            model,
            solver,
            config,
            trace: None,
        })
    }

    pub fn with_trace(mut self, sink: &'a dyn TraceSink) -> Self {
        self.trace = Some(sink);
        self
    }

    pub fn config(&self) -> &ElicitationConfig {
        &self.config
    }

    /// Runs with the configured question policy.
    pub fn run(&self, oracle: &mut dyn AnswerOracle) -> Result<ElicitationOutcome, ElicitationError> {
        let mut strategy = strategy_for(self.config.policy, self.config.rng_seed);
        self.run_with_strategy(oracle, strategy.as_mut())
    }

    pub fn run_with_strategy(
        &self,
        oracle: &mut dyn AnswerOracle,
        strategy: &mut dyn QuestionStrategy,
    ) -> Result<ElicitationOutcome, ElicitationError> {
        let start = Instant::now();
        let n = self.alternatives.len();
        let max_iter = self.config.round_budget(n);
        let rows = self.alternatives.rows();

        let mut live = vec![Polytope::root(&self.model.base_constraints())];
        let mut pmrs = regret::pmr_list(self.alternatives, &live, self.model, self.solver)?;
        let mut visited = VisitedPairs::new(n);
        let mut rational_trace = Vec::new();
        let mut answered = Vec::new();
        let mut round = 0usize;

        tracing::debug!(
            alternatives = n,
            max_iter,
            mode = %self.config.mode,
            policy = %strategy.policy(),
            "Starting elicitation"
        );

        loop {
            let weights = possibilities(&live);
            let (epmr, emr) = compute_epmr_emr(&pmrs, &weights, self.config.inconsistency)?;
            let best = regret::argmin(&emr).unwrap_or(0);
            let estimated_regret = emr[best];

            let stop = if estimated_regret <= self.config.regret_limit {
                Some(StopReason::RegretLimitMet)
            } else if round >= max_iter {
                Some(StopReason::BudgetExhausted)
            } else {
                None
            };

            let view = RegretView {
                epmr: &epmr,
                emr: &emr,
            };
            let question = match stop {
                Some(_) => None,
                None => next_question(strategy, &view, &mut visited),
            };
            let Some((candidate, opponent)) = question else {
                let stop_reason = stop.unwrap_or(StopReason::NoQuestionsLeft);
                let real_regret = oracle
                    .true_scores(self.alternatives, self.model)
                    .map(|scores| recommend::real_regret(&scores, best));
                let max_possibility = weights.iter().copied().fold(0.0, f64::max);
                tracing::info!(
                    rounds = round,
                    best_alternative = best,
                    estimated_regret,
                    live = live.len(),
                    stop_reason = ?stop_reason,
                    "Elicitation finished"
                );
                return Ok(ElicitationOutcome {
                    stop_reason,
                    best_alternative: best,
                    best_original_index: self.alternatives.original_index(best).unwrap_or(best),
                    estimated_regret,
                    real_regret,
                    rounds: round,
                    elapsed_ms: elapsed_ms(start),
                    rational_trace,
                    answered_constraints: answered,
                    polytopes: live,
                    possibilities: weights,
                    pmr_list: pmrs,
                    inconsistency: 1.0 - max_possibility,
                });
            };

            let answer = oracle.answer(round, candidate, opponent, self.alternatives, self.model)?;
            let other = check_answer(&answer, candidate, opponent)?;
            let constraint = answer_constraint(self.model, &rows[answer.preferred], &rows[other]);

            live = match self.config.mode {
                ElicitationMode::Possibilistic => {
                    self.apply_answer(live, &constraint, answer.confidence, round)?
                }
                ElicitationMode::Classic => self.tighten(live, &constraint, round)?,
            };
            pmrs = regret::pmr_list(self.alternatives, &live, self.model, self.solver)?;

            tracing::debug!(
                round,
                candidate,
                opponent,
                preferred = answer.preferred,
                rational = answer.rational,
                confidence = answer.confidence,
                live = live.len(),
                "Applied answer"
            );
            if let Some(sink) = self.trace {
                let snapshot = RoundTrace {
                    round,
                    elapsed_ms: elapsed_ms(start),
                    candidate,
                    opponent,
                    preferred: answer.preferred,
                    rational: answer.rational,
                    confidence: answer.confidence,
                    emr: emr.iter().copied().collect(),
                    best_alternative: best,
                    estimated_regret,
                    branches: live.iter().map(BranchState::from).collect(),
                };
                if let Err(e) = sink.record(&snapshot) {
                    tracing::warn!(round, error = %e, "Failed to record round trace");
                }
            }

            rational_trace.push(answer.rational);
            answered.push(constraint);
            round += 1;
        }
    }

    /// Classifies the answer against every live region first, then splits,
    /// updates, prunes and merges.
    fn apply_answer(
        &self,
        live: Vec<Polytope>,
        constraint: &LinearConstraint,
        confidence: f64,
        round: usize,
    ) -> Result<Vec<Polytope>, ElicitationError> {
        let before = live.len();
        let classified = live
            .into_par_iter()
            .map(|p| -> Result<_, ElicitationError> {
                let side = p.intersection_test(constraint, self.solver, self.config.tolerance)?;
                Ok((p, side))
            })
            .collect::<Result<Vec<_>, ElicitationError>>()?;

        let mut non_empty = Vec::with_capacity(classified.len());
        for (p, side) in classified {
            match side {
                Some(side) => non_empty.push((p, side)),
                None => tracing::warn!(round, possibility = p.possibility(), "Dropping empty region"),
            }
        }
        if non_empty.is_empty() {
            tracing::warn!(round, live = before, "Every live region is empty");
            return Err(ElicitationError::AllBranchesEmpty { round });
        }

        let min_possibility = self.config.min_possibility;
        let next: Vec<Polytope> = non_empty
            .into_iter()
            .flat_map(|(p, side)| p.apply(side, constraint, confidence, self.config.t_norm))
            .filter(|p| p.possibility() > min_possibility)
            .collect();
        if next.is_empty() {
            tracing::warn!(round, min_possibility, "Every branch was pruned");
            return Err(ElicitationError::FullyContradicted { round });
        }
        Ok(dedup_by_history(next))
    }

    /// Classic mode: every answer is a hard constraint on the single region.
    /// A region the answer leaves empty ends the run.
    fn tighten(
        &self,
        mut live: Vec<Polytope>,
        constraint: &LinearConstraint,
        round: usize,
    ) -> Result<Vec<Polytope>, ElicitationError> {
        for p in &mut live {
            p.add_constraint(constraint, 1.0, TNorm::Minimum);
        }
        let feasible = live
            .par_iter()
            .map(|p| p.is_feasible(self.solver))
            .collect::<Result<Vec<bool>, _>>()?;
        if !feasible.iter().any(|&f| f) {
            tracing::warn!(round, "Answer leaves no feasible parameters");
            return Err(ElicitationError::AllBranchesEmpty { round });
        }
        Ok(live)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Returns the non-preferred index of the asked pair.
fn check_answer(answer: &Answer, candidate: usize, opponent: usize) -> Result<usize, ElicitationError> {
    // At zero confidence both halves of a cut stay fully possible.
    if !(answer.confidence > 0.0 && answer.confidence <= 1.0) {
        return Err(ElicitationError::invalid(format!(
            "confidence {} outside (0, 1]",
            answer.confidence
        )));
    }
    if answer.preferred == candidate {
        Ok(opponent)
    } else if answer.preferred == opponent {
        Ok(candidate)
    } else {
        Err(ElicitationError::invalid(format!(
            "answer prefers {} but the question was ({candidate}, {opponent})",
            answer.preferred
        )))
    }
}
