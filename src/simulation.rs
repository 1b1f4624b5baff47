//! Synthetic decision-makers and batch runs.
//!
//! Scenarios draw a Pareto front of alternatives, a hidden weight vector,
//! and a per-question confidence and rationality stream. Runs are
//! independent and are spread over a dedicated rayon pool.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::DVector;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Beta, Exp};

use crate::alternatives::Alternatives;
use crate::elicitation::{
    fixed_choice, real_regret, recommend_from_values, true_scores, Answer, AnswerOracle,
    ElicitationConfig, ElicitationEngine, ElicitationMode, ElicitationOutcome, StopReason,
    TraceSink,
};
use crate::error::ElicitationError;
use crate::fusion::{find_incorrect_answers, k_among_n_possibilities};
use crate::lp::DenseSimplex;
use crate::model::{Model, WeightedSumModel};

// =============================================================================
// Decision-maker
// =============================================================================

/// Answers from hidden weights, with a scripted rationality and confidence
/// per round. Rounds past the script answer rationally at full confidence.
#[derive(Debug, Clone)]
pub struct SimulatedDecisionMaker {
    weights: DVector<f64>,
    rational: Vec<bool>,
    confidence: Vec<f64>,
}

impl SimulatedDecisionMaker {
    pub fn new(weights: Vec<f64>, rational: Vec<bool>, confidence: Vec<f64>) -> Self {
        Self {
            weights: DVector::from_vec(weights),
            rational,
            confidence,
        }
    }

    /// Always rational, always fully confident.
    pub fn truthful(weights: Vec<f64>) -> Self {
        Self::new(weights, Vec::new(), Vec::new())
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }
}

impl AnswerOracle for SimulatedDecisionMaker {
    fn answer(
        &mut self,
        round: usize,
        candidate: usize,
        opponent: usize,
        alternatives: &Alternatives,
        model: &dyn Model,
    ) -> Result<Answer, ElicitationError> {
        let rational = self.rational.get(round).copied().unwrap_or(true);
        let confidence = self.confidence.get(round).copied().unwrap_or(1.0);
        let preferred = fixed_choice(model, &self.weights, alternatives, candidate, opponent, rational)?;
        Ok(Answer {
            preferred,
            rational,
            confidence,
        })
    }

    fn true_scores(&self, alternatives: &Alternatives, model: &dyn Model) -> Option<DVector<f64>> {
        (self.weights.len() == model.parameter_count())
            .then(|| true_scores(alternatives, model, &self.weights))
    }
}

// =============================================================================
// Scenario generation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceProfile {
    /// Beta(7, 2)
    Strong,
    /// Beta(2, 7)
    Weak,
    /// Beta(5, 5)
    Intermediate,
    /// Uniform(0.01, 0.99)
    #[default]
    Uniform,
}

impl fmt::Display for ConfidenceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strong => "strong",
            Self::Weak => "weak",
            Self::Intermediate => "intermediate",
            Self::Uniform => "uniform",
        })
    }
}

impl FromStr for ConfidenceProfile {
    type Err = ElicitationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strong" => Ok(Self::Strong),
            "weak" => Ok(Self::Weak),
            "intermediate" => Ok(Self::Intermediate),
            "uniform" => Ok(Self::Uniform),
            other => Err(ElicitationError::InvalidConfig(format!(
                "unknown confidence profile `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub alternatives: usize,
    pub criteria: usize,
    pub questions: usize,
    pub confidence: ConfidenceProfile,
    pub seed: u64,
}

/// A fully drawn scenario; also the input format of `elicit run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub alternatives: Vec<Vec<f64>>,
    pub weights: Vec<f64>,
    pub confidence: Vec<f64>,
    pub rational: Vec<bool>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn stats_err(e: impl fmt::Display) -> ElicitationError {
    ElicitationError::InvalidConfig(e.to_string())
}

impl ScenarioSpec {
    pub fn generate(&self) -> Result<Scenario, ElicitationError> {
        if self.alternatives == 0 || self.criteria == 0 {
            return Err(ElicitationError::InvalidConfig(
                "scenario needs at least one alternative and one criterion".to_string(),
            ));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);

        // Every row sums to criteria/2, so no row dominates another.
        let front = self.criteria as f64 / 2.0;
        let alternatives = (0..self.alternatives)
            .map(|_| {
                let raw: Vec<f64> = (0..self.criteria).map(|_| rng.gen_range(1e-6..1.0)).collect();
                let total: f64 = raw.iter().sum();
                raw.into_iter().map(|v| v * front / total).collect()
            })
            .collect();

        // Dirichlet(1, ..., 1) as normalized unit exponentials.
        let exp = Exp::new(1.0).map_err(stats_err)?;
        let draws: Vec<f64> = (0..self.criteria).map(|_| exp.sample(&mut rng)).collect();
        let total: f64 = draws.iter().sum();
        let weights = draws.into_iter().map(|v| v / total).collect();

        let confidence: Vec<f64> = match self.confidence {
            ConfidenceProfile::Uniform => (0..self.questions)
                .map(|_| round2(rng.gen_range(0.01..0.99)))
                .collect(),
            profile => {
                let (a, b) = match profile {
                    ConfidenceProfile::Strong => (7.0, 2.0),
                    ConfidenceProfile::Weak => (2.0, 7.0),
                    _ => (5.0, 5.0),
                };
                let beta = Beta::new(a, b).map_err(stats_err)?;
                (0..self.questions)
                    .map(|_| round2(beta.sample(&mut rng)).max(0.01))
                    .collect()
            }
        };

        let mut rational: Vec<bool> = confidence
            .iter()
            .map(|&c| rng.gen::<f64>() <= c + (1.0 - c) / 2.0)
            .collect();
        if !rational.is_empty() && rational.iter().all(|&r| r) {
            let flip = rng.gen_range(0..rational.len());
            rational[flip] = false;
        }

        Ok(Scenario {
            alternatives,
            weights,
            confidence,
            rational,
        })
    }
}

impl Scenario {
    pub fn decision_maker(&self) -> SimulatedDecisionMaker {
        SimulatedDecisionMaker::new(
            self.weights.clone(),
            self.rational.clone(),
            self.confidence.clone(),
        )
    }

    /// Pareto-filters the alternatives and runs one elicitation.
    pub fn run(
        &self,
        config: &ElicitationConfig,
        trace: Option<&dyn TraceSink>,
    ) -> Result<(Alternatives, ElicitationOutcome), ElicitationError> {
        let alternatives = Alternatives::pareto_efficient(self.alternatives.clone())?;
        let model = WeightedSumModel::new(alternatives.criteria())?;
        let solver = DenseSimplex::default();
        let mut engine = ElicitationEngine::new(&alternatives, &model, &solver, config.clone())?;
        if let Some(sink) = trace {
            engine = engine.with_trace(sink);
        }
        let outcome = engine.run(&mut self.decision_maker())?;
        Ok((alternatives, outcome))
    }
}

// =============================================================================
// Batch runs
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// No recommendation: every branch emptied or pruned.
    Aborted,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub status: RunStatus,
    pub stop_reason: Option<StopReason>,
    pub best_alternative: Option<usize>,
    pub real_regret: Option<f64>,
    pub estimated_regret: Option<f64>,
    pub rounds: usize,
    pub elapsed_ms: u64,
    pub irrational_answers: usize,
    /// Fewest weakened answers over the terminal branches.
    pub detected_errors: Option<usize>,
    /// Real regret after l-out-of-n re-weighting of the terminal branches.
    pub l_out_of_n_regret: Option<f64>,
    pub error: Option<String>,
}

impl RunSummary {
    fn failed(seed: u64, status: RunStatus, error: &ElicitationError) -> Self {
        Self {
            seed,
            status,
            stop_reason: None,
            best_alternative: None,
            real_regret: None,
            estimated_regret: None,
            rounds: 0,
            elapsed_ms: 0,
            irrational_answers: 0,
            detected_errors: None,
            l_out_of_n_regret: None,
            error: Some(error.to_string()),
        }
    }
}

/// Re-weights the terminal branches assuming exactly the fewest detected
/// errors are wrong, and scores the resulting recommendation.
fn l_out_of_n_regret(
    outcome: &ElicitationOutcome,
    scores: &DVector<f64>,
    config: &ElicitationConfig,
) -> Result<Option<f64>, ElicitationError> {
    let Some(&errors) = find_incorrect_answers(&outcome.polytopes).iter().min() else {
        return Ok(None);
    };
    let n = outcome.rounds;
    let possibilities = k_among_n_possibilities(&outcome.polytopes, n - errors.min(n), n, config.t_norm)?;
    let rec = recommend_from_values(&outcome.pmr_list, &possibilities, config.inconsistency)?;
    Ok(Some(real_regret(scores, rec.best_alternative)))
}

pub fn run_one(spec: &ScenarioSpec, config: &ElicitationConfig) -> RunSummary {
    let scenario = match spec.generate() {
        Ok(s) => s,
        Err(e) => return RunSummary::failed(spec.seed, RunStatus::Failed, &e),
    };
    let (alternatives, outcome) = match scenario.run(config, None) {
        Ok(r) => r,
        Err(e) => {
            let status = if e.is_no_recommendation() {
                RunStatus::Aborted
            } else {
                RunStatus::Failed
            };
            tracing::warn!(seed = spec.seed, error = %e, "Run ended without a recommendation");
            return RunSummary::failed(spec.seed, status, &e);
        }
    };

    let possibilistic = config.mode == ElicitationMode::Possibilistic;
    let model = WeightedSumModel {
        criteria: alternatives.criteria(),
    };
    let scores = true_scores(&alternatives, &model, &DVector::from_vec(scenario.weights.clone()));
    let l_out_of_n = if possibilistic {
        l_out_of_n_regret(&outcome, &scores, config).unwrap_or_else(|e| {
            tracing::warn!(seed = spec.seed, error = %e, "Skipping l-out-of-n fusion");
            None
        })
    } else {
        None
    };

    RunSummary {
        seed: spec.seed,
        status: RunStatus::Completed,
        stop_reason: Some(outcome.stop_reason),
        best_alternative: Some(outcome.best_original_index),
        real_regret: outcome.real_regret,
        estimated_regret: Some(outcome.estimated_regret),
        rounds: outcome.rounds,
        elapsed_ms: outcome.elapsed_ms,
        irrational_answers: outcome.rational_trace.iter().filter(|r| !**r).count(),
        detected_errors: possibilistic
            .then(|| find_incorrect_answers(&outcome.polytopes).into_iter().min())
            .flatten(),
        l_out_of_n_regret: l_out_of_n,
        error: None,
    }
}

/// Worker count leaving one core for coordination.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Runs every scenario on its own pool; output order matches `specs`.
pub fn run_batch(
    specs: &[ScenarioSpec],
    config: &ElicitationConfig,
    threads: Option<usize>,
) -> Result<Vec<RunSummary>, ElicitationError> {
    config.validate()?;
    let threads = threads.unwrap_or_else(default_threads).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| ElicitationError::InvalidConfig(format!("thread pool: {e}")))?;

    let done = AtomicUsize::new(0);
    let total = specs.len();
    let summaries = pool.install(|| {
        specs
            .par_iter()
            .map(|spec| {
                let summary = run_one(spec, config);
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(finished, total, seed = spec.seed, "Run complete");
                summary
            })
            .collect()
    });
    Ok(summaries)
}

/// `runs` specs with consecutive seeds starting at `seed`.
pub fn batch_specs(
    runs: usize,
    seed: u64,
    alternatives: usize,
    criteria: usize,
    questions: usize,
    confidence: ConfidenceProfile,
) -> Vec<ScenarioSpec> {
    (0..runs as u64)
        .map(|i| ScenarioSpec {
            alternatives,
            criteria,
            questions,
            confidence,
            seed: seed.wrapping_add(i),
        })
        .collect()
}
