#![forbid(unsafe_code)]

//! # possibilist-harness
//!
//! Preference elicitation that survives wrong answers.
//!
//! A decision-maker compares pairs of multi-criteria alternatives and says
//! how confident they are. Each answer is a half-space over the weights of
//! a linear utility model. When an answer cuts through a region of
//! still-plausible weights, the region splits: one branch accepts the
//! answer, the other rejects it with possibility `1 - confidence`. Regret
//! for every branch comes from one LP per alternative pair, and the
//! branches are merged with a level (focal-set) integral over their
//! possibility degrees. Questions are picked to shrink the minimax regret
//! until it drops below a limit or the pair budget runs out.
//!
//! After a run, the branch histories support fault-tolerant fusion
//! (l-out-of-n re-weighting and maximal coherent subsets).

pub mod alternatives;
pub mod elicitation;
pub mod error;
pub mod focal_set;
pub mod fusion;
pub mod lp;
pub mod model;
pub mod polytope;
pub mod possibility;
pub mod regret;
pub mod simulation;

pub use alternatives::Alternatives;
pub use elicitation::{
    ElicitationConfig, ElicitationEngine, ElicitationMode, ElicitationOutcome, QuestionPolicy,
    Recommendation, StopReason,
};
pub use error::ElicitationError;
pub use focal_set::{aggregate, compute_epmr_emr, InconsistencyType};
pub use lp::{DenseSimplex, LinearConstraint, LinearProgram, LpError, LpOutcome, LpSolver, VarBounds};
pub use model::{answer_constraint, Model, ModelConstraints, WeightedSumModel};
pub use polytope::{Polytope, Side};
pub use possibility::TNorm;
