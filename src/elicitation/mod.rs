//! Elicitation runs: configuration, question policies, the round loop and
//! the recommendation utilities used after a run.

pub mod config;
pub mod engine;
pub mod oracle;
pub mod recommend;
pub mod strategy;
pub mod trace;

pub use config::{ElicitationConfig, ElicitationMode};
pub use engine::{ElicitationEngine, ElicitationOutcome, StopReason};
pub use oracle::{fixed_choice, Answer, AnswerOracle};
pub use recommend::{
    epsilon_consistency, real_regret, recommend_from_polytopes, recommend_from_values,
    true_scores, Recommendation,
};
pub use strategy::{
    next_question, strategy_for, PessimisticStrategy, QuestionPolicy, QuestionStrategy,
    RandomStrategy, RegretView, VisitedPairs,
};
pub use trace::{
    read_trace, BranchState, JsonlTraceSink, MemoryTrace, RoundTrace, TraceError, TraceSink,
};
