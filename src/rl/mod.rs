// src/rl/mod.rs
//! Dwell-time decision engine
//!
//! Turns observed decoy traffic into a state vector and a reward, and learns
//! which dwell time to pick with one of three interchangeable policies:
//! an epsilon-greedy bandit, a UCB bandit, or a tabular Q-learning agent.

pub mod action_space;
pub mod epsilon_greedy;
pub mod errors;
pub mod orchestrator;
pub mod policy;
pub mod policy_store;
pub mod q_agent;
pub mod reward;
pub mod sessions;
pub mod state_extractor;
pub mod ucb;
pub mod value_table;

// Re-exports for convenience
pub use action_space::ActionSpace;
pub use epsilon_greedy::EpsilonGreedyBandit;
pub use errors::{ConfigError, PolicyError};
pub use orchestrator::{CycleOutcome, DwellDecision, DwellOrchestrator};
pub use policy::{DwellPolicy, Policy, PolicyKind, PolicyParams, PolicySnapshot, Transition};
pub use policy_store::{PolicyStore, StoredPolicy};
pub use q_agent::QAgent;
pub use reward::{compute_reward, compute_reward_breakdown, RewardBreakdown, RewardWeights, RiskProfile};
pub use state_extractor::{extract_state, extract_state_with_gap};
pub use ucb::UcbBandit;
