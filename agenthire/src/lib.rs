//! Agents hiring agents: pick the best on-chain agent team for a prompt,
//! fund it from escrow and pay each agent as it delivers.

pub mod backend;
pub mod balances;
pub mod chain;
pub mod config;
pub mod controllers;
pub mod error;
pub mod estimate;
pub mod funding;
pub mod gateway;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod state;
pub mod tracker;
pub mod units;
pub mod wallet;

pub use state::AppState;
