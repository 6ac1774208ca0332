//! Shared data types for the fraudwatch agent.

pub mod types;
