//! Core identifier and parameter types

pub mod behavior;
pub mod ids;
pub mod rule_type;
