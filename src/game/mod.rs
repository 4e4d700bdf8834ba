// src/game/mod.rs

//! Game rule engine.
//!
//! Pure, stateless-per-call rules for the supported grid games. The
//! coordinator owns match records; this module only knows how to initialize
//! a board, apply one move, and evaluate the terminal condition.

pub mod rules;
pub mod types;
