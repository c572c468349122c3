//! Ready-made game definitions built on the engine.
//!
//! These exist as working references and test fixtures: every rule is
//! ordinary expression text, exactly what a specification document would
//! contain. Nothing here extends the engine.

pub mod checkers;
