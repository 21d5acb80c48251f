//! Core data pipeline for the Nosh meal tracker.
//!
//! Everything in this crate is a pure, request-scoped computation: recovering
//! structured JSON from free-text model completions, validating it against the
//! closed set of payload shapes, resolving calorie values out of
//! schema-drifted records, and aggregating them into dashboard summaries.
//! I/O (the model call, the record store) lives in the API crate — functions
//! here depend only on their explicit inputs and return values or typed
//! failures, so concurrent invocations need no coordination.

pub mod aggregate;
pub mod error;
pub mod extraction;
pub mod payload;
pub mod records;
