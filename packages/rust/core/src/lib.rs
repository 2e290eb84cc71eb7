//! Core domain logic for simreport.
//!
//! Turns simulation reports into dataset rows: parameter extraction through
//! a chat model, derived-quantity calculation, row layout, and the run
//! pipeline that accumulates rows into a template-backed dataset.

pub mod derive;
pub mod extraction;
pub mod pipeline;
pub mod row;
