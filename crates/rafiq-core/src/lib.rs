// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Rafiq personal-knowledge assistant.
//!
//! This crate provides the error taxonomy, shared domain types, and time
//! helpers used throughout the Rafiq workspace. Service crates depend on
//! this one and never on each other's internals.

pub mod error;
pub mod time;
pub mod types;

pub use error::RafiqError;
pub use types::{
    ChatReply, DebtDirection, ExtractedEntity, ExtractedFacts, ExtractedRelationship,
    IngestSummary, Recurrence, ReminderStatus, StreamLine, TaskStatus, ToolOutcome,
};
