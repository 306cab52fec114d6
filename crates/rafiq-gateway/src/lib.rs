// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST/streaming surface for the Rafiq assistant.

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use server::{build_router, serve};
pub use state::AppState;
