// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proactive scheduling and backups for the Rafiq assistant.

pub mod backup;
pub mod jobs;

pub use backup::BackupService;
pub use jobs::spawn_jobs;
