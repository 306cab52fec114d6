// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handlers grouped by surface area.

pub mod backup;
pub mod chat;
pub mod financial;
pub mod graph_viz;
pub mod ingest;
pub mod inventory;
pub mod proactive;
pub mod productivity;
pub mod reminders;
pub mod search;
pub mod workspace;

use std::str::FromStr;

/// Parses a recurrence string into the core enum.
pub fn parse_recurrence(raw: &str) -> Option<rafiq_core::Recurrence> {
    rafiq_core::Recurrence::from_str(raw.trim().to_lowercase().as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recurrence_parse() {
        assert_eq!(parse_recurrence("monthly"), Some(rafiq_core::Recurrence::Monthly));
        assert_eq!(parse_recurrence("WEEKLY"), Some(rafiq_core::Recurrence::Weekly));
        assert_eq!(parse_recurrence("hourly"), None);
    }
}
