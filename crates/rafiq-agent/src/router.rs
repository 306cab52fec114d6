// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Smart router: regex patterns in specificity order map messages to a
//! route label. First match wins; no match falls back to an LLM classify
//! call upstream. Routes are deterministic under Arabic diacritics and
//! whitespace variation.

use regex::Regex;
use std::sync::LazyLock;

/// Route labels produced by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    DebtPayment,
    DebtSummary,
    FinancialReport,
    Financial,
    InventoryDuplicates,
    InventoryReport,
    InventoryMove,
    InventoryUsage,
    InventoryUnused,
    Inventory,
    ReminderDelete,
    ReminderCancel,
    Reminders,
    Projects,
    Tasks,
    Productivity,
    Person,
    Knowledge,
    General,
}

impl Route {
    pub fn label(&self) -> &'static str {
        match self {
            Route::DebtPayment => "debt_payment",
            Route::DebtSummary => "debt_summary",
            Route::FinancialReport => "financial_report",
            Route::Financial => "financial",
            Route::InventoryDuplicates => "inventory_duplicates",
            Route::InventoryReport => "inventory_report",
            Route::InventoryMove => "inventory_move",
            Route::InventoryUsage => "inventory_usage",
            Route::InventoryUnused => "inventory_unused",
            Route::Inventory => "inventory",
            Route::ReminderDelete => "reminder_delete",
            Route::ReminderCancel => "reminder_cancel",
            Route::Reminders => "reminders",
            Route::Projects => "projects",
            Route::Tasks => "tasks",
            Route::Productivity => "productivity",
            Route::Person => "person",
            Route::Knowledge => "knowledge",
            Route::General => "general",
        }
    }
}

/// Strips Arabic diacritics (tashkeel) and collapses whitespace so two
/// messages equal up to diacritics route identically.
pub fn normalize_message(message: &str) -> String {
    let without_diacritics: String = message
        .chars()
        .filter(|c| !('\u{064B}'..='\u{0652}').contains(c) && *c != '\u{0670}')
        .collect();
    without_diacritics
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

struct Rule {
    route: Route,
    pattern: &'static Regex,
}

macro_rules! rule {
    ($route:expr, $name:ident, $re:literal) => {{
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("valid route regex"));
        Rule {
            route: $route,
            pattern: &$name,
        }
    }};
}

/// Specificity-ordered rules. Debt payment must match before debt summary,
/// debt summary before financial report, report before generic financial;
/// inventory duplicates before report before move before usage before
/// unused before the generic inventory route.
fn rules() -> Vec<Rule> {
    vec![
        rule!(Route::DebtPayment, DEBT_PAYMENT, r"(سدد|سددت|رجع الفلوس|دفع اللي عليه|paid back|settle)"),
        rule!(Route::DebtSummary, DEBT_SUMMARY, r"(الديون|ديوني|كم لي عند|كم علي|من يطلبني|who owes|debts?)"),
        rule!(Route::FinancialReport, FIN_REPORT, r"(تقرير المصاريف|كم صرفت|مصاريف الشهر|monthly report|spending report)"),
        rule!(Route::Financial, FINANCIAL, r"(صرفت|مصروف|دين|فلوس|ريال|spent|expense|سلفت)"),
        rule!(Route::InventoryDuplicates, INV_DUP, r"(مكرر|نسختين|duplicates?)"),
        rule!(Route::InventoryReport, INV_REPORT, r"(تقرير المخزون|جرد|inventory report)"),
        rule!(Route::InventoryMove, INV_MOVE, r"(نقلت|حرّكت|حركت|حطيته في|نقل .* إلى|moved?)"),
        rule!(Route::InventoryUsage, INV_USE, r"(استخدمت|خلصت|ضاع|عطيت|used up|consumed|lost)"),
        rule!(Route::InventoryUnused, INV_UNUSED, r"(ما استخدمت|غير مستخدم|unused)"),
        rule!(Route::Inventory, INVENTORY, r"(مخزون|أغراض|غرض|وين حطيت|فين حطيت|inventory|stored|عندي كم)"),
        rule!(Route::ReminderDelete, REM_DELETE, r"(احذف|امسح|شيل|delete|remove).{0,30}(تذكير|reminder)"),
        rule!(Route::ReminderCancel, REM_CANCEL, r"(ألغ|الغ|cancel).{0,30}(تذكير|reminder)"),
        rule!(Route::Reminders, REMINDERS, r"(ذكرني|تذكير|تذكيرات|موعد|مواعيد|remind|reminders?)"),
        rule!(Route::Projects, PROJECTS, r"(مشروع|مشاريع|projects?)"),
        rule!(Route::Tasks, TASKS, r"(مهمة|مهام|مهامي|tasks?|todo)"),
        rule!(Route::Productivity, PRODUCTIVITY, r"(إنتاجية|تركيز|سبرنت|بومودورو|focus session|sprint|productivity)"),
        rule!(Route::Person, PERSON, r"(مين هو|من هو|معلومات عن|who is)"),
        rule!(Route::Knowledge, KNOWLEDGE, r"(وش تعرف|ابحث|تذكر لما|what do you know|search)"),
    ]
}

/// Routes a message to its label; `None` means the caller should fall back
/// to LLM classification.
pub fn route_message(message: &str) -> Option<Route> {
    let normalized = normalize_message(message);
    rules()
        .into_iter()
        .find(|rule| rule.pattern.is_match(&normalized))
        .map(|rule| rule.route)
}

/// True for delete/cancel intents that require a confirmation round-trip.
pub fn is_destructive_intent(message: &str) -> bool {
    matches!(
        route_message(message),
        Some(Route::ReminderDelete) | Some(Route::ReminderCancel)
    )
}

/// True for an affirmative confirmation answer.
pub fn is_affirmative(message: &str) -> bool {
    static YES: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\s*(نعم|أيوه|ايوه|اي|أكيد|اكيد|yes|y|نعم احذف|تمام)\s*$").expect("valid regex")
    });
    YES.is_match(&normalize_message(message))
}

/// True for a negative confirmation answer.
pub fn is_negative(message: &str) -> bool {
    static NO: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\s*(لا|لأ|مو|كنسل|no|n)\s*$").expect("valid regex"));
    NO.is_match(&normalize_message(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specificity_order_debt_before_financial() {
        assert_eq!(route_message("أحمد سدد اللي عليه"), Some(Route::DebtPayment));
        assert_eq!(route_message("كم علي من ديون؟"), Some(Route::DebtSummary));
        assert_eq!(route_message("أبغى تقرير المصاريف"), Some(Route::FinancialReport));
        assert_eq!(route_message("صرفت ٥٠ ريال"), Some(Route::Financial));
    }

    #[test]
    fn specificity_order_inventory() {
        assert_eq!(route_message("في أغراض مكررة؟"), Some(Route::InventoryDuplicates));
        assert_eq!(route_message("أبغى تقرير المخزون"), Some(Route::InventoryReport));
        assert_eq!(route_message("نقلت الطابعة للمكتب"), Some(Route::InventoryMove));
        assert_eq!(route_message("استخدمت كيبلين"), Some(Route::InventoryUsage));
        assert_eq!(route_message("وين حطيت الشاحن؟"), Some(Route::Inventory));
    }

    #[test]
    fn reminder_delete_detected_as_destructive() {
        assert_eq!(route_message("احذف تذكير دفع الإيجار"), Some(Route::ReminderDelete));
        assert!(is_destructive_intent("احذف تذكير دفع الإيجار"));
        assert!(!is_destructive_intent("ذكرني أدفع الإيجار"));
    }

    #[test]
    fn diacritics_do_not_change_routing() {
        // Same text with and without tashkeel routes identically.
        let plain = route_message("ذكرني اشتري حليب");
        let diacritised = route_message("ذَكِّرني اشتري حليب");
        assert_eq!(plain, diacritised);
        assert_eq!(plain, Some(Route::Reminders));
    }

    #[test]
    fn whitespace_does_not_change_routing() {
        assert_eq!(
            route_message("  ذكرني   اشتري حليب  "),
            route_message("ذكرني اشتري حليب")
        );
    }

    #[test]
    fn unroutable_message_falls_through() {
        assert_eq!(route_message("السلام عليكم"), None);
    }

    #[test]
    fn confirmation_answers() {
        assert!(is_affirmative("نعم"));
        assert!(is_affirmative("أكيد"));
        assert!(is_affirmative("yes"));
        assert!(!is_affirmative("نعم ولكن"));
        assert!(is_negative("لا"));
        assert!(is_negative("no"));
        assert!(!is_negative("لا أدري"));
    }
}
