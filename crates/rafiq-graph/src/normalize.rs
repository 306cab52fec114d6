// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalisers applied at the ingestion boundary: debt directions, storage
//! locations, categories, tags, energy levels, and Hijri dates.

use rafiq_core::DebtDirection;
use std::sync::LazyLock;

/// Canonicalises any LLM-produced debt direction variant.
pub fn normalize_direction(direction: &str) -> DebtDirection {
    let d = direction.trim().to_lowercase();
    match d.as_str() {
        "owed_by_me" | "i_owe" | "i owe" | "i_owe_them" | "owed_to_other" => DebtDirection::IOwe,
        "owed_to_me" | "they_owe" | "they owe me" | "they_owe_me" => DebtDirection::OwedToMe,
        _ => DebtDirection::IOwe,
    }
}

const LOCATION_ALIASES: &[(&str, &str)] = &[
    ("bedroom", "غرفة النوم"),
    ("kitchen", "المطبخ"),
    ("bathroom", "الحمام"),
    ("living room", "الصالة"),
    ("garage", "الكراج"),
    ("roof", "السطح"),
    ("storage", "المخزن"),
    ("office", "المكتب"),
];

/// Normalises a location path: alias mapping plus `A > B` separator
/// spacing. Returns None for blank input.
pub fn normalize_location(path: &str) -> Option<String> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    let lower = path.to_lowercase();
    if let Some((_, ar)) = LOCATION_ALIASES.iter().find(|(en, _)| *en == lower) {
        return Some((*ar).to_string());
    }
    static SEP: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"\s*>\s*").expect("valid separator regex"));
    static SPACES: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"\s+").expect("valid spaces regex"));
    let path = SEP.replace_all(path, " > ");
    let path = SPACES.replace_all(&path, " ");
    let out = path.trim().to_string();
    (!out.is_empty()).then_some(out)
}

const CATEGORY_ALIASES: &[(&str, &str)] = &[
    ("electronics", "إلكترونيات"),
    ("electronic", "إلكترونيات"),
    ("cables", "إلكترونيات"),
    ("cable", "إلكترونيات"),
    ("كيابل", "إلكترونيات"),
    ("شواحن", "إلكترونيات"),
    ("chargers", "إلكترونيات"),
    ("batteries", "إلكترونيات"),
    ("بطاريات", "إلكترونيات"),
    ("tools", "أدوات"),
    ("tool", "أدوات"),
    ("عدة", "أدوات"),
    ("عدد", "أدوات"),
    ("parts", "قطع غيار"),
    ("spare parts", "قطع غيار"),
    ("household", "منزلية"),
    ("home", "منزلية"),
    ("منزلي", "منزلية"),
    ("accessories", "إكسسوارات"),
    ("accessory", "إكسسوارات"),
    ("stationery", "قرطاسية"),
    ("office supplies", "قرطاسية"),
    ("chemicals", "كيماويات"),
    ("chemical", "كيماويات"),
];

/// Normalises an inventory category to its Arabic canonical form.
pub fn normalize_category(category: &str) -> String {
    let cat = category.trim();
    if cat.is_empty() {
        return String::new();
    }
    let lower = cat.to_lowercase();
    CATEGORY_ALIASES
        .iter()
        .find(|(en, _)| *en == lower)
        .map(|(_, ar)| (*ar).to_string())
        .unwrap_or_else(|| cat.to_string())
}

const TAG_ALIASES: &[(&str, &str)] = &[
    ("programming", "برمجة"),
    ("coding", "برمجة"),
    ("code", "برمجة"),
    ("finance", "مالية"),
    ("money", "مالية"),
    ("health", "صحة"),
    ("medical", "صحة"),
    ("work", "عمل"),
    ("job", "عمل"),
    ("home", "منزل"),
    ("house", "منزل"),
    ("food", "طعام"),
    ("cooking", "طبخ"),
    ("travel", "سفر"),
    ("education", "تعليم"),
    ("learning", "تعليم"),
    ("shopping", "تسوق"),
    ("car", "سيارة"),
    ("auto", "سيارة"),
    ("tech", "تقنية"),
    ("technology", "تقنية"),
];

/// English→Arabic tag canonicalisation; unknown tags pass through lowercased.
pub fn normalize_tag(tag: &str) -> String {
    let t = tag.trim().to_lowercase();
    if t.is_empty() {
        return String::new();
    }
    TAG_ALIASES
        .iter()
        .find(|(en, _)| *en == t)
        .map(|(_, ar)| (*ar).to_string())
        .unwrap_or(t)
}

const ENERGY_ALIASES: &[(&str, &str)] = &[
    ("high", "high"),
    ("عالي", "high"),
    ("عالية", "high"),
    ("deep", "high"),
    ("deep focus", "high"),
    ("medium", "medium"),
    ("متوسط", "medium"),
    ("متوسطة", "medium"),
    ("normal", "medium"),
    ("low", "low"),
    ("منخفض", "low"),
    ("منخفضة", "low"),
    ("easy", "low"),
    ("light", "low"),
];

/// Maps any energy-level surface form onto high/medium/low.
pub fn normalize_energy(level: &str) -> String {
    let l = level.trim().to_lowercase();
    ENERGY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == l)
        .map(|(_, canon)| (*canon).to_string())
        .unwrap_or(l)
}

/// Keyword heuristic for an expense category from vendor + item names.
pub fn guess_expense_category(vendor: &str, items: &str) -> &'static str {
    let combined = format!("{vendor} {items}").to_lowercase();
    let rules: &[(&[&str], &str)] = &[
        (&["restaurant", "مطعم", "food", "burger", "pizza", "coffee", "كافيه", "starbucks", "mcdonald"], "food"),
        (&["grocery", "بقالة", "tamimi", "panda", "danube", "carrefour", "supermarket"], "groceries"),
        (&["gas", "بنزين", "fuel", "petrol", "station", "uber", "careem", "taxi"], "transport"),
        (&["pharmacy", "صيدلية", "medicine", "medical", "hospital", "clinic", "doctor"], "health"),
        (&["amazon", "noon", "jarir", "extra", "electronics"], "shopping"),
        (&["stc", "mobily", "zain", "internet", "phone", "telecom"], "telecom"),
        (&["rent", "إيجار", "electricity", "water", "كهرباء", "ماء"], "utilities"),
        (&["school", "university", "course", "training", "book"], "education"),
    ];
    for (keywords, category) in rules {
        if keywords.iter().any(|kw| combined.contains(kw)) {
            return category;
        }
    }
    "general"
}

/// Keyword heuristic for a knowledge category (Arabic buckets).
pub fn guess_knowledge_category(title: &str, content: &str) -> &'static str {
    let combined = format!("{title} {content}").to_lowercase();
    let rules: &[(&[&str], &str)] = &[
        (&["python", "rust", "code", "api", "bug", "git", "docker", "server", "database", "sql", "linux"], "تقنية"),
        (&["recipe", "cook", "food", "طبخ", "أكل", "وصفة"], "طبخ"),
        (&["health", "medicine", "doctor", "صحة", "دواء", "علاج"], "صحة"),
        (&["car", "engine", "سيارة", "محرك", "صيانة", "oil change"], "سيارة"),
        (&["money", "invest", "stock", "bank", "فلوس", "استثمار", "بنك"], "مالية"),
        (&["islam", "quran", "hadith", "prayer", "قرآن", "حديث", "صلاة", "دعاء"], "دين"),
        (&["travel", "flight", "hotel", "visa", "سفر", "فندق", "تأشيرة"], "سفر"),
        (&["work", "meeting", "شغل", "وظيفة", "اجتماع"], "عمل"),
        (&["plumbing", "electric", "بيت", "سباكة", "كهرباء"], "منزل"),
    ];
    for (keywords, category) in rules {
        if keywords.iter().any(|kw| combined.contains(kw)) {
            return category;
        }
    }
    "عام"
}

/// Converts a Hijri date to Gregorian using the tabular (arithmetical)
/// calendar. Dates of birth with year < 1900 are treated as Hijri.
///
/// The tabular calendar is within ±1 day of the observational Umm al-Qura
/// dates, which is adequate for stored birth dates.
pub fn hijri_to_gregorian(year: i32, month: u32, day: u32) -> Option<chrono::NaiveDate> {
    if !(1..=12).contains(&month) || !(1..=30).contains(&day) {
        return None;
    }
    let y = year as i64;
    let m = month as i64;
    let d = day as i64;
    // Julian day number of the tabular Hijri date (epoch 16 July 622 CE).
    let jdn = d + ((29.5 * (m - 1) as f64).ceil() as i64) + (y - 1) * 354
        + (3 + 11 * y) / 30
        + 1_948_439;
    chrono::NaiveDate::from_num_days_from_ce_opt((jdn - 1_721_425) as i32)
}

/// Splits a `YYYY-MM-DD` date and applies Hijri conversion when year < 1900.
/// Returns `(gregorian, Some(original))` when converted.
pub fn convert_dob_if_hijri(dob: &str) -> (String, Option<String>) {
    let parts: Vec<&str> = dob.split('-').collect();
    if parts.len() == 3 {
        if let (Ok(y), Ok(m), Ok(d)) = (
            parts[0].parse::<i32>(),
            parts[1].parse::<u32>(),
            parts[2].parse::<u32>(),
        ) {
            if y < 1900 {
                if let Some(greg) = hijri_to_gregorian(y, m, d) {
                    return (greg.format("%Y-%m-%d").to_string(), Some(dob.to_string()));
                }
            }
        }
    }
    (dob.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_variants_collapse() {
        assert_eq!(normalize_direction("i_owe"), DebtDirection::IOwe);
        assert_eq!(normalize_direction("OWED_BY_ME"), DebtDirection::IOwe);
        assert_eq!(normalize_direction("they owe me"), DebtDirection::OwedToMe);
        assert_eq!(normalize_direction("owed_to_me"), DebtDirection::OwedToMe);
        // Unknown variants default to i_owe so the invariant always holds.
        assert_eq!(normalize_direction("???"), DebtDirection::IOwe);
    }

    #[test]
    fn location_aliases_and_separators() {
        assert_eq!(normalize_location("kitchen").as_deref(), Some("المطبخ"));
        assert_eq!(
            normalize_location("السطح  >الرف الثاني").as_deref(),
            Some("السطح > الرف الثاني")
        );
        assert_eq!(normalize_location("  "), None);
    }

    #[test]
    fn category_and_tag_aliases() {
        assert_eq!(normalize_category("cables"), "إلكترونيات");
        assert_eq!(normalize_category("غير معروف"), "غير معروف");
        assert_eq!(normalize_tag("Programming"), "برمجة");
        assert_eq!(normalize_tag("siraj"), "siraj");
    }

    #[test]
    fn energy_levels_collapse() {
        assert_eq!(normalize_energy("عالي"), "high");
        assert_eq!(normalize_energy("Deep Focus"), "high");
        assert_eq!(normalize_energy("normal"), "medium");
        assert_eq!(normalize_energy("light"), "low");
    }

    #[test]
    fn expense_category_heuristic() {
        assert_eq!(guess_expense_category("Starbucks", ""), "food");
        assert_eq!(guess_expense_category("Tamimi Markets", ""), "groceries");
        assert_eq!(guess_expense_category("STC", "internet bill"), "telecom");
        assert_eq!(guess_expense_category("xyz", ""), "general");
    }

    #[test]
    fn knowledge_category_heuristic() {
        assert_eq!(guess_knowledge_category("docker compose notes", ""), "تقنية");
        assert_eq!(guess_knowledge_category("وصفة كبسة", ""), "طبخ");
        assert_eq!(guess_knowledge_category("random fact", ""), "عام");
    }

    #[test]
    fn hijri_conversion_is_close() {
        // 1 Muharram 1400 AH ≈ 21 November 1979.
        let greg = hijri_to_gregorian(1400, 1, 1).unwrap();
        assert_eq!(greg.format("%Y-%m").to_string(), "1979-11");

        let (converted, original) = convert_dob_if_hijri("1405-07-15");
        assert!(converted.starts_with("1985-0"), "got {converted}");
        assert_eq!(original.as_deref(), Some("1405-07-15"));

        // Gregorian years pass through untouched.
        let (kept, none) = convert_dob_if_hijri("1992-03-01");
        assert_eq!(kept, "1992-03-01");
        assert!(none.is_none());
    }

    #[test]
    fn invalid_hijri_components_are_rejected() {
        assert!(hijri_to_gregorian(1400, 13, 1).is_none());
        assert!(hijri_to_gregorian(1400, 0, 1).is_none());
        assert!(hijri_to_gregorian(1400, 1, 31).is_none());
        let (kept, none) = convert_dob_if_hijri("not-a-date");
        assert_eq!(kept, "not-a-date");
        assert!(none.is_none());
    }
}
