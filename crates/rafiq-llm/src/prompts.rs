// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt templates and builders.
//!
//! User-facing text is Arabic; storage and extraction run in English. All
//! few-shot examples mirror real traffic so small local models stay on
//! format.

use chrono::{Datelike, Timelike};

use crate::types::{ChatMessage, ContentPart, ImageUrl, MessageContent};

// --- Translation ---

const AR_TO_EN_SYSTEM: &str = "You are a translation assistant. Translate the following Saudi Arabic (عامية سعودية) text to English.\nKeep proper nouns as-is. Preserve the meaning and intent accurately.\nOutput ONLY the English translation, nothing else.";

const AR_TO_EN_EXAMPLES: &[(&str, &str)] = &[
    ("وش صرفت هالشهر على الأكل؟", "How much did I spend this month on food?"),
    ("ذكرني أدفع الإيجار يوم ٢٥", "Remind me to pay rent on the 25th"),
    ("مشروع التطبيق وصل وين؟", "What's the status of the app project?"),
    ("أحمد يطلبني ٥٠٠ ريال", "Ahmad owes me 500 SAR"),
];

const EN_TO_AR_SYSTEM: &str = "You are a translation assistant. Translate the following English text to Saudi Arabic (عامية سعودية).\nUse natural colloquial Saudi dialect. Keep proper nouns as-is.\nOutput ONLY the Arabic translation, nothing else.";

const EN_TO_AR_EXAMPLES: &[(&str, &str)] = &[
    ("You spent 3200 SAR on food this month.", "صرفت ٣٢٠٠ ريال على الأكل هالشهر."),
    ("I set a reminder for rent payment on the 25th.", "حطيت لك تذكير تدفع الإيجار يوم ٢٥."),
];

pub fn build_translate_ar_to_en(text: &str) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(AR_TO_EN_SYSTEM)];
    for (ar, en) in AR_TO_EN_EXAMPLES {
        messages.push(ChatMessage::user(*ar));
        messages.push(ChatMessage::assistant(*en));
    }
    messages.push(ChatMessage::user(text));
    messages
}

pub fn build_translate_en_to_ar(text: &str) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(EN_TO_AR_SYSTEM)];
    for (en, ar) in EN_TO_AR_EXAMPLES {
        messages.push(ChatMessage::user(*en));
        messages.push(ChatMessage::assistant(*ar));
    }
    messages.push(ChatMessage::user(text));
    messages
}

// --- Fact extraction ---

const EXTRACT_SYSTEM: &str = r#"You are a fact extraction engine for a personal knowledge graph.
Extract entities and relationships from the user's text.

Entity types: Person, Company, Project, Idea, Task, Expense, Debt, DebtPayment, Reminder, Knowledge, Topic, Tag, Item, ItemUsage, ItemMove

Special entity types:
- DebtPayment (pseudo-entity): when someone pays back or settles a debt ("سدد", "رجع", "paid back", "settled"). Extract the person and amount; this updates the existing debt record.
- Item: a physical possession ("عندي", "شريت", "bought", "stored in"). Extract name, quantity (default 1), location, category, condition, brand.
- ItemUsage (pseudo-entity): items consumed/used/lost ("استخدمت", "ضاع", "used", "lost"). Extract item name and quantity_used.
- ItemMove (pseudo-entity): items moved between locations ("نقلت", "moved"). Extract item name, to_location (required), from_location (optional).
- Reminder subtypes via properties: reminder_type one of one_time (default), recurring, persistent, event_based, financial; recurrence daily/weekly/monthly/yearly; priority 1-5.

Never emit Section or ListEntry entities; those are created only through tools.

For each entity:
- entity_type, entity_name
- properties: key-value pairs (amount, date, status, category, description, ...)
- relationships: list of {type, target_type, target_name} (WORKS_AT, BELONGS_TO, OWES, RELATED_TO, ...)

Date format: YYYY-MM-DD. Currency defaults to SAR.

Respond with ONLY a JSON object: {"entities": [...]}. If nothing can be extracted, return {"entities": []}."#;

const EXTRACT_EXAMPLES: &[(&str, &str)] = &[
    (
        "Ahmad owes me 500 SAR for the dinner last week",
        r#"{"entities": [{"entity_type": "Debt", "entity_name": "dinner debt", "properties": {"amount": 500, "currency": "SAR", "direction": "owed_to_me", "reason": "dinner"}, "relationships": [{"type": "OWES", "target_type": "Person", "target_name": "Ahmad"}]}, {"entity_type": "Person", "entity_name": "Ahmad", "properties": {}, "relationships": []}]}"#,
    ),
    (
        "I spent 200 riyals on groceries at Tamimi today",
        r#"{"entities": [{"entity_type": "Expense", "entity_name": "groceries", "properties": {"amount": 200, "currency": "SAR", "category": "groceries"}, "relationships": [{"type": "PAID_AT", "target_type": "Company", "target_name": "Tamimi"}]}, {"entity_type": "Company", "entity_name": "Tamimi", "properties": {}, "relationships": []}]}"#,
    ),
    (
        "Remind me to pay rent on the 1st of every month",
        r#"{"entities": [{"entity_type": "Reminder", "entity_name": "pay rent", "properties": {"reminder_type": "recurring", "recurrence": "monthly", "priority": 4}, "relationships": []}]}"#,
    ),
    (
        "I have 5 USB-C cables stored in the roof storage on the second shelf",
        r#"{"entities": [{"entity_type": "Item", "entity_name": "USB-C cable", "properties": {"quantity": 5, "location": "السطح > الرف الثاني", "category": "cables"}, "relationships": []}]}"#,
    ),
    (
        "Ahmad paid back 200 SAR from the dinner debt",
        r#"{"entities": [{"entity_type": "DebtPayment", "entity_name": "dinner debt payment", "properties": {"amount": 200, "currency": "SAR"}, "relationships": [{"type": "PAID_BY", "target_type": "Person", "target_name": "Ahmad"}]}]}"#,
    ),
];

/// Extraction messages with a relative-date hint anchored to today.
pub fn build_extract(text: &str, today: &str, tomorrow: &str, ner_hints: &str) -> Vec<ChatMessage> {
    let date_hint = format!(
        "\n\nToday's date: {today}. Tomorrow: {tomorrow}. Use these to resolve relative dates like 'بكرة', 'tomorrow', 'next week'."
    );
    let mut messages = vec![ChatMessage::system(format!("{EXTRACT_SYSTEM}{date_hint}"))];
    for (input, output) in EXTRACT_EXAMPLES {
        messages.push(ChatMessage::user(*input));
        messages.push(ChatMessage::assistant(*output));
    }
    let user_text = if ner_hints.is_empty() {
        text.to_string()
    } else {
        format!("[NER hints: {ner_hints}]\n{text}")
    };
    messages.push(ChatMessage::user(user_text));
    messages
}

// --- Contextual enrichment ---

const CONTEXT_SYSTEM: &str = r#"You are a contextual enrichment engine.
Given a chunk of text and the full document it came from, add a brief contextual prefix (1-2 sentences) that situates this chunk within the broader document.

The context should help a search engine understand what this chunk is about even when read in isolation.

Respond with ONLY the contextualized chunk in this format:
"[Context: <brief context>] <original chunk text>""#;

pub fn build_context_enrichment(chunk: &str, full_document: &str) -> Vec<ChatMessage> {
    let doc_window: String = full_document.chars().take(2000).collect();
    vec![
        ChatMessage::system(CONTEXT_SYSTEM),
        ChatMessage::user(format!(
            "Full document:\n{doc_window}\n\n---\nChunk to contextualize:\n{chunk}"
        )),
    ]
}

// --- Classification ---

const CLASSIFY_SYSTEM: &str = r#"Classify the user's message into exactly one category.
Categories: financial, reminders, projects, tasks, knowledge, inventory, person, productivity, general.
Respond with ONLY JSON: {"category": "<one>", "confidence": <0..1>}"#;

pub fn build_classify(text: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::system(CLASSIFY_SYSTEM), ChatMessage::user(text)]
}

const FILE_CLASSIFY_SYSTEM: &str = r#"Classify this image into exactly one class:
invoice, official_document, personal_photo, info_image, note, project_file, price_list, business_card, inventory_item.
Respond with ONLY JSON: {"file_type": "<class>", "confidence": <0..1>, "brief_description": "<one line>"}"#;

pub fn build_file_classify(image_b64: &str, mime_type: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(FILE_CLASSIFY_SYSTEM),
        ChatMessage {
            role: "user".into(),
            content: Some(MessageContent::Parts(vec![
                ContentPart::Text {
                    text: "Classify this image.".into(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl::inline(mime_type, image_b64),
                },
            ])),
            tool_calls: None,
            tool_call_id: None,
        },
    ]
}

// --- Vision analysis (per-class templates) ---

fn vision_schema_for(file_type: &str) -> &'static str {
    match file_type {
        "invoice" => {
            r#"{"vendor": "", "date": "YYYY-MM-DD", "total_amount": 0, "currency": "SAR", "items": [{"name": "", "price": 0}]}"#
        }
        "business_card" => {
            r#"{"name": "", "name_ar": "", "company": "", "title": "", "phone": "", "email": ""}"#
        }
        "inventory_item" => {
            r#"{"item_name": "", "brand": "", "category": "", "condition": "", "quantity_visible": 1, "description": "", "specifications": []}"#
        }
        "official_document" => {
            r#"{"document_type": "", "title": "", "summary": "", "text_content": "", "dates": {}, "reference_numbers": {}, "parties": [], "members": [{"name": "", "role": "", "date_of_birth": "", "id_number": ""}]}"#
        }
        "price_list" => r#"{"vendor": "", "items": [{"name": "", "price": 0}], "currency": "SAR"}"#,
        "personal_photo" => r#"{"description": "", "tags": []}"#,
        _ => r#"{"description": "", "text_content": "", "tags": []}"#,
    }
}

/// Vision analysis prompt: the schema depends on the classified file type.
/// Arabic names and reference numbers must be preserved verbatim.
pub fn build_vision_analysis(
    image_b64: &str,
    file_type: &str,
    mime_type: &str,
    user_context: &str,
) -> Vec<ChatMessage> {
    let schema = vision_schema_for(file_type);
    let mut instruction = format!(
        "Analyze this {file_type} image. Extract all visible information.\n\
         Keep Arabic names exactly as written (do not transliterate) and copy reference numbers verbatim.\n\
         Respond with ONLY JSON matching this shape:\n{schema}"
    );
    if !user_context.is_empty() {
        instruction.push_str(&format!("\n\nUser context: {user_context}"));
    }
    vec![ChatMessage {
        role: "user".into(),
        content: Some(MessageContent::Parts(vec![
            ContentPart::Text { text: instruction },
            ContentPart::ImageUrl {
                image_url: ImageUrl::inline(mime_type, image_b64),
            },
        ])),
        tool_calls: None,
        tool_call_id: None,
    }]
}

// --- Summaries and core memory ---

pub const DAILY_SUMMARY_SYSTEM: &str = "Summarize the following conversation messages into a concise daily summary. Focus on key facts, decisions, tasks, and important information. Keep it under 500 words. Output only the summary.";

pub const CONVERSATION_COMPRESS_SYSTEM: &str = "لخّص المحادثة التالية بالعربي في فقرة قصيرة تحفظ الحقائق والقرارات والمهام المذكورة. اكتب الملخص فقط.";

pub const CORE_MEMORY_SYSTEM: &str = r#"Extract stable user preferences and patterns from this conversation (language style, recurring interests, constraints, habits).
Respond with ONLY JSON: {"preferences": {"<key>": "<value>"}}. Return {"preferences": {}} when nothing new is stated."#;

// --- Tool-calling system prompt ---

const WEEKDAYS_AR: [&str; 7] = [
    "الاثنين",
    "الثلاثاء",
    "الأربعاء",
    "الخميس",
    "الجمعة",
    "السبت",
    "الأحد",
];

/// Arabic system prompt for the tool loop. Includes the current local time,
/// memory excerpts, and the focused project when set.
pub fn build_tool_system_prompt(
    now_local: chrono::DateTime<chrono::FixedOffset>,
    memory_context: &str,
    active_project: Option<&str>,
) -> String {
    let today = now_local.format("%Y-%m-%d").to_string();
    let tomorrow = (now_local + chrono::Duration::days(1))
        .format("%Y-%m-%d")
        .to_string();
    let weekday = WEEKDAYS_AR[now_local.weekday().num_days_from_monday() as usize];
    let tomorrow_weekday = WEEKDAYS_AR[(now_local.weekday().num_days_from_monday() as usize + 1) % 7];
    let clock = format!("{:02}:{:02}", now_local.hour(), now_local.minute());

    let project_line = match active_project {
        Some(p) => format!("\nالمشروع النشط حالياً: {p} — اربط المهام والملاحظات الجديدة فيه إلا إذا حدد المستخدم غيره.\n"),
        None => String::new(),
    };

    format!(
        r#"أنت مساعد شخصي ذكي. رد بالعربي السعودي العامي.

الوقت: {clock} | اليوم: {weekday} {today} | بكرة: {tomorrow_weekday} {tomorrow}
{project_line}
ذاكرتك:
{memory_context}

تعليمات:
- عندك أدوات (tools) تقدر تستخدمها. لو المستخدم يبي إجراء (تذكير، مصروف، حذف، دين)، استخدم الأداة المناسبة.
- لو المستخدم يسأل سؤال عام أو يبي معلومات، استخدم search_knowledge.
- لو المستخدم يقول "خلصت" أو "أنجزت" تذكير، استخدم update_reminder مع action=done.
- لو المستخدم يبي يسجل دين، استخدم record_debt. "عليّ لفلان" = i_owe، "لي عند فلان" = owed_to_me.
- لو المستخدم يتكلم عن أغراض أو مخزون، استخدم manage_inventory.
- مهم جداً: لو المستخدم طلب عدة إجراءات، نفذها كلها دفعة وحدة بنداءات أدوات متعددة في نفس الرد. لا تنفذ جزء وتسأل عن الباقي.
- بعد ما الأداة ترجع النتيجة، رد على المستخدم بناءً على النتيجة الفعلية.
- لو الأداة رجعت قائمة، اعرض كل العناصر بالتفصيل — لا تلخص ولا تحذف عناصر.
- لو الأداة رجعت خطأ (error/success=false)، قول للمستخدم إن العملية ما نجحت.
- ممنوع تقول "تم" إلا إذا الأداة رجعت نجاح فعلي.
- ردك لازم يكون نص عربي طبيعي — ممنوع JSON أو كود.
- لا تضيف أسئلة متابعة في نهاية ردك."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn translate_messages_interleave_examples() {
        let messages = build_translate_ar_to_en("وش عندي بكرة؟");
        assert_eq!(messages[0].role, "system");
        // system + 4 example pairs + user
        assert_eq!(messages.len(), 1 + AR_TO_EN_EXAMPLES.len() * 2 + 1);
        assert_eq!(messages.last().unwrap().content_text(), "وش عندي بكرة؟");
    }

    #[test]
    fn extract_prompt_carries_date_hint_and_ner() {
        let messages = build_extract("met Mohamed at work", "2026-02-11", "2026-02-12", "Person: محمد");
        let system = messages[0].content_text();
        assert!(system.contains("Today's date: 2026-02-11"));
        let user = messages.last().unwrap().content_text();
        assert!(user.starts_with("[NER hints: Person: محمد]"));
    }

    #[test]
    fn extract_prompt_without_hints_is_bare() {
        let messages = build_extract("plain text", "2026-02-11", "2026-02-12", "");
        assert_eq!(messages.last().unwrap().content_text(), "plain text");
    }

    #[test]
    fn enrichment_truncates_document_window() {
        let long_doc = "x".repeat(5000);
        let messages = build_context_enrichment("chunk", &long_doc);
        let user = messages[1].content_text();
        assert!(user.len() < 2200, "document window not truncated");
        assert!(user.contains("Chunk to contextualize:\nchunk"));
    }

    #[test]
    fn vision_schema_varies_by_type() {
        assert!(vision_schema_for("invoice").contains("total_amount"));
        assert!(vision_schema_for("business_card").contains("name_ar"));
        assert!(vision_schema_for("inventory_item").contains("quantity_visible"));
        assert!(vision_schema_for("something_else").contains("description"));
    }

    #[test]
    fn tool_system_prompt_includes_clock_and_project() {
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2026, 2, 11, 9, 30, 0).unwrap();
        let prompt = build_tool_system_prompt(now, "=== Core Memory ===", Some("Farm"));
        assert!(prompt.contains("09:30"));
        assert!(prompt.contains("2026-02-11"));
        assert!(prompt.contains("المشروع النشط حالياً: Farm"));
        assert!(prompt.contains("=== Core Memory ==="));

        let without = build_tool_system_prompt(now, "", None);
        assert!(!without.contains("المشروع النشط"));
    }

    #[test]
    fn file_classify_carries_inline_image() {
        let messages = build_file_classify("QUJD", "image/jpeg");
        match &messages[1].content {
            Some(MessageContent::Parts(parts)) => match &parts[1] {
                ContentPart::ImageUrl { image_url } => {
                    assert!(image_url.url.starts_with("data:image/jpeg;base64,"));
                }
                other => panic!("expected image part, got {other:?}"),
            },
            other => panic!("expected parts, got {other:?}"),
        }
    }
}
