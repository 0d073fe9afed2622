use crate::models::ChatExchange;
use crate::services::export::preview_line;

pub fn empty_message(searching: bool) -> &'static str {
    if searching {
        "No exchanges match your search."
    } else {
        "No exchanges yet. Ask something to get started."
    }
}

/// Deleting an unknown id is a no-op, so the wording does not claim a removal.
pub fn deleted_message(id: i64) -> String {
    format!("No exchange #{} remains.", id)
}

pub fn format_exchange(exchange: &ChatExchange) -> String {
    let id = exchange
        .id
        .map(|id| format!("#{}", id))
        .unwrap_or_else(|| "#-".to_string());
    let date = exchange
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    let mut out = format!("{:<5} {:<16}  {}", id, date, preview_line(&exchange.question));
    out = out.trim_end().to_string();

    if exchange.answer.is_empty() {
        out.push_str("\n      (no answer)");
    } else {
        for line in exchange.answer.lines() {
            out.push_str("\n      ");
            out.push_str(line);
        }
    }
    out
}

pub fn print_exchanges(exchanges: &[ChatExchange], searching: bool) {
    if exchanges.is_empty() {
        println!("{}", empty_message(searching));
        return;
    }
    for exchange in exchanges {
        println!("{}\n", format_exchange(exchange));
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn formats_id_date_question_and_indented_answer() {
        let exchange = ChatExchange {
            id: Some(3),
            question: "2+2?".to_string(),
            answer: "4\nfour".to_string(),
            created_at: Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 0).unwrap()),
        };
        assert_eq!(
            format_exchange(&exchange),
            "#3    2025-01-02 03:04  2+2?\n      4\n      four"
        );
    }

    #[test]
    fn marks_missing_answer() {
        let exchange = ChatExchange {
            id: None,
            question: "quiet?".to_string(),
            answer: String::new(),
            created_at: None,
        };
        assert!(format_exchange(&exchange).ends_with("(no answer)"));
        assert!(format_exchange(&exchange).starts_with("#-"));
    }

    #[test]
    fn delete_message_is_neutral_about_existence() {
        assert_eq!(deleted_message(4242), "No exchange #4242 remains.");
    }

    #[test]
    fn empty_message_depends_on_search() {
        assert_ne!(empty_message(true), empty_message(false));
    }
}
