use crate::models::ChatExchange;

pub fn export_to_markdown(exchanges: &[ChatExchange]) -> String {
    let mut output = String::from("# Chat history\n\n");

    if exchanges.is_empty() {
        output.push_str("_No exchanges._\n");
        return output;
    }

    for exchange in exchanges {
        let heading = preview_line(&exchange.question);
        output.push_str(&format!("## {}\n\n", heading));

        let mut meta = Vec::new();
        if let Some(id) = exchange.id {
            meta.push(format!("#{}", id));
        }
        if let Some(created_at) = exchange.created_at {
            meta.push(created_at.format("%Y-%m-%d %H:%M").to_string());
        }
        if !meta.is_empty() {
            output.push_str(&format!("> {}\n\n", meta.join(" | ")));
        }

        if heading != exchange.question {
            output.push_str(&format!("**Question:** {}\n\n", exchange.question));
        }

        if exchange.answer.is_empty() {
            output.push_str("_No answer._\n\n");
        } else {
            output.push_str(&format!("{}\n\n", exchange.answer));
        }
    }

    output
}

/// First line of `text`, cut to at most 50 bytes on a char boundary.
pub fn preview_line(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or(text);
    if first_line.len() > 50 {
        let boundary = first_line
            .char_indices()
            .take_while(|(i, _)| *i < 47)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(47);
        format!("{}...", &first_line[..boundary])
    } else {
        first_line.to_string()
    }
}
