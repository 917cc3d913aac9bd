//! Natural-language to SQL translation.
//!
//! Live mode prompts the chat model with the schema context and runs the
//! reply through [`clean_generated_sql`]; models pad their answers with
//! prose, fences, and labels, and the cleanup recovers the bare statement.
//! Mock mode (no database connection) returns deterministic templates keyed
//! off question keywords.

use deskbot_core::{ChatMessage, ChatModel, PipelineError};

const STATEMENT_KEYWORDS: &[&str] =
    &["SELECT", "INSERT", "UPDATE", "DELETE", "WITH", "CREATE", "DROP", "ALTER"];

/// Ask the model for a single sqlite statement answering `question`.
pub async fn translate_with_model(
    question: &str,
    table_info: &str,
    model: &dyn ChatModel,
) -> Result<String, PipelineError> {
    let system = format!(
        "You are an expert SQL assistant for a sqlite database. \
         Given a question, reply with exactly one read-only SQL statement and nothing else. \
         Do not explain the query.\n\nSchema:\n{table_info}"
    );
    let messages = [ChatMessage::system(system), ChatMessage::user(question.to_string())];

    let raw = model
        .complete(&messages)
        .await
        .map_err(|error| PipelineError::Model(error.to_string()))?;

    Ok(clean_generated_sql(&raw))
}

/// Strip the decoration chat models wrap around generated SQL.
///
/// Applied in order: take everything after a `SQLQuery:` marker, remove code
/// fences, drop a leading `SQL:`/`Query:` label, then cut from the first
/// recognized statement keyword to the end.
pub fn clean_generated_sql(raw: &str) -> String {
    let mut sql = raw.trim();

    if let Some((_, after)) = sql.split_once("SQLQuery:") {
        sql = after.trim();
    }

    if let Some(stripped) = sql.strip_prefix("```sql") {
        sql = stripped.trim();
    } else if let Some(stripped) = sql.strip_prefix("```") {
        sql = stripped.trim();
    }
    if let Some(stripped) = sql.strip_suffix("```") {
        sql = stripped.trim();
    }

    for label in ["SQL:", "Query:", "sql:", "query:"] {
        if let Some(stripped) = sql.strip_prefix(label) {
            sql = stripped.trim();
            break;
        }
    }

    if let Some(start) = first_statement_start(sql) {
        sql = sql[start..].trim();
    }

    sql.to_string()
}

/// Position of the first statement keyword followed by whitespace, checking
/// keywords in a fixed priority order rather than by earliest position.
fn first_statement_start(sql: &str) -> Option<usize> {
    let upper = sql.to_uppercase();
    for keyword in STATEMENT_KEYWORDS {
        let mut from = 0;
        while let Some(found) = upper[from..].find(keyword) {
            let start = from + found;
            let end = start + keyword.len();
            let followed_by_space =
                upper[end..].chars().next().map(|c| c.is_whitespace()).unwrap_or(false);
            if followed_by_space {
                return Some(start);
            }
            from = end;
        }
    }
    None
}

/// Deterministic statement templates for mock mode.
pub fn mock_sql(question: &str) -> String {
    let question_lower = question.to_lowercase();

    if question_lower.contains("expiration") || question_lower.contains("expire") {
        "SELECT contract_id, customer_name, expiration_date FROM contracts \
         WHERE customer_name = 'Customer Name';"
            .to_string()
    } else if question_lower.contains("module") || question_lower.contains("purchased") {
        "SELECT c.customer_name, m.module_name, cm.purchased_date\n\
         FROM contracts c\n\
         JOIN contract_modules cm ON c.contract_id = cm.contract_id\n\
         JOIN modules m ON cm.module_id = m.module_id\n\
         WHERE c.customer_name = 'Customer Name';"
            .to_string()
    } else if question_lower.contains("pricing") || question_lower.contains("cost") {
        "SELECT customer_name, pricing FROM contracts WHERE customer_name = 'Customer Name';"
            .to_string()
    } else {
        "SELECT * FROM contracts WHERE customer_name = 'Customer Name' LIMIT 5;".to_string()
    }
}
