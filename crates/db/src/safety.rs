//! Read-only gate for generated statements.
//!
//! A case-insensitive substring scan over a fixed denylist. Deliberately
//! blunt: a SELECT that merely mentions a blocked word (a column named
//! `created_at` does not, but a string literal containing "DELETE" does)
//! will be refused. False positives are acceptable here; a mutation
//! slipping through is not.

use deskbot_core::PipelineError;

const BLOCKED_KEYWORDS: &[&str] =
    &["INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE"];

/// Refuse any statement containing a mutating keyword.
pub fn ensure_read_only(sql: &str) -> Result<(), PipelineError> {
    let upper = sql.to_uppercase();
    for keyword in BLOCKED_KEYWORDS {
        if upper.contains(keyword) {
            return Err(PipelineError::UnsafeStatement { keyword });
        }
    }
    Ok(())
}
