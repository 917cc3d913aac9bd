//! Statement execution and result formatting.
//!
//! [`ContractQuerySystem`] is the front door of the subsystem: it owns the
//! optional connection, composes translate → safety gate → execute → format,
//! and degrades to deterministic mock behavior when no database is
//! reachable.

use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row};
use tracing::{debug, warn};

use deskbot_core::{ChatModel, PipelineError};

use crate::connection::DbPool;
use crate::safety::ensure_read_only;
use crate::schema::table_info;
use crate::translate::{mock_sql, translate_with_model};

/// Ordered column name / rendered value pairs for one result row.
pub type ResultRow = Vec<(String, String)>;

/// Outcome of one structured query, kept for the grounding prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRecord {
    pub question: String,
    pub sql: String,
    pub formatted: String,
}

pub struct ContractQuerySystem {
    pool: Option<DbPool>,
    schema_description: String,
}

impl ContractQuerySystem {
    pub fn from_pool(pool: DbPool, schema_description: String) -> Self {
        Self { pool: Some(pool), schema_description }
    }

    pub fn mock(schema_description: String) -> Self {
        Self { pool: None, schema_description }
    }

    pub fn is_live(&self) -> bool {
        self.pool.is_some()
    }

    pub async fn connection_active(&self) -> bool {
        match &self.pool {
            Some(pool) => sqlx::query("SELECT 1").execute(pool).await.is_ok(),
            None => false,
        }
    }

    pub async fn table_info(&self) -> String {
        table_info(self.pool.as_ref(), &self.schema_description).await
    }

    /// Produce a SQL statement for a question. Mock mode never consults the
    /// model.
    pub async fn translate(
        &self,
        question: &str,
        model: &dyn ChatModel,
    ) -> Result<String, PipelineError> {
        if self.pool.is_none() {
            return Ok(mock_sql(question));
        }
        let info = self.table_info().await;
        translate_with_model(question, &info, model).await
    }

    /// Run a statement after the read-only gate. Execution failures are
    /// logged and reported as zero rows; the policy violation is the only
    /// error this returns.
    pub async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>, PipelineError> {
        ensure_read_only(sql)?;

        let Some(pool) = &self.pool else {
            return Ok(mock_results(sql));
        };

        match sqlx::query(sql).fetch_all(pool).await {
            Ok(rows) => Ok(rows.iter().map(row_to_pairs).collect()),
            Err(error) => {
                warn!(event_name = "query_execution_failed", %error, sql, "returning no rows");
                Ok(Vec::new())
            }
        }
    }

    /// Translate, gate, execute, and format in one pass.
    pub async fn query_and_format(
        &self,
        question: &str,
        model: &dyn ChatModel,
    ) -> Result<QueryRecord, PipelineError> {
        let sql = self.translate(question, model).await?;
        debug!(event_name = "sql_generated", sql = %sql);
        let rows = self.execute(&sql).await?;
        Ok(QueryRecord {
            question: question.to_string(),
            formatted: format_rows(&rows),
            sql,
        })
    }
}

fn row_to_pairs(row: &SqliteRow) -> ResultRow {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), render_value(row, column.ordinal())))
        .collect()
}

/// Render a dynamically-typed sqlite value as display text.
fn render_value(row: &SqliteRow, index: usize) -> String {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(|v| v.to_string()).unwrap_or_else(|| "NULL".to_string());
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map(|v| v.to_string()).unwrap_or_else(|| "NULL".to_string());
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.unwrap_or_else(|| "NULL".to_string());
    }
    match row.try_get::<Option<Vec<u8>>, _>(index) {
        Ok(Some(bytes)) => format!("<{} bytes>", bytes.len()),
        _ => "NULL".to_string(),
    }
}

/// Human-readable rendering: nothing, a single flat record, or a numbered
/// list of indented records.
pub fn format_rows(rows: &[ResultRow]) -> String {
    if rows.is_empty() {
        return "No results found.".to_string();
    }

    if rows.len() == 1 {
        return rows[0]
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join("\n");
    }

    let mut lines = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        lines.push(format!("\nResult {}:", index + 1));
        for (key, value) in row {
            lines.push(format!("  {key}: {value}"));
        }
    }
    lines.join("\n")
}

/// Deterministic sample rows for mock mode, keyed off the statement text.
fn mock_results(sql: &str) -> Vec<ResultRow> {
    let sql_lower = sql.to_lowercase();
    let pair = |key: &str, value: &str| (key.to_string(), value.to_string());

    if sql_lower.contains("modules") {
        vec![
            vec![
                pair("customer_name", "ACME Corp"),
                pair("module_name", "Inventory Management"),
                pair("purchased_date", "2023-01-15"),
            ],
            vec![
                pair("customer_name", "ACME Corp"),
                pair("module_name", "Reporting Suite"),
                pair("purchased_date", "2023-03-22"),
            ],
        ]
    } else if sql_lower.contains("expiration") {
        vec![vec![
            pair("contract_id", "12345"),
            pair("customer_name", "ACME Corp"),
            pair("expiration_date", "2024-12-31"),
        ]]
    } else if sql_lower.contains("pricing") {
        vec![vec![pair("customer_name", "ACME Corp"), pair("pricing", "25000")]]
    } else {
        vec![vec![
            pair("contract_id", "12345"),
            pair("customer_name", "ACME Corp"),
            pair("expiration_date", "2024-12-31"),
            pair("pricing", "25000"),
            pair("status", "Active"),
        ]]
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use deskbot_core::{ChatMessage, ChatModel, PipelineError};

    use super::{format_rows, ContractQuerySystem, ResultRow};
    use crate::fixtures::SampleContractDataset;
    use crate::{connect_with_settings, migrations};

    struct ScriptedModel {
        reply: String,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
            Ok(self.reply.clone())
        }
    }

    async fn live_system() -> ContractQuerySystem {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        SampleContractDataset::load(&pool).await.expect("load fixtures");
        ContractQuerySystem::from_pool(pool, "fallback schema".to_string())
    }

    #[test]
    fn format_rows_shapes() {
        assert_eq!(format_rows(&[]), "No results found.");

        let single: Vec<ResultRow> = vec![vec![
            ("customer_name".to_string(), "ACME Corp".to_string()),
            ("pricing".to_string(), "25000".to_string()),
        ]];
        assert_eq!(format_rows(&single), "customer_name: ACME Corp\npricing: 25000");

        let many: Vec<ResultRow> = vec![
            vec![("id".to_string(), "1".to_string())],
            vec![("id".to_string(), "2".to_string())],
        ];
        assert_eq!(format_rows(&many), "\nResult 1:\n  id: 1\n\nResult 2:\n  id: 2");
    }

    #[tokio::test]
    async fn mock_mode_answers_without_a_model_call() {
        let system = ContractQuerySystem::mock("schema".to_string());
        struct PanickingModel;
        #[async_trait]
        impl ChatModel for PanickingModel {
            async fn complete(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
                panic!("mock mode must not consult the model");
            }
        }

        let record = system
            .query_and_format("When does the ACME Corp contract expire?", &PanickingModel)
            .await
            .expect("mock query");
        assert!(record.sql.contains("expiration_date"));
        assert!(record.formatted.contains("ACME Corp"));
        assert!(record.formatted.contains("2024-12-31"));
    }

    #[tokio::test]
    async fn live_mode_executes_generated_sql() {
        let system = live_system().await;
        let model = ScriptedModel {
            reply: "```sql\nSELECT customer_name, pricing FROM contracts \
                    WHERE customer_name = 'ACME Corp'\n```"
                .to_string(),
        };

        let record = system.query_and_format("what is acme's pricing?", &model).await.expect("query");
        assert_eq!(
            record.sql,
            "SELECT customer_name, pricing FROM contracts WHERE customer_name = 'ACME Corp'"
        );
        assert_eq!(record.formatted, "customer_name: ACME Corp\npricing: 25000");
    }

    #[tokio::test]
    async fn unsafe_generated_sql_is_refused() {
        let system = live_system().await;
        let model = ScriptedModel { reply: "DELETE FROM contracts".to_string() };

        let error = system.query_and_format("wipe it", &model).await.unwrap_err();
        assert!(matches!(error, PipelineError::UnsafeStatement { keyword: "DELETE" }));
    }

    #[tokio::test]
    async fn execution_failure_yields_zero_rows_not_an_error() {
        let system = live_system().await;
        let rows = system.execute("SELECT * FROM no_such_table").await.expect("soft failure");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn multi_row_results_are_numbered() {
        let system = live_system().await;
        let rows = system
            .execute("SELECT customer_name FROM contracts ORDER BY contract_id LIMIT 2")
            .await
            .expect("query rows");
        let formatted = format_rows(&rows);
        assert!(formatted.contains("Result 1:"));
        assert!(formatted.contains("ACME Corp"));
        assert!(formatted.contains("Result 2:"));
        assert!(formatted.contains("TechStart Inc"));
    }

    #[tokio::test]
    async fn connection_flags_reflect_mode() {
        let live = live_system().await;
        assert!(live.is_live());
        assert!(live.connection_active().await);

        let mock = ContractQuerySystem::mock("schema".to_string());
        assert!(!mock.is_live());
        assert!(!mock.connection_active().await);
    }
}
