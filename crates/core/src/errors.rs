use std::path::PathBuf;

use thiserror::Error;

/// Failures raised inside the query-routing pipeline.
///
/// Precondition failures (`MissingCorpusDir`, `EmptyCorpus`, `IndexNotReady`)
/// are reported immediately and never retried. `UnsafeStatement` is a policy
/// violation, distinct from an execution failure: the statement was produced
/// but refused. Degraded modes (database unreachable, embedding endpoint
/// absent) are not errors at all; they surface through the status snapshot.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("document corpus directory not found: `{0}`")]
    MissingCorpusDir(PathBuf),
    #[error("no documents loaded; run ingestion before building an index")]
    EmptyCorpus,
    #[error("vector index not initialized; build or attach an index first")]
    IndexNotReady,
    #[error("unsupported document format `{0}`")]
    UnsupportedFormat(String),
    #[error("statement rejected by read-only policy: contains `{keyword}`")]
    UnsafeStatement { keyword: &'static str },
    #[error("model invocation failed: {0}")]
    Model(String),
    #[error("vector store failure: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::PipelineError;

    #[test]
    fn unsafe_statement_names_the_offending_keyword() {
        let error = PipelineError::UnsafeStatement { keyword: "DELETE" };
        assert!(error.to_string().contains("DELETE"));
    }
}
