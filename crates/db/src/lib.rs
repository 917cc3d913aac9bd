pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod query;
pub mod safety;
pub mod schema;
pub mod translate;

pub use connection::{connect_with_settings, try_connect, DbPool};
pub use fixtures::{SampleContractDataset, SeedResult, VerificationResult};
pub use query::{format_rows, ContractQuerySystem, QueryRecord, ResultRow};
pub use safety::ensure_read_only;
pub use translate::clean_generated_sql;
