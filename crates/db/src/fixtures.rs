use sqlx::Executor;

use crate::connection::DbPool;

/// Deterministic sample dataset: five contracts, seven product modules, and
/// the purchases joining them. Used by the `seed` command, demos, and the
/// end-to-end tests.
pub struct SampleContractDataset;

const SEED_CUSTOMERS: &[&str] = &[
    "ACME Corp",
    "TechStart Inc",
    "Global Industries",
    "Small Business LLC",
    "Enterprise Solutions",
];

const EXPECTED_MODULE_COUNT: i64 = 7;
const EXPECTED_PURCHASE_COUNT: i64 = 16;

impl SampleContractDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/sample_contracts.sql");

    /// Load the dataset. Idempotent: reloading replaces rows in place.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, sqlx::Error> {
        let mut tx = pool.begin().await?;
        tx.execute(Self::SQL).await?;
        tx.commit().await?;

        Ok(SeedResult {
            contracts: SEED_CUSTOMERS.len(),
            modules: EXPECTED_MODULE_COUNT as usize,
            purchases: EXPECTED_PURCHASE_COUNT as usize,
        })
    }

    /// Verify the dataset is present and complete.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, sqlx::Error> {
        let mut checks = Vec::new();

        for customer in SEED_CUSTOMERS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM contracts WHERE customer_name = ?1)",
            )
            .bind(customer)
            .fetch_one(pool)
            .await?;
            checks.push((*customer, exists == 1));
        }

        let module_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM modules").fetch_one(pool).await?;
        checks.push(("module-count", module_count == EXPECTED_MODULE_COUNT));

        let purchase_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM contract_modules").fetch_one(pool).await?;
        checks.push(("purchase-count", purchase_count == EXPECTED_PURCHASE_COUNT));

        let orphan_purchases: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM contract_modules cm
             LEFT JOIN contracts c ON c.contract_id = cm.contract_id
             WHERE c.contract_id IS NULL",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("purchases-reference-contracts", orphan_purchases == 0));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the seeded rows from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM contract_modules").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM modules").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM contracts").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub contracts: usize,
    pub modules: usize,
    pub purchases: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::SampleContractDataset;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_is_valid() {
        assert!(!SampleContractDataset::SQL.is_empty());
    }

    #[tokio::test]
    async fn load_verify_and_reload_are_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = SampleContractDataset::load(&pool).await.expect("load fixtures");
        assert_eq!(first.contracts, 5);

        let verification = SampleContractDataset::verify(&pool).await.expect("verify fixtures");
        assert!(verification.all_present, "failed checks: {:?}", verification.checks);

        SampleContractDataset::load(&pool).await.expect("reload fixtures");
        let second = SampleContractDataset::verify(&pool).await.expect("re-verify fixtures");
        assert!(second.all_present);
        assert_eq!(verification.checks, second.checks);
    }

    #[tokio::test]
    async fn clean_removes_all_seeded_rows() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        SampleContractDataset::load(&pool).await.expect("load fixtures");

        SampleContractDataset::clean(&pool).await.expect("clean fixtures");

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM contracts")
            .fetch_one(&pool)
            .await
            .expect("count contracts");
        assert_eq!(remaining, 0);
    }
}
