use appraiser_core::models::{ClientRecord, CollateralClass};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

use crate::store::{ClientDirectory, StoreResult};

/// Read-only repository over the upstream client and collateral tables
#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientDirectory for ClientRepository {
    #[tracing::instrument(
        skip(self),
        fields(db.table = "individual_information", db.operation = "select")
    )]
    async fn list_clients(&self, step_status: &str) -> StoreResult<Vec<ClientRecord>> {
        let clients = sqlx::query_as::<Postgres, ClientRecord>(
            r#"
            SELECT id AS individual_id,
                   COALESCE(control_no, '') AS control_number,
                   COALESCE(fullname, '') AS full_name
            FROM individual_information
            WHERE step_status = $1
            ORDER BY fullname ASC, id ASC
            "#,
        )
        .bind(step_status)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(count = clients.len(), "Clients loaded");
        Ok(clients)
    }

    #[tracing::instrument(skip(self), fields(db.table = "collaterals", db.operation = "select"))]
    async fn collateral_class(
        &self,
        control_number: &str,
    ) -> StoreResult<Option<CollateralClass>> {
        let class = sqlx::query_scalar::<Postgres, Option<String>>(
            "SELECT class FROM collaterals WHERE client_id = $1 ORDER BY id ASC LIMIT 1",
        )
        .bind(control_number)
        .fetch_optional(&self.pool)
        .await?
        .flatten()
        .map(|raw| CollateralClass::parse(&raw));

        Ok(class)
    }
}
