use async_trait::async_trait;
use postgrest::Postgrest;
use serde::de::DeserializeOwned;

use super::{InvoiceStore, StoreError};
use crate::config::SupabaseConfig;
use crate::invoice::{Client, Invoice, InvoiceStatus, Service, User};

const INVOICES: &str = "invoices";
const USERS: &str = "users";
const CLIENTS: &str = "clients";
const SERVICES: &str = "services";

/// Supabase REST (PostgREST) implementation of [`InvoiceStore`].
pub struct SupabaseStore {
    client: Postgrest,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> Self {
        let client = Postgrest::new(format!("{}/rest/v1", config.supabase_url))
            .insert_header("apikey", config.supabase_key.as_str())
            .insert_header("Authorization", format!("Bearer {}", config.supabase_key));
        Self { client }
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &'static str,
        column: &str,
        value: &str,
    ) -> Result<Vec<T>, StoreError> {
        let response = self
            .client
            .from(table)
            .select("*")
            .eq(column, value)
            .execute()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<Vec<T>>(&body).map_err(|e| StoreError::Decode {
            table,
            message: e.to_string(),
        })
    }

    async fn fetch_one<T: DeserializeOwned>(
        &self,
        table: &'static str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        let rows = self.fetch_rows::<T>(table, "id", id).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl InvoiceStore for SupabaseStore {
    async fn fetch_invoice(&self, id: &str) -> Result<Option<Invoice>, StoreError> {
        self.fetch_one(INVOICES, id).await
    }

    async fn fetch_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.fetch_one(USERS, id).await
    }

    async fn fetch_client(&self, id: &str) -> Result<Option<Client>, StoreError> {
        self.fetch_one(CLIENTS, id).await
    }

    async fn fetch_services_for_client(&self, client_id: &str) -> Result<Vec<Service>, StoreError> {
        self.fetch_rows(SERVICES, "client_id", client_id).await
    }

    async fn update_invoice_status(&self, id: &str, status: InvoiceStatus) -> Result<(), StoreError> {
        let body = serde_json::json!({ "status": status.as_str() }).to_string();

        let response = self
            .client
            .from(INVOICES)
            .eq("id", id)
            .update(body)
            .execute()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let code = response.status();
        if !code.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: code.as_u16(),
                body,
            });
        }

        log::info!("Invoice {} marked as {}", id, status.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_store_is_transport_error() {
        let store = SupabaseStore::new(&SupabaseConfig {
            supabase_url: "http://127.0.0.1:9".to_string(),
            supabase_key: "key".to_string(),
        });

        let err = store.fetch_invoice("inv-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
