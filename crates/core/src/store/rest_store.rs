use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use super::store_errors::StoreError;
use super::store_model::{LeaderboardRow, UserRecord};
use super::store_traits::DurableStoreTrait;
use crate::errors::Result;

#[derive(Debug, Deserialize)]
struct TotalRow {
    total: u64,
}

/// Durable store client for a PostgREST-style relational backend.
///
/// Every request carries the service credential; callers see a
/// `StoreError` for any non-2xx response.
pub struct RestStore {
    client: Client,
    base_url: String,
    service_key: String,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        RestStore {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut headers = HeaderMap::new();
        if let Ok(key) = HeaderValue::from_str(&self.service_key) {
            headers.insert("apikey", key);
        }
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.service_key)) {
            headers.insert(AUTHORIZATION, bearer);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .headers(headers)
    }

    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        }
        .into())
    }

    async fn fetch_rows<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(StoreError::Network)?;
        let response = self.check(response).await?;
        let rows = response.json::<Vec<T>>().await.map_err(StoreError::Network)?;
        Ok(rows)
    }
}

#[async_trait]
impl DurableStoreTrait for RestStore {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>> {
        let rows: Vec<UserRecord> = self
            .fetch_rows(&format!("/rest/v1/users?id=eq.{user_id}&select=id,username"))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_user_if_absent(&self, user_id: i64, username: &str) -> Result<()> {
        let response = self
            .request(Method::POST, "/rest/v1/users")
            .header("Prefer", "resolution=ignore-duplicates")
            .json(&json!([{ "id": user_id, "username": username }]))
            .send()
            .await
            .map_err(StoreError::Network)?;
        self.check(response).await?;
        Ok(())
    }

    async fn upsert_user(&self, user_id: i64, username: &str) -> Result<()> {
        let response = self
            .request(Method::POST, "/rest/v1/users")
            .header("Prefer", "resolution=merge-duplicates")
            .json(&json!([{ "id": user_id, "username": username }]))
            .send()
            .await
            .map_err(StoreError::Network)?;
        self.check(response).await?;
        Ok(())
    }

    async fn get_total(&self, user_id: i64) -> Result<Option<u64>> {
        let rows: Vec<TotalRow> = self
            .fetch_rows(&format!("/rest/v1/clicks?user_id=eq.{user_id}&select=total"))
            .await?;
        Ok(rows.into_iter().next().map(|row| row.total))
    }

    async fn increment_total(&self, user_id: i64, delta: u64) -> Result<()> {
        let response = self
            .request(Method::POST, "/rest/v1/rpc/inc_clicks")
            .json(&json!({ "p_user_id": user_id, "p_d": delta }))
            .send()
            .await
            .map_err(StoreError::Network)?;
        self.check(response).await?;
        Ok(())
    }

    async fn top_totals(&self, limit: usize) -> Result<Vec<LeaderboardRow>> {
        self.fetch_rows(&format!(
            "/rest/v1/leaderboard?select=id,username,total&order=total.desc&limit={limit}"
        ))
        .await
    }

    async fn usernames(&self, user_ids: &[i64]) -> Result<HashMap<i64, String>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids = user_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let rows: Vec<UserRecord> = self
            .fetch_rows(&format!("/rest/v1/users?id=in.({ids})&select=id,username"))
            .await?;
        Ok(rows.into_iter().map(|row| (row.id, row.username)).collect())
    }

    async fn sum_totals(&self) -> Result<u64> {
        let rows: Vec<TotalRow> = self.fetch_rows("/rest/v1/clicks?select=total").await?;
        Ok(rows.into_iter().map(|row| row.total).sum())
    }
}
