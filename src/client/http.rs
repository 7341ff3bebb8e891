use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{ClientResult, Envelope, ResetData, TodoApi, TodoChanges};
use crate::models::Todo;

/// [`TodoApi`] over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpTodoApi {
    client: Client,
    base_url: String,
    admin_token: Option<String>,
}

impl HttpTodoApi {
    /// `base_url` points at the API root, e.g. `http://localhost:5000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            client: Client::new(),
            base_url,
            admin_token: None,
        }
    }

    #[must_use]
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let envelope: Envelope<T> = response.json().await?;
        envelope.into_data(status)
    }
}

#[async_trait]
impl TodoApi for HttpTodoApi {
    async fn list(&self) -> ClientResult<Vec<Todo>> {
        self.send(self.client.get(self.url("todos"))).await
    }

    async fn create(&self, title: &str, description: &str) -> ClientResult<Todo> {
        let body = json!({ "title": title, "description": description });
        self.send(self.client.post(self.url("todos")).json(&body))
            .await
    }

    async fn update(&self, id: i32, changes: &TodoChanges) -> ClientResult<Todo> {
        self.send(self.client.put(self.url(&format!("todos/{id}"))).json(changes))
            .await
    }

    async fn delete(&self, id: i32) -> ClientResult<Todo> {
        self.send(self.client.delete(self.url(&format!("todos/{id}"))))
            .await
    }

    async fn reset(&self) -> ClientResult<usize> {
        let mut request = self.client.post(self.url("init-db"));
        if let Some(token) = &self.admin_token {
            request = request.header("X-Admin-Token", token);
        }
        let data: ResetData = self.send(request).await?;
        Ok(data.records)
    }
}
