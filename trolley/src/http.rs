//! HTTP implementation of the remote list collaborator.

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ListApi};
use crate::model::{ItemAdded, ListBundle, ListUpdate, NewItem, NewList, ShoppingList};

/// Where the list server lives and how to authenticate against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub access_token: Option<String>,
}

pub struct HttpListApi {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl HttpListApi {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.config.base_url);
        // Always include an Authorization header; the server treats
        // "anonymous" as a logged-out session.
        let token = self.config.access_token.as_deref().unwrap_or("anonymous");
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {token}"))
    }
}

fn send_failed(e: reqwest::Error) -> ApiError {
    ApiError::Transport(e.to_string())
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{e} in `{body}`")))
}

impl ListApi for HttpListApi {
    async fn fetch_lists(&self) -> Result<Vec<ListBundle>, ApiError> {
        let response = self
            .request(reqwest::Method::GET, "/lists")
            .send()
            .await
            .map_err(send_failed)?;
        decode(response).await
    }

    async fn fetch_list(&self, list_id: &str) -> Result<ListBundle, ApiError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/lists/{list_id}"))
            .send()
            .await
            .map_err(send_failed)?;
        decode(response).await
    }

    async fn create_list(&self, list: &NewList) -> Result<Vec<ShoppingList>, ApiError> {
        let response = self
            .request(reqwest::Method::POST, "/lists")
            .json(list)
            .send()
            .await
            .map_err(send_failed)?;
        decode(response).await
    }

    async fn delete_list(&self, list_id: &str) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        struct Confirmation {
            message: String,
        }

        let response = self
            .request(reqwest::Method::DELETE, &format!("/lists/{list_id}"))
            .send()
            .await
            .map_err(send_failed)?;
        let confirmation: Confirmation = decode(response).await?;
        Ok(confirmation.message)
    }

    async fn delete_item(&self, list_id: &str, item_id: &str) -> Result<ListUpdate, ApiError> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/lists/{list_id}/items/{item_id}"),
            )
            .send()
            .await
            .map_err(send_failed)?;
        decode(response).await
    }

    async fn set_item_purchased(
        &self,
        list_id: &str,
        item_id: &str,
        purchased: bool,
    ) -> Result<ListUpdate, ApiError> {
        #[derive(Serialize)]
        struct Body {
            purchased: bool,
        }

        let response = self
            .request(
                reqwest::Method::PATCH,
                &format!("/lists/{list_id}/items/{item_id}"),
            )
            .json(&Body { purchased })
            .send()
            .await
            .map_err(send_failed)?;
        decode(response).await
    }

    async fn add_item(&self, list_id: &str, item: &NewItem) -> Result<ItemAdded, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body<'a> {
            name: &'a str,
            quantity: f64,
            unit: &'a str,
            purchased: bool,
            optional: bool,
            notes: &'a str,
        }

        let body = Body {
            name: &item.name,
            quantity: item.quantity,
            unit: &item.unit,
            purchased: false,
            optional: item.optional,
            notes: &item.notes,
        };
        let response = self
            .request(reqwest::Method::POST, &format!("/lists/{list_id}/items"))
            .json(&body)
            .send()
            .await
            .map_err(send_failed)?;
        decode(response).await
    }
}
