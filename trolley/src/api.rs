//! The remote list collaborator.
//!
//! One call per documented server operation; transport and wire format live
//! behind the trait. Futures returned here are driven on a single-threaded
//! executor, so no `Send` bound is imposed on implementations.

use crate::model::{ItemAdded, ListBundle, ListUpdate, NewItem, NewList, ShoppingList};

/// Why a remote call failed, flattened to what the store can show a user.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("could not decode server response: {0}")]
    Decode(String),
}

#[allow(async_fn_in_trait)]
pub trait ListApi {
    async fn fetch_lists(&self) -> Result<Vec<ListBundle>, ApiError>;

    async fn fetch_list(&self, list_id: &str) -> Result<ListBundle, ApiError>;

    /// The create endpoint responds with every list it created, each carrying
    /// its server-assigned id.
    async fn create_list(&self, list: &NewList) -> Result<Vec<ShoppingList>, ApiError>;

    /// Resolves to the server's confirmation message.
    async fn delete_list(&self, list_id: &str) -> Result<String, ApiError>;

    async fn delete_item(&self, list_id: &str, item_id: &str) -> Result<ListUpdate, ApiError>;

    async fn set_item_purchased(
        &self,
        list_id: &str,
        item_id: &str,
        purchased: bool,
    ) -> Result<ListUpdate, ApiError>;

    /// The item payload is sent with `purchased: false`; a new item is never
    /// born purchased.
    async fn add_item(&self, list_id: &str, item: &NewItem) -> Result<ItemAdded, ApiError>;
}
