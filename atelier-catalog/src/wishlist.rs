use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Outcome of a wishlist toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistChange {
    Added,
    Removed,
}

impl WishlistChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            WishlistChange::Added => "added",
            WishlistChange::Removed => "removed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WishlistError {
    #[error("storage error: {0}")]
    Storage(String),
}

/// A customer's saved-products set. Toggling an absent product adds it,
/// toggling a present one removes it; membership is per customer.
#[async_trait]
pub trait WishlistRepository: Send + Sync {
    async fn toggle(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistChange, WishlistError>;

    /// Product ids on the customer's wishlist, most recently added first.
    async fn product_ids_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, WishlistError>;
}

/// In-memory wishlist store for tests and local development.
pub struct MemoryWishlist {
    entries: Mutex<HashMap<Uuid, Vec<Uuid>>>,
}

impl MemoryWishlist {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryWishlist {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WishlistRepository for MemoryWishlist {
    async fn toggle(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistChange, WishlistError> {
        let mut entries = self.entries.lock().await;
        let products = entries.entry(user_id).or_default();

        if let Some(position) = products.iter().position(|id| *id == product_id) {
            products.remove(position);
            Ok(WishlistChange::Removed)
        } else {
            products.push(product_id);
            Ok(WishlistChange::Added)
        }
    }

    async fn product_ids_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, WishlistError> {
        let entries = self.entries.lock().await;
        let mut ids = entries.get(&user_id).cloned().unwrap_or_default();
        ids.reverse();
        Ok(ids)
    }
}
