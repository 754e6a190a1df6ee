pub mod inventory;
pub mod product;
pub mod review;
pub mod wishlist;

pub use inventory::{InventoryError, InventoryLedger, StockDirection};
pub use product::{CatalogError, MemoryCatalog, Product, ProductRepository};
pub use review::{MemoryReviews, Review, ReviewError, ReviewRepository, ReviewSummary};
pub use wishlist::{MemoryWishlist, WishlistChange, WishlistError, WishlistRepository};
