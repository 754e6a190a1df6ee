pub mod aggregate;
pub mod coordinator;
pub mod memory;
pub mod models;
pub mod repository;

pub use aggregate::OrderAggregate;
pub use coordinator::{CheckoutConfig, CheckoutReceipt, OrderCoordinator, PlaceOrder};
pub use memory::MemoryOrderStore;
pub use models::{LineRequest, Order, OrderError, OrderItem, PaymentMethod, PaymentStatus};
pub use repository::OrderRepository;
