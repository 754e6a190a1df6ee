pub mod identity;
pub mod money;
pub mod payment;
pub mod webhook;
