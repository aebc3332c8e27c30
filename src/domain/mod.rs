pub mod error;
pub mod event;
pub mod id;
pub mod money;
pub mod order;
pub mod payment;
pub mod provider;
pub mod subscription;
pub mod transition;
pub mod user;
