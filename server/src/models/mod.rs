// server/src/models/mod.rs

//! Contains data structures representing database entities.

pub mod admin_user;
pub mod color_image;
pub mod customer;
pub mod order;
pub mod order_item;
pub mod product;
pub mod subscriber;

// Re-export the model structs for convenient access
pub use admin_user::AdminUser;
pub use color_image::ColorImageRow;
pub use customer::Customer;
pub use order::{Order, OrderStatus};
pub use order_item::OrderItem;
pub use product::ProductRow;
pub use subscriber::SubscriberRow;
