//! Domain models for the marketplace.
//!
//! These structs are shared between the storage backends and the wire: field
//! names serialize in camelCase to preserve the public JSON contract, and the
//! JSON-file backend persists the same shapes. The one exception is [`User`],
//! whose credential fields must never reach a response; handlers expose
//! [`UserProfile`] instead.

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem};
pub use order::{BillingAddress, Order, OrderItem, StatusChange, Tracking};
pub use product::Product;
pub use user::{User, UserProfile};
