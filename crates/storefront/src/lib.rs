//! ShopMart Storefront library.
//!
//! Client side of the ShopMart e-commerce store. The remote REST API owns
//! all data; this crate keeps a local, session-gated mirror of the
//! shopper's cart and wishlist and exposes services for everything else.
//!
//! # Modules
//!
//! - [`api`] - Typed HTTP client for the remote API with a catalog cache
//! - [`session`] - Observable signed-in state
//! - [`sync`] - Cart and wishlist synchronizers plus the notification feed
//! - [`services`] - Auth, catalog and checkout flows
//! - [`state`] - The [`Storefront`] bundle wiring it all together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod session;
pub mod state;
pub mod sync;

pub use config::StorefrontConfig;
pub use error::{Error, Result};
pub use session::{AccessToken, Session, SessionSignal};
pub use state::Storefront;
