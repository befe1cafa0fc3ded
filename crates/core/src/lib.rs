//! ShopMart Core - Shared types library.
//!
//! This crate provides common types used across all ShopMart components:
//! - `storefront` - Remote API client, session-gated cart and wishlist sync
//! - `cli` - Command-line front end for browsing, cart, wishlist and checkout
//!
//! # Architecture
//!
//! The core crate contains only types and validation rules - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`validation`] - Form rules shared by sign-up, sign-in, password and checkout forms

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::ValidationError;
