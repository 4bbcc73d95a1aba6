// ABOUTME: Delegated OAuth module for third-party calendar access
// ABOUTME: Covers the consent state token and the authorization/refresh gateway
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Delegated OAuth
//!
//! Drives the user-consent OAuth2 flow against the calendar provider:
//! building the authorization URL, exchanging authorization codes,
//! refreshing expiring tokens, and upserting results into the token vault.

pub mod gateway;
pub mod state;

pub use gateway::{OAuthGateway, OAuthProviderConfig};
pub use state::OAuthState;
