// ABOUTME: Library entry point for the Cadence scheduling engine
// ABOUTME: Calendar-aware placement of estimated-duration tasks into free time
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Cadence
//!
//! A calendar-aware scheduling engine. Cadence connects a user's external
//! calendar through delegated OAuth, computes free time by subtracting
//! busy intervals from a working-hours template, greedily places
//! estimated-duration task sessions into the remaining windows, and
//! persists the resulting plan atomically.
//!
//! ## Module map
//!
//! - [`intervals`] / [`working_hours`] / [`placer`]: the pure scheduling
//!   math (interval algebra, template expansion, session placement)
//! - [`oauth`]: delegated user-consent flow and token refresh
//! - [`service_auth`] / [`planning`]: service-principal assertion signing
//!   and the structured plan-drafting client it authenticates
//! - [`calendar`]: free/busy aggregation and event listing
//! - [`database`]: the token vault and the transactional plan committer
//! - [`schedule`]: end-to-end orchestration of one scheduling request
//! - [`routes`] / [`auth`]: the HTTP surface and caller authentication

pub mod auth;
pub mod calendar;
pub mod config;
pub mod database;
pub mod errors;
pub mod intervals;
pub mod logging;
pub mod models;
pub mod oauth;
pub mod placer;
pub mod planning;
pub mod routes;
pub mod schedule;
pub mod service_auth;
pub mod working_hours;
