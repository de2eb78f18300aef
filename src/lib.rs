//! An object-oriented client for the Steam Web API.
//!
//! # Overview
//!
//! There are two ways to reach the API:
//!
//! - [`ApiInterface`] is a call tree mirroring the remote namespace. Nodes are looked up by name
//!   (`api.path("ISteamUser.GetPlayerSummaries.v0002")`) and called with [`ApiArgs`]. Paths that
//!   answered successfully are remembered, and the tree can be built up front from the API's own
//!   list of supported methods, optionally refusing anything outside of it (strict mode).
//! - [`ApiConnection::call`] calls a fixed `(interface, command, version)` triple directly.
//!
//! Both send identical requests and return an [`ApiResponse`], a read-only view over the decoded
//! JSON body, unless a custom `format` argument was supplied, in which case the body is returned
//! as received.
//!
//! On top of that sit resource types ([`SteamUser`], [`SteamApp`], [`SteamIngameStore`]) whose
//! accessors fetch data on first use and keep it in a per-instance cache with a time-to-live. See
//! the [`cache`] module.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. Every call returns a `Result`; non-2xx responses
//! are classified by status code and never retried.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages under
//! the `steamapi` target. Consider integrating a `log`-compatible logger implementation for better
//! visibility into issued calls.
//!
//! # Examples
//!
//! A runnable example lives in `demos/simple`.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod app;
mod args;
pub mod cache;
mod call_tree;
mod config;
mod connection;
mod consts;
mod error;
mod response;
mod store;
mod user;

pub use app::SteamApp;
pub use args::{ApiArgs, ArgValue, Method};
pub use call_tree::{ApiCall, ApiInterface};
pub use config::{ConnectionConfig, InterfaceConfig, Settings, PRECACHE_CHUNK_SIZE};
pub use connection::{ApiConnection, Payload, PreparedRequest};
pub use consts::{CommunityVisibilityState, OnlineState};
pub use error::{Error, Result};
pub use response::{ApiResponse, ResponseValue};
pub use store::{InitPurchase, SteamIngameStore};
pub use user::{SteamGroup, SteamUser, SteamUserBadge};
