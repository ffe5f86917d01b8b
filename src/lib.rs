//! Filter-driven paginated article feed.
//!
//! - [`feed`] - the controller, sessions, paginator and load-state model
//! - [`source`] - the data source trait and an in-memory implementation
//! - [`config`] - optional TOML configuration
//! - [`ui`] - line-oriented terminal consumer used by the binary

pub mod config;
pub mod feed;
pub mod source;
pub mod ui;
