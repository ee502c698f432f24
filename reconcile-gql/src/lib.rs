//! # reconcile-gql
//!
//! Read access to the GraphQL configuration catalog.
//!
//! - [`GqlClient`]: blocking HTTP transport, usable as a `query_func`
//! - [`definitions`]: fixed query documents decoded into strict structs
//! - [`ConfigSource`]: the catalog inputs the reconciler consumes

pub mod client;
pub mod config_source;
pub mod definitions;
pub mod error;

pub use client::GqlClient;
pub use config_source::{ConfigSource, GqlConfigSource};
pub use error::GqlError;
