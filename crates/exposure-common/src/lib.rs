//! Transport plumbing shared by exposure graph providers.

pub mod dune;
mod graphql;
mod http;
pub mod num;

pub use graphql::graphql_request;
pub use http::{ClientError, JsonClient};
