mod error;

pub mod api;
pub mod client;
pub mod endpoint;
pub mod models;
pub mod tx;

pub use api::NodeApi;
pub use client::{EndpointHealth, NodeClient};
pub use endpoint::HttpEndpoint;
pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;
