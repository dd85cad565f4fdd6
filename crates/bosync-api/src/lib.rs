// bosync-api: Async client for the ontology gateway API (ontology, subscriptions, live data, alarms)

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod subscriptions;
pub mod transport;

mod alarms;
mod livedata;
mod ontology;

pub use auth::{ClientCredentials, DEFAULT_TOKEN_SCOPE};
pub use client::OntologyClient;
pub use error::Error;
pub use subscriptions::{SubscriptionTopic, webhook_url};
pub use transport::TransportConfig;
