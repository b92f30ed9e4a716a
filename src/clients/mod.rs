pub mod places_client;
pub mod slack_client;

pub use places_client::{PlacesClient, PlacesTransport, RawResponse};
pub use slack_client::SlackClient;
