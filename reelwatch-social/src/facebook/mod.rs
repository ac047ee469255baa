//! Facebook reel page integration.
//!
//! [`client`] fetches the public reel page through the shared HTTP client,
//! [`extract`] pulls the `og:description` meta value out of the HTML.
pub mod client;
pub mod extract;

pub use client::ReelClient;
pub use extract::{ExtractError, Markers, extract_between, og_description};
