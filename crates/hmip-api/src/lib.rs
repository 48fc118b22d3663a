// hmip-api: Async transport for the HomematicIP cloud (REST + push events)

pub mod client;
pub mod error;
pub mod lookup;
pub mod transport;
pub mod websocket;

pub use client::{Credentials, HmipClient};
pub use error::Error;
pub use lookup::{ClientCharacteristics, DEFAULT_LOOKUP_URL, HostUrls};
pub use transport::{ApiRequest, TlsMode, Transport, TransportConfig};
pub use websocket::EventStream;
