//! Control-plane link to the backup daemon.
//!
//! - [`transport`]: framed TCP client with a read loop and heartbeat
//! - [`channel`]: supervised persistent subscriber (daemon → host pushes)
//! - [`responder`]: supervised persistent responder (daemon → host requests)
//! - [`query`]: one connection per call request/response client
//! - [`single_flight`]: coalescing cache over [`query::QueryClient`]

pub mod channel;
mod error;
pub mod framing;
pub mod query;
pub mod reconnect;
pub mod responder;
pub mod single_flight;
mod supervisor;
pub mod transport;

pub use channel::SignalChannel;
pub use error::LinkError;
pub use framing::{FrameDecoder, HEARTBEAT, HEARTBEAT_ACK};
pub use query::QueryClient;
pub use reconnect::ReconnectPolicy;
pub use responder::{QueryResponder, RequestHandler};
pub use single_flight::SingleFlight;
pub use transport::{MessageListener, Transport, TransportOptions};
