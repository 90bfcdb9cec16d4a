mod protocol;
mod transport;

pub use protocol::{RealtimeFrame, RealtimeRequest};
pub use transport::RealtimeClient;
