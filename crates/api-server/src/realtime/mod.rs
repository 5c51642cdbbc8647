//! Realtime channel: session registry, broadcast dispatcher, Socket.IO handlers.

mod dispatcher;
mod registry;
mod socket;

pub use dispatcher::Broadcaster;
#[cfg(test)]
pub use dispatcher::OrgEvent;
pub use registry::SessionRegistry;
pub use socket::{create_socket_layer, SocketState};
