//! Connection management: handles, pool, registry, transport loops, auth.

pub mod authenticator;
pub mod events;
pub mod handle;
pub mod pool;
pub mod registry;
pub mod session;

pub use events::ConnectionEvent;
pub use handle::{ConnectionHandle, ConnectionInfo, SendError};
pub use registry::ConnectionRegistry;
