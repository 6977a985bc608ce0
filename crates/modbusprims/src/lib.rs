//! Modbus client primitives.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte channels to a device (TCP, UDP, serial behind `serial`)
//! - [`frame`]: socket, RTU, ASCII and binary framing over a pure codec
//! - [`client`]: synchronous transaction client (behind `client`, on by default)

/// Re-export transport types.
pub mod transport {
    pub use modbusprims_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use modbusprims_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use modbusprims_client::*;
}
