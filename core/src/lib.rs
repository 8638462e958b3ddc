// Gantry Core Library
// Subprocess JSON-RPC tool bridge runtime

pub mod bridge;
pub mod events;
pub mod ports;
pub mod telemetry;

// Export core types
pub use bridge::{Bridge, BridgeConfig, BridgeError, ProcessStatus, ToolDescriptor, ToolSchema};
pub use events::{BridgeEvent, BridgeObserver};
pub use ports::PortAllocator;
