// Purpose - the boundary between the graph and the outside world

/// Float PCM to device sample formats.
pub mod encode;
/// Render-thread pump feeding a lock-free ring for audio callbacks.
#[cfg(feature = "rtrb")]
pub mod pump;
