//! Call lifecycle: state transitions and the live call manager.

pub mod manager;
pub mod transition;

pub use manager::CallManager;
