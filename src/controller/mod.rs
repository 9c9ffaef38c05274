//! Controller module for RavenDBCluster reconciliation.
//! Contains the main controller loop and the event plumbing.

pub mod events;
mod reconciler;

pub use events::{new_recorder, KubeGateEventSink};
pub use reconciler::{run_controller, ControllerState};
