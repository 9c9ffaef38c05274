//! Builders for the Kubernetes objects the operator owns. Each builder is a
//! pure function from the cluster spec (plus a node, for per-node objects)
//! to the desired object; the actors hand the result to the apply layer.

mod container;
mod ingress;
mod job;
mod service;
mod statefulset;
mod volume;

pub use ingress::build_ingress;
pub use job::build_job;
pub use service::build_service;
pub use statefulset::build_statefulset;
