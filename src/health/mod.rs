//! Health read-model: live children projected into plain facts.
//!
//! The collector narrows API objects down to the handful of fields the
//! evaluator consumes; no live API object crosses this boundary.

mod collector;
mod evaluator;

pub use collector::collect_resource_facts;
pub use evaluator::Evaluator;

#[derive(Clone, Debug, Default)]
pub struct ResourceFacts {
    pub stateful_sets: Vec<StatefulSetFact>,
    pub pods: Vec<PodFact>,
    pub pvcs: Vec<PvcFact>,
    pub services: Vec<ServiceFact>,
    pub ingresses: Vec<IngressFact>,
    pub jobs: Vec<JobFact>,
    pub secrets: Vec<SecretFact>,
}

#[derive(Clone, Debug, Default)]
pub struct StatefulSetFact {
    pub name: String,
    pub namespace: String,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub current_revision: String,
    pub update_revision: String,
    pub updating: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PodFact {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub ready: bool,
    pub restarts: i32,
}

#[derive(Clone, Debug, Default)]
pub struct PvcFact {
    pub name: String,
    pub namespace: String,
    pub bound: bool,
    pub phase: String,
    pub requested_size: String,
    pub actual_size: String,
}

#[derive(Clone, Debug, Default)]
pub struct ServiceFact {
    pub name: String,
    pub namespace: String,
    pub type_: String,
    pub has_cluster_ip: bool,
    pub lb_ready: bool,
}

#[derive(Clone, Debug, Default)]
pub struct IngressFact {
    pub name: String,
    pub namespace: String,
    pub lb_ready: bool,
}

#[derive(Clone, Debug, Default)]
pub struct JobFact {
    pub name: String,
    pub namespace: String,
    pub succeeded: bool,
    pub active: i32,
    pub failed: i32,
    pub completed: bool,
}

#[derive(Clone, Debug, Default)]
pub struct SecretFact {
    pub name: String,
    pub namespace: String,
    pub type_: String,
}
