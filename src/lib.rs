//! RavenDB Operator: a Kubernetes operator managing RavenDB database
//! clusters declared as RavenDBCluster custom resources.
//!
//! The operator provisions per-node statefulsets and services, runs a
//! one-shot bootstrap job that joins the nodes into a logical cluster,
//! aggregates health into typed status conditions, and orchestrates
//! one-node-at-a-time rolling version upgrades behind HTTP health gates.

pub mod actor;
pub mod assets;
pub mod common;
pub mod controller;
pub mod crd;
pub mod director;
pub mod error;
pub mod health;
pub mod resource;
pub mod upgrade;
pub mod webhook;

pub use crate::error::{Error, Result};
