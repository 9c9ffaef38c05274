//! Condition management and the Ready/Phase rollup.
//!
//! Conditions follow the Kubernetes convention: the transition time only
//! moves when the status flips, not when the reason or message changes.

use chrono::{DateTime, Utc};

use super::ravendb_cluster::RavenDBCluster;
use super::types::{
    ClusterCondition, ClusterConditionReason, ClusterConditionType, ClusterPhase, ConditionStatus,
};

impl RavenDBCluster {
    pub fn get_condition(&self, type_: ClusterConditionType) -> Option<&ClusterCondition> {
        self.status
            .as_ref()?
            .conditions
            .iter()
            .find(|c| c.type_ == type_)
    }

    pub fn is_condition_true(&self, type_: ClusterConditionType) -> bool {
        self.get_condition(type_)
            .is_some_and(|c| c.status == ConditionStatus::True)
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.is_condition_true(ClusterConditionType::BootstrapCompleted)
    }

    pub fn set_condition_true(
        &mut self,
        type_: ClusterConditionType,
        reason: ClusterConditionReason,
        message: &str,
        now: DateTime<Utc>,
    ) {
        self.set_condition(type_, ConditionStatus::True, &reason.to_string(), message, now);
    }

    pub fn set_condition_false(
        &mut self,
        type_: ClusterConditionType,
        reason: ClusterConditionReason,
        message: &str,
        now: DateTime<Utc>,
    ) {
        self.set_condition(type_, ConditionStatus::False, &reason.to_string(), message, now);
    }

    pub fn set_condition(
        &mut self,
        type_: ClusterConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
        now: DateTime<Utc>,
    ) {
        let conditions = &mut self.status.get_or_insert_with(Default::default).conditions;

        if let Some(existing) = conditions.iter_mut().find(|c| c.type_ == type_) {
            if existing.status != status {
                existing.last_transition_time = now.to_rfc3339();
            }
            existing.status = status;
            existing.reason = reason.to_string();
            existing.message = message.to_string();
        } else {
            conditions.push(ClusterCondition {
                type_,
                status,
                reason: reason.to_string(),
                message: message.to_string(),
                last_transition_time: now.to_rfc3339(),
            });
        }
    }

    pub fn set_observed_generation(&mut self, generation: Option<i64>) {
        self.status.get_or_insert_with(Default::default).observed_generation = generation;
    }

    /// Roll the required conditions up into `Ready`.
    ///
    /// The first condition in the fixed order that is missing or False wins:
    /// `Ready` goes False with the *type name* of that condition as the
    /// reason, and the condition's own reason folded into the message. The
    /// reason/message split is deliberate and load-bearing for consumers.
    pub fn compute_ready(&mut self, now: DateTime<Utc>) {
        let mut required = vec![
            ClusterConditionType::CertificatesReady,
            ClusterConditionType::LicensesValid,
            ClusterConditionType::StorageReady,
            ClusterConditionType::NodesHealthy,
            ClusterConditionType::BootstrapCompleted,
        ];
        if self.is_external_access_set() {
            required.push(ClusterConditionType::ExternalAccessReady);
        }

        for type_ in required {
            let current = self
                .get_condition(type_)
                .map(|c| (c.status, c.reason.clone(), c.message.clone()));
            let message = match current {
                Some((ConditionStatus::True, _, _)) => continue,
                Some((_, reason, message)) => format!("{reason}: {message}"),
                None => format!("{type_} not satisfied"),
            };
            self.set_condition(
                ClusterConditionType::Ready,
                ConditionStatus::False,
                &type_.to_string(),
                &message,
                now,
            );
            return;
        }

        self.set_condition(
            ClusterConditionType::Ready,
            ConditionStatus::True,
            &ClusterConditionReason::Completed.to_string(),
            "Cluster is ready",
            now,
        );
    }

    /// Derive phase and the status message from the conditions, in priority
    /// order: Ready, Degraded, Progressing.
    pub fn update_phase_from_conditions(&mut self) {
        let phase = if self.is_condition_true(ClusterConditionType::Ready) {
            ClusterPhase::Running
        } else if self.is_condition_true(ClusterConditionType::Degraded) {
            ClusterPhase::Error
        } else {
            ClusterPhase::Deploying
        };

        let message = self
            .get_condition(ClusterConditionType::Ready)
            .map(|c| c.message.clone());

        let status = self.status.get_or_insert_with(Default::default);
        status.phase = phase;
        status.message = message;
    }
}
