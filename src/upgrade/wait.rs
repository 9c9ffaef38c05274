//! The gate wait loop: poll a probe with exponential backoff until it
//! passes, fails hard, or the phase budget runs out, announcing every
//! transition through the event sink.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::crd::RavenDBCluster;
use crate::error::{Error, Result};

use super::gates::{summarize_error, GateCheck, HealthCheckContext};
use super::{GateError, GateEventSink, GateKind, GatePhase, GateState};

const MAX_SLEEP: Duration = Duration::from_secs(15);

/// One pollable gate check.
#[async_trait]
pub(super) trait GateProbe: Send + Sync {
    async fn check(&self) -> Result<GateCheck>;
}

pub(super) struct NodeAliveProbe<'a> {
    pub gates: &'a HealthCheckContext,
    pub tag: String,
}

#[async_trait]
impl GateProbe for NodeAliveProbe<'_> {
    async fn check(&self) -> Result<GateCheck> {
        self.gates.node_alive(&self.tag).await
    }
}

pub(super) struct ConnectivityProbe<'a> {
    pub gates: &'a HealthCheckContext,
}

#[async_trait]
impl GateProbe for ConnectivityProbe<'_> {
    async fn check(&self) -> Result<GateCheck> {
        self.gates.cluster_connectivity().await
    }
}

pub(super) struct DatabasesOnlineProbe<'a> {
    pub gates: &'a HealthCheckContext,
    pub excluded: String,
}

#[async_trait]
impl GateProbe for DatabasesOnlineProbe<'_> {
    async fn check(&self) -> Result<GateCheck> {
        self.gates.databases_online(&self.excluded).await
    }
}

#[allow(clippy::too_many_arguments)]
pub(super) async fn wait_for_gate(
    emitter: Option<&Arc<dyn GateEventSink>>,
    cluster: &RavenDBCluster,
    phase: GatePhase,
    kind: GateKind,
    tag: &str,
    interval: Duration,
    max_wait: Duration,
    probe: &dyn GateProbe,
) -> Result<(), GateError> {
    let emit = |state: GateState, info: String| async move {
        if let Some(sink) = emitter {
            sink.emit(cluster, state, phase, kind, tag, &info).await;
        }
    };

    emit(GateState::Start, String::new()).await;

    let start = Instant::now();
    let mut sleep = interval;
    let mut attempt = 0u32;
    let mut last_info;

    loop {
        let check = match probe.check().await {
            // hard error from the check: fail immediately
            Err(e) => {
                let info = hard_error_info(&e);
                emit(GateState::Block, info.clone()).await;
                return Err(GateError {
                    phase,
                    kind,
                    tag: tag.to_string(),
                    info,
                });
            }
            Ok(check) => check,
        };

        if check.ok {
            emit(GateState::Pass, String::new()).await;
            return Ok(());
        }

        last_info = check.info;
        attempt += 1;
        emit(
            GateState::Block,
            format!(
                "retry in {} (attempt {attempt}): {}",
                humantime::format_duration(sleep),
                summarize_error(&last_info)
            ),
        )
        .await;

        if start.elapsed() >= max_wait {
            let info = if last_info.is_empty() {
                "timeout".to_string()
            } else {
                format!("{last_info} (timeout)")
            };
            emit(GateState::Timeout, info.clone()).await;
            return Err(GateError {
                phase,
                kind,
                tag: tag.to_string(),
                info,
            });
        }

        tokio::time::sleep(sleep).await;
        sleep = (sleep * 2).min(MAX_SLEEP);
    }
}

fn hard_error_info(e: &Error) -> String {
    let message = e.to_string();
    if message.is_empty() {
        "timeout".to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::test_fixtures::base_cluster_lets_encrypt;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    struct ScriptedProbe {
        script: Mutex<VecDeque<Result<GateCheck>>>,
    }

    impl ScriptedProbe {
        fn new(script: Vec<Result<GateCheck>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl GateProbe for ScriptedProbe {
        async fn check(&self) -> Result<GateCheck> {
            self.script
                .lock()
                .await
                .pop_front()
                .unwrap_or(Ok(GateCheck {
                    ok: true,
                    info: String::new(),
                }))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(GateState, String)>>,
    }

    #[async_trait]
    impl GateEventSink for RecordingSink {
        async fn emit(
            &self,
            _cluster: &RavenDBCluster,
            state: GateState,
            _phase: GatePhase,
            _kind: GateKind,
            _tag: &str,
            info: &str,
        ) {
            self.events.lock().await.push((state, info.to_string()));
        }
    }

    fn blocked(info: &str) -> Result<GateCheck> {
        Ok(GateCheck {
            ok: false,
            info: info.to_string(),
        })
    }

    fn passing() -> Result<GateCheck> {
        Ok(GateCheck {
            ok: true,
            info: String::new(),
        })
    }

    async fn run_wait(
        probe: ScriptedProbe,
        max_wait: Duration,
    ) -> (Result<(), GateError>, Vec<(GateState, String)>) {
        let cluster = base_cluster_lets_encrypt("wait");
        let recorder = Arc::new(RecordingSink::default());
        let sink: Arc<dyn GateEventSink> = recorder.clone();

        let outcome = wait_for_gate(
            Some(&sink),
            &cluster,
            GatePhase::PreStep,
            GateKind::NodeAlive,
            "A",
            Duration::from_millis(5),
            max_wait,
            &probe,
        )
        .await;

        let events = recorder.events.lock().await.clone();
        (outcome, events)
    }

    #[tokio::test]
    async fn passes_after_retries_with_block_events_in_between() {
        let probe = ScriptedProbe::new(vec![
            blocked("warming up"),
            blocked("still warming"),
            passing(),
        ]);

        let (outcome, events) = run_wait(probe, Duration::from_secs(5)).await;
        assert!(outcome.is_ok());

        let states: Vec<GateState> = events.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            states,
            vec![
                GateState::Start,
                GateState::Block,
                GateState::Block,
                GateState::Pass
            ]
        );
        assert!(events[1].1.contains("retry in"));
        assert!(events[1].1.contains("(attempt 1): warming up"));
        assert!(events[2].1.contains("(attempt 2): still warming"));
    }

    #[tokio::test]
    async fn hard_probe_error_fails_immediately() {
        let probe = ScriptedProbe::new(vec![Err(Error::ConfigError(
            "no URL for tag \"A\"".to_string(),
        ))]);

        let (outcome, events) = run_wait(probe, Duration::from_secs(5)).await;
        let err = outcome.unwrap_err();
        assert_eq!(err.kind, GateKind::NodeAlive);
        assert_eq!(err.tag, "A");
        assert!(err.info.contains("no URL for tag"));

        let states: Vec<GateState> = events.iter().map(|(s, _)| *s).collect();
        assert_eq!(states, vec![GateState::Start, GateState::Block]);
    }

    #[tokio::test]
    async fn exhausting_the_budget_emits_timeout() {
        let probe = ScriptedProbe::new(vec![
            blocked("down"),
            blocked("down"),
            blocked("down"),
            blocked("down"),
        ]);

        let (outcome, events) = run_wait(probe, Duration::from_millis(1)).await;
        let err = outcome.unwrap_err();
        assert!(err.info.contains("(timeout)"));

        let last = events.last().unwrap();
        assert_eq!(last.0, GateState::Timeout);
        assert!(last.1.contains("down (timeout)"));
    }

    #[tokio::test]
    async fn works_without_an_emitter() {
        let probe = ScriptedProbe::new(vec![passing()]);
        let cluster = base_cluster_lets_encrypt("wait-silent");
        let outcome = wait_for_gate(
            None,
            &cluster,
            GatePhase::PostStep,
            GateKind::DatabasesOnline,
            "B",
            Duration::from_millis(1),
            Duration::from_secs(1),
            &probe,
        )
        .await;
        assert!(outcome.is_ok());
    }
}
