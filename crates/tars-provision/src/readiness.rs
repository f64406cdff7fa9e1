use std::time::Duration;

use async_trait::async_trait;
use tars_common::{EndpointRecord, EndpointStatus, PollPolicy};
use tars_platform::{ControlPlane, PlatformResult};
use tokio::time::Instant;

/// Where the poll gets endpoint status from.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn endpoint_status(&self, name: &str) -> PlatformResult<EndpointRecord>;
}

#[async_trait]
impl StatusSource for dyn ControlPlane {
    async fn endpoint_status(&self, name: &str) -> PlatformResult<EndpointRecord> {
        self.describe_endpoint(name).await
    }
}

/// State of a readiness poll.
///
/// `Pending` is the only non-terminal state; once a terminal state is
/// reached further observations are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
    Failed { reason: String },
    TimedOut { last_status: Option<EndpointStatus> },
}

impl Readiness {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Transition function of the poll, free of clocks and I/O.
#[derive(Debug, Clone)]
pub struct ReadinessPoll {
    max_wait: Duration,
    state: Readiness,
    last_status: Option<EndpointStatus>,
    checks: u32,
}

impl ReadinessPoll {
    pub fn new(max_wait: Duration) -> Self {
        Self {
            max_wait,
            state: Readiness::Pending,
            last_status: None,
            checks: 0,
        }
    }

    pub fn state(&self) -> &Readiness {
        &self.state
    }

    pub fn last_status(&self) -> Option<&EndpointStatus> {
        self.last_status.as_ref()
    }

    /// Number of observations fed so far.
    pub fn checks(&self) -> u32 {
        self.checks
    }

    /// Called before each status query with the time spent so far.
    pub fn check_deadline(&mut self, elapsed: Duration) -> &Readiness {
        if self.state == Readiness::Pending && elapsed >= self.max_wait {
            self.state = Readiness::TimedOut {
                last_status: self.last_status.clone(),
            };
        }
        &self.state
    }

    /// Feed one status query result. A query error fails the poll.
    pub fn observe(&mut self, observation: PlatformResult<EndpointRecord>) -> &Readiness {
        if self.state.is_terminal() {
            return &self.state;
        }
        self.checks += 1;
        self.state = match observation {
            Ok(record) => {
                let next = match &record.status {
                    EndpointStatus::InService => Readiness::Ready,
                    EndpointStatus::Failed => Readiness::Failed {
                        reason: record
                            .failure_reason
                            .clone()
                            .unwrap_or_else(|| "Unknown".to_string()),
                    },
                    _ => Readiness::Pending,
                };
                self.last_status = Some(record.status);
                next
            }
            Err(e) => Readiness::Failed {
                reason: format!("error checking endpoint status: {e}"),
            },
        };
        &self.state
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub endpoint: String,
    pub state: Readiness,
    pub waited: Duration,
    pub checks: u32,
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        self.state == Readiness::Ready
    }
}

/// Render a duration as "Xm Ys".
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}m {}s", secs / 60, secs % 60)
}

/// Query `endpoint` every `policy.interval` until it is in service, fails,
/// or `policy.max_wait` has passed.
pub async fn wait_until_ready<S>(source: &S, endpoint: &str, policy: PollPolicy) -> PollOutcome
where
    S: StatusSource + ?Sized,
{
    let start = Instant::now();
    let mut poll = ReadinessPoll::new(policy.max_wait);
    tracing::info!(
        endpoint,
        max_wait = %format_elapsed(policy.max_wait),
        "waiting for endpoint to be in service"
    );

    loop {
        if poll.check_deadline(start.elapsed()).is_terminal() {
            break;
        }
        let observation = source.endpoint_status(endpoint).await;
        if poll.observe(observation).is_terminal() {
            break;
        }
        if let Some(status) = poll.last_status() {
            tracing::info!(
                endpoint,
                %status,
                elapsed = %format_elapsed(start.elapsed()),
                "endpoint not ready yet"
            );
        }
        tokio::time::sleep(policy.interval).await;
    }

    let outcome = PollOutcome {
        endpoint: endpoint.to_string(),
        state: poll.state().clone(),
        waited: start.elapsed(),
        checks: poll.checks(),
    };
    match &outcome.state {
        Readiness::Ready => tracing::info!(endpoint, "endpoint is in service"),
        Readiness::Failed { reason } => tracing::error!(endpoint, %reason, "endpoint failed"),
        Readiness::TimedOut { .. } => tracing::error!(endpoint, "timed out waiting for endpoint"),
        Readiness::Pending => {}
    }
    outcome
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    Failed { reason: String },
    TimedOut,
}

/// Poll until describing `endpoint` reports not-found.
pub async fn wait_until_deleted<S>(source: &S, endpoint: &str, policy: PollPolicy) -> Deletion
where
    S: StatusSource + ?Sized,
{
    let start = Instant::now();
    while start.elapsed() < policy.max_wait {
        match source.endpoint_status(endpoint).await {
            Err(e) if e.is_not_found() => {
                tracing::info!(endpoint, "endpoint deleted");
                return Deletion::Deleted;
            }
            Err(e) => {
                return Deletion::Failed {
                    reason: e.to_string(),
                }
            }
            Ok(record) => {
                tracing::info!(endpoint, status = %record.status, "waiting for endpoint deletion");
                tokio::time::sleep(policy.interval).await;
            }
        }
    }
    Deletion::TimedOut
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tars_platform::{PlatformError, ResourceKind};

    /// Replays a fixed sequence of answers; the last one repeats.
    struct Scripted {
        answers: Mutex<VecDeque<PlatformResult<EndpointRecord>>>,
    }

    impl Scripted {
        fn new(answers: Vec<PlatformResult<EndpointRecord>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
            }
        }
    }

    #[async_trait]
    impl StatusSource for Scripted {
        async fn endpoint_status(&self, _name: &str) -> PlatformResult<EndpointRecord> {
            let mut answers = self.answers.lock().unwrap();
            if answers.len() > 1 {
                answers.pop_front().unwrap()
            } else {
                answers.front().cloned().unwrap()
            }
        }
    }

    fn rec(status: EndpointStatus) -> PlatformResult<EndpointRecord> {
        Ok(EndpointRecord::new("e", status))
    }

    fn policy(max_wait_secs: u64) -> PollPolicy {
        PollPolicy::new(Duration::from_secs(30), Duration::from_secs(max_wait_secs))
    }

    #[test]
    fn test_transitions() {
        let mut poll = ReadinessPoll::new(Duration::from_secs(60));
        assert_eq!(poll.observe(rec(EndpointStatus::Creating)), &Readiness::Pending);
        assert_eq!(poll.observe(rec(EndpointStatus::Updating)), &Readiness::Pending);
        assert_eq!(poll.observe(rec(EndpointStatus::InService)), &Readiness::Ready);
        // Terminal states absorb later input.
        assert_eq!(poll.observe(rec(EndpointStatus::Failed)), &Readiness::Ready);
        assert_eq!(poll.checks(), 3);
    }

    #[test]
    fn test_failed_without_reason_reports_unknown() {
        let mut poll = ReadinessPoll::new(Duration::from_secs(60));
        assert_eq!(
            poll.observe(rec(EndpointStatus::Failed)),
            &Readiness::Failed {
                reason: "Unknown".to_string()
            }
        );
    }

    #[test]
    fn test_deadline_keeps_last_status() {
        let mut poll = ReadinessPoll::new(Duration::from_secs(60));
        poll.observe(rec(EndpointStatus::Creating));
        assert_eq!(poll.check_deadline(Duration::from_secs(59)), &Readiness::Pending);
        assert_eq!(
            poll.check_deadline(Duration::from_secs(60)),
            &Readiness::TimedOut {
                last_status: Some(EndpointStatus::Creating)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_before_timeout() {
        let source = Scripted::new(vec![
            rec(EndpointStatus::Creating),
            rec(EndpointStatus::Creating),
            rec(EndpointStatus::InService),
        ]);
        let out = wait_until_ready(&source, "e", policy(1800)).await;
        assert!(out.is_ready());
        assert_eq!(out.checks, 3);
        assert_eq!(out.waited, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_returns_immediately_with_reason() {
        let source = Scripted::new(vec![Ok(EndpointRecord::new("e", EndpointStatus::Failed)
            .with_failure("CUDA out of memory"))]);
        let out = wait_until_ready(&source, "e", policy(1800)).await;
        assert_eq!(
            out.state,
            Readiness::Failed {
                reason: "CUDA out of memory".to_string()
            }
        );
        assert_eq!(out.checks, 1);
        assert_eq!(out.waited, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_terminal_status() {
        let source = Scripted::new(vec![rec(EndpointStatus::Creating)]);
        let out = wait_until_ready(&source, "e", policy(95)).await;
        assert_eq!(
            out.state,
            Readiness::TimedOut {
                last_status: Some(EndpointStatus::Creating)
            }
        );
        // Checks at 0s, 30s, 60s, 90s; the deadline is seen at 120s.
        assert_eq!(out.checks, 4);
        assert_eq!(out.waited, Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_error_aborts_poll() {
        let source = Scripted::new(vec![
            rec(EndpointStatus::Creating),
            Err(PlatformError::Transport("connection reset".to_string())),
        ]);
        let out = wait_until_ready(&source, "e", policy(1800)).await;
        match out.state {
            Readiness::Failed { reason } => assert!(reason.contains("connection reset")),
            other => panic!("unexpected state: {other:?}"),
        }
        assert_eq!(out.checks, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_deleted() {
        let source = Scripted::new(vec![
            rec(EndpointStatus::Deleting),
            Err(PlatformError::not_found(ResourceKind::Endpoint, "e")),
        ]);
        let d = wait_until_deleted(&source, "e", PollPolicy::deletion()).await;
        assert_eq!(d, Deletion::Deleted);

        let stuck = Scripted::new(vec![rec(EndpointStatus::Deleting)]);
        let d = wait_until_deleted(
            &stuck,
            "e",
            PollPolicy::new(Duration::from_secs(10), Duration::from_secs(25)),
        )
        .await;
        assert_eq!(d, Deletion::TimedOut);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(754)), "12m 34s");
    }
}
