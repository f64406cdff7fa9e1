pub mod invoke;
pub mod preflight;
pub mod provision;
pub mod readiness;
pub mod smoke;

pub use invoke::{unsupported_architecture, InvokeError, Invoker, CONTENT_TYPE_JSON};
pub use preflight::{check_image, Compatibility};
pub use provision::{
    cleanup_command, CleanupOutcome, DeployError, DeployOptions, DeployReport, DeployStep,
    Provisioner, Removal, TeardownReport,
};
pub use readiness::{
    format_elapsed, wait_until_deleted, wait_until_ready, Deletion, PollOutcome, Readiness,
    ReadinessPoll, StatusSource,
};
pub use smoke::{default_cases, run_smoke_test, CaseOutcome, SmokeCase, SmokeReport};
