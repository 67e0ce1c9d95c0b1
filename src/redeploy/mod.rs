// ABOUTME: Redeploy orchestration using the type state pattern.
// ABOUTME: Credential, freshness, health verification, per-service transitions and the batch loop.

mod credential;
mod deployment;
mod error;
mod freshness;
mod health;
mod orchestrator;
mod plan;
mod state;
mod transitions;

pub use credential::build_credential;
pub use deployment::{PreviousContainer, ServiceRedeploy, ServiceReport};
pub use error::{HealthError, RedeployError, RedeployStage, StageError};
pub use freshness::{PullOutcome, detect, is_up_to_date_record, up_to_date_marker};
pub use health::{HealthProbe, HealthReport, HealthVerifier, HttpHealthProbe, ProbeError};
pub use orchestrator::{Orchestrator, RedeployOptions, RedeploySummary};
pub use plan::{FALLBACK_ADDRESS, LaunchPlan};
pub use state::{
    Completed, Configured, Created, HealthChecked, ImagePulled, Launched, Located, Pending,
    Retired, Started,
};
pub use transitions::TransitionResult;
