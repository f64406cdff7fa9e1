use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use tars_common::deployment::{DEFAULT_INSTANCE_TYPE, DEFAULT_MODEL_ID, DEFAULT_REGION};
use tars_common::parse_env_pair;

#[derive(Debug, Parser)]
#[command(name = "tars")]
#[command(about = "Deploy, check and invoke UI-TARS inference endpoints", long_about = None)]
pub struct Args {
    /// Control-plane gateway URL (signs and forwards SageMaker API calls)
    #[arg(
        long,
        env = "TARS_CONTROL_PLANE_URL",
        default_value = "http://127.0.0.1:8080"
    )]
    pub control_plane_url: String,

    /// Runtime gateway URL [default: the control-plane URL]
    #[arg(long, env = "TARS_RUNTIME_URL")]
    pub runtime_url: Option<String>,

    /// Gateway API token (Authorization: Bearer)
    #[arg(long, env = "TARS_TOKEN")]
    pub token: Option<String>,

    #[arg(long, env = "TARS_REGION", default_value = DEFAULT_REGION)]
    pub region: String,

    /// Export spans to this OTLP/HTTP collector
    #[arg(long, env = "TARS_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Collector API token; the gateway token is never sent to the collector
    #[arg(long, env = "TARS_OTLP_TOKEN")]
    pub otlp_token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub request_timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create model, endpoint config and endpoint, then wait for it
    Deploy(DeployArgs),
    /// Show the current status of an endpoint
    Status { endpoint: String },
    /// Wait until an endpoint is in service
    Wait {
        endpoint: String,
        #[command(flatten)]
        poll: PollArgs,
    },
    /// Send one request to an endpoint
    Invoke(InvokeArgs),
    /// Run the default text prompts against an endpoint
    SmokeTest { endpoint: String },
    /// Delete an endpoint
    Delete {
        endpoint: String,
        /// Also delete the endpoint config and model created with it
        #[arg(long)]
        all: bool,
    },
    /// List known serving images per region
    Images,
    /// Agent tool integration
    Agent {
        #[command(subcommand)]
        subcommand: AgentCommand,
    },
}

#[derive(Debug, ClapArgs)]
pub struct PollArgs {
    /// Seconds between status checks
    #[arg(long, default_value_t = 30)]
    pub interval_secs: u64,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 1800)]
    pub max_wait_secs: u64,
}

#[derive(Debug, ClapArgs)]
pub struct DeployArgs {
    /// IAM role the platform assumes for the model
    #[arg(long, env = "TARS_EXECUTION_ROLE_ARN")]
    pub execution_role_arn: String,

    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    /// Serving image [default: the catalog image for the region]
    #[arg(long)]
    pub image: Option<String>,

    #[arg(long, default_value = DEFAULT_INSTANCE_TYPE)]
    pub instance_type: String,

    #[arg(long, default_value_t = 1)]
    pub instance_count: u32,

    /// Prefix for generated resource names
    #[arg(long, default_value = "ui-tars")]
    pub name_prefix: String,

    /// Packaged model artifact (s3:// URL)
    #[arg(long)]
    pub model_data_url: Option<String>,

    /// HF_TASK for the container [default: image-to-text]
    #[arg(long)]
    pub hf_task: Option<String>,

    /// Point model caches at /tmp
    #[arg(long)]
    pub tmp_caches: bool,

    /// Allow custom model code from the hub
    #[arg(long)]
    pub trust_remote_code: bool,

    /// Extra container environment (repeatable KEY=VALUE)
    #[arg(long = "env", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Delete this endpoint before deploying
    #[arg(long)]
    pub replace: Option<String>,

    /// Deploy even if the image looks too old for the model
    #[arg(long)]
    pub skip_preflight: bool,

    /// Run the smoke test once the endpoint is in service
    #[arg(long)]
    pub smoke_test: bool,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(Debug, ClapArgs)]
pub struct InvokeArgs {
    pub endpoint: String,

    #[arg(long)]
    pub prompt: String,

    /// Screenshot to send along with the prompt
    #[arg(long)]
    pub image: Option<PathBuf>,

    #[arg(long, default_value_t = 100)]
    pub max_new_tokens: u32,

    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,

    /// Disable sampling
    #[arg(long)]
    pub greedy: bool,
}

#[derive(Debug, Subcommand)]
pub enum AgentCommand {
    /// Print tool definitions (and the agent prompt for a task)
    Tools {
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        task: Option<String>,
    },
    /// Ask the model about one screenshot
    Analyze {
        endpoint: String,
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        question: String,
    },
    /// Analyze screenshots in order toward a goal
    Guide {
        endpoint: String,
        #[arg(long)]
        goal: String,
        #[arg(required = true)]
        screenshots: Vec<PathBuf>,
    },
}
