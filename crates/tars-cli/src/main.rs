mod args;
mod client;
mod config;
mod output;

use anyhow::{bail, Context, Result};
use clap::Parser;

use tars_agent::{
    default_registry, encode_image, render_agent_prompt, GuidedAnalysis, ScreenshotAnalyzer,
};
use tars_common::telemetry::init_tracing;
use tars_common::{InferenceRequest, PollPolicy, ResourceNames};
use tars_provision::{
    check_image, cleanup_command, default_cases, run_smoke_test, DeployOptions, DeployStep,
    Removal,
};

use crate::args::{AgentCommand, Args, Command};
use crate::client::Connection;
use crate::config::{build_deploy_config, generation_parameters, poll_policy, telemetry_config};
use crate::output::{
    print_compatibility, print_deploy_report, print_endpoint, print_guided_steps, print_images,
    print_poll_outcome, print_removal, print_smoke_report, print_teardown, print_tools,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let otel = init_tracing("tars", &telemetry_config(&args));

    let result = run(args).await;

    if let Some(provider) = otel {
        if let Err(e) = provider.shutdown() {
            eprintln!("failed to flush spans: {e}");
        }
    }
    result
}

async fn run(args: Args) -> Result<()> {
    let conn = Connection::from_args(&args);
    let region = args.region.clone();

    match args.command {
        Command::Deploy(d) => {
            let descriptor = build_deploy_config(&region, &d).descriptor()?;
            let policy = poll_policy(&d.poll);
            policy.validate()?;
            let names = ResourceNames::now(&d.name_prefix);

            println!(
                "Deploying {} to '{}' ({} x {}) in {}",
                descriptor.model_id,
                names.endpoint,
                descriptor.instance_count,
                descriptor.instance_type,
                region
            );
            print_compatibility(&check_image(&descriptor.model_id, &descriptor.image));

            let opts = DeployOptions {
                replace_endpoint: d.replace.clone(),
                skip_preflight: d.skip_preflight,
                smoke_test: d.smoke_test,
            };
            let provisioner = conn.provisioner(policy)?;
            match provisioner.deploy(&descriptor, &names, &opts).await {
                Ok(report) => {
                    print_deploy_report(&report);
                    if report.smoke.as_ref().is_some_and(|s| !s.passed()) {
                        bail!("smoke test failed on '{}'", names.endpoint);
                    }
                }
                Err(e) => {
                    eprintln!("✗ Deployment stopped at {}: {e}", e.step());
                    if !matches!(e.step(), DeployStep::Preflight | DeployStep::CreateModel) {
                        eprintln!("\nResources were left behind. Clean up with:");
                        eprintln!("  tars delete {} --all", names.endpoint);
                        eprintln!("  {}", cleanup_command(&names.endpoint));
                    }
                    return Err(e.into());
                }
            }
        }
        Command::Status { endpoint } => {
            let record = conn
                .provisioner(PollPolicy::default())?
                .status(&endpoint)
                .await
                .with_context(|| format!("failed to describe endpoint '{endpoint}'"))?;
            print_endpoint(&record);
        }
        Command::Wait { endpoint, poll } => {
            let policy = poll_policy(&poll);
            policy.validate()?;
            let outcome = conn.provisioner(policy)?.wait(&endpoint).await;
            print_poll_outcome(&outcome);
            if !outcome.is_ready() {
                bail!("endpoint '{endpoint}' is not in service");
            }
        }
        Command::Invoke(inv) => {
            let params = generation_parameters(&inv);
            let request = match &inv.image {
                Some(path) => {
                    let image = encode_image(path)
                        .await
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    InferenceRequest::multimodal(image, inv.prompt.clone(), params)
                }
                None => InferenceRequest::text(inv.prompt.clone(), params),
            };
            match conn.invoker(&inv.endpoint)?.invoke(&request).await {
                Ok(reply) => println!("{}", reply.into_display_string()),
                Err(e) => {
                    if e.is_unsupported_architecture() {
                        eprintln!(
                            "✗ The endpoint's container is too old for this model; see `tars images`."
                        );
                    }
                    return Err(e.into());
                }
            }
        }
        Command::SmokeTest { endpoint } => {
            let report = run_smoke_test(&conn.invoker(&endpoint)?, &default_cases()).await;
            print_smoke_report(&report);
            if !report.passed() {
                bail!("smoke test failed on '{endpoint}'");
            }
            println!("✓ All smoke tests passed");
        }
        Command::Delete { endpoint, all } => {
            let provisioner = conn.provisioner(PollPolicy::default())?;
            if all {
                let Some(names) = ResourceNames::from_endpoint_name(&endpoint) else {
                    bail!(
                        "cannot derive model and config names from '{endpoint}'; \
                         expected <prefix>-endpoint-<timestamp>"
                    );
                };
                let report = provisioner.teardown(&names).await;
                print_teardown(&names, &report);
                if !report.is_clean() {
                    bail!("teardown of '{endpoint}' incomplete");
                }
            } else {
                let removal = provisioner.delete_endpoint(&endpoint).await;
                print_removal("endpoint", &endpoint, &removal);
                if let Removal::Failed(reason) = removal {
                    bail!("failed to delete '{endpoint}': {reason}");
                }
            }
        }
        Command::Images => print_images(&region),
        Command::Agent { subcommand } => match subcommand {
            AgentCommand::Tools { endpoint, task } => {
                let registry = default_registry(conn.invoker(&endpoint)?);
                print_tools(&registry.definitions());
                if let Some(task) = task {
                    println!("{}", render_agent_prompt(&registry, &task));
                }
            }
            AgentCommand::Analyze {
                endpoint,
                image,
                question,
            } => {
                let analyzer = ScreenshotAnalyzer::new(conn.invoker(&endpoint)?);
                println!("{}", analyzer.analyze(&image, &question).await);
            }
            AgentCommand::Guide {
                endpoint,
                goal,
                screenshots,
            } => {
                let analyzer = ScreenshotAnalyzer::new(conn.invoker(&endpoint)?);
                let steps = GuidedAnalysis::new(analyzer, goal).run(&screenshots).await;
                print_guided_steps(&steps);
            }
        },
    }

    Ok(())
}
