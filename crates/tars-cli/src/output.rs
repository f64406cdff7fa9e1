use tars_agent::{GuidedStep, ToolDefinition};
use tars_common::image::{
    candidate_images, default_image, hf_inference_image, KNOWN_REGIONS, TAG_TRANSFORMERS_4_37,
};
use tars_common::{EndpointRecord, ResourceNames};
use tars_provision::{
    format_elapsed, CaseOutcome, CleanupOutcome, Compatibility, DeployReport, PollOutcome,
    Readiness, Removal, SmokeReport, TeardownReport,
};

pub fn print_compatibility(c: &Compatibility) {
    match c {
        Compatibility::NoRequirement => {}
        Compatibility::Compatible { required, found } => {
            println!("✓ Image ships transformers {found} (needs >= {required})")
        }
        Compatibility::Incompatible {
            architecture,
            required,
            found,
        } => println!(
            "✗ Image ships transformers {found}; {architecture} needs >= {required}"
        ),
        Compatibility::Unknown {
            architecture,
            required,
        } => println!(
            "? Image tag has no transformers version; {architecture} needs >= {required}"
        ),
    }
}

pub fn print_endpoint(record: &EndpointRecord) {
    println!("\n=== Endpoint {} ===", record.name);
    println!("  Status: {}", record.status);
    if let Some(reason) = &record.failure_reason {
        println!("  Failure reason: {reason}");
    }
    println!();
}

pub fn print_poll_outcome(outcome: &PollOutcome) {
    let waited = format_elapsed(outcome.waited);
    match &outcome.state {
        Readiness::Ready => println!(
            "✓ Endpoint '{}' is in service ({waited}, {} checks)",
            outcome.endpoint, outcome.checks
        ),
        Readiness::Failed { reason } => {
            eprintln!("✗ Endpoint '{}' failed: {reason}", outcome.endpoint)
        }
        Readiness::TimedOut { last_status } => eprintln!(
            "✗ Timed out after {waited} waiting for '{}' (last status: {})",
            outcome.endpoint,
            last_status
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ),
        Readiness::Pending => println!("… '{}' still pending", outcome.endpoint),
    }
}

pub fn print_smoke_report(report: &SmokeReport) {
    println!("\n=== Smoke Test ===");
    for (name, outcome) in &report.results {
        match outcome {
            CaseOutcome::Passed(reply) => {
                println!("  ✓ {name}");
                println!("    {}", reply.clone().into_display_string());
            }
            CaseOutcome::Failed(err) => println!("  ✗ {name}: {err}"),
        }
    }
    if let Some(issue) = &report.compatibility_issue {
        println!("\n  The endpoint is up but its container cannot run the model ({issue}).");
        println!("  Redeploy with a newer image (see `tars images`).");
    }
    println!();
}

pub fn print_deploy_report(report: &DeployReport) {
    if let Some(cleanup) = &report.cleanup {
        match cleanup {
            CleanupOutcome::Deleted => println!("✓ Previous endpoint deleted"),
            CleanupOutcome::NotPresent => println!("○ No previous endpoint to delete"),
            CleanupOutcome::Failed(reason) => println!("⚠ Cleanup failed: {reason}"),
            CleanupOutcome::TimedOut => println!("⚠ Previous endpoint still deleting"),
        }
    }
    print_poll_outcome(&report.readiness);
    if let Some(smoke) = &report.smoke {
        print_smoke_report(smoke);
    }

    println!("\n=== Deployment ===");
    println!("  Endpoint:      {}", report.names.endpoint);
    println!("  Model:         {}", report.descriptor.model_id);
    println!("  Instance type: {}", report.descriptor.instance_type);
    println!("  Image:         {}", report.descriptor.image);
    println!("  Model ARN:     {}", report.model_arn);
    println!("  Endpoint ARN:  {}", report.endpoint_arn);
    println!("\nRemember to delete the endpoint when done:");
    println!("  {}", report.cleanup_command());
    println!();
}

pub fn print_removal(kind: &str, name: &str, removal: &Removal) {
    match removal {
        Removal::Deleted => println!("✓ Deleted {kind} '{name}'"),
        Removal::NotFound => println!("○ {kind} '{name}' not found"),
        Removal::Failed(reason) => eprintln!("✗ Failed to delete {kind} '{name}': {reason}"),
    }
}

pub fn print_teardown(names: &ResourceNames, report: &TeardownReport) {
    print_removal("endpoint", &names.endpoint, &report.endpoint);
    print_removal("endpoint config", &names.endpoint_config, &report.endpoint_config);
    print_removal("model", &names.model, &report.model);
}

pub fn print_images(region: &str) {
    println!("\n=== Serving Images ===\n");
    println!("Default for {region}:");
    println!("  {}", default_image(region));
    println!("\nTransformers 4.37 (cannot load qwen2_5_vl):");
    for r in KNOWN_REGIONS {
        println!("  {}", hf_inference_image(r, TAG_TRANSFORMERS_4_37));
    }
    println!("\nNewer candidates:");
    println!("  {:<12} {}", "Region", "Image");
    for (r, uri) in candidate_images() {
        println!("  {:<12} {}", r, uri);
    }
    println!();
}

pub fn print_tools(tools: &[ToolDefinition]) {
    println!("\n=== Agent Tools ===\n");
    for t in tools {
        println!("{}", t.name);
        println!("  {}", t.description);
        println!(
            "  schema: {}",
            serde_json::to_string(&t.input_schema).unwrap_or_default()
        );
    }
    println!();
}

pub fn print_guided_steps(steps: &[GuidedStep]) {
    for s in steps {
        println!("\n[Step {}] {}", s.step, s.screenshot);
        println!("{}", s.analysis);
    }
    println!();
}
