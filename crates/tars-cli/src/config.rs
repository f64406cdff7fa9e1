use std::time::Duration;

use tars_common::telemetry::TelemetryConfig;
use tars_common::{DeployConfig, EnvironmentOptions, GenerationParameters, PollPolicy};

use crate::args::{Args, DeployArgs, InvokeArgs, PollArgs};

pub fn telemetry_config(args: &Args) -> TelemetryConfig {
    TelemetryConfig {
        default_filter: None,
        otlp_endpoint: args.otlp_endpoint.clone(),
        otlp_token: args.otlp_token.clone(),
    }
}

pub fn build_deploy_config(region: &str, args: &DeployArgs) -> DeployConfig {
    DeployConfig {
        region: region.to_string(),
        model_id: args.model_id.clone(),
        image: args.image.clone(),
        instance_type: args.instance_type.clone(),
        instance_count: args.instance_count,
        model_data_url: args.model_data_url.clone(),
        environment: EnvironmentOptions {
            hf_task: args.hf_task.clone(),
            tmp_caches: args.tmp_caches,
            trust_remote_code: args.trust_remote_code,
            overrides: args.env.clone(),
        },
        ..DeployConfig::new(args.execution_role_arn.clone())
    }
}

pub fn poll_policy(args: &PollArgs) -> PollPolicy {
    PollPolicy::new(
        Duration::from_secs(args.interval_secs),
        Duration::from_secs(args.max_wait_secs),
    )
}

pub fn generation_parameters(args: &InvokeArgs) -> GenerationParameters {
    GenerationParameters {
        max_new_tokens: args.max_new_tokens,
        temperature: args.temperature,
        do_sample: args.greedy.then_some(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Command;
    use clap::Parser;

    fn deploy_args(argv: &[&str]) -> (String, DeployArgs) {
        let mut full = vec!["tars", "--region", "eu-west-1", "deploy"];
        full.extend_from_slice(argv);
        let args = Args::try_parse_from(full).unwrap();
        match args.command {
            Command::Deploy(d) => (args.region, d),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_flags_fold_into_config() {
        let (region, d) = deploy_args(&[
            "--execution-role-arn",
            "arn:aws:iam::1:role/Exec",
            "--env",
            "MAX_INPUT_LENGTH=4096",
            "--tmp-caches",
            "--interval-secs",
            "10",
        ]);
        let cfg = build_deploy_config(&region, &d);
        let descriptor = cfg.descriptor().unwrap();
        assert!(descriptor.image.contains("eu-west-1"));
        assert_eq!(descriptor.environment["MAX_INPUT_LENGTH"], "4096");
        assert_eq!(descriptor.environment["TRANSFORMERS_CACHE"], "/tmp");
        assert_eq!(descriptor.environment["SAGEMAKER_REGION"], "eu-west-1");
        assert_eq!(poll_policy(&d.poll).interval, Duration::from_secs(10));
        assert_eq!(poll_policy(&d.poll).max_wait, Duration::from_secs(1800));
    }

    #[test]
    fn test_malformed_env_is_rejected() {
        let err = Args::try_parse_from([
            "tars",
            "deploy",
            "--execution-role-arn",
            "arn:role",
            "--env",
            "NOEQUALS",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn test_greedy_disables_sampling() {
        let args = Args::try_parse_from(["tars", "invoke", "e", "--prompt", "hi", "--greedy"]).unwrap();
        let Command::Invoke(inv) = args.command else {
            panic!("expected invoke");
        };
        let params = generation_parameters(&inv);
        assert_eq!(params.do_sample, Some(false));
        assert_eq!(params.max_new_tokens, 100);
    }

    #[test]
    fn test_gateway_token_stays_off_the_collector() {
        let args = Args::try_parse_from([
            "tars",
            "--token",
            "gateway-secret",
            "--otlp-endpoint",
            "http://collector:4318",
            "images",
        ])
        .unwrap();
        let cfg = telemetry_config(&args);
        assert_eq!(cfg.otlp_endpoint.as_deref(), Some("http://collector:4318"));
        assert_eq!(cfg.otlp_token, None);

        let args = Args::try_parse_from([
            "tars",
            "--token",
            "gateway-secret",
            "--otlp-token",
            "collector-secret",
            "images",
        ])
        .unwrap();
        assert_eq!(
            telemetry_config(&args).otlp_token.as_deref(),
            Some("collector-secret")
        );
    }
}
