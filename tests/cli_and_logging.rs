// tests/cli_and_logging.rs

mod common;

use std::path::PathBuf;

use clap::Parser;
use gradflow::cli::{CliArgs, LogLevel};
use gradflow::config::default_config_path;
use gradflow::logging::build_filter;
use gradflow::scheduler_options;
use gradflow::types::{BackwardReadiness, Dispatch};
use tracing::level_filters::LevelFilter;

use crate::common::builders::matmul_sum_chain;

#[test]
fn config_defaults_to_the_default_graph_file() {
    let args = CliArgs::try_parse_from(["gradflow"]).expect("parses");
    assert_eq!(args.config, default_config_path());
    assert_eq!(args.config, PathBuf::from("Gradflow.toml"));
    assert!(args.dispatch.is_none());
    assert!(args.backward_readiness.is_none());
}

#[test]
fn scheduler_flags_parse_and_override_the_graph_file() {
    let args = CliArgs::try_parse_from([
        "gradflow",
        "--config",
        "demos/relu_softmax.toml",
        "--dispatch",
        "counted",
        "--backward-readiness",
        "all-successors",
    ])
    .expect("parses");

    assert_eq!(args.config, PathBuf::from("demos/relu_softmax.toml"));
    assert_eq!(args.dispatch, Some(Dispatch::Counted));
    assert_eq!(args.backward_readiness, Some(BackwardReadiness::AllSuccessors));

    let cfg = matmul_sum_chain()
        .dispatch(Dispatch::Polling)
        .backward_readiness(BackwardReadiness::FirstSuccessor)
        .build();
    let options = scheduler_options(&args, &cfg);
    assert_eq!(options.dispatch, Dispatch::Counted);
    assert_eq!(options.backward_readiness, BackwardReadiness::AllSuccessors);
}

#[test]
fn graph_file_options_apply_without_flags() {
    let args = CliArgs::try_parse_from(["gradflow"]).expect("parses");
    let cfg = matmul_sum_chain()
        .dispatch(Dispatch::Counted)
        .backward_readiness(BackwardReadiness::AllSuccessors)
        .build();

    assert_eq!(scheduler_options(&args, &cfg), cfg.scheduler_options());
}

#[test]
fn unknown_dispatch_mode_is_rejected() {
    let result = CliArgs::try_parse_from(["gradflow", "--dispatch", "eager"]);
    let err = result.expect_err("eager is not a dispatch mode");
    assert!(err.to_string().contains("invalid dispatch"), "{err}");
}

#[test]
fn cli_level_wins_over_environment() {
    let (filter, rejected) = build_filter(Some(LogLevel::Debug), Some("trace"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    assert!(rejected.is_none());
}

#[test]
fn environment_directives_are_used_when_no_flag_is_given() {
    let (filter, rejected) = build_filter(None, Some("warn,gradflow::dag=trace"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    assert!(rejected.is_none());
}

#[test]
fn unparsable_environment_falls_back_to_info() {
    let (filter, rejected) = build_filter(None, Some("gradflow=loudest"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    assert_eq!(rejected.as_deref(), Some("gradflow=loudest"));

    let (filter, rejected) = build_filter(None, Some("  "));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    assert!(rejected.is_none());
}
