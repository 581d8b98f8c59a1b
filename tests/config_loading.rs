// tests/config_loading.rs

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use gradflow::cli::CliArgs;
use gradflow::config::{ConfigFile, build_graph, load_and_validate, load_from_path, load_from_str};
use gradflow::dag::{Operator, Scheduler};
use gradflow::errors::GradflowError;
use gradflow::ops::OpKind;
use gradflow::pool::RayonWorkerPool;
use gradflow::types::{BackwardReadiness, Dispatch, FillMode};
use tempfile::tempdir;

use crate::common::builders::{GraphFileBuilder, OpConfigBuilder, matmul_sum_chain};
use crate::common::{init_tracing, node_names};

fn manifest_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}

#[test]
fn parses_full_graph_file() {
    let toml = r#"
        [config]
        workers = 3
        backward_readiness = "all_successors"
        dispatch = "counted"

        [buffer.a]
        rows = 2
        cols = 3
        fill = "uniform"

        [buffer.d]
        rows = 1
        cols = 1

        [op.total]
        kind = "sum"
        inputs = ["a"]
        output = "d"
    "#;

    let raw = load_from_str(toml).expect("valid TOML");
    let cfg = ConfigFile::try_from(raw).expect("valid graph file");

    assert_eq!(cfg.config.workers, 3);
    assert_eq!(cfg.config.backward_readiness, BackwardReadiness::AllSuccessors);
    assert_eq!(cfg.config.dispatch, Dispatch::Counted);
    assert_eq!(cfg.buffer["a"].fill, FillMode::Uniform);
    assert_eq!(cfg.buffer["d"].fill, FillMode::Zero);
    assert_eq!(cfg.op["total"].kind, OpKind::Sum);
    assert!(cfg.op["total"].after.is_empty());

    let options = cfg.scheduler_options();
    assert_eq!(options.dispatch, Dispatch::Counted);
}

#[test]
fn mul_is_accepted_as_matmul() {
    let toml = r#"
        [buffer.a]
        rows = 1
        cols = 1

        [buffer.b]
        rows = 1
        cols = 1

        [buffer.c]
        rows = 1
        cols = 1

        [op.m]
        kind = "mul"
        inputs = ["a", "b"]
        output = "c"
    "#;

    let raw = load_from_str(toml).expect("valid TOML");
    assert_eq!(raw.op["m"].kind, OpKind::MatMul);
}

#[test]
fn defaults_apply_when_config_section_is_missing() {
    let cfg = GraphFileBuilder::new()
        .with_buffer("d", 1, 1)
        .with_filled_buffer("a", 2, 2, FillMode::Uniform)
        .with_op(
            "total",
            OpConfigBuilder::new(OpKind::Sum, "d").input("a").build(),
        )
        .build();

    assert!(cfg.config.workers >= 1);
    assert_eq!(cfg.config.backward_readiness, BackwardReadiness::FirstSuccessor);
    assert_eq!(cfg.config.dispatch, Dispatch::Polling);
}

#[test]
fn unknown_fields_are_rejected() {
    let toml = r#"
        [buffer.a]
        rows = 1
        cols = 1
        depth = 4
    "#;

    let result = load_from_str(toml);
    assert!(matches!(result, Err(GradflowError::TomlError(_))));
}

#[test]
fn invalid_toml_surfaces_toml_error() {
    let result = load_from_str("[op.broken\nkind = ");
    assert!(matches!(result, Err(GradflowError::TomlError(_))));
}

#[test]
fn missing_file_surfaces_io_error() {
    let dir = tempdir().expect("tempdir");
    let result = load_from_path(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(GradflowError::IoError(_))));
}

#[test]
fn file_without_ops_is_rejected() {
    let result = GraphFileBuilder::new().with_buffer("a", 1, 1).try_build();
    match result {
        Err(GradflowError::ConfigError(msg)) => assert!(msg.contains("at least one")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn zero_workers_is_rejected() {
    let result = matmul_sum_chain().workers(0).try_build();
    match result {
        Err(GradflowError::ConfigError(msg)) => assert!(msg.contains("workers")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn unknown_buffer_is_rejected() {
    let result = matmul_sum_chain()
        .with_op(
            "extra",
            OpConfigBuilder::new(OpKind::Relu, "nowhere").input("c").after("mul").build(),
        )
        .try_build();
    match result {
        Err(GradflowError::UnknownBuffer(msg)) => assert!(msg.contains("nowhere")),
        other => panic!("Expected UnknownBuffer, got: {:?}", other),
    }
}

#[test]
fn op_reading_its_own_output_is_rejected() {
    let result = GraphFileBuilder::new()
        .with_buffer("a", 2, 2)
        .with_op("r", OpConfigBuilder::new(OpKind::Relu, "a").input("a").build())
        .try_build();
    match result {
        Err(GradflowError::ConfigError(msg)) => assert!(msg.contains("both reads and writes")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn wrong_arity_is_rejected() {
    let result = GraphFileBuilder::new()
        .with_buffer("a", 2, 2)
        .with_buffer("b", 2, 2)
        .with_op("plus", OpConfigBuilder::new(OpKind::Add, "b").input("a").build())
        .try_build();
    match result {
        Err(GradflowError::ConfigError(msg)) => {
            assert!(msg.contains("takes 2 input(s), 1 given"), "{msg}")
        }
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn unknown_dependency_is_rejected() {
    let result = matmul_sum_chain()
        .with_buffer("e", 1, 1)
        .with_op(
            "again",
            OpConfigBuilder::new(OpKind::Sum, "e").input("d").after("total").after("ghost").build(),
        )
        .try_build();
    match result {
        Err(GradflowError::UnknownOperator(msg)) => assert!(msg.contains("ghost")),
        other => panic!("Expected UnknownOperator, got: {:?}", other),
    }
}

#[test]
fn self_dependency_is_rejected() {
    let result = GraphFileBuilder::new()
        .with_buffer("a", 1, 1)
        .with_op("init", OpConfigBuilder::new(OpKind::RandomInit, "a").after("init").build())
        .try_build();
    assert!(matches!(result, Err(GradflowError::ConfigError(_))));
}

#[test]
fn duplicate_writer_is_rejected() {
    let result = matmul_sum_chain()
        .with_op("init_c", OpConfigBuilder::new(OpKind::RandomInit, "c").build())
        .try_build();
    match result {
        Err(GradflowError::ConfigError(msg)) => assert!(msg.contains("written by both"), "{msg}"),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn reader_must_list_the_writer_in_after() {
    let result = matmul_sum_chain()
        .with_op(
            "total",
            OpConfigBuilder::new(OpKind::Sum, "d").input("c").build(),
        )
        .try_build();
    match result {
        Err(GradflowError::ConfigError(msg)) => {
            assert!(msg.contains("does not list it in `after`"), "{msg}")
        }
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn cycle_is_rejected() {
    let result = GraphFileBuilder::new()
        .with_buffer("a", 1, 1)
        .with_buffer("b", 1, 1)
        .with_op(
            "first",
            OpConfigBuilder::new(OpKind::Relu, "b").input("a").after("second").build(),
        )
        .with_op(
            "second",
            OpConfigBuilder::new(OpKind::Relu, "a").input("b").after("first").build(),
        )
        .try_build();
    match result {
        Err(GradflowError::DagCycle(msg)) => assert!(msg.contains("cycle detected")),
        other => panic!("Expected DagCycle, got: {:?}", other),
    }
}

#[test]
fn load_and_validate_reads_from_disk() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("graph.toml");
    fs::write(
        &path,
        r#"
        [config]
        workers = 2

        [buffer.x]
        rows = 2
        cols = 2

        [buffer.y]
        rows = 2
        cols = 2

        [op.init]
        kind = "random_init"
        output = "x"

        [op.act]
        kind = "relu"
        inputs = ["x"]
        output = "y"
        after = ["init"]
        "#,
    )
    .expect("write graph file");

    let cfg = load_and_validate(&path).expect("valid graph file");
    assert_eq!(cfg.config.workers, 2);
    assert_eq!(cfg.op.len(), 2);
}

#[test]
fn bundled_graph_files_validate() {
    for file in ["Gradflow.toml", "demos/relu_softmax.toml"] {
        let cfg = load_and_validate(manifest_path(file));
        assert!(cfg.is_ok(), "{file}: {:?}", cfg.err());
    }
}

#[test]
fn build_graph_registers_nodes_producers_first() {
    let cfg = matmul_sum_chain().build();
    let built = build_graph(&cfg).expect("graph builds");

    let names = node_names(&built.graph);
    assert_eq!(names.len(), 4);
    let pos = |n: &str| names.iter().position(|x| x == n).expect("registered");
    assert!(pos("init_a") < pos("mul"));
    assert!(pos("init_b") < pos("mul"));
    assert!(pos("mul") < pos("total"));
    assert_eq!(built.graph.edges().len(), 3);

    let mul = built.node("mul").expect("mul node");
    assert_eq!(mul.kind(), OpKind::MatMul);
    assert_eq!(mul.inputs().len(), 2);
    assert_eq!(built.buffer("c").map(|b| b.shape()), Some((2, 2)));
}

#[test]
fn built_demo_graph_runs_both_passes() {
    init_tracing();
    let cfg = load_and_validate(manifest_path("demos/relu_softmax.toml")).expect("demo validates");
    let built = build_graph(&cfg).expect("demo builds");
    let pool = std::sync::Arc::new(RayonWorkerPool::new(cfg.config.workers).expect("pool"));
    let sched = Scheduler::with_options(pool, cfg.scheduler_options());

    sched.forward_synced(&built.graph).expect("forward");
    sched.backward(&built.graph).expect("backward");

    // Two softmax columns, each summing to one.
    let loss = built.buffer("loss").expect("loss buffer");
    assert_abs_diff_eq!(loss.get(0, 0), 2.0, epsilon = 1e-5);

    // A constant upstream gradient vanishes through softmax.
    let act = built.buffer("act").expect("act buffer");
    for g in act.grad() {
        assert_abs_diff_eq!(g, 0.0, epsilon = 1e-5);
    }
    assert!(built.nodes.values().all(|n| n.is_backward_computed()));
}

#[test]
fn run_executes_bundled_chain_end_to_end() {
    init_tracing();
    let args = CliArgs {
        config: manifest_path("Gradflow.toml"),
        workers: Some(4),
        dispatch: Some(Dispatch::Counted),
        backward_readiness: None,
        forward_only: false,
        log_level: None,
        dry_run: false,
    };
    gradflow::run(args).expect("run succeeds");
}

#[test]
fn run_reports_invalid_graph_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[buffer.a]\nrows = 1\ncols = 1\n").expect("write");

    let args = CliArgs {
        config: path,
        workers: None,
        dispatch: None,
        backward_readiness: None,
        forward_only: true,
        log_level: None,
        dry_run: true,
    };
    let err = gradflow::run(args).expect_err("no ops");
    assert!(format!("{err:#}").contains("at least one"));
}
