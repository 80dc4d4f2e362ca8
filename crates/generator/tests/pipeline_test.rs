//! Integration tests for the hook pipeline

use mockall::{mock, predicate};
use restforge_common::graph::{EdgeDef, FieldDef, FieldType, SchemaNode};
use restforge_common::spec::Operation as SpecOperation;
use restforge_common::{GeneratorError, HookStage, OpenApiSpec, Predicate, SchemaGraph};
use restforge_generator::{Config, DocumentSink, SpecGenerator};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

mock! {
    pub Sink {}

    impl DocumentSink for Sink {
        fn write_document(&mut self, spec: &OpenApiSpec) -> restforge_common::Result<()>;
    }
}

fn pets_graph() -> SchemaGraph {
    SchemaGraph::new(vec![
        SchemaNode::new("Pet")
            .with_field(
                FieldDef::new("name", FieldType::String).with_filter(Predicate::GROUP_EQUAL),
            )
            .with_edge(EdgeDef::new("owner", "User").unique()),
        SchemaNode::new("User").with_field(FieldDef::new("email", FieldType::String)),
    ])
}

/// Shared buffer so the test can read what the pipeline wrote
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_hooks_run_in_order() {
    let calls = Arc::new(Mutex::new(Vec::new()));

    let pre = calls.clone();
    let post = calls.clone();
    let write = calls.clone();
    let config = Config::default()
        .with_pre_generate_hook(move |graph, spec| {
            assert!(spec.paths.is_empty());
            pre.lock().unwrap().push(format!("pre-generate:{}", graph.schemas.len()));
            Ok(())
        })
        .with_post_generate_hook(move |_, spec| {
            // Policies are stamped after this hook.
            let read = spec.operation("/pets/{id}", "get").unwrap();
            assert!(!read.responses.contains_key("404"));
            post.lock().unwrap().push("post-generate".to_string());
            Ok(())
        })
        .with_pre_write_hook(move |spec| {
            let read = spec.operation("/pets/{id}", "get").unwrap();
            assert!(read.responses.contains_key("404"));
            write.lock().unwrap().push("pre-write".to_string());
            Ok(())
        })
        .with_writer(std::io::sink());

    let temp_dir = TempDir::new().unwrap();
    SpecGenerator::new(config)
        .run(&pets_graph(), temp_dir.path())
        .unwrap();

    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "pre-generate:2".to_string(),
            "post-generate".to_string(),
            "pre-write".to_string(),
        ]
    );
}

#[test]
fn test_hook_mutations_reach_writer() {
    let buffer = SharedBuffer::default();
    let config = Config::default()
        .with_pre_generate_hook(|_, spec| {
            spec.info.title = "Pet Store".to_string();
            Ok(())
        })
        .with_post_generate_hook(|_, spec| {
            spec.path_mut("/health").set_method(
                "get",
                SpecOperation {
                    operation_id: Some("health".to_string()),
                    ..Default::default()
                },
            );
            Ok(())
        })
        .with_writer(buffer.clone());

    let temp_dir = TempDir::new().unwrap();
    let output = SpecGenerator::new(config)
        .run(&pets_graph(), temp_dir.path())
        .unwrap();

    assert!(output.spec_path.is_none());
    assert!(!temp_dir.path().join("rest").exists());

    let written = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    let spec: OpenApiSpec = serde_json::from_str(&written).unwrap();
    assert_eq!(spec.info.title, "Pet Store");

    // Operations added by hooks still receive global error responses.
    let health = spec.operation("/health", "get").unwrap();
    assert!(health.responses.contains_key("500"));
    assert_eq!(spec, output.spec);
}

#[test]
fn test_writer_receives_one_finalized_document() {
    let mut sink = MockSink::new();
    sink.expect_write_document()
        .with(predicate::function(|spec: &OpenApiSpec| {
            spec.operation("/pets", "post")
                .is_some_and(|op| op.responses.contains_key("409"))
        }))
        .times(1)
        .returning(|_| Ok(()));

    let temp_dir = TempDir::new().unwrap();
    let mut generator = SpecGenerator::new(Config::default().with_sink(sink));
    generator.run(&pets_graph(), temp_dir.path()).unwrap();
}

#[test]
fn test_hook_failure_writes_nothing() {
    for stage in [
        HookStage::PreGenerate,
        HookStage::PostGenerate,
        HookStage::PreWrite,
    ] {
        let mut sink = MockSink::new();
        sink.expect_write_document().times(0);

        let mut config = Config::default().with_sink(sink);
        match stage {
            HookStage::PreGenerate => {
                config = config.with_pre_generate_hook(|_, _| anyhow::bail!("nope"));
            }
            HookStage::PostGenerate => {
                config = config.with_post_generate_hook(|_, _| anyhow::bail!("nope"));
            }
            HookStage::PreWrite => {
                config = config.with_pre_write_hook(|_| anyhow::bail!("nope"));
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let err = SpecGenerator::new(config)
            .run(&pets_graph(), temp_dir.path())
            .unwrap_err();

        match err {
            GeneratorError::Hook {
                stage: failed,
                message,
            } => {
                assert_eq!(failed, stage);
                assert_eq!(message, "nope");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!temp_dir.path().join("rest").exists());
    }
}

#[test]
fn test_invalid_config_writes_nothing() {
    let mut sink = MockSink::new();
    sink.expect_write_document().times(0);

    let mut config = Config::default().with_sink(sink);
    config
        .global_error_responses
        .insert(302, restforge_generator::ErrorResponse::new("Found."));

    let temp_dir = TempDir::new().unwrap();
    let mut generator = SpecGenerator::new(config);
    let err = generator.run(&pets_graph(), temp_dir.path()).unwrap_err();

    assert!(matches!(err, GeneratorError::Config(_)));
    assert!(!generator.config().is_validated());
}
