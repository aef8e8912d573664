//! Unit tests for the pipeline compiler
//!
//! Tests operation lowering, type checking and transformers through the
//! public `Compiler` interface

use anyhow::Result;
use pipeforge_compiler::{add_pod_env, CompileError, Compiler, CompilerOptions, PipelineFn, ADD_POD_ENV_LABEL};
use pipeforge_core::ops::{EnvVar, Toleration, UserContainer, VolumeMount};
use pipeforge_core::types::builtin;
use pipeforge_core::{ContainerOp, OpAttributes, ParamSpec, ResourceOp, TypeSpec};
use pipeforge_parser::load_component_from_text;
use serde_json::{json, Value};

fn template_json(workflow: &pipeforge_core::Workflow, name: &str) -> Value {
    let template = workflow
        .template(name)
        .unwrap_or_else(|| panic!("missing template {}", name));
    serde_json::to_value(template).unwrap()
}

// =============================================================================
// Operation Lowering Tests
// =============================================================================

fn operator_pipeline() -> PipelineFn {
    PipelineFn::new(
        "somename",
        vec![ParamSpec::new("msg1"), ParamSpec::new("json"), ParamSpec::new("kind")],
        |b, params| {
            let (msg1, json_param, kind) = (&params[0], &params[1], &params[2]);
            let msg2 = b.constant("msg2", "value2")?;
            b.add(
                ContainerOp::new("echo", "image")
                    .command(["sh", "-c"])
                    .args([format!("echo {} {} | tee /tmp/message.txt", msg1, msg2)])
                    .file_output("merged", "/tmp/message.txt")
                    .add_volume_mount(VolumeMount::new("gcp-credentials", "/secret/gcp-credentials"))
                    .add_env_variable(EnvVar::new(
                        "GOOGLE_APPLICATION_CREDENTIALS",
                        "/secret/gcp-credentials/user-gcp-sa.json",
                    )),
            )?;
            b.add(
                ResourceOp::new(
                    "test-resource",
                    json!({
                        "apiVersion": "v1",
                        "kind": kind.to_string(),
                        "metadata": {"name": "resource"}
                    }),
                )
                .attribute_output("out", json_param.to_string()),
            )?;
            Ok(())
        },
    )
}

#[test]
fn test_container_template() -> Result<()> {
    let workflow = Compiler::new().compile(&operator_pipeline())?;

    let golden = json!({
        "name": "echo",
        "container": {
            "image": "image",
            "command": ["sh", "-c"],
            "args": ["echo {{inputs.parameters.msg1}} {{inputs.parameters.msg2}} | tee /tmp/message.txt"],
            "env": [{
                "name": "GOOGLE_APPLICATION_CREDENTIALS",
                "value": "/secret/gcp-credentials/user-gcp-sa.json"
            }],
            "volumeMounts": [{
                "mountPath": "/secret/gcp-credentials",
                "name": "gcp-credentials"
            }]
        },
        "inputs": {"parameters": [
            {"name": "msg1"},
            {"name": "msg2", "value": "value2"}
        ]},
        "outputs": {
            "parameters": [{"name": "echo-merged", "valueFrom": {"path": "/tmp/message.txt"}}],
            "artifacts": [
                {"name": "mlpipeline-ui-metadata", "path": "/mlpipeline-ui-metadata.json", "optional": true},
                {"name": "mlpipeline-metrics", "path": "/mlpipeline-metrics.json", "optional": true}
            ]
        }
    });
    assert_eq!(template_json(&workflow, "echo"), golden);
    Ok(())
}

#[test]
fn test_resource_template() -> Result<()> {
    let workflow = Compiler::new().compile(&operator_pipeline())?;

    let golden = json!({
        "name": "test-resource",
        "inputs": {"parameters": [{"name": "json"}, {"name": "kind"}]},
        "outputs": {"parameters": [
            {"name": "test-resource-manifest", "valueFrom": {"jsonPath": "{}"}},
            {"name": "test-resource-name", "valueFrom": {"jsonPath": "{.metadata.name}"}},
            {"name": "test-resource-out", "valueFrom": {"jsonPath": "{{inputs.parameters.json}}"}}
        ]},
        "resource": {
            "action": "create",
            "manifest": "apiVersion: v1\nkind: '{{inputs.parameters.kind}}'\nmetadata:\n  name: resource\n"
        }
    });
    assert_eq!(template_json(&workflow, "test-resource"), golden);
    Ok(())
}

#[test]
fn test_immediate_value_is_not_a_workflow_argument() -> Result<()> {
    let workflow = Compiler::new().compile(&operator_pipeline())?;

    let names: Vec<&str> = workflow
        .spec
        .arguments
        .parameters
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["msg1", "json", "kind"]);

    let root = workflow.entrypoint_template().unwrap();
    assert!(!root.input_names().contains(&"msg2"));
    let echo = root.task("echo").unwrap();
    let args: Vec<&str> = echo
        .arguments
        .as_ref()
        .unwrap()
        .parameters
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(args, vec!["msg1"]);
    Ok(())
}

#[test]
fn test_tolerations() -> Result<()> {
    let pipeline = PipelineFn::new("tolerations", vec![], |b, _| {
        b.add(
            ContainerOp::new("download", "busybox")
                .command(["sh", "-c"])
                .args(["sleep 10; wget localhost:5678 -O /tmp/results.txt"])
                .file_output("downloaded", "/tmp/results.txt")
                .add_toleration(Toleration::new("gpu", "Equal", "run", "NoSchedule")),
        )?;
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let golden = json!({
        "name": "download",
        "container": {
            "image": "busybox",
            "command": ["sh", "-c"],
            "args": ["sleep 10; wget localhost:5678 -O /tmp/results.txt"]
        },
        "outputs": {
            "parameters": [{"name": "download-downloaded", "valueFrom": {"path": "/tmp/results.txt"}}],
            "artifacts": [
                {"name": "mlpipeline-ui-metadata", "path": "/mlpipeline-ui-metadata.json", "optional": true},
                {"name": "mlpipeline-metrics", "path": "/mlpipeline-metrics.json", "optional": true}
            ]
        },
        "tolerations": [{"effect": "NoSchedule", "key": "gpu", "operator": "Equal", "value": "run"}]
    });
    assert_eq!(template_json(&workflow, "download"), golden);
    Ok(())
}

#[test]
fn test_set_display_name() -> Result<()> {
    let component = load_component_from_text(
        r#"
name: Component name
implementation:
  container:
    image: busybox
"#,
    )?;
    let pipeline = PipelineFn::new("some_pipeline", vec![], move |b, _| {
        b.add(component.instantiate(&[])?.set_display_name("Custom name"))?;
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let template = template_json(&workflow, "component-name");
    assert_eq!(
        template["metadata"]["annotations"]["pipelines.kubeflow.org/task_display_name"],
        "Custom name"
    );
    Ok(())
}

#[test]
fn test_init_container() -> Result<()> {
    let pipeline = PipelineFn::new("InitContainer", vec![], |b, _| {
        b.add(
            ContainerOp::new("hello", "alpine:latest")
                .command(["echo", "hello"])
                .add_init_container(UserContainer::new("echo", "alpine:latest").command(["echo", "bye"])),
        )?;
        Ok(())
    })
    .with_description("A pipeline with init container.");
    let workflow = Compiler::new().compile(&pipeline)?;

    let with_init: Vec<Value> = workflow
        .spec
        .templates
        .iter()
        .filter(|t| !t.init_containers.is_empty())
        .map(|t| serde_json::to_value(&t.init_containers).unwrap())
        .collect();
    assert_eq!(
        with_init,
        vec![json!([{"image": "alpine:latest", "command": ["echo", "bye"], "name": "echo"}])]
    );
    Ok(())
}

#[test]
fn test_sidecar_mirrors_volume_mounts() -> Result<()> {
    let pipeline = PipelineFn::new("sidecar", vec![], |b, _| {
        b.add(
            ContainerOp::new("download", "busybox")
                .add_volume_mount(VolumeMount::new("shared", "/shared"))
                .add_sidecar(UserContainer::new("echo", "hashicorp/http-echo").args(["-text=hello"]).mirror_volume_mounts()),
        )?;
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let template = template_json(&workflow, "download");
    assert_eq!(
        template["sidecars"],
        json!([{
            "name": "echo",
            "image": "hashicorp/http-echo",
            "args": ["-text=hello"],
            "volumeMounts": [{"name": "shared", "mountPath": "/shared"}],
            "mirrorVolumeMounts": true
        }])
    );
    Ok(())
}

// =============================================================================
// Type Checking Tests
// =============================================================================

const TYPED_COMPONENT: &str = r#"
name: operator a
inputs:
- {name: field_m, type: {GCSPath: {path_type: file, file_type: tsv}}}
- {name: field_o, type: Integer}
implementation:
  container:
    image: gcr.io/ml-pipeline/component-b
    args: [--field-l, {inputValue: field_m}, --field-o, {inputValue: field_o}]
"#;

fn typed_pipeline(file_type: &str) -> Result<PipelineFn> {
    let component = load_component_from_text(TYPED_COMPONENT)?;
    let gcs = TypeSpec::with_properties("GCSPath", [("path_type", json!("file")), ("file_type", json!(file_type))]);
    Ok(PipelineFn::new(
        "p1",
        vec![
            ParamSpec::new("a").with_type(gcs).with_default("good"),
            ParamSpec::new("b").with_type(builtin::integer()).with_default("12"),
        ],
        move |b, params| {
            let op = component.instantiate(&[("field_m", (&params[0]).into()), ("field_o", (&params[1]).into())])?;
            b.add(op)?;
            Ok(())
        },
    )
    .with_description("description1"))
}

#[test]
fn test_type_checking_with_consistent_types() -> Result<()> {
    Compiler::new().compile(&typed_pipeline("tsv")?)?;
    Ok(())
}

#[test]
fn test_type_checking_with_inconsistent_types() -> Result<()> {
    let pipeline = typed_pipeline("csv")?;

    let result = Compiler::new().compile(&pipeline);
    assert!(matches!(result, Err(CompileError::TypeMismatch { .. })));

    let unchecked = Compiler::with_options(CompilerOptions::default().with_type_check(false));
    unchecked.compile(&pipeline)?;
    Ok(())
}

#[test]
fn test_type_checking_with_json_schema() -> Result<()> {
    let component = load_component_from_text(
        r#"
name: operator a
inputs:
- {name: field_m, type: {GCRPath: {openapi_schema_validator: {type: string, pattern: "^.*gcr\\.io/.*$"}}}}
- {name: field_o, type: Integer}
implementation:
  container:
    image: gcr.io/ml-pipeline/component-b
    args: [--field-l, {inputValue: field_m}, --field-o, {inputValue: field_o}]
"#,
    )?;
    let pipeline = PipelineFn::new(
        "p1",
        vec![
            ParamSpec::new("a").with_type(builtin::gcr_path()).with_default("good"),
            ParamSpec::new("b").with_type(builtin::integer()).with_default("12"),
        ],
        move |b, params| {
            let op = component.instantiate(&[("field_m", (&params[0]).into()), ("field_o", (&params[1]).into())])?;
            b.add(op)?;
            Ok(())
        },
    );

    let result = Compiler::new().compile(&pipeline);
    assert!(matches!(result, Err(CompileError::SchemaValidationError { .. })));

    let valid = Compiler::with_options(CompilerOptions::default().with_argument("a", "gcr.io/project/image"));
    valid.compile(&pipeline)?;

    let unchecked = Compiler::with_options(CompilerOptions::default().with_type_check(false));
    unchecked.compile(&pipeline)?;
    Ok(())
}

#[test]
fn test_literal_argument_validated_against_schema() -> Result<()> {
    let component = load_component_from_text(
        r#"
name: deploy
inputs:
- {name: image, type: {GCRPath: {openapi_schema_validator: {type: string, pattern: "^.*gcr\\.io/.*$"}}}}
implementation:
  container:
    image: busybox
    args: [{inputValue: image}]
"#,
    )?;
    let pipeline = PipelineFn::new("deploy pipeline", vec![], move |b, _| {
        b.add(component.instantiate(&[("image", "docker.io/library/busybox".into())])?)?;
        Ok(())
    });

    let result = Compiler::new().compile(&pipeline);
    assert!(matches!(result, Err(CompileError::SchemaValidationError { .. })));
    Ok(())
}

fn nested_pipeline(inner_type: TypeSpec, outer_type: TypeSpec) -> PipelineFn {
    let inner = PipelineFn::new("inner", vec![ParamSpec::new("x").with_type(inner_type)], |b, args| {
        b.add(ContainerOp::new("echo", "busybox").args([args[0].to_string()]))?;
        Ok(())
    });
    PipelineFn::new("outer", vec![ParamSpec::new("s").with_type(outer_type)], move |b, params| {
        b.call(&inner, params)?;
        Ok(())
    })
}

#[test]
fn test_nested_pipeline_arguments_are_type_checked() -> Result<()> {
    let mismatched = nested_pipeline(builtin::integer(), builtin::gcs_path(Some("csv")));
    let result = Compiler::new().compile(&mismatched);
    assert!(matches!(
        result,
        Err(CompileError::TypeMismatch { ref context, .. }) if context.contains("parameter 'x'")
    ));

    let unchecked = Compiler::with_options(CompilerOptions::default().with_type_check(false));
    unchecked.compile(&mismatched)?;

    Compiler::new().compile(&nested_pipeline(builtin::integer(), builtin::integer()))?;
    Ok(())
}

#[test]
fn test_immediate_argument_of_nested_pipeline_validated_against_schema() -> Result<()> {
    let inner = PipelineFn::new("inner", vec![ParamSpec::new("image").with_type(builtin::gcr_path())], |b, args| {
        b.add(ContainerOp::new("echo", "busybox").args([args[0].to_string()]))?;
        Ok(())
    });
    let pipeline = PipelineFn::new("outer", vec![], move |b, _| {
        let image = b.constant("image", "docker.io/library/busybox")?;
        b.call(&inner, &[image])?;
        Ok(())
    });

    assert!(matches!(
        Compiler::new().compile(&pipeline),
        Err(CompileError::SchemaValidationError { .. })
    ));
    Ok(())
}

// =============================================================================
// Transformer Tests
// =============================================================================

fn sleep_pipeline(with_retry: bool) -> PipelineFn {
    PipelineFn::new("some_pipeline", vec![], move |b, _| {
        for _ in 0..3 {
            b.add(ContainerOp::new("sleep", "busybox").command(["sleep 1"]))?;
        }
        if with_retry {
            b.conf_mut().add_op_transformer(|op| op.set_retry(5));
        }
        Ok(())
    })
}

#[test]
fn test_op_transformers() -> Result<()> {
    let compiler = Compiler::new();
    let workflow = compiler.compile(&sleep_pipeline(true))?;

    let containers: Vec<_> = workflow.spec.templates.iter().filter(|t| t.container.is_some()).collect();
    assert_eq!(containers.len(), 3);
    for template in containers {
        assert_eq!(template.retry_strategy.as_ref().map(|r| r.limit), Some(5));
    }

    // A transformer registered by one pipeline does not leak into the next compile
    let workflow = compiler.compile(&sleep_pipeline(false))?;
    assert!(workflow.spec.templates.iter().all(|t| t.retry_strategy.is_none()));
    Ok(())
}

#[test]
fn test_compile_option_transformers_run_before_pipeline_ones() -> Result<()> {
    let compiler = Compiler::with_options(CompilerOptions::default().with_transformer(|op| op.set_retry(2)));
    let workflow = compiler.compile(&sleep_pipeline(true))?;
    assert_eq!(workflow.template("sleep").unwrap().retry_strategy.as_ref().map(|r| r.limit), Some(5));

    let workflow = compiler.compile(&sleep_pipeline(false))?;
    assert_eq!(workflow.template("sleep").unwrap().retry_strategy.as_ref().map(|r| r.limit), Some(2));
    Ok(())
}

#[test]
fn test_add_pod_env() -> Result<()> {
    let pipeline = PipelineFn::new("add_pod_env", vec![], |b, _| {
        b.add(
            ContainerOp::new("echo", "library/bash")
                .command(["sh", "-c"])
                .args(["echo $KFP_POD_NAME"])
                .add_pod_label(ADD_POD_ENV_LABEL, "true"),
        )?;
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let template = template_json(&workflow, "echo");
    assert_eq!(template["metadata"]["labels"][ADD_POD_ENV_LABEL], "true");
    assert_eq!(
        template["container"]["env"],
        json!([
            {"name": "KFP_POD_NAME", "valueFrom": {"fieldRef": {"fieldPath": "metadata.name"}}},
            {"name": "KFP_NAMESPACE", "valueFrom": {"fieldRef": {"fieldPath": "metadata.namespace"}}}
        ])
    );

    // The builtin transformer is exported for direct use as well
    let op = add_pod_env(ContainerOp::new("x", "busybox").into());
    assert!(op.as_container().unwrap().env.is_empty());
    Ok(())
}

// =============================================================================
// Reference Errors
// =============================================================================

#[test]
fn test_output_key_outside_placeholder_grammar() {
    let pipeline = PipelineFn::new("p", vec![], |b, _| {
        let producer = b.add(ContainerOp::new("a", "busybox").file_output("out.txt", "/tmp/out.txt"))?;
        let out = pipeforge_core::Parameter::output(producer.name.as_str(), "out.txt");
        b.add(ContainerOp::new("b", "busybox").args([format!("cat {}", out)]))?;
        Ok(())
    });
    let result = Compiler::new().compile(&pipeline);
    assert!(matches!(result, Err(CompileError::InvalidPipeline(msg)) if msg.contains("out.txt")));
}

#[test]
fn test_immediate_value_name_collisions() {
    let shadowing = PipelineFn::new("p", vec![ParamSpec::new("msg")], |b, _| {
        let msg = b.constant("msg", "hello")?;
        b.add(ContainerOp::new("echo", "busybox").args([msg.to_string()]))?;
        Ok(())
    });
    assert!(matches!(
        Compiler::new().compile(&shadowing),
        Err(CompileError::NameCollision(_))
    ));

    let redefined = PipelineFn::new("p", vec![], |b, _| {
        let one = b.constant("v", "one")?;
        let two = b.constant("v", "two")?;
        b.add(ContainerOp::new("echo", "busybox").args([one.to_string(), two.to_string()]))?;
        Ok(())
    });
    assert!(matches!(
        Compiler::new().compile(&redefined),
        Err(CompileError::NameCollision(_))
    ));
}

#[test]
fn test_immediate_value_name_is_sanitized() -> Result<()> {
    let pipeline = PipelineFn::new("p", vec![], |b, _| {
        let value = b.constant("My Value", "42")?;
        b.add(ContainerOp::new("echo", "busybox").args([format!("echo {}", value)]))?;
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let echo = template_json(&workflow, "echo");
    assert_eq!(echo["inputs"]["parameters"], json!([{"name": "my-value", "value": "42"}]));
    assert_eq!(echo["container"]["args"], json!(["echo {{inputs.parameters.my-value}}"]));
    Ok(())
}

#[test]
fn test_unresolved_reference() {
    let pipeline = PipelineFn::new("p", vec![], |b, _| {
        let ghost = pipeforge_core::Parameter::new("ghost");
        b.add(ContainerOp::new("echo", "busybox").args([format!("echo {}", ghost)]))?;
        Ok(())
    });
    assert!(matches!(
        Compiler::new().compile(&pipeline),
        Err(CompileError::UnresolvedReference(_))
    ));
}
