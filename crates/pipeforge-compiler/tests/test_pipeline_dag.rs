//! DAG lowering tests
//!
//! Conditions, nested pipelines, recursion and workflow-level settings,
//! checked on the compiled workflow.

use anyhow::Result;
use pipeforge_compiler::{CompileError, Compiler, CompilerOptions, PipelineFn};
use pipeforge_core::manifest::ParameterDecl;
use pipeforge_core::ops::Volume;
use pipeforge_core::{
    ArtifactLocation, Condition, ContainerOp, OpAttributes, ParamSpec, Parameter, Template, VolumeOp, Workflow,
};
use serde_json::json;

fn flip(name: &str) -> ContainerOp {
    ContainerOp::new(name, "python:alpine3.6")
        .command(["sh", "-c"])
        .args(["python -c \"import random; print('heads' if random.randint(0,1) == 0 else 'tails')\" | tee /tmp/output"])
        .file_output("output", "/tmp/output")
}

fn print(msg: &Parameter) -> ContainerOp {
    ContainerOp::new("print", "alpine:3.6")
        .command(["echo"])
        .args([msg.to_string()])
}

fn template<'a>(workflow: &'a Workflow, name: &str) -> &'a Template {
    workflow
        .template(name)
        .unwrap_or_else(|| panic!("missing template {}", name))
}

fn template_names(workflow: &Workflow) -> Vec<&str> {
    workflow.spec.templates.iter().map(|t| t.name.as_str()).collect()
}

fn arguments(template: &Template, task: &str) -> Vec<ParameterDecl> {
    template
        .task(task)
        .and_then(|t| t.arguments.as_ref())
        .map(|a| a.parameters.clone())
        .unwrap_or_default()
}

// =============================================================================
// Conditions
// =============================================================================

fn coin_flip_pipeline() -> PipelineFn {
    PipelineFn::new("pipeline flip coin", vec![], |b, _| {
        let coin = b.add(flip("flip"))?;
        let output = coin.output()?;
        b.condition(Condition::eq(&output, "heads"), |b| {
            b.add(print(&output))?;
            Ok(())
        })?;
        Ok(())
    })
}

#[test]
fn test_condition_template() -> Result<()> {
    let workflow = Compiler::new().compile(&coin_flip_pipeline())?;

    assert_eq!(workflow.spec.entrypoint, "pipeline-flip-coin");
    assert_eq!(workflow.metadata.generate_name, "pipeline-flip-coin-");
    assert_eq!(template_names(&workflow), vec!["condition-1", "flip", "pipeline-flip-coin", "print"]);

    let root = template(&workflow, "pipeline-flip-coin");
    let task = root.task("condition-1").unwrap();
    assert_eq!(task.template, "condition-1");
    assert_eq!(task.when.as_deref(), Some("{{tasks.flip.outputs.parameters.flip-output}} == heads"));
    assert_eq!(task.dependencies, vec!["flip"]);

    let condition = template(&workflow, "condition-1");
    assert_eq!(condition.input_names(), vec!["flip-output"]);
    assert_eq!(
        arguments(condition, "print"),
        vec![ParameterDecl::with_value("flip-output", "{{inputs.parameters.flip-output}}")]
    );
    assert_eq!(
        template(&workflow, "print").container.as_ref().unwrap().args,
        vec!["{{inputs.parameters.flip-output}}"]
    );
    Ok(())
}

#[test]
fn test_nested_conditions() -> Result<()> {
    let pipeline = PipelineFn::new("nested", vec![], |b, _| {
        let coin = b.add(flip("flip"))?;
        let output = coin.output()?;
        b.condition(Condition::eq(&output, "heads"), |b| {
            let again = b.add(flip("flip-again"))?;
            let again_output = again.output()?;
            b.condition(Condition::eq(&again_output, "tails"), |b| {
                b.add(print(&output))?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let outer = template(&workflow, "condition-1");
    assert_eq!(outer.input_names(), vec!["flip-output"]);
    let inner_task = outer.task("condition-2").unwrap();
    assert_eq!(
        inner_task.when.as_deref(),
        Some("{{tasks.flip-again.outputs.parameters.flip-again-output}} == tails")
    );
    assert_eq!(inner_task.dependencies, vec!["flip-again"]);

    let inner = template(&workflow, "condition-2");
    assert_eq!(inner.input_names(), vec!["flip-again-output", "flip-output"]);
    Ok(())
}

#[test]
fn test_condition_without_steps() -> Result<()> {
    let pipeline = PipelineFn::new("empty condition", vec![], |b, _| {
        let coin = b.add(flip("flip"))?;
        b.condition(Condition::eq(coin.output()?, "heads"), |_| Ok(()))?;
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let root = template(&workflow, "empty-condition");
    let task = root.task("condition-1").unwrap();
    assert_eq!(task.when.as_deref(), Some("{{tasks.flip.outputs.parameters.flip-output}} == heads"));
    assert_eq!(task.dependencies, vec!["flip"]);
    assert_eq!(
        arguments(root, "condition-1"),
        vec![ParameterDecl::with_value(
            "flip-output",
            "{{tasks.flip.outputs.parameters.flip-output}}"
        )]
    );
    assert_eq!(template(&workflow, "condition-1").input_names(), vec!["flip-output"]);
    assert!(root.inputs.is_none());
    Ok(())
}

#[test]
fn test_output_leaves_condition() -> Result<()> {
    let pipeline = PipelineFn::new("outputs", vec![], |b, _| {
        let coin = b.add(flip("flip"))?;
        let mut inner = None;
        b.condition(Condition::eq(coin.output()?, "heads"), |b| {
            let again = b.add(flip("flip-again"))?;
            inner = Some(again.output()?);
            Ok(())
        })?;
        if let Some(inner) = inner {
            b.add(print(&inner))?;
        }
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let condition = template(&workflow, "condition-1");
    let outputs = serde_json::to_value(condition.outputs.as_ref().unwrap())?;
    assert_eq!(
        outputs,
        json!({"parameters": [{
            "name": "flip-again-output",
            "valueFrom": {"parameter": "{{tasks.flip-again.outputs.parameters.flip-again-output}}"}
        }]})
    );

    let root = template(&workflow, "outputs");
    assert_eq!(root.task("print").unwrap().dependencies, vec!["condition-1"]);
    assert_eq!(
        arguments(root, "print"),
        vec![ParameterDecl::with_value(
            "flip-again-output",
            "{{tasks.condition-1.outputs.parameters.flip-again-output}}"
        )]
    );
    Ok(())
}

// =============================================================================
// Nested Pipelines and Recursion
// =============================================================================

fn recursive_pipeline(looped: PipelineFn) -> PipelineFn {
    PipelineFn::new("recursive", vec![], move |b, _| {
        let coin = b.add(flip("flip"))?;
        b.call(&looped, &[coin.output()?])?;
        Ok(())
    })
}

#[test]
fn test_recursive_do_while() -> Result<()> {
    let looped = PipelineFn::do_while(
        "flip_component",
        vec![ParamSpec::new("flip_result")],
        |b, args| {
            let printed = b.add(print(&args[0]))?;
            let coin = b.add(flip("flip").after(&printed))?;
            Ok(vec![coin.output()?])
        },
        |next| Condition::eq(&next[0], "heads"),
    );
    let workflow = Compiler::new().compile(&recursive_pipeline(looped))?;

    assert_eq!(
        template_names(&workflow),
        vec!["condition-2", "flip", "flip-2", "graph-flip-component-1", "print", "recursive"]
    );

    let root = template(&workflow, "recursive");
    let call = root.task("graph-flip-component-1").unwrap();
    assert_eq!(call.dependencies, vec!["flip"]);
    assert_eq!(
        arguments(root, "graph-flip-component-1"),
        vec![ParameterDecl::with_value("flip-output", "{{tasks.flip.outputs.parameters.flip-output}}")]
    );

    let body = template(&workflow, "graph-flip-component-1");
    assert_eq!(body.input_names(), vec!["flip-output"]);
    assert_eq!(body.task("flip-2").unwrap().dependencies, vec!["print"]);
    let condition = body.task("condition-2").unwrap();
    assert_eq!(
        condition.when.as_deref(),
        Some("{{tasks.flip-2.outputs.parameters.flip-2-output}} == heads")
    );
    assert_eq!(condition.dependencies, vec!["flip-2"]);

    // The recursive call re-enters the loop template under the loop's parameter names
    let recursion = template(&workflow, "condition-2");
    let task = recursion.task("graph-flip-component-1").unwrap();
    assert_eq!(task.template, "graph-flip-component-1");
    assert!(task.dependencies.is_empty());
    assert_eq!(
        arguments(recursion, "graph-flip-component-1"),
        vec![ParameterDecl::with_value("flip-output", "{{inputs.parameters.flip-2-output}}")]
    );
    Ok(())
}

#[test]
fn test_recursive_while() -> Result<()> {
    let looped = PipelineFn::while_loop(
        "flip_component",
        vec![ParamSpec::new("flip_result")],
        |args| Condition::eq(&args[0], "heads"),
        |b, _| {
            let coin = b.add(flip("flip"))?;
            Ok(vec![coin.output()?])
        },
    );
    let workflow = Compiler::new().compile(&recursive_pipeline(looped))?;

    let body = template(&workflow, "graph-flip-component-1");
    let condition = body.task("condition-2").unwrap();
    assert_eq!(condition.when.as_deref(), Some("{{inputs.parameters.flip-output}} == heads"));
    assert!(condition.dependencies.is_empty());

    let recursion = template(&workflow, "condition-2");
    let task = recursion.task("graph-flip-component-1").unwrap();
    assert_eq!(task.dependencies, vec!["flip-2"]);
    assert_eq!(
        arguments(recursion, "graph-flip-component-1"),
        vec![ParameterDecl::with_value(
            "flip-output",
            "{{tasks.flip-2.outputs.parameters.flip-2-output}}"
        )]
    );
    Ok(())
}

#[test]
fn test_nested_pipeline_receives_pipeline_parameter() -> Result<()> {
    let inner = PipelineFn::new("echo_twice", vec![ParamSpec::new("text")], |b, args| {
        b.add(print(&args[0]))?;
        Ok(())
    });
    let pipeline = PipelineFn::new("outer", vec![ParamSpec::new("msg").with_default("hello")], move |b, params| {
        b.call(&inner, &params[..1])?;
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let root = template(&workflow, "outer");
    assert_eq!(root.input_names(), vec!["msg"]);
    assert_eq!(
        arguments(root, "graph-echo-twice-1"),
        vec![ParameterDecl::with_value("msg", "{{inputs.parameters.msg}}")]
    );
    assert_eq!(
        template(&workflow, "print").container.as_ref().unwrap().args,
        vec!["{{inputs.parameters.msg}}"]
    );
    Ok(())
}

// =============================================================================
// Dependencies and Determinism
// =============================================================================

#[test]
fn test_after_and_data_edges_appear_once() -> Result<()> {
    let pipeline = PipelineFn::new("edges", vec![], |b, _| {
        let producer = b.add(
            ContainerOp::new("produce", "busybox")
                .file_output("a", "/tmp/a")
                .file_output("b", "/tmp/b"),
        )?;
        b.add(
            ContainerOp::new("consume", "busybox")
                .args([producer.output_named("a")?.to_string(), producer.output_named("b")?.to_string()])
                .after(&producer),
        )?;
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let root = template(&workflow, "edges");
    assert_eq!(root.task("consume").unwrap().dependencies, vec!["produce"]);
    assert_eq!(template(&workflow, "consume").input_names(), vec!["produce-a", "produce-b"]);
    Ok(())
}

#[test]
fn test_after_between_same_named_components() -> Result<()> {
    let pipeline = PipelineFn::new("some_pipeline", vec![], |b, _| {
        let first = b.add(ContainerOp::new("Some component name", "busybox"))?;
        b.add(ContainerOp::new("Some component name", "busybox").after(&first))?;
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let root = template(&workflow, "some-pipeline");
    assert!(root.task("some-component-name").unwrap().dependencies.is_empty());
    assert_eq!(
        root.task("some-component-name-2").unwrap().dependencies,
        vec!["some-component-name"]
    );
    Ok(())
}

#[test]
fn test_compilation_is_deterministic() -> Result<()> {
    let looped = PipelineFn::do_while(
        "flip_component",
        vec![ParamSpec::new("flip_result")],
        |b, _| {
            let coin = b.add(flip("flip"))?;
            Ok(vec![coin.output()?])
        },
        |next| Condition::eq(&next[0], "heads"),
    );
    let pipeline = recursive_pipeline(looped);

    let compiler = Compiler::new();
    let first = compiler.compile_to_yaml(&pipeline)?;
    let second = compiler.compile_to_yaml(&pipeline)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_self_dependency_is_rejected() {
    let pipeline = PipelineFn::new("p", vec![], |b, _| {
        let own = Parameter::output("echo", "out");
        b.add(ContainerOp::new("echo", "busybox").args([own.to_string()]).file_output("out", "/tmp/out"))?;
        Ok(())
    });
    assert!(matches!(
        Compiler::new().compile(&pipeline),
        Err(CompileError::InvalidPipeline(_))
    ));
}

// =============================================================================
// Workflow Settings
// =============================================================================

#[test]
fn test_volume_op_and_pvolume() -> Result<()> {
    let pipeline = PipelineFn::new("volumeop", vec![ParamSpec::new("size").with_default("1Gi")], |b, params| {
        let claim = b.add(VolumeOp::new("create-pvc", "my-pvc", params[0].to_string()).build())?;
        b.add(
            ContainerOp::new("cop", "library/bash:4.4.23")
                .command(["sh", "-c"])
                .args(["echo foo > /mnt/file1"])
                .add_pvolume("/mnt", &claim)?
                .add_volume(Volume::empty_dir("scratch")),
        )?;
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let create = template(&workflow, "create-pvc");
    assert_eq!(create.input_names(), vec!["size"]);
    let manifest = &create.resource.as_ref().unwrap().manifest;
    assert!(manifest.contains("name: '{{workflow.name}}-my-pvc'"));
    assert!(manifest.contains("storage: '{{inputs.parameters.size}}'"));

    let cop = template(&workflow, "cop");
    assert_eq!(cop.input_names(), vec!["create-pvc-name"]);
    assert_eq!(
        serde_json::to_value(&cop.volumes)?,
        json!([
            {"name": "create-pvc", "persistentVolumeClaim": {"claimName": "{{inputs.parameters.create-pvc-name}}"}},
            {"name": "scratch", "emptyDir": {}}
        ])
    );
    assert_eq!(template(&workflow, "volumeop").task("cop").unwrap().dependencies, vec!["create-pvc"]);

    // Only volumes without parameter references are lifted to the workflow
    assert_eq!(serde_json::to_value(&workflow.spec.volumes)?, json!([{"name": "scratch", "emptyDir": {}}]));
    Ok(())
}

#[test]
fn test_pipeline_conf_settings() -> Result<()> {
    let pipeline = PipelineFn::new("settings", vec![], |b, _| {
        b.add(ContainerOp::new("echo", "busybox").set_timeout(50))?;
        let conf = b.conf_mut();
        conf.set_image_pull_secrets(["secretA"]);
        conf.set_timeout(100);
        conf.set_ttl_seconds_after_finished(86400);
        conf.set_artifact_location(ArtifactLocation::s3("foobar", "minio-service:9000").insecure());
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let spec = serde_json::to_value(&workflow.spec)?;
    assert_eq!(spec["imagePullSecrets"], json!([{"name": "secretA"}]));
    assert_eq!(spec["activeDeadlineSeconds"], 100);
    assert_eq!(spec["ttlSecondsAfterFinished"], 86400);
    assert_eq!(spec["serviceAccountName"], "pipeline-runner");

    let echo = template(&workflow, "echo");
    assert_eq!(echo.active_deadline_seconds, Some(50));
    let artifacts = serde_json::to_value(&echo.outputs.as_ref().unwrap().artifacts)?;
    assert_eq!(artifacts[0]["s3"]["bucket"], "foobar");
    assert_eq!(artifacts[0]["s3"]["endpoint"], "minio-service:9000");
    assert_eq!(artifacts[0]["s3"]["insecure"], true);
    assert_eq!(
        artifacts[0]["s3"]["key"],
        "runs/{{workflow.uid}}/{{pod.name}}/mlpipeline-ui-metadata.tgz"
    );
    Ok(())
}

#[test]
fn test_default_values_and_overrides() -> Result<()> {
    let pipeline = PipelineFn::new(
        "defaults",
        vec![ParamSpec::new("url").with_default("gs://bucket/file"), ParamSpec::new("count")],
        |b, params| {
            b.add(ContainerOp::new("download", "busybox").args([params[0].to_string(), params[1].to_string()]))?;
            Ok(())
        },
    );

    let workflow = Compiler::new().compile(&pipeline)?;
    assert_eq!(
        workflow.spec.arguments.parameters,
        vec![ParameterDecl::with_value("url", "gs://bucket/file"), ParameterDecl::named("count")]
    );

    let compiler = Compiler::with_options(CompilerOptions::default().with_argument("count", "3"));
    let workflow = compiler.compile(&pipeline)?;
    assert_eq!(
        workflow.spec.arguments.parameters,
        vec![ParameterDecl::with_value("url", "gs://bucket/file"), ParameterDecl::with_value("count", "3")]
    );
    Ok(())
}

#[test]
fn test_immediate_value_in_condition() -> Result<()> {
    let pipeline = PipelineFn::new("immediate", vec![], |b, _| {
        let threshold = b.constant("threshold", "5")?;
        b.condition(Condition::gt(&threshold, 3i64), |b| {
            b.add(print(&threshold))?;
            Ok(())
        })?;
        Ok(())
    });
    let workflow = Compiler::new().compile(&pipeline)?;

    let root = template(&workflow, "immediate");
    assert_eq!(root.task("condition-1").unwrap().when.as_deref(), Some("5 > 3"));
    assert!(workflow.spec.arguments.parameters.is_empty());

    let print = serde_json::to_value(template(&workflow, "print").inputs.as_ref().unwrap())?;
    assert_eq!(print, json!({"parameters": [{"name": "threshold", "value": "5"}]}));
    Ok(())
}

#[test]
fn test_pipeline_spec_annotation() -> Result<()> {
    let pipeline = PipelineFn::new("annotated", vec![ParamSpec::new("msg").with_default("hi")], |b, params| {
        b.add(print(&params[0]))?;
        Ok(())
    })
    .with_description("Prints a message");
    let workflow = Compiler::new().compile(&pipeline)?;

    let annotation = &workflow.metadata.annotations["pipelines.kubeflow.org/pipeline_spec"];
    let spec: serde_json::Value = serde_json::from_str(annotation)?;
    assert_eq!(
        spec,
        json!({
            "name": "annotated",
            "description": "Prints a message",
            "inputs": [{"name": "msg", "default": "hi"}]
        })
    );
    Ok(())
}
