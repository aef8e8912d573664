//! Basic Pipeline Example
//!
//! This example compiles a two-step pipeline:
//! - A component loaded from its YAML description downloads a file
//! - A plain container step echoes the downloaded text
//!
//! The workflow is printed as YAML.

use pipeforge_sdk::{ContainerOp, OpAttributes, ParamSpec, PipelineFn, PipelineSdk};

const DOWNLOAD_COMPONENT: &str = r#"
name: Download
description: Downloads a file over HTTP
inputs:
- {name: url, type: String}
outputs:
- {name: data}
implementation:
  container:
    image: curlimages/curl:8.5.0
    command: [sh, -c, 'curl -sL "$0" -o "$1"', {inputValue: url}, {outputPath: data}]
"#;

fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    println!("=== Basic Pipeline Example ===\n");

    let sdk = PipelineSdk::default();
    let download = sdk.load_component(DOWNLOAD_COMPONENT)?;
    println!("✓ Loaded component '{}'", download.name);

    let pipeline = PipelineFn::new(
        "download and print",
        vec![ParamSpec::new("url").with_default("https://example.com/index.html")],
        move |b, params| {
            let fetched = b.add(download.instantiate(&[("url", (&params[0]).into())])?)?;
            b.add(
                ContainerOp::new("print", "library/bash:4.4.23")
                    .command(["sh", "-c"])
                    .args([format!("echo {}", fetched.output()?)])
                    .set_display_name("Print the file")
                    .set_retry(2),
            )?;
            Ok(())
        },
    )
    .with_description("Downloads a file and prints it");

    let workflow = sdk.compile(&pipeline)?;
    println!("✓ Compiled into {} templates\n", workflow.spec.templates.len());
    println!("{}", serde_yaml::to_string(&workflow)?);

    Ok(())
}
