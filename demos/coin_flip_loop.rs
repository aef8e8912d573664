//! Coin Flip Loop Example
//!
//! Flips a coin until it lands on tails:
//! - `do_while` traces the loop body once
//! - the recursive call becomes a task re-entering the loop template
//! - the condition guards the next iteration
//!
//! The packaged workflow is written to `coin_flip.tar.gz` in the temp dir.

use pipeforge_sdk::{Condition, ContainerOp, OpAttributes, ParamSpec, PipelineFn, PipelineSdkBuilder};

fn flip_coin() -> ContainerOp {
    ContainerOp::new("flip", "python:alpine3.6")
        .command(["sh", "-c"])
        .args([
            "python -c \"import random; print('heads' if random.randint(0,1) == 0 else 'tails')\" | tee /tmp/output",
        ])
        .file_output("output", "/tmp/output")
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    println!("=== Coin Flip Loop Example ===\n");

    let flip_until_tails = PipelineFn::do_while(
        "flip_until_tails",
        vec![ParamSpec::new("previous")],
        |b, args| {
            b.add(
                ContainerOp::new("report", "alpine:3.6")
                    .command(["echo"])
                    .args([format!("previous flip: {}", args[0])]),
            )?;
            let coin = b.add(flip_coin())?;
            Ok(vec![coin.output()?])
        },
        |next| Condition::eq(&next[0], "heads"),
    );

    let pipeline = PipelineFn::new("coin flip loop", vec![], move |b, _| {
        let first = b.add(flip_coin())?;
        b.call(&flip_until_tails, &[first.output()?])?;
        Ok(())
    });

    let sdk = PipelineSdkBuilder::new()
        .with_transformer(|op| op.set_timeout(600))
        .build()?;

    let path = std::env::temp_dir().join("coin_flip.tar.gz");
    sdk.compile_to_file(&pipeline, &path)?;
    println!("✓ Wrote {}", path.display());

    let workflow = sdk.compile(&pipeline)?;
    println!("\nTemplates:");
    for template in &workflow.spec.templates {
        let kind = if template.is_dag() { "dag" } else { "step" };
        println!("  - {} ({})", template.name, kind);
    }

    Ok(())
}
