//! Volume Pipeline Example
//!
//! Creates a persistent volume claim and shares it between two steps.
//! Workflow-level settings come from the pipeline configuration:
//! image pull secrets, a deadline and an artifact bucket.

use pipeforge_core::ops::{EnvVar, Toleration};
use pipeforge_core::VolumeOp;
use pipeforge_sdk::{ArtifactLocation, ContainerOp, OpAttributes, ParamSpec, PipelineFn, PipelineSdk, SdkConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    println!("=== Volume Pipeline Example ===\n");

    let pipeline = PipelineFn::new(
        "volume pipeline",
        vec![ParamSpec::new("size").with_default("1Gi")],
        |b, params| {
            let claim = b.add(VolumeOp::new("create-pvc", "shared-data", params[0].to_string()).build())?;

            let writer = b.add(
                ContainerOp::new("write", "library/bash:4.4.23")
                    .command(["sh", "-c"])
                    .args(["echo hello > /data/file"])
                    .add_pvolume("/data", &claim)?
                    .add_env_variable(EnvVar::from_secret("TOKEN", "api-token", "token")),
            )?;

            b.add(
                ContainerOp::new("read", "library/bash:4.4.23")
                    .command(["cat", "/data/file"])
                    .add_pvolume("/data", &claim)?
                    .add_toleration(Toleration::new("dedicated", "Equal", "batch", "NoSchedule"))
                    .after(&writer),
            )?;

            let conf = b.conf_mut();
            conf.set_image_pull_secrets(["registry-credentials"]);
            conf.set_timeout(3600);
            conf.set_ttl_seconds_after_finished(86400);
            Ok(())
        },
    );

    let sdk = PipelineSdk::new(
        SdkConfig::new()
            .with_artifact_location(ArtifactLocation::s3("mlpipeline", "minio-service.kubeflow:9000").insecure()),
    );

    let path = std::env::temp_dir().join("volume_pipeline.yaml");
    sdk.compile_to_file(&pipeline, &path)?;
    println!("✓ Wrote {}", path.display());

    Ok(())
}
