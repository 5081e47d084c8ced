use crate::{
    cluster,
    core::{Converter, TriggerRules},
    index::SelectorIndex,
    k8s::{authentication, rbac},
    output::to_yaml,
    Orchestrator,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::{io::Write, path::PathBuf};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[clap(
    name = "authn-migrate",
    version,
    about = "Converts legacy Istio authentication policies to security.istio.io resources"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "istio_authn_migrate=info,warn",
        env = "AUTHN_MIGRATE_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    /// Namespace where the Istio control plane is installed.
    #[clap(long, default_value = "istio-system")]
    istio_namespace: String,

    /// Name of the config map, in the Istio namespace, that holds the mesh configuration.
    #[clap(long, default_value = "istio")]
    mesh_config: String,

    /// Overrides the root namespace configured in the mesh config.
    #[clap(long)]
    root_namespace: Option<String>,

    /// Emits the resources of successfully converted policies even if other policies fail.
    #[clap(long)]
    ignore_errors: bool,

    /// How JWT trigger rules are handled: `approximate` or `reject`.
    #[clap(long, default_value = "approximate")]
    trigger_rules: TriggerRules,

    /// Aborts the run as soon as a policy cannot be decoded.
    #[clap(long)]
    strict_decode: bool,

    /// Writes resources to a file instead of stdout.
    #[clap(long, short = 'o')]
    output: Option<PathBuf>,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            istio_namespace,
            mesh_config,
            root_namespace,
            ignore_errors,
            trigger_rules,
            strict_decode,
            output,
        } = self;

        log_format.try_init(log_level)?;

        let client = client
            .try_client()
            .await
            .context("failed to configure Kubernetes client")?;

        cluster::ensure_namespace(client.clone(), &istio_namespace).await?;
        let root_namespace = match root_namespace {
            Some(ns) => ns,
            None => cluster::root_namespace(client.clone(), &istio_namespace, &mesh_config).await?,
        };
        info!(%root_namespace, %trigger_rules, "Converting legacy authentication policies");

        let selectors = cluster::list_services(client.clone())
            .await?
            .into_iter()
            .collect::<SelectorIndex>();
        info!(services = selectors.len(), "Indexed services");

        let mut policies = Vec::new();
        for resource in [authentication::policies(), authentication::mesh_policies()] {
            policies.extend(cluster::list_dynamic(client.clone(), &resource).await?);
        }
        let mut legacy_rbac = Vec::new();
        for resource in rbac::resources() {
            legacy_rbac.extend(cluster::list_dynamic(client.clone(), &resource).await?);
        }
        if policies.is_empty() {
            warn!("No legacy authentication policies found");
        }

        let converter = Converter::new(root_namespace, trigger_rules);
        let report = Orchestrator::new(converter, selectors, strict_decode)
            .run(policies, legacy_rbac)?
            .finish(ignore_errors);

        if let Some(resources) = report.resources {
            let yaml = to_yaml(resources)?;
            match output {
                Some(path) => std::fs::write(&path, yaml)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout
                        .write_all(yaml.as_bytes())
                        .and_then(|()| stdout.flush())
                        .context("failed to write to stdout")?;
                }
            }
        }

        if report.failed {
            bail!("conversion failed; please fix errors and re-run");
        }
        Ok(())
    }
}
