//! The `backup` command: capture one instance into an ARM template bundle.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;

use crate::backup::{BackupManager, bundle_path};
use crate::cloud::{ArmClient, CloudOps};
use crate::constants::{ACCESS_TOKEN_ENV, DEFAULT_CHUNK_SIZE, SUBSCRIPTION_ENV};
use crate::core::OpsCloneError;
use crate::utils::Spinner;

/// How much detail the pre-write capture summary shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryMode {
    /// Resource types and counts only.
    Simple,
    /// Types, counts, and every captured resource name.
    Detailed,
}

/// Command to capture an IoT Operations instance as a template bundle.
#[derive(Debug, Args)]
pub struct BackupCommand {
    /// Resource group of the instance.
    #[arg(short = 'g', long)]
    resource_group: String,

    /// Name of the instance to capture.
    #[arg(short = 'n', long)]
    instance: String,

    /// Subscription id (falls back to AZURE_SUBSCRIPTION_ID).
    #[arg(long, env = SUBSCRIPTION_ENV)]
    subscription: Option<String>,

    /// ARM bearer token (falls back to AZURE_ACCESS_TOKEN).
    #[arg(long, env = ACCESS_TOKEN_ENV, hide_env_values = true)]
    access_token: Option<String>,

    /// Re-point existing "aio-" federated credentials at this OIDC issuer.
    /// This mutates the identities in place; it is not part of the template.
    #[arg(long)]
    oidc_issuer: Option<String>,

    /// Directory the bundle is written into (defaults to the current
    /// directory).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Exact output file path; overrides --output-dir and the generated name.
    #[arg(long, conflicts_with = "output_dir")]
    output_file: Option<PathBuf>,

    /// Summary detail shown before writing.
    #[arg(long, value_enum, default_value_t = SummaryMode::Simple)]
    summary: SummaryMode,

    /// Maximum resources per nested deployment batch.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    chunk_size: usize,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long)]
    yes: bool,
}

impl BackupCommand {
    pub async fn execute(self) -> Result<()> {
        let token = self
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(OpsCloneError::MissingAccessToken)?;
        let subscription = self
            .subscription
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(OpsCloneError::MissingSubscription)?;

        let client = ArmClient::new(token, subscription);
        self.run(&client).await
    }

    /// Capture against any [`CloudOps`] implementation. Split from
    /// [`execute`](Self::execute) so tests can inject a mock cloud.
    pub async fn run<C: CloudOps>(&self, cloud: &C) -> Result<()> {
        let bundle = bundle_path(
            &self.instance,
            self.output_dir.as_deref(),
            self.output_file.as_deref(),
        );

        let spinner = Spinner::new("Analyzing cluster...");
        let mut manager = BackupManager::new(
            cloud,
            &self.resource_group,
            &self.instance,
            self.oidc_issuer.clone(),
            self.chunk_size,
        )
        .await?;
        let analysis = manager.analyze().await;
        spinner.finish_and_clear();
        analysis?;

        self.print_summary(&manager, &bundle);

        if !self.confirm()? {
            println!("{}", "Backup cancelled".yellow());
            return Ok(());
        }

        manager.output_template(&bundle)?;
        println!("{} Backup written to {}", "✓".green().bold(), bundle.display());
        Ok(())
    }

    fn print_summary<C: CloudOps>(&self, manager: &BackupManager<'_, C>, bundle: &Path) {
        println!("\n{}", format!("Capture of {}", self.instance).bold());
        println!("  {:<64} {}", "Resource Type".dimmed(), "#".dimmed());
        for (resource_type, names) in manager.enumerate_resources() {
            println!("  {:<64} {}", resource_type, names.len());
            if self.summary == SummaryMode::Detailed {
                for name in names {
                    println!("    {}", name.dimmed());
                }
            }
        }
        println!("\nState will be saved to:\n-> {}\n", bundle.display());
    }

    fn confirm(&self) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }
        print!("Continue with backup? [y/N]: ");
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::cloud::{MockCloud, ResourceCategory};
    use clap::Parser;
    use serde_json::json;
    use tempfile::TempDir;

    fn parse_backup(args: &[&str]) -> BackupCommand {
        let mut full = vec!["opsclone", "backup"];
        full.extend_from_slice(args);
        let cli = Cli::parse_from(full);
        match cli.command {
            crate::cli::Commands::Backup(cmd) => cmd,
        }
    }

    fn capture_cloud() -> MockCloud {
        let sub = "aaaa-bbbb";
        let instance_id = format!(
            "/subscriptions/{sub}/resourceGroups/rg1/providers/Microsoft.IoTOperations/instances/inst1"
        );
        let cl_id = format!(
            "/subscriptions/{sub}/resourceGroups/rg1/providers/Microsoft.ExtendedLocation/customLocations/cl1"
        );
        let cluster_id = format!(
            "/subscriptions/{sub}/resourceGroups/rg1/providers/Microsoft.Kubernetes/connectedClusters/c1"
        );
        MockCloud::default()
            .with_subscription(sub)
            .with_resource(instance_id.clone(), json!({
                "id": instance_id,
                "name": "inst1",
                "type": "microsoft.iotoperations/instances",
                "extendedLocation": { "name": cl_id, "type": "CustomLocation" },
                "properties": { "schemaRegistryRef": { "resourceId": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.DeviceRegistry/schemaRegistries/sr" } }
            }))
            .with_resource(cl_id.clone(), json!({
                "id": cl_id,
                "name": "cl1",
                "properties": { "hostResourceId": cluster_id }
            }))
            .with_extension("microsoft.iotoperations.platform", json!({
                "id": format!("{cluster_id}/providers/Microsoft.KubernetesConfiguration/extensions/plat"),
                "name": "plat",
                "properties": { "extensionType": "microsoft.iotoperations.platform" }
            }))
            .with_extension("microsoft.azure.secretstore", json!({
                "id": format!("{cluster_id}/providers/Microsoft.KubernetesConfiguration/extensions/ssc"),
                "name": "ssc",
                "properties": { "extensionType": "microsoft.azure.secretstore" }
            }))
            .with_extension("microsoft.iotoperations", json!({
                "id": format!("{cluster_id}/providers/Microsoft.KubernetesConfiguration/extensions/aio"),
                "name": "aio",
                "properties": { "extensionType": "microsoft.iotoperations" }
            }))
            .with_collection(ResourceCategory::Broker, vec![json!({
                "id": format!("{}/brokers/default", format!("/subscriptions/{sub}/resourceGroups/rg1/providers/Microsoft.IoTOperations/instances/inst1")),
                "name": "default",
                "type": "microsoft.iotoperations/instances/brokers",
                "properties": {}
            })])
    }

    #[test]
    fn test_parse_defaults() {
        let cmd = parse_backup(&["-g", "rg1", "-n", "inst1"]);
        assert_eq!(cmd.resource_group, "rg1");
        assert_eq!(cmd.instance, "inst1");
        assert_eq!(cmd.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(cmd.summary, SummaryMode::Simple);
        assert!(!cmd.yes);
    }

    #[test]
    fn test_chunk_size_zero_is_rejected() {
        let result =
            Cli::try_parse_from(["opsclone", "backup", "-g", "rg", "-n", "i", "--chunk-size", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_output_file_conflicts_with_output_dir() {
        let result = Cli::try_parse_from([
            "opsclone", "backup", "-g", "rg", "-n", "i",
            "--output-dir", "/tmp", "--output-file", "/tmp/x.json",
        ]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_run_writes_bundle() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("bundle.json");
        let cmd = parse_backup(&[
            "-g", "rg1", "-n", "inst1", "--yes",
            "--output-file", out.to_str().unwrap(),
        ]);
        let cloud = capture_cloud();
        cmd.run(&cloud).await.unwrap();

        let body = std::fs::read_to_string(&out).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(doc["languageVersion"], "2.0");
        assert!(doc["resources"]["instance"].is_object());
        assert!(doc["resources"]["broker"].is_object());
    }

    #[tokio::test]
    async fn test_run_fails_cleanly_on_missing_instance() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("bundle.json");
        let cmd = parse_backup(&[
            "-g", "rg1", "-n", "ghost", "--yes",
            "--output-file", out.to_str().unwrap(),
        ]);
        let cloud = capture_cloud();
        assert!(cmd.run(&cloud).await.is_err());
        assert!(!out.exists(), "no partial bundle may be left behind");
    }
}
