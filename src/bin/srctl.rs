//! `srctl`: a thin `clap` front end over the core clone/replicate/dangling/
//! split/backup/restore entry points (spec §4.11).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use srctl::{
    backup, clone_registry, report_periodically, restore, resolve_registry, run_replicator,
    scan_dangling, split, BackupConfig, ClonerConfig, DanglingScannerConfig, ReplicationStats,
    ReplicatorConfig, RestoreConfig, SchemaRegistryClient, SchemaRegistryConfig, SchemaType,
    SplitConfig, SrctlConfig,
};

#[derive(Debug, Parser)]
#[command(name = "srctl", about = "Cross-registry replication and control toolkit for Confluent-style Schema Registry")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Named profile from `~/.srctl/srctl.yaml`.
    #[arg(long, global = true)]
    profile: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// One-shot bulk copy of every subject from a source to a target registry.
    Clone {
        #[arg(long)]
        source_url: String,
        #[arg(long)]
        target_url: String,
        #[arg(long)]
        preserve_ids: bool,
        #[arg(long, default_value_t = 10)]
        workers: usize,
    },
    /// Continuously tail a registry's change-log and apply it to a target.
    Replicate {
        #[arg(long)]
        source_url: String,
        #[arg(long)]
        target_url: String,
        #[arg(long)]
        brokers: String,
        #[arg(long)]
        preserve_ids: bool,
        #[arg(long)]
        no_initial_sync: bool,
        #[arg(long)]
        subject_filter: Option<String>,
        #[arg(long)]
        metrics_addr: Option<std::net::SocketAddr>,
    },
    /// Scan a registry for references pointing at deleted or missing subjects/versions.
    Dangling {
        #[arg(long)]
        url: String,
    },
    /// Break a monolithic schema into its constituent named types.
    Split {
        #[command(subcommand)]
        action: SplitAction,
    },
    /// Write every subject in a registry to a local backup directory.
    Backup {
        #[arg(long)]
        url: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        by_id: bool,
        #[arg(long)]
        include_tags: bool,
    },
    /// Restore a backup directory into a registry.
    Restore {
        #[arg(long)]
        url: String,
        #[arg(long)]
        from: PathBuf,
        #[arg(long)]
        preserve_ids: bool,
    },
}

#[derive(Debug, Subcommand)]
enum SplitAction {
    /// Print the extracted types and their registration order.
    Analyze {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum)]
        schema_type: SchemaTypeArg,
        #[arg(long, default_value_t = 0)]
        min_extract_size: usize,
    },
    /// Write the extracted types to a directory as individual files.
    Extract {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum)]
        schema_type: SchemaTypeArg,
        #[arg(long, default_value_t = 0)]
        min_extract_size: usize,
        #[arg(long)]
        out: PathBuf,
    },
    /// Extract and register every type against a registry, in dependency order.
    Register {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum)]
        schema_type: SchemaTypeArg,
        #[arg(long, default_value_t = 0)]
        min_extract_size: usize,
        #[arg(long)]
        subject_prefix: String,
        #[arg(long)]
        url: String,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum SchemaTypeArg {
    Avro,
    Protobuf,
    Json,
}

impl From<SchemaTypeArg> for SchemaType {
    fn from(value: SchemaTypeArg) -> Self {
        match value {
            SchemaTypeArg::Avro => SchemaType::Avro,
            SchemaTypeArg::Protobuf => SchemaType::Protobuf,
            SchemaTypeArg::Json => SchemaType::Json,
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();
}

fn client_for(url: &str) -> anyhow::Result<SchemaRegistryClient> {
    let conf = SchemaRegistryConfig::new().url(url);
    Ok(SchemaRegistryClient::from_conf(conf)?)
}

/// Builds the default change-log consumer group id for a `(source, target)`
/// pair so that replicating the same pair twice resumes the same group,
/// while distinct pairs never collide on offsets.
fn default_replicate_group_id(source_url: &str, target_url: &str) -> String {
    fn slug(url: &str) -> String {
        url.trim_start_matches("https://")
            .trim_start_matches("http://")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect()
    }

    format!("srctl-replicate-{}-{}", slug(source_url), slug(target_url))
}

fn client_from_resolved(resolved: &srctl::ResolvedRegistry) -> anyhow::Result<SchemaRegistryClient> {
    let mut conf = SchemaRegistryConfig::new().url(resolved.url.as_str());

    if let Some(user_info) = &resolved.basic_auth_user_info {
        conf = conf.basic_auth_user_info(user_info);
    }
    if let Some(context) = &resolved.context {
        conf = conf.context(context.as_str());
    }

    Ok(SchemaRegistryClient::from_conf(conf)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = SrctlConfig::load_default().unwrap_or_default();
    let profile = cli.profile.as_deref().and_then(|name| config.profile(name));

    match cli.command {
        Command::Clone {
            source_url,
            target_url,
            preserve_ids,
            workers,
        } => {
            let resolved = resolve_registry(Some(source_url.as_str()), None, profile)?;
            let source = client_from_resolved(&resolved)?;
            let target = client_for(&target_url)?;

            let cloner_config = ClonerConfig {
                worker_pool: srctl::WorkerPoolConfig { concurrency: workers },
                preserve_ids,
                include_compatibility: true,
                clone_tags: true,
            };

            let stats = Arc::new(ReplicationStats::new(0));
            let cancel = CancellationToken::new();

            clone_registry(Arc::new(source), Arc::new(target), cloner_config, cancel, stats.clone()).await?;
            info!(snapshot = ?stats.snapshot(), "clone complete");
        }

        Command::Replicate {
            source_url,
            target_url,
            brokers,
            preserve_ids,
            no_initial_sync,
            subject_filter,
            metrics_addr,
        } => {
            let source = client_for(&source_url)?;
            let target = client_for(&target_url)?;

            let bus_config = srctl::BusConfig::new(brokers.split(',').map(str::to_string).collect())
                .group_id(default_replicate_group_id(&source_url, &target_url));
            let bus = srctl::ChangeLogConsumer::new(&bus_config)?;

            let replicator_config = ReplicatorConfig {
                preserve_ids,
                no_initial_sync,
                subject_filter: subject_filter.map(srctl::SubjectFilter::new),
                cloner: ClonerConfig {
                    preserve_ids,
                    ..ClonerConfig::default()
                },
            };

            let stats = Arc::new(ReplicationStats::new(0));
            let handle = Arc::new(srctl::ReplicatorHandle::default());
            let cancel = CancellationToken::new();

            let mut tasks = tokio::task::JoinSet::new();

            tasks.spawn({
                let stats = stats.clone();
                let cancel = cancel.clone();
                async move {
                    report_periodically(stats, std::time::Duration::from_secs(30), cancel).await;
                }
            });

            if let Some(addr) = metrics_addr {
                if let Ok(registry) = srctl::MetricsRegistry::new(stats.clone(), &source_url, &target_url) {
                    let cancel = cancel.clone();
                    tasks.spawn(async move {
                        let _ = Arc::new(registry).serve(addr, cancel).await;
                    });
                }
            }

            let shutdown = {
                let cancel = cancel.clone();
                async move {
                    let _ = tokio::signal::ctrl_c().await;
                    cancel.cancel();
                }
            };

            tokio::select! {
                result = run_replicator(Arc::new(source), Arc::new(target), bus, replicator_config, cancel.clone(), stats, handle) => {
                    result?;
                }
                _ = shutdown => {
                    info!("shutdown signal received");
                }
            }

            while tasks.join_next().await.is_some() {}
        }

        Command::Dangling { url } => {
            let client = Arc::new(client_for(&url)?);
            let findings = scan_dangling(client, DanglingScannerConfig::default(), CancellationToken::new()).await?;

            for finding in &findings {
                println!(
                    "{}[{}] -> {}[{}]: {:?}",
                    finding.parent_subject,
                    finding.parent_version,
                    finding.referenced_subject,
                    finding.referenced_version,
                    finding.reason
                );
            }

            if findings.is_empty() {
                println!("no dangling references found");
            }
        }

        Command::Split { action } => run_split(action).await?,

        Command::Backup {
            url,
            out,
            by_id,
            include_tags,
        } => {
            let client = client_for(&url)?;
            let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();

            let backup_config = BackupConfig {
                by_id,
                include_global_config: true,
                include_global_mode: true,
                include_tags,
                include_id_mappings: by_id,
            };

            let dir = backup(&client, &out, &timestamp, backup_config).await?;
            println!("backup written to {}", dir.display());
        }

        Command::Restore { url, from, preserve_ids } => {
            let client = client_for(&url)?;
            restore(&client, &from, RestoreConfig { preserve_ids }).await?;
            println!("restore from {} complete", from.display());
        }
    }

    Ok(())
}

async fn run_split(action: SplitAction) -> anyhow::Result<()> {
    match action {
        SplitAction::Analyze {
            file,
            schema_type,
            min_extract_size,
        } => {
            let body = std::fs::read_to_string(&file)?;
            let config = SplitConfig {
                min_extract_size,
                subject_prefix: String::new(),
            };
            let result = split(schema_type.into(), &body, &config)?;

            for extracted in &result.types {
                println!(
                    "{:>3}. {} (subject={}, size={}, root={}, refs={:?})",
                    extracted.order,
                    extracted.qualified_name,
                    extracted.subject,
                    extracted.size,
                    extracted.is_root,
                    extracted.references
                );
            }
        }

        SplitAction::Extract {
            file,
            schema_type,
            min_extract_size,
            out,
        } => {
            let body = std::fs::read_to_string(&file)?;
            let config = SplitConfig {
                min_extract_size,
                subject_prefix: String::new(),
            };
            let result = split(schema_type.into(), &body, &config)?;

            std::fs::create_dir_all(&out)?;
            for extracted in &result.types {
                let path = out.join(format!("{}.schema", extracted.qualified_name));
                std::fs::write(&path, &extracted.body)?;
            }

            println!("wrote {} types to {}", result.types.len(), out.display());
        }

        SplitAction::Register {
            file,
            schema_type,
            min_extract_size,
            subject_prefix,
            url,
        } => {
            let body = std::fs::read_to_string(&file)?;
            let config = SplitConfig {
                min_extract_size,
                subject_prefix,
            };
            let result = split(schema_type.into(), &body, &config)?;
            let client = client_for(&url)?;

            let mut registered_version: HashMap<&str, u32> = HashMap::new();
            let mut subject_by_name: HashMap<&str, &str> = HashMap::new();
            for extracted in &result.types {
                subject_by_name.insert(extracted.qualified_name.as_str(), extracted.subject.as_str());
            }

            for extracted in &result.types {
                let references = extracted
                    .references
                    .iter()
                    .filter_map(|name| {
                        let subject = subject_by_name.get(name.as_str())?;
                        let version = registered_version.get(name.as_str()).copied().unwrap_or(1);
                        Some(srctl::Reference::new(name, subject).version(version))
                    })
                    .collect::<Vec<_>>();

                let schema = srctl::UnregisteredSchema::schema(extracted.body.clone())
                    .schema_type(extracted.schema_type)
                    .references(references);

                let id = srctl::SchemaRegistryAPI::register_schema(&client, &extracted.subject, &schema).await?;

                let version = srctl::SchemaRegistryAPI::lookup_subject_schema(&client, &extracted.subject, &schema)
                    .await
                    .map(|subject| subject.version)
                    .unwrap_or(1);
                registered_version.insert(extracted.qualified_name.as_str(), version);

                println!(
                    "registered {} as {} v{} (id {})",
                    extracted.qualified_name, extracted.subject, version, id
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_replicate_group_id_strips_scheme_and_joins_hosts() {
        let group_id =
            default_replicate_group_id("https://source.internal:8081", "http://target.internal:8081");

        assert_eq!(group_id, "srctl-replicate-source-internal-8081-target-internal-8081");
    }
}
