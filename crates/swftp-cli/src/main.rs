//! swftp command-line shell.
//!
//! Drives the Swift virtual filesystem the same way an FTP or SFTP engine
//! would, one command per invocation.
//!
//! Usage:
//!   # Against a Swift cluster (v1.0 auth)
//!   swftp --user test:tester --key testing ls /
//!   swftp -u test:tester -k testing put ./report.pdf /docs/report.pdf
//!   swftp -u test:tester -k testing get /docs/report.pdf ./copy.pdf
//!
//!   # Against an ephemeral in-process store
//!   swftp --memory mkdir /scratch
//!
//! Config is read from `--config`, `/etc/swift/swftp.ron` or `~/.swftp.ron`.
//! Set `RUST_LOG=swftp_vfs=debug` to trace backend calls.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use swftp_vfs::backend::{HttpPool, MemoryStore, ObjectStore, authenticate_v1};
use swftp_vfs::diagnostics::RuntimeDiagnostics;
use swftp_vfs::shell::{ListingRow, SwiftShell};
use swftp_vfs::transfer::TransferState;
use swftp_vfs::vfs::FieldName;
use swftp_vfs::{SwftpConfig, WriterConsumer};

/// Fields shown by `ls` and `stat` unless others are requested.
const DEFAULT_FIELDS: &str = "permissions,hardlinks,owner,group,size,modified";

/// Shell over Swift object storage.
#[derive(Parser, Debug)]
#[command(name = "swftp")]
#[command(about = "File operations on OpenStack Swift through the swftp virtual filesystem")]
struct Args {
    /// Config file (RON)
    #[arg(short, long)]
    config: Option<String>,

    /// v1.0 auth endpoint, overriding the config file
    #[arg(long, env = "SWFTP_AUTH_URL")]
    auth_url: Option<String>,

    /// Swift user (account:user)
    #[arg(short, long, env = "SWFTP_USER")]
    user: Option<String>,

    /// Swift key
    #[arg(short, long, env = "SWFTP_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Use an empty in-process store instead of a cluster
    #[arg(long)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
        /// List every descendant
        #[arg(short = 'R', long)]
        recursive: bool,
        /// Comma-separated fields
        #[arg(short, long, value_delimiter = ',', default_value = DEFAULT_FIELDS)]
        fields: Vec<String>,
    },
    /// Show attributes of one path
    Stat {
        path: String,
        /// Comma-separated fields
        #[arg(short, long, value_delimiter = ',', default_value = DEFAULT_FIELDS)]
        fields: Vec<String>,
    },
    /// Create a directory (or a container at depth one)
    Mkdir { path: String },
    /// Remove an empty directory
    Rmdir { path: String },
    /// Remove a file
    Rm { path: String },
    /// Rename a file (copy then delete, not atomic)
    Mv { from: String, to: String },
    /// Download a file to a local path, or stdout
    Get {
        path: String,
        local: Option<String>,
    },
    /// Upload a local file
    Put { local: String, path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let explicit = args.config.as_deref().map(expand);
    let (mut config, used) = SwftpConfig::load(explicit.as_deref())
        .with_context(|| format!("loading config {:?}", explicit))?;
    if let Some(path) = &used {
        tracing::debug!(path = %path.display(), "using config");
    }
    if let Some(auth_url) = &args.auth_url {
        config.auth_url = auth_url.clone();
    }

    let shutdown = CancellationToken::new();
    #[cfg(unix)]
    let _diagnostics = swftp_vfs::diagnostics::spawn_signal_listener(
        Arc::new(RuntimeDiagnostics::new()),
        shutdown.clone(),
    );

    let store = connect(&args, &config).await?;
    let shell = SwiftShell::new(store, config.fs_options(), config.policy);
    let result = run(&shell, args.command).await;
    shutdown.cancel();
    result
}

fn expand(path: &str) -> PathBuf {
    shellexpand::tilde(path).as_ref().into()
}

async fn connect(args: &Args, config: &SwftpConfig) -> Result<Arc<dyn ObjectStore>> {
    if args.memory {
        tracing::info!("using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let user = args
        .user
        .as_deref()
        .context("--user is required unless --memory is given")?;
    let key = args
        .key
        .as_deref()
        .context("--key is required unless --memory is given")?;

    let pool = HttpPool::new(config.pool_config()).context("building HTTP pool")?;
    let client = authenticate_v1(&pool, &config.auth_url, user, key)
        .await
        .with_context(|| format!("authenticating against {}", config.auth_url))?;
    Ok(Arc::new(client))
}

async fn run(shell: &SwiftShell, command: Command) -> Result<()> {
    match command {
        Command::Ls {
            path,
            recursive,
            fields,
        } => {
            let fields = FieldName::parse_all(&fields);
            let rows = if recursive {
                shell.list_recursive(&[&path], &fields).await
            } else {
                shell.list(&[&path], &fields).await
            }
            .with_context(|| format!("listing {}", path))?;
            print_rows(&rows);
        }
        Command::Stat { path, fields } => {
            let fields = FieldName::parse_all(&fields);
            let values = shell
                .stat(&[&path], &fields)
                .await
                .with_context(|| format!("stat {}", path))?;
            print_rows(&[(path, values)]);
        }
        Command::Mkdir { path } => shell
            .make_directory(&[&path])
            .await
            .with_context(|| format!("mkdir {}", path))?,
        Command::Rmdir { path } => shell
            .remove_directory(&[&path])
            .await
            .with_context(|| format!("rmdir {}", path))?,
        Command::Rm { path } => shell
            .remove_file(&[&path])
            .await
            .with_context(|| format!("rm {}", path))?,
        Command::Mv { from, to } => shell
            .rename(&[&from], &[&to])
            .await
            .with_context(|| format!("mv {} {}", from, to))?,
        Command::Get { path, local } => get(shell, &path, local.as_deref()).await?,
        Command::Put { local, path } => put(shell, &local, &path).await?,
    }
    Ok(())
}

async fn get(shell: &SwiftShell, path: &str, local: Option<&str>) -> Result<()> {
    let file = shell
        .open_for_reading(&[path])
        .await
        .with_context(|| format!("opening {}", path))?;

    let bytes = match local {
        None | Some("-") => file.send(WriterConsumer::new(tokio::io::stdout())).await,
        Some(local) => {
            let target = expand(local);
            let out = tokio::fs::File::create(&target)
                .await
                .with_context(|| format!("creating {}", target.display()))?;
            file.send(WriterConsumer::new(out)).await
        }
    }
    .with_context(|| format!("downloading {}", path))?;

    tracing::info!(path, bytes, "downloaded");
    Ok(())
}

async fn put(shell: &SwiftShell, local: &str, path: &str) -> Result<()> {
    let source = expand(local);
    let mut input = tokio::fs::File::open(&source)
        .await
        .with_context(|| format!("opening {}", source.display()))?;
    let mut file = shell
        .open_for_writing(&[path])
        .await
        .with_context(|| format!("opening {} for writing", path))?;

    let sink = file.receive().with_context(|| format!("starting upload of {}", path))?;
    if let Err(e) = tokio::io::copy(&mut input, sink).await {
        // A rejected PUT closes the sink; its cause is more useful than the pipe error.
        if let TransferState::Failed(cause) = sink.completion().state() {
            bail!("uploading {}: {}", path, cause);
        }
        return Err(e).with_context(|| format!("uploading {}", path));
    }

    let bytes = file
        .close()
        .await
        .with_context(|| format!("committing {}", path))?;
    tracing::info!(path, bytes, "uploaded");
    Ok(())
}

fn print_rows(rows: &[ListingRow]) {
    for (name, values) in rows {
        let columns: Vec<String> = values.iter().map(ToString::to_string).collect();
        println!("{}\t{}", columns.join("\t"), name);
    }
}
