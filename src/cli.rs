use bulkfetch::config::{ByteSize, Config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bulkfetch")]
#[command(about = "Bulk image downloader", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download every valid URL listed in a file
    Run(RunArgs),

    /// Validate a URL list and count accepted tokens without downloading
    Check(CheckArgs),

    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// File with whitespace-separated URLs
    pub file: PathBuf,

    /// Destination directory for downloaded files
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Number of download workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Maximum number of URLs waiting in the queue
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Per-document size ceiling, e.g. 3MiB or 3145728
    #[arg(long)]
    pub max_document_size: Option<ByteSize>,

    /// Verify TLS certificates
    #[arg(long)]
    pub strict_tls: bool,

    /// Configuration file (defaults to config/bulkfetch.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(dest) = &self.dest {
            config.download.dest_dir = dest.clone();
        }
        if let Some(workers) = self.workers {
            config.workers.count = workers;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue.capacity = capacity;
        }
        if let Some(size) = self.max_document_size {
            config.download.max_document_bytes = size;
        }
        if self.strict_tls {
            config.download.accept_invalid_certs = false;
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// File with whitespace-separated URLs
    pub file: PathBuf,

    /// Configuration file (defaults to config/bulkfetch.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Configuration file (defaults to config/bulkfetch.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "bulkfetch",
            "run",
            "urls.txt",
            "--dest",
            "/tmp/out",
            "--workers",
            "8",
            "--max-document-size",
            "1MiB",
            "--strict-tls",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(args.file, PathBuf::from("urls.txt"));
        assert_eq!(config.download.dest_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.workers.count, 8);
        assert_eq!(config.queue.capacity, 5);
        assert_eq!(config.download.max_document_bytes.as_u64(), 1024 * 1024);
        assert!(!config.download.accept_invalid_certs);
    }

    #[test]
    fn test_run_requires_file() {
        assert!(Cli::try_parse_from(["bulkfetch", "run"]).is_err());
    }

    #[test]
    fn test_bad_size_rejected() {
        assert!(
            Cli::try_parse_from(["bulkfetch", "run", "urls.txt", "--max-document-size", "lots"])
                .is_err()
        );
    }
}
