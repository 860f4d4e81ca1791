use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "satchel", author, version, about = "Share encrypted bundles between identities; keep files and directories encrypted at rest")]
pub struct Cli {
    /// Profile name; selects which identity/counterparty store is opened.
    #[arg(long, global = true, default_value = "default")]
    pub profile: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage local identities (key-pairs you hold the secret half of).
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },
    /// Manage counterparties (other people's public keys).
    Counterparty {
        #[command(subcommand)]
        action: CounterpartyAction,
    },
    /// Seal and open bundles addressed to a counterparty.
    Bundle {
        #[command(subcommand)]
        action: BundleAction,
    },
    /// Password-encrypt and decrypt a local file or directory tree.
    Symfile {
        #[command(subcommand)]
        action: SymfileAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum IdentityAction {
    /// Generate a new local identity.
    New { name: String },
    /// List local identities by name.
    List,
    /// Remove a local identity.
    Remove { name: String },
    /// Export a local identity's secret seeds, password-protected.
    Export {
        name: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Import a local identity previously produced by `identity export`.
    Import {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum CounterpartyAction {
    /// Register a counterparty from its base32 public-key tokens.
    Add {
        name: String,
        #[arg(long = "cipher-pub")]
        cipher_pub: String,
        #[arg(long = "signing-pub")]
        signing_pub: String,
    },
    /// List known counterparties.
    List,
    /// Forget a counterparty.
    Remove { name: String },
    /// Export a counterparty record; password-protection is optional.
    Export {
        name: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        password: bool,
    },
    /// Import a counterparty record.
    Import {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum BundleAction {
    /// Seal a bundle addressed from one identity to a counterparty.
    Encrypt {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// A single file to seal. Mutually exclusive with --input-dir.
        #[arg(long)]
        input: Option<PathBuf>,
        /// A directory tree to seal. Mutually exclusive with --input.
        #[arg(long = "input-dir")]
        input_dir: Option<PathBuf>,
        /// Where the body (or the combined stream) is written.
        #[arg(long)]
        output: PathBuf,
        /// Write the sealed header to a separate file instead of prefixing `output`.
        #[arg(long = "header-out")]
        header_out: Option<PathBuf>,
        /// Compress a directory body with zstd before sealing it.
        #[arg(long)]
        compress: bool,
        #[arg(long = "chunk-size", default_value_t = satchel_stream::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
    /// Open a bundle, verifying both the sealed header and sender signature.
    Decrypt {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        input: PathBuf,
        /// Read the sealed header from a separate file instead of `input`'s prefix.
        #[arg(long = "header-in")]
        header_in: Option<PathBuf>,
        /// Write the recovered body to a single file. Mutually exclusive with --output-dir.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Materialise a recovered directory body under this root. Mutually exclusive with --output.
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,
        /// Must match whether `bundle encrypt` was given --compress.
        #[arg(long)]
        compress: bool,
        #[arg(long = "chunk-size", default_value_t = satchel_stream::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum SymfileAction {
    /// Encrypt a file or directory tree with a password.
    Encrypt {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long = "input-dir")]
        input_dir: Option<PathBuf>,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        compress: bool,
        #[arg(long = "chunk-size", default_value_t = satchel_stream::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
    /// Decrypt a symfile previously produced by `symfile encrypt`.
    Decrypt {
        #[arg(long)]
        input: PathBuf,
        /// Destination file (required when the symfile carries a single stream).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Destination directory (required when the symfile carries a packed tree).
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,
        /// Must match whether `symfile encrypt --input-dir` was given --compress.
        #[arg(long)]
        compress: bool,
        #[arg(long = "chunk-size", default_value_t = satchel_stream::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
}
