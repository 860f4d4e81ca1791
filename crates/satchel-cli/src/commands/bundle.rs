use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};

use satchel_core::bundle::{self, EncodeRequest, InputSource};
use satchel_core::env::Environment;
use satchel_core::multidir;

use crate::atomic;
use crate::cli::BundleAction;

pub fn run(action: BundleAction, env: &Environment) -> Result<()> {
    match action {
        BundleAction::Encrypt { from, to, input, input_dir, output, header_out, compress, chunk_size } => {
            encrypt(env, &from, &to, input, input_dir, &output, header_out, compress, chunk_size)
        }
        BundleAction::Decrypt { from, to, input, header_in, output, output_dir, compress, chunk_size } => {
            decrypt(env, &from, &to, &input, header_in, output, output_dir, compress, chunk_size)
        }
    }
}

fn mtime_rfc3339(path: &std::path::Path) -> Result<String> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified).to_rfc3339())
}

#[allow(clippy::too_many_arguments)]
fn encrypt(
    env: &Environment,
    from: &str,
    to: &str,
    input: Option<PathBuf>,
    input_dir: Option<PathBuf>,
    output: &PathBuf,
    header_out: Option<PathBuf>,
    compress: bool,
    chunk_size: usize,
) -> Result<()> {
    let receiver = env.counterparty_store.get(to)?;
    tracing::debug!(from, to, chunk_size, "encrypting bundle");

    let (input_source, original_file_name, original_file_date, reader): (InputSource, Option<String>, Option<String>, Box<dyn Read>) =
        match (input, input_dir) {
            (Some(_), Some(_)) => bail!("--input and --input-dir are mutually exclusive"),
            (Some(path), None) => {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                let date = mtime_rfc3339(&path).ok();
                let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
                (InputSource::File, name, date, Box::new(file))
            }
            (None, Some(dir)) => {
                let reader = multidir::compressing_reader(&[dir], Vec::new(), compress)?;
                (InputSource::MultiDir, None, None, reader)
            }
            (None, None) => (InputSource::Direct, None, None, Box::new(io::stdin())),
        };

    env.identity_store.with(from, |sender| {
        let req = EncodeRequest {
            sender,
            receiver: &receiver,
            input_source,
            original_file_name,
            original_file_date,
            chunk_size,
        };
        match &header_out {
            None => {
                let out = File::create(output).with_context(|| format!("creating {}", output.display()))?;
                bundle::encode_combined(&req, reader, out).map_err(anyhow::Error::from)
            }
            Some(header_path) => {
                let header_file = File::create(header_path).with_context(|| format!("creating {}", header_path.display()))?;
                let body_file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
                bundle::encode_split(&req, reader, header_file, body_file).map_err(anyhow::Error::from)
            }
        }
    })??;

    println!("Sealed bundle from '{from}' to '{to}'.");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn decrypt(
    env: &Environment,
    from: &str,
    to: &str,
    input: &PathBuf,
    header_in: Option<PathBuf>,
    output: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    compress: bool,
    chunk_size: usize,
) -> Result<()> {
    let sender = env.counterparty_store.get(from)?;
    tracing::debug!(from, to, input = %input.display(), "decrypting bundle");

    let mut pending_commit: Option<atomic::PendingCommit> = None;

    let (expected_source, writer): (Option<InputSource>, Box<dyn Write>) = match (&output, &output_dir) {
        (Some(_), Some(_)) => bail!("--output and --output-dir are mutually exclusive"),
        (Some(path), None) => {
            let (writer, pending) = atomic::create(path.clone()).with_context(|| format!("creating temp file for {}", path.display()))?;
            pending_commit = Some(pending);
            (Some(InputSource::File), Box::new(writer))
        }
        (None, Some(dir)) => (Some(InputSource::MultiDir), Box::new(multidir::MaterialisingWriter::new(dir.clone(), compress)?)),
        (None, None) => (Some(InputSource::Direct), Box::new(io::stdout())),
    };

    let info = env.identity_store.with(to, |receiver| {
        match &header_in {
            None => {
                let reader = File::open(input).with_context(|| format!("opening {}", input.display()))?;
                bundle::decode_combined(receiver, &sender, reader, writer, chunk_size, expected_source).map_err(anyhow::Error::from)
            }
            Some(header_path) => {
                let header_reader = File::open(header_path).with_context(|| format!("opening {}", header_path.display()))?;
                let body_reader = File::open(input).with_context(|| format!("opening {}", input.display()))?;
                bundle::decode_split(receiver, &sender, header_reader, body_reader, writer, chunk_size, expected_source)
                    .map_err(anyhow::Error::from)
            }
        }
    })??;

    if let Some(pending) = pending_commit {
        atomic::commit(pending).context("persisting decrypted output")?;
    }

    eprintln!(
        "Opened bundle from '{}' to '{}', sealed {}.",
        info.from_name(),
        info.to_name(),
        info.create_date()
    );
    Ok(())
}
