/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */
use std::error::Error;
use std::sync::Arc;
use std::time;

use clap::Parser;
use hsm_blob_mover::metrics::unit::ByteUnit;
use hsm_blob_mover::metrics::Throughput;
use hsm_blob_mover::mover::plugin::{ActionReport, Plugin};
use hsm_blob_mover::mover::{ActionRequest, BlobMover, Mover, NoopMover};
use hsm_blob_mover::types::ConcurrencySetting;
use hsm_blob_mover::Client;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Action {
    Archive,
    Restore,
    Remove,
}

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "az_mover")]
#[command(about = "Runs one HSM action against the container configured in the environment.")]
pub struct Args {
    /// Action to perform
    #[arg(value_enum)]
    action: Action,

    /// File name relative to HSM_MOUNT_ROOT
    #[arg(required = true)]
    object_name: String,

    /// Archive backend ID the mover registers under
    #[arg(long, default_value_t = 1)]
    archive_id: u32,

    /// Address of the coordinator agent
    #[arg(long, default_value = "localhost:4242")]
    agent: String,

    /// Name of the filesystem served
    #[arg(long, default_value = "lustre")]
    fs_name: String,

    /// Number of concurrent block transfers, overrides HSM_AZ_PARALLELISM
    #[arg(long)]
    concurrency: Option<usize>,

    /// Accept the action without touching the container
    #[arg(long, default_value_t = false, action = clap::ArgAction::SetTrue)]
    noop: bool,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_ids(true)
        .init();

    let mover: Arc<dyn Mover> = if args.noop {
        Arc::new(NoopMover::new(args.archive_id))
    } else {
        let mut loader = hsm_blob_mover::from_env();
        if let Some(workers) = args.concurrency {
            loader = loader.parallelism(ConcurrencySetting::Explicit(workers));
        }
        let client = Client::new(loader.load()?)?;
        Arc::new(BlobMover::new(&args.fs_name, args.archive_id, client))
    };

    let (mut plugin, reports) = Plugin::new(&args.agent)?;
    plugin.add_mover(mover)?;

    let request = match args.action {
        Action::Archive => ActionRequest::archive(1, args.archive_id, &args.object_name),
        Action::Restore => ActionRequest::restore(1, args.archive_id, &args.object_name),
        Action::Remove => ActionRequest::remove(1, args.archive_id, &args.object_name),
    };

    let start = time::Instant::now();
    plugin.dispatch(request)?;

    let mut outcome = Ok(());
    while let Ok(report) = reports.recv().await {
        match report {
            ActionReport::Progress { offset, length, .. } => {
                tracing::debug!("transferred {length} bytes at offset {offset}");
            }
            ActionReport::Completed { bytes, .. } => {
                let elapsed = start.elapsed();
                println!(
                    "{:?} of {} complete: {} in {elapsed:?} ({})",
                    args.action,
                    args.object_name,
                    ByteUnit::display(bytes),
                    Throughput::new(bytes, elapsed),
                );
                break;
            }
            ActionReport::Failed { error, .. } => {
                tracing::error!("{:?} of {} failed: {error}", args.action, args.object_name);
                outcome = Err(error.into());
                break;
            }
        }
    }

    plugin.stop().await;
    outcome
}
