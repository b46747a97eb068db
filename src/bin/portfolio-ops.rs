// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Portfolio operator CLI.
//!
//! # Usage
//!
//! ```bash
//! # Upload public/assets/cv.pdf as the new resume
//! portfolio-ops upload-resume
//!
//! # Make the current resume download as an attachment and store its URL
//! portfolio-ops patch-resume-meta --file-name Jane_Doe_CV.pdf
//!
//! # Apply the storage bucket CORS policy
//! portfolio-ops set-cors --origin https://example.com
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use portfolio_api::{
    db::FirestoreDb,
    ops,
    services::{IdTokenSource, IdentityService, ServiceAccountKey, StorageService},
};
use std::path::PathBuf;

/// Identity the CLI signs in as for storage requests.
const OPS_PRINCIPAL_UID: &str = "cv-uploader";

#[derive(Parser)]
#[command(name = "portfolio-ops")]
#[command(author, version, about = "Portfolio operator tools")]
struct Cli {
    /// Service-account key file
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS", default_value = "service-account.json")]
    service_account: PathBuf,

    /// Project ID (defaults to the service account's project)
    #[arg(long, env = "GCP_PROJECT_ID")]
    project: Option<String>,

    /// Storage bucket (defaults to `{project}.firebasestorage.app`)
    #[arg(long, env = "STORAGE_BUCKET")]
    bucket: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a PDF as the new resume and record it in Firestore
    UploadResume {
        /// Local PDF to upload
        #[arg(long, default_value = "public/assets/cv.pdf")]
        pdf: PathBuf,

        /// Name offered when visitors download the file
        #[arg(long, env = "RESUME_FILE_NAME", default_value = "cv.pdf")]
        file_name: String,

        /// Public web API key of the identity provider
        #[arg(long, env = "FIREBASE_API_KEY")]
        api_key: String,
    },
    /// Set attachment disposition on the current resume and store its download URL
    PatchResumeMeta {
        #[arg(long, env = "RESUME_FILE_NAME", default_value = "cv.pdf")]
        file_name: String,

        #[arg(long, env = "FIREBASE_API_KEY")]
        api_key: String,
    },
    /// Apply the bucket CORS policy
    SetCors {
        /// Allowed origin (repeatable; defaults to local dev and the hosted site)
        #[arg(long = "origin")]
        origins: Vec<String>,
    },
}

struct Target {
    key: ServiceAccountKey,
    project: String,
    bucket: String,
}

fn resolve_target(cli: &Cli) -> anyhow::Result<Target> {
    let key = ServiceAccountKey::from_file(&cli.service_account)?;
    let project = cli
        .project
        .clone()
        .or_else(|| key.project_id.clone())
        .context("no project ID: pass --project or use a key with project_id")?;
    let bucket = cli
        .bucket
        .clone()
        .unwrap_or_else(|| format!("{project}.firebasestorage.app"));
    Ok(Target {
        key,
        project,
        bucket,
    })
}

async fn connect(target: &Target, cli: &Cli, api_key: &str) -> anyhow::Result<(FirestoreDb, StorageService)> {
    let key_path = cli.service_account.to_string_lossy();
    let db = FirestoreDb::with_key_file(&target.project, &key_path).await?;

    let identity = IdentityService::new(api_key);
    let storage = StorageService::new(
        &target.bucket,
        IdTokenSource::new(target.key.clone(), OPS_PRINCIPAL_UID, identity),
    );
    Ok((db, storage))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let target = resolve_target(&cli)?;

    match &cli.command {
        Commands::UploadResume {
            pdf,
            file_name,
            api_key,
        } => {
            let (db, storage) = connect(&target, &cli, api_key).await?;
            let meta = ops::upload_resume(&db, &storage, pdf, file_name).await?;
            println!("Storage path: {}", meta.storage_path);
            println!("File name   : {}", meta.file_name);
            eprintln!("Delete the service-account key when you are done.");
        }
        Commands::PatchResumeMeta { file_name, api_key } => {
            let (db, storage) = connect(&target, &cli, api_key).await?;
            let url = ops::patch_resume_meta(&db, &storage, file_name).await?;
            println!("Download URL: {}", url);
        }
        Commands::SetCors { origins } => {
            let origins = if origins.is_empty() {
                ops::default_cors_origins(&target.project)
            } else {
                origins.clone()
            };
            let rule = ops::CorsRule::for_origins(origins);
            ops::set_cors(&reqwest::Client::new(), &target.key, &target.bucket, &[rule]).await?;
            println!("CORS applied to gs://{}", target.bucket);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("portfolio_api=info".parse().unwrap())
                .add_directive("warn".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
