/// # repodoc CLI Interface (Module)
///
/// Command parsing and orchestration for the `repodoc` binary. All pipeline logic
/// lives in `repodoc-core`; this module loads the config, builds the client, the
/// pacing strategy and the output sinks, and prints results.
///
/// For programmatic or integration use, call [`run`] with a constructed [`Cli`].
use crate::load_config::{default_config, load_config, CliConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use repodoc_core::client::GitHubClient;
use repodoc_core::database::{GenerationOutcome, Generator, RepositoryResult};
use repodoc_core::error::DocgenError;
use repodoc_core::pacing::FixedPacing;
use repodoc_core::persist::default_sinks;
use repodoc_core::session::{CancelFlag, Credential, GenerationProgress, Session};
use std::path::PathBuf;

/// CLI for repodoc: document every repository you own on GitHub.
#[derive(Parser)]
#[clap(
    name = "repodoc",
    version,
    about = "Build a combined documentation database from your GitHub repositories"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Document every owned repository and write the database
    Generate {
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Show the user the access token belongs to
    Whoami {
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// List the repositories that would be documented
    Repos {
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    run_with_cancel(cli, CancelFlag::new()).await
}

pub async fn run_with_cancel(cli: Cli, cancel: CancelFlag) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Generate { config } => {
            let config = resolve_config(config)?;
            tracing::info!(command = "generate", "Starting documentation run");
            generate(config, cancel).await
        }
        Commands::Whoami { config } => {
            let config = resolve_config(config)?;
            tracing::info!(command = "whoami", "Resolving access token owner");
            whoami(config, cancel).await
        }
        Commands::Repos { config } => {
            let config = resolve_config(config)?;
            tracing::info!(command = "repos", "Listing owned repositories");
            repos(config, cancel).await
        }
    }
}

fn resolve_config(path: Option<PathBuf>) -> Result<CliConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(default_config()),
    }
}

fn require_credential(config: &CliConfig) -> Result<Credential> {
    config
        .credential
        .clone()
        .ok_or(DocgenError::MissingCredential)
        .context("Set GITHUB_TOKEN in the environment or in a .env file")
}

fn client(config: &CliConfig, credential: &Credential) -> Result<GitHubClient> {
    GitHubClient::new(credential, config.generator.api_base_url.clone())
        .context("Failed to construct GitHub client")
}

async fn generate(config: CliConfig, cancel: CancelFlag) -> Result<()> {
    let credential = require_credential(&config)?;
    let api = client(&config, &credential)?;
    let pacing = FixedPacing::from(config.generator.pacing);
    let generator = Generator::new(&api, &pacing, config.generator.limits)
        .with_sinks(default_sinks(&config.generator.output));

    let mut session = Session::new(Some(credential))
        .with_cancel_flag(cancel)
        .with_progress(Box::new(log_progress));

    match generator.generate_combined_documentation(&mut session).await {
        Ok(outcome) => {
            tracing::info!(command = "generate", report = ?outcome.report, "Generation complete");
            print_summary(&outcome);
            if !outcome.report.sinks.is_empty() && !outcome.report.persisted() {
                anyhow::bail!("The documentation database could not be written to any destination");
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "generate", error = %e, "Generation failed");
            Err(anyhow::Error::new(e).context("Documentation run failed"))
        }
    }
}

async fn whoami(config: CliConfig, cancel: CancelFlag) -> Result<()> {
    let credential = require_credential(&config)?;
    let api = client(&config, &credential)?;
    let mut session = Session::new(Some(credential)).with_cancel_flag(cancel);

    let principal = repodoc_core::identity::fetch_current_user(&api, &mut session)
        .await
        .context("Could not resolve the access token's owner")?;

    println!("{}", principal.login);
    if let Some(name) = &principal.name {
        println!("name: {name}");
    }
    if let Some(url) = &principal.html_url {
        println!("profile: {url}");
    }
    Ok(())
}

async fn repos(config: CliConfig, cancel: CancelFlag) -> Result<()> {
    let credential = require_credential(&config)?;
    let api = client(&config, &credential)?;
    let pacing = FixedPacing::from(config.generator.pacing);
    let generator = Generator::new(&api, &pacing, config.generator.limits);
    let mut session = Session::new(Some(credential)).with_cancel_flag(cancel);

    let repositories = generator
        .refresh_repositories(&mut session)
        .await
        .context("Could not list repositories")?;

    for repo in &repositories {
        println!(
            "{}\t{}\t{}",
            repo.full_name,
            repo.language.as_deref().unwrap_or("-"),
            repo.stargazers_count
        );
    }
    println!("{} repositories", repositories.len());
    Ok(())
}

fn log_progress(event: GenerationProgress) {
    match event {
        GenerationProgress::RepositoryStarted { name, index, total } => {
            tracing::info!(repo = %name, position = index + 1, total, "Documenting repository");
        }
        GenerationProgress::RepositoryDocumented { name, files, progress } => {
            tracing::info!(
                repo = %name,
                files,
                progress = %format!("{:.0}%", progress * 100.0),
                "Repository documented"
            );
        }
        other => tracing::debug!(event = ?other, "Progress"),
    }
}

fn print_summary(outcome: &GenerationOutcome) {
    let report = &outcome.report;
    println!(
        "Documented {} of {} repositories for {}",
        outcome.database.repository_count,
        report.repositories.len(),
        outcome.database.user
    );
    for repo in &report.repositories {
        match &repo.result {
            RepositoryResult::Documented { files, skipped_files } if !skipped_files.is_empty() => {
                println!("  {}: {files} files, {} skipped", repo.full_name, skipped_files.len());
            }
            RepositoryResult::Documented { .. } => {}
            RepositoryResult::Failed { error } => println!("  {}: failed: {error}", repo.full_name),
        }
    }
    for sink in &report.sinks {
        match &sink.error {
            None => println!("Wrote {}", sink.destination),
            Some(error) => println!("Could not write {}: {error}", sink.destination),
        }
    }
}
