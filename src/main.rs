//! Command-line interface for datasynth
//!
//! # Usage Examples
//!
//! ## Render
//! ```bash
//! # Render a template three times as provider "orders"
//! datasynth render order.template.json --provider-name orders --count 3 \
//!   --profile-root demos/Profiles
//! ```
//!
//! ## Validate
//! ```bash
//! # Check provider options and that every template loads and renders
//! datasynth validate --profile-root demos/Profiles --profile sample-providers.yaml
//! ```
//!
//! ## Run
//! ```bash
//! # Run all providers until Ctrl-C, logging at info level
//! RUST_LOG=info datasynth run --profile-root demos/Profiles
//!
//! # Run only the "orders" provider for 30 seconds
//! datasynth run --profile-root demos/Profiles --provider orders --duration 30s
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use datasynth::{parse_duration, ProfileOpts, StdoutSink};
use std::sync::Arc;
use std::time::Duration;
use synth_provider::{run_provider, Profile, Provider, ProviderFactory, RunSummary};
use synth_template::TemplateStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "datasynth")]
#[command(about = "Generate synthetic JSON, CSV, XML, image, protobuf, Parquet and graph payloads from templates")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template and print the result
    Render {
        /// Template file name, e.g. order.template.json
        template: String,

        /// Provider name tracked values are recorded under
        #[arg(long, default_value = "cli")]
        provider_name: String,

        /// Number of renders
        #[arg(long, default_value_t = 1)]
        count: usize,

        #[command(flatten)]
        profile_opts: ProfileOpts,
    },

    /// Validate the profile and render every provider's template once
    Validate {
        #[command(flatten)]
        profile_opts: ProfileOpts,
    },

    /// List the templates and collections of a profile
    List {
        #[command(flatten)]
        profile_opts: ProfileOpts,
    },

    /// Run the providers of a profile, writing payloads to stdout
    Run {
        /// Only run these providers (repeatable); all providers when omitted
        #[arg(long = "provider", value_name = "NAME")]
        providers: Vec<String>,

        /// Stop after this long, e.g. "30s", "5m", "1h"
        #[arg(long, value_parser = parse_duration)]
        duration: Option<Duration>,

        #[command(flatten)]
        profile_opts: ProfileOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            template,
            provider_name,
            count,
            profile_opts,
        } => {
            let store = TemplateStore::new(profile_opts.store_config());
            store
                .build_segments(&provider_name)
                .context("Failed to load templates")?;
            for _ in 0..count {
                let rendered = store
                    .render(&provider_name, &template, 0)
                    .with_context(|| format!("Failed to render template '{template}'"))?;
                println!("{rendered}");
            }
        }
        Commands::Validate { profile_opts } => {
            validate(&profile_opts)?;
        }
        Commands::List { profile_opts } => {
            let store = TemplateStore::new(profile_opts.store_config());
            println!("Templates:");
            for name in store.template_names().context("Failed to load templates")? {
                println!("  {name}");
            }
            println!("Collections:");
            for name in store.collection_names().context("Failed to load collections")? {
                println!("  {name}");
            }
        }
        Commands::Run {
            providers,
            duration,
            profile_opts,
        } => {
            run_profile(&profile_opts, &providers, duration).await?;
        }
    }

    Ok(())
}

fn validate(profile_opts: &ProfileOpts) -> anyhow::Result<()> {
    let profile = profile_opts.load_profile()?;
    profile.validate()?;

    let store = TemplateStore::new(profile_opts.store_config());
    let templates = store.template_names().context("Failed to load templates")?;
    for options in &profile.providers {
        if !templates.contains(&options.template_name) {
            anyhow::bail!(
                "Template '{}' of provider '{}' does not exist in {}",
                options.template_name,
                options.provider_name,
                profile_opts.templates_dir().display()
            );
        }
        store.build_segments(&options.provider_name)?;
        store
            .render(&options.provider_name, &options.template_name, 0)
            .with_context(|| format!("Provider '{}' failed to render", options.provider_name))?;
    }

    println!(
        "Profile {} is valid: {} providers ({})",
        profile_opts.profile_path().display(),
        profile.providers.len(),
        profile.provider_names()
    );
    Ok(())
}

fn select_providers(profile: Profile, names: &[String]) -> anyhow::Result<Profile> {
    if names.is_empty() {
        return Ok(profile);
    }
    let mut selected = Vec::new();
    for name in names {
        let options = profile.provider(name).with_context(|| {
            format!(
                "Provider '{}' is not in the profile. Available providers are '{}'",
                name,
                profile.provider_names()
            )
        })?;
        selected.push(options.clone());
    }
    Ok(Profile {
        providers: selected,
    })
}

async fn run_profile(
    profile_opts: &ProfileOpts,
    names: &[String],
    duration: Option<Duration>,
) -> anyhow::Result<()> {
    let profile = select_providers(profile_opts.load_profile()?, names)?;
    profile.validate()?;
    if profile.providers.is_empty() {
        anyhow::bail!("Profile {} has no providers", profile_opts.profile_path().display());
    }
    let terminate_when_complete = profile
        .providers
        .iter()
        .all(|options| options.terminate_when_complete && options.max_iterations > 0);

    let store = Arc::new(TemplateStore::new(profile_opts.store_config()));
    let engine_config = profile_opts.engine_config();
    let token = CancellationToken::new();
    let sink = Arc::new(StdoutSink::new());

    let shutdown = token.clone();
    tokio::spawn(async move {
        let stop_after = async {
            match duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, stopping providers"),
            _ = stop_after => info!("Run duration elapsed, stopping providers"),
        }
        shutdown.cancel();
    });

    let mut handles = Vec::new();
    for options in profile.providers {
        let name = options.provider_name.clone();
        let mut provider =
            ProviderFactory::create(options, Arc::clone(&store), &engine_config, &token)
                .with_context(|| format!("Failed to start provider '{name}'"))?;
        let sink = Arc::clone(&sink);
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            let result = run_provider(provider.as_mut(), sink.as_ref(), &token).await;
            if let Err(e) = provider.shutdown().await {
                warn!("Provider '{}' did not shut down cleanly: {}", name, e);
            }
            (name, result)
        }));
    }

    let mut failures = Vec::new();
    let mut total = RunSummary::default();
    for handle in handles {
        let (name, result) = handle.await.context("Provider task panicked")?;
        match result {
            Ok(summary) => {
                info!(
                    "Provider '{}' produced {} items in {} packages",
                    name, summary.items, summary.iterations
                );
                total.iterations += summary.iterations;
                total.items += summary.items;
                total.bytes += summary.bytes;
                total.failed_sends += summary.failed_sends;
            }
            Err(e) => failures.push(format!("{name}: {e}")),
        }
    }

    if !failures.is_empty() {
        token.cancel();
        anyhow::bail!("{} provider(s) failed: {}", failures.len(), failures.join("; "));
    }

    if !terminate_when_complete && !token.is_cancelled() {
        info!("All providers completed, waiting for Ctrl-C");
        token.cancelled().await;
    }
    token.cancel();

    info!(
        "Produced {} items in {} packages ({} bytes)",
        total.items, total.iterations, total.bytes
    );
    Ok(())
}
