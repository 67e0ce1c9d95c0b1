// ABOUTME: Entry point for the compose-redeploy CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use compose_redeploy::agent::Agent;
use compose_redeploy::config::Config;
use compose_redeploy::error::Result;
use compose_redeploy::manifest::ServiceSpec;
use compose_redeploy::redeploy::{LaunchPlan, RedeployOptions, RedeploySummary};
use compose_redeploy::server::{self, ServerState};
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover(&env::current_dir()?)?,
    };

    match cli.command {
        Commands::Serve { listen } => {
            let listen = listen.unwrap_or(config.listen);
            let state = Arc::new(ServerState {
                token: config.token.resolve()?,
                agent: Agent::from_config(&config)?,
            });
            let router = server::router(state, &config.cors.origins);
            server::serve(listen, router).await
        }
        Commands::Redeploy => {
            let agent = Agent::from_config(&config)?;
            let summary = agent.redeploy().await?;
            print_summary(&summary);
            Ok(())
        }
        Commands::Plan => {
            let services = config.manifest_source().load()?;
            print_plan(&services, &RedeployOptions::from_config(&config));
            Ok(())
        }
    }
}

fn print_summary(summary: &RedeploySummary) {
    for report in &summary.services {
        let pull = if report.pull.is_current() {
            "up to date"
        } else {
            "new image"
        };
        println!(
            "✓ {} → {} ({}, {} probe(s))",
            report.service,
            report.container.short(),
            pull,
            report.health.probes
        );
        if let Some(image) = &report.reaped_image {
            println!("  removed old image {}", image.short());
        }
    }
    for name in &summary.skipped {
        println!("- {} skipped", name);
    }
}

fn print_plan(services: &[ServiceSpec], options: &RedeployOptions) {
    let mut first = true;
    for service in services {
        if options.is_skipped(service) {
            println!("- {} ({}) skipped", service.name, service.container_name);
            continue;
        }

        let plan = LaunchPlan::for_service(service);
        println!("→ {} ({})", service.name, service.container_name);
        println!("  image:  {}", service.image);
        println!("  health: {}", plan.health_address());
        if let Some(bind) = plan.config.binds.first() {
            println!("  bind:   {}", bind);
        }
        for ignored in &plan.ignored_binds {
            println!("  ignored bind: {}", ignored);
        }
        if first && !options.reap_first_service {
            println!("  old image kept");
        }
        first = false;
    }
}
