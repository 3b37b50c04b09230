use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use indicatif::{ProgressBar, ProgressStyle};
use netmap_client::{ApiClient, ScanOrchestrator, ScanPhase};
use netmap_core::{LayoutEngine, NodeKind, Viewport};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

mod commands;

fn print_banner() {
    println!("{}", "═".repeat(60).bright_blue().bold());
    println!("{}", "  NETMAP - reconnaissance graph client".bright_white().bold());
    println!("{}", "═".repeat(60).bright_blue().bold());
}

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    if chosen_command.get_flag("verbose") {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }

    if !quiet {
        print_banner();
    }

    match chosen_command.subcommand() {
        Some(("scan", primary_command)) => handle_scan(primary_command, quiet).await,
        None => {}
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

async fn handle_scan(args: &ArgMatches, quiet: bool) {
    let domain = args.get_one::<String>("domain").unwrap();
    let depth = *args.get_one::<u8>("depth").unwrap();
    let server = args.get_one::<Url>("server").unwrap();
    let width = *args.get_one::<f64>("width").unwrap();
    let height = *args.get_one::<f64>("height").unwrap();
    let interval = *args.get_one::<u64>("interval").unwrap();
    let output = args.get_one::<PathBuf>("output");

    let api = match ApiClient::new(server.as_str()) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };
    let orchestrator =
        ScanOrchestrator::new(api).with_poll_interval(Duration::from_secs(interval));

    // Mirror every status transition onto a spinner.
    let spinner = if quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };
    if let Some(pb) = &spinner {
        let pb = pb.clone();
        orchestrator
            .subscribe(Arc::new(move |state| {
                if state.loading {
                    pb.set_message(state.status_message.clone());
                }
            }))
            .await;
    }

    if let Err(e) = orchestrator.submit_scan(domain, depth).await {
        if let Some(pb) = &spinner {
            pb.finish_and_clear();
        }
        eprintln!("{} Scan failed: {}", "✗".red().bold(), e);
        std::process::exit(1);
    }

    // The async path leaves a poll loop running; wait for it to settle.
    let final_state = loop {
        let state = orchestrator.state().await;
        match state.phase {
            ScanPhase::Ready | ScanPhase::Failed => break state,
            _ => tokio::time::sleep(Duration::from_millis(200)).await,
        }
    };
    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }

    if final_state.phase == ScanPhase::Failed {
        let message = final_state
            .error
            .unwrap_or_else(|| "unknown error".to_string());
        eprintln!("{} Scan failed: {}", "✗".red().bold(), message);
        std::process::exit(1);
    }

    let snapshot = final_state.snapshot.unwrap_or_default();
    if snapshot.is_empty() {
        println!("{} Scan finished but returned no nodes.", "→".blue());
        return;
    }

    let engine = LayoutEngine::new();
    let viewport = Viewport { width, height };
    let nodes = engine.layout(&snapshot, viewport, Some(domain));

    if !quiet {
        let domains = nodes.iter().filter(|n| n.kind == NodeKind::Domain).count();
        let ips = nodes.iter().filter(|n| n.kind == NodeKind::Ip).count();
        println!("{} Scan complete for {}", "✓".green().bold(), domain.bright_white());
        println!(
            "{} {} domain(s), {} address(es), {} edge(s)",
            "→".blue(),
            domains,
            ips,
            snapshot.edges.len()
        );
    }

    let document = serde_json::json!({
        "domain": domain,
        "viewport": { "width": width, "height": height },
        "nodes": nodes,
        "edges": snapshot.edges,
    });
    let rendered = match serde_json::to_string_pretty(&document) {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("{} Failed to serialize graph: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = fs::write(path, rendered) {
                eprintln!("{} Failed to write {}: {}", "✗".red().bold(), path.display(), e);
                std::process::exit(1);
            }
            if !quiet {
                println!("{} Wrote positioned graph to {}", "✓".green().bold(), path.display());
            }
        }
        None => println!("{rendered}"),
    }
}
