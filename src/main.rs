use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use grid_sync::geo::AccessPoint;
use grid_sync::{Agent, AgentConfig};

#[derive(Debug, Parser)]
#[command(name = "grid-sync")]
#[command(about = "Enrollment, capture reporting and geolocation sync agent")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, default_value = "/etc/grid-sync/config.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one grid pass followed by one geolocation pass.
    Pass,
    /// Enroll now, ignoring any cached token.
    Enroll,
    /// Print identity, token age and ledger sizes.
    Status,
    /// Save the net-pos snapshot for a capture.
    Netpos(NetposArgs),
}

#[derive(Debug, Args)]
struct NetposArgs {
    #[arg(long)]
    capture: PathBuf,
    /// JSON array of `{"mac": .., "rssi": ..}` objects.
    #[arg(long)]
    aps: PathBuf,
}

fn run(cli: Cli) -> Result<()> {
    let config = AgentConfig::load(&cli.config)?;
    let agent = Agent::from_config(config).context("Failed to start agent")?;

    match cli.command {
        Commands::Pass => match agent.run_pass()? {
            Some(report) => {
                println!(
                    "{} total={} new={} delivered={} failed={} excluded={}",
                    report.pass_id,
                    report.grid.total,
                    report.grid.new,
                    report.grid.delivered,
                    report.grid.failed,
                    report.grid.excluded
                );
                if let Some(geo) = report.geo {
                    println!(
                        "geo fetched={} cached={} failed={}",
                        geo.fetched, geo.cached, geo.failed
                    );
                }
                if let Some(error) = report.grid.error {
                    anyhow::bail!("grid pass aborted: {}", error);
                }
            }
            None => println!("pass skipped: another pass is running"),
        },
        Commands::Enroll => {
            agent.enroll().context("Enrollment failed")?;
            println!("enrolled as {}", agent.status().identity);
        }
        Commands::Status => {
            let status = agent.status();
            println!("identity: {}", status.identity);
            match status.token_age_minutes {
                Some(age) => println!(
                    "token: {:.1} min old ({})",
                    age,
                    if status.token_fresh { "fresh" } else { "stale" }
                ),
                None => println!("token: none"),
            }
            println!("reported: {}", status.reported);
            match status.geo_saved {
                Some(saved) => println!("geolocated: {}", saved),
                None => println!("geolocation: disabled"),
            }
        }
        Commands::Netpos(args) => {
            let raw = std::fs::read_to_string(&args.aps)
                .with_context(|| format!("Failed to read {}", args.aps.display()))?;
            let access_points: Vec<AccessPoint> =
                serde_json::from_str(&raw).context("Access point list is not valid JSON")?;
            let path = agent.on_handshake(&args.capture, &access_points)?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn main() {
    grid_sync::init_logger();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
