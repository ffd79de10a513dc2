use clap::{ArgGroup, Parser};
use colored::*;
use devcamper_api::{
    seed::{self, SeedData},
    AuthService, Config, Database, Geocoder,
};
use std::{process, sync::Arc};

#[derive(Parser)]
#[command(
    name = "seeder",
    version = env!("CARGO_PKG_VERSION"),
    about = "Load or wipe the DevCamper fixture data"
)]
#[command(group(ArgGroup::new("action").required(true).args(["import", "destroy"])))]
struct Cli {
    #[arg(short = 'i', long, help = "Import users, bootcamps, courses and reviews")]
    import: bool,

    #[arg(short = 'd', long, help = "Delete every user, bootcamp, course and review")]
    destroy: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devcamper_api=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Arc::new(Config::from_env()?);
    let db = Database::connect(&config.database).await?;

    let result = if cli.import {
        import(&db, config).await
    } else {
        destroy(&db).await
    };

    db.shutdown().await;
    result
}

async fn import(db: &Database, config: Arc<Config>) -> anyhow::Result<()> {
    let dir = seed::data_dir();
    let data = SeedData::load(&dir)?;
    db.ensure_indexes().await?;

    let geocoder = Geocoder::from_config(&config.geocoder);
    if geocoder.is_none() {
        println!(
            "{}",
            "GEOCODER_API_KEY not set, bootcamps will have no location".yellow()
        );
    }

    let auth_service = AuthService::new(db.clone(), config);
    let summary = seed::import(db, &auth_service, geocoder.as_ref(), &data).await?;

    println!("{}", "Data Imported...".green().reversed());
    println!(
        "  {} users, {} bootcamps, {} courses, {} reviews from {}",
        summary.users,
        summary.bootcamps,
        summary.courses,
        summary.reviews,
        dir.display()
    );
    Ok(())
}

async fn destroy(db: &Database) -> anyhow::Result<()> {
    let summary = seed::destroy(db).await?;

    println!("{}", "Data Destroyed...".red().reversed());
    println!(
        "  {} users, {} bootcamps, {} courses, {} reviews removed",
        summary.users, summary.bootcamps, summary.courses, summary.reviews
    );
    Ok(())
}
