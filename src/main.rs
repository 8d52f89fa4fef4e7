use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use framegrab::config::{self, RepositoryConfig};
use framegrab::fetch::{self, validity::BlankFilter, Source};
use framegrab::scrape::{engine, window::ScheduleWindow, JobState, ScrapeContext};
use framegrab::storage::http::HttpRepository;
use framegrab::storage::path::RunScope;
use framegrab::storage::ScratchDir;
use framegrab::weather;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "framegrab",
    about = "Batch webcam capture with weather labelling and remote registration",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scrape job over a time window
    Scrape {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        repo: RepoArgs,

        /// Direct snapshot/stream URL to poll
        #[arg(long, conflicts_with = "webcam_id")]
        source_url: Option<String>,

        /// Roundshot webcam id, resolved into per-instant archive URLs
        #[arg(long)]
        webcam_id: Option<String>,

        /// Minutes between scheduled captures
        #[arg(long, default_value = "60")]
        interval: i64,

        /// Total run length in minutes, anchored at run start
        #[arg(long, conflicts_with_all = ["start_date", "end_date"])]
        duration: Option<i64>,

        /// Window start, YYYY-MM-DDTHH:MM (UTC)
        #[arg(long, requires = "end_date")]
        start_date: Option<String>,

        /// Window end, YYYY-MM-DDTHH:MM (UTC)
        #[arg(long, requires = "start_date")]
        end_date: Option<String>,
    },

    /// Classify weather conditions for a window and register the result
    Weather {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        repo: RepoArgs,

        /// First day of the window, YYYY-MM-DD
        #[arg(long)]
        start_date: String,

        /// Last day of the window, YYYY-MM-DD
        #[arg(long)]
        end_date: String,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Case study this run belongs to
    #[arg(long, default_value = "webcam")]
    case_study_name: String,

    /// Job id assigned by the orchestrating pipeline
    #[arg(long)]
    job_id: i64,

    /// Tracer id correlating artifacts across pipeline stages
    #[arg(long)]
    tracer_id: String,

    /// Latitude of the webcam location
    #[arg(long)]
    latitude: String,

    /// Longitude of the webcam location
    #[arg(long)]
    longitude: String,

    /// Local scratch directory; removed when the run ends
    #[arg(long, default_value = "./.tmp")]
    file_dir: PathBuf,
}

#[derive(Args)]
struct RepoArgs {
    /// Content repository scheme
    #[arg(long, default_value = "http")]
    repo_scheme: String,

    /// Content repository host
    #[arg(long, default_value = "localhost")]
    repo_host: String,

    /// Content repository port
    #[arg(long, default_value = "8000")]
    repo_port: u16,

    /// Auth token for the content repository
    #[arg(long, env = "FRAMEGRAB_REPO_TOKEN", hide_env_values = true)]
    repo_auth_token: String,
}

impl RepoArgs {
    fn into_config(self) -> RepositoryConfig {
        RepositoryConfig {
            scheme: self.repo_scheme,
            host: self.repo_host,
            port: self.repo_port,
            auth_token: self.repo_auth_token,
        }
    }
}

fn validated_scope(run: &RunArgs) -> Result<RunScope> {
    config::validate_identifier("case_study_name", &run.case_study_name)?;
    config::validate_identifier("tracer_id", &run.tracer_id)?;
    config::validate_identifier("latitude", &run.latitude)?;
    config::validate_identifier("longitude", &run.longitude)?;
    Ok(RunScope {
        case_study: run.case_study_name.clone(),
        tracer_id: run.tracer_id.clone(),
        job_id: run.job_id,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape {
            run,
            repo,
            source_url,
            webcam_id,
            interval,
            duration,
            start_date,
            end_date,
        } => {
            let scope = validated_scope(&run)?;
            let source = match (source_url, webcam_id) {
                (Some(url), None) => Source::StreamUrl(url),
                (None, Some(id)) => Source::RoundshotWebcam(id),
                _ => bail!("exactly one of --source-url or --webcam-id is required"),
            };
            let interval = chrono::Duration::minutes(interval);
            let window = match (duration, start_date, end_date) {
                (Some(minutes), None, None) => ScheduleWindow::Duration {
                    duration: chrono::Duration::minutes(minutes),
                    interval,
                },
                (None, Some(start), Some(end)) => ScheduleWindow::Range {
                    start: config::parse_datetime(&start)?,
                    end: config::parse_datetime(&end)?,
                    interval,
                },
                _ => bail!("either --duration or both --start-date and --end-date are required"),
            };

            let scratch = ScratchDir::create(&run.file_dir)?;
            let fetcher = fetch::fetcher_for(&source);
            let repository = HttpRepository::new(&repo.into_config());
            let context = ScrapeContext {
                scope,
                latitude: run.latitude,
                longitude: run.longitude,
                filter: BlankFilter::default(),
                tick_delay: Duration::from_millis(100),
            };

            let outcome =
                engine::run(window, &context, fetcher.as_ref(), &repository, scratch).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if outcome.state == JobState::Failed {
                std::process::exit(1);
            }
        }

        Commands::Weather {
            run,
            repo,
            start_date,
            end_date,
        } => {
            let scope = validated_scope(&run)?;
            let start = NaiveDate::parse_from_str(&start_date, "%Y-%m-%d")?;
            let end = NaiveDate::parse_from_str(&end_date, "%Y-%m-%d")?;

            let scratch = ScratchDir::create(&run.file_dir)?;
            let repository = HttpRepository::new(&repo.into_config());
            let record = weather::run(
                &scope,
                &run.latitude,
                &run.longitude,
                start,
                end,
                &scratch,
                &repository,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}
