use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use salesboard::config::{ConfigLoader, DashboardConfig};
use salesboard::filter::{parse_bounds, DeliveryWindow, SalesFilter};
use salesboard::pipeline::{self, ReportOptions};
use salesboard::source::{HttpSource, Region, SalesQuery, SyntheticTaskSource};
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use tracing::{debug, error, trace};

/// Sales and task-allocation dashboard figures
#[derive(Parser)]
#[command(name = "salesboard")]
#[command(about = "Fetch, filter and aggregate dashboard data", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Revenue, sales count, per-state, monthly, category and seller figures
    Sales {
        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Rows kept in the top-N tables (default: from config)
        #[arg(long)]
        top: Option<usize>,
    },
    /// Filtered raw records
    Raw {
        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Columns to keep, comma separated
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,
    },
    /// Synthetic task allocation per user
    Tasks {
        /// Seed for the task generator
        #[arg(long)]
        seed: Option<u64>,

        /// Delivery window: today, tomorrow, future, custom or all
        #[arg(long, default_value = "all")]
        window: DeliveryWindow,

        /// Start of a custom window (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// End of a custom window (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// Allocate per user and delivery day instead of per user
        #[arg(long)]
        by_day: bool,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Region (Brasil, Centro-Oeste, Nordeste, Norte, Sudeste, Sul)
    #[arg(long, default_value = "Brasil")]
    region: Region,

    /// Year of purchase
    #[arg(long)]
    year: Option<i32>,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long = "product")]
    products: Vec<String>,
    #[arg(long = "category")]
    categories: Vec<String>,
    #[arg(long = "seller")]
    sellers: Vec<String>,
    #[arg(long = "location")]
    locations: Vec<String>,
    #[arg(long = "payment")]
    payment_types: Vec<String>,
    /// Price range LO..HI
    #[arg(long, value_parser = parse_bounds)]
    price: Option<(f64, f64)>,
    /// Freight range LO..HI
    #[arg(long, value_parser = parse_bounds)]
    freight: Option<(f64, f64)>,
    /// Rating range LO..HI
    #[arg(long, value_parser = parse_bounds)]
    rating: Option<(f64, f64)>,
    /// Installment count range LO..HI
    #[arg(long, value_parser = parse_bounds)]
    installments: Option<(f64, f64)>,
    /// First purchase date (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,
    /// Last purchase date (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,
}

impl FilterArgs {
    fn into_filter(self) -> SalesFilter {
        let selection = |values: Vec<String>| (!values.is_empty()).then_some(values);
        SalesFilter {
            products: selection(self.products),
            categories: selection(self.categories),
            price: self.price,
            freight: self.freight,
            purchase_dates: self.from.zip(self.to),
            sellers: selection(self.sellers),
            locations: selection(self.locations),
            rating: self.rating,
            payment_types: selection(self.payment_types),
            installments: self.installments,
        }
    }
}

impl QueryArgs {
    fn into_query(self) -> SalesQuery {
        SalesQuery {
            region: self.region,
            year: self.year,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::new().load(cli.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let log_level = match cli.verbose {
        0 => config.log_level.as_str(),
        1 => "debug",
        2 => "trace",
        _ => "trace,hyper=debug,reqwest=debug", // -vvv shows everything including dependencies
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .with_thread_ids(cli.verbose >= 3)
        .with_line_number(cli.verbose >= 3)
        .with_writer(std::io::stderr)
        .init();

    debug!("salesboard started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli.command, cli.format, &config).await {
        error!("Fatal error: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, format: OutputFormat, config: &DashboardConfig) -> anyhow::Result<()> {
    match command {
        Commands::Sales {
            query,
            filters,
            top,
        } => {
            let source = http_source(config, query.into_query())?;
            let options = ReportOptions {
                top_n: top.unwrap_or(config.top_n),
                currency_prefix: config.currency_prefix.clone(),
                ..Default::default()
            };
            let spec = filters.into_filter().to_spec();
            let report = pipeline::run_sales(&source, &spec, &options).await?;
            emit(format, &report)
        }
        Commands::Raw {
            query,
            filters,
            columns,
        } => {
            let source = http_source(config, query.into_query())?;
            let spec = filters.into_filter().to_spec();
            let report = pipeline::run_raw(&source, &spec, columns.as_deref()).await?;
            emit(format, &report)
        }
        Commands::Tasks {
            seed,
            window,
            from,
            to,
            by_day,
        } => {
            let today = Local::now().date_naive();
            let window = resolve_window(window, from, to)?;
            let source = SyntheticTaskSource::new(
                config.synthetic.users.clone(),
                config.synthetic.tasks.clone(),
                today,
                seed,
            );
            let report =
                pipeline::run_tasks(&source, &window, today, &config.synthetic.roster, by_day)
                    .await?;
            emit(format, &report)
        }
    }
}

/// Fill a custom window from `--from`/`--to`; other windows take no dates
fn resolve_window(
    window: DeliveryWindow,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> anyhow::Result<DeliveryWindow> {
    match window {
        DeliveryWindow::Custom(_) => Ok(DeliveryWindow::Custom(
            from.into_iter().chain(to).collect(),
        )),
        other if from.is_some() || to.is_some() => {
            anyhow::bail!("--from/--to need --window custom, got {:?}", other)
        }
        other => Ok(other),
    }
}

fn http_source(config: &DashboardConfig, query: SalesQuery) -> anyhow::Result<HttpSource> {
    Ok(HttpSource::new(config.endpoint.clone(), config.timeout)?
        .with_query(query)
        .with_retry(config.retry.attempts, config.retry.initial_delay))
}

fn emit<T: Serialize + Display>(format: OutputFormat, report: &T) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_purchase_range_needs_both_ends() {
        assert!(Cli::try_parse_from(["salesboard", "sales", "--from", "2022-01-01"]).is_err());
        assert!(Cli::try_parse_from(["salesboard", "raw", "--to", "2022-12-31"]).is_err());

        let cli = Cli::try_parse_from([
            "salesboard",
            "sales",
            "--from",
            "2022-01-01",
            "--to",
            "2022-12-31",
        ])
        .unwrap();
        let Commands::Sales { filters, .. } = cli.command else {
            panic!("expected sales command");
        };
        assert_eq!(
            filters.into_filter().purchase_dates,
            Some((date("2022-01-01"), date("2022-12-31")))
        );
    }

    #[test]
    fn test_task_window_dates_need_both_ends() {
        assert!(Cli::try_parse_from([
            "salesboard",
            "tasks",
            "--window",
            "custom",
            "--from",
            "2024-10-07"
        ])
        .is_err());
    }

    #[test]
    fn test_window_dates_rejected_outside_custom() {
        let err = resolve_window(
            DeliveryWindow::Today,
            Some(date("2024-10-07")),
            Some(date("2024-10-09")),
        )
        .unwrap_err();
        assert!(err.to_string().contains("--window custom"));

        assert_eq!(
            resolve_window(DeliveryWindow::All, None, None).unwrap(),
            DeliveryWindow::All
        );
        assert_eq!(
            resolve_window(
                DeliveryWindow::Custom(Vec::new()),
                Some(date("2024-10-07")),
                Some(date("2024-10-09")),
            )
            .unwrap(),
            DeliveryWindow::Custom(vec![date("2024-10-07"), date("2024-10-09")])
        );
    }
}
