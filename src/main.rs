use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use leasing_analytics::{
    ChartType, Config, DataSources, EmailInput, LeasingService,
};

const USAGE: &str = "\
leasing-analytics <command> [args]

Commands:
  schema                         Show the declared table schemas
  query <sql>                    Run a read-only SELECT against the store
  summary                        Guest-card summary
  prospects [income] [credit]    Qualified prospects (thresholds default to 0)
  market [rate]                  Market rent analysis vs a comparison rate
  report                         Render the six-panel market report
  chart <type>                   Render one chart (see list below)
  email                          Compose a leasing-update email

Environment:
  GUEST_CARDS_CSV    path to the guest cards CSV (default data/guest_cards.csv)
  NEARBY_UNITS_CSV   path to the nearby units CSV (default data/nearby_units.csv)
  CONFIG_JSON        optional path to a config overrides file";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        println!("{}", USAGE);
        print_chart_types();
        return Ok(());
    };

    let config = match env::var_os("CONFIG_JSON") {
        Some(path) => Config::from_file(&PathBuf::from(path))?,
        None => Config::default(),
    };

    let sources = DataSources {
        guest_cards: env::var_os("GUEST_CARDS_CSV")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/guest_cards.csv")),
        nearby_units: env::var_os("NEARBY_UNITS_CSV")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/nearby_units.csv")),
    };

    let mut service = LeasingService::new(config)?;
    service
        .load(&sources)
        .context("failed to load datasets; set GUEST_CARDS_CSV / NEARBY_UNITS_CSV")?;

    match command.as_str() {
        "schema" => {
            for table in service.get_schema()? {
                println!("## {}\n{}\n", table.table, table.description);
                for col in table.columns {
                    println!("  {:<20} {:<10} {}", col.name, col.semantic.name(), col.description);
                }
                println!();
            }
        }
        "query" => {
            let sql = args.get(2).map(String::as_str).unwrap_or("");
            let result = service.query_database(sql)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            println!("✓ {} rows", result.row_count());
        }
        "summary" => {
            let summary = service.guest_card_summary()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "prospects" => {
            let min_income = parse_optional_arg(&args, 2)?;
            let min_credit = parse_optional_arg(&args, 3)?;
            let result = service.qualified_prospects(min_income, min_credit)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            println!(
                "✓ {} of {} prospects qualify ({:.1}%)",
                result.qualified,
                result.total,
                result.proportion * 100.0
            );
        }
        "market" => {
            let rate = parse_optional_arg(&args, 2)?;
            let analysis = service.market_rent_analysis(rate)?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        "report" => {
            let path = service.create_market_report()?;
            println!("✓ Market report written to {}", path.display());
        }
        "chart" => {
            let Some(chart_type) = args.get(2) else {
                print_chart_types();
                bail!("chart requires a chart type");
            };
            let path = service.create_individual_chart(chart_type)?;
            println!("✓ Chart written to {}", path.display());
        }
        "email" => {
            let email = service.leasing_email(EmailInput::default())?;
            println!("{}", email.body);
        }
        other => {
            println!("{}", USAGE);
            print_chart_types();
            bail!("unknown command '{}'", other);
        }
    }

    Ok(())
}

fn parse_optional_arg(args: &[String], idx: usize) -> Result<Option<f64>> {
    match args.get(idx) {
        None => Ok(None),
        Some(raw) => {
            let value: f64 = raw
                .parse()
                .with_context(|| format!("'{}' is not a number", raw))?;
            Ok(Some(value))
        }
    }
}

fn print_chart_types() {
    println!("\nChart types:");
    for chart in ChartType::ALL {
        println!("  {}", chart);
    }
}
