mod cli;
mod lib;
mod load;

use anyhow::{anyhow, bail, Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{
    plot::Plotter,
    table::{PlanTable, ProgressTable},
};
use lib::{
    date::Date,
    distribute::Strategy,
    fiscal::{fiscal_years_between, FiscalYear},
    month::{months_between, MonthBucket},
    plan::{Book, PlanAllocation},
    progress::{monthly_totals, RagStatus},
};
use load::{error, seed::Seed};

fn main() {
    let matches = app().get_matches();
    init_logging(matches.occurrences_of("verbose"));
    match run(&matches) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn app() -> App<'static, 'static> {
    let file = Arg::with_name("FILE")
        .required(true)
        .help("plan file (.mel)");
    App::new("melplan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Fiscal-year activity planning for monitoring and evaluation programmes")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .global(true)
                .help("more logging, repeat for more (MELPLAN_LOG overrides)"),
        )
        .subcommand(
            SubCommand::with_name("fy")
                .about("Fiscal year containing a date")
                .arg(Arg::with_name("DATE").required(true)),
        )
        .subcommand(
            SubCommand::with_name("years")
                .about("Fiscal years overlapping a range of dates")
                .arg(Arg::with_name("START").required(true))
                .arg(Arg::with_name("END").required(true)),
        )
        .subcommand(
            SubCommand::with_name("months")
                .about("Months between two dates, both included")
                .arg(Arg::with_name("START").required(true))
                .arg(Arg::with_name("END").required(true)),
        )
        .subcommand(
            SubCommand::with_name("check")
                .about("Validate a plan file and print its allocations")
                .arg(file.clone()),
        )
        .subcommand(
            SubCommand::with_name("progress")
                .about("Plan against reported progress")
                .arg(file.clone())
                .arg(
                    Arg::with_name("as-of")
                        .long("as-of")
                        .takes_value(true)
                        .value_name("DATE")
                        .help("report date, defaults to today"),
                )
                .arg(
                    Arg::with_name("area")
                        .long("area")
                        .takes_value(true)
                        .value_name("ID")
                        .help("only count plans of this intervention area"),
                )
                .arg(
                    Arg::with_name("rag")
                        .long("rag")
                        .takes_value(true)
                        .possible_values(&["red", "amber", "green", "gray"])
                        .help("only show activities with this status"),
                ),
        )
        .subcommand(
            SubCommand::with_name("export")
                .about("Allocations as JSON")
                .arg(file.clone())
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .value_name("PATH"),
                ),
        )
        .subcommand(
            SubCommand::with_name("seed")
                .about("Propose monthly targets for an activity")
                .arg(file.clone())
                .arg(
                    Arg::with_name("activity")
                        .long("activity")
                        .required(true)
                        .takes_value(true)
                        .value_name("ID"),
                )
                .arg(
                    Arg::with_name("year")
                        .long("year")
                        .required(true)
                        .takes_value(true)
                        .value_name("LABEL"),
                )
                .arg(
                    Arg::with_name("area")
                        .long("area")
                        .takes_value(true)
                        .value_name("ID")
                        .help("defaults to the first area of the file"),
                )
                .arg(
                    Arg::with_name("strategy")
                        .long("strategy")
                        .takes_value(true)
                        .possible_values(&["even", "weighted", "frontloaded", "backloaded"])
                        .help("shape of the distribution, defaults to even"),
                )
                .arg(
                    Arg::with_name("response")
                        .long("response")
                        .takes_value(true)
                        .value_name("PATH")
                        .help("read the targets from a seed response instead of a strategy"),
                ),
        )
        .subcommand(
            SubCommand::with_name("plot")
                .about("Cumulative planned and reported units as SVG")
                .arg(file)
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .value_name("PATH")
                        .default_value("melplan.svg"),
                ),
        )
}

fn init_logging(verbosity: u64) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("MELPLAN_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Exit status of the subcommand
fn run(matches: &ArgMatches) -> Result<i32> {
    match matches.subcommand() {
        ("fy", Some(sub)) => {
            let fy = FiscalYear::for_date(date_arg(sub, "DATE")?);
            println!("{}\t{}", fy, fy.range());
            Ok(0)
        }
        ("years", Some(sub)) => {
            for fy in fiscal_years_between(date_arg(sub, "START")?, date_arg(sub, "END")?) {
                println!("{}\t{}", fy, fy.range());
            }
            Ok(0)
        }
        ("months", Some(sub)) => {
            for month in months_between(date_arg(sub, "START")?, date_arg(sub, "END")?) {
                println!("{}", month);
            }
            Ok(0)
        }
        ("check", Some(sub)) => check(sub),
        ("progress", Some(sub)) => progress(sub),
        ("export", Some(sub)) => export(sub),
        ("seed", Some(sub)) => seed(sub),
        ("plot", Some(sub)) => plot(sub),
        _ => bail!("no subcommand given"),
    }
}

fn date_arg(matches: &ArgMatches, name: &str) -> Result<Date> {
    let raw = matches.value_of(name).unwrap_or_default();
    raw.parse::<Date>()
        .map_err(|e| anyhow!("{}: {}", e, e.fix_hint()))
}

/// Load the plan file, diagnostics go to stderr
fn book_arg(matches: &ArgMatches) -> Option<Book> {
    let filename = matches.value_of("FILE").unwrap_or_default();
    let mut errs = error::Record::new();
    let book = load::read_plan(filename, &mut errs);
    eprint!("{}", errs);
    book
}

fn check(matches: &ArgMatches) -> Result<i32> {
    let book = match book_arg(matches) {
        Some(book) => book,
        None => return Ok(1),
    };
    for fy in book.plan_years() {
        println!("{}", PlanTable::from(&book, fy));
    }
    let mut code = 0;
    for (plan, check) in book.checks() {
        if !check.valid {
            let target = book
                .activity(plan.activity_id())
                .map(|a| a.lifetime_target)
                .unwrap_or_default();
            println!(
                "'{}' in {} @ {}: {} planned, above its lifetime target of {}",
                plan.activity_id(),
                plan.fiscal_year(),
                plan.intervention_area_id(),
                check.sum,
                target,
            );
            code = 1;
        }
    }
    Ok(code)
}

fn progress(matches: &ArgMatches) -> Result<i32> {
    let book = match book_arg(matches) {
        Some(book) => book,
        None => return Ok(1),
    };
    let as_of = match matches.value_of("as-of") {
        Some(_) => date_arg(matches, "as-of")?,
        None => Date::today(),
    };
    let rag = matches
        .value_of("rag")
        .map(|r| r.parse::<RagStatus>().map_err(|()| anyhow!("unknown status '{}'", r)))
        .transpose()?;
    let as_of_month = MonthBucket::of(as_of);
    let rows = match matches.value_of("area") {
        Some(area) => {
            if book.area(area).is_none() {
                bail!("no intervention area '{}'", area);
            }
            book.progress_in_area(as_of_month, area)
        }
        None => book.progress(as_of_month),
    };
    let rows = rows
        .into_iter()
        .filter(|row| rag.map(|r| row.rag() == r).unwrap_or(true))
        .collect::<Vec<_>>();
    println!(" {} as of {}", book.project.name, as_of);
    println!("{}", ProgressTable::from(&rows));
    Ok(0)
}

fn export(matches: &ArgMatches) -> Result<i32> {
    let book = match book_arg(matches) {
        Some(book) => book,
        None => return Ok(1),
    };
    if !book.is_submittable() {
        eprintln!("some allocations exceed their lifetime target, run `melplan check` for details");
        return Ok(1);
    }
    let json = serde_json::to_string_pretty(&book.plans)?;
    match matches.value_of("output") {
        Some(path) => {
            std::fs::write(path, json + "\n").with_context(|| format!("writing '{}'", path))?;
            info!(path, plans = book.plans.len(), "allocations exported");
        }
        None => println!("{}", json),
    }
    Ok(0)
}

fn seed(matches: &ArgMatches) -> Result<i32> {
    let book = match book_arg(matches) {
        Some(book) => book,
        None => return Ok(1),
    };
    let activity_id = matches.value_of("activity").unwrap_or_default();
    let activity = book
        .activity(activity_id)
        .ok_or_else(|| anyhow!("no activity '{}' in {}", activity_id, book.project.name))?;
    let fiscal_year = matches
        .value_of("year")
        .unwrap_or_default()
        .parse::<FiscalYear>()?;
    let area = match matches.value_of("area") {
        Some(area) => book
            .area(area)
            .ok_or_else(|| anyhow!("no intervention area '{}'", area))?,
        None => book
            .areas
            .first()
            .ok_or_else(|| anyhow!("the plan file declares no intervention area"))?,
    };
    let skeleton = PlanAllocation::new(activity, fiscal_year, &area.id)?;
    let months = skeleton.monthly_targets().keys().copied().collect::<Vec<_>>();
    let seed = match matches.value_of("response") {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading '{}'", path))?;
            Seed::from_response(&text, activity.lifetime_target, &months)
        }
        None => {
            let strategy = matches
                .value_of("strategy")
                .map(|s| s.parse::<Strategy>().map_err(|()| anyhow!("unknown strategy '{}'", s)))
                .transpose()?
                .unwrap_or(Strategy::Even);
            Seed::from_strategy(activity.lifetime_target, &months, strategy)
        }
    };
    println!("{}", seed.to_plan_block(&activity.id, fiscal_year, &area.id));
    Ok(0)
}

fn plot(matches: &ArgMatches) -> Result<i32> {
    let book = match book_arg(matches) {
        Some(book) => book,
        None => return Ok(1),
    };
    let output = matches.value_of("output").unwrap_or("melplan.svg");
    let range = book.project.range;
    let reports = book.reports.values().collect::<Vec<_>>();
    let totals = monthly_totals(months_between(range.start(), range.end()), &book.plans, &reports);
    Plotter::from(&totals)
        .save_cumulative_plot(output)
        .with_context(|| format!("writing '{}'", output))?;
    info!(path = output, months = totals.len(), "chart saved");
    Ok(0)
}
