#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use survey_insights::aggregate::AggregateRow;
use survey_insights::filter::{FilterSet, FilterSpec};
use survey_insights::gateway::CompletionGateway;
use survey_insights::mock;
use survey_insights::query::QueryOutcome;
use survey_insights::session::{Reply, Session};
use survey_insights::survey::{DemographicField, SurveyData};

#[derive(Parser)]
#[command(name = "survey-insights", version, about = "Survey response analytics CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic travel survey as JSON
    Generate {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 200)]
        count: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Weighted aggregates for one question, or all of them
    Aggregate {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        question: Option<String>,
        /// Demographic filter, e.g. `ageGroup=18-24,25-34` (repeatable)
        #[arg(long = "filter")]
        filters: Vec<FilterSpec>,
        #[arg(long, value_enum, default_value = "compact")]
        view: ViewArg,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Headline numbers for the (filtered) survey
    Summary {
        #[arg(long)]
        data: PathBuf,
        #[arg(long = "filter")]
        filters: Vec<FilterSpec>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Selectable values per demographic field
    Options {
        #[arg(long)]
        data: PathBuf,
    },
    /// Answer a free-text question about the survey
    ///
    /// Cross-tab and demographic-split questions are answered locally. Anything else goes to
    /// the completion endpoint configured by SURVEY_CHAT_URL unless --offline is set.
    Query {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        query: String,
        #[arg(long = "filter")]
        filters: Vec<FilterSpec>,
        #[arg(long)]
        offline: bool,
        #[arg(long, value_enum, default_value = "md")]
        format: FormatArg,
    },
    /// Print the context block the completion endpoint would receive
    Context {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long = "filter")]
        filters: Vec<FilterSpec>,
    },
}

/// CLI-facing aggregate view (clap::ValueEnum).
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ViewArg {
    /// Schema order, zero rows hidden
    Compact,
    /// All rows, highest count first
    Detailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum FormatArg {
    Md,
    Json,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregateView<'a> {
    question_id: &'a str,
    question_text: &'a str,
    multi_select: bool,
    total: u64,
    rows: Vec<&'a AggregateRow>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { out, count, seed } => {
            let survey = mock::travel_survey(count, seed);
            write_json(&out, &survey)?;
            eprintln!("wrote {} responses to {}", count, out.display());
        }
        Commands::Aggregate {
            data,
            question,
            filters,
            view,
            out,
        } => {
            let session = load_session(&data, filters)?;
            let results = match question {
                Some(id) => vec![session
                    .aggregate(&id)
                    .ok_or_else(|| format!("unknown question id: {id}"))?],
                None => session.aggregate_all(),
            };
            let views: Vec<AggregateView<'_>> = results
                .iter()
                .map(|r| AggregateView {
                    question_id: &r.question_id,
                    question_text: &r.question_text,
                    multi_select: r.multi_select,
                    total: r.total,
                    rows: match view {
                        ViewArg::Compact => r.compact(),
                        ViewArg::Detailed => r.detailed(),
                    },
                })
                .collect();
            emit_json(out.as_ref(), &views)?;
        }
        Commands::Summary { data, filters, out } => {
            let session = load_session(&data, filters)?;
            emit_json(out.as_ref(), &session.summary())?;
        }
        Commands::Options { data } => {
            let survey: SurveyData = read_json(&data)?;
            emit_json(None, &survey.filter_options())?;
        }
        Commands::Query {
            data,
            query,
            filters,
            offline,
            format,
        } => {
            let session = load_session(&data, filters)?;
            let outcome = session.resolve(&query);
            if outcome.is_resolved() || offline {
                print_outcome(&outcome, format)?;
                if !outcome.is_resolved() {
                    return Err("query not resolvable offline".into());
                }
                return Ok(());
            }

            let gateway = CompletionGateway::from_env()?;
            let reply = session.ask(&gateway, &query).await;
            match format {
                FormatArg::Md => println!("{}", reply.to_markdown()),
                FormatArg::Json => {
                    println!("{}", serde_json::to_string_pretty(&reply_json(&reply))?)
                }
            }
            if let Reply::Failed(message) = reply {
                return Err(message.into());
            }
        }
        Commands::Context {
            data,
            query,
            filters,
        } => {
            let session = load_session(&data, filters)?;
            if let Some(field) = DemographicField::detect(&query) {
                tracing::info!(field = %field, "including demographic breakdown");
            }
            println!("{}", session.survey_context(&query));
        }
    }

    Ok(())
}

fn load_session(
    data: &PathBuf,
    filters: Vec<FilterSpec>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let survey: SurveyData = read_json(data)?;
    let mut session = Session::new(survey);
    session.set_filters(filters.into_iter().collect::<FilterSet>());
    Ok(session)
}

fn print_outcome(
    outcome: &QueryOutcome,
    format: FormatArg,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        FormatArg::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        FormatArg::Md => match outcome.to_markdown() {
            Some(md) => println!("{md}"),
            None => println!("No local answer for this query."),
        },
    }
    Ok(())
}

fn reply_json(reply: &Reply) -> serde_json::Value {
    match reply {
        Reply::CrossTab(r) => serde_json::json!({ "kind": "cross_tab", "result": r }),
        Reply::DemographicSplit(r) => {
            serde_json::json!({ "kind": "demographic_split", "result": r })
        }
        Reply::Completion(text) => serde_json::json!({ "kind": "completion", "content": text }),
        Reply::Failed(text) => serde_json::json!({ "kind": "error", "content": text }),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &PathBuf,
) -> Result<T, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: serde::Serialize>(path: &PathBuf, value: &T) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, json)
}

fn emit_json<T: serde::Serialize>(out: Option<&PathBuf>, value: &T) -> Result<(), io::Error> {
    match out {
        Some(path) => write_json(path, value),
        None => {
            let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")
        }
    }
}
