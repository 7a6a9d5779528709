//! Signal CLI - Command-line interface for Support Signal
//!
//! Commands:
//! - check: Run the guardrails against a student CSV
//! - score: Score every student in a CSV (batch mode)
//! - report: Explain one student's score against a school benchmark
//! - features: Print recency-weighted raw values for one student
//! - config: Print the default scoring config

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use support_signal::explain::DEFAULT_TOP_K;
use support_signal::guardrails;
use support_signal::{
    prepare_students, ComputeError, FeatureBuilder, RawTable, ScoreComposer, ScoredSeries,
    ScoringConfig, StudentSeries, SupportEngine, TableAdapter, PRODUCER_NAME, VERSION,
};

/// Signal - transparent support signals from weekly student records
#[derive(Parser)]
#[command(name = "signal")]
#[command(version = VERSION)]
#[command(about = "Score and explain student support signals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a student CSV for protected attributes, PII and missing columns
    Check {
        /// Student CSV path (use - for stdin)
        #[arg(short, long)]
        students: PathBuf,

        /// Output the guardrail report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score every student in a CSV (batch mode)
    Score {
        /// Student CSV path (use - for stdin)
        #[arg(short, long)]
        students: PathBuf,

        /// School benchmark CSV used for calibration
        #[arg(short, long, requires = "school_id")]
        benchmarks: Option<PathBuf>,

        /// School to calibrate against
        #[arg(long, requires = "benchmarks")]
        school_id: Option<i64>,

        /// Scoring config JSON
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the check-in threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Override the recency decay rate
        #[arg(long)]
        decay_rate: Option<f64>,

        /// Only score this student
        #[arg(long)]
        student_id: Option<i64>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Explain one student's score against a school benchmark
    Report {
        /// Student CSV path (use - for stdin)
        #[arg(short, long)]
        students: PathBuf,

        /// School benchmark CSV
        #[arg(short, long)]
        benchmarks: PathBuf,

        /// Student to explain
        #[arg(long)]
        student_id: i64,

        /// School to compare against
        #[arg(long)]
        school_id: i64,

        /// Number of indicators to list
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// Scoring config JSON
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the check-in threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Print recency-weighted raw values for one student
    Features {
        /// Student CSV path (use - for stdin)
        #[arg(short, long)]
        students: PathBuf,

        /// Student to summarize
        #[arg(long)]
        student_id: i64,

        /// Recency decay rate
        #[arg(long, default_value_t = support_signal::config::DEFAULT_DECAY_RATE)]
        decay_rate: f64,
    },

    /// Print the default scoring config as JSON
    Config,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// One CSV row per student week
    Csv,
    /// JSON array of scored students
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "support_signal=info,signal=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), SignalCliError> {
    match cli.command {
        Commands::Check { students, json } => cmd_check(&students, json),

        Commands::Score {
            students,
            benchmarks,
            school_id,
            config,
            threshold,
            decay_rate,
            student_id,
            output,
            format,
        } => {
            let config = load_config(config.as_deref(), threshold, decay_rate)?;
            cmd_score(
                &students,
                benchmarks.as_deref(),
                school_id,
                &config,
                student_id,
                &output,
                format,
            )
        }

        Commands::Report {
            students,
            benchmarks,
            student_id,
            school_id,
            top_k,
            config,
            threshold,
            compact,
        } => {
            let config = load_config(config.as_deref(), threshold, None)?;
            cmd_report(
                &students,
                &benchmarks,
                student_id,
                school_id,
                top_k,
                &config,
                compact,
            )
        }

        Commands::Features {
            students,
            student_id,
            decay_rate,
        } => cmd_features(&students, student_id, decay_rate),

        Commands::Config => {
            println!("{}", ScoringConfig::default().to_json_pretty()?);
            Ok(())
        }
    }
}

fn cmd_check(students: &Path, json: bool) -> Result<(), SignalCliError> {
    let table = read_csv(students)?;
    let result = guardrails::validate_student_data(&table);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Guardrail Report");
        println!("================");
        println!("Rows:              {}", table.len());
        println!("Passed:            {}", result.passed);
        println!("Protected columns: {}", join_or_none(&result.blocked_columns));
        println!("PII columns:       {}", join_or_none(&result.pii_columns));
        println!("Missing required:  {}", join_or_none(&result.missing_required));

        if !result.notes.is_empty() {
            println!("\nNotes:");
            for note in &result.notes {
                println!("  - {}", note);
            }
        }
    }

    if result.passed {
        Ok(())
    } else {
        Err(SignalCliError::CheckFailed(
            result.columns_to_drop().len() + result.missing_required.len(),
        ))
    }
}

fn cmd_score(
    students: &Path,
    benchmarks: Option<&Path>,
    school_id: Option<i64>,
    config: &ScoringConfig,
    student_id: Option<i64>,
    output: &Path,
    format: OutputFormat,
) -> Result<(), SignalCliError> {
    let prepared = prepare_students(&read_csv(students)?)?;

    let engine = match benchmarks {
        Some(path) => Some(SupportEngine::from_table(&read_csv(path)?)?),
        None => None,
    };

    let selected: Vec<&StudentSeries> = match student_id {
        Some(id) => vec![prepared.student(id)?],
        None => prepared.series.iter().collect(),
    };

    if selected.is_empty() {
        return Err(SignalCliError::NoStudents);
    }

    let results = selected
        .into_iter()
        .map(|series| match &engine {
            Some(engine) => engine.score(series, config, school_id),
            None => ScoreComposer::score(series, config),
        })
        .collect::<Result<Vec<ScoredSeries>, ComputeError>>()?;

    tracing::info!(
        students = results.len(),
        flagged = results.iter().filter(|r| r.needs_supportive_check_in).count(),
        threshold = config.threshold,
        "scored students"
    );

    let output_data = format_output(&results, &format)?;
    write_output(output, &output_data)
}

fn cmd_report(
    students: &Path,
    benchmarks: &Path,
    student_id: i64,
    school_id: i64,
    top_k: usize,
    config: &ScoringConfig,
    compact: bool,
) -> Result<(), SignalCliError> {
    let engine = SupportEngine::from_table(&read_csv(benchmarks)?)?;
    let assessment =
        engine.assess_student(&read_csv(students)?, config, student_id, school_id, top_k)?;

    if compact {
        println!("{}", assessment.report.to_json()?);
    } else {
        println!("{}", assessment.report.to_json_pretty()?);
    }

    Ok(())
}

fn cmd_features(students: &Path, student_id: i64, decay_rate: f64) -> Result<(), SignalCliError> {
    let prepared = prepare_students(&read_csv(students)?)?;
    let features = FeatureBuilder::build(prepared.student(student_id)?, decay_rate)?;

    println!("{}", serde_json::to_string_pretty(&features)?);
    Ok(())
}

fn load_config(
    path: Option<&Path>,
    threshold: Option<f64>,
    decay_rate: Option<f64>,
) -> Result<ScoringConfig, SignalCliError> {
    let mut config = match path {
        Some(path) => ScoringConfig::from_json(&fs::read_to_string(path)?)?,
        None => ScoringConfig::default(),
    };

    if let Some(threshold) = threshold {
        config.threshold = threshold;
    }
    if let Some(decay_rate) = decay_rate {
        config.decay_rate = decay_rate;
    }

    config.validate()?;
    Ok(config)
}

fn read_csv(path: &Path) -> Result<RawTable, SignalCliError> {
    let input: Box<dyn Read> = if path.to_string_lossy() == "-" {
        Box::new(io::stdin())
    } else {
        Box::new(fs::File::open(path)?)
    };

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }

    Ok(RawTable::new(columns, rows)?)
}

fn format_output(results: &[ScoredSeries], format: &OutputFormat) -> Result<String, SignalCliError> {
    match format {
        OutputFormat::Csv => {
            let table = TableAdapter::scored_table(results)?;
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(table.columns())?;
            for row in table.rows() {
                writer.write_record(row)?;
            }
            let bytes = writer.into_inner().map_err(|e| e.into_error())?;
            String::from_utf8(bytes).map_err(|e| SignalCliError::Output(e.to_string()))
        }
        OutputFormat::Json => Ok(serde_json::to_string(results)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(results)? + "\n"),
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), SignalCliError> {
    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(data.as_bytes())?;
        stdout.flush()?;
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

// Error types

#[derive(Debug)]
enum SignalCliError {
    Io(io::Error),
    Csv(csv::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    CheckFailed(usize),
    NoStudents,
    Output(String),
}

impl From<io::Error> for SignalCliError {
    fn from(e: io::Error) -> Self {
        SignalCliError::Io(e)
    }
}

impl From<csv::Error> for SignalCliError {
    fn from(e: csv::Error) -> Self {
        SignalCliError::Csv(e)
    }
}

impl From<ComputeError> for SignalCliError {
    fn from(e: ComputeError) -> Self {
        SignalCliError::Compute(e)
    }
}

impl From<serde_json::Error> for SignalCliError {
    fn from(e: serde_json::Error) -> Self {
        SignalCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
    producer: String,
}

impl CliError {
    fn new(code: &str, message: String, hint: Option<&str>) -> Self {
        CliError {
            code: code.to_string(),
            message,
            hint: hint.map(str::to_string),
            producer: PRODUCER_NAME.to_string(),
        }
    }
}

impl From<SignalCliError> for CliError {
    fn from(e: SignalCliError) -> Self {
        match e {
            SignalCliError::Io(e) => {
                CliError::new("IO_ERROR", e.to_string(), Some("Check file paths and permissions"))
            }
            SignalCliError::Csv(e) => CliError::new(
                "CSV_ERROR",
                e.to_string(),
                Some("Ensure the file is comma-separated with a header row"),
            ),
            SignalCliError::Compute(e) => compute_error(e),
            SignalCliError::Json(e) => {
                CliError::new("JSON_ERROR", e.to_string(), Some("Check JSON syntax"))
            }
            SignalCliError::CheckFailed(count) => CliError::new(
                "CHECK_FAILED",
                format!("{} columns failed the guardrails", count),
                Some("Remove protected/PII columns and add the missing required columns"),
            ),
            SignalCliError::NoStudents => CliError::new(
                "NO_STUDENTS",
                "No student rows found in input".to_string(),
                Some("Ensure the student file is not empty"),
            ),
            SignalCliError::Output(msg) => CliError::new("OUTPUT_ERROR", msg, None),
        }
    }
}

fn compute_error(e: ComputeError) -> CliError {
    let (code, hint) = match &e {
        ComputeError::MissingColumns { .. } => {
            ("MISSING_COLUMNS", Some("Run 'signal check' for details"))
        }
        ComputeError::InvalidWeights(_) | ComputeError::InvalidConfig(_) => {
            ("INVALID_CONFIG", Some("Run 'signal config' to see a valid config"))
        }
        ComputeError::SchoolNotFound(_) | ComputeError::DuplicateSchool(_) => {
            ("BENCHMARK_ERROR", Some("Check school_id against the benchmark file"))
        }
        ComputeError::StudentNotFound(_) => {
            ("STUDENT_NOT_FOUND", Some("Check student_id against the student file"))
        }
        _ => ("PARSE_ERROR", Some("Check the input file contents")),
    };
    CliError::new(code, e.to_string(), hint)
}
