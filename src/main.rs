use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use svc_retry::exception::clock_skew::{compute_clock_skew, is_clock_skewed, parse_rfc1123};
use svc_retry::exception::{ErrorDetails, ServiceException};
use svc_retry::http::{SdkHttpResponse, DATE_HEADER};
use svc_retry::logging::{init_logging, LoggingConfig};
use svc_retry::retry::{GiveUpReason, RetryDecision};
use svc_retry::settings::RetryConfig;

#[derive(Parser, Debug)]
#[command(name = "svc-retry")]
#[command(version)]
#[command(about = "Classify service errors and decide whether to retry them")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Retry configuration file (TOML)
    #[arg(long, short, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a failed service response
    Classify(ClassifyArgs),
    /// Show the offset between the local clock and a server Date header
    Skew {
        /// Server Date header (RFC 1123)
        #[arg(long)]
        date: String,
    },
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    /// HTTP status code
    #[arg(long, short)]
    status: u16,

    /// Service error code
    #[arg(long, default_value = "")]
    code: String,

    /// Service error message
    #[arg(long, default_value = "")]
    message: String,

    /// Service name
    #[arg(long, default_value = "")]
    service: String,

    /// Request id
    #[arg(long)]
    request_id: Option<String>,

    /// Extended request id
    #[arg(long)]
    extended_request_id: Option<String>,

    /// Server Date header (RFC 1123)
    #[arg(long)]
    date: Option<String>,

    /// Client clock offset in seconds (client minus server)
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    skew_secs: i64,

    /// Number of the attempt that failed (1-based)
    #[arg(long, default_value = "1")]
    attempt: u32,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize, Debug)]
struct ClassificationReport {
    message: String,
    classification: String,
    throttling: bool,
    retryable: bool,
    clock_skew: bool,
    decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_clock_skew_secs: Option<i64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(LoggingConfig::from_verbosity(cli.verbose));

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => RetryConfig::load(path)?,
        None => RetryConfig::default(),
    };

    match cli.command {
        Commands::Classify(args) => classify(&config, args),
        Commands::Skew { date } => skew(&config, &date),
    }
}

fn classify(
    config: &RetryConfig,
    args: ClassifyArgs,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut response = SdkHttpResponse::builder().status_code(args.status);
    if let Some(date) = &args.date {
        response = response.put_header(DATE_HEADER, date.as_str());
    }

    let details = ErrorDetails::builder()
        .error_code(args.code)
        .error_message(args.message)
        .service_name(args.service)
        .sdk_http_response(response.build()?)
        .build();

    let mut builder = ServiceException::builder()
        .error_details(details)
        .status_code(args.status)
        .clock_skew(chrono::Duration::seconds(args.skew_secs))
        .clock_skew_policy(config.clock_skew_policy());
    if let Some(request_id) = args.request_id {
        builder = builder.request_id(request_id);
    }
    if let Some(extended_request_id) = args.extended_request_id {
        builder = builder.extended_request_id(extended_request_id);
    }
    let exception = builder.build()?;

    let now = Utc::now();
    let decision = config.retry_strategy().decide_at(args.attempt, &exception, now);
    let (decision_name, new_clock_skew_secs) = match decision {
        RetryDecision::Retry { .. } => ("retry", None),
        RetryDecision::RetryWithClockSkew { clock_skew, .. } => {
            ("retry-with-clock-skew", Some(clock_skew.num_seconds()))
        }
        RetryDecision::DoNotRetry(GiveUpReason::NotRetryable) => ("not-retryable", None),
        RetryDecision::DoNotRetry(GiveUpReason::AttemptsExhausted) => ("attempts-exhausted", None),
    };

    let report = ClassificationReport {
        message: exception.message(),
        classification: exception.classification_at(now).to_string(),
        throttling: exception.is_throttling_exception(),
        retryable: exception.retryable(),
        clock_skew: exception.is_clock_skew_exception_at(now),
        decision: decision_name,
        delay_ms: decision.delay().map(|delay| delay.as_millis() as u64),
        new_clock_skew_secs,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("message:        {}", report.message);
        println!("classification: {}", report.classification);
        println!("throttling:     {}", report.throttling);
        println!("retryable:      {}", report.retryable);
        println!("clock skew:     {}", report.clock_skew);
        match (report.delay_ms, report.new_clock_skew_secs) {
            (Some(delay), Some(skew)) => println!(
                "decision:       {} after {}ms (new clock skew {}s)",
                report.decision, delay, skew
            ),
            (Some(delay), None) => {
                println!("decision:       {} after {}ms", report.decision, delay)
            }
            _ => println!("decision:       {}", report.decision),
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn skew(config: &RetryConfig, date: &str) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let Some(server_time) = parse_rfc1123(date) else {
        eprintln!("Error: not an RFC 1123 date: {}", date);
        return Ok(ExitCode::from(2));
    };

    let now = Utc::now();
    let threshold = config.clock_skew_policy().threshold();
    let offset = compute_clock_skew(now, server_time);
    println!("clock skew: {}s", offset.num_seconds());
    println!("skewed:     {}", is_clock_skewed(now, server_time, threshold));

    Ok(ExitCode::SUCCESS)
}
