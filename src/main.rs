use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use osintradar::automation::store::AutomationStore;
use osintradar::config::Config;
use osintradar::core::filter::TimeRange;
use osintradar::core::pipeline::{run_pipeline, Pipeline, PipelineInput, PipelineOutput};
use osintradar::core::source::EventSource;
use osintradar::core::{Event, Severity};
use osintradar::export::{export_filtered, ExportConfig, ExportFormat};
use osintradar::signals::{Analysis, SignalEngine};
use osintradar::webhook::{test_payload, WebhookClient};

/// OSINT Radar - score geopolitical events and drive webhook automations
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// JSON event file (overrides `[events] path`; built-in sample set when neither is set)
    #[arg(short, long)]
    events: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score the filtered events once and print the analysis
    Analyze {
        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a report to the export directory
    Export {
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// 24h, 7d, 30d or all
        #[arg(long, default_value = "24h")]
        time_range: TimeRange,
        /// Country to include (repeatable; all when omitted)
        #[arg(long = "region")]
        regions: Vec<String>,
        /// Severity to include (repeatable)
        #[arg(long = "severity", default_values_t = [Severity::Critical, Severity::High])]
        severities: Vec<Severity>,
        #[arg(long)]
        no_analytics: bool,
        #[arg(long)]
        no_threat_assessment: bool,
        #[arg(long)]
        no_predictions: bool,
        /// Output directory (overrides `[export] output_dir`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rescore on an interval and deliver automation webhooks until Ctrl-C
    Watch,
    /// Send the test payload to one webhook, or to all of them
    TestWebhook {
        /// Webhook id
        id: Option<String>,
    },
}

/// Log subscriber writing to `writer`. Stdout is kept for command output.
fn log_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("osintradar=info".parse().unwrap()),
        )
        .finish()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    log_subscriber(std::io::stderr).init();

    let args = Args::parse();
    let config = Config::load(&args.config);
    tracing::debug!("Config: {:?}", config);

    let events_path = args.events.as_deref().or(config.events.path.as_deref());
    let source = EventSource::from_path(events_path);

    match args.command {
        Command::Analyze { json } => analyze(&config, &source, json),
        Command::Export {
            format,
            time_range,
            regions,
            severities,
            no_analytics,
            no_threat_assessment,
            no_predictions,
            output,
        } => {
            let export_config = ExportConfig {
                format,
                include_analytics: !no_analytics,
                include_threat_assessment: !no_threat_assessment,
                include_predictions: !no_predictions,
                time_range,
                regions,
                severity_levels: severities,
            };
            let dir = output.unwrap_or_else(|| PathBuf::from(&config.export.output_dir));
            export(&config, &source, &export_config, dir)
        }
        Command::Watch => watch(config, source).await,
        Command::TestWebhook { id } => test_webhook(&config, id.as_deref()).await,
    }
}

fn load_events(source: &EventSource) -> Result<Vec<Event>> {
    source
        .load(Utc::now())
        .with_context(|| format!("loading events from {source:?}"))
}

fn analyze(config: &Config, source: &EventSource, json: bool) -> Result<()> {
    let now = Utc::now();
    let events = load_events(source)?;
    let filtered = config.filters.apply(&events, now);
    let engine = SignalEngine::new(config.signals.alert_thresholds.clone());
    let analysis = engine.analyze(&filtered, now);

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }
    print_summary(&analysis);

    let store = AutomationStore::from_config(&config.automation, now)
        .context("building automation rules")?;
    for rule in store.rules() {
        let matched = rule.evaluate(&filtered);
        println!("rule {:<36} {} matching events", rule.name, matched.len());
    }
    Ok(())
}

fn print_summary(analysis: &Analysis) {
    let threat = &analysis.threat;
    println!(
        "{} events | overall risk {:.1} | {} critical, {} emerging",
        analysis.event_count, threat.overall_risk, threat.critical_threats, threat.emerging_threats
    );
    println!(
        "sentiment {:.0}% negative, {:.0}% positive ({:?})",
        analysis.sentiment.negative, analysis.sentiment.positive, analysis.sentiment.trend
    );
    for scored in &analysis.scored {
        println!(
            "{} {:>5.1}  {:<12} {}",
            scored.risk_level.emoji(),
            scored.threat_score,
            scored.event.location.country,
            scored.event.title
        );
    }
    for region in &threat.regional_risks {
        println!(
            "region {:<16} risk {:>5.1}  threats {}  [{}]",
            region.region,
            region.risk_score,
            region.threat_count,
            region.primary_threats.join(", ")
        );
    }
    for prediction in &analysis.predictions {
        println!(
            "predict {:<24} {:>3.0}%  {}  {}",
            prediction.id, prediction.confidence, prediction.timeframe, prediction.description
        );
    }
    for trend in &analysis.trends {
        println!(
            "trend {:<10} {:?} {:.0}%  {}",
            trend.category, trend.trend, trend.change_rate, trend.prediction
        );
    }
}

fn export(config: &Config, source: &EventSource, export_config: &ExportConfig, dir: PathBuf) -> Result<()> {
    let events = load_events(source)?;
    let engine = SignalEngine::new(config.signals.alert_thresholds.clone());
    let path = export_filtered(&config.filters, export_config, &events, &engine, &dir, Utc::now())
        .with_context(|| format!("exporting {} report", export_config.format))?;
    println!("{}", path.display());
    Ok(())
}

async fn watch(config: Config, source: EventSource) -> Result<()> {
    let store = AutomationStore::from_config(&config.automation, Utc::now())
        .context("building automation rules")?;
    if store.webhooks().is_empty() {
        tracing::warn!("No webhooks configured, watch will only score and notify");
    }

    // Delivery tasks → pipeline
    let (report_tx, report_rx) = mpsc::channel(64);
    // Frontend → pipeline
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    // Pipeline → frontend
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();

    let pipeline = Pipeline::new(&config, store, Some(source), report_tx)
        .context("creating webhook client")?;
    let period = Duration::from_secs(config.events.rescan_interval_secs.max(1));
    let handle = tokio::spawn(run_pipeline(pipeline, in_rx, report_rx, out_tx, period));

    let shutdown_tx = in_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
            let _ = shutdown_tx.send(PipelineInput::Shutdown);
        }
    });

    while let Some(output) = out_rx.recv().await {
        match output {
            PipelineOutput::Pass(summary) => {
                let threat = &summary.analysis.threat;
                println!(
                    "{} pass: {} events, overall risk {:.1}, {} critical, {} rule deliveries, {} pattern alerts",
                    summary.analysis.generated_at.format("%H:%M:%S"),
                    summary.analysis.event_count,
                    threat.overall_risk,
                    threat.critical_threats,
                    summary.rules_fired,
                    summary.pattern_alerts
                );
            }
            PipelineOutput::Delivery(report) => match &report.error {
                None => println!(
                    "delivered to {} ({}ms)",
                    report.webhook_name, report.elapsed_ms
                ),
                Some(e) => println!("delivery to {} failed: {e}", report.webhook_name),
            },
        }
    }
    drop(in_tx);

    let pipeline = handle.await.context("pipeline task panicked")?;
    let metrics = pipeline.store().metrics(Utc::now());
    tracing::info!(
        "Session: {} deliveries, {:.1}% success, {:.0}ms average",
        pipeline.store().triggers().len(),
        metrics.success_rate,
        metrics.avg_response_time
    );
    Ok(())
}

async fn test_webhook(config: &Config, id: Option<&str>) -> Result<()> {
    let store = AutomationStore::from_config(&config.automation, Utc::now())
        .context("building automation rules")?;
    let targets: Vec<_> = match id {
        Some(id) => vec![store
            .webhook(id)
            .with_context(|| format!("no webhook with id {id}"))?],
        None => store.webhooks().iter().collect(),
    };
    if targets.is_empty() {
        bail!("no webhooks configured");
    }

    let client = WebhookClient::new(&config.webhook).context("creating webhook client")?;
    let mut failures = 0;
    for webhook in targets {
        match client.deliver(webhook, &test_payload(Utc::now())).await {
            Ok(receipt) => println!(
                "✓ {} answered {} in {}ms",
                webhook.name, receipt.status, receipt.elapsed_ms
            ),
            Err(e) => {
                failures += 1;
                println!("✗ {}: {e}", webhook.name);
            }
        }
    }
    if failures > 0 {
        bail!("{failures} webhook test(s) failed");
    }
    Ok(())
}
