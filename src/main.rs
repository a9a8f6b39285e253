//! keycadence - keystroke dynamics capture
//!
//! Runs a fixed number of typing rounds, then writes local JSON and HTML
//! reports and optionally posts a summary to a webhook.

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::style::Stylize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};

use keycadence::{
    anonymize::{KeyLabeler, RawCharsConsent, CONSENT_PHRASE},
    config::{Backend, Config},
    error::{CaptureError, SetupError},
    keyboard::{
        terminal::{self, StartSignal},
        DeviceQueryListener, KeyEvent, KeySource, Recorder, TerminalListener,
    },
    metrics::RoundMetrics,
    report::{deliver, ensure_writable, SessionReport},
    session::{RoundGate, Session},
    utils::format_secs,
    webhook::{WebhookNotifier, WebhookSummary},
};

#[cfg(target_os = "linux")]
use keycadence::keyboard::EvdevListener;

/// Measure typing cadence for a fixed phrase across repeated rounds
#[derive(Parser, Debug)]
#[command(name = "keycadence", version, about)]
struct Cli {
    /// Phrase to type in every round
    #[arg(long, default_value = "the quick brown fox")]
    phrase: String,

    /// Number of rounds to record
    #[arg(long, default_value_t = 3)]
    rounds: u32,

    /// Where to write the JSON report
    #[arg(long, default_value = "keystroke_report.json")]
    out_json: PathBuf,

    /// Where to write the HTML report
    #[arg(long, default_value = "keystroke_report.html")]
    out_html: PathBuf,

    /// Post a summary (never per-key data) to this webhook URL
    #[arg(long)]
    discord_webhook: Option<String>,

    /// Store raw key names instead of salted hashes (asks for consent)
    #[arg(long)]
    store_chars: bool,

    /// Capture backend, overriding the config file
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Read settings from this file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a default config file to the platform config directory and exit
    #[arg(long)]
    init_config: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Prompts on the controlling terminal between rounds
struct TerminalGate {
    abort: Arc<AtomicBool>,
}

impl RoundGate for TerminalGate {
    fn wait_for_start(
        &mut self,
        round: u32,
        session: &Session,
    ) -> Result<StartSignal, CaptureError> {
        println!();
        println!(
            "{}",
            format!("Round {}/{}", round, session.rounds_requested()).bold().cyan()
        );
        println!("Type: {}", session.phrase().bold());
        println!(
            "{}",
            "Press Enter to begin, type the phrase, then press Enter again. Esc or Ctrl+C stops."
                .dark_grey()
        );
        io::stdout().flush()?;
        Ok(terminal::wait_for_start(&self.abort)?)
    }

    fn round_finished(&mut self, metrics: &RoundMetrics) {
        println!(
            "{} {} keystrokes in {}",
            "Recorded".green(),
            metrics.keystrokes,
            format_secs(metrics.duration)
        );
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().context("failed to load config")?,
    };
    if let Some(backend) = cli.backend {
        config.capture.backend = backend;
    }
    Ok(config)
}

/// Ask for the exact consent phrase before raw key names may be stored
fn confirm_raw_chars() -> Result<RawCharsConsent, SetupError> {
    println!(
        "{}",
        "WARNING: --store-chars writes the actual keys you type into the reports.".yellow()
    );
    print!("Type '{}' to continue: ", CONSENT_PHRASE);
    let _ = io::stdout().flush();

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|_| SetupError::ConsentRefused)?;
    RawCharsConsent::confirm(&answer).ok_or(SetupError::ConsentRefused)
}

/// Build the configured key source, falling back in `auto` mode
fn build_source(
    backend: Backend,
    tx: &mpsc::Sender<KeyEvent>,
    abort: &Arc<AtomicBool>,
) -> Result<Box<dyn KeySource>, SetupError> {
    let unavailable = |e: CaptureError| SetupError::NoBackend(e.to_string());

    match backend {
        Backend::Evdev => open_evdev(tx, abort).map_err(unavailable),
        Backend::DeviceQuery => DeviceQueryListener::new(tx.clone(), abort.clone())
            .map(|l| Box::new(l) as Box<dyn KeySource>)
            .map_err(unavailable),
        Backend::Terminal => Ok(Box::new(TerminalListener::new(tx.clone(), abort.clone()))),
        Backend::Auto => {
            match open_evdev(tx, abort) {
                Ok(source) => return Ok(source),
                Err(e) => log::info!("evdev unavailable: {}", e),
            }

            let terminal = TerminalListener::new(tx.clone(), abort.clone());
            if terminal.reports_releases() {
                return Ok(Box::new(terminal));
            }

            match DeviceQueryListener::new(tx.clone(), abort.clone()) {
                Ok(listener) => Ok(Box::new(listener)),
                Err(e) => {
                    log::info!("device_query unavailable: {}", e);
                    log::warn!("falling back to terminal capture without release events");
                    Ok(Box::new(terminal))
                }
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn open_evdev(
    tx: &mpsc::Sender<KeyEvent>,
    abort: &Arc<AtomicBool>,
) -> Result<Box<dyn KeySource>, CaptureError> {
    let listener = EvdevListener::new(tx.clone(), abort.clone())?;
    log::info!("evdev: reading {} keyboard device(s)", listener.device_count());
    Ok(Box::new(listener))
}

#[cfg(not(target_os = "linux"))]
fn open_evdev(
    _tx: &mpsc::Sender<KeyEvent>,
    _abort: &Arc<AtomicBool>,
) -> Result<Box<dyn KeySource>, CaptureError> {
    Err(CaptureError::Unavailable(
        "evdev is only available on Linux".to_string(),
    ))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.init_config {
        let path = Config::default()
            .save()
            .context("failed to write default config")?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = load_config(&cli)?;

    // Setup: everything that can fail must fail before capture starts
    let labeler = if cli.store_chars {
        KeyLabeler::raw(confirm_raw_chars()?)
    } else {
        KeyLabeler::anonymized()
    };
    let mut session = Session::new(cli.phrase.clone(), cli.rounds, labeler)?;
    ensure_writable(&cli.out_json)?;
    ensure_writable(&cli.out_html)?;
    let notifier = cli
        .discord_webhook
        .as_deref()
        .map(|url| WebhookNotifier::new(url, config.webhook.format, config.webhook_timeout()))
        .transpose()?;

    let abort = Arc::new(AtomicBool::new(false));
    {
        let abort = abort.clone();
        ctrlc::set_handler(move || abort.store(true, std::sync::atomic::Ordering::SeqCst))
            .context("failed to install Ctrl+C handler")?;
    }

    let (tx, rx) = mpsc::channel::<KeyEvent>();
    let source = build_source(config.capture.backend, &tx, &abort)?;
    drop(tx);
    log::info!("capture backend: {}", source.name());

    let mut recorder = Recorder::new(source, rx, abort.clone(), config.poll_interval());
    let mut gate = TerminalGate {
        abort: abort.clone(),
    };

    println!(
        "keycadence session {} ({} key labels)",
        session.id(),
        if session.is_anonymized() { "hashed" } else { "raw" }
    );

    let aggregate = session.run(&mut recorder, &mut gate);
    if session.was_interrupted() {
        println!(
            "{}",
            format!(
                "Session stopped after {} of {} rounds.",
                session.rounds_completed(),
                session.rounds_requested()
            )
            .yellow()
        );
    }

    let report = SessionReport::new(
        &session,
        &aggregate,
        recorder.source_name(),
        config.report.include_rounds,
    );
    let summary = WebhookSummary::new(&session, &aggregate);
    let delivery = deliver(
        &report,
        &cli.out_json,
        &cli.out_html,
        config.report.html_key_prefix,
        notifier.as_ref().map(|n| (n, &summary)),
    );
    if delivery.json.is_ok() {
        println!("JSON report written to {}", cli.out_json.display());
    }
    if delivery.html.is_ok() {
        println!("HTML report written to {}", cli.out_html.display());
    }
    if let Some(Ok(())) = delivery.webhook {
        println!("Summary posted to webhook");
    }

    println!(
        "Mean interval {}, mean hold {}",
        format_secs(aggregate.inter_key_intervals.mean),
        format_secs(aggregate.key_hold_times.mean)
    );

    Ok(())
}
