//! CLI for gymdesk: operator session, locale, support tickets and the
//! access kiosk.
//!
//! Session tokens live in `<state-dir>/session.json`; the locale, cached
//! user, offline roster and pending scans live in `<state-dir>/local.json`.

use clap::{Parser, Subcommand};
use gymdesk_client::{ApiClient, ClientConfig, FileStore, HttpTransport, ListState, LocaleContext};
use gymdesk_core::{Credentials, GymError, Locale, NewTicket, TicketCategory, TicketStatus};
use gymdesk_kiosk::report::{render_outcome, render_replay};
use gymdesk_kiosk::{ScanLogSink, Scanner, ScannerConfig};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;

#[derive(Parser, Debug)]
#[command(name = "gymdesk", version, about = "Gym front desk and access kiosk")]
struct Cli {
    /// Backend origin; the API prefix is appended.
    #[arg(long, global = true, env = "GYMDESK_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Where session and local state are kept.
    #[arg(long, global = true, env = "GYMDESK_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[arg(long, global = true, default_value_t = 15)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and store the session.
    Login {
        #[arg(short, long, env = "GYMDESK_EMAIL")]
        email: String,

        #[arg(short, long, env = "GYMDESK_PASSWORD")]
        password: String,
    },
    /// Drop the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Show or change the display locale.
    Locale {
        #[command(subcommand)]
        action: Option<LocaleAction>,
    },
    /// Submit one QR token, falling back to offline verification.
    Scan {
        #[arg(short, long, env = "GYMDESK_KIOSK_ID")]
        kiosk: String,

        token: String,
    },
    /// Run the kiosk: one token per stdin line, background roster sync.
    Kiosk {
        #[arg(short, long, env = "GYMDESK_KIOSK_ID")]
        kiosk: String,

        /// Access log: "ndjson" writes NDJSON to stdout,
        /// "ndjson:/path/to/file" writes to file.
        #[arg(long)]
        log: Option<String>,

        #[arg(long, default_value_t = 60)]
        sync_secs: u64,

        #[arg(long, default_value_t = 30)]
        replay_secs: u64,
    },
    /// Refresh the offline roster cache.
    Sync {
        #[arg(short, long, env = "GYMDESK_KIOSK_ID")]
        kiosk: String,
    },
    /// Resubmit scans queued while offline.
    Replay {
        #[arg(short, long, env = "GYMDESK_KIOSK_ID")]
        kiosk: String,
    },
    /// Support tickets.
    Tickets {
        #[command(subcommand)]
        action: TicketAction,
    },
    /// List leave requests.
    Leaves,
}

#[derive(Subcommand, Debug)]
enum LocaleAction {
    Get,
    Set { locale: String },
}

#[derive(Subcommand, Debug)]
enum TicketAction {
    List {
        /// OPEN, IN_PROGRESS, RESOLVED or CLOSED.
        #[arg(long)]
        status: Option<String>,
    },
    Create {
        #[arg(long)]
        subject: String,

        /// GENERAL, TECHNICAL, BILLING or SUBSCRIPTION.
        #[arg(long, default_value = "GENERAL")]
        category: String,

        #[arg(long)]
        message: String,
    },
    Reply {
        id: String,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct App {
    client: ApiClient,
    local: Arc<FileStore>,
    locale: LocaleContext,
}

impl App {
    fn open(cli: &Cli) -> Result<Self, Box<dyn std::error::Error>> {
        let state_dir = match &cli.state_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .ok_or("no local data directory; pass --state-dir")?
                .join("gymdesk"),
        };
        tracing::debug!(state_dir = %state_dir.display(), "opening state");

        let session = Arc::new(FileStore::open(state_dir.join("session.json"))?);
        let local = Arc::new(FileStore::open(state_dir.join("local.json"))?);

        let config = ClientConfig::new(cli.api_url.clone())
            .with_timeout(Duration::from_secs(cli.timeout_secs));
        let transport = Arc::new(HttpTransport::new(config)?);
        let client = ApiClient::with_stores(transport, session, local.clone());
        let locale = LocaleContext::new(local.clone());

        Ok(Self {
            client,
            local,
            locale,
        })
    }

    fn scanner(&self, kiosk_id: &str) -> Scanner {
        Scanner::new(
            self.client.clone(),
            self.local.clone(),
            ScannerConfig::new(kiosk_id),
        )
    }
}

fn open_log(target: &str) -> Result<ScanLogSink<Box<dyn Write + Send>>, Box<dyn std::error::Error>> {
    if target == "ndjson" {
        Ok(ScanLogSink::new(Box::new(std::io::stdout())))
    } else if let Some(path) = target.strip_prefix("ndjson:") {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(ScanLogSink::new(Box::new(file)))
    } else {
        Err(format!("Unknown log sink: {target}. Use 'ndjson' or 'ndjson:/path'").into())
    }
}

// ---------------------------------------------------------------------------
// Kiosk loop
// ---------------------------------------------------------------------------

async fn run_kiosk(
    app: &App,
    scanner: Arc<Scanner>,
    mut log: Option<ScanLogSink<Box<dyn Write + Send>>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let background = {
        let scanner = scanner.clone();
        tokio::spawn(async move {
            scanner
                .run_until(async {
                    let _ = stop_rx.await;
                })
                .await;
        })
    };

    let mut status = scanner.subscribe_status();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    eprintln!(
        "{} | {}",
        app.locale.t("app.title"),
        app.locale.t("kiosk.prompt")
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
            Ok(()) = status.changed() => {
                let current = *status.borrow_and_update();
                if current == gymdesk_kiosk::Connectivity::Offline {
                    eprintln!("{}", app.locale.t("kiosk.offline_banner"));
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let token = line.trim();
                if token.is_empty() {
                    continue;
                }
                match scanner.scan(token).await {
                    Ok(outcome) => {
                        let rendered = render_outcome(&outcome, &app.locale);
                        match log.as_mut() {
                            // Keep stdout clean for the NDJSON stream.
                            Some(log) => {
                                eprint!("{rendered}");
                                log.write_outcome(&scanner.config().kiosk_id, &outcome)?;
                            }
                            None => print!("{rendered}"),
                        }
                    }
                    Err(e) => eprintln!("scan failed: {e}"),
                }
            }
        }
    }

    let _ = stop_tx.send(());
    background.await?;

    if let Some(log) = log {
        let rows = log.finish()?;
        tracing::info!(rows, "access log closed");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let app = App::open(&cli)?;

    match run(&app, cli.command).await {
        Err(e) if matches!(e.downcast_ref::<GymError>(), Some(GymError::SessionExpired)) => {
            eprintln!("{}", app.locale.t("session.expired"));
            std::process::exit(2);
        }
        other => other,
    }
}

async fn run(app: &App, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Login { email, password } => {
            let login = app.client.login(&Credentials::new(email, password)).await?;
            match login.user {
                Some(user) => println!("Logged in as {} <{}>", user.full_name, user.email),
                None => println!("Logged in"),
            }
        }
        Commands::Logout => {
            app.client.logout()?;
            println!("Logged out");
        }
        Commands::Whoami => {
            let user = app.client.me().await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Commands::Locale { action } => {
            if let Some(LocaleAction::Set { locale }) = action {
                let locale = Locale::parse(&locale)
                    .ok_or_else(|| format!("Unknown locale: {locale}. Use 'en' or 'ar'"))?;
                app.locale.set_locale(locale)?;
            }
            let root = app.locale.root_attributes();
            println!("{}: {}", app.locale.t("locale.current"), app.locale.locale().code());
            println!("{}: {}", app.locale.t("locale.direction"), app.locale.direction().as_str());
            println!(
                "lang=\"{}\" dir=\"{}\" data-locale=\"{}\"",
                root.lang, root.dir, root.data_locale
            );
        }
        Commands::Scan { kiosk, token } => {
            let scanner = app.scanner(&kiosk);
            let outcome = scanner.scan(&token).await?;
            print!("{}", render_outcome(&outcome, &app.locale));
            if !scanner.queue().is_empty() {
                println!("{}: {}", app.locale.t("kiosk.pending"), scanner.queue().len());
            }
        }
        Commands::Kiosk {
            kiosk,
            log,
            sync_secs,
            replay_secs,
        } => {
            let log = log.as_deref().map(open_log).transpose()?;
            let mut config = ScannerConfig::new(kiosk);
            config.sync_interval = Duration::from_secs(sync_secs.max(1));
            config.replay_interval = Duration::from_secs(replay_secs.max(1));
            let scanner = Arc::new(Scanner::new(app.client.clone(), app.local.clone(), config));
            run_kiosk(app, scanner, log).await?;
        }
        Commands::Sync { kiosk } => {
            let scanner = app.scanner(&kiosk);
            let members = scanner.sync_roster().await?;
            println!("{}: {members}", app.locale.t("kiosk.synced"));
        }
        Commands::Replay { kiosk } => {
            let scanner = app.scanner(&kiosk);
            let summary = scanner.replay_pending().await?;
            println!("{}", render_replay(&summary, &app.locale));
        }
        Commands::Tickets { action } => match action {
            TicketAction::List { status } => {
                let status = status
                    .map(|s| {
                        TicketStatus::parse(&s).ok_or_else(|| format!("Unknown ticket status: {s}"))
                    })
                    .transpose()?;
                let state = ListState::from_result(app.client.list_tickets(status).await);
                match state.message(&app.locale, "tickets") {
                    Some(msg) => println!("{msg}"),
                    None => {
                        let fmt = app.locale.formatter();
                        for t in state.items() {
                            println!(
                                "{:<10} {:<12} {:<13} {}  {}",
                                t.id,
                                t.status.as_str(),
                                t.category.as_str(),
                                fmt.datetime(t.created_at),
                                t.subject
                            );
                        }
                    }
                }
            }
            TicketAction::Create {
                subject,
                category,
                message,
            } => {
                let category = TicketCategory::parse(&category)
                    .ok_or_else(|| format!("Unknown ticket category: {category}"))?;
                let ticket = app
                    .client
                    .create_ticket(&NewTicket {
                        subject,
                        category,
                        message,
                    })
                    .await?;
                println!("{} #{}", app.locale.t("tickets.created"), ticket.id);
            }
            TicketAction::Reply { id, message } => {
                let ticket = app.client.reply(&id, &message).await?;
                println!("{} #{}", app.locale.t("tickets.replied"), ticket.id);
                let fmt = app.locale.formatter();
                for m in &ticket.messages {
                    let who = m.sender_name.as_deref().unwrap_or("?");
                    println!("[{}] {who}: {}", fmt.datetime(m.created_at), m.message);
                }
            }
        },
        Commands::Leaves => {
            let state = ListState::from_result(app.client.list_leaves().await);
            match state.message(&app.locale, "leaves") {
                Some(msg) => println!("{msg}"),
                None => {
                    let fmt = app.locale.formatter();
                    for l in state.items() {
                        println!(
                            "{:<8} {:<12} {} - {}  {}",
                            l.user_id,
                            l.leave_type,
                            fmt.date(l.start_date),
                            fmt.date(l.end_date),
                            l.status
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
