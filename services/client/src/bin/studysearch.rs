//! services/client/src/bin/studysearch.rs

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use client_lib::{
    adapters::{FileCredentialStore, HttpBackend},
    config::Config,
    error::ClientError,
    session::SessionStore,
    views::{
        admin::AdminDashboard,
        evaluation::{metric_rows, EvaluationView},
        login::LoginView,
        settings::SettingsView,
        signup::SignUpView,
        workspace::{UploadStatus, WorkspaceView},
        AppState, Route, Shell,
    },
};
use studysearch_core::domain::{
    EvaluationMetrics, Message, MessageRole, PdfUpload, SessionState, Tone,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "studysearch", version, about = "Ask questions about your PDFs from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the session.
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account.
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        confirm_password: Option<String>,
    },
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// List indexed documents.
    Docs {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        title: Option<String>,
    },
    /// Upload a PDF for indexing.
    Upload {
        path: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    /// Ask a single question about a document.
    Ask {
        question: String,
        /// Document id or title; defaults to the first document.
        #[arg(long)]
        document: Option<String>,
    },
    /// Interactive conversation about a document.
    Chat {
        #[arg(long)]
        document: Option<String>,
    },
    Preferences {
        #[command(subcommand)]
        action: PreferencesAction,
    },
    /// Score question/answer pairs with RAGAS.
    Evaluate {
        #[arg(long = "pair", value_name = "QUESTION::ANSWER", required = true)]
        pairs: Vec<String>,
    },
    /// Show stored evaluation metrics.
    EvalMetrics,
    /// Super admin dashboard.
    Admin,
}

#[derive(Subcommand)]
enum PreferencesAction {
    Show,
    Set {
        #[arg(long)]
        name: Option<String>,
        /// academic, friendly, concise or detailed
        #[arg(long)]
        tone: Option<String>,
    },
}

impl Command {
    /// The screen a command belongs to, or `None` for session commands.
    fn route(&self) -> Option<Route> {
        match self {
            Command::Login { .. } => Some(Route::Login),
            Command::Signup { .. } => Some(Route::SignUp),
            Command::Logout | Command::Whoami => None,
            Command::Docs { .. }
            | Command::Upload { .. }
            | Command::Ask { .. }
            | Command::Chat { .. } => Some(Route::Documents),
            Command::Preferences { .. } => Some(Route::Settings),
            Command::Evaluate { .. } | Command::EvalMetrics => Some(Route::Evaluation),
            Command::Admin => Some(Route::Admin),
        }
    }
}

/// Line input from stdin for password prompts and the chat loop.
struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// `None` at end of input.
    async fn ask(&mut self, label: &str) -> Result<Option<String>, ClientError> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(label.as_bytes()).await?;
        stdout.flush().await?;
        Ok(self.lines.next_line().await?)
    }

    /// Reads a password without echo when stdin is a terminal. Piped input is
    /// read as a plain line.
    async fn secret(&mut self, label: &str) -> Result<Option<String>, ClientError> {
        if !std::io::stdin().is_terminal() {
            return self.ask(label).await;
        }
        let label = label.to_string();
        let password = tokio::task::spawn_blocking(move || rpassword::prompt_password(label))
            .await
            .map_err(std::io::Error::other)??;
        Ok(Some(password))
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, ClientError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    debug!("Configuration loaded, backend at {}", config.base_url);

    // --- 2. Restore the Session & Build the Backend ---
    let storage = Arc::new(FileCredentialStore::new(&config.state_dir));
    let session = Arc::new(SessionStore::hydrate(storage));
    let backend = Arc::new(HttpBackend::new(
        config.base_url.clone(),
        session.clone(),
        config.refresh_policy,
    )?);
    let state = AppState::with_backend(config.clone(), session.clone(), backend);
    let mut shell = Shell::new(session);

    // --- 3. Gate the Command by Session and Role ---
    if let Some(requested) = cli.command.route() {
        let resolved = shell.navigate(requested);
        if resolved != requested {
            eprintln!("{}", redirect_message(requested, resolved));
            return Ok(ExitCode::FAILURE);
        }
    }

    // --- 4. Run It ---
    let mut prompt = Prompt::new();
    let protected = cli.command.route().is_some_and(|r| !r.is_public());
    let code = run(cli.command, &state, &mut shell, &mut prompt).await?;

    if protected && shell.sync() == Route::Login {
        eprintln!("Session expired, please log in again.");
        return Ok(ExitCode::FAILURE);
    }
    Ok(code)
}

fn redirect_message(requested: Route, resolved: Route) -> &'static str {
    if requested.is_public() {
        "You are already logged in."
    } else if resolved == Route::Login {
        "Please log in first: studysearch login --email <email>"
    } else if resolved == Route::Admin {
        "This command is not available to admin accounts."
    } else {
        "This command is only available to admin accounts."
    }
}

async fn run(
    command: Command,
    state: &AppState,
    shell: &mut Shell,
    prompt: &mut Prompt,
) -> Result<ExitCode, ClientError> {
    match command {
        Command::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt.secret("Password: ").await?.unwrap_or_default(),
            };
            let mut view = LoginView::new(email, password);
            match view.submit(state).await {
                Some(route) => {
                    shell.navigate(route);
                    print_greeting(shell);
                    Ok(ExitCode::SUCCESS)
                }
                None => fail(view.error.as_deref()),
            }
        }

        Command::Signup {
            email,
            first_name,
            last_name,
            password,
            confirm_password,
        } => {
            let password = match password {
                Some(p) => p,
                None => prompt.secret("Password: ").await?.unwrap_or_default(),
            };
            let confirm_password = match confirm_password {
                Some(p) => p,
                None => prompt.secret("Confirm password: ").await?.unwrap_or_default(),
            };
            let mut view = SignUpView {
                email: email.clone(),
                first_name,
                last_name,
                password,
                confirm_password,
                ..SignUpView::default()
            };
            match view.submit(state).await {
                Some(_) => {
                    println!("Account created. Log in with: studysearch login --email {}", email);
                    Ok(ExitCode::SUCCESS)
                }
                None => fail(view.error.as_deref()),
            }
        }

        Command::Logout => {
            shell.logout(state.auth.as_ref()).await;
            println!("Logged out.");
            Ok(ExitCode::SUCCESS)
        }

        Command::Whoami => {
            match state.session.current() {
                Some(session) => {
                    print_greeting(shell);
                    println!("{} ({})", session.user.email, session.user.role_name);
                    let nav: Vec<&str> = shell.nav_items().iter().map(Route::label).collect();
                    println!("Screens: {}", nav.join(", "));
                }
                None => println!("Not logged in."),
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Docs { page, title } => {
            let mut view = WorkspaceView::new();
            view.listing.title_filter = title.unwrap_or_default();
            view.open_page(state, page).await;
            if let Some(error) = &view.listing.error {
                return fail(Some(error));
            }
            print_listing(&view);
            Ok(ExitCode::SUCCESS)
        }

        Command::Upload { path, title } => {
            let upload = read_upload(&path, title).await?;
            let mut view = WorkspaceView::new();
            view.upload(state, &upload).await;
            match &view.upload {
                UploadStatus::Succeeded(message) => {
                    println!("{}", message);
                    print_listing(&view);
                    Ok(ExitCode::SUCCESS)
                }
                UploadStatus::Failed(message) => fail(Some(message)),
                UploadStatus::Idle | UploadStatus::InFlight => fail(None),
            }
        }

        Command::Ask { question, document } => {
            let mut view = WorkspaceView::new();
            if let Err(message) = choose_document(&mut view, state, document.as_deref()).await {
                return fail(Some(&message));
            }
            if !view.submit_query(state, &question).await {
                return fail(Some("A question is required."));
            }
            if let Some(reply) = view.messages().last() {
                print_message(reply);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Chat { document } => {
            let mut view = WorkspaceView::new();
            if let Err(message) = choose_document(&mut view, state, document.as_deref()).await {
                return fail(Some(&message));
            }
            chat(&mut view, state, prompt).await?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Preferences { action } => {
            let mut view = SettingsView::default();
            view.load(state).await;
            match action {
                PreferencesAction::Show => {
                    print_preferences(&view);
                    Ok(ExitCode::SUCCESS)
                }
                PreferencesAction::Set { name, tone } => {
                    if let Some(name) = name {
                        view.set_name(&name);
                    }
                    if let Some(tone) = tone {
                        let Some(tone) = Tone::parse(&tone) else {
                            let known: Vec<&str> = Tone::ALL.iter().map(Tone::as_str).collect();
                            return Err(ClientError::Usage(format!(
                                "unknown tone '{}', expected one of: {}",
                                tone,
                                known.join(", ")
                            )));
                        };
                        view.set_tone(tone);
                    }
                    let saved = view.save(state).await;
                    if let Some(banner) = &view.banner {
                        if banner.is_error() {
                            eprintln!("{}", banner.message);
                        } else {
                            println!("{}", banner.message);
                        }
                    }
                    if saved {
                        print_preferences(&view);
                        Ok(ExitCode::SUCCESS)
                    } else {
                        Ok(ExitCode::FAILURE)
                    }
                }
            }
        }

        Command::Evaluate { pairs } => {
            let mut view = EvaluationView::new();
            for (index, raw) in pairs.iter().enumerate() {
                let (question, answer) = raw.split_once("::").ok_or_else(|| {
                    ClientError::Usage(format!("'{}' is not in QUESTION::ANSWER form", raw))
                })?;
                if index > 0 {
                    view.add_pair();
                }
                view.update_pair(index, question, answer);
            }
            if !view.run(state).await {
                return fail(view.error.as_deref());
            }
            if let Some(report) = &view.report {
                if let Some(message) = &report.message {
                    println!("{}", message);
                }
                print_metrics(&report.metrics);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::EvalMetrics => {
            let mut view = EvaluationView::new();
            view.load_metrics(state).await;
            print_metrics(&view.stored_metrics.unwrap_or_default());
            Ok(ExitCode::SUCCESS)
        }

        Command::Admin => {
            let mut dashboard = AdminDashboard::default();
            dashboard.load(state).await;
            print_dashboard(&dashboard);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn fail(message: Option<&str>) -> Result<ExitCode, ClientError> {
    eprintln!("{}", message.unwrap_or("Something went wrong."));
    Ok(ExitCode::FAILURE)
}

async fn read_upload(path: &Path, title: Option<String>) -> Result<PdfUpload, ClientError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(PdfUpload {
        file_name,
        title,
        content_type,
        bytes: bytes.into(),
    })
}

/// Selects the document with the exact id or title given, or the selector's first entry.
async fn choose_document(
    view: &mut WorkspaceView,
    state: &AppState,
    wanted: Option<&str>,
) -> Result<(), String> {
    let Some(wanted) = wanted else {
        view.refresh_selector(state).await;
        return match &view.selector.selected {
            Some(document) => {
                info!("Using document {}", document.title);
                Ok(())
            }
            None => Err("No documents yet. Upload one with: studysearch upload <file.pdf>".into()),
        };
    };

    if view.choose_document(state, wanted).await {
        Ok(())
    } else {
        Err(format!("No document matches '{}'", wanted))
    }
}

async fn chat(
    view: &mut WorkspaceView,
    state: &AppState,
    prompt: &mut Prompt,
) -> Result<(), ClientError> {
    if let Some(document) = &view.selector.selected {
        println!(
            "Chatting about \"{}\". Commands: /new, /history, /open <n>, /quit",
            document.title
        );
    }
    while let Some(line) = prompt.ask("> ").await? {
        let line = line.trim();
        match line.split_once(' ').map_or((line, ""), |(c, rest)| (c, rest.trim())) {
            ("/quit", _) => break,
            ("/new", _) => {
                view.new_conversation();
                println!("Started a new conversation.");
            }
            ("/history", _) => {
                if view.history.is_empty() {
                    println!("No conversations yet.");
                }
                for (index, conversation) in view.history.iter().enumerate() {
                    println!(
                        "{:>2}. {} [{}] ({} messages)",
                        index + 1,
                        conversation.title,
                        conversation.document_title,
                        conversation.messages.len()
                    );
                }
            }
            ("/open", arg) => match arg.parse::<usize>() {
                Ok(n) if n >= 1 && view.open_conversation(n - 1) => {
                    for message in view.messages() {
                        print_message(message);
                    }
                }
                _ => println!("Usage: /open <n>, see /history"),
            },
            ("", _) => {}
            _ => {
                if view.submit_query(state, line).await {
                    if let Some(reply) = view.messages().last() {
                        print_message(reply);
                    }
                }
                if state.session.state() == SessionState::Anonymous {
                    break;
                }
            }
        }
    }
    Ok(())
}

//=========================================================================================
// Output
//=========================================================================================

fn print_greeting(shell: &Shell) {
    if let Some(greeting) = shell.greeting() {
        if shell.shows_admin_badge() {
            println!("{} [Admin]", greeting);
        } else {
            println!("{}", greeting);
        }
    }
}

fn print_listing(view: &WorkspaceView) {
    let listing = &view.listing;
    if listing.documents.is_empty() {
        println!("No documents found.");
    }
    for document in &listing.documents {
        println!(
            "{:<8} {:<40} {:<12} {}",
            document.id,
            document.title,
            document.status.as_deref().unwrap_or("-"),
            document.created_at.as_deref().unwrap_or("N/A")
        );
    }
    if let Some(info) = listing.page_info {
        let mut footer = format!("Page {} ({} documents)", info.page, info.total_count);
        if listing.can_go_previous() {
            footer.push_str(&format!("  previous: --page {}", info.page.saturating_sub(1)));
        }
        if listing.can_go_next() {
            footer.push_str(&format!("  next: --page {}", info.page + 1));
        }
        println!("{}", footer);
    }
}

fn print_message(message: &Message) {
    let speaker = match message.role {
        MessageRole::User => "You",
        MessageRole::Assistant => "StudySearch",
    };
    println!("{}: {}", speaker, message.content);
    for (index, citation) in message.citations.iter().enumerate() {
        match &citation.page {
            Some(page) => println!("  [{}] (p. {}) {}", index + 1, page, citation.text),
            None => println!("  [{}] {}", index + 1, citation.text),
        }
    }
}

fn print_preferences(view: &SettingsView) {
    let name = if view.preferences.name.is_empty() {
        "(not set)"
    } else {
        view.preferences.name.as_str()
    };
    println!("Name: {}", name);
    println!(
        "Tone: {} ({})",
        view.preferences.tone.as_str(),
        view.preferences.tone.description()
    );
}

fn print_metrics(metrics: &EvaluationMetrics) {
    for row in metric_rows(metrics) {
        println!(
            "{:<13} {:>5.1}%  {}",
            row.label,
            row.score * 100.0,
            if row.meets_target { "meets target" } else { "below target" }
        );
    }
}

fn print_dashboard(dashboard: &AdminDashboard) {
    for card in dashboard.cards() {
        println!("{:<18} {}", card.label, card.value);
    }
    println!();
    println!("All document stores:");
    if dashboard.stores.is_empty() {
        println!("  No stores found");
    }
    for store in &dashboard.stores {
        println!(
            "  {:<40} {:<24} {}",
            store.title,
            store.created_at.as_deref().unwrap_or("N/A"),
            store.status.as_deref().unwrap_or("Active")
        );
    }
    println!();
    println!("Users:");
    if dashboard.users.is_empty() {
        println!("  No users found");
    }
    for user in &dashboard.users {
        println!(
            "  {:<8} {:<32} {:<24} {}",
            user.user_id,
            user.email.as_deref().unwrap_or("-"),
            user.full_name.as_deref().unwrap_or("-"),
            user.role_name.as_deref().unwrap_or("-")
        );
    }
}
