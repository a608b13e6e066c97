use std::process::ExitCode;
use std::sync::Arc;

use carotaj::chat::{ChatSessionController, Role, SendOutcome, SendRejection};
use carotaj::config::{ConfigError, SiteConfig};
use carotaj::lead::{LeadError, LeadField, LeadFormController, Refusal, SubmitOutcome};
use carotaj::llm::LlmClient;
use carotaj::llm::types::LlmError;
use carotaj::site;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("lead transport setup failed: {0}")]
    Lead(#[from] LeadError),
    #[error("LLM client setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error("unknown service '{0}'; run `carotaj services` for the list")]
    UnknownService(String),
    #[error("required field `{0}` is empty")]
    MissingField(&'static str),
    #[error("the lead could not be submitted; please retry or call {}", site::PHONE_NUMBER)]
    SubmissionFailed,
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "carotaj", about = "Carotaj Pro quote form and technical consultant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit one quote request.
    Lead(LeadArgs),
    /// Talk to the technical consultant.
    Chat,
    /// List selectable services.
    Services,
}

#[derive(Args, Debug)]
struct LeadArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: String,
    #[arg(long, default_value = "carotaj")]
    service: String,
    #[arg(long)]
    message: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Services => {
            for service in site::SERVICES {
                println!("{:<12} {}", service.id, service.label);
            }
            Ok(())
        }
        Command::Lead(args) => {
            let config = SiteConfig::from_env()?;
            submit_lead(&config, args).await
        }
        Command::Chat => {
            let config = SiteConfig::from_env()?;
            chat_loop(&config).await
        }
    }
}

// =============================================================================
// LEAD
// =============================================================================

async fn submit_lead(config: &SiteConfig, args: LeadArgs) -> Result<(), CliError> {
    let form = LeadFormController::from_config(&config.lead)?;
    if config.lead.webhook_url.is_none() {
        tracing::warn!("LEAD_WEBHOOK_URL not set — submissions are simulated");
    }

    if !form.select_service(&args.service) {
        return Err(CliError::UnknownService(args.service));
    }
    form.edit(LeadField::Name, args.name);
    form.edit(LeadField::Email, args.email);
    form.edit(LeadField::Phone, args.phone);
    form.edit(LeadField::Message, args.message);

    println!("Se trimite...");
    match form.submit().await {
        SubmitOutcome::Success => {
            println!("Solicitare trimisă. Un specialist {} te va contacta în scurt timp.", site::COMPANY_NAME);
            form.dismiss();
            Ok(())
        }
        SubmitOutcome::Error => Err(CliError::SubmissionFailed),
        SubmitOutcome::Refused(Refusal::MissingField(field)) => Err(CliError::MissingField(field.as_str())),
        SubmitOutcome::Refused(Refusal::InFlight | Refusal::AwaitingDismiss) => Ok(()),
    }
}

// =============================================================================
// CHAT
// =============================================================================

async fn chat_loop(config: &SiteConfig) -> Result<(), CliError> {
    let client = LlmClient::from_config(config.llm.clone())?;
    if client.has_api_key() {
        tracing::info!(model = client.model(), "LLM client initialized");
    } else {
        tracing::warn!(var = %config.llm.api_key_env, "LLM API key not set — consultant replies will fail");
    }
    let chat = ChatSessionController::new(Arc::new(client), config.chat);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown = 0;

    stdout
        .write_all(b"Consultant Tehnic. /open, /close, /quit; anything else is sent as a message.\n")
        .await?;
    chat.set_open(true);

    loop {
        if chat.is_open() {
            shown = render_new(&chat, shown, &mut stdout).await?;
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "/quit" => break,
            "/open" | "/close" => {
                let want_open = line.trim() == "/open";
                if chat.is_open() != want_open {
                    chat.toggle_open();
                }
                continue;
            }
            _ => {}
        }
        if !chat.is_open() {
            stdout.write_all(b"(chat is closed; /open to continue)\n").await?;
            continue;
        }

        chat.set_draft(line);
        match chat.send_draft().await {
            SendOutcome::Replied | SendOutcome::Failed | SendOutcome::Rejected(SendRejection::Empty) => {}
            SendOutcome::Rejected(SendRejection::Pending) => {
                stdout.write_all(b"(still waiting for the previous reply)\n").await?;
            }
        }
    }
    Ok(())
}

/// Print transcript entries from index `from` onward. Returns the new count.
async fn render_new(
    chat: &ChatSessionController,
    from: usize,
    out: &mut tokio::io::Stdout,
) -> Result<usize, std::io::Error> {
    let state = chat.snapshot();
    for msg in state.transcript.iter().skip(from) {
        let who = match msg.role {
            Role::User => "tu",
            Role::Assistant => "consultant",
        };
        let line = format!("[{:02}:{:02}] {who}: {}\n", msg.created_at.hour(), msg.created_at.minute(), msg.text);
        out.write_all(line.as_bytes()).await?;
    }
    Ok(state.transcript.len())
}
