use std::sync::Arc;

use clap::{Parser, Subcommand};
use scavenger::app::{DEMO_EMAIL, DEMO_PASSWORD};
use scavenger::config::AppConfig;
use scavenger::notify::LogNotifier;
use scavenger::{AppContext, RouteDecision, ToastChannel};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] scavenger::config::ConfigError),
    #[error("provider error: {0}")]
    Provider(#[from] scavenger::ProviderError),
    #[error(transparent)]
    Auth(#[from] scavenger::AuthError),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("session store stopped")]
    StoreGone,
}

#[derive(Parser, Debug)]
#[command(name = "scavenger", about = "Scavenger hunt session and route-guard CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the session and print the guard decision for a path.
    Route { path: String },
    SignIn {
        #[arg(long, env = "SCAVENGER_EMAIL")]
        email: String,
        #[arg(long, env = "SCAVENGER_PASSWORD")]
        password: String,
    },
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        username: String,
    },
    SignOut,
    /// Walk the sign-in flow against the demo account.
    Demo,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = AppConfig::from_env()?;
    let ctx = AppContext::with_notifier(&config, Arc::new(LogNotifier), ToastChannel::new())?;
    ctx.session.initialize()?;
    let state = ctx.session.resolved().await;
    tracing::info!(signed_in = state.identity.is_some(), "session ready");

    match cli.command {
        Command::Route { path } => {
            let mut guard = ctx.guard(&path);
            print_decision(&path, guard.settle());
        }
        Command::SignIn { email, password } => {
            let mut guard = ctx.guard("/login");
            guard.settle();
            ctx.session.sign_in(&email, &password).await?;
            let decision = guard.changed().await.ok_or(CliError::StoreGone)?;
            print_decision("/login", decision);
        }
        Command::SignUp { email, password, username } => {
            let outcome = ctx.session.sign_up(&email, &password, &username).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::SignOut => {
            if state.identity.is_none() {
                println!("no active session (set SUPABASE_ACCESS_TOKEN to end a hosted session)");
            } else {
                ctx.session.sign_out().await?;
                println!("signed out");
            }
        }
        Command::Demo => demo(&ctx).await?,
    }

    ctx.session.dispose();
    Ok(())
}

async fn demo(ctx: &AppContext) -> Result<(), CliError> {
    let mut guard = ctx.guard("/");
    print_decision("/", guard.settle());

    ctx.session.sign_in(DEMO_EMAIL, DEMO_PASSWORD).await?;
    let decision = guard.changed().await.ok_or(CliError::StoreGone)?;
    print_decision(guard.route().path(), decision);

    if let Some(identity) = ctx.session.state().identity {
        println!("signed in as {} ({})", identity.email, identity.id);
    }

    ctx.session.sign_out().await?;
    let decision = guard.changed().await.ok_or(CliError::StoreGone)?;
    print_decision(guard.route().path(), decision);
    Ok(())
}

fn print_decision(path: &str, decision: RouteDecision) {
    match decision {
        RouteDecision::Loading => println!("{path}: loading"),
        RouteDecision::Render(route) => println!("{path}: render {} ({})", route.path(), route.label()),
        RouteDecision::Redirect(route) => println!("{path}: redirect {}", route.path()),
    }
}
