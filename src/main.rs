//! classgate
//!
//! Command-line client for the school activity log backend.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use classgate::{
    access::{Router, resolve},
    auth::{SessionAuthProvider, create_auth_provider},
    baas::BaasClient,
    config::{AppConfig, LogFormat, load_config},
    error::IdentityError,
    freshness::{AccessState, Freshness},
    identity::{GoTrueIdentity, IdentityProvider},
    profile::{BaasProfileStore, ProfileAdmin},
    records::EventStore,
    report::{self, AuditSort, Week},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// classgate - access gate and admin client for the school activity log
#[derive(Parser, Debug)]
#[command(name = "classgate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "CLASSGATE_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CLASSGATE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CLASSGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the current session
    Logout,
    /// Show the signed-in user, profile and gate decision
    Whoami,
    /// Resolve a client path against the current access state
    Resolve { path: String },
    /// Keep the access state fresh and print navigation for a path on every change
    Watch {
        #[arg(default_value = "/student/calendar")]
        path: String,
    },
    /// List students waiting for approval
    Pending,
    /// Approve a student
    Approve { id: String },
    /// Send a student back to pending
    Revoke { id: String },
    /// Approve several pending students at once
    ApproveAll {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Grant the teacher role
    GrantTeacher { id: String },
    /// Revoke the teacher role
    RevokeTeacher { id: String },
    /// Weekly minutes per student
    Weekly {
        /// Any date in the week (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "total")]
        sort: AuditSort,
        #[arg(long)]
        desc: bool,
    },
}

fn init_logging(config: &AppConfig, level: Option<&str>) {
    let level = level.unwrap_or(config.logging.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match config.logging.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }
}

/// Shared clients for one invocation
struct Clients {
    config: AppConfig,
    identity: Arc<GoTrueIdentity>,
    client: Arc<BaasClient>,
}

impl Clients {
    fn new(config: AppConfig) -> anyhow::Result<Self> {
        let anon = create_auth_provider(&config.backend)
            .inspect_err(|e| error!(error = %e, "Failed to create auth provider"))?;
        let anon_key = anon.key().clone();

        let identity = Arc::new(
            GoTrueIdentity::new(&config.backend, &config.auth, anon)
                .inspect_err(|e| error!(error = %e, "Failed to create identity provider"))?,
        );

        let auth = SessionAuthProvider::new(anon_key, identity.clone());
        let client = Arc::new(
            BaasClient::new(&config.backend, Box::new(auth))
                .inspect_err(|e| error!(error = %e, "Failed to create backend client"))?,
        );

        Ok(Self {
            config,
            identity,
            client,
        })
    }

    fn freshness(&self) -> Freshness {
        Freshness::new(
            self.identity.clone(),
            Arc::new(BaasProfileStore::new(self.client.clone())),
            &self.config.freshness,
        )
    }

    async fn loaded_state(&self) -> AccessState {
        let freshness = self.freshness();
        freshness.start().await;
        freshness.state()
    }

    async fn actor_id(&self) -> anyhow::Result<String> {
        let session = self
            .identity
            .get_session()
            .await?
            .ok_or(IdentityError::NoSession)?;
        Ok(session.user_id().to_string())
    }

    fn admin(&self) -> ProfileAdmin {
        ProfileAdmin::new(self.client.clone())
    }
}

fn describe(state: &AccessState) -> String {
    match (&state.session, &state.profile) {
        (None, _) => "signed out".to_string(),
        (Some(session), None) => format!("{} (no profile)", session.user_id()),
        (Some(session), Some(profile)) => format!(
            "{} {} role={} approved={}",
            session.user_id(),
            profile.name.as_deref().unwrap_or("-"),
            profile.role,
            profile.approved
        ),
    }
}

async fn run(clients: Clients, command: Command) -> anyhow::Result<()> {
    let router = Router::new(clients.config.routes.clone());

    match command {
        Command::Login { email, password } => {
            let session = clients
                .identity
                .sign_in_with_password(&email, &password)
                .await
                .context("Sign-in failed")?;
            println!("Signed in as {}", session.user_id());
        }
        Command::Logout => {
            clients.identity.sign_out().await?;
            println!("Signed out");
        }
        Command::Whoami => {
            let state = clients.loaded_state().await;
            println!("{}", describe(&state));
            let decision = resolve(state.session.as_ref(), state.profile.as_ref(), None);
            match decision.redirect_target() {
                None => println!("gate: render"),
                Some(destination) => {
                    println!("gate: redirect {}", clients.config.routes.path_for(destination))
                }
            }
        }
        Command::Resolve { path } => {
            let state = clients.loaded_state().await;
            println!("{:?}", router.dispatch(&path, &state));
        }
        Command::Watch { path } => {
            let freshness = clients.freshness();
            let mut changes = freshness.subscribe();
            let listener = freshness.listen();
            let revalidate = freshness.revalidate_every(Duration::from_secs(
                clients.config.freshness.revalidate_interval_secs.max(1),
            ));
            let _ = freshness.start();

            info!(path = %path, "Watching access state");
            loop {
                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = changes.borrow_and_update().clone();
                        println!("{} -> {:?}", describe(&state), router.dispatch(&path, &state));
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Interrupted");
                        break;
                    }
                }
            }

            listener.abort();
            revalidate.abort();
        }
        Command::Pending => {
            for s in clients.admin().list_pending_students().await? {
                println!(
                    "{}\t{}\t{}-{}-{}",
                    s.id,
                    s.name.as_deref().unwrap_or("-"),
                    s.grade.map_or("-".into(), |v| v.to_string()),
                    s.class_no.map_or("-".into(), |v| v.to_string()),
                    s.student_no.map_or("-".into(), |v| v.to_string()),
                );
            }
        }
        Command::Approve { id } => {
            let state = clients.admin().approve(&id).await?;
            println!("{} approved={}", state.id, state.approved);
        }
        Command::Revoke { id } => {
            let state = clients.admin().revoke(&id).await?;
            println!("{} approved={}", state.id, state.approved);
        }
        Command::ApproveAll { ids } => {
            let updated = clients.admin().approve_all(&ids).await?;
            println!("Approved {} of {}", updated.len(), ids.len());
        }
        Command::GrantTeacher { id } => {
            let actor = clients.actor_id().await?;
            let entry = clients
                .admin()
                .grant_role(&id, classgate::baas::Role::Teacher, &actor)
                .await?;
            println!("{} role={}", entry.id, entry.role);
        }
        Command::RevokeTeacher { id } => {
            let actor = clients.actor_id().await?;
            let entry = clients.admin().revoke_role(&id, &actor).await?;
            println!("{} role={}", entry.id, entry.role);
        }
        Command::Weekly { date, sort, desc } => {
            let week = Week::containing(date.unwrap_or_else(|| Local::now().date_naive()));
            let profiles = clients.admin().list_profiles().await?;
            let events = EventStore::new(clients.client.clone())
                .list_range(week.start(), week.end())
                .await?;

            let mut rows = report::audit_rows(&profiles, &events);
            report::sort_rows(&mut rows, sort, !desc);

            println!("Week {}", week.label());
            for row in rows {
                println!(
                    "{}\t{}\t{}\t{}",
                    row.name,
                    report::format_minutes(row.minutes.total),
                    report::format_minutes(row.minutes.basic),
                    report::format_minutes(row.minutes.career),
                );
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up SUPABASE_* from a local .env
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config, args.log_level.as_deref());

    info!(version = env!("CARGO_PKG_VERSION"), "Starting classgate");

    let clients = Clients::new(config)?;
    run(clients, args.command).await
}
