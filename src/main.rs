//! EstimAÍ terminal client
//!
//! Manage Planning Poker sessions and take part in one from the terminal.

use std::io::Write;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use estimai_client::models::EstimateComparison;
use estimai_client::poker::{parse_value, RoundPhase};
use estimai_client::{
    ApiClient, ClientError, Config, DriverOptions, LocalAction, LocalUser, SessionDriver,
    SessionViewModel, SseChannel,
};

#[derive(Debug, Parser)]
#[command(name = "estimai", version, about = "EstimAÍ terminal client")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List a team's active sessions
    Sessions { team_id: String },
    /// Open a session on a story
    Create {
        story_id: String,
        #[arg(long)]
        team: String,
    },
    /// End a session
    End { session_id: String },
    /// Join a session and vote interactively
    Join {
        session_id: String,
        /// Overrides ESTIMAI_USER_ID
        #[arg(long)]
        user_id: Option<String>,
        /// Overrides ESTIMAI_DISPLAY_NAME
        #[arg(long)]
        name: Option<String>,
    },
    /// Show a story, compared against the team rate when one is given
    Story {
        story_id: String,
        #[arg(long)]
        team: Option<String>,
    },
    /// Show or set a team's hours-per-point rate
    Rate {
        team_id: String,
        #[arg(long)]
        set: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::debug!("Backend: {}", config.api_url);
    if config.api_key.is_none() {
        tracing::debug!("No API key configured (ESTIMAI_API_KEY)");
    }

    let api = ApiClient::new(&config)?;

    match cli.command {
        Command::Sessions { team_id } => {
            let sessions = api.list_sessions(&team_id).await?;
            if sessions.is_empty() {
                println!("No active sessions for team {team_id}");
            }
            for s in sessions {
                println!(
                    "{}  {}  (story {}, opened {})",
                    s.id,
                    s.story_title,
                    s.story_id,
                    s.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Create { story_id, team } => {
            let session = api.create_session(&story_id, &team).await?;
            println!("{}", session.id);
        }
        Command::End { session_id } => {
            api.delete_session(&session_id).await?;
            println!("Session {session_id} ended");
        }
        Command::Join {
            session_id,
            user_id,
            name,
        } => {
            let user_id = user_id.or_else(|| config.user_id.clone()).ok_or_else(|| {
                ClientError::Config("a user id is required (--user-id or ESTIMAI_USER_ID)".into())
            })?;
            let name = name
                .or_else(|| config.display_name.clone())
                .unwrap_or_else(|| user_id.clone());

            join_session(api, &config, &session_id, LocalUser::new(user_id, name)).await?;
        }
        Command::Story { story_id, team } => {
            let story = api.get_story(&story_id).await?;
            println!("{}  {}", story.id, story.title);
            if let Some(points) = story.story_points {
                println!("  story points:    {points}");
            }
            if let Some(fp) = story.function_points {
                println!("  function points: {fp}");
            }
            if let Some(ucp) = story.use_case_points {
                println!("  use case points: {ucp}");
            }
            if let Some(team_id) = team {
                let rate = api.get_rate(&team_id).await?;
                match EstimateComparison::for_story(&story, &rate) {
                    Some(cmp) => println!(
                        "  estimated {:.1}h, actual {:.1}h, deviation {:+.1}h",
                        cmp.estimated_hours, cmp.actual_hours, cmp.deviation_hours
                    ),
                    None => println!("  no points or actual hours recorded yet"),
                }
            }
        }
        Command::Rate { team_id, set } => {
            let rate = match set {
                Some(hours) => api.set_rate(&team_id, hours).await?,
                None => api.get_rate(&team_id).await?,
            };
            println!("{} hours per point", rate.hours_per_point);
        }
    }

    Ok(())
}

/// Interactive Planning Poker loop reading commands from stdin.
async fn join_session(
    api: ApiClient,
    config: &Config,
    session_id: &str,
    user: LocalUser,
) -> Result<(), ClientError> {
    let channel = SseChannel::new(api, session_id)?;
    let view = SessionViewModel::new(session_id, user);
    let handle = SessionDriver::spawn(channel, view, DriverOptions::from_config(config));

    let mut updates = handle.updates();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let view = updates.borrow_and_update().clone();
            print_view(&view);
            if view.is_disposed() {
                break;
            }
        }
    });

    println!("Commands: vote <n>, reveal, final <n>, reset, status, quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.split_whitespace();
        let action = match (parts.next(), parts.next()) {
            (Some("vote"), arg) => parse_value(arg.unwrap_or("")).map(LocalAction::Vote),
            (Some("final"), arg) => parse_value(arg.unwrap_or("")).map(LocalAction::Finalize),
            (Some("reveal"), _) => Ok(LocalAction::Reveal),
            (Some("reset"), _) => Ok(LocalAction::ResetRound),
            (Some("status"), _) => {
                print_view(&handle.current());
                continue;
            }
            (Some("quit"), _) => break,
            (None, _) => continue,
            (Some(other), _) => {
                println!("Unknown command: {other}");
                continue;
            }
        };

        let result = match action {
            Ok(action) => handle.act(action).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            println!("! {e}");
        }
    }

    handle.close().await?;
    printer.abort();
    Ok(())
}

fn print_view(view: &SessionViewModel) {
    let state = view.state();
    let phase = match view.phase() {
        RoundPhase::Voting => "voting",
        RoundPhase::RevealEligible => "everyone voted",
        RoundPhase::Revealed => "revealed",
        RoundPhase::Concluded => "concluded",
    };

    let mut out = std::io::stdout().lock();
    let _ = writeln!(
        out,
        "\n[{:?}] {} ({}, {} voted)",
        view.connection_status(),
        state.title(),
        phase,
        view.voting_progress()
    );
    for p in view.participants() {
        let mark = if p.has_voted() { "x" } else { " " };
        match p.vote_value() {
            Some(value) => {
                let _ = writeln!(out, "  [{mark}] {:<20} {value}", p.display_name());
            }
            None => {
                let _ = writeln!(out, "  [{mark}] {}", p.display_name());
            }
        }
    }
    if let Some(value) = state.final_value() {
        let _ = writeln!(out, "  final value: {value}");
    }
    if view.can_reveal() {
        let _ = writeln!(out, "  type 'reveal' to show the votes");
    }
}
