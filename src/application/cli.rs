use std::io;
use std::path;
use std::process;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use chrono::Local;
use chrono::TimeZone;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgGroup;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ContentKind;
use crate::domain::models::Role;
use crate::domain::models::SessionMode;
use crate::domain::models::SessionSummary;
use crate::domain::services::PullOutcome;
use crate::domain::services::SessionOrchestrator;
use crate::domain::services::SyncEngine;
use crate::infrastructure::cloud::CredentialFile;
use crate::infrastructure::cloud::CredentialManager;
use crate::infrastructure::cloud::OAuthConfig;
use crate::infrastructure::cloud::RemoteBlobChannel;
use crate::infrastructure::storage::StoreManager;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    process::exit(0);
}

/// Everything a command handler needs, wired from the loaded config. The sync
/// engine is only attached when credentials exist, so signed-out usage stays
/// purely local.
struct Runtime {
    orchestrator: SessionOrchestrator,
    auth: Arc<CredentialManager>,
}

impl Runtime {
    async fn create() -> Result<Runtime> {
        let data_dir = path::PathBuf::from(Config::get(ConfigKey::DataDir));
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).await?;
        }

        let store = Arc::new(StoreManager::open(&data_dir)?);
        let auth = Arc::new(CredentialManager::new(
            OAuthConfig::from_config(),
            CredentialFile::new(&data_dir),
        ));

        let mut sync = None;
        if auth.is_signed_in() {
            let channel = RemoteBlobChannel::new(Arc::clone(&auth));
            sync = Some(Arc::new(SyncEngine::new(
                Arc::clone(&store),
                Box::new(channel),
            )));
        }

        let orchestrator = SessionOrchestrator::new(
            store,
            sync,
            Config::get_u64(ConfigKey::SyncDebounce),
            Config::get_u64(ConfigKey::SessionListLimit) as usize,
        );

        return Ok(Runtime { orchestrator, auth });
    }

    fn signed_in_engine(&self) -> Result<&Arc<SyncEngine>> {
        let Some(engine) = self.orchestrator.sync_engine() else {
            bail!("Not signed in. Run granary login first.");
        };
        return Ok(engine);
    }

    /// One-shot commands exit before a debounced push would fire, so
    /// mutations mirror to the remote in the foreground instead. Failures
    /// are logged and never block the local result.
    async fn mirror(&self) {
        if let Some(engine) = self.orchestrator.sync_engine() {
            if let Err(err) = engine.push().await {
                tracing::warn!(error = ?err, "Failed to push sessions to the remote");
                eprintln!("Warning: session saved locally but the cloud push failed: {err}");
            }
        }
    }
}

/// Hands the consent URL to the platform browser. The URL is printed either
/// way so headless users can complete the flow by hand.
fn open_in_browser(url: &str) {
    println!("Opening your browser to complete sign-in. If nothing happens, visit:\n\n  {url}\n");

    let result = if cfg!(target_os = "macos") {
        process::Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        process::Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        process::Command::new("xdg-open").arg(url).spawn()
    };

    if let Err(err) = result {
        tracing::warn!(error = ?err, "Failed to launch a browser");
    }
}

fn format_timestamp(ms: i64) -> String {
    if let Some(time) = Local.timestamp_millis_opt(ms).single() {
        return time.format("%Y-%m-%d %H:%M").to_string();
    }
    return ms.to_string();
}

fn format_summary(summary: &SessionSummary) -> String {
    let mut res = format!(
        "- (ID: {}) {}, Mode: {}, Updated: {}, Messages: {}",
        summary.id,
        summary.title,
        summary.mode,
        format_timestamp(summary.updated_at_ms),
        summary.message_count,
    );

    if let Some(project) = &summary.project_path {
        res = format!("{res}, Project: {project}");
    }

    return res;
}

async fn print_sessions_list(runtime: &Runtime) -> Result<()> {
    let sessions = runtime
        .orchestrator
        .list_sessions()
        .await?
        .iter()
        .map(|summary| {
            return format_summary(summary);
        })
        .collect::<Vec<String>>();

    if sessions.is_empty() {
        println!("There are no sessions yet. You should start your first one!");
    } else {
        println!("{}", sessions.join("\n"));
    }

    return Ok(());
}

async fn print_session(runtime: &Runtime, id: &str) -> Result<()> {
    let Some(session) = runtime.orchestrator.load_session(id).await? else {
        bail!("No session found for id {id}");
    };

    println!(
        "{} ({}, created {})",
        session.title,
        session.mode,
        format_timestamp(session.created_at_ms)
    );
    if let Some(plan) = &session.plan {
        println!("\n[plan]\n{plan}");
    }
    for message in session.messages {
        println!("\n[{} / {}]\n{}", message.role, message.kind, message.content);
    }

    return Ok(());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if !config_file_path.parent().unwrap().exists() {
        fs::create_dir_all(config_file_path.parent().unwrap()).await?;
    }

    let mut file = fs::File::create(config_file_path.clone()).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    let config_path_display = config_file_path.as_os_str().to_str().unwrap();
    println!("Created default config file at {config_path_display}");
    return Ok(());
}

async fn command_login(runtime: &Runtime) -> Result<()> {
    let credentials = runtime
        .auth
        .sign_in(|consent_url| {
            open_in_browser(consent_url);
        })
        .await?;

    println!(
        "Signed in as {} ({}).",
        credentials.display_name, credentials.email
    );

    // The engine was wired before credentials existed, so rebuild and pull in
    // the foreground so the first sync is visible to the user.
    let runtime = Runtime::create().await?;
    let engine = runtime.signed_in_engine()?;
    print_pull_outcome(engine.pull().await?);
    engine.push().await?;

    return Ok(());
}

async fn command_logout(runtime: &Runtime) -> Result<()> {
    // Best-effort final mirror so the last local edits survive the sign-out.
    runtime.mirror().await;
    runtime.auth.sign_out().await?;
    println!("Signed out.");
    return Ok(());
}

async fn command_whoami(runtime: &Runtime) -> Result<()> {
    match runtime.auth.account().await? {
        Some(credentials) => {
            println!("{} ({})", credentials.display_name, credentials.email);
        }
        None => {
            println!("Not signed in. Run granary login to connect an account.");
        }
    }
    return Ok(());
}

async fn command_sessions_new(runtime: &Runtime, matches: &ArgMatches) -> Result<()> {
    let mode = matches
        .get_one::<String>("mode")
        .map(|raw| return raw.parse::<SessionMode>())
        .transpose()?
        .unwrap_or(SessionMode::Chat);

    let session = runtime
        .orchestrator
        .create_session(
            mode,
            matches.get_one::<String>("project").cloned(),
            matches.get_one::<String>("title").cloned(),
        )
        .await?;

    runtime.mirror().await;
    println!("Created session {}", session.id);
    return Ok(());
}

async fn command_sessions_append(runtime: &Runtime, matches: &ArgMatches) -> Result<()> {
    let id = matches.get_one::<String>("session-id").unwrap();
    let role = matches.get_one::<String>("role").unwrap().parse::<Role>()?;
    let kind = matches
        .get_one::<String>("kind")
        .unwrap()
        .parse::<ContentKind>()?;
    let content = matches.get_one::<String>("content").unwrap();

    let Some(mut session) = runtime.orchestrator.load_session(id).await? else {
        bail!("No session found for id {id}");
    };

    let message = runtime
        .orchestrator
        .add_message(&mut session, role, kind, content)
        .await?;

    runtime.mirror().await;
    println!("Appended message {} to session {id}", message.id);
    return Ok(());
}

async fn command_sessions_rename(runtime: &Runtime, matches: &ArgMatches) -> Result<()> {
    let id = matches.get_one::<String>("session-id").unwrap();
    let title = matches.get_one::<String>("title").unwrap();

    let session = runtime.orchestrator.rename_session(id, title).await?;
    runtime.mirror().await;
    println!("Renamed session {} to {}", session.id, session.title);
    return Ok(());
}

async fn command_sessions_delete(runtime: &Runtime, matches: &ArgMatches) -> Result<()> {
    if let Some(id) = matches.get_one::<String>("session-id") {
        runtime.orchestrator.delete_session(id).await?;
        runtime.mirror().await;
        println!("Deleted session {id}");
    } else if matches.get_flag("all") {
        runtime.orchestrator.clear_history().await?;
        runtime.mirror().await;
        println!("Deleted all sessions");
    } else {
        subcommand_sessions_delete().print_long_help()?;
    }
    return Ok(());
}

fn print_pull_outcome(outcome: PullOutcome) {
    match outcome {
        PullOutcome::Replaced => println!("Restored your sessions from the cloud."),
        PullOutcome::Merged { imported } => {
            println!("Merged {imported} newer session(s) from the cloud.");
        }
        PullOutcome::Skipped => println!("Local sessions are already up to date."),
    }
}

async fn command_sync(runtime: &Runtime, matches: &ArgMatches) -> Result<()> {
    let engine = runtime.signed_in_engine()?;

    match matches.subcommand_name() {
        Some("push") => {
            engine.push().await?;
            println!("Pushed local sessions to the cloud.");
        }
        Some("pull") => {
            print_pull_outcome(engine.pull().await?);
        }
        _ => {
            print_pull_outcome(engine.pull().await?);
            engine.push().await?;
            println!("Pushed local sessions to the cloud.");
        }
    }

    return Ok(());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    return Command::new("debug")
        .about("Debug helpers for Granary")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running Granary with environment variable RUST_LOG=granary")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        );
}

fn subcommand_sessions_delete() -> Command {
    return Command::new("delete")
        .about("Delete one or all sessions.")
        .arg(
            clap::Arg::new("session-id")
                .short('i')
                .long("id")
                .help("Session ID")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("all")
                .long("all")
                .help("Delete all sessions.")
                .action(ArgAction::SetTrue),
        )
        .group(
            ArgGroup::new("delete-args")
                .args(["session-id", "all"])
                .required(true),
        );
}

fn subcommand_sessions() -> Command {
    return Command::new("sessions")
        .about("Manage stored conversation sessions.")
        .arg_required_else_help(true)
        .subcommand(Command::new("dir").about("Print the session data directory path."))
        .subcommand(Command::new("list").about("List recent sessions with their ids and titles."))
        .subcommand(
            Command::new("show")
                .about("Print a full session transcript by ID.")
                .arg(
                    clap::Arg::new("session-id")
                        .short('i')
                        .long("id")
                        .help("Session ID")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("new")
                .about("Create a new empty session.")
                .arg(
                    clap::Arg::new("mode")
                        .short('m')
                        .long("mode")
                        .help("Conversation mode for the new session. [default: chat]")
                        .value_parser(PossibleValuesParser::new(SessionMode::VARIANTS)),
                )
                .arg(
                    clap::Arg::new("project")
                        .short('p')
                        .long("project")
                        .help("Project directory the session is tied to.")
                        .num_args(1),
                )
                .arg(
                    clap::Arg::new("title")
                        .short('t')
                        .long("title")
                        .help("Session title. Untitled sessions take their title from the first user message.")
                        .num_args(1),
                ),
        )
        .subcommand(
            Command::new("append")
                .about("Append a message to an existing session.")
                .arg(
                    clap::Arg::new("session-id")
                        .short('i')
                        .long("id")
                        .help("Session ID")
                        .required(true),
                )
                .arg(
                    clap::Arg::new("role")
                        .short('r')
                        .long("role")
                        .help("Author of the message.")
                        .default_value("user")
                        .value_parser(PossibleValuesParser::new(Role::VARIANTS)),
                )
                .arg(
                    clap::Arg::new("kind")
                        .short('k')
                        .long("kind")
                        .help("Content kind of the message.")
                        .default_value("text")
                        .value_parser(PossibleValuesParser::new(ContentKind::VARIANTS)),
                )
                .arg(
                    clap::Arg::new("content")
                        .help("Message body.")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("rename")
                .about("Rename a session.")
                .arg(
                    clap::Arg::new("session-id")
                        .short('i')
                        .long("id")
                        .help("Session ID")
                        .required(true),
                )
                .arg(
                    clap::Arg::new("title")
                        .short('t')
                        .long("title")
                        .help("New title")
                        .required(true),
                ),
        )
        .subcommand(subcommand_sessions_delete());
}

fn subcommand_sync() -> Command {
    return Command::new("sync")
        .about("Synchronize local sessions with the cloud.")
        .subcommand(Command::new("now").about("Pull newer remote sessions, then push the merged result."))
        .subcommand(Command::new("push").about("Upload the local session store to the cloud."))
        .subcommand(Command::new("pull").about("Merge newer sessions from the cloud into the local store."));
}

fn arg_oauth_client_id() -> Arg {
    return Arg::new(ConfigKey::OauthClientId.to_string())
        .long(ConfigKey::OauthClientId.to_string())
        .env("GRANARY_OAUTH_CLIENT_ID")
        .num_args(1)
        .help("OAuth client id used for cloud sign-in.")
        .global(true);
}

fn arg_oauth_client_secret() -> Arg {
    return Arg::new(ConfigKey::OauthClientSecret.to_string())
        .long(ConfigKey::OauthClientSecret.to_string())
        .env("GRANARY_OAUTH_CLIENT_SECRET")
        .num_args(1)
        .help("OAuth client secret used for cloud sign-in.")
        .global(true);
}

fn arg_oauth_auth_url() -> Arg {
    return Arg::new(ConfigKey::OauthAuthUrl.to_string())
        .long(ConfigKey::OauthAuthUrl.to_string())
        .env("GRANARY_OAUTH_AUTH_URL")
        .num_args(1)
        .help(format!(
            "OAuth authorization endpoint opened for consent. [default: {}]",
            Config::default(ConfigKey::OauthAuthUrl)
        ))
        .global(true);
}

fn arg_oauth_token_url() -> Arg {
    return Arg::new(ConfigKey::OauthTokenUrl.to_string())
        .long(ConfigKey::OauthTokenUrl.to_string())
        .env("GRANARY_OAUTH_TOKEN_URL")
        .num_args(1)
        .help(format!(
            "OAuth token endpoint for code exchange and refresh. [default: {}]",
            Config::default(ConfigKey::OauthTokenUrl)
        ))
        .global(true);
}

fn arg_oauth_userinfo_url() -> Arg {
    return Arg::new(ConfigKey::OauthUserinfoUrl.to_string())
        .long(ConfigKey::OauthUserinfoUrl.to_string())
        .env("GRANARY_OAUTH_USERINFO_URL")
        .num_args(1)
        .help(format!(
            "OAuth userinfo endpoint queried for the account display name. [default: {}]",
            Config::default(ConfigKey::OauthUserinfoUrl)
        ))
        .global(true);
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("granary")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .subcommand(Command::new("login").about("Sign in to the cloud account used for session sync."))
        .subcommand(Command::new("logout").about("Sign out and remove cached credentials."))
        .subcommand(Command::new("whoami").about("Show the signed-in account."))
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .subcommand(subcommand_sessions())
        .subcommand(subcommand_sync())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("GRANARY_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::DataDir.to_string())
                .short('d')
                .long(ConfigKey::DataDir.to_string())
                .env("GRANARY_DATA_DIR")
                .num_args(1)
                .help(format!("Directory holding the session store and credentials. [default: {}]", Config::default(ConfigKey::DataDir)))
                .global(true),
        )
        .arg(arg_oauth_client_id())
        .arg(arg_oauth_client_secret())
        .arg(arg_oauth_auth_url())
        .arg(arg_oauth_token_url())
        .arg(arg_oauth_userinfo_url())
        .arg(
            Arg::new(ConfigKey::OauthRedirectPort.to_string())
                .long(ConfigKey::OauthRedirectPort.to_string())
                .env("GRANARY_OAUTH_REDIRECT_PORT")
                .num_args(1)
                .help(format!("Loopback port the OAuth consent flow redirects back to. [default: {}]", Config::default(ConfigKey::OauthRedirectPort)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::RemoteApiUrl.to_string())
                .long(ConfigKey::RemoteApiUrl.to_string())
                .env("GRANARY_REMOTE_API_URL")
                .num_args(1)
                .help(format!("Cloud storage metadata API URL. [default: {}]", Config::default(ConfigKey::RemoteApiUrl)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::RemoteUploadUrl.to_string())
                .long(ConfigKey::RemoteUploadUrl.to_string())
                .env("GRANARY_REMOTE_UPLOAD_URL")
                .num_args(1)
                .help(format!("Cloud storage upload API URL. [default: {}]", Config::default(ConfigKey::RemoteUploadUrl)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::RequestTimeout.to_string())
                .long(ConfigKey::RequestTimeout.to_string())
                .env("GRANARY_REQUEST_TIMEOUT")
                .num_args(1)
                .help(format!("Time to wait in milliseconds before timing out metadata requests. [default: {}]", Config::default(ConfigKey::RequestTimeout)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::UploadTimeout.to_string())
                .long(ConfigKey::UploadTimeout.to_string())
                .env("GRANARY_UPLOAD_TIMEOUT")
                .num_args(1)
                .help(format!("Time to wait in milliseconds before timing out blob uploads and downloads. [default: {}]", Config::default(ConfigKey::UploadTimeout)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::SessionListLimit.to_string())
                .long(ConfigKey::SessionListLimit.to_string())
                .env("GRANARY_SESSION_LIST_LIMIT")
                .num_args(1)
                .help(format!("Maximum number of sessions returned when listing. [default: {}]", Config::default(ConfigKey::SessionListLimit)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::SyncDebounce.to_string())
                .long(ConfigKey::SyncDebounce.to_string())
                .env("GRANARY_SYNC_DEBOUNCE")
                .num_args(1)
                .help(format!("Quiet period in milliseconds before session edits are pushed to the cloud. [default: {}]", Config::default(ConfigKey::SyncDebounce)))
                .global(true),
        );
}

pub async fn parse() -> Result<()> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("debug", debug_matches)) => {
            match debug_matches.subcommand() {
                Some(("log-path", _)) => {
                    let log_path = dirs::cache_dir().unwrap().join("granary/debug.log");
                    println!("{}", log_path.to_str().unwrap());
                }
                Some(("enum-config", _)) => {
                    println!("{}", ConfigKey::VARIANTS.join("\n"));
                }
                _ => {
                    subcommand_debug().print_long_help()?;
                }
            }
            return Ok(());
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(());
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                return create_config_file().await;
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(());
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(());
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(());
            }
        },
        Some(("login", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            let runtime = Runtime::create().await?;
            return command_login(&runtime).await;
        }
        Some(("logout", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            let runtime = Runtime::create().await?;
            return command_logout(&runtime).await;
        }
        Some(("whoami", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            let runtime = Runtime::create().await?;
            return command_whoami(&runtime).await;
        }
        Some(("sync", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            let runtime = Runtime::create().await?;
            return command_sync(&runtime, subcmd_matches).await;
        }
        Some(("sessions", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;

            match subcmd_matches.subcommand() {
                Some(("dir", _)) => {
                    println!("{}", Config::get(ConfigKey::DataDir));
                    return Ok(());
                }
                Some(("list", _)) => {
                    let runtime = Runtime::create().await?;
                    runtime.orchestrator.startup().await?;
                    return print_sessions_list(&runtime).await;
                }
                Some(("show", show_matches)) => {
                    let runtime = Runtime::create().await?;
                    let id = show_matches.get_one::<String>("session-id").unwrap();
                    return print_session(&runtime, id).await;
                }
                Some(("new", new_matches)) => {
                    let runtime = Runtime::create().await?;
                    return command_sessions_new(&runtime, new_matches).await;
                }
                Some(("append", append_matches)) => {
                    let runtime = Runtime::create().await?;
                    return command_sessions_append(&runtime, append_matches).await;
                }
                Some(("rename", rename_matches)) => {
                    let runtime = Runtime::create().await?;
                    return command_sessions_rename(&runtime, rename_matches).await;
                }
                Some(("delete", delete_matches)) => {
                    let runtime = Runtime::create().await?;
                    return command_sessions_delete(&runtime, delete_matches).await;
                }
                _ => {
                    subcommand_sessions().print_long_help()?;
                    return Ok(());
                }
            }
        }
        _ => {
            build().print_long_help()?;
            return Ok(());
        }
    }
}
