//! API Gateway Console - command-line administration for the gateway
//!
//! Manages API assignments, macro definitions, their versions and publish
//! state, and app client credentials through the gateway's admin API.
//! Results are printed to stdout as JSON; logs and errors go to stderr.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use apigw_console::config::{self, LogFormat, LogTarget};
use apigw_console::models::{
    ExecuteEngine, MacroType, UpdateApiAssignmentRequest, UpdateMacroDefRequest, VersionedKind,
};
use apigw_console::services::{Confirmation, DebugForm, MacroScope};
use apigw_console::{AppConfig, ConsoleContext, ConsoleError, ConsoleResult};

/// Administration console for the low-code API gateway
#[derive(Parser)]
#[command(name = "apigw-console")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Admin API base URL (overrides configuration)
    #[arg(long, global = true, env = "APIGW_API_URL")]
    api_url: Option<String>,

    /// Act with the permissions of these roles only (repeatable)
    #[arg(long = "role", global = true)]
    roles: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// API assignments
    Apis {
        #[command(subcommand)]
        action: ApisAction,
    },

    /// Versions and publish state of an API assignment or macro definition
    Versions {
        /// Operate on macro definitions instead of API assignments
        #[arg(long = "macro", global = true)]
        macro_def: bool,

        #[command(subcommand)]
        action: VersionsAction,
    },

    /// Macro definitions
    Macros {
        #[command(subcommand)]
        action: MacrosAction,
    },

    /// App clients and their credentials
    Clients {
        #[command(subcommand)]
        action: ClientsAction,
    },

    /// List reference data
    List {
        #[arg(value_enum)]
        resource: ListResource,
    },

    /// Print the gateway URL of an API
    Url {
        api_id: String,
    },

    /// Run an API's draft through the debug executor
    Debug {
        api_id: String,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "")]
        params: String,

        /// Single parameter as NAME=VALUE, typed by its declaration (repeatable)
        #[arg(long = "param", value_parser = parse_form_value)]
        form: Vec<(String, String)>,

        /// Try this content instead of the stored draft
        #[arg(long)]
        content: Option<String>,

        /// Engine for --content (defaults to the API's engine)
        #[arg(long, value_enum)]
        engine: Option<EngineArg>,
    },

    /// Call a published API through the gateway
    Execute {
        api_id: String,

        /// Bearer token from `token`
        #[arg(short, long, env = "APIGW_GATEWAY_TOKEN")]
        token: Option<String>,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "")]
        params: String,

        /// Single parameter as NAME=VALUE, typed by its declaration (repeatable)
        #[arg(long = "param", value_parser = parse_form_value)]
        form: Vec<(String, String)>,

        /// Extra headers as a JSON object
        #[arg(long)]
        headers: Option<String>,

        /// Raw JSON body
        #[arg(long)]
        body: Option<String>,
    },

    /// Exchange client credentials for an access token
    Token {
        client_id: String,
        client_secret: String,
    },
}

#[derive(Subcommand)]
enum ApisAction {
    /// List API assignments
    List,
    /// Show one API assignment
    Show { id: String },
    /// Show the publish state of an API assignment
    State { id: String },
    /// Replace the draft content
    Edit {
        id: String,
        #[arg(long)]
        content: String,
    },
}

#[derive(Subcommand)]
enum VersionsAction {
    /// List versions, most recent first
    List { entity_id: String },
    /// Show a version with its full snapshot
    Show { version_id: String },
    /// Snapshot the current draft
    Create {
        entity_id: String,
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Delete a version that is not the published one
    Delete { entity_id: String, version_id: String },
    /// Overwrite the draft with a version's snapshot
    Restore {
        entity_id: String,
        version_id: String,
        /// Confirm that the current draft will be overwritten
        #[arg(long)]
        yes: bool,
    },
    /// Publish a version
    Publish { entity_id: String, version_id: String },
    /// Take the entity offline, keeping the publish pointer
    Unpublish { entity_id: String },
    /// Clear the publish pointer after unpublishing
    Revert { entity_id: String, version_id: String },
    /// Show the publish state
    State { entity_id: String },
}

#[derive(Subcommand)]
enum MacrosAction {
    /// List macro definitions
    List,
    /// Show one macro definition
    Show { id: String },
    /// Macros visible to an API, with the preview preamble
    Scope { api_id: String },
    /// Replace the draft content
    Edit {
        id: String,
        #[arg(long)]
        content: String,
    },
}

#[derive(Subcommand)]
enum ClientsAction {
    /// List clients
    List,
    /// Show one client
    Show { id: String },
    /// Issue a new secret; it is printed once and cannot be retrieved again
    RegenerateSecret { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum ListResource {
    Groups,
    Roles,
    Modules,
    Datasources,
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineArg {
    Sql,
    Script,
}

impl From<EngineArg> for ExecuteEngine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Sql => ExecuteEngine::Sql,
            EngineArg::Script => ExecuteEngine::Script,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::load().context("Failed to load configuration") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(ref url) = cli.api_url {
        config.api.base_url = url.clone();
    }

    // Keep the guard alive so file logs are flushed
    let _log_guard = init_logging(&config);
    debug!("Configuration loaded: {:?}", config.api);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let notice = e.to_notice();
            match serde_json::to_string_pretty(&notice) {
                Ok(text) => eprintln!("{}", text),
                Err(_) => eprintln!("{}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: AppConfig) -> ConsoleResult<()> {
    let ctx = ConsoleContext::connect(config)?
        .with_roles(&cli.roles)
        .await?;

    match cli.command {
        Commands::Apis { action } => run_apis(&ctx, action).await,
        Commands::Versions { macro_def, action } => {
            let kind = if macro_def {
                VersionedKind::MacroDef
            } else {
                VersionedKind::ApiAssignment
            };
            run_versions(&ctx, kind, action).await
        }
        Commands::Macros { action } => run_macros(&ctx, action).await,
        Commands::Clients { action } => run_clients(&ctx, action).await,
        Commands::List { resource } => match resource {
            ListResource::Groups => print_json(&ctx.list_groups().await?),
            ListResource::Roles => print_json(&ctx.list_roles().await?),
            ListResource::Modules => print_json(&ctx.list_modules().await?),
            ListResource::Datasources => print_json(&ctx.list_datasources().await?),
        },
        Commands::Url { api_id } => print_json(&json!({ "url": ctx.api_url(&api_id).await? })),
        Commands::Debug {
            api_id,
            params,
            form,
            content,
            engine,
        } => {
            let form = DebugForm {
                params,
                values: form.into_iter().collect(),
                ..Default::default()
            };
            let outcome = ctx
                .debug(&api_id, &form, content, engine.map(Into::into))
                .await?;
            print_json(&outcome)
        }
        Commands::Execute {
            api_id,
            token,
            params,
            form,
            headers,
            body,
        } => {
            let form = DebugForm {
                params,
                headers,
                body,
                values: form.into_iter().collect(),
            };
            print_json(&ctx.execute(&api_id, token.as_deref(), &form).await?)
        }
        Commands::Token {
            client_id,
            client_secret,
        } => print_json(
            &ctx.credentials()
                .generate_token(&client_id, &client_secret)
                .await?,
        ),
    }
}

async fn run_apis(ctx: &ConsoleContext, action: ApisAction) -> ConsoleResult<()> {
    let lifecycle = ctx.lifecycle(VersionedKind::ApiAssignment);
    match action {
        ApisAction::List => print_json(&ctx.list_api_assignments().await?),
        ApisAction::Show { id } => print_json(&lifecycle.entity(&id).await?),
        ApisAction::State { id } => print_json(&lifecycle.state(&id).await?),
        ApisAction::Edit { id, content } => {
            let mut draft = ctx.get_api_assignment(&id).await?.api_context;
            draft.content = content;
            let request = UpdateApiAssignmentRequest {
                api_context: Some(draft),
                ..Default::default()
            };
            print_json(&ctx.update_api_assignment(&id, &request).await?)
        }
    }
}

async fn run_versions(
    ctx: &ConsoleContext,
    kind: VersionedKind,
    action: VersionsAction,
) -> ConsoleResult<()> {
    let lifecycle = ctx.lifecycle(kind);
    match action {
        VersionsAction::List { entity_id } => print_json(&lifecycle.list_versions(&entity_id).await?),
        VersionsAction::Show { version_id } => print_json(&lifecycle.get_version(&version_id).await?),
        VersionsAction::Create { entity_id, message } => {
            print_json(&lifecycle.create_version(&entity_id, message).await?)
        }
        VersionsAction::Delete {
            entity_id,
            version_id,
        } => {
            lifecycle.delete_version(&entity_id, &version_id).await?;
            print_json(&json!({ "deleted": version_id }))
        }
        VersionsAction::Restore {
            entity_id,
            version_id,
            yes,
        } => {
            if !yes {
                return Err(ConsoleError::validation(
                    "Restoring overwrites the current draft; pass --yes to confirm",
                ));
            }
            let entity = lifecycle
                .restore_version(&entity_id, &version_id, Confirmation::overwrite_draft())
                .await?;
            print_json(&entity)
        }
        VersionsAction::Publish {
            entity_id,
            version_id,
        } => print_json(&lifecycle.publish(&entity_id, &version_id).await?),
        VersionsAction::Unpublish { entity_id } => print_json(&lifecycle.unpublish(&entity_id).await?),
        VersionsAction::Revert {
            entity_id,
            version_id,
        } => {
            lifecycle
                .revert_version_to_draft(&entity_id, &version_id)
                .await?;
            print_json(&lifecycle.state(&entity_id).await?)
        }
        VersionsAction::State { entity_id } => print_json(&lifecycle.state(&entity_id).await?),
    }
}

async fn run_macros(ctx: &ConsoleContext, action: MacrosAction) -> ConsoleResult<()> {
    match action {
        MacrosAction::List => print_json(&ctx.list_macro_defs().await?),
        MacrosAction::Show { id } => print_json(
            &ctx.lifecycle(VersionedKind::MacroDef).entity(&id).await?,
        ),
        MacrosAction::Scope { api_id } => {
            let api = ctx.get_api_assignment(&api_id).await?;
            let mut scope = MacroScope::new(ctx.macros_for_api(&api_id).await?);
            scope.select_module(api.module_id.clone());

            let macro_type = MacroType::for_engine(api.execute_engine);
            print_json(&json!({
                "api_id": api.id,
                "module_id": api.module_id,
                "macros": scope.visible(),
                "preamble": scope.preamble(macro_type),
            }))
        }
        MacrosAction::Edit { id, content } => {
            let request = UpdateMacroDefRequest {
                content: Some(content),
                ..Default::default()
            };
            print_json(&ctx.update_macro_def(&id, &request).await?)
        }
    }
}

async fn run_clients(ctx: &ConsoleContext, action: ClientsAction) -> ConsoleResult<()> {
    let credentials = ctx.credentials();
    match action {
        ClientsAction::List => print_json(&credentials.list_clients().await?),
        ClientsAction::Show { id } => print_json(&credentials.get_client(&id).await?),
        ClientsAction::RegenerateSecret { id } => {
            let secret = credentials.regenerate_secret(&id).await?;
            eprintln!("Store this secret now; it cannot be retrieved again.");
            print_json(&json!({ "client_id": id, "client_secret": secret.reveal() }))
        }
    }
}

fn parse_form_value(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", arg))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> ConsoleResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    println!("{}", text);
    Ok(())
}

/// Initialize logging based on configuration
fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{prelude::*, EnvFilter};

    let log_config = &config.logging;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_config.level));

    let console_layer = matches!(log_config.target, LogTarget::Console | LogTarget::Both)
        .then(|| fmt_layer(&log_config.format, std::io::stderr, true));

    let (file_layer, guard) = match log_config.target {
        LogTarget::Console => (None, None),
        LogTarget::File | LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            (Some(fmt_layer(&log_config.format, writer, false)), Some(guard))
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized ({:?} to {:?})", log_config.format, log_config.target);
    guard
}

/// A formatting layer for one output
fn fmt_layer<S, W>(
    format: &LogFormat,
    writer: W,
    ansi: bool,
) -> Box<dyn tracing_subscriber::Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    use tracing_subscriber::{fmt, Layer};

    let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
    match format {
        LogFormat::Json => layer.json().with_target(true).boxed(),
        LogFormat::Compact => layer.compact().with_target(false).boxed(),
        LogFormat::Pretty => layer
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}
