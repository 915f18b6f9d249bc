//! wechat-notify CLI entry point.
//!
//! Works as an Ansible binary module (the JSON args file is the single
//! positional argument) or as a plain command driven by flags. Exactly one
//! JSON report is printed on stdout; logs go to stderr.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, warn};

use wechat_notify::config::{LogConfig, NotifyConfig};
use wechat_notify::credentials::load_env_file;
use wechat_notify::gateway::{Endpoints, ReqwestTransport};
use wechat_notify::invocation::{Invocation, InvocationReport, NotifyParams};
use wechat_notify::logging::{self, LoggingGuard};

/// Send a text message through the WeCom enterprise gateway.
#[derive(Parser)]
#[command(name = "wechat-notify", version, about)]
struct Cli {
    /// Ansible-style JSON arguments file. Flags override its values.
    args_file: Option<PathBuf>,

    /// Corp id.
    #[arg(long, env = "WECHAT_CORP_ID", hide_env_values = true)]
    corp_id: Option<String>,

    /// Application secret.
    #[arg(long, env = "WECHAT_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Application agent id.
    #[arg(long)]
    agent_id: Option<String>,

    /// Message body.
    #[arg(long)]
    msg: Option<String>,

    /// User ids joined by '|', or @all. Defaults to @all when no target is given.
    #[arg(long)]
    touser: Option<String>,

    /// Department ids joined by '|'.
    #[arg(long)]
    toparty: Option<String>,

    /// Tag ids joined by '|'. Only sent together with --toparty.
    #[arg(long)]
    totag: Option<String>,

    /// Validate arguments only; make no network calls.
    #[arg(long)]
    check: bool,

    /// Dotenv file holding WECHAT_CORP_ID and WECHAT_SECRET.
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Config file (default: $WECHAT_NOTIFY_CONFIG or ./wechat-notify.toml).
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> NotifyParams {
        NotifyParams {
            corp_id: self.corp_id.clone(),
            secret: self.secret.clone(),
            agent_id: self.agent_id.clone(),
            msg: self.msg.clone(),
            touser: self.touser.clone(),
            toparty: self.toparty.clone(),
            totag: self.totag.clone(),
            check_mode: self.check,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match NotifyConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            logging::init_cli(&LogConfig::default().level);
            error!(error = %err, "failed to load configuration");
            return emit(&InvocationReport::failure(None, err.to_string()));
        }
    };

    let _logging_guard = init_logging(&config.log);

    let report = match execute(&cli, &config).await {
        Ok(report) => report,
        Err(err) => {
            // Only the outermost context: inner causes may quote env-file lines.
            error!(error = %err, "invocation setup failed");
            InvocationReport::failure(cli.msg.clone(), err.to_string())
        }
    };

    emit(&report)
}

/// Merge parameter sources, build the gateway client, and run.
async fn execute(cli: &Cli, config: &NotifyConfig) -> anyhow::Result<InvocationReport> {
    let mut params = match &cli.args_file {
        Some(path) => NotifyParams::from_args_file(path)?,
        None => NotifyParams::default(),
    };
    params = params.merge(cli.overrides());

    if let Some(path) = &cli.env_file {
        let env = load_env_file(path)
            .with_context(|| format!("failed to load credentials from {}", path.display()))?;
        params.fill_credentials(&env);
    }
    debug!(?params, "parameters resolved");

    let endpoints =
        Endpoints::new(&config.gateway.base_url).context("invalid [gateway] base_url")?;
    let transport = ReqwestTransport::new(&config.gateway);

    Ok(Invocation::new(&transport, &endpoints).run(params).await)
}

fn init_logging(config: &LogConfig) -> Option<LoggingGuard> {
    let Some(dir) = &config.dir else {
        logging::init_cli(&config.level);
        return None;
    };

    match logging::init_with_file(dir, &config.level) {
        Ok(guard) => Some(guard),
        Err(err) => {
            logging::init_cli(&config.level);
            warn!(error = %err, "file logging unavailable, using console only");
            None
        }
    }
}

fn emit(report: &InvocationReport) -> ExitCode {
    match report.to_json() {
        Ok(json) => println!("{json}"),
        Err(err) => {
            error!(error = %err, "failed to encode report");
            println!(r#"{{"changed":false,"failed":true,"wechat_error":"failed to encode report"}}"#);
            return ExitCode::FAILURE;
        }
    }
    report.exit_code()
}
