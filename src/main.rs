use std::{
    collections::HashSet,
    env, fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use spark_rest_client::{config::load_config, ClientConfig, SubmissionClient};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML client configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Master REST address as host:port, overrides the configuration
    #[arg(short, long)]
    master: Option<String>,
    #[command(subcommand)]
    command: SubCommands,
}

#[derive(Subcommand, Debug)]
enum SubCommands {
    Submit {
        app_name: String,
        main_class: String,
        app_resource: String,
        #[arg(short, long = "jar")]
        jars: Vec<String>,
        #[arg(last = true)]
        app_args: Vec<String>,
    },
    Kill {
        submission_id: String,
    },
    Status {
        submission_id: String,
    },
}

fn config_candidates(home: Option<String>, env_path: Option<String>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = env_path {
        candidates.push(PathBuf::from(path));
    }
    candidates.push(PathBuf::from("./spark-rest.yml"));
    if let Some(home) = home {
        candidates.push(PathBuf::from(home).join(".config/spark-rest.yml"));
    }
    candidates
}

/// An explicit `--config` must load; the search path is best effort.
fn load_explicit(path: &Path) -> Result<ClientConfig, String> {
    let content = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    serde_yaml::from_str(&content)
        .map_err(|err| format!("failed to parse config {}: {}", path.display(), err))
}

fn resolve_config(
    explicit: Option<PathBuf>,
    master: Option<String>,
    candidates: Vec<PathBuf>,
) -> Result<ClientConfig, String> {
    let loaded = match explicit {
        Some(path) => Some(load_explicit(&path)?),
        None => load_config::<ClientConfig, _>(candidates.as_slice()),
    };
    match (loaded, master) {
        (Some(config), Some(master)) => Ok(config.with_master(&master)),
        (Some(config), None) => Ok(config),
        (None, Some(master)) => Ok(ClientConfig::builder(&master).build()),
        (None, None) => Err("no configuration found and no --master given".to_string()),
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let candidates = config_candidates(env::var("HOME").ok(), env::var("SPARK_REST_CONFIG").ok());
    let config = resolve_config(cli.config, cli.master, candidates)?;
    let client = SubmissionClient::new(config).map_err(|e| e.to_string())?;
    match cli.command {
        SubCommands::Submit { app_name, main_class, app_resource, jars, app_args } => {
            let jars = jars.into_iter().collect::<HashSet<_>>();
            let submission_id = client
                .submit_job(&app_name, &main_class, &app_resource, &app_args, Some(&jars))
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", submission_id);
        }
        SubCommands::Kill { submission_id } => {
            client.kill_job(&submission_id).await.map_err(|e| e.to_string())?;
            println!("killed {}", submission_id);
        }
        SubCommands::Status { submission_id } => {
            let status = client.status(&submission_id).await.map_err(|e| e.to_string())?;
            match (status.driver_state, status.worker_host_port) {
                (Some(state), Some(worker)) => println!("{} on {}", state, worker),
                (Some(state), None) => println!("{}", state),
                (None, _) => return Err("master returned a status without a driver state".to_string()),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
