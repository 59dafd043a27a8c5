use clap::{Arg, ArgAction, Command};
use shell_ai::config::Config;
use shell_ai::llm_client::{LlmClient, ShellCommandGenerator};
use shell_ai::prompter::{PlainPrompter, Prompter, RichPrompter};
use shell_ai::session::{Session, SessionSettings};
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("shai")
        .about("Turn natural language into shell commands")
        .long_about(
            "shai asks an LLM for shell commands that satisfy a plain-English request, \
             lets you pick and edit one, and runs it",
        )
        .arg(Arg::new("prompt")
            .help("What you want to do, as a single sentence")
            .num_args(1..))
        .arg(Arg::new("debug")
            .long("debug")
            .help("Enable debug logging")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("ctx")
            .long("ctx")
            .help("Context mode: feed command output back into the next request")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("show-config")
            .long("show-config")
            .help("Show configuration information")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("plain")
            .long("plain")
            .help("Use the line-based prompts even on a terminal")
            .action(ArgAction::SetTrue))
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "shell_ai=debug,shai=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "<unset>".to_string()
    } else {
        format!("{}****", secret.chars().take(3).collect::<String>())
    }
}

async fn run_session<P: Prompter>(
    config: &Config,
    client: Arc<dyn ShellCommandGenerator>,
    prompter: P,
    prompt: &str,
) -> anyhow::Result<()> {
    let mut session = Session::new(SessionSettings::from(config), client, prompter, io::stdout());
    session.run(prompt).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if matches.get_flag("debug") {
        config.debug = true;
    }
    if matches.get_flag("ctx") {
        config.context_mode = true;
    }

    init_tracing(config.debug);
    debug!(
        "Resolved config: provider={} openai_model={} groq_model={} openai_key={} groq_key={} suggestions={} temperature={} context_mode={}",
        config.api_provider,
        config.openai_model,
        config.groq_model,
        mask_secret(&config.openai_api_key),
        mask_secret(&config.groq_api_key),
        config.suggestion_count,
        config.temperature,
        config.context_mode,
    );

    if matches.get_flag("show-config") {
        if let Err(e) = config.show_config_info() {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    if let Err(e) = config.require_credentials() {
        eprintln!("Error: {}", e);
        if let Ok(path) = Config::get_config_path() {
            eprintln!("You can also add it to {}", path.display());
        }
        return ExitCode::FAILURE;
    }

    let client = match LlmClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error creating LLM client: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let prompt = matches
        .get_many::<String>("prompt")
        .unwrap_or_default()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    let prompt = prompt.trim();

    if prompt.is_empty() {
        println!("Describe what you want to do as a single sentence. `shai <sentence>`");
        return ExitCode::SUCCESS;
    }

    info!("Processing prompt: {}", prompt);

    let client: Arc<dyn ShellCommandGenerator> = Arc::new(client);
    let interactive =
        !matches.get_flag("plain") && io::stdin().is_terminal() && io::stdout().is_terminal();

    let result = if interactive {
        run_session(&config, client, RichPrompter::new(), prompt).await
    } else {
        run_session(&config, client, PlainPrompter::stdio(), prompt).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_joins_prompt_words() {
        let matches = cli().try_get_matches_from(["shai", "list", "all", "files"]).unwrap();
        let words: Vec<&String> = matches.get_many::<String>("prompt").unwrap().collect();
        assert_eq!(words, vec!["list", "all", "files"]);
    }

    #[test]
    fn test_cli_flags() {
        let matches = cli()
            .try_get_matches_from(["shai", "--ctx", "--debug", "--plain", "show", "disk"])
            .unwrap();
        assert!(matches.get_flag("ctx"));
        assert!(matches.get_flag("debug"));
        assert!(matches.get_flag("plain"));
        assert!(!matches.get_flag("show-config"));
    }

    #[test]
    fn test_cli_prompt_is_optional() {
        let matches = cli().try_get_matches_from(["shai"]).unwrap();
        assert!(matches.get_many::<String>("prompt").is_none());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "<unset>");
        assert_eq!(mask_secret("gsk_abcdef"), "gsk****");
    }
}
