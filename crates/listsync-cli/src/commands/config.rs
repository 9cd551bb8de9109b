use super::{build_client, prompts};
use crate::output::{mask_string, styled_table, Output};
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color};
use listsync_config::{default_scheduler_config, Config, CredentialStore, PathManager, TraktConfig};
use listsync_models::{Credential, UserRef};
use owo_colors::OwoColorize;
use serde_json::json;

const DEFAULT_API_URL: &str = "https://api.trakt.tv";

pub async fn run_config(cmd: crate::ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        crate::ConfigCommands::Show { full } => show_config(full, output),
        crate::ConfigCommands::Trakt {
            client_id,
            client_secret,
            default_user,
        } => configure_trakt(client_id, client_secret, default_user, output),
        crate::ConfigCommands::Token {
            user,
            access_token,
            refresh_token,
            expires_in,
        } => store_token(user, access_token, refresh_token, expires_in, output).await,
    }
}

fn show_config(full: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config_file = path_manager.config_file();

    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Run 'listsync config trakt' to create it.");
        return Ok(());
    }

    let config = Config::load_from_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    let users = stored_users(&path_manager)?;
    let secret = |value: &str| if full { value.to_string() } else { mask_string(value) };
    let scheduler = config.scheduler.clone().unwrap_or_else(default_scheduler_config);

    if !output.is_human() {
        output.json(&json!({
            "config_file": config_file.display().to_string(),
            "trakt": config.trakt.as_ref().map(|trakt| json!({
                "client_id": secret(&trakt.client_id),
                "client_secret": secret(&trakt.client_secret),
                "api_url": trakt.api_url,
                "default_user": trakt.default_user,
            })),
            "sync": config.sync,
            "scheduler": scheduler,
            "users": users.iter().map(UserRef::as_str).collect::<Vec<_>>(),
        }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    print_section_header("Configuration", output);
    let mut info_table = styled_table();
    info_table.set_header(vec![
        Cell::new("Config File").add_attribute(Attribute::Bold),
        Cell::new(config_file.display().to_string()),
    ]);
    info_table.add_row(vec![Cell::new("Lists File"), Cell::new(path_manager.lists_file().display().to_string())]);
    info_table.add_row(vec![Cell::new("Log Directory"), Cell::new(path_manager.log_dir().display().to_string())]);
    output.table(&info_table);

    match &config.trakt {
        Some(trakt) => {
            let mut trakt_table = section_table("Trakt");
            trakt_table.add_row(vec![Cell::new("Client ID"), Cell::new(secret(&trakt.client_id))]);
            trakt_table.add_row(vec![Cell::new("Client Secret"), Cell::new(secret(&trakt.client_secret))]);
            trakt_table.add_row(vec![Cell::new("API URL"), Cell::new(&trakt.api_url)]);
            trakt_table.add_row(vec![
                Cell::new("Default User"),
                Cell::new(trakt.default_user.as_deref().unwrap_or("<not set>")),
            ]);
            output.table(&trakt_table);
        }
        None => output.warn("Trakt is not configured. Run 'listsync config trakt'."),
    }

    let sync = &config.sync;
    let mut sync_table = section_table("Sync");
    for (key, value) in [
        ("Page Size", sync.page_size.to_string()),
        ("Page Delay", format!("{} ms", sync.page_delay_ms)),
        ("Request Timeout", format!("{} s", sync.request_timeout_secs)),
        ("Max Retries", sync.max_retries.to_string()),
        ("Retry Base Delay", format!("{} ms", sync.retry_base_delay_ms)),
        ("Concurrent Lists", sync.max_concurrent_lists.to_string()),
        ("Process Interval", format!("{} h", sync.process_interval_hours)),
    ] {
        sync_table.add_row(vec![Cell::new(key), Cell::new(value)]);
    }
    output.table(&sync_table);

    let mut scheduler_table = section_table("Scheduler");
    scheduler_table.add_row(vec![Cell::new("Schedule"), Cell::new(&scheduler.schedule)]);
    scheduler_table.add_row(vec![
        Cell::new("Run On Startup"),
        Cell::new(if scheduler.run_on_startup { "✓".green().to_string() } else { "✗".red().to_string() }),
    ]);
    output.table(&scheduler_table);

    let mut users_table = section_table("Stored Tokens");
    if users.is_empty() {
        users_table.add_row(vec![Cell::new("<none>"), Cell::new("Run 'listsync config token'")]);
    }
    let store = load_store(&path_manager)?;
    for user in &users {
        let status = match store.get(user) {
            Some(credential) if credential.is_expired(chrono::Utc::now()) => "expired, refreshed on next use".yellow().to_string(),
            Some(credential) => format!("valid until {}", credential.expires_at.format("%Y-%m-%d %H:%M UTC")),
            None => String::new(),
        };
        users_table.add_row(vec![Cell::new(user), Cell::new(status)]);
    }
    output.table(&users_table);
    Ok(())
}

fn configure_trakt(
    client_id_arg: Option<String>,
    client_secret_arg: Option<String>,
    default_user_arg: Option<String>,
    output: &Output,
) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create configuration directories: {}", e))?;

    let config_file = path_manager.config_file();
    let mut config = if config_file.exists() {
        Config::load_from_file(&config_file)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?
    } else {
        output.info("Configuration file not found. Creating default configuration...");
        Config {
            scheduler: Some(default_scheduler_config()),
            ..Config::default()
        }
    };
    let existing = config.trakt.take();

    print_section_header("Trakt API Setup", output);
    output.println("Follow the instructions to setup your Trakt API application:");
    print_instruction_list(
        &[
            "Login to Trakt and navigate to your API apps page: https://trakt.tv/oauth/applications",
            "Create a new API application named 'listsync'",
            "Use 'urn:ietf:wg:oauth:2.0:oob' as the Redirect URI",
        ],
        output,
    );
    output.println("");

    let known_id = existing.as_ref().map(|t| t.client_id.as_str()).filter(|id| is_set(id));
    let client_id = match client_id_arg {
        Some(id) => id,
        None => loop {
            let input = prompts::prompt_string("Trakt Client ID", known_id)?;
            match validate_client_id(&input) {
                Ok(()) => break input,
                Err(e) => output.error(format!("Validation error: {}", e)),
            }
        },
    };
    validate_client_id(&client_id).map_err(|e| color_eyre::eyre::eyre!("Invalid client id: {}", e))?;

    let client_secret = match client_secret_arg {
        Some(secret) => secret,
        None => {
            let keep = existing
                .as_ref()
                .map(|t| t.client_secret.clone())
                .filter(|secret| is_set(secret) && known_id == Some(client_id.as_str()));
            match keep {
                Some(secret) if !prompts::prompt_yes_no("Replace the stored client secret?", false)? => secret,
                _ => prompts::prompt_secret("Trakt Client Secret", false)?,
            }
        }
    };
    if client_secret.trim().is_empty() {
        return Err(color_eyre::eyre::eyre!("Client secret cannot be empty"));
    }

    let default_user = default_user_arg
        .or_else(|| existing.as_ref().and_then(|t| t.default_user.clone()))
        .filter(|user| !user.trim().is_empty());

    config.trakt = Some(TraktConfig {
        client_id,
        client_secret,
        api_url: existing
            .map(|t| t.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        default_user,
    });

    config
        .save_to_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save config to {}: {}", config_file.display(), e))?;
    tracing::info!(operation = "config_saved", path = %config_file.display(), "Trakt configuration saved");

    if output.is_human() {
        output.success(format!("Trakt configuration saved to {}", config_file.display()));
        output.info("Next, store a token with 'listsync config token'.");
    } else {
        output.json(&json!({ "success": true, "config_file": config_file.display().to_string() }));
    }
    Ok(())
}

async fn store_token(
    user_arg: Option<String>,
    access_token_arg: Option<String>,
    refresh_token_arg: Option<String>,
    expires_in: i64,
    output: &Output,
) -> Result<()> {
    if expires_in <= 0 {
        return Err(color_eyre::eyre::eyre!("--expires-in must be a positive number of seconds"));
    }

    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create configuration directories: {}", e))?;

    let access_token = match access_token_arg {
        Some(token) => token,
        None => prompts::prompt_secret("Access token", false)?,
    };
    let refresh_token = match refresh_token_arg {
        Some(token) => token,
        None => prompts::prompt_secret("Refresh token", false)?,
    };
    if access_token.trim().is_empty() || refresh_token.trim().is_empty() {
        return Err(color_eyre::eyre::eyre!("Access and refresh tokens cannot be empty"));
    }

    let user = match user_arg {
        Some(user) => user,
        None => {
            print_progress("Looking up the user this token belongs to...", output);
            let config = super::load_config(&path_manager)?;
            build_client(&config)?
                .username_for(&access_token)
                .await
                .map_err(|e| color_eyre::eyre::eyre!("Could not determine the token's user: {}", e))?
        }
    };

    let credential = Credential {
        user: UserRef::new(user),
        access_token,
        refresh_token,
        expires_at: chrono::Utc::now() + chrono::Duration::seconds(expires_in),
    };
    let expires_at = credential.expires_at;
    let user = credential.user.clone();

    let mut store = load_store(&path_manager)?;
    store.set(credential);
    store
        .save()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save credentials: {}", e))?;
    tracing::info!(operation = "token_stored", user = %user, "Stored token");

    if output.is_human() {
        output.success(format!(
            "Stored token for {} (expires {})",
            user.as_str().bright_cyan(),
            expires_at.format("%Y-%m-%d %H:%M UTC")
        ));
    } else {
        output.json(&json!({ "success": true, "user": user.as_str(), "expires_at": expires_at }));
    }
    Ok(())
}

fn load_store(path_manager: &PathManager) -> Result<CredentialStore> {
    let mut store = CredentialStore::new(path_manager.credentials_file());
    store
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load credentials: {}", e))?;
    Ok(store)
}

fn stored_users(path_manager: &PathManager) -> Result<Vec<UserRef>> {
    Ok(load_store(path_manager)?.users())
}

fn is_set(value: &str) -> bool {
    !value.is_empty() && value != "YOUR_CLIENT_ID" && value != "YOUR_CLIENT_SECRET"
}

fn validate_client_id(input: &str) -> Result<(), &'static str> {
    let input = input.trim();
    if input.is_empty() {
        return Err("Client ID cannot be empty");
    }
    if !input.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Client ID should only contain letters and digits");
    }
    Ok(())
}

// Formatting helpers

fn print_section_header(title: &str, output: &Output) {
    output.println("");
    output.println(format!("{}", title.bold().bright_cyan()));
    output.println(format!("{}", "─".repeat(title.len()).bright_cyan()));
}

fn print_instruction_list(items: &[&str], output: &Output) {
    for (idx, item) in items.iter().enumerate() {
        output.println(format!("  {}. {}", idx + 1, item));
    }
}

fn print_progress(message: &str, output: &Output) {
    output.println(format!("{} {}", "→".bright_blue(), message.bright_white()));
}

fn section_table(title: &str) -> comfy_table::Table {
    let mut table = styled_table();
    table.set_header(vec![Cell::new(title).fg(Color::Cyan).add_attribute(Attribute::Bold)]);
    table
}
