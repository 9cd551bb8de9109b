use super::prompts;
use super::{build_engine, load_config, load_registry, save_registry};
use crate::output::{styled_table, Output};
use crate::ListCommands;
use clap::{ArgAction, Args};
use color_eyre::Result;
use comfy_table::Cell;
use listsync_config::{Config, PathManager};
use listsync_models::{FilterSpec, ListState, MediaKind, Range, RemoteList, SearchField, UserRef};
use owo_colors::OwoColorize;
use serde_json::json;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Name of the list on Trakt
    pub name: String,

    /// What the list holds
    #[arg(long, default_value = "movie")]
    pub kind: MediaKind,

    /// Owner of the list (defaults to trakt.default_user)
    #[arg(long)]
    pub owner: Option<String>,

    /// Free-text search query
    #[arg(long, default_value = "")]
    pub query: String,

    /// Fields the query is matched against (title, tagline, overview, people, translations, aliases)
    #[arg(long = "field", value_name = "FIELD")]
    pub fields: Vec<SearchField>,

    /// Release years, e.g. 2000-2020, 2010-, -1999 or 2015
    #[arg(long, value_name = "RANGE")]
    pub years: Option<Range<u32>>,

    /// Runtime in minutes, e.g. 80-120
    #[arg(long, value_name = "RANGE")]
    pub runtimes: Option<Range<u32>>,

    /// Trakt rating 0-100, e.g. 70-
    #[arg(long, value_name = "RANGE")]
    pub ratings: Option<Range<u32>>,

    #[arg(long = "genre", value_name = "SLUG")]
    pub genres: Vec<String>,

    #[arg(long = "language", value_name = "CODE")]
    pub languages: Vec<String>,

    #[arg(long = "country", value_name = "CODE")]
    pub countries: Vec<String>,

    /// Content certification (shows only)
    #[arg(long = "certification", value_name = "SLUG")]
    pub certifications: Vec<String>,

    /// Network (shows only)
    #[arg(long = "network", value_name = "NAME")]
    pub networks: Vec<String>,

    /// Create the list without scheduling it for processing
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_process: bool,
}

impl CreateArgs {
    fn filter(&self) -> FilterSpec {
        FilterSpec {
            query: self.query.clone(),
            search_fields: self.fields.iter().copied().collect(),
            years: self.years.unwrap_or_default(),
            runtimes: self.runtimes.unwrap_or_default(),
            ratings: self.ratings.unwrap_or_default(),
            genres: self.genres.iter().cloned().collect(),
            languages: self.languages.iter().cloned().collect(),
            countries: self.countries.iter().cloned().collect(),
            certifications: self.certifications.iter().cloned().collect(),
            networks: self.networks.iter().cloned().collect(),
        }
    }
}

pub async fn run_lists(cmd: ListCommands, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create directories: {}", e))?;

    match cmd {
        ListCommands::Create(args) => create_list(args, &path_manager, output).await,
        ListCommands::Get { id, owner } => get_list(id, owner, &path_manager, output).await,
        ListCommands::Rename { id, name } => rename_list(id, name, &path_manager, output).await,
        ListCommands::Delete { id, yes } => delete_list(id, yes, &path_manager, output).await,
        ListCommands::Show { kind } => show_lists(kind, &path_manager, output),
    }
}

fn resolve_owner(owner: Option<String>, config: &Config) -> Result<UserRef> {
    owner
        .or_else(|| config.trakt.as_ref().and_then(|trakt| trakt.default_user.clone()))
        .map(UserRef::new)
        .ok_or_else(|| color_eyre::eyre::eyre!("No owner given. Pass --owner or set trakt.default_user with 'listsync config trakt --default-user'."))
}

async fn create_list(args: CreateArgs, path_manager: &PathManager, output: &Output) -> Result<()> {
    let config = load_config(path_manager)?;
    let engine = build_engine(&config, path_manager)?;
    let owner = resolve_owner(args.owner.clone(), &config)?;

    let filter = args.filter();
    let list = RemoteList::new(args.name.clone(), owner, args.kind, filter);
    let mut created = engine.create(list).await?;
    if args.no_process {
        created.process = false;
    }

    let mut registry = load_registry(path_manager)?;
    registry
        .upsert(created.clone())
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
    save_registry(&registry, path_manager)?;

    if output.is_human() {
        output.success(format!(
            "Created {} list '{}' (id {}, slug {})",
            created.item_kind,
            created.name,
            created.id.unwrap_or_default(),
            created.label().bright_cyan()
        ));
        if created.process {
            output.info("It will be filled on the next 'listsync sync' or scheduled run.");
        }
    } else {
        output.json(&json!({ "state": ListState::Created.to_string(), "list": created }));
    }
    Ok(())
}

async fn get_list(id: u64, owner: Option<String>, path_manager: &PathManager, output: &Output) -> Result<()> {
    let config = load_config(path_manager)?;
    let engine = build_engine(&config, path_manager)?;
    let owner = owner.map(UserRef::new);

    let summary = engine.get(id, owner.as_ref()).await?;
    let managed = load_registry(path_manager)?.get(id).is_some();

    if output.is_human() {
        let mut table = styled_table();
        table.set_header(vec!["Id", "Slug", "Name", "Managed"]);
        table.add_row(vec![
            Cell::new(summary.id),
            Cell::new(&summary.slug),
            Cell::new(&summary.name),
            Cell::new(if managed { "✓".green().to_string() } else { "✗".red().to_string() }),
        ]);
        output.table(&table);
    } else {
        output.json(&json!({
            "id": summary.id,
            "slug": summary.slug,
            "name": summary.name,
            "managed": managed,
        }));
    }
    Ok(())
}

async fn rename_list(id: u64, name: String, path_manager: &PathManager, output: &Output) -> Result<()> {
    let config = load_config(path_manager)?;
    let engine = build_engine(&config, path_manager)?;
    let mut registry = load_registry(path_manager)?;

    let mut list = registry
        .get(id)
        .cloned()
        .ok_or_else(|| color_eyre::eyre::eyre!("No managed list with id {}", id))?;
    let old_name = std::mem::replace(&mut list.name, name);

    let updated = engine.update(list).await?;
    registry
        .upsert(updated.clone())
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
    save_registry(&registry, path_manager)?;

    if output.is_human() {
        output.success(format!("Renamed '{}' to '{}' (slug {})", old_name, updated.name, updated.label()));
    } else {
        output.json(&json!({ "state": ListState::Updated.to_string(), "list": updated }));
    }
    Ok(())
}

async fn delete_list(id: u64, yes: bool, path_manager: &PathManager, output: &Output) -> Result<()> {
    let config = load_config(path_manager)?;
    let mut registry = load_registry(path_manager)?;

    let list = registry
        .get(id)
        .cloned()
        .ok_or_else(|| color_eyre::eyre::eyre!("No managed list with id {}", id))?;

    if !confirm_delete(&list, yes, output)? {
        output.info("Aborted.");
        return Ok(());
    }

    let engine = build_engine(&config, path_manager)?;
    engine.delete(&list).await?;
    registry.remove(id);
    save_registry(&registry, path_manager)?;

    if output.is_human() {
        output.success(format!("Deleted '{}'", list.name));
    } else {
        output.json(&json!({ "state": ListState::Deleted.to_string(), "id": id }));
    }
    Ok(())
}

/// Deletion is irreversible: `--yes` or an interactive answer, never silence
fn confirm_delete(list: &RemoteList, yes: bool, output: &Output) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if !output.is_human() {
        return Err(color_eyre::eyre::eyre!(
            "Refusing to delete '{}' without confirmation. Pass --yes when using machine-readable output.",
            list.name
        ));
    }
    let prompt = format!("Delete '{}' from Trakt? This cannot be undone", list.name);
    prompts::prompt_yes_no(&prompt, false)
}

fn show_lists(kind: Option<MediaKind>, path_manager: &PathManager, output: &Output) -> Result<()> {
    let registry = load_registry(path_manager)?;
    let lists: Vec<&RemoteList> = registry
        .all()
        .iter()
        .filter(|list| kind.map_or(true, |k| list.item_kind == k))
        .collect();

    if !output.is_human() {
        output.json(&json!({ "lists": lists }));
        return Ok(());
    }

    if lists.is_empty() {
        output.info("No managed lists. Create one with 'listsync lists create'.");
        return Ok(());
    }

    let mut table = styled_table();
    table.set_header(vec!["Id", "Name", "Slug", "Kind", "Owner", "Process", "Last processed"]);
    for list in lists {
        table.add_row(vec![
            Cell::new(list.id.map(|id| id.to_string()).unwrap_or_default()),
            Cell::new(&list.name),
            Cell::new(list.slug.as_deref().unwrap_or("-")),
            Cell::new(list.item_kind),
            Cell::new(&list.owner),
            Cell::new(if list.process { "✓".green().to_string() } else { "✗".red().to_string() }),
            Cell::new(
                list.last_processed
                    .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| "never".to_string()),
            ),
        ]);
    }
    output.table(&table);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: CreateArgs,
    }

    #[test]
    fn test_create_args_build_filter() {
        let harness = Harness::parse_from([
            "listsync",
            "HBO Dramas",
            "--kind",
            "show",
            "--years",
            "2000-2020",
            "--ratings",
            "70-",
            "--genre",
            "drama",
            "--network",
            "HBO",
            "--field",
            "title",
        ]);
        let filter = harness.args.filter();

        assert_eq!(harness.args.kind, MediaKind::Show);
        assert_eq!(filter.years, Range::between(2000, 2020));
        assert_eq!(filter.ratings, Range::new(Some(70), None));
        assert!(filter.runtimes.is_open());
        assert!(filter.genres.contains("drama"));
        assert!(filter.networks.contains("HBO"));
        assert!(filter.search_fields.contains(&SearchField::Title));
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn test_resolve_owner_falls_back_to_default_user() {
        let config: Config = toml_config("alice");
        assert_eq!(resolve_owner(None, &config).unwrap(), UserRef::new("alice"));
        assert_eq!(resolve_owner(Some("bob".to_string()), &config).unwrap(), UserRef::new("bob"));
        assert!(resolve_owner(None, &Config::default()).is_err());
    }

    #[test]
    fn test_json_delete_requires_yes() {
        let list = RemoteList::new("Dramas", UserRef::new("alice"), MediaKind::Movie, FilterSpec::default());
        let json = Output::new(OutputFormat::Json, false);
        let pretty = Output::new(OutputFormat::JsonPretty, true);

        let err = confirm_delete(&list, false, &json).unwrap_err();
        assert!(err.to_string().contains("--yes"));
        assert!(confirm_delete(&list, false, &pretty).is_err());
        assert!(confirm_delete(&list, true, &json).unwrap());
    }

    fn toml_config(default_user: &str) -> Config {
        let mut config = Config::default();
        config.trakt = Some(listsync_config::TraktConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            api_url: "https://api.trakt.tv".to_string(),
            default_user: Some(default_user.to_string()),
        });
        config
    }
}
