use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use cyclemap_core::{
    ConfigManager, FilterCriteria, InitiativeWithProgress, JsonFileSource, LoggingConfig,
    ProgressMetrics, Selection,
};
use cyclemap_pipeline::{
    CyclePipeline, FilterOptions, FilterUpdate, ViewFilterManager, ViewKind, ViewProjection,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "cyclemap")]
#[command(about = "CycleMap CLI - Roadmap progress and cycle filtering", long_about = None)]
#[command(version)]
struct Cli {
    /// Tracker snapshot (JSON); defaults to source.snapshot_path
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Config file; defaults to ./.cyclemap.toml or ~/.cyclemap/config.toml
    #[arg(short, long, global = true, env = "CYCLEMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (json, pretty, table)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the unfiltered initiative hierarchy
    Build,

    /// Filter the hierarchy
    Filter {
        #[command(flatten)]
        filters: FilterArgs,

        /// Restrict to one cycle
        #[arg(long)]
        cycle: Option<String>,
    },

    /// Roadmap timeline across cycles
    Timeline {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Overview of a single cycle
    Overview {
        /// Cycle id
        #[arg(long)]
        cycle: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// List the values each filter accepts
    Options,

    /// Write a default config file
    InitConfig {
        /// Destination path
        path: PathBuf,
    },
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Area (case-insensitive)
    #[arg(long)]
    area: Option<String>,

    /// Initiative id; repeat for several
    #[arg(long = "initiative")]
    initiatives: Vec<String>,

    /// Release stage; repeat for several
    #[arg(long = "stage")]
    stages: Vec<String>,

    /// Assignee id; repeat for several
    #[arg(long = "assignee")]
    assignees: Vec<String>,
}

impl FilterArgs {
    fn to_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            area: self.area.as_deref().map(Selection::from),
            initiatives: selections(&self.initiatives),
            stages: selections(&self.stages),
            assignees: selections(&self.assignees),
            cycle: None,
        }
    }

    fn apply_to(&self, manager: &mut ViewFilterManager) -> Result<()> {
        let criteria = self.to_criteria();
        for update in [
            FilterUpdate::Area(criteria.area),
            FilterUpdate::Initiatives(criteria.initiatives),
            FilterUpdate::Stages(criteria.stages),
            FilterUpdate::Assignees(criteria.assignees),
        ] {
            manager.update_filter(update)?;
        }
        Ok(())
    }
}

fn selections(values: &[String]) -> Option<Vec<Selection>> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|value| Selection::id(value.as_str())).collect())
}

enum CommandOutput {
    Hierarchy {
        title: Option<String>,
        value: serde_json::Value,
        initiatives: Vec<InitiativeWithProgress>,
    },
    Options(FilterOptions),
    Message(serde_json::Value),
}

impl CommandOutput {
    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(match self {
            CommandOutput::Hierarchy { value, .. } => value.clone(),
            CommandOutput::Options(options) => serde_json::to_value(options)?,
            CommandOutput::Message(value) => value.clone(),
        })
    }
}

#[derive(Serialize)]
struct InitConfigResult {
    path: String,
    status: String,
}

#[derive(Tabled)]
struct ProgressRow {
    #[tabled(rename = "Level")]
    level: &'static str,
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Weeks")]
    weeks: f64,
    #[tabled(rename = "Done %")]
    progress: u8,
    #[tabled(rename = "With WIP %")]
    progress_with_in_progress: u8,
    #[tabled(rename = "Not to do %")]
    percentage_not_to_do: u8,
    #[tabled(rename = "Items done")]
    items: String,
}

impl ProgressRow {
    fn new(level: &'static str, id: &str, name: &str, metrics: &ProgressMetrics) -> Self {
        Self {
            level,
            id: id.to_string(),
            name: name.to_string(),
            weeks: metrics.weeks,
            progress: metrics.progress,
            progress_with_in_progress: metrics.progress_with_in_progress,
            percentage_not_to_do: metrics.percentage_not_to_do,
            items: format!("{}/{}", metrics.item_done_count, metrics.item_count),
        }
    }
}

#[derive(Tabled)]
struct OptionRow {
    #[tabled(rename = "Filter")]
    filter: &'static str,
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match execute_command(&cli) {
        Ok(output) => {
            print_output(&cli.output, &output)?;
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Load config, logging and the snapshot for commands that read tracker data.
fn load_pipeline(cli: &Cli) -> Result<CyclePipeline> {
    let manager = load_config(cli.config.as_deref())?;
    let config = manager.config();
    init_tracing(&config.logging, cli.verbose);
    if let Some(path) = manager.config_path() {
        debug!(path = %path.display(), "Loaded configuration");
    }

    let input = cli
        .input
        .clone()
        .or_else(|| config.source.snapshot_path.clone())
        .ok_or_else(|| anyhow!("No snapshot given; pass --input or set source.snapshot_path"))?;
    let source = JsonFileSource::new(&input);
    CyclePipeline::from_source(&source, &config.pipeline)
        .with_context(|| format!("Failed to load snapshot {}", input.display()))
}

fn load_config(path: Option<&Path>) -> Result<ConfigManager> {
    match path {
        Some(path) => ConfigManager::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => ConfigManager::load().context("Failed to load configuration"),
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "cyclemap={level},cyclemap_core={level},cyclemap_pipeline={level}"
        ))
    });

    // Logs go to stderr so json output stays parseable.
    let registry = tracing_subscriber::registry().with(filter);
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    match logging.format.as_str() {
        "json" => registry.with(layer.json()).init(),
        "compact" => registry.with(layer.compact()).init(),
        _ => registry.with(layer.pretty()).init(),
    }
}

fn execute_command(cli: &Cli) -> Result<CommandOutput> {
    match &cli.command {
        Commands::InitConfig { path } => init_config(path),

        Commands::Build => {
            let pipeline = load_pipeline(cli)?;
            Ok(CommandOutput::Hierarchy {
                title: None,
                value: serde_json::to_value(pipeline.base())?,
                initiatives: pipeline.base().initiatives.clone(),
            })
        }

        Commands::Filter { filters, cycle } => {
            let pipeline = load_pipeline(cli)?;
            let mut criteria = filters.to_criteria();
            criteria.cycle = cycle.as_deref().map(Selection::from);

            let result = pipeline.filtered(&criteria);
            let title = format!(
                "{} initiatives, {} roadmap items, {} release items",
                result.metadata.total_initiatives,
                result.metadata.total_roadmap_items,
                result.metadata.total_release_items
            );
            Ok(CommandOutput::Hierarchy {
                title: Some(title),
                value: serde_json::to_value(&result)?,
                initiatives: result.data.initiatives,
            })
        }

        Commands::Timeline { filters } => {
            let pipeline = load_pipeline(cli)?;
            let mut manager = ViewFilterManager::new(ViewKind::Roadmap);
            filters.apply_to(&mut manager)?;
            projection_output(pipeline.project(&manager))
        }

        Commands::Overview { cycle, filters } => {
            let pipeline = load_pipeline(cli)?;
            let mut manager = ViewFilterManager::new(ViewKind::CycleOverview);
            filters.apply_to(&mut manager)?;
            manager.update_filter(FilterUpdate::Cycle(Some(Selection::id(cycle.as_str()))))?;
            projection_output(pipeline.project(&manager))
        }

        Commands::Options => Ok(CommandOutput::Options(load_pipeline(cli)?.options())),
    }
}

fn projection_output(projection: ViewProjection) -> Result<CommandOutput> {
    let value = serde_json::to_value(&projection)?;
    let (title, initiatives) = match projection {
        ViewProjection::Roadmap(view) => (
            view.active_cycle
                .map(|cycle| format!("Active cycle: {}", cycle.name)),
            view.initiatives,
        ),
        ViewProjection::CycleOverview(view) => (
            Some(match view.cycle {
                Some(cycle) => format!("Cycle: {}", cycle.name),
                None => "Cycle: unknown".to_string(),
            }),
            view.initiatives,
        ),
    };

    Ok(CommandOutput::Hierarchy {
        title,
        value,
        initiatives,
    })
}

fn init_config(path: &Path) -> Result<CommandOutput> {
    ConfigManager::create_default_config(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let result = InitConfigResult {
        path: path.display().to_string(),
        status: "created".to_string(),
    };
    Ok(CommandOutput::Message(serde_json::to_value(result)?))
}

fn print_output(format: &OutputFormat, output: &CommandOutput) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output.to_json()?)?);
        }
        OutputFormat::Pretty => {
            print_pretty(output)?;
        }
        OutputFormat::Table => {
            print_table(output)?;
        }
    }
    Ok(())
}

fn print_pretty(output: &CommandOutput) -> Result<()> {
    match output {
        CommandOutput::Hierarchy {
            title, initiatives, ..
        } => {
            if let Some(title) = title {
                println!("{}\n", title.bold());
            }
            if initiatives.is_empty() {
                println!("{}", "No matching initiatives".yellow());
            }
            for initiative in initiatives {
                println!(
                    "{} {}",
                    initiative.name.cyan().bold(),
                    progress_summary(&initiative.progress)
                );
                for roadmap_item in &initiative.roadmap_items {
                    println!(
                        "  {} {}",
                        roadmap_item.item.name.green(),
                        progress_summary(&roadmap_item.progress)
                    );
                }
            }
        }
        CommandOutput::Options(options) => {
            print_list("areas", options.areas.clone());
            print_list("initiatives", options.initiatives.iter().map(label).collect());
            print_list("stages", options.stages.clone());
            print_list("assignees", options.assignees.iter().map(label).collect());
            print_list("cycles", options.cycles.iter().map(label).collect());
        }
        CommandOutput::Message(value) => print_value(value)?,
    }
    Ok(())
}

fn progress_summary(metrics: &ProgressMetrics) -> String {
    format!(
        "{} {} {} {}",
        format!("{}w", metrics.weeks).yellow(),
        format!("{}% done", metrics.progress).green(),
        format!("({}% with in progress)", metrics.progress_with_in_progress).dimmed(),
        format!("{}/{} items", metrics.item_done_count, metrics.item_count).dimmed()
    )
}

fn label(selection: &Selection) -> String {
    match &selection.name {
        Some(name) => format!("{} ({})", name, selection.id),
        None => selection.id.clone(),
    }
}

fn print_list(key: &str, values: Vec<String>) {
    let values = if values.is_empty() {
        "-".dimmed().to_string()
    } else {
        values.join(", ")
    };
    println!("{}: {}", key.cyan().bold(), values);
}

fn print_value(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    serde_json::Value::String(s) => println!("{}: {}", key_colored, s.green()),
                    serde_json::Value::Number(n) => {
                        println!("{}: {}", key_colored, n.to_string().yellow())
                    }
                    _ => println!("{}: {}", key_colored, val),
                }
            }
        }
        _ => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn print_table(output: &CommandOutput) -> Result<()> {
    match output {
        CommandOutput::Hierarchy {
            title, initiatives, ..
        } => {
            if let Some(title) = title {
                println!("{}", title.bold());
            }
            println!("{}", render(progress_rows(initiatives)));
        }
        CommandOutput::Options(options) => {
            println!("{}", render(option_rows(options)));
        }
        CommandOutput::Message(_) => print_pretty(output)?,
    }
    Ok(())
}

fn render<T: Tabled>(rows: Vec<T>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

fn progress_rows(initiatives: &[InitiativeWithProgress]) -> Vec<ProgressRow> {
    let mut rows = Vec::new();
    for initiative in initiatives {
        rows.push(ProgressRow::new(
            "initiative",
            &initiative.id,
            &initiative.name,
            &initiative.progress,
        ));
        for roadmap_item in &initiative.roadmap_items {
            rows.push(ProgressRow::new(
                "roadmap item",
                &roadmap_item.item.id,
                &roadmap_item.item.name,
                &roadmap_item.progress,
            ));
        }
    }
    rows
}

fn option_rows(options: &FilterOptions) -> Vec<OptionRow> {
    let plain = |filter: &'static str, values: &[String]| -> Vec<OptionRow> {
        values
            .iter()
            .map(|value| OptionRow {
                filter,
                id: value.clone(),
                name: value.clone(),
            })
            .collect()
    };
    let named = |filter: &'static str, values: &[Selection]| -> Vec<OptionRow> {
        values
            .iter()
            .map(|selection| OptionRow {
                filter,
                id: selection.id.clone(),
                name: selection.name.clone().unwrap_or_default(),
            })
            .collect()
    };

    let mut rows = plain("area", &options.areas);
    rows.extend(named("initiative", &options.initiatives));
    rows.extend(plain("stage", &options.stages));
    rows.extend(named("assignee", &options.assignees));
    rows.extend(named("cycle", &options.cycles));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_flags_build_criteria() {
        let cli = Cli::try_parse_from([
            "cyclemap", "--input", "snapshot.json", "filter", "--area", "Frontend", "--stage",
            "pilot", "--stage", "scale", "--cycle", "c2",
        ])
        .unwrap();

        match cli.command {
            Commands::Filter { filters, cycle } => {
                let criteria = filters.to_criteria();
                assert_eq!(criteria.active_area(), Some("Frontend"));
                assert_eq!(criteria.active_stages(), Some(vec!["pilot", "scale"]));
                assert!(criteria.initiatives.is_none());
                assert_eq!(cycle.as_deref(), Some("c2"));
            }
            _ => panic!("expected the filter command"),
        }
    }

    #[test]
    fn test_init_config_runs_without_a_snapshot() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let cli = Cli::try_parse_from([
            "cyclemap",
            "--input",
            "missing.json",
            "init-config",
            path.to_str().unwrap(),
        ])
        .unwrap();

        match execute_command(&cli).unwrap() {
            CommandOutput::Message(value) => assert_eq!(value["status"], "created"),
            _ => panic!("expected a message"),
        }
        assert!(path.exists());
    }

    #[test]
    fn test_overview_requires_cycle() {
        assert!(Cli::try_parse_from(["cyclemap", "overview"]).is_err());
    }

    #[test]
    fn test_filter_args_populate_manager() {
        let filters = FilterArgs {
            area: Some("mobile".to_string()),
            initiatives: vec!["i1".to_string()],
            ..FilterArgs::default()
        };
        let mut manager = ViewFilterManager::new(ViewKind::Roadmap);
        filters.apply_to(&mut manager).unwrap();

        let active = manager.switch_view(ViewKind::CycleOverview);
        assert_eq!(active.active_area(), Some("mobile"));
        assert_eq!(active.active_initiatives(), Some(vec!["i1"]));
    }
}
