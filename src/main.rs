mod ui;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tarefas::config::{Config, LoggingConfig, CONFIG_FILE};
use tarefas::error::AppError;
use tarefas::filtering::FilterCriterion;
use tarefas::service::{HttpTaskService, StaticTokenAuth};
use tarefas::sorting::{SortCriteria, SortOrder, SortSpec};
use tarefas::task::{Priority, Task, TaskDraft, TaskId, TaskPatch};
use tarefas::validation::required_text_field;
use tarefas::TaskStore;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "tarefas", version, about = "Task dashboard for a remote task service")]
struct Args {
    /// Config file (defaults to ./tarefas.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config into a directory
    Init {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Open the interactive dashboard (default)
    Dashboard,
    /// Print the task list
    List {
        #[arg(long)]
        sort: Option<SortCriteria>,
        #[arg(long)]
        order: Option<SortOrder>,
        #[arg(long)]
        filter: Option<FilterCriterion>,
    },
    /// Create a task
    Add {
        name: String,
        #[arg(long, default_value = "high")]
        priority: Priority,
    },
    /// Rename a task or change its priority
    Edit {
        id: TaskId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
    },
    /// Mark a task as completed (or not, with --undo)
    Check {
        id: TaskId,
        #[arg(long)]
        undo: bool,
    },
    /// Delete a task
    Remove { id: TaskId },
    /// Show task counts
    Stats,
}

fn main() {
    if let Err(e) = real_main() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), AppError> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Commands::Dashboard);

    if let Commands::Init { dir } = &command {
        return init(dir);
    }

    let config_path = args.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config = Config::load(&config_path)?;
    let interactive = matches!(command, Commands::Dashboard);
    init_tracing(&config.logging, interactive).map_err(AppError::Config)?;

    // Store operations share one worker thread; the dashboard loop stays on
    // the main thread and hands work to it.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;

    let store = build_store(&config)?;
    tracing::debug!(api_url = %config.api_url, command = ?command, "starting");

    if interactive {
        if !store.is_authenticated() {
            return Err(AppError::NotAuthenticated);
        }
        ui::run(store, runtime.handle().clone())?;
        return Ok(());
    }

    runtime.block_on(run_command(command, store, &config))
}

fn init(dir: &Path) -> Result<(), AppError> {
    if Config::init(dir)? {
        println!("Config written to {}", dir.join(CONFIG_FILE).display());
    } else {
        println!("Already initialized in {}.", dir.display());
    }
    Ok(())
}

fn build_store(config: &Config) -> Result<TaskStore, AppError> {
    let service = HttpTaskService::new(&config.api_url, config.timeout_ms)?;
    let auth = StaticTokenAuth::new(config.access_token.clone());
    Ok(TaskStore::with_views(
        Arc::new(service),
        Arc::new(auth),
        config.sort,
        config.filter,
    ))
}

async fn run_command(command: Commands, store: TaskStore, config: &Config) -> Result<(), AppError> {
    if !store.is_authenticated() {
        return Err(AppError::NotAuthenticated);
    }
    store.load().await?;
    let sort = config.sort;

    match command {
        Commands::List {
            sort: criteria,
            order,
            filter,
        } => {
            store.sort_tasks(SortSpec::new(
                criteria.unwrap_or(sort.criteria),
                order.unwrap_or(sort.order),
            ));
            store.filter_tasks(filter.unwrap_or(config.filter));
            for task in store.filtered_tasks() {
                print_task(&task);
            }
        }
        Commands::Add { name, priority } => {
            let name = required_text_field(&name)
                .map_err(|source| AppError::Validation {
                    field: "name",
                    source,
                })?
                .trim()
                .to_string();
            store.create(TaskDraft { name, priority }, sort).await?;
            println!("Task created.");
        }
        Commands::Edit { id, name, priority } => {
            let name = match name {
                Some(name) => Some(
                    required_text_field(&name)
                        .map_err(|source| AppError::Validation {
                            field: "name",
                            source,
                        })?
                        .trim()
                        .to_string(),
                ),
                None => None,
            };
            let patch = TaskPatch {
                name,
                priority,
                is_completed: None,
            };
            if patch.is_empty() {
                println!("Nothing to change.");
                return Ok(());
            }
            edit_existing(&store, id, patch, sort).await?;
            println!("Task {id} updated.");
        }
        Commands::Check { id, undo } => {
            edit_existing(&store, id, TaskPatch::completed(!undo), sort).await?;
            println!("Task {id} marked as {}.", if undo { "open" } else { "done" });
        }
        Commands::Remove { id } => {
            if store.find(id).is_none() {
                return Err(AppError::TaskNotFound(id));
            }
            store.remove(id).await?;
            println!("Task {id} removed.");
        }
        Commands::Stats => {
            let stats = store.stats();
            println!("total: {}", stats.total);
            println!("completed: {}", stats.completed);
            println!("uncompleted: {}", stats.uncompleted);
            println!("high: {}", stats.high);
            println!("low: {}", stats.low);
        }
        Commands::Init { .. } | Commands::Dashboard => {}
    }
    Ok(())
}

async fn edit_existing(
    store: &TaskStore,
    id: TaskId,
    patch: TaskPatch,
    sort: SortSpec,
) -> Result<(), AppError> {
    if store.find(id).is_none() {
        return Err(AppError::TaskNotFound(id));
    }
    store.edit(id, patch, sort).await?;
    Ok(())
}

fn print_task(task: &Task) {
    let check = if task.is_completed { "x" } else { " " };
    println!("- [{}] #{} {} ({})", check, task.id, task.name, task.priority);
}

fn init_tracing(logging: &LoggingConfig, interactive: bool) -> Result<(), String> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;
    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => PathBuf::from(d),
            None => std::env::temp_dir().join("tarefas"),
        };
        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let appender = tracing_appender::rolling::never(dir, "tarefas.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    // stderr would tear the dashboard's alternate screen.
    let console_layer = (logging.console && !interactive).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
    });
    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
