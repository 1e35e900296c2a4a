use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use clarity_store::config::ConfigError;
use clarity_store::export;
use clarity_store::models::{AmountInput, BudgetPatch, BudgetPeriod, ExpensePatch, NewBudget, NewExpense, UserProfile};
use clarity_store::notify::LogNotifier;
use clarity_store::remote::{ApiClient, RateLimiter};
use clarity_store::{LocalStore, MoneyStore, StorageError, StorageMode, StoreConfig, categories, session};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("file error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("not signed in; run `clarity login --profile <file>` first")]
    NotSignedIn,
}

#[derive(Parser, Debug)]
#[command(name = "clarity", about = "ClarityOS money manager storage CLI")]
struct Cli {
    /// Directory holding the local JSON documents.
    #[arg(long, env = "CLARITY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[arg(long, env = "CLARITY_API_BASE_URL")]
    api_base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Expense(ExpenseCommand),
    Budget(BudgetCommand),
    Category(CategoryCommand),
    Settings(SettingsCommand),
    Mode(ModeCommand),
    /// Store a signed-in profile (JSON file) and sync local data to it.
    Login {
        #[arg(long)]
        profile: PathBuf,
        /// Skip the post-login sync.
        #[arg(long)]
        no_sync: bool,
    },
    Logout,
    /// Push unsynced local records for the signed-in user.
    Sync,
    Export(ExportCommand),
    /// Replace local data with a JSON backup.
    Import {
        file: PathBuf,
    },
}

// =============================================================================
// EXPENSES / BUDGETS
// =============================================================================

#[derive(Args, Debug)]
struct ExpenseCommand {
    #[command(subcommand)]
    command: ExpenseSubcommand,
}

#[derive(Subcommand, Debug)]
enum ExpenseSubcommand {
    List,
    Add {
        #[arg(long)]
        description: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        category: String,
        /// `YYYY-MM-DD`
        #[arg(long)]
        date: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    Update {
        id: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Debug)]
struct BudgetCommand {
    #[command(subcommand)]
    command: BudgetSubcommand,
}

#[derive(Subcommand, Debug)]
enum BudgetSubcommand {
    List,
    Add {
        #[arg(long)]
        category: String,
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "monthly")]
        period: BudgetPeriod,
    },
    Update {
        id: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        period: Option<BudgetPeriod>,
    },
    Delete {
        id: String,
    },
    /// First budget set for a category.
    ForCategory {
        category: String,
    },
}

// =============================================================================
// CATEGORIES / SETTINGS / MODE / EXPORT
// =============================================================================

#[derive(Args, Debug)]
struct CategoryCommand {
    #[command(subcommand)]
    command: CategorySubcommand,
}

#[derive(Subcommand, Debug)]
enum CategorySubcommand {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "🏷️")]
        icon: String,
        #[arg(long)]
        color: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Debug)]
struct SettingsCommand {
    #[command(subcommand)]
    command: SettingsSubcommand,
}

#[derive(Subcommand, Debug)]
enum SettingsSubcommand {
    Show,
    /// Set one key; the value is parsed as JSON, falling back to a string.
    Set {
        key: String,
        value: String,
    },
}

#[derive(Args, Debug)]
struct ModeCommand {
    #[command(subcommand)]
    command: ModeSubcommand,
}

#[derive(Subcommand, Debug)]
enum ModeSubcommand {
    Show,
    Set {
        mode: StorageMode,
    },
}

#[derive(Args, Debug)]
struct ExportCommand {
    #[command(subcommand)]
    command: ExportSubcommand,

    /// Write to this file instead of stdout.
    #[arg(long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum ExportSubcommand {
    ExpensesCsv,
    BudgetsCsv,
    Backup,
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = StoreConfig::from_env()?.with_overrides(cli.data_dir, cli.api_base_url.as_deref())?;
    let store = LocalStore::open(&config.data_dir, config.local_quota_bytes)?;
    let notifier = Arc::new(LogNotifier);
    let client = ApiClient::new(&config, store.clone(), RateLimiter::new(config.rate_limit), notifier.clone())?;
    let money = MoneyStore::new(store, Arc::new(client), notifier);

    match cli.command {
        Command::Expense(cmd) => run_expense(&money, cmd.command).await,
        Command::Budget(cmd) => run_budget(&money, cmd.command).await,
        Command::Category(cmd) => run_category(money.store(), cmd.command),
        Command::Settings(cmd) => run_settings(money.store(), cmd.command),
        Command::Mode(cmd) => match cmd.command {
            ModeSubcommand::Show => print_json(&money.mode()),
            ModeSubcommand::Set { mode } => print_json(&money.switch_mode(mode).await?),
        },
        Command::Login { profile, no_sync } => run_login(&money, &profile, no_sync).await,
        Command::Logout => {
            session::logout(money.store())?;
            println!("signed out");
            Ok(())
        }
        Command::Sync => {
            let user = session::current_user(money.store()).ok_or(CliError::NotSignedIn)?;
            print_json(&money.sync_local_data(&user.id).await?)
        }
        Command::Export(cmd) => run_export(money.store(), cmd.command, cmd.output),
        Command::Import { file } => {
            let text = fs::read_to_string(file)?;
            print_json(&export::import_backup_json(money.store(), &text)?)
        }
    }
}

async fn run_expense(money: &MoneyStore, cmd: ExpenseSubcommand) -> Result<(), CliError> {
    match cmd {
        ExpenseSubcommand::List => print_json(&money.get_expenses().await?),
        ExpenseSubcommand::Add { description, amount, category, date, notes } => {
            let input = NewExpense { description, amount: AmountInput::Text(amount), category_id: category, date, notes };
            print_json(&money.add_expense(input).await?)
        }
        ExpenseSubcommand::Update { id, description, amount, category, date, notes } => {
            let patch = ExpensePatch {
                description,
                amount: amount.map(AmountInput::Text),
                category_id: category,
                date,
                notes,
            };
            print_json(&money.update_expense(&id, patch).await?)
        }
        ExpenseSubcommand::Delete { id } => print_json(&money.delete_expense(&id).await?),
    }
}

async fn run_budget(money: &MoneyStore, cmd: BudgetSubcommand) -> Result<(), CliError> {
    match cmd {
        BudgetSubcommand::List => print_json(&money.get_budgets().await?),
        BudgetSubcommand::Add { category, amount, period } => {
            let input = NewBudget { category_id: category, amount: AmountInput::Text(amount), period };
            print_json(&money.add_budget(input).await?)
        }
        BudgetSubcommand::Update { id, category, amount, period } => {
            let patch = BudgetPatch { category_id: category, amount: amount.map(AmountInput::Text), period };
            print_json(&money.update_budget(&id, patch).await?)
        }
        BudgetSubcommand::Delete { id } => print_json(&money.delete_budget(&id).await?),
        BudgetSubcommand::ForCategory { category } => print_json(&money.budget_for_category(&category).await?),
    }
}

fn run_category(store: &LocalStore, cmd: CategorySubcommand) -> Result<(), CliError> {
    match cmd {
        CategorySubcommand::List => print_json(&categories::get_categories(store)),
        CategorySubcommand::Add { name, icon, color } => print_json(&categories::add_category(store, &name, &icon, &color)?),
        CategorySubcommand::Delete { id } => {
            categories::delete_category(store, &id)?;
            println!("deleted {id}");
            Ok(())
        }
    }
}

fn run_settings(store: &LocalStore, cmd: SettingsSubcommand) -> Result<(), CliError> {
    match cmd {
        SettingsSubcommand::Show => print_json(&store.load_settings()),
        SettingsSubcommand::Set { key, value } => {
            let value = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
            let mut patch = serde_json::Map::new();
            patch.insert(key, value);
            print_json(&store.update_settings(patch)?)
        }
    }
}

async fn run_login(money: &MoneyStore, path: &Path, no_sync: bool) -> Result<(), CliError> {
    let profile: UserProfile = serde_json::from_str(&fs::read_to_string(path)?)?;
    let profile = session::login(money.store(), profile)?;
    eprintln!("signed in as {}", profile.email.as_deref().unwrap_or(&profile.id));
    if no_sync {
        return Ok(());
    }
    print_json(&money.sync_local_data(&profile.id).await?)
}

fn run_export(store: &LocalStore, cmd: ExportSubcommand, output: Option<PathBuf>) -> Result<(), CliError> {
    let text = match cmd {
        ExportSubcommand::ExpensesCsv => export::export_expenses_csv(store)?,
        ExportSubcommand::BudgetsCsv => export::export_budgets_csv(store)?,
        ExportSubcommand::Backup => export::export_backup_json(store)?,
    };
    match output {
        Some(path) => {
            fs::write(&path, text)?;
            eprintln!("wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
