use anyhow::Result;
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing::debug;

use ouvidoria::commands;
use ouvidoria::commands::dashboard::Preset;
use ouvidoria::config::Config;
use ouvidoria::logging;

#[derive(Parser)]
#[command(name = "ouvidoria")]
#[command(about = "Ombudsman ticket tracker with reporting")]
#[command(version)]
struct Cli {
    /// Path to the ticket database (defaults to .ouvidoria/tickets.db)
    #[arg(long, global = true, env = "OUVIDORIA_DB")]
    db: Option<PathBuf>,

    /// Email of the user to act as
    #[arg(long = "as", global = true, env = "OUVIDORIA_USER")]
    actor: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize ouvidoria in the current directory
    Init {
        /// Email of a first administrator to create
        #[arg(long, requires = "admin_name")]
        admin_email: Option<String>,
        /// Name of the first administrator
        #[arg(long)]
        admin_name: Option<String>,
    },

    /// Manage ticket categories
    Category {
        #[command(subcommand)]
        action: CategoryCommands,
    },

    /// Manage category items
    Item {
        #[command(subcommand)]
        action: ItemCommands,
    },

    /// Manage ticket types
    Type {
        #[command(subcommand)]
        action: TypeCommands,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// File a new ticket
    Create {
        /// Ticket title
        title: String,
        /// Category name
        #[arg(short, long)]
        category: String,
        /// Ticket description
        #[arg(short, long)]
        description: Option<String>,
        /// Item within the category
        #[arg(short, long)]
        item: Option<String>,
        /// Ticket type
        #[arg(long = "type")]
        kind: Option<String>,
    },

    /// List tickets
    List {
        /// Filter by status (waiting, in_progress, proceeding, not_proceeding, done, all)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show ticket details
    Show {
        /// Ticket ID
        id: String,
    },

    /// Change a ticket's status (staff or admin)
    Status {
        /// Ticket ID
        id: String,
        /// New status
        status: String,
        /// Message title
        #[arg(short, long)]
        title: Option<String>,
        /// Message text sent to the requester
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Print a report as JSON (admin)
    Report {
        /// Report type (quantity, byCategory, resolutionDuration)
        report_type: String,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,
        /// Last day, YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,
    },

    /// Show the reporting dashboard (admin)
    Dashboard {
        /// First day, YYYY-MM-DD
        #[arg(long, conflicts_with_all = ["month", "today"])]
        start: Option<String>,
        /// Last day, YYYY-MM-DD
        #[arg(long, conflicts_with_all = ["month", "today"])]
        end: Option<String>,
        /// Limit to the current month
        #[arg(long, conflicts_with = "today")]
        month: bool,
        /// Limit to today
        #[arg(long)]
        today: bool,
    },

    /// Export tickets to JSON
    Export {
        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Fill the database with demo data
    Seed {
        /// Number of tickets to create
        #[arg(short = 'n', long, default_value_t = 100)]
        count: usize,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Add a category
    Add {
        /// Category name
        name: String,
    },
    /// List categories
    List,
    /// Delete a category (its tickets are kept)
    Delete {
        /// Category name
        name: String,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// Add an item to a category
    Add {
        /// Item name
        name: String,
        /// Category the item belongs to
        #[arg(short, long)]
        category: String,
    },
    /// List items
    List {
        /// Only items of this category
        #[arg(short, long)]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
enum TypeCommands {
    /// Add a ticket type
    Add {
        /// Type name
        name: String,
    },
    /// List ticket types
    List,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Add a user
    Add {
        /// User email
        email: String,
        /// Display name
        name: String,
        /// Role (student, staff, admin)
        #[arg(short, long, default_value = "student")]
        role: String,
        /// Contact phone
        #[arg(short, long)]
        phone: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_json, cli.verbose)?;

    if let Commands::Init {
        admin_email,
        admin_name,
    } = &cli.command
    {
        let cwd = env::current_dir()?;
        let admin = admin_email
            .as_deref()
            .map(|email| (email, admin_name.as_deref().unwrap_or(email)));
        return commands::init::run(&cwd, admin);
    }

    let config = Config::resolve(cli.db, cli.actor)?;
    debug!(db = %config.db_path.display(), actor = ?config.actor(), "resolved config");
    let db = config.open_db()?;
    let caller = config.actor();

    match cli.command {
        Commands::Init { .. } => Ok(()),

        Commands::Category { action } => match action {
            CategoryCommands::Add { name } => commands::category::add(&db, &name),
            CategoryCommands::List => commands::category::list(&db),
            CategoryCommands::Delete { name } => commands::category::delete(&db, &name),
        },

        Commands::Item { action } => match action {
            ItemCommands::Add { name, category } => commands::item::add(&db, &name, &category),
            ItemCommands::List { category } => commands::item::list(&db, category.as_deref()),
        },

        Commands::Type { action } => match action {
            TypeCommands::Add { name } => commands::ticket_type::add(&db, &name),
            TypeCommands::List => commands::ticket_type::list(&db),
        },

        Commands::User { action } => match action {
            UserCommands::Add {
                email,
                name,
                role,
                phone,
            } => commands::user::add(&db, &email, &name, &role, phone.as_deref()),
        },

        Commands::Create {
            title,
            category,
            description,
            item,
            kind,
        } => {
            let form = commands::create::TicketForm {
                title: &title,
                description: description.as_deref(),
                category: &category,
                item: item.as_deref(),
                kind: kind.as_deref(),
            };
            commands::create::run(&db, caller, &form).map(|_| ())
        }

        Commands::List { status } => commands::list::run(&db, status.as_deref()),

        Commands::Show { id } => commands::show::run(&db, &id),

        Commands::Status {
            id,
            status,
            title,
            message,
        } => commands::status::run(
            &db,
            caller,
            &id,
            &status,
            title.as_deref(),
            message.as_deref(),
        ),

        Commands::Report {
            report_type,
            start,
            end,
        } => commands::report::run(&db, caller, &report_type, start.as_deref(), end.as_deref()),

        Commands::Dashboard {
            start,
            end,
            month,
            today,
        } => {
            let preset = if month {
                Some(Preset::Month)
            } else if today {
                Some(Preset::Today)
            } else {
                None
            };
            commands::dashboard::run(&db, caller, start.as_deref(), end.as_deref(), preset)
        }

        Commands::Export { output } => commands::export::run_json(&db, output.as_deref()),

        Commands::Seed { count } => commands::seed::run(&db, count),
    }
}
