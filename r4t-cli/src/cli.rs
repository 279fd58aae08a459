use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Role-gated requirements tracking for test teams")]
pub struct Cli {
    /// Path to the requirements database (.yaml or .db)
    #[clap(long, env = "R4T_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Project name from the config file
    #[clap(long, short = 'p', env = "R4T_PROJECT", global = true)]
    pub project: Option<String>,

    /// Act as this user (email or UUID)
    #[clap(long, short = 'u', env = "R4T_USER", global = true)]
    pub user: Option<String>,

    /// Increase log verbosity (-v, -vv)
    #[clap(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the roles and what each is responsible for
    Roles,

    /// Show the navigation entries visible to a role
    Nav {
        /// Role to check; defaults to the current user's role
        #[clap(long)]
        role: Option<String>,
    },

    /// Check whether a role may perform an action on a resource
    Can {
        /// Role identifier (e.g. requirements_engineer)
        role: String,

        /// Action: view, create or edit
        action: String,

        /// Resource: requirement, test_case, test_run or navigation:<route>
        resource: String,
    },

    /// Show the current user
    Whoami,

    /// Manage user profiles
    #[clap(subcommand)]
    User(UserCommand),

    /// List requirements, newest first
    List {
        /// Case-insensitive text to find in title or description
        #[clap(long, short = 's')]
        search: Option<String>,

        /// Only show this status (or "all")
        #[clap(long)]
        status: Option<String>,

        /// Only show this priority (or "all")
        #[clap(long)]
        priority: Option<String>,
    },

    /// Show details for a requirement
    Show {
        /// UUID or REQ-ID of the requirement
        id: String,
    },

    /// Add a new requirement
    Add {
        #[clap(long)]
        title: Option<String>,

        #[clap(long)]
        description: Option<String>,

        /// draft, approved, implemented or tested (default: draft)
        #[clap(long)]
        status: Option<String>,

        /// low, medium, high or critical (default: medium)
        #[clap(long)]
        priority: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long, short = 'i')]
        interactive: bool,
    },

    /// Edit an existing requirement
    Edit {
        /// UUID or REQ-ID of the requirement
        id: String,

        #[clap(long)]
        title: Option<String>,

        /// New description; an empty string clears it
        #[clap(long)]
        description: Option<String>,

        #[clap(long)]
        status: Option<String>,

        #[clap(long)]
        priority: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long, short = 'i')]
        interactive: bool,
    },

    /// Database maintenance
    #[clap(subcommand)]
    Db(DbCommand),

    /// Manage named projects in the config file
    #[clap(subcommand)]
    Project(ProjectCommand),
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a user profile
    Add {
        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        email: Option<String>,

        /// Role identifier
        #[clap(long)]
        role: Option<String>,

        /// Make this the default user in the config file
        #[clap(long)]
        default: bool,
    },

    /// List user profiles
    List,
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Print the path of the database in use
    Path,

    /// Show record counts
    Stats,

    /// Copy the database into another file; the backend follows its extension
    Migrate {
        /// Destination path (.yaml or .db)
        to: PathBuf,
    },

    /// Export the database to JSON
    Export {
        /// Output file
        output: PathBuf,
    },

    /// Replace the database contents with a JSON export
    Import {
        /// Input file
        input: PathBuf,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Register a project or update its path
    Add {
        name: String,

        /// Path to the project's database
        path: PathBuf,

        #[clap(long)]
        description: Option<String>,

        /// Set this project as the default
        #[clap(long)]
        default: bool,
    },

    /// List registered projects
    List,

    /// Set the default project
    Default { name: String },
}
