use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "kanban")]
#[command(about = "Collaborative kanban boards from the command line", long_about = None)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")"))]
pub struct Cli {
    /// Path to the data file (overrides the config file and KANBAN_DATA)
    #[arg(long, global = true, value_name = "PATH")]
    pub data: Option<String>,

    /// Storage backend: json, memory or sqlite
    #[arg(long, global = true, value_name = "BACKEND")]
    pub storage: Option<String>,

    /// Acting user id
    #[arg(long, global = true, env = "KANBAN_USER")]
    pub user: Option<Uuid>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// User registration and lookup
    User(UserCommand),
    /// Board operations
    Board(BoardCommand),
    /// Column operations
    Column(ColumnCommand),
    /// Card operations
    Card(CardCommand),
    /// Attachment metadata operations
    Attachment(AttachmentCommand),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// User commands
#[derive(Args)]
pub struct UserCommand {
    #[command(subcommand)]
    pub action: UserAction,
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a new user
    Register {
        #[arg(long)]
        email: String,
        /// Hash produced by the authentication layer
        #[arg(long, default_value = "")]
        password_hash: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Look a user up by email
    Find {
        #[arg(long)]
        email: String,
    },
}

// Board commands
#[derive(Args)]
pub struct BoardCommand {
    #[command(subcommand)]
    pub action: BoardAction,
}

#[derive(Subcommand)]
pub enum BoardAction {
    /// Create a new board with the default columns
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        icon: Option<String>,
    },
    /// List your boards, newest first
    List,
    /// Get a board with its columns and active cards
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// Update a board
    Update(BoardUpdateArgs),
    /// Delete a board and everything on it
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    /// List archived cards of a board
    Archived {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Args)]
pub struct BoardUpdateArgs {
    #[arg(long)]
    pub id: Uuid,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, conflicts_with = "clear_icon")]
    pub icon: Option<String>,
    #[arg(long)]
    pub clear_icon: bool,
    #[arg(long)]
    pub favorite: Option<bool>,
}

// Column commands
#[derive(Args)]
pub struct ColumnCommand {
    #[command(subcommand)]
    pub action: ColumnAction,
}

#[derive(Subcommand)]
pub enum ColumnAction {
    /// Append a column to a board
    Create {
        #[arg(long)]
        board_id: Uuid,
        #[arg(long)]
        title: String,
    },
    /// Rename a column
    Rename {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        title: String,
    },
    /// Move a column to another position
    Move {
        #[arg(long)]
        id: Uuid,
        #[arg(long, allow_negative_numbers = true)]
        position: i32,
    },
    /// Delete a column and its cards
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    /// Set the full column order of a board
    Reorder {
        #[arg(long)]
        board_id: Uuid,
        #[arg(long, value_delimiter = ',')]
        ids: Vec<Uuid>,
    },
}

// Card commands
#[derive(Args)]
pub struct CardCommand {
    #[command(subcommand)]
    pub action: CardAction,
}

#[derive(Subcommand)]
pub enum CardAction {
    /// Append a card to a column
    Create(CardCreateArgs),
    /// Get a specific card
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// Update a card
    Update(CardUpdateArgs),
    /// Move a card within or across columns
    Move {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        column_id: Uuid,
        /// Defaults to the end of the target column
        #[arg(long, allow_negative_numbers = true)]
        position: Option<i32>,
    },
    /// Set the full card order of a column
    Reorder {
        #[arg(long)]
        column_id: Uuid,
        #[arg(long, value_delimiter = ',')]
        ids: Vec<Uuid>,
    },
    /// Archive a card
    Archive {
        #[arg(long)]
        id: Uuid,
    },
    /// Restore an archived card to the end of its column
    Restore {
        #[arg(long)]
        id: Uuid,
    },
    /// Delete a card
    Delete {
        #[arg(long)]
        id: Uuid,
        /// Only delete when the card is archived
        #[arg(long)]
        archived: bool,
    },
}

#[derive(Args)]
pub struct CardCreateArgs {
    #[arg(long)]
    pub column_id: Uuid,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    /// RFC 3339 timestamp or YYYY-MM-DD
    #[arg(long)]
    pub deadline: Option<String>,
}

#[derive(Args)]
pub struct CardUpdateArgs {
    #[arg(long)]
    pub id: Uuid,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,
    #[arg(long)]
    pub clear_description: bool,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub tags: Option<Vec<String>>,
    #[arg(long, conflicts_with = "clear_deadline")]
    pub deadline: Option<String>,
    #[arg(long)]
    pub clear_deadline: bool,
}

// Attachment commands
#[derive(Args)]
pub struct AttachmentCommand {
    #[command(subcommand)]
    pub action: AttachmentAction,
}

#[derive(Subcommand)]
pub enum AttachmentAction {
    /// Record attachment metadata on a card
    Add {
        #[arg(long)]
        card_id: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "application/octet-stream")]
        mime_type: String,
        #[arg(long)]
        size: i64,
    },
    /// List a card's attachments, newest first
    List {
        #[arg(long)]
        card_id: Uuid,
    },
    /// Get attachment metadata
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// Delete attachment metadata
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}
