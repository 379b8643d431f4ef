//! Clap derive structures for the `obdx` CLI.
//!
//! Only clap and clap_complete may be used here: build.rs includes this
//! file to render man pages.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// obdx -- appointment slots, bookings and after-sales tickets
#[derive(Debug, Parser)]
#[command(
    name = "obdx",
    version,
    about = "Manage OBDExpress diagnostic appointments from the command line",
    long_about = "Administer the OBDExpress appointment calendar.\n\n\
        Publishes and blocks slots, books them for customers, follows\n\
        reservations and support tickets, and repairs slot/reservation\n\
        drift left behind by interrupted bookings.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Store profile to use
    #[arg(long, short = 'p', env = "OBDX_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Store URL (overrides profile)
    #[arg(long, short = 'u', env = "OBDX_URL", global = true)]
    pub url: Option<String>,

    /// Store API key
    #[arg(long, env = "OBDX_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "OBDX_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "OBDX_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "OBDX_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Status values accepted on the command line ───────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SlotStatusArg {
    Available,
    Reserved,
    Blocked,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReservationStatusArg {
    New,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TicketStatusArg {
    New,
    InProgress,
    Resolved,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Publish, edit and block appointment slots
    #[command(alias = "s")]
    Slots(SlotsArgs),

    /// Book a slot for a customer
    Book(Box<BookArgs>),

    /// Follow customer reservations
    #[command(alias = "res", alias = "r")]
    Reservations(ReservationsArgs),

    /// After-sales support tickets
    #[command(alias = "t")]
    Tickets(TicketsArgs),

    /// Detect (and optionally repair) slot/reservation drift
    Reconcile(ReconcileArgs),

    /// Reservation and ticket counters
    Dashboard,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━ SLOTS ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SlotsArgs {
    #[command(subcommand)]
    pub command: SlotsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SlotsCommand {
    /// List slots (what customers see, unless --all)
    #[command(alias = "ls")]
    List {
        /// Administrator view: every status, notes and reservation links
        #[arg(long, short = 'a')]
        all: bool,

        /// Only slots ending after this time (RFC 3339 or "YYYY-MM-DD HH:MM")
        #[arg(long)]
        from: Option<String>,

        /// Only slots starting before this time
        #[arg(long)]
        to: Option<String>,

        /// Filter by status (implies --all)
        #[arg(long)]
        status: Option<SlotStatusArg>,
    },

    /// Publish a new slot
    Create {
        /// Start time (RFC 3339 or "YYYY-MM-DD HH:MM", UTC)
        #[arg(long)]
        start: String,

        /// End time; defaults to start + --minutes
        #[arg(long, conflicts_with = "minutes")]
        end: Option<String>,

        /// Length in minutes when --end is not given
        #[arg(long, default_value = "60")]
        minutes: u32,

        /// Create the slot blocked instead of available
        #[arg(long)]
        blocked: bool,

        /// Internal notes (never shown to customers)
        #[arg(long)]
        notes: Option<String>,
    },

    /// Change a slot's time window or notes
    Update {
        /// Slot ID
        id: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,

        /// Remove the slot's notes
        #[arg(long)]
        clear_notes: bool,
    },

    /// Take an available slot off the calendar
    Block {
        /// Slot ID
        id: String,
    },

    /// Put a blocked slot back on the calendar
    Unblock {
        /// Slot ID
        id: String,
    },

    /// Free a reserved slot (the reservation is kept)
    Release {
        /// Slot ID
        id: String,
    },

    /// Delete a slot that is not reserved
    #[command(alias = "rm")]
    Delete {
        /// Slot ID
        id: String,
    },
}

// ━━━ BOOK ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct BookArgs {
    /// Slot ID to book
    #[arg(long)]
    pub slot: String,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub phone: String,

    /// Street address of the intervention
    #[arg(long)]
    pub street: String,

    #[arg(long)]
    pub city: String,

    #[arg(long)]
    pub postal_code: String,

    /// Vehicle make
    #[arg(long)]
    pub make: String,

    /// Vehicle model
    #[arg(long)]
    pub model: String,

    /// Vehicle model year
    #[arg(long)]
    pub year: Option<i32>,

    #[arg(long)]
    pub vin: Option<String>,

    /// Service package
    #[arg(long, default_value = "essentiel")]
    pub service: String,

    /// Price in euros (defaults to the configured price for --city)
    #[arg(long)]
    pub price: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Reuse a key to retry a booking safely (generated when absent)
    #[arg(long, env = "OBDX_IDEMPOTENCY_KEY")]
    pub idempotency_key: Option<String>,
}

// ━━━ RESERVATIONS ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ReservationsArgs {
    #[command(subcommand)]
    pub command: ReservationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReservationsCommand {
    /// List reservations, newest first
    #[command(alias = "ls")]
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<ReservationStatusArg>,
    },

    /// Show one reservation
    Get {
        /// Reservation ID
        id: String,
    },

    /// Change a reservation's status
    Status {
        /// Reservation ID
        id: String,

        /// New status
        status: ReservationStatusArg,
    },
}

// ━━━ TICKETS ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TicketsArgs {
    #[command(subcommand)]
    pub command: TicketsCommand,
}

#[derive(Debug, Subcommand)]
pub enum TicketsCommand {
    /// List support tickets
    #[command(alias = "ls")]
    List {
        /// Hide resolved tickets
        #[arg(long)]
        open: bool,
    },

    /// Open a support ticket
    Create {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        subject: String,

        #[arg(long)]
        description: String,

        /// Link to an uploaded file
        #[arg(long)]
        attachment_url: Option<String>,
    },

    /// Change a ticket's status
    Status {
        /// Ticket ID
        id: String,

        /// New status
        status: TicketStatusArg,
    },
}

// ━━━ RECONCILE ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Release or block slots that are safe to fix
    #[arg(long)]
    pub repair: bool,

    /// Keep running at the configured interval until interrupted
    #[arg(long)]
    pub watch: bool,
}

// ━━━ CONFIG ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Display the current configuration
    Show,

    /// Set a configuration value on the active profile
    Set {
        /// Key (e.g. url, timeout, scheduler.past_slots, pricing.cities.lyon)
        key: String,

        /// Value
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },

    /// Store the API key in the system keyring
    SetKey {
        /// Profile name (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━ COMPLETIONS ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
