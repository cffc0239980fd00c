//! Clap derive structures for the `trmnly` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use trmnly_core::{BackendFlavor, Orientation};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// trmnly -- manage TRMNL e-ink displays from the command line
#[derive(Debug, Parser)]
#[command(
    name = "trmnly",
    version,
    about = "Manage TRMNL e-ink displays from the command line",
    long_about = "Talk to a self-hosted TRMNL server or the hosted TRMNL service.\n\n\
        List and configure devices, push screens, publish dashboards, and\n\
        force a device to fetch new content without waiting for its next cycle.",
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
    /// Server profile to use
    #[arg(long, short = 'p', env = "TRMNLY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server URL (overrides profile)
    #[arg(long, short = 'u', env = "TRMNLY_URL", global = true)]
    pub url: Option<String>,

    /// Backend flavor (overrides profile)
    #[arg(long, env = "TRMNLY_FLAVOR", global = true)]
    pub flavor: Option<FlavorArg>,

    /// API token (bearer token, or access token for the hosted service)
    #[arg(long, env = "TRMNLY_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Device MAC address (hosted service only)
    #[arg(long, env = "TRMNLY_DEVICE_MAC", global = true)]
    pub device_mac: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TRMNLY_OUTPUT",
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

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "TRMNLY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
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

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FlavorArg {
    /// Self-hosted server (full device, screen and model management)
    SelfHosted,
    /// Hosted TRMNL service (display content and plugins)
    Hosted,
}

impl From<FlavorArg> for BackendFlavor {
    fn from(arg: FlavorArg) -> Self {
        match arg {
            FlavorArg::SelfHosted => Self::SelfHosted,
            FlavorArg::Hosted => Self::Hosted,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OrientationArg {
    Landscape,
    Portrait,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Landscape => Self::Landscape,
            OrientationArg::Portrait => Self::Portrait,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the server is reachable with the configured credentials
    Ping,

    /// Manage devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Force a device to fetch new content now
    Refresh(RefreshArgs),

    /// Show what the server would currently send a device
    Display {
        /// Device friendly ID or numeric ID
        device: String,
    },

    /// Manage screens (self-hosted only)
    #[command(alias = "s")]
    Screens(ScreensArgs),

    /// List device models (self-hosted only)
    Models(ModelsArgs),

    /// Plugin actions (hosted only)
    #[command(alias = "plugins")]
    Plugin(PluginArgs),

    /// Capture a web dashboard and make it a device's active screen
    Dashboard(DashboardArgs),

    /// Poll devices and print every change until interrupted
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List {
        /// Only show devices reported online
        #[arg(long)]
        online: bool,
    },

    /// Get device details
    Get {
        /// Device friendly ID or numeric ID
        device: String,
    },

    /// Update device settings
    Update(DeviceUpdateArgs),

    /// Register a new device (self-hosted only)
    Create {
        /// Display label
        #[arg(long)]
        label: String,

        /// MAC address
        #[arg(long)]
        mac: String,

        /// Friendly ID (server generates one when omitted)
        #[arg(long)]
        friendly_id: Option<String>,

        /// Model ID
        #[arg(long)]
        model_id: Option<u64>,

        /// Refresh rate in seconds
        #[arg(long)]
        refresh_rate: Option<u32>,
    },

    /// Delete a device (self-hosted only)
    #[command(alias = "rm")]
    Delete {
        /// Device friendly ID or numeric ID
        device: String,
    },
}

#[derive(Debug, Args)]
pub struct DeviceUpdateArgs {
    /// Device friendly ID or numeric ID
    pub device: String,

    /// Display label
    #[arg(long)]
    pub label: Option<String>,

    /// Refresh rate in seconds
    #[arg(long)]
    pub refresh_rate: Option<u32>,

    /// Image timeout in seconds
    #[arg(long)]
    pub image_timeout: Option<u32>,

    /// Allow firmware updates
    #[arg(long, action = clap::ArgAction::Set)]
    pub firmware_update: Option<bool>,

    /// Sleep window start (HH:MM)
    #[arg(long)]
    pub sleep_start: Option<String>,

    /// Sleep window end (HH:MM)
    #[arg(long)]
    pub sleep_stop: Option<String>,

    /// Extra field as key=value (value parsed as JSON when possible)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
}

// ── Refresh ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Device friendly ID or numeric ID
    pub device: String,

    /// Seconds the temporary refresh rate stays in effect
    #[arg(long)]
    pub settle: Option<u64>,

    /// Skip warming the server's display cache first
    #[arg(long)]
    pub no_prefetch: bool,
}

// ── Screens ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ScreensArgs {
    #[command(subcommand)]
    pub command: ScreensCommand,
}

#[derive(Debug, Subcommand)]
pub enum ScreensCommand {
    /// List screens
    #[command(alias = "ls")]
    List,

    /// Upload an image as a new screen
    Create {
        /// Screen name
        #[arg(long)]
        name: String,

        /// Image file (PNG or BMP)
        #[arg(long, short = 'F')]
        file: PathBuf,

        /// Display label
        #[arg(long)]
        label: Option<String>,

        /// Model ID
        #[arg(long)]
        model_id: Option<u64>,
    },

    /// Delete a screen
    #[command(alias = "rm")]
    Delete {
        /// Screen ID or name
        screen: String,
    },

    /// Make a screen a device's active content
    Assign {
        /// Device friendly ID or numeric ID
        device: String,

        /// Screen ID
        screen_id: u64,

        /// Label sent with the assignment
        #[arg(long)]
        label: Option<String>,
    },
}

// ── Models ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ModelsCommand {
    /// List device models
    #[command(alias = "ls")]
    List,
}

// ── Plugins ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PluginArgs {
    #[command(subcommand)]
    pub command: PluginCommand,
}

#[derive(Debug, Subcommand)]
pub enum PluginCommand {
    /// Make a plugin the device's current content
    Switch {
        /// Plugin setting ID
        plugin_id: String,
    },

    /// Show a message through a notification plugin
    Notify {
        /// Private plugin UUID
        plugin_uuid: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        message: String,
    },

    /// Push merge variables into a private plugin
    Push {
        /// Private plugin UUID
        plugin_uuid: String,

        /// Merge variables as inline JSON
        #[arg(long, conflicts_with = "from_file")]
        data: Option<String>,

        /// Read merge variables from a JSON file
        #[arg(long, short = 'F')]
        from_file: Option<PathBuf>,
    },
}

// ── Dashboard ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DashboardArgs {
    #[command(subcommand)]
    pub command: DashboardCommand,
}

#[derive(Debug, Subcommand)]
pub enum DashboardCommand {
    /// Capture a dashboard URL and publish it to a device
    Publish(PublishArgs),
}

#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Device friendly ID or numeric ID
    pub device: String,

    /// Dashboard URL to capture
    #[arg(long)]
    pub url: String,

    /// Dashboard path used to name the screen (defaults to the URL path)
    #[arg(long)]
    pub path: Option<String>,

    /// Screenshot renderer base URL (overrides profile)
    #[arg(long, env = "TRMNLY_SCREENSHOT_URL")]
    pub screenshot_url: Option<String>,

    #[arg(long, default_value = "800")]
    pub width: u32,

    #[arg(long, default_value = "480")]
    pub height: u32,

    /// Dashboard theme passed to the renderer
    #[arg(long)]
    pub theme: Option<String>,

    /// Milliseconds to wait for the page to settle before capturing
    #[arg(long, default_value = "2000")]
    pub wait_ms: u32,

    #[arg(long, default_value = "landscape")]
    pub orientation: OrientationArg,

    /// Rotation angle in degrees applied by the renderer
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub rotation: f64,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in seconds (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or extend the config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a token in the system keyring
    SetToken {
        /// Token value (prompted when omitted)
        token: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
