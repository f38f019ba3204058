//! Per-file configuration records and the loader's JSON configuration.

use std::fmt;
use std::path::Path;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Activation status of one configured file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrfStatus {
    /// Not processed yet this session
    Unknown,
    NotFound,
    /// Terminal for the rest of the session
    Disabled,
    /// Action 8 seen before the reserve stage
    Initialised,
    Activated,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GrfConfigFlags: u8 {
        /// Uses actions that are unsafe for static content
        const UNSAFE = 0x01;
        /// Identifier marks a system file
        const SYSTEM = 0x02;
        /// Declared format version is not supported
        const INVALID = 0x04;
        /// Only run up to the init stage
        const INIT_ONLY = 0x08;
        /// Reserve stage completed this session
        const RESERVED = 0x10;
    }
}

/// File identity: grfid plus content checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct GrfIdentifier {
    pub grfid: u32,
    pub checksum: u32,
}

/// grfids are conventionally shown byte-reversed, i.e. in file order.
pub fn format_grfid(grfid: u32) -> String {
    format!("{:08X}", grfid.swap_bytes())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Notice,
    Warning,
    Error,
    Fatal,
}

impl ErrorSeverity {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Notice,
            1 => Self::Warning,
            2 => Self::Error,
            _ => Self::Fatal,
        }
    }
}

/// Diagnostic message attached to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrfMessage {
    RequiresPatchVersion,
    ForDosOrWindows,
    DesignedFor,
    InvalidParameter,
    MustBeLoadedBefore,
    MustBeLoadedAfter,
    RequiresHostVersion,
    /// Text supplied by the file itself
    Custom,
    UnexpectedSprite,
    ForciblyDisabled,
    GrmFailed,
    MultipleInfo,
}

impl GrfMessage {
    /// Built-in message selected by action 0B's message id.
    pub fn from_builtin(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::RequiresPatchVersion),
            1 => Some(Self::ForDosOrWindows),
            2 => Some(Self::DesignedFor),
            3 => Some(Self::InvalidParameter),
            4 => Some(Self::MustBeLoadedBefore),
            5 => Some(Self::MustBeLoadedAfter),
            6 => Some(Self::RequiresHostVersion),
            0xFF => Some(Self::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for GrfMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::RequiresPatchVersion => "requires a newer patch version",
            Self::ForDosOrWindows => "is for a different platform build",
            Self::DesignedFor => "is designed to be used with",
            Self::InvalidParameter => "invalid parameter",
            Self::MustBeLoadedBefore => "must be loaded before",
            Self::MustBeLoadedAfter => "must be loaded after",
            Self::RequiresHostVersion => "requires a newer host version",
            Self::Custom => "custom message",
            Self::UnexpectedSprite => "unexpected sprite",
            Self::ForciblyDisabled => "forcibly disabled by another file",
            Self::GrmFailed => "not enough free resources",
            Self::MultipleInfo => "multiple action 8 entries",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrfError {
    pub severity: ErrorSeverity,
    pub message: GrfMessage,
    pub custom_message: Option<String>,
    pub data: Option<String>,
    pub param_value: [u32; 2],
}

impl GrfError {
    pub fn new(severity: ErrorSeverity, message: GrfMessage) -> Self {
        Self { severity, message, custom_message: None, data: None, param_value: [0, 0] }
    }
}

/// Configured file as seen by the content list.
#[derive(Debug, Clone, PartialEq)]
pub struct GrfConfig {
    pub filename: String,
    pub ident: GrfIdentifier,
    pub version: u8,
    pub name: Option<String>,
    pub info: Option<String>,
    /// Parameters supplied by the user
    pub params: Vec<u32>,
    pub status: GrfStatus,
    pub flags: GrfConfigFlags,
    pub error: Option<GrfError>,
}

impl GrfConfig {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ident: GrfIdentifier::default(),
            version: 0,
            name: None,
            info: None,
            params: Vec::new(),
            status: GrfStatus::Unknown,
            flags: GrfConfigFlags::empty(),
            error: None,
        }
    }

    pub fn with_params(mut self, params: Vec<u32>) -> Self {
        self.params = params;
        self
    }

    pub fn with_flags(mut self, flags: GrfConfigFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn is_usable(&self) -> bool {
        !matches!(self.status, GrfStatus::Disabled | GrfStatus::NotFound)
    }

    /// Mark the file disabled, attaching `message` as a fatal error unless
    /// the file already carries one.
    pub fn disable(&mut self, message: Option<GrfMessage>) {
        self.status = GrfStatus::Disabled;
        if let Some(message) = message {
            if self.error.is_none() {
                self.error = Some(GrfError::new(ErrorSeverity::Fatal, message));
            }
        }
    }
}

/// Read-only game state exposed to extension files through special variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// 0 temperate, 1 arctic, 2 tropic, 3 toyland
    pub climate: u8,
    /// Days since year 0
    pub date: u32,
    pub date_fract: u16,
    pub starting_year: u32,
    pub drive_on_right: bool,
    pub game_mode: u8,
    pub difficulty: u8,
    pub map_log_x: u8,
    pub map_log_y: u8,
    pub map_height_limit: u8,
    pub generation_seed: u32,
    pub host_version: u32,
    /// 0 DOS palette, 1 Windows palette
    pub palette: u8,
    pub snow_line_height: u8,
    pub freight_trains: u8,
    pub plane_speed: u8,
    /// Language id used to pick localized error messages
    pub language: u8,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            climate: 0,
            date: 701_265,
            date_fract: 0,
            starting_year: 1950,
            drive_on_right: true,
            game_mode: 1,
            difficulty: 3,
            map_log_x: 8,
            map_log_y: 8,
            map_height_limit: 30,
            generation_seed: 0,
            host_version: 0x1E00_0000,
            palette: 1,
            snow_line_height: 0xFF,
            freight_trains: 1,
            plane_speed: 4,
            language: 0x01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrfConfigEntry {
    pub path: String,
    #[serde(default)]
    pub params: Vec<u32>,
    #[serde(default)]
    pub init_only: bool,
}

impl GrfConfigEntry {
    pub fn to_config(&self) -> GrfConfig {
        let flags = if self.init_only { GrfConfigFlags::INIT_ONLY } else { GrfConfigFlags::empty() };
        GrfConfig::new(self.path.clone()).with_params(self.params.clone()).with_flags(flags)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// First global image id available to extension files
    pub sprite_base: u32,
    pub environment: Environment,
    pub files: Vec<GrfConfigEntry>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { sprite_base: 5800, environment: Environment::default(), files: Vec::new() }
    }
}

impl LoaderConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
