use std::{error::Error, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod visual;

pub use visual::ResolvedVisual;

/// Default pixel size used when a caller does not request one.
pub const DEFAULT_SIZE_PX: u32 = 32;

/// Default foreground (text) color for initials badges.
pub const DEFAULT_FOREGROUND_COLOR: &str = "#FFF";

/// Identity hints describing the person an avatar is resolved for.
///
/// Every field except `target_size_px` is optional. Empty strings are treated
/// the same as missing values so hosts can forward form input unchanged.
/// The record is owned by the caller and read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityHints {
    /// Facebook user or page identifier.
    #[serde(alias = "facebookId")]
    pub facebook_id: Option<String>,
    /// Google (Picasa web albums) user identifier.
    #[serde(alias = "googleId")]
    pub google_id: Option<String>,
    /// Skype user name.
    #[serde(alias = "skypeId")]
    pub skype_id: Option<String>,
    /// Plain email address or an already hashed Gravatar identifier.
    pub email: Option<String>,
    /// Caller supplied image URL; may contain a `<size>` placeholder.
    #[serde(alias = "src", alias = "explicitImageUrl")]
    pub explicit_image_url: Option<String>,
    /// Person's display name, the preferred initials source.
    #[serde(alias = "name", alias = "displayName")]
    pub display_name: Option<String>,
    /// Literal badge text used when no display name is known.
    #[serde(alias = "value", alias = "literalValue")]
    pub literal_value: Option<String>,
    /// Requested avatar edge length in pixels.
    #[serde(alias = "size", alias = "targetSizePx")]
    pub target_size_px: u32,
    /// Whether the renderer should apply a round mask.
    #[serde(alias = "round", alias = "preferRoundMask")]
    pub prefer_round_mask: bool,
    /// Explicit initials background; overrides the color palette.
    #[serde(alias = "color", alias = "backgroundColor")]
    pub background_color: Option<String>,
    /// Initials text color.
    #[serde(alias = "fgColor", alias = "foregroundColor")]
    pub foreground_color: String,
}

impl Default for IdentityHints {
    fn default() -> Self {
        Self {
            facebook_id: None,
            google_id: None,
            skype_id: None,
            email: None,
            explicit_image_url: None,
            display_name: None,
            literal_value: None,
            target_size_px: DEFAULT_SIZE_PX,
            prefer_round_mask: false,
            background_color: None,
            foreground_color: DEFAULT_FOREGROUND_COLOR.to_string(),
        }
    }
}

impl IdentityHints {
    /// Returns the value of a hint field when it is present and non-empty.
    pub fn field(&self, field: HintField) -> Option<&str> {
        let value = match field {
            HintField::FacebookId => &self.facebook_id,
            HintField::GoogleId => &self.google_id,
            HintField::SkypeId => &self.skype_id,
            HintField::Email => &self.email,
            HintField::ExplicitImageUrl => &self.explicit_image_url,
            HintField::DisplayName => &self.display_name,
            HintField::LiteralValue => &self.literal_value,
        };
        value.as_deref().filter(|text| !text.is_empty())
    }
}

/// Named hint fields that providers and the state machine key on.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintField {
    FacebookId,
    GoogleId,
    SkypeId,
    Email,
    ExplicitImageUrl,
    DisplayName,
    LiteralValue,
}

/// Identity services in fixed priority order.
///
/// Social identifiers come first, followed by the two email-keyed services.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Facebook,
    Google,
    Skype,
    Gravatar,
    Clearbit,
}

impl ProviderKind {
    /// All providers, highest priority first.
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Facebook,
        ProviderKind::Google,
        ProviderKind::Skype,
        ProviderKind::Gravatar,
        ProviderKind::Clearbit,
    ];

    /// Position of the provider within [`ProviderKind::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::Facebook => 0,
            Self::Google => 1,
            Self::Skype => 2,
            Self::Gravatar => 3,
            Self::Clearbit => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Google => "google",
            Self::Skype => "skype",
            Self::Gravatar => "gravatar",
            Self::Clearbit => "clearbit",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ParseProviderKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(ParseProviderKindError)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProviderKindError;

impl fmt::Display for ParseProviderKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid provider; expected one of facebook, google, skype, gravatar, clearbit")
    }
}

impl Error for ParseProviderKindError {}

/// URL scheme used when building provider URLs.
///
/// Hosts without a browsing context have no insecure origin to mirror, so
/// `https:` is the default.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Https,
    Http,
}

impl Scheme {
    /// Scheme with its trailing colon, e.g. `https:`.
    pub fn protocol(self) -> &'static str {
        match self {
            Self::Https => "https:",
            Self::Http => "http:",
        }
    }

    pub fn is_secure(self) -> bool {
        matches!(self, Self::Https)
    }
}

impl FromStr for Scheme {
    type Err = ParseSchemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches(':').to_ascii_lowercase().as_str() {
            "https" => Ok(Self::Https),
            "http" => Ok(Self::Http),
            _ => Err(ParseSchemeError),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseSchemeError;

impl fmt::Display for ParseSchemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid scheme; expected 'https' or 'http'")
    }
}

impl Error for ParseSchemeError {}
