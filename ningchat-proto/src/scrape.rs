//! Extraction of login data embedded in the site homepage.
//!
//! After the credential POST, the homepage HTML carries two things the
//! client needs: a JSON profile block introduced by a fixed marker and
//! closed by a fixed terminator, and a bare quoted security-token
//! scalar. Neither is valid to miss — absence of either marker is a
//! hard failure for the login attempt.

use crate::json::{self, FieldError};

/// Marker that introduces the embedded profile JSON literal.
const PROFILE_MARKER: &str = "\nning = ";

/// Terminator of the profile JSON literal. The two closing braces
/// belong to the JSON object and are kept.
const PROFILE_TERMINATOR: &str = "}};\n";

/// Marker that introduces the security-token scalar.
const TOKEN_MARKER: &str = "xg.token = '";

/// Query suffix appended to the profile photo URL for thumbnail
/// rendering in the host UI.
pub const THUMBNAIL_SUFFIX: &str = "&width=16&height=16";

/// Errors produced while scraping the homepage.
///
/// The variant messages are the exact strings surfaced to the host's
/// connection-error UI.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScrapeError {
    /// The profile JSON block (or its terminator) is absent.
    #[error("NingID not found")]
    ProfileNotFound,

    /// The security-token scalar is absent or unterminated.
    #[error("xgToken not found")]
    TokenNotFound,

    /// The profile block was located but its JSON did not have the
    /// expected shape.
    #[error("malformed profile block: {0}")]
    Malformed(#[from] FieldError),
}

/// The profile fields embedded in the homepage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileBlock {
    /// The account's opaque Ning profile id.
    pub ning_id: String,
    /// The account's display name.
    pub display_name: String,
    /// Profile photo URL, already decorated with [`THUMBNAIL_SUFFIX`].
    pub icon_url: String,
}

/// Extracts the embedded profile JSON from the homepage HTML.
///
/// # Errors
///
/// [`ScrapeError::ProfileNotFound`] if the marker or terminator is
/// absent, [`ScrapeError::Malformed`] if the block parses but lacks
/// the expected fields.
pub fn extract_profile(page: &str) -> Result<ProfileBlock, ScrapeError> {
    let start = page
        .find(PROFILE_MARKER)
        .ok_or(ScrapeError::ProfileNotFound)?
        + PROFILE_MARKER.len();
    let rest = &page[start..];
    let end = rest
        .find(PROFILE_TERMINATOR)
        .ok_or(ScrapeError::ProfileNotFound)?;
    // Keep the "}}" that closes the nested object and the block itself.
    let block = &rest[..end + 2];

    let obj = json::parse_object(block.as_bytes())?;
    let profile = json::object_field(&obj, "CurrentProfile")?;

    let photo_url = json::str_field(profile, "photoUrl")?;
    Ok(ProfileBlock {
        ning_id: json::str_field(profile, "id")?.to_string(),
        display_name: json::str_field(profile, "fullName")?.to_string(),
        icon_url: format!("{photo_url}{THUMBNAIL_SUFFIX}"),
    })
}

/// Extracts the `xg.token` scalar from the homepage HTML.
///
/// # Errors
///
/// [`ScrapeError::TokenNotFound`] if the marker is absent or the
/// quoted value is unterminated.
pub fn extract_xg_token(page: &str) -> Result<String, ScrapeError> {
    let start = page.find(TOKEN_MARKER).ok_or(ScrapeError::TokenNotFound)? + TOKEN_MARKER.len();
    let rest = &page[start..];
    let end = rest.find('\'').ok_or(ScrapeError::TokenNotFound)?;
    Ok(rest[..end].to_string())
}
