//! Delimiter based extraction of a single meta value.
//!
//! This is deliberately a plain substring scan and not an HTML parser: the
//! first opening marker wins, the first closing marker after it ends the
//! value, and nothing in between is unescaped. Entities such as `&amp;` or
//! `&#039;` therefore come back verbatim, and a description that itself
//! contains the closing marker is cut short.

use thiserror::Error;

/// Literal pair bounding the value of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Markers<'a> {
    pub open: &'a str,
    pub close: &'a str,
}

impl Markers<'static> {
    /// `<meta property="og:description" content="…" />`
    pub const OG_DESCRIPTION: Markers<'static> = Markers {
        open: r#"<meta property="og:description" content=""#,
        close: r#"" />"#,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("unable to find description")]
    MissingOpen,
    #[error("unable to find end of description")]
    MissingClose,
}

/// Return the text between the first `open` marker and the first `close`
/// marker that follows it.
///
/// ```
/// use reelwatch_social::facebook::{extract_between, ExtractError, Markers};
///
/// let m = Markers { open: "[", close: "]" };
/// assert_eq!(extract_between("a [b] [c]", &m), Ok("b"));
/// assert_eq!(extract_between("a b", &m), Err(ExtractError::MissingOpen));
/// assert_eq!(extract_between("a [b", &m), Err(ExtractError::MissingClose));
/// ```
pub fn extract_between<'b>(body: &'b str, markers: &Markers<'_>) -> Result<&'b str, ExtractError> {
    let (_, rest) = body
        .split_once(markers.open)
        .ok_or(ExtractError::MissingOpen)?;
    let (value, _) = rest
        .split_once(markers.close)
        .ok_or(ExtractError::MissingClose)?;
    Ok(value)
}

/// Shorthand for [`extract_between`] with [`Markers::OG_DESCRIPTION`].
pub fn og_description(body: &str) -> Result<&str, ExtractError> {
    extract_between(body, &Markers::OG_DESCRIPTION)
}
