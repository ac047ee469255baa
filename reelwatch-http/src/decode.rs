//! Content-Encoding detection and explicit gzip decompression.
//!
//! The client never asks `reqwest` to decode bodies; `get_raw` advertises
//! gzip itself and undoes it here, so the declared encoding stays visible
//! on [`crate::RawResponse`].

use std::io::Read;

use bytes::Bytes;
use flate2::read::MultiGzDecoder;
use reqwest::header::{CONTENT_ENCODING, HeaderMap};

use crate::HttpError;

/// Encoding declared by the response `Content-Encoding` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    /// Anything else; the body is passed through untouched.
    Other(String),
}

impl ContentEncoding {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(raw) = headers.get(CONTENT_ENCODING) else {
            return Self::Identity;
        };
        let value = raw.to_str().unwrap_or("").trim().to_ascii_lowercase();
        match value.as_str() {
            "" | "identity" => Self::Identity,
            "gzip" | "x-gzip" => Self::Gzip,
            _ => Self::Other(value),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Identity => "identity",
            Self::Gzip => "gzip",
            Self::Other(v) => v,
        }
    }
}

/// Undo the declared encoding, if it is one we understand.
///
/// ```
/// use bytes::Bytes;
/// use reelwatch_http::decode::{decode_body, ContentEncoding};
///
/// let plain = decode_body(&ContentEncoding::Identity, Bytes::from_static(b"<html>")).unwrap();
/// assert_eq!(&plain[..], b"<html>");
/// ```
pub fn decode_body(encoding: &ContentEncoding, raw: Bytes) -> Result<Bytes, HttpError> {
    match encoding {
        // Every member of the stream is decoded; trailing bytes that are not
        // another gzip member are an error.
        ContentEncoding::Gzip => {
            let mut out = Vec::with_capacity(raw.len() * 4);
            MultiGzDecoder::new(&raw[..])
                .read_to_end(&mut out)
                .map_err(|e| HttpError::Decompress(e.to_string()))?;
            Ok(Bytes::from(out))
        }
        ContentEncoding::Identity | ContentEncoding::Other(_) => Ok(raw),
    }
}
