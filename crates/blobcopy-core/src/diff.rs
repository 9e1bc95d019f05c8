//! Decides whether a candidate object needs to be copied.
//!
//! The rules are deliberately conservative: when neither a comparable hash
//! nor a usable modification-time ordering exists, the object is copied
//! again rather than silently skipped. This keeps reruns safe after partial
//! writes.

use crate::storage::ObjectMetadata;

/// Outcome of comparing a source object against the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDecision {
    /// The object must be transferred.
    Copy(CopyReason),
    /// Source and destination are already identical.
    Skip,
}

/// Why a transfer is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyReason {
    /// No object at the destination key.
    MissingDestination,
    /// Sizes differ.
    SizeMismatch,
    /// Both sides carry comparable hashes and they differ.
    HashMismatch,
    /// Equality could not be established either way.
    Unverifiable,
}

impl std::fmt::Display for CopyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            CopyReason::MissingDestination => "missing at destination",
            CopyReason::SizeMismatch => "size mismatch",
            CopyReason::HashMismatch => "hash mismatch",
            CopyReason::Unverifiable => "cannot verify equality",
        };
        f.write_str(reason)
    }
}

/// Compare source metadata against the destination stat result.
pub fn decide(source: &ObjectMetadata, dest: Option<&ObjectMetadata>) -> CopyDecision {
    let Some(dest) = dest else {
        return CopyDecision::Copy(CopyReason::MissingDestination);
    };

    if dest.size != source.size {
        return CopyDecision::Copy(CopyReason::SizeMismatch);
    }

    match (comparable_hash(source), comparable_hash(dest)) {
        (Some(src_hash), Some(dest_hash)) => {
            if src_hash == dest_hash {
                CopyDecision::Skip
            } else {
                CopyDecision::Copy(CopyReason::HashMismatch)
            }
        }
        // No hash to compare: trust modification times only when the
        // destination is at least as new as the source.
        _ => {
            if source.last_modified > 0
                && dest.last_modified > 0
                && dest.last_modified >= source.last_modified
            {
                CopyDecision::Skip
            } else {
                CopyDecision::Copy(CopyReason::Unverifiable)
            }
        }
    }
}

/// Extract an ETag usable as a content hash.
///
/// Only plain single-part MD5-style tags qualify: multipart-combined tags
/// (marked with a `-`) and backend-specific opaque tokens are not comparable
/// across stores.
fn comparable_hash(meta: &ObjectMetadata) -> Option<String> {
    let tag = meta.e_tag.as_deref()?.trim_matches('"').to_ascii_lowercase();
    if tag.len() == 32 && tag.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(tag)
    } else {
        None
    }
}
