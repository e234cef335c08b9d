// src/core/identity/key.rs
use regex::Regex;
use std::sync::OnceLock;

use super::types::StorageKey;

/// Branch used when an email does not carry a campus roll number.
pub const UNKNOWN_BRANCH: &str = "UNKNOWN";

// Two-letter branch code followed by a three digit roll number, directly
// before the campus domain. Anything may precede the branch code.
static CAMPUS_EMAIL: OnceLock<Regex> = OnceLock::new();

fn campus_email_pattern() -> &'static Regex {
    CAMPUS_EMAIL.get_or_init(|| {
        Regex::new(r"([a-z]{2})(\d{3})@nmamit\.in").expect("Valid regex pattern")
    })
}

/// Maps a verified email to the directory its photos are stored under.
///
/// `nnm24cs124@nmamit.in` becomes `CS/CS_124`. Any other address falls back
/// to `UNKNOWN/<local part>` with dots replaced by underscores, so
/// `jane.doe@otherdomain.com` becomes `UNKNOWN/jane_doe`. Total over all
/// inputs, including the empty string.
pub fn derive_storage_key(email: &str) -> StorageKey {
    match campus_email_pattern().captures(email) {
        Some(caps) => {
            let branch = caps[1].to_uppercase();
            let folder_id = format!("{}_{}", branch, &caps[2]);
            StorageKey::new(branch, folder_id)
        }
        None => {
            let local_part = email.split_once('@').map_or(email, |(local, _)| local);
            StorageKey::new(UNKNOWN_BRANCH, local_part.replace('.', "_"))
        }
    }
}
