use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// ULIDs sort by creation time, so these double as client-side timestamp ids
/// for records the server has not assigned an id to yet.
///
/// # Examples
/// ```
/// let id = academy_common::id::prefixed_ulid("ntf");
/// assert!(id.starts_with("ntf_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Returns true when `id` was minted locally by [`prefixed_ulid`] with `prefix`.
pub fn is_local(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|ulid| Ulid::from_string(ulid).is_ok())
}

/// Marker trait for types that carry a locally generated prefixed ID.
pub trait PrefixedId {
    const PREFIX: &'static str;

    fn generate() -> String {
        prefixed_ulid(Self::PREFIX)
    }
}

/// Well-known ID prefixes.
pub mod prefix {
    pub const NOTIFICATION: &str = "ntf";
}
