//! Kubernetes-compatible name handling

use regex::Regex;
use std::sync::OnceLock;

/// Upper bound for numeric suffixes tried while uniquifying a name.
pub const MAX_NAME_SUFFIX: u32 = 65_535;

fn invalid_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^-0-9a-z]+").expect("valid regex"))
}

fn dash_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-+").expect("valid regex"))
}

/// Sanitize a human readable name into a Kubernetes resource name.
///
/// Lowercases the input, replaces every run of characters outside
/// `[-0-9a-z]` with a single dash, collapses dashes and trims them from
/// both ends: `"Some component name"` becomes `"some-component-name"`.
pub fn sanitize_k8s_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let replaced = invalid_chars().replace_all(&lowered, "-");
    let collapsed = dash_runs().replace_all(&replaced, "-");
    collapsed.trim_matches('-').to_string()
}

/// Make `name` unique against `is_taken` by appending `-2`, `-3`, ...
///
/// Returns `None` when every suffix up to [`MAX_NAME_SUFFIX`] is taken.
pub fn make_name_unique<F>(name: &str, is_taken: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    if !is_taken(name) {
        return Some(name.to_string());
    }
    (2..=MAX_NAME_SUFFIX)
        .map(|index| format!("{}-{}", name, index))
        .find(|candidate| !is_taken(candidate))
}
