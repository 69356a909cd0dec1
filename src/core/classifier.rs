//! Job name classification.
//!
//! Both functions are pure: the same job name always yields the same tags.

use std::sync::LazyLock;

use regex::Regex;

use super::models::UNKNOWN_VERSION;

/// Dotted two-component version bounded by start/hyphen and hyphen/end.
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|-)(\d+\.\d+)(?:-|$)").expect("valid version regex"));

/// Prefixes stripped before variant matching. At most one is removed.
const PREFIXES: &[&str] = &[
    "periodic-ci-openshift-release-main-",
    "periodic-ci-openshift-",
    "openshift-",
    "release-",
];

type Rule = (fn(&str) -> bool, &'static str);

/// Variant decision table, evaluated top to bottom. First hit wins.
const VARIANT_RULES: &[Rule] = &[
    (|n| n.contains("upgrade"), "upgrade"),
    (|n| n.contains("serial") && n.contains("techpreview"), "tp-serial"),
    (|n| n.contains("techpreview"), "techpreview"),
    (|n| n.contains("serial"), "serial"),
    (|n| n.contains("upi"), "upi"),
    (|n| n.contains("static"), "static"),
    (|n| n.contains("csi"), "csi"),
    (|n| n.contains("zones"), "zones"),
    (|n| n.contains("assisted"), "assisted"),
    (|n| n.contains("operator"), "operator"),
    (|n| n.contains("prfinder"), "prfinder"),
];

const FALLBACK_VARIANT: &str = "e2e";

/// Extract the OCP version (e.g. `4.18`) from a job name.
///
/// Upgrade jobs name the source version before the target one, so the last
/// match is taken.
pub fn extract_version(job_name: &str) -> String {
    VERSION_RE
        .captures_iter(job_name)
        .filter_map(|c| c.get(1))
        .last()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
}

/// Extract a short variant tag such as `upgrade` or `serial`.
pub fn extract_variant(job_name: &str) -> String {
    let name = strip_prefix(job_name);
    VARIANT_RULES
        .iter()
        .find(|(matches, _)| matches(name))
        .map(|(_, tag)| *tag)
        .unwrap_or(FALLBACK_VARIANT)
        .to_string()
}

fn strip_prefix(job_name: &str) -> &str {
    PREFIXES
        .iter()
        .find_map(|p| job_name.strip_prefix(p))
        .unwrap_or(job_name)
}
