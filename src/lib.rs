//! This is the documentation of the **hybrid screen** package.
//!
//! Ray tracing neglects diffraction. The hybrid screen corrects ray traced beams behind optical elements with a
//! finite aperture (slits, grazing incidence mirrors and gratings, compound refractive lenses) by a wave optical
//! calculation: the intensity profile of the rays behind the element is converted into a 1D wavefront, which is
//! propagated by Fresnel diffraction into the far field (and optionally to the image plane). The propagated
//! intensities are used as probability distributions for angle and position offsets added to the rays.
//!
//! The main entry point is [`hybrid::HybridScreen`].
#![allow(clippy::module_name_repetitions)]

pub mod beam;
pub mod console;
pub mod error;
pub mod figure_error;
pub mod history;
pub mod hybrid;
pub mod optical_element;
pub mod progress;
pub mod ray;
pub mod scaled;
pub mod source;
pub mod tracer;
pub mod units;
pub mod utils;
pub mod wavefront;

use chrono::DateTime;

/// Value vergen emits instead of the git information if the repository cannot be read.
const VERGEN_PLACEHOLDER: &str = "VERGEN_IDEMPOTENT_OUTPUT";

/// Return the version information of the software.
///
/// The string contains the git description and the commit date. For builds without git information the crate
/// version is returned.
#[must_use]
pub fn get_version() -> String {
    version_string(
        option_env!("VERGEN_GIT_DESCRIBE"),
        option_env!("VERGEN_GIT_COMMIT_TIMESTAMP"),
    )
}
fn version_string(describe: Option<&str>, timestamp: Option<&str>) -> String {
    let known = |value: &&str| !value.is_empty() && *value != VERGEN_PLACEHOLDER;
    let timestamp = timestamp
        .filter(known)
        .and_then(|timestamp| DateTime::parse_from_rfc3339(timestamp).ok())
        .map_or_else(
            || String::from("unknown date"),
            |timestamp| timestamp.format("%Y/%m/%d %H:%M").to_string(),
        );
    let description = describe.filter(known).unwrap_or(env!("CARGO_PKG_VERSION"));
    format!("{description} ({timestamp})")
}
#[cfg(test)]
mod test {
    use super::*;
    use regex::Regex;
    #[test]
    fn get_ver() {
        let version_string = get_version();
        let re = Regex::new(r"(.*) \((\d{4}/\d{2}/\d{2} \d{2}:\d{2}|unknown date)\)").unwrap();
        assert!(re.is_match(&version_string));
    }
    #[test]
    fn version_without_git() {
        let fallback = format!("{} (unknown date)", env!("CARGO_PKG_VERSION"));
        assert_eq!(version_string(None, None), fallback);
        assert_eq!(
            version_string(Some(VERGEN_PLACEHOLDER), Some(VERGEN_PLACEHOLDER)),
            fallback
        );
        assert_eq!(
            version_string(Some("v0.1.0-3-gabcdef"), Some("no date")),
            "v0.1.0-3-gabcdef (unknown date)"
        );
        assert_eq!(
            version_string(Some("v0.1.0"), Some("2024-05-17T09:30:00+00:00")),
            "v0.1.0 (2024/05/17 09:30)"
        );
    }
}
