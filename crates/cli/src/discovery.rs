//! Component directory discovery.

use std::path::PathBuf;

use miette::{Result, miette};

/// Environment variable overriding the component directory.
const DIR_ENV_VAR: &str = "ZENITH_COMPONENT_DIR";

/// Resolves the default component directory.
///
/// `ZENITH_COMPONENT_DIR` wins when set; otherwise the per-user data
/// directory (`<data_dir>/zenith/components`) is used. Nothing is
/// created here: a missing directory surfaces later as a scan error.
pub fn default_components_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DIR_ENV_VAR) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    dirs::data_dir()
        .map(|base| base.join("zenith").join("components"))
        .ok_or_else(|| miette!("Cannot determine a component directory; set {}", DIR_ENV_VAR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_override_wins() {
        // Serialize env mutation against other tests in this binary.
        unsafe { std::env::set_var(DIR_ENV_VAR, "/tmp/zenith-test-components") };
        let dir = default_components_dir().unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/zenith-test-components"));
        unsafe { std::env::remove_var(DIR_ENV_VAR) };
    }
}
