use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use concierge_campus::CampusOptions;
use concierge_core::{
    DEFAULT_FALLBACK_MESSAGE, DispatchMode, FailurePolicy, OrchestratorConfig, RouterConfig,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConciergeConfig {
    #[serde(default)]
    pub router: RouterSection,
    #[serde(default)]
    pub synthesis: SynthesisSection,
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    #[serde(default)]
    pub student: StudentSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSection {
    #[serde(default)]
    pub dispatch: DispatchMode,
    /// 0 disables the timeout
    #[serde(default = "default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_handlers")]
    pub max_concurrent_handlers: usize,
}

fn default_handler_timeout_secs() -> u64 {
    30
}
fn default_max_concurrent_handlers() -> usize {
    4
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::default(),
            handler_timeout_secs: default_handler_timeout_secs(),
            max_concurrent_handlers: default_max_concurrent_handlers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisSection {
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

fn default_fallback_message() -> String {
    DEFAULT_FALLBACK_MESSAGE.to_string()
}

impl Default for SynthesisSection {
    fn default() -> Self {
        Self {
            fallback_message: default_fallback_message(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorSection {
    #[serde(default)]
    pub on_handler_failure: FailurePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSection {
    #[serde(default = "default_student_id")]
    pub id: String,
    #[serde(default = "default_true")]
    pub personalize_courses: bool,
}

fn default_student_id() -> String {
    "student123".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for StudentSection {
    fn default() -> Self {
        Self {
            id: default_student_id(),
            personalize_courses: true,
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".concierge")
}

impl ConciergeConfig {
    /// Load from `custom_path`, or `~/.concierge/config.toml` when none is
    /// given. A missing default file yields the built-in defaults; a missing
    /// custom file is an error.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = match custom_path {
            Some(path) => path.clone(),
            None => {
                let path = config_dir().join("config.toml");
                if !path.exists() {
                    warn!(
                        "No config at {}, using defaults. Run `concierge init` to create one.",
                        path.display()
                    );
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;

        let expanded = expand_env_vars(&content);

        let config: Self = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        if config.router.max_concurrent_handlers == 0 {
            warn!("router.max_concurrent_handlers is 0; handlers will run one at a time");
        }

        Ok(config)
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            dispatch: self.router.dispatch,
            handler_timeout: match self.router.handler_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            max_concurrent_handlers: self.router.max_concurrent_handlers,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            router: self.router_config(),
            fallback_message: self.synthesis.fallback_message.clone(),
            on_handler_failure: self.orchestrator.on_handler_failure,
        }
    }

    pub fn campus_options(&self) -> CampusOptions {
        CampusOptions {
            student_id: self.student.id.clone(),
            personalize_courses: self.student.personalize_courses,
            ..CampusOptions::default()
        }
    }
}

/// Environment variables that may be expanded in config files.
const ALLOWED_ENV_VARS: &[&str] = &["CONCIERGE_STUDENT_ID", "USER", "HOME"];

/// Substitute allowlisted `${VAR}` references. Unknown names and
/// unterminated references are copied through untouched.
fn expand_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 2..];
        let Some(close) = tail.find('}') else {
            rest = &rest[open..];
            break;
        };

        let name = &tail[..close];
        if ALLOWED_ENV_VARS.contains(&name) {
            out.push_str(&std::env::var(name).unwrap_or_default());
        } else {
            warn!("Leaving unrecognized env var '{}' in config unexpanded", name);
            out.push_str(&rest[open..open + close + 3]);
        }
        rest = &tail[close + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_bundled_default_matches_builtin_defaults() {
        let bundled: ConciergeConfig =
            toml::from_str(include_str!("../../../config/default.toml")).unwrap();
        let builtin = ConciergeConfig::default();
        assert_eq!(bundled.router.dispatch, builtin.router.dispatch);
        assert_eq!(
            bundled.router.handler_timeout_secs,
            builtin.router.handler_timeout_secs
        );
        assert_eq!(
            bundled.synthesis.fallback_message,
            builtin.synthesis.fallback_message
        );
        assert_eq!(
            bundled.orchestrator.on_handler_failure,
            FailurePolicy::Abort
        );
        assert_eq!(bundled.student.id, "student123");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let file = write_config(
            "[router]\ndispatch = \"parallel\"\n\n[orchestrator]\non_handler_failure = \"degrade\"\n",
        );
        let cfg = ConciergeConfig::load(&Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.router.dispatch, DispatchMode::Parallel);
        assert_eq!(cfg.router.handler_timeout_secs, 30);
        assert_eq!(cfg.router.max_concurrent_handlers, 4);
        assert_eq!(cfg.orchestrator.on_handler_failure, FailurePolicy::Degrade);
        assert_eq!(cfg.synthesis.fallback_message, DEFAULT_FALLBACK_MESSAGE);
        assert!(cfg.student.personalize_courses);
    }

    #[test]
    fn test_zero_timeout_disables_limit() {
        let file = write_config("[router]\nhandler_timeout_secs = 0\n");
        let cfg = ConciergeConfig::load(&Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.router_config().handler_timeout, None);
        assert_eq!(
            ConciergeConfig::default().router_config().handler_timeout,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_campus_options_from_student_section() {
        let file = write_config("[student]\nid = \"student456\"\npersonalize_courses = false\n");
        let cfg = ConciergeConfig::load(&Some(file.path().to_path_buf())).unwrap();
        let options = cfg.campus_options();
        assert_eq!(options.student_id, "student456");
        assert!(!options.personalize_courses);
    }

    #[test]
    fn test_missing_custom_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(ConciergeConfig::load(&Some(missing)).is_err());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let file = write_config("[router\ndispatch = ");
        let err = ConciergeConfig::load(&Some(file.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config"));
    }

    #[test]
    fn test_expand_env_vars_allowlist() {
        let home = std::env::var("HOME").unwrap_or_default();
        assert_eq!(expand_env_vars("dir = \"${HOME}\""), format!("dir = \"{}\"", home));
        assert_eq!(expand_env_vars("key = \"${SECRET_TOKEN}\""), "key = \"${SECRET_TOKEN}\"");
        assert_eq!(expand_env_vars("open ${ brace"), "open ${ brace");
    }

    #[test]
    fn test_expand_env_vars_mixed_references() {
        let home = std::env::var("HOME").unwrap_or_default();
        assert_eq!(
            expand_env_vars("a = \"${SECRET_TOKEN}/${HOME}\"\nb = \"${HOME}\""),
            format!("a = \"${{SECRET_TOKEN}}/{}\"\nb = \"{}\"", home, home)
        );
        assert_eq!(expand_env_vars("tail ${HOME"), "tail ${HOME");
        assert_eq!(expand_env_vars("no refs"), "no refs");
    }

    #[test]
    fn test_student_id_from_environment_reference() {
        let expected = std::env::var("CONCIERGE_STUDENT_ID").unwrap_or_default();
        let file = write_config("[student]\nid = \"${CONCIERGE_STUDENT_ID}\"\n");
        let cfg = ConciergeConfig::load(&Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.student.id, expected);
    }
}
