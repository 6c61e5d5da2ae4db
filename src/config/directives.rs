use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::sections::SectionName;
use crate::config::sources::SourceKey;

/// Resolved form of the directive file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Enables every section regardless of the individual flags
    pub run_all: bool,
    /// Sections switched on by `Run:<Name>`
    #[serde(default)]
    pub enabled: BTreeSet<SectionName>,
    /// Source locations replaced by `<Key>:<value>`
    #[serde(default)]
    pub overrides: BTreeMap<SourceKey, String>,
    /// Lower-cased IOC patterns in directive order
    #[serde(default)]
    pub iocs: Vec<String>,
    /// Script run against the collection directory before processing
    #[serde(default)]
    pub pre_conversion: Option<String>,
    /// HTML fragment placed under the report heading
    #[serde(default)]
    pub branding: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            run_all: true,
            enabled: BTreeSet::new(),
            overrides: BTreeMap::new(),
            iocs: Vec::new(),
            pre_conversion: None,
            branding: None,
        }
    }
}

impl RunConfig {
    /// Parse directive text.
    ///
    /// Unknown lines are ignored. A file with no `Run:` directive at all is
    /// treated as `Run:AllAll`.
    pub fn from_directives(text: &str) -> Self {
        let mut config = RunConfig {
            run_all: false,
            ..RunConfig::default()
        };
        let mut saw_run_directive = false;

        for raw_line in text.lines() {
            let line = raw_line.trim_end_matches(['\r', '\n']);

            if line.starts_with('*') || line.trim().is_empty() {
                continue;
            }

            if let Some(name) = line.strip_prefix("Run:") {
                let name = name.split_whitespace().next().unwrap_or("");
                saw_run_directive = true;
                if name == "AllAll" {
                    config.run_all = true;
                } else {
                    match name.parse::<SectionName>() {
                        Ok(section) => {
                            config.enabled.insert(section);
                        }
                        Err(_) => debug!("Ignoring unknown section directive: {}", line),
                    }
                }
                continue;
            }

            if let Some(pattern) = line.strip_prefix("IOC:") {
                let pattern = pattern.trim().to_lowercase();
                if pattern.is_empty() {
                    warn!("Ignoring empty IOC directive");
                } else {
                    if config.iocs.is_empty() {
                        info!("Adding IOCs for Searching...");
                    }
                    config.iocs.push(pattern);
                }
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();

            match key {
                "PreConv" => {
                    info!("Pre-Run Conversion Script: {}", value);
                    config.pre_conversion = Some(value).filter(|v| !v.is_empty());
                }
                "Brander" => {
                    info!("Custom Branding: {}", value);
                    config.branding = Some(value).filter(|v| !v.is_empty());
                }
                _ => match key.parse::<SourceKey>() {
                    Ok(source) => config.set_override(source, value),
                    Err(_) => debug!("Ignoring unrecognized directive: {}", line),
                },
            }
        }

        if !saw_run_directive {
            config.run_all = true;
        }

        config
    }

    fn set_override(&mut self, key: SourceKey, value: String) {
        info!("{}: {}", key.description(), value);
        if key == SourceKey::Browser {
            let downloads = sibling_path(&value, "BrowseDown.csv");
            info!("{}: {}", SourceKey::Downlod.description(), downloads);
            self.overrides.insert(SourceKey::Downlod, downloads);
        }
        self.overrides.insert(key, value);
    }

    /// Whether a section enabled by `name` should be rendered
    pub fn is_enabled(&self, name: SectionName) -> bool {
        self.run_all || self.enabled.contains(&name)
    }

    /// Whether any of `names` is enabled
    pub fn any_enabled(&self, names: &[SectionName]) -> bool {
        self.run_all || names.iter().any(|name| self.enabled.contains(name))
    }

    /// Relative location of a source, override first
    pub fn source_path(&self, key: SourceKey) -> &str {
        self.overrides
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_path())
    }

    pub fn has_iocs(&self) -> bool {
        !self.iocs.is_empty()
    }
}

/// Replace the file name of a Windows or Unix style relative path
fn sibling_path(path: &str, file_name: &str) -> String {
    match path.rfind(['\\', '/']) {
        Some(idx) => format!("{}{}", &path[..=idx], file_name),
        None => file_name.to_string(),
    }
}

/// Load the directive file at `path`.
///
/// A missing file is not an error; the default run-all configuration is
/// returned instead.
pub fn parse_config(path: &Path) -> Result<RunConfig> {
    if !path.exists() {
        warn!(
            "Config File Not Found ({}), Default Setting Configured.",
            path.display()
        );
        return Ok(RunConfig::default());
    }

    info!("Config File Found ({}), Now Parsing Config Options...", path.display());
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);

    Ok(RunConfig::from_directives(&text))
}

/// Commented directive file listing every section and source default
pub fn render_default_config() -> String {
    let mut out = String::new();
    out.push_str("* Triage report configuration\n");
    out.push_str("* Lines starting with '*' are comments.\n");
    out.push_str("*\n");
    out.push_str("* Report sections (remove Run:AllAll and list sections to narrow the report)\n");
    out.push_str("Run:AllAll\n");
    for name in SectionName::ALL {
        out.push_str(&format!("*Run:{}\n", name));
    }
    out.push_str("*\n");
    out.push_str("* Source locations relative to the collection directory\n");
    for key in SourceKey::ALL {
        out.push_str(&format!("*{}:{}\n", key, key.default_path().replace('/', "\\")));
    }
    out.push_str("*\n");
    out.push_str("* Optional pre-run script and report branding\n");
    out.push_str("*PreConv:\n");
    out.push_str("*Brander:\n");
    out.push_str("*\n");
    out.push_str("* Indicators of compromise (case-insensitive substrings)\n");
    out.push_str("*IOC:evil.exe\n");
    out
}

/// Write the default directive file to `path`
pub fn create_default_config_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
    }
    fs::write(path, render_default_config())
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    Ok(())
}
