use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::document::DEFAULT_FONT_SIZE_PX;
use crate::metrics::{DEFAULT_SPARSE_THRESHOLD_PX, DeviceDimensions};

/// Device size given as `WIDTHxHEIGHT` in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for DeviceSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid width in {s:?}"))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid height in {s:?}"))?;
        if width == 0 || height == 0 {
            return Err(format!("device size must be non-zero, got {s:?}"));
        }
        Ok(Self { width, height })
    }
}

impl std::fmt::Display for DeviceSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Flags that can be saved as defaults.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub edit: bool,
    pub no_autofix: bool,
    pub force_half_cell: bool,
    pub sparse_threshold: Option<f32>,
    pub page_height: Option<f32>,
    pub font_size: Option<f32>,
    pub device: Option<DeviceSize>,
    pub debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge with `other` taking precedence: switches are or-ed and values
    /// from `other` replace ours.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            edit: self.edit || other.edit,
            no_autofix: self.no_autofix || other.no_autofix,
            force_half_cell: self.force_half_cell || other.force_half_cell,
            sparse_threshold: other.sparse_threshold.or(self.sparse_threshold),
            page_height: other.page_height.or(self.page_height),
            font_size: other.font_size.or(self.font_size),
            device: other.device.or(self.device),
            debug_log: other.debug_log.clone().or_else(|| self.debug_log.clone()),
        }
    }

    /// Command-line form of the set flags, one flag per entry.
    fn to_lines(&self) -> Vec<String> {
        let switches = [
            (self.watch, "--watch"),
            (self.edit, "--edit"),
            (self.no_autofix, "--no-autofix"),
            (self.force_half_cell, "--force-half-cell"),
        ];
        let mut lines: Vec<String> = switches
            .into_iter()
            .filter_map(|(on, name)| on.then(|| name.to_string()))
            .collect();
        let valued = [
            ("--sparse-threshold", self.sparse_threshold.map(|px| px.to_string())),
            ("--page-height", self.page_height.map(|px| px.to_string())),
            ("--font-size", self.font_size.map(|px| px.to_string())),
            ("--device", self.device.map(|size| size.to_string())),
            ("--debug-log", self.debug_log.as_ref().map(|p| p.display().to_string())),
        ];
        lines.extend(
            valued
                .into_iter()
                .filter_map(|(name, value)| value.map(|value| format!("{name} {value}"))),
        );
        lines
    }
}

/// Rendering settings derived from the effective flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub auto_fix_sparse_pages: bool,
    pub sparse_threshold_px: f32,
    pub fixed_page_height_px: Option<f32>,
    pub font_size: f32,
    /// Explicit device size; `None` derives it from the terminal.
    pub device: Option<DeviceDimensions>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            auto_fix_sparse_pages: true,
            sparse_threshold_px: DEFAULT_SPARSE_THRESHOLD_PX,
            fixed_page_height_px: None,
            font_size: DEFAULT_FONT_SIZE_PX,
            device: None,
        }
    }
}

impl RenderOptions {
    pub fn from_flags(flags: &ConfigFlags) -> Self {
        let defaults = Self::default();
        Self {
            auto_fix_sparse_pages: !flags.no_autofix,
            sparse_threshold_px: positive(flags.sparse_threshold)
                .unwrap_or(defaults.sparse_threshold_px),
            fixed_page_height_px: positive(flags.page_height),
            font_size: positive(flags.font_size).unwrap_or(defaults.font_size),
            device: flags
                .device
                .map(|d| DeviceDimensions::new(d.width as f32, d.height as f32)),
        }
    }
}

fn positive(value: Option<f32>) -> Option<f32> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Directory that holds per-user application settings.
fn settings_dir() -> Option<PathBuf> {
    let env_dir = |name: &str| std::env::var_os(name).map(PathBuf::from);
    if cfg!(target_os = "windows") {
        env_dir("APPDATA")
    } else if cfg!(target_os = "macos") {
        env_dir("HOME").map(|home| home.join("Library/Application Support"))
    } else {
        env_dir("XDG_CONFIG_HOME").or_else(|| env_dir("HOME").map(|home| home.join(".config")))
    }
}

/// Per-user defaults file, falling back to the local override when no
/// settings directory is known.
pub fn global_config_path() -> PathBuf {
    settings_dir().map_or_else(local_override_path, |dir| dir.join("folio").join("config"))
}

/// Defaults file in the working directory, applied over the global one.
pub fn local_override_path() -> PathBuf {
    PathBuf::from(".foliorc")
}

/// Read saved flags. A missing file yields no flags.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(ConfigFlags::default()),
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read config {}", path.display()));
        }
    };
    let tokens: Vec<String> = content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(str::split_whitespace)
        .map(String::from)
        .collect();
    Ok(parse_flag_tokens(&tokens))
}

/// Write `flags` one per line, creating the parent directory.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut body = String::from("# folio defaults (saved with --save)\n");
    for line in flags.to_lines() {
        body.push_str(&line);
        body.push('\n');
    }
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config dir {}", dir.display()))?;
    }
    fs::write(path, body).with_context(|| format!("Failed to write config {}", path.display()))
}

/// Remove saved defaults if present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => {
            Err(err).with_context(|| format!("Failed to remove {}", path.display()))
        }
        _ => Ok(()),
    }
}

/// Value of `--name VALUE` or `--name=VALUE` at `tokens[*i]`, advancing `i`
/// past a separate value token.
fn flag_value<'a>(tokens: &'a [String], i: &mut usize, name: &str) -> Option<&'a str> {
    let token = tokens[*i].as_str();
    if token == name {
        let next = tokens.get(*i + 1)?;
        *i += 1;
        return Some(next.as_str());
    }
    token.strip_prefix(name)?.strip_prefix('=')
}

pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "--watch" => flags.watch = true,
            "--edit" => flags.edit = true,
            "--no-autofix" => flags.no_autofix = true,
            "--force-half-cell" => flags.force_half_cell = true,
            _ => {
                if let Some(value) = flag_value(tokens, &mut i, "--sparse-threshold") {
                    flags.sparse_threshold = value.parse().ok();
                } else if let Some(value) = flag_value(tokens, &mut i, "--page-height") {
                    flags.page_height = value.parse().ok();
                } else if let Some(value) = flag_value(tokens, &mut i, "--font-size") {
                    flags.font_size = value.parse().ok();
                } else if let Some(value) = flag_value(tokens, &mut i, "--device") {
                    flags.device = value.parse().ok();
                } else if let Some(value) = flag_value(tokens, &mut i, "--debug-log") {
                    flags.debug_log = Some(PathBuf::from(value));
                }
            }
        }
        i += 1;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let args = vec![
            "folio".to_string(),
            "--watch".to_string(),
            "--no-autofix".to_string(),
            "--sparse-threshold".to_string(),
            "600".to_string(),
            "--device=1024x768".to_string(),
            "--debug-log=folio.log".to_string(),
            "--force-half-cell".to_string(),
            "book.json".to_string(),
        ];
        let flags = parse_flag_tokens(&args);
        assert!(flags.watch);
        assert!(flags.no_autofix);
        assert_eq!(flags.sparse_threshold, Some(600.0));
        assert_eq!(
            flags.device,
            Some(DeviceSize {
                width: 1024,
                height: 768
            })
        );
        assert_eq!(flags.debug_log, Some(PathBuf::from("folio.log")));
        assert!(flags.force_half_cell);
        assert!(!flags.edit);
    }

    #[test]
    fn test_value_flag_at_end_is_ignored() {
        let args = vec!["--font-size".to_string()];
        assert_eq!(parse_flag_tokens(&args).font_size, None);
    }

    #[test]
    fn test_device_size_parsing() {
        assert_eq!(
            "800X600".parse::<DeviceSize>(),
            Ok(DeviceSize {
                width: 800,
                height: 600
            })
        );
        assert!("800".parse::<DeviceSize>().is_err());
        assert!("0x600".parse::<DeviceSize>().is_err());
        assert!("wide x tall".parse::<DeviceSize>().is_err());
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            watch: true,
            font_size: Some(14.0),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            edit: true,
            font_size: Some(18.0),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.watch);
        assert!(merged.edit);
        assert_eq!(merged.font_size, Some(18.0));
    }

    #[test]
    fn test_render_options_from_flags() {
        let flags = ConfigFlags {
            no_autofix: true,
            page_height: Some(1100.0),
            font_size: Some(-3.0),
            device: Some(DeviceSize {
                width: 700,
                height: 900,
            }),
            ..ConfigFlags::default()
        };
        let options = RenderOptions::from_flags(&flags);
        assert!(!options.auto_fix_sparse_pages);
        assert_eq!(options.fixed_page_height_px, Some(1100.0));
        assert_eq!(options.font_size, DEFAULT_FONT_SIZE_PX);
        assert_eq!(options.sparse_threshold_px, DEFAULT_SPARSE_THRESHOLD_PX);
        assert_eq!(options.device, Some(DeviceDimensions::new(700.0, 900.0)));
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".foliorc");
        let flags = ConfigFlags {
            watch: true,
            edit: true,
            no_autofix: true,
            force_half_cell: true,
            sparse_threshold: Some(700.0),
            page_height: Some(1200.5),
            font_size: Some(15.0),
            device: Some(DeviceSize {
                width: 640,
                height: 960,
            }),
            debug_log: Some(PathBuf::from("folio.log")),
        };

        save_config_flags(&path, &flags).unwrap();
        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded, flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
    }
}
