use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default harload data directory: ~/.harload
pub fn get_harload_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".harload"))
}

/// Reads `path` and applies environment overrides on top.
pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let mut cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok())?;
    Ok(cfg)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.harload/config.toml (highest)
    let user_config = get_harload_data_dir()?.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    if user_config.exists() {
        return load_from_path(&user_config);
    }
    if local_config.exists() {
        return load_from_path(local_config);
    }

    // Environment variable overrides (Priority 0: highest)
    let mut cfg = AppConfig::default();
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok())?;
    Ok(cfg)
}

/// Applies `HARLOAD_*` overrides. Blank values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("HARLOAD_WORKERS") {
        cfg.load.workers = v
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("HARLOAD_WORKERS={v:?}: {e}"))?;
    }
    if let Some(v) = get("HARLOAD_DURATION") {
        cfg.load.duration = humantime::parse_duration(v.trim())
            .map_err(|e| anyhow::anyhow!("HARLOAD_DURATION={v:?}: {e}"))?;
    }
    if let Some(v) = get("HARLOAD_INFLUX_URL") {
        cfg.sink.influx_url = Some(v);
    }
    if let Some(v) = get("HARLOAD_JSONL_PATH") {
        cfg.sink.jsonl_path = Some(v);
    }

    Ok(())
}
