use anyhow::{Context, Result};
use dirs_next as dirs;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use super::model::AppConfig;

const APP_IDENTIFIER: &str = "uplink-arbiter";

fn join_default_path(base: &Path) -> PathBuf {
    let mut p = base.to_path_buf();
    p.push("config");
    p.push("config.json");
    p
}

// 全局配置基目录（由守护进程启动时注入）
static GLOBAL_BASE_DIR: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();

fn base_dir_slot() -> MutexGuard<'static, Option<PathBuf>> {
    let cell = GLOBAL_BASE_DIR.get_or_init(|| Mutex::new(None));
    cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 设置配置基目录，一旦设置将作为默认配置路径的来源。
/// 重复设置将被忽略（保持第一次设置的值）。
pub fn set_global_base_dir<P: AsRef<Path>>(base: P) {
    let mut guard = base_dir_slot();
    if guard.is_none() {
        *guard = Some(base.as_ref().to_path_buf());
    }
}

fn config_path() -> PathBuf {
    // 优先使用启动时注入的基目录；否则回退到系统配置目录
    // Linux: ~/.config/<identifier>
    // macOS: ~/Library/Application Support/<identifier>
    let injected = base_dir_slot().clone();
    let base = injected.unwrap_or_else(|| {
        if let Some(mut dir) = dirs::config_dir() {
            dir.push(APP_IDENTIFIER);
            dir
        } else {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        }
    });
    join_default_path(&base)
}

/// 返回配置基目录（包含 config 子目录的上一级）。
pub fn base_dir() -> PathBuf {
    let p = config_path();
    p.parent()
        .unwrap_or_else(|| Path::new("."))
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf()
}

#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod testing {
    //! Testing-only helpers exposed to integration suites.
    use super::*;

    pub fn override_global_base_dir<P: AsRef<Path>>(base: P) {
        *base_dir_slot() = Some(base.as_ref().to_path_buf());
    }

    pub fn clear_global_base_dir() {
        *base_dir_slot() = None;
    }
}

pub fn load_or_init() -> Result<AppConfig> {
    load_or_init_at_path(&config_path())
}

pub fn save(cfg: &AppConfig) -> Result<()> {
    save_at_path(cfg, &config_path())
}

pub fn load_or_init_at(base_dir: &Path) -> Result<AppConfig> {
    let path = join_default_path(base_dir);
    load_or_init_at_path(&path)
}

pub fn save_at(cfg: &AppConfig, base_dir: &Path) -> Result<()> {
    let path = join_default_path(base_dir);
    save_at_path(cfg, &path)
}

fn load_or_init_at_path(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        let data = fs::read(path).with_context(|| format!("read config: {}", path.display()))?;
        let cfg: AppConfig = serde_json::from_slice(&data).context("parse config json")?;
        Ok(cfg)
    } else {
        let cfg = AppConfig::default();
        save_at_path(&cfg, path)?;
        Ok(cfg)
    }
}

fn save_at_path(cfg: &AppConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok();
    }
    let json = serde_json::to_string_pretty(cfg).context("serialize config")?;
    let mut f =
        fs::File::create(path).with_context(|| format!("create config: {}", path.display()))?;
    f.write_all(json.as_bytes()).context("write config")?;
    tracing::info!(target = "config", path = %path.display(), "config saved");
    Ok(())
}
