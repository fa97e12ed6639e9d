//! 配置热重载测试

use crate::{ConfigFileWatcher, ConfigurationManager, JsonConfigProvider, SettingsMonitor};
use config_abstractions::{ConfigWatcher, OptionsMonitor, ReloadableOptions};
use infrastructure_common::{Configurable, ValidationError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FeatureSettings {
    application_name: String,
    enable_feature_x: bool,
}

impl Configurable for FeatureSettings {
    fn section_name() -> &'static str {
        "App"
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.application_name.trim().is_empty() {
            return Err(ValidationError::required_field_missing("ApplicationName"));
        }
        Ok(())
    }
}

fn settings_json(name: &str, enabled: bool) -> String {
    format!(r#"{{ "App": {{ "ApplicationName": "{name}", "EnableFeatureX": {enabled} }} }}"#)
}

/// 先写临时文件再改名，避免读到半个文件
fn replace_file(path: &Path, content: &str) {
    let staging = path.with_extension("staging");
    std::fs::write(&staging, content).unwrap();
    std::fs::rename(&staging, path).unwrap();
}

async fn monitored(path: &Path) -> (ConfigurationManager, SettingsMonitor<FeatureSettings>) {
    let mut manager = ConfigurationManager::new();
    manager.add_provider(Box::new(JsonConfigProvider::new(path).unwrap()));
    let section = manager.get_section(FeatureSettings::section_name()).await.unwrap();
    let monitor = SettingsMonitor::<FeatureSettings>::bind(&section).unwrap();
    (manager, monitor)
}

/// 重载所有提供者并刷新监视器
async fn refresh(
    manager: &mut ConfigurationManager,
    monitor: &SettingsMonitor<FeatureSettings>,
) -> bool {
    if manager.reload_all().await.is_err() {
        return false;
    }
    let section = manager.get_section(monitor.section_name()).await.unwrap();
    monitor.apply(&section).unwrap_or(false)
}

#[tokio::test]
async fn manual_reload_updates_monitor_but_not_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("appsettings.json");
    std::fs::write(&path, settings_json("Before", false)).unwrap();

    let (mut manager, monitor) = monitored(&path).await;
    let snapshot = monitor.current_value();
    assert_eq!(manager.watch_paths(), vec![path.clone()]);

    replace_file(&path, &settings_json("After", true));
    assert!(refresh(&mut manager, &monitor).await);

    let current = monitor.current_value();
    assert_eq!(current.application_name, "After");
    assert!(current.enable_feature_x);
    assert_eq!(snapshot.application_name, "Before");
}

#[tokio::test]
async fn broken_file_keeps_last_good_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("appsettings.json");
    std::fs::write(&path, settings_json("Stable", false)).unwrap();

    let (mut manager, monitor) = monitored(&path).await;

    replace_file(&path, "{ \"App\": ");
    assert!(!refresh(&mut manager, &monitor).await);
    assert_eq!(monitor.current_value().application_name, "Stable");

    replace_file(&path, &settings_json("", false));
    assert!(!refresh(&mut manager, &monitor).await);
    assert_eq!(monitor.current_value().application_name, "Stable");
}

#[tokio::test]
async fn watcher_reports_changes_to_watched_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("appsettings.json");
    std::fs::write(&path, settings_json("Watched", false)).unwrap();

    let (mut manager, monitor) = monitored(&path).await;
    let mut watcher = ConfigFileWatcher::new();
    for watch_path in manager.watch_paths() {
        watcher.add_watch_path(&watch_path).await.unwrap();
    }
    let mut changes = watcher.take_change_receiver().unwrap();
    assert!(watcher.take_change_receiver().is_none());
    watcher.start_watching().await.unwrap();
    assert!(watcher.is_watching());

    // 同目录下的其他文件不触发事件
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    replace_file(&path, &settings_json("Reloaded", true));

    let updated = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = changes.recv().await {
            assert!(event.requires_reload());
            assert_eq!(Path::new(&event.path), path.as_path());
            if refresh(&mut manager, &monitor).await {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);

    assert!(updated, "未收到配置文件变更事件");
    assert_eq!(monitor.current_value().application_name, "Reloaded");

    watcher.stop_watching().await.unwrap();
    assert!(!watcher.is_watching());
}

#[tokio::test]
async fn watcher_path_management() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("appsettings.json");
    let second = dir.path().join("overrides.toml");

    let mut watcher = ConfigFileWatcher::new();
    watcher.add_watch_path(&first).await.unwrap();
    watcher.add_watch_path(&second).await.unwrap();
    watcher.add_watch_path(&first).await.unwrap();
    assert_eq!(watcher.get_watched_paths(), vec![first.clone(), second.clone()]);

    watcher.remove_watch_path(&first).await.unwrap();
    assert_eq!(watcher.get_watched_paths(), vec![second]);
    assert!(watcher.remove_watch_path(&first).await.is_err());
    assert!(!watcher.is_watching());
}
