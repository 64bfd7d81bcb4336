// tests/config_loading.rs
use media_monitor::config::ai::ENV_AI_CONFIG_PATH;
use media_monitor::config::monitor::ENV_MONITOR_CONFIG_PATH;
use media_monitor::config::{AiConfig, MonitorConfig};
use media_monitor::summarizer::build_summarizer;
use serial_test::serial;
use std::io::Write;

#[test]
#[serial]
fn monitor_env_path_must_exist() {
    std::env::set_var(ENV_MONITOR_CONFIG_PATH, "nope/monitor.toml");
    assert!(MonitorConfig::load_default().is_err());

    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "feeds = [\"https://a.example/rss\"]\n[digest]\ntitle = \"Test\"").unwrap();
    std::env::set_var(ENV_MONITOR_CONFIG_PATH, f.path());
    let cfg = MonitorConfig::load_default().unwrap();
    assert_eq!(cfg.feeds, vec!["https://a.example/rss"]);
    assert_eq!(cfg.digest.title, "Test");
    assert_eq!(cfg.pipeline.recency_days, 3);

    std::env::remove_var(ENV_MONITOR_CONFIG_PATH);
}

#[test]
#[serial]
fn ai_json_env_key_and_mock_provider() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, r#"{{"provider":" Mock ","api_key":"ENV"}}"#).unwrap();
    std::env::set_var(ENV_AI_CONFIG_PATH, f.path());
    std::env::set_var("OPENAI_API_KEY", "sk-from-env");

    let cfg = AiConfig::load_default().unwrap();
    assert_eq!(cfg.provider, "mock");
    assert_eq!(cfg.api_key, "sk-from-env");
    assert_eq!(build_summarizer(&cfg).unwrap().provider_name(), "mock");

    std::env::remove_var("OPENAI_API_KEY");
    std::env::remove_var(ENV_AI_CONFIG_PATH);
}

#[test]
#[serial]
fn ai_json_env_path_missing_is_an_error() {
    std::env::set_var(ENV_AI_CONFIG_PATH, "nope/ai.json");
    assert!(AiConfig::load_default().is_err());
    std::env::remove_var(ENV_AI_CONFIG_PATH);
}
