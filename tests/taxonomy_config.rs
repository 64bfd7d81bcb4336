// tests/taxonomy_config.rs
use media_monitor::classify::classify;
use media_monitor::relevance::RelevanceScorer;
use media_monitor::taxonomy::{
    Taxonomy, TaxonomyError, ENV_RELEVANCE_THRESHOLD, ENV_TAXONOMY_CONFIG_PATH,
};
use media_monitor::ReportCategory;
use serial_test::serial;
use std::io::Write;
use std::path::{Path, PathBuf};

fn shipped_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config/taxonomy.toml")
}

fn shipped() -> Taxonomy {
    Taxonomy::from_path(&shipped_path()).unwrap()
}

#[test]
fn shipped_taxonomy_classifies_every_core_group() {
    let t = shipped();
    assert_eq!(t.scoring.threshold, 3);
    for g in t.groups().iter().filter(|g| g.core) {
        assert!(classify(&t, &g.name).is_ok(), "{} unclassified", g.name);
    }
    assert_eq!(classify(&t, "Ihsan_Casket").unwrap(), ReportCategory::Primary);
    assert_eq!(
        classify(&t, "Competitor_Kidney_KDF").unwrap(),
        ReportCategory::Competitor
    );
    assert_eq!(
        classify(&t, "SocialSector_Advocacy_Support").unwrap(),
        ReportCategory::PeerSector
    );
    assert_eq!(classify(&t, "General_Zakat").unwrap(), ReportCategory::General);
    assert!(t.exclusions().applies_to("General_Donations"));
}

#[test]
fn casket_drive_matches_primary() {
    let t = shipped();
    let s = RelevanceScorer::new(&t).unwrap();
    let r = s.score(
        "MTFA launches new Ihsan Casket drive",
        "Volunteers from MTFA said the Ihsan Casket service and Ihsan Casket vans are ready.",
    );
    let best = r.best.expect("match");
    assert_eq!(best.phrase, "Ihsan Casket");
    assert_eq!(classify(&t, &best.group).unwrap(), ReportCategory::Primary);
}

#[test]
fn political_donation_story_is_not_reported() {
    let t = shipped();
    let s = RelevanceScorer::new(&t).unwrap();
    let r = s.score(
        "NKF donation election candidate controversy",
        "The donation was questioned by a candidate.",
    );
    assert!(!r.is_match(), "{:?}", r);
    assert!(!r.suppressed.is_empty());
}

#[test]
#[serial]
fn env_path_and_threshold_override_are_honoured() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(
        f,
        r#"
[scoring]
threshold = 9

[[groups]]
name = "Only"
core = true
category = "general"
phrases = ["zakat"]
"#
    )
    .unwrap();

    std::env::set_var(ENV_TAXONOMY_CONFIG_PATH, f.path());
    std::env::remove_var(ENV_RELEVANCE_THRESHOLD);
    let t = Taxonomy::from_toml().unwrap();
    assert_eq!(t.groups().len(), 1);
    assert_eq!(t.scoring.threshold, 9);

    std::env::set_var(ENV_RELEVANCE_THRESHOLD, "4");
    assert_eq!(Taxonomy::from_toml().unwrap().scoring.threshold, 4);

    std::env::set_var(ENV_RELEVANCE_THRESHOLD, "not-a-number");
    assert_eq!(Taxonomy::from_toml().unwrap().scoring.threshold, 9);

    std::env::remove_var(ENV_RELEVANCE_THRESHOLD);
    std::env::remove_var(ENV_TAXONOMY_CONFIG_PATH);
}

#[test]
#[serial]
fn missing_taxonomy_file_is_a_read_error() {
    std::env::set_var(ENV_TAXONOMY_CONFIG_PATH, "does/not/exist.toml");
    let err = Taxonomy::from_toml().unwrap_err();
    assert!(matches!(err, TaxonomyError::Read { .. }));
    std::env::remove_var(ENV_TAXONOMY_CONFIG_PATH);
}
