use anyhow::Result;
use std::collections::HashMap;
use tablesync::io::Codec;
use tablesync::{SyncConfig, TextEncoding};

#[test]
fn defaults_when_file_is_empty() -> Result<()> {
    let config = SyncConfig::from_toml("")?;
    assert_eq!(config, SyncConfig::default());
    assert_eq!(config.object_store.key_prefix, "files");
    assert_eq!(config.source.extension, "csv");
    assert_eq!(config.codec()?, Codec::default());
    Ok(())
}

#[test]
fn partial_sections_keep_other_defaults() -> Result<()> {
    let config = SyncConfig::from_toml(
        r#"
        [source]
        folder = "data/final"
        encoding = "utf-8"
        delimiter = ";"

        [database]
        name = "analytics"
        "#,
    )?;
    assert_eq!(config.source.folder.to_str(), Some("data/final"));
    assert_eq!(config.source.extension, "csv");
    assert_eq!(config.database.name, "analytics");
    assert_eq!(config.object_store.page_size, 1000);

    let codec = config.codec()?;
    assert_eq!(codec.csv.delimiter, b';');
    assert_eq!(codec.csv.encoding, TextEncoding::utf8());
    Ok(())
}

#[test]
fn unknown_keys_are_rejected() {
    assert!(SyncConfig::from_toml("[source]\nfolderz = \"x\"\n").is_err());
}

#[test]
fn overrides_replace_file_values() -> Result<()> {
    let mut config = SyncConfig::from_toml("[object_store]\nbucket = \"from-file\"\n")?;
    let vars: HashMap<String, String> = [
        ("bucket", "from-env"),
        ("database", "warehouse"),
        ("page_size", "50"),
        ("delimiter", "|"),
        ("unrelated", "ignored"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    config.apply_overrides(&vars)?;

    assert_eq!(config.object_store.bucket, "from-env");
    assert_eq!(config.database.name, "warehouse");
    assert_eq!(config.object_store.page_size, 50);
    assert_eq!(config.source.delimiter, '|');
    Ok(())
}

#[test]
fn bad_overrides_are_errors() {
    let mut config = SyncConfig::default();
    let page = HashMap::from([("page_size".to_string(), "lots".to_string())]);
    assert!(config.apply_overrides(&page).is_err());
    let delim = HashMap::from([("delimiter".to_string(), ";;".to_string())]);
    assert!(config.apply_overrides(&delim).is_err());
}

#[test]
fn unusable_codec_settings() {
    let mut config = SyncConfig::default();
    config.source.encoding = "no-such-encoding".into();
    assert!(config.codec().is_err());

    let mut config = SyncConfig::default();
    config.source.delimiter = 'é';
    assert!(config.codec().is_err());
}

#[test]
fn load_reads_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tablesync.toml");
    std::fs::write(&path, "[object_store]\nroot = \"/srv/buckets\"\n")?;
    let config = SyncConfig::load(Some(&path))?;
    assert_eq!(config.object_store.root.to_str(), Some("/srv/buckets"));
    assert!(SyncConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    Ok(())
}

#[test]
fn pipeline_options_follow_config() -> Result<()> {
    let config = SyncConfig::from_toml("[object_store]\nkey_prefix = \"exports\"\n")?;
    let options = config.pipeline_options();
    assert_eq!(options.key_prefix, "exports");
    assert_eq!(options.source_extension, "csv");
    Ok(())
}
