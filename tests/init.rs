use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_ragbench"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "ragbench init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".ragbench.toml");
    assert!(config_path.exists(), ".ragbench.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[retrieval]"));
    assert!(content.contains("[embedding]"));

    // Every section is commented out, so it parses to defaults
    let config: ragbench_core::RagConfig = toml::from_str(&content).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.retrieval.top_k, 5);
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".ragbench.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_ragbench"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".ragbench.toml")).unwrap();
    assert_eq!(content, "# existing");
}
