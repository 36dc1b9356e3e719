//! Integration tests for directory loading and the config cache

use std::io::Write;
use std::path::Path;

use config_weaver::{ConfigContext, ConfigError, ConfigLoader, Value};

fn write_file(dir: &Path, name: &str, content: &str) {
    let mut f = std::fs::File::create(dir.join(name)).unwrap();
    f.write_all(content.as_bytes()).unwrap();
}

#[test]
fn test_directory_of_files_resolves_cross_references() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "cluster.yaml",
        "name: prod\nreplicas: \"3\"\n",
    );
    write_file(
        dir.path(),
        "mariadb.yaml",
        "pods: \"{{ gen_names(cluster.name, cluster.replicas) }}\"\nhost: \"{{ cluster.name }}.db\"\n",
    );

    let resolved = ConfigLoader::new(dir.path()).load().expect("Should load");

    assert_eq!(
        resolved.get_path(&["mariadb", "host"]),
        Some(&Value::String("prod.db".to_string()))
    );
    assert_eq!(
        resolved.get_path(&["mariadb", "pods"]),
        Some(&Value::Sequence(vec![
            Value::String("prod-0001".to_string()),
            Value::String("prod-0002".to_string()),
            Value::String("prod-0003".to_string()),
        ]))
    );
}

#[test]
fn test_env_vars_reachable_from_templates() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "service.yaml",
        "bind: \"{{ env.CW_IT_BIND_ADDR }}:8080\"\n",
    );

    std::env::set_var("CW_IT_BIND_ADDR", "10.0.0.1");
    let resolved = ConfigLoader::new(dir.path())
        .with_env_prefix("CW_IT_")
        .load()
        .expect("Should load");
    std::env::remove_var("CW_IT_BIND_ADDR");

    assert_eq!(
        resolved.get_path(&["service", "bind"]),
        Some(&Value::String("10.0.0.1:8080".to_string()))
    );
}

#[test]
fn test_missing_reference_across_files_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "service.yaml",
        "host: \"{{ cluster.name }}\"\n",
    );

    let err = ConfigLoader::new(dir.path()).load().expect_err("Should fail");
    assert!(matches!(err, ConfigError::Resolve(_)));
    assert!(err.to_string().contains("cluster.name"));
}

#[test]
fn test_context_resolves_once_per_invocation() {
    let dir = tempfile::tempdir().unwrap();
    // uuid() resolves to a fresh value per load; the cache must hand back
    // the same resolved configuration on every access
    write_file(dir.path(), "service.yaml", "id: \"{{ uuid() }}\"\n");

    let mut ctx = ConfigContext::new(ConfigLoader::new(dir.path()));
    let first = ctx.get_or_load().expect("Should load").clone();
    let second = ctx.get_or_load().expect("Should load").clone();
    assert_eq!(first, second);
}

#[test]
fn test_unreadable_directory_is_io_error() {
    let err = ConfigLoader::new("/nonexistent/config/dir")
        .load()
        .expect_err("Should fail");
    assert!(matches!(err, ConfigError::Io { .. }));
}
