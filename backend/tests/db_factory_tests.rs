//! Tests for db::factory module - repository creation and configuration.

mod support;

use std::io::Write;
use std::str::FromStr;

use dreamers::db::factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
use dreamers::db::{MaintenanceRepository, RepositoryConfig, RepositoryError};

#[test]
fn test_repository_type_from_str_mongo() {
    let rt = RepositoryType::from_str("mongo").unwrap();
    assert_eq!(rt, RepositoryType::Mongo);

    let rt = RepositoryType::from_str("MONGODB").unwrap();
    assert_eq!(rt, RepositoryType::Mongo);
}

#[test]
fn test_repository_type_from_str_invalid() {
    let result = RepositoryType::from_str("invalid");
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("Unknown repository type"));
}

#[test]
fn test_repository_type_from_env_default() {
    support::with_scoped_env(
        &[("REPOSITORY_TYPE", None), ("MONGODB_URI", None)],
        || {
            assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
        },
    );
}

#[test]
fn test_repository_type_from_env_explicit() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", Some("local")),
            ("MONGODB_URI", Some("mongodb://localhost:27017")),
        ],
        || {
            assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
        },
    );
}

#[test]
fn test_repository_type_from_env_unknown_falls_back_to_local() {
    support::with_scoped_env(&[("REPOSITORY_TYPE", Some("cassandra"))], || {
        assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
    });
}

#[cfg(feature = "mongo-repo")]
#[test]
fn test_repository_type_from_env_with_mongodb_uri() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("MONGODB_URI", Some("mongodb://localhost:27017")),
        ],
        || {
            assert_eq!(RepositoryType::from_env(), RepositoryType::Mongo);
        },
    );
}

#[tokio::test]
async fn test_create_local_is_healthy() {
    let repo = RepositoryFactory::create_local();
    assert!(repo.health_check().await.unwrap());
}

#[tokio::test]
async fn test_from_config_file_local() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[repository]\ntype = \"local\"").unwrap();

    let repo = RepositoryFactory::from_config_file(file.path()).await.unwrap();
    let indexes = repo.ensure_indexes().await.unwrap();
    assert_eq!(
        indexes,
        vec![
            "events_childId_startTime",
            "children_parentId",
            "plans_childId_status"
        ]
    );
}

#[tokio::test]
async fn test_from_config_file_missing() {
    let result = RepositoryFactory::from_config_file("/definitely/not/here.toml").await;
    assert!(matches!(
        result,
        Err(RepositoryError::ConfigurationError { .. })
    ));
}

#[tokio::test]
async fn test_from_config_file_malformed() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[repository\ntype = ").unwrap();

    let err = RepositoryFactory::from_config_file(file.path())
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[cfg(not(feature = "mongo-repo"))]
#[tokio::test]
async fn test_mongo_without_feature_is_configuration_error() {
    let config: RepositoryConfig = toml::from_str(
        r#"
[repository]
type = "mongo"

[mongo]
uri = "mongodb://localhost:27017"
"#,
    )
    .unwrap();

    let err = RepositoryFactory::from_repository_config(&config)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("feature not enabled"));
}

#[cfg(feature = "mongo-repo")]
#[tokio::test]
async fn test_mongo_without_uri_is_configuration_error() {
    let config: RepositoryConfig = toml::from_str("[repository]\ntype = \"mongo\"").unwrap();
    let err = RepositoryFactory::from_repository_config(&config)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, RepositoryError::ConfigurationError { .. }));
}

#[tokio::test]
async fn test_builder_with_config() {
    let config = RepositoryConfig::default();
    let repo = RepositoryBuilder::new()
        .with_config(&config)
        .unwrap()
        .build()
        .await
        .unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[test]
fn test_config_load_applies_env_overrides() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", Some("local")),
            ("HOST", Some("127.0.0.1")),
            ("PORT", Some("4100")),
        ],
        || {
            let config = RepositoryConfig::load().unwrap();
            assert_eq!(config.repository_type().unwrap(), RepositoryType::Local);
            assert_eq!(config.bind_address(), "127.0.0.1:4100");
        },
    );
}
