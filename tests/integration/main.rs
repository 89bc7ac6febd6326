//! Integration tests for dircache

const AWS_VARS: [&str; 5] = [
    "AWS_S3_BUCKET",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_REGION",
];

mod cli_tests {
    use super::AWS_VARS;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use chrono::{TimeZone, Utc};
    use dircache::cache::{CacheConfig, CacheKey, JobContext, S3Backend};
    use dircache::config::CacheSettings;
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// Command isolated from the developer's config and AWS environment
    fn dircache(config_dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("dircache");
        for var in AWS_VARS {
            cmd.env_remove(var);
        }
        cmd.env("CI", "true")
            .arg("--config")
            .arg(config_dir.path().join("config.toml"));
        cmd
    }

    const KEY: [&str; 4] = ["--slug", "acme/widgets", "--branch", "main"];
    const STORE: [&str; 6] = [
        "--bucket",
        "ci-caches",
        "--access-key-id",
        "AKIDEXAMPLE",
        "--secret-access-key",
        "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
    ];

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        dircache(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("signed build cache transfers"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        dircache(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("dircache"));
    }

    #[test]
    fn url_matches_library_signing() {
        let dir = TempDir::new().unwrap();
        let output = dircache(&dir)
            .arg("url")
            .args(KEY)
            .args(STORE)
            .args(["--timestamp", "2023-01-01T00:00:00Z"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let printed = String::from_utf8(output.stdout).unwrap();

        let mut settings = CacheSettings::default();
        settings.s3.bucket = Some("ci-caches".to_string());
        settings.s3.access_key_id = Some("AKIDEXAMPLE".to_string());
        settings.s3.secret_access_key =
            Some("wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY".to_string());
        let config = CacheConfig::build(&settings).unwrap();
        let ctx = JobContext::new(
            "/build",
            "/tmp",
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
        );
        let backend = S3Backend::new(&config, config.store().unwrap(), &ctx);
        let key = CacheKey::new("acme/widgets", "main").unwrap();
        let expected = backend.fetch_urls(&key).unwrap().remove(0);

        assert_eq!(printed.trim(), expected.as_str());
        assert!(printed.starts_with(
            "https://ci-caches.s3.amazonaws.com/acme/widgets/main/cache.tgz?X-Amz-Algorithm=AWS4-HMAC-SHA256"
        ));
        assert!(printed.contains("X-Amz-Date=20230101T000000Z"));
        assert!(printed.contains("X-Amz-Expires=20"));
    }

    #[test]
    fn put_url_uses_push_timeout() {
        let dir = TempDir::new().unwrap();
        dircache(&dir)
            .args(["url", "--verb", "put", "--push-timeout", "300"])
            .args(KEY)
            .args(STORE)
            .assert()
            .success()
            .stdout(predicate::str::contains("X-Amz-Expires=300"));
    }

    #[test]
    fn url_reads_credentials_from_environment() {
        let dir = TempDir::new().unwrap();
        dircache(&dir)
            .arg("url")
            .args(KEY)
            .env("AWS_S3_BUCKET", "env-bucket")
            .env("AWS_ACCESS_KEY_ID", "AKIDENV")
            .env("AWS_SECRET_ACCESS_KEY", "secret")
            .env("AWS_SESSION_TOKEN", "session")
            .env("AWS_REGION", "eu-central-1")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "https://env-bucket.s3.eu-central-1.amazonaws.com/",
            ))
            .stdout(predicate::str::contains("X-Amz-Security-Token=session"))
            .stdout(predicate::str::contains("AKIDENV"));
    }

    #[test]
    fn missing_bucket_fails_with_hint() {
        let dir = TempDir::new().unwrap();
        dircache(&dir)
            .arg("url")
            .args(KEY)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid cache configuration: bucket"))
            .stderr(predicate::str::contains("AWS_S3_BUCKET"));
    }

    #[test]
    fn non_positive_timeout_fails() {
        let dir = TempDir::new().unwrap();
        dircache(&dir)
            .args(["url", "--fetch-timeout", "0"])
            .args(KEY)
            .args(STORE)
            .assert()
            .failure()
            .stderr(predicate::str::contains("fetch_timeout"));
    }

    #[test]
    fn unknown_cache_type_fails() {
        let dir = TempDir::new().unwrap();
        dircache(&dir)
            .args(["plan", "fetch", "--type", "gcs"])
            .args(KEY)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown cache type: gcs"))
            .stderr(predicate::str::contains("Supported cache types"));
    }

    #[test]
    fn plan_push_prints_operation_json() {
        let dir = TempDir::new().unwrap();
        let output = dircache(&dir)
            .args(["plan", "push", "vendor/bundle", "--root", "/build"])
            .args(["--scratch-dir", "/tmp/dircache"])
            .args(KEY)
            .args(STORE)
            .output()
            .unwrap();
        assert!(output.status.success());

        let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(plan["direction"], "push");
        let ops: Vec<&str> = plan["commands"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["op"].as_str().unwrap())
            .collect();
        assert_eq!(ops, ["log", "compress", "upload_with_timeout"]);
        assert_eq!(plan["commands"][1]["directories"][0], "vendor/bundle");
        assert_eq!(plan["commands"][2]["timeout_secs"], 60);
    }

    #[test]
    fn push_outside_build_dir_fails_before_transfer() {
        let dir = TempDir::new().unwrap();
        dircache(&dir)
            .args(["plan", "push", "node_modules", "/home/u/.m2", "--root", "/build"])
            .args(KEY)
            .args(STORE)
            .assert()
            .failure()
            .stderr(predicate::str::contains("/home/u/.m2"))
            .stderr(predicate::str::contains("inside the build directory"));
    }

    #[test]
    fn plan_with_noop_cache_needs_no_credentials() {
        let dir = TempDir::new().unwrap();
        dircache(&dir)
            .args(["plan", "fetch", "--type", "noop"])
            .args(KEY)
            .assert()
            .success()
            .stdout(predicate::str::contains("build cache disabled"));
    }

    #[test]
    fn config_init_then_show_omits_secrets() {
        let dir = TempDir::new().unwrap();
        dircache(&dir).args(["config", "init"]).assert().success();
        assert!(dir.path().join("config.toml").exists());

        std::fs::write(
            dir.path().join("config.toml"),
            "[cache.s3]\nbucket = \"ci-caches\"\nsecret_access_key = \"hunter2\"\n",
        )
        .unwrap();
        dircache(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ci-caches"))
            .stdout(predicate::str::contains("hunter2").not());
    }

    #[test]
    fn config_path_points_at_override() {
        let dir = TempDir::new().unwrap();
        dircache(&dir)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn unwritable_config_dir_suggests_verbose_rerun() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("blocker"), "").unwrap();
        let mut cmd = cargo_bin_cmd!("dircache");
        cmd.env("CI", "true")
            .arg("--config")
            .arg(dir.path().join("blocker/config.toml"))
            .args(["config", "init"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to create config directory"))
            .stderr(predicate::str::contains("-vv"));
    }

    #[test]
    fn invalid_config_file_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[cache\n").unwrap();
        dircache(&dir)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}

mod transfer_tests {
    use super::AWS_VARS;
    use assert_cmd::cargo::cargo_bin_cmd;
    use chrono::Utc;
    use dircache::cache::{create_backend, CacheConfig, CacheKey, JobContext};
    use dircache::config::CacheSettings;
    use dircache::transfer::{archive, HttpExecutor, TransferExecutor, TransferOutcome};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OWN: &str = "/ci-caches/acme/widgets/topic/cache.tgz";
    const DEFAULT: &str = "/ci-caches/acme/widgets/master/cache.tgz";

    fn config(server: &MockServer, fetch_timeout: i64) -> CacheConfig {
        let mut settings = CacheSettings::default();
        settings.fetch_timeout = fetch_timeout;
        settings.s3.scheme = "http".to_string();
        settings.s3.endpoint = Some(server.address().to_string());
        settings.s3.bucket = Some("ci-caches".to_string());
        settings.s3.access_key_id = Some("AKIDEXAMPLE".to_string());
        settings.s3.secret_access_key = Some("secret".to_string());
        CacheConfig::build(&settings).unwrap()
    }

    fn key() -> CacheKey {
        CacheKey::new("acme/widgets", "topic").unwrap()
    }

    /// A cache archive holding `vendor/bundle/gem.rb`
    fn cache_archive() -> Vec<u8> {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("vendor/bundle")).unwrap();
        fs::write(src.path().join("vendor/bundle/gem.rb"), "puts 1").unwrap();
        let out = src.path().join("cache.tgz");
        archive::compress(src.path(), &[PathBuf::from("vendor/bundle")], &out).unwrap();
        fs::read(out).unwrap()
    }

    fn restored(root: &Path) -> bool {
        root.join("vendor/bundle/gem.rb").is_file()
    }

    async fn fetch(server: &MockServer, fetch_timeout: i64, root: &Path) -> TransferOutcome {
        let scratch = TempDir::new().unwrap();
        let config = config(server, fetch_timeout);
        let ctx = JobContext::new(root, scratch.path(), Utc::now());
        let op = create_backend(&config, &ctx).unwrap().fetch(&key()).unwrap();
        HttpExecutor::new().execute(&op).await
    }

    #[tokio::test]
    async fn fetch_restores_own_branch_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(OWN))
            .and(query_param("X-Amz-Expires", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(cache_archive()))
            .expect(1)
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        assert_eq!(fetch(&server, 20, root.path()).await, TransferOutcome::Success);
        assert!(restored(root.path()));
    }

    #[tokio::test]
    async fn fetch_falls_back_to_default_branch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(OWN))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(DEFAULT))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(cache_archive()))
            .expect(1)
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        assert_eq!(fetch(&server, 20, root.path()).await, TransferOutcome::Success);
        assert!(restored(root.path()));
    }

    #[tokio::test]
    async fn fetch_without_any_cache_is_a_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        assert_eq!(fetch(&server, 20, root.path()).await, TransferOutcome::Miss);
        assert!(!restored(root.path()));
    }

    #[tokio::test]
    async fn slow_store_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(cache_archive())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        assert_eq!(fetch(&server, 1, root.path()).await, TransferOutcome::Timeout);
        assert!(!restored(root.path()));
    }

    #[tokio::test]
    async fn server_error_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        match fetch(&server, 20, root.path()).await {
            TransferOutcome::Error(detail) => assert!(detail.contains("500")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn push_uploads_gzip_archive() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(OWN))
            .and(query_param("X-Amz-Expires", "60"))
            .and(header("content-type", "application/gzip"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("vendor/bundle")).unwrap();
        fs::write(root.path().join("vendor/bundle/gem.rb"), "puts 1").unwrap();
        let scratch = TempDir::new().unwrap();
        let config = config(&server, 20);
        let ctx = JobContext::new(root.path(), scratch.path(), Utc::now());
        let op = create_backend(&config, &ctx)
            .unwrap()
            .push(&key(), &[PathBuf::from("vendor/bundle")])
            .unwrap();

        assert_eq!(HttpExecutor::new().execute(&op).await, TransferOutcome::Success);

        let requests = server.received_requests().await.unwrap();
        let upload = &requests[0];
        assert_eq!(&upload.body[..2], &[0x1f, 0x8b]);
        let length = upload
            .headers
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        assert_eq!(length, Some(upload.body.len()));
        assert!(upload.headers.get("transfer-encoding").is_none());
    }

    async fn push(server: &MockServer, root: &Path, directories: &[&str]) -> TransferOutcome {
        let scratch = TempDir::new().unwrap();
        let config = config(server, 20);
        let ctx = JobContext::new(root, scratch.path(), Utc::now());
        let directories: Vec<PathBuf> = directories.iter().map(PathBuf::from).collect();
        let op = create_backend(&config, &ctx)
            .unwrap()
            .push(&key(), &directories)
            .unwrap();
        HttpExecutor::new().execute(&op).await
    }

    #[tokio::test]
    async fn rejected_upload_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("vendor/bundle")).unwrap();

        match push(&server, root.path(), &["vendor/bundle"]).await {
            TransferOutcome::Error(detail) => assert!(detail.contains("403")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn push_without_existing_directories_keeps_stored_cache() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        match push(&server, root.path(), &["node_modules", "vendor/bundle"]).await {
            TransferOutcome::Skipped(reason) => assert!(reason.contains("nothing to upload")),
            other => panic!("expected skipped push, got {:?}", other),
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn denied_fetch_is_an_error_not_a_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                 <Error><Code>SignatureDoesNotMatch</Code><Message>bad</Message></Error>",
            ))
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        match fetch(&server, 20, root.path()).await {
            TransferOutcome::Error(detail) => assert!(detail.contains("SignatureDoesNotMatch")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn access_denied_fetch_is_a_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_string("<Error><Code>AccessDenied</Code></Error>"),
            )
            .expect(2)
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        assert_eq!(fetch(&server, 20, root.path()).await, TransferOutcome::Miss);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cli_fetch_miss_does_not_fail_the_build() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut cmd = cargo_bin_cmd!("dircache");
        for var in AWS_VARS {
            cmd.env_remove(var);
        }
        let endpoint = server.address().to_string();
        cmd.env("CI", "true")
            .arg("--config")
            .arg(dir.path().join("config.toml"))
            .args(["fetch", "--slug", "acme/widgets", "--branch", "topic"])
            .args(["--scheme", "http", "--endpoint", &endpoint])
            .args(["--bucket", "ci-caches", "--access-key-id", "AKIDEXAMPLE"])
            .args(["--secret-access-key", "secret"])
            .arg("--root")
            .arg(dir.path())
            .arg("--scratch-dir")
            .arg(dir.path().join("scratch"))
            .assert()
            .success()
            .stdout(predicate::str::contains("no build cache found"));
    }
}
