//! Integration tests for Imagix

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use filetime::{set_file_mtime, FileTime};
    use predicates::prelude::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const MTIME: i64 = 1_700_000_000;
    const CURRENT: &str = "/favicon@thumb@1700000000.png";

    /// Source and cache roots plus private config/state dirs
    struct Sandbox {
        temp: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            fs::create_dir_all(temp.path().join("source")).unwrap();
            fs::create_dir_all(temp.path().join("cache")).unwrap();

            let sandbox = Self { temp };
            sandbox.write_source("favicon.png");
            sandbox
        }

        fn path(&self, relative: &str) -> PathBuf {
            self.temp.path().join(relative)
        }

        fn write_source(&self, name: &str) {
            let path = self.path("source").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            image::RgbaImage::from_pixel(32, 16, image::Rgba([10, 120, 200, 255]))
                .save_with_format(&path, image::ImageFormat::Png)
                .unwrap();
            set_file_mtime(&path, FileTime::from_unix_time(MTIME, 0)).unwrap();
        }

        fn write_cached(&self, name: &str) {
            let path = self.path("cache").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"cached").unwrap();
        }

        fn write_config(&self, content: &str) {
            fs::write(self.path("config.toml"), content).unwrap();
        }

        fn imagix(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("imagix");
            cmd.env("IMAGIX_CONFIG", self.path("config.toml"))
                .env("IMAGIX_SOURCE_ROOT", self.path("source"))
                .env("IMAGIX_DESTINATION_ROOT", self.path("cache"))
                .env("XDG_CONFIG_HOME", self.path("xdg-config"))
                .env("XDG_STATE_HOME", self.path("xdg-state"))
                .env_remove("RUST_LOG");
            cmd
        }
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("imagix")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Path-addressed image derivative cache"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("imagix")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("imagix"));
    }

    #[test]
    fn config_path() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("redirect_status = 301"));
    }

    #[test]
    fn config_init_writes_once() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(sandbox.path("config.toml").is_file());

        sandbox
            .imagix()
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let sandbox = Sandbox::new();
        sandbox.write_config("[http]\nredirect_status = 200\n");
        sandbox
            .imagix()
            .args(["formats"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn url_encodes_mtime() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["url", "/favicon.png", "thumb"])
            .assert()
            .success()
            .stdout(format!("{CURRENT}\n"));
    }

    #[test]
    fn url_passes_missing_source_through() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["url", "/undefined.png", "thumb"])
            .assert()
            .success()
            .stdout("/undefined.png\n");
    }

    #[test]
    fn url_unknown_format_fails_with_hint() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["url", "/favicon.png", "huge"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Image format `huge` was not defined"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn url_with_public_prefix() {
        let sandbox = Sandbox::new();
        sandbox.write_config(
            r#"
            [http]
            public_prefix = "/media"

            [formats.small]
            ops = [{ op = "resize", width = 8 }]
            "#,
        );
        sandbox
            .imagix()
            .args(["url", "/favicon.png", "small"])
            .assert()
            .success()
            .stdout("/media/favicon@small@1700000000.png\n");
    }

    #[test]
    fn missing_roots_fail_with_hint() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .env_remove("IMAGIX_SOURCE_ROOT")
            .args(["url", "/favicon.png", "thumb"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no source root configured"))
            .stderr(predicate::str::contains("--source-root"));
    }

    #[test]
    fn source_decodes_destination() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["source", "/a/b/photo@thumb@42.jpg"])
            .assert()
            .success()
            .stdout("/a/b/photo.jpg\tthumb\n");
    }

    #[test]
    fn source_rejects_malformed_destination() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["source", "/favicon.png"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Wrong destination file format"));
    }

    #[test]
    fn effective_follows_mtime() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["effective", "/favicon@thumb@12345.png"])
            .assert()
            .success()
            .stdout(format!("{CURRENT}\n"));
    }

    #[test]
    fn compile_generates_derivative() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["compile", CURRENT])
            .assert()
            .success()
            .stdout(predicate::str::ends_with("favicon@thumb@1700000000.png\n"));

        let generated = image::open(sandbox.path("cache/favicon@thumb@1700000000.png")).unwrap();
        assert_eq!((generated.width(), generated.height()), (128, 128));
    }

    #[test]
    fn compile_missing_source_fails() {
        let sandbox = Sandbox::new();
        sandbox.write_cached("gone@thumb@1.png");
        sandbox
            .imagix()
            .args(["compile", "/gone@thumb@2.png"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Source file does not exist"));
        assert!(!sandbox.path("cache/gone@thumb@1.png").exists());
    }

    #[test]
    fn compile_rejects_traversal() {
        let sandbox = Sandbox::new();
        fs::write(sandbox.path("secret@thumb@1.png"), b"secret").unwrap();

        sandbox
            .imagix()
            .args(["compile", "/../secret@thumb@1.png"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Path is not allowed"));
        assert_eq!(fs::read(sandbox.path("secret@thumb@1.png")).unwrap(), b"secret");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn traversal_is_audited() {
        let sandbox = Sandbox::new();
        fs::write(sandbox.path("secret.png"), b"secret").unwrap();

        sandbox
            .imagix()
            .args(["url", "/../secret.png", "thumb"])
            .assert()
            .failure();

        let audit = fs::read_to_string(sandbox.path("xdg-state/imagix/audit.log")).unwrap();
        assert!(audit.contains("\"path.forbidden\""));
        assert!(audit.contains("/../secret.png"));
    }

    #[test]
    fn send_serves_file() {
        let sandbox = Sandbox::new();
        let output = sandbox
            .imagix()
            .args(["send", CURRENT])
            .output()
            .unwrap();
        assert!(output.status.success());

        let stdout = &output.stdout;
        let split = stdout
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("header block terminator");
        let headers = String::from_utf8_lossy(&stdout[..split]);
        assert!(headers.starts_with("Status: 200 OK\r\n"));
        assert!(headers.contains("Content-Type: image/png\r\n"));
        assert!(headers.contains("Cache-Control: public"));
        assert!(stdout[split + 4..].starts_with(b"\x89PNG"));
    }

    #[test]
    fn send_rejects_traversal() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["send", "/../secret@thumb@1.png"])
            .assert()
            .failure()
            .stdout(predicate::str::starts_with("Status: 403 Forbidden\r\n"));
    }

    #[test]
    fn send_redirects_stale_url() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["send", "/favicon@thumb@1.png"])
            .assert()
            .success()
            .stdout(format!(
                "Status: 301 Moved Permanently\r\nLocation: {CURRENT}\r\n\r\n"
            ));
        assert!(!sandbox.path("cache/favicon@thumb@1700000000.png").exists());
    }

    #[test]
    fn send_not_modified() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args([
                "send",
                CURRENT,
                "--if-modified-since",
                "Fri, 01 Jan 2100 00:00:00 GMT",
            ])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("Status: 304 Not Modified\r\n"));
    }

    #[test]
    fn send_unknown_format_is_not_found() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["send", "/favicon@huge@1700000000.png"])
            .assert()
            .failure()
            .stdout(predicate::str::starts_with("Status: 404 Not Found\r\n"));
    }

    #[test]
    fn unlink_removes_variants() {
        let sandbox = Sandbox::new();
        sandbox.write_cached("favicon@thumb@1.png");
        sandbox.write_cached("favicon@medium@1.png");
        sandbox.write_cached("other@thumb@1.png");

        sandbox
            .imagix()
            .args(["unlink", "/favicon.png", "--format", "thumb"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 1 cached file(s)"));

        assert!(!sandbox.path("cache/favicon@thumb@1.png").exists());
        assert!(sandbox.path("cache/favicon@medium@1.png").exists());
        assert!(sandbox.path("cache/other@thumb@1.png").exists());
    }

    #[test]
    fn remove_by_format() {
        let sandbox = Sandbox::new();
        sandbox.write_cached("favicon@thumb@1.png");
        sandbox.write_cached("a/b/photo@thumb@2.jpg");
        sandbox.write_cached("a/photo@medium@2.jpg");

        sandbox
            .imagix()
            .args(["remove", "--format", "thumb"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 2 entries"));

        assert!(!sandbox.path("cache/a/b/photo@thumb@2.jpg").exists());
        assert!(sandbox.path("cache/a/photo@medium@2.jpg").exists());
    }

    #[test]
    fn remove_dry_run_keeps_files() {
        let sandbox = Sandbox::new();
        sandbox.write_cached("favicon@thumb@1.png");

        sandbox
            .imagix()
            .args(["remove", "--format", "thumb", "--dry-run"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Would remove 1 entries"))
            .stdout(predicate::str::contains("favicon@thumb@1.png"));

        assert!(sandbox.path("cache/favicon@thumb@1.png").exists());
    }

    #[test]
    fn remove_everything_needs_confirmation() {
        let sandbox = Sandbox::new();
        sandbox.write_cached("favicon@thumb@1.png");

        sandbox
            .imagix()
            .arg("remove")
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing removed"));
        assert!(sandbox.path("cache/favicon@thumb@1.png").exists());

        sandbox
            .imagix()
            .args(["remove", "--yes"])
            .assert()
            .success();
        assert!(!sandbox.path("cache/favicon@thumb@1.png").exists());
        assert!(sandbox.path("cache").is_dir());
    }

    #[test]
    fn formats_lists_recipes() {
        let sandbox = Sandbox::new();
        sandbox
            .imagix()
            .args(["formats", "--output", "plain"])
            .assert()
            .success()
            .stdout("medium\nthumb\n");

        sandbox
            .imagix()
            .args(["formats", "--output", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"recipe\": \"fill 128x128\""));
    }
}
