mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, NamedTempFile};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

fn emoji_sync() -> Command {
    let mut cmd = Command::cargo_bin("emoji-sync").expect("Binary exists");
    cmd.env_remove("DISCORD_API_TOKEN")
        .env_remove("BOT_GUILD_ID")
        .env_remove("EMOJIS_DIR")
        .env_remove("DISCORD_API_BASE");
    cmd
}

fn write_pngs(dir: &Path, names: &[&str]) {
    for name in names {
        write(dir.join(format!("{name}.png")), b"\x89PNG\r\n\x1a\n").unwrap();
    }
}

#[test]
fn help_lists_every_command() {
    emoji_sync()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("diff")
                .and(predicate::str::contains("apply"))
                .and(predicate::str::contains("reload"))
                .and(predicate::str::contains("check")),
        );
}

#[test]
fn unknown_update_action_is_rejected() {
    emoji_sync()
        .args(["diff", "--update-action", "rename"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown update action"));
}

#[test]
fn diff_without_token_fails() {
    emoji_sync()
        .arg("diff")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DISCORD_API_TOKEN"));
}

#[test]
fn check_accepts_a_well_formed_directory() {
    let dir = tempdir().unwrap();
    write_pngs(dir.path(), &["wave", "smile"]);

    emoji_sync()
        .arg("check")
        .env("EMOJIS_DIR", dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("All 2 emojis are well-formed."));
}

#[test]
fn check_reports_oversized_images() {
    let dir = tempdir().unwrap();
    write_pngs(dir.path(), &["wave"]);
    write(dir.path().join("huge.png"), vec![0u8; 300 * 1024]).unwrap();

    emoji_sync()
        .arg("check")
        .env("EMOJIS_DIR", dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("huge").and(predicate::str::contains("1 of 2")));
}

#[test]
fn check_reads_the_directory_from_the_config_file() {
    let dir = tempdir().unwrap();
    write_pngs(dir.path(), &["wave"]);
    let config = NamedTempFile::new().unwrap();
    write(config.path(), format!("emojis_dir: {:?}\n", dir.path())).unwrap();

    emoji_sync()
        .arg("--config")
        .arg(config.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("All 1 emojis"));
}

#[test]
fn unreachable_api_fails_before_ready() {
    let dir = tempdir().unwrap();
    write_pngs(dir.path(), &["wave"]);

    emoji_sync()
        .arg("diff")
        .env("DISCORD_API_TOKEN", "token")
        .env("EMOJIS_DIR", dir.path())
        .env("DISCORD_API_BASE", "http://127.0.0.1:9")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .stderr(predicate::str::contains("before becoming ready"));
}

#[tokio::test(flavor = "multi_thread")]
async fn diff_json_against_fake_discord() {
    let server = common::start(serde_json::json!([
        common::emoji("wave", "1", false),
        common::emoji("old", "2", false),
    ]))
    .await;
    let dir = tempdir().unwrap();
    write_pngs(dir.path(), &["wave", "new"]);

    let mut cmd = emoji_sync();
    cmd.args(["diff", "--json"])
        .env("DISCORD_API_TOKEN", common::TOKEN)
        .env("BOT_GUILD_ID", common::GUILD_ID)
        .env("EMOJIS_DIR", dir.path())
        .env("DISCORD_API_BASE", server.api_base());
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["create"], 1);
    assert_eq!(report["summary"]["remove"], 1);
    assert_eq!(report["summary"]["update"], 1);
    assert!(report["applied"].is_null());
    assert!(server.calls().iter().all(|c| c.starts_with("GET ")), "dry run must not mutate");
}

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use emoji_sync::cli::{run, Cli, Commands};

    let dir = tempdir().unwrap();
    write_pngs(dir.path(), &["wave"]);
    let config = NamedTempFile::new().unwrap();
    write(config.path(), format!("emojis_dir: {:?}\n", dir.path())).unwrap();

    let cli = Cli {
        config: Some(config.path().to_path_buf()),
        strict_close: false,
        command: Commands::Check,
    };

    run(cli).await.expect("check should pass");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
