//! End-to-end reads against a store fed by a scripted watch.

mod common;

use std::sync::Arc;

use anyhow::{Result, ensure};
use common::{Fetch, ScriptedSource, config_map, push, wait_for_revision};
use konfig::{
    EMPTY, FieldTag, Konfig, KonfigOptions, MemoryEnv, NOT_FOUND, PumpState, Value, WatchEvent,
};
use rstest::rstest;
use serde::Deserialize;
use serial_test::serial;
use test_helpers::env;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct LogConfig {
    log_level: i64,
    also_to_stderr: bool,
}

fn options() -> KonfigOptions {
    KonfigOptions::new(common::NAME, common::NAMESPACE)
}

#[rstest]
#[tokio::test]
async fn integer_field_reads_as_number_and_bool() -> Result<()> {
    let (source, _tx) = ScriptedSource::new(Fetch::Found(config_map("4", &[("a", "5")])));
    let konfig = Konfig::builder(options())
        .watch(source.as_ref(), CancellationToken::new())
        .await?;
    ensure!(konfig.get_int64(&["a"]) == (5, 4), "int64: {:?}", konfig.get_int64(&["a"]));
    ensure!(konfig.get_bool(&["a"]) == (true, 4), "bool: {:?}", konfig.get_bool(&["a"]));
    ensure!(konfig.pump_state() == PumpState::Running, "pump should be running");
    ensure!(source.watched_since().as_deref() == Some("4"), "watch should start after the fetch");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn structured_field_decodes_into_a_registered_view() -> Result<()> {
    let object = config_map("9", &[("cfg", "---\nlogLevel: 2\nalsoToStderr: true\n")]);
    let (source, _tx) = ScriptedSource::new(Fetch::Found(object));
    let konfig = Konfig::builder(options())
        .watch(source.as_ref(), CancellationToken::new())
        .await?;
    let (view, revision) = konfig.register::<LogConfig>(FieldTag::CamelCase, &["cfg"]);
    ensure!(revision == 9, "revision {revision}");
    ensure!(
        *view
            == LogConfig {
                log_level: 2,
                also_to_stderr: true
            },
        "view {view:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn missing_resource_starts_empty_then_follows_adds() -> Result<()> {
    let (source, tx) = ScriptedSource::new(Fetch::Missing);
    let konfig = Konfig::builder(options())
        .watch(source.as_ref(), CancellationToken::new())
        .await?;
    ensure!(konfig.revision() == EMPTY, "revision {}", konfig.revision());
    ensure!(konfig.get(&["x"]) == (Value::Null, NOT_FOUND), "x should be absent");
    ensure!(konfig.get(&[]).1 == NOT_FOUND, "an empty store hides its root");
    ensure!(source.watched_since().as_deref() == Some(""), "watch should start from scratch");

    push(&tx, WatchEvent::added(config_map("2", &[("x", "1")])))?;
    wait_for_revision(&konfig, 2).await?;
    ensure!(konfig.get(&["x"]) == (Value::from("1"), 2), "got {:?}", konfig.get(&["x"]));
    ensure!(konfig.get_string(&["x"]) == ("1".to_owned(), 2), "string read");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn env_mirror_follows_mount_and_unmount() -> Result<()> {
    let (source, tx) = ScriptedSource::new(Fetch::Missing);
    let sink = Arc::new(MemoryEnv::new());
    let konfig = Konfig::builder(options())
        .env_sink(sink.clone())
        .watch(source.as_ref(), CancellationToken::new())
        .await?;
    konfig.mount_env(&["cfg"]);

    push(&tx, WatchEvent::added(config_map("2", &[("cfg", "---\nLEVEL: '3'\n")])))?;
    wait_for_revision(&konfig, 2).await?;
    ensure!(sink.get("LEVEL").as_deref() == Some("3"), "LEVEL {:?}", sink.get("LEVEL"));

    konfig.unmount_env();
    push(&tx, WatchEvent::modified(config_map("3", &[("cfg", "---\nLEVEL: '4'\n")])))?;
    wait_for_revision(&konfig, 3).await?;
    ensure!(sink.get("LEVEL").as_deref() == Some("3"), "LEVEL changed after unmount");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn mount_exports_the_current_snapshot_immediately() -> Result<()> {
    let object = config_map("5", &[("cfg", "---\nNAME: api\nPORT: 8080\n")]);
    let (source, _tx) = ScriptedSource::new(Fetch::Found(object));
    let sink = Arc::new(MemoryEnv::new());
    let konfig = Konfig::builder(options())
        .env_sink(sink.clone())
        .watch(source.as_ref(), CancellationToken::new())
        .await?;
    konfig.mount_env(&["cfg"]);
    ensure!(sink.get("NAME").as_deref() == Some("api"), "NAME {:?}", sink.get("NAME"));
    ensure!(sink.get("PORT").as_deref() == Some("8080"), "PORT {:?}", sink.get("PORT"));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn env_mount_option_mounts_at_construction() -> Result<()> {
    let object = config_map("5", &[("cfg", "---\nNAME: api\n")]);
    let (source, _tx) = ScriptedSource::new(Fetch::Found(object));
    let sink = Arc::new(MemoryEnv::new());
    let _konfig = Konfig::builder(options().with_env_mount("cfg"))
        .env_sink(sink.clone())
        .watch(source.as_ref(), CancellationToken::new())
        .await?;
    ensure!(sink.get("NAME").as_deref() == Some("api"), "NAME {:?}", sink.get("NAME"));
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn process_env_receives_mounted_fields() -> Result<()> {
    let key = "KONFIG_SCENARIO_LEVEL";
    let lock = env::lock();
    let _restore = lock.remove_var(key);

    let (source, tx) = ScriptedSource::new(Fetch::Missing);
    let konfig = Konfig::builder(options())
        .watch(source.as_ref(), CancellationToken::new())
        .await?;
    konfig.mount_env(&["cfg"]);
    let update = format!("---\n{key}: '3'\n");
    push(&tx, WatchEvent::added(config_map("2", &[("cfg", update.as_str())])))?;
    wait_for_revision(&konfig, 2).await?;
    ensure!(env::var(key).as_deref() == Some("3"), "{key} = {:?}", env::var(key));

    konfig.unmount_env();
    let later = format!("---\n{key}: '4'\n");
    push(&tx, WatchEvent::modified(config_map("3", &[("cfg", later.as_str())])))?;
    wait_for_revision(&konfig, 3).await?;
    ensure!(env::var(key).as_deref() == Some("3"), "{key} changed after unmount");
    Ok(())
}
