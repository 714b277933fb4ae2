//! Integration tests for ops crate

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bridge_config::{Config, ConfigStore};
    use bridge_errors::{Error, SyncError};
    use bridge_events::{channel, AppEvent, EventReceiver, SyncEvent};
    use bridge_ops::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::io::Write;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};
    use tokio::sync::Notify;

    const STATUS_PATH: &str = "/wp-json/fp-git-updater/v1/master-updates-status";
    const SECRET: &str = "shared-s3cret";

    fn package_zip(slug: &str) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let opts = zip::write::SimpleFileOptions::default();
        zip.start_file(format!("{slug}-main/{slug}.php"), opts).unwrap();
        zip.write_all(format!("<?php\n/* Plugin Name: {slug} */\n").as_bytes())
            .unwrap();
        zip.finish().unwrap().into_inner()
    }

    struct Harness {
        temp: TempDir,
        ctx: OpsCtx,
        rx: EventReceiver,
    }

    impl Harness {
        fn slot(&self, slug: &str) -> std::path::PathBuf {
            self.temp.path().join("plugins").join(slug)
        }

        fn events(&mut self) -> Vec<AppEvent> {
            let mut out = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                out.push(event);
            }
            out
        }
    }

    fn harness(authority_url: Option<&str>, updater: Option<Arc<dyn ExternalUpdater>>) -> Harness {
        let temp = tempdir().unwrap();
        let mut config = Config::default();
        if let Some(url) = authority_url {
            config.authority.url = url.to_string();
            config.authority.secret = SECRET.to_string();
        }
        config.paths.install_root = Some(temp.path().join("plugins"));
        config.paths.scratch_dir = Some(temp.path().join("upgrade"));

        let (tx, rx) = channel();
        let mut builder = OpsContextBuilder::new()
            .with_config(ConfigStore::in_memory(config))
            .with_event_sender(tx);
        if let Some(updater) = updater {
            builder = builder.with_updater(updater);
        }
        Harness {
            temp,
            ctx: builder.build().unwrap(),
            rx,
        }
    }

    async fn serve_status(server: &MockServer, body: serde_json::Value) -> httpmock::Mock<'_> {
        server
            .mock_async(move |when, then| {
                when.method(GET)
                    .path(STATUS_PATH)
                    .header(CLIENT_SECRET_HEADER, SECRET);
                then.status(200).json_body(body);
            })
            .await
    }

    fn is_empty_dir(path: &Path) -> bool {
        std::fs::read_dir(path).map_or(true, |mut rd| rd.next().is_none())
    }

    #[tokio::test]
    async fn test_sync_installs_each_package_and_keeps_going() {
        let server = MockServer::start_async().await;
        let zip = package_zip("alpha");
        server
            .mock_async(move |when, then| {
                when.method(GET).path("/alpha.zip");
                then.status(200).body(zip);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gamma.zip");
                then.status(404);
            })
            .await;
        let status = serve_status(
            &server,
            json!({
                "updates_available": true,
                "pending_count": 3,
                "plugins": [
                    {"slug": "alpha", "zip_url": server.url("/alpha.zip")},
                    {"slug": "beta"},
                    {"slug": "gamma", "zip_url": server.url("/gamma.zip")}
                ]
            }),
        )
        .await;

        let mut h = harness(Some(&server.base_url()), None);
        let result = sync(&h.ctx, false).await.unwrap();

        status.assert_async().await;
        assert!(result.updates_available);
        assert_eq!(result.pending_count, 3);
        assert_eq!(result.packages.len(), 3);
        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.outcomes.get("alpha"), Some("ok"));
        assert_ne!(result.outcomes.get("gamma"), Some("ok"));
        assert_eq!(result.outcomes.get("beta"), None);
        assert!(!result.delegated);

        assert!(h.slot("alpha").join("alpha.php").is_file());
        assert!(!h.slot("gamma").exists());
        assert!(is_empty_dir(&h.temp.path().join("upgrade")));

        let events = h.events();
        assert!(events.iter().any(|e| matches!(
            e,
            AppEvent::Sync(SyncEvent::PackageSkipped { key }) if key == "beta"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            AppEvent::Sync(SyncEvent::Completed {
                installed: 1,
                failed: 1,
                updated: None
            })
        )));
    }

    #[tokio::test]
    async fn test_no_updates_reports_zero_pending() {
        let server = MockServer::start_async().await;
        serve_status(
            &server,
            json!({"updates_available": false, "pending_count": 4, "plugins": [{"slug": "x", "zip_url": "https://x/x.zip"}]}),
        )
        .await;

        let h = harness(Some(&server.base_url()), None);
        let result = sync(&h.ctx, false).await.unwrap();

        assert!(!result.updates_available);
        assert_eq!(result.pending_count, 0);
        assert!(result.outcomes.is_empty());
        assert!(!h.slot("x").exists());
    }

    #[tokio::test]
    async fn test_check_only_installs_nothing() {
        let server = MockServer::start_async().await;
        let zip_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/alpha.zip");
                then.status(200).body(package_zip("alpha"));
            })
            .await;
        serve_status(
            &server,
            json!({"updates_available": true, "pending_count": 1, "plugins": [{"slug": "alpha", "zip_url": server.url("/alpha.zip")}]}),
        )
        .await;

        let h = harness(Some(&server.base_url()), None);
        let result = sync(&h.ctx, true).await.unwrap();

        assert!(result.updates_available);
        assert_eq!(result.pending_count, 1);
        assert!(result.outcomes.is_empty());
        zip_mock.assert_hits_async(0).await;
        assert!(!h.slot("alpha").exists());
    }

    #[tokio::test]
    async fn test_unconfigured_authority_makes_no_request() {
        let h = harness(None, None);

        assert!(matches!(
            sync(&h.ctx, false).await,
            Err(Error::Sync(SyncError::NotConfigured))
        ));
        assert!(matches!(
            trigger(&h.ctx, false).await,
            Err(Error::Sync(SyncError::NotConfigured))
        ));
    }

    #[tokio::test]
    async fn test_non_object_status_is_invalid() {
        let server = MockServer::start_async().await;
        serve_status(&server, json!(["not", "an", "object"])).await;

        let h = harness(Some(&server.base_url()), None);
        assert!(matches!(
            sync(&h.ctx, false).await,
            Err(Error::Sync(SyncError::InvalidResponse { .. }))
        ));

        let report = trigger(&h.ctx, false).await.unwrap();
        assert!(!report.is_success());
        let body = serde_json::to_value(&report).unwrap();
        assert_eq!(body["updates_available"], json!(false));
        assert_eq!(body["installed_by_bridge"], json!({}));
    }

    #[tokio::test]
    async fn test_trigger_runs_bridge_sync() {
        let server = MockServer::start_async().await;
        serve_status(&server, json!({"updates_available": false})).await;

        let h = harness(Some(&server.base_url()), None);
        let report = trigger(&h.ctx, true).await.unwrap();

        let body = serde_json::to_value(&report).unwrap();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["check_only"], json!(true));
        assert_eq!(body["message"], json!("Check completed."));
    }

    #[derive(Default)]
    struct FakeUpdater {
        pending: std::sync::Mutex<Vec<PendingUpdate>>,
        checks: AtomicUsize,
        runs: AtomicUsize,
        entered: Notify,
        gate: Option<Notify>,
        incomplete: bool,
    }

    impl FakeUpdater {
        fn with_pending(ids: &[&str]) -> Self {
            let pending = ids
                .iter()
                .map(|id| PendingUpdate {
                    id: (*id).to_string(),
                    name: id.to_uppercase(),
                    current_version: "1.0.0".into(),
                    available_version: "1.1.0".into(),
                })
                .collect();
            Self {
                pending: std::sync::Mutex::new(pending),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ExternalUpdater for FakeUpdater {
        async fn pending_updates(&self) -> Result<Vec<PendingUpdate>, Error> {
            Ok(self.pending.lock().unwrap().clone())
        }

        async fn check_for_updates(&self) -> Result<(), Error> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(())
        }

        async fn run_update(&self) -> Result<bool, Error> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.incomplete {
                return Ok(false);
            }
            self.pending.lock().unwrap().clear();
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_trigger_check_only_delegates_to_updater() {
        let updater = Arc::new(FakeUpdater::with_pending(&["a", "b"]));
        let h = harness(None, Some(updater.clone()));

        let report = trigger(&h.ctx, true).await.unwrap();
        let body = serde_json::to_value(&report).unwrap();

        assert_eq!(body["success"], json!(true));
        assert_eq!(body["pending_updates"], json!(2));
        assert_eq!(body["pending_plugins"][0]["available_version"], json!("1.1.0"));
        assert_eq!(updater.checks.load(Ordering::SeqCst), 1);
        assert_eq!(updater.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_trigger_update_delegates_to_updater() {
        let updater = Arc::new(FakeUpdater::with_pending(&["a"]));
        let h = harness(None, Some(updater.clone()));

        let report = trigger(&h.ctx, false).await.unwrap();
        let body = serde_json::to_value(&report).unwrap();

        assert_eq!(body["updated"], json!(true));
        assert_eq!(body["pending_before"], json!(1));
        assert_eq!(body["pending_after"], json!(0));
        assert_eq!(updater.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sync_with_updater_skips_install_transactions() {
        let server = MockServer::start_async().await;
        let zip_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/alpha.zip");
                then.status(200).body(package_zip("alpha"));
            })
            .await;
        serve_status(
            &server,
            json!({"updates_available": true, "pending_count": 1, "plugins": [{"slug": "alpha", "zip_url": server.url("/alpha.zip")}]}),
        )
        .await;
        let updater = Arc::new(FakeUpdater::with_pending(&["alpha"]));
        let h = harness(Some(&server.base_url()), Some(updater.clone()));

        let result = sync(&h.ctx, false).await.unwrap();

        assert!(result.delegated);
        assert_eq!(result.updated, Some(true));
        assert!(result.outcomes.is_empty());
        assert_eq!(updater.runs.load(Ordering::SeqCst), 1);
        zip_mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_sync_reports_incomplete_external_update() {
        let server = MockServer::start_async().await;
        serve_status(
            &server,
            json!({"updates_available": true, "pending_count": 1, "plugins": [{"slug": "alpha"}]}),
        )
        .await;
        let updater = Arc::new(FakeUpdater {
            incomplete: true,
            ..FakeUpdater::with_pending(&["alpha"])
        });
        let mut h = harness(Some(&server.base_url()), Some(updater.clone()));

        let result = h.ctx.orchestrator.run_sync(true).await.unwrap();

        assert!(result.delegated);
        assert_eq!(result.updated, Some(false));
        assert_eq!(serde_json::to_value(&result).unwrap()["updated"], json!(false));
        let events = h.events();
        let completed = events
            .iter()
            .find(|e| matches!(e, AppEvent::Sync(SyncEvent::Completed { .. })))
            .unwrap();
        assert!(matches!(
            completed,
            AppEvent::Sync(SyncEvent::Completed {
                installed: 0,
                failed: 0,
                updated: Some(false)
            })
        ));
        assert_eq!(completed.log_level(), tracing::Level::WARN);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overlapping_runs_are_rejected() {
        let updater = Arc::new(FakeUpdater {
            gate: Some(Notify::new()),
            ..FakeUpdater::with_pending(&["a"])
        });
        let h = harness(None, Some(updater.clone()));

        let orchestrator = Arc::clone(&h.ctx.orchestrator);
        let first = tokio::spawn(async move { orchestrator.trigger(false).await });
        updater.entered.notified().await;

        assert!(h.ctx.orchestrator.is_running());
        assert!(matches!(
            h.ctx.orchestrator.run_sync(true).await,
            Err(Error::Sync(SyncError::InProgress))
        ));
        assert!(matches!(
            trigger(&h.ctx, true).await,
            Err(Error::Sync(SyncError::InProgress))
        ));

        if let Some(gate) = &updater.gate {
            gate.notify_one();
        }
        let report = first.await.unwrap().unwrap();
        assert!(report.is_success());
        assert!(!h.ctx.orchestrator.is_running());
    }
}
