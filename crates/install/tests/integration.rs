//! Integration tests for install crate

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bridge_errors::Error;
    use bridge_events::{channel, AppEvent, InstallEvent};
    use bridge_install::*;
    use bridge_net::{NetClient, PackageFetcher, SourceEndpoints};
    use bridge_types::{InstallStage, PackageDescriptor};
    use httpmock::prelude::*;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    const MANIFEST: &str = "<?php\n/*\n * Plugin Name: Widget\n */\n";

    /// Zip with the package wrapped in one branch folder, like a repository snapshot
    fn package_zip(version: &str) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let opts = zip::write::SimpleFileOptions::default();
        zip.add_directory("widget-main/", opts).unwrap();
        zip.start_file("widget-main/widget.php", opts).unwrap();
        zip.write_all(MANIFEST.as_bytes()).unwrap();
        zip.start_file("widget-main/inc/version.txt", opts).unwrap();
        zip.write_all(version.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn layoutless_zip() -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let opts = zip::write::SimpleFileOptions::default();
        zip.start_file("a/b/c/widget.php", opts).unwrap();
        zip.write_all(MANIFEST.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    struct Setup {
        _temp: TempDir,
        paths: InstallPaths,
    }

    fn setup() -> Setup {
        let temp = tempdir().unwrap();
        let paths = InstallPaths {
            install_root: temp.path().join("plugins"),
            scratch_dir: temp.path().join("upgrade"),
        };
        Setup { _temp: temp, paths }
    }

    fn installer(server: &MockServer, paths: &InstallPaths) -> Installer {
        let endpoints = SourceEndpoints {
            api_base: server.base_url(),
            web_base: server.base_url(),
        };
        let fetcher = PackageFetcher::new(NetClient::with_defaults().unwrap(), endpoints);
        Installer::new(fetcher, paths.clone())
    }

    fn entries(dir: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(dir) {
            Ok(rd) => rd.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    async fn serve(server: &MockServer, path: &str, body: Vec<u8>) {
        let path = path.to_string();
        server
            .mock_async(move |when, then| {
                when.method(GET).path(path);
                then.status(200).body(body);
            })
            .await;
    }

    #[tokio::test]
    async fn test_install_and_reinstall_leave_no_scratch() {
        let server = MockServer::start_async().await;
        serve(&server, "/v1.zip", package_zip("1")).await;
        serve(&server, "/v2.zip", package_zip("2")).await;
        let s = setup();
        let installer = installer(&server, &s.paths);

        let d1 = PackageDescriptor::from_archive_url("widget", &server.url("/v1.zip")).unwrap();
        let outcome = installer.install(&d1).await;
        assert!(outcome.is_success(), "{outcome:?}");

        let slot = s.paths.slot("widget");
        assert_eq!(std::fs::read_to_string(slot.join("widget.php")).unwrap(), MANIFEST);
        assert_eq!(std::fs::read_to_string(slot.join("inc/version.txt")).unwrap(), "1");
        assert_eq!(entries(&slot).len(), 2);

        let d2 = PackageDescriptor::from_archive_url("widget", &server.url("/v2.zip")).unwrap();
        assert!(installer.install(&d2).await.is_success());
        assert_eq!(std::fs::read_to_string(slot.join("inc/version.txt")).unwrap(), "2");
        assert_eq!(entries(&slot).len(), 2);

        assert!(entries(&s.paths.scratch_dir).is_empty());
        assert_eq!(entries(&s.paths.install_root), vec![slot]);
    }

    #[tokio::test]
    async fn test_missing_source_has_no_side_effects() {
        let server = MockServer::start_async().await;
        let s = setup();
        let installer = installer(&server, &s.paths);

        let descriptor = PackageDescriptor::from_archive_url("widget", "").unwrap();
        match installer.install(&descriptor).await {
            InstallOutcome::Failure { stage, failure, .. } => {
                assert_eq!(stage, InstallStage::Validate);
                assert_eq!(failure.code.as_deref(), Some("install.missing_source"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!s.paths.scratch_dir.exists());
        assert!(!s.paths.install_root.exists());
    }

    #[tokio::test]
    async fn test_unrecognized_layout_keeps_existing_slot() {
        let server = MockServer::start_async().await;
        serve(&server, "/deep.zip", layoutless_zip()).await;
        let s = setup();
        let slot = s.paths.slot("widget");
        std::fs::create_dir_all(&slot).unwrap();
        std::fs::write(slot.join("widget.php"), "original").unwrap();

        let installer = installer(&server, &s.paths);
        let descriptor = PackageDescriptor::from_archive_url("widget", &server.url("/deep.zip")).unwrap();

        match installer.install(&descriptor).await {
            InstallOutcome::Failure { stage, failure, .. } => {
                assert_eq!(stage, InstallStage::Locate);
                assert_eq!(failure.code.as_deref(), Some("install.unrecognized_layout"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(std::fs::read_to_string(slot.join("widget.php")).unwrap(), "original");
        assert!(entries(&s.paths.scratch_dir).is_empty());
    }

    #[tokio::test]
    async fn test_non_archive_body_fails_extraction() {
        let server = MockServer::start_async().await;
        serve(&server, "/page.zip", b"<html>login required</html>".to_vec()).await;
        let s = setup();
        let installer = installer(&server, &s.paths);

        let descriptor = PackageDescriptor::from_archive_url("widget", &server.url("/page.zip")).unwrap();
        match installer.install(&descriptor).await {
            InstallOutcome::Failure { stage, .. } => assert_eq!(stage, InstallStage::Extract),
            other => panic!("unexpected {other:?}"),
        }
        assert!(entries(&s.paths.scratch_dir).is_empty());
        assert!(!s.paths.slot("widget").exists());
    }

    /// Local filesystem whose swap rename always fails, forcing the copy tier
    struct NoRenameIntoSlot {
        slot: PathBuf,
        copy_fails: bool,
    }

    #[async_trait]
    impl SlotFilesystem for NoRenameIntoSlot {
        async fn rename(&self, from: &Path, to: &Path) -> Result<(), Error> {
            let restoring = from
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with("backup-"));
            if to == self.slot && !restoring {
                return Err(Error::internal("cross-device link"));
            }
            LocalFilesystem.rename(from, to).await
        }

        async fn copy_tree(&self, from: &Path, to: &Path) -> Result<(), Error> {
            if self.copy_fails {
                std::fs::create_dir_all(to).unwrap();
                std::fs::write(to.join("half-written.php"), "partial").unwrap();
                return Err(Error::internal("no space left on device"));
            }
            LocalFilesystem.copy_tree(from, to).await
        }

        async fn remove_tree(&self, path: &Path) -> Result<(), Error> {
            LocalFilesystem.remove_tree(path).await
        }
    }

    #[tokio::test]
    async fn test_copy_fallback_when_rename_fails() {
        let server = MockServer::start_async().await;
        serve(&server, "/v1.zip", package_zip("1")).await;
        let s = setup();
        let (tx, mut rx) = channel();
        let installer = installer(&server, &s.paths)
            .with_filesystem(Arc::new(NoRenameIntoSlot {
                slot: s.paths.slot("widget"),
                copy_fails: false,
            }))
            .with_event_sender(tx);

        let descriptor = PackageDescriptor::from_archive_url("widget", &server.url("/v1.zip")).unwrap();
        assert!(installer.install(&descriptor).await.is_success());
        assert_eq!(
            std::fs::read_to_string(s.paths.slot("widget").join("inc/version.txt")).unwrap(),
            "1"
        );
        assert!(entries(&s.paths.scratch_dir).is_empty());

        let copied = std::iter::from_fn(|| rx.try_recv().ok()).any(|e| {
            matches!(
                e,
                AppEvent::Install(InstallEvent::Swapped { copied: true, .. })
            )
        });
        assert!(copied);
    }

    #[tokio::test]
    async fn test_copy_failure_restores_previous_slot() {
        let server = MockServer::start_async().await;
        serve(&server, "/v2.zip", package_zip("2")).await;
        let s = setup();
        let slot = s.paths.slot("widget");
        std::fs::create_dir_all(slot.join("inc")).unwrap();
        std::fs::write(slot.join("widget.php"), MANIFEST).unwrap();
        std::fs::write(slot.join("inc/version.txt"), [0u8, 159, 146, 150]).unwrap();

        let installer = installer(&server, &s.paths).with_filesystem(Arc::new(NoRenameIntoSlot {
            slot: slot.clone(),
            copy_fails: true,
        }));

        let descriptor = PackageDescriptor::from_archive_url("widget", &server.url("/v2.zip")).unwrap();
        match installer.install(&descriptor).await {
            InstallOutcome::Failure { stage, failure, .. } => {
                assert_eq!(stage, InstallStage::Swap);
                assert_eq!(failure.code.as_deref(), Some("install.copy_failed"));
            }
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(std::fs::read(slot.join("inc/version.txt")).unwrap(), [0u8, 159, 146, 150]);
        assert!(!slot.join("half-written.php").exists());
        assert!(entries(&s.paths.scratch_dir).is_empty());
    }

    #[tokio::test]
    async fn test_same_slug_installs_serialize() {
        let server = MockServer::start_async().await;
        serve(&server, "/v1.zip", package_zip("1")).await;
        let s = setup();
        let installer = installer(&server, &s.paths);

        let a = PackageDescriptor::from_archive_url("widget", &server.url("/v1.zip")).unwrap();
        let b = PackageDescriptor::from_archive_url("widget", &server.url("/v1.zip")).unwrap();
        let (first, second) = tokio::join!(installer.install(&a), installer.install(&b));

        assert!(first.is_success() && second.is_success());
        assert_eq!(entries(&s.paths.slot("widget")).len(), 2);
        assert!(entries(&s.paths.scratch_dir).is_empty());
    }
}
