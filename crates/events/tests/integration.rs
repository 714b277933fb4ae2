//! Integration tests for events

#[cfg(test)]
mod tests {
    use bridge_events::*;
    use bridge_types::InstallStage;

    #[tokio::test]
    async fn test_event_emitter_helpers() {
        let (tx, mut rx) = channel();

        tx.emit_warning("test warning");
        tx.emit_debug("test debug");

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(event1, AppEvent::General(GeneralEvent::Warning { .. })));
        assert_eq!(event1.log_level(), tracing::Level::WARN);

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(event2, AppEvent::General(GeneralEvent::DebugLog { .. })));
        assert_eq!(event2.log_level(), tracing::Level::DEBUG);
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning("ignored");
    }

    #[test]
    fn test_install_failure_serialization() {
        let event = AppEvent::Install(InstallEvent::Failed {
            slug: "widget".into(),
            stage: InstallStage::Swap,
            failure: FailureContext::new(Some("install.copy_failed"), "copy failed", None::<String>, true),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "install");
        assert_eq!(json["event"]["stage"], "swap");
        assert_eq!(json["event"]["failure"]["code"], "install.copy_failed");
        assert_eq!(event.log_target(), "bridge::events::install");
    }
}
