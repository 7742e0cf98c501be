use deduper_core::{
    update, AppState, ConnectionStatus, DiscoveredItem, Effect, Msg, Tone,
};

fn photos(n: usize) -> Vec<DiscoveredItem> {
    (0..n)
        .map(|i| DiscoveredItem::new(format!("p{i}"), format!("u{i}"), format!("t{i}")))
        .collect()
}

fn on_photos_tab() -> Msg {
    Msg::DiscoverClicked {
        tab_url: Some("https://photos.google.com/".to_string()),
    }
}

#[test]
fn opening_checks_connection() {
    let (mut state, effects) = update(AppState::new(), Msg::Opened);
    assert_eq!(effects, vec![Effect::CheckConnection]);
    let (next, _) = update(state.clone(), Msg::ConnectionChecked(ConnectionStatus::NotLoggedIn));
    assert_eq!(next.view().connection, Some(ConnectionStatus::NotLoggedIn));
    assert!(!state.consume_dirty());
}

#[test]
fn discovery_requires_photos_tab() {
    let (state, effects) = update(
        AppState::new(),
        Msg::DiscoverClicked {
            tab_url: Some("https://example.com".to_string()),
        },
    );
    assert!(matches!(effects.as_slice(), [Effect::Alert(_)]));
    assert!(state.view().discover_enabled);

    let (state, effects) = update(state, Msg::DiscoverClicked { tab_url: None });
    assert!(effects.is_empty());
    assert_eq!(state.view().progress.unwrap().tone, Tone::Error);
}

#[test]
fn full_popup_flow_hands_off_task_id() {
    init_logging();
    let (state, effects) = update(AppState::new(), on_photos_tab());
    assert_eq!(effects, vec![Effect::StartDiscovery]);
    assert!(!state.view().discover_enabled);

    // A second click while busy does nothing.
    let (state, effects) = update(state, on_photos_tab());
    assert!(effects.is_empty());

    let (state, _) = update(
        state,
        Msg::DiscoveryProgress {
            photos_discovered: 12,
            current_batch: 4,
        },
    );
    assert_eq!(
        state.view().progress.unwrap().text,
        "Discovering photos... Found 12 photos (Batch 4)"
    );

    let (state, _) = update(state, Msg::DiscoveryFinished(Ok(photos(3))));
    let view = state.view();
    assert_eq!(view.photos_count, 3);
    assert!(view.send_enabled);
    assert!(!view.analyze_enabled);

    let (state, effects) = update(state, Msg::SendClicked);
    assert_eq!(effects, vec![Effect::UploadPhotos { photos: photos(3) }]);
    assert!(!state.view().send_enabled);

    let (state, _) = update(state, Msg::UploadFinished(Ok(3)));
    assert!(state.view().analyze_enabled);
    assert!(!state.view().send_enabled);

    let (state, effects) = update(state, Msg::AnalyzeClicked);
    assert_eq!(effects, vec![Effect::StartAnalysis]);

    let (state, effects) = update(state, Msg::AnalysisStarted(Ok("task-1".to_string())));
    assert_eq!(effects, vec![Effect::OpenApp]);
    assert_eq!(state.view().task_id.as_deref(), Some("task-1"));
    assert!(!state.view().analyze_enabled);
}

#[test]
fn failures_reenable_for_manual_retry() {
    let (state, _) = update(AppState::new(), on_photos_tab());
    let (state, _) = update(state, Msg::DiscoveryFinished(Err("Not on Google Photos page".into())));
    let view = state.view();
    assert!(view.discover_enabled);
    assert_eq!(view.progress.unwrap().text, "Error: Not on Google Photos page");

    let (state, _) = update(state, on_photos_tab());
    let (state, _) = update(state, Msg::DiscoveryFinished(Ok(photos(1))));
    let (state, _) = update(state, Msg::SendClicked);
    let (state, _) = update(state, Msg::UploadFinished(Err("Failed to send batch 1".into())));
    assert!(state.view().send_enabled);
    assert!(!state.view().analyze_enabled);
}

#[test]
fn send_and_analyze_are_gated() {
    let (state, effects) = update(AppState::new(), Msg::SendClicked);
    assert_eq!(
        effects,
        vec![Effect::Alert("Please discover photos first!".to_string())]
    );
    let (_, effects) = update(state, Msg::AnalyzeClicked);
    assert_eq!(
        effects,
        vec![Effect::Alert("Please send photos to backend first!".to_string())]
    );
}

fn init_logging() {
    deduper_logging::initialize_for_tests();
}
