use crate::view_model::Tone;
use crate::{AppState, Effect, Msg, PHOTOS_HOST};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Opened => vec![Effect::CheckConnection],
        Msg::ConnectionChecked(status) => {
            state.set_connection(status);
            Vec::new()
        }
        Msg::DiscoverClicked { tab_url } => {
            if state.is_discovering() {
                return (state, Vec::new());
            }
            match tab_url {
                None => {
                    state.set_progress(Tone::Error, "Error: No active tab found");
                    Vec::new()
                }
                Some(url) if !url.contains(PHOTOS_HOST) => vec![Effect::Alert(format!(
                    "Please navigate to {PHOTOS_HOST} first!"
                ))],
                Some(_) => {
                    state.set_discovering(true);
                    state.set_progress(Tone::Info, "Starting photo discovery...");
                    vec![Effect::StartDiscovery]
                }
            }
        }
        Msg::DiscoveryProgress {
            photos_discovered,
            current_batch,
        } => {
            // Late progress after the result is dropped, the result text wins.
            if state.is_discovering() {
                state.set_progress(
                    Tone::Info,
                    format!(
                        "Discovering photos... Found {photos_discovered} photos (Batch {current_batch})"
                    ),
                );
            }
            Vec::new()
        }
        Msg::DiscoveryFinished(result) => {
            state.set_discovering(false);
            match result {
                Ok(items) => {
                    let total = items.len();
                    state.set_discovered(items);
                    state.set_progress(Tone::Success, format!("Discovered {total} photos!"));
                }
                Err(error) => state.set_progress(Tone::Error, format!("Error: {error}")),
            }
            Vec::new()
        }
        Msg::SendClicked => {
            if state.is_sending() || state.photos_sent() {
                return (state, Vec::new());
            }
            if state.discovered().is_empty() {
                return (
                    state,
                    vec![Effect::Alert("Please discover photos first!".to_string())],
                );
            }
            state.set_sending(true);
            state.set_progress(Tone::Info, "Sending photos to backend...");
            vec![Effect::UploadPhotos {
                photos: state.discovered().to_vec(),
            }]
        }
        Msg::UploadProgress {
            batches_sent,
            total_batches,
            percent,
        } => {
            if state.is_sending() {
                state.set_progress(
                    Tone::Info,
                    format!("Sent batch {batches_sent}/{total_batches} ({percent:.0}%)"),
                );
            }
            Vec::new()
        }
        Msg::UploadFinished(result) => {
            state.set_sending(false);
            match result {
                Ok(count) => {
                    state.mark_sent();
                    state.set_progress(
                        Tone::Success,
                        format!("Sent all {count} photos to backend!"),
                    );
                }
                Err(error) => {
                    state.set_progress(Tone::Error, format!("Error sending photos: {error}"))
                }
            }
            Vec::new()
        }
        Msg::AnalyzeClicked => {
            if state.is_analyzing() || state.view().task_id.is_some() {
                return (state, Vec::new());
            }
            if !state.photos_sent() {
                return (
                    state,
                    vec![Effect::Alert(
                        "Please send photos to backend first!".to_string(),
                    )],
                );
            }
            state.set_analyzing(true);
            state.set_progress(Tone::Info, "Starting duplicate analysis...");
            vec![Effect::StartAnalysis]
        }
        Msg::AnalysisStarted(result) => {
            state.set_analyzing(false);
            match result {
                Ok(task_id) => {
                    state.set_progress(
                        Tone::Success,
                        format!("Analysis started! Task ID: {task_id}"),
                    );
                    state.set_task_id(task_id);
                    vec![Effect::OpenApp]
                }
                Err(error) => {
                    state.set_progress(Tone::Error, format!("Error starting analysis: {error}"));
                    Vec::new()
                }
            }
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
