use deduper_core::{AppViewModel, Tone};

/// Terminal lines describing what changed between two views.
pub fn render(previous: &AppViewModel, view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(status) = view.connection {
        if previous.connection != view.connection {
            lines.push(format!("Backend: {}", status.describe()));
        }
    }
    if let Some(progress) = &view.progress {
        if previous.progress.as_ref() != Some(progress) {
            let marker = match progress.tone {
                Tone::Info => "..",
                Tone::Success => "ok",
                Tone::Error => "!!",
            };
            lines.push(format!("[{marker}] {}", progress.text));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use deduper_core::{ConnectionStatus, ProgressLine};
    use pretty_assertions::assert_eq;

    #[test]
    fn only_changes_are_rendered() {
        let before = AppViewModel::default();
        let after = AppViewModel {
            connection: Some(ConnectionStatus::NotLoggedIn),
            progress: Some(ProgressLine {
                text: "Discovered 3 photos!".to_string(),
                tone: Tone::Success,
            }),
            ..AppViewModel::default()
        };

        assert_eq!(
            render(&before, &after),
            vec![
                "Backend: Not logged in. Please log in to the web app.".to_string(),
                "[ok] Discovered 3 photos!".to_string(),
            ]
        );
        assert!(render(&after, &after).is_empty());
    }
}
