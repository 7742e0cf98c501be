//! Drives the control-surface state machine from the terminal.

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use deduper_core::{update, AppState, AppViewModel, DiscoveredItem, Effect, Msg, Tone};

use crate::effects::{event_to_msg, EffectRunner};
use crate::render::render;

pub struct Session {
    state: AppState,
    shown: AppViewModel,
    runner: EffectRunner,
    event_timeout: Duration,
}

impl Session {
    pub fn new(runner: EffectRunner, event_timeout: Duration) -> Self {
        Self {
            state: AppState::new(),
            shown: AppViewModel::default(),
            runner,
            event_timeout,
        }
    }

    pub fn runner(&self) -> &EffectRunner {
        &self.runner
    }

    pub fn discovered(&self) -> &[DiscoveredItem] {
        self.state.discovered()
    }

    /// Seeds the discovered set from an earlier run without printing anything.
    pub fn restore(&mut self, photos: Vec<DiscoveredItem>) {
        let (mut state, _) = update(std::mem::take(&mut self.state), Msg::DiscoveryFinished(Ok(photos)));
        state.consume_dirty();
        self.shown = state.view();
        self.state = state;
    }

    /// Feeds `msg` in, then pumps engine events until one for which
    /// `finished` holds has been applied.
    pub fn request(&mut self, msg: Msg, finished: impl Fn(&Msg) -> bool) -> Result<AppViewModel> {
        let effects = self.apply(msg);
        let dispatch = self.runner.run(effects);
        if let Some(alert) = dispatch.alerts.into_iter().next() {
            bail!(alert);
        }
        if dispatch.commands == 0 {
            return Err(anyhow!(self.failure_text().unwrap_or("nothing to do").to_string()));
        }

        loop {
            let event = self
                .runner
                .next_event(self.event_timeout)
                .ok_or_else(|| anyhow!("no answer within {:?}", self.event_timeout))?;
            let msg = event_to_msg(event);
            let done = finished(&msg);
            let effects = self.apply(msg);
            self.runner.run(effects);
            if done {
                break;
            }
        }

        if let Some(text) = self.failure_text() {
            bail!(text.to_string());
        }
        Ok(self.state.view())
    }

    fn failure_text(&self) -> Option<&str> {
        self.shown
            .progress
            .as_ref()
            .filter(|line| line.tone == Tone::Error)
            .map(|line| line.text.as_str())
    }

    fn apply(&mut self, msg: Msg) -> Vec<Effect> {
        let (mut state, effects) = update(std::mem::take(&mut self.state), msg);
        if state.consume_dirty() {
            let view = state.view();
            for line in render(&self.shown, &view) {
                println!("{line}");
            }
            self.shown = view;
        }
        self.state = state;
        effects
    }
}
