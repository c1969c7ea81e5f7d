use std::process::{Child, Command, Stdio};

use log::{info, warn};

use crate::{config::SessionConfig, metadata::PlaybackStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Inhibiting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionAction {
    StartInhibit,
    StopInhibit,
    SwitchWorkspace,
}

/// Tracks playback transitions. Holds no processes, only decides.
#[derive(Debug, Default)]
pub struct SessionController {
    state: SessionState,
}

impl SessionController {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn observe(&mut self, status: PlaybackStatus) -> Vec<SessionAction> {
        let playing = status == PlaybackStatus::Playing;
        match (self.state, playing) {
            (SessionState::Idle, true) => {
                self.state = SessionState::Inhibiting;
                vec![SessionAction::StartInhibit, SessionAction::SwitchWorkspace]
            }
            (SessionState::Inhibiting, false) => {
                self.state = SessionState::Idle;
                vec![SessionAction::StopInhibit]
            }
            _ => Vec::new(),
        }
    }
}

/// Runs the commands the controller asks for.
#[derive(Debug, Default)]
pub struct SessionRunner {
    controller: SessionController,
    config: SessionConfig,
    inhibitor: Option<Child>,
}

impl SessionRunner {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            controller: SessionController::default(),
            config,
            inhibitor: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    pub fn set_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    pub fn observe(&mut self, status: PlaybackStatus) {
        for action in self.controller.observe(status) {
            self.perform(action);
        }
    }

    fn perform(&mut self, action: SessionAction) {
        match action {
            SessionAction::StartInhibit => {
                if self.inhibitor.is_some() {
                    return;
                }
                if let Some(child) = spawn(&self.config.inhibit_command) {
                    info!("Inhibiting sleep while playing");
                    self.inhibitor = Some(child);
                }
            }
            SessionAction::StopInhibit => self.stop_inhibitor(),
            SessionAction::SwitchWorkspace => {
                if let Some(mut child) = spawn(&self.config.workspace_command) {
                    // Short-lived; reap it so it does not linger as a zombie.
                    if let Err(err) = child.wait() {
                        warn!("Workspace command failed: {err}");
                    }
                }
            }
        }
    }

    fn stop_inhibitor(&mut self) {
        if let Some(mut child) = self.inhibitor.take() {
            info!("Releasing sleep inhibitor");
            if let Err(err) = child.kill() {
                warn!("Failed to stop inhibitor: {err}");
            }
            let _ = child.wait();
        }
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        self.stop_inhibitor();
    }
}

fn spawn(command: &[String]) -> Option<Child> {
    let (program, args) = command.split_first()?;
    match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => Some(child),
        Err(err) => {
            warn!("Failed to run {program}: {err}");
            None
        }
    }
}
