use std::sync::mpsc::{Receiver, TryRecvError};

use serde::{Deserialize, Serialize};

use crate::{Command, ControlLoop, HostError, Notification, Result};

/// Snapshot of the four remote buttons for a single input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonState {
    pub plus: bool,
    pub minus: bool,
    pub btn1: bool,
    pub btn2: bool,
}

/// A single `button` event from a remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub device: String,
    pub buttons: ButtonState,
}

/// One line of remote traffic: either raw buttons or a direct command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RemoteMessage {
    Button(ButtonEvent),
    Command(Command),
}

/// Control action derived from a button snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    Restart,
    Pause,
    Resume,
    /// Lengthen the tick, slowing the plugin down.
    Slower,
    /// Shorten the tick, speeding the plugin up.
    Faster,
}

/// Anything that produces button events for the host.
pub trait RemoteSource {
    /// Drains the events that arrived since the last call without blocking.
    fn poll(&mut self) -> Vec<ButtonEvent>;
}

/// Maps button combinations onto control-loop commands and tick changes.
#[derive(Debug, Clone)]
pub struct RemoteInputAdapter {
    step_ms: u64,
}

impl RemoteInputAdapter {
    pub fn new(step_ms: u64) -> Self {
        Self { step_ms }
    }

    pub fn step_ms(&self) -> u64 {
        self.step_ms
    }

    /// Actions for `buttons`, in the order they are applied.
    ///
    /// `plus` and `minus` together mean restart and do not also change the
    /// tick. `btn1` and `btn2` fire in addition to whatever else is held.
    pub fn actions(&self, buttons: ButtonState) -> Vec<RemoteAction> {
        let mut actions = Vec::new();
        let combo = buttons.plus && buttons.minus;
        if combo {
            actions.push(RemoteAction::Restart);
        }
        if buttons.btn1 {
            actions.push(RemoteAction::Pause);
        }
        if buttons.btn2 {
            actions.push(RemoteAction::Resume);
        }
        if !combo && buttons.minus {
            actions.push(RemoteAction::Slower);
        }
        if !combo && buttons.plus {
            actions.push(RemoteAction::Faster);
        }
        actions
    }

    /// Applies the actions for `buttons`, then re-emits the raw input.
    ///
    /// The `input` notification is emitted even when an action failed; the
    /// first failure is returned afterwards.
    pub fn handle(&self, control: &mut ControlLoop, device: &str, buttons: ButtonState) -> Result<()> {
        let mut first_error: Option<HostError> = None;

        for action in self.actions(buttons) {
            tracing::debug!(device, ?action, "remote action");
            let outcome = match action {
                RemoteAction::Restart => control.restart(),
                RemoteAction::Pause => {
                    control.pause();
                    Ok(())
                }
                RemoteAction::Resume => {
                    control.resume();
                    Ok(())
                }
                RemoteAction::Slower => {
                    control.slow_down(self.step_ms);
                    Ok(())
                }
                RemoteAction::Faster => {
                    control.speed_up(self.step_ms);
                    Ok(())
                }
            };
            if let Err(err) = outcome {
                first_error.get_or_insert(err);
            }
        }

        control.bus().emit(Notification::Input {
            device: device.to_string(),
            buttons,
        });

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Remote fed through a standard channel, e.g. from a reader thread.
#[derive(Debug)]
pub struct ChannelRemote {
    receiver: Receiver<ButtonEvent>,
    disconnected: bool,
}

impl ChannelRemote {
    pub fn new(receiver: Receiver<ButtonEvent>) -> Self {
        Self {
            receiver,
            disconnected: false,
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl RemoteSource for ChannelRemote {
    fn poll(&mut self) -> Vec<ButtonEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        tracing::info!("remote source disconnected");
                    }
                    self.disconnected = true;
                    break;
                }
            }
        }
        events
    }
}
