//! The control loop: run state, tick cadence and plugin lifecycle.

use std::{cell::Cell, fmt, rc::Rc};

use serde::Serialize;

use crate::{
    Broadcast, Capabilities, Command, EventBus, Notification, Plugin, PluginBus, PluginLoader,
    Result, SharedDisplay,
};

/// Broadcast channel the active plugin id is announced on.
pub const PLUGIN_CHANNEL: &str = "plugin";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum LoopState {
    #[default]
    Stopped,
    Running,
    /// Updates are gated but the active plugin stays loaded.
    Paused,
}

/// Milliseconds between `update` notifications, shared with capability
/// grants. Values below the floor are ignored.
#[derive(Debug, Clone)]
pub struct TickInterval {
    value: Rc<Cell<u64>>,
    min: u64,
}

impl TickInterval {
    pub fn new(initial: u64, min: u64) -> Self {
        Self {
            value: Rc::new(Cell::new(initial.max(min))),
            min,
        }
    }

    pub fn get(&self) -> u64 {
        self.value.get()
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    /// Stores `ms` when it is at or above the floor and reports whether it did.
    pub fn set(&self, ms: u64) -> bool {
        if ms < self.min {
            return false;
        }
        self.value.set(ms);
        true
    }
}

struct ActivePlugin {
    name: String,
    id: String,
    // Owned for the lifetime of the activation; dropped on stop.
    _plugin: Box<dyn Plugin>,
}

/// Owns the loop state, the tick and the active plugin.
pub struct ControlLoop {
    state: LoopState,
    tick: TickInterval,
    idle_poll_ms: u64,
    bus: EventBus,
    plugin_bus: PluginBus,
    display: SharedDisplay,
    loader: Box<dyn PluginLoader>,
    broadcast: Box<dyn Broadcast>,
    active: Option<ActivePlugin>,
    last_started: Option<String>,
    activation: Rc<Cell<u64>>,
}

impl ControlLoop {
    pub fn new(
        tick: TickInterval,
        idle_poll_ms: u64,
        bus: EventBus,
        plugin_bus: PluginBus,
        display: SharedDisplay,
        loader: Box<dyn PluginLoader>,
        broadcast: Box<dyn Broadcast>,
    ) -> Self {
        Self {
            state: LoopState::Stopped,
            tick,
            idle_poll_ms,
            bus,
            plugin_bus,
            display,
            loader,
            broadcast,
            active: None,
            last_started: None,
            activation: Rc::new(Cell::new(0)),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn tick(&self) -> u64 {
        self.tick.get()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn active_plugin_id(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.id.as_str())
    }

    pub fn active_plugin_name(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.name.as_str())
    }

    /// Name `restart` would launch.
    pub fn last_started(&self) -> Option<&str> {
        self.last_started.as_deref()
    }

    pub fn handle(&mut self, command: Command) -> Result<()> {
        tracing::debug!(command = command.name(), state = ?self.state, "control command");
        match command {
            Command::Start { plugin } => self.start(plugin.as_deref()),
            Command::Stop => {
                self.stop();
                Ok(())
            }
            Command::Restart => self.restart(),
            Command::Pause => {
                self.pause();
                Ok(())
            }
            Command::Resume => {
                self.resume();
                Ok(())
            }
        }
    }

    /// Tears down whatever runs, then loads and initialises a plugin.
    ///
    /// `None` relaunches the last started plugin; with nothing to relaunch
    /// this only performs the teardown. Resolution and initialisation errors
    /// are returned and leave the loop stopped with a cleared display.
    pub fn start(&mut self, name: Option<&str>) -> Result<()> {
        if self.state != LoopState::Stopped {
            self.stop();
        }
        self.display.borrow_mut().clear();

        let Some(name) = name.map(str::to_string).or_else(|| self.last_started.clone()) else {
            tracing::info!("no plugin to start");
            return Ok(());
        };

        let mut plugin = self.loader.load(&name)?;
        self.revoke_grant();
        let grant = Capabilities::new(
            self.display.clone(),
            self.tick.clone(),
            self.plugin_bus.clone(),
            self.activation.clone(),
        );
        if let Err(err) = plugin.init(grant) {
            self.revoke_grant();
            self.plugin_bus.clear();
            self.display.borrow_mut().clear();
            return Err(err);
        }

        let id = plugin.id().to_string();
        self.announce(&id);
        tracing::info!(plugin = %name, id = %id, "plugin started");
        self.active = Some(ActivePlugin {
            name: name.clone(),
            id,
            _plugin: plugin,
        });
        self.last_started = Some(name);
        self.state = LoopState::Running;
        self.bus.emit(Notification::Started);
        Ok(())
    }

    /// Stops the loop and tears down the active plugin. Safe to repeat.
    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
        self.bus.emit(Notification::Stopped);
        self.plugin_bus.clear();
        self.revoke_grant();
        if let Some(active) = self.active.take() {
            tracing::info!(plugin = %active.name, "plugin stopped");
        }
        self.display.borrow_mut().clear();
    }

    pub fn restart(&mut self) -> Result<()> {
        self.stop();
        self.start(None)
    }

    pub fn pause(&mut self) {
        if self.state == LoopState::Running {
            self.state = LoopState::Paused;
            self.bus.emit(Notification::Paused);
        }
    }

    pub fn resume(&mut self) {
        if self.state != LoopState::Running {
            self.state = LoopState::Running;
            self.bus.emit(Notification::Resumed);
        }
    }

    pub fn set_tick(&mut self, ms: u64) -> bool {
        let accepted = self.tick.set(ms);
        if !accepted {
            tracing::debug!(ms, min = self.tick.min(), "ignoring tick below floor");
        }
        accepted
    }

    /// Lengthens the tick by `step_ms`, saturating at `u64::MAX`.
    pub fn slow_down(&mut self, step_ms: u64) -> bool {
        self.set_tick(self.tick.get().saturating_add(step_ms))
    }

    /// Shortens the tick by `step_ms`. Ignored when that would cross the floor.
    pub fn speed_up(&mut self, step_ms: u64) -> bool {
        self.tick
            .get()
            .checked_sub(step_ms)
            .is_some_and(|target| self.set_tick(target))
    }

    /// Update timer firing. Emits `update` while running and returns the delay
    /// until the next firing.
    pub fn fire(&mut self) -> u64 {
        if self.state == LoopState::Running {
            self.bus.emit(Notification::Update);
            self.tick.get()
        } else {
            self.idle_poll_ms
        }
    }

    fn revoke_grant(&self) {
        self.activation.set(self.activation.get() + 1);
    }

    fn announce(&mut self, id: &str) {
        let payload = serde_json::Value::String(id.to_string());
        if let Err(err) = self.broadcast.broadcast(PLUGIN_CHANNEL, &payload) {
            tracing::warn!(%err, id, "could not announce plugin");
        }
    }
}

impl fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlLoop")
            .field("state", &self.state)
            .field("tick", &self.tick.get())
            .field("active", &self.active_plugin_id())
            .finish()
    }
}
