//! The two publish/subscribe channels of the host.
//!
//! [`EventBus`] carries control commands as well as lifecycle notifications.
//! [`PluginBus`] is the narrow channel plugins listen on; it only ever sees
//! what [`relay`] lets through from the event bus.

use std::{cell::RefCell, collections::VecDeque, fmt, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::ButtonState;

/// Event names re-published to plugins. Everything else stays on the event bus.
pub const PLUGIN_EVENTS: [&str; 7] = [
    "started", "stopped", "resumed", "paused", "update", "draw", "input",
];

/// Control commands understood by the control loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Command {
    /// Load and initialise a plugin. Without a name the last started plugin
    /// is launched again.
    Start {
        #[serde(default)]
        plugin: Option<String>,
    },
    Stop,
    Restart,
    Pause,
    Resume,
}

impl Command {
    pub fn start(plugin: impl Into<String>) -> Self {
        Self::Start {
            plugin: Some(plugin.into()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Pause => "pause",
            Self::Resume => "resume",
        }
    }
}

/// Lifecycle and timing notifications emitted by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Started,
    Stopped,
    Paused,
    Resumed,
    Update,
    Draw,
    Input { device: String, buttons: ButtonState },
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Started => NotificationKind::Started,
            Self::Stopped => NotificationKind::Stopped,
            Self::Paused => NotificationKind::Paused,
            Self::Resumed => NotificationKind::Resumed,
            Self::Update => NotificationKind::Update,
            Self::Draw => NotificationKind::Draw,
            Self::Input { .. } => NotificationKind::Input,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}

/// Discriminant of [`Notification`], used to subscribe on the plugin bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Started,
    Stopped,
    Paused,
    Resumed,
    Update,
    Draw,
    Input,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Paused => "paused",
            Self::Resumed => "resumed",
            Self::Update => "update",
            Self::Draw => "draw",
            Self::Input => "input",
        }
    }
}

/// Anything that travels over the event bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Command(Command),
    Notification(Notification),
    /// Traffic from other subsystems. Never forwarded to plugins.
    Custom {
        name: String,
        payload: serde_json::Value,
    },
}

impl Event {
    pub fn custom(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::Custom {
            name: name.into(),
            payload,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Command(command) => command.name(),
            Self::Notification(notification) => notification.name(),
            Self::Custom { name, .. } => name,
        }
    }
}

impl From<Command> for Event {
    fn from(value: Command) -> Self {
        Self::Command(value)
    }
}

impl From<Notification> for Event {
    fn from(value: Notification) -> Self {
        Self::Notification(value)
    }
}

type Listener = Box<dyn FnMut(&Event)>;

#[derive(Default)]
struct BusInner {
    listeners: Vec<Listener>,
    commands: VecDeque<Command>,
    delivering: bool,
    deferred: VecDeque<Event>,
}

/// System-wide command and notification channel.
///
/// Listeners run synchronously inside [`EventBus::emit`]. Commands are also
/// queued so the host can apply them one at a time from its dispatch step.
/// An event emitted from inside a listener is delivered to every listener
/// once the current event has finished.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl FnMut(&Event) + 'static) {
        self.inner.borrow_mut().listeners.push(Box::new(listener));
    }

    /// Publishes `event` to every listener. Listeners added while the event
    /// is being delivered only see later events.
    pub fn emit(&self, event: impl Into<Event>) {
        let event = event.into();
        {
            let mut inner = self.inner.borrow_mut();
            if let Event::Command(command) = &event {
                inner.commands.push_back(command.clone());
            }
            if inner.delivering {
                inner.deferred.push_back(event);
                return;
            }
            inner.delivering = true;
        }

        let mut next = Some(event);
        while let Some(event) = next {
            tracing::trace!(event = event.name(), "bus event");
            let mut listeners = std::mem::take(&mut self.inner.borrow_mut().listeners);
            for listener in listeners.iter_mut() {
                listener(&event);
            }

            let mut inner = self.inner.borrow_mut();
            listeners.append(&mut inner.listeners);
            inner.listeners = listeners;
            next = inner.deferred.pop_front();
            inner.delivering = next.is_some();
        }
    }

    /// Pops the oldest command that has not been dispatched yet.
    pub fn next_command(&self) -> Option<Command> {
        self.inner.borrow_mut().commands.pop_front()
    }

    pub fn pending_commands(&self) -> usize {
        self.inner.borrow().commands.len()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventBus")
            .field("listeners", &inner.listeners.len())
            .field("pending_commands", &inner.commands.len())
            .finish()
    }
}

type Handler = Box<dyn FnMut(&Notification)>;

#[derive(Default)]
struct PluginBusInner {
    handlers: Vec<(NotificationKind, Handler)>,
    /// Bumped by `clear` so an emit in progress drops what it took out.
    epoch: u64,
}

/// The filtered channel plugins subscribe to through their capability grant.
///
/// Only the control loop clears it; plugins can only add their own handlers.
#[derive(Clone, Default)]
pub struct PluginBus {
    inner: Rc<RefCell<PluginBusInner>>,
}

impl PluginBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(&self, kind: NotificationKind, handler: impl FnMut(&Notification) + 'static) {
        self.inner
            .borrow_mut()
            .handlers
            .push((kind, Box::new(handler)));
    }

    pub(crate) fn emit(&self, notification: &Notification) {
        let kind = notification.kind();
        let (mut handlers, epoch) = {
            let mut inner = self.inner.borrow_mut();
            (std::mem::take(&mut inner.handlers), inner.epoch)
        };

        for (subscribed, handler) in handlers.iter_mut() {
            if *subscribed == kind {
                handler(notification);
            }
        }

        let mut inner = self.inner.borrow_mut();
        if inner.epoch == epoch {
            handlers.append(&mut inner.handlers);
            inner.handlers = handlers;
        }
    }

    /// Drops every handler.
    pub(crate) fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.handlers.clear();
        inner.epoch += 1;
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().handlers.len()
    }
}

impl fmt::Debug for PluginBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Re-publishes `event` on `plugin_bus` when it is a notification whose name
/// is in `allow`. Returns whether it was forwarded.
pub fn relay(event: &Event, allow: &[&str], plugin_bus: &PluginBus) -> bool {
    match event {
        Event::Notification(notification) if allow.contains(&notification.name()) => {
            plugin_bus.emit(notification);
            true
        }
        _ => false,
    }
}
