//! Test doubles shared by the unit tests of several modules.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{
    Broadcast, Capabilities, Display, Event, EventBus, HostError, LedMatrix, Notification,
    NotificationKind, Plugin, PluginLoader, Result, Rgb,
};

/// In-memory display that remembers its endpoint and counts flushes.
pub(crate) struct RecordingDisplay {
    pub(crate) matrix: LedMatrix,
    pub(crate) endpoint: Option<String>,
    pub(crate) draws: usize,
    pub(crate) refuse_connect: bool,
}

impl RecordingDisplay {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            matrix: LedMatrix::new(size),
            endpoint: None,
            draws: 0,
            refuse_connect: false,
        }
    }
}

impl Display for RecordingDisplay {
    fn connect(&mut self, endpoint: &str) -> Result<()> {
        if self.refuse_connect {
            return Err(HostError::Display(format!("{endpoint} refused the connection")));
        }
        self.endpoint = Some(endpoint.to_string());
        Ok(())
    }

    fn size(&self) -> usize {
        self.matrix.size()
    }

    fn led(&mut self, index: usize, color: Rgb) -> Result<()> {
        self.matrix.led(index, color)
    }

    fn fill(&mut self, color: Rgb) {
        self.matrix.fill(color);
    }

    fn clear(&mut self) {
        self.matrix.clear();
    }

    fn draw(&mut self) -> Result<()> {
        self.draws += 1;
        Ok(())
    }
}

/// Records every event published on a bus.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl Recorder {
    pub(crate) fn attach(bus: &EventBus) -> Self {
        let recorder = Self::default();
        let events = recorder.events.clone();
        bus.subscribe(move |event| events.borrow_mut().push(event.clone()));
        recorder
    }

    /// Names of the notifications seen so far, in order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.notifications()
            .iter()
            .map(|notification| notification.name().to_string())
            .collect()
    }

    pub(crate) fn notifications(&self) -> Vec<Notification> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Notification(notification) => Some(notification.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|seen| *seen == name).count()
    }

    pub(crate) fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingBroadcast {
    sent: Rc<RefCell<Vec<(String, serde_json::Value)>>>,
    fail_next: Rc<Cell<bool>>,
}

impl RecordingBroadcast {
    pub(crate) fn sent(&self) -> Vec<(String, serde_json::Value)> {
        self.sent.borrow().clone()
    }

    pub(crate) fn fail_next(&self) {
        self.fail_next.set(true);
    }
}

impl Broadcast for RecordingBroadcast {
    fn broadcast(&mut self, channel: &str, payload: &serde_json::Value) -> Result<()> {
        if self.fail_next.replace(false) {
            return Err(HostError::Broadcast("socket closed".to_string()));
        }
        self.sent
            .borrow_mut()
            .push((channel.to_string(), payload.clone()));
        Ok(())
    }
}

/// Paints pixel 0 green on init and counts updates.
pub(crate) struct DemoPlugin {
    updates: Rc<Cell<usize>>,
}

impl Plugin for DemoPlugin {
    fn id(&self) -> &str {
        "demo-id"
    }

    fn init(&mut self, caps: Capabilities) -> Result<()> {
        caps.led(0, Rgb::GREEN);
        let updates = self.updates.clone();
        caps.on(NotificationKind::Update, move |_| updates.set(updates.get() + 1));
        Ok(())
    }
}

/// Subscribes to every relayed notification and logs what it sees.
pub(crate) struct WatcherPlugin {
    seen: Rc<RefCell<Vec<Notification>>>,
}

impl Plugin for WatcherPlugin {
    fn id(&self) -> &str {
        "watcher-id"
    }

    fn init(&mut self, caps: Capabilities) -> Result<()> {
        let kinds = [
            NotificationKind::Started,
            NotificationKind::Stopped,
            NotificationKind::Paused,
            NotificationKind::Resumed,
            NotificationKind::Update,
            NotificationKind::Draw,
            NotificationKind::Input,
        ];
        for kind in kinds {
            let seen = self.seen.clone();
            caps.on(kind, move |notification| {
                seen.borrow_mut().push(notification.clone())
            });
        }
        Ok(())
    }
}

/// Subscribes, paints and then fails its initialiser.
pub(crate) struct FailingPlugin;

impl FailingPlugin {
    pub(crate) const NAME: &'static str = "failing";
}

impl Plugin for FailingPlugin {
    fn id(&self) -> &str {
        "failing-id"
    }

    fn init(&mut self, caps: Capabilities) -> Result<()> {
        caps.on(NotificationKind::Update, |_| {});
        caps.fill(Rgb::RED);
        Err(HostError::PluginInit {
            id: self.id().to_string(),
            reason: "missing asset".to_string(),
        })
    }
}

/// Asks for the longest tick the grant allows.
pub(crate) struct SluggishPlugin;

impl SluggishPlugin {
    pub(crate) const NAME: &'static str = "sluggish";
}

impl Plugin for SluggishPlugin {
    fn id(&self) -> &str {
        "sluggish-id"
    }

    fn init(&mut self, caps: Capabilities) -> Result<()> {
        caps.set_tick(u64::MAX);
        Ok(())
    }
}

/// Loader serving `demo`, `watcher`, `failing` and `sluggish`.
#[derive(Clone, Default)]
pub(crate) struct ScriptedLoader {
    pub(crate) updates: Rc<Cell<usize>>,
    pub(crate) seen: Rc<RefCell<Vec<Notification>>>,
    /// Makes every later load fail as if the plugin had vanished.
    pub(crate) refuse_loads: Rc<Cell<bool>>,
}

impl ScriptedLoader {
    pub(crate) fn seen_kinds(&self) -> Vec<NotificationKind> {
        self.seen.borrow().iter().map(Notification::kind).collect()
    }
}

impl PluginLoader for ScriptedLoader {
    fn load(&mut self, name: &str) -> Result<Box<dyn Plugin>> {
        if self.refuse_loads.get() {
            return Err(HostError::PluginNotFound(name.to_string()));
        }
        match name {
            "demo" => Ok(Box::new(DemoPlugin {
                updates: self.updates.clone(),
            })),
            "watcher" => Ok(Box::new(WatcherPlugin {
                seen: self.seen.clone(),
            })),
            FailingPlugin::NAME => Ok(Box::new(FailingPlugin)),
            SluggishPlugin::NAME => Ok(Box::new(SluggishPlugin)),
            other => Err(HostError::PluginNotFound(other.to_string())),
        }
    }

    fn names(&self) -> Vec<String> {
        ["demo", "watcher", FailingPlugin::NAME, SluggishPlugin::NAME]
            .into_iter()
            .map(String::from)
            .collect()
    }
}
