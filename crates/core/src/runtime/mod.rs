//! Wires the buses, the control loop, the render loop and remote input into a
//! single host driven by one clock.

use std::fmt;

use crate::{
    relay, Broadcast, ButtonState, Command, ControlLoop, EventBus, HostConfig, LoopState,
    PluginBus, PluginLoader, RemoteInputAdapter, RemoteMessage, RemoteSource, RenderLoop, Result,
    Scheduler, SharedDisplay, TickInterval, TimerKind, PLUGIN_EVENTS,
};

/// The running host. Everything executes on the thread that owns it, one
/// callback at a time.
pub struct Host {
    bus: EventBus,
    plugin_bus: PluginBus,
    display: SharedDisplay,
    control: ControlLoop,
    render: RenderLoop,
    remote: RemoteInputAdapter,
    scheduler: Scheduler,
}

impl Host {
    /// Validates `config`, connects the display, installs the plugin relay and
    /// arms both timers. Launches `config.autostart` when set.
    ///
    /// Fails before anything runs when the display endpoint is missing or the
    /// display refuses to connect.
    pub fn init(
        config: &HostConfig,
        display: SharedDisplay,
        loader: impl PluginLoader + 'static,
        broadcast: impl Broadcast + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let endpoint = config.endpoint()?;
        display.borrow_mut().connect(endpoint)?;

        let bus = EventBus::new();
        let plugin_bus = PluginBus::new();
        let relay_target = plugin_bus.clone();
        bus.subscribe(move |event| {
            relay(event, &PLUGIN_EVENTS, &relay_target);
        });

        let control = ControlLoop::new(
            TickInterval::new(config.tick_ms, config.min_tick_ms),
            config.idle_poll_ms,
            bus.clone(),
            plugin_bus.clone(),
            display.clone(),
            Box::new(loader),
            Box::new(broadcast),
        );

        let mut scheduler = Scheduler::new();
        scheduler.schedule(TimerKind::Update, 0);
        scheduler.schedule(TimerKind::Render, 0);

        let mut host = Self {
            bus,
            plugin_bus,
            display,
            control,
            render: RenderLoop::new(config.render_ms),
            remote: RemoteInputAdapter::new(config.tick_step_ms),
            scheduler,
        };
        tracing::info!(
            endpoint,
            tick_ms = config.tick_ms,
            render_ms = config.render_ms,
            "host initialised"
        );

        if let Some(name) = config.autostart.as_deref() {
            host.launch(name);
        }
        Ok(host)
    }

    /// Starts `name` directly, bypassing the command queue. Failures are
    /// logged, not returned.
    pub fn launch(&mut self, name: &str) {
        tracing::info!(plugin = name, "launching plugin");
        if let Err(err) = self.control.start(Some(name)) {
            tracing::error!(plugin = name, %err, "plugin launch failed");
        }
    }

    /// Publishes a command on the event bus. It takes effect on the next
    /// [`Host::dispatch`].
    pub fn send(&self, command: Command) {
        self.bus.emit(command);
    }

    /// Applies queued commands in order. Stops at the first failing command
    /// and returns its error; later commands stay queued.
    pub fn dispatch(&mut self) -> Result<()> {
        while let Some(command) = self.bus.next_command() {
            self.control.handle(command)?;
        }
        Ok(())
    }

    pub fn handle_input(&mut self, device: &str, buttons: ButtonState) -> Result<()> {
        self.remote.handle(&mut self.control, device, buttons)
    }

    /// Routes a decoded remote line: buttons are applied now, commands are
    /// queued.
    pub fn handle_message(&mut self, message: RemoteMessage) -> Result<()> {
        match message {
            RemoteMessage::Button(event) => self.handle_input(&event.device, event.buttons),
            RemoteMessage::Command(command) => {
                self.send(command);
                Ok(())
            }
        }
    }

    /// Feeds every pending event of `source` through the input adapter.
    /// Failures are logged so one bad press cannot stop the host.
    pub fn poll_remote(&mut self, source: &mut dyn RemoteSource) -> usize {
        let events = source.poll();
        for event in &events {
            if let Err(err) = self.handle_input(&event.device, event.buttons) {
                tracing::error!(device = %event.device, %err, "remote input failed");
            }
        }
        events.len()
    }

    /// Fires every timer due up to `now_ms`, in order.
    pub fn advance_to(&mut self, now_ms: u64) {
        while let Some(kind) = self.scheduler.next_due(now_ms) {
            let delay = match kind {
                TimerKind::Update => self.control.fire(),
                TimerKind::Render => self.render.fire(&self.bus, &self.display),
            };
            self.scheduler.schedule(kind, delay);
        }
        self.scheduler.settle(now_ms);
    }

    pub fn next_deadline(&self) -> u64 {
        self.scheduler
            .next_deadline()
            .unwrap_or_else(|| self.scheduler.now_ms())
    }

    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    pub fn state(&self) -> LoopState {
        self.control.state()
    }

    pub fn tick(&self) -> u64 {
        self.control.tick()
    }

    pub fn active_plugin_id(&self) -> Option<&str> {
        self.control.active_plugin_id()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn plugin_bus(&self) -> &PluginBus {
        &self.plugin_bus
    }

    pub fn control(&self) -> &ControlLoop {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut ControlLoop {
        &mut self.control
    }

    pub fn render(&self) -> &RenderLoop {
        &self.render
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("now_ms", &self.now_ms())
            .field("control", &self.control)
            .field("render", &self.render)
            .finish()
    }
}
