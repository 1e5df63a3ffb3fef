use std::{cell::Cell, fmt, rc::Rc};

use crate::{
    control::TickInterval, palette::PALETTE, Display, Geometry, Notification, NotificationKind,
    Palette, PluginBus, Result, Rgb, SharedDisplay,
};

/// The only surface a plugin gets to touch.
///
/// A grant is minted for every activation and stays valid until the control
/// loop stops that activation or starts another one. After that every call
/// becomes a no-op, so a plugin that kept a clone around cannot keep drawing
/// or subscribing.
#[derive(Clone)]
pub struct Capabilities {
    display: SharedDisplay,
    tick: TickInterval,
    plugin_bus: PluginBus,
    activation: u64,
    current: Rc<Cell<u64>>,
}

impl Capabilities {
    pub(crate) fn new(
        display: SharedDisplay,
        tick: TickInterval,
        plugin_bus: PluginBus,
        current: Rc<Cell<u64>>,
    ) -> Self {
        Self {
            display,
            tick,
            plugin_bus,
            activation: current.get(),
            current,
        }
    }

    /// Whether this grant still belongs to the running activation.
    pub fn is_active(&self) -> bool {
        self.current.get() == self.activation
    }

    fn with_display(&self, op: &'static str, f: impl FnOnce(&mut dyn Display) -> Result<()>) {
        if !self.is_active() {
            tracing::debug!(op, "ignoring call through a revoked grant");
            return;
        }
        let mut display = self.display.borrow_mut();
        if let Err(err) = f(&mut *display) {
            tracing::warn!(op, %err, "plugin drawing call failed");
        }
    }

    pub fn led(&self, index: usize, color: Rgb) {
        self.with_display("led", |display| display.led(index, color));
    }

    pub fn led_xy(&self, x: usize, y: usize, color: Rgb) {
        self.with_display("led_xy", |display| display.led_xy(x, y, color));
    }

    pub fn fill(&self, color: Rgb) {
        self.with_display("fill", |display| {
            display.fill(color);
            Ok(())
        });
    }

    pub fn clear(&self) {
        self.with_display("clear", |display| {
            display.clear();
            Ok(())
        });
    }

    /// Edge length of the square matrix.
    pub fn size(&self) -> usize {
        self.display.borrow().size()
    }

    pub fn colors(&self) -> &'static Palette {
        &PALETTE
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.size())
    }

    /// Requests a new update cadence. Values below the floor are ignored.
    pub fn set_tick(&self, ms: u64) {
        if self.is_active() {
            self.tick.set(ms);
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick.get()
    }

    /// Subscribes to one of the relayed lifecycle notifications.
    pub fn on(&self, kind: NotificationKind, handler: impl FnMut(&Notification) + 'static) {
        if self.is_active() {
            self.plugin_bus.on(kind, handler);
        } else {
            tracing::debug!(kind = kind.as_str(), "dropping subscription from a revoked grant");
        }
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("activation", &self.activation)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::LedMatrix;

    fn grant() -> (Capabilities, Rc<RefCell<LedMatrix>>, Rc<Cell<u64>>, PluginBus) {
        let matrix = Rc::new(RefCell::new(LedMatrix::new(3)));
        let display: SharedDisplay = matrix.clone();
        let current = Rc::new(Cell::new(1));
        let plugin_bus = PluginBus::new();
        let caps = Capabilities::new(
            display,
            TickInterval::new(500, 10),
            plugin_bus.clone(),
            current.clone(),
        );
        (caps, matrix, current, plugin_bus)
    }

    #[test]
    fn draws_through_the_shared_display() {
        let (caps, matrix, _, _) = grant();
        caps.fill(Rgb::BLUE);
        caps.led_xy(2, 1, Rgb::RED);
        caps.led(99, Rgb::GREEN);

        let matrix = matrix.borrow();
        assert_eq!(matrix.pixel_xy(2, 1), Some(Rgb::RED));
        assert_eq!(matrix.pixel(0), Some(Rgb::BLUE));
        assert_eq!(caps.size(), 3);
        assert_eq!(caps.geometry().pixel_count(), 9);
    }

    #[test]
    fn tick_setter_honours_floor() {
        let (caps, _, _, _) = grant();
        caps.set_tick(5);
        assert_eq!(caps.tick(), 500);
        caps.set_tick(40);
        assert_eq!(caps.tick(), 40);
    }

    #[test]
    fn revoked_grant_is_inert() {
        let (caps, matrix, current, plugin_bus) = grant();
        current.set(2);

        caps.fill(Rgb::WHITE);
        caps.set_tick(100);
        caps.on(NotificationKind::Update, |_| {});

        assert!(!caps.is_active());
        assert_eq!(matrix.borrow().pixel(0), Some(Rgb::BLACK));
        assert_eq!(caps.tick(), 500);
        assert_eq!(plugin_bus.listener_count(), 0);
    }

    #[test]
    fn palette_is_shared() {
        let (caps, _, _, _) = grant();
        assert!(std::ptr::eq(caps.colors(), &PALETTE));
        assert_eq!(caps.colors().get("red"), Some(Rgb::RED));
    }
}
