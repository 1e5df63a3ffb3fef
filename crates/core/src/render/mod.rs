use crate::{EventBus, Notification, SharedDisplay};

/// Fixed-cadence redraw that runs whatever state the control loop is in.
///
/// Every firing emits `draw` so plugins can paint, then flushes the display
/// buffer. Flush failures are logged and the loop carries on.
#[derive(Debug)]
pub struct RenderLoop {
    interval_ms: u64,
    frames: u64,
    failed_flushes: u64,
}

impl RenderLoop {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            frames: 0,
            failed_flushes: 0,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn failed_flushes(&self) -> u64 {
        self.failed_flushes
    }

    /// Render timer firing. Returns the delay until the next one.
    pub fn fire(&mut self, bus: &EventBus, display: &SharedDisplay) -> u64 {
        bus.emit(Notification::Draw);
        let flushed = display.borrow_mut().draw();
        self.frames += 1;
        if let Err(err) = flushed {
            self.failed_flushes += 1;
            tracing::warn!(%err, frame = self.frames, "display flush failed");
        }
        self.interval_ms
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{testing::Recorder, Display, HostError, Result, Rgb};

    #[derive(Default)]
    struct FlakyDisplay {
        draws: usize,
        fail: bool,
    }

    impl Display for FlakyDisplay {
        fn connect(&mut self, _endpoint: &str) -> Result<()> {
            Ok(())
        }

        fn size(&self) -> usize {
            1
        }

        fn led(&mut self, _index: usize, _color: Rgb) -> Result<()> {
            Ok(())
        }

        fn fill(&mut self, _color: Rgb) {}

        fn clear(&mut self) {}

        fn draw(&mut self) -> Result<()> {
            self.draws += 1;
            if self.fail {
                return Err(HostError::Display("cable unplugged".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn emits_draw_then_flushes() {
        let bus = EventBus::new();
        let events = Recorder::attach(&bus);
        let flaky = Rc::new(RefCell::new(FlakyDisplay::default()));
        let display: SharedDisplay = flaky.clone();
        let mut render = RenderLoop::new(100);

        assert_eq!(render.fire(&bus, &display), 100);
        assert_eq!(render.fire(&bus, &display), 100);

        assert_eq!(events.names(), vec!["draw", "draw"]);
        assert_eq!(flaky.borrow().draws, 2);
        assert_eq!(render.frames(), 2);
    }

    #[test]
    fn flush_failures_do_not_stop_the_loop() {
        let bus = EventBus::new();
        let flaky = Rc::new(RefCell::new(FlakyDisplay {
            fail: true,
            ..FlakyDisplay::default()
        }));
        let display: SharedDisplay = flaky.clone();
        let mut render = RenderLoop::new(50);

        assert_eq!(render.fire(&bus, &display), 50);
        assert_eq!(render.fire(&bus, &display), 50);
        assert_eq!(render.failed_flushes(), 2);
        assert_eq!(flaky.borrow().draws, 2);
    }
}
