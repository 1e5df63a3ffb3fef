use std::{cell::Cell, rc::Rc};

use crate::{Capabilities, NotificationKind, Plugin, Result, Rgb};

const RAINBOW_TICK_MS: u64 = 100;
const HUE_STEP: u16 = 12;

/// Hue sweep across the whole matrix, shifted on every update.
#[derive(Debug, Default)]
pub struct Rainbow {
    hue: Rc<Cell<u16>>,
}

impl Rainbow {
    pub const NAME: &'static str = "rainbow";
}

impl Plugin for Rainbow {
    fn id(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, caps: Capabilities) -> Result<()> {
        caps.set_tick(RAINBOW_TICK_MS);

        let hue = self.hue.clone();
        let painter = caps.clone();
        caps.on(NotificationKind::Update, move |_| {
            let pixels = painter.geometry().pixel_count().max(1);
            let base = hue.get();
            for index in 0..pixels {
                let spread = (index * 360 / pixels) as u16;
                painter.led(index, Rgb::from_hue(base + spread));
            }
            hue.set((base + HUE_STEP) % 360);
        });
        Ok(())
    }
}

/// A single pixel walking the matrix. Any remote input switches its colour.
#[derive(Debug, Default)]
pub struct Walker {
    position: Rc<Cell<usize>>,
    color: Rc<Cell<usize>>,
}

impl Walker {
    pub const NAME: &'static str = "walker";
}

impl Plugin for Walker {
    fn id(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, caps: Capabilities) -> Result<()> {
        // Skip black, it is the first palette entry.
        self.color.set(1);

        let (position, color, painter) = (self.position.clone(), self.color.clone(), caps.clone());
        caps.on(NotificationKind::Update, move |_| {
            let pixels = painter.geometry().pixel_count().max(1);
            let current = position.get() % pixels;
            painter.clear();
            painter.led(current, painter.colors().cycle(color.get()));
            position.set((current + 1) % pixels);
        });

        let (color, palette_len) = (self.color.clone(), caps.colors().len());
        caps.on(NotificationKind::Input, move |_| {
            let next = color.get() % (palette_len - 1) + 1;
            color.set(next);
        });
        Ok(())
    }
}
