use serde::{Deserialize, Serialize};

/// A single 24-bit pixel colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
    pub const CYAN: Rgb = Rgb::new(0, 255, 255);
    pub const MAGENTA: Rgb = Rgb::new(255, 0, 255);
    pub const ORANGE: Rgb = Rgb::new(255, 128, 0);
    pub const PURPLE: Rgb = Rgb::new(128, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Fully saturated colour for a hue in degrees. Values wrap at 360.
    pub fn from_hue(hue: u16) -> Self {
        let hue = hue % 360;
        let rise = ((hue % 60) as u32 * 255 / 60) as u8;
        let fall = 255 - rise;
        match hue / 60 {
            0 => Self::new(255, rise, 0),
            1 => Self::new(fall, 255, 0),
            2 => Self::new(0, 255, rise),
            3 => Self::new(0, fall, 255),
            4 => Self::new(rise, 0, 255),
            _ => Self::new(255, 0, fall),
        }
    }

    /// Dims (or keeps) the colour. `factor` is clamped to `[0, 1]`.
    pub fn scaled(self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        let channel = |value: u8| (value as f32 * factor).round() as u8;
        Self::new(channel(self.r), channel(self.g), channel(self.b))
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Read-only table of named colours shared by every plugin grant.
#[derive(Debug)]
pub struct Palette {
    entries: &'static [(&'static str, Rgb)],
}

/// The palette handed out through [`crate::Capabilities::colors`].
pub static PALETTE: Palette = Palette {
    entries: &[
        ("black", Rgb::BLACK),
        ("white", Rgb::WHITE),
        ("red", Rgb::RED),
        ("green", Rgb::GREEN),
        ("blue", Rgb::BLUE),
        ("yellow", Rgb::YELLOW),
        ("cyan", Rgb::CYAN),
        ("magenta", Rgb::MAGENTA),
        ("orange", Rgb::ORANGE),
        ("purple", Rgb::PURPLE),
    ],
};

impl Palette {
    pub fn get(&self, name: &str) -> Option<Rgb> {
        self.entries
            .iter()
            .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
            .map(|(_, color)| *color)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Rgb)> + '_ {
        self.entries.iter().copied()
    }

    /// Colour at `index`, wrapping around the table.
    pub fn cycle(&self, index: usize) -> Rgb {
        self.entries[index % self.entries.len()].1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hue_wheel_hits_primaries() {
        assert_eq!(Rgb::from_hue(0), Rgb::RED);
        assert_eq!(Rgb::from_hue(120), Rgb::GREEN);
        assert_eq!(Rgb::from_hue(240), Rgb::BLUE);
        assert_eq!(Rgb::from_hue(360), Rgb::RED);
    }

    #[test]
    fn scaling_clamps_factor() {
        assert_eq!(Rgb::WHITE.scaled(0.0), Rgb::BLACK);
        assert_eq!(Rgb::WHITE.scaled(4.0), Rgb::WHITE);
        assert_eq!(Rgb::new(200, 100, 0).scaled(0.5), Rgb::new(100, 50, 0));
    }

    #[test]
    fn palette_lookup_is_case_insensitive() {
        assert_eq!(PALETTE.get("Orange"), Some(Rgb::ORANGE));
        assert_eq!(PALETTE.get("mauve"), None);
        assert_eq!(PALETTE.cycle(PALETTE.len() + 2), Rgb::RED);
    }
}
