use std::{
    cell::RefCell,
    fmt,
    fs::File,
    io::{self, BufWriter, Write},
    net::TcpStream,
    rc::Rc,
};

use serde::Serialize;

use crate::{geometry::serpentine, Geometry, HostError, Point, Result, Rgb};

/// Display handle shared between the control loop, the render loop and every
/// live capability grant.
pub type SharedDisplay = Rc<RefCell<dyn Display>>;

/// Driver contract for the pixel buffer and its output transport.
///
/// `clear` and `draw` must be safe to call at any time, including before a
/// plugin is active or before `connect`.
pub trait Display {
    fn connect(&mut self, endpoint: &str) -> Result<()>;

    /// Edge length of the square matrix.
    fn size(&self) -> usize;

    fn led(&mut self, index: usize, color: Rgb) -> Result<()>;

    fn led_xy(&mut self, x: usize, y: usize, color: Rgb) -> Result<()> {
        let size = self.size();
        if x >= size || y >= size {
            return Err(HostError::Display(format!(
                "pixel ({x}, {y}) is outside the {size}x{size} matrix"
            )));
        }
        self.led(y * size + x, color)
    }

    fn fill(&mut self, color: Rgb);

    fn clear(&mut self);

    /// Flushes the current buffer to the output transport.
    fn draw(&mut self) -> Result<()>;
}

#[derive(Serialize)]
struct Frame<'a> {
    size: usize,
    pixels: &'a [[u8; 3]],
}

/// In-memory square matrix that streams frames as JSON lines.
pub struct LedMatrix {
    geometry: Geometry,
    pixels: Vec<Rgb>,
    output: Option<Box<dyn Write>>,
    frames_written: u64,
}

impl LedMatrix {
    pub fn new(size: usize) -> Self {
        let geometry = Geometry::new(size);
        Self {
            geometry,
            pixels: vec![Rgb::BLACK; geometry.pixel_count()],
            output: None,
            frames_written: 0,
        }
    }

    /// Builds a matrix that is already connected to `output`.
    pub fn with_output(size: usize, output: Box<dyn Write>) -> Self {
        let mut matrix = Self::new(size);
        matrix.output = Some(output);
        matrix
    }

    pub fn is_connected(&self) -> bool {
        self.output.is_some()
    }

    pub fn pixel(&self, index: usize) -> Option<Rgb> {
        self.pixels.get(index).copied()
    }

    pub fn pixel_xy(&self, x: usize, y: usize) -> Option<Rgb> {
        let point = Point::new(i32::try_from(x).ok()?, i32::try_from(y).ok()?);
        self.geometry
            .index(point)
            .and_then(|index| self.pixel(index))
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn open(endpoint: &str) -> Result<Box<dyn Write>> {
        let endpoint = endpoint.trim();
        if endpoint == "stdout" || endpoint == "-" {
            return Ok(Box::new(io::stdout()));
        }
        if let Some(address) = endpoint.strip_prefix("tcp://") {
            let stream = TcpStream::connect(address).map_err(|err| {
                HostError::Display(format!("could not reach matrix at {address}: {err}"))
            })?;
            stream.set_nodelay(true)?;
            return Ok(Box::new(BufWriter::new(stream)));
        }
        if let Some(path) = endpoint.strip_prefix("file://") {
            return Ok(Box::new(BufWriter::new(File::create(path)?)));
        }
        Err(HostError::config(format!(
            "unsupported matrix endpoint `{endpoint}` (expected tcp://, file:// or stdout)"
        )))
    }

    fn encode_frame(&self) -> Result<Vec<u8>> {
        let size = self.geometry.size();
        let mut physical = vec![[0u8; 3]; self.pixels.len()];
        for (index, color) in self.pixels.iter().enumerate() {
            physical[serpentine(index, size)] = color.to_array();
        }
        let mut line = serde_json::to_vec(&Frame {
            size,
            pixels: &physical,
        })?;
        line.push(b'\n');
        Ok(line)
    }
}

impl Display for LedMatrix {
    fn connect(&mut self, endpoint: &str) -> Result<()> {
        self.output = Some(Self::open(endpoint)?);
        tracing::info!(endpoint, size = self.geometry.size(), "matrix connected");
        Ok(())
    }

    fn size(&self) -> usize {
        self.geometry.size()
    }

    fn led(&mut self, index: usize, color: Rgb) -> Result<()> {
        let count = self.pixels.len();
        let slot = self.pixels.get_mut(index).ok_or_else(|| {
            HostError::Display(format!("pixel {index} is outside the {count}-pixel buffer"))
        })?;
        *slot = color;
        Ok(())
    }

    fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    fn clear(&mut self) {
        self.fill(Rgb::BLACK);
    }

    fn draw(&mut self) -> Result<()> {
        if self.output.is_none() {
            return Ok(());
        }
        let frame = self.encode_frame()?;
        if let Some(output) = self.output.as_mut() {
            output
                .write_all(&frame)
                .and_then(|_| output.flush())
                .map_err(|err| HostError::Display(format!("frame write failed: {err}")))?;
        }
        self.frames_written += 1;
        Ok(())
    }
}

impl fmt::Debug for LedMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedMatrix")
            .field("size", &self.geometry.size())
            .field("connected", &self.is_connected())
            .field("frames_written", &self.frames_written)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn unconnected_draw_is_a_no_op() {
        let mut matrix = LedMatrix::new(2);
        matrix.clear();
        matrix.draw().unwrap();
        assert_eq!(matrix.frames_written(), 0);
    }

    #[test]
    fn rejects_out_of_range_pixels() {
        let mut matrix = LedMatrix::new(2);
        assert!(matches!(
            matrix.led(4, Rgb::RED),
            Err(HostError::Display(_))
        ));
        assert!(matrix.led_xy(2, 0, Rgb::RED).is_err());
        matrix.led_xy(1, 1, Rgb::RED).unwrap();
        assert_eq!(matrix.pixel(3), Some(Rgb::RED));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn huge_coordinates_do_not_alias_onto_the_matrix() {
        let mut matrix = LedMatrix::new(2);
        matrix.led(0, Rgb::RED).unwrap();
        assert_eq!(matrix.pixel_xy(0, 0), Some(Rgb::RED));
        // Truncated to 32 bits these would both land on (0, 0).
        let wrapped = 1usize << 32;
        assert_eq!(matrix.pixel_xy(wrapped, 0), None);
        assert_eq!(matrix.pixel_xy(0, wrapped), None);
    }

    #[test]
    fn writes_frames_in_serpentine_order() {
        let buffer = SharedBuffer::default();
        let mut matrix = LedMatrix::with_output(2, Box::new(buffer.clone()));
        matrix.led(0, Rgb::RED).unwrap();
        matrix.draw().unwrap();

        let raw = buffer.0.borrow();
        let text = std::str::from_utf8(&raw).unwrap();
        let frame: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(frame["size"], 2);
        assert_eq!(frame["pixels"][1], serde_json::json!([255, 0, 0]));
        assert_eq!(frame["pixels"][0], serde_json::json!([0, 0, 0]));
        assert_eq!(matrix.frames_written(), 1);
    }

    #[test]
    fn unknown_endpoint_scheme_is_a_configuration_error() {
        let mut matrix = LedMatrix::new(2);
        let err = matrix.connect("serial:///dev/ttyUSB0").unwrap_err();
        assert!(matches!(err, HostError::Configuration(_)));
        assert!(!matrix.is_connected());
    }
}
