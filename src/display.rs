// A dumb ascii terminal of rows by columns cells with a scrollback free
// buffer, a nano VT52 escape engine and optional pixel output through a
// minifb window rendered with a packed 8x8 font. The interpreter sees it as
// one more output device and reaches the raw cell buffer through @D and the
// cursor through @X and @Y.

use minifb::{Window, WindowOptions};

const GLYPH: usize = 8;

pub struct Display {
    pub rows: usize,
    pub cols: usize,
    buffer: Vec<u8>,
    pub col: usize,
    pub row: usize,
    scrollmode: u8,
    scroll_rows: usize,
    esc: u8,
    vt52: u8,
    screen: Option<Screen>,
}

struct Screen {
    window: Window,
    fb: Vec<u32>,
}

impl Screen {
    fn new(rows: usize, cols: usize) -> Screen {
        let window = Window::new(
            "tinybas",
            cols * GLYPH,
            rows * GLYPH,
            WindowOptions::default(),
        )
        .unwrap_or_else(|e| {
            panic!("{}", e);
        });
        let fb = vec![0; cols * GLYPH * rows * GLYPH];
        Screen { window, fb }
    }

    fn paint(&mut self, c: u8, col: usize, row: usize, cols: usize) {
        let glyph = &FONT[glyph_index(c)];
        for (y, &bits) in glyph.iter().enumerate() {
            for x in 0..GLYPH {
                let px = if bits & (1u8 << x) != 0 { 0x00ff66 } else { 0 };
                self.fb[(row * GLYPH + y) * cols * GLYPH + col * GLYPH + x] = px;
            }
        }
    }

    fn refresh(&mut self, rows: usize, cols: usize) {
        self.window
            .update_with_buffer(&self.fb, cols * GLYPH, rows * GLYPH)
            .expect("Error updating screen!");
    }
}

impl Display {
    pub fn new(rows: usize, cols: usize, with_screen: bool) -> Display {
        let screen = if with_screen && rows > 0 && cols > 0 {
            Some(Screen::new(rows, cols))
        } else {
            None
        };
        Display {
            rows,
            cols,
            buffer: vec![0; rows * cols],
            col: 0,
            row: 0,
            scrollmode: 1,
            scroll_rows: 1,
            esc: 0,
            vt52: 0,
            screen,
        }
    }

    pub fn active_size(&self) -> bool {
        self.rows > 0 && self.cols > 0
    }

    pub fn set_scrollmode(&mut self, mode: u8, lines: usize) {
        self.scrollmode = mode;
        self.scroll_rows = lines;
    }

    pub fn set_cursor(&mut self, col: usize, row: usize) {
        if self.active_size() {
            self.col = col % self.cols;
            self.row = row % self.rows;
        }
    }

    // raw cell access for the @D array, zero based cell index
    pub fn get_cell(&self, i: usize) -> u8 {
        self.buffer[i]
    }

    pub fn set_cell(&mut self, i: usize, v: u8) {
        let col = i % self.cols;
        let row = i / self.cols;
        let shown = if v == 0 { b' ' } else { v };
        self.print_char(shown, col, row);
        self.buffer[i] = if v == 32 { 0 } else { v };
        self.refresh();
    }

    fn print_char(&mut self, c: u8, col: usize, row: usize) {
        let cols = self.cols;
        if let Some(screen) = &mut self.screen {
            screen.paint(c, col, row, cols);
        }
    }

    fn refresh(&mut self) {
        let (rows, cols) = (self.rows, self.cols);
        if let Some(screen) = &mut self.screen {
            screen.refresh(rows, cols);
        }
    }

    pub fn clear(&mut self) {
        for cell in self.buffer.iter_mut() {
            *cell = 0;
        }
        self.col = 0;
        self.row = 0;
        if let Some(screen) = &mut self.screen {
            for px in screen.fb.iter_mut() {
                *px = 0;
            }
        }
        self.refresh();
    }

    fn scroll(&mut self) {
        let (rows, cols) = (self.rows, self.cols);
        for r in 0..rows - self.scroll_rows {
            for c in 0..cols {
                let b = self.buffer[(r + self.scroll_rows) * cols + c];
                if self.buffer[r * cols + c] != b {
                    self.print_char(if b >= 32 { b } else { b' ' }, c, r);
                }
                self.buffer[r * cols + c] = b;
            }
        }
        for r in rows - self.scroll_rows..rows {
            for c in 0..cols {
                if self.buffer[r * cols + c] > 32 {
                    self.print_char(b' ', c, r);
                }
                self.buffer[r * cols + c] = 0;
            }
        }
        self.col = 0;
        self.row = rows - self.scroll_rows;
    }

    // the nano vt52 engine, the character is consumed or rewritten
    fn vt52_step(&mut self, c: &mut u8) {
        if self.vt52 == b'Y' {
            if self.esc == 2 {
                self.row = (*c as usize).wrapping_sub(31) % self.rows;
                self.esc = 1;
                *c = 0;
                return;
            }
            if self.esc == 1 {
                self.col = (*c as usize).wrapping_sub(31) % self.cols;
                *c = 0;
            }
            self.vt52 = 0;
        }

        match *c {
            b'A' => {
                if self.row > 0 {
                    self.row -= 1;
                }
            }
            b'B' => self.row = (self.row + 1) % self.rows,
            b'C' => self.col = (self.col + 1) % self.cols,
            b'D' => {
                if self.col > 0 {
                    self.col -= 1;
                }
            }
            b'E' => self.clear(),
            b'H' => {
                self.row = 0;
                self.col = 0;
            }
            b'Y' => {
                self.vt52 = b'Y';
                self.esc = 2;
                *c = 0;
                return;
            }
            _ => {}
        }
        self.esc = 0;
        *c = 0;
    }

    pub fn write(&mut self, c: u8) {
        if !self.active_size() {
            return;
        }
        let mut c = c;
        if self.esc != 0 {
            self.vt52_step(&mut c);
        }
        match c {
            10 => {
                self.row += 1;
                if self.row >= self.rows {
                    self.scroll();
                }
                self.col = 0;
                self.refresh();
                return;
            }
            12 => {
                self.clear();
                return;
            }
            13 => {
                self.col = 0;
                return;
            }
            27 => {
                self.esc = 1;
                return;
            }
            127 => {
                if self.col > 0 {
                    self.col -= 1;
                    self.buffer[self.row * self.cols + self.col] = 0;
                    let (col, row) = (self.col, self.row);
                    self.print_char(b' ', col, row);
                    self.refresh();
                }
                return;
            }
            _ => {}
        }
        if c < 32 {
            return;
        }

        let (col, row) = (self.col, self.row);
        self.print_char(c, col, row);
        self.buffer[row * self.cols + col] = c;
        self.col += 1;
        if self.col == self.cols {
            self.col = 0;
            self.row += 1;
            if self.row >= self.rows {
                self.scroll();
            }
        }
        self.refresh();
    }

    // pause listings when the cursor reaches the last line
    pub fn at_scroll_stop(&self) -> bool {
        self.scrollmode == 1 && self.active_size() && self.row == self.rows - 1
    }
}

fn glyph_index(c: u8) -> usize {
    if (32..128).contains(&c) {
        (c - 32) as usize
    } else {
        0
    }
}

// packed 8x8 font, ascii 32 to 127, low bit is the left pixel
#[rustfmt::skip]
const FONT: [[u8; 8]; 96] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    [0x18, 0x3c, 0x3c, 0x18, 0x18, 0x00, 0x18, 0x00],
    [0x36, 0x36, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    [0x36, 0x36, 0x7f, 0x36, 0x7f, 0x36, 0x36, 0x00],
    [0x0c, 0x3e, 0x03, 0x1e, 0x30, 0x1f, 0x0c, 0x00],
    [0x00, 0x63, 0x33, 0x18, 0x0c, 0x66, 0x63, 0x00],
    [0x1c, 0x36, 0x1c, 0x6e, 0x3b, 0x33, 0x6e, 0x00],
    [0x06, 0x06, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00],
    [0x18, 0x0c, 0x06, 0x06, 0x06, 0x0c, 0x18, 0x00],
    [0x06, 0x0c, 0x18, 0x18, 0x18, 0x0c, 0x06, 0x00],
    [0x00, 0x66, 0x3c, 0xff, 0x3c, 0x66, 0x00, 0x00],
    [0x00, 0x0c, 0x0c, 0x3f, 0x0c, 0x0c, 0x00, 0x00],
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x0c, 0x0c, 0x06],
    [0x00, 0x00, 0x00, 0x3f, 0x00, 0x00, 0x00, 0x00],
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x0c, 0x0c, 0x00],
    [0x60, 0x30, 0x18, 0x0c, 0x06, 0x03, 0x01, 0x00],
    [0x3e, 0x63, 0x73, 0x7b, 0x6f, 0x67, 0x3e, 0x00],
    [0x0c, 0x0e, 0x0c, 0x0c, 0x0c, 0x0c, 0x3f, 0x00],
    [0x1e, 0x33, 0x30, 0x1c, 0x06, 0x33, 0x3f, 0x00],
    [0x1e, 0x33, 0x30, 0x1c, 0x30, 0x33, 0x1e, 0x00],
    [0x38, 0x3c, 0x36, 0x33, 0x7f, 0x30, 0x78, 0x00],
    [0x3f, 0x03, 0x1f, 0x30, 0x30, 0x33, 0x1e, 0x00],
    [0x1c, 0x06, 0x03, 0x1f, 0x33, 0x33, 0x1e, 0x00],
    [0x3f, 0x33, 0x30, 0x18, 0x0c, 0x0c, 0x0c, 0x00],
    [0x1e, 0x33, 0x33, 0x1e, 0x33, 0x33, 0x1e, 0x00],
    [0x1e, 0x33, 0x33, 0x3e, 0x30, 0x18, 0x0e, 0x00],
    [0x00, 0x0c, 0x0c, 0x00, 0x00, 0x0c, 0x0c, 0x00],
    [0x00, 0x0c, 0x0c, 0x00, 0x00, 0x0c, 0x0c, 0x06],
    [0x18, 0x0c, 0x06, 0x03, 0x06, 0x0c, 0x18, 0x00],
    [0x00, 0x00, 0x3f, 0x00, 0x00, 0x3f, 0x00, 0x00],
    [0x06, 0x0c, 0x18, 0x30, 0x18, 0x0c, 0x06, 0x00],
    [0x1e, 0x33, 0x30, 0x18, 0x0c, 0x00, 0x0c, 0x00],
    [0x3e, 0x63, 0x7b, 0x7b, 0x7b, 0x03, 0x1e, 0x00],
    [0x0c, 0x1e, 0x33, 0x33, 0x3f, 0x33, 0x33, 0x00],
    [0x3f, 0x66, 0x66, 0x3e, 0x66, 0x66, 0x3f, 0x00],
    [0x3c, 0x66, 0x03, 0x03, 0x03, 0x66, 0x3c, 0x00],
    [0x1f, 0x36, 0x66, 0x66, 0x66, 0x36, 0x1f, 0x00],
    [0x7f, 0x46, 0x16, 0x1e, 0x16, 0x46, 0x7f, 0x00],
    [0x7f, 0x46, 0x16, 0x1e, 0x16, 0x06, 0x0f, 0x00],
    [0x3c, 0x66, 0x03, 0x03, 0x73, 0x66, 0x7c, 0x00],
    [0x33, 0x33, 0x33, 0x3f, 0x33, 0x33, 0x33, 0x00],
    [0x1e, 0x0c, 0x0c, 0x0c, 0x0c, 0x0c, 0x1e, 0x00],
    [0x78, 0x30, 0x30, 0x30, 0x33, 0x33, 0x1e, 0x00],
    [0x67, 0x66, 0x36, 0x1e, 0x36, 0x66, 0x67, 0x00],
    [0x0f, 0x06, 0x06, 0x06, 0x46, 0x66, 0x7f, 0x00],
    [0x63, 0x77, 0x7f, 0x7f, 0x6b, 0x63, 0x63, 0x00],
    [0x63, 0x67, 0x6f, 0x7b, 0x73, 0x63, 0x63, 0x00],
    [0x1c, 0x36, 0x63, 0x63, 0x63, 0x36, 0x1c, 0x00],
    [0x3f, 0x66, 0x66, 0x3e, 0x06, 0x06, 0x0f, 0x00],
    [0x1e, 0x33, 0x33, 0x33, 0x3b, 0x1e, 0x38, 0x00],
    [0x3f, 0x66, 0x66, 0x3e, 0x36, 0x66, 0x67, 0x00],
    [0x1e, 0x33, 0x07, 0x0e, 0x38, 0x33, 0x1e, 0x00],
    [0x3f, 0x2d, 0x0c, 0x0c, 0x0c, 0x0c, 0x1e, 0x00],
    [0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x3f, 0x00],
    [0x33, 0x33, 0x33, 0x33, 0x33, 0x1e, 0x0c, 0x00],
    [0x63, 0x63, 0x63, 0x6b, 0x7f, 0x77, 0x63, 0x00],
    [0x63, 0x63, 0x36, 0x1c, 0x1c, 0x36, 0x63, 0x00],
    [0x33, 0x33, 0x33, 0x1e, 0x0c, 0x0c, 0x1e, 0x00],
    [0x7f, 0x63, 0x31, 0x18, 0x4c, 0x66, 0x7f, 0x00],
    [0x1e, 0x06, 0x06, 0x06, 0x06, 0x06, 0x1e, 0x00],
    [0x03, 0x06, 0x0c, 0x18, 0x30, 0x60, 0x40, 0x00],
    [0x1e, 0x18, 0x18, 0x18, 0x18, 0x18, 0x1e, 0x00],
    [0x08, 0x1c, 0x36, 0x63, 0x00, 0x00, 0x00, 0x00],
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff],
    [0x0c, 0x0c, 0x18, 0x00, 0x00, 0x00, 0x00, 0x00],
    [0x00, 0x00, 0x1e, 0x30, 0x3e, 0x33, 0x6e, 0x00],
    [0x07, 0x06, 0x06, 0x3e, 0x66, 0x66, 0x3b, 0x00],
    [0x00, 0x00, 0x1e, 0x33, 0x03, 0x33, 0x1e, 0x00],
    [0x38, 0x30, 0x30, 0x3e, 0x33, 0x33, 0x6e, 0x00],
    [0x00, 0x00, 0x1e, 0x33, 0x3f, 0x03, 0x1e, 0x00],
    [0x1c, 0x36, 0x06, 0x0f, 0x06, 0x06, 0x0f, 0x00],
    [0x00, 0x00, 0x6e, 0x33, 0x33, 0x3e, 0x30, 0x1f],
    [0x07, 0x06, 0x36, 0x6e, 0x66, 0x66, 0x67, 0x00],
    [0x0c, 0x00, 0x0e, 0x0c, 0x0c, 0x0c, 0x1e, 0x00],
    [0x30, 0x00, 0x30, 0x30, 0x30, 0x33, 0x33, 0x1e],
    [0x07, 0x06, 0x66, 0x36, 0x1e, 0x36, 0x67, 0x00],
    [0x0e, 0x0c, 0x0c, 0x0c, 0x0c, 0x0c, 0x1e, 0x00],
    [0x00, 0x00, 0x33, 0x7f, 0x7f, 0x6b, 0x63, 0x00],
    [0x00, 0x00, 0x1f, 0x33, 0x33, 0x33, 0x33, 0x00],
    [0x00, 0x00, 0x1e, 0x33, 0x33, 0x33, 0x1e, 0x00],
    [0x00, 0x00, 0x3b, 0x66, 0x66, 0x3e, 0x06, 0x0f],
    [0x00, 0x00, 0x6e, 0x33, 0x33, 0x3e, 0x30, 0x78],
    [0x00, 0x00, 0x3b, 0x6e, 0x66, 0x06, 0x0f, 0x00],
    [0x00, 0x00, 0x3e, 0x03, 0x1e, 0x30, 0x1f, 0x00],
    [0x08, 0x0c, 0x3e, 0x0c, 0x0c, 0x2c, 0x18, 0x00],
    [0x00, 0x00, 0x33, 0x33, 0x33, 0x33, 0x6e, 0x00],
    [0x00, 0x00, 0x33, 0x33, 0x33, 0x1e, 0x0c, 0x00],
    [0x00, 0x00, 0x63, 0x6b, 0x7f, 0x7f, 0x36, 0x00],
    [0x00, 0x00, 0x63, 0x36, 0x1c, 0x36, 0x63, 0x00],
    [0x00, 0x00, 0x33, 0x33, 0x33, 0x3e, 0x30, 0x1f],
    [0x00, 0x00, 0x3f, 0x19, 0x0c, 0x26, 0x3f, 0x00],
    [0x38, 0x0c, 0x0c, 0x07, 0x0c, 0x0c, 0x38, 0x00],
    [0x18, 0x18, 0x18, 0x00, 0x18, 0x18, 0x18, 0x00],
    [0x07, 0x0c, 0x0c, 0x38, 0x0c, 0x0c, 0x07, 0x00],
    [0x6e, 0x3b, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
];
