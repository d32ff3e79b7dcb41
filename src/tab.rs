// The tablature side of the engine. The editor owns the cells; the playback
// core only ever reads them through the `FretGrid` snapshot trait.

use crate::shared::{MAX_FRET, NUM_STRINGS, STEPS_PER_BAR};

/// Read-only view of a tablature the playback engine walks.
pub trait FretGrid: Send + Sync {
    fn bar_count(&self) -> usize;

    /// Fret at (bar, step, string), or `None` for an empty or unplayable
    /// cell. Implementations must keep the result inside 0..=21.
    fn cell_at(&self, bar: usize, step: usize, string: usize) -> Option<u8>;
}

/// Parses the raw text of one grid cell. Only digit strings in 0..=21 count
/// as notes; everything else reads as an empty cell.
pub fn parse_fret(text: &str) -> Option<u8> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<u8>().ok().filter(|fret| *fret <= MAX_FRET)
}

/// One bar: 6 strings by 8 steps of raw cell text, exactly what a row of
/// entry widgets would hold.
#[derive(Clone, Debug, Default)]
pub struct Bar {
    cells: [[String; STEPS_PER_BAR]; NUM_STRINGS],
}

/// Reference grid used by the demo binary and the tests. A real editor
/// widget implements `FretGrid` directly instead.
#[derive(Clone, Debug, Default)]
pub struct Tablature {
    bars: Vec<Bar>,
}

impl Tablature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an empty bar and returns its index.
    pub fn add_bar(&mut self) -> usize {
        self.bars.push(Bar::default());
        self.bars.len() - 1
    }

    /// Writes the raw text of one cell. Out-of-range coordinates are
    /// ignored, like typing outside the grid.
    pub fn set(&mut self, bar: usize, step: usize, string: usize, text: &str) {
        if string >= NUM_STRINGS || step >= STEPS_PER_BAR {
            return;
        }
        if let Some(bar) = self.bars.get_mut(bar) {
            bar.cells[string][step] = text.to_string();
        }
    }

    /// Empties every cell in every bar.
    pub fn clear_all(&mut self) {
        for bar in &mut self.bars {
            for row in &mut bar.cells {
                for cell in row {
                    cell.clear();
                }
            }
        }
    }
}

impl FretGrid for Tablature {
    fn bar_count(&self) -> usize {
        self.bars.len()
    }

    fn cell_at(&self, bar: usize, step: usize, string: usize) -> Option<u8> {
        let text = self.bars.get(bar)?.cells.get(string)?.get(step)?;
        parse_fret(text)
    }
}
