/// A named run of atlas cells played at a fixed rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub name: String,
    pub cells: Vec<usize>,
    /// Seconds each cell stays on screen.
    pub speed: f32,
    pub looping: bool,
}

impl Sequence {
    pub fn new(name: impl Into<String>, cells: Vec<usize>, speed: f32, looping: bool) -> Self {
        Self { name: name.into(), cells, speed, looping }
    }
}

/// Sequence playback for a sprite.
///
/// Advancing the clock only picks a cell index; the sprite owns the cell
/// that is actually drawn.
#[derive(Debug, Clone, Default)]
pub struct Animation {
    sequences: Vec<Sequence>,
    current: Option<usize>,
    frame: usize,
    elapsed: f32,
    playing: bool,
}

impl Animation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sequence: Sequence) -> &mut Self {
        self.sequences.push(sequence);
        self
    }

    /// Starts the named sequence from its first cell.
    ///
    /// Returns `false` if no sequence has that name or it has no cells.
    pub fn play(&mut self, name: &str) -> bool {
        let Some(i) = self.sequences.iter().position(|s| s.name == name) else {
            log::debug!("animation: unknown sequence {name:?}");
            return false;
        };
        if self.sequences[i].cells.is_empty() {
            return false;
        }
        self.current = Some(i);
        self.frame = 0;
        self.elapsed = 0.0;
        self.playing = true;
        true
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current_sequence(&self) -> Option<&Sequence> {
        self.current.and_then(|i| self.sequences.get(i))
    }

    /// Cell index of the current frame.
    pub fn current_cell(&self) -> Option<usize> {
        let seq = self.current_sequence()?;
        seq.cells.get(self.frame).copied()
    }

    /// Advances playback by `dt` seconds and returns the current cell.
    pub fn update(&mut self, dt: f32) -> Option<usize> {
        if self.playing {
            self.advance(dt);
        }
        self.current_cell()
    }

    fn advance(&mut self, dt: f32) {
        let Some(seq) = self.current.and_then(|i| self.sequences.get(i)) else {
            return;
        };
        if seq.speed <= 0.0 {
            return;
        }
        let len = seq.cells.len();
        let looping = seq.looping;
        let speed = seq.speed;

        self.elapsed += dt.max(0.0);
        while self.elapsed >= speed {
            self.elapsed -= speed;
            if self.frame + 1 < len {
                self.frame += 1;
            } else if looping {
                self.frame = 0;
            } else {
                self.playing = false;
                self.elapsed = 0.0;
                break;
            }
        }
    }
}
