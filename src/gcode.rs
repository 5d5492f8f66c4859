//! Parsed-block model shared by the dispatch pipeline.
//!
//! Clean, minimal types representing what the interpreter's parser hands to
//! an extension: the command identifier, which parameter words were present,
//! and their numeric values. No validation logic here - pure data.

/// Maximum number of motion axes the block model carries values for.
pub const MAX_AXES: usize = 8;

/// Axis letters in fixed report order, indexed by axis number.
pub const AXIS_LETTERS: [char; MAX_AXES] = ['X', 'Y', 'Z', 'A', 'B', 'C', 'U', 'V'];

/// An opaque M-code identifier, compared by equality only.
///
/// The numeric values mirror the codes the pick-and-place host sends; the
/// pipeline never does arithmetic on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mcode(pub u16);

impl Mcode {
    pub const SET_PIN_STATE: Mcode = Mcode(42);
    pub const GET_ADC_RAW: Mcode = Mcode(105);
    pub const GET_ADC_SCALED: Mcode = Mcode(106);
    pub const SET_ADC_SCALING: Mcode = Mcode(107);
    pub const GET_POSITION: Mcode = Mcode(114);
    pub const FIRMWARE_INFO: Mcode = Mcode(115);
    pub const SET_ACCELERATION: Mcode = Mcode(204);
    pub const SET_JERK: Mcode = Mcode(205);
    pub const FINISH_MOVES: Mcode = Mcode(400);
    pub const SETTINGS_RESET: Mcode = Mcode(502);
}

impl std::fmt::Display for Mcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// A parameter word letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Word {
    P,
    Q,
    R,
    S,
    T,
    D,
    X,
    Y,
    Z,
    A,
    B,
    C,
    U,
    V,
}

impl Word {
    /// The word carrying the value for axis `idx`, if `idx` is in range.
    pub fn for_axis(idx: usize) -> Option<Word> {
        const AXIS_WORDS: [Word; MAX_AXES] = [
            Word::X,
            Word::Y,
            Word::Z,
            Word::A,
            Word::B,
            Word::C,
            Word::U,
            Word::V,
        ];
        AXIS_WORDS.get(idx).copied()
    }

    /// The axis index this word addresses, if it is an axis word.
    pub fn axis_index(self) -> Option<usize> {
        match self {
            Word::X => Some(0),
            Word::Y => Some(1),
            Word::Z => Some(2),
            Word::A => Some(3),
            Word::B => Some(4),
            Word::C => Some(5),
            Word::U => Some(6),
            Word::V => Some(7),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Word::P => 'P',
            Word::Q => 'Q',
            Word::R => 'R',
            Word::S => 'S',
            Word::T => 'T',
            Word::D => 'D',
            Word::X => 'X',
            Word::Y => 'Y',
            Word::Z => 'Z',
            Word::A => 'A',
            Word::B => 'B',
            Word::C => 'C',
            Word::U => 'U',
            Word::V => 'V',
        }
    }

    /// Parse a word letter, case-insensitive.
    pub fn from_letter(letter: char) -> Option<Word> {
        match letter.to_ascii_uppercase() {
            'P' => Some(Word::P),
            'Q' => Some(Word::Q),
            'R' => Some(Word::R),
            'S' => Some(Word::S),
            'T' => Some(Word::T),
            'D' => Some(Word::D),
            'X' => Some(Word::X),
            'Y' => Some(Word::Y),
            'Z' => Some(Word::Z),
            'A' => Some(Word::A),
            'B' => Some(Word::B),
            'C' => Some(Word::C),
            'U' => Some(Word::U),
            'V' => Some(Word::V),
            _ => None,
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u8)
    }
}

/// A small set of parameter words, backed by a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordSet(u16);

impl WordSet {
    pub fn new() -> Self {
        WordSet(0)
    }

    pub fn insert(&mut self, word: Word) {
        self.0 |= word.bit();
    }

    pub fn remove(&mut self, word: Word) {
        self.0 &= !word.bit();
    }

    pub fn contains(&self, word: Word) -> bool {
        self.0 & word.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Numeric values attached to the words of a block.
///
/// Values default to NaN so an unparseable number is distinguishable from a
/// missing one; validation checks NaN before any range test.
#[derive(Debug, Clone)]
pub struct BlockValues {
    pub p: f64,
    pub q: f64,
    pub r: f64,
    pub s: f64,
    pub t: f64,
    pub axis: [f64; MAX_AXES],
}

impl Default for BlockValues {
    fn default() -> Self {
        BlockValues {
            p: f64::NAN,
            q: f64::NAN,
            r: f64::NAN,
            s: f64::NAN,
            t: f64::NAN,
            axis: [f64::NAN; MAX_AXES],
        }
    }
}

impl BlockValues {
    /// The value carried by `word`, if that word carries one.
    pub fn get(&self, word: Word) -> f64 {
        match word {
            Word::P => self.p,
            Word::Q => self.q,
            Word::R => self.r,
            Word::S => self.s,
            Word::T => self.t,
            Word::D => f64::NAN,
            axis => self.axis[axis.axis_index().unwrap_or(0)],
        }
    }

    fn set(&mut self, word: Word, value: f64) {
        match word {
            Word::P => self.p = value,
            Word::Q => self.q = value,
            Word::R => self.r = value,
            Word::S => self.s = value,
            Word::T => self.t = value,
            Word::D => {}
            axis => {
                if let Some(idx) = axis.axis_index() {
                    self.axis[idx] = value;
                }
            }
        }
    }
}

/// A parsed command block as handed over by the interpreter's parser.
///
/// `words` holds the letters still awaiting interpretation; validation moves
/// accepted letters into `consumed` so downstream stages neither reinterpret
/// them nor lose track of what was matched.
#[derive(Debug, Clone)]
pub struct ParsedBlock {
    pub mcode: Mcode,
    pub words: WordSet,
    pub consumed: WordSet,
    pub values: BlockValues,
}

impl ParsedBlock {
    pub fn new(mcode: Mcode) -> Self {
        ParsedBlock {
            mcode,
            words: WordSet::new(),
            consumed: WordSet::new(),
            values: BlockValues::default(),
        }
    }

    /// Attach a word with a numeric value.
    pub fn with_word(mut self, word: Word, value: f64) -> Self {
        self.words.insert(word);
        self.values.set(word, value);
        self
    }

    /// Attach a flag-only word (no numeric value).
    pub fn with_flag(mut self, word: Word) -> Self {
        self.words.insert(word);
        self
    }

    /// Mark a word as accepted: clears it from the pending set and records
    /// it as consumed.
    pub fn consume(&mut self, word: Word) {
        if self.words.contains(word) {
            self.words.remove(word);
            self.consumed.insert(word);
        }
    }
}

/// Interpreter run state at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Normal,
    /// Dry-run: commands are validated and accounted for but must produce no
    /// physical side effect.
    CheckMode,
}

/// Outcome of validating a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    /// Accepted without range checks. Distinct from `Ok` so hosts and test
    /// suites can flag commands whose validation is a known gap.
    Unvalidated,
    ValueWordMissing,
    BadNumberFormat,
    InvalidStatement,
    Unhandled,
}

impl Status {
    /// Whether execution should proceed.
    pub fn passes(self) -> bool {
        matches!(self, Status::Ok | Status::Unvalidated)
    }
}
