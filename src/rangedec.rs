use crate::error::XzError;
use crate::input::InputBuffer;

/// Initial value of every adaptive probability: 11-bit scale, 0.5.
pub const PROB_INIT: u16 = 1 << 10;

/// Number of bits in the probability scale.
const PROB_BITS: u32 = 11;

/// Normalization threshold; below this the interval shifts in a new byte.
const RANGE_TOP: u32 = 1 << 24;

/// Adaptation shift: probabilities move 1/32 of the way per decoded bit.
const PROB_MOVE_BITS: u32 = 5;

/// Range (arithmetic) decoder over one LZMA2 chunk's compressed payload.
///
/// The chunk budget is tracked in `remaining`. A corrupt stream can ask for
/// more bytes than the chunk holds; instead of failing mid-bit the decoder
/// raises the `overrun` flag and keeps feeding zeros. The surrounding decode
/// loop is bounded by the dictionary limit, so the flag is always observed
/// by `is_complete` at chunk end, where exhaustion is fatal.
#[derive(Debug)]
pub struct RangeDecoder {
    /// Width of the current coding interval.
    range: u32,
    /// Current value within the interval.
    code: u32,
    /// Compressed payload bytes not yet shifted in.
    remaining: usize,
    /// Set when the chunk budget or the input ran out.
    overrun: bool,
}

impl RangeDecoder {
    /// Reads the 5 initialization bytes: a mandatory zero, then the first
    /// four code bytes big-endian. `compressed_size` is the whole chunk
    /// payload including these five bytes.
    pub fn new(input: &mut InputBuffer, compressed_size: usize) -> Result<Self, XzError> {
        if compressed_size < 5 {
            return Err(XzError::ChunkTooSmall(compressed_size));
        }
        let first: u8 = input.read_byte().ok_or(XzError::InputExhausted)?;
        if first != 0 {
            return Err(XzError::NonZeroFirstRangeByte);
        }
        let mut code = 0u32;
        for _ in 0..4 {
            let byte: u32 = input.read_byte().ok_or(XzError::InputExhausted)?;
            code = (code << 8) | byte;
        }
        Ok(Self {
            range: u32::MAX,
            code,
            remaining: compressed_size - 5,
            overrun: false,
        })
    }

    /// Next payload byte, or zero with the overrun flag raised.
    fn next_byte(&mut self, input: &mut InputBuffer) -> u32 {
        if self.remaining == 0 {
            self.overrun = true;
            return 0;
        }
        self.remaining -= 1;
        input.read_byte().unwrap_or_else(|| {
            self.overrun = true;
            0
        })
    }

    /// Shifts in one byte when the interval has narrowed below 2^24.
    pub fn normalize(&mut self, input: &mut InputBuffer) {
        if self.range < RANGE_TOP {
            self.range <<= 8;
            self.code = (self.code << 8) | self.next_byte(input);
        }
    }

    /// Decodes one probability-adaptive bit, returning true for a set bit.
    pub fn is_bit_set(&mut self, prob: &mut u16, input: &mut InputBuffer) -> bool {
        self.normalize(input);
        let bound = (self.range >> PROB_BITS) * u32::from(*prob);
        if self.code < bound {
            self.range = bound;
            *prob += ((1 << PROB_BITS) - *prob) >> PROB_MOVE_BITS;
            false
        } else {
            self.range -= bound;
            self.code -= bound;
            *prob -= *prob >> PROB_MOVE_BITS;
            true
        }
    }

    /// Walks a balanced tree of `probs.len()` leaves from the most
    /// significant bit; returns the decoded symbol.
    pub fn bittree(&mut self, probs: &mut [u16], input: &mut InputBuffer) -> u32 {
        let mut symbol = 1usize;
        while symbol < probs.len() {
            symbol = (symbol << 1) | usize::from(self.is_bit_set(&mut probs[symbol], input));
        }
        (symbol - probs.len()) as u32
    }

    /// Walks the same tree emitting bits from the least significant end,
    /// adding each set bit into `dest`.
    pub fn bittree_reverse(
        &mut self,
        probs: &mut [u16],
        mut dest: u32,
        limit: u32,
        input: &mut InputBuffer,
    ) -> u32 {
        debug_assert!(limit > 0);
        let mut symbol = 1usize;
        for i in 0..limit {
            if self.is_bit_set(&mut probs[symbol], input) {
                symbol = (symbol << 1) | 1;
                dest += 1 << i;
            } else {
                symbol <<= 1;
            }
        }
        dest
    }

    /// Decodes `limit` equal-probability bits, most significant first.
    pub fn direct(&mut self, limit: u32, input: &mut InputBuffer) -> u32 {
        debug_assert!(limit > 0);
        let mut dest = 0u32;
        for _ in 0..limit {
            self.normalize(input);
            self.range >>= 1;
            let shifted = self.code.wrapping_sub(self.range);
            if shifted & (1 << 31) == 0 {
                self.code = shifted;
                dest = (dest << 1) | 1;
            } else {
                dest <<= 1;
            }
        }
        dest
    }

    /// True when the chunk ended exactly where the framer said it would:
    /// every payload byte consumed, none past it, and the code drained to
    /// zero as a well-formed stream guarantees.
    pub const fn is_complete(&self) -> bool {
        !self.overrun && self.remaining == 0 && self.code == 0
    }
}
