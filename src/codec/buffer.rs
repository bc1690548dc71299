//! # Bit Buffer
//!
//! Fixed-capacity byte storage viewed under one addressing mode.
//!
//! A unit is a whole byte in [`Addressing::Byte`] mode and a single bit in the
//! two bit modes, which pack 8 units per underlying byte and differ only in
//! which end of the byte holds unit 0. Every stage reads and writes through
//! this view, so all MSB/LSB and byte-offset arithmetic stays in this module.

/// How the units of a [`BitBuffer`] map onto its bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// One unit per byte
    Byte,

    /// One unit per bit, unit 0 is the least significant bit of byte 0
    LsbFirst,

    /// One unit per bit, unit 0 is the most significant bit of byte 0
    MsbFirst,
}

impl Addressing {
    /// Whether units are single bits
    pub fn is_bit(self) -> bool {
        !matches!(self, Addressing::Byte)
    }

    fn units_per_byte(self) -> usize {
        if self.is_bit() {
            8
        } else {
            1
        }
    }
}

/// Fixed-capacity buffer with partial consumption and production
///
/// `filled` units of valid content always start at unit 0. Reads are relative
/// to the start of the content, writes are relative to its end. Writes only
/// become content once [`BitBuffer::produce`] is called, which lets a stage
/// write speculatively and commit atomically.
///
/// The storage is never grown: `S` can be a `[u8; N]`, a `&mut [u8]` or a
/// `Vec<u8>` allocated once by the owner.
#[derive(Debug, Clone)]
pub struct BitBuffer<S> {
    storage: S,
    filled: usize,
    mode: Addressing,
}

impl<S: AsRef<[u8]> + AsMut<[u8]>> BitBuffer<S> {
    /// Create an empty buffer over `storage`
    pub fn new(storage: S, mode: Addressing) -> Self {
        Self::with_content(storage, mode, 0)
    }

    /// Create a buffer whose first `filled` units are already valid content
    ///
    /// `filled` is clamped to the buffer capacity.
    ///
    /// # Examples
    ///
    /// ```
    /// use x2d_codec::codec::{Addressing, BitBuffer};
    ///
    /// let buffer = BitBuffer::with_content([0b1000_0001u8], Addressing::MsbFirst, 8);
    /// assert_eq!(buffer.read(0), 1);
    /// assert_eq!(buffer.read(1), 0);
    /// assert_eq!(buffer.read(7), 1);
    /// ```
    pub fn with_content(storage: S, mode: Addressing, filled: usize) -> Self {
        let mut buffer = Self {
            storage,
            filled: 0,
            mode,
        };
        buffer.filled = filled.min(buffer.capacity());
        buffer
    }

    /// Addressing mode of the buffer
    pub fn mode(&self) -> Addressing {
        self.mode
    }

    /// Whether units are single bits
    pub fn is_bit_addressed(&self) -> bool {
        self.mode.is_bit()
    }

    /// Total capacity in units
    pub fn capacity(&self) -> usize {
        self.storage.as_ref().len() * self.mode.units_per_byte()
    }

    /// Number of valid, unconsumed units
    pub fn len(&self) -> usize {
        self.filled
    }

    /// Whether the buffer holds no content
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Number of units that can still be produced
    pub fn remaining(&self) -> usize {
        self.capacity() - self.filled
    }

    /// Whether `n` units starting at content `offset` are available to read
    pub fn has_available(&self, offset: usize, n: usize) -> bool {
        offset + n <= self.filled
    }

    /// Whether `n` units starting at `offset` past the content end can be written
    pub fn has_space(&self, offset: usize, n: usize) -> bool {
        self.filled + offset + n <= self.capacity()
    }

    /// Read the unit at `offset` from the start of the content
    ///
    /// Bit units are returned as 0 or 1.
    pub fn read(&self, offset: usize) -> u8 {
        debug_assert!(offset < self.filled, "read past content: {} >= {}", offset, self.filled);
        self.get_unit(offset)
    }

    /// Write the unit at `offset` past the end of the content
    ///
    /// Bit units keep only the least significant bit of `value`.
    pub fn write(&mut self, offset: usize, value: u8) {
        let unit = self.filled + offset;
        debug_assert!(unit < self.capacity(), "write past capacity: {} >= {}", unit, self.capacity());
        self.set_unit(unit, value);
    }

    /// Append one unit, returning false when the buffer is full
    pub fn push(&mut self, value: u8) -> bool {
        if !self.has_space(0, 1) {
            return false;
        }
        self.write(0, value);
        self.produce(1);
        true
    }

    /// Drop the first `n` units and move the rest to the front
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.filled);
        let remaining = self.filled - n;
        let per_byte = self.mode.units_per_byte();

        if n % per_byte == 0 {
            let start = n / per_byte;
            let end = self.filled.div_ceil(per_byte);
            self.storage.as_mut().copy_within(start..end, 0);
        } else {
            // Source index is always ahead of the destination
            for i in 0..remaining {
                let value = self.get_unit(n + i);
                self.set_unit(i, value);
            }
        }

        self.filled = remaining;
    }

    /// Commit `n` units written past the content end
    pub fn produce(&mut self, n: usize) {
        debug_assert!(self.has_space(0, n), "produce past capacity");
        self.filled = (self.filled + n).min(self.capacity());
    }

    /// Discard all content
    pub fn clear(&mut self) {
        self.filled = 0;
    }

    /// Iterate over the valid units
    pub fn units(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.filled).map(move |i| self.get_unit(i))
    }

    /// Physical bytes holding the valid content
    ///
    /// In bit modes the last byte may hold a partial group whose unused
    /// units are unspecified.
    pub fn as_bytes(&self) -> &[u8] {
        let end = self.filled.div_ceil(self.mode.units_per_byte());
        &self.storage.as_ref()[..end]
    }

    /// Give back the underlying storage
    pub fn into_inner(self) -> S {
        self.storage
    }

    fn locate(&self, unit: usize) -> (usize, u32) {
        match self.mode {
            Addressing::Byte => (unit, 0),
            Addressing::LsbFirst => (unit / 8, (unit % 8) as u32),
            Addressing::MsbFirst => (unit / 8, 7 - (unit % 8) as u32),
        }
    }

    fn get_unit(&self, unit: usize) -> u8 {
        let (index, shift) = self.locate(unit);
        let byte = self.storage.as_ref()[index];
        match self.mode {
            Addressing::Byte => byte,
            _ => (byte >> shift) & 0x01,
        }
    }

    fn set_unit(&mut self, unit: usize, value: u8) {
        let (index, shift) = self.locate(unit);
        let mode = self.mode;
        let byte = &mut self.storage.as_mut()[index];
        match mode {
            Addressing::Byte => *byte = value,
            _ => {
                *byte &= !(1 << shift);
                *byte |= (value & 0x01) << shift;
            }
        }
    }
}
