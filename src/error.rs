use thiserror::Error;

/// All the ways a decode can fail. Every variant is fatal; nothing is
/// retried, and the output buffer contents are undefined after an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum XzError {
    /// The input ended before the structure being read was complete.
    #[error("input exhausted")]
    InputExhausted,

    /// A padding byte that must be zero was not.
    #[error("non-zero padding byte")]
    NonZeroPadding,

    /// The stream does not start with `FD 37 7A 58 5A 00`.
    #[error("stream header magic number mismatch")]
    StreamHeaderMagicMismatch,

    /// Stream flags other than the check type are set.
    #[error("unsupported stream flags {0:#06x}")]
    UnsupportedStreamFlags(u16),

    /// Check type other than none or CRC-32.
    #[error("unsupported check type {0}")]
    UnsupportedCheckType(u8),

    /// The block header is not the fixed 12-byte single-filter layout.
    #[error("unexpected block header size {0}")]
    UnexpectedBlockHeaderSize(usize),

    /// Compressed/uncompressed size fields or extra filters are present.
    #[error("unsupported block flags {0:#04x}")]
    UnsupportedBlockFlags(u8),

    /// The single filter must be LZMA2 (`0x21`).
    #[error("unsupported filter id {0:#04x}")]
    UnsupportedFilter(u8),

    /// Dictionary size code above 39 or a property count other than one.
    #[error("invalid dictionary size code {0}")]
    InvalidDictionarySize(u8),

    /// The declared dictionary does not fit the caller's output buffer.
    #[error("dictionary size {dictionary} exceeds output buffer {output}")]
    DictionaryTooLarge {
        /// Dictionary size decoded from the block header.
        dictionary: usize,
        /// Length of the caller-provided output buffer.
        output: usize,
    },

    /// The LZMA2 filter must declare exactly one property byte.
    #[error("unexpected filter property count {0}")]
    UnexpectedFilterProperties(u8),

    /// Variable-length integer longer than 9 bytes or zero-terminated.
    #[error("invalid variable-length integer")]
    InvalidVli,

    /// The byte after the block payload was not the index indicator;
    /// a second block is not supported.
    #[error("expected index indicator")]
    MissingIndexIndicator,

    /// The index lists more than the single supported block.
    #[error("index block count {0} (single-block streams only)")]
    UnexpectedBlockCount(u64),

    /// The index's unpadded-size entry disagrees with the decoded block.
    #[error("index unpadded size {actual}, block was {expected}")]
    UnpaddedSizeMismatch {
        /// Size read from the index.
        actual: u64,
        /// Size observed while decoding the block.
        expected: u64,
    },

    /// The index's uncompressed-size entry disagrees with the decoded block.
    #[error("index uncompressed size {actual}, block was {expected}")]
    UncompressedSizeMismatch {
        /// Size read from the index.
        actual: u64,
        /// Size observed while decoding the block.
        expected: u64,
    },

    /// The stream footer does not end in `YZ`.
    #[error("footer magic number mismatch")]
    FooterMagicMismatch,

    /// The footer repeats different stream flags than the header.
    #[error("footer flags do not match stream header")]
    FooterFlagsMismatch,

    /// The footer's backward size does not describe the index.
    #[error("footer backward size {actual}, index size {expected}")]
    BackwardSizeMismatch {
        /// `backwardSize * 4` read from the footer.
        actual: u64,
        /// Observed index size in bytes.
        expected: u64,
    },

    /// CRC-32 of the stream header flags does not match.
    #[error("stream header crc32 {actual:#010x}, expected {expected:#010x}")]
    StreamHeaderCrc32Mismatch {
        /// Computed checksum.
        actual: u32,
        /// Checksum stored in the stream.
        expected: u32,
    },

    /// CRC-32 of the block header does not match.
    #[error("block header crc32 {actual:#010x}, expected {expected:#010x}")]
    BlockHeaderCrc32Mismatch {
        /// Computed checksum.
        actual: u32,
        /// Checksum stored in the stream.
        expected: u32,
    },

    /// CRC-32 of the decompressed block does not match.
    #[error("content crc32 {actual:#010x}, expected {expected:#010x}")]
    ContentCrc32Mismatch {
        /// Computed checksum.
        actual: u32,
        /// Checksum stored in the stream.
        expected: u32,
    },

    /// CRC-32 of the index does not match.
    #[error("index crc32 {actual:#010x}, expected {expected:#010x}")]
    IndexCrc32Mismatch {
        /// Computed checksum.
        actual: u32,
        /// Checksum stored in the stream.
        expected: u32,
    },

    /// CRC-32 of the stream footer does not match.
    #[error("footer crc32 {actual:#010x}, expected {expected:#010x}")]
    FooterCrc32Mismatch {
        /// Computed checksum.
        actual: u32,
        /// Checksum stored in the stream.
        expected: u32,
    },

    /// LZMA2 control byte outside the supported LZMA-chunk range. This
    /// includes the uncompressed-chunk controls `0x01` and `0x02`.
    #[error("unsupported LZMA2 chunk control {0:#04x}")]
    UnsupportedChunkControl(u8),

    /// The first LZMA2 chunk did not perform a full reset.
    #[error("LZMA2 stream must begin with a full reset")]
    FullResetExpected,

    /// An LZMA2 stream holding only the terminator byte; at least one
    /// chunk is required.
    #[error("LZMA2 stream contains no chunks")]
    EmptyLzma2Stream,

    /// A properties-only reset, which this profile rejects.
    #[error("properties-only reset not supported")]
    PropertyResetUnsupported,

    /// Property byte other than `0x5D` (`lc=3, lp=0, pb=2`).
    #[error("unsupported LZMA properties {0:#04x}")]
    UnsupportedLzmaProperties(u8),

    /// The first byte of a range-coded chunk must be zero.
    #[error("non-zero leading range coder byte")]
    NonZeroFirstRangeByte,

    /// A compressed chunk size too small to hold the range coder header.
    #[error("chunk compressed size {0} too small")]
    ChunkTooSmall(usize),

    /// The encoder's end-of-stream marker, which this profile forbids:
    /// streams terminate via the LZMA2 control byte instead.
    #[error("unexpected end-of-stream marker")]
    EndMarker,

    /// A match referenced data before the start of the output.
    #[error("match distance exceeds decoded data")]
    InvalidDistance,

    /// A chunk did not consume exactly its compressed bytes or did not
    /// produce exactly its uncompressed bytes.
    #[error("corrupt LZMA data")]
    CorruptLzmaData,
}

impl XzError {
    /// True when the failure was an integrity (CRC-32) mismatch rather than
    /// a structural or decode failure. Only such errors indicate that the
    /// framing was understood but the payload or metadata was damaged.
    #[must_use]
    pub const fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            Self::StreamHeaderCrc32Mismatch { .. }
                | Self::BlockHeaderCrc32Mismatch { .. }
                | Self::ContentCrc32Mismatch { .. }
                | Self::IndexCrc32Mismatch { .. }
                | Self::FooterCrc32Mismatch { .. }
        )
    }
}
