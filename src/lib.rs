//! # minixz
//! Single-shot decoder for XZ files holding one LZMA2-filtered block with
//! the fixed properties `lc=3, lp=0, pb=2`: the shape produced by
//! `xz -F xz -C crc32` (or `-C none`) on a single input.
//!
//! The whole compressed stream and the whole output live in caller-owned
//! buffers. A zero-length output buffer runs the size query instead of
//! decoding, so the usual sequence is two calls:
//!
//! ```
//! let compressed = include_bytes!("../tests/files/hello_world.xz");
//! let size = minixz::xz_decoded_size(compressed).unwrap();
//! let mut out = vec![0u8; size.max(minixz::DICT_SIZE_MIN)];
//! let n = minixz::xz_decode(compressed, &mut out).unwrap();
//! assert_eq!(&out[..n], b"hello world\n");
//! ```
//!
//! The output buffer must be at least as large as the dictionary declared
//! in the block header (`xz -0` keeps it at 256 KiB; the fixture above was
//! written with a 4 KiB dictionary).
//!
//! Two default-on cargo features pick the validation level: `meta-checks`
//! for structural validation of the block header, index and footer, and
//! `integrity-checks` for the CRC-32 comparisons. With both disabled only
//! known-good input produces meaningful output.
#![forbid(unsafe_code)]
#![deny(
    clippy::correctness,
    clippy::perf,
    clippy::complexity,
    clippy::style
)]
#![cfg_attr(
    not(test),
    deny(clippy::unwrap_used, clippy::missing_docs_in_private_items)
)]

/// Sliding-dictionary output buffer.
mod dict;

/// The public error enum.
mod error;

/// Bounded input cursor.
mod input;

/// LZMA2 chunk framing.
mod lzma2dec;

/// LZMA context model and state machine.
mod lzmadec;

/// Range (arithmetic) decoder.
mod rangedec;

/// Variable-length integers for the index.
mod vli;

/// XZ container framing and the public entry points.
mod xzstream;

pub use error::XzError;
pub use xzstream::{xz_decode, xz_decoded_size, xz_dictionary_size};

/// Smallest dictionary a block header can declare (size code 0).
pub const DICT_SIZE_MIN: usize = 4096;

/// Largest dictionary a block header can declare (size code 39, 3 GiB).
pub const DICT_SIZE_MAX: usize = 3 << 30;
