use crate::dict::DictBuffer;
use crate::error::XzError;
use crate::input::InputBuffer;
use crate::lzmadec::LzmaDecoder;
use crate::rangedec::RangeDecoder;
use log::trace;

/// The only property byte this profile accepts:
/// `(pb * 5 + lp) * 9 + lc` with `pb=2, lp=0, lc=3`.
const LZMA_PROPERTIES: u8 = 0x5D;

/// What an LZMA chunk's control byte asks to be reset before decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reset {
    /// Continue with the carried-over state and probabilities.
    None,
    /// Fresh probabilities and match state, dictionary kept.
    State,
    /// Everything fresh, including the dictionary. Starts every stream.
    Full,
}

/// One parsed LZMA chunk header.
#[derive(Debug)]
struct ChunkHeader {
    /// Uncompressed size of the chunk, 1-based fields already applied.
    raw_size: usize,
    /// Compressed payload size including the range coder bootstrap.
    compressed_size: usize,
    /// Reset level requested by the control byte.
    reset: Reset,
}

/// Reads the next chunk header, or None at the stream terminator.
///
/// Uncompressed chunks (`0x01`, `0x02`) are not part of this profile and
/// are rejected outright; so is a properties-only reset, which cannot occur
/// in a stream that never contains an uncompressed chunk.
fn read_chunk_header(input: &mut InputBuffer) -> Result<Option<ChunkHeader>, XzError> {
    let control: u8 = input.read_byte().ok_or(XzError::InputExhausted)?;
    if control == 0 {
        return Ok(None);
    }
    if control < 0x80 {
        return Err(XzError::UnsupportedChunkControl(control));
    }
    let info = input.seek(4).ok_or(XzError::InputExhausted)?;
    let raw_size =
        ((usize::from(control & 0x1F) << 16) | (usize::from(info[0]) << 8) | usize::from(info[1]))
            + 1;
    let compressed_size = ((usize::from(info[2]) << 8) | usize::from(info[3])) + 1;
    let reset = match (control >> 5) & 3 {
        0 => Reset::None,
        1 => Reset::State,
        2 => return Err(XzError::PropertyResetUnsupported),
        _ => {
            let props: u8 = input.read_byte().ok_or(XzError::InputExhausted)?;
            if props != LZMA_PROPERTIES {
                return Err(XzError::UnsupportedLzmaProperties(props));
            }
            Reset::Full
        }
    };
    Ok(Some(ChunkHeader {
        raw_size,
        compressed_size,
        reset,
    }))
}

/// Decodes the whole LZMA2 stream into the dictionary; returns the number
/// of uncompressed bytes produced.
pub fn decode_stream(input: &mut InputBuffer, dict: &mut DictBuffer) -> Result<usize, XzError> {
    // ~14 KiB of probabilities; the one heap allocation of a decode call
    let mut lzma = Box::new(LzmaDecoder::new());
    let mut first = true;
    let mut total = 0usize;
    while let Some(chunk) = read_chunk_header(input)? {
        trace!(
            "lzma2 chunk: raw {} compressed {} reset {:?}",
            chunk.raw_size,
            chunk.compressed_size,
            chunk.reset
        );
        if first && chunk.reset != Reset::Full {
            return Err(XzError::FullResetExpected);
        }
        first = false;
        if chunk.reset != Reset::None {
            lzma.reset();
        }
        dict.set_limit(chunk.raw_size)?;
        let mut rc = RangeDecoder::new(input, chunk.compressed_size)?;
        lzma.decode(&mut rc, input, dict)?;
        if !rc.is_complete() {
            return Err(XzError::CorruptLzmaData);
        }
        let (complete, written) = dict.is_complete();
        if !complete || written != chunk.raw_size {
            return Err(XzError::CorruptLzmaData);
        }
        total += written;
    }
    // a lone terminator never enters the loop; such a stream is invalid
    if first {
        return Err(XzError::EmptyLzma2Stream);
    }
    Ok(total)
}

/// Walks the chunk headers without decoding, tallying the uncompressed
/// size. The same validation applies as in decode mode; only the range
/// coding itself is skipped.
pub fn stream_size(input: &mut InputBuffer) -> Result<usize, XzError> {
    let mut first = true;
    let mut total = 0usize;
    while let Some(chunk) = read_chunk_header(input)? {
        if first && chunk.reset != Reset::Full {
            return Err(XzError::FullResetExpected);
        }
        first = false;
        input
            .seek(chunk.compressed_size)
            .ok_or(XzError::InputExhausted)?;
        total += chunk.raw_size;
    }
    if first {
        return Err(XzError::EmptyLzma2Stream);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminator_ends_the_stream() {
        let mut input = InputBuffer::new(&[0x00]);
        assert!(read_chunk_header(&mut input).unwrap().is_none());
    }

    #[test]
    fn bare_terminator_stream_rejected() {
        // a stream must hold at least one chunk before the terminator
        let mut input = InputBuffer::new(&[0x00]);
        let mut storage = [0u8; 4];
        let mut dict = DictBuffer::new(&mut storage);
        assert_eq!(
            decode_stream(&mut input, &mut dict).unwrap_err(),
            XzError::EmptyLzma2Stream
        );

        let mut input = InputBuffer::new(&[0x00]);
        assert_eq!(
            stream_size(&mut input).unwrap_err(),
            XzError::EmptyLzma2Stream
        );
    }

    #[test]
    fn uncompressed_chunks_rejected() {
        for control in [0x01u8, 0x02, 0x7F] {
            let data = [control, 0, 0, 0, 0, 0];
            let mut input = InputBuffer::new(&data);
            assert_eq!(
                read_chunk_header(&mut input).unwrap_err(),
                XzError::UnsupportedChunkControl(control)
            );
        }
    }

    #[test]
    fn sizes_are_one_based() {
        // control 0xE3: full reset, raw high bits 0x3
        let data = [0xE3, 0x01, 0x02, 0x00, 0x11, 0x5D];
        let mut input = InputBuffer::new(&data);
        let chunk = read_chunk_header(&mut input).unwrap().unwrap();
        assert_eq!(chunk.raw_size, 0x3_0102 + 1);
        assert_eq!(chunk.compressed_size, 0x11 + 1);
        assert_eq!(chunk.reset, Reset::Full);
    }

    #[test]
    fn property_byte_only_on_full_reset() {
        // 0xC0: properties-only reset is the stricter framer's hard error
        let mut input = InputBuffer::new(&[0xC0, 0, 0, 0, 0, 0x5D]);
        assert_eq!(
            read_chunk_header(&mut input).unwrap_err(),
            XzError::PropertyResetUnsupported
        );
        // 0x80/0xA0 carry no property byte
        let mut input = InputBuffer::new(&[0xA5, 0, 0, 0, 0]);
        let chunk = read_chunk_header(&mut input).unwrap().unwrap();
        assert_eq!(chunk.reset, Reset::State);
        assert_eq!(chunk.raw_size, (5 << 16) + 1);
    }

    #[test]
    fn wrong_properties_rejected() {
        let mut input = InputBuffer::new(&[0xE0, 0, 0, 0, 0, 0x5E]);
        assert_eq!(
            read_chunk_header(&mut input).unwrap_err(),
            XzError::UnsupportedLzmaProperties(0x5E)
        );
    }

    #[test]
    fn stream_must_open_with_a_full_reset() {
        let data = [0x80, 0x00, 0x00, 0x00, 0x05, 0, 0, 0, 0, 0, 0, 0x00];
        let mut input = InputBuffer::new(&data);
        assert_eq!(
            stream_size(&mut input).unwrap_err(),
            XzError::FullResetExpected
        );
    }

    #[test]
    fn size_query_sums_chunk_sizes() {
        // two chunks, 6-byte payloads each, arbitrary compressed bytes
        let mut data = vec![0xE0u8, 0x00, 0x05, 0x00, 0x09, 0x5D];
        data.extend_from_slice(&[0u8; 10]);
        data.extend_from_slice(&[0xA0, 0x00, 0x05, 0x00, 0x09]);
        data.extend_from_slice(&[0u8; 10]);
        data.push(0x00);
        let mut input = InputBuffer::new(&data);
        assert_eq!(stream_size(&mut input).unwrap(), 12);
        assert_eq!(input.offset(), data.len());
    }
}
