use crate::dict::DictBuffer;
use crate::error::XzError;
use crate::input::InputBuffer;
use crate::lzma2dec;
use crate::vli::decode_vli;
use log::debug;

/// Leading magic of every XZ stream.
const STREAM_MAGIC: &[u8] = b"\xFD7zXZ\x00";

/// Trailing magic of the stream footer.
const FOOTER_MAGIC: &[u8] = b"YZ";

/// Decompresses a whole XZ stream from `input` into `output`, returning
/// the decompressed length. The stream must hold a single LZMA2-filtered
/// block with properties `lc=3, lp=0, pb=2`.
///
/// An empty `output` switches to size-query mode: the input is walked far
/// enough to compute the total uncompressed size, which is returned without
/// anything being written. Callers size their real buffer from that pass;
/// the buffer must also be at least as large as the dictionary declared in
/// the block header.
///
/// # Errors
/// Any structural, integrity, decode or buffer problem aborts the call;
/// see [`XzError`]. The output buffer contents are undefined after an
/// error. [`XzError::is_integrity_error`] distinguishes checksum mismatches
/// from the rest.
pub fn xz_decode(input: &[u8], output: &mut [u8]) -> Result<usize, XzError> {
    if output.is_empty() {
        decode_inner(input, None)
    } else {
        decode_inner(input, Some(output))
    }
}

/// Computes the decompressed size of `input` without producing output.
///
/// # Errors
/// Same conditions as [`xz_decode`], minus anything requiring the output.
pub fn xz_decoded_size(input: &[u8]) -> Result<usize, XzError> {
    decode_inner(input, None)
}

/// Reads the dictionary size the block header declares. The output buffer
/// handed to [`xz_decode`] must be at least this large, so callers sizing
/// it from the query pass take the larger of the two values.
///
/// # Errors
/// Fails on a truncated header or a dictionary size code above 39.
pub fn xz_dictionary_size(input: &[u8]) -> Result<usize, XzError> {
    let mut cursor = InputBuffer::new(input);
    decode_stream_header(&mut cursor)?;
    let header = cursor.seek(12).ok_or(XzError::InputExhausted)?;
    let code = header[4];
    if code > 39 {
        return Err(XzError::InvalidDictionarySize(code));
    }
    Ok(dictionary_size(code))
}

/// Dictionary size encoded by a block-header size code below 40.
const fn dictionary_size(code: u8) -> usize {
    (2 + (code & 1) as usize) << ((code >> 1) + 11)
}

/// CRC-32 as the format uses it (IEEE, reflected), over one buffer.
#[cfg(feature = "integrity-checks")]
fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Little-endian u32 out of a checked 4-byte view.
fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Parses the 12-byte stream header; returns the two stream-flag bytes.
/// The checksum size follows from the check-type byte.
fn decode_stream_header(input: &mut InputBuffer) -> Result<[u8; 2], XzError> {
    let header = input.seek(12).ok_or(XzError::InputExhausted)?;
    if cfg!(feature = "meta-checks") {
        if &header[..6] != STREAM_MAGIC {
            return Err(XzError::StreamHeaderMagicMismatch);
        }
        if header[6] != 0 {
            return Err(XzError::UnsupportedStreamFlags(u16::from_le_bytes([
                header[6], header[7],
            ])));
        }
        if header[7] > 1 {
            return Err(XzError::UnsupportedCheckType(header[7]));
        }
    }
    #[cfg(feature = "integrity-checks")]
    {
        let expected = read_u32_le(&header[8..12]);
        let actual = crc32(&header[6..8]);
        if actual != expected {
            return Err(XzError::StreamHeaderCrc32Mismatch { actual, expected });
        }
    }
    Ok([header[6], header[7]])
}

/// Parses the fixed 12-byte block header: one LZMA2 filter, one property
/// byte holding the dictionary size code. `output_len` is None in
/// size-query mode, where the dictionary cannot be compared to anything.
fn decode_block_header(
    input: &mut InputBuffer,
    output_len: Option<usize>,
) -> Result<(), XzError> {
    let header = input.seek(12).ok_or(XzError::InputExhausted)?;
    if cfg!(feature = "meta-checks") {
        let header_size = (usize::from(header[0]) + 1) * 4;
        if header_size != 12 {
            return Err(XzError::UnexpectedBlockHeaderSize(header_size));
        }
        if header[1] != 0 {
            return Err(XzError::UnsupportedBlockFlags(header[1]));
        }
        if header[2] != 0x21 {
            return Err(XzError::UnsupportedFilter(header[2]));
        }
        if header[3] != 1 {
            return Err(XzError::UnexpectedFilterProperties(header[3]));
        }
        let code = header[4];
        if code > 39 {
            return Err(XzError::InvalidDictionarySize(code));
        }
        let dictionary = dictionary_size(code);
        if let Some(output) = output_len {
            if dictionary > output {
                return Err(XzError::DictionaryTooLarge { dictionary, output });
            }
        }
        if header[5..8] != [0, 0, 0] {
            return Err(XzError::NonZeroPadding);
        }
    }
    #[cfg(feature = "integrity-checks")]
    {
        let expected = read_u32_le(&header[8..12]);
        let actual = crc32(&header[..8]);
        if actual != expected {
            return Err(XzError::BlockHeaderCrc32Mismatch { actual, expected });
        }
    }
    Ok(())
}

/// Validates the index against the decoded block and returns the index
/// size in bytes (indicator through padding, checksum excluded).
fn decode_index(
    input: &mut InputBuffer,
    data: &[u8],
    unpadded: u64,
    uncompressed: u64,
) -> Result<u64, XzError> {
    let index_start = input.offset();
    let indicator: u8 = input.read_byte().ok_or(XzError::InputExhausted)?;
    if indicator != 0 {
        return Err(XzError::MissingIndexIndicator);
    }
    let count = decode_vli(input)?;
    if count != 1 {
        return Err(XzError::UnexpectedBlockCount(count));
    }
    let actual = decode_vli(input)?;
    if actual != unpadded {
        return Err(XzError::UnpaddedSizeMismatch {
            actual,
            expected: unpadded,
        });
    }
    let actual = decode_vli(input)?;
    if actual != uncompressed {
        return Err(XzError::UncompressedSizeMismatch {
            actual,
            expected: uncompressed,
        });
    }
    input.align4()?;
    let index_size = input.offset() - index_start;
    let check = input.seek(4).ok_or(XzError::InputExhausted)?;
    #[cfg(feature = "integrity-checks")]
    {
        let expected = read_u32_le(check);
        let actual = crc32(&data[index_start..index_start + index_size]);
        if actual != expected {
            return Err(XzError::IndexCrc32Mismatch { actual, expected });
        }
    }
    #[cfg(not(feature = "integrity-checks"))]
    let _ = (check, data);
    Ok(index_size as u64)
}

/// Validates the 12-byte stream footer against the index and header flags.
fn decode_stream_footer(
    input: &mut InputBuffer,
    index_size: u64,
    stream_flags: [u8; 2],
) -> Result<(), XzError> {
    let footer = input.seek(12).ok_or(XzError::InputExhausted)?;
    if &footer[10..12] != FOOTER_MAGIC {
        return Err(XzError::FooterMagicMismatch);
    }
    #[cfg(feature = "integrity-checks")]
    {
        let expected = read_u32_le(&footer[..4]);
        let actual = crc32(&footer[4..10]);
        if actual != expected {
            return Err(XzError::FooterCrc32Mismatch { actual, expected });
        }
    }
    let backward = u64::from(read_u32_le(&footer[4..8])) * 4;
    if backward != index_size {
        return Err(XzError::BackwardSizeMismatch {
            actual: backward,
            expected: index_size,
        });
    }
    if footer[8..10] != stream_flags {
        return Err(XzError::FooterFlagsMismatch);
    }
    Ok(())
}

/// The shared single pass behind both entry points. `output` of None runs
/// the size query. All decoder state lives in this call frame, so
/// independent decodes never interfere.
fn decode_inner(data: &[u8], mut output: Option<&mut [u8]>) -> Result<usize, XzError> {
    let mut input = InputBuffer::new(data);
    let stream_flags = decode_stream_header(&mut input)?;
    let check_size = if stream_flags[1] == 0 { 0 } else { 4 };
    decode_block_header(&mut input, output.as_deref().map(<[u8]>::len))?;

    let block_start = input.offset();
    let total = match output.as_deref_mut() {
        Some(out) => {
            let mut dict = DictBuffer::new(out);
            lzma2dec::decode_stream(&mut input, &mut dict)?
        }
        None => lzma2dec::stream_size(&mut input)?,
    };
    let unpadded = (12 + (input.offset() - block_start) + check_size) as u64;
    input.align4()?;

    if check_size != 0 {
        let check = input.seek(4).ok_or(XzError::InputExhausted)?;
        #[cfg(feature = "integrity-checks")]
        if let Some(out) = output.as_deref() {
            let expected = read_u32_le(check);
            let actual = crc32(&out[..total]);
            if actual != expected {
                return Err(XzError::ContentCrc32Mismatch { actual, expected });
            }
        }
        #[cfg(not(feature = "integrity-checks"))]
        let _ = check;
    }

    if cfg!(feature = "meta-checks") {
        let index_size = decode_index(&mut input, data, unpadded, total as u64)?;
        decode_stream_footer(&mut input, index_size, stream_flags)?;
    }
    debug!(
        "decoded {total} bytes from {} input bytes",
        input.offset()
    );
    Ok(total)
}

// the header fixtures below stamp real CRCs, so both validation layers
// must be compiled in
#[cfg(all(test, feature = "meta-checks", feature = "integrity-checks"))]
mod tests {
    use super::*;

    /// Builds the 12 header bytes for the given flag pair.
    fn stream_header(flags: [u8; 2]) -> Vec<u8> {
        let mut header = STREAM_MAGIC.to_vec();
        header.extend_from_slice(&flags);
        header.extend_from_slice(&crc32fast::hash(&flags).to_le_bytes());
        header
    }

    #[test]
    fn stream_header_round_trip() {
        let data = stream_header([0, 1]);
        let mut input = InputBuffer::new(&data);
        assert_eq!(decode_stream_header(&mut input).unwrap(), [0, 1]);
    }

    #[test]
    fn stream_header_rejects_bad_magic_and_flags() {
        let mut data = stream_header([0, 1]);
        data[0] ^= 0xFF;
        let mut input = InputBuffer::new(&data);
        assert_eq!(
            decode_stream_header(&mut input).unwrap_err(),
            XzError::StreamHeaderMagicMismatch
        );

        let data = stream_header([0, 4]); // CRC-64
        let mut input = InputBuffer::new(&data);
        assert_eq!(
            decode_stream_header(&mut input).unwrap_err(),
            XzError::UnsupportedCheckType(4)
        );

        let data = stream_header([2, 1]);
        let mut input = InputBuffer::new(&data);
        assert_eq!(
            decode_stream_header(&mut input).unwrap_err(),
            XzError::UnsupportedStreamFlags(0x0102)
        );
    }

    #[test]
    fn stream_header_crc_must_match() {
        let mut data = stream_header([0, 1]);
        data[8] ^= 1;
        let mut input = InputBuffer::new(&data);
        let err = decode_stream_header(&mut input).unwrap_err();
        assert!(err.is_integrity_error());
    }

    /// Builds the fixed block header for a dictionary size code.
    fn block_header(code: u8) -> Vec<u8> {
        let mut header = vec![0x02, 0x00, 0x21, 0x01, code, 0, 0, 0];
        header.extend_from_slice(&crc32fast::hash(&header).to_le_bytes());
        header
    }

    #[test]
    fn block_header_round_trip() {
        let data = block_header(0); // 4 KiB dictionary
        let mut input = InputBuffer::new(&data);
        decode_block_header(&mut input, Some(4096)).unwrap();

        let mut input = InputBuffer::new(&data);
        assert_eq!(
            decode_block_header(&mut input, Some(4095)).unwrap_err(),
            XzError::DictionaryTooLarge {
                dictionary: 4096,
                output: 4095
            }
        );

        // size query skips the output comparison
        let mut input = InputBuffer::new(&data);
        decode_block_header(&mut input, None).unwrap();
    }

    #[test]
    fn block_header_rejects_foreign_filters() {
        let mut data = vec![0x02, 0x00, 0x04, 0x01, 0, 0, 0, 0]; // x86 BCJ
        let crc = crc32fast::hash(&data).to_le_bytes();
        data.extend_from_slice(&crc);
        let mut input = InputBuffer::new(&data);
        assert_eq!(
            decode_block_header(&mut input, None).unwrap_err(),
            XzError::UnsupportedFilter(0x04)
        );
    }

    #[test]
    fn dictionary_size_codes_decode_per_formula() {
        for (code, size) in [(0u8, 4096usize), (1, 6144), (2, 8192), (39, 3 << 30)] {
            let decoded = (2 + usize::from(code & 1)) << ((code >> 1) + 11);
            assert_eq!(decoded, size);
        }
        let data = block_header(40);
        let mut input = InputBuffer::new(&data);
        assert_eq!(
            decode_block_header(&mut input, None).unwrap_err(),
            XzError::InvalidDictionarySize(40)
        );
    }
}
