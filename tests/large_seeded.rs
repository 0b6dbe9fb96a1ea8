//! The 4 MiB incompressible-ish fixture: pseudo-random data derived from a
//! chained SHA-256 over a fixed seed, masked to the low nibble so the
//! encoder still produces LZMA chunks. Spans dozens of chunks, which
//! exercises the no-reset continuation path at scale.

use sha2::{Digest, Sha256};

/// Advances the seed by one hash round.
fn extend(seed: &mut [u8; 32]) {
    let mut sha = Sha256::new();
    Digest::update(&mut sha, &seed);
    seed.copy_from_slice(sha.finalize().as_slice());
}

/// The documented generator: seed of 32 `0x45` bytes, chained SHA-256,
/// every byte masked with `0x0F`.
fn noise(size: usize) -> Vec<u8> {
    let mut seed = [0x45u8; 32];
    let mut out = Vec::with_capacity(size + 32);
    while out.len() < size {
        extend(&mut seed);
        out.extend_from_slice(seed.as_slice());
    }
    out.truncate(size);
    for byte in &mut out {
        *byte &= 0x0F;
    }
    out
}

#[test]
fn four_mebibytes_of_noise() {
    let compressed = include_bytes!("files/noise_4mib.xz");
    let expected = noise(4 << 20);

    let digest = Sha256::digest(&expected);
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    assert_eq!(
        hex,
        "acdebbb1e432504c8e59ba7d78f7d9545a9820a9ff05b202201de556cc477b78"
    );

    let size = minixz::xz_decoded_size(compressed).unwrap();
    assert_eq!(size, expected.len());

    let mut out = vec![0u8; size];
    let decoded = minixz::xz_decode(compressed, &mut out).unwrap();
    assert_eq!(decoded, size);
    assert_eq!(out, expected);
}
