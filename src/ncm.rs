use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, KeyInit};
use aes::Aes128;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Error, Result};
use crate::metadata::{Metadata, MusicFormat};
use crate::tag::write_tags;

/// AES key for the key block at the start of the container.
const CORE_KEY: [u8; 16] = [
  0x68, 0x7A, 0x48, 0x52, 0x41, 0x6D, 0x73, 0x6F, 0x35, 0x6B, 0x49, 0x6E, 0x62, 0x61, 0x78, 0x57,
];

/// AES key for the metadata block.
const META_KEY: [u8; 16] = [
  0x23, 0x31, 0x34, 0x6C, 0x6A, 0x6B, 0x5F, 0x21, 0x5C, 0x5D, 0x26, 0x30, 0x55, 0x3C, 0x27, 0x28,
];

fn split(x: &mut [u8], n: usize) -> Result<(&mut [u8], &mut [u8])> {
  if n <= x.len() {
    Ok(x.split_at_mut(n))
  } else {
    Err(Error::UnexpectedEof)
  }
}

fn read_u32(x: &mut [u8]) -> Result<(u32, &mut [u8])> {
  let (n, x) = split(x, 4)?;
  Ok((u32::from_le_bytes([n[0], n[1], n[2], n[3]]), x))
}

/// AES-128-ECB decrypt in place, returning the buffer with its pkcs7
/// padding stripped.
fn aes_ecb_decrypt<'a>(key: &[u8; 16], buf: &'a mut [u8]) -> Result<&'a mut [u8]> {
  let n = buf.len();
  if n == 0 || n % 16 != 0 {
    return Err(Error::BadAes);
  }
  let aes = Aes128::new(GenericArray::from_slice(key));
  for block in buf.chunks_exact_mut(16) {
    aes.decrypt_block(GenericArray::from_mut_slice(block));
  }
  let pad = buf[n - 1] as usize;
  Ok(if pad <= 16 { &mut buf[..n - pad] } else { buf })
}

/// Build the RC4-style key box used to unscramble the audio payload.
fn key_box(key: &[u8]) -> [u8; 256] {
  let mut boxed = [0u8; 256];
  for (i, x) in boxed.iter_mut().enumerate() {
    *x = i as u8;
  }

  let mut last_pos = 0usize;
  let mut offset = 0usize;
  for i in 0..256 {
    let pos = (boxed[i] as usize + last_pos + key[offset] as usize) & 0xFF;
    boxed.swap(i, pos);
    offset += 1;
    if offset >= key.len() {
      offset = 0;
    }
    last_pos = pos;
  }
  boxed
}

fn unscramble(audio: &mut [u8], key_box: &[u8; 256]) {
  for (i, x) in audio.iter_mut().enumerate() {
    let j = (i + 1) & 0xFF;
    let a = key_box[j] as usize;
    *x ^= key_box[(a + key_box[(a + j) & 0xFF] as usize) & 0xFF];
  }
}

fn decode_metadata(block: &mut [u8]) -> Result<Metadata> {
  // the block is prefixed with "163 key(Don't modify):"
  let (_, block) = split(block, 22)?;
  for x in block.iter_mut() {
    *x ^= 0x63;
  }
  let mut decoded = STANDARD.decode(&*block).map_err(|_| Error::BadBase64)?;
  let plain = aes_ecb_decrypt(&META_KEY, &mut decoded)?;
  // the decrypted json is prefixed with "music:"
  let (_, plain) = split(plain, 6)?;
  Ok(serde_json::from_slice(plain)?)
}

/// Decrypt an ncm container in place, sniff the audio format and
/// rewrite the recovered tags into the audio.
///
/// The input buffer is clobbered in the process; the rewritten audio
/// ends up in [`Metadata::data`].
pub fn transform(ncm: &mut [u8]) -> Result<Metadata> {
  transform_as(ncm, None)
}

/// Same as [`transform`], but treat the decrypted audio as `format`
/// instead of sniffing the container from its leading bytes.
pub fn transform_as(ncm: &mut [u8], format: Option<MusicFormat>) -> Result<Metadata> {
  let (magic1, ncm) = read_u32(ncm)?;
  let (magic2, ncm) = read_u32(ncm)?;
  if magic1 != 0x4e45_5443 || magic2 != 0x4d41_4446 {
    return Err(Error::BadMagic);
  }
  let (_, ncm) = split(ncm, 2)?;

  // key block: xor mask, then aes, then the "neteasecloudmusic" prefix
  let (n, ncm) = read_u32(ncm)?;
  let (key, ncm) = split(ncm, n as usize)?;
  for x in key.iter_mut() {
    *x ^= 0x64;
  }
  let key = aes_ecb_decrypt(&CORE_KEY, key)?;
  let (_, key) = split(key, 17)?;
  if key.is_empty() {
    return Err(Error::UnexpectedEof);
  }
  let key_box = key_box(key);

  let (n, mut ncm) = read_u32(ncm)?;
  let mut metadata = if n == 0 {
    Metadata::default()
  } else {
    let (block, rest) = split(ncm, n as usize)?;
    ncm = rest;
    decode_metadata(block)?
  };

  // crc32 of the metadata block plus a charset byte, neither checked
  let (_, ncm) = split(ncm, 9)?;

  let (n, mut ncm) = read_u32(ncm)?;
  if n != 0 {
    let (image, rest) = split(ncm, n as usize)?;
    ncm = rest;
    metadata.image = image.to_vec();
  }

  unscramble(ncm, &key_box);
  metadata.format = match format {
    Some(format) => format,
    None => match ncm.get(..3) {
      Some(b"ID3") => MusicFormat::Mp3,
      Some(_) => MusicFormat::Flac,
      None => return Err(Error::UnexpectedEof),
    },
  };

  metadata.data = write_tags(&metadata, ncm)?;
  Ok(metadata)
}
