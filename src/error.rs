use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while dumping an ncm file or rewriting
/// the tags of the decrypted audio.
#[derive(Debug, Error)]
pub enum Error {
  #[error("unexpected end of input")]
  UnexpectedEof,

  #[error("not an ncm file (bad magic)")]
  BadMagic,

  #[error("encrypted block is not a whole number of aes blocks")]
  BadAes,

  #[error("metadata block is not valid base64")]
  BadBase64,

  #[error("metadata block is not valid json: {0}")]
  BadMetadata(#[from] serde_json::Error),

  #[error("unsupported format \"{0}\", expected mp3 or flac")]
  UnsupportedFormat(String),

  #[error("failed to rewrite the audio container: {0}")]
  Container(#[from] lofty::error::LoftyError),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}
