use serde::{Deserialize, Deserializer};

use crate::error::Error;

/// Container format of the decrypted audio payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MusicFormat {
  #[default]
  Mp3,
  Flac,
}

impl MusicFormat {
  /// File extension for the dumped audio.
  pub fn extension(&self) -> &'static str {
    match self {
      MusicFormat::Mp3 => "mp3",
      MusicFormat::Flac => "flac",
    }
  }
}

impl std::str::FromStr for MusicFormat {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "mp3" => Ok(MusicFormat::Mp3),
      "flac" => Ok(MusicFormat::Flac),
      other => Err(Error::UnsupportedFormat(other.to_string())),
    }
  }
}

/// The metadata block lists artists as `[["name", id], ...]`; join the
/// names with a comma like the player UI displays them.
fn artist<'d, D: Deserializer<'d>>(d: D) -> Result<String, D::Error> {
  let list = <Vec<(String, serde_json::Value)>>::deserialize(d)?;
  let names: Vec<&str> = list.iter().map(|(name, _)| name.as_str()).collect();
  Ok(names.join(", "))
}

/// Track metadata, as recovered from the ncm metadata block.
///
/// `image` and `data` are not part of the json: the cover image comes
/// from its own block in the container, and `data` receives the
/// rewritten audio once the transform has run.
#[derive(Debug, Default, Deserialize)]
pub struct Metadata {
  #[serde(rename = "musicName")]
  pub name: String,
  #[serde(deserialize_with = "artist")]
  pub artist: String,
  pub album: String,
  #[serde(skip)]
  pub image: Vec<u8>,
  #[serde(skip)]
  pub data: Vec<u8>,
  #[serde(skip)]
  pub format: MusicFormat,
}
