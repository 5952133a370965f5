use std::io::{Cursor, Seek};

use lofty::config::WriteOptions;
use lofty::file::{AudioFile, FileType, TaggedFileExt};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, Tag};

use crate::error::Result;
use crate::metadata::{Metadata, MusicFormat};

/// PNG magic bytes; anything else embedded as a cover is assumed jpeg.
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

fn file_type(format: MusicFormat) -> FileType {
  match format {
    MusicFormat::Mp3 => FileType::Mpeg,
    MusicFormat::Flac => FileType::Flac,
  }
}

/// Write the recovered tags into the audio in `raw` and return the
/// rewritten file as a new buffer.
///
/// The whole thing runs over an in-memory cursor, nothing touches the
/// filesystem. Empty fields are left alone, never cleared; a non-empty
/// `image` is always pushed as an additional front cover, existing
/// pictures are kept.
pub fn write_tags(metadata: &Metadata, raw: &[u8]) -> Result<Vec<u8>> {
  let mut stream = Cursor::new(raw.to_vec());
  let mut tagged = Probe::with_file_type(&mut stream, file_type(metadata.format)).read()?;

  if tagged.primary_tag().is_none() {
    tagged.insert_tag(Tag::new(tagged.primary_tag_type()));
  }
  // guaranteed present after the insert above
  let tag = tagged.primary_tag_mut().unwrap();

  if !metadata.image.is_empty() {
    let mime = if metadata.image.starts_with(&PNG_MAGIC) {
      MimeType::Png
    } else {
      MimeType::Jpeg
    };
    let picture = Picture::new_unchecked(
      PictureType::CoverFront,
      Some(mime),
      None,
      metadata.image.clone(),
    );
    tag.push_picture(picture);
  }

  if !metadata.name.is_empty() {
    tag.set_title(metadata.name.clone());
  }
  if !metadata.artist.is_empty() {
    tag.set_artist(metadata.artist.clone());
  }
  if !metadata.album.is_empty() {
    tag.set_album(metadata.album.clone());
  }

  stream.rewind()?;
  tagged.save_to(&mut stream, WriteOptions::default())?;

  Ok(stream.into_inner())
}


#[cfg(test)]
mod tests {
  use super::fixtures::{minimal_flac, minimal_mp3};
  use super::*;
  use crate::error::Error;

  fn read_primary(bytes: &[u8], format: MusicFormat) -> Tag {
    let mut stream = Cursor::new(bytes.to_vec());
    let tagged = Probe::with_file_type(&mut stream, file_type(format))
      .read()
      .unwrap();
    tagged.primary_tag().cloned().expect("no tag written")
  }

  fn with_fields(name: &str, artist: &str, album: &str) -> Metadata {
    Metadata {
      name: name.to_string(),
      artist: artist.to_string(),
      album: album.to_string(),
      ..Metadata::default()
    }
  }

  #[test]
  fn writes_fields_into_mp3() {
    let metadata = with_fields("Title X", "Artist Y", "Album Z");
    let out = write_tags(&metadata, &minimal_mp3()).unwrap();

    let tag = read_primary(&out, MusicFormat::Mp3);
    assert_eq!(tag.title().as_deref(), Some("Title X"));
    assert_eq!(tag.artist().as_deref(), Some("Artist Y"));
    assert_eq!(tag.album().as_deref(), Some("Album Z"));
  }

  #[test]
  fn writes_fields_into_flac() {
    let mut metadata = with_fields("Flac Title", "Flac Artist", "");
    metadata.format = MusicFormat::Flac;
    let out = write_tags(&metadata, &minimal_flac()).unwrap();

    let tag = read_primary(&out, MusicFormat::Flac);
    assert_eq!(tag.title().as_deref(), Some("Flac Title"));
    assert_eq!(tag.artist().as_deref(), Some("Flac Artist"));
    assert_eq!(tag.album(), None);
  }

  #[test]
  fn empty_fields_leave_existing_values_alone() {
    let out = write_tags(&with_fields("Old", "", ""), &minimal_mp3()).unwrap();
    let out = write_tags(&Metadata::default(), &out).unwrap();

    let tag = read_primary(&out, MusicFormat::Mp3);
    assert_eq!(tag.title().as_deref(), Some("Old"));
  }

  #[test]
  fn png_cover_gets_png_mime() {
    let mut metadata = Metadata::default();
    metadata.image = [&PNG_MAGIC[..], &[1, 2, 3]].concat();
    let out = write_tags(&metadata, &minimal_mp3()).unwrap();

    let tag = read_primary(&out, MusicFormat::Mp3);
    assert_eq!(tag.pictures().len(), 1);
    assert_eq!(tag.pictures()[0].mime_type(), Some(&MimeType::Png));
    assert_eq!(tag.pictures()[0].pic_type(), PictureType::CoverFront);
  }

  #[test]
  fn anything_else_gets_jpeg_mime() {
    let mut metadata = Metadata::default();
    metadata.image = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00];
    let out = write_tags(&metadata, &minimal_mp3()).unwrap();

    let tag = read_primary(&out, MusicFormat::Mp3);
    assert_eq!(tag.pictures()[0].mime_type(), Some(&MimeType::Jpeg));
  }

  #[test]
  fn covers_accumulate_across_runs() {
    let mut metadata = Metadata::default();
    metadata.image = vec![0xFF, 0xD8, 0xFF];
    let out = write_tags(&metadata, &minimal_mp3()).unwrap();
    let out = write_tags(&metadata, &out).unwrap();

    let tag = read_primary(&out, MusicFormat::Mp3);
    assert_eq!(tag.pictures().len(), 2);
  }

  #[test]
  fn rejects_mismatched_container() {
    let mut metadata = Metadata::default();
    metadata.format = MusicFormat::Flac;
    assert!(matches!(
      write_tags(&metadata, &minimal_mp3()),
      Err(Error::Container(_))
    ));

    metadata.format = MusicFormat::Mp3;
    assert!(matches!(
      write_tags(&metadata, &minimal_flac()),
      Err(Error::Container(_))
    ));
  }

  #[test]
  fn rerunning_over_own_output_is_stable() {
    let first = write_tags(&with_fields("Once", "", ""), &minimal_mp3()).unwrap();
    let second = write_tags(&Metadata::default(), &first).unwrap();

    let tag = read_primary(&second, MusicFormat::Mp3);
    assert_eq!(tag.title().as_deref(), Some("Once"));
  }
}
