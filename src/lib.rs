//! Decrypt `.ncm` containers into plain MP3/FLAC and rewrite the
//! recovered metadata (title, artist, album, cover art) into the audio.
//!
//! Everything is byte-in/byte-out: load the file into memory, call
//! [`transform`], read the rewritten audio out of [`Metadata::data`].
//! [`write_tags`] is also usable on its own to retag an MP3/FLAC buffer.

mod error;
mod metadata;
mod ncm;
mod tag;

pub use error::{Error, Result};
pub use metadata::{Metadata, MusicFormat};
pub use ncm::{transform, transform_as};
pub use tag::write_tags;
