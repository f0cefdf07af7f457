use std::fs;
use std::io::{self, Cursor};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cogex_core::{AssetKind, LoadError, PresentError};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Source};

/// Encoded sound kept in memory. Decoding is repeated on every play, which
/// keeps clips cheap to clone and lets the same clip overlap itself.
#[derive(Clone)]
pub struct SoundClip {
    bytes: Arc<[u8]>,
    duration: Option<Duration>,
}

impl SoundClip {
    /// Reads the file and checks that it decodes
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let bytes: Arc<[u8]> = fs::read(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
                _ => decode_error(path, e),
            })?
            .into();
        let decoder = Decoder::new(Cursor::new(bytes.clone())).map_err(|e| decode_error(path, e))?;
        Ok(Self {
            duration: decoder.total_duration(),
            bytes,
        })
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

fn decode_error(path: &Path, e: impl std::fmt::Display) -> LoadError {
    LoadError::Decode {
        kind: AssetKind::Sound,
        key: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Default output device. Playback is fire-and-forget: `play` returns as
/// soon as the clip is queued on the mixer.
pub struct AudioOutput {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl AudioOutput {
    pub fn open() -> Result<Self, LoadError> {
        let (stream, handle) = OutputStream::try_default().map_err(|e| LoadError::Decode {
            kind: AssetKind::Sound,
            key: "default output device".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    pub fn play(&self, clip: &SoundClip) -> Result<(), PresentError> {
        let source = Decoder::new(Cursor::new(clip.bytes.clone()))
            .map_err(|e| PresentError::Audio(e.to_string()))?;
        self.handle
            .play_raw(source.convert_samples())
            .map_err(|e| PresentError::Audio(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = SoundClip::load(Path::new("/nonexistent/ph10.wav")).err().unwrap();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        file.write_all(b"definitely not a wave file").unwrap();
        let err = SoundClip::load(file.path()).err().unwrap();
        assert!(matches!(
            err,
            LoadError::Decode {
                kind: AssetKind::Sound,
                ..
            }
        ));
    }

    #[test]
    fn decodes_a_pcm_wave() {
        // 16-bit mono, 8 kHz, 800 samples of silence = 100 ms
        let samples = 800u32;
        let data_len = samples * 2;
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_len).to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&8000u32.to_le_bytes());
        wav.extend_from_slice(&16000u32.to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_len.to_le_bytes());
        wav.resize(wav.len() + data_len as usize, 0);

        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        file.write_all(&wav).unwrap();
        let clip = SoundClip::load(file.path()).unwrap();
        let ms = clip.duration().map(|d| d.as_millis());
        assert!(ms.is_none_or(|ms| (99..=101).contains(&ms)), "{ms:?}");
    }
}
