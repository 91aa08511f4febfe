use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Raw PCM layout of the audio the service streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl PcmFormat {
    pub fn mono_16bit(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            bits_per_sample: 16,
        }
    }

    fn wav_spec(&self) -> WavSpec {
        WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: SampleFormat::Int,
        }
    }
}

/// Audio container operations
///
/// Implementations are blocking; callers run them on the blocking pool.
pub trait AudioCodec: Send + Sync {
    /// Wrap little-endian PCM bytes into a container file at `path`.
    fn write_container(&self, pcm: &[u8], path: &Path, format: PcmFormat) -> Result<()>;

    /// Append `inputs` in order into one container at `output`.
    ///
    /// Returns how many inputs were merged. Inputs that cannot be read
    /// are skipped; it is an error if none could be merged.
    fn concatenate_containers(&self, inputs: &[PathBuf], output: &Path) -> Result<usize>;
}

/// WAV container codec backed by hound
#[derive(Debug, Clone, Copy, Default)]
pub struct WavCodec;

impl AudioCodec for WavCodec {
    fn write_container(&self, pcm: &[u8], path: &Path, format: PcmFormat) -> Result<()> {
        if format.bits_per_sample != 16 {
            bail!("Unsupported PCM bit depth: {}", format.bits_per_sample);
        }

        let mut writer = WavWriter::create(path, format.wav_spec())
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        let samples = pcm.chunks_exact(2);
        if !samples.remainder().is_empty() {
            warn!(path = %path.display(), "Odd PCM byte count, dropping trailing byte");
        }

        for pair in samples {
            writer
                .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                .context("Failed to write sample to WAV")?;
        }

        writer.finalize().context("Failed to finalize WAV file")?;
        Ok(())
    }

    fn concatenate_containers(&self, inputs: &[PathBuf], output: &Path) -> Result<usize> {
        let mut writer: Option<(WavWriter<_>, WavSpec)> = None;
        let mut merged = 0;

        for input in inputs {
            let reader = match WavReader::open(input) {
                Ok(reader) => reader,
                Err(e) => {
                    warn!(path = %input.display(), "Skipping unreadable WAV: {}", e);
                    continue;
                }
            };

            let spec = reader.spec();
            if let Some((_, expected)) = &writer {
                if spec != *expected {
                    warn!(
                        path = %input.display(),
                        ?spec,
                        ?expected,
                        "Skipping WAV with mismatched format"
                    );
                    continue;
                }
            }

            let samples: Vec<i16> = match reader.into_samples::<i16>().collect() {
                Ok(samples) => samples,
                Err(e) => {
                    warn!(path = %input.display(), "Skipping corrupt WAV: {}", e);
                    continue;
                }
            };

            if writer.is_none() {
                let created = WavWriter::create(output, spec)
                    .with_context(|| format!("Failed to create WAV file: {:?}", output))?;
                writer = Some((created, spec));
            }

            if let Some((out, _)) = writer.as_mut() {
                for sample in &samples {
                    out.write_sample(*sample)
                        .context("Failed to write sample to WAV")?;
                }
            }

            debug!(path = %input.display(), samples = samples.len(), "Appended WAV");
            merged += 1;
        }

        match writer {
            Some((out, _)) => {
                out.finalize().context("Failed to finalize WAV file")?;
                Ok(merged)
            }
            None => bail!("None of {} inputs could be read", inputs.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_write_container_roundtrips_samples() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("a.wav");

        WavCodec.write_container(&pcm(&[1, -2, 300]), &path, PcmFormat::mono_16bit(24000))?;

        let reader = WavReader::open(&path)?;
        assert_eq!(reader.spec().sample_rate, 24000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.into_samples().collect::<Result<_, _>>()?;
        assert_eq!(samples, vec![1, -2, 300]);
        Ok(())
    }

    #[test]
    fn test_odd_byte_is_dropped() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("odd.wav");

        WavCodec.write_container(&[1, 0, 7], &path, PcmFormat::mono_16bit(16000))?;

        assert_eq!(WavReader::open(&path)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_concatenate_skips_missing_inputs() -> Result<()> {
        let dir = TempDir::new()?;
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        let out = dir.path().join("out.wav");
        WavCodec.write_container(&pcm(&[1, 2]), &a, PcmFormat::mono_16bit(24000))?;
        WavCodec.write_container(&pcm(&[3]), &b, PcmFormat::mono_16bit(24000))?;

        let merged = WavCodec.concatenate_containers(
            &[a, dir.path().join("missing.wav"), b],
            &out,
        )?;

        assert_eq!(merged, 2);
        let samples: Vec<i16> = WavReader::open(&out)?.into_samples().collect::<Result<_, _>>()?;
        assert_eq!(samples, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_concatenate_nothing_fails() {
        let dir = TempDir::new().unwrap();
        let result = WavCodec.concatenate_containers(
            &[dir.path().join("missing.wav")],
            &dir.path().join("out.wav"),
        );

        assert!(result.is_err());
        assert!(!dir.path().join("out.wav").exists());
    }
}
