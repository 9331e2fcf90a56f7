use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Mono PCM samples and their sample rate.
#[derive(Clone, Debug)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decodes the first audio track of `path`, averaging channels down to mono.
pub fn decode_audio(path: &Path) -> Result<Waveform> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;
    if sample_rate == 0 {
        anyhow::bail!("Audio track reports a sample rate of 0 Hz");
    }

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(err)) => {
                log::debug!("Skipping undecodable packet: {}", err);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        let samples = sample_buf.samples();
        let packet_channels = spec.channels.count().max(1);

        // Downmix to mono
        if packet_channels == 1 {
            all_samples.extend_from_slice(samples);
        } else {
            for frame_samples in samples.chunks(packet_channels) {
                let mono: f32 = frame_samples.iter().sum::<f32>() / packet_channels as f32;
                all_samples.push(mono);
            }
        }
    }

    let waveform = Waveform {
        samples: all_samples,
        sample_rate,
    };
    log::info!(
        "Decoded audio: {} samples, {}Hz, {} channel(s) mixed to mono, {:.1}s",
        waveform.samples.len(),
        sample_rate,
        channels,
        waveform.duration()
    );

    Ok(waveform)
}

/// Writes a 16-bit PCM WAV with interleaved `frames` of `channels` samples.
#[cfg(test)]
pub(crate) fn write_pcm16_wav(path: &Path, sample_rate: u32, channels: u16, frames: &[i16]) {
    let data_len = (frames.len() * 2) as u32;
    let block_align = channels * 2;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for s in frames {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    std::fs::write(path, bytes).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_in_seconds() {
        let waveform = Waveform {
            samples: vec![0.0; 22050],
            sample_rate: 44100,
        };
        assert_eq!(waveform.duration(), 0.5);
    }

    #[test]
    fn decodes_stereo_wav_to_mono() {
        let path = std::env::temp_dir().join("combtempo_stereo_decode.wav");
        // Left and right cancel on even frames and agree on odd frames.
        let frames: Vec<i16> = (0..2000)
            .flat_map(|i| if i % 2 == 0 { [8192, -8192] } else { [16384, 16384] })
            .collect();
        write_pcm16_wav(&path, 8000, 2, &frames);

        let waveform = decode_audio(&path);
        std::fs::remove_file(&path).ok();
        let waveform = waveform.unwrap();

        assert_eq!(waveform.sample_rate, 8000);
        assert_eq!(waveform.samples.len(), 2000);
        assert!(waveform.samples[0].abs() < 1e-6);
        assert!((waveform.samples[1] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = decode_audio(Path::new("/nonexistent/track.mp3")).unwrap_err();
        assert!(err.to_string().contains("Failed to open audio file"));
    }

    #[test]
    fn unknown_format_is_an_error() {
        let path = std::env::temp_dir().join("combtempo_not_audio.wav");
        std::fs::write(&path, b"definitely not a RIFF header").unwrap();
        let result = decode_audio(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
