//! WAV I/O and the small amount of sample processing the orchestrator needs:
//! mono downmix, resampling, truncation and peak normalization.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::DialogueError;

/// Decoded audio, one `Vec<f32>` per channel.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

/// Read a WAV file into per-channel f32 samples.
pub fn read_wav(path: &Path) -> Result<DecodedAudio, DialogueError> {
    let reader = WavReader::open(path)?;
    decode(reader)
}

/// Read WAV data from any byte stream (e.g. a backend's stdout).
pub fn read_wav_from<R: Read>(source: R) -> Result<DecodedAudio, DialogueError> {
    let reader = WavReader::new(BufReader::new(source))?;
    decode(reader)
}

fn decode<R: Read>(mut reader: WavReader<R>) -> Result<DecodedAudio, DialogueError> {
    let spec = reader.spec();
    let channel_count = spec.channels.max(1) as usize;
    let mut channels = vec![Vec::new(); channel_count];

    match spec.sample_format {
        SampleFormat::Float => {
            for (idx, sample) in reader.samples::<f32>().enumerate() {
                match sample {
                    Ok(value) => channels[idx % channel_count].push(value),
                    Err(e) if is_truncated_stream(&e) => break,
                    Err(e) => return Err(e.into()),
                }
            }
        }
        SampleFormat::Int => {
            let max = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            for (idx, sample) in reader.samples::<i32>().enumerate() {
                match sample {
                    Ok(value) => channels[idx % channel_count].push(value as f32 / max),
                    Err(e) if is_truncated_stream(&e) => break,
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    Ok(DecodedAudio {
        channels,
        sample_rate: spec.sample_rate,
    })
}

/// Decode any supported container (mp3, wav) into per-channel f32 samples.
pub fn decode_file(path: &Path) -> Result<DecodedAudio, DialogueError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let opened = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| match e {
            SymphoniaError::Unsupported(_) => {
                DialogueError::UnsupportedReferenceFormat(path.to_path_buf())
            }
            other => DialogueError::Decode(other),
        })?;
    let mut format = opened.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DialogueError::UnsupportedReferenceFormat(path.to_path_buf()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut channels: Vec<Vec<f32>> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("Skipping undecodable packet in {}: {msg}", path.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        let channel_count = spec.channels.count().max(1);
        if channels.is_empty() {
            channels = vec![Vec::new(); channel_count];
        }
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        let n_channels = channels.len();
        for (idx, &value) in buf.samples().iter().enumerate() {
            channels[idx % n_channels].push(value);
        }
    }

    let sample_rate = sample_rate.ok_or_else(|| {
        DialogueError::Config(format!("{} has no sample rate", path.display()))
    })?;
    Ok(DecodedAudio {
        channels,
        sample_rate,
    })
}

// Streaming writers (espeak-ng --stdout among them) put a placeholder length
// in the data chunk header, so the stream ends before the header says it does.
fn is_truncated_stream(err: &hound::Error) -> bool {
    matches!(err, hound::Error::IoError(io) if io.kind() == ErrorKind::UnexpectedEof)
}

/// Write mono samples as a 32-bit float WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), DialogueError> {
    if sample_rate == 0 {
        return Err(DialogueError::Config("sample_rate must be > 0".into()));
    }
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Average all channels into one.
pub fn downmix_mono(channels: &[Vec<f32>]) -> Vec<f32> {
    match channels {
        [] => Vec::new(),
        [mono] => mono.clone(),
        _ => {
            let len = channels.iter().map(Vec::len).min().unwrap_or(0);
            let scale = 1.0 / channels.len() as f32;
            (0..len)
                .map(|i| channels.iter().map(|c| c[i]).sum::<f32>() * scale)
                .collect()
        }
    }
}

/// Resample mono audio from `from_rate` to `to_rate`.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, DialogueError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(DialogueError::Config("sample rates must be > 0".into()));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)?;
    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * ratio).round() as usize;

    let mut output = resampler
        .process(&[samples], None)?
        .pop()
        .unwrap_or_default();
    // Flush the filter's internal delay so the tail is not lost.
    while output.len() < delay + expected {
        let tail = resampler
            .process_partial::<Vec<f32>>(None, None)?
            .pop()
            .unwrap_or_default();
        if tail.is_empty() {
            break;
        }
        output.extend(tail);
    }

    Ok(output.into_iter().skip(delay).take(expected).collect())
}

/// Keep at most `max_secs` seconds of audio.
pub fn truncate(samples: &mut Vec<f32>, sample_rate: u32, max_secs: f32) {
    let max_len = (max_secs.max(0.0) as f64 * sample_rate as f64) as usize;
    samples.truncate(max_len);
}

/// Largest absolute sample value.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

/// Scale the buffer down so its peak equals `threshold`, if it exceeds it.
///
/// Returns the applied gain (1.0 when untouched).
pub fn normalize_peak(samples: &mut [f32], threshold: f32) -> f32 {
    let current = peak(samples);
    if current <= threshold || current == 0.0 {
        return 1.0;
    }
    let gain = threshold / current;
    for s in samples.iter_mut() {
        *s *= gain;
    }
    gain
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn float_wav_roundtrip_keeps_rate() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out.wav");
        write_wav(&path, &[0.0, 0.5, -0.25], 22_050).expect("write wav");

        let decoded = read_wav(&path).expect("read wav");
        assert_eq!(decoded.sample_rate, 22_050);
        assert_eq!(decoded.channels, vec![vec![0.0, 0.5, -0.25]]);
    }

    #[test]
    fn reads_int_stereo_from_stream() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut buf = Cursor::new(Vec::new());
        {
            let mut w = WavWriter::new(&mut buf, spec).unwrap();
            for s in [16384i16, -16384, 0, 8192] {
                w.write_sample(s).unwrap();
            }
            w.finalize().unwrap();
        }
        let decoded = read_wav_from(Cursor::new(buf.into_inner())).expect("decode");
        assert_eq!(decoded.sample_rate, 16_000);
        assert_eq!(decoded.channels.len(), 2);
        assert_eq!(decoded.channels[0], vec![0.5, 0.0]);
        assert_eq!(decoded.channels[1], vec![-0.5, 0.25]);
    }

    #[test]
    fn stream_shorter_than_header_decodes_what_is_there() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut buf = Cursor::new(Vec::new());
        {
            let mut w = WavWriter::new(&mut buf, spec).unwrap();
            for s in [16384i16, -16384, 8192, 4096] {
                w.write_sample(s).unwrap();
            }
            w.finalize().unwrap();
        }
        // Header still announces four samples; only three arrive.
        let mut bytes = buf.into_inner();
        bytes.truncate(bytes.len() - 2);

        let decoded = read_wav_from(Cursor::new(bytes)).expect("decode truncated stream");
        assert_eq!(decoded.sample_rate, 22_050);
        assert_eq!(decoded.channels, vec![vec![0.5, -0.5, 0.25]]);
    }

    #[test]
    fn decode_file_reads_wav_containers() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("clip.wav");
        write_wav(&path, &[0.0, 0.5, -0.25, 0.125], 8_000).expect("write wav");

        let decoded = decode_file(&path).expect("decode");
        assert_eq!(decoded.sample_rate, 8_000);
        assert_eq!(decoded.channels.len(), 1);
        assert_eq!(decoded.channels[0], vec![0.0, 0.5, -0.25, 0.125]);
    }

    #[test]
    fn decode_file_reads_mp3() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("clip.mp3");
        std::fs::write(&path, test_audio::silent_mp3(20)).unwrap();

        let decoded = decode_file(&path).expect("decode mp3");
        assert_eq!(decoded.sample_rate, 44_100);
        assert_eq!(decoded.channels.len(), 1);
        assert!(!decoded.channels[0].is_empty());
        assert!(decoded.channels[0].iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn decode_file_rejects_unknown_data() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("notes.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(decode_file(&path).is_err());
    }

    #[test]
    fn downmix_averages_channels() {
        let mono = downmix_mono(&[vec![1.0, 0.0], vec![0.0, -1.0]]);
        assert_eq!(mono, vec![0.5, -0.5]);
    }

    #[test]
    fn resample_changes_length_proportionally() {
        let input = vec![0.0f32; 4_800];
        let output = resample(&input, 48_000, 24_000).expect("resample");
        assert_eq!(output.len(), 2_400);
    }

    #[test]
    fn resample_keeps_timing_aligned() {
        // Silence then a constant level; the step must stay at the midpoint.
        let mut input = vec![0.0f32; 2_400];
        input.extend(vec![0.5f32; 2_400]);
        let output = resample(&input, 48_000, 24_000).expect("resample");
        assert_eq!(output.len(), 2_400);
        assert!(output[1_200 - 60].abs() < 0.05, "{}", output[1_200 - 60]);
        assert!((output[1_200 + 60] - 0.5).abs() < 0.05, "{}", output[1_200 + 60]);
        assert!((output[2_399] - 0.5).abs() < 0.1, "{}", output[2_399]);
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&input, 24_000, 24_000).unwrap(), input);
    }

    #[test]
    fn truncate_caps_duration() {
        let mut samples = vec![0.0; 1_000];
        truncate(&mut samples, 100, 2.5);
        assert_eq!(samples.len(), 250);
    }

    #[test]
    fn normalize_scales_loud_buffers_only() {
        let mut loud = vec![0.5, -1.9, 0.95];
        let gain = normalize_peak(&mut loud, 0.95);
        assert!((gain - 0.5).abs() < 1e-6);
        assert!(peak(&loud) <= 0.95 + 1e-6);

        let mut quiet = vec![0.2, -0.3];
        assert_eq!(normalize_peak(&mut quiet, 0.95), 1.0);
        assert_eq!(quiet, vec![0.2, -0.3]);
    }
}
