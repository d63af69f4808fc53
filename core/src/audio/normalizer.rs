use async_trait::async_trait;
use hound::{SampleFormat as WavSampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{AudioArtifact, AudioFormat, NormalizeError, NormalizedAudio};
use crate::orchestrator::traits::AudioNormalizer;

const TARGET: &str = "audio_normalizer";

/// Where a transcoded copy of `source` is written: the scratch directory when
/// one is set, otherwise next to the source. The uuid suffix keeps the name
/// unique per request, so neither the source nor a sibling file is touched.
pub fn transcode_target(source: &Path, scratch_dir: Option<&Path>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    let name = format!("{stem}-{}.wav", Uuid::new_v4().simple());
    match scratch_dir {
        Some(dir) => dir.join(name),
        None => source.with_file_name(name),
    }
}

/// Normalises audio files on the local filesystem. WAV passes through
/// untouched; compressed codecs are decoded and rewritten as mono 16-bit PCM.
#[derive(Debug, Clone, Default)]
pub struct FsAudioNormalizer {
    scratch_dir: Option<PathBuf>,
}

impl FsAudioNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scratch_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            scratch_dir: Some(dir.into()),
        }
    }
}

#[async_trait]
impl AudioNormalizer for FsAudioNormalizer {
    async fn normalize(&self, artifact: &AudioArtifact) -> Result<NormalizedAudio, NormalizeError> {
        if !artifact.path.is_file() {
            warn!(
                target: TARGET,
                path = %artifact.path.display(),
                "source audio missing"
            );
            return Err(NormalizeError::NotFound(artifact.path.clone()));
        }

        let format = AudioFormat::sniff(&artifact.path, artifact.mime_hint.as_deref())
            .ok_or_else(|| {
                NormalizeError::UnsupportedFormat(format!(
                    "cannot determine audio format of {}",
                    artifact.path.display()
                ))
            })?;

        if format.is_canonical() {
            debug!(
                target: TARGET,
                path = %artifact.path.display(),
                "audio already canonical, passing through"
            );
            return Ok(NormalizedAudio::passthrough(&artifact.path));
        }

        let source = artifact.path.clone();
        let target = transcode_target(&source, self.scratch_dir.as_deref());
        let output = target.clone();
        let scratch_dir = self.scratch_dir.clone();

        tokio::task::spawn_blocking(move || {
            if let Some(dir) = scratch_dir {
                std::fs::create_dir_all(&dir).map_err(|err| unsupported("scratch dir", err))?;
            }
            transcode_to_wav(&source, format, &output)
        })
            .await
            .map_err(|err| {
                NormalizeError::UnsupportedFormat(format!("transcode task failed: {err}"))
            })??;

        info!(
            target: TARGET,
            source = %artifact.path.display(),
            output = %target.display(),
            from = format.extension(),
            "transcoded audio to wav"
        );

        Ok(NormalizedAudio {
            path: target,
            format: AudioFormat::Wav,
            transcoded: true,
        })
    }
}

pub(crate) fn transcode_to_wav(
    source: &Path,
    format: AudioFormat,
    target: &Path,
) -> Result<(), NormalizeError> {
    let (samples, sample_rate) = decode_to_mono(source, format)?;
    write_wav(target, &samples, sample_rate)
}

fn unsupported(stage: &str, err: impl std::fmt::Display) -> NormalizeError {
    NormalizeError::UnsupportedFormat(format!("{stage}: {err}"))
}

fn decode_to_mono(source: &Path, format: AudioFormat) -> Result<(Vec<f32>, u32), NormalizeError> {
    let file = File::open(source).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            NormalizeError::NotFound(source.to_path_buf())
        } else {
            unsupported("open", err)
        }
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(format.extension());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| unsupported("probe", err))?;
    let mut reader = probed.format;

    let track = reader
        .default_track()
        .ok_or_else(|| NormalizeError::UnsupportedFormat("no audio track found".into()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| NormalizeError::UnsupportedFormat("unknown sample rate".into()))?;
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(1).max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|err| unsupported("codec", err))?;

    let mut mono: Vec<f32> = Vec::new();
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(unsupported("packet", err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(err)) => {
                warn!(target: TARGET, error = %err, "skipping corrupt audio frame");
                continue;
            }
            Err(err) => return Err(unsupported("decode", err)),
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        if frames == 0 {
            continue;
        }

        let mut buffer = SampleBuffer::<f32>::new(frames as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        let samples = buffer.samples();

        if channels > 1 {
            mono.extend(
                samples
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        } else {
            mono.extend_from_slice(samples);
        }
    }

    if mono.is_empty() {
        return Err(NormalizeError::UnsupportedFormat(
            "no audio samples decoded".into(),
        ));
    }

    Ok((mono, sample_rate))
}

fn write_wav(target: &Path, samples: &[f32], sample_rate: u32) -> Result<(), NormalizeError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: WavSampleFormat::Int,
    };
    let mut writer =
        WavWriter::create(target, spec).map_err(|err| unsupported("wav create", err))?;
    for sample in samples {
        let value = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer
            .write_sample(value)
            .map_err(|err| unsupported("wav write", err))?;
    }
    writer
        .finalize()
        .map_err(|err| unsupported("wav finalize", err))
}
