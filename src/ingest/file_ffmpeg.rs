//! FFmpeg-backed video file source.
//!
//! Decodes a local video file in-memory, scaling every frame to RGB24.
//! One pass, front to back; the demuxer and decoder are released when the
//! source is dropped.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;

use crate::frame::RasterFrame;
use crate::ingest::file::VideoConfig;
use crate::MediaError;

pub(crate) struct FfmpegVideoSource {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    total_frames: Option<u64>,
    eof_sent: bool,
    frame_count: u64,
}

impl FfmpegVideoSource {
    pub(crate) fn open(config: &VideoConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&config.path)
            .with_context(|| format!("failed to open video file '{}'", config.path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("file '{}' has no video track", config.path))?;
        let stream_index = input_stream.index();
        // Container-reported frame count; zero means unknown.
        let total_frames = match input_stream.frames() {
            n if n > 0 => Some(n as u64),
            _ => None,
        };
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
            total_frames,
            eof_sent: false,
            frame_count: 0,
        })
    }

    pub(crate) fn total_frames(&self) -> Option<u64> {
        self.total_frames
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<RasterFrame>, MediaError> {
        self.decode_next()
            .map_err(|e| MediaError::LoadFailed(format!("{:#}", e)))
    }

    fn decode_next(&mut self) -> Result<Option<RasterFrame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if let Some(frame) = self.receive_decoded(&mut decoded)? {
                return Ok(Some(frame));
            }
            if self.eof_sent {
                return Ok(None);
            }

            // Feed the next packet of our stream, or flush at demuxer EOF.
            let packet = self
                .input
                .packets()
                .find(|(stream, _)| stream.index() == self.stream_index)
                .map(|(_, packet)| packet);
            match packet {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?,
                None => {
                    self.decoder.send_eof().context("flush ffmpeg decoder")?;
                    self.eof_sent = true;
                }
            }
        }
    }

    fn receive_decoded(
        &mut self,
        decoded: &mut ffmpeg::frame::Video,
    ) -> Result<Option<RasterFrame>> {
        if self.decoder.receive_frame(decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        self.frame_count += 1;
        log::trace!("decoded frame {} ({}x{})", self.frame_count, width, height);
        Ok(Some(RasterFrame::new(width, height, pixels)?))
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        return Ok((data.to_vec(), width, height));
    }

    // Strip per-row padding.
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
