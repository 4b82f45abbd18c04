//! Local file frame source using FFmpeg.
//!
//! Decodes the best video stream of a container and converts every frame to
//! packed RGB24 at the native resolution.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;

use super::file::SourceStats;
use crate::frame::{Frame, VideoMetadata};

pub(crate) struct FfmpegFileSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    metadata: VideoMetadata,
    frame_count: u64,
    eof_sent: bool,
}

impl FfmpegFileSource {
    pub(crate) fn open(path: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open file input '{}' with ffmpeg", path))?;

        let (stream_index, decoder, fps, frame_rate, claimed_frames) = {
            let input_stream = input
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or_else(|| anyhow!("file has no video track"))?;
            let context =
                ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
                    .context("load video decoder parameters")?;
            let decoder = context
                .decoder()
                .video()
                .context("open ffmpeg video decoder")?;

            let mut rate = input_stream.avg_frame_rate();
            if rate.numerator() == 0 || rate.denominator() == 0 {
                rate = input_stream.rate();
            }
            let (fps, frame_rate) = if rate.numerator() <= 0 || rate.denominator() <= 0 {
                (0.0, None)
            } else {
                (f64::from(rate), Some((rate.numerator(), rate.denominator())))
            };
            let claimed_frames = input_stream.frames().max(0) as u64;
            (input_stream.index(), decoder, fps, frame_rate, claimed_frames)
        };

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

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            frame_rate,
            claimed_frames,
        };
        log::info!(
            "VideoSource: opened {} (ffmpeg, {}x{} @ {:.2}fps)",
            path,
            metadata.width,
            metadata.height,
            metadata.fps
        );

        Ok(Self {
            path: path.to_string(),
            input,
            stream_index,
            decoder,
            scaler,
            metadata,
            frame_count: 0,
            eof_sent: false,
        })
    }

    pub(crate) fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    pub(crate) fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb_frame = ffmpeg::frame::Video::empty();
                self.scaler
                    .run(&decoded, &mut rgb_frame)
                    .context("scale frame to RGB")?;
                let image = frame_to_image(&rgb_frame)?;
                let index = self.frame_count;
                self.frame_count += 1;
                return Ok(Some(Frame::new(index, image)));
            }
            if self.eof_sent {
                return Ok(None);
            }
            match self.next_video_packet() {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?,
                None => {
                    self.decoder
                        .send_eof()
                        .context("flush ffmpeg decoder")?;
                    self.eof_sent = true;
                }
            }
        }
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frame_count,
            path: self.path.clone(),
        }
    }

    fn next_video_packet(&mut self) -> Option<ffmpeg::Packet> {
        for (stream, packet) in self.input.packets() {
            if stream.index() == self.stream_index {
                return Some(packet);
            }
        }
        None
    }
}

fn frame_to_image(frame: &ffmpeg::frame::Video) -> Result<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let pixels = if stride == row_bytes {
        data.get(..row_bytes * height as usize)
            .context("ffmpeg frame is shorter than its dimensions")?
            .to_vec()
    } else {
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let end = start + row_bytes;
            pixels.extend_from_slice(
                data.get(start..end)
                    .context("ffmpeg frame row is out of bounds")?,
            );
        }
        pixels
    };

    RgbImage::from_raw(width, height, pixels).context("ffmpeg frame buffer size mismatch")
}
