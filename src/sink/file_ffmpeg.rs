//! Video file sink using FFmpeg.
//!
//! Encodes RGB frames as MPEG-4 Part 2 (`mp4v`) at the source's native size
//! and frame rate. The container is chosen from the output extension. Odd
//! widths or heights lose their last column or row.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;
use ffmpeg::util::format::pixel::Pixel;

use super::file::{encoder_dimensions, encoder_frame_rate, SinkStats};
use crate::frame::{Frame, VideoMetadata};

pub(crate) struct FfmpegFileSink {
    path: String,
    output: ffmpeg::format::context::Output,
    stream_index: usize,
    encoder: ffmpeg::codec::encoder::video::Encoder,
    scaler: ffmpeg::software::scaling::Context,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
    width: u32,
    height: u32,
    encoded_width: u32,
    encoded_height: u32,
    frames_written: u64,
    finished: bool,
}

impl FfmpegFileSink {
    pub(crate) fn create(path: &str, metadata: &VideoMetadata) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let mut output = ffmpeg::format::output(&path)
            .with_context(|| format!("failed to create output '{}' with ffmpeg", path))?;
        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4)
            .ok_or_else(|| anyhow!("ffmpeg build has no mpeg4 encoder"))?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let (rate_num, rate_den) = encoder_frame_rate(metadata);
        if metadata.frame_rate != Some((rate_num, rate_den)) {
            log::warn!(
                "VideoSink: source rate {:?} ({:.3}fps), writing at {}/{}",
                metadata.frame_rate,
                metadata.fps,
                rate_num,
                rate_den
            );
        }
        let frame_rate = ffmpeg::Rational::new(rate_num, rate_den);
        let encoder_time_base = frame_rate.invert();

        let (encoded_width, encoded_height) = encoder_dimensions(metadata.width, metadata.height)?;
        if (encoded_width, encoded_height) != (metadata.width, metadata.height) {
            log::warn!(
                "VideoSink: cropping {}x{} to {}x{} for YUV 4:2:0",
                metadata.width,
                metadata.height,
                encoded_width,
                encoded_height
            );
        }

        let (stream_index, encoder) = {
            let mut stream = output.add_stream(codec).context("add output video stream")?;
            let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
                .encoder()
                .video()
                .context("create ffmpeg video encoder")?;
            encoder.set_width(encoded_width);
            encoder.set_height(encoded_height);
            encoder.set_format(Pixel::YUV420P);
            encoder.set_time_base(encoder_time_base);
            encoder.set_frame_rate(Some(frame_rate));
            if global_header {
                encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
            }
            let encoder = encoder
                .open_as(codec)
                .context("open ffmpeg video encoder")?;
            stream.set_parameters(&encoder);
            stream.set_time_base(encoder_time_base);
            (stream.index(), encoder)
        };

        output
            .write_header()
            .with_context(|| format!("write container header for '{}'", path))?;
        let stream_time_base = output
            .stream(stream_index)
            .ok_or_else(|| anyhow!("output stream disappeared after header"))?
            .time_base();

        let scaler = ffmpeg::software::scaling::context::Context::get(
            Pixel::RGB24,
            encoded_width,
            encoded_height,
            Pixel::YUV420P,
            encoded_width,
            encoded_height,
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        log::info!(
            "VideoSink: writing {} (ffmpeg mpeg4, {}x{} @ {}/{}fps)",
            path,
            encoded_width,
            encoded_height,
            rate_num,
            rate_den
        );

        Ok(Self {
            path: path.to_string(),
            output,
            stream_index,
            encoder,
            scaler,
            encoder_time_base,
            stream_time_base,
            width: metadata.width,
            height: metadata.height,
            encoded_width,
            encoded_height,
            frames_written: 0,
            finished: false,
        })
    }

    pub(crate) fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match sink {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            ));
        }

        let mut rgb_frame =
            ffmpeg::frame::Video::new(Pixel::RGB24, self.encoded_width, self.encoded_height);
        copy_rows(frame.pixels(), self.width, &mut rgb_frame)?;

        let mut yuv_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&rgb_frame, &mut yuv_frame)
            .context("scale frame to YUV420P")?;
        yuv_frame.set_pts(Some(self.frames_written as i64));

        self.encoder
            .send_frame(&yuv_frame)
            .context("send frame to ffmpeg encoder")?;
        self.drain_packets()?;
        self.frames_written += 1;
        Ok(())
    }

    pub(crate) fn finish(mut self) -> Result<SinkStats> {
        self.finished = true;
        self.close()?;
        Ok(self.stats())
    }

    pub(crate) fn stats(&self) -> SinkStats {
        SinkStats {
            frames_written: self.frames_written,
            path: self.path.clone(),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.encoder.send_eof().context("flush ffmpeg encoder")?;
        self.drain_packets()?;
        self.output
            .write_trailer()
            .with_context(|| format!("write container trailer for '{}'", self.path))
    }

    fn drain_packets(&mut self) -> Result<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .context("write encoded packet")?;
        }
        Ok(())
    }
}

impl Drop for FfmpegFileSink {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Abandoned mid-run: close the container so the partial file stays readable.
        if let Err(e) = self.close() {
            log::warn!("VideoSink: failed to close {} cleanly: {:#}", self.path, e);
        }
    }
}

/// Copy the top-left `dst`-sized region of a packed RGB buffer `src_width`
/// pixels wide.
fn copy_rows(src: &[u8], src_width: u32, dst: &mut ffmpeg::frame::Video) -> Result<()> {
    let src_row_bytes = src_width as usize * 3;
    let row_bytes = dst.width() as usize * 3;
    let height = dst.height() as usize;
    let stride = dst.stride(0);
    let data = dst.data_mut(0);
    for row in 0..height {
        let start = row * src_row_bytes;
        let from = src
            .get(start..start + row_bytes)
            .context("source frame row is out of bounds")?;
        let to = data
            .get_mut(row * stride..row * stride + row_bytes)
            .context("ffmpeg frame row is out of bounds")?;
        to.copy_from_slice(from);
    }
    Ok(())
}
