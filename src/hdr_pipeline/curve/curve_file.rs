//! Text persistence for curves.
//!
//! Layout, one row per bin after a header row:
//!
//! ```text
//! <name>,Red,Green,Blue,
//! 0,<r0>,<g0>,<b0>,
//! 1,<r1>,<g1>,<b1>,
//! ```
//!
//! The header row and the index column are written for readability and
//! ignored on read; row order defines the bin.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, instrument};

use crate::hdr_pipeline::common::error::{HdrError, Result};
use crate::hdr_pipeline::curve::response_curve::{RGB_CHANNELS, ResponseCurve};

const CHANNEL_NAMES: [&str; 3] = ["Red", "Green", "Blue"];

fn channel_name(channel: usize) -> String {
    CHANNEL_NAMES
        .get(channel)
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("Channel{channel}"))
}

impl ResponseCurve {
    /// Writes the header and one row per bin.
    pub fn write_to<W: Write>(&self, writer: &mut W, name: &str) -> Result<()> {
        write!(writer, "{name},")?;
        for channel in 0..self.channel_count() {
            write!(writer, "{},", channel_name(channel))?;
        }
        writeln!(writer)?;

        for index in 0..self.bins() {
            write!(writer, "{index},")?;
            for channel in 0..self.channel_count() {
                // Display for f32 is the shortest text that parses back exactly.
                write!(writer, "{},", self.channel(channel)[index])?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn write<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            HdrError::OutputWriteError(format!("{}: {}", path.display(), e))
        })?;

        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer, name)?;
        writer.flush()?;

        debug!(bins = self.bins(), "Curve written");
        Ok(())
    }

    /// Parses an RGB curve.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        Self::read_channels_from(reader, RGB_CHANNELS)
    }

    /// Parses a curve of `channel_count` channels. The header row is
    /// skipped unread; every data row must carry the index plus one value
    /// per channel, and extra trailing fields are ignored.
    pub fn read_channels_from<R: BufRead>(reader: R, channel_count: usize) -> Result<Self> {
        if channel_count == 0 {
            return Err(HdrError::FileFormat("curve needs at least one channel".to_string()));
        }

        let mut lines = reader.lines();
        lines
            .next()
            .ok_or_else(|| HdrError::FileFormat("missing header row".to_string()))??;

        let mut channels = vec![Vec::new(); channel_count];
        for (row, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let line_number = row + 2;

            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() < channel_count + 1 {
                return Err(HdrError::FileFormat(format!(
                    "line {line_number}: expected at least {} fields, found {}",
                    channel_count + 1,
                    fields.len()
                )));
            }

            for (curve, field) in channels.iter_mut().zip(&fields[1..=channel_count]) {
                let value = field.trim().parse::<f32>().map_err(|e| {
                    HdrError::FileFormat(format!(
                        "line {line_number}: invalid value '{field}': {e}"
                    ))
                })?;
                curve.push(value);
            }
        }

        if channels[0].is_empty() {
            return Err(HdrError::FileFormat("no data rows".to_string()));
        }
        Self::from_channels(channels)
    }

    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            HdrError::InputReadError(format!("{}: {}", path.display(), e))
        })?;

        let curve = Self::read_from(BufReader::new(file))?;
        debug!(bins = curve.bins(), channels = curve.channel_count(), "Curve read");
        Ok(curve)
    }

    /// Replaces this curve with the file's content. On any failure the
    /// curve is left as it was.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        *self = Self::read(path)?;
        Ok(())
    }
}
