//! Standard MIDI File input and output

use midly::{Format, Header, Smf, Timing, TrackEvent};
use std::path::{Path, PathBuf};

use crate::error::{Result, SplitError};

pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| SplitError::ReadInput {
        path: path.to_path_buf(),
        source,
    })
}

/// Header for an output sequence with `tracks` tracks and the input's timing
pub fn output_header(timing: Timing, tracks: usize) -> Result<Header> {
    let format = match tracks {
        0 => return Err(SplitError::NoSupportedFormat { tracks }),
        1 => Format::SingleTrack,
        _ => Format::Parallel,
    };
    Ok(Header::new(format, timing))
}

/// `<output_dir>/<stem><suffix>.mid`, where the stem drops a `.mid`/`.midi` extension
pub fn output_path(input: &Path, output_dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SplitError::InvalidInputPath(input.to_path_buf()))?;

    let lower = name.to_ascii_lowercase();
    let stem = [".midi", ".mid"]
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map_or(name, |ext| &name[..name.len() - ext.len()]);

    Ok(output_dir.join(format!("{}{}.mid", stem, suffix)))
}

pub fn write_output(path: &Path, timing: Timing, tracks: Vec<Vec<TrackEvent>>) -> Result<()> {
    let header = output_header(timing, tracks.len())?;
    let smf = Smf { header, tracks };
    smf.save(path).map_err(|source| SplitError::Write {
        path: path.to_path_buf(),
        source,
    })
}
