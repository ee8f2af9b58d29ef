//! Reading road surfaces from CRG files.
//!
//! A file is a text header, split into `$` sections, followed by a data
//! section of fixed-width ASCII or big-endian binary records. A header may
//! include further files; everything read goes into one data set, with the
//! options and modifiers of the outermost file taking precedence.

use crate::channel::Channel;
use crate::dataset::DataSet;
use crate::error::{CrgError, Result};
use crate::options::{Options, Value, ValueKind};
use header::{ChannelKind, Definition, Section, Setting};
use itertools::{Itertools, MinMaxResult};
use log::{debug, info, warn};
use record::{Encoding, RecordFormat, RecordReader};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

mod header;
mod record;

/// Deepest accepted nesting of included files.
const MAX_INCLUDE_DEPTH: usize = 16;

/// Smallest accepted spacing of reference line samples and long sections.
const MIN_SPACING: f64 = 1.0e-6; // m

/// Largest accepted spread of the reference line sample spacing, relative
/// to the smallest spacing.
const MAX_SPACING_SPREAD: f64 = 3.0e-2;

/// Long sections closer to uniform than this, relative to the smallest
/// spacing, are treated as uniform.
const UNIFORM_SPACING_SPREAD: f64 = 1.0e-3;

/// Loads a road surface from a file.
pub fn load_file(path: impl AsRef<Path>) -> Result<DataSet> {
    let mut loader = Loader::default();
    loader.read_file(path.as_ref())?;
    loader.finish()
}

/// Loads a road surface from the contents of a file. Relative include
/// paths are resolved against the working directory.
pub fn load_bytes(bytes: &[u8]) -> Result<DataSet> {
    let mut loader = Loader::default();
    loader.read(bytes, None)?;
    loader.finish()
}

#[derive(Default)]
struct Loader {
    ds: DataSet,
    /// Include depth of the file being read.
    level: usize,
    /// Include depth of the file whose options section is in effect.
    opt_level: Option<usize>,
    /// Include depth of the file whose modifiers section is in effect.
    mod_level: Option<usize>,
    has_data: bool,
}

/// What one file declares about the layout of its records.
#[derive(Default)]
struct FileState {
    section: Section,
    columns: usize,
    /// Position or index of each long section, with its column.
    long_sections: Vec<(f64, usize)>,
    by_position: bool,
    by_index: bool,
    channels: Vec<(ChannelKind, usize)>,
    format: Option<RecordFormat>,
    include: String,
}

impl FileState {
    fn define(&mut self, definition: Definition) -> Result<()> {
        match definition {
            Definition::LongSectionAt(v) => {
                self.by_position = true;
                self.long_sections.push((v, self.columns));
                self.columns += 1;
            }
            Definition::LongSectionIndex(i) => {
                self.by_index = true;
                self.long_sections.push((i, self.columns));
                self.columns += 1;
            }
            Definition::Channel(kind) => {
                self.channels.push((kind, self.columns));
                self.columns += 1;
            }
            Definition::Unused => self.columns += 1,
            Definition::Format(tag) => self.format = Some(RecordFormat::parse(&tag)?),
            Definition::Independent => {}
        }
        Ok(())
    }

    /// The column of a reference line channel; the last definition wins.
    fn channel(&self, kind: ChannelKind) -> Option<usize> {
        self.channels
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .map(|(_, column)| *column)
    }
}

/// Splits a file image into header lines. Each line ends at `\n`, `\r\n`
/// or `\r`; the data section starts right after the line that opens it.
struct Lines<'a> {
    data: &'a [u8],
    pos: usize,
    line_no: usize,
}

impl<'a> Lines<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            line_no: 0,
        }
    }

    fn next_line(&mut self) -> Option<(usize, Cow<'a, str>)> {
        let data = self.data;
        if self.pos >= data.len() {
            return None;
        }
        let rest = &data[self.pos..];
        let len = rest
            .iter()
            .position(|b| *b == b'\n' || *b == b'\r')
            .unwrap_or(rest.len());
        self.pos += len;
        match data.get(self.pos) {
            Some(b'\r') => {
                self.pos += 1;
                if data.get(self.pos) == Some(&b'\n') {
                    self.pos += 1;
                }
            }
            Some(b'\n') => self.pos += 1,
            _ => {}
        }
        self.line_no += 1;
        Some((self.line_no, String::from_utf8_lossy(&rest[..len])))
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

impl Loader {
    fn read_file(&mut self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path).map_err(|source| CrgError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("reading {} ({} bytes)", path.display(), bytes.len());
        self.read(&bytes, path.parent())
    }

    /// Reads one file image. `dir` is the directory of the file, if it has one.
    fn read(&mut self, bytes: &[u8], dir: Option<&Path>) -> Result<()> {
        let mut file = FileState::default();
        let mut lines = Lines::new(bytes);

        while let Some((line_no, line)) = lines.next_line() {
            match file.section {
                Section::Comment => {
                    if !line.starts_with('$') {
                        continue;
                    }
                }
                Section::File => {
                    if header::is_comment(&line) {
                        continue;
                    }
                    if !line.starts_with('$') {
                        file.include.push_str(&expand_path(&line));
                        continue;
                    }
                    self.include(&mut file, dir)?;
                }
                _ => {
                    if header::is_comment(&line) {
                        continue;
                    }
                    if !line.trim_start().starts_with('$') {
                        self.decode_line(&mut file, &line, line_no)?;
                        continue;
                    }
                }
            }

            self.enter_section(&mut file, &line);
            if file.section == Section::DataContent {
                return self.read_data(&file, lines.rest());
            }
        }

        if file.section == Section::File {
            self.include(&mut file, dir)?;
        }
        Ok(())
    }

    fn enter_section(&mut self, file: &mut FileState, line: &str) {
        let section = header::section_tag(line).unwrap_or_default();
        debug!("section {:?} at include level {}", section, self.level);
        match section {
            Section::Options if self.level == 0 || self.opt_level.is_none() => {
                self.ds.options = Options::default_options();
                self.opt_level = Some(self.level);
            }
            Section::Modifiers if self.level == 0 || self.mod_level.is_none() => {
                self.ds.modifiers.remove_all();
                self.mod_level = Some(self.level);
            }
            _ => {}
        }
        file.section = section;
    }

    fn decode_line(&mut self, file: &mut FileState, line: &str, line_no: usize) -> Result<()> {
        match file.section {
            Section::RoadCrg => match header::header_key(line) {
                Some(key) => match header::assigned(line).and_then(header::leading_number) {
                    Some(value) => header::apply_header(&mut self.ds, key, value),
                    None => warn!("line {}: no value in {:?}", line_no, line.trim()),
                },
                None => warn!("line {}: ignoring {:?}", line_no, line.trim()),
            },
            Section::Options | Section::Modifiers => self.decode_setting(file.section, line, line_no),
            Section::DataDefinition => match header::definition(line, line_no)? {
                Some(definition) => file.define(definition)?,
                None => warn!("line {}: ignoring {:?}", line_no, line.trim()),
            },
            _ => debug!("line {}: outside of any section", line_no),
        }
        Ok(())
    }

    fn decode_setting(&mut self, section: Section, line: &str, line_no: usize) {
        let modifiers = section == Section::Modifiers;
        let id = match header::setting(line, modifiers) {
            Some(Setting::Option(id)) => id,
            Some(Setting::Ignored) => return,
            None => {
                warn!("line {}: unknown setting {:?}", line_no, line.trim());
                return;
            }
        };

        let claimed = if modifiers { self.mod_level } else { self.opt_level };
        if self.level != 0 && claimed != Some(self.level) {
            debug!("line {}: {:?} is overridden by an including file", line_no, id);
            return;
        }

        let text = header::assigned(line).unwrap_or_default();
        let value = match id.kind() {
            ValueKind::Int => header::leading_int(text).map(Value::Int),
            ValueKind::Double => header::leading_number(text).map(Value::Double),
        };
        let target = if modifiers {
            &mut self.ds.modifiers
        } else {
            &mut self.ds.options
        };
        match value.map(|value| target.set(id, value)) {
            Some(Ok(())) => debug!("line {}: {:?} = {:?}", line_no, id, value),
            Some(Err(err)) => warn!("line {}: {}", line_no, err),
            None => warn!("line {}: no value for {:?}", line_no, id),
        }
    }

    fn include(&mut self, file: &mut FileState, dir: Option<&Path>) -> Result<()> {
        let name = std::mem::take(&mut file.include);
        if name.is_empty() {
            return Ok(());
        }
        if self.level >= MAX_INCLUDE_DEPTH {
            return Err(CrgError::Inconsistent(format!(
                "includes nested deeper than {} levels",
                MAX_INCLUDE_DEPTH
            )));
        }
        let path = resolve_include(Path::new(name.trim()), dir);
        self.level += 1;
        let result = self.read_file(&path);
        self.level -= 1;
        result
    }

    fn read_data(&mut self, file: &FileState, data: &[u8]) -> Result<()> {
        if self.has_data {
            return Err(CrgError::Inconsistent(
                "more than one data section".to_string(),
            ));
        }
        let format = file.format.ok_or_else(|| {
            CrgError::Inconsistent("data section without a record format".to_string())
        })?;
        let x_column = file.channel(ChannelKind::X);
        let y_column = file.channel(ChannelKind::Y);
        if x_column.is_some() != y_column.is_some() {
            return Err(CrgError::Inconsistent(
                "reference line x and y must be given together".to_string(),
            ));
        }
        if file.long_sections.len() < 2 {
            return Err(CrgError::Inconsistent(
                "at least two long sections are required".to_string(),
            ));
        }
        if file.by_position && file.by_index {
            return Err(CrgError::Inconsistent(
                "long sections are given both by position and by index".to_string(),
            ));
        }

        let mut sections = file.long_sections.clone();
        sections.sort_by(|a, b| a.0.total_cmp(&b.0));
        let positions = if file.by_position {
            self.positions_from_values(&sections)?
        } else {
            self.positions_from_indices(&sections)?
        };

        let expected = self.expected_records();
        let data = match (format.encoding, expected) {
            (Encoding::Binary, Some(count)) => {
                &data[..data.len().min(count * format.record_size(file.columns))]
            }
            _ => data,
        };
        let records = RecordReader::new(data, format, file.columns).collect::<Result<Vec<_>>>()?;
        let n = records.len();
        if let (Encoding::Binary, Some(count)) = (format.encoding, expected) {
            if n < count {
                return Err(CrgError::TruncatedData { records: n });
            }
        }
        if n < 2 {
            return Err(CrgError::Inconsistent(
                "at least two cross sections are required".to_string(),
            ));
        }
        let column = |c: usize| records.iter().map(|record| record[c]).collect::<Vec<f64>>();

        if let (Some(xc), Some(yc)) = (x_column, y_column) {
            let xs = column(xc);
            let ys = column(yc);
            let steps: Vec<f64> = xs
                .iter()
                .zip(&ys)
                .tuple_windows()
                .map(|((x0, y0), (x1, y1))| (x1 - x0).hypot(y1 - y0))
                .collect();
            check_spacing(&steps, "reference line point")?;
            let length: f64 = steps.iter().sum();
            self.ds.u.inc = length / (n - 1) as f64;
            self.ds.u.last = self.ds.u.first + length;
            for (channel, values, c) in [(&mut self.ds.x, xs, xc), (&mut self.ds.y, ys, yc)] {
                channel.set_data(values);
                channel.defined = true;
                channel.column = Some(c);
            }
        } else if let Some(uc) = file.channel(ChannelKind::U) {
            let us = column(uc);
            let steps: Vec<f64> = us.iter().tuple_windows().map(|(a, b)| b - a).collect();
            check_spacing(&steps, "u")?;
            self.ds.u.first = us[0];
            self.ds.u.last = us[n - 1];
            self.ds.u.inc = (us[n - 1] - us[0]) / (n - 1) as f64;
            self.ds.u.defined = true;
            self.ds.u.column = Some(uc);
        } else {
            if !(self.ds.u.inc > 0.0) {
                return Err(CrgError::Inconsistent(
                    "reference line increment must be positive".to_string(),
                ));
            }
            self.ds.u.last = self.ds.u.first + self.ds.u.inc * (n - 1) as f64;
        }

        self.ds.z = sections
            .iter()
            .map(|(_, c)| {
                let mut row = Channel::<f32>::default();
                row.set_data(records.iter().map(|record| record[*c] as f32).collect());
                row.defined = true;
                row.column = Some(*c);
                row
            })
            .collect();

        if let Some(pc) = file.channel(ChannelKind::Phi) {
            let mut phi = column(pc);
            phi[0] = self.ds.phi.first;
            self.ds.phi.set_data(phi);
            self.ds.phi.defined = true;
            self.ds.phi.column = Some(pc);
        }
        for (kind, channel) in [
            (ChannelKind::Slope, &mut self.ds.slope),
            (ChannelKind::Bank, &mut self.ds.bank),
        ] {
            if let Some(c) = file.channel(kind) {
                channel.set_data(column(c));
                channel.defined = true;
                channel.column = Some(c);
            }
        }

        let last = positions.len() - 1;
        self.ds.v.first = positions[0];
        self.ds.v.last = positions[last];
        self.ds.v.set_data(positions);
        self.ds.v.defined = true;
        self.ds.defs.v_by_position = file.by_position;
        self.ds.defs.v_by_index = file.by_index;
        self.ds.columns = file.columns;
        self.has_data = true;
        info!(
            "read {} cross sections of {} long sections ({:?})",
            n,
            sections.len(),
            format
        );
        Ok(())
    }

    fn positions_from_values(&mut self, sections: &[(f64, usize)]) -> Result<Vec<f64>> {
        let positions: Vec<f64> = sections.iter().map(|(v, _)| *v).collect();
        let steps: Vec<f64> = positions.iter().tuple_windows().map(|(a, b)| b - a).collect();
        let (min, max) = match steps.iter().copied().minmax() {
            MinMaxResult::NoElements => (f64::NAN, f64::NAN),
            MinMaxResult::OneElement(step) => (step, step),
            MinMaxResult::MinMax(min, max) => (min, max),
        };
        if !(min >= MIN_SPACING) {
            return Err(CrgError::Inconsistent(format!(
                "long sections {} m apart",
                min
            )));
        }
        let last = positions.len() - 1;
        self.ds.v.inc = (positions[last] - positions[0]) / last as f64;
        self.ds.v_uniform = (max - min) / min < UNIFORM_SPACING_SPREAD;
        Ok(positions)
    }

    fn positions_from_indices(&mut self, sections: &[(f64, usize)]) -> Result<Vec<f64>> {
        let n = sections.len();
        if sections
            .iter()
            .enumerate()
            .any(|(i, (index, _))| *index != (i + 1) as f64)
        {
            return Err(CrgError::Inconsistent(format!(
                "long section numbers must run from 1 to {}",
                n
            )));
        }
        let right = self.ds.v.first;
        let inc = if self.ds.v.inc > 0.0 {
            self.ds.v.inc
        } else if self.ds.v.last > right {
            (self.ds.v.last - right) / (n - 1) as f64
        } else {
            return Err(CrgError::Inconsistent(
                "numbered long sections need a positive increment".to_string(),
            ));
        };
        self.ds.v.inc = inc;
        self.ds.v_uniform = true;
        Ok((0..n).map(|i| right + i as f64 * inc).collect())
    }

    /// The number of records implied by the header, if it gives the end of
    /// the reference line.
    fn expected_records(&self) -> Option<usize> {
        let u = &self.ds.u;
        if self.ds.defs.u_end && u.inc > 0.0 && u.last > u.first {
            Some(((u.last - u.first) / u.inc + 0.5) as usize + 1)
        } else {
            None
        }
    }

    fn finish(self) -> Result<DataSet> {
        if !self.has_data {
            return Err(CrgError::NoData);
        }
        let mut ds = self.ds;
        ds.prepare();
        ds.check()?;
        ds.apply_modifiers()?;
        ds.log_summary();
        Ok(ds)
    }
}

/// Rejects reference line spacings that are too small or too uneven.
fn check_spacing(steps: &[f64], what: &str) -> Result<()> {
    let (min, max) = match steps.iter().copied().minmax() {
        MinMaxResult::NoElements => return Ok(()),
        MinMaxResult::OneElement(step) => (step, step),
        MinMaxResult::MinMax(min, max) => (min, max),
    };
    if !(min >= MIN_SPACING) {
        return Err(CrgError::Inconsistent(format!(
            "{} spacing {} m is below {} m",
            what, min, MIN_SPACING
        )));
    }
    if (max - min) / min > MAX_SPACING_SPREAD {
        return Err(CrgError::Inconsistent(format!(
            "{} spacing varies between {} m and {} m",
            what, min, max
        )));
    }
    Ok(())
}

/// The include path given by one line of a file section. `$NAME` is
/// replaced by the environment variable `NAME`, which ends at the next `/`.
fn expand_path(line: &str) -> String {
    let item = line
        .trim_start()
        .split(|c: char| c == '!' || c.is_whitespace())
        .next()
        .unwrap_or_default();
    let mut path = String::new();
    let mut rest = item;
    while let Some(at) = rest.find('$') {
        path.push_str(&rest[..at]);
        let var = &rest[at + 1..];
        let end = var.find('/').unwrap_or(var.len());
        match std::env::var(&var[..end]) {
            Ok(value) => path.push_str(&value),
            Err(_) => warn!("environment variable {} is not set", &var[..end]),
        }
        rest = &var[end..];
    }
    path.push_str(rest);
    path
}

/// Relative include paths are looked up next to the including file first.
fn resolve_include(path: &Path, dir: Option<&Path>) -> PathBuf {
    if path.is_relative() {
        if let Some(dir) = dir {
            let candidate = dir.join(path);
            if candidate.exists() {
                return candidate;
            }
        }
    }
    path.to_path_buf()
}
