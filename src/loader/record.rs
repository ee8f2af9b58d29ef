//! Decoding of the data records that follow the file header.

use super::header::leading_number;
use crate::error::{CrgError, Result};
use smallvec::SmallVec;

/// Width of one line of a long record, in bytes.
const LINE_WIDTH: usize = 80;

/// The values of one record, one per declared column.
pub(crate) type Record = SmallVec<[f64; 16]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Layout {
    /// Records are padded to whole 80 byte lines.
    Long,
    /// Records are packed back to back.
    Compact,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Precision {
    Double,
    Single,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Encoding {
    /// Fixed-width formatted text fields.
    Ascii,
    /// Big-endian IEEE 754 values.
    Binary,
}

/// How the records of a file are laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RecordFormat {
    pub layout: Layout,
    pub precision: Precision,
    pub encoding: Encoding,
}

impl RecordFormat {
    /// Parses a record format tag such as `LDFI` or `KRBI`.
    pub fn parse(tag: &str) -> Result<Self> {
        let unknown = || CrgError::UnknownRecordFormat(tag.to_string());
        let mut chars = tag.chars().map(|c| c.to_ascii_uppercase());
        let layout = match chars.next() {
            Some('L') => Layout::Long,
            Some('C' | 'K') => Layout::Compact,
            _ => return Err(unknown()),
        };
        let precision = match chars.next() {
            Some('D') => Precision::Double,
            Some('S' | 'R') => Precision::Single,
            _ => return Err(unknown()),
        };
        let encoding = match chars.next() {
            Some('F') => Encoding::Ascii,
            Some('B') => Encoding::Binary,
            _ => return Err(unknown()),
        };
        Ok(Self {
            layout,
            precision,
            encoding,
        })
    }

    /// The number of bytes taken by one value.
    pub fn field_width(&self) -> usize {
        match (self.encoding, self.precision) {
            (Encoding::Ascii, Precision::Double) => 20,
            (Encoding::Ascii, Precision::Single) => 10,
            (Encoding::Binary, Precision::Double) => 8,
            (Encoding::Binary, Precision::Single) => 4,
        }
    }

    /// The number of bytes taken by one record of `columns` values.
    pub fn record_size(&self, columns: usize) -> usize {
        let size = self.field_width() * columns;
        match self.layout {
            Layout::Long => size.div_ceil(LINE_WIDTH) * LINE_WIDTH,
            Layout::Compact => size,
        }
    }
}

/// Reads records one after another from the data section of a file.
pub(crate) struct RecordReader<'a> {
    data: &'a [u8],
    pos: usize,
    format: RecordFormat,
    columns: usize,
    records: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(data: &'a [u8], format: RecordFormat, columns: usize) -> Self {
        Self {
            data,
            pos: 0,
            format,
            columns,
            records: 0,
        }
    }

    fn truncated(&self) -> CrgError {
        CrgError::TruncatedData {
            records: self.records,
        }
    }

    fn read(&mut self) -> Result<Option<Record>> {
        let record = match (self.format.encoding, self.format.layout) {
            (Encoding::Binary, _) => self.read_binary()?,
            (Encoding::Ascii, Layout::Compact) => self.read_compact_ascii()?,
            (Encoding::Ascii, Layout::Long) => self.read_long_ascii()?,
        };
        if record.is_some() {
            self.records += 1;
        }
        Ok(record)
    }

    fn read_binary(&mut self) -> Result<Option<Record>> {
        let size = self.format.record_size(self.columns);
        let rest = &self.data[self.pos..];
        if rest.is_empty() {
            return Ok(None);
        }
        if rest.len() < size {
            return Err(self.truncated());
        }
        let width = self.format.field_width();
        let record = rest[..width * self.columns]
            .chunks_exact(width)
            .map(|field| match self.format.precision {
                Precision::Single => f32::from_be_bytes([field[0], field[1], field[2], field[3]]) as f64,
                Precision::Double => {
                    let mut bytes = [0; 8];
                    bytes.copy_from_slice(field);
                    f64::from_be_bytes(bytes)
                }
            })
            .collect();
        self.pos += size;
        Ok(Some(record))
    }

    fn read_compact_ascii(&mut self) -> Result<Option<Record>> {
        if self.at_blank_end() {
            return Ok(None);
        }
        let width = self.format.field_width();
        let mut record = Record::new();
        for _ in 0..self.columns {
            self.skip_line_breaks();
            let end = self.pos + width;
            if end > self.data.len() {
                return Err(self.truncated());
            }
            record.push(decode_ascii_field(&self.data[self.pos..end]));
            self.pos = end;
        }
        Ok(Some(record))
    }

    fn read_long_ascii(&mut self) -> Result<Option<Record>> {
        if self.at_blank_end() {
            return Ok(None);
        }
        self.skip_line_breaks();
        let lines = self.format.record_size(self.columns) / LINE_WIDTH;
        let mut text = Vec::with_capacity(lines * LINE_WIDTH);
        for line in 0..lines {
            if line > 0 && self.pos >= self.data.len() {
                return Err(self.truncated());
            }
            let rest = &self.data[self.pos..];
            let len = rest
                .iter()
                .position(|b| *b == b'\n' || *b == b'\r')
                .unwrap_or(rest.len());
            text.extend_from_slice(&rest[..len.min(LINE_WIDTH)]);
            text.resize((line + 1) * LINE_WIDTH, b' ');
            self.pos += len;
            self.skip_line_break();
        }
        let record = text
            .chunks_exact(self.format.field_width())
            .take(self.columns)
            .map(decode_ascii_field)
            .collect();
        Ok(Some(record))
    }

    /// Returns true, consuming the rest of the data, if nothing but white
    /// space is left.
    fn at_blank_end(&mut self) -> bool {
        if self.data[self.pos..].iter().all(|b| b.is_ascii_whitespace()) {
            self.pos = self.data.len();
            true
        } else {
            false
        }
    }

    fn skip_line_breaks(&mut self) {
        while matches!(self.data.get(self.pos), Some(b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    /// Skips one line terminator, which may be `\r\n`.
    fn skip_line_break(&mut self) {
        match self.data.get(self.pos) {
            Some(b'\r') => {
                self.pos += 1;
                if self.data.get(self.pos) == Some(&b'\n') {
                    self.pos += 1;
                }
            }
            Some(b'\n') => self.pos += 1,
            _ => {}
        }
    }
}

impl Iterator for RecordReader<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read() {
            Ok(record) => record.map(Ok),
            Err(err) => {
                self.pos = self.data.len();
                Some(Err(err))
            }
        }
    }
}

/// Decodes one formatted field. Blank fields read as zero, as does the
/// marker `**unused**`; any other field that is not a number reads as NaN.
pub(crate) fn decode_ascii_field(field: &[u8]) -> f64 {
    if field == b"**unused**" {
        return 0.0;
    }
    if !field.iter().all(|b| b"0123456789+-.eEdD ".contains(b)) {
        return f64::NAN;
    }
    let text: String = field
        .iter()
        .map(|b| match b {
            b'd' | b'D' => 'e',
            b => *b as char,
        })
        .collect();
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    text.parse()
        .ok()
        .or_else(|| leading_number(text))
        .unwrap_or(f64::NAN)
}
