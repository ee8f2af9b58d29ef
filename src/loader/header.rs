//! Classification and decoding of the text lines of a file header.

use crate::dataset::DataSet;
use crate::error::{CrgError, Result};
use crate::options::OptionId;

/// The sections of a file header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Section {
    #[default]
    None,
    RoadCrg,
    Comment,
    DataDefinition,
    Options,
    Modifiers,
    File,
    DataContent,
}

const SECTION_TAGS: [(&str, Section); 8] = [
    ("$ROAD_CRG_MODS", Section::Modifiers),
    ("$ROAD_CRG_OPTS", Section::Options),
    ("$ROAD_CRG_FILE", Section::File),
    ("$ROAD_CRG", Section::RoadCrg),
    ("$CT", Section::Comment),
    ("$KD_DEFINITION", Section::DataDefinition),
    ("$$$$", Section::DataContent),
    ("$", Section::None),
];

/// A value given in the road description section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HeaderKey {
    StartU,
    StartX,
    StartY,
    StartZ,
    StartPhi,
    StartBank,
    StartSlope,
    EndU,
    EndX,
    EndY,
    EndZ,
    EndPhi,
    EndBank,
    EndSlope,
    Increment,
    VRight,
    VLeft,
    VIncrement,
    /// Accepted for compatibility, without effect.
    Offset,
}

const HEADER_KEYWORDS: [(&str, HeaderKey); 22] = [
    ("reference_line_start_u", HeaderKey::StartU),
    ("reference_line_start_x", HeaderKey::StartX),
    ("reference_line_start_y", HeaderKey::StartY),
    ("reference_line_start_z", HeaderKey::StartZ),
    ("reference_line_start_phi", HeaderKey::StartPhi),
    ("reference_line_start_b", HeaderKey::StartBank),
    ("reference_line_start_s", HeaderKey::StartSlope),
    ("reference_line_end_u", HeaderKey::EndU),
    ("reference_line_end_x", HeaderKey::EndX),
    ("reference_line_end_y", HeaderKey::EndY),
    ("reference_line_end_z", HeaderKey::EndZ),
    ("reference_line_end_phi", HeaderKey::EndPhi),
    ("reference_line_end_b", HeaderKey::EndBank),
    ("reference_line_end_s", HeaderKey::EndSlope),
    ("reference_line_increment", HeaderKey::Increment),
    ("long_section_v_right", HeaderKey::VRight),
    ("long_section_v_left", HeaderKey::VLeft),
    ("long_section_v_increment", HeaderKey::VIncrement),
    ("reference_line_offset_x", HeaderKey::Offset),
    ("reference_line_offset_y", HeaderKey::Offset),
    ("reference_line_offset_z", HeaderKey::Offset),
    ("reference_line_offset_phi", HeaderKey::Offset),
];

/// Keywords of the options section that are accepted but have no effect.
const IGNORED_OPTION_KEYWORDS: [&str; 9] = [
    "warn_curv_local",
    "warn_curv_global",
    "log_msgs",
    "log_eval",
    "log_eval_freq",
    "log_hist",
    "log_hist_freq",
    "log_stat",
    "log_stat_freq",
];

/// A line of an options or modifiers section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Setting {
    Option(OptionId),
    Ignored,
}

/// What a line of the data definition section declares.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Definition {
    /// A long section given by its position across the road.
    LongSectionAt(f64),
    /// A long section given by its index, counted from 1.
    LongSectionIndex(f64),
    /// A reference line channel.
    Channel(ChannelKind),
    /// A column that is read but not used.
    Unused,
    /// The record format tag.
    Format(String),
    /// A description of the independent variable, without effect.
    Independent,
}

/// The reference line channels a record column may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChannelKind {
    U,
    X,
    Y,
    Phi,
    Slope,
    Bank,
}

impl ChannelKind {
    fn unit(self) -> &'static str {
        match self {
            ChannelKind::U | ChannelKind::X | ChannelKind::Y => "m",
            ChannelKind::Phi => "rad",
            ChannelKind::Slope | ChannelKind::Bank => "m/m",
        }
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len() && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Finds the longest keyword of `table` that `line` begins with, ignoring
/// leading spaces and case.
fn longest_prefix<'t, T: Copy>(line: &str, table: impl IntoIterator<Item = (&'t str, T)>) -> Option<T> {
    let line = line.trim_start();
    table
        .into_iter()
        .filter(|(keyword, _)| starts_with_ignore_case(line, keyword))
        .max_by_key(|(keyword, _)| keyword.len())
        .map(|(_, value)| value)
}

/// Finds `token` in `text`, ignoring case and anything after a `!`, and
/// returns the text following it.
fn find_token<'a>(text: &'a str, token: &str) -> Option<&'a str> {
    let end = text.find('!').unwrap_or(text.len());
    let text = &text[..end];
    let lower = text.to_ascii_lowercase();
    lower
        .find(&token.to_ascii_lowercase())
        .map(|at| &text[at + token.len()..])
}

/// Returns true for lines that are skipped: blank lines and lines whose
/// first non-space character is `*`.
pub(crate) fn is_comment(line: &str) -> bool {
    line.trim_start().chars().next().map_or(true, |c| c == '*')
}

/// The section a `$` line switches to.
pub(crate) fn section_tag(line: &str) -> Option<Section> {
    longest_prefix(line, SECTION_TAGS)
}

pub(crate) fn header_key(line: &str) -> Option<HeaderKey> {
    longest_prefix(line, HEADER_KEYWORDS)
}

/// Classifies a line of an options (`modifiers == false`) or modifiers section.
pub(crate) fn setting(line: &str, modifiers: bool) -> Option<Setting> {
    let settings = OptionId::ALL
        .iter()
        .filter(|id| id.is_modifier() == modifiers)
        .filter_map(|id| id.keyword().map(|keyword| (keyword, Setting::Option(*id))));
    let ignored = IGNORED_OPTION_KEYWORDS
        .iter()
        .filter(|_| !modifiers)
        .map(|keyword| (*keyword, Setting::Ignored));
    longest_prefix(line, settings.chain(ignored))
}

/// The text after the `=` of an assignment.
pub(crate) fn assigned(line: &str) -> Option<&str> {
    line.split_once('=').map(|(_, value)| value)
}

/// Parses the number at the start of `text`, in the manner of C's `atof`:
/// leading spaces are skipped and parsing stops at the first character that
/// cannot continue the number. Fortran `D` exponents are accepted.
pub(crate) fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits = |from: usize| bytes[from.min(bytes.len())..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int = digits(end);
    end += int;
    let mut frac = 0;
    if bytes.get(end) == Some(&b'.') {
        frac = digits(end + 1);
        end += 1 + frac;
    }
    if int + frac == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E' | b'd' | b'D')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let count = digits(exp);
        if count > 0 {
            end = exp + count;
        }
    }
    text[..end].replace(|c: char| c == 'd' || c == 'D', "e").parse().ok()
}

/// Parses the integer at the start of `text`, in the manner of C's `atoi`.
pub(crate) fn leading_int(text: &str) -> Option<i32> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let sign = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let count = bytes[sign..].iter().take_while(|b| b.is_ascii_digit()).count();
    if count == 0 {
        return None;
    }
    text[..sign + count].parse().ok()
}

/// Stores a value of the road description section in the data set.
pub(crate) fn apply_header(ds: &mut DataSet, key: HeaderKey, value: f64) {
    match key {
        HeaderKey::StartU => ds.u.first = value,
        HeaderKey::StartX => ds.x.first = value,
        HeaderKey::StartY => ds.y.first = value,
        HeaderKey::StartZ => {
            ds.ref_z.first = value;
            ds.defs.z_start = true;
        }
        HeaderKey::StartPhi => ds.phi.first = value,
        HeaderKey::StartBank => ds.bank.first = value,
        HeaderKey::StartSlope => ds.slope.first = value,
        HeaderKey::EndU => {
            ds.u.last = value;
            ds.defs.u_end = true;
        }
        HeaderKey::EndX => {
            ds.x.last = value;
            ds.defs.x_end = true;
        }
        HeaderKey::EndY => {
            ds.y.last = value;
            ds.defs.y_end = true;
        }
        HeaderKey::EndZ => {
            ds.ref_z.last = value;
            ds.defs.z_end = true;
        }
        HeaderKey::EndPhi => ds.phi.last = value,
        HeaderKey::EndBank => {
            ds.bank.last = value;
            ds.defs.bank_end = true;
        }
        HeaderKey::EndSlope => {
            ds.slope.last = value;
            ds.defs.slope_end = true;
        }
        HeaderKey::Increment => ds.u.inc = value,
        HeaderKey::VRight => ds.v.first = value,
        HeaderKey::VLeft => ds.v.last = value,
        HeaderKey::VIncrement => ds.v.inc = value,
        HeaderKey::Offset => {}
    }
}

/// Decodes a line of the data definition section.
pub(crate) fn definition(line: &str, line_no: usize) -> Result<Option<Definition>> {
    let trimmed = line.trim_start();
    if starts_with_ignore_case(trimmed, "U:") {
        return Ok(Some(Definition::Independent));
    }
    if starts_with_ignore_case(trimmed, "#:") {
        let tag: String = trimmed[2..].trim_start().chars().take(4).collect();
        return Ok(Some(Definition::Format(tag)));
    }
    if !starts_with_ignore_case(trimmed, "D:") {
        return Ok(None);
    }
    let body = &trimmed[2..];

    if let Some(rest) = find_token(body, "long section") {
        let (value, by_position) = match find_token(rest, "at v ") {
            Some(at) => {
                let value = assigned(at).ok_or_else(|| {
                    CrgError::format(line_no, "long section position lacks '='")
                })?;
                (value, true)
            }
            None => (rest, false),
        };
        let position = leading_number(value)
            .ok_or_else(|| CrgError::format(line_no, "long section without a position"))?;
        let unit = value
            .split_once(',')
            .map(|(_, unit)| unit.trim_start())
            .ok_or_else(|| CrgError::format(line_no, "long section without a unit"))?;
        if !unit.starts_with('m') {
            return Err(CrgError::format(line_no, format!("long section unit '{}'", unit.trim())));
        }
        return Ok(Some(if by_position {
            Definition::LongSectionAt(position)
        } else {
            Definition::LongSectionIndex(position)
        }));
    }

    if let Some(rest) = find_token(body, "reference line") {
        let (name, unit) = rest
            .split_once(',')
            .ok_or_else(|| CrgError::format(line_no, "reference line channel without a unit"))?;
        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "u" => ChannelKind::U,
            "x" => ChannelKind::X,
            "y" => ChannelKind::Y,
            "phi" => ChannelKind::Phi,
            "slope" => ChannelKind::Slope,
            "banking" => ChannelKind::Bank,
            other => {
                return Err(CrgError::format(
                    line_no,
                    format!("unknown reference line channel '{}'", other),
                ))
            }
        };
        let unit = unit.split('!').next().unwrap_or_default().trim();
        if !unit.eq_ignore_ascii_case(kind.unit()) {
            return Err(CrgError::format(
                line_no,
                format!("channel {:?} has unit '{}', expected '{}'", kind, unit, kind.unit()),
            ));
        }
        return Ok(Some(Definition::Channel(kind)));
    }

    Ok(Some(Definition::Unused))
}
