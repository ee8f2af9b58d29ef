//! Typed option and modifier registries.
//!
//! Options control how queries behave (border handling, search thresholds,
//! curvature mode). Modifiers are one-shot transformations applied to a data
//! set after loading. Both share a single identifier space and the same
//! registry type.

use crate::error::{CrgError, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Smallest accepted value of the `check_eps` option.
const CHECK_EPS_MIN: f64 = 1.0e-6;

/// Largest accepted value of the `check_eps` option.
const CHECK_EPS_MAX: f64 = 1.0e-2;

/// The grid that the `check_inc` option must be a multiple of.
const CHECK_INC_GRID: f64 = 1.0e-3; // m

/// Identifies an option or a modifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OptionId {
    BorderModeU,
    BorderModeV,
    CurvMode,
    BorderOffsetU,
    BorderOffsetV,
    SmoothUBegin,
    SmoothUEnd,
    RefLineSearchU,
    RefLineSearchUFrac,
    RefLineClose,
    RefLineFar,
    RefLineContinue,
    WarnMsgs,
    CheckEps,
    CheckInc,
    CheckTol,
    ScaleZ,
    ScaleSlope,
    ScaleBank,
    ScaleLength,
    ScaleWidth,
    ScaleCurvature,
    GridNanMode,
    GridNanOffset,
    RefPointV,
    RefPointVFrac,
    RefPointVOffset,
    RefPointU,
    RefPointUFrac,
    RefPointUOffset,
    RefPointX,
    RefPointY,
    RefPointZ,
    RefPointPhi,
    RefLineOffsetX,
    RefLineOffsetY,
    RefLineOffsetZ,
    RefLineOffsetPhi,
    RefLineRotCenterX,
    RefLineRotCenterY,
}

impl OptionId {
    /// Every identifier, in id order.
    pub const ALL: [OptionId; 40] = [
        Self::BorderModeU,
        Self::BorderModeV,
        Self::CurvMode,
        Self::BorderOffsetU,
        Self::BorderOffsetV,
        Self::SmoothUBegin,
        Self::SmoothUEnd,
        Self::RefLineSearchU,
        Self::RefLineSearchUFrac,
        Self::RefLineClose,
        Self::RefLineFar,
        Self::RefLineContinue,
        Self::WarnMsgs,
        Self::CheckEps,
        Self::CheckInc,
        Self::CheckTol,
        Self::ScaleZ,
        Self::ScaleSlope,
        Self::ScaleBank,
        Self::ScaleLength,
        Self::ScaleWidth,
        Self::ScaleCurvature,
        Self::GridNanMode,
        Self::GridNanOffset,
        Self::RefPointV,
        Self::RefPointVFrac,
        Self::RefPointVOffset,
        Self::RefPointU,
        Self::RefPointUFrac,
        Self::RefPointUOffset,
        Self::RefPointX,
        Self::RefPointY,
        Self::RefPointZ,
        Self::RefPointPhi,
        Self::RefLineOffsetX,
        Self::RefLineOffsetY,
        Self::RefLineOffsetZ,
        Self::RefLineOffsetPhi,
        Self::RefLineRotCenterX,
        Self::RefLineRotCenterY,
    ];

    /// The numeric identifier used by the file format and the C-style API.
    pub fn code(self) -> u32 {
        use OptionId::*;
        match self {
            BorderModeU => 1,
            BorderModeV => 2,
            CurvMode => 3,
            BorderOffsetU => 5,
            BorderOffsetV => 6,
            SmoothUBegin => 7,
            SmoothUEnd => 8,
            RefLineSearchU => 9,
            RefLineSearchUFrac => 10,
            RefLineClose => 11,
            RefLineFar => 12,
            RefLineContinue => 13,
            WarnMsgs => 14,
            CheckEps => 15,
            CheckInc => 16,
            CheckTol => 17,
            ScaleZ => 21,
            ScaleSlope => 22,
            ScaleBank => 23,
            ScaleLength => 24,
            ScaleWidth => 25,
            ScaleCurvature => 26,
            GridNanMode => 27,
            GridNanOffset => 28,
            RefPointV => 29,
            RefPointVFrac => 30,
            RefPointVOffset => 31,
            RefPointU => 32,
            RefPointUFrac => 33,
            RefPointUOffset => 34,
            RefPointX => 35,
            RefPointY => 36,
            RefPointZ => 37,
            RefPointPhi => 38,
            RefLineOffsetX => 39,
            RefLineOffsetY => 40,
            RefLineOffsetZ => 41,
            RefLineOffsetPhi => 42,
            RefLineRotCenterX => 43,
            RefLineRotCenterY => 44,
        }
    }

    /// Looks up an identifier by its numeric code.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.code() == code)
    }

    /// The kind of value this identifier holds.
    pub fn kind(self) -> ValueKind {
        use OptionId::*;
        match self {
            BorderModeU | BorderModeV | CurvMode | RefLineContinue | WarnMsgs | GridNanMode => {
                ValueKind::Int
            }
            _ => ValueKind::Double,
        }
    }

    /// Returns true for identifiers that name a modifier rather than an option.
    pub fn is_modifier(self) -> bool {
        self.code() >= 21
    }

    /// Returns true for modifiers that reposition the data set by a reference point.
    fn is_ref_point(self) -> bool {
        (29..=38).contains(&self.code())
    }

    /// Returns true for modifiers that reposition the data set by an offset.
    fn is_ref_line_offset(self) -> bool {
        (39..=44).contains(&self.code())
    }

    /// The keyword naming this identifier in a file's options or modifiers section.
    pub fn keyword(self) -> Option<&'static str> {
        use OptionId::*;
        Some(match self {
            BorderModeU => "border_mode_u",
            BorderModeV => "border_mode_v",
            CurvMode => return None,
            BorderOffsetU => "border_offset_u",
            BorderOffsetV => "border_offset_v",
            SmoothUBegin => "border_smooth_ubeg",
            SmoothUEnd => "border_smooth_uend",
            RefLineSearchU => "refline_search_u",
            RefLineSearchUFrac => "refline_search_ufrac",
            RefLineClose => "refline_search_close",
            RefLineFar => "refline_search_far",
            RefLineContinue => "refline_continuation",
            WarnMsgs => "warn_msgs",
            CheckEps => "check_eps",
            CheckInc => "check_inc",
            CheckTol => "check_tol",
            ScaleZ => "scale_z_grid",
            ScaleSlope => "scale_slope",
            ScaleBank => "scale_banking",
            ScaleLength => "scale_length",
            ScaleWidth => "scale_width",
            ScaleCurvature => "scale_curvature",
            GridNanMode => "grid_nan_mode",
            GridNanOffset => "grid_nan_offset",
            RefPointV => "refpoint_v",
            RefPointVFrac => "refpoint_v_fraction",
            RefPointVOffset => "refpoint_v_offset",
            RefPointU => "refpoint_u",
            RefPointUFrac => "refpoint_u_fraction",
            RefPointUOffset => "refpoint_u_offset",
            RefPointX => "refpoint_x",
            RefPointY => "refpoint_y",
            RefPointZ => "refpoint_z",
            RefPointPhi => "refpoint_phi",
            RefLineOffsetX => "refline_offset_x",
            RefLineOffsetY => "refline_offset_y",
            RefLineOffsetZ => "refline_offset_z",
            RefLineOffsetPhi => "refline_offset_phi",
            RefLineRotCenterX => "refline_rotcenter_x",
            RefLineRotCenterY => "refline_rotcenter_y",
        })
    }
}

/// The kind of value held by an option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    Int,
    Double,
}

/// The value of an option.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Int(i32),
    Double(f64),
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Double(_) => ValueKind::Double,
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{:.6}", v),
        }
    }
}

macro_rules! int_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident = $value:literal,)* }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value,)*
        }

        impl TryFrom<i32> for $name {
            type Error = i32;

            fn try_from(value: i32) -> std::result::Result<Self, i32> {
                match value {
                    $($value => Ok(Self::$variant),)*
                    _ => Err(value),
                }
            }
        }

        impl From<$name> for Value {
            fn from(value: $name) -> Self {
                Value::Int(value as i32)
            }
        }
    };
}

int_enum! {
    /// How elevation queries outside the grid are answered.
    BorderMode {
        /// Out of range queries fail.
        None = 0,
        /// The elevation is the border offset.
        ExtrapolateZero = 1,
        /// The elevation at the border is kept.
        ExtrapolateKeep = 2,
        /// The grid repeats periodically.
        Repeat = 3,
        /// The grid is mirrored at each border.
        Reflect = 4,
    }
}

int_enum! {
    /// The path along which curvature is reported.
    CurvatureMode {
        /// Curvature of the lateral path at the queried `v`.
        Lateral = 0,
        /// Curvature of the reference line itself.
        RefLine = 1,
    }
}

int_enum! {
    /// How the reference line continues past its ends.
    RefLineContinuation {
        Extrapolate = 0,
        CloseTrack = 1,
    }
}

int_enum! {
    /// Treatment of missing elevation samples.
    GridNanMode {
        Keep = 0,
        SetZero = 1,
        KeepLast = 2,
    }
}

/// A registry of options or modifiers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Options {
    values: BTreeMap<OptionId, Value>,
}

impl Options {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Default::default()
    }

    /// The options a data set starts with.
    pub fn default_options() -> Self {
        let mut options = Self::new();
        options.insert(OptionId::CurvMode, CurvatureMode::Lateral.into());
        options.insert(OptionId::BorderModeU, BorderMode::ExtrapolateKeep.into());
        options.insert(OptionId::BorderModeV, BorderMode::ExtrapolateKeep.into());
        options.insert(OptionId::CheckEps, Value::Double(1.0e-6));
        options.insert(OptionId::CheckInc, Value::Double(1.0e-3));
        options.insert(OptionId::CheckTol, Value::Double(1.0e-4));
        options
    }

    /// The options a contact point starts with, before the data set's options
    /// are laid over them.
    pub fn default_contact_point_options() -> Self {
        let mut options = Self::default_options();
        options.insert(OptionId::RefLineClose, Value::Double(0.3));
        options.insert(OptionId::RefLineFar, Value::Double(2.2));
        options
    }

    /// The modifiers a data set starts with: missing samples take the last
    /// valid value, and the start of the reference line is moved to the origin.
    pub fn default_modifiers() -> Self {
        let mut modifiers = Self::new();
        modifiers.insert(OptionId::GridNanMode, GridNanMode::KeepLast.into());
        modifiers.insert(OptionId::RefPointX, Value::Double(0.0));
        modifiers.insert(OptionId::RefPointY, Value::Double(0.0));
        modifiers.insert(OptionId::RefPointZ, Value::Double(0.0));
        modifiers.insert(OptionId::RefPointPhi, Value::Double(0.0));
        modifiers
    }

    fn insert(&mut self, id: OptionId, value: Value) {
        self.values.insert(id, value);
    }

    /// Sets an option, rejecting values of the wrong kind or outside the
    /// option's domain. A rejected write leaves the registry untouched.
    pub fn set(&mut self, id: OptionId, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.validate(id, value)?;
        self.insert(id, value);
        Ok(())
    }

    /// Sets an integer option.
    pub fn set_int(&mut self, id: OptionId, value: i32) -> Result<()> {
        self.set(id, Value::Int(value))
    }

    /// Sets a floating point option.
    pub fn set_double(&mut self, id: OptionId, value: f64) -> Result<()> {
        self.set(id, Value::Double(value))
    }

    /// Gets the value of an option, if it is set.
    pub fn get(&self, id: OptionId) -> Option<Value> {
        self.values.get(&id).copied()
    }

    /// Gets an integer option. Fails if the option holds a floating point value.
    pub fn get_int(&self, id: OptionId) -> Result<Option<i32>> {
        match self.get(id) {
            None => Ok(None),
            Some(Value::Int(value)) => Ok(Some(value)),
            Some(Value::Double(_)) => Err(CrgError::TypeMismatch {
                option: id,
                expected: ValueKind::Double,
            }),
        }
    }

    /// Gets a floating point option. Fails if the option holds an integer value.
    pub fn get_double(&self, id: OptionId) -> Result<Option<f64>> {
        match self.get(id) {
            None => Ok(None),
            Some(Value::Double(value)) => Ok(Some(value)),
            Some(Value::Int(_)) => Err(CrgError::TypeMismatch {
                option: id,
                expected: ValueKind::Int,
            }),
        }
    }

    /// Returns true if the option is set.
    pub fn is_set(&self, id: OptionId) -> bool {
        self.values.contains_key(&id)
    }

    /// Returns true if the option is set to exactly the given value.
    pub fn has_value(&self, id: OptionId, expected: impl Into<Value>) -> bool {
        self.get(id) == Some(expected.into())
    }

    /// Removes an option, returning true if it was set.
    pub fn remove(&mut self, id: OptionId) -> bool {
        self.values.remove(&id).is_some()
    }

    /// Removes every option.
    pub fn remove_all(&mut self) {
        self.values.clear();
    }

    /// Replaces the contents of this registry with a copy of `src`.
    pub fn copy_all(&mut self, src: &Options) {
        self.values.clone_from(&src.values);
    }

    /// Lays every entry of `src` over this registry.
    pub(crate) fn overlay(&mut self, src: &Options) {
        for (id, value) in src.iter() {
            self.insert(id, value);
        }
    }

    /// Returns true if no option is set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the set options in id order.
    pub fn iter(&self) -> impl Iterator<Item = (OptionId, Value)> + '_ {
        self.values.iter().map(|(id, value)| (*id, *value))
    }

    /// Checks a single write against the option's domain and the entries
    /// already in the registry.
    fn validate(&self, id: OptionId, value: Value) -> Result<()> {
        if value.kind() != id.kind() {
            return Err(CrgError::TypeMismatch {
                option: id,
                expected: id.kind(),
            });
        }
        match value {
            Value::Int(value) => validate_int(id, value),
            Value::Double(value) => self.validate_double(id, value),
        }?;
        if id.is_ref_point() && self.iter().any(|(other, _)| other.is_ref_line_offset()) {
            return Err(CrgError::ConflictingModifiers(format!(
                "{:?} cannot be combined with a reference line offset",
                id
            )));
        }
        if id.is_ref_line_offset() && self.iter().any(|(other, _)| other.is_ref_point()) {
            return Err(CrgError::ConflictingModifiers(format!(
                "{:?} cannot be combined with a reference point",
                id
            )));
        }
        let exclusive = match id {
            OptionId::RefPointU => Some(OptionId::RefPointUFrac),
            OptionId::RefPointUFrac => Some(OptionId::RefPointU),
            OptionId::RefPointV => Some(OptionId::RefPointVFrac),
            OptionId::RefPointVFrac => Some(OptionId::RefPointV),
            _ => None,
        };
        if let Some(other) = exclusive.filter(|other| self.is_set(*other)) {
            return Err(CrgError::ConflictingModifiers(format!(
                "{:?} cannot be combined with {:?}",
                id, other
            )));
        }
        Ok(())
    }

    fn validate_double(&self, id: OptionId, value: f64) -> Result<()> {
        if value.is_nan() {
            return Err(CrgError::invalid(id, "value is not a number"));
        }
        match id {
            OptionId::SmoothUBegin | OptionId::SmoothUEnd if value <= 0.0 => {
                Err(CrgError::invalid(id, "smoothing zone must be positive"))
            }
            OptionId::RefLineSearchUFrac if !(0.0..=1.0).contains(&value) => {
                Err(CrgError::invalid(id, "fraction must lie in [0, 1]"))
            }
            OptionId::RefLineClose | OptionId::RefLineFar if value < 0.0 => {
                Err(CrgError::invalid(id, "search distance must not be negative"))
            }
            OptionId::RefLineClose => match self.get(OptionId::RefLineFar) {
                Some(Value::Double(far)) if value >= far => Err(CrgError::invalid(
                    id,
                    format!("close distance {} must be below far distance {}", value, far),
                )),
                _ => Ok(()),
            },
            OptionId::RefLineFar => match self.get(OptionId::RefLineClose) {
                Some(Value::Double(close)) if close >= value => Err(CrgError::invalid(
                    id,
                    format!("far distance {} must exceed close distance {}", value, close),
                )),
                _ => Ok(()),
            },
            OptionId::ScaleLength | OptionId::ScaleWidth if value <= 0.0 => {
                Err(CrgError::invalid(id, "scale factor must be positive"))
            }
            _ => Ok(()),
        }
    }

    /// Validates the registry as a whole.
    pub fn check_options(&self) -> Result<()> {
        for (id, value) in self.iter() {
            if let Value::Int(value) = value {
                validate_int(id, value)?;
            }
        }
        if let (Some(close), Some(far)) = (
            self.get_double(OptionId::RefLineClose)?,
            self.get_double(OptionId::RefLineFar)?,
        ) {
            if close >= far {
                return Err(CrgError::invalid(
                    OptionId::RefLineClose,
                    "close distance must be below far distance",
                ));
            }
        }
        for id in [OptionId::SmoothUBegin, OptionId::SmoothUEnd] {
            if self.get_double(id)?.map_or(false, |zone| zone < 0.0) {
                return Err(CrgError::invalid(id, "smoothing zone must not be negative"));
            }
        }

        let eps = self
            .get_double(OptionId::CheckEps)?
            .ok_or_else(|| CrgError::invalid(OptionId::CheckEps, "option is required"))?;
        if !(CHECK_EPS_MIN..=CHECK_EPS_MAX).contains(&eps) {
            return Err(CrgError::invalid(
                OptionId::CheckEps,
                format!("{} lies outside [{}, {}]", eps, CHECK_EPS_MIN, CHECK_EPS_MAX),
            ));
        }

        let inc = self.get_double(OptionId::CheckInc)?.unwrap_or(CHECK_INC_GRID);
        if inc < CHECK_INC_GRID * (1.0 - eps) {
            return Err(CrgError::invalid(
                OptionId::CheckInc,
                format!("{} is below {}", inc, CHECK_INC_GRID),
            ));
        }
        let steps = (inc / CHECK_INC_GRID).round();
        if (inc - steps * CHECK_INC_GRID).abs() > eps * inc.max(CHECK_INC_GRID) {
            return Err(CrgError::invalid(
                OptionId::CheckInc,
                format!("{} is not a multiple of {}", inc, CHECK_INC_GRID),
            ));
        }

        let tol = self.get_double(OptionId::CheckTol)?.unwrap_or(0.1 * inc);
        if tol < eps * inc || tol > 0.5 * inc {
            return Err(CrgError::invalid(
                OptionId::CheckTol,
                format!("{} lies outside [{}, {}]", tol, eps * inc, 0.5 * inc),
            ));
        }
        Ok(())
    }

    /// Validates a modifier registry and fills in the defaults implied by the
    /// modifiers that are present.
    pub fn check_modifiers(&mut self) -> Result<()> {
        for (id, value) in self.iter() {
            match value {
                Value::Int(value) => validate_int(id, value)?,
                Value::Double(value) => {
                    if matches!(id, OptionId::ScaleLength | OptionId::ScaleWidth) && value <= 0.0 {
                        return Err(CrgError::invalid(id, "scale factor must be positive"));
                    }
                }
            }
        }

        if self.is_set(OptionId::GridNanOffset) {
            match self.get_int(OptionId::GridNanMode)? {
                Some(mode) if mode == GridNanMode::Keep as i32 => {
                    return Err(CrgError::ConflictingModifiers(
                        "a NaN offset requires a NaN mode other than keep".into(),
                    ));
                }
                Some(_) => {}
                None => self.insert(OptionId::GridNanMode, GridNanMode::KeepLast.into()),
            }
        }

        let by_ref = self.iter().any(|(id, _)| id.is_ref_point());
        let by_offset = self.iter().any(|(id, _)| id.is_ref_line_offset());
        if by_ref && by_offset {
            return Err(CrgError::ConflictingModifiers(
                "the data set is repositioned both by reference point and by offset".into(),
            ));
        }

        if by_offset {
            for id in [
                OptionId::RefLineOffsetX,
                OptionId::RefLineOffsetY,
                OptionId::RefLineOffsetZ,
                OptionId::RefLineOffsetPhi,
            ] {
                self.fill(id);
            }
        }

        if by_ref {
            // an unplaced reference point sits at the start of the reference line
            for (absolute, fraction, default) in [
                (OptionId::RefPointU, OptionId::RefPointUFrac, OptionId::RefPointUFrac),
                (OptionId::RefPointV, OptionId::RefPointVFrac, OptionId::RefPointV),
            ] {
                match (self.is_set(absolute), self.is_set(fraction)) {
                    (true, true) => {
                        return Err(CrgError::ConflictingModifiers(format!(
                            "{:?} cannot be combined with {:?}",
                            absolute, fraction
                        )))
                    }
                    (false, false) => self.insert(default, Value::Double(0.0)),
                    _ => {}
                }
            }
            for id in [
                OptionId::RefPointUOffset,
                OptionId::RefPointVOffset,
                OptionId::RefPointX,
                OptionId::RefPointY,
                OptionId::RefPointZ,
                OptionId::RefPointPhi,
            ] {
                self.fill(id);
            }
        }
        Ok(())
    }

    fn fill(&mut self, id: OptionId) {
        self.values.entry(id).or_insert(Value::Double(0.0));
    }

    /// Reads a floating point option, falling back to `default` when unset or
    /// of the wrong kind.
    pub(crate) fn double_or(&self, id: OptionId, default: f64) -> f64 {
        match self.get(id) {
            Some(Value::Double(value)) => value,
            _ => default,
        }
    }

    /// Reads a floating point option if it is set with the right kind.
    pub(crate) fn double(&self, id: OptionId) -> Option<f64> {
        match self.get(id) {
            Some(Value::Double(value)) => Some(value),
            _ => None,
        }
    }

    fn int(&self, id: OptionId) -> Option<i32> {
        match self.get(id) {
            Some(Value::Int(value)) => Some(value),
            _ => None,
        }
    }

    /// The border mode in u direction. Unset means [BorderMode::None].
    pub fn border_mode_u(&self) -> BorderMode {
        self.int(OptionId::BorderModeU)
            .and_then(|mode| BorderMode::try_from(mode).ok())
            .unwrap_or(BorderMode::None)
    }

    /// The border mode in v direction. Unset means [BorderMode::ExtrapolateKeep].
    pub fn border_mode_v(&self) -> BorderMode {
        self.int(OptionId::BorderModeV)
            .and_then(|mode| BorderMode::try_from(mode).ok())
            .unwrap_or(BorderMode::ExtrapolateKeep)
    }

    /// The curvature mode. Unset means [CurvatureMode::Lateral].
    pub fn curvature_mode(&self) -> CurvatureMode {
        self.int(OptionId::CurvMode)
            .and_then(|mode| CurvatureMode::try_from(mode).ok())
            .unwrap_or(CurvatureMode::Lateral)
    }

    /// Returns true if the reference line is to be treated as a closed track.
    pub fn close_track(&self) -> bool {
        self.has_value(OptionId::RefLineContinue, RefLineContinuation::CloseTrack)
    }

    /// The treatment of missing elevation samples, if one is configured.
    pub fn grid_nan_mode(&self) -> Option<GridNanMode> {
        self.int(OptionId::GridNanMode)
            .and_then(|mode| GridNanMode::try_from(mode).ok())
    }
}

fn validate_int(id: OptionId, value: i32) -> Result<()> {
    let ok = match id {
        OptionId::BorderModeU | OptionId::BorderModeV => BorderMode::try_from(value).is_ok(),
        OptionId::CurvMode => CurvatureMode::try_from(value).is_ok(),
        OptionId::RefLineContinue => RefLineContinuation::try_from(value).is_ok(),
        OptionId::GridNanMode => GridNanMode::try_from(value).is_ok(),
        OptionId::WarnMsgs => value >= -1,
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(CrgError::invalid(id, format!("{} is out of range", value)))
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, value) in self.iter() {
            match id.keyword() {
                Some(keyword) => writeln!(f, "{:<24} = {}", keyword, value)?,
                None => writeln!(f, "{:<24} = {}", format!("{:?}", id), value)?,
            }
        }
        Ok(())
    }
}
