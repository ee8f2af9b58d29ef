use crate::contact::Stats;
use crate::dataset::DataSet;
use crate::error::{CrgError, Result};
use crate::options::{BorderMode, OptionId, Options};

/// Tolerance within which a `v` just outside an irregular grid is snapped
/// onto its border.
const MAX_BORDER_ERROR: f64 = 1.0e-8; // m

/// The end of the reference line that a smoothing zone blends towards.
#[derive(Clone, Copy, PartialEq, Eq)]
enum SmoothBase {
    None,
    Begin,
    End,
}

/// Evaluates the surface elevation at reference-line coordinates.
///
/// On a closed track the elevation inside the gap between the last and the
/// first cross section is blended between the two.
pub(crate) fn uv2z(
    ds: &DataSet,
    options: &Options,
    u: f64,
    v: f64,
    stats: &mut Stats,
) -> Result<f64> {
    if u.is_nan() || v.is_nan() {
        return Ok(f64::NAN);
    }
    let stats = &mut stats.eval;
    stats.queries += 1;
    let mut steps = 0;
    let z = match ds.closed_range(options) {
        Some(closed) => {
            let range = ds.u_range();
            let u = closed.wrap(u);
            if u > range.max {
                let f = (u - range.max) / (closed.max - range.max);
                let z_end = surface_z(ds, options, range.max, v, &mut steps)?;
                let z_start = surface_z(ds, options, range.min, v, &mut steps)?;
                z_end + f * (z_start - z_end)
            } else {
                surface_z(ds, options, u, v, &mut steps)?
            }
        }
        None => {
            let range = ds.u_range();
            if u < range.min || u > range.max {
                stats.border_u += 1;
            }
            surface_z(ds, options, u, v, &mut steps)?
        }
    };
    if v < ds.v_range().min || v > ds.v_range().max {
        stats.border_v += 1;
    }
    stats.v_steps += steps;
    stats.max_v_steps = stats.max_v_steps.max(steps);
    Ok(z)
}

/// The elevation of the reference line at `u`, clamped to the valid range.
pub(crate) fn u2ref_z(ds: &DataSet, u: f64) -> f64 {
    if !ds.ref_z.valid {
        return ds.ref_z.first;
    }
    let (index, frac) = ds.locate_u(ds.u_range().clamp(u));
    ds.ref_z.lerp(index, frac)
}

/// Splits a fractional grid position into a cell index and the fraction
/// across the cell, keeping the cell inside a grid of `n` samples.
fn cell(frac: f64, n: usize) -> (usize, f64) {
    let frac = frac.max(0.0);
    let index = frac as usize;
    if index >= n - 1 {
        (n - 2, 1.0)
    } else {
        (index, frac - index as f64)
    }
}

/// Mirrors a fractional position back into `[0, max]`, alternating the
/// direction with each period.
fn reflect(frac: f64, max: f64) -> f64 {
    let t = frac.abs();
    let periods = (t / max).floor();
    let rem = t - periods * max;
    if periods % 2.0 == 1.0 {
        max - rem
    } else {
        rem
    }
}

/// Evaluates the grid, adding the steps taken locating `v` to `steps`.
fn surface_z(ds: &DataSet, options: &Options, u: f64, v: f64, steps: &mut usize) -> Result<f64> {
    let n_u = ds.cross_sections();
    let n_v = ds.long_sections();
    let u_range = ds.u_range();
    let v_range = ds.v_range();

    let mut z_offset = 0.0;
    let mut calc_value = true;
    let mut calc_bank = true;
    let mut smooth_base = SmoothBase::None;

    // position along the reference line
    let border_u = options.border_mode_u();
    let mut in_core_u = true;
    let mut frac_u = (u - u_range.min) / ds.u.inc;
    let mut calc_index_u = true;
    if u < u_range.min || u > u_range.max {
        in_core_u = false;
        let max_frac = u_range.length() / ds.u.inc;
        smooth_base = if u < u_range.min {
            SmoothBase::Begin
        } else {
            SmoothBase::End
        };
        match border_u {
            BorderMode::None => return Err(CrgError::OutOfRange { axis: 'u', value: u }),
            BorderMode::ExtrapolateZero => {
                calc_value = false;
                calc_bank = false;
            }
            BorderMode::ExtrapolateKeep => calc_index_u = frac_u >= 0.0,
            BorderMode::Repeat => {
                frac_u = frac_u.rem_euclid(max_frac);
                in_core_u = true;
                smooth_base = SmoothBase::None;
            }
            BorderMode::Reflect => {
                frac_u = reflect(frac_u, max_frac);
                in_core_u = true;
                smooth_base = SmoothBase::None;
            }
        }
        z_offset += options.double_or(OptionId::BorderOffsetU, 0.0);
    }
    let (iu, fu) = if calc_index_u {
        cell(frac_u, n_u)
    } else {
        (0, 0.0)
    };
    // u as seen by the smoothing zones after wrapping
    let u_eff = u_range.min + frac_u * ds.u.inc;

    // position across the road
    let border_v = options.border_mode_v();
    let mut in_core_v = true;
    let (iv, fv) = if ds.v_uniform {
        let mut frac_v = (v - v_range.min) / ds.v.inc;
        let mut calc_index_v = true;
        if v < v_range.min || v > v_range.max {
            in_core_v = false;
            let max_frac = v_range.length() / ds.v.inc;
            match border_v {
                BorderMode::None => return Err(CrgError::OutOfRange { axis: 'v', value: v }),
                BorderMode::ExtrapolateZero => {
                    calc_value = false;
                    calc_bank = false;
                }
                BorderMode::ExtrapolateKeep => calc_index_v = frac_v >= 0.0,
                BorderMode::Repeat => {
                    frac_v = frac_v.rem_euclid(max_frac);
                    in_core_v = true;
                }
                BorderMode::Reflect => {
                    frac_v = reflect(frac_v, max_frac);
                    in_core_v = true;
                }
            }
            z_offset += options.double_or(OptionId::BorderOffsetV, 0.0);
        }
        if calc_index_v {
            cell(frac_v, n_v)
        } else {
            (0, 0.0)
        }
    } else {
        let mut pos = v;
        if (pos - v_range.min).abs() < MAX_BORDER_ERROR {
            pos = v_range.min;
        }
        if (pos - v_range.max).abs() < MAX_BORDER_ERROR {
            pos = v_range.max;
        }
        if pos < v_range.min || pos > v_range.max {
            in_core_v = false;
            let width = v_range.length();
            match border_v {
                BorderMode::None => return Err(CrgError::OutOfRange { axis: 'v', value: v }),
                BorderMode::ExtrapolateZero => {
                    calc_value = false;
                    calc_bank = false;
                }
                BorderMode::ExtrapolateKeep => pos = v_range.clamp(pos),
                BorderMode::Repeat => {
                    pos = if pos > v_range.max {
                        v_range.min + (pos - v_range.max) % width
                    } else {
                        v_range.max + (pos - v_range.min) % width
                    };
                    in_core_v = true;
                }
                BorderMode::Reflect => {
                    let (beyond, base) = if pos > v_range.max {
                        (pos - v_range.max, v_range.max)
                    } else {
                        (v_range.min - pos, v_range.min)
                    };
                    let periods = (beyond / width).floor();
                    let rem = beyond - periods * width;
                    let towards_inside = if base == v_range.max { -1.0 } else { 1.0 };
                    pos = if periods % 2.0 == 0.0 {
                        base + towards_inside * rem
                    } else {
                        base + towards_inside * (width - rem)
                    };
                    in_core_v = true;
                }
            }
            z_offset += options.double_or(OptionId::BorderOffsetV, 0.0);
        }
        irregular_cell(ds, pos, steps)
    };

    let mut z = if calc_value {
        bilinear(ds, iu, fu, iv, fv)
    } else {
        0.0
    };

    // smoothing zones at either end of the reference line
    let zone_begin = options.double(OptionId::SmoothUBegin);
    let zone_end = options.double(OptionId::SmoothUEnd);
    let mut smooth_scale = 1.0;
    let mut smooth = false;
    if (zone_begin.is_some() || zone_end.is_some()) && (in_core_u || smooth_base != SmoothBase::None)
    {
        if let Some(zone) = zone_begin {
            if u_eff - u_range.min <= zone {
                smooth_scale = if !in_core_u {
                    0.0
                } else {
                    (u_eff - u_range.min) / zone
                };
                smooth_base = SmoothBase::Begin;
                smooth = true;
            }
        }
        if let Some(zone) = zone_end {
            if u_range.max - u_eff <= zone {
                smooth_scale = if !in_core_u {
                    0.0
                } else {
                    (u_range.max - u_eff) / zone
                };
                smooth_base = SmoothBase::End;
                smooth = true;
            }
        }
    }
    let base = match smooth_base {
        SmoothBase::None => 0.0,
        SmoothBase::Begin if ds.ref_z.valid => ds.ref_z.data[0],
        SmoothBase::Begin => ds.ref_z.first,
        SmoothBase::End if ds.ref_z.valid => ds.ref_z.data[n_u - 1],
        SmoothBase::End => ds.ref_z.last,
    };

    // reference elevation and banking
    if ds.ref_z.valid {
        z += ds.ref_z.lerp(iu, fu);
    } else {
        z += ds.ref_z.first;
    }
    if ds.util.has_bank && calc_bank {
        let bank = if ds.bank.valid {
            ds.bank.lerp(iu, fu)
        } else {
            ds.bank.first
        };
        z += bank * v_range.clamp(v);
    }

    if !in_core_u {
        match border_u {
            BorderMode::ExtrapolateZero => z = z_offset,
            BorderMode::ExtrapolateKeep => z += z_offset,
            _ => {}
        }
    } else if !in_core_v {
        match border_v {
            BorderMode::ExtrapolateZero => z = z_offset,
            BorderMode::ExtrapolateKeep => z += z_offset,
            _ => {}
        }
    }

    if smooth {
        z = base + (z - base) * smooth_scale;
    }
    Ok(z)
}

/// Finds the cell of an irregular V grid containing `pos`, bisecting the
/// bracket given by the index table.
fn irregular_cell(ds: &DataSet, pos: f64, steps: &mut usize) -> (usize, f64) {
    let data = &ds.v.data;
    let n = data.len();
    let (lo, hi) = match &ds.index_table {
        Some(table) => {
            let (lo, hi) = table.bracket(pos);
            (*lo, usize::min(*hi + 1, n - 1))
        }
        None => (0, n - 1),
    };
    // first sample in the bracket above `pos`
    let mut first = lo;
    let mut count = hi + 1 - lo;
    while count > 0 {
        *steps += 1;
        let half = count / 2;
        if data[first + half] <= pos {
            first += half + 1;
            count -= half + 1;
        } else {
            count = half;
        }
    }
    let index = first.saturating_sub(1).max(lo).min(n - 2);
    let frac = (pos - data[index]) / (data[index + 1] - data[index]);
    (index, frac.clamp(0.0, 1.0))
}

/// Interpolates the grid between four samples. A missing sample that
/// contributes to the result makes the result missing.
fn bilinear(ds: &DataSet, iu: usize, fu: f64, iv: usize, fv: f64) -> f64 {
    let corners = [
        (iv, iu, (1.0 - fu) * (1.0 - fv)),
        (iv, iu + 1, fu * (1.0 - fv)),
        (iv + 1, iu, (1.0 - fu) * fv),
        (iv + 1, iu + 1, fu * fv),
    ];
    let mut z = 0.0;
    for (row, col, weight) in corners {
        if weight == 0.0 {
            continue;
        }
        let sample = ds.z[row].get(col);
        if sample.is_nan() {
            return f64::NAN;
        }
        z += weight * sample;
    }
    z
}

#[cfg(test)]
mod test {
    use super::{reflect, u2ref_z, uv2z as eval};
    use crate::contact::Stats;
    use crate::dataset::DataSet;
    use crate::error::Result;
    use crate::fixtures::{flat_road, FlatRoad};
    use crate::loader::load_bytes;
    use crate::options::{BorderMode, OptionId, Options};
    use assert_approx_eq::assert_approx_eq;

    fn uv2z(ds: &DataSet, options: &Options, u: f64, v: f64) -> Result<f64> {
        eval(ds, options, u, v, &mut Stats::default())
    }

    #[test]
    fn reflect_is_symmetric() {
        assert_approx_eq!(reflect(-0.3, 10.0), 0.3);
        assert_approx_eq!(reflect(10.3, 10.0), 9.7);
        assert_approx_eq!(reflect(-10.3, 10.0), 9.7);
        assert_approx_eq!(reflect(20.3, 10.0), 0.3);
    }

    #[test]
    fn grid_nodes_are_exact() {
        let road = FlatRoad {
            z: |u, v| 0.01 * u + 0.1 * v,
            ..Default::default()
        };
        let ds = flat_road(&road);
        for (iu, iv) in [(0, 0), (10, 2), (100, 4), (57, 1)] {
            let u = iu as f64;
            let v = -4.0 + 2.0 * iv as f64;
            let z = uv2z(&ds, ds.options(), u, v).unwrap();
            assert_eq!(z, ds.z[iv].get(iu));
        }
        let z = uv2z(&ds, ds.options(), 10.5, -3.0).unwrap();
        assert_approx_eq!(z, 0.01 * 10.5 - 0.1 * 3.0, 1e-6);
    }

    #[test]
    fn missing_samples_propagate() {
        let road = FlatRoad {
            mods: "grid_nan_mode = 0\n".into(),
            nan_at: vec![(20, 2)],
            ..Default::default()
        };
        let ds = flat_road(&road);
        assert!(uv2z(&ds, ds.options(), 20.0, 0.0).unwrap().is_nan());
        assert!(uv2z(&ds, ds.options(), 19.5, 1.0).unwrap().is_nan());
        assert_approx_eq!(uv2z(&ds, ds.options(), 19.0, 0.0).unwrap(), 0.0);
        assert_approx_eq!(uv2z(&ds, ds.options(), 20.0, 2.0).unwrap(), 0.0);
    }

    #[test]
    fn border_none_fails_outside() {
        let mut ds = flat_road(&FlatRoad::default());
        ds.options_mut().set(OptionId::BorderModeU, BorderMode::None).unwrap();
        assert!(uv2z(&ds, ds.options(), 101.0, 0.0).is_err());
        assert!(uv2z(&ds, ds.options(), 99.0, 0.0).is_ok());
    }

    #[test]
    fn smoothing_zone_blends_to_reference() {
        let road = FlatRoad {
            z: |_, _| 1.0,
            mods: "grid_nan_mode = 2\n".into(),
            ..Default::default()
        };
        let mut ds = flat_road(&road);
        ds.options_mut().set_double(OptionId::SmoothUBegin, 10.0).unwrap();
        assert_approx_eq!(uv2z(&ds, ds.options(), 0.0, 0.0).unwrap(), 0.0);
        assert_approx_eq!(uv2z(&ds, ds.options(), 5.0, 0.0).unwrap(), 0.5);
        assert_approx_eq!(uv2z(&ds, ds.options(), 50.0, 0.0).unwrap(), 1.0);
        assert_approx_eq!(uv2z(&ds, ds.options(), -5.0, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn smoothing_zone_follows_wrapped_position() {
        let road = FlatRoad {
            z: |_, _| 1.0,
            mods: "grid_nan_mode = 2\n".into(),
            ..Default::default()
        };
        let mut ds = flat_road(&road);
        ds.options_mut().set_double(OptionId::SmoothUBegin, 10.0).unwrap();
        ds.options_mut().set_double(OptionId::SmoothUEnd, 10.0).unwrap();

        ds.options_mut().set(OptionId::BorderModeU, BorderMode::Repeat).unwrap();
        assert_approx_eq!(uv2z(&ds, ds.options(), -95.0, 0.0).unwrap(), 0.5);
        assert_approx_eq!(uv2z(&ds, ds.options(), 195.0, 0.0).unwrap(), 0.5);

        ds.options_mut().set(OptionId::BorderModeU, BorderMode::Reflect).unwrap();
        assert_approx_eq!(uv2z(&ds, ds.options(), -5.0, 0.0).unwrap(), 0.5);
        assert_approx_eq!(uv2z(&ds, ds.options(), 105.0, 0.0).unwrap(), 0.5);
    }

    #[test]
    fn evaluations_are_counted() {
        let mut ds = flat_road(&FlatRoad::default());
        ds.options_mut().set(OptionId::BorderModeU, BorderMode::Repeat).unwrap();
        let mut stats = Stats::default();
        for (u, v) in [(10.0, 0.0), (-10.0, 1.0), (50.0, 9.0), (150.0, -9.0)] {
            eval(&ds, ds.options(), u, v, &mut stats).unwrap();
        }
        assert_eq!(stats.eval.queries, 4);
        assert_eq!(stats.eval.border_u, 2);
        assert_eq!(stats.eval.border_v, 2);
        assert_eq!(stats.search.queries, 0);
    }

    #[test]
    fn reference_line_elevation() {
        let road = FlatRoad {
            mods: "grid_nan_mode = 2\n".into(),
            ..Default::default()
        };
        let file = road.to_file().replace(
            "reference_line_increment = 1.0\n",
            "reference_line_increment = 1.0\nreference_line_start_slope = 0.01\n",
        );
        let ds = load_bytes(file.as_bytes()).unwrap();
        assert_approx_eq!(u2ref_z(&ds, 50.0), 0.5);
        assert_approx_eq!(u2ref_z(&ds, 25.5), 0.255);
        assert_approx_eq!(u2ref_z(&ds, -3.0), 0.0);
        assert_approx_eq!(u2ref_z(&ds, 120.0), 1.0);
        assert_approx_eq!(uv2z(&ds, ds.options(), 50.0, 2.0).unwrap(), 0.5);

        let flat = flat_road(&FlatRoad::default());
        assert_eq!(u2ref_z(&flat, 40.0), 0.0);
    }
}
