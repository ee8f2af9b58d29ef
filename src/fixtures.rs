//! Synthetic road files for unit tests.

use crate::dataset::DataSet;
use crate::loader::load_bytes;

/// A straight road from u = 0 to u = 100 m sampled every metre, with five
/// long sections from v = -4 to v = 4 m.
pub struct FlatRoad {
    /// Elevation at (u, v).
    pub z: fn(f64, f64) -> f64,
    /// Heading at u; without it the reference line runs along the x axis.
    pub phi: Option<fn(f64) -> f64>,
    /// Body of the modifiers section, which is left out when empty.
    pub mods: String,
    /// Body of the options section, which is left out when empty.
    pub opts: String,
    /// Samples written as NaN, as (cross section, long section).
    pub nan_at: Vec<(usize, usize)>,
}

impl Default for FlatRoad {
    fn default() -> Self {
        Self {
            z: |_, _| 0.0,
            phi: None,
            mods: String::new(),
            opts: String::new(),
            nan_at: Vec::new(),
        }
    }
}

impl FlatRoad {
    pub const LENGTH: usize = 100;
    pub const LONG_SECTIONS: usize = 5;

    /// Writes the road as a long, double precision ASCII file.
    pub fn to_file(&self) -> String {
        let mut file = String::from("$CT\nsynthetic test road\n$ROAD_CRG\n");
        file += "reference_line_start_u = 0.0\n";
        file += &format!("reference_line_end_u = {:.1}\n", Self::LENGTH as f64);
        file += "reference_line_increment = 1.0\n";
        if let Some(phi) = self.phi {
            file += &format!("reference_line_start_phi = {:.12e}\n", phi(0.0));
        }
        file += "long_section_v_right = -4.0\n";
        file += "long_section_v_left = 4.0\n";
        file += "long_section_v_increment = 2.0\n$\n";
        if !self.opts.is_empty() {
            file += &format!("$ROAD_CRG_OPTS\n{}$\n", self.opts);
        }
        if !self.mods.is_empty() {
            file += &format!("$ROAD_CRG_MODS\n{}$\n", self.mods);
        }
        file += "$KD_DEFINITION\n#:LDFI\nU:reference line u,m,0.0,1.0\n";
        for i in 1..=Self::LONG_SECTIONS {
            file += &format!("D:long section {},m\n", i);
        }
        if self.phi.is_some() {
            file += "D:reference line phi,rad\n";
        }
        file += "$\n$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$\n";

        for iu in 0..=Self::LENGTH {
            let u = iu as f64;
            let mut fields: Vec<f64> = (0..Self::LONG_SECTIONS)
                .map(|iv| {
                    if self.nan_at.contains(&(iu, iv)) {
                        f64::NAN
                    } else {
                        (self.z)(u, -4.0 + 2.0 * iv as f64)
                    }
                })
                .collect();
            if let Some(phi) = self.phi {
                fields.push(phi(u));
            }
            for line in fields.chunks(4) {
                for value in line {
                    file += &format!("{:>20}", format!("{:.12e}", value));
                }
                file.push('\n');
            }
        }
        file
    }
}

/// Loads a [`FlatRoad`].
pub fn flat_road(road: &FlatRoad) -> DataSet {
    load_bytes(road.to_file().as_bytes()).unwrap()
}
