//! Writing road files for the integration tests.

#![allow(dead_code)]

use crg_engine::{ContactPointId, DataSetId, Engine};

/// A road surface to be written in one of the record formats.
pub struct RoadFile {
    /// Record format tag, e.g. `LDFI`.
    pub format: &'static str,
    pub u_inc: f64,
    /// Positions of the long sections.
    pub v: Vec<f64>,
    /// Elevations, indexed by cross section then long section.
    pub z: Vec<Vec<f64>>,
    /// Explicit reference line positions, one per cross section.
    pub xy: Option<Vec<(f64, f64)>>,
    /// Body of the options section.
    pub opts: String,
    /// Body of the modifiers section.
    pub mods: String,
}

impl RoadFile {
    pub fn new(cross_sections: usize, u_inc: f64, v: &[f64], z: impl Fn(f64, f64) -> f64) -> Self {
        let z = (0..cross_sections)
            .map(|i| v.iter().map(|v| z(i as f64 * u_inc, *v)).collect())
            .collect();
        Self {
            format: "LDFI",
            u_inc,
            v: v.to_vec(),
            z,
            xy: None,
            opts: String::new(),
            mods: String::new(),
        }
    }

    /// A straight road 100 m long and 8 m wide, sampled every metre along
    /// the road and every 2 m across it.
    pub fn straight(z: impl Fn(f64, f64) -> f64) -> Self {
        Self::new(101, 1.0, &[-4.0, -2.0, 0.0, 2.0, 4.0], z)
    }

    pub fn cross_sections(&self) -> usize {
        self.z.len()
    }

    fn binary(&self) -> bool {
        self.format.as_bytes()[2].eq_ignore_ascii_case(&b'B')
    }

    fn double(&self) -> bool {
        self.format.as_bytes()[1].eq_ignore_ascii_case(&b'D')
    }

    fn long(&self) -> bool {
        self.format.as_bytes()[0].eq_ignore_ascii_case(&b'L')
    }

    pub fn header(&self) -> String {
        let n = self.cross_sections();
        let mut text = String::from("$CT\nwritten by the integration tests\n$ROAD_CRG\n");
        if self.xy.is_none() {
            text += "reference_line_start_u = 0.0\n";
            text += &format!("reference_line_end_u = {}\n", (n - 1) as f64 * self.u_inc);
            text += &format!("reference_line_increment = {}\n", self.u_inc);
        }
        text += "$\n";
        if !self.opts.is_empty() {
            text += &format!("$ROAD_CRG_OPTS\n{}$\n", self.opts);
        }
        if !self.mods.is_empty() {
            text += &format!("$ROAD_CRG_MODS\n{}$\n", self.mods);
        }
        text += &format!("$KD_DEFINITION\n#:{}\n", self.format);
        if self.xy.is_some() {
            text += "D:reference line x,m\nD:reference line y,m\n";
        }
        for v in &self.v {
            text += &format!("D:long section at v = {:.4},m\n", v);
        }
        text += "$\n$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$\n";
        text
    }

    fn record(&self, index: usize) -> Vec<f64> {
        let mut values = Vec::new();
        if let Some(xy) = &self.xy {
            values.push(xy[index].0);
            values.push(xy[index].1);
        }
        values.extend_from_slice(&self.z[index]);
        values
    }

    /// The complete file.
    pub fn bytes(&self) -> Vec<u8> {
        let mut bytes = self.header().into_bytes();
        for index in 0..self.cross_sections() {
            let values = self.record(index);
            if self.binary() {
                let start = bytes.len();
                for value in values {
                    if self.double() {
                        bytes.extend_from_slice(&value.to_be_bytes());
                    } else {
                        bytes.extend_from_slice(&(value as f32).to_be_bytes());
                    }
                }
                if self.long() {
                    let size = (bytes.len() - start).div_ceil(80) * 80;
                    bytes.resize(start + size, 0);
                }
            } else {
                let (width, per_line) = if self.double() { (20, 4) } else { (10, 8) };
                let per_line = if self.long() { per_line } else { values.len() };
                for line in values.chunks(per_line) {
                    for value in line {
                        let field = if self.double() {
                            format!("{:.13e}", value)
                        } else {
                            format!("{:.3e}", value)
                        };
                        bytes.extend_from_slice(format!("{:>width$}", field, width = width).as_bytes());
                    }
                    bytes.push(b'\n');
                }
            }
        }
        bytes
    }

    /// The complete file, which must use an ASCII record format.
    pub fn text(&self) -> String {
        String::from_utf8(self.bytes()).unwrap()
    }

    /// Loads the file into an engine and creates a contact point for it.
    pub fn load(&self) -> (Engine, DataSetId, ContactPointId) {
        let mut engine = Engine::new();
        let ds = engine.load_bytes(&self.bytes()).unwrap();
        let cp = engine.create_contact_point(ds).unwrap();
        (engine, ds, cp)
    }
}

/// Points along a circular arc turning left, starting at the origin heading
/// along the x axis.
pub fn arc(radius: f64, step: f64, count: usize) -> Vec<(f64, f64)> {
    (0..count)
        .map(|i| {
            let angle = i as f64 * step / radius;
            (radius * angle.sin(), radius * (1.0 - angle.cos()))
        })
        .collect()
}
