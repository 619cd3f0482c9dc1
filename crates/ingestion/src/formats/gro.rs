//! GRO format
//!
//! A GRO file holds one or more concatenated frames:
//!
//! ```text
//! title line (optional "t= <time ps>")
//! atom count
//! %5d%-5s%5s%5d%8.3f%8.3f%8.3f   (one line per atom, nm)
//! box line: v1x v2y v3z [v1y v1z v2x v2z v3x v3y]
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use contracts::{Atom, ContractError, Frame, MolecularSystem, PeriodicBox, TrajectoryReader};
use nalgebra::{Matrix3, Vector3};
use tracing::debug;

use crate::error::{IngestionError, Result};

/// Upper bound on atom records reserved from a frame's count line
const MAX_PREALLOCATED_ATOMS: usize = 1 << 20;

/// One parsed GRO frame plus its atom records
struct GroBlock {
    frame: Frame,
    atoms: Vec<Atom>,
}

/// Line-oriented GRO parser shared by the trajectory reader and structure loader
struct GroParser<R: BufRead> {
    path: PathBuf,
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> GroParser<R> {
    fn new(path: PathBuf, reader: R) -> Self {
        Self {
            path,
            lines: reader.lines(),
            line_no: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.next() {
            Some(Ok(line)) => {
                self.line_no += 1;
                Ok(Some(line))
            }
            Some(Err(source)) => Err(IngestionError::Io {
                path: self.path.clone(),
                source,
            }),
            None => Ok(None),
        }
    }

    fn require_line(&mut self) -> Result<String> {
        self.next_line()?.ok_or_else(|| IngestionError::Truncated {
            path: self.path.clone(),
        })
    }

    fn error(&self, message: impl Into<String>) -> IngestionError {
        IngestionError::parse(self.path.clone(), self.line_no, message)
    }

    /// Parse the next frame, `None` at a clean end of file
    fn next_block(&mut self) -> Result<Option<GroBlock>> {
        let title = loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        let time = parse_time(&title).unwrap_or(0.0);

        let count_line = self.require_line()?;
        let count: usize = count_line
            .trim()
            .parse()
            .map_err(|_| self.error(format!("invalid atom count '{}'", count_line.trim())))?;

        // The count is untrusted until the records are actually read
        let reserve = count.min(MAX_PREALLOCATED_ATOMS);
        let mut coords = Vec::with_capacity(reserve);
        let mut atoms = Vec::with_capacity(reserve);
        for _ in 0..count {
            let line = self.require_line()?;
            let (atom, coord) = self.parse_atom(&line)?;
            atoms.push(atom);
            coords.push(coord);
        }

        let box_line = self.require_line()?;
        let periodic_box = self.parse_box(&box_line)?;

        Ok(Some(GroBlock {
            frame: Frame::new(coords, time, periodic_box),
            atoms,
        }))
    }

    fn parse_atom(&self, line: &str) -> Result<(Atom, Vector3<f32>)> {
        if line.len() < 44 || !line.is_ascii() {
            return Err(self.error("atom record shorter than 44 columns"));
        }
        let resid = line[0..5]
            .trim()
            .parse::<i32>()
            .map_err(|_| self.error("invalid residue number"))?;
        let resname = line[5..10].trim().to_string();
        let name = line[10..15].trim().to_string();

        let mut xyz = [0.0f32; 3];
        for (k, value) in xyz.iter_mut().enumerate() {
            let field = &line[20 + 8 * k..28 + 8 * k];
            *value = field
                .trim()
                .parse()
                .map_err(|_| self.error(format!("invalid coordinate '{}'", field.trim())))?;
        }

        let atom = Atom {
            mass: mass_from_name(&name),
            name,
            resname,
            resid,
        };
        Ok((atom, Vector3::new(xyz[0], xyz[1], xyz[2])))
    }

    fn parse_box(&self, line: &str) -> Result<PeriodicBox> {
        let values: Vec<f32> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| self.error(format!("invalid box line '{}'", line.trim())))?;

        let mut m = Matrix3::zeros();
        match values.len() {
            3 | 9 => {
                m[(0, 0)] = values[0];
                m[(1, 1)] = values[1];
                m[(2, 2)] = values[2];
                if values.len() == 9 {
                    m[(1, 0)] = values[3];
                    m[(2, 0)] = values[4];
                    m[(0, 1)] = values[5];
                    m[(2, 1)] = values[6];
                    m[(0, 2)] = values[7];
                    m[(1, 2)] = values[8];
                }
            }
            n => return Err(self.error(format!("box line needs 3 or 9 values, got {n}"))),
        }
        Ok(PeriodicBox::from_matrix(m))
    }
}

/// Extract "t= <value>" from a title line
fn parse_time(title: &str) -> Option<f64> {
    let rest = &title[title.find("t=")? + 2..];
    rest.split_whitespace().next()?.parse().ok()
}

/// Approximate atomic mass from the first letter of the atom name
fn mass_from_name(name: &str) -> f32 {
    match name.trim_start_matches(|c: char| c.is_ascii_digit()).chars().next() {
        Some('C') => 12.011,
        Some('O') => 15.999,
        Some('N') => 14.007,
        Some('S') => 32.065,
        Some('P') => 30.974,
        Some('H') => 1.008,
        _ => 1.0,
    }
}

fn open_parser(path: &Path) -> std::io::Result<GroParser<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(GroParser::new(path.to_path_buf(), BufReader::new(file)))
}

/// Multi-frame GRO trajectory reader
pub struct GroReader {
    parser: GroParser<BufReader<File>>,
    frames_read: usize,
}

impl GroReader {
    /// Open a GRO trajectory
    pub fn open(path: &Path) -> std::result::Result<Self, ContractError> {
        let parser =
            open_parser(path).map_err(|e| ContractError::trajectory_open(path, e.to_string()))?;
        Ok(Self {
            parser,
            frames_read: 0,
        })
    }

    /// Frames decoded so far
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }
}

impl TrajectoryReader for GroReader {
    fn read_frame(&mut self) -> std::result::Result<Option<Frame>, ContractError> {
        let block = self.parser.next_block()?;
        if block.is_some() {
            self.frames_read += 1;
        }
        Ok(block.map(|b| b.frame))
    }
}

/// Load the first frame of a GRO file into a system (atoms + coordinates)
pub fn load_structure(
    path: &Path,
    system: &mut MolecularSystem,
) -> std::result::Result<(), ContractError> {
    let mut parser =
        open_parser(path).map_err(|e| ContractError::structure_load(path, e.to_string()))?;
    let block = parser
        .next_block()
        .map_err(|e| ContractError::structure_load(path, e.to_string()))?
        .ok_or_else(|| ContractError::structure_load(path, "file contains no frame"))?;

    let GroBlock { frame, atoms } = block;
    for (atom, coord) in atoms.into_iter().zip(frame.coords) {
        system.push_atom(atom, coord);
    }
    system.set_box(frame.periodic_box);
    system.record_source(path.display().to_string());

    debug!(
        path = %path.display(),
        atoms = system.num_atoms(),
        "GRO structure loaded"
    );
    Ok(())
}
