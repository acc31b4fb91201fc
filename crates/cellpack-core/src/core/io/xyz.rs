use super::error::{StructureError, StructureParseErrorKind, parse_count, parse_float};
use super::traits::{Frame, StructureFile};
use crate::core::models::atom::Atom;
use crate::core::models::cell::Cell;
use nalgebra::{Matrix3, Point3};
use std::io::{BufRead, Write};

const LATTICE_KEY: &str = "Lattice=\"";

/// XYZ files: an atom count, a comment line, then one `symbol x y z` line per atom.
///
/// Extra columns after the coordinates are ignored. If the comment line carries an
/// extended-XYZ `Lattice="..."` entry, it becomes the frame's cell; frames with a cell
/// are written back the same way.
pub struct XyzFile;

fn parse_lattice(comment: &str, line: usize) -> Result<Option<Cell>, StructureError> {
    let Some(start) = comment.find(LATTICE_KEY) else {
        return Ok(None);
    };
    let rest = &comment[start + LATTICE_KEY.len()..];
    let Some(end) = rest.find('"') else {
        return Err(StructureError::parse(
            line,
            StructureParseErrorKind::InvalidLattice,
        ));
    };
    let values = rest[..end]
        .split_whitespace()
        .map(|v| parse_float(v, "lattice", line))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != 9 {
        return Err(StructureError::parse(
            line,
            StructureParseErrorKind::TooFewFields {
                expected: 9,
                found: values.len(),
            },
        ));
    }
    let cell = Cell::new(Matrix3::from_row_slice(&values))
        .map_err(|_| StructureError::parse(line, StructureParseErrorKind::InvalidLattice))?;
    Ok(Some(cell))
}

fn format_lattice(cell: &Cell) -> String {
    let m = cell.matrix();
    let values: Vec<String> = (0..3)
        .flat_map(|i| (0..3).map(move |j| (i, j)))
        .map(|(i, j)| format!("{}", m[(i, j)]))
        .collect();
    format!("{}{}\" pbc=\"T T T\"", LATTICE_KEY, values.join(" "))
}

impl StructureFile for XyzFile {
    type Error = StructureError;

    fn read_from(reader: &mut impl BufRead) -> Result<Frame, Self::Error> {
        let mut lines = reader.lines().enumerate().map(|(i, l)| (i + 1, l));

        let (count_line, count_str) = loop {
            match lines.next() {
                Some((n, l)) => {
                    let l = l?;
                    if !l.trim().is_empty() {
                        break (n, l);
                    }
                }
                None => return Err(StructureError::MissingRecord("atom count".into())),
            }
        };
        let count = parse_count(count_str.trim(), "atom count", count_line)?;

        let comment = match lines.next() {
            Some((_, l)) => l?,
            None => return Err(StructureError::MissingRecord("comment line".into())),
        };
        let cell = parse_lattice(&comment, count_line + 1)?;

        let mut atoms = Vec::with_capacity(count);
        for (line_num, line_res) in lines {
            if atoms.len() == count {
                break;
            }
            let line = line_res?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(StructureError::parse(
                    line_num,
                    StructureParseErrorKind::TooFewFields {
                        expected: 4,
                        found: fields.len(),
                    },
                ));
            }
            let x = parse_float(fields[1], "x", line_num)?;
            let y = parse_float(fields[2], "y", line_num)?;
            let z = parse_float(fields[3], "z", line_num)?;
            atoms.push(Atom::new(fields[0], Point3::new(x, y, z)));
        }

        if atoms.len() != count {
            return Err(StructureError::Inconsistency(format!(
                "header declares {} atoms but {} were found",
                count,
                atoms.len()
            )));
        }

        Ok(Frame {
            comment: comment.trim().to_string(),
            cell,
            atoms,
        })
    }

    fn write_to(frame: &Frame, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "{}", frame.atoms.len())?;
        let comment = frame.comment.replace('\n', " ");
        match &frame.cell {
            Some(cell) if comment.is_empty() => writeln!(writer, "{}", format_lattice(cell))?,
            Some(cell) => writeln!(writer, "{} {}", format_lattice(cell), comment)?,
            None => writeln!(writer, "{}", comment)?,
        }
        for atom in &frame.atoms {
            writeln!(
                writer,
                "{:<3} {:>16.8} {:>16.8} {:>16.8}",
                atom.element, atom.position.x, atom.position.y, atom.position.z
            )?;
        }
        Ok(())
    }
}
