use super::error::{StructureError, StructureParseErrorKind, parse_count, parse_float};
use super::traits::{Frame, StructureFile};
use crate::core::models::atom::Atom;
use crate::core::models::cell::Cell;
use itertools::Itertools;
use nalgebra::{Matrix3, Point3, Vector3};
use std::io::{BufRead, Write};

/// VASP POSCAR files: comment, scale factor, three lattice vectors, element names,
/// element counts, an optional selective-dynamics line, the coordinate mode and one
/// position per atom.
///
/// Element names may repeat (`O H O`), so atoms are written as consecutive runs and
/// read back in the same order. A negative scale factor is interpreted as the target
/// cell volume.
pub struct PoscarFile;

struct LineCursor<R> {
    lines: std::io::Lines<R>,
    line_num: usize,
}

impl<R: BufRead> LineCursor<R> {
    fn next_line(&mut self, record: &str) -> Result<(usize, String), StructureError> {
        match self.lines.next() {
            Some(line) => {
                self.line_num += 1;
                Ok((self.line_num, line?))
            }
            None => Err(StructureError::MissingRecord(record.to_string())),
        }
    }
}

fn parse_vector(line: &str, line_num: usize) -> Result<Vector3<f64>, StructureError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(StructureError::parse(
            line_num,
            StructureParseErrorKind::TooFewFields {
                expected: 3,
                found: fields.len(),
            },
        ));
    }
    Ok(Vector3::new(
        parse_float(fields[0], "x", line_num)?,
        parse_float(fields[1], "y", line_num)?,
        parse_float(fields[2], "z", line_num)?,
    ))
}

fn is_numeric_line(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|token| token.parse::<f64>().is_ok())
}

impl StructureFile for PoscarFile {
    type Error = StructureError;

    fn read_from(reader: &mut impl BufRead) -> Result<Frame, Self::Error> {
        let mut cursor = LineCursor {
            lines: reader.lines(),
            line_num: 0,
        };

        let (_, comment) = cursor.next_line("comment line")?;
        let (scale_line, scale_str) = cursor.next_line("scale factor")?;
        let scale_token = scale_str.split_whitespace().next().unwrap_or("");
        let scale = parse_float(scale_token, "scale factor", scale_line)?;

        let mut rows = Vec::with_capacity(3);
        for record in ["lattice vector a", "lattice vector b", "lattice vector c"] {
            let (n, line) = cursor.next_line(record)?;
            rows.push(parse_vector(&line, n)?.transpose());
        }
        let raw = Matrix3::from_rows(&rows);
        let factor = if scale < 0.0 {
            let volume = raw.determinant().abs();
            if volume <= 0.0 {
                return Err(StructureError::parse(
                    scale_line,
                    StructureParseErrorKind::InvalidLattice,
                ));
            }
            (-scale / volume).cbrt()
        } else {
            scale
        };
        let cell = Cell::new(raw * factor)
            .map_err(|_| StructureError::parse(scale_line, StructureParseErrorKind::InvalidLattice))?;

        let (names_line, names_str) = cursor.next_line("element names")?;
        let (counts_line, counts_str) = if is_numeric_line(&names_str) {
            (names_line, names_str.clone())
        } else {
            cursor.next_line("element counts")?
        };
        let names: Vec<String> = if is_numeric_line(&names_str) {
            // VASP 4 files keep the element names in the comment line.
            comment.split_whitespace().map(str::to_string).collect()
        } else {
            names_str.split_whitespace().map(str::to_string).collect()
        };
        let counts = counts_str
            .split_whitespace()
            .map(|c| parse_count(c, "element count", counts_line))
            .collect::<Result<Vec<_>, _>>()?;
        // Blank name and count lines describe a structure without atoms.
        if names.len() < counts.len() || (counts.is_empty() && !names.is_empty()) {
            return Err(StructureError::MissingRecord(format!(
                "element names for {} count entries",
                counts.len()
            )));
        }

        let (_, mut mode) = cursor.next_line("coordinate mode")?;
        if mode.trim_start().starts_with(['S', 's']) {
            (_, mode) = cursor.next_line("coordinate mode")?;
        }
        let cartesian = mode.trim_start().starts_with(['C', 'c', 'K', 'k']);

        let total: usize = counts.iter().sum();
        let mut atoms = Vec::with_capacity(total);
        for (name, &count) in names.iter().zip(&counts) {
            for _ in 0..count {
                let (n, line) = cursor.next_line("atom position").map_err(|_| {
                    StructureError::Inconsistency(format!(
                        "element counts declare {} atoms but only {} positions were found",
                        total,
                        atoms.len()
                    ))
                })?;
                let v = parse_vector(&line, n)?;
                let position = if cartesian {
                    Point3::from(v * factor)
                } else {
                    cell.to_cartesian(&v)
                };
                atoms.push(Atom::new(name, position));
            }
        }

        Ok(Frame {
            comment: comment.trim().to_string(),
            cell: Some(cell),
            atoms,
        })
    }

    fn write_to(frame: &Frame, writer: &mut impl Write) -> Result<(), Self::Error> {
        let cell = frame
            .cell
            .as_ref()
            .ok_or_else(|| StructureError::MissingRecord("lattice (POSCAR requires a cell)".into()))?;

        let runs: Vec<(&str, usize)> = frame
            .atoms
            .iter()
            .chunk_by(|atom| atom.element.as_str())
            .into_iter()
            .map(|(element, group)| (element, group.count()))
            .collect();

        let comment = if frame.comment.is_empty() {
            runs.iter().map(|(e, _)| *e).join(" ")
        } else {
            frame.comment.replace('\n', " ")
        };
        writeln!(writer, "{}", comment)?;
        writeln!(writer, "{:>19.14}", 1.0)?;
        for i in 0..3 {
            let v = cell.vector(i);
            writeln!(writer, " {:>21.16} {:>21.16} {:>21.16}", v.x, v.y, v.z)?;
        }
        writeln!(
            writer,
            " {}",
            runs.iter().map(|(e, _)| format!("{:>3}", e)).join(" ")
        )?;
        writeln!(
            writer,
            " {}",
            runs.iter().map(|(_, n)| format!("{:>3}", n)).join(" ")
        )?;
        writeln!(writer, "Cartesian")?;
        for atom in &frame.atoms {
            writeln!(
                writer,
                " {:>21.16} {:>21.16} {:>21.16}",
                atom.position.x, atom.position.y, atom.position.z
            )?;
        }
        Ok(())
    }
}
