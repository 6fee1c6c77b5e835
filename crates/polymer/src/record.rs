use crate::model::{Atom, Polymer, Residue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed atom record {record}: {detail}")]
    MalformedRecord { record: usize, detail: String },
    #[error("no atom records found in input")]
    NoAtoms,
}

/// Filter raw structure text down to its atom records.
///
/// Keeps `ATOM` and `HETATM` lines with their terminators stripped, stopping
/// at the first `ENDMDL` so multi-model files contribute a single model.
/// The same line set feeds both the parser and the serialized artifact.
pub fn atom_record_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for line in text.lines() {
        if line.starts_with("ATOM") || line.starts_with("HETATM") {
            lines.push(line.to_string());
        }
        if line.starts_with("ENDMDL") {
            break;
        }
    }
    lines
}

impl Polymer {
    /// Build a polymer from pre-filtered atom-record lines.
    ///
    /// Atoms get dense 0-based indices in record order. A new residue opens
    /// whenever the (chain, sequence, insertion code, name) key changes
    /// between consecutive records.
    pub fn from_records(lines: &[String]) -> Result<Self, ParseError> {
        let mut polymer = Polymer::default();
        let mut index = 0;

        for (n, line) in lines.iter().enumerate() {
            let record = n + 1;
            let name = column(line, 12, 16).to_string();
            let res_name = column(line, 17, 20).to_string();
            let chain_id = column(line, 21, 22).chars().next().unwrap_or(' ');
            let seq = parse_field(column(line, 22, 26), record, "residue sequence")?;
            let insertion_code = column(line, 26, 27).chars().next();
            let position = [
                parse_field(column(line, 30, 38), record, "x coordinate")?,
                parse_field(column(line, 38, 46), record, "y coordinate")?,
                parse_field(column(line, 46, 54), record, "z coordinate")?,
            ];
            let element = match column(line, 76, 78) {
                "" => element_from_name(&name),
                symbol => symbol.to_uppercase(),
            };

            let same_residue = polymer.residues.last().is_some_and(|r| {
                r.chain_id == chain_id
                    && r.seq == seq
                    && r.insertion_code == insertion_code
                    && r.name == res_name
            });
            if !same_residue {
                polymer.residues.push(Residue {
                    name: res_name,
                    chain_id,
                    seq,
                    insertion_code,
                    atoms: Vec::new(),
                });
            }

            if let Some(residue) = polymer.residues.last_mut() {
                residue.atoms.push(Atom {
                    index,
                    name,
                    element,
                    position,
                });
                index += 1;
            }
        }

        if polymer.residues.is_empty() {
            return Err(ParseError::NoAtoms);
        }
        Ok(polymer)
    }
}

/// Byte-range column slice, trimmed; short lines yield empty fields.
fn column(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or("").trim()
}

fn parse_field<T: std::str::FromStr>(
    field: &str,
    record: usize,
    what: &str,
) -> Result<T, ParseError> {
    field.parse().map_err(|_| ParseError::MalformedRecord {
        record,
        detail: format!("unreadable {what} field {field:?}"),
    })
}

/// Element guessed from the atom name when the element columns are blank:
/// leading digits are remoteness markers, the first letter is the symbol.
fn element_from_name(name: &str) -> String {
    name.trim_start_matches(|c: char| c.is_ascii_digit())
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}
