pub mod model;
pub mod record;

pub use model::{Atom, Polymer, Residue};
pub use record::{ParseError, atom_record_lines};

/// Parse raw structure text into a [`Polymer`].
///
/// Filters the text down to its atom records first, so the caller gets the
/// same model it would build from [`atom_record_lines`] output.
pub fn parse(text: &str) -> Result<Polymer, ParseError> {
    let lines = atom_record_lines(text);
    Polymer::from_records(&lines)
}
