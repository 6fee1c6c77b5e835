/// One coordinate-bearing particle record from a structure description.
///
/// Indices are dense, 0-based, and assigned in file order across the whole
/// structure before any derivation runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub index: usize,
    pub name: String,
    pub element: String,
    pub position: [f64; 3],
}

impl Atom {
    pub fn is_hydrogen(&self) -> bool {
        self.element == "H"
    }
}

/// A named group of atoms (one amino acid, nucleotide, or het group).
#[derive(Debug, Clone)]
pub struct Residue {
    pub name: String,
    pub chain_id: char,
    pub seq: i32,
    pub insertion_code: Option<char>,
    pub atoms: Vec<Atom>,
}

impl Residue {
    /// Look up an atom by its canonical name (e.g. `CA`).
    ///
    /// Returns the first atom bearing that name; alternate-location
    /// duplicates keep their own entries but do not shadow the first.
    pub fn atom(&self, name: &str) -> Option<&Atom> {
        self.atoms.iter().find(|a| a.name == name)
    }
}

/// Ordered residues as they appear in the source record, each owning its
/// atoms. Every atom belongs to exactly one residue.
#[derive(Debug, Clone, Default)]
pub struct Polymer {
    pub residues: Vec<Residue>,
}

impl Polymer {
    /// All atoms in index order.
    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.residues.iter().flat_map(|r| r.atoms.iter())
    }

    pub fn atom_count(&self) -> usize {
        self.residues.iter().map(|r| r.atoms.len()).sum()
    }
}
