//! # SMILES parser
//!
//! Turns a SMILES string into a [`Molecule`]: atoms with their hydrogen counts, charges and
//! isotope labels, and the bonds between them. Only what is needed for molecular weights and
//! formulae is kept; stereo marks (`@`, `/`, `\`) are read and dropped.
//!
//! Supported syntax:
//! - organic subset atoms `B C N O P S F Cl Br I` and aromatic `b c n o p s`, which receive
//!   implicit hydrogens from their default valences
//! - bracket atoms `[isotope symbol chirality Hcount charge :class]`, e.g. `[13CH4]`, `[NH4+]`,
//!   `[Fe+2]`, `[nH]`, `[C@@H]`, `[O-:1]`; they carry no implicit hydrogens
//! - bonds `- = # $ : / \`, branches `( )`, ring closures `1`..`9` and `%nn`, and `.` for
//!   disconnected components
//! - anything after the first whitespace is a name and is ignored
//!
//! ```
//! use ChemYield::Stoichiometry::smiles::parse_smiles;
//! let ethanol = parse_smiles("CCO").unwrap();
//! assert_eq!(ethanol.formula(), "C2H6O");
//! ```
use crate::Stoichiometry::molmass::{
    ELECTRON_MASS, MassModel, atom_mass, element_by_symbol, hill_formula, isotope_mass,
};
use std::collections::HashMap;
use thiserror::Error;

/// largest formal charge accepted on a bracket atom
pub const MAX_CHARGE: u32 = 15;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SmilesError {
    #[error("empty SMILES string")]
    Empty,
    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("unbalanced parentheses at position {position}")]
    UnbalancedBranch { position: usize },
    #[error("ring bond {label} is never closed")]
    UnclosedRing { label: u32 },
    #[error("ring bond {label} connects an atom to itself")]
    SelfBond { label: u32 },
    #[error("ring bond {label} has conflicting bond symbols")]
    ConflictingRingBond { label: u32 },
    #[error("bond symbol at position {position} is not between two atoms")]
    DanglingBond { position: usize },
    #[error("invalid bracket atom at position {position}: {reason}")]
    InvalidBracketAtom { position: usize, reason: String },
    #[error("unknown element '{symbol}'")]
    UnknownElement { symbol: String },
    #[error("no mass data for isotope {mass_number}{symbol}")]
    UnknownIsotope { symbol: String, mass_number: u16 },
    #[error("wildcard atom '*' has no mass")]
    Wildcard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    fn valence(self) -> u32 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// element symbol with capital first letter ("C" for aromatic "c"), "*" for a wildcard
    pub symbol: String,
    pub aromatic: bool,
    pub isotope: Option<u16>,
    pub charge: i32,
    /// hydrogens written inside brackets or derived from the default valence
    pub hydrogens: u32,
    pub bracket: bool,
    pub atom_class: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bond {
    pub begin: usize,
    pub end: usize,
    pub order: BondOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    pub smiles: String,
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
}

impl Molecule {
    /// number of atoms written in the SMILES string (hydrogens not counted)
    pub fn heavy_atom_count(&self) -> usize {
        self.atoms.iter().filter(|atom| atom.symbol != "H").count()
    }

    /// sum of the formal charges; each charge is bounded by `MAX_CHARGE`
    pub fn net_charge(&self) -> i64 {
        self.atoms.iter().map(|atom| i64::from(atom.charge)).sum()
    }

    /// atomic composition including hydrogens
    pub fn composition(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for atom in &self.atoms {
            *counts.entry(atom.symbol.clone()).or_insert(0) += 1;
            if atom.hydrogens > 0 {
                *counts.entry("H".to_string()).or_insert(0) += atom.hydrogens as usize;
            }
        }
        counts
    }

    /// molecular formula in Hill notation
    pub fn formula(&self) -> String {
        hill_formula(&self.composition())
    }

    /// Molecular weight. Exact: most abundant (or labelled) isotope masses with the electron
    /// mass removed for each positive charge. Average: standard atomic weights, labelled
    /// isotopes still use their own mass.
    pub fn molecular_weight(&self, model: MassModel) -> Result<f64, SmilesError> {
        let hydrogen = element_by_symbol("H").ok_or_else(|| SmilesError::UnknownElement {
            symbol: "H".to_string(),
        })?;
        let mut weight = 0.0;
        for atom in &self.atoms {
            if atom.symbol == "*" {
                return Err(SmilesError::Wildcard);
            }
            let element =
                element_by_symbol(&atom.symbol).ok_or_else(|| SmilesError::UnknownElement {
                    symbol: atom.symbol.clone(),
                })?;
            weight += match atom.isotope {
                Some(mass_number) => isotope_mass(&atom.symbol, mass_number).ok_or_else(|| {
                    SmilesError::UnknownIsotope {
                        symbol: atom.symbol.clone(),
                        mass_number,
                    }
                })?,
                None => atom_mass(element, model),
            };
            weight += atom_mass(hydrogen, model) * atom.hydrogens as f64;
        }
        if model == MassModel::Exact {
            weight -= ELECTRON_MASS * self.net_charge() as f64;
        }
        Ok(weight)
    }
}

// default valences of the organic subset
fn default_valences(symbol: &str) -> &'static [u32] {
    match symbol {
        "B" => &[3],
        "C" => &[4],
        "N" | "P" => &[3, 5],
        "O" => &[2],
        "S" => &[2, 4, 6],
        "F" | "Cl" | "Br" | "I" => &[1],
        _ => &[],
    }
}

fn implicit_hydrogens(symbol: &str, aromatic: bool, bond_sum: u32) -> u32 {
    let valences = default_valences(symbol);
    if aromatic {
        // one valence unit belongs to the aromatic system
        return valences
            .first()
            .map_or(0, |v| v.saturating_sub(bond_sum + 1));
    }
    valences
        .iter()
        .find(|&&v| v >= bond_sum)
        .map_or(0, |v| v - bond_sum)
}

struct SmilesParser<'a> {
    chars: Vec<char>,
    pos: usize,
    smiles: &'a str,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    prev: Option<usize>,
    pending_bond: Option<(BondOrder, usize)>,
    branches: Vec<Option<usize>>,
    rings: HashMap<u32, (usize, Option<BondOrder>)>,
}

impl<'a> SmilesParser<'a> {
    fn new(smiles: &'a str) -> Self {
        Self {
            chars: smiles.chars().collect(),
            pos: 0,
            smiles,
            atoms: Vec::new(),
            bonds: Vec::new(),
            prev: None,
            pending_bond: None,
            branches: Vec::new(),
            rings: HashMap::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn default_bond(&self, a: usize, b: usize) -> BondOrder {
        if self.atoms[a].aromatic && self.atoms[b].aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn add_atom(&mut self, atom: Atom) -> Result<(), SmilesError> {
        self.atoms.push(atom);
        let index = self.atoms.len() - 1;
        match (self.prev, self.pending_bond.take()) {
            (Some(prev), bond) => {
                let order = bond.map_or_else(|| self.default_bond(prev, index), |(b, _)| b);
                self.bonds.push(Bond {
                    begin: prev,
                    end: index,
                    order,
                });
            }
            (None, Some((_, bond_position))) => {
                return Err(SmilesError::DanglingBond {
                    position: bond_position,
                });
            }
            (None, None) => {}
        }
        self.prev = Some(index);
        Ok(())
    }

    fn organic_atom(&mut self, c: char) -> Result<(), SmilesError> {
        self.pos += 1;
        let (symbol, aromatic) = match c {
            'C' if self.peek() == Some('l') => {
                self.pos += 1;
                ("Cl".to_string(), false)
            }
            'B' if self.peek() == Some('r') => {
                self.pos += 1;
                ("Br".to_string(), false)
            }
            '*' => ("*".to_string(), false),
            c if c.is_lowercase() => (c.to_ascii_uppercase().to_string(), true),
            c => (c.to_string(), false),
        };
        let atom = Atom {
            symbol,
            aromatic,
            isotope: None,
            charge: 0,
            hydrogens: 0,
            bracket: false,
            atom_class: None,
        };
        self.add_atom(atom)
    }

    // digits inside a bracket atom; Ok(None) when there are none
    fn read_number(&mut self, position: usize) -> Result<Option<u32>, SmilesError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(None);
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .parse()
            .map(Some)
            .map_err(|_| self.bracket_error(position, "number too large"))
    }

    fn bracket_error(&self, position: usize, reason: &str) -> SmilesError {
        SmilesError::InvalidBracketAtom {
            position,
            reason: reason.to_string(),
        }
    }

    fn bracket_symbol(&mut self, position: usize) -> Result<(String, bool), SmilesError> {
        let first = self
            .peek()
            .ok_or_else(|| self.bracket_error(position, "missing element symbol"))?;
        if first == '*' {
            self.pos += 1;
            return Ok(("*".to_string(), false));
        }
        if first.is_lowercase() {
            let two: String = self.chars[self.pos..(self.pos + 2).min(self.chars.len())]
                .iter()
                .collect();
            if two == "se" || two == "as" {
                self.pos += 2;
                let mut symbol = two;
                symbol[..1].make_ascii_uppercase();
                return Ok((symbol, true));
            }
            if matches!(first, 'b' | 'c' | 'n' | 'o' | 'p' | 's') {
                self.pos += 1;
                return Ok((first.to_ascii_uppercase().to_string(), true));
            }
            return Err(SmilesError::UnknownElement {
                symbol: first.to_string(),
            });
        }
        if !first.is_ascii_uppercase() {
            return Err(self.bracket_error(position, "missing element symbol"));
        }
        if let Some(second) = self.chars.get(self.pos + 1).filter(|c| c.is_ascii_lowercase()) {
            let symbol = format!("{}{}", first, second);
            if element_by_symbol(&symbol).is_some() {
                self.pos += 2;
                return Ok((symbol, false));
            }
        }
        let symbol = first.to_string();
        if element_by_symbol(&symbol).is_some() {
            self.pos += 1;
            return Ok((symbol, false));
        }
        let unknown: String = self.chars[self.pos..]
            .iter()
            .take_while(|c| c.is_ascii_alphabetic())
            .take(2)
            .collect();
        Err(SmilesError::UnknownElement { symbol: unknown })
    }

    fn skip_chirality(&mut self, position: usize) -> Result<(), SmilesError> {
        if self.peek() != Some('@') {
            return Ok(());
        }
        while self.peek() == Some('@') {
            self.pos += 1;
        }
        let tag: String = self.chars[self.pos..].iter().take(2).collect();
        if matches!(tag.as_str(), "TH" | "AL" | "SP" | "TB" | "OH") {
            self.pos += 2;
            self.read_number(position)?;
        }
        Ok(())
    }

    fn read_charge(&mut self, position: usize) -> Result<i32, SmilesError> {
        let sign = match self.peek() {
            Some('+') => 1,
            Some('-') => -1,
            _ => return Ok(0),
        };
        let sign_char = if sign > 0 { '+' } else { '-' };
        self.pos += 1;
        let magnitude = match self.read_number(position)? {
            Some(n) => n,
            None => {
                let mut repeated = 1;
                while self.peek() == Some(sign_char) {
                    self.pos += 1;
                    repeated += 1;
                }
                repeated
            }
        };
        if magnitude > MAX_CHARGE {
            return Err(self.bracket_error(position, "charge out of range"));
        }
        // bounded by MAX_CHARGE, fits i32
        Ok(sign * magnitude as i32)
    }

    fn bracket_atom(&mut self) -> Result<(), SmilesError> {
        let position = self.pos;
        // '['
        self.pos += 1;
        let isotope = match self.read_number(position)? {
            Some(n) => Some(
                u16::try_from(n).map_err(|_| self.bracket_error(position, "isotope too large"))?,
            ),
            None => None,
        };
        let (symbol, aromatic) = self.bracket_symbol(position)?;
        self.skip_chirality(position)?;
        let hydrogens = if self.peek() == Some('H') {
            self.pos += 1;
            self.read_number(position)?.unwrap_or(1)
        } else {
            0
        };
        let charge = self.read_charge(position)?;
        let atom_class = if self.peek() == Some(':') {
            self.pos += 1;
            Some(
                self.read_number(position)?
                    .ok_or_else(|| self.bracket_error(position, "atom class without a number"))?,
            )
        } else {
            None
        };
        if self.peek() != Some(']') {
            return Err(self.bracket_error(position, "expected ']'"));
        }
        self.pos += 1;
        let atom = Atom {
            symbol,
            aromatic,
            isotope,
            charge,
            hydrogens,
            bracket: true,
            atom_class,
        };
        self.add_atom(atom)
    }

    fn ring_closure(&mut self, c: char) -> Result<(), SmilesError> {
        let position = self.pos;
        self.pos += 1;
        let label = if c == '%' {
            let digits: String = self.chars[self.pos..].iter().take(2).collect();
            if digits.len() != 2 || !digits.chars().all(|d| d.is_ascii_digit()) {
                return Err(SmilesError::UnexpectedCharacter {
                    character: '%',
                    position,
                });
            }
            self.pos += 2;
            digits.parse().map_err(|_| SmilesError::UnexpectedCharacter {
                character: '%',
                position,
            })?
        } else {
            c.to_digit(10).ok_or(SmilesError::UnexpectedCharacter {
                character: c,
                position,
            })?
        };
        let current = self.prev.ok_or(SmilesError::UnexpectedCharacter {
            character: c,
            position,
        })?;
        let bond = self.pending_bond.take().map(|(b, _)| b);
        match self.rings.remove(&label) {
            Some((opening, opening_bond)) => {
                if opening == current {
                    return Err(SmilesError::SelfBond { label });
                }
                let order = match (opening_bond, bond) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(SmilesError::ConflictingRingBond { label });
                    }
                    (Some(a), _) | (None, Some(a)) => a,
                    (None, None) => self.default_bond(opening, current),
                };
                self.bonds.push(Bond {
                    begin: opening,
                    end: current,
                    order,
                });
            }
            None => {
                self.rings.insert(label, (current, bond));
            }
        }
        Ok(())
    }

    fn bond_symbol(&mut self, c: char) -> Result<(), SmilesError> {
        let position = self.pos;
        if self.pending_bond.is_some() || self.prev.is_none() {
            return Err(SmilesError::DanglingBond { position });
        }
        let order = match c {
            '=' => BondOrder::Double,
            '#' => BondOrder::Triple,
            '$' => BondOrder::Quadruple,
            ':' => BondOrder::Aromatic,
            _ => BondOrder::Single,
        };
        self.pending_bond = Some((order, position));
        self.pos += 1;
        Ok(())
    }

    fn parse(mut self) -> Result<Molecule, SmilesError> {
        while let Some(c) = self.peek() {
            match c {
                'B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I' | 'b' | 'c' | 'n' | 'o' | 'p'
                | 's' | '*' => self.organic_atom(c)?,
                '[' => self.bracket_atom()?,
                '(' => {
                    if self.prev.is_none() {
                        return Err(SmilesError::UnbalancedBranch { position: self.pos });
                    }
                    if let Some((_, position)) = self.pending_bond {
                        return Err(SmilesError::DanglingBond { position });
                    }
                    self.branches.push(self.prev);
                    self.pos += 1;
                }
                ')' => {
                    if let Some((_, position)) = self.pending_bond {
                        return Err(SmilesError::DanglingBond { position });
                    }
                    self.prev = self
                        .branches
                        .pop()
                        .ok_or(SmilesError::UnbalancedBranch { position: self.pos })?;
                    self.pos += 1;
                }
                '-' | '=' | '#' | '$' | ':' | '/' | '\\' => self.bond_symbol(c)?,
                '.' => {
                    if self.prev.is_none() || self.pending_bond.is_some() {
                        return Err(SmilesError::UnexpectedCharacter {
                            character: c,
                            position: self.pos,
                        });
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                '%' | '0'..='9' => self.ring_closure(c)?,
                c if c.is_whitespace() => break,
                other => {
                    return Err(SmilesError::UnexpectedCharacter {
                        character: other,
                        position: self.pos,
                    });
                }
            }
        }
        if self.atoms.is_empty() {
            return Err(SmilesError::Empty);
        }
        if !self.branches.is_empty() {
            return Err(SmilesError::UnbalancedBranch { position: self.pos });
        }
        if let Some((_, position)) = self.pending_bond {
            return Err(SmilesError::DanglingBond { position });
        }
        if self.prev.is_none() {
            // trailing '.'
            return Err(SmilesError::UnexpectedCharacter {
                character: '.',
                position: self.pos.saturating_sub(1),
            });
        }
        if let Some(label) = self.rings.keys().min() {
            return Err(SmilesError::UnclosedRing { label: *label });
        }
        self.assign_implicit_hydrogens();
        Ok(Molecule {
            smiles: self.smiles.to_string(),
            atoms: self.atoms,
            bonds: self.bonds,
        })
    }

    fn assign_implicit_hydrogens(&mut self) {
        let mut bond_sums = vec![0u32; self.atoms.len()];
        for bond in &self.bonds {
            bond_sums[bond.begin] += bond.order.valence();
            bond_sums[bond.end] += bond.order.valence();
        }
        for (atom, bond_sum) in self.atoms.iter_mut().zip(bond_sums) {
            if !atom.bracket {
                atom.hydrogens = implicit_hydrogens(&atom.symbol, atom.aromatic, bond_sum);
            }
        }
    }
}

/// Parse a SMILES string into a [`Molecule`]
pub fn parse_smiles(smiles: &str) -> Result<Molecule, SmilesError> {
    let trimmed = smiles.trim();
    if trimmed.is_empty() {
        return Err(SmilesError::Empty);
    }
    SmilesParser::new(trimmed).parse()
}
