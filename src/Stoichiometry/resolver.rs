//! # Structure resolvers
//!
//! The yield calculator does not care how an identifier becomes a molecular weight. It asks a
//! [`StructureResolver`] for two things: turn an identifier into a structure (or fail to parse
//! it), and give the molecular weight of a structure.
//!
//! Two resolvers are provided:
//! - [`SmilesResolver`]: identifiers are SMILES strings, see [`crate::Stoichiometry::smiles`]
//! - [`FormulaResolver`]: identifiers are molecular formulae like `C2H5OH` or `Ca(NO3)2`
//!
//! Both can report exact (monoisotopic) or average weights, see [`MassModel`].
use crate::Stoichiometry::molmass::{
    FormulaError, GroupTable, MassModel, composition_mass, hill_formula, parse_formula,
};
use crate::Stoichiometry::smiles::{Molecule, SmilesError, parse_smiles};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    #[error("'{identifier}' is not a valid structure: {reason}")]
    Parse { identifier: String, reason: String },
    #[error("no mass data for isotope {mass_number}{symbol}")]
    UnknownIsotope { symbol: String, mass_number: u16 },
    #[error("cannot compute a weight for '{identifier}': {reason}")]
    Unsupported { identifier: String, reason: String },
}

/// Resolves structural identifiers to structures and structures to molecular weights
pub trait StructureResolver {
    type Structure;
    fn resolve(&self, identifier: &str) -> Result<Self::Structure, ResolveError>;
    fn molecular_weight(&self, structure: &Self::Structure) -> Result<f64, ResolveError>;
    /// formula of a resolved structure, for display
    fn formula(&self, structure: &Self::Structure) -> String;
    /// kind of identifier this resolver reads, used in error messages
    fn identifier_kind(&self) -> IdentifierKind {
        IdentifierKind::Smiles
    }
}

/// Which kind of identifier the user types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdentifierKind {
    #[default]
    Smiles,
    Formula,
}

impl IdentifierKind {
    pub fn label(self) -> &'static str {
        match self {
            IdentifierKind::Smiles => "SMILES",
            IdentifierKind::Formula => "formula",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            IdentifierKind::Smiles => IdentifierKind::Formula,
            IdentifierKind::Formula => IdentifierKind::Smiles,
        }
    }
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SmilesResolver {
    pub mass_model: MassModel,
}

impl SmilesResolver {
    pub fn new(mass_model: MassModel) -> Self {
        Self { mass_model }
    }
}

impl StructureResolver for SmilesResolver {
    type Structure = Molecule;

    fn resolve(&self, identifier: &str) -> Result<Molecule, ResolveError> {
        let molecule = parse_smiles(identifier).map_err(|e| ResolveError::Parse {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        })?;
        debug!(
            "SMILES '{}' resolved: {} heavy atoms, formula {}",
            identifier,
            molecule.heavy_atom_count(),
            molecule.formula()
        );
        Ok(molecule)
    }

    fn molecular_weight(&self, molecule: &Molecule) -> Result<f64, ResolveError> {
        molecule
            .molecular_weight(self.mass_model)
            .map_err(|e| match e {
                SmilesError::UnknownIsotope {
                    symbol,
                    mass_number,
                } => ResolveError::UnknownIsotope {
                    symbol,
                    mass_number,
                },
                other => ResolveError::Unsupported {
                    identifier: molecule.smiles.clone(),
                    reason: other.to_string(),
                },
            })
    }

    fn formula(&self, molecule: &Molecule) -> String {
        molecule.formula()
    }
}

/// Resolver for molecular formulae. Optional chemical group abbreviations
/// (e.g. { "Me":{"C":1, "H":3}}) are expanded while parsing.
#[derive(Debug, Clone, Default)]
pub struct FormulaResolver {
    pub mass_model: MassModel,
    pub groups: Option<GroupTable>,
}

impl FormulaResolver {
    pub fn new(mass_model: MassModel) -> Self {
        Self {
            mass_model,
            groups: None,
        }
    }

    pub fn with_groups(mut self, groups: GroupTable) -> Self {
        self.groups = Some(groups);
        self
    }
}

impl StructureResolver for FormulaResolver {
    type Structure = HashMap<String, usize>;

    fn resolve(&self, identifier: &str) -> Result<HashMap<String, usize>, ResolveError> {
        parse_formula(identifier, self.groups.as_ref()).map_err(|e| ResolveError::Parse {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        })
    }

    fn molecular_weight(&self, composition: &HashMap<String, usize>) -> Result<f64, ResolveError> {
        composition_mass(composition, self.mass_model).map_err(|e: FormulaError| {
            ResolveError::Unsupported {
                identifier: hill_formula(composition),
                reason: e.to_string(),
            }
        })
    }

    fn formula(&self, composition: &HashMap<String, usize>) -> String {
        hill_formula(composition)
    }

    fn identifier_kind(&self) -> IdentifierKind {
        IdentifierKind::Formula
    }
}

/// Resolve an identifier and return (formula, molecular weight) in one call
pub fn describe<R: StructureResolver>(
    resolver: &R,
    identifier: &str,
) -> Result<(String, f64), ResolveError> {
    let structure = resolver.resolve(identifier)?;
    let weight = resolver.molecular_weight(&structure)?;
    Ok((resolver.formula(&structure), weight))
}
