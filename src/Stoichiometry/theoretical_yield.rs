//! # Theoretical yield
//!
//! Given the reactants of a balanced reaction (identifier, mass in grams, mole ratio) and the
//! product (identifier, mole ratio) the calculator finds the limiting reactant and the maximum
//! mass of product obtainable when it is fully consumed.
//!
//! For every reactant i
//! ```text
//! n_i = m_i / M_i,          normalized_i = n_i / ratio_i
//! ```
//! the limiting reactant is the one with the smallest normalized_i, and
//! ```text
//! yield = normalized_limiting * ratio_product * M_product
//! ```
//! A single failing reactant aborts the whole calculation, nothing is skipped.
use crate::Stoichiometry::resolver::{IdentifierKind, ResolveError, StructureResolver};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// mole ratio used when a reactant does not specify one
pub const DEFAULT_MOLE_RATIO: f64 = 1.0;

/// A reactant of the balanced equation. The name is the key of the reactant map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reactant {
    /// structural identifier (SMILES by default)
    pub smiles: Option<String>,
    /// mass in grams
    #[serde(alias = "weight_g", alias = "mass")]
    pub mass_g: Option<f64>,
    #[serde(default)]
    pub mole_ratio: Option<f64>,
}

impl Reactant {
    pub fn new(smiles: &str, mass_g: f64, mole_ratio: f64) -> Self {
        Self {
            smiles: Some(smiles.to_string()),
            mass_g: Some(mass_g),
            mole_ratio: Some(mole_ratio),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub smiles: String,
    #[serde(default = "default_ratio")]
    pub mole_ratio: f64,
}

fn default_ratio() -> f64 {
    DEFAULT_MOLE_RATIO
}

impl Product {
    pub fn new(smiles: &str, mole_ratio: f64) -> Self {
        Self {
            smiles: smiles.to_string(),
            mole_ratio,
        }
    }
}

/// Successful outcome of a calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldOutcome {
    pub theoretical_yield_g: f64,
    pub limiting_reactant: String,
}

/// Species an error refers to
#[derive(Debug, Clone, PartialEq)]
pub enum Species {
    Reactant(String),
    Product,
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::Reactant(name) => write!(f, "reactant '{}'", name),
            Species::Product => write!(f, "product"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum YieldError {
    #[error("Invalid data for reactant '{reactant}'. Missing {field}.")]
    MissingField {
        reactant: String,
        field: &'static str,
    },
    #[error("Could not parse {kind} for {species}: {identifier} ({reason})")]
    ParseFailure {
        species: Species,
        kind: IdentifierKind,
        identifier: String,
        reason: String,
    },
    #[error("No valid reactants provided.")]
    NoReactants,
    #[error("Invalid value for {species}: {reason}")]
    Validation { species: Species, reason: String },
    #[error("An error occurred with the {species}: {source}")]
    UnexpectedFailure {
        species: Species,
        source: ResolveError,
    },
}

pub type CalculationResult = Result<YieldOutcome, YieldError>;

/// Per-reactant numbers behind a calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactantMoles {
    pub name: String,
    pub identifier: String,
    pub formula: String,
    pub molecular_weight: f64,
    pub mass_g: f64,
    pub mole_ratio: f64,
    pub moles: f64,
    pub normalized_moles: f64,
    /// mass used up when the limiting reactant is fully consumed
    pub consumed_g: f64,
    /// mass of this reactant left over (zero for the limiting reactant)
    pub excess_g: f64,
}

/// Outcome with the full breakdown of the calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldReport {
    pub outcome: YieldOutcome,
    pub reactants: Vec<ReactantMoles>,
    pub product_identifier: String,
    pub product_formula: String,
    pub product_molecular_weight: f64,
    pub product_moles: f64,
}

fn check_positive(value: f64, what: &str, species: &Species) -> Result<f64, YieldError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(YieldError::Validation {
            species: species.clone(),
            reason: format!("{} must be a positive number, got {}", what, value),
        })
    }
}

fn resolve_weight<R: StructureResolver>(
    resolver: &R,
    identifier: &str,
    species: &Species,
) -> Result<(String, f64), YieldError> {
    let structure = resolver.resolve(identifier).map_err(|e| match e {
        ResolveError::Parse { identifier, reason } => YieldError::ParseFailure {
            species: species.clone(),
            kind: resolver.identifier_kind(),
            identifier,
            reason,
        },
        other => YieldError::UnexpectedFailure {
            species: species.clone(),
            source: other,
        },
    })?;
    let weight = resolver
        .molecular_weight(&structure)
        .map_err(|e| YieldError::UnexpectedFailure {
            species: species.clone(),
            source: e,
        })?;
    let weight = check_positive(weight, "molecular weight", species)?;
    Ok((resolver.formula(&structure), weight))
}

/// Full calculation with the per-reactant breakdown. Errors are the same as
/// [`calculate_theoretical_yield`].
pub fn yield_report<R: StructureResolver>(
    resolver: &R,
    reactants: &BTreeMap<String, Reactant>,
    product: &Product,
) -> Result<YieldReport, YieldError> {
    let mut rows: Vec<ReactantMoles> = Vec::with_capacity(reactants.len());
    for (name, data) in reactants {
        let species = Species::Reactant(name.clone());
        let identifier = data.smiles.as_deref().ok_or_else(|| YieldError::MissingField {
            reactant: name.clone(),
            field: resolver.identifier_kind().label(),
        })?;
        let mass_g = data.mass_g.ok_or_else(|| YieldError::MissingField {
            reactant: name.clone(),
            field: "weight",
        })?;
        let mass_g = check_positive(mass_g, "mass", &species)?;
        let mole_ratio = check_positive(
            data.mole_ratio.unwrap_or(DEFAULT_MOLE_RATIO),
            "mole ratio",
            &species,
        )?;
        let (formula, molecular_weight) = resolve_weight(resolver, identifier, &species)?;
        let moles = mass_g / molecular_weight;
        let normalized_moles = moles / mole_ratio;
        debug!(
            "reactant '{}': M = {} g/mol, n = {} mol, n/ratio = {}",
            name, molecular_weight, moles, normalized_moles
        );
        rows.push(ReactantMoles {
            name: name.clone(),
            identifier: identifier.to_string(),
            formula,
            molecular_weight,
            mass_g,
            mole_ratio,
            moles,
            normalized_moles,
            consumed_g: 0.0,
            excess_g: 0.0,
        });
    }

    // first minimum in key order wins a tie
    let limiting = rows
        .iter()
        .reduce(|best, row| {
            if row.normalized_moles < best.normalized_moles {
                row
            } else {
                best
            }
        })
        .ok_or(YieldError::NoReactants)?;
    let limiting_name = limiting.name.clone();
    let extent = limiting.normalized_moles;

    for row in rows.iter_mut() {
        row.consumed_g = extent * row.mole_ratio * row.molecular_weight;
        row.excess_g = if row.name == limiting_name {
            0.0
        } else {
            (row.mass_g - row.consumed_g).max(0.0)
        };
    }

    let product_ratio = check_positive(product.mole_ratio, "mole ratio", &Species::Product)?;
    let product_moles = extent * product_ratio;
    let (product_formula, product_weight) =
        resolve_weight(resolver, &product.smiles, &Species::Product)?;
    let theoretical_yield_g = product_moles * product_weight;
    info!(
        "limiting reactant '{}', theoretical yield {} g of {}",
        limiting_name, theoretical_yield_g, product.smiles
    );

    Ok(YieldReport {
        outcome: YieldOutcome {
            theoretical_yield_g,
            limiting_reactant: limiting_name,
        },
        reactants: rows,
        product_identifier: product.smiles.clone(),
        product_formula,
        product_molecular_weight: product_weight,
        product_moles,
    })
}

/// Theoretical yield (grams of product) and the name of the limiting reactant.
///
/// # Errors
/// * `MissingField` - a reactant has no identifier or no mass
/// * `ParseFailure` - an identifier (reactant or product) is not a valid structure
/// * `NoReactants` - the reactant map is empty
/// * `Validation` - a mass, mole ratio or molecular weight is not positive
/// * `UnexpectedFailure` - the resolver failed for any other reason
///
/// # Examples
/// ```
/// use ChemYield::Stoichiometry::resolver::SmilesResolver;
/// use ChemYield::Stoichiometry::theoretical_yield::{calculate_theoretical_yield, Product, Reactant};
/// use std::collections::BTreeMap;
/// let reactants = BTreeMap::from([("ethanol".to_string(), Reactant::new("CCO", 46.0, 1.0))]);
/// let outcome =
///     calculate_theoretical_yield(&SmilesResolver::default(), &reactants, &Product::new("O", 1.0))
///         .unwrap();
/// assert_eq!(outcome.limiting_reactant, "ethanol");
/// ```
pub fn calculate_theoretical_yield<R: StructureResolver>(
    resolver: &R,
    reactants: &BTreeMap<String, Reactant>,
    product: &Product,
) -> CalculationResult {
    yield_report(resolver, reactants, product).map(|report| report.outcome)
}

/// Percent yield of an isolated product mass
pub fn percent_yield(actual_g: f64, theoretical_g: f64) -> Result<f64, YieldError> {
    check_positive(theoretical_g, "theoretical yield", &Species::Product)?;
    if !actual_g.is_finite() || actual_g < 0.0 {
        return Err(YieldError::Validation {
            species: Species::Product,
            reason: format!("actual yield must be a non-negative number, got {}", actual_g),
        });
    }
    Ok(100.0 * actual_g / theoretical_g)
}
