/// Module to calculate the atomic composition and molar mass of a chemical formula.
/// Also holds the element table (standard atomic weights, most abundant isotope masses,
/// labelled isotopes) used by every weight calculation in the crate.
///
///  # Examples
/// ```
/// use ChemYield::Stoichiometry::molmass::{calculate_molar_mass, MassModel};
/// let formula = "C6H8O6";
/// let (molar_mass, element_composition) =
///     calculate_molar_mass(formula, None, MassModel::Average).unwrap();
/// println!("Element counts: {:?}", element_composition);
/// println!("Molar mass: {:?} g/mol", molar_mass);
/// use ChemYield::Stoichiometry::molmass::parse_formula;
/// let atomic_composition = parse_formula("Na(NO3)2", None).unwrap();
/// println!("{:?}", atomic_composition);
/// ```
pub mod molmass;
/// SMILES strings to molecules with explicit and implicit hydrogens, and their molecular weights
pub mod smiles;
/// The structure resolver seam: identifier -> structure -> molecular weight.
/// SMILES and molecular formula resolvers are provided.
pub mod resolver;
/// Limiting reactant and theoretical yield of a reaction.
///
///  # Examples
/// ```
/// use ChemYield::Stoichiometry::resolver::SmilesResolver;
/// use ChemYield::Stoichiometry::theoretical_yield::{yield_report, Product, Reactant};
/// use std::collections::BTreeMap;
/// // esterification: acetic acid + ethanol -> ethyl acetate + water
/// let mut reactants = BTreeMap::new();
/// reactants.insert("acetic acid".to_string(), Reactant::new("CC(=O)O", 6.0, 1.0));
/// reactants.insert("ethanol".to_string(), Reactant::new("CCO", 4.6, 1.0));
/// let product = Product::new("CC(=O)OCC", 1.0);
/// let report = yield_report(&SmilesResolver::default(), &reactants, &product).unwrap();
/// println!("limiting: {}", report.outcome.limiting_reactant);
/// println!("yield: {:.2} g", report.outcome.theoretical_yield_g);
/// ```
pub mod theoretical_yield;
