/// Module to calculate the atomic composition and molar mass of a chemical formula
///
/// Holds the element table used by every molecular weight calculation in the crate:
/// standard atomic weights for average molar masses, the mass of the most abundant
/// isotope for exact (monoisotopic) masses, and a small table of labelled isotopes.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

/// mass of an electron, Da. Subtracted once per unit of positive charge in exact masses
pub const ELECTRON_MASS: f64 = 0.000_548_579_909_065;

/// Chemical groups (abbreviations) and their atomic composition, e.g. { "Me":{"C":1, "H":3}}
pub type GroupTable = HashMap<String, HashMap<String, usize>>;

// Define a struct to hold element data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    pub name: &'static str,
    /// standard atomic weight, g/mol
    pub atomic_mass: f64,
    /// mass of the most abundant isotope, Da
    pub monoisotopic_mass: f64,
    /// mass number of the most abundant isotope
    pub mass_number: u16,
}

/// Which molecular weight a calculation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MassModel {
    /// sum of the most abundant isotope masses
    #[default]
    Exact,
    /// sum of standard atomic weights
    Average,
}

impl MassModel {
    pub fn toggled(self) -> Self {
        match self {
            MassModel::Exact => MassModel::Average,
            MassModel::Average => MassModel::Exact,
        }
    }
}

impl std::fmt::Display for MassModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MassModel::Exact => write!(f, "exact (monoisotopic)"),
            MassModel::Average => write!(f, "average (standard atomic weights)"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Empty formula")]
    Empty,
    #[error("Unknown element '{symbol}' in formula '{formula}'")]
    UnknownElement { symbol: String, formula: String },
    #[error("Unbalanced brackets in formula '{formula}'")]
    UnbalancedBrackets { formula: String },
    #[error("Unexpected character '{character}' at position {position} in formula '{formula}'")]
    InvalidCharacter {
        character: char,
        position: usize,
        formula: String,
    },
    #[error("Invalid atom count in formula '{formula}'")]
    InvalidCount { formula: String },
}

macro_rules! element {
    ($name:expr, $avg:expr, $mono:expr, $a:expr) => {
        Element {
            name: $name,
            atomic_mass: $avg,
            monoisotopic_mass: $mono,
            mass_number: $a,
        }
    };
}

// Define a list of elements and their atomic masses
const ELEMENTS: &[Element] = &[
    element!("H", 1.008, 1.007_825_032_23, 1),
    element!("He", 4.0026, 4.002_603_254_13, 4),
    element!("Li", 6.94, 7.016_003_436_6, 7),
    element!("Be", 9.0122, 9.012_183_065, 9),
    element!("B", 10.81, 11.009_305_36, 11),
    element!("C", 12.011, 12.0, 12),
    element!("N", 14.007, 14.003_074_004_43, 14),
    element!("O", 15.999, 15.994_914_619_57, 16),
    element!("F", 18.998, 18.998_403_162_73, 19),
    element!("Ne", 20.18, 19.992_440_176_2, 20),
    element!("Na", 22.99, 22.989_769_282, 23),
    element!("Mg", 24.305, 23.985_041_697, 24),
    element!("Al", 26.982, 26.981_538_53, 27),
    element!("Si", 28.085, 27.976_926_534_65, 28),
    element!("P", 30.974, 30.973_761_998_42, 31),
    element!("S", 32.06, 31.972_071_174_4, 32),
    element!("Cl", 35.45, 34.968_852_682, 35),
    element!("Ar", 39.948, 39.962_383_123_7, 40),
    element!("K", 39.098, 38.963_706_486_4, 39),
    element!("Ca", 40.078, 39.962_590_863, 40),
    element!("Sc", 44.956, 44.955_908_28, 45),
    element!("Ti", 47.867, 47.947_941_98, 48),
    element!("V", 50.942, 50.943_957_04, 51),
    element!("Cr", 51.996, 51.940_506_23, 52),
    element!("Mn", 54.938, 54.938_043_91, 55),
    element!("Fe", 55.845, 55.934_936_33, 56),
    element!("Co", 58.933, 58.933_194_29, 59),
    element!("Ni", 58.693, 57.935_342_41, 58),
    element!("Cu", 63.546, 62.929_597_72, 63),
    element!("Zn", 65.38, 63.929_142_01, 64),
    element!("Ga", 69.723, 68.925_573_5, 69),
    element!("Ge", 72.63, 73.921_177_761, 74),
    element!("As", 74.922, 74.921_594_57, 75),
    element!("Se", 78.971, 79.916_521_8, 80),
    element!("Br", 79.904, 78.918_337_6, 79),
    element!("Kr", 83.798, 83.911_497_728_2, 84),
    element!("Rb", 85.468, 84.911_789_737_9, 85),
    element!("Sr", 87.62, 87.905_612_5, 88),
    element!("Y", 88.906, 88.905_840_3, 89),
    element!("Zr", 91.224, 89.904_697_7, 90),
    element!("Nb", 92.906, 92.906_373, 93),
    element!("Mo", 95.95, 97.905_404_82, 98),
    element!("Ru", 101.07, 101.904_344_1, 102),
    element!("Rh", 102.91, 102.905_498, 103),
    element!("Pd", 106.42, 105.903_480_4, 106),
    element!("Ag", 107.87, 106.905_091_6, 107),
    element!("Cd", 112.41, 113.903_365_09, 114),
    element!("In", 114.82, 114.903_878_776, 115),
    element!("Sn", 118.71, 119.902_201_63, 120),
    element!("Sb", 121.76, 120.903_812, 121),
    element!("Te", 127.6, 129.906_222_748, 130),
    element!("I", 126.9, 126.904_471_9, 127),
    element!("Xe", 131.29, 131.904_155_085_6, 132),
    element!("Cs", 132.91, 132.905_451_961, 133),
    element!("Ba", 137.33, 137.905_247, 138),
    element!("Pt", 195.08, 194.964_791_7, 195),
    element!("Au", 196.97, 196.966_568_79, 197),
    element!("Hg", 200.59, 201.970_643_4, 202),
    element!("Pb", 207.2, 207.976_652_5, 208),
    element!("Bi", 208.98, 208.980_399_1, 209),
];

// labelled isotopes that are not the most abundant one: (symbol, mass number, mass)
const ISOTOPES: &[(&str, u16, f64)] = &[
    ("H", 2, 2.014_101_778_12),
    ("H", 3, 3.016_049_281_3),
    ("C", 11, 11.011_433_6),
    ("C", 13, 13.003_354_835_07),
    ("C", 14, 14.003_241_988_4),
    ("N", 15, 15.000_108_898_88),
    ("O", 17, 16.999_131_756_5),
    ("O", 18, 17.999_159_612_1),
    ("F", 18, 18.000_938_0),
    ("P", 32, 31.973_907_643),
    ("S", 34, 33.967_867_004),
    ("S", 35, 34.969_032_32),
    ("Cl", 37, 36.965_902_602),
    ("Br", 81, 80.916_289_7),
    ("I", 125, 124.904_630_2),
    ("I", 131, 130.906_126_3),
];

pub fn element_by_symbol(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.iter().find(|element| element.name == symbol)
}

/// mass of a given isotope of an element, None if the isotope is not tabulated
pub fn isotope_mass(symbol: &str, mass_number: u16) -> Option<f64> {
    let element = element_by_symbol(symbol)?;
    if element.mass_number == mass_number {
        return Some(element.monoisotopic_mass);
    }
    ISOTOPES
        .iter()
        .find(|(s, a, _)| *s == symbol && *a == mass_number)
        .map(|(_, _, mass)| *mass)
}

/// mass of one atom of the element under the chosen model
pub fn atom_mass(element: &Element, model: MassModel) -> f64 {
    match model {
        MassModel::Exact => element.monoisotopic_mass,
        MassModel::Average => element.atomic_mass,
    }
}

static PHASE_MARKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((?:[cCgGlLsS]|aq|AQ|cr|CR)\)").expect("phase mark pattern is valid")
});

fn filter_phases_marks(formula: &str) -> String {
    PHASE_MARKS.replace_all(formula, "").into_owned()
}

struct FormulaParser<'a> {
    chars: Vec<char>,
    pos: usize,
    formula: &'a str,
    groups: Option<&'a GroupTable>,
}

impl<'a> FormulaParser<'a> {
    fn new(part: &str, formula: &'a str, groups: Option<&'a GroupTable>) -> Self {
        Self {
            chars: part.chars().collect(),
            pos: 0,
            formula,
            groups,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn is_known(&self, symbol: &str) -> bool {
        element_by_symbol(symbol).is_some()
            || self.groups.is_some_and(|groups| groups.contains_key(symbol))
    }

    fn read_count(&mut self) -> Result<usize, FormulaError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(1);
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits.parse().map_err(|_| FormulaError::InvalidCount {
            formula: self.formula.to_string(),
        })
    }

    // element or group symbol: longest known match starting with an uppercase letter
    fn read_symbol(&mut self) -> Result<String, FormulaError> {
        let start = self.pos;
        let mut end = start + 1;
        while end < self.chars.len() && end - start < 4 && self.chars[end].is_lowercase() {
            end += 1;
        }
        // an uppercase second letter that is not an element itself is the second letter
        // of a two-letter symbol written in capitals, e.g. CL
        if let Some(&next) = self.chars.get(start + 1) {
            if next.is_uppercase() && !self.is_known(&next.to_string()) {
                let candidate = format!("{}{}", self.chars[start], next.to_lowercase());
                if self.is_known(&candidate) {
                    self.pos = start + 2;
                    return Ok(candidate);
                }
            }
        }
        for stop in (start + 1..=end).rev() {
            let candidate: String = self.chars[start..stop].iter().collect();
            if self.is_known(&candidate) {
                self.pos = stop;
                return Ok(candidate);
            }
        }
        let symbol: String = self.chars[start..end].iter().collect();
        Err(FormulaError::UnknownElement {
            symbol,
            formula: self.formula.to_string(),
        })
    }

    fn count_overflow(&self) -> FormulaError {
        FormulaError::InvalidCount {
            formula: self.formula.to_string(),
        }
    }

    fn add_symbol(
        &self,
        counts: &mut HashMap<String, usize>,
        symbol: String,
        count: usize,
    ) -> Result<(), FormulaError> {
        // chemical groups are turned into regular elements, i.e. Me is converted into {"C":1, "H":3}
        if let Some(composition) = self.groups.and_then(|groups| groups.get(&symbol)) {
            for (atom, quantity) in composition {
                add_scaled(counts, atom.clone(), *quantity, count)
                    .ok_or_else(|| self.count_overflow())?;
            }
        } else {
            add_scaled(counts, symbol, count, 1).ok_or_else(|| self.count_overflow())?;
        }
        Ok(())
    }

    fn parse_group(&mut self, depth: usize) -> Result<HashMap<String, usize>, FormulaError> {
        let mut counts = HashMap::new();
        while let Some(c) = self.peek() {
            match c {
                '(' | '[' => {
                    self.pos += 1;
                    let inner = self.parse_group(depth + 1)?;
                    match self.peek() {
                        Some(')') | Some(']') => self.pos += 1,
                        _ => {
                            return Err(FormulaError::UnbalancedBrackets {
                                formula: self.formula.to_string(),
                            });
                        }
                    }
                    let multiplier = self.read_count()?;
                    for (atom, count) in inner {
                        add_scaled(&mut counts, atom, count, multiplier)
                            .ok_or_else(|| self.count_overflow())?;
                    }
                }
                ')' | ']' => {
                    if depth == 0 {
                        return Err(FormulaError::UnbalancedBrackets {
                            formula: self.formula.to_string(),
                        });
                    }
                    return Ok(counts);
                }
                c if c.is_uppercase() => {
                    let symbol = self.read_symbol()?;
                    let count = self.read_count()?;
                    self.add_symbol(&mut counts, symbol, count)?;
                }
                other => {
                    return Err(FormulaError::InvalidCharacter {
                        character: other,
                        position: self.pos,
                        formula: self.formula.to_string(),
                    });
                }
            }
        }
        Ok(counts)
    }
}

// adds count * multiplier to the atom total, None on overflow
fn add_scaled(
    counts: &mut HashMap<String, usize>,
    atom: String,
    count: usize,
    multiplier: usize,
) -> Option<()> {
    let total = counts.entry(atom).or_insert(0);
    *total = count.checked_mul(multiplier)?.checked_add(*total)?;
    Some(())
}

/// Parse a chemical formula and return a HashMap of elements and their counts.
///
/// Argument groups is optional. It is needed if formula contains special names for chemical
/// groups like Me, Ph, etc. In that case this argument should contain the names of these groups
/// and their atomic composition { "Me":{"C":1, "H":3}}.
/// Hydrates are written with a separator and an optional multiplier: CuSO4*5H2O, CuSO4·5H2O
pub fn parse_formula(
    formula: &str,
    groups: Option<&GroupTable>,
) -> Result<HashMap<String, usize>, FormulaError> {
    let cleaned = filter_phases_marks(&formula.replace(' ', ""));
    if cleaned.is_empty() {
        return Err(FormulaError::Empty);
    }
    let mut counts: HashMap<String, usize> = HashMap::new();
    for part in cleaned.split(['*', '·', '.']) {
        let mut parser = FormulaParser::new(part, formula, groups);
        let multiplier = parser.read_count()?;
        if parser.peek().is_none() {
            return Err(FormulaError::InvalidCount {
                formula: formula.to_string(),
            });
        }
        for (atom, count) in parser.parse_group(0)? {
            add_scaled(&mut counts, atom, count, multiplier)
                .ok_or_else(|| parser.count_overflow())?;
        }
    }
    Ok(counts)
}

/// molar mass of an atomic composition
pub fn composition_mass(
    counts: &HashMap<String, usize>,
    model: MassModel,
) -> Result<f64, FormulaError> {
    let mut molar_mass = 0.0;
    for (symbol, count) in counts {
        let element = element_by_symbol(symbol).ok_or_else(|| FormulaError::UnknownElement {
            symbol: symbol.clone(),
            formula: hill_formula(counts),
        })?;
        molar_mass += atom_mass(element, model) * *count as f64;
    }
    Ok(molar_mass)
}

/// Formula in Hill notation: C first, H second, then the other elements alphabetically.
/// Without carbon all elements are alphabetical.
pub fn hill_formula(counts: &HashMap<String, usize>) -> String {
    let mut symbols: Vec<&String> = counts.keys().filter(|s| counts[*s] > 0).collect();
    symbols.sort();
    let has_carbon = counts.get("C").is_some_and(|&n| n > 0);
    if has_carbon {
        symbols.sort_by_key(|s| match s.as_str() {
            "C" => 0,
            "H" => 1,
            _ => 2,
        });
    }
    symbols
        .into_iter()
        .map(|symbol| match counts[symbol] {
            1 => symbol.clone(),
            n => format!("{}{}", symbol, n),
        })
        .collect()
}

// Function to calculate the molar mass of a substance given its chemical formula
pub fn calculate_molar_mass(
    formula: &str,
    groups: Option<&GroupTable>,
    model: MassModel,
) -> Result<(f64, HashMap<String, usize>), FormulaError> {
    let counts = parse_formula(formula, groups)?;
    let molar_mass = composition_mass(&counts, model)?;
    Ok((molar_mass, counts))
}

// Function to calculate the molar mass of a vector of chemical formulas
pub fn calculate_molar_mass_of_vector_of_subs(
    vec_of_formulae: &[&str],
    groups: Option<&GroupTable>,
    model: MassModel,
) -> Result<Vec<f64>, FormulaError> {
    vec_of_formulae
        .iter()
        .map(|formula| calculate_molar_mass(formula, groups, model).map(|(mass, _)| mass))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_formula() {
        let expected_counts = HashMap::from([
            ("C".to_string(), 6),
            ("H".to_string(), 8),
            ("O".to_string(), 6),
        ]);
        assert_eq!(parse_formula("C6H8O6", None).unwrap(), expected_counts);

        let expected_counts = HashMap::from([
            ("Na".to_string(), 1),
            ("N".to_string(), 2),
            ("O".to_string(), 6),
        ]);
        assert_eq!(parse_formula("Na(NO3)2", None).unwrap(), expected_counts);

        let expected_counts = HashMap::from([("H".to_string(), 2), ("O".to_string(), 1)]);
        assert_eq!(parse_formula("H2O", None).unwrap(), expected_counts);

        let expected_counts = HashMap::from([
            ("C".to_string(), 5),
            ("H".to_string(), 7),
            ("O".to_string(), 2),
        ]);
        assert_eq!(parse_formula("C5H6OOH", None).unwrap(), expected_counts);
    }

    #[test]
    fn test_nested_brackets_and_hydrates() {
        // K3[Fe(CN)6]
        let counts = parse_formula("K3[Fe(CN)6]", None).unwrap();
        assert_eq!(counts["K"], 3);
        assert_eq!(counts["Fe"], 1);
        assert_eq!(counts["C"], 6);
        assert_eq!(counts["N"], 6);

        let counts = parse_formula("CuSO4*5H2O", None).unwrap();
        assert_eq!(counts["Cu"], 1);
        assert_eq!(counts["S"], 1);
        assert_eq!(counts["O"], 9);
        assert_eq!(counts["H"], 10);
    }

    #[test]
    fn test_capital_second_letter() {
        let counts = parse_formula("NaCL", None).unwrap();
        assert_eq!(counts.get("Cl"), Some(&1));
        assert_eq!(counts.get("Na"), Some(&1));
        // CO stays carbon monoxide
        let counts = parse_formula("CO", None).unwrap();
        assert_eq!(counts.get("C"), Some(&1));
        assert_eq!(counts.get("O"), Some(&1));
    }

    #[test]
    fn test_formula_errors() {
        assert_eq!(parse_formula("", None), Err(FormulaError::Empty));
        assert_eq!(parse_formula(" (g)", None), Err(FormulaError::Empty));
        assert!(matches!(
            parse_formula("Xx2", None),
            Err(FormulaError::UnknownElement { .. })
        ));
        assert!(matches!(
            parse_formula("Ca(NO3", None),
            Err(FormulaError::UnbalancedBrackets { .. })
        ));
        assert!(matches!(
            parse_formula("NO3)2", None),
            Err(FormulaError::UnbalancedBrackets { .. })
        ));
        assert!(matches!(
            parse_formula("h2o", None),
            Err(FormulaError::InvalidCharacter { character: 'h', .. })
        ));
    }

    #[test]
    fn test_calculate_molar_mass() {
        let (molar_mass, _) = calculate_molar_mass("H2O(g)", None, MassModel::Average).unwrap();
        assert_relative_eq!(molar_mass, 18.01528, epsilon = 1e-2);

        let (molar_mass, _) = calculate_molar_mass("NaCl", None, MassModel::Average).unwrap();
        assert_relative_eq!(molar_mass, 58.44, epsilon = 1e-2);

        let (molar_mass, _) = calculate_molar_mass("C6H8O6", None, MassModel::Average).unwrap();
        assert_relative_eq!(molar_mass, 176.12, epsilon = 1e-2);

        let (molar_mass, _) = calculate_molar_mass("Ca(NO3)2", None, MassModel::Average).unwrap();
        assert_relative_eq!(molar_mass, 164.093, epsilon = 1e-2);
    }

    #[test]
    fn test_exact_molar_mass() {
        let (molar_mass, _) = calculate_molar_mass("H2O", None, MassModel::Exact).unwrap();
        assert_relative_eq!(molar_mass, 18.010_564_684, epsilon = 1e-8);
        let (molar_mass, _) = calculate_molar_mass("C2H6O", None, MassModel::Exact).unwrap();
        assert_relative_eq!(molar_mass, 46.041_864_813, epsilon = 1e-8);
    }

    #[test]
    fn test_calculate_molar_mass_of_vector_of_substances() {
        let vec_of_formulae = ["H2O", "NaCl", "C6H8O6", "Ca(NO3)2"];
        let expected_molar_masses = [18.01528, 58.44316, 176.12, 164.093];

        let calculated_molar_masses =
            calculate_molar_mass_of_vector_of_subs(&vec_of_formulae, None, MassModel::Average)
                .unwrap();

        for (calculated, expected) in calculated_molar_masses.iter().zip(expected_molar_masses) {
            assert_relative_eq!(*calculated, expected, epsilon = 1e-2);
        }
        assert!(
            calculate_molar_mass_of_vector_of_subs(&["H2O", "Qq"], None, MassModel::Average)
                .is_err()
        );
    }

    #[test]
    fn test_with_groups() {
        let groups: GroupTable = HashMap::from([(
            "Me".to_string(),
            HashMap::from([("C".to_string(), 1), ("H".to_string(), 3)]),
        )]);
        let expected_counts = HashMap::from([("H".to_string(), 8), ("C".to_string(), 7)]);
        assert_eq!(parse_formula("C6H5Me", Some(&groups)).unwrap(), expected_counts);

        let expected_counts = HashMap::from([("H".to_string(), 10), ("C".to_string(), 8)]);
        assert_eq!(parse_formula("C6H4(Me)2", Some(&groups)).unwrap(), expected_counts);
    }

    #[test]
    fn test_isotopes_and_hill_formula() {
        assert_eq!(isotope_mass("C", 12), Some(12.0));
        assert_relative_eq!(isotope_mass("H", 2).unwrap(), 2.014_101_778, epsilon = 1e-8);
        assert_eq!(isotope_mass("C", 99), None);
        assert_eq!(isotope_mass("Zz", 1), None);

        let counts = parse_formula("OHC2H5", None).unwrap();
        assert_eq!(hill_formula(&counts), "C2H6O");
        let counts = parse_formula("ClNa", None).unwrap();
        assert_eq!(hill_formula(&counts), "ClNa");
    }

    #[test]
    fn test_count_overflow() {
        let huge = "(C9999999999)9999999999";
        assert!(matches!(
            parse_formula(huge, None),
            Err(FormulaError::InvalidCount { .. })
        ));
        assert!(matches!(
            parse_formula("99999999999*C9999999999", None),
            Err(FormulaError::InvalidCount { .. })
        ));
        let groups: GroupTable = HashMap::from([(
            "Me".to_string(),
            HashMap::from([("C".to_string(), usize::MAX)]),
        )]);
        assert!(matches!(
            parse_formula("Me2", Some(&groups)),
            Err(FormulaError::InvalidCount { .. })
        ));
        // the sum of two parts overflows too
        let near_max = format!("C{}C{}", usize::MAX, 1);
        assert!(parse_formula(&near_max, None).is_err());
    }
}
