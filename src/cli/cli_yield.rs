//! Prompt sessions of the yield calculator.
//!
//! Everything reads from a `BufRead` and writes to a `Write`, so the same code runs on
//! stdin/stdout in the terminal and on in-memory buffers in tests.
use crate::Stoichiometry::molmass::MassModel;
use crate::Stoichiometry::resolver::{
    FormulaResolver, IdentifierKind, ResolveError, SmilesResolver, describe,
};
use crate::Stoichiometry::theoretical_yield::{
    DEFAULT_MOLE_RATIO, Product, Reactant, YieldError, YieldReport, percent_yield, yield_report,
};
use crate::Utils::load_from_file::{ReactionTask, TaskError, load_reaction_task};
use crate::settings::{MAX_DECIMAL_PLACES, YieldSettings};
use log::{info, warn};
use prettytable::{Table, row};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input '{value}' for {field}. Please make sure to enter numbers for weight and mole ratios.")]
    InvalidNumber { field: String, value: String },
    #[error("Please enter a positive number of reactants.")]
    NonPositiveCount,
    #[error("Reactant '{0}' was already entered.")]
    DuplicateReactant(String),
    #[error("Input ended")]
    EndOfInput,
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Runs the calculation with the resolver that matches the identifier kind
pub fn compute_report(
    task: &ReactionTask,
    settings: &YieldSettings,
) -> Result<YieldReport, YieldError> {
    let kind = task.identifier.unwrap_or(settings.identifier_kind);
    match kind {
        IdentifierKind::Smiles => yield_report(
            &SmilesResolver::new(settings.mass_model),
            &task.reactants,
            &task.product,
        ),
        IdentifierKind::Formula => yield_report(
            &FormulaResolver::new(settings.mass_model),
            &task.reactants,
            &task.product,
        ),
    }
}

pub struct Console<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn say(&mut self, message: &str) -> Result<(), CliError> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    /// prints the message and returns the trimmed answer
    pub fn prompt(&mut self, message: &str) -> Result<String, CliError> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(CliError::EndOfInput);
        }
        Ok(line.trim().to_string())
    }

    fn prompt_number<T: FromStr>(&mut self, message: &str, field: &str) -> Result<T, CliError> {
        let answer = self.prompt(message)?;
        answer.parse().map_err(|_| CliError::InvalidNumber {
            field: field.to_string(),
            value: answer,
        })
    }

    // blank answer -> None
    fn prompt_optional_number(
        &mut self,
        message: &str,
        field: &str,
    ) -> Result<Option<f64>, CliError> {
        let answer = self.prompt(message)?;
        if answer.is_empty() {
            return Ok(None);
        }
        answer
            .parse()
            .map(Some)
            .map_err(|_| CliError::InvalidNumber {
                field: field.to_string(),
                value: answer,
            })
    }

    /// Asks for the reactants and the product, in the order: number of reactants, then
    /// name / identifier / weight / mole ratio of each reactant, then the product identifier
    /// and mole ratio. A blank weight is kept as missing, a blank mole ratio means 1.
    pub fn collect_reaction(&mut self, kind: IdentifierKind) -> Result<ReactionTask, CliError> {
        let count: i64 = self.prompt_number(
            "\nEnter the number of reactants: ",
            "the number of reactants",
        )?;
        if count <= 0 {
            return Err(CliError::NonPositiveCount);
        }
        let code = match kind {
            IdentifierKind::Smiles => "SMILES code",
            IdentifierKind::Formula => "formula",
        };
        let mut reactants = BTreeMap::new();
        for i in 1..=count {
            let name = self.prompt(&format!(
                "\nEnter the name of reactant {} (e.g., 'ethene'): ",
                i
            ))?;
            if reactants.contains_key(&name) {
                warn!("duplicate reactant name '{}'", name);
                return Err(CliError::DuplicateReactant(name));
            }
            let identifier = self.prompt(&format!("Enter the {} for {}: ", code, name))?;
            let mass_g = self.prompt_optional_number(
                &format!("Enter the weight of {} in grams: ", name),
                &format!("the weight of {}", name),
            )?;
            let mole_ratio = self.prompt_optional_number(
                &format!("Enter the mole ratio for {}: ", name),
                &format!("the mole ratio of {}", name),
            )?;
            reactants.insert(
                name,
                Reactant {
                    smiles: Some(identifier),
                    mass_g,
                    mole_ratio,
                },
            );
        }
        let product_identifier = self.prompt(&format!("\nEnter the {} for the product: ", code))?;
        let product_ratio = self
            .prompt_optional_number(
                "Enter the mole ratio for the product: ",
                "the mole ratio of the product",
            )?
            .unwrap_or(DEFAULT_MOLE_RATIO);
        let actual_yield_g = self.prompt_optional_number(
            "Enter the actual (isolated) yield in grams, or leave blank: ",
            "the actual yield",
        )?;
        let mut task = ReactionTask::new(reactants, Product::new(&product_identifier, product_ratio));
        task.actual_yield_g = actual_yield_g;
        task.identifier = Some(kind);
        Ok(task)
    }

    /// Prints the outcome of a task. Calculation errors are printed, not returned.
    pub fn report(&mut self, task: &ReactionTask, settings: &YieldSettings) -> Result<(), CliError> {
        let report = match compute_report(task, settings) {
            Ok(report) => report,
            Err(e) => {
                writeln!(self.output, "\nError: {}", e)?;
                return Ok(());
            }
        };
        let decimals = settings.decimal_places.min(MAX_DECIMAL_PLACES);
        writeln!(self.output, "\n--- Calculation Results ---")?;
        writeln!(
            self.output,
            "Limiting Reactant: {}",
            report.outcome.limiting_reactant
        )?;
        writeln!(
            self.output,
            "Theoretical Yield of Product: {:.*} g",
            decimals, report.outcome.theoretical_yield_g
        )?;
        writeln!(
            self.output,
            "Product {} ({}): M = {:.4} g/mol, n = {:.*} mol",
            report.product_identifier,
            report.product_formula,
            report.product_molecular_weight,
            decimals + 2,
            report.product_moles
        )?;
        if let Some(actual) = task.actual_yield_g {
            match percent_yield(actual, report.outcome.theoretical_yield_g) {
                Ok(percent) => writeln!(self.output, "Percent Yield: {:.*} %", decimals, percent)?,
                Err(e) => writeln!(self.output, "Error: {}", e)?,
            }
        }

        let mut table = Table::new();
        table.add_row(row![
            "Reactant", "Identifier", "Formula", "M, g/mol", "Mass, g", "Ratio", "n, mol",
            "n/ratio", "Consumed, g", "Excess, g"
        ]);
        for r in &report.reactants {
            table.add_row(row![
                r.name,
                r.identifier,
                r.formula,
                format!("{:.4}", r.molecular_weight),
                format!("{:.*}", decimals, r.mass_g),
                r.mole_ratio,
                format!("{:.*}", decimals + 2, r.moles),
                format!("{:.*}", decimals + 2, r.normalized_moles),
                format!("{:.*}", decimals, r.consumed_g),
                format!("{:.*}", decimals, r.excess_g)
            ]);
        }
        table.print(&mut self.output)?;
        info!(
            "reported yield for {} reactants",
            report.reactants.len()
        );
        Ok(())
    }

    /// Asks for the reactants and the product, then prints the results
    pub fn run_interactive(&mut self, settings: &YieldSettings) -> Result<(), CliError> {
        self.say("--- Theoretical Yield Calculator ---")?;
        self.say("This tool calculates the theoretical yield of a reaction.")?;
        self.say("You will be asked to provide information for each reactant and the product.")?;
        let task = self.collect_reaction(settings.identifier_kind)?;
        self.report(&task, settings)
    }

    /// Asks for a task file, loads it and prints the results
    pub fn run_task_file(&mut self, settings: &YieldSettings) -> Result<(), CliError> {
        let file_name = self.prompt("Enter the path of the task file: ")?;
        let task = load_reaction_task(&file_name)?;
        self.report(&task, settings)
    }

    /// Formula and molecular weight of a single species
    pub fn run_molar_mass(&mut self, settings: &YieldSettings) -> Result<(), CliError> {
        let kind = settings.identifier_kind;
        let identifier = self.prompt(&format!("Enter the {} of the substance: ", kind))?;
        let result: Result<(String, f64), ResolveError> = match kind {
            IdentifierKind::Smiles => describe(&SmilesResolver::new(settings.mass_model), &identifier),
            IdentifierKind::Formula => {
                describe(&FormulaResolver::new(settings.mass_model), &identifier)
            }
        };
        match result {
            Ok((formula, weight)) => {
                let label = match settings.mass_model {
                    MassModel::Exact => "Exact mass",
                    MassModel::Average => "Molar mass",
                };
                writeln!(self.output, "Formula: {}", formula)?;
                writeln!(
                    self.output,
                    "{}: {:.*} g/mol",
                    label,
                    settings.decimal_places.clamp(4, MAX_DECIMAL_PLACES),
                    weight
                )?;
            }
            Err(e) => writeln!(self.output, "Error: {}", e)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    fn run(input: &str, settings: &YieldSettings) -> (Result<(), CliError>, String) {
        let mut console = Console::new(Cursor::new(input.to_string()), Vec::new());
        let result = console.run_interactive(settings);
        let output = String::from_utf8(console.into_output()).unwrap();
        (result, output)
    }

    #[test]
    fn ethanol_to_water_session() {
        let (result, output) = run("1\nethanol\nCCO\n46.0\n1\nO\n1\n\n", &YieldSettings::default());
        assert!(result.is_ok());
        assert!(output.contains("Limiting Reactant: ethanol"), "{}", output);
        assert!(output.contains("Theoretical Yield of Product: 17.99 g"), "{}", output);
        assert!(output.contains("C2H6O"));
        assert!(!output.contains("Percent Yield"));
    }

    #[test]
    fn two_reactants_with_percent_yield() {
        let input = "2\nacid\nCC(=O)O\n6.0\n1\nalcohol\nCCO\n46\n1\nCC(=O)OCC\n1\n4.4\n";
        let settings = YieldSettings {
            decimal_places: 3,
            ..YieldSettings::default()
        };
        let (result, output) = run(input, &settings);
        assert!(result.is_ok());
        assert!(output.contains("Limiting Reactant: acid"), "{}", output);
        assert!(output.contains("Percent Yield:"), "{}", output);
    }

    #[test]
    fn blank_weight_reports_missing_field() {
        let (result, output) = run("1\nethanol\nCCO\n\n1\nO\n1\n\n", &YieldSettings::default());
        assert!(result.is_ok());
        assert!(
            output.contains("Error: Invalid data for reactant 'ethanol'. Missing weight."),
            "{}",
            output
        );
    }

    #[test]
    fn bad_smiles_reports_parse_failure() {
        let (result, output) = run("1\nx\nC1CC\n10\n1\nO\n1\n\n", &YieldSettings::default());
        assert!(result.is_ok());
        assert!(output.contains("Error: Could not parse SMILES for reactant 'x'"));
    }

    #[test]
    fn formula_session_reports_formula_errors() {
        let settings = YieldSettings {
            identifier_kind: IdentifierKind::Formula,
            ..YieldSettings::default()
        };
        let (result, output) = run("1\nsalt\nNa(Cl\n10\n1\nNaCl\n1\n\n", &settings);
        assert!(result.is_ok());
        assert!(
            output.contains("Error: Could not parse formula for reactant 'salt'"),
            "{}",
            output
        );
    }

    #[test]
    fn oversized_decimal_places_are_clamped() {
        let settings = YieldSettings {
            decimal_places: 70000,
            ..YieldSettings::default()
        };
        let (result, output) = run("1\nethanol\nCCO\n46.0\n1\nO\n1\n\n", &settings);
        assert!(result.is_ok());
        assert!(
            output.contains("Theoretical Yield of Product: 17.99418809"),
            "{}",
            output
        );
    }

    #[test]
    fn invalid_numbers_are_errors_not_panics() {
        let (result, _) = run("two\n", &YieldSettings::default());
        assert!(matches!(result, Err(CliError::InvalidNumber { .. })));

        let (result, _) = run("1\nethanol\nCCO\nheavy\n", &YieldSettings::default());
        match result {
            Err(CliError::InvalidNumber { field, value }) => {
                assert_eq!(field, "the weight of ethanol");
                assert_eq!(value, "heavy");
            }
            other => panic!("unexpected {:?}", other),
        }

        let (result, _) = run("0\n", &YieldSettings::default());
        assert!(matches!(result, Err(CliError::NonPositiveCount)));
        let (result, _) = run("-3\n", &YieldSettings::default());
        assert!(matches!(result, Err(CliError::NonPositiveCount)));
    }

    #[test]
    fn duplicate_names_and_end_of_input() {
        let (result, _) = run("2\na\nC\n1\n1\na\n", &YieldSettings::default());
        assert!(matches!(result, Err(CliError::DuplicateReactant(name)) if name == "a"));
        let (result, _) = run("", &YieldSettings::default());
        assert!(matches!(result, Err(CliError::EndOfInput)));
    }

    #[test]
    fn formula_identifiers() {
        let settings = YieldSettings {
            identifier_kind: IdentifierKind::Formula,
            mass_model: MassModel::Average,
            ..YieldSettings::default()
        };
        // 2 H2 + O2 -> 2 H2O
        let input = "2\nhydrogen\nH2\n4\n2\noxygen\nO2\n64\n1\nH2O\n2\n\n";
        let (result, output) = run(input, &settings);
        assert!(result.is_ok());
        assert!(output.contains("Enter the formula for hydrogen"));
        assert!(output.contains("Limiting Reactant: hydrogen"), "{}", output);
        assert!(output.contains("Theoretical Yield of Product: 35.74 g"), "{}", output);
    }

    #[test]
    fn task_file_session() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"reactants": {{"ethanol": {{"smiles": "CCO", "weight_g": 46.0}}}},
                "product": {{"smiles": "O"}}, "actual_yield_g": 9.0}}"#
        )
        .unwrap();
        let input = format!("{}\n", file.path().to_str().unwrap());
        let mut console = Console::new(Cursor::new(input), Vec::new());
        console.run_task_file(&YieldSettings::default()).unwrap();
        let output = String::from_utf8(console.into_output()).unwrap();
        assert!(output.contains("Theoretical Yield of Product: 17.99 g"), "{}", output);
        assert!(output.contains("Percent Yield: 50.02 %"), "{}", output);

        let mut console = Console::new(Cursor::new("nowhere.json\n".to_string()), Vec::new());
        let result = console.run_task_file(&YieldSettings::default());
        assert!(matches!(result, Err(CliError::Task(TaskError::NotFound(_)))));
    }

    #[test]
    fn molar_mass_lookup() {
        let mut console = Console::new(Cursor::new("CCO\n".to_string()), Vec::new());
        console.run_molar_mass(&YieldSettings::default()).unwrap();
        let output = String::from_utf8(console.into_output()).unwrap();
        assert!(output.contains("Formula: C2H6O"));
        assert!(output.contains("Exact mass: 46.0419 g/mol"), "{}", output);

        let settings = YieldSettings {
            identifier_kind: IdentifierKind::Formula,
            mass_model: MassModel::Average,
            ..YieldSettings::default()
        };
        let mut console = Console::new(Cursor::new("Ca(NO3\n".to_string()), Vec::new());
        console.run_molar_mass(&settings).unwrap();
        let output = String::from_utf8(console.into_output()).unwrap();
        assert!(output.contains("Error:"), "{}", output);
    }
}
