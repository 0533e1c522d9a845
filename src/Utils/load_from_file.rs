use crate::Stoichiometry::resolver::IdentifierKind;
use crate::Stoichiometry::theoretical_yield::{Product, Reactant};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("File '{0}' does not exist")]
    NotFound(String),
    #[error("Failed to read file '{file}': {source}")]
    Io {
        file: String,
        source: std::io::Error,
    },
    #[error("Error parsing task file '{file}' at line {line}, column {column}: {message}")]
    Parse {
        file: String,
        line: usize,
        column: usize,
        message: String,
    },
}

/// A reaction read from a task file or typed in the interactive session
///
/// ```json
/// {
///   "reactants": {
///     "ethanol": { "smiles": "CCO", "weight_g": 46.0, "mole_ratio": 1.0 }
///   },
///   "product": { "smiles": "O", "mole_ratio": 1.0 },
///   "actual_yield_g": 12.0
/// }
/// ```
/// `identifier` may be set to "Formula" when species are given as molecular formulae.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionTask {
    pub reactants: BTreeMap<String, Reactant>,
    pub product: Product,
    #[serde(default)]
    pub actual_yield_g: Option<f64>,
    #[serde(default)]
    pub identifier: Option<IdentifierKind>,
}

impl ReactionTask {
    pub fn new(reactants: BTreeMap<String, Reactant>, product: Product) -> Self {
        Self {
            reactants,
            product,
            actual_yield_g: None,
            identifier: None,
        }
    }
}

/// Parses a JSON reaction task. `file_name` is only used in messages.
pub fn parse_reaction_task(content: &str, file_name: &str) -> Result<ReactionTask, TaskError> {
    match serde_json::from_str::<ReactionTask>(content) {
        Ok(task) => Ok(task),
        Err(e) => {
            let (line, column) = (e.line(), e.column());
            error!(
                "Error parsing task at line {}, column {}: {}",
                line, column, e
            );
            // show the problematic line with a pointer to the error position
            if let Some(problem_line) = content.lines().nth(line.saturating_sub(1)) {
                error!("Problematic line: {}", problem_line);
                if column >= 1 && column <= problem_line.len() + 1 {
                    error!("{}^", " ".repeat(column - 1));
                }
            }
            Err(TaskError::Parse {
                file: file_name.to_string(),
                line,
                column,
                message: e.to_string(),
            })
        }
    }
}

/// Loads a reaction task from a JSON file
pub fn load_reaction_task(file_name: &str) -> Result<ReactionTask, TaskError> {
    let path = Path::new(file_name);
    if !path.exists() {
        return Err(TaskError::NotFound(file_name.to_string()));
    }
    let content = fs::read_to_string(path).map_err(|source| TaskError::Io {
        file: file_name.to_string(),
        source,
    })?;
    let task = parse_reaction_task(&content, file_name)?;
    info!(
        "Successfully parsed reaction task from file '{}': {} reactants",
        file_name,
        task.reactants.len()
    );
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_reaction_task() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "{{").unwrap();
        writeln!(temp_file, "  \"reactants\": {{").unwrap();
        writeln!(
            temp_file,
            "    \"ethanol\": {{ \"smiles\": \"CCO\", \"weight_g\": 46.0, \"mole_ratio\": 1.0 }},"
        )
        .unwrap();
        writeln!(
            temp_file,
            "    \"acetic acid\": {{ \"smiles\": \"CC(=O)O\", \"mass_g\": 30.0 }}"
        )
        .unwrap();
        writeln!(temp_file, "  }},").unwrap();
        writeln!(
            temp_file,
            "  \"product\": {{ \"smiles\": \"CC(=O)OCC\", \"mole_ratio\": 1.0 }},"
        )
        .unwrap();
        writeln!(temp_file, "  \"actual_yield_g\": 20.5").unwrap();
        writeln!(temp_file, "}}").unwrap();

        let file_path = temp_file.path().to_str().unwrap();
        let task = load_reaction_task(file_path).unwrap();
        assert_eq!(task.reactants.len(), 2);
        assert_eq!(task.reactants["ethanol"], Reactant::new("CCO", 46.0, 1.0));
        let acid = &task.reactants["acetic acid"];
        assert_eq!(acid.mass_g, Some(30.0));
        assert_eq!(acid.mole_ratio, None);
        assert_eq!(task.product, Product::new("CC(=O)OCC", 1.0));
        assert_eq!(task.actual_yield_g, Some(20.5));
        assert_eq!(task.identifier, None);
    }

    #[test]
    fn test_missing_fields_are_kept_as_none() {
        let content = r#"{
            "reactants": { "x": { "smiles": "C" } },
            "product": { "smiles": "O" },
            "identifier": "Formula"
        }"#;
        let task = parse_reaction_task(content, "inline").unwrap();
        assert_eq!(task.reactants["x"].mass_g, None);
        assert_eq!(task.product.mole_ratio, 1.0);
        assert_eq!(task.identifier, Some(IdentifierKind::Formula));
    }

    #[test]
    fn test_parse_error_position() {
        let content = "{\n  \"reactants\": {},\n  \"product\": { \"smiles\": \"O\", }\n}";
        match parse_reaction_task(content, "broken.json") {
            Err(TaskError::Parse { line, file, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(file, "broken.json");
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = load_reaction_task("definitely_not_here_42.json");
        assert!(matches!(result, Err(TaskError::NotFound(_))));
    }
}
