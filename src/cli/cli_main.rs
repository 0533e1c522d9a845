use super::cli_yield::{CliError, Console};
use crate::settings::SettingsManager;
use log::error;
use std::io::{self, BufRead, Write};

/// Main menu on stdin/stdout
pub fn run_interactive_menu(manager: &mut SettingsManager) -> Result<(), CliError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut console = Console::new(stdin.lock(), stdout.lock());
    run_menu(&mut console, manager)
}

/* colors
Blue (\x1b[34m) - Welcome header text

Yellow (\x1b[33m) - Menu options

Cyan (\x1b[36m) - "Enter your choice:" prompt

Reset (\x1b[0m) - Returns to normal color after each colored section
*/
fn show_main_menu<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<(), CliError> {
    console.say("\x1b[34m\n Welcome to ChemYield: theoretical yield and limiting reactant calculator \x1b[0m")?;
    console.say("\x1b[33m1. Theoretical yield (interactive)\x1b[0m")?;
    console.say("\x1b[33m2. Theoretical yield from a task file\x1b[0m")?;
    console.say("\x1b[33m3. Molecular weight of a substance\x1b[0m")?;
    console.say("\x1b[33m4. Settings\x1b[0m")?;
    console.say("\x1b[33m0. Exit\x1b[0m")
}

/// Menu loop. Errors of a single calculation are printed and the loop goes on;
/// the loop ends on "0" or when the input ends.
pub fn run_menu<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    manager: &mut SettingsManager,
) -> Result<(), CliError> {
    loop {
        show_main_menu(console)?;
        let choice = match console.prompt("\x1b[36mEnter your choice: \x1b[0m") {
            Ok(choice) => choice,
            Err(CliError::EndOfInput) => return Ok(()),
            Err(e) => return Err(e),
        };
        let settings = manager.settings().clone();
        let result = match choice.as_str() {
            "1" => console.run_interactive(&settings),
            "2" => console.run_task_file(&settings),
            "3" => console.run_molar_mass(&settings),
            "4" => settings_menu(console, manager),
            "0" => {
                console.say("Goodbye!")?;
                return Ok(());
            }
            _ => console.say("Invalid choice. Please try again."),
        };
        match result {
            Ok(()) => {}
            Err(CliError::EndOfInput) => return Ok(()),
            Err(CliError::Io(e)) => return Err(CliError::Io(e)),
            Err(e) => {
                error!("{}", e);
                console.say(&format!("\nError: {}", e))?;
            }
        }
    }
}

fn settings_menu<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    manager: &mut SettingsManager,
) -> Result<(), CliError> {
    loop {
        let settings = manager.settings().clone();
        console.say("\n=== Settings ===")?;
        console.say(&format!("1. Decimal places: {}", settings.decimal_places))?;
        console.say(&format!("2. Molecular weight: {}", settings.mass_model))?;
        console.say(&format!("3. Identifiers: {}", settings.identifier_kind))?;
        console.say(&format!("4. Log level: {}", settings.log_level))?;
        console.say(&format!("5. Save to {}", manager.config_file()))?;
        console.say("6. Reset to defaults")?;
        console.say("0. Back to main menu")?;
        let choice = console.prompt("Enter your choice: ")?;
        match choice.as_str() {
            "1" => {
                let answer = console.prompt("Decimal places: ")?;
                match answer.parse::<usize>() {
                    Ok(n) => {
                        if let Err(e) = manager.set_decimal_places(n) {
                            console.say(&format!("Error: {}", e))?;
                        }
                    }
                    Err(_) => console.say(&format!("Error: '{}' is not a number", answer))?,
                }
            }
            "2" => manager.set_mass_model(settings.mass_model.toggled()),
            "3" => manager.set_identifier_kind(settings.identifier_kind.toggled()),
            "4" => {
                let answer = console.prompt("Log level (takes effect on restart): ")?;
                if let Err(e) = manager.set_log_level(&answer) {
                    console.say(&format!("Error: {}", e))?;
                }
            }
            "5" => match manager.save() {
                Ok(()) => console.say("Settings saved.")?,
                Err(e) => console.say(&format!("Error: {}", e))?,
            },
            "6" => manager.reset_to_defaults(),
            "0" => return Ok(()),
            _ => console.say("Invalid choice. Please try again.")?,
        }
    }
}
