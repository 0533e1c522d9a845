use ChemYield::Utils::logger::init_logging;
use ChemYield::cli::cli_main::run_interactive_menu;
use ChemYield::settings::SettingsManager;

pub fn main() {
    let mut manager = SettingsManager::new();
    if let Err(e) = init_logging(manager.settings()) {
        eprintln!("Logging disabled: {}", e);
    }
    if let Err(e) = run_interactive_menu(&mut manager) {
        eprintln!("An unexpected error occurred: {}", e);
        std::process::exit(1);
    }
}
