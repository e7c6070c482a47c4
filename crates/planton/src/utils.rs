use colored::Colorize;

pub fn print_step(message: &str) {
    println!("{} {}", "→".blue().bold(), message);
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".cyan(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Banner printed before the engine takes over the terminal
pub fn print_handoff(engine: &str) {
    println!();
    println!("{}", format!("Handing off to {engine}...").blue().bold());
    println!();
}

pub fn print_run_result(engine: &str, success: bool) {
    println!();
    if success {
        println!("{}", format!("✓ {engine} run completed").green().bold());
    } else {
        eprintln!("{}", format!("✗ {engine} run failed").red().bold());
    }
}

/// Dimmed secondary line, indented under a step
pub fn print_detail(detail: &str) {
    println!("  {}", detail.dimmed());
}
