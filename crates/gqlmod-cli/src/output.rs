use anyhow::Result;
use colored::Colorize;
use serde_json::Value;

pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_module(position: usize, name: &str, imports: &[String]) {
    if imports.is_empty() {
        println!("{position:>3}. {}", name.cyan());
    } else {
        println!(
            "{position:>3}. {} {} {}",
            name.cyan(),
            "imports".dimmed(),
            imports.join(", ")
        );
    }
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}
