//! Interactive prompts

use anyhow::Context;
use colored::Colorize;
use planton_core::ProvisionerType;
use std::io::{BufRead, IsTerminal, Write};

/// Asks for a provisioner when the manifest has no provisioner label
pub fn select_provisioner() -> anyhow::Result<ProvisionerType> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!(
            "manifest has no project-planton.org/provisioner label and stdin is not interactive\n\
             Add the label to the manifest, e.g.:\n  \
             metadata:\n    labels:\n      project-planton.org/provisioner: pulumi"
        );
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    read_provisioner(&mut stdin.lock(), &mut stdout.lock())
}

pub fn read_provisioner<R, W>(input: &mut R, output: &mut W) -> anyhow::Result<ProvisionerType>
where
    R: BufRead,
    W: Write,
{
    writeln!(output)?;
    writeln!(output, "{}", "Select provisioner:".bold())?;
    for (i, provisioner) in ProvisionerType::ALL.iter().enumerate() {
        let suffix = if *provisioner == ProvisionerType::Pulumi {
            " (default)"
        } else {
            ""
        };
        writeln!(output, "  {}) {}{}", i + 1, provisioner, suffix)?;
    }
    write!(output, "Enter choice [1]: ")?;
    output.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read provisioner choice")?;

    match line.trim().to_lowercase().as_str() {
        "" | "1" | "pulumi" => Ok(ProvisionerType::Pulumi),
        "2" | "tofu" => Ok(ProvisionerType::Tofu),
        "3" | "terraform" => Ok(ProvisionerType::Terraform),
        other => anyhow::bail!("invalid provisioner choice '{other}', expected 1, 2 or 3"),
    }
}

/// `[y/N]` confirmation on the terminal
pub fn confirm(question: &str) -> std::io::Result<bool> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    read_confirmation(question, &mut stdin.lock(), &mut stdout.lock())
}

pub fn read_confirmation<R, W>(question: &str, input: &mut R, output: &mut W) -> std::io::Result<bool>
where
    R: BufRead,
    W: Write,
{
    write!(output, "{question} [y/N] ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
