use colored::Colorize;
use humansize::{format_size, DECIMAL};

use crate::catalog::{FieldDef, InputKind};
use crate::transport::{Packed, Tier};
use crate::wire::{ApiResponse, SectionKind};

pub fn print_response(resp: &ApiResponse) {
    let Some(cfg) = resp.config.as_ref().filter(|_| resp.success) else {
        println!("\n{} {}", "✗ Generation failed:".red().bold(), resp.error.as_deref().unwrap_or("unknown error"));
        if resp.retryable == Some(true) {
            println!("  {}", "You can resubmit the same request.".yellow());
        }
        return;
    };

    println!(
        "\n{}",
        "┏━━━━━━━━━━━━━━━━━━━━━━━━ Site ━━━━━━━━━━━━━━━━━━━━━━━━━┓".bold()
    );
    println!(
        "  {}: {}   {}: {}   {}: {}{}",
        "Theme".magenta().bold(), cfg.theme.as_str(),
        "Pages".green().bold(), cfg.pages.len(),
        "Images".cyan().bold(), cfg.images.len(),
        if resp.demo == Some(true) { "   (demo)".yellow().to_string() } else { String::new() }
    );
    if let Some(title) = &cfg.metadata.title {
        println!("  {}: {}", "Title".bold(), title);
    }
    println!(
        "  {}: {} {} {} {} {}",
        "Palette".bold(),
        cfg.color_palette.primary, cfg.color_palette.secondary, cfg.color_palette.accent,
        cfg.color_palette.background, cfg.color_palette.text
    );
    println!("{}", "┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛".bold());

    for page in &cfg.pages {
        let label = format!("[{}]", page.kind.as_str().to_uppercase());
        let label = if page.kind.is_renderable() { label.green().bold() } else { label.red().bold() };
        let keys: Vec<&str> = page.content.keys().map(String::as_str).collect();
        println!("{}. {}  {}", page.order, label, keys.join(", "));
    }
    println!();
}

pub fn print_packed(packed: &Packed, target: &str) {
    let tier = match packed.tier {
        Tier::Optimized => packed.tier.as_str().green().bold(),
        Tier::Minimal => packed.tier.as_str().yellow().bold(),
    };
    println!(
        "Stored {} config ({}) in {}",
        tier,
        format_size(packed.bytes, DECIMAL),
        target
    );
    if packed.tier == Tier::Minimal {
        println!("  {}", "Images were dropped to fit the hand-off buffer.".yellow());
    }
}

pub fn print_questions(kind: &SectionKind, fields: &[FieldDef]) {
    println!("\n=== {} ===", kind.as_str().bold());
    if fields.is_empty() {
        println!("(fixed format, no questions)");
        return;
    }
    for (i, f) in fields.iter().enumerate() {
        let kind = match f.kind {
            InputKind::Text => "text".cyan(),
            InputKind::Textarea => "textarea".cyan(),
            InputKind::Select => "select".magenta(),
        };
        let req = if f.required { " *".red().bold().to_string() } else { String::new() };
        println!("{}. {}{}  [{}] {}", i + 1, f.label.bold(), req, kind, f.id);
        if !f.helper.is_empty() {
            println!("   {}", f.helper.dimmed());
        }
        if !f.options.is_empty() {
            println!("   options: {}", f.options.join(" | "));
        }
    }
    println!();
}
