use chrono::{DateTime, Utc};

use crate::wire::{ColorPalette, ColorScheme, GenerationRequest, Metadata, SiteConfig};

/// Text colour paired with a user-picked colour scheme.
pub const OVERRIDE_TEXT_COLOR: &str = "#333333";

pub fn palette_from_scheme(scheme: &ColorScheme) -> ColorPalette {
    ColorPalette {
        primary: scheme.primary.clone(),
        secondary: scheme.secondary.clone(),
        accent: scheme.accent.clone(),
        background: scheme.background.clone(),
        text: OVERRIDE_TEXT_COLOR.to_string(),
    }
}

/// Overlays client-owned data onto a validated model config.
///
/// - images always come from the request
/// - an explicit colour scheme replaces the whole palette
/// - metadata is only filled where the model left a field empty
///
/// Applying it twice with the same request yields the same config.
pub fn merge(config: SiteConfig, req: &GenerationRequest) -> SiteConfig {
    merge_at(config, req, Utc::now())
}

pub fn merge_at(mut config: SiteConfig, req: &GenerationRequest, now: DateTime<Utc>) -> SiteConfig {
    config.images = req.images.clone();

    if let Some(scheme) = &req.color_override {
        config.color_palette = palette_from_scheme(scheme);
    }

    fill_metadata(&mut config.metadata, req, now);
    config
}

fn occasion_label(req: &GenerationRequest) -> Option<&str> {
    Some(req.occasion.as_str()).filter(|o| !o.is_empty())
}

fn fill_metadata(meta: &mut Metadata, req: &GenerationRequest, now: DateTime<Utc>) {
    let occasion = occasion_label(req);
    meta.title.get_or_insert_with(|| match occasion {
        Some(o) => format!("{o} for {}", req.recipient_name),
        None => format!("For {}", req.recipient_name),
    });
    meta.description.get_or_insert_with(|| match occasion {
        Some(o) => format!("A {o} surprise made especially for {}", req.recipient_name),
        None => format!("A surprise made especially for {}", req.recipient_name),
    });
    meta.occasion
        .get_or_insert_with(|| occasion.unwrap_or("Celebration").to_string());
    meta.created_at.get_or_insert(now);
    meta.recipient_name.get_or_insert_with(|| req.recipient_name.clone());
}
