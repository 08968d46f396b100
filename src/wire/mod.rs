use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::GenerationError;
use crate::validate::is_hex_color;

/// ========================================
/// Section and theme discriminants
/// ========================================

/// Field values entered for one section, keyed by field id.
pub type FieldValues = Map<String, Value>;

/// The string discriminant naming a section's type. Known kinds get their own
/// variant; anything else is carried through as `Custom` so new section types
/// never fail deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SectionKind {
    Hero,
    Letter,
    Gallery,
    Timeline,
    Reasons,
    Playlist,
    Quiz,
    Countdown,
    Wishes,
    Coupons,
    Custom(String),
}

impl SectionKind {
    pub fn known() -> [SectionKind; 10] {
        [
            SectionKind::Hero,
            SectionKind::Letter,
            SectionKind::Gallery,
            SectionKind::Timeline,
            SectionKind::Reasons,
            SectionKind::Playlist,
            SectionKind::Quiz,
            SectionKind::Countdown,
            SectionKind::Wishes,
            SectionKind::Coupons,
        ]
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hero" => SectionKind::Hero,
            "letter" => SectionKind::Letter,
            "gallery" => SectionKind::Gallery,
            "timeline" => SectionKind::Timeline,
            "reasons" => SectionKind::Reasons,
            "playlist" => SectionKind::Playlist,
            "quiz" => SectionKind::Quiz,
            "countdown" => SectionKind::Countdown,
            "wishes" => SectionKind::Wishes,
            "coupons" => SectionKind::Coupons,
            _ => SectionKind::Custom(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SectionKind::Hero => "hero",
            SectionKind::Letter => "letter",
            SectionKind::Gallery => "gallery",
            SectionKind::Timeline => "timeline",
            SectionKind::Reasons => "reasons",
            SectionKind::Playlist => "playlist",
            SectionKind::Quiz => "quiz",
            SectionKind::Countdown => "countdown",
            SectionKind::Wishes => "wishes",
            SectionKind::Coupons => "coupons",
            SectionKind::Custom(id) => id,
        }
    }

    /// Hero, letter and gallery have fixed formats and no question set.
    pub fn is_structural(&self) -> bool {
        matches!(self, SectionKind::Hero | SectionKind::Letter | SectionKind::Gallery)
    }

    /// Whether the rendering layer has a component for this kind.
    pub fn is_renderable(&self) -> bool {
        !matches!(self, SectionKind::Custom(_))
    }
}

impl From<String> for SectionKind {
    fn from(raw: String) -> Self {
        SectionKind::parse(&raw)
    }
}

impl From<SectionKind> for String {
    fn from(kind: SectionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Theme {
    Birthday,
    Anniversary,
    Friendship,
    Newborn,
    General,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::Birthday,
        Theme::Anniversary,
        Theme::Friendship,
        Theme::Newborn,
        Theme::General,
    ];

    /// Unrecognized theme names collapse to `General`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "birthday" => Theme::Birthday,
            "anniversary" => Theme::Anniversary,
            "friendship" => Theme::Friendship,
            "newborn" => Theme::Newborn,
            _ => Theme::General,
        }
    }

    /// Best guess from a free-text occasion such as "Mom's 60th Birthday".
    pub fn from_occasion(occasion: &str) -> Self {
        let o = occasion.to_lowercase();
        if o.contains("birthday") || o.contains("bday") {
            Theme::Birthday
        } else if o.contains("anniversary") || o.contains("valentine") || o.contains("wedding") {
            Theme::Anniversary
        } else if o.contains("friend") {
            Theme::Friendship
        } else if o.contains("baby") || o.contains("newborn") || o.contains("birth") {
            Theme::Newborn
        } else {
            Theme::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Birthday => "birthday",
            Theme::Anniversary => "anniversary",
            Theme::Friendship => "friendship",
            Theme::Newborn => "newborn",
            Theme::General => "general",
        }
    }

    pub fn default_palette(&self) -> ColorPalette {
        let (primary, secondary, accent, background, text) = match self {
            Theme::Birthday => ("#FF6B9D", "#FFC75F", "#845EC2", "#FFF8F0", "#2D2A32"),
            Theme::Anniversary => ("#C9184A", "#FF8FA3", "#FFD6A5", "#FFF0F3", "#3A0CA3"),
            Theme::Friendship => ("#00B4D8", "#90E0EF", "#FFB703", "#F1FAFF", "#023047"),
            Theme::Newborn => ("#A2D2FF", "#FFAFCC", "#CDB4DB", "#FDFCFF", "#33415C"),
            Theme::General => ("#6C63FF", "#A5A1FF", "#FF6584", "#FAFAFF", "#2F2E41"),
        };
        ColorPalette {
            primary: primary.into(),
            secondary: secondary.into(),
            accent: accent.into(),
            background: background.into(),
            text: text.into(),
        }
    }
}

impl From<String> for Theme {
    fn from(raw: String) -> Self {
        Theme::parse(&raw)
    }
}

impl From<Theme> for String {
    fn from(theme: Theme) -> Self {
        theme.as_str().to_string()
    }
}

/// ========================================
/// Site configuration
/// ========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
}

/// A user-picked colour set. The text colour is not part of the choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVariants {
    pub thumbnail: String,
    pub medium: String,
    pub full: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub urls: ImageVariants,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occasion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(rename = "type")]
    pub kind: SectionKind,
    pub order: i64,
    #[serde(default)]
    pub content: FieldValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub theme: Theme,
    pub metadata: Metadata,
    pub color_palette: ColorPalette,
    pub pages: Vec<PageConfig>,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// ========================================
/// Inbound request / outbound response
/// ========================================

/// The JSON body posted by the wizard. Everything is optional on the wire;
/// `GenerationRequest::try_from` decides what is actually required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRequest {
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub relationship_context: Option<String>,
    #[serde(default)]
    pub original_prompt: Option<String>,
    #[serde(default)]
    pub selected_templates: Vec<String>,
    #[serde(default)]
    pub template_content: Map<String, Value>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub color_scheme: Option<ColorScheme>,
    #[serde(default, rename = "refineWithAI")]
    pub refine_with_ai: bool,
}

/// Whether the model should keep user text as written or polish it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    Verbatim,
    Refine,
}

impl From<bool> for ContentMode {
    fn from(refine: bool) -> Self {
        if refine { ContentMode::Refine } else { ContentMode::Verbatim }
    }
}

/// One validated user submission.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub recipient_name: String,
    pub occasion: String,
    pub relationship_context: String,
    pub notes: Option<String>,
    pub sections: Vec<SectionKind>,
    pub content: BTreeMap<SectionKind, FieldValues>,
    pub images: Vec<Image>,
    pub color_override: Option<ColorScheme>,
    pub mode: ContentMode,
}

impl GenerationRequest {
    pub fn fields(&self, kind: &SectionKind) -> FieldView<'_> {
        FieldView(self.content.get(kind))
    }
}

impl TryFrom<InboundRequest> for GenerationRequest {
    type Error = GenerationError;

    fn try_from(body: InboundRequest) -> Result<Self, Self::Error> {
        let recipient_name = body
            .recipient_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(GenerationError::missing_fields)?;

        let mut sections: Vec<SectionKind> = Vec::with_capacity(body.selected_templates.len());
        for raw in &body.selected_templates {
            if raw.trim().is_empty() {
                continue;
            }
            let kind = SectionKind::parse(raw);
            if !sections.contains(&kind) {
                sections.push(kind);
            }
        }
        if sections.is_empty() {
            return Err(GenerationError::missing_fields());
        }

        if let Some(scheme) = &body.color_scheme {
            let colors = [&scheme.primary, &scheme.secondary, &scheme.accent, &scheme.background];
            if !colors.iter().all(|c| is_hex_color(c)) {
                return Err(GenerationError::Validation("Invalid color scheme".into()));
            }
        }

        let mut content = BTreeMap::new();
        for (id, value) in body.template_content {
            let fields = match value {
                Value::Object(map) => map,
                _ => FieldValues::new(),
            };
            match content.entry(SectionKind::parse(&id)) {
                Entry::Vacant(slot) => {
                    slot.insert(fields);
                }
                Entry::Occupied(slot) => {
                    tracing::warn!(section = %slot.key(), key = %id, "ignoring duplicate section content");
                }
            }
        }

        Ok(GenerationRequest {
            recipient_name,
            occasion: body.occasion.unwrap_or_default().trim().to_string(),
            relationship_context: body.relationship_context.unwrap_or_default().trim().to_string(),
            notes: body.original_prompt.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            sections,
            content,
            images: body.images,
            color_override: body.color_scheme,
            mode: ContentMode::from(body.refine_with_ai),
        })
    }
}

/// Read-only accessor over a section's field map that hides absent and blank
/// values.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a>(pub Option<&'a FieldValues>);

impl<'a> FieldView<'a> {
    /// A field as display text; `None` when absent, null or blank.
    pub fn text(&self, key: &str) -> Option<String> {
        let value = self.0?.get(key)?;
        let s = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(items) => join_items(items),
            Value::Null | Value::Object(_) => return None,
        };
        if s.is_empty() { None } else { Some(s) }
    }

    /// A field as a list: array items, or one entry per non-blank line.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.0.and_then(|m| m.get(key)) {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(Value::String(s)) => s
                .lines()
                .map(|l| l.trim().trim_start_matches(['-', '*', '•']).trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.map(|m| m.is_empty()).unwrap_or(true)
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.is_empty() { None } else { Some(s) }
}

fn join_items(items: &[Value]) -> String {
    items.iter().filter_map(scalar_text).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<SiteConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo: Option<bool>,
}

impl ApiResponse {
    pub fn ok(config: SiteConfig, demo: bool) -> Self {
        Self {
            success: true,
            config: Some(config),
            demo: demo.then_some(true),
            ..Self::default()
        }
    }

    pub fn failure(err: &GenerationError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            retryable: Some(err.retryable()),
            ..Self::default()
        }
    }
}
