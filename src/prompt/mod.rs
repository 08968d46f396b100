use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::errors::GenerationError;
use crate::wire::{ContentMode, FieldView, GenerationRequest, SectionKind, Theme};

/// Everything a section builder may read while rendering its block.
pub struct SectionContext<'a> {
    pub request: &'a GenerationRequest,
    pub kind: &'a SectionKind,
    pub fields: FieldView<'a>,
    pub order: usize,
}

/// Renders the body of one section block. Builders only emit lines for fields
/// the user actually filled in.
pub trait SectionPromptBuilder: Send + Sync {
    fn build(&self, ctx: &SectionContext<'_>) -> String;
}

fn instruction(mode: ContentMode) -> &'static str {
    match mode {
        ContentMode::Verbatim => r#"CONTENT MODE: VERBATIM
- Use the user's text EXACTLY as given. Do not rephrase, correct, shorten or expand it.
- Only write new text for fields the user left empty, and keep it short.
- Copy names, dates and song titles character for character."#,
        ContentMode::Refine => r#"CONTENT MODE: REFINE
- Refine, polish and personalize the user's text. Keep every fact they gave you.
- Reference the relationship context so the copy sounds like it comes from them.
- Fill empty fields with warm, specific content that fits the occasion."#,
    }
}

fn header(req: &GenerationRequest) -> String {
    let mut out = String::from(
        "You are writing the content for a personalised celebration website.\n\n",
    );
    let _ = writeln!(out, "Recipient: {}", req.recipient_name);
    if !req.occasion.is_empty() {
        let _ = writeln!(out, "Occasion: {}", req.occasion);
    }
    if !req.relationship_context.is_empty() {
        let _ = writeln!(out, "Relationship: {}", req.relationship_context);
    }
    let ids: Vec<&str> = req.sections.iter().map(|k| k.as_str()).collect();
    let _ = writeln!(out, "Selected sections (in this order): {}", ids.join(", "));
    if let Some(notes) = &req.notes {
        let _ = writeln!(out, "Additional notes from the user: {}", notes);
    }
    out.push('\n');
    out.push_str(instruction(req.mode));
    out.push_str("\n\n");
    out
}

fn footer(now: DateTime<Utc>) -> String {
    let themes: Vec<String> = Theme::ALL.iter().map(|t| format!("\"{}\"", t.as_str())).collect();
    let kinds: Vec<String> = SectionKind::known()
        .iter()
        .map(|k| format!("\"{}\"", k.as_str()))
        .collect();
    format!(
        r##"Return EXACTLY ONE JSON object (no markdown, no prose, no code fences) shaped like:

{{
  "theme": {themes},
  "metadata": {{
    "title": string,
    "description": string,
    "recipientName": string,
    "occasion": string,
    "createdAt": "{now}"
  }},
  "colorPalette": {{
    "primary": "#RRGGBB",
    "secondary": "#RRGGBB",
    "accent": "#RRGGBB",
    "background": "#RRGGBB",
    "text": "#RRGGBB"
  }},
  "pages": [
    {{ "type": {kinds}, "order": number, "content": {{ ... }} }}
  ]
}}

Rules:
- Emit one page per section above, using the same order numbers.
- Do not include images or image URLs; they are attached separately.
"##,
        themes = themes.join(" | "),
        kinds = kinds.join(" | "),
        now = now.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

fn block(order: usize, kind: &SectionKind, body: &str) -> String {
    let label = kind.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = format!("=== SECTION {}: {} (order: {}) ===\n", order + 1, label, order);
    out.push_str(defuse_markers(body).trim_end());
    out.push_str("\n\n");
    out
}

/// Strips the leading `=` run from any line that could pass for a block
/// header, so user text never opens a section of its own.
fn defuse_markers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let lead = line.trim_start();
        if lead.starts_with("===") {
            out.push_str(lead.trim_start_matches('=').trim_start());
        } else {
            out.push_str(line);
        }
    }
    out
}

fn push_opt(out: &mut String, label: &str, value: Option<String>) {
    if let Some(v) = value {
        let _ = writeln!(out, "{label}: {v}");
    }
}

fn push_list(out: &mut String, label: &str, items: &[String], when_empty: &str) {
    if items.is_empty() {
        let _ = writeln!(out, "{label}: none provided, {when_empty}");
        return;
    }
    let _ = writeln!(out, "{label}:");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}

fn shape(out: &mut String, kind: &SectionKind, order: usize, content: &str) {
    let _ = writeln!(
        out,
        "Output: a page with \"type\": \"{kind}\", \"order\": {order}, \"content\": {content}"
    );
}

// ---- structural sections: fixed formats, never registered ----

struct HeroBlock;

impl SectionPromptBuilder for HeroBlock {
    fn build(&self, ctx: &SectionContext<'_>) -> String {
        let title = ctx.fields.text("title").unwrap_or_else(|| ctx.request.recipient_name.clone());
        let subtitle = ctx.fields.text("subtitle").unwrap_or_default();
        let mut out = String::from("Opening banner of the site.\n");
        let _ = writeln!(out, "title: {title}");
        let _ = writeln!(out, "subtitle: {subtitle}");
        shape(&mut out, ctx.kind, ctx.order, r#"{ "title": string, "subtitle": string }"#);
        out
    }
}

struct LetterBlock;

impl SectionPromptBuilder for LetterBlock {
    fn build(&self, ctx: &SectionContext<'_>) -> String {
        let to = ctx.fields.text("to").unwrap_or_else(|| ctx.request.recipient_name.clone());
        let body = ctx.fields.text("body").unwrap_or_default();
        let signature = ctx.fields.text("signature").unwrap_or_default();
        let mut out = String::from("A personal letter to the recipient.\n");
        let _ = writeln!(out, "to: {to}");
        let _ = writeln!(out, "body: {body}");
        let _ = writeln!(out, "signature: {signature}");
        shape(
            &mut out,
            ctx.kind,
            ctx.order,
            r#"{ "to": string, "body": string, "signature": string }"#,
        );
        out
    }
}

struct GalleryBlock;

impl SectionPromptBuilder for GalleryBlock {
    fn build(&self, ctx: &SectionContext<'_>) -> String {
        let title = ctx.fields.text("title").unwrap_or_default();
        let description = ctx.fields.text("description").unwrap_or_default();
        let mut out = String::from("A photo gallery.\n");
        let _ = writeln!(out, "title: {title}");
        let _ = writeln!(out, "description: {description}");
        let _ = writeln!(out, "photos attached: {}", ctx.request.images.len());
        let captions: Vec<&str> = ctx
            .request
            .images
            .iter()
            .filter_map(|i| i.caption.as_deref())
            .filter(|c| !c.trim().is_empty())
            .collect();
        if !captions.is_empty() {
            let _ = writeln!(out, "captions: {}", captions.join(" / "));
        }
        shape(&mut out, ctx.kind, ctx.order, r#"{ "title": string, "description": string }"#);
        out
    }
}

// ---- registered builders ----

struct TimelineBuilder;

impl SectionPromptBuilder for TimelineBuilder {
    fn build(&self, ctx: &SectionContext<'_>) -> String {
        let mut out = String::from("A timeline of shared moments.\n");
        push_opt(&mut out, "Title", ctx.fields.text("title"));
        push_list(&mut out, "Moments", &ctx.fields.list("events"), "write 4 plausible milestones");
        push_opt(&mut out, "Style", ctx.fields.text("style"));
        shape(
            &mut out,
            ctx.kind,
            ctx.order,
            r#"{ "title": string, "events": [{ "date": string, "title": string, "description": string }] }"#,
        );
        out
    }
}

struct ReasonsBuilder;

impl SectionPromptBuilder for ReasonsBuilder {
    fn build(&self, ctx: &SectionContext<'_>) -> String {
        let mut out = String::from("A list of reasons the sender cherishes the recipient.\n");
        push_opt(&mut out, "Heading", ctx.fields.text("heading"));
        push_list(&mut out, "Reasons", &ctx.fields.list("reasons"), "write 5 sincere ones");
        push_opt(&mut out, "Tone", ctx.fields.text("tone"));
        shape(&mut out, ctx.kind, ctx.order, r#"{ "heading": string, "reasons": [string] }"#);
        out
    }
}

struct PlaylistBuilder;

impl SectionPromptBuilder for PlaylistBuilder {
    fn build(&self, ctx: &SectionContext<'_>) -> String {
        let mut out = String::from("A playlist of meaningful songs.\n");
        push_opt(&mut out, "Playlist name", ctx.fields.text("title"));
        push_list(&mut out, "Songs", &ctx.fields.list("songs"), "suggest 5 fitting songs");
        push_opt(&mut out, "Dedication", ctx.fields.text("dedication"));
        shape(
            &mut out,
            ctx.kind,
            ctx.order,
            r#"{ "title": string, "songs": [{ "title": string, "artist": string, "note": string }], "dedication": string }"#,
        );
        out
    }
}

struct QuizBuilder;

impl SectionPromptBuilder for QuizBuilder {
    fn build(&self, ctx: &SectionContext<'_>) -> String {
        let mut out = String::from("A light-hearted quiz about the recipient and the sender.\n");
        push_opt(&mut out, "Quiz title", ctx.fields.text("title"));
        let questions = ctx.fields.list("questions");
        if questions.is_empty() {
            out.push_str("Questions: none provided, write 4 with one correct answer each\n");
        } else {
            out.push_str("Questions:\n");
            for q in &questions {
                match q.split_once('|') {
                    Some((question, answer)) => {
                        let _ = writeln!(out, "- {} (answer: {})", question.trim(), answer.trim());
                    }
                    None => {
                        let _ = writeln!(out, "- {q}");
                    }
                }
            }
        }
        push_opt(&mut out, "Difficulty", ctx.fields.text("difficulty"));
        shape(
            &mut out,
            ctx.kind,
            ctx.order,
            r#"{ "title": string, "questions": [{ "question": string, "options": [string], "answer": string }] }"#,
        );
        out
    }
}

struct CountdownBuilder;

impl SectionPromptBuilder for CountdownBuilder {
    fn build(&self, ctx: &SectionContext<'_>) -> String {
        let mut out = String::from("A countdown to an upcoming event.\n");
        push_opt(&mut out, "Event", ctx.fields.text("eventName"));
        push_opt(&mut out, "Date", ctx.fields.text("targetDate"));
        push_opt(&mut out, "Message", ctx.fields.text("message"));
        shape(
            &mut out,
            ctx.kind,
            ctx.order,
            r#"{ "eventName": string, "targetDate": "YYYY-MM-DD", "message": string }"#,
        );
        out
    }
}

struct WishesBuilder;

impl SectionPromptBuilder for WishesBuilder {
    fn build(&self, ctx: &SectionContext<'_>) -> String {
        let mut out = String::from("Wishes for the recipient.\n");
        push_opt(&mut out, "Heading", ctx.fields.text("heading"));
        push_list(&mut out, "Wishes", &ctx.fields.list("wishes"), "write 4 warm ones");
        push_opt(&mut out, "Signed by", ctx.fields.text("from"));
        shape(
            &mut out,
            ctx.kind,
            ctx.order,
            r#"{ "heading": string, "wishes": [string], "from": string }"#,
        );
        out
    }
}

/// Fallback for sections without a registered builder: dumps the raw field map.
pub struct GenericBuilder;

impl SectionPromptBuilder for GenericBuilder {
    fn build(&self, ctx: &SectionContext<'_>) -> String {
        let mut out = format!("Section type: {}\n", ctx.kind);
        match ctx.fields.0.filter(|m| !m.is_empty()) {
            None => out.push_str("Provided fields: none\n"),
            Some(map) => {
                out.push_str("Provided fields:\n");
                for (key, value) in map {
                    let rendered = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let _ = writeln!(out, "- {key}: {rendered}");
                }
            }
        }
        shape(&mut out, ctx.kind, ctx.order, "{ ...fields above, as JSON... }");
        out
    }
}

/// Builds the single text prompt sent to the model.
pub struct PromptComposer {
    builders: HashMap<SectionKind, Box<dyn SectionPromptBuilder>>,
    fallback: GenericBuilder,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::standard()
    }
}

impl PromptComposer {
    /// A composer with no registered builders; every non-structural section
    /// goes through the generic fallback.
    pub fn empty() -> Self {
        Self { builders: HashMap::new(), fallback: GenericBuilder }
    }

    pub fn standard() -> Self {
        let mut c = Self::empty();
        c.register(SectionKind::Timeline, TimelineBuilder);
        c.register(SectionKind::Reasons, ReasonsBuilder);
        c.register(SectionKind::Playlist, PlaylistBuilder);
        c.register(SectionKind::Quiz, QuizBuilder);
        c.register(SectionKind::Countdown, CountdownBuilder);
        c.register(SectionKind::Wishes, WishesBuilder);
        c
    }

    pub fn register(&mut self, kind: SectionKind, builder: impl SectionPromptBuilder + 'static) {
        self.builders.insert(kind, Box::new(builder));
    }

    pub fn has_builder(&self, kind: &SectionKind) -> bool {
        self.builders.contains_key(kind)
    }

    pub fn compose(&self, req: &GenerationRequest) -> Result<String, GenerationError> {
        self.compose_at(req, Utc::now())
    }

    pub fn compose_at(
        &self,
        req: &GenerationRequest,
        now: DateTime<Utc>,
    ) -> Result<String, GenerationError> {
        if req.recipient_name.trim().is_empty() || req.sections.is_empty() {
            return Err(GenerationError::missing_fields());
        }

        let mut prompt = defuse_markers(&header(req));
        for (order, kind) in req.sections.iter().enumerate() {
            let ctx = SectionContext { request: req, kind, fields: req.fields(kind), order };
            let body = match kind {
                SectionKind::Hero => HeroBlock.build(&ctx),
                SectionKind::Letter => LetterBlock.build(&ctx),
                SectionKind::Gallery => GalleryBlock.build(&ctx),
                _ => match self.builders.get(kind) {
                    Some(builder) => builder.build(&ctx),
                    None => self.fallback.build(&ctx),
                },
            };
            prompt.push_str(&block(order, kind, &body));
        }
        prompt.push_str(&footer(now));
        Ok(prompt)
    }
}
