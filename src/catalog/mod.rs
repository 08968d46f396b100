//! Question sets for every section type that takes free-form input.
//!
//! The form layer renders these and the prompt builders read the same field
//! ids back out of the submitted content, so a field renamed here must be
//! renamed in `prompt` as well.

use serde::Serialize;

use crate::wire::SectionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Textarea,
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: InputKind,
    pub placeholder: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub helper: &'static str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub options: &'static [&'static str],
}

const fn text(id: &'static str, label: &'static str, placeholder: &'static str, required: bool) -> FieldDef {
    FieldDef { id, label, kind: InputKind::Text, placeholder, required, helper: "", options: &[] }
}

const fn textarea(
    id: &'static str,
    label: &'static str,
    placeholder: &'static str,
    required: bool,
    helper: &'static str,
) -> FieldDef {
    FieldDef { id, label, kind: InputKind::Textarea, placeholder, required, helper, options: &[] }
}

const fn select(id: &'static str, label: &'static str, options: &'static [&'static str]) -> FieldDef {
    FieldDef {
        id,
        label,
        kind: InputKind::Select,
        placeholder: "",
        required: false,
        helper: "",
        options,
    }
}

static TIMELINE: [FieldDef; 3] = [
    text("title", "Timeline title", "Our story so far", false),
    textarea(
        "events",
        "Moments to include",
        "2019 - We met at the bus stop\n2021 - Road trip to the coast",
        true,
        "One moment per line, starting with a date or year.",
    ),
    select("style", "How should it read?", &["chronological", "highlights"]),
];

static REASONS: [FieldDef; 3] = [
    text("heading", "Section heading", "Reasons I love you", false),
    textarea(
        "reasons",
        "Your reasons",
        "Your laugh\nThe way you make coffee",
        true,
        "One reason per line. Short is fine, we can expand them.",
    ),
    select("tone", "Tone", &["heartfelt", "playful", "funny"]),
];

static PLAYLIST: [FieldDef; 3] = [
    text("title", "Playlist name", "Songs that remind me of you", false),
    textarea(
        "songs",
        "Songs",
        "Here Comes the Sun - The Beatles",
        true,
        "One song per line as \"Title - Artist\".",
    ),
    textarea("dedication", "Dedication", "Every one of these is ours.", false, ""),
];

static QUIZ: [FieldDef; 3] = [
    text("title", "Quiz title", "How well do you know us?", false),
    textarea(
        "questions",
        "Questions",
        "Where was our first date? | The pier",
        true,
        "One question per line, with the answer after a \"|\".",
    ),
    select("difficulty", "Difficulty", &["easy", "medium", "hard"]),
];

static COUNTDOWN: [FieldDef; 3] = [
    text("eventName", "What are we counting down to?", "Our trip to Lisbon", true),
    text("targetDate", "Date", "2026-12-24", true),
    textarea("message", "Message to show", "Can't wait!", false, ""),
];

static WISHES: [FieldDef; 3] = [
    text("heading", "Section heading", "Wishes for your year", false),
    textarea("wishes", "Wishes", "More beach days\nA promotion", true, "One wish per line."),
    text("from", "Signed by", "Everyone at the office", false),
];

static COUPONS: [FieldDef; 3] = [
    text("heading", "Section heading", "Redeemable anytime", false),
    textarea(
        "coupons",
        "Coupons",
        "One breakfast in bed\nA movie night of your choice",
        true,
        "One coupon per line.",
    ),
    text("expiry", "Valid until", "Forever", false),
];

/// Ordered field definitions for a section. Structural sections (hero, letter,
/// gallery) and unknown kinds have none.
pub fn questions_for(kind: &SectionKind) -> &'static [FieldDef] {
    match kind {
        SectionKind::Timeline => &TIMELINE,
        SectionKind::Reasons => &REASONS,
        SectionKind::Playlist => &PLAYLIST,
        SectionKind::Quiz => &QUIZ,
        SectionKind::Countdown => &COUNTDOWN,
        SectionKind::Wishes => &WISHES,
        SectionKind::Coupons => &COUPONS,
        SectionKind::Hero | SectionKind::Letter | SectionKind::Gallery | SectionKind::Custom(_) => &[],
    }
}

pub fn required_fields(kind: &SectionKind) -> impl Iterator<Item = &'static FieldDef> {
    questions_for(kind).iter().filter(|f| f.required)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_and_unknown_sections_have_no_questions() {
        assert!(questions_for(&SectionKind::Hero).is_empty());
        assert!(questions_for(&SectionKind::Letter).is_empty());
        assert!(questions_for(&SectionKind::Gallery).is_empty());
        assert!(questions_for(&SectionKind::Custom("bucket-list".into())).is_empty());
    }

    #[test]
    fn every_free_form_section_has_a_required_field() {
        for kind in SectionKind::known().iter().filter(|k| !k.is_structural()) {
            assert!(required_fields(kind).count() >= 1, "{kind} has no required field");
        }
    }

    #[test]
    fn field_ids_are_unique_per_section() {
        for kind in SectionKind::known() {
            let ids: Vec<_> = questions_for(&kind).iter().map(|f| f.id).collect();
            let mut dedup = ids.clone();
            dedup.sort_unstable();
            dedup.dedup();
            assert_eq!(ids.len(), dedup.len(), "{kind} repeats a field id");
        }
    }

    #[test]
    fn only_selects_carry_options() {
        for kind in SectionKind::known() {
            for f in questions_for(&kind) {
                assert_eq!(f.kind == InputKind::Select, !f.options.is_empty(), "{}.{}", kind, f.id);
            }
        }
    }

    #[test]
    fn serializes_for_the_form_layer() {
        let v = serde_json::to_value(questions_for(&SectionKind::Quiz)).unwrap();
        assert_eq!(v[2]["kind"], "select");
        assert_eq!(v[2]["options"][1], "medium");
        assert!(v[0].get("options").is_none());
    }
}
