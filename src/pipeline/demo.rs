use serde_json::{json, Value};

use crate::wire::{GenerationRequest, SectionKind, Theme};

/// A model-shaped JSON response built only from the request, used when demo
/// mode is on. It goes through the same validator as real output.
pub fn draft_response(req: &GenerationRequest) -> String {
    let theme = Theme::from_occasion(&req.occasion);
    let pages: Vec<Value> = req
        .sections
        .iter()
        .enumerate()
        .map(|(order, kind)| {
            json!({
                "type": kind.as_str(),
                "order": order,
                "content": content_for(req, kind),
            })
        })
        .collect();

    json!({
        "theme": theme.as_str(),
        "colorPalette": theme.default_palette(),
        "pages": pages,
    })
    .to_string()
}

fn content_for(req: &GenerationRequest, kind: &SectionKind) -> Value {
    let mut content = req.content.get(kind).cloned().unwrap_or_default();
    match kind {
        SectionKind::Hero => {
            content
                .entry("title")
                .or_insert_with(|| json!(req.recipient_name));
        }
        SectionKind::Letter => {
            content
                .entry("to")
                .or_insert_with(|| json!(req.recipient_name));
        }
        _ => {}
    }
    Value::Object(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate;
    use crate::wire::InboundRequest;

    #[test]
    fn demo_output_validates() {
        let req = GenerationRequest::try_from(InboundRequest {
            recipient_name: Some("Ana".into()),
            occasion: Some("Best friend day".into()),
            selected_templates: vec!["hero".into(), "letter".into(), "quiz".into()],
            ..InboundRequest::default()
        })
        .unwrap();
        let cfg = validate::validate(&draft_response(&req)).unwrap();
        assert_eq!(cfg.theme, Theme::Friendship);
        assert_eq!(cfg.pages.len(), 3);
        assert_eq!(cfg.pages[0].content["title"], "Ana");
        assert_eq!(cfg.pages[1].content["to"], "Ana");
    }
}
