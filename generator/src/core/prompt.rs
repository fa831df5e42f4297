//! Prompt rendering for variant generation and engagement judgment

use shared::VariantKind;

/// Inputs a variant prompt is rendered from
#[derive(Debug, Clone, Default)]
pub struct PromptContext<'a> {
    pub topic: &'a str,
    pub domains: &'a [String],
    pub frameworks: &'a [String],
    /// Excerpt of the best ranked source snippet, if any
    pub evidence: Option<&'a str>,
}

struct VariantStyle {
    style: &'static str,
    focus: &'static str,
    tone: &'static str,
    include: &'static [&'static str],
}

fn style_for(variant: VariantKind) -> VariantStyle {
    match variant {
        VariantKind::Analytical => VariantStyle {
            style: "Analytical, structured, framework-driven",
            focus: "Layered breakdown of the problem",
            tone: "Thoughtful, precise",
            include: &["A named framework", "A numbered breakdown", "A closing question"],
        },
        VariantKind::Engaging => VariantStyle {
            style: "Personal, story-driven, conversational",
            focus: "A lesson learned from real experience",
            tone: "Warm, curious",
            include: &["A short personal story", "One surprising realization", "A closing question"],
        },
        VariantKind::Contrarian => VariantStyle {
            style: "Contrarian, provocative, well-argued",
            focus: "What conventional wisdom gets wrong",
            tone: "Confident, respectful",
            include: &["The popular view", "The different perspective", "An invitation to disagree"],
        },
        VariantKind::DataDriven => VariantStyle {
            style: "Data-focused, evidence-based, analytical",
            focus: "Statistics, trends, quantified insights",
            tone: "Authoritative, fact-based",
            include: &["Specific data points", "Trend analysis", "Evidence-backed conclusions"],
        },
    }
}

/// Render the generation prompt for one variant
pub fn variant_prompt(variant: VariantKind, context: &PromptContext<'_>) -> String {
    let style = style_for(variant);
    let mut prompt = format!(
        "Create a {} LinkedIn post about \"{}\".\n\nStyle: {}\nFocus: {}\nTone: {}\n\nInclude:\n",
        variant.as_str().replace('_', "-"),
        context.topic,
        style.style,
        style.focus,
        style.tone
    );
    for item in style.include {
        prompt.push_str("- ");
        prompt.push_str(item);
        prompt.push('\n');
    }
    if !context.domains.is_empty() {
        prompt.push_str(&format!("\nDraw on experience across: {}\n", context.domains.join(", ")));
    }
    if let Some(framework) = context.frameworks.first() {
        prompt.push_str(&format!("Apply the framework: {framework}\n"));
    }
    if let Some(evidence) = context.evidence {
        prompt.push_str(&format!("Ground the post in this evidence: {evidence}\n"));
    }
    prompt.push_str("\nKeep it between 200 and 300 characters with 3 to 5 professional hashtags.");
    prompt
}

/// Render the engagement judgment prompt
pub fn judgment_prompt(content: &str, variant: VariantKind) -> String {
    format!(
        "Predict the LinkedIn engagement potential for this content.\n\n\
         Content: \"{content}\"\n\
         Variant Type: {variant}\n\n\
         Consider professional relevance, thought leadership value, engagement triggers \
         and viral potential.\n\n\
         Return only a number between 0.0 and 1.0 representing engagement potential."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_prompt_mentions_topic_and_style() {
        let domains = vec!["fintech".to_string(), "policy".to_string()];
        let context = PromptContext {
            topic: "open banking",
            domains: &domains,
            ..Default::default()
        };

        let prompt = variant_prompt(VariantKind::DataDriven, &context);
        assert!(prompt.contains("\"open banking\""));
        assert!(prompt.contains("data-driven"));
        assert!(prompt.contains("fintech, policy"));
        assert!(!prompt.contains("Apply the framework"));
    }

    #[test]
    fn test_judgment_prompt_includes_variant() {
        let prompt = judgment_prompt("Some post", VariantKind::Contrarian);
        assert!(prompt.contains("Variant Type: contrarian"));
        assert!(prompt.contains("\"Some post\""));
    }
}
