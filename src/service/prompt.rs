use crate::types::design::Section;

/// Text prompt for a street cross-section illustration, sections listed
/// left to right.
pub fn build_prompt(units: &str, sections: &[Section], style: &str) -> String {
    let sections_text = sections
        .iter()
        .map(|s| describe_section(units, s))
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "2D cross section of an urban street design, styled according to the provided '{style}' reference image. \
         Left to right: {sections_text}. \
         Show clear section divisions with thick ground plane lines/textures reflecting ground material for each section. \
         Include realistic objects and textures from the style reference: cars, people, bikes, trees, landscaping. \
         Underline each section with a label showing its width and use. \
         Produce crisp, detailed professional illustration, composition focused on a horizontal street cross-section."
    )
}

fn describe_section(units: &str, section: &Section) -> String {
    let mut desc = format!(
        "{} section, {} {} wide, ground material: {}, use: {}",
        section.name, section.width, units, section.material, section.usage
    );
    if let Some(comments) = section.comments.as_deref().map(str::trim)
        && !comments.is_empty()
    {
        desc.push_str(", details: ");
        desc.push_str(comments);
    }
    desc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str, width: f64, comments: Option<&str>) -> Section {
        Section {
            name: name.to_string(),
            width,
            material: "asphalt".to_string(),
            usage: "travel".to_string(),
            comments: comments.map(str::to_string),
        }
    }

    #[test]
    fn sections_render_in_order() {
        let prompt = build_prompt(
            "ft",
            &[section("Lane", 11.0, None), section("Sidewalk", 6.5, Some("street trees"))],
            "watercolor",
        );
        assert!(prompt.contains("'watercolor' reference image"));
        assert!(prompt.contains(
            "Left to right: Lane section, 11 ft wide, ground material: asphalt, use: travel; \
             Sidewalk section, 6.5 ft wide, ground material: asphalt, use: travel, details: street trees."
        ));
    }

    #[test]
    fn blank_comments_are_omitted() {
        let prompt = build_prompt("m", &[section("Median", 2.0, Some("  "))], "sketch");
        assert!(!prompt.contains("details"));
    }
}
