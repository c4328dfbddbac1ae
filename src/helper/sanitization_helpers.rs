use ammonia::Builder;
use std::collections::HashSet;

/// Cleans owner supplied rich text (letter body, secret message) for direct
/// insertion into the public page. Formatting tags survive; scripts, event
/// handlers and unknown tags do not.
pub fn sanitize_rich_text(input: &str) -> String {
    let tags_to_allow = [
        "p", "br", "b", "strong", "i", "em", "u", "s", "span", "a", "ul", "ol", "li", "blockquote", "h3", "h4",
    ];
    let safe_tags = tags_to_allow.iter().cloned().collect::<HashSet<_>>();
    let generic_attributes = ["class", "title"].iter().cloned().collect::<HashSet<_>>();

    Builder::new()
        .tags(safe_tags)
        .generic_attributes(generic_attributes)
        .link_rel(Some("nofollow noopener"))
        .clean(input)
        .to_string()
}

/// Turns plain text line breaks into `<br>` after sanitizing, so a letter
/// typed into a textarea keeps its shape.
pub fn sanitize_letter(input: &str) -> String {
    let with_breaks = if input.contains('<') { input.to_string() } else { input.replace('\n', "<br>") };
    sanitize_rich_text(&with_breaks)
}
