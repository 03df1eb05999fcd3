use std::collections::HashMap;

/// Replaces every `{{key}}` token in `template` with the matching value
/// from `values`.
///
/// Substitution happens in a single pass over the original template, so a
/// substituted value is never re-scanned for placeholders and the order of
/// keys in `values` cannot change the result. Tokens whose key has no
/// entry in `values` are left in the output verbatim.
pub fn fill_template(template: &str, values: &HashMap<String, String>) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let key = &after_open[..end];
                match values.get(key) {
                    Some(value) => output.push_str(value),
                    None => {
                        output.push_str("{{");
                        output.push_str(key);
                        output.push_str("}}");
                    }
                }
                rest = &after_open[end + 2..];
            }
            None => {
                // Unterminated token, keep the tail as-is.
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    output.push_str(rest);
    output
}
