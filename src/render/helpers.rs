//! List helpers available to every template.
//!
//! ```text
//! {{join names ", "}}
//! {{#each (prefix lines "    ")}}...{{/each}}
//! {{join (surround names "'" "'") ", "}}
//! ```

use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value;

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

handlebars_helper!(join: |list: array, sep: str| {
    list.iter().map(text).collect::<Vec<_>>().join(sep)
});

handlebars_helper!(prefix: |list: array, pre: str| {
    list.iter()
        .map(|v| format!("{}{}", pre, text(v)))
        .collect::<Vec<_>>()
});

handlebars_helper!(postfix: |list: array, post: str| {
    list.iter()
        .map(|v| format!("{}{}", text(v), post))
        .collect::<Vec<_>>()
});

handlebars_helper!(surround: |list: array, pre: str, post: str| {
    list.iter()
        .map(|v| format!("{}{}{}", pre, text(v), post))
        .collect::<Vec<_>>()
});

pub fn register(registry: &mut Handlebars<'_>) {
    registry.register_helper("join", Box::new(join));
    registry.register_helper("prefix", Box::new(prefix));
    registry.register_helper("postfix", Box::new(postfix));
    registry.register_helper("surround", Box::new(surround));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(template: &str, data: Value) -> String {
        let mut hb = Handlebars::new();
        hb.register_escape_fn(handlebars::no_escape);
        hb.set_strict_mode(true);
        register(&mut hb);
        hb.render_template(template, &data).unwrap()
    }

    #[test]
    fn join_list() {
        assert_eq!(render("{{join xs \", \"}}", json!({"xs": ["a", "b"]})), "a, b");
        assert_eq!(render("{{join xs \"|\"}}", json!({"xs": [1, 2]})), "1|2");
    }

    #[test]
    fn nested_list_helpers() {
        let data = json!({"xs": ["a", "b"]});
        assert_eq!(render("{{join (surround xs \"'\" \"'\") \", \"}}", data.clone()), "'a', 'b'");
        assert_eq!(render("{{join (prefix xs \"_\") \" \"}}", data.clone()), "_a _b");
        assert_eq!(render("{{join (postfix xs \",\") \"\"}}", data), "a,b,");
    }

    #[test]
    fn each_over_helper_result() {
        let out = render(
            "{{#each (prefix xs \"    \")}}{{this}};{{/each}}",
            json!({"xs": ["x = 1", "y = 2"]}),
        );
        assert_eq!(out, "    x = 1;    y = 2;");
    }
}
