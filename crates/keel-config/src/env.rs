use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Matches `{{ env.VAR }}` and `{{ env.VAR | default("fallback") }}`
///
/// Group 1 is the scoped key, group 2 the optional default
fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([a-zA-Z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#).expect("must be valid regex")
    })
}

/// Expand `{{ env.VAR }}` placeholders in a raw TOML document
///
/// Runs on the text before deserialization so config structs hold plain
/// values. Comment lines are left untouched, which lets example configs
/// reference variables that are not set.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut lines = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_owned());
        } else {
            lines.push(expand_line(line)?);
        }
    }

    let mut output = lines.join("\n");
    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

fn expand_line(line: &str) -> Result<String, String> {
    let mut expanded = String::with_capacity(line.len());
    let mut cursor = 0;

    for captures in placeholder().captures_iter(line) {
        let Some(whole) = captures.get(0) else {
            continue;
        };

        expanded.push_str(&line[cursor..whole.start()]);
        expanded.push_str(&lookup(&captures)?);
        cursor = whole.end();
    }

    expanded.push_str(&line[cursor..]);
    Ok(expanded)
}

fn lookup(captures: &Captures<'_>) -> Result<String, String> {
    let key = captures.get(1).map_or("", |m| m.as_str());
    let default = captures.get(2).map(|m| m.as_str().to_owned());

    let Some(var_name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
        return Err(format!("only variables scoped with 'env.' are supported: `{key}`"));
    };

    std::env::var(var_name)
        .ok()
        .or(default)
        .ok_or_else(|| format!("environment variable not found: `{var_name}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let input = "default_model = \"anthropic.claude-3-haiku\"\n";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn substitutes_set_variable() {
        temp_env::with_var("KEEL_TEST_REGION", Some("eu-west-1"), || {
            let result = expand_env("region = \"{{ env.KEEL_TEST_REGION }}\"").unwrap();
            assert_eq!(result, "region = \"eu-west-1\"");
        });
    }

    #[test]
    fn substitutes_several_variables_on_one_line() {
        let vars = [("KEEL_TEST_A", Some("a")), ("KEEL_TEST_B", Some("b"))];
        temp_env::with_vars(vars, || {
            let result = expand_env("pair = \"{{ env.KEEL_TEST_A }}-{{ env.KEEL_TEST_B }}\"").unwrap();
            assert_eq!(result, "pair = \"a-b\"");
        });
    }

    #[test]
    fn missing_variable_is_an_error() {
        temp_env::with_var_unset("KEEL_TEST_MISSING", || {
            let err = expand_env("key = \"{{ env.KEEL_TEST_MISSING }}\"").unwrap_err();
            assert!(err.contains("KEEL_TEST_MISSING"));
        });
    }

    #[test]
    fn default_applies_only_when_unset() {
        temp_env::with_var_unset("KEEL_TEST_OPTIONAL", || {
            let result = expand_env("flag = {{ env.KEEL_TEST_OPTIONAL | default(\"false\") }}").unwrap();
            assert_eq!(result, "flag = false");
        });

        temp_env::with_var("KEEL_TEST_OPTIONAL", Some("true"), || {
            let result = expand_env("flag = {{ env.KEEL_TEST_OPTIONAL | default(\"false\") }}").unwrap();
            assert_eq!(result, "flag = true");
        });
    }

    #[test]
    fn unscoped_key_is_rejected() {
        let err = expand_env("key = \"{{ vault.TOKEN }}\"").unwrap_err();
        assert!(err.contains("only variables scoped with 'env.'"));
    }

    #[test]
    fn comment_lines_are_not_expanded() {
        temp_env::with_var_unset("KEEL_TEST_MISSING", || {
            let input = "  # api_key = \"{{ env.KEEL_TEST_MISSING }}\"\nport = 1";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }
}
