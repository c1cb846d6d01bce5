//! Common utilities and helper functions.

use std::{env, path::Path};

use anyhow::Context;
use serde_json::{Map, Value};

/// Replace `${workspaceFolder}` and `${env:VAR}` placeholders in `input`.
///
/// Unset environment variables expand to an empty string. Any other
/// `${...}` text, including an unterminated one, is kept as written.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use codeforge::utils::replace_placeholders;
///
/// let out = replace_placeholders("${workspaceFolder}/kv.json", Path::new("/ws"));
/// assert_eq!(out, "/ws/kv.json");
/// ```
pub fn replace_placeholders(input: &str, workspace: &Path) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        match name {
            "workspaceFolder" => out.push_str(&workspace.display().to_string()),
            _ if name.starts_with("env:") => {
                let var = &name[4..];
                match env::var(var) {
                    Ok(value) => {
                        debug!("Using {var}={value}");
                        out.push_str(&value);
                    }
                    Err(_) => debug!("environment variable `{var}` is not set"),
                }
            }
            _ => {
                out.push_str("${");
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Parse a JSON argument given on the command line.
pub fn parse_json_arg(name: &str, raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("`--{name}` is not valid JSON"))
}

/// Parse a JSON object argument, rejecting any other JSON value.
pub fn parse_object_arg(name: &str, raw: &str) -> anyhow::Result<Map<String, Value>> {
    match parse_json_arg(name, raw)? {
        Value::Object(map) => Ok(map),
        other => bail!("`--{name}` must be a JSON object, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws() -> &'static Path {
        Path::new("/work/space")
    }

    #[test]
    fn test_workspace_folder() {
        assert_eq!(
            replace_placeholders("${workspaceFolder}/.codeforge/kv.json", ws()),
            "/work/space/.codeforge/kv.json"
        );
        assert_eq!(replace_placeholders("no placeholders", ws()), "no placeholders");
        assert_eq!(replace_placeholders("", ws()), "");
    }

    #[test]
    fn test_env_vars() {
        unsafe {
            env::set_var("CODEFORGE_TEST_DIR", "/tmp/forge");
        }
        assert_eq!(
            replace_placeholders("${env:CODEFORGE_TEST_DIR}/kv.json", ws()),
            "/tmp/forge/kv.json"
        );
        assert_eq!(
            replace_placeholders("a${env:CODEFORGE_TEST_UNSET_VAR}b", ws()),
            "ab"
        );
        assert_eq!(
            replace_placeholders("${workspaceFolder}:${env:CODEFORGE_TEST_DIR}", ws()),
            "/work/space:/tmp/forge"
        );
    }

    #[test]
    fn test_unknown_and_malformed_kept() {
        assert_eq!(replace_placeholders("${other}", ws()), "${other}");
        assert_eq!(replace_placeholders("${env:VAR", ws()), "${env:VAR");
        assert_eq!(replace_placeholders("$", ws()), "$");
        assert_eq!(replace_placeholders("{env:X}", ws()), "{env:X}");
        assert_eq!(replace_placeholders("${workspaceFolder}}", ws()), "/work/space}");
    }

    #[test]
    fn test_json_args() {
        assert_eq!(parse_json_arg("payload", "[1]").unwrap(), serde_json::json!([1]));
        assert!(parse_json_arg("payload", "{").is_err());
        assert!(parse_object_arg("data", "[1]").is_err());
        assert_eq!(parse_object_arg("data", r#"{"a": 1}"#).unwrap()["a"], 1);
    }
}
