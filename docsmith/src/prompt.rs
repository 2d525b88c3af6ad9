//! Prompt construction.
//!
//! `build` is deterministic: identical contexts give identical prompts and
//! nothing is carried between calls.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::constants::SLOT;
use crate::context::Context;
use crate::cst::{ParamKind, Parameter};
use crate::locator::DefKind;

const INSTRUCTIONS: &str = "\
You write Python docstrings for existing code.
Document only the definition shown under \"Input code\"; the other code is context.
Do not return code.

Phrase the summary as a command (\"Return the path\", not \"Returns the path\").
Keep simple definitions to a single line. Otherwise start with a short summary
line, then a blank line, then a fuller description.
Leave implementation details, arguments and return values out of the summary.
For a class, summarize its behaviour and list its public methods and instance
variables, one per line.

Describe every entry of \"args\" and the \"ret\" entry when present.
Replace each <SLOT> in the template below and answer with the filled JSON only.";

/// The prompt sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptText(String);

impl PromptText {
    /// The prompt text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the prompt, returning its text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PromptText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An argument entry of the JSON template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgTemplate {
    /// Name as written in the signature.
    pub name: String,
    /// Filled in by the model.
    pub description: String,
    /// Annotation source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    /// Default value source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// The return entry of the JSON template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetTemplate {
    /// Filled in by the model.
    pub description: String,
    /// Return annotation source.
    #[serde(default)]
    pub annotation: Option<String>,
}

/// The JSON document the model fills in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocstringTemplate {
    /// `"function"` or `"class"`.
    pub node_type: String,
    /// Definition name.
    pub name: String,
    /// Summary and description.
    pub docstring: String,
    /// Arguments, `self`/`cls` excluded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<ArgTemplate>>,
    /// Present when the function returns a value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ret: Option<RetTemplate>,
}

impl DocstringTemplate {
    /// The unfilled template for `ctx`.
    #[must_use]
    pub fn for_context(ctx: &Context) -> Self {
        let (args, ret) = match ctx.kind {
            DefKind::Class => (None, None),
            DefKind::Function => {
                let args = ctx
                    .params
                    .iter()
                    .filter(|p| !is_receiver(p))
                    .map(|p| ArgTemplate {
                        name: p.display_name(),
                        description: SLOT.to_owned(),
                        annotation: p.annotation.clone(),
                        default: p.default.clone(),
                    })
                    .collect();
                let ret = ctx.returns_value.then(|| RetTemplate {
                    description: SLOT.to_owned(),
                    annotation: ctx.return_annotation.clone(),
                });
                (Some(args), ret)
            }
        };
        Self {
            node_type: ctx.kind.as_str().to_owned(),
            name: ctx.name.clone(),
            docstring: SLOT.to_owned(),
            args,
            ret,
        }
    }

    /// Whether any placeholder survived.
    #[must_use]
    pub fn has_unfilled_slot(&self) -> bool {
        self.docstring.contains(SLOT)
            || self
                .args
                .iter()
                .flatten()
                .any(|arg| arg.description.contains(SLOT))
            || self.ret.as_ref().is_some_and(|r| r.description.contains(SLOT))
    }
}

fn is_receiver(param: &Parameter) -> bool {
    matches!(param.kind, ParamKind::Regular | ParamKind::PositionalOnly)
        && matches!(param.name.as_str(), "self" | "cls")
}

/// JSON schema of [`DocstringTemplate`], attached to structured-output requests.
#[must_use]
pub fn response_schema() -> Value {
    let nullable_string = json!({ "anyOf": [{ "type": "string" }, { "type": "null" }] });
    json!({
        "type": "object",
        "properties": {
            "node_type": { "type": "string", "enum": ["class", "function"] },
            "name": { "type": "string" },
            "docstring": { "type": "string" },
            "args": {
                "anyOf": [
                    {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string" },
                                "description": { "type": "string" },
                                "annotation": nullable_string,
                                "default": nullable_string
                            },
                            "required": ["name", "description"]
                        }
                    },
                    { "type": "null" }
                ]
            },
            "ret": {
                "anyOf": [
                    {
                        "type": "object",
                        "properties": {
                            "description": { "type": "string" },
                            "annotation": nullable_string
                        },
                        "required": ["description"]
                    },
                    { "type": "null" }
                ]
            }
        },
        "required": ["node_type", "name", "docstring"]
    })
}

/// Builds the prompt for `ctx`.
#[must_use]
pub fn build(ctx: &Context) -> PromptText {
    let mut out = String::with_capacity(2048);
    out.push_str(INSTRUCTIONS);
    out.push_str("\n\n");

    if !ctx.related.is_empty() {
        out.push_str("Context:\n\n");
        let related: Vec<&str> = ctx.related.iter().map(|r| r.snippet.as_str()).collect();
        push_fenced(&mut out, "python", &related.join("\n"));
        out.push('\n');
    }

    out.push_str("Input code:\n\n");
    push_fenced(&mut out, "python", &input_code(ctx));
    out.push('\n');

    out.push_str("Output template:\n\n");
    let template = DocstringTemplate::for_context(ctx);
    let template_json = serde_json::to_string(&template).unwrap_or_default();
    push_fenced(&mut out, "json", &template_json);

    PromptText(out)
}

/// Reassembles a compact view of the definition from its context.
fn input_code(ctx: &Context) -> String {
    let mut code = String::new();
    for comment in &ctx.leading_comments {
        let _ = writeln!(code, "{comment}");
    }
    for decorator in &ctx.decorators {
        let _ = writeln!(code, "{decorator}");
    }
    let _ = write!(code, "{}:", ctx.signature);
    if !ctx.body_summary.is_empty() {
        let _ = write!(code, " {}", ctx.body_summary);
    }
    code
}

/// Appends `content` inside a code fence longer than any backtick run in it.
fn push_fenced(out: &mut String, lang: &str, content: &str) {
    let content = neutralize(content);
    let fence = "`".repeat(longest_backtick_run(&content).max(2) + 1);
    let _ = write!(out, "{fence}{lang}\n{content}\n{fence}\n");
}

/// Drops control characters (newline and tab excepted) and breaks up
/// chat-template markers.
fn neutralize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect::<String>()
        .replace("<|", "< |")
        .replace("|>", "| >")
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::extract_with_related;
    use crate::cst::SourceDocument;
    use crate::locator::Locator;

    fn context_of(source: &str) -> Context {
        let doc = SourceDocument::parse(source).unwrap();
        let def = Locator::new(&doc).next().unwrap();
        extract_with_related(&doc, &def, 400)
    }

    #[test]
    fn test_template_skips_self_and_adds_ret_only_when_returning() {
        let func = context_of("def m(self, x: int = 1, *a, **k):\n    return x\n");
        let template = DocstringTemplate::for_context(&func);
        let args = template.args.clone().unwrap();
        let names: Vec<&str> = args.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["x", "*a", "**k"]);
        assert_eq!(args[0].annotation.as_deref(), Some("int"));
        assert_eq!(args[0].default.as_deref(), Some("1"));
        assert!(template.ret.is_some());
        assert!(template.has_unfilled_slot());

        let procedure = context_of("def p(cls):\n    print(cls)\n");
        let template = DocstringTemplate::for_context(&procedure);
        assert_eq!(template.args, Some(Vec::new()));
        assert!(template.ret.is_none());
    }

    #[test]
    fn test_class_template_has_no_args() {
        let template = DocstringTemplate::for_context(&context_of("class A(B):\n    x = 1\n"));
        assert_eq!(template.node_type, "class");
        assert!(template.args.is_none());
        let json = serde_json::to_string(&template).unwrap();
        assert_eq!(json, r#"{"node_type":"class","name":"A","docstring":"<SLOT>"}"#);
    }

    #[test]
    fn test_build_is_deterministic_and_fenced() {
        let ctx = context_of("def f():\n    s = '```'\n    return s\n");
        let first = build(&ctx);
        let second = build(&ctx);
        assert_eq!(first, second);
        assert!(first.as_str().contains("````python\n"));
        assert!(first.as_str().contains("Output template:"));
    }

    #[test]
    fn test_neutralize() {
        assert_eq!(neutralize("a<|im_end|>b\x07\tc\n"), "a< |im_end| >b\tc\n");
    }

    #[test]
    fn test_related_context_section() {
        let ctx = context_of("def helper():\n    return 1\n\ndef main():\n    return helper()\n");
        assert!(!build(&ctx).as_str().contains("Context:"));

        let doc =
            SourceDocument::parse("def helper():\n    return 1\n\ndef main():\n    return helper()\n")
                .unwrap();
        let def = Locator::new(&doc).find(|d| d.name() == "main").unwrap();
        let ctx = extract_with_related(&doc, &def, 400);
        let prompt = build(&ctx);
        assert!(prompt.as_str().contains("Context:"));
        assert!(prompt.as_str().contains("def helper(): return 1"));
    }

    #[test]
    fn test_schema_requires_core_fields() {
        let schema = response_schema();
        assert_eq!(schema["required"], json!(["node_type", "name", "docstring"]));
    }
}
