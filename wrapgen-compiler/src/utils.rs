//! Helpers shared by the emitters

use std::fmt::{self, Write};
use wrapgen_checker::TargetLanguage;

/// Notice placed at the top of every generated file
pub const GENERATED_NOTICE: &str = "This is a GENERATED FILE, changes made here WILL BE LOST.";

/// Line-oriented source builder with block indentation
#[derive(Debug, Clone)]
pub struct CodeWriter {
    output: String,
    indent_level: usize,
    indent_unit: &'static str,
}

impl CodeWriter {
    pub fn new(indent_unit: &'static str) -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            indent_unit,
        }
    }

    /// Write one indented line. Empty lines carry no indentation.
    pub fn line(&mut self, text: impl fmt::Display) -> fmt::Result {
        let text = text.to_string();
        if text.is_empty() {
            return writeln!(self.output);
        }
        for _ in 0..self.indent_level {
            self.output.push_str(self.indent_unit);
        }
        writeln!(self.output, "{text}")
    }

    pub fn blank(&mut self) -> fmt::Result {
        writeln!(self.output)
    }

    /// Write a line and indent what follows
    pub fn open(&mut self, text: impl fmt::Display) -> fmt::Result {
        self.line(text)?;
        self.indent_level += 1;
        Ok(())
    }

    /// Dedent and write a closing line
    pub fn close(&mut self, text: impl fmt::Display) -> fmt::Result {
        self.indent_level = self.indent_level.saturating_sub(1);
        self.line(text)
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Append text verbatim
    pub fn raw(&mut self, text: &str) {
        self.output.push_str(text);
    }

    pub fn finish(self) -> String {
        self.output
    }
}

/// Render the comment header of a generated file.
///
/// Every banner line becomes a `//` comment (empty lines a bare `//`),
/// followed by the generated-file notice and a blank line. `{entity}` and
/// `{target}` in the template are substituted.
pub fn render_banner(template: &str, entity: &str, target: TargetLanguage) -> String {
    let mut out = String::new();
    let text = template
        .replace("{entity}", entity)
        .replace("{target}", target.name());

    if !text.trim().is_empty() {
        for line in text.trim_end().lines() {
            comment_line(&mut out, line);
        }
        comment_line(&mut out, "");
    }
    comment_line(&mut out, GENERATED_NOTICE);
    comment_line(&mut out, "");
    out.push('\n');
    out
}

fn comment_line(out: &mut String, line: &str) {
    let line = line.trim_end();
    if line.is_empty() {
        out.push_str("//\n");
    } else {
        out.push_str("// ");
        out.push_str(line);
        out.push('\n');
    }
}

const SWIFT_KEYWORDS: &[&str] = &[
    "Any", "Self", "as", "associatedtype", "break", "case", "catch", "class", "continue",
    "default", "defer", "deinit", "do", "else", "enum", "extension", "fallthrough", "false",
    "fileprivate", "for", "func", "guard", "if", "import", "in", "init", "inout", "internal",
    "is", "let", "nil", "open", "operator", "private", "protocol", "public", "repeat",
    "rethrows", "return", "self", "static", "struct", "subscript", "super", "switch", "throw",
    "throws", "true", "try", "typealias", "var", "where", "while",
];

const KOTLIN_KEYWORDS: &[&str] = &[
    "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if", "in",
    "interface", "is", "null", "object", "package", "return", "super", "this", "throw", "true",
    "try", "typealias", "typeof", "val", "var", "when", "while",
];

const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "asm", "auto", "bool", "break", "case", "catch", "char",
    "class", "const", "constexpr", "continue", "default", "delete", "do", "double", "else",
    "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto", "if",
    "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "nullptr",
    "operator", "or", "private", "protected", "public", "register", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "template", "this", "throw", "true",
    "try", "typedef", "typeid", "typename", "union", "unsigned", "using", "virtual", "void",
    "volatile", "while",
];

/// Escape a model identifier that is reserved in the target language
pub fn sanitize_identifier(name: &str, target: TargetLanguage) -> String {
    match target {
        TargetLanguage::Swift if SWIFT_KEYWORDS.contains(&name) => format!("`{name}`"),
        TargetLanguage::Kotlin if KOTLIN_KEYWORDS.contains(&name) => format!("`{name}`"),
        TargetLanguage::Cpp if CPP_KEYWORDS.contains(&name) => format!("{name}_"),
        _ => name.to_string(),
    }
}
