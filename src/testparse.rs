//! Free-form LLM test-response parsing
//!
//! The model answers test-generation prompts with markdown containing a
//! `TEST CODE` section and a `WARNINGS AND RECOMMENDATIONS` section, with no
//! guarantee about header style or fencing. All the tolerance lives here so
//! the orchestrator never branches on parser internals.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NUMBERED_RE: Regex = Regex::new(r"^\d+\.\s+(.+)").unwrap();
    static ref BOLD_RE: Regex = Regex::new(r"\*\*(.*?)\*\*").unwrap();
    static ref ITALIC_RE: Regex = Regex::new(r"\*(.*?)\*").unwrap();
    static ref INLINE_CODE_RE: Regex = Regex::new(r"`(.*?)`").unwrap();
    static ref SPACES_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref CONTRACT_NAME_RE: Regex = Regex::new(r"contract\s+(\w+)").unwrap();
}

/// Parsed test-generation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTestResponse {
    pub test_code: String,
    pub warnings: Vec<String>,
}

/// Parse a free-form LLM response into `(test_code, warnings)`.
pub fn parse_test_response(response: &str) -> ParsedTestResponse {
    let clean = normalize(response);

    let mut warnings = Vec::new();

    let test_code = match extract_section(&clean, "TEST CODE") {
        Some(section) => {
            let code = extract_code(&section);
            if code.is_empty() {
                warnings.push("No test code section found in response".to_string());
            }
            code
        }
        None => {
            warnings.push("No test code section found in response".to_string());
            String::new()
        }
    };

    if let Some(section) = extract_section(&clean, "WARNINGS AND RECOMMENDATIONS") {
        warnings.extend(extract_warnings(&section));
    }

    ParsedTestResponse {
        test_code,
        warnings,
    }
}

/// Extract the primary contract name from Solidity source.
pub fn extract_contract_name(source_code: &str) -> String {
    CONTRACT_NAME_RE
        .captures(source_code)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "Contract".to_string())
}

fn normalize(response: &str) -> String {
    response.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

/// Find a section by header, tolerating `##`, `#`, `**…**` and trailing-colon
/// variants. Returns the lines between the header and the next section.
fn extract_section(response: &str, header: &str) -> Option<String> {
    let lines: Vec<&str> = response.lines().collect();
    let upper = header.to_uppercase();

    let patterns = [
        format!("## {}", upper),
        format!("##{}", upper),
        format!("# {}", upper),
        format!("**{}**", upper),
        format!("{}:", upper),
        upper.clone(),
    ];

    for (i, line) in lines.iter().enumerate() {
        let clean_upper = line.trim().to_uppercase();
        if patterns.iter().any(|p| clean_upper.contains(p)) {
            let mut section = Vec::new();
            for next in &lines[i + 1..] {
                if is_section_header(next) {
                    break;
                }
                section.push(*next);
            }
            return Some(section.join("\n"));
        }
    }
    None
}

fn is_section_header(line: &str) -> bool {
    let upper = line.trim().to_uppercase();
    [
        "## TEST CODE",
        "## WARNINGS",
        "## RECOMMENDATIONS",
        "## ANALYSIS",
        "# TEST CODE",
        "# WARNINGS",
        "**TEST CODE**",
        "**WARNINGS",
    ]
    .iter()
    .any(|header| upper.contains(header))
}

/// Pull the test code out of a section: the first fenced block wins, with a
/// heuristic fallback for responses that forgot the fences.
fn extract_code(section: &str) -> String {
    let mut code_lines: Vec<&str> = Vec::new();
    let mut in_block = false;

    for line in section.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            if in_block {
                // First complete block is the answer
                if !code_lines.is_empty() {
                    break;
                }
                in_block = false;
            } else {
                in_block = true;
            }
            continue;
        }

        if in_block {
            // A bare language identifier on its own line right after the fence
            if code_lines.is_empty() && is_language_identifier(trimmed) {
                continue;
            }
            code_lines.push(line);
        }
    }

    let code = code_lines.join("\n").trim().to_string();
    if !code.is_empty() {
        return code;
    }

    extract_code_without_fences(section)
}

fn is_language_identifier(line: &str) -> bool {
    matches!(
        line.to_lowercase().as_str(),
        "javascript" | "js" | "typescript" | "ts" | "solidity" | "sol" | "python" | "py"
    )
}

fn extract_code_without_fences(section: &str) -> String {
    section
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty()
                || trimmed.starts_with("- ")
                || trimmed.starts_with("* ")
                || trimmed.starts_with("Note:")
            {
                return false;
            }
            looks_like_code(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn looks_like_code(line: &str) -> bool {
    const CODE_PATTERNS: [&str; 16] = [
        "const ", "let ", "var ", "function", "describe(", "it(", "expect(", "require(",
        "import ", "contract ", "pragma ", "beforeEach", "await ", "assert", "{", ";",
    ];

    let trimmed = line.trim();
    if CODE_PATTERNS.iter().any(|p| trimmed.contains(p)) {
        return true;
    }

    // Indented lines are likely code
    (line.starts_with(' ') || line.starts_with('\t')) && !trimmed.is_empty()
}

/// Extract bullet-led and numbered warnings, stripping markdown emphasis.
fn extract_warnings(section: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    for line in section.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut warning = None;
        for prefix in ["- ", "* ", "• ", "◦ ", "▪ "] {
            if let Some(rest) = line.strip_prefix(prefix) {
                warning = Some(rest.trim().to_string());
                break;
            }
        }

        if warning.is_none() {
            if let Some(caps) = NUMBERED_RE.captures(line) {
                warning = Some(caps[1].trim().to_string());
            }
        }

        if warning.is_none() && looks_like_warning(line) {
            warning = Some(line.to_string());
        }

        if let Some(text) = warning {
            let cleaned = clean_warning_text(&text);
            if !cleaned.is_empty() {
                warnings.push(cleaned);
            }
        }
    }

    warnings
}

fn looks_like_warning(line: &str) -> bool {
    const KEYWORDS: [&str; 10] = [
        "warning", "recommendation", "note", "important", "caution", "consider", "ensure",
        "avoid", "review", "test",
    ];

    let lower = line.to_lowercase();
    KEYWORDS.iter().any(|k| lower.contains(k))
}

fn clean_warning_text(text: &str) -> String {
    let text = BOLD_RE.replace_all(text, "$1");
    let text = ITALIC_RE.replace_all(&text, "$1");
    let text = INLINE_CODE_RE.replace_all(&text, "$1");
    SPACES_RE.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_sections() {
        let response = "## TEST CODE\n```javascript\ndescribe('x', ...)\n```\n## WARNINGS AND RECOMMENDATIONS\n- be careful\n- review\n";
        let parsed = parse_test_response(response);
        assert_eq!(parsed.test_code, "describe('x', ...)");
        assert_eq!(parsed.warnings, vec!["be careful", "review"]);
    }

    #[test]
    fn test_header_variants() {
        let cases = [
            "## TEST CODE\n```\nit('works')\n```",
            "# TEST CODE\n```\nit('works')\n```",
            "**TEST CODE**\n```\nit('works')\n```",
            "TEST CODE:\n```\nit('works')\n```",
        ];
        for response in cases {
            let parsed = parse_test_response(response);
            assert_eq!(parsed.test_code, "it('works')", "failed for: {}", response);
        }
    }

    #[test]
    fn test_language_identifier_on_own_line() {
        let response = "## TEST CODE\n```\njavascript\nconst x = 1;\n```";
        let parsed = parse_test_response(response);
        assert_eq!(parsed.test_code, "const x = 1;");
    }

    #[test]
    fn test_only_first_code_block_is_taken() {
        let response =
            "## TEST CODE\n```js\ndescribe('a');\n```\nsome prose\n```js\ndescribe('b');\n```";
        let parsed = parse_test_response(response);
        assert_eq!(parsed.test_code, "describe('a');");
    }

    #[test]
    fn test_unfenced_code_heuristic() {
        let response = "## TEST CODE\nNote: here are the tests\nconst { expect } = require('chai');\ndescribe('Token', () => {\n  it('mints', async () => {});\n});";
        let parsed = parse_test_response(response);
        assert!(parsed.test_code.contains("describe('Token'"));
        assert!(!parsed.test_code.contains("Note:"));
    }

    #[test]
    fn test_missing_code_section_warns() {
        let parsed = parse_test_response("## WARNINGS AND RECOMMENDATIONS\n- check things");
        assert!(parsed.test_code.is_empty());
        assert_eq!(
            parsed.warnings,
            vec!["No test code section found in response", "check things"]
        );
    }

    #[test]
    fn test_numbered_and_markdown_warnings() {
        let response = "## TEST CODE\n```\nx\n```\n## WARNINGS AND RECOMMENDATIONS\n1. **Review** the `transfer` logic\n2. *Avoid* floating pragma";
        let parsed = parse_test_response(response);
        assert_eq!(
            parsed.warnings,
            vec!["Review the transfer logic", "Avoid floating pragma"]
        );
    }

    #[test]
    fn test_crlf_normalization() {
        let response = "## TEST CODE\r\n```\r\nit('x')\r\n```\r\n";
        assert_eq!(parse_test_response(response).test_code, "it('x')");
    }

    #[test]
    fn test_contract_name_extraction() {
        assert_eq!(
            extract_contract_name("pragma solidity ^0.8.0;\ncontract MyToken is ERC20 {}"),
            "MyToken"
        );
        assert_eq!(extract_contract_name("library SafeMath {}"), "Contract");
    }
}
