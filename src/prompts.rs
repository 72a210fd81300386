//! Prompt templates for the generative model
//!
//! Fixed templates; the security-audit prompt prescribes the exact output
//! JSON schema so the response can be decoded after slicing out the JSON
//! object, and the test-generation prompt embeds both analysis contexts.

/// Security-audit prompt. The contract source is appended verbatim.
pub const SECURITY_ANALYSIS_PROMPT: &str = r#"# ROLE AND OBJECTIVE
You are an elite Solidity smart contract security auditor, demonstrating the precision, rigor, and thoroughness exemplified by industry-leading audit firms. Your objective is to examine the provided smart contract to uncover and articulate all potential vulnerabilities, logical errors, and deviations from security and efficiency best practices.

# AUDIT METHODOLOGY
1. Comprehensive contextual analysis: understand contract purpose, state variables, external and public methods, internal state interactions and business logic.
2. Threat modeling: treat the blockchain as inherently adversarial. Evaluate external interactions, user inputs, transaction ordering, and network conditions as potential attack vectors.
3. Detailed vulnerability assessment using the ANALYSIS CHECKLIST, explaining each identified vulnerability with risk, attack scenario, and impact.
4. Adherence to best practices: assess security, gas optimization, readability, and maintainability.
5. Score objectively via the SCORING RUBRIC and return a single, well-formatted JSON object with no extraneous text.

# ANALYSIS CHECKLIST
- Critical: Reentrancy (Checks-Effects-Interactions), Unsafe Delegatecall, Significant Access Control Issues (exposed selfdestruct, unrestricted withdrawals), Integer Overflow/Underflow (< Solidity 0.8.0).
- High: Logical Flaws in Business Rules, tx.origin Authentication, Unchecked External Call Returns, Unsafe Casting, Gas-heavy Loops (Potential DoS).
- Medium: Timestamp Reliance, Weak Input Validation, Variable Shadowing, Floating Pragma ("^") Usage, Missing Events for Critical Actions.
- Low: Deprecated Functions Usage, Suboptimal Gas Practices, Missing NatSpec Documentation.
- Informational: General improvements in code structure, standard compliance (ERC standards, etc.).

# SCORING RUBRIC
- Base Score: 100
- Deductions: CRITICAL -30, HIGH -15, MEDIUM -5, LOW -2 per issue.
- Minimum security score: 0.

# JSON OUTPUT FORMAT
Return a single, raw, valid JSON object without markdown or additional context:
{
  "success": true,
  "analysis": {
    "contract_name": "<Contract's primary name>",
    "compiler_version": "<Solidity pragma version>",
    "security_score": <Integer score (0-100)>,
    "risk_level": "<LOW|MEDIUM|HIGH|CRITICAL>",
    "summary": "Concise executive summary (1-2 sentences) describing overall security posture.",
    "vulnerabilities": [
      {
        "title": "Vulnerability Name",
        "severity": "<LOW|MEDIUM|HIGH|CRITICAL>",
        "description": "Explanation including risk context, exploit pathway, and potential impact.",
        "location": { "function": "functionName()", "line_numbers": [start, end] },
        "recommendation": "Explicit, actionable advice to rectify the issue."
      }
    ],
    "good_practices": ["Identified strong security practices within the code."],
    "recommendations": ["Suggestions for general improvement that aren't explicitly vulnerabilities."]
  }
}

# CONTRACT SOURCE
"#;

/// Test-generation prompt template. Placeholders are substituted by
/// [`build_test_generation_prompt`].
const TEST_GENERATION_TEMPLATE: &str = r#"You are an expert coding assistant specializing in generating unit tests for Solidity smart contracts. Analyze the provided contract code and analysis results to produce high-quality, idiomatic, maintainable, and secure unit test code tailored to the specified test framework and language.

The generated tests must be:
- Comprehensive: cover basic functionality, edge cases, boundary conditions, security vulnerabilities, access control, state transitions, error handling, and revert conditions.
- Idiomatic: follow the conventions and best practices of the specified test framework and language.
- Maintainable: clear, descriptive test names, proper setup/teardown, organized structure.
- Secure: address issues identified in the static and AI security analysis results.

#### 1. Contract Source:

{contracts}

#### 2. Test Framework & Language:

* Framework: {testFramework}
* Test Language: {testLanguage}

#### 3. Static Analysis Results (Slither):

{slitherAnalysis}

Note: use the static analysis results to identify potential vulnerabilities (e.g. reentrancy, unchecked low-level calls) and ensure tests cover these issues.

#### 4. Security Analysis (AI Analysis):

{securityAnalysis}

Note: incorporate the AI analysis findings to test for security issues like overflow/underflow or improper access control.

#### Output Format

Respond with exactly two sections:

## TEST CODE
A single fenced code block containing the complete test file.

## WARNINGS AND RECOMMENDATIONS
A bulleted list of testing warnings and recommendations specific to this contract.
"#;

/// Assemble the test-generation prompt from its parts.
pub fn build_test_generation_prompt(
    source_code: &str,
    test_framework: &str,
    test_language: &str,
    slither_analysis: &str,
    security_analysis: &str,
) -> String {
    TEST_GENERATION_TEMPLATE
        .replace("{contracts}", source_code)
        .replace("{testFramework}", test_framework)
        .replace("{testLanguage}", test_language)
        .replace(
            "{slitherAnalysis}",
            if slither_analysis.is_empty() {
                "No static analysis results available."
            } else {
                slither_analysis
            },
        )
        .replace(
            "{securityAnalysis}",
            if security_analysis.is_empty() {
                "No AI security analysis results available."
            } else {
                security_analysis
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_substitution() {
        let prompt = build_test_generation_prompt(
            "contract A {}",
            "hardhat",
            "javascript",
            "{\"issues\":[]}",
            "",
        );
        assert!(prompt.contains("contract A {}"));
        assert!(prompt.contains("Framework: hardhat"));
        assert!(prompt.contains("{\"issues\":[]}"));
        assert!(prompt.contains("No AI security analysis results available."));
        assert!(!prompt.contains("{contracts}"));
    }
}
