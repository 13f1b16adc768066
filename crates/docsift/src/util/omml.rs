//! OMML (Office Math Markup Language) to LaTeX conversion.
//!
//! Walks an `m:oMath` subtree and emits LaTeX tokens. Structurally equal
//! inputs always produce identical strings. Property wrappers contribute
//! nothing; unrecognized elements recurse into their children so no text
//! is silently dropped.

use once_cell::sync::Lazy;
use roxmltree::Node;
use std::collections::HashMap;

/// Greek letters and math symbols substituted inside literal runs.
static SYMBOL_TO_LATEX: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert('α', "\\alpha");
    m.insert('β', "\\beta");
    m.insert('γ', "\\gamma");
    m.insert('δ', "\\delta");
    m.insert('ε', "\\epsilon");
    m.insert('ζ', "\\zeta");
    m.insert('η', "\\eta");
    m.insert('θ', "\\theta");
    m.insert('ι', "\\iota");
    m.insert('κ', "\\kappa");
    m.insert('λ', "\\lambda");
    m.insert('μ', "\\mu");
    m.insert('ν', "\\nu");
    m.insert('ξ', "\\xi");
    m.insert('π', "\\pi");
    m.insert('ρ', "\\rho");
    m.insert('σ', "\\sigma");
    m.insert('τ', "\\tau");
    m.insert('υ', "\\upsilon");
    m.insert('φ', "\\phi");
    m.insert('χ', "\\chi");
    m.insert('ψ', "\\psi");
    m.insert('ω', "\\omega");
    m.insert('Γ', "\\Gamma");
    m.insert('Δ', "\\Delta");
    m.insert('Θ', "\\Theta");
    m.insert('Λ', "\\Lambda");
    m.insert('Ξ', "\\Xi");
    m.insert('Π', "\\Pi");
    m.insert('Σ', "\\Sigma");
    m.insert('Υ', "\\Upsilon");
    m.insert('Φ', "\\Phi");
    m.insert('Ψ', "\\Psi");
    m.insert('Ω', "\\Omega");
    m.insert('∞', "\\infty");
    m.insert('±', "\\pm");
    m.insert('∓', "\\mp");
    m.insert('×', "\\times");
    m.insert('÷', "\\div");
    m.insert('≤', "\\leq");
    m.insert('≥', "\\geq");
    m.insert('≠', "\\neq");
    m.insert('≈', "\\approx");
    m.insert('≡', "\\equiv");
    m.insert('∈', "\\in");
    m.insert('∉', "\\notin");
    m.insert('⊂', "\\subset");
    m.insert('⊆', "\\subseteq");
    m.insert('∪', "\\cup");
    m.insert('∩', "\\cap");
    m.insert('→', "\\rightarrow");
    m.insert('←', "\\leftarrow");
    m.insert('⇒', "\\Rightarrow");
    m.insert('⇐', "\\Leftarrow");
    m.insert('∂', "\\partial");
    m.insert('∇', "\\nabla");
    m.insert('√', "\\sqrt");
    m.insert('·', "\\cdot");
    m
});

/// Function names `m:func` recognizes; anything else passes through as-is.
const KNOWN_FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "sinh", "cosh", "tanh", "coth", "arcsin", "arccos", "arctan", "log",
    "ln", "lg", "exp", "min", "max", "lim", "det", "gcd", "deg", "arg",
];

/// Convert an `m:oMath` (or any OMML) element to a LaTeX string.
pub fn omml_to_latex(node: Node) -> String {
    convert(node)
}

fn local<'a, 'input>(node: Node<'a, 'input>) -> &'a str {
    node.tag_name().name()
}

fn children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|c| c.is_element())
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    children(node).find(|c| local(*c) == name)
}

fn convert_children(node: Node) -> String {
    children(node).map(convert).collect::<Vec<_>>().concat()
}

/// The `m:val` attribute of a property element, namespace-agnostic.
fn val_attr(node: Node) -> Option<String> {
    node.attributes()
        .find(|a| a.name() == "val")
        .map(|a| a.value().to_string())
}

fn convert(node: Node) -> String {
    match local(node) {
        // Literal runs: m:t / w:t.
        "t" => substitute_symbols(node.text().unwrap_or("")),

        // Fraction.
        "f" => {
            let num = child(node, "num").map(convert_children).unwrap_or_default();
            let den = child(node, "den").map(convert_children).unwrap_or_default();
            format!("\\frac{{{num}}}{{{den}}}")
        }

        // Scripts.
        "sSup" => {
            let base = child(node, "e").map(convert_children).unwrap_or_default();
            let sup = child(node, "sup").map(convert_children).unwrap_or_default();
            format!("{{{base}}}^{{{sup}}}")
        }
        "sSub" => {
            let base = child(node, "e").map(convert_children).unwrap_or_default();
            let sub = child(node, "sub").map(convert_children).unwrap_or_default();
            format!("{{{base}}}_{{{sub}}}")
        }
        "sSubSup" => {
            let base = child(node, "e").map(convert_children).unwrap_or_default();
            let sub = child(node, "sub").map(convert_children).unwrap_or_default();
            let sup = child(node, "sup").map(convert_children).unwrap_or_default();
            format!("{{{base}}}_{{{sub}}}^{{{sup}}}")
        }

        // Radical: degree suppressed when degHide is on or the degree is
        // empty.
        "rad" => {
            let deg_hidden = child(node, "radPr")
                .and_then(|pr| child(pr, "degHide"))
                .and_then(val_attr)
                .map(|v| v == "1" || v == "on" || v == "true")
                .unwrap_or(false);
            let deg = child(node, "deg").map(convert_children).unwrap_or_default();
            let body = child(node, "e").map(convert_children).unwrap_or_default();
            if deg_hidden || deg.is_empty() {
                format!("\\sqrt{{{body}}}")
            } else {
                format!("\\sqrt[{deg}]{{{body}}}")
            }
        }

        // N-ary operator with optional limits.
        "nary" => {
            let pr = child(node, "naryPr");
            let glyph = pr
                .and_then(|pr| child(pr, "chr"))
                .and_then(val_attr)
                .unwrap_or_default();
            let op = match glyph.chars().next() {
                Some('∑') | None => "\\sum",
                Some('∏') => "\\prod",
                Some('∫') => "\\int",
                Some('∬') => "\\iint",
                Some('∭') => "\\iiint",
                Some(other) => return format!("{other}{}", child(node, "e").map(convert_children).unwrap_or_default()),
            };
            let mut out = op.to_string();
            if let Some(sub) = child(node, "sub") {
                let lower = convert_children(sub);
                if !lower.is_empty() {
                    out.push_str(&format!("_{{{lower}}}"));
                }
            }
            if let Some(sup) = child(node, "sup") {
                let upper = convert_children(sup);
                if !upper.is_empty() {
                    out.push_str(&format!("^{{{upper}}}"));
                }
            }
            let body = child(node, "e").map(convert_children).unwrap_or_default();
            out.push(' ');
            out.push_str(&body);
            out
        }

        // Delimiters.
        "d" => {
            let pr = child(node, "dPr");
            let beg = pr
                .and_then(|pr| child(pr, "begChr"))
                .and_then(val_attr)
                .unwrap_or_else(|| "(".to_string());
            let end = pr
                .and_then(|pr| child(pr, "endChr"))
                .and_then(val_attr)
                .unwrap_or_else(|| ")".to_string());
            let parts: Vec<String> = children(node)
                .filter(|c| local(*c) == "e")
                .map(convert_children)
                .collect();
            format!("{beg}{}{end}", parts.join(", "))
        }

        // Matrix.
        "m" => {
            let rows: Vec<String> = children(node)
                .filter(|c| local(*c) == "mr")
                .map(|row| {
                    children(row)
                        .filter(|c| local(*c) == "e")
                        .map(convert_children)
                        .collect::<Vec<_>>()
                        .join(" & ")
                })
                .collect();
            format!("\\begin{{matrix}} {} \\end{{matrix}}", rows.join(" \\\\ "))
        }

        // Named function.
        "func" => {
            let name = child(node, "fName").map(convert_children).unwrap_or_default();
            let arg = child(node, "e").map(convert_children).unwrap_or_default();
            if KNOWN_FUNCTIONS.contains(&name.as_str()) {
                format!("\\{name}{{{arg}}}")
            } else {
                format!("{name}{{{arg}}}")
            }
        }

        // Overline.
        "bar" => {
            let body = child(node, "e").map(convert_children).unwrap_or_default();
            format!("\\overline{{{body}}}")
        }

        // Accent, mapped by glyph.
        "acc" => {
            let glyph = child(node, "accPr")
                .and_then(|pr| child(pr, "chr"))
                .and_then(val_attr)
                .unwrap_or_default();
            let accent = match glyph.chars().next() {
                Some('~') | Some('\u{303}') => "\\tilde",
                Some('\u{304}') | Some('¯') => "\\bar",
                Some('\u{20d7}') | Some('→') => "\\vec",
                Some('\u{307}') | Some('˙') => "\\dot",
                _ => "\\hat",
            };
            let body = child(node, "e").map(convert_children).unwrap_or_default();
            format!("{accent}{{{body}}}")
        }

        // Property wrappers and styling contribute nothing.
        "rPr" | "fPr" | "ctrlPr" | "sSupPr" | "sSubPr" | "sSubSupPr" | "naryPr" | "dPr" | "mPr" | "funcPr"
        | "barPr" | "accPr" | "radPr" | "argPr" | "oMathParaPr" => String::new(),

        // Everything else recurses.
        _ => convert_children(node),
    }
}

fn substitute_symbols(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match SYMBOL_TO_LATEX.get(&ch) {
            Some(latex) => out.push_str(latex),
            None => out.push(ch),
        }
    }
    out
}
