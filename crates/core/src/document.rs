//! Program source and render document assembly.
//!
//! A render document is the complete HTML page handed to the sandbox. Its
//! layout is fixed:
//!
//! 1. the mount element, whose id is the configured selector;
//! 2. library `<script src>` tags;
//! 3. the `window.tokenData` binding carrying the seed and token id;
//! 4. the concatenated program.
//!
//! The binding must be evaluated before the program, otherwise the program
//! reads an undefined seed and the output stops being reproducible.

use crate::hash::Seed;
use crate::token::TokenId;

/// Ordered program fragments for one project.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramSource {
    fragments: Vec<String>,
}

impl ProgramSource {
    /// Create from fragments already in index order.
    pub fn new(fragments: Vec<String>) -> Self {
        Self { fragments }
    }

    /// Append the fragment with the next index.
    pub fn push(&mut self, fragment: String) {
        self.fragments.push(fragment);
    }

    /// Fragments in index order.
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the source has no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Concatenate fragments in index order.
    pub fn concat(&self) -> String {
        self.fragments.concat()
    }
}

/// A self-contained HTML page ready for the sandbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderDocument {
    token_id: TokenId,
    mount_selector: String,
    html: String,
}

impl RenderDocument {
    /// Token this document renders.
    pub fn token_id(&self) -> TokenId {
        self.token_id
    }

    /// CSS selector of the mount element (`#<id>`).
    pub fn mount_selector(&self) -> &str {
        &self.mount_selector
    }

    /// The full page markup.
    pub fn html(&self) -> &str {
        &self.html
    }
}

/// Builds render documents from ledger data.
#[derive(Clone, Debug)]
pub struct ProgramAssembler {
    mount_id: String,
    library_urls: Vec<String>,
}

impl ProgramAssembler {
    /// Create an assembler for the given mount element id and libraries.
    ///
    /// `mount_id` must already be validated (see `RenderConfig::validate`).
    pub fn new(mount_id: impl Into<String>, library_urls: Vec<String>) -> Self {
        Self {
            mount_id: mount_id.into(),
            library_urls,
        }
    }

    /// Create an assembler from render configuration.
    pub fn from_config(config: &crate::config::RenderConfig) -> Self {
        Self::new(config.selector.clone(), config.library_urls.clone())
    }

    /// CSS selector matching the mount element.
    pub fn mount_selector(&self) -> String {
        format!("#{}", self.mount_id)
    }

    /// Assemble the page for one token. Pure and deterministic.
    pub fn assemble(
        &self,
        seed: &Seed,
        token_id: TokenId,
        program: &ProgramSource,
    ) -> RenderDocument {
        let program_len: usize = program.fragments.iter().map(String::len).sum();
        let mut html = String::with_capacity(256 + program_len);

        html.push_str("<html>\n");
        html.push_str("  <head><meta charset=\"utf-8\"></head>\n");
        html.push_str(&format!("  <body id=\"{}\"></body>\n", self.mount_id));
        for url in &self.library_urls {
            html.push_str(&format!("  <script src=\"{url}\"></script>\n"));
        }
        html.push_str(&format!(
            "  <script>window.tokenData = {{ hash: \"{}\", tokenId: {} }}</script>\n",
            seed.to_hex(),
            token_id
        ));
        html.push_str("  <script>");
        for fragment in &program.fragments {
            html.push_str(fragment);
        }
        html.push_str("</script>\n");
        html.push_str("</html>\n");

        RenderDocument {
            token_id,
            mount_selector: self.mount_selector(),
            html,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> ProgramAssembler {
        ProgramAssembler::new("test", vec!["https://cdn.example/p5.js".to_string()])
    }

    fn program(fragments: &[&str]) -> ProgramSource {
        ProgramSource::new(fragments.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn fragments_concatenate_in_index_order() {
        let doc = assembler().assemble(
            &Seed::from_bytes([1; 32]),
            TokenId::new(12_000_001),
            &program(&["a;", "b;", "c;"]),
        );
        assert!(doc.html().contains("<script>a;b;c;</script>"));
    }

    #[test]
    fn binding_precedes_program() {
        let doc = assembler().assemble(
            &Seed::from_bytes([0xfe; 32]),
            TokenId::new(7),
            &program(&["draw();"]),
        );
        let html = doc.html();
        let binding = html.find("window.tokenData").unwrap();
        let library = html.find("cdn.example/p5.js").unwrap();
        let body = html.find("draw();").unwrap();
        assert!(library < binding);
        assert!(binding < body);
        assert!(html.contains(&format!("hash: \"0x{}\"", "fe".repeat(32))));
        assert!(html.contains("tokenId: 7 }"));
    }

    #[test]
    fn mount_element_uses_selector() {
        let doc = assembler().assemble(&Seed::from_bytes([0; 32]), TokenId::new(1), &program(&[]));
        assert!(doc.html().contains("<body id=\"test\"></body>"));
        assert_eq!(doc.mount_selector(), "#test");
        assert_eq!(doc.token_id(), TokenId::new(1));
    }

    #[test]
    fn empty_program_is_accepted() {
        let doc = assembler().assemble(&Seed::from_bytes([0; 32]), TokenId::new(1), &program(&[]));
        assert!(doc.html().contains("<script></script>"));
    }

    #[test]
    fn assembly_is_deterministic() {
        let seed = Seed::from_bytes([9; 32]);
        let source = program(&["let x = 1;", "draw(x);"]);
        let first = assembler().assemble(&seed, TokenId::new(5), &source);
        let second = assembler().assemble(&seed, TokenId::new(5), &source);
        assert_eq!(first, second);
    }

    #[test]
    fn program_text_is_not_modified() {
        let raw = "if (a < b && c > \"d\") { x = '</div>'; }";
        let doc = assembler().assemble(&Seed::from_bytes([0; 32]), TokenId::new(1), &program(&[raw]));
        assert!(doc.html().contains(raw));
    }
}
