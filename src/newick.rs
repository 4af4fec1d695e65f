//! Newick pre-processing around the `phylotree` parser.
//!
//! Species-tree annotations look like `'{support:0.9,length:0.1,...}'`: quoted
//! labels full of `:` `,` `{` `}`. Rather than teaching the parser about
//! quoting, every quoted label is swapped for a placeholder name before
//! parsing and swapped back afterwards. `[...]` comments and whitespace
//! outside quotes are dropped on the way.

use std::borrow::Cow;

use phylotree::tree::Tree as PhyloTree;

use crate::error::{CastlesError, Result};

const PLACEHOLDER: &str = "castles_label_";

/// Characters that force a label to be quoted on output.
const METACHARACTERS: [char; 9] = ['(', ')', '[', ']', '\'', '"', ':', ';', ','];

/// Newick text with quoted labels replaced by placeholders.
#[derive(Debug, Clone, Default)]
pub struct MaskedNewick {
    text: String,
    labels: Vec<String>,
}

impl MaskedNewick {
    /// Mask quoted labels and strip comments/whitespace.
    ///
    /// Both `'...'` and `"..."` quoting is accepted; a doubled quote inside a
    /// label stands for the quote character itself.
    ///
    /// # Errors
    /// Unterminated quotes or comments.
    pub fn new(input: &str, context: &str) -> Result<Self> {
        let unterminated = |what: &str| CastlesError::Newick {
            context: context.to_string(),
            message: format!("unterminated {what}"),
        };

        let mut masked = MaskedNewick {
            text: String::with_capacity(input.len()),
            labels: Vec::new(),
        };
        let mut chars = input.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '\'' | '"' => {
                    let mut label = String::new();
                    loop {
                        match chars.next() {
                            Some(c) if c == ch && chars.peek() == Some(&ch) => {
                                chars.next();
                                label.push(ch);
                            }
                            Some(c) if c == ch => break,
                            Some(c) => label.push(c),
                            None => return Err(unterminated("quoted label")),
                        }
                    }
                    masked.text.push_str(PLACEHOLDER);
                    masked.text.push_str(&masked.labels.len().to_string());
                    masked.labels.push(label);
                }
                '[' => {
                    if !chars.by_ref().any(|c| c == ']') {
                        return Err(unterminated("comment"));
                    }
                }
                c if c.is_whitespace() => {}
                c => masked.text.push(c),
            }
        }
        Ok(masked)
    }

    /// Masked text, ready for the parser.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Original text of a parsed node name: the quoted label for a
    /// placeholder, the name itself otherwise.
    pub fn resolve(&self, name: &str) -> String {
        name.strip_prefix(PLACEHOLDER)
            .and_then(|idx| idx.parse::<usize>().ok())
            .and_then(|idx| self.labels.get(idx))
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Parse every `;`-terminated tree in the text.
    ///
    /// # Errors
    /// [`CastlesError::Newick`] naming the zero-based tree index.
    pub fn parse_trees(&self, context: &str) -> Result<Vec<PhyloTree>> {
        self.text
            .split(';')
            .filter(|chunk| !chunk.is_empty())
            .enumerate()
            .map(|(idx, chunk)| {
                PhyloTree::from_newick(&format!("{chunk};")).map_err(|e| CastlesError::Newick {
                    context: format!("{context}, tree {idx}"),
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

/// Quote a label for newick output if it contains whitespace or newick
/// metacharacters.
pub fn quote_label(label: &str) -> Cow<'_, str> {
    if label.is_empty()
        || label
            .chars()
            .any(|c| c.is_whitespace() || METACHARACTERS.contains(&c))
    {
        Cow::Owned(format!("'{}'", label.replace('\'', "''")))
    } else {
        Cow::Borrowed(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_quoted_labels() {
        let masked = MaskedNewick::new("((A,B)'{a:1,b:2}',C);", "test").unwrap();
        assert_eq!(masked.text(), "((A,B)castles_label_0,C);");
        assert_eq!(masked.resolve("castles_label_0"), "{a:1,b:2}");
        assert_eq!(masked.resolve("A"), "A");
    }

    #[test]
    fn double_quotes_and_escapes() {
        let masked = MaskedNewick::new("(\"x y\",'it''s');", "test").unwrap();
        assert_eq!(masked.text(), "(castles_label_0,castles_label_1);");
        assert_eq!(masked.resolve("castles_label_0"), "x y");
        assert_eq!(masked.resolve("castles_label_1"), "it's");
    }

    #[test]
    fn strips_comments_and_whitespace() {
        let masked = MaskedNewick::new("( A:0.1 [&rate=2],\n\tB:0.2 ) ;\n", "test").unwrap();
        assert_eq!(masked.text(), "(A:0.1,B:0.2);");
    }

    #[test]
    fn unterminated_input_is_an_error() {
        assert!(MaskedNewick::new("(A,'B);", "test").is_err());
        assert!(MaskedNewick::new("(A,B)[oops;", "test").is_err());
    }

    #[test]
    fn unknown_placeholder_resolves_to_itself() {
        let masked = MaskedNewick::new("(A,B);", "test").unwrap();
        assert_eq!(masked.resolve("castles_label_7"), "castles_label_7");
    }

    #[test]
    fn parses_each_tree() {
        let masked = MaskedNewick::new("(A:1,B:2);\n(A:3,B:4);\n", "genes").unwrap();
        let trees = masked.parse_trees("genes").unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[1].get_leaves().len(), 2);
    }

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(quote_label("Homo_sapiens"), "Homo_sapiens");
        assert_eq!(quote_label("Homo sapiens"), "'Homo sapiens'");
        assert_eq!(quote_label("a:b"), "'a:b'");
        assert_eq!(quote_label("it's"), "'it''s'");
        assert_eq!(quote_label("a\"b"), "'a\"b'");
    }

    #[test]
    fn double_quote_in_label_reads_back() {
        let written = format!("({}:1.0,C:2.0);", quote_label("a\"b"));
        let masked = MaskedNewick::new(&written, "test").unwrap();
        assert_eq!(masked.resolve(&format!("{PLACEHOLDER}0")), "a\"b");
        assert_eq!(masked.parse_trees("test").unwrap().len(), 1);
    }
}
