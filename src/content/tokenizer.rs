//! Operator scanner for content streams
//!
//! Only the operator shapes the plotting tool emits are recognized. Each
//! match is one operator group:
//!
//! ```text
//! [array]? number{0,6} /name? operator (/name op /name op)?
//! ```
//!
//! The optional trailing pair is the `/a0 gs /x5 Do` tail of an image draw
//! that follows a `cm`. Text between matches is collected as residue.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE_OPERATION: Regex = {
        let number = r"(?:(-?[0-9]+(?:\.[0-9]+)?)\s+)?";
        let pattern = format!(
            r"(?:(\[[^\[\]]*\])\s+)?{}(?:(/\w+)\s+)?(\w+)\s+((?:/\w+\s+\w+\s+){{2}})?",
            number.repeat(6)
        );
        Regex::new(&pattern).unwrap()
    };
}

const GROUP_ARRAY: usize = 1;
const GROUP_FIRST_NUMBER: usize = 2;
const GROUP_NAME: usize = 8;
const GROUP_OPERATOR: usize = 9;
const GROUP_XOBJECT: usize = 10;

/// One operator with its operands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation<'a> {
    /// The whole matched text, trailing whitespace included
    pub text: &'a str,
    /// Leading array operand (`[3 2] 0 d`)
    pub array: Option<&'a str>,
    /// Numeric operands in order
    pub operands: Vec<&'a str>,
    /// Name operand (`/a0 gs`)
    pub name: Option<&'a str>,
    pub operator: &'a str,
    /// Trailing `/a0 gs /x5 Do` of an image draw
    pub xobject: Option<&'a str>,
}

/// Iterator over the operations of a content stream
///
/// Whatever lies between recognized operations is accumulated and available
/// from [`residue`](Self::residue) once the iterator is exhausted.
pub struct ContentTokenizer<'a> {
    content: &'a str,
    position: usize,
    residue: String,
}

impl<'a> ContentTokenizer<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            position: 0,
            residue: String::new(),
        }
    }

    /// Unrecognized text seen so far
    pub fn residue(&self) -> &str {
        &self.residue
    }

    pub fn into_residue(self) -> String {
        self.residue
    }
}

impl<'a> Iterator for ContentTokenizer<'a> {
    type Item = Operation<'a>;

    fn next(&mut self) -> Option<Operation<'a>> {
        let content = self.content;
        if self.position >= content.len() {
            return None;
        }

        let caps = match RE_OPERATION.captures_at(content, self.position) {
            Some(caps) => caps,
            None => {
                self.residue.push_str(&content[self.position..]);
                self.position = content.len();
                return None;
            }
        };

        let whole = caps.get(0)?;
        self.residue.push_str(&content[self.position..whole.start()]);
        self.position = whole.end();

        let operands = (GROUP_FIRST_NUMBER..GROUP_FIRST_NUMBER + 6)
            .filter_map(|i| caps.get(i).map(|m| m.as_str()))
            .collect();

        Some(Operation {
            text: whole.as_str(),
            array: caps.get(GROUP_ARRAY).map(|m| m.as_str()),
            operands,
            name: caps.get(GROUP_NAME).map(|m| m.as_str()),
            operator: caps.get(GROUP_OPERATOR)?.as_str(),
            xobject: caps.get(GROUP_XOBJECT).map(|m| m.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operators(content: &str) -> Vec<&str> {
        ContentTokenizer::new(content).map(|op| op.operator).collect()
    }

    #[test]
    fn test_path_operators() {
        let ops: Vec<Operation> = ContentTokenizer::new("10 20 m 30.5 -4 l h\n").collect();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].operands, vec!["10", "20"]);
        assert_eq!(ops[0].operator, "m");
        assert_eq!(ops[1].operands, vec!["30.5", "-4"]);
        assert_eq!(ops[1].text, "30.5 -4 l ");
        assert_eq!(ops[2].operator, "h");
        assert!(ops[2].operands.is_empty());
    }

    #[test]
    fn test_colour_and_state_operators() {
        assert_eq!(operators("q\n1 0 0 rg\n0.5 0.5 0.5 RG\n2 w\nQ\n"), vec!["q", "rg", "RG", "w", "Q"]);
    }

    #[test]
    fn test_dash_array() {
        let ops: Vec<Operation> = ContentTokenizer::new("[3 2] 0 d\n").collect();
        assert_eq!(ops[0].array, Some("[3 2]"));
        assert_eq!(ops[0].operands, vec!["0"]);
        assert_eq!(ops[0].operator, "d");
    }

    #[test]
    fn test_graphics_state_name() {
        let ops: Vec<Operation> = ContentTokenizer::new("/a0 gs\n").collect();
        assert_eq!(ops[0].name, Some("/a0"));
        assert_eq!(ops[0].operator, "gs");
    }

    #[test]
    fn test_image_draw_tail() {
        let ops: Vec<Operation> = ContentTokenizer::new("100 0 0 50 10 10 cm /a0 gs /x5 Do\n").collect();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operator, "cm");
        assert_eq!(ops[0].operands.len(), 6);
        assert_eq!(ops[0].xobject, Some("/a0 gs /x5 Do\n"));
    }

    #[test]
    fn test_residue() {
        let mut tokenizer = ContentTokenizer::new("0 0 m\n(abc) Tj\n%x");
        let ops: Vec<&str> = tokenizer.by_ref().map(|op| op.operator).collect();
        assert_eq!(ops, vec!["m", "Tj"]);
        assert_eq!(tokenizer.residue(), "(abc) %x");
    }

    #[test]
    fn test_whitespace_only_residue() {
        let mut tokenizer = ContentTokenizer::new("\n  0 0 m\n");
        assert_eq!(tokenizer.by_ref().count(), 1);
        assert_eq!(tokenizer.residue().trim(), "");
    }
}
