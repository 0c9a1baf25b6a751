//! Content stream simplification
//!
//! Rewrites the drawing operators of one page: filled polygons of the same
//! colour are collected into a [`PathGraph`], merged where they share edges
//! and emitted as one fill; repeated colour operators are dropped; the page's
//! base `cm` is kept once and cancelled around embedded image draws.

pub mod matrix;
pub mod path;
pub mod tokenizer;

pub use matrix::{Number, TransformMatrix};
pub use path::{write_stroke, PathGraph, PathNode, PathOp};
pub use tokenizer::{ContentTokenizer, Operation};

/// Result of [`simplify_content`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simplified {
    /// The rewritten content stream
    pub content: Vec<u8>,
    /// Text the tokenizer could not match; it is not part of `content`
    pub residue: String,
}

/// Rewrite a decompressed content stream
pub fn simplify_content(content: &[u8]) -> Simplified {
    let text = String::from_utf8_lossy(content);
    let mut tokenizer = ContentTokenizer::new(&text);
    let mut rewriter = ContentRewriter::new();
    for operation in tokenizer.by_ref() {
        rewriter.apply(&operation);
    }

    Simplified {
        residue: tokenizer.into_residue(),
        content: rewriter.finish().into_bytes(),
    }
}

/// Operator state machine behind [`simplify_content`]
#[derive(Debug, Default)]
pub struct ContentRewriter {
    out: String,
    /// Set once the first plain `cm` has been written
    matrix_opened: bool,
    pending_matrix: Option<TransformMatrix>,
    fill_colour: Option<String>,
    stroke_colour: Option<String>,
    in_xobject_frame: bool,
    run: Vec<PathNode>,
    graph: PathGraph,
}

impl ContentRewriter {
    pub fn new() -> Self {
        Self {
            out: String::from("q\n"),
            ..Self::default()
        }
    }

    pub fn apply(&mut self, operation: &Operation<'_>) {
        match operation.operator {
            "m" | "l" => {
                let node = PathOp::from_operator(operation.operator)
                    .and_then(|op| PathNode::from_operands(&operation.operands, op));
                match node {
                    Some(node) => self.run.push(node),
                    None => self.out.push_str(operation.text),
                }
            }
            "h" | "B" => {
                let run = std::mem::take(&mut self.run);
                if self.in_xobject_frame {
                    // outline drawn around an embedded image
                    self.in_xobject_frame = false;
                    write_stroke(&run, true, &mut self.out);
                } else {
                    self.graph.add_run(&run);
                }
            }
            "S" => {
                self.flush_fill();
                let run = std::mem::take(&mut self.run);
                write_stroke(&run, false, &mut self.out);
            }
            "rg" | "RG" => {
                let colour = operation.operands.join(" ");
                let last = if operation.operator == "rg" {
                    &self.fill_colour
                } else {
                    &self.stroke_colour
                };
                if last.as_deref() == Some(colour.as_str()) {
                    return;
                }

                self.flush_fill();
                if operation.operator == "rg" {
                    self.fill_colour = Some(colour);
                } else {
                    self.stroke_colour = Some(colour);
                }
                self.out.push_str(operation.text);
            }
            "cm" if operation.xobject.is_some() => {
                self.flush_fill();
                self.in_xobject_frame = true;
                self.out.push_str("q\n");
                if self.matrix_opened {
                    self.cancel_pending_matrix();
                }
                self.out.push_str(operation.text);
                self.out.push_str("Q\n");
            }
            "cm" => {
                if !self.matrix_opened {
                    self.matrix_opened = true;
                    self.pending_matrix = TransformMatrix::from_operands(&operation.operands);
                    self.out.push_str("q ");
                    self.out.push_str(operation.text);
                }
            }
            "q" | "Q" => {}
            _ => self.out.push_str(operation.text),
        }
    }

    /// Close all open state and return the rewritten stream
    pub fn finish(mut self) -> String {
        self.flush_fill();
        if self.matrix_opened {
            self.out.push_str("Q\n");
        }
        self.out.push_str("Q\n");
        self.out
    }

    fn flush_fill(&mut self) {
        let mut graph = std::mem::take(&mut self.graph);
        graph.optimize().write_fill(&mut self.out);
    }

    fn cancel_pending_matrix(&mut self) {
        match self.pending_matrix.as_ref().and_then(TransformMatrix::inverse) {
            Some(inverse) if !inverse.is_identity() => {
                self.out.push_str(&inverse.to_string());
                self.out.push('\n');
            }
            Some(_) => {}
            None => log::warn!("page matrix cannot be inverted, image drawn without cancelling it"),
        }
    }
}
