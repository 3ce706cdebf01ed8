//! Import extraction from Python source with tree-sitter.

use crate::errors::{Error, Result};
use tree_sitter::{Node, Parser, Tree};

/// One import statement as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStatement {
    /// `import a.b.c` (one entry per imported name)
    Import { module: String },
    /// `from [dots]module import names`
    From {
        level: usize,
        module: Option<String>,
        names: Vec<String>,
    },
}

fn python_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| Error::Parse {
            origin: "tree-sitter-python".to_string(),
            message: e.to_string(),
        })?;
    Ok(parser)
}

pub fn parse_tree(source: &str, origin: &str) -> Result<Tree> {
    let mut parser = python_parser()?;
    let tree = parser.parse(source, None).ok_or_else(|| Error::Parse {
        origin: origin.to_string(),
        message: "parser returned no tree".to_string(),
    })?;
    if tree.root_node().has_error() {
        return Err(Error::Parse {
            origin: origin.to_string(),
            message: "syntax error".to_string(),
        });
    }
    Ok(tree)
}

fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Every import statement in the file, in source order.
///
/// Files with syntax errors are rejected as a whole rather than yielding a
/// partial import list.
pub fn extract_imports(source: &str, origin: &str) -> Result<Vec<ImportStatement>> {
    let tree = parse_tree(source, origin)?;
    let mut imports = Vec::new();
    collect_imports(&tree.root_node(), source, &mut imports);
    Ok(imports)
}

fn collect_imports(node: &Node, source: &str, imports: &mut Vec<ImportStatement>) {
    match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                if let Some(module) = imported_name(&name, source) {
                    imports.push(ImportStatement::Import { module });
                }
            }
            return;
        }
        "import_from_statement" => {
            if let Some(statement) = from_import(node, source) {
                imports.push(statement);
            }
            return;
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_imports(&child, source, imports);
    }
}

/// Name of a `dotted_name` or the target of an `aliased_import`.
fn imported_name(node: &Node, source: &str) -> Option<String> {
    match node.kind() {
        "dotted_name" => Some(node_text(node, source).to_string()),
        "aliased_import" => node
            .child_by_field_name("name")
            .map(|name| node_text(&name, source).to_string()),
        _ => None,
    }
}

fn from_import(node: &Node, source: &str) -> Option<ImportStatement> {
    let module_node = node.child_by_field_name("module_name")?;
    let (level, module) = match module_node.kind() {
        "relative_import" => {
            let mut level = 0;
            let mut module = None;
            let mut cursor = module_node.walk();
            for child in module_node.children(&mut cursor) {
                match child.kind() {
                    "import_prefix" => {
                        level = node_text(&child, source).chars().filter(|c| *c == '.').count()
                    }
                    "dotted_name" => module = Some(node_text(&child, source).to_string()),
                    _ => {}
                }
            }
            (level, module)
        }
        _ => (0, Some(node_text(&module_node, source).to_string())),
    };

    let mut cursor = node.walk();
    let names = node
        .children_by_field_name("name", &mut cursor)
        .filter_map(|name| imported_name(&name, source))
        .collect();

    Some(ImportStatement::From {
        level,
        module,
        names,
    })
}
