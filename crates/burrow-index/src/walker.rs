//! Syntax-tree walker that builds the symbol index and block map
//!
//! One pre-order pass over the parse tree. A transient set of visited byte
//! ranges stops the generic descent from re-entering sub-trees that a more
//! specific handler already consumed (a function handler walks its own body
//! with the extended block path, so the body must not be re-dispatched as a
//! plain block). The set lives only for the duration of the pass.

use std::collections::HashSet;

use tree_sitter::Node;

use burrow_core::{
    BlockKind, BlockMap, FuncSymbol, GLOBAL_BLOCK, ImportSymbol, Scope, SymbolIndex, TypeSymbol,
    VarSymbol, join_block_path,
};

/// Closed set of syntax constructs the indexer reacts to. Anything else
/// falls through to the generic descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Construct {
    Function,
    ValueDecl,
    ImportDecl,
    ShortVarDecl,
    Assignment,
    TypeDecl,
    FuncLiteral,
    Block,
    Other,
}

impl Construct {
    fn classify(kind: &str) -> Self {
        match kind {
            "function_declaration" | "method_declaration" => Construct::Function,
            "var_declaration" | "const_declaration" => Construct::ValueDecl,
            "import_declaration" => Construct::ImportDecl,
            "short_var_declaration" => Construct::ShortVarDecl,
            "assignment_statement" => Construct::Assignment,
            "type_declaration" => Construct::TypeDecl,
            "func_literal" => Construct::FuncLiteral,
            "block" => Construct::Block,
            _ => Construct::Other,
        }
    }
}

/// Builds a fresh symbol index and block map from one parsed tree.
pub struct IndexBuilder<'s> {
    source: &'s [u8],
    symbols: SymbolIndex,
    blocks: BlockMap,
    visited: HashSet<Scope>,
}

impl<'s> IndexBuilder<'s> {
    pub fn new(source: &'s [u8], line_count: usize) -> Self {
        IndexBuilder {
            source,
            symbols: SymbolIndex::new(),
            blocks: BlockMap::new(line_count),
            visited: HashSet::new(),
        }
    }

    /// Run the pass and hand back the finished artifacts. The visited set
    /// is dropped here; it is never part of the steady-state document.
    pub fn build(mut self, root: Node) -> (SymbolIndex, BlockMap) {
        self.walk(root, GLOBAL_BLOCK);
        (self.symbols, self.blocks)
    }

    fn walk(&mut self, node: Node, block: &str) {
        if self.visited.contains(&scope_of(node)) {
            return;
        }

        match Construct::classify(node.kind()) {
            Construct::Function => {
                self.function_decl(node, block);
                return;
            }
            Construct::FuncLiteral => {
                self.func_literal(node, block);
                return;
            }
            Construct::Block => {
                self.block_stmt(node, block);
                return;
            }
            Construct::ValueDecl => self.value_decl(node, block),
            Construct::ImportDecl => self.import_decl(node, block),
            Construct::ShortVarDecl => self.short_var_decl(node, block),
            Construct::Assignment => self.assignment_stmt(node),
            Construct::TypeDecl => self.type_decl(node, block),
            Construct::Other => {}
        }

        // Declarations can hold nested literals in their initializers, so
        // the generic descent continues beneath them; ranges a handler
        // already registered are skipped on re-entry.
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk(child, block);
        }
    }

    /// Register a block's range under `path` and walk its statements with
    /// that path. Used for function bodies, lambda bodies, and bare blocks.
    fn enter_block(&mut self, body: Node, path: &str) {
        self.register(body);
        self.stamp(body, path);
        let mut cursor = body.walk();
        for stmt in body.named_children(&mut cursor) {
            self.walk(stmt, path);
        }
    }

    fn function_decl(&mut self, node: Node, block: &str) {
        self.register(node);
        self.stamp(node, block);

        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node);

        let params = node
            .child_by_field_name("parameters")
            .map(|list| self.field_list(list))
            .unwrap_or_default();
        let returns = node
            .child_by_field_name("result")
            .map(|result| self.return_list(result))
            .unwrap_or_default();

        self.symbols.add_function(
            block,
            FuncSymbol {
                name: name.clone(),
                params,
                returns,
                scope: scope_of(node),
                comment: self.leading_comment(node),
            },
        );

        if let Some(body) = node.child_by_field_name("body") {
            let inner = join_block_path(block, &name);
            self.enter_block(body, &inner);
        }
    }

    fn func_literal(&mut self, node: Node, block: &str) {
        self.register(node);
        let inner = join_block_path(block, BlockKind::Lambda.as_str());
        self.stamp(node, &inner);
        if let Some(body) = node.child_by_field_name("body") {
            self.enter_block(body, &inner);
        }
    }

    fn block_stmt(&mut self, node: Node, block: &str) {
        let inner = join_block_path(block, BlockKind::Block.as_str());
        self.enter_block(node, &inner);
    }

    fn value_decl(&mut self, node: Node, block: &str) {
        self.register(node);
        self.stamp(node, block);
        let mut cursor = node.walk();
        for spec in node.named_children(&mut cursor) {
            if spec.kind() == "var_spec" || spec.kind() == "const_spec" {
                self.value_spec(node, spec, block);
            } else if spec.kind() == "var_spec_list" || spec.kind() == "const_spec_list" {
                let mut inner = spec.walk();
                for grouped in spec.named_children(&mut inner) {
                    if grouped.kind() == "var_spec" || grouped.kind() == "const_spec" {
                        self.value_spec(node, grouped, block);
                    }
                }
            }
        }
    }

    fn value_spec(&mut self, decl: Node, spec: Node, block: &str) {
        let type_desc = spec
            .child_by_field_name("type")
            .map(|ty| self.render_type(ty))
            .unwrap_or_default();
        // A single ungrouped spec has no trailing sibling of its own; the
        // comment then sits after the declaration node.
        let mut comment = self.trailing_comment(spec);
        if comment.is_empty() {
            comment = self.trailing_comment(decl);
        }

        let mut cursor = spec.walk();
        for name in spec.children_by_field_name("name", &mut cursor) {
            self.symbols.add_variable(
                block,
                VarSymbol {
                    name: Some(self.text(name)),
                    scope: scope_of(spec),
                    type_desc: type_desc.clone(),
                    comment: comment.clone(),
                },
            );
        }
    }

    fn import_decl(&mut self, node: Node, block: &str) {
        self.register(node);
        self.stamp(node, block);
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "import_spec" {
                self.import_spec(child, block);
            } else if child.kind() == "import_spec_list" {
                let mut inner = child.walk();
                for spec in child.named_children(&mut inner) {
                    if spec.kind() == "import_spec" {
                        self.import_spec(spec, block);
                    }
                }
            }
        }
    }

    fn import_spec(&mut self, spec: Node, block: &str) {
        let Some(path_node) = spec.child_by_field_name("path") else {
            return;
        };
        let full_path = self
            .text(path_node)
            .trim_matches(|c| c == '"' || c == '`')
            .to_string();

        // Explicit alias wins; otherwise the last path segment names the
        // package locally.
        let local_name = match spec.child_by_field_name("name") {
            Some(alias) => self.text(alias),
            None => full_path
                .rsplit('/')
                .next()
                .unwrap_or(full_path.as_str())
                .to_string(),
        };

        self.symbols.add_import(
            block,
            ImportSymbol {
                local_name,
                full_path,
                scope: scope_of(spec),
            },
        );
    }

    fn short_var_decl(&mut self, node: Node, block: &str) {
        self.register(node);
        self.stamp(node, block);
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        let mut cursor = left.walk();
        for ident in left.named_children(&mut cursor) {
            if ident.kind() != "identifier" {
                continue;
            }
            self.symbols.add_variable(
                block,
                VarSymbol {
                    name: Some(self.text(ident)),
                    scope: scope_of(ident),
                    type_desc: String::new(),
                    comment: String::new(),
                },
            );
        }
    }

    /// Plain `=` assignment reuses names rather than declaring them, so only
    /// the range is registered.
    fn assignment_stmt(&mut self, node: Node) {
        self.register(node);
    }

    fn type_decl(&mut self, node: Node, block: &str) {
        self.register(node);
        let mut cursor = node.walk();
        for spec in node.named_children(&mut cursor) {
            if spec.kind() == "type_spec" || spec.kind() == "type_alias" {
                self.type_spec(node, spec, block);
            }
        }
    }

    fn type_spec(&mut self, decl: Node, spec: Node, block: &str) {
        self.register(spec);

        let Some(name_node) = spec.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node);
        let ty_node = spec.child_by_field_name("type");
        let type_desc = ty_node.map(|ty| self.render_type(ty)).unwrap_or_default();

        let mut fields = Vec::new();
        if let Some(ty) = ty_node {
            if ty.kind() == "struct_type" {
                fields = self.struct_fields(ty);
                // Lines inside a struct body resolve to the type's own path.
                let inner = join_block_path(block, &name);
                self.stamp(spec, &inner);
            } else {
                self.stamp(spec, block);
            }
        } else {
            self.stamp(spec, block);
        }

        let mut comment = self.leading_comment(spec);
        if comment.is_empty() {
            comment = self.leading_comment(decl);
        }

        self.symbols.add_type(
            block,
            TypeSymbol {
                name,
                type_desc,
                fields,
                scope: scope_of(spec),
                comment,
            },
        );
    }

    fn struct_fields(&self, struct_node: Node) -> Vec<VarSymbol> {
        let mut fields = Vec::new();
        let mut cursor = struct_node.walk();
        for child in struct_node.named_children(&mut cursor) {
            if child.kind() != "field_declaration_list" {
                continue;
            }
            let mut list_cursor = child.walk();
            for decl in child.named_children(&mut list_cursor) {
                if decl.kind() != "field_declaration" {
                    continue;
                }
                let type_desc = decl
                    .child_by_field_name("type")
                    .map(|ty| self.render_type(ty))
                    .unwrap_or_default();
                let comment = self.trailing_comment(decl);
                let mut name_cursor = decl.walk();
                for name in decl.children_by_field_name("name", &mut name_cursor) {
                    fields.push(VarSymbol {
                        name: Some(self.text(name)),
                        scope: scope_of(name),
                        type_desc: type_desc.clone(),
                        comment: comment.clone(),
                    });
                }
            }
        }
        fields
    }

    /// Parameters: one symbol per declared name, or one unnamed symbol for
    /// positional declarations like `func(int)`. Parameter comments are not
    /// derivable from syntax, so the comment is always empty.
    fn field_list(&self, list: Node) -> Vec<VarSymbol> {
        let mut out = Vec::new();
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            if param.kind() != "parameter_declaration"
                && param.kind() != "variadic_parameter_declaration"
            {
                continue;
            }
            let type_desc = param
                .child_by_field_name("type")
                .map(|ty| self.render_type(ty))
                .unwrap_or_default();

            let mut name_cursor = param.walk();
            let names: Vec<Node> = param
                .children_by_field_name("name", &mut name_cursor)
                .collect();
            if names.is_empty() {
                out.push(VarSymbol {
                    name: None,
                    scope: scope_of(param),
                    type_desc,
                    comment: String::new(),
                });
            } else {
                for name in names {
                    out.push(VarSymbol {
                        name: Some(self.text(name)),
                        scope: scope_of(name),
                        type_desc: type_desc.clone(),
                        comment: String::new(),
                    });
                }
            }
        }
        out
    }

    /// A result is either a parenthesized parameter list or a single bare
    /// type.
    fn return_list(&self, result: Node) -> Vec<VarSymbol> {
        if result.kind() == "parameter_list" {
            self.field_list(result)
        } else {
            vec![VarSymbol {
                name: None,
                scope: scope_of(result),
                type_desc: self.render_type(result),
                comment: String::new(),
            }]
        }
    }

    /// Small recursive type-to-string renderer. Covers identifiers, arrays
    /// and slices, struct aggregates, and function types; everything else
    /// gets a generic tag.
    fn render_type(&self, node: Node) -> String {
        match node.kind() {
            "type_identifier" | "identifier" | "package_identifier" | "qualified_type" => {
                self.text(node)
            }
            "slice_type" | "array_type" => {
                let element = node
                    .child_by_field_name("element")
                    .map(|e| self.render_type(e))
                    .unwrap_or_default();
                format!("[]{element}")
            }
            "struct_type" => "struct{}".to_string(),
            "function_type" => "func()".to_string(),
            _ => format!("<{}>", node.kind()),
        }
    }

    /// Contiguous `//` comments directly above a declaration, joined into
    /// one doc string.
    fn leading_comment(&self, node: Node) -> String {
        let mut parts = Vec::new();
        let mut row = node.start_position().row;
        let mut cur = node;
        while let Some(prev) = cur.prev_sibling() {
            if prev.kind() != "comment" || prev.end_position().row + 1 < row {
                break;
            }
            row = prev.start_position().row;
            parts.push(trim_comment(&self.text(prev)));
            cur = prev;
        }
        parts.reverse();
        parts.join("\n")
    }

    /// A `//` comment trailing the declaration on the same line.
    fn trailing_comment(&self, node: Node) -> String {
        let mut cur = node;
        while let Some(next) = cur.next_sibling() {
            if next.kind() == "comment" {
                if next.start_position().row == node.end_position().row {
                    return trim_comment(&self.text(next));
                }
                return String::new();
            }
            if next.is_named() {
                return String::new();
            }
            cur = next;
        }
        String::new()
    }

    fn text(&self, node: Node) -> String {
        node.utf8_text(self.source).unwrap_or_default().to_string()
    }

    fn register(&mut self, node: Node) {
        self.visited.insert(scope_of(node));
    }

    fn stamp(&mut self, node: Node, path: &str) {
        self.blocks
            .assign(node.start_position().row, node.end_position().row, path);
    }
}

fn scope_of(node: Node) -> Scope {
    Scope::new(node.start_byte(), node.end_byte())
}

fn trim_comment(raw: &str) -> String {
    raw.trim_start_matches("//")
        .trim_start_matches("/*")
        .trim_end_matches("*/")
        .trim()
        .to_string()
}
